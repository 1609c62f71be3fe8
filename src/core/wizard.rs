use crate::core::pricing::{PricingInput, PricingStrategy};
use crate::core::validator::{Step, StepValidator, ValidationPolicy};
use crate::domain::model::{
    DeliverySpeed, ImageRef, PackageInfo, Party, PaymentMethod, PaymentRequest, PaymentStatus,
    PriceBreakdown, ServiceTier, ShipmentForm, ShipmentOptions, ShipmentResult,
};
use crate::utils::error::{CheckoutError, Result};
use std::fmt;
use std::sync::Arc;

pub const TIMEOUT_REASON: &str = "timeout";

#[derive(Debug, Clone, PartialEq)]
pub enum WizardPhase {
    Collecting(Step),
    ReviewReady,
    AwaitingPayment,
    PaymentPending,
    Confirmed,
    Failed(String),
}

impl WizardPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, WizardPhase::Confirmed | WizardPhase::Failed(_))
    }
}

impl fmt::Display for WizardPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WizardPhase::Collecting(step) => write!(f, "collecting({})", step),
            WizardPhase::ReviewReady => f.write_str("review_ready"),
            WizardPhase::AwaitingPayment => f.write_str("awaiting_payment"),
            WizardPhase::PaymentPending => f.write_str("payment_pending"),
            WizardPhase::Confirmed => f.write_str("confirmed"),
            WizardPhase::Failed(reason) => write!(f, "failed({})", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentChoice {
    pub method: PaymentMethod,
    pub phone_number: String,
}

/// Snapshot of one wizard session. Only `Wizard::reduce` produces new snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct WizardState {
    phase: WizardPhase,
    form: ShipmentForm,
    price: Option<PriceBreakdown>,
    errors: Vec<String>,
    payment_error: Option<String>,
    submitting: bool,
    payment: Option<PaymentChoice>,
    pending: Option<ShipmentResult>,
    result: Option<ShipmentResult>,
}

impl Default for WizardState {
    fn default() -> Self {
        Self::new()
    }
}

impl WizardState {
    pub fn new() -> Self {
        Self::with_form(ShipmentForm::default())
    }

    /// Starts at the first step with a pre-filled form (draft or CLI input).
    pub fn with_form(form: ShipmentForm) -> Self {
        Self {
            phase: WizardPhase::Collecting(Step::Parties),
            form,
            price: None,
            errors: Vec::new(),
            payment_error: None,
            submitting: false,
            payment: None,
            pending: None,
            result: None,
        }
    }

    pub fn phase(&self) -> &WizardPhase {
        &self.phase
    }

    pub fn form(&self) -> &ShipmentForm {
        &self.form
    }

    pub fn price(&self) -> Option<&PriceBreakdown> {
        self.price.as_ref()
    }

    /// Inline validation messages for the current step.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn payment_error(&self) -> Option<&str> {
        self.payment_error.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn payment(&self) -> Option<&PaymentChoice> {
        self.payment.as_ref()
    }

    pub fn pending(&self) -> Option<&ShipmentResult> {
        self.pending.as_ref()
    }

    pub fn result(&self) -> Option<&ShipmentResult> {
        self.result.as_ref()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WizardAction {
    SetSender(Party),
    SetRecipient(Party),
    SetPackage(PackageInfo),
    SetServiceTier(ServiceTier),
    SetDeliverySpeed(DeliverySpeed),
    SetOptions(ShipmentOptions),
    AddImage(ImageRef),
    RemoveImage(usize),
    Next,
    Back,
    Confirm,
    SubmitPayment {
        method: PaymentMethod,
        phone_number: String,
    },
    PaymentInitiated(ShipmentResult),
    PaymentRejected(String),
    StatusObserved(PaymentStatus),
    PaymentTimedOut,
}

impl WizardAction {
    pub fn name(&self) -> &'static str {
        match self {
            WizardAction::SetSender(_) => "set_sender",
            WizardAction::SetRecipient(_) => "set_recipient",
            WizardAction::SetPackage(_) => "set_package",
            WizardAction::SetServiceTier(_) => "set_service_tier",
            WizardAction::SetDeliverySpeed(_) => "set_delivery_speed",
            WizardAction::SetOptions(_) => "set_options",
            WizardAction::AddImage(_) => "add_image",
            WizardAction::RemoveImage(_) => "remove_image",
            WizardAction::Next => "next",
            WizardAction::Back => "back",
            WizardAction::Confirm => "confirm",
            WizardAction::SubmitPayment { .. } => "submit_payment",
            WizardAction::PaymentInitiated(_) => "payment_initiated",
            WizardAction::PaymentRejected(_) => "payment_rejected",
            WizardAction::StatusObserved(_) => "status_observed",
            WizardAction::PaymentTimedOut => "payment_timed_out",
        }
    }

    fn is_form_edit(&self) -> bool {
        matches!(
            self,
            WizardAction::SetSender(_)
                | WizardAction::SetRecipient(_)
                | WizardAction::SetPackage(_)
                | WizardAction::SetServiceTier(_)
                | WizardAction::SetDeliverySpeed(_)
                | WizardAction::SetOptions(_)
                | WizardAction::AddImage(_)
                | WizardAction::RemoveImage(_)
        )
    }
}

/// The shipment wizard: a pure reducer over `WizardState`.
#[derive(Debug, Clone)]
pub struct Wizard {
    validator: StepValidator,
    pricing: Arc<dyn PricingStrategy>,
}

impl Wizard {
    pub fn new(pricing: Arc<dyn PricingStrategy>, policy: ValidationPolicy) -> Self {
        Self {
            validator: StepValidator::new(policy),
            pricing,
        }
    }

    pub fn validator(&self) -> &StepValidator {
        &self.validator
    }

    pub fn pricing(&self) -> &dyn PricingStrategy {
        self.pricing.as_ref()
    }

    pub fn quote(&self, form: &ShipmentForm) -> PriceBreakdown {
        self.pricing.calculate(&PricingInput::from_form(form))
    }

    /// Builds the gateway request once a method and phone have been submitted.
    pub fn payment_request(&self, state: &WizardState) -> Option<PaymentRequest> {
        let choice = state.payment.as_ref()?;
        let price = state.price.as_ref()?;
        Some(PaymentRequest {
            form: state.form.clone(),
            method: choice.method,
            phone_number: choice.phone_number.clone(),
            amount: price.total,
        })
    }

    /// Applies `action` to `state`. Validation failures come back as `Ok` with
    /// `errors` filled; actions the current phase does not accept are `Err`.
    pub fn reduce(&self, state: &WizardState, action: WizardAction) -> Result<WizardState> {
        let action_name = action.name();
        let mut next = state.clone();

        match (&state.phase, action) {
            (WizardPhase::Collecting(_) | WizardPhase::ReviewReady, edit)
                if edit.is_form_edit() =>
            {
                apply_edit(&mut next.form, edit);
                next.errors.clear();
                if state.phase == WizardPhase::ReviewReady {
                    self.refresh_review(&mut next);
                }
            }
            (WizardPhase::Collecting(step), WizardAction::Next) => {
                let result = self.validator.validate(*step, &next.form);
                if result.is_valid() {
                    next.errors.clear();
                    match step.next() {
                        Some(Step::Review) | None => {
                            next.price = Some(self.quote(&next.form));
                            next.phase = WizardPhase::ReviewReady;
                        }
                        Some(following) => next.phase = WizardPhase::Collecting(following),
                    }
                } else {
                    tracing::debug!("Step {} blocked: {:?}", step, result.errors);
                    next.errors = result.errors;
                }
            }
            (WizardPhase::Collecting(step), WizardAction::Back) if step.previous().is_some() => {
                if let Some(previous) = step.previous() {
                    next.phase = WizardPhase::Collecting(previous);
                }
                next.errors.clear();
            }
            (WizardPhase::ReviewReady, WizardAction::Back) => {
                next.phase = WizardPhase::Collecting(Step::Service);
                next.price = None;
                next.errors.clear();
            }
            (WizardPhase::ReviewReady, WizardAction::Confirm) => {
                let result = self.validator.validate(Step::Review, &next.form);
                if result.is_valid() {
                    next.errors.clear();
                    next.phase = WizardPhase::AwaitingPayment;
                } else {
                    next.errors = result.errors;
                }
            }
            (WizardPhase::AwaitingPayment, WizardAction::Back) if !state.submitting => {
                next.phase = WizardPhase::ReviewReady;
                next.payment_error = None;
            }
            (
                WizardPhase::AwaitingPayment,
                WizardAction::SubmitPayment {
                    method,
                    phone_number,
                },
            ) => {
                if state.submitting {
                    return Err(CheckoutError::PaymentInFlight);
                }
                if phone_number.trim().is_empty() {
                    next.errors = vec!["Numéro de téléphone requis".to_string()];
                } else {
                    next.errors.clear();
                    next.payment_error = None;
                    next.submitting = true;
                    next.payment = Some(PaymentChoice {
                        method,
                        phone_number: phone_number.trim().to_string(),
                    });
                }
            }
            (WizardPhase::AwaitingPayment, WizardAction::PaymentInitiated(pending))
                if state.submitting =>
            {
                next.submitting = false;
                next.pending = Some(pending);
                next.phase = WizardPhase::PaymentPending;
            }
            (WizardPhase::AwaitingPayment, WizardAction::PaymentRejected(message))
                if state.submitting =>
            {
                next.submitting = false;
                next.payment_error = Some(message);
            }
            (WizardPhase::PaymentPending, WizardAction::StatusObserved(status)) => {
                if status.is_confirmed() {
                    next.result = next.pending.as_ref().map(|p| p.with_status(status));
                    next.phase = WizardPhase::Confirmed;
                } else if status.is_failure() {
                    next.pending = next.pending.as_ref().map(|p| p.with_status(status.clone()));
                    next.phase = WizardPhase::Failed(status.to_string());
                }
            }
            (WizardPhase::PaymentPending, WizardAction::PaymentTimedOut) => {
                next.phase = WizardPhase::Failed(TIMEOUT_REASON.to_string());
            }
            (phase, _) => {
                return Err(CheckoutError::InvalidTransition {
                    phase: phase.to_string(),
                    action: action_name.to_string(),
                });
            }
        }

        if next.phase != state.phase {
            tracing::debug!("Wizard {} -> {} on {}", state.phase, next.phase, action_name);
        }
        Ok(next)
    }

    /// Editing from the review step re-runs every gate: a form that no longer
    /// validates sends the wizard back to the first failing step. Review
    /// shares the Service checks, so a failure never stops at Review.
    fn refresh_review(&self, next: &mut WizardState) {
        match self.validator.validate_through(Step::Review, &next.form) {
            Ok(()) => {
                next.price = Some(self.quote(&next.form));
            }
            Err((step, result)) => {
                next.phase = WizardPhase::Collecting(step);
                next.price = None;
                next.errors = result.errors;
            }
        }
    }
}

fn apply_edit(form: &mut ShipmentForm, edit: WizardAction) {
    match edit {
        WizardAction::SetSender(sender) => form.sender = sender,
        WizardAction::SetRecipient(recipient) => form.recipient = recipient,
        WizardAction::SetPackage(package) => form.package = package,
        WizardAction::SetServiceTier(tier) => form.service_tier = tier,
        WizardAction::SetDeliverySpeed(speed) => form.delivery_speed = speed,
        WizardAction::SetOptions(options) => form.options = options,
        WizardAction::AddImage(image) => form.images.push(image),
        WizardAction::RemoveImage(index) => {
            if index < form.images.len() {
                form.images.remove(index);
            } else {
                tracing::warn!("Ignoring removal of missing image #{}", index);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pricing::{NationalTariff, StrategyKind};
    use crate::domain::model::PackageType;

    fn wizard() -> Wizard {
        Wizard::new(Arc::new(NationalTariff::default()), ValidationPolicy::default())
    }

    fn party(city: &str) -> Party {
        Party {
            name: "Jean Malonga".to_string(),
            phone: "055443322".to_string(),
            address: "Rue Mbochi 4".to_string(),
            city: city.to_string(),
            country: None,
        }
    }

    fn document() -> PackageInfo {
        PackageInfo {
            package_type: Some(PackageType::Document),
            description: "Contrat".to_string(),
            weight_kg: Some(1.0),
            ..Default::default()
        }
    }

    fn step(wizard: &Wizard, state: WizardState, action: WizardAction) -> WizardState {
        wizard.reduce(&state, action).unwrap()
    }

    fn at_review(wizard: &Wizard, package: PackageInfo) -> WizardState {
        let mut state = WizardState::new();
        for action in [
            WizardAction::SetSender(party("Brazzaville")),
            WizardAction::SetRecipient(party("Brazzaville")),
            WizardAction::Next,
            WizardAction::SetPackage(package),
            WizardAction::Next,
            WizardAction::Next,
        ] {
            state = step(wizard, state, action);
        }
        state
    }

    fn awaiting_payment(wizard: &Wizard) -> WizardState {
        let state = at_review(wizard, document());
        step(wizard, state, WizardAction::Confirm)
    }

    #[test]
    fn test_initial_state() {
        let state = WizardState::new();
        assert_eq!(state.phase(), &WizardPhase::Collecting(Step::Parties));
        assert_eq!(state.form(), &ShipmentForm::default());
        assert!(state.price().is_none());
        assert!(state.result().is_none());
    }

    #[test]
    fn test_walk_to_review_computes_price() {
        let wizard = wizard();
        let state = at_review(&wizard, document());

        assert_eq!(state.phase(), &WizardPhase::ReviewReady);
        let price = state.price().unwrap();
        assert_eq!(price.base_price, 1000);
        assert_eq!(price.weight_charge, 500);
        assert_eq!(price.total, 1500);
    }

    #[test]
    fn test_invalid_step_blocks_next() {
        let wizard = wizard();
        let state = step(&wizard, WizardState::new(), WizardAction::Next);

        assert_eq!(state.phase(), &WizardPhase::Collecting(Step::Parties));
        assert_eq!(state.errors().len(), 8);
    }

    #[test]
    fn test_zero_weight_never_reaches_pricing() {
        let wizard = wizard();
        let mut state = WizardState::new();
        for action in [
            WizardAction::SetSender(party("Brazzaville")),
            WizardAction::SetRecipient(party("Dolisie")),
            WizardAction::Next,
            WizardAction::SetPackage(PackageInfo {
                package_type: Some(PackageType::Small),
                weight_kg: Some(0.0),
                length_cm: Some(10.0),
                width_cm: Some(10.0),
                height_cm: Some(10.0),
                ..Default::default()
            }),
            WizardAction::Next,
        ] {
            state = step(&wizard, state, action);
        }

        assert_eq!(state.phase(), &WizardPhase::Collecting(Step::Package));
        assert!(state.errors().contains(&"Poids invalide".to_string()));
        assert!(state.price().is_none());
    }

    #[test]
    fn test_back_navigation() {
        let wizard = wizard();

        let err = wizard.reduce(&WizardState::new(), WizardAction::Back).unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidTransition { .. }));

        let state = at_review(&wizard, document());
        let state = step(&wizard, state, WizardAction::Back);
        assert_eq!(state.phase(), &WizardPhase::Collecting(Step::Service));
        assert!(state.price().is_none());

        let state = step(&wizard, state, WizardAction::Back);
        assert_eq!(state.phase(), &WizardPhase::Collecting(Step::Package));
        // 返回不會清掉已填資料
        assert_eq!(state.form().package, document());
    }

    #[test]
    fn test_review_edit_recomputes_price() {
        let wizard = wizard();
        let state = at_review(&wizard, document());

        let state = step(
            &wizard,
            state,
            WizardAction::SetDeliverySpeed(DeliverySpeed::Express),
        );
        assert_eq!(state.phase(), &WizardPhase::ReviewReady);
        assert_eq!(state.price().unwrap().service_charge, 500);
        assert_eq!(state.price().unwrap().total, 2000);
    }

    #[test]
    fn test_review_edit_that_breaks_validation_returns_to_step() {
        let wizard = wizard();
        let state = at_review(&wizard, document());

        let mut broken = document();
        broken.weight_kg = None;
        let state = step(&wizard, state, WizardAction::SetPackage(broken));

        assert_eq!(state.phase(), &WizardPhase::Collecting(Step::Package));
        assert!(state.price().is_none());
        assert_eq!(state.errors(), &["Poids invalide".to_string()]);
    }

    #[test]
    fn test_fragile_without_insurance_cannot_confirm() {
        let wizard = wizard();
        let fragile = PackageInfo {
            package_type: Some(PackageType::Fragile),
            description: "Vase".to_string(),
            weight_kg: Some(2.0),
            length_cm: Some(20.0),
            width_cm: Some(20.0),
            height_cm: Some(40.0),
        };

        let mut state = WizardState::new();
        for action in [
            WizardAction::SetSender(party("Brazzaville")),
            WizardAction::SetRecipient(party("Nkayi")),
            WizardAction::Next,
            WizardAction::SetPackage(fragile),
            WizardAction::Next,
            WizardAction::Next,
        ] {
            state = step(&wizard, state, action);
        }
        assert_eq!(state.phase(), &WizardPhase::Collecting(Step::Service));
        assert!(state.errors()[0].contains("Assurance"));

        let state = step(
            &wizard,
            state,
            WizardAction::SetOptions(ShipmentOptions {
                insurance: true,
                ..Default::default()
            }),
        );
        let state = step(&wizard, state, WizardAction::Next);
        assert_eq!(state.phase(), &WizardPhase::ReviewReady);
        assert!(state.price().unwrap().insurance > 0);

        // 在確認頁取消保險，會退回服務步驟
        let state = step(&wizard, state, WizardAction::SetOptions(ShipmentOptions::default()));
        assert_eq!(state.phase(), &WizardPhase::Collecting(Step::Service));
        assert!(state.price().is_none());
        assert!(state.errors()[0].contains("Assurance"));
    }

    #[test]
    fn test_submit_requires_phone_and_rejects_double_submit() {
        let wizard = wizard();
        let state = awaiting_payment(&wizard);
        assert_eq!(state.phase(), &WizardPhase::AwaitingPayment);

        let blank = step(
            &wizard,
            state.clone(),
            WizardAction::SubmitPayment {
                method: PaymentMethod::Mtn,
                phone_number: "  ".to_string(),
            },
        );
        assert!(!blank.is_submitting());
        assert_eq!(blank.errors(), &["Numéro de téléphone requis".to_string()]);

        let submitting = step(
            &wizard,
            state,
            WizardAction::SubmitPayment {
                method: PaymentMethod::Airtel,
                phone_number: " 055443322 ".to_string(),
            },
        );
        assert!(submitting.is_submitting());
        assert_eq!(submitting.payment().unwrap().phone_number, "055443322");

        let err = wizard
            .reduce(
                &submitting,
                WizardAction::SubmitPayment {
                    method: PaymentMethod::Airtel,
                    phone_number: "055443322".to_string(),
                },
            )
            .unwrap_err();
        assert!(matches!(err, CheckoutError::PaymentInFlight));

        let request = wizard.payment_request(&submitting).unwrap();
        assert_eq!(request.amount, 1500);
        assert_eq!(request.method, PaymentMethod::Airtel);
    }

    #[test]
    fn test_rejected_payment_stays_on_payment_step() {
        let wizard = wizard();
        let state = step(
            &wizard,
            awaiting_payment(&wizard),
            WizardAction::SubmitPayment {
                method: PaymentMethod::Mtn,
                phone_number: "000".to_string(),
            },
        );
        let state = step(
            &wizard,
            state,
            WizardAction::PaymentRejected("Invalid phone number".to_string()),
        );

        assert_eq!(state.phase(), &WizardPhase::AwaitingPayment);
        assert_eq!(state.payment_error(), Some("Invalid phone number"));
        assert!(!state.is_submitting());
        assert_eq!(state.price().unwrap().total, 1500);
    }

    #[test]
    fn test_confirmation_flow() {
        let wizard = wizard();
        let state = step(
            &wizard,
            awaiting_payment(&wizard),
            WizardAction::SubmitPayment {
                method: PaymentMethod::Mtn,
                phone_number: "066123456".to_string(),
            },
        );
        let pending = ShipmentResult::new("CG-BZV-0001", None, PaymentStatus::Pending);
        let state = step(&wizard, state, WizardAction::PaymentInitiated(pending));
        assert_eq!(state.phase(), &WizardPhase::PaymentPending);
        assert_eq!(state.pending().unwrap().tracking_number(), "CG-BZV-0001");

        let state = step(&wizard, state, WizardAction::StatusObserved(PaymentStatus::Pending));
        assert_eq!(state.phase(), &WizardPhase::PaymentPending);

        let state = step(&wizard, state, WizardAction::StatusObserved(PaymentStatus::Confirmed));
        assert_eq!(state.phase(), &WizardPhase::Confirmed);
        assert!(state.phase().is_terminal());
        let result = state.result().unwrap();
        assert_eq!(result.tracking_number(), "CG-BZV-0001");
        assert!(result.payment_status().is_confirmed());

        let err = wizard.reduce(&state, WizardAction::Back).unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidTransition { .. }));
    }

    #[test]
    fn test_failure_and_timeout() {
        let wizard = wizard();
        let state = step(
            &wizard,
            awaiting_payment(&wizard),
            WizardAction::SubmitPayment {
                method: PaymentMethod::Mtn,
                phone_number: "066123456".to_string(),
            },
        );
        let state = step(
            &wizard,
            state,
            WizardAction::PaymentInitiated(ShipmentResult::new("T1", None, PaymentStatus::Pending)),
        );

        let failed = step(
            &wizard,
            state.clone(),
            WizardAction::StatusObserved(PaymentStatus::from("REJECTED".to_string())),
        );
        assert_eq!(failed.phase(), &WizardPhase::Failed("REJECTED".to_string()));
        assert!(failed.result().is_none());

        let timed_out = step(&wizard, state, WizardAction::PaymentTimedOut);
        assert_eq!(timed_out.phase(), &WizardPhase::Failed(TIMEOUT_REASON.to_string()));
    }

    #[test]
    fn test_out_of_phase_actions_are_rejected() {
        let wizard = wizard();
        let state = WizardState::new();

        for action in [
            WizardAction::Confirm,
            WizardAction::PaymentTimedOut,
            WizardAction::StatusObserved(PaymentStatus::Confirmed),
            WizardAction::PaymentRejected("boom".to_string()),
        ] {
            assert!(wizard.reduce(&state, action).is_err());
        }

        let awaiting = awaiting_payment(&wizard);
        assert!(wizard
            .reduce(&awaiting, WizardAction::SetDeliverySpeed(DeliverySpeed::Express))
            .is_err());
        // 沒有送出中的請求時，後端結果不被接受
        assert!(wizard
            .reduce(&awaiting, WizardAction::PaymentRejected("late".to_string()))
            .is_err());
    }

    #[test]
    fn test_images_keep_order() {
        let wizard = wizard();
        let mut state = WizardState::new();
        for action in [
            WizardAction::AddImage(ImageRef("img-1".to_string())),
            WizardAction::AddImage(ImageRef("img-2".to_string())),
            WizardAction::AddImage(ImageRef("img-3".to_string())),
            WizardAction::RemoveImage(0),
            WizardAction::RemoveImage(9),
        ] {
            state = step(&wizard, state, action);
        }
        let names: Vec<&str> = state.form().images.iter().map(|i| i.0.as_str()).collect();
        assert_eq!(names, vec!["img-2", "img-3"]);
    }

    #[test]
    fn test_generic_strategy_in_wizard() {
        let wizard = Wizard::new(StrategyKind::Generic.build(None, None), ValidationPolicy::default());
        let state = at_review(&wizard, document());
        let price = state.price().unwrap();
        assert_eq!(price.strategy, "genericCalculator");
        assert_eq!(price.total, price.component_sum());
    }
}
