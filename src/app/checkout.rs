use crate::core::poller::{PaymentPoller, PollHandle, PollOutcome, PollSettings};
use crate::core::wizard::{Wizard, WizardAction, WizardState};
use crate::core::PaymentGateway;
use crate::domain::model::{PaymentMethod, ShipmentForm};
use crate::utils::error::{CheckoutError, Result};
use std::sync::Arc;

/// Drives one wizard session against a payment gateway. The session owns the
/// poll task, so dropping the session stops polling.
pub struct CheckoutSession<G: PaymentGateway + 'static> {
    wizard: Wizard,
    state: WizardState,
    gateway: Arc<G>,
    poll_settings: PollSettings,
    polling: Option<PollHandle>,
}

impl<G: PaymentGateway + 'static> CheckoutSession<G> {
    pub fn new(wizard: Wizard, gateway: Arc<G>, poll_settings: PollSettings) -> Self {
        Self {
            wizard,
            state: WizardState::new(),
            gateway,
            poll_settings,
            polling: None,
        }
    }

    pub fn with_form(mut self, form: ShipmentForm) -> Self {
        self.state = WizardState::with_form(form);
        self
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn wizard(&self) -> &Wizard {
        &self.wizard
    }

    pub fn is_polling(&self) -> bool {
        self.polling.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    pub fn dispatch(&mut self, action: WizardAction) -> Result<&WizardState> {
        self.state = self.wizard.reduce(&self.state, action)?;
        if self.state.phase().is_terminal() {
            self.stop_polling();
        }
        Ok(&self.state)
    }

    /// Sends the single initiation request. A backend rejection lands in
    /// `payment_error` with the backend's own text and the user may retry.
    ///
    /// The submitting snapshot is only committed once `initiate` returns, so
    /// dropping this future mid-request leaves the session in
    /// `AwaitingPayment`, ready for `Back` or another submit.
    pub async fn submit_payment(
        &mut self,
        method: PaymentMethod,
        phone_number: &str,
    ) -> Result<&WizardState> {
        let submitting = self.wizard.reduce(
            &self.state,
            WizardAction::SubmitPayment {
                method,
                phone_number: phone_number.to_string(),
            },
        )?;

        if !submitting.is_submitting() {
            self.state = submitting;
            return Ok(&self.state);
        }

        let Some(request) = self.wizard.payment_request(&submitting) else {
            self.state = submitting;
            return self.dispatch(WizardAction::PaymentRejected(
                "Montant indisponible, veuillez revenir au récapitulatif".to_string(),
            ));
        };

        let initiated = self.gateway.initiate(&request).await;
        self.state = submitting;

        match initiated {
            Ok(pending) => {
                let tracking_number = pending.tracking_number().to_string();
                let reported = pending.payment_status().clone();
                self.dispatch(WizardAction::PaymentInitiated(pending))?;

                if reported.is_terminal() {
                    // 後端已回報最終狀態，不需輪詢
                    tracing::info!("📦 {} settled at initiation: {}", tracking_number, reported);
                    self.dispatch(WizardAction::StatusObserved(reported))?;
                } else {
                    tracing::info!("⏳ Waiting for {} payment on {}", method, tracking_number);
                    self.start_polling(tracking_number);
                }
            }
            Err(e) => {
                tracing::warn!("❌ Payment initiation failed: {}", e);
                let message = match e {
                    CheckoutError::PaymentRejected { message, .. } => message,
                    other => other.to_string(),
                };
                self.dispatch(WizardAction::PaymentRejected(message))?;
            }
        }

        Ok(&self.state)
    }

    /// Waits for the poll task and applies what it saw. A cancelled poll
    /// leaves the state untouched.
    pub async fn wait_for_confirmation(&mut self) -> Result<&WizardState> {
        let Some(handle) = self.polling.take() else {
            return Err(CheckoutError::InvalidTransition {
                phase: self.state.phase().to_string(),
                action: "wait_for_confirmation".to_string(),
            });
        };

        match handle.outcome().await {
            PollOutcome::Confirmed(status) | PollOutcome::Failed(status) => {
                self.dispatch(WizardAction::StatusObserved(status))
            }
            PollOutcome::TimedOut => self.dispatch(WizardAction::PaymentTimedOut),
            PollOutcome::Cancelled => Ok(&self.state),
        }
    }

    /// Leaves the page: no poll request goes out after this returns.
    pub fn abandon(&mut self) {
        if self.polling.is_some() {
            tracing::info!("🛑 Checkout abandoned, stopping payment polling");
        }
        self.stop_polling();
    }

    fn start_polling(&mut self, tracking_number: String) {
        self.stop_polling();
        let poller = PaymentPoller::new(Arc::clone(&self.gateway), self.poll_settings);
        self.polling = Some(poller.spawn(tracking_number));
    }

    fn stop_polling(&mut self) {
        if let Some(handle) = self.polling.take() {
            handle.cancel();
        }
    }
}
