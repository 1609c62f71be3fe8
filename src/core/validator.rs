use crate::domain::model::{Party, ServiceTier, ShipmentForm};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wizard steps, in order. `Review` gates the move to payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    Parties,
    Package,
    Service,
    Review,
}

impl Step {
    pub fn index(&self) -> usize {
        match self {
            Step::Parties => 1,
            Step::Package => 2,
            Step::Service => 3,
            Step::Review => 4,
        }
    }

    pub fn next(&self) -> Option<Step> {
        match self {
            Step::Parties => Some(Step::Package),
            Step::Package => Some(Step::Service),
            Step::Service => Some(Step::Review),
            Step::Review => None,
        }
    }

    pub fn previous(&self) -> Option<Step> {
        match self {
            Step::Parties => None,
            Step::Package => Some(Step::Parties),
            Step::Service => Some(Step::Package),
            Step::Review => Some(Step::Service),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Step::Parties => "parties",
            Step::Package => "package",
            Step::Service => "service",
            Step::Review => "review",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationResult {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationPolicy {
    /// Fragile and electronics parcels must be insured before payment.
    pub require_insurance_for_sensitive: bool,
    pub enforce_max_weight: bool,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            require_insurance_for_sensitive: true,
            enforce_max_weight: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StepValidator {
    policy: ValidationPolicy,
}

impl StepValidator {
    pub fn new(policy: ValidationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ValidationPolicy {
        self.policy
    }

    pub fn validate(&self, step: Step, form: &ShipmentForm) -> ValidationResult {
        let mut errors = Vec::new();

        match step {
            Step::Parties => self.check_parties(form, &mut errors),
            Step::Package => self.check_package(form, &mut errors),
            Step::Service | Step::Review => self.check_insurance(form, &mut errors),
        }

        ValidationResult::from_errors(errors)
    }

    /// Validates every step up to `step` and reports the first one that fails.
    pub fn validate_through(
        &self,
        step: Step,
        form: &ShipmentForm,
    ) -> Result<(), (Step, ValidationResult)> {
        let mut current = Some(Step::Parties);
        while let Some(candidate) = current {
            if candidate > step {
                break;
            }
            let result = self.validate(candidate, form);
            if !result.is_valid() {
                return Err((candidate, result));
            }
            current = candidate.next();
        }
        Ok(())
    }

    fn check_parties(&self, form: &ShipmentForm, errors: &mut Vec<String>) {
        check_party(&form.sender, "de l'expéditeur", errors);
        check_party(&form.recipient, "du destinataire", errors);

        if form.service_tier == ServiceTier::International
            && form
                .recipient
                .country
                .as_deref()
                .map_or(true, |country| country.trim().is_empty())
        {
            errors.push("Pays du destinataire requis pour un envoi international".to_string());
        }
    }

    fn check_package(&self, form: &ShipmentForm, errors: &mut Vec<String>) {
        let package = &form.package;

        let Some(package_type) = package.package_type else {
            errors.push("Type de colis requis".to_string());
            // 沒有類型就無法判斷尺寸規則，只檢查重量
            if !is_positive(package.weight_kg) {
                errors.push("Poids invalide".to_string());
            }
            return;
        };

        match package.weight_kg {
            Some(weight) if weight.is_finite() && weight > 0.0 => {
                if self.policy.enforce_max_weight {
                    if let Some(max) = package_type.max_weight_kg() {
                        if weight > max {
                            errors.push(format!(
                                "Poids maximum dépassé pour {} ({}kg max)",
                                package_type.label(),
                                max
                            ));
                        }
                    }
                }
            }
            _ => errors.push("Poids invalide".to_string()),
        }

        if package_type.requires_dimensions()
            && ![package.length_cm, package.width_cm, package.height_cm]
                .into_iter()
                .all(is_positive)
        {
            errors.push("Dimensions invalides".to_string());
        }
    }

    fn check_insurance(&self, form: &ShipmentForm, errors: &mut Vec<String>) {
        if !self.policy.require_insurance_for_sensitive {
            return;
        }

        if let Some(package_type) = form.package.package_type {
            if package_type.is_sensitive() && !form.options.insurance {
                errors.push(format!(
                    "Assurance obligatoire pour les colis de type {}",
                    package_type.label()
                ));
            }
        }
    }
}

fn is_positive(value: Option<f64>) -> bool {
    matches!(value, Some(v) if v.is_finite() && v > 0.0)
}

fn check_party(party: &Party, whose: &str, errors: &mut Vec<String>) {
    let fields = [
        (&party.name, "Nom"),
        (&party.phone, "Téléphone"),
        (&party.address, "Adresse"),
        (&party.city, "Ville"),
    ];

    for (value, label) in fields {
        if value.trim().is_empty() {
            errors.push(format!("{} {} requis", label, whose));
        }
    }
}
