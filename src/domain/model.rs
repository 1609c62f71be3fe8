use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 寄件人或收件人
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Party {
    pub name: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageType {
    Document,
    Small,
    Medium,
    Large,
    Fragile,
    Electronics,
    #[serde(other)]
    Other,
}

impl PackageType {
    pub fn label(&self) -> &'static str {
        match self {
            PackageType::Document => "Document",
            PackageType::Small => "Petit colis",
            PackageType::Medium => "Colis moyen",
            PackageType::Large => "Gros colis",
            PackageType::Fragile => "Fragile",
            PackageType::Electronics => "Électronique",
            PackageType::Other => "Autre",
        }
    }

    /// Documents are priced and accepted without dimensions.
    pub fn requires_dimensions(&self) -> bool {
        !matches!(self, PackageType::Document)
    }

    pub fn is_sensitive(&self) -> bool {
        matches!(self, PackageType::Fragile | PackageType::Electronics)
    }

    pub fn max_weight_kg(&self) -> Option<f64> {
        match self {
            PackageType::Document => Some(2.0),
            PackageType::Small => Some(5.0),
            PackageType::Medium => Some(15.0),
            PackageType::Large => Some(30.0),
            PackageType::Fragile => Some(10.0),
            PackageType::Electronics => Some(20.0),
            PackageType::Other => None,
        }
    }
}

impl fmt::Display for PackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PackageInfo {
    #[serde(rename = "type")]
    pub package_type: Option<PackageType>,
    pub description: String,
    pub weight_kg: Option<f64>,
    pub length_cm: Option<f64>,
    pub width_cm: Option<f64>,
    pub height_cm: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliverySpeed {
    Economy,
    #[default]
    Standard,
    Express,
    Premium,
}

impl DeliverySpeed {
    pub fn estimated_days(&self) -> u32 {
        match self {
            DeliverySpeed::Economy => 7,
            DeliverySpeed::Standard => 5,
            DeliverySpeed::Express => 2,
            DeliverySpeed::Premium => 1,
        }
    }
}

impl fmt::Display for DeliverySpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DeliverySpeed::Economy => "Économique",
            DeliverySpeed::Standard => "Standard",
            DeliverySpeed::Express => "Express",
            DeliverySpeed::Premium => "Premium",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceTier {
    #[default]
    National,
    International,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShipmentOptions {
    pub insurance: bool,
    pub fragile: bool,
    pub signature: bool,
    pub express: bool,
}

/// Reference returned by the upload collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(pub String);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ShipmentForm {
    pub sender: Party,
    pub recipient: Party,
    pub package: PackageInfo,
    pub service_tier: ServiceTier,
    pub delivery_speed: DeliverySpeed,
    pub options: ShipmentOptions,
    pub images: Vec<ImageRef>,
}

/// Whole FCFA amounts; `total` is always the sum of the other charges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    pub strategy: String,
    pub base_price: i64,
    pub weight_charge: i64,
    pub zone_charge: i64,
    pub service_charge: i64,
    pub options_charge: i64,
    pub insurance: i64,
    pub total: i64,
    pub chargeable_weight_kg: f64,
    pub estimated_delivery_days: u32,
}

impl PriceBreakdown {
    pub fn component_sum(&self) -> i64 {
        self.base_price
            + self.weight_charge
            + self.zone_charge
            + self.service_charge
            + self.options_charge
            + self.insurance
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Mtn,
    Airtel,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethod::Mtn => f.write_str("MTN Mobile Money"),
            PaymentMethod::Airtel => f.write_str("Airtel Money"),
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mtn" => Ok(PaymentMethod::Mtn),
            "airtel" => Ok(PaymentMethod::Airtel),
            other => Err(format!("unknown payment method: {}", other)),
        }
    }
}

/// 後端回報的付款狀態
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PaymentStatus {
    Pending,
    Confirmed,
    Failed(String),
    Other(String),
}

impl PaymentStatus {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, PaymentStatus::Confirmed)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, PaymentStatus::Failed(_))
    }

    pub fn is_terminal(&self) -> bool {
        self.is_confirmed() || self.is_failure()
    }
}

impl From<String> for PaymentStatus {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PENDING" => PaymentStatus::Pending,
            "CONFIRMED" | "PAID" | "COMPLETED" | "SUCCESS" => PaymentStatus::Confirmed,
            "FAILED" | "CANCELLED" | "REJECTED" | "EXPIRED" => PaymentStatus::Failed(raw),
            _ => PaymentStatus::Other(raw),
        }
    }
}

impl From<PaymentStatus> for String {
    fn from(status: PaymentStatus) -> Self {
        match status {
            PaymentStatus::Pending => "PENDING".to_string(),
            PaymentStatus::Confirmed => "CONFIRMED".to_string(),
            PaymentStatus::Failed(raw) | PaymentStatus::Other(raw) => raw,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Pending => f.write_str("PENDING"),
            PaymentStatus::Confirmed => f.write_str("CONFIRMED"),
            PaymentStatus::Failed(raw) | PaymentStatus::Other(raw) => f.write_str(raw),
        }
    }
}

/// Result of a successful initiation. Never mutated: confirmation derives a new value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentResult {
    tracking_number: String,
    estimated_delivery_date: Option<NaiveDate>,
    payment_status: PaymentStatus,
}

impl ShipmentResult {
    pub fn new(
        tracking_number: impl Into<String>,
        estimated_delivery_date: Option<NaiveDate>,
        payment_status: PaymentStatus,
    ) -> Self {
        Self {
            tracking_number: tracking_number.into(),
            estimated_delivery_date,
            payment_status,
        }
    }

    pub fn tracking_number(&self) -> &str {
        &self.tracking_number
    }

    pub fn estimated_delivery_date(&self) -> Option<NaiveDate> {
        self.estimated_delivery_date
    }

    pub fn payment_status(&self) -> &PaymentStatus {
        &self.payment_status
    }

    pub fn with_status(&self, payment_status: PaymentStatus) -> Self {
        Self {
            tracking_number: self.tracking_number.clone(),
            estimated_delivery_date: self.estimated_delivery_date,
            payment_status,
        }
    }
}

/// Everything the gateway needs to open a payment for one shipment.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRequest {
    pub form: ShipmentForm,
    pub method: PaymentMethod,
    pub phone_number: String,
    pub amount: i64,
}
