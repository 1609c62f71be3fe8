use crate::domain::model::{
    DeliverySpeed, PackageType, PriceBreakdown, ServiceTier, ShipmentForm, ShipmentOptions,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// 每公斤費率 (FCFA)
pub const PER_KG_RATE: f64 = 500.0;
pub const VOLUMETRIC_DIVISOR: f64 = 6000.0;
pub const INSURANCE_RATE: f64 = 0.15;
pub const INTERNATIONAL_ZONE_CHARGE: i64 = 15_000;
pub const DEFAULT_ZONE_CHARGE: i64 = 2_500;
/// Bounds applied to every speed multiplier before pricing.
pub const MIN_MULTIPLIER: f64 = 0.1;
pub const MAX_MULTIPLIER: f64 = 10.0;

const NATIONAL_ZONES: &[(&str, i64)] = &[
    ("Brazzaville", 2_000),
    ("Pointe-Noire", 2_500),
    ("Dolisie", 3_000),
    ("Nkayi", 3_500),
    ("Ouesso", 5_000),
];

/// 國際運費分區 (FCFA)
const INTERNATIONAL_REGIONS: &[(&str, i64, &[&str])] = &[
    (
        "Europe",
        15_000,
        &[
            "France", "Belgique", "Belgium", "Allemagne", "Germany", "Espagne", "Spain",
            "Italie", "Italy", "Portugal", "Suisse", "Switzerland", "Royaume-Uni",
            "United Kingdom", "Pays-Bas", "Netherlands",
        ],
    ),
    (
        "Amérique du Nord",
        25_000,
        &[
            "États-Unis", "Etats-Unis", "USA", "United States", "Canada", "Mexique", "Mexico",
        ],
    ),
    (
        "Asie",
        20_000,
        &[
            "Chine", "China", "Japon", "Japan", "Inde", "India", "Corée du Sud", "South Korea",
            "Turquie", "Turkey", "Émirats arabes unis", "United Arab Emirates",
        ],
    ),
    (
        "Afrique de l'Ouest",
        12_000,
        &[
            "Côte d'Ivoire", "Cote d'Ivoire", "Sénégal", "Senegal", "Mali", "Bénin", "Benin",
            "Togo", "Nigeria", "Ghana", "Burkina Faso", "Guinée", "Guinea", "Niger",
        ],
    ),
    (
        "Afrique de l'Est",
        18_000,
        &[
            "Kenya", "Tanzanie", "Tanzania", "Ouganda", "Uganda", "Rwanda", "Éthiopie",
            "Ethiopia", "Burundi", "Somalie", "Somalia",
        ],
    ),
];

/// City order used by the distance estimate of the generic calculator.
const CALCULATOR_CITIES: &[&str] = &[
    "Brazzaville",
    "Pointe-Noire",
    "Dolisie",
    "Nkayi",
    "Ouesso",
    "Gamboma",
    "Madingou",
    "Mossendjo",
    "Kinkala",
    "Loandjili",
    "Djambala",
    "Ewo",
    "Sibiti",
    "Impfondo",
    "Makoua",
];

pub trait PricingStrategy: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;
    fn calculate(&self, input: &PricingInput) -> PriceBreakdown;
}

/// The subset of the form that drives pricing.
#[derive(Debug, Clone, PartialEq)]
pub struct PricingInput {
    pub package_type: Option<PackageType>,
    pub delivery_speed: DeliverySpeed,
    pub service_tier: ServiceTier,
    pub weight_kg: Option<f64>,
    pub length_cm: Option<f64>,
    pub width_cm: Option<f64>,
    pub height_cm: Option<f64>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub destination_country: Option<String>,
    pub options: ShipmentOptions,
}

impl PricingInput {
    pub fn from_form(form: &ShipmentForm) -> Self {
        Self {
            package_type: form.package.package_type,
            delivery_speed: form.delivery_speed,
            service_tier: form.service_tier,
            weight_kg: form.package.weight_kg,
            length_cm: form.package.length_cm,
            width_cm: form.package.width_cm,
            height_cm: form.package.height_cm,
            origin: non_blank(&form.sender.city),
            destination: non_blank(&form.recipient.city),
            destination_country: form.recipient.country.as_deref().and_then(non_blank),
            options: form.options,
        }
    }

    /// Declared weight, or 0 when unset or not a positive number.
    pub fn declared_weight(&self) -> f64 {
        self.weight_kg.filter(|w| w.is_finite() && *w > 0.0).unwrap_or(0.0)
    }

    /// L×W×H / 6000, or 0 when any dimension is missing.
    pub fn volumetric_weight(&self) -> f64 {
        match (self.length_cm, self.width_cm, self.height_cm) {
            (Some(l), Some(w), Some(h)) if [l, w, h].iter().all(|d| d.is_finite() && *d > 0.0) => {
                l * w * h / VOLUMETRIC_DIVISOR
            }
            _ => 0.0,
        }
    }

    pub fn chargeable_weight(&self, volumetric: bool) -> f64 {
        if volumetric {
            self.declared_weight().max(self.volumetric_weight())
        } else {
            self.declared_weight()
        }
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn round_fcfa(value: f64) -> i64 {
    if value.is_finite() {
        value.round() as i64
    } else {
        0
    }
}

/// Charge for the region of `country`; a region name is accepted as well.
/// Unknown or missing countries pay `INTERNATIONAL_ZONE_CHARGE`.
pub fn international_zone_charge(country: Option<&str>) -> i64 {
    let Some(country) = country else {
        return INTERNATIONAL_ZONE_CHARGE;
    };

    INTERNATIONAL_REGIONS
        .iter()
        .find(|(region, _, countries)| {
            same_name(region, country) || countries.iter().any(|c| same_name(c, country))
        })
        .map(|(_, price, _)| *price)
        .unwrap_or(INTERNATIONAL_ZONE_CHARGE)
}

fn same_name(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MultiplierTable {
    pub economy: f64,
    pub standard: f64,
    pub express: f64,
    pub premium: f64,
}

impl MultiplierTable {
    /// Speed scaling of the national flat tariff.
    pub fn national() -> Self {
        Self {
            economy: 0.8,
            standard: 1.0,
            express: 1.5,
            premium: 2.5,
        }
    }

    /// Service multipliers of the multi-factor calculator.
    pub fn service() -> Self {
        Self {
            economy: 1.0,
            standard: 1.2,
            express: 1.8,
            premium: 2.5,
        }
    }

    pub fn from_preset(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "national" => Some(Self::national()),
            "service" => Some(Self::service()),
            _ => None,
        }
    }

    /// Multiplier for `speed`, clamped to `MIN_MULTIPLIER..=MAX_MULTIPLIER`
    /// so a hand-built table can never drive a total below zero.
    pub fn for_speed(&self, speed: DeliverySpeed) -> f64 {
        let raw = match speed {
            DeliverySpeed::Economy => self.economy,
            DeliverySpeed::Standard => self.standard,
            DeliverySpeed::Express => self.express,
            DeliverySpeed::Premium => self.premium,
        };
        if raw.is_finite() {
            raw.clamp(MIN_MULTIPLIER, MAX_MULTIPLIER)
        } else {
            1.0
        }
    }

    pub fn values(&self) -> [(&'static str, f64); 4] {
        [
            ("economy", self.economy),
            ("standard", self.standard),
            ("express", self.express),
            ("premium", self.premium),
        ]
    }
}

/// Flat tariff used by the national shipping flow.
#[derive(Debug, Clone)]
pub struct NationalTariff {
    pub multipliers: MultiplierTable,
    pub volumetric: bool,
}

impl Default for NationalTariff {
    fn default() -> Self {
        Self {
            multipliers: MultiplierTable::national(),
            volumetric: false,
        }
    }
}

impl NationalTariff {
    pub fn base_price(package_type: Option<PackageType>) -> i64 {
        match package_type {
            Some(PackageType::Document) => 1_000,
            Some(PackageType::Small) => 2_000,
            Some(PackageType::Medium) => 3_500,
            Some(PackageType::Large) => 5_000,
            Some(PackageType::Fragile) => 4_000,
            Some(PackageType::Electronics) => 4_500,
            Some(PackageType::Other) | None => 2_500,
        }
    }

    pub fn zone_charge(input: &PricingInput) -> i64 {
        if input.service_tier == ServiceTier::International {
            return international_zone_charge(input.destination_country.as_deref());
        }

        match (input.origin.as_deref(), input.destination.as_deref()) {
            (_, None) => 0,
            (Some(origin), Some(destination)) if same_name(origin, destination) => 0,
            (_, Some(destination)) => NATIONAL_ZONES
                .iter()
                .find(|(city, _)| same_name(city, destination))
                .map(|(_, price)| *price)
                .unwrap_or(DEFAULT_ZONE_CHARGE),
        }
    }
}

impl PricingStrategy for NationalTariff {
    fn name(&self) -> &'static str {
        "nationalTariff"
    }

    fn calculate(&self, input: &PricingInput) -> PriceBreakdown {
        let base_price = Self::base_price(input.package_type);
        let multiplier = self.multipliers.for_speed(input.delivery_speed);
        let service_charge = round_fcfa(base_price as f64 * (multiplier - 1.0));

        let chargeable_weight_kg = input.chargeable_weight(self.volumetric);
        let weight_charge = round_fcfa(chargeable_weight_kg * PER_KG_RATE);
        let zone_charge = Self::zone_charge(input);

        let subtotal = base_price + service_charge + weight_charge + zone_charge;
        let insurance = if input.options.insurance {
            round_fcfa(subtotal as f64 * INSURANCE_RATE)
        } else {
            0
        };

        PriceBreakdown {
            strategy: self.name().to_string(),
            base_price,
            weight_charge,
            zone_charge,
            service_charge,
            options_charge: 0,
            insurance,
            total: subtotal + insurance,
            chargeable_weight_kg,
            estimated_delivery_days: input.delivery_speed.estimated_days(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptionSurcharges {
    pub insurance: i64,
    pub fragile: i64,
    pub signature: i64,
    pub express: i64,
}

impl Default for OptionSurcharges {
    fn default() -> Self {
        Self {
            insurance: 2_000,
            fragile: 1_000,
            signature: 1_500,
            express: 3_000,
        }
    }
}

impl OptionSurcharges {
    pub fn total_for(&self, options: &ShipmentOptions) -> i64 {
        [
            (options.insurance, self.insurance),
            (options.fragile, self.fragile),
            (options.signature, self.signature),
            (options.express, self.express),
        ]
        .iter()
        .filter(|(enabled, _)| *enabled)
        .map(|(_, amount)| amount)
        .sum()
    }
}

/// Multi-factor calculator: package, volumetric weight, distance, service level, options.
#[derive(Debug, Clone)]
pub struct GenericCalculator {
    pub multipliers: MultiplierTable,
    pub volumetric: bool,
    pub per_km_rate: f64,
    pub surcharges: OptionSurcharges,
}

impl Default for GenericCalculator {
    fn default() -> Self {
        Self {
            multipliers: MultiplierTable::service(),
            volumetric: true,
            per_km_rate: 100.0,
            surcharges: OptionSurcharges::default(),
        }
    }
}

impl GenericCalculator {
    pub fn base_price(package_type: Option<PackageType>) -> i64 {
        match package_type {
            Some(PackageType::Document) => 1_500,
            Some(PackageType::Small) => 2_500,
            Some(PackageType::Medium) => 3_500,
            Some(PackageType::Large) => 5_000,
            Some(PackageType::Fragile) => 4_000,
            Some(PackageType::Electronics) => 4_500,
            Some(PackageType::Other) | None => 2_500,
        }
    }

    /// Estimated road distance in km from the positions in the city list.
    pub fn distance_km(origin: Option<&str>, destination: Option<&str>) -> f64 {
        let (Some(origin), Some(destination)) = (origin, destination) else {
            return 0.0;
        };

        let position = |name: &str| CALCULATOR_CITIES.iter().position(|c| same_name(c, name));
        match (position(origin), position(destination)) {
            (Some(from), Some(to)) => (from.abs_diff(to) * 50 + 50) as f64,
            _ => 100.0,
        }
    }
}

impl PricingStrategy for GenericCalculator {
    fn name(&self) -> &'static str {
        "genericCalculator"
    }

    fn calculate(&self, input: &PricingInput) -> PriceBreakdown {
        let base_price = Self::base_price(input.package_type);

        let chargeable_weight_kg = input.chargeable_weight(self.volumetric);
        let weight_charge = round_fcfa(chargeable_weight_kg * PER_KG_RATE);

        let distance = Self::distance_km(input.origin.as_deref(), input.destination.as_deref());
        let zone_charge = round_fcfa(distance * self.per_km_rate);

        let multiplier = self.multipliers.for_speed(input.delivery_speed);
        let service_charge =
            round_fcfa((base_price + weight_charge + zone_charge) as f64 * (multiplier - 1.0));

        let options_charge = self.surcharges.total_for(&input.options);

        PriceBreakdown {
            strategy: self.name().to_string(),
            base_price,
            weight_charge,
            zone_charge,
            service_charge,
            options_charge,
            insurance: 0,
            total: base_price + weight_charge + zone_charge + service_charge + options_charge,
            chargeable_weight_kg,
            estimated_delivery_days: input.delivery_speed.estimated_days(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    #[default]
    National,
    Generic,
}

impl StrategyKind {
    /// Builds the strategy; `None` keeps the strategy's own defaults.
    pub fn build(
        self,
        multipliers: Option<MultiplierTable>,
        volumetric: Option<bool>,
    ) -> Arc<dyn PricingStrategy> {
        match self {
            StrategyKind::National => {
                let mut tariff = NationalTariff::default();
                if let Some(table) = multipliers {
                    tariff.multipliers = table;
                }
                if let Some(volumetric) = volumetric {
                    tariff.volumetric = volumetric;
                }
                Arc::new(tariff)
            }
            StrategyKind::Generic => {
                let mut calculator = GenericCalculator::default();
                if let Some(table) = multipliers {
                    calculator.multipliers = table;
                }
                if let Some(volumetric) = volumetric {
                    calculator.volumetric = volumetric;
                }
                Arc::new(calculator)
            }
        }
    }
}
