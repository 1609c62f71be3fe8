use crate::core::poller::{PollSettings, DEFAULT_POLL_INTERVAL};
use crate::core::pricing::{MultiplierTable, StrategyKind, MAX_MULTIPLIER, MIN_MULTIPLIER};
use crate::core::validator::ValidationPolicy;
use crate::core::wizard::Wizard;
use crate::core::ConfigProvider;
use crate::domain::model::{PaymentMethod, ShipmentForm};
use crate::utils::error::{CheckoutError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 15;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutConfig {
    pub api: ApiConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub validation: ValidationPolicy,
    #[serde(default)]
    pub receipt: ReceiptConfig,
    pub shipment: Option<ShipmentForm>,
    pub payment: Option<PaymentConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PollingConfig {
    pub interval_ms: Option<u64>,
    /// 未設定時持續輪詢直到確認或取消
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PricingConfig {
    #[serde(default)]
    pub strategy: StrategyKind,
    pub multipliers: Option<MultiplierSetting>,
    pub volumetric: Option<bool>,
}

/// Either a preset name (`"national"`, `"service"`) or an explicit table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MultiplierSetting {
    Preset(String),
    Table(MultiplierTable),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptConfig {
    pub output_path: String,
}

impl Default for ReceiptConfig {
    fn default() -> Self {
        Self {
            output_path: "./receipts".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfig {
    pub method: PaymentMethod,
    pub phone: String,
}

impl CheckoutConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(CheckoutError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| CheckoutError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${COLIS_API_URL})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| CheckoutError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn multipliers(&self) -> Result<Option<MultiplierTable>> {
        match &self.pricing.multipliers {
            None => Ok(None),
            Some(MultiplierSetting::Table(table)) => Ok(Some(*table)),
            Some(MultiplierSetting::Preset(name)) => MultiplierTable::from_preset(name)
                .map(Some)
                .ok_or_else(|| CheckoutError::InvalidConfigValueError {
                    field: "pricing.multipliers".to_string(),
                    value: name.clone(),
                    reason: "Unknown preset. Valid presets: national, service".to_string(),
                }),
        }
    }

    pub fn build_wizard(&self) -> Result<Wizard> {
        let strategy = self
            .pricing
            .strategy
            .build(self.multipliers()?, self.pricing.volumetric);
        Ok(Wizard::new(strategy, self.validation))
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: self.poll_interval(),
            timeout: self.payment_timeout(),
        }
    }
}

impl Validate for CheckoutConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("api.base_url", &self.api.base_url)?;

        if let Some(timeout) = self.api.timeout_seconds {
            validation::validate_positive_number("api.timeout_seconds", timeout, 1)?;
        }
        if let Some(interval) = self.polling.interval_ms {
            validation::validate_positive_number("polling.interval_ms", interval, 1)?;
        }
        if let Some(timeout) = self.polling.timeout_seconds {
            validation::validate_positive_number("polling.timeout_seconds", timeout, 1)?;
        }

        if let Some(table) = self.multipliers()? {
            for (speed, value) in table.values() {
                validation::validate_range(
                    &format!("pricing.multipliers.{}", speed),
                    value,
                    MIN_MULTIPLIER,
                    MAX_MULTIPLIER,
                )?;
            }
        }

        validation::validate_path("receipt.output_path", &self.receipt.output_path)?;

        if let Some(payment) = &self.payment {
            validation::validate_non_empty_string("payment.phone", &payment.phone)?;
        }

        Ok(())
    }
}

impl ConfigProvider for CheckoutConfig {
    fn api_base_url(&self) -> &str {
        &self.api.base_url
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.api
                .timeout_seconds
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECONDS),
        )
    }

    fn poll_interval(&self) -> Duration {
        self.polling
            .interval_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_POLL_INTERVAL)
    }

    fn payment_timeout(&self) -> Option<Duration> {
        self.polling.timeout_seconds.map(Duration::from_secs)
    }

    fn receipt_output_path(&self) -> &str {
        &self.receipt.output_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{DeliverySpeed, PackageType};

    const FULL_CONFIG: &str = r#"
[api]
base_url = "https://api.colis.example.cg"
timeout_seconds = 20

[polling]
interval_ms = 1500
timeout_seconds = 300

[pricing]
strategy = "generic"
multipliers = "service"
volumetric = true

[validation]
require_insurance_for_sensitive = false

[receipt]
output_path = "./out/receipts"

[shipment]
deliverySpeed = "express"

[shipment.sender]
name = "Aline Ngoma"
phone = "066000111"
address = "Avenue Foch"
city = "Brazzaville"

[shipment.recipient]
name = "Paul Mavoungou"
phone = "055000222"
address = "Rue du Port"
city = "Pointe-Noire"

[shipment.package]
type = "small"
description = "Livres"
weightKg = 2.5
lengthCm = 30.0
widthCm = 20.0
heightCm = 10.0

[payment]
method = "airtel"
phone = "055000333"
"#;

    #[test]
    fn test_parse_full_config() {
        let config = CheckoutConfig::from_toml_str(FULL_CONFIG).unwrap();
        assert!(config.validate().is_ok());

        assert_eq!(config.request_timeout(), Duration::from_secs(20));
        assert_eq!(config.poll_interval(), Duration::from_millis(1500));
        assert_eq!(config.payment_timeout(), Some(Duration::from_secs(300)));
        assert_eq!(config.receipt_output_path(), "./out/receipts");
        assert_eq!(config.pricing.strategy, StrategyKind::Generic);
        assert_eq!(config.multipliers().unwrap(), Some(MultiplierTable::service()));
        assert!(!config.validation.require_insurance_for_sensitive);
        assert!(config.validation.enforce_max_weight);

        let shipment = config.shipment.as_ref().unwrap();
        assert_eq!(shipment.delivery_speed, DeliverySpeed::Express);
        assert_eq!(shipment.package.package_type, Some(PackageType::Small));
        assert_eq!(shipment.package.weight_kg, Some(2.5));
        assert_eq!(config.payment.as_ref().unwrap().method, PaymentMethod::Airtel);

        let wizard = config.build_wizard().unwrap();
        assert_eq!(wizard.pricing().name(), "genericCalculator");
    }

    #[test]
    fn test_defaults() {
        let config = CheckoutConfig::from_toml_str(
            r#"
[api]
base_url = "http://localhost:3001"
"#,
        )
        .unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.poll_interval(), Duration::from_secs(3));
        assert_eq!(config.payment_timeout(), None);
        assert_eq!(config.request_timeout(), Duration::from_secs(15));
        assert_eq!(config.receipt_output_path(), "./receipts");
        assert_eq!(config.pricing.strategy, StrategyKind::National);
        assert!(config.validation.require_insurance_for_sensitive);
        assert_eq!(config.build_wizard().unwrap().pricing().name(), "nationalTariff");
    }

    #[test]
    fn test_env_substitution() {
        std::env::set_var("COLIS_CHECKOUT_TEST_URL", "https://staging.colis.example.cg");
        let config = CheckoutConfig::from_toml_str(
            r#"
[api]
base_url = "${COLIS_CHECKOUT_TEST_URL}"
"#,
        )
        .unwrap();
        assert_eq!(config.api.base_url, "https://staging.colis.example.cg");

        // 未定義的變數保留原樣，之後由 URL 驗證擋下
        let config = CheckoutConfig::from_toml_str(
            r#"
[api]
base_url = "${COLIS_CHECKOUT_UNDEFINED_VAR}"
"#,
        )
        .unwrap();
        assert_eq!(config.api.base_url, "${COLIS_CHECKOUT_UNDEFINED_VAR}");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_explicit_multiplier_table() {
        let config = CheckoutConfig::from_toml_str(
            r#"
[api]
base_url = "http://localhost:3001"

[pricing.multipliers]
economy = 0.9
standard = 1.0
express = 1.4
premium = 2.0
"#,
        )
        .unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.multipliers().unwrap().unwrap().express, 1.4);
    }

    #[test]
    fn test_invalid_values() {
        let unknown_preset = CheckoutConfig::from_toml_str(
            r#"
[api]
base_url = "http://localhost:3001"

[pricing]
multipliers = "luxury"
"#,
        )
        .unwrap();
        assert!(unknown_preset.validate().is_err());
        assert!(unknown_preset.build_wizard().is_err());

        let zero_interval = CheckoutConfig::from_toml_str(
            r#"
[api]
base_url = "http://localhost:3001"

[polling]
interval_ms = 0
"#,
        )
        .unwrap();
        assert!(zero_interval.validate().is_err());

        let negative_multiplier = CheckoutConfig::from_toml_str(
            r#"
[api]
base_url = "http://localhost:3001"

[pricing.multipliers]
economy = -1.0
standard = 1.0
express = 1.5
premium = 2.5
"#,
        )
        .unwrap();
        assert!(negative_multiplier.validate().is_err());

        assert!(CheckoutConfig::from_toml_str("[api]\nbase_url = 42").is_err());
    }
}
