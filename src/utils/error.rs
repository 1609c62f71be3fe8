use thiserror::Error;

#[derive(Error, Debug)]
pub enum CheckoutError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    /// 後端拒絕付款請求，message 為後端原文
    #[error("{message}")]
    PaymentRejected { status: u16, message: String },

    #[error("A payment request is already in flight")]
    PaymentInFlight,

    #[error("Action '{action}' is not allowed in phase '{phase}'")]
    InvalidTransition { phase: String, action: String },

    #[error("Payment failed: {reason}")]
    PaymentFailed { reason: String },

    #[error("Payment confirmation timed out after {seconds}s")]
    PaymentTimeout { seconds: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
    Payment,
    Workflow,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl CheckoutError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            CheckoutError::ApiError(_) | CheckoutError::UrlError(_) => ErrorCategory::Network,
            CheckoutError::ConfigError { .. }
            | CheckoutError::ConfigValidationError { .. }
            | CheckoutError::InvalidConfigValueError { .. }
            | CheckoutError::MissingConfigError { .. } => ErrorCategory::Configuration,
            CheckoutError::PaymentRejected { .. }
            | CheckoutError::PaymentFailed { .. }
            | CheckoutError::PaymentTimeout { .. } => ErrorCategory::Payment,
            CheckoutError::PaymentInFlight | CheckoutError::InvalidTransition { .. } => {
                ErrorCategory::Workflow
            }
            CheckoutError::IoError(_) | CheckoutError::SerializationError(_) => {
                ErrorCategory::System
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            CheckoutError::PaymentInFlight | CheckoutError::InvalidTransition { .. } => {
                ErrorSeverity::Low
            }
            CheckoutError::ApiError(_)
            | CheckoutError::PaymentRejected { .. }
            | CheckoutError::PaymentTimeout { .. } => ErrorSeverity::Medium,
            CheckoutError::PaymentFailed { .. }
            | CheckoutError::ConfigError { .. }
            | CheckoutError::ConfigValidationError { .. }
            | CheckoutError::InvalidConfigValueError { .. }
            | CheckoutError::MissingConfigError { .. }
            | CheckoutError::UrlError(_) => ErrorSeverity::High,
            CheckoutError::IoError(_) | CheckoutError::SerializationError(_) => {
                ErrorSeverity::Critical
            }
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check the network connection and the api.base_url setting",
            ErrorCategory::Configuration => "Fix the configuration file and run again",
            ErrorCategory::Payment => "Check the phone number and mobile money balance, then retry",
            ErrorCategory::Workflow => "Wait for the current step to finish before retrying",
            ErrorCategory::System => "Check file permissions and available disk space",
        }
    }

    /// 給使用者看的訊息；後端拒絕時原文呈現
    pub fn user_friendly_message(&self) -> String {
        match self {
            CheckoutError::PaymentRejected { message, .. } => message.clone(),
            CheckoutError::ApiError(_) => "Le service est momentanément indisponible".to_string(),
            CheckoutError::PaymentTimeout { .. } => {
                "Le paiement n'a pas été confirmé à temps".to_string()
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CheckoutError>;
