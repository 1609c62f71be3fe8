pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliArgs;

pub use adapters::HttpPaymentGateway;
pub use app::checkout::CheckoutSession;
pub use app::receipt::{ReceiptView, TrackingNumberCode};
pub use config::{cli::LocalReceiptStore, toml_config::CheckoutConfig};
pub use core::wizard::{Wizard, WizardAction, WizardPhase, WizardState};
pub use utils::error::{CheckoutError, Result};
