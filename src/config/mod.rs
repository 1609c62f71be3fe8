pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use crate::domain::model::PaymentMethod;
#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "colis-checkout")]
#[command(about = "Quote, pay for and track a national parcel shipment")]
pub struct CliArgs {
    #[arg(short, long, default_value = "colis.toml", help = "Path to the checkout TOML file")]
    pub config: String,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[arg(long, help = "Print the price breakdown and stop before payment")]
    pub quote_only: bool,

    #[arg(long, help = "Payment method (mtn or airtel), overrides [payment].method")]
    pub method: Option<PaymentMethod>,

    #[arg(long, help = "Mobile money number, overrides [payment].phone")]
    pub phone: Option<String>,
}
