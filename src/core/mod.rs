pub mod poller;
pub mod pricing;
pub mod validator;
pub mod wizard;

pub use crate::domain::model::{PriceBreakdown, ShipmentForm, ShipmentResult};
pub use crate::domain::ports::{ConfigProvider, PaymentGateway, ReceiptStore, ScanCodeRenderer};
pub use crate::utils::error::Result;
