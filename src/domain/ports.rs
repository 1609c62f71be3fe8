use crate::domain::model::{PaymentRequest, PaymentStatus, ShipmentResult};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Where a downloaded receipt ends up.
pub trait ReceiptStore: Send + Sync {
    fn write_receipt(
        &self,
        name: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<String>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn api_base_url(&self) -> &str;
    fn request_timeout(&self) -> Duration;
    fn poll_interval(&self) -> Duration;
    fn payment_timeout(&self) -> Option<Duration>;
    fn receipt_output_path(&self) -> &str;
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// One outbound call, no retry. A rejected payment carries the backend's text.
    async fn initiate(&self, request: &PaymentRequest) -> Result<ShipmentResult>;
    async fn poll_status(&self, tracking_number: &str) -> Result<PaymentStatus>;
}

/// Turns a tracking number into the payload of a scannable code.
pub trait ScanCodeRenderer: Send + Sync {
    fn encode(&self, tracking_number: &str) -> String;
}
