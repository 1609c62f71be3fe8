use crate::domain::model::{
    PaymentMethod, PaymentRequest, PaymentStatus, ShipmentForm, ShipmentResult,
};
use crate::domain::ports::{ConfigProvider, PaymentGateway};
use crate::utils::error::{CheckoutError, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const INITIATE_PATH: &str = "api/colis-national/initiate-payment";
const SHIPMENT_PATH: &str = "api/colis-national/";
const USER_AGENT: &str = concat!("colis-checkout/", env!("CARGO_PKG_VERSION"));

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InitiatePaymentBody<'a> {
    #[serde(flatten)]
    form: &'a ShipmentForm,
    payment_method: PaymentMethod,
    phone_number: &'a str,
    amount: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitiatePaymentResponse {
    tracking_number: String,
    #[serde(default)]
    estimated_delivery_date: Option<String>,
    #[serde(default)]
    status: Option<PaymentStatus>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: PaymentStatus,
}

/// reqwest client for the `/api/colis-national` endpoints.
#[derive(Debug, Clone)]
pub struct HttpPaymentGateway {
    client: Client,
    base_url: Url,
}

impl HttpPaymentGateway {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut base_url = Url::parse(base_url)?;
        // 沒有結尾斜線時 join 會吃掉最後一段路徑
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &impl ConfigProvider) -> Result<Self> {
        Self::new(config.api_base_url(), config.request_timeout())
    }

    fn shipment_url(&self, tracking_number: &str) -> Result<Url> {
        let mut url = self.base_url.join(SHIPMENT_PATH)?;
        url.path_segments_mut()
            .map_err(|_| CheckoutError::ConfigError {
                message: format!("api.base_url cannot be a base: {}", self.base_url),
            })?
            .pop_if_empty()
            .push(tracking_number);
        Ok(url)
    }
}

/// Accepts `2024-05-01` as well as full RFC 3339 timestamps.
pub fn parse_delivery_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            tracing::warn!("Unrecognised delivery date from backend: {}", raw);
            None
        })
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn initiate(&self, request: &PaymentRequest) -> Result<ShipmentResult> {
        let url = self.base_url.join(INITIATE_PATH)?;
        let body = InitiatePaymentBody {
            form: &request.form,
            payment_method: request.method,
            phone_number: &request.phone_number,
            amount: request.amount,
        };

        tracing::info!(
            "💳 Initiating {} payment of {} FCFA",
            request.method,
            request.amount
        );
        tracing::debug!("POST {}", url);
        let response = self.client.post(url).json(&body).send().await?;
        let status = response.status();
        tracing::debug!("Initiate payment response status: {}", status);

        if !status.is_success() {
            let text = response.text().await?;
            let message = if text.trim().is_empty() {
                format!("HTTP {}", status)
            } else {
                text
            };
            tracing::warn!("❌ Payment initiation rejected ({}): {}", status, message);
            return Err(CheckoutError::PaymentRejected {
                status: status.as_u16(),
                message,
            });
        }

        let payload: InitiatePaymentResponse = response.json().await?;
        tracing::info!("📦 Shipment registered as {}", payload.tracking_number);

        Ok(ShipmentResult::new(
            payload.tracking_number,
            payload
                .estimated_delivery_date
                .as_deref()
                .and_then(parse_delivery_date),
            payload.status.unwrap_or(PaymentStatus::Pending),
        ))
    }

    async fn poll_status(&self, tracking_number: &str) -> Result<PaymentStatus> {
        let url = self.shipment_url(tracking_number)?;
        tracing::debug!("GET {}", url);

        let response = self.client.get(url).send().await?.error_for_status()?;
        let payload: StatusResponse = response.json().await?;
        Ok(payload.status)
    }
}
