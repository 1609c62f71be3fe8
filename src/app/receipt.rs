use crate::core::{PriceBreakdown, ReceiptStore, ScanCodeRenderer, ShipmentResult};
use crate::utils::error::Result;
use std::fmt::Write as _;

pub const DATE_UNKNOWN: &str = "À confirmer";
const DATE_FORMAT: &str = "%d/%m/%Y";

/// Encodes the bare tracking number, which is what counter scanners expect.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrackingNumberCode;

impl ScanCodeRenderer for TrackingNumberCode {
    fn encode(&self, tracking_number: &str) -> String {
        tracking_number.to_string()
    }
}

/// Read-only view over a confirmed shipment.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptView {
    tracking_number: String,
    delivery_date: String,
    scan_code: String,
    status: String,
    price: Option<PriceBreakdown>,
}

impl ReceiptView {
    pub fn new(
        result: &ShipmentResult,
        price: Option<&PriceBreakdown>,
        renderer: &dyn ScanCodeRenderer,
    ) -> Self {
        let delivery_date = result
            .estimated_delivery_date()
            .map(|date| date.format(DATE_FORMAT).to_string())
            .unwrap_or_else(|| DATE_UNKNOWN.to_string());

        Self {
            tracking_number: result.tracking_number().to_string(),
            delivery_date,
            scan_code: renderer.encode(result.tracking_number()),
            status: result.payment_status().to_string(),
            price: price.cloned(),
        }
    }

    pub fn tracking_number(&self) -> &str {
        &self.tracking_number
    }

    pub fn delivery_date(&self) -> &str {
        &self.delivery_date
    }

    pub fn scan_code(&self) -> &str {
        &self.scan_code
    }

    /// Route of the "suivre ce colis" page.
    pub fn tracking_path(&self) -> String {
        format!("/colis/suivi/{}", self.tracking_number)
    }

    pub fn file_name(&self) -> String {
        format!("receipt-{}.txt", self.tracking_number)
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        // write! 到 String 不會失敗
        let _ = writeln!(out, "Reçu d'expédition");
        let _ = writeln!(out, "Numéro de suivi : {}", self.tracking_number);
        let _ = writeln!(out, "Statut          : {}", self.status);
        let _ = writeln!(out, "Livraison prévue: {}", self.delivery_date);

        if let Some(price) = &self.price {
            let _ = writeln!(out);
            let _ = writeln!(out, "Tarif ({})", price.strategy);
            for (label, amount) in [
                ("Prix de base", price.base_price),
                ("Poids", price.weight_charge),
                ("Zone", price.zone_charge),
                ("Service", price.service_charge),
                ("Options", price.options_charge),
                ("Assurance", price.insurance),
            ] {
                if amount != 0 {
                    let _ = writeln!(out, "  {:<14}{:>10} FCFA", label, amount);
                }
            }
            let _ = writeln!(out, "  {:<14}{:>10} FCFA", "Total", price.total);
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "Code: {}", self.scan_code);
        out
    }

    /// Hands the rendered receipt to the store and returns where it landed.
    pub async fn download(&self, store: &impl ReceiptStore) -> Result<String> {
        let location = store
            .write_receipt(&self.file_name(), self.render_text().as_bytes())
            .await?;
        tracing::info!("🧾 Receipt for {} saved to {}", self.tracking_number, location);
        Ok(location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::cli::LocalReceiptStore;
    use crate::domain::model::PaymentStatus;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    struct PrefixedCode;

    impl ScanCodeRenderer for PrefixedCode {
        fn encode(&self, tracking_number: &str) -> String {
            format!("COLIS:{}", tracking_number)
        }
    }

    fn price() -> PriceBreakdown {
        PriceBreakdown {
            strategy: "nationalTariff".to_string(),
            base_price: 1500,
            weight_charge: 0,
            zone_charge: 2500,
            service_charge: 0,
            options_charge: 0,
            insurance: 2325,
            total: 6325,
            chargeable_weight_kg: 1.0,
            estimated_delivery_days: 5,
        }
    }

    #[test]
    fn test_view_formats_date_and_code() {
        let result = ShipmentResult::new(
            "BZV-PNR-000123",
            NaiveDate::from_ymd_opt(2026, 3, 7),
            PaymentStatus::Confirmed,
        );

        let view = ReceiptView::new(&result, None, &PrefixedCode);

        assert_eq!(view.tracking_number(), "BZV-PNR-000123");
        assert_eq!(view.delivery_date(), "07/03/2026");
        assert_eq!(view.scan_code(), "COLIS:BZV-PNR-000123");
        assert_eq!(view.tracking_path(), "/colis/suivi/BZV-PNR-000123");
    }

    #[test]
    fn test_missing_date_is_shown_as_pending() {
        let result = ShipmentResult::new("BZV-001", None, PaymentStatus::Confirmed);
        let view = ReceiptView::new(&result, None, &TrackingNumberCode);

        assert_eq!(view.delivery_date(), DATE_UNKNOWN);
        assert_eq!(view.scan_code(), "BZV-001");
    }

    #[test]
    fn test_render_text_lists_non_zero_components() {
        let result = ShipmentResult::new("BZV-002", None, PaymentStatus::Confirmed);
        let text = ReceiptView::new(&result, Some(&price()), &TrackingNumberCode).render_text();

        assert!(text.contains("Numéro de suivi : BZV-002"));
        assert!(text.contains("Zone"));
        assert!(text.contains("6325 FCFA"));
        assert!(!text.contains("Poids"));
        assert!(text.contains("Livraison prévue: À confirmer"));
    }

    #[tokio::test]
    async fn test_download_writes_receipt_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalReceiptStore::new(temp_dir.path().to_string_lossy().to_string());
        let result = ShipmentResult::new("BZV-003", None, PaymentStatus::Confirmed);
        let view = ReceiptView::new(&result, Some(&price()), &TrackingNumberCode);

        let location = view.download(&store).await.unwrap();

        assert!(location.ends_with("receipt-BZV-003.txt"));
        let content = std::fs::read_to_string(temp_dir.path().join("receipt-BZV-003.txt")).unwrap();
        assert_eq!(content, view.render_text());
    }
}
