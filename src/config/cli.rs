use crate::core::ReceiptStore;
use crate::utils::error::Result;
use std::fs;
use std::path::Path;

/// Writes receipts under a local directory, creating it on first use.
#[derive(Debug, Clone)]
pub struct LocalReceiptStore {
    base_path: String,
}

impl LocalReceiptStore {
    pub fn new(base_path: String) -> Self {
        Self { base_path }
    }
}

impl ReceiptStore for LocalReceiptStore {
    async fn write_receipt(&self, name: &str, data: &[u8]) -> Result<String> {
        let full_path = Path::new(&self.base_path).join(name);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&full_path, data)?;
        tracing::debug!("Receipt written to {}", full_path.display());
        Ok(full_path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_receipt_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().join("receipts");
        let store = LocalReceiptStore::new(base.to_string_lossy().to_string());

        let written = store
            .write_receipt("receipt-BZV-001.txt", b"Colis BZV-001")
            .await
            .unwrap();

        assert!(written.ends_with("receipt-BZV-001.txt"));
        let content = fs::read_to_string(base.join("receipt-BZV-001.txt")).unwrap();
        assert_eq!(content, "Colis BZV-001");
    }
}
