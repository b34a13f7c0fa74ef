//! Mock forecast adapter for testing without API calls.

use crate::domain::{DomainError, SalesRecord};
use crate::ports::ForecastPort;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::info;

/// Returns a canned forecast and remembers what it was asked.
pub struct MockForecastAdapter {
    fail: bool,
    calls: AtomicUsize,
    last_records: Mutex<Vec<SalesRecord>>,
}

impl MockForecastAdapter {
    pub fn new() -> Self {
        Self {
            fail: false,
            calls: AtomicUsize::new(0),
            last_records: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails with [`DomainError::Forecast`].
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_records(&self) -> Vec<SalesRecord> {
        self.last_records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl Default for MockForecastAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ForecastPort for MockForecastAdapter {
    async fn forecast(&self, records: &[SalesRecord]) -> Result<String, DomainError> {
        info!(records = records.len(), "[MOCK] Simulating forecast");
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_records.lock() {
            *last = records.to_vec();
        }

        if self.fail {
            return Err(DomainError::Forecast("[MOCK] service unavailable".into()));
        }

        let total: i64 = records.iter().map(|r| r.sold_quantity).sum();
        Ok(format!(
            "Forecast for tomorrow:\n* [MOCK] {} records, {} pies sold",
            records.len(),
            total
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_adapter() {
        let adapter = MockForecastAdapter::new();
        let records = vec![SalesRecord {
            log_date: "2024-08-01".into(),
            pie_type: "Meat".into(),
            sold_quantity: 7,
        }];

        let text = adapter.forecast(&records).await.unwrap();

        assert!(text.starts_with("Forecast for tomorrow:"));
        assert_eq!(adapter.call_count(), 1);
        assert_eq!(adapter.last_records(), records);
    }

    #[tokio::test]
    async fn test_failing_mock_still_counts() {
        let adapter = MockForecastAdapter::failing();
        assert!(adapter.forecast(&[]).await.is_err());
        assert_eq!(adapter.call_count(), 1);
    }
}
