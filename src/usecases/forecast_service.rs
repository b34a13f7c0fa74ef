//! Forecast service. Gates the generative forecast on having enough history.

use crate::domain::{DomainError, SalesRecord};
use crate::ports::ForecastPort;
use std::sync::Arc;
use tracing::info;

/// Fewer records than this are answered without calling the forecast service.
pub const MIN_FORECAST_RECORDS: usize = 5;

pub const INSUFFICIENT_DATA_MESSAGE: &str =
    "Not enough data for a forecast. Please collect statistics for at least a few days.";

pub const NOT_CONFIGURED_MESSAGE: &str = "Forecasting is not configured.";

pub struct ForecastService {
    port: Option<Arc<dyn ForecastPort>>,
}

impl ForecastService {
    /// `None` disables forecasting; requests get [`NOT_CONFIGURED_MESSAGE`].
    pub fn new(port: Option<Arc<dyn ForecastPort>>) -> Self {
        Self { port }
    }

    pub async fn forecast(&self, records: &[SalesRecord]) -> Result<String, DomainError> {
        let Some(port) = &self.port else {
            return Ok(NOT_CONFIGURED_MESSAGE.to_string());
        };
        if records.len() < MIN_FORECAST_RECORDS {
            info!(records = records.len(), "not enough history for a forecast");
            return Ok(INSUFFICIENT_DATA_MESSAGE.to_string());
        }
        port.forecast(records).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::MockForecastAdapter;

    fn records(n: usize) -> Vec<SalesRecord> {
        (0..n)
            .map(|i| SalesRecord {
                log_date: format!("2024-08-0{}", i + 1),
                pie_type: "Potato".into(),
                sold_quantity: 18,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_insufficient_data_skips_service() {
        let mock = Arc::new(MockForecastAdapter::new());
        let service = ForecastService::new(Some(mock.clone()));

        let text = service.forecast(&records(4)).await.unwrap();

        assert_eq!(text, INSUFFICIENT_DATA_MESSAGE);
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_enough_data_calls_once_with_records() {
        let mock = Arc::new(MockForecastAdapter::new());
        let service = ForecastService::new(Some(mock.clone()));
        let input = records(5);

        let text = service.forecast(&input).await.unwrap();

        assert!(text.starts_with("Forecast for tomorrow:"));
        assert_eq!(mock.call_count(), 1);
        assert_eq!(mock.last_records(), input);
    }

    #[tokio::test]
    async fn test_disabled() {
        let service = ForecastService::new(None);
        assert_eq!(
            service.forecast(&records(9)).await.unwrap(),
            NOT_CONFIGURED_MESSAGE
        );
    }

    #[tokio::test]
    async fn test_service_failure_propagates() {
        let service = ForecastService::new(Some(Arc::new(MockForecastAdapter::failing())));
        assert!(matches!(
            service.forecast(&records(5)).await,
            Err(DomainError::Forecast(_))
        ));
    }
}
