//! Analytics service. Rankings, weekday averages and the production forecast
//! over trailing windows ending today.

use crate::domain::{AnalyticsKind, ChatIdentity, DateRange, DomainError};
use crate::ports::BakeryStore;
use crate::shared::{format_count, format_number};
use crate::usecases::forecast_service::ForecastService;
use chrono::{Duration, NaiveDate};
use std::fmt::Write;
use std::sync::Arc;
use tracing::info;

/// Days covered by rankings and the weekday analysis, today included.
pub const ANALYTICS_WINDOW_DAYS: i64 = 30;
/// Days of sales history handed to the forecast.
pub const FORECAST_HISTORY_DAYS: i64 = 14;

pub const NO_DATA_MESSAGE: &str = "No data for the period.";

/// Trailing window of `days` days ending on `today`.
pub fn trailing_window(today: NaiveDate, days: i64) -> DateRange {
    DateRange::new(today - Duration::days(days - 1), today)
}

/// Notice shown when an analysis could not be produced.
pub fn failure_notice(kind: AnalyticsKind) -> &'static str {
    match kind {
        AnalyticsKind::Forecast => "❌ Could not build the forecast. Please try again later.",
        _ => "❌ Could not load analytics.",
    }
}

pub struct AnalyticsService {
    store: Arc<dyn BakeryStore>,
    forecast: ForecastService,
    currency: String,
}

impl AnalyticsService {
    pub fn new(store: Arc<dyn BakeryStore>, forecast: ForecastService, currency: String) -> Self {
        Self {
            store,
            forecast,
            currency,
        }
    }

    /// Run one analysis and render it as message text.
    pub async fn run(
        &self,
        chat: ChatIdentity,
        kind: AnalyticsKind,
        today: NaiveDate,
    ) -> Result<String, DomainError> {
        info!(chat_id = chat.0, ?kind, "running analytics");
        let window = trailing_window(today, ANALYTICS_WINDOW_DAYS);

        match kind {
            AnalyticsKind::MostProfitable => {
                let rows = self.store.get_profitability_ranking(chat, window).await?;
                Ok(ranked(
                    "🏆 Most profitable pies over the last 30 days:",
                    rows.iter().map(|r| {
                        (
                            r.pie_type.as_str(),
                            format!("{} {}", format_number(r.total_profit), self.currency),
                        )
                    }),
                ))
            }
            AnalyticsKind::MostSold => {
                let rows = self.store.get_sales_ranking(chat, window).await?;
                Ok(ranked(
                    "📈 Best-selling pies over the last 30 days:",
                    rows.iter().map(|r| {
                        (
                            r.pie_type.as_str(),
                            format!("{} pcs", format_count(r.total_sold)),
                        )
                    }),
                ))
            }
            AnalyticsKind::Weekday => {
                let rows = self.store.get_weekday_analysis(chat, window).await?;
                if rows.is_empty() {
                    return Ok(NO_DATA_MESSAGE.to_string());
                }
                let mut out = String::from("📅 Average sales by weekday over the last 30 days:\n");
                for r in &rows {
                    let _ = write!(
                        out,
                        "\n{}: {} pcs",
                        r.weekday.trim(),
                        format_number(r.avg_sold)
                    );
                }
                Ok(out)
            }
            AnalyticsKind::Forecast => {
                let history = trailing_window(today, FORECAST_HISTORY_DAYS);
                let records = self.store.get_sales_history(chat, history).await?;
                self.forecast.forecast(&records).await
            }
        }
    }
}

/// Numbered list under a title, or [`NO_DATA_MESSAGE`] when empty.
fn ranked<'a>(title: &str, rows: impl Iterator<Item = (&'a str, String)>) -> String {
    let mut out = title.to_string();
    let mut any = false;
    for (i, (name, value)) in rows.enumerate() {
        let _ = write!(out, "\n{}. {}: {}", i + 1, name, value);
        any = true;
    }
    if any {
        out
    } else {
        NO_DATA_MESSAGE.to_string()
    }
}
