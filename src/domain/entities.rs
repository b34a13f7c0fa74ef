//! Domain entities. Pure data structures for the core business.
//!
//! No Telegram/HTTP types here; adapters map into these.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Identifies one conversation. Key for per-chat state and allow-list checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChatIdentity(pub i64);

impl fmt::Display for ChatIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ChatIdentity {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(ChatIdentity)
    }
}

/// Reference to a message previously sent by the bot (for edits and deletes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRef(pub i32);

/// Unit price per product type. Types without a stored price read as 0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceTable {
    prices: HashMap<String, f64>,
}

impl PriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, pie_type: impl Into<String>, price: f64) {
        self.prices.insert(pie_type.into(), price);
    }

    pub fn price_of(&self, pie_type: &str) -> f64 {
        self.prices.get(pie_type).copied().unwrap_or(0.0)
    }

    /// Whether a positive price has been configured for `pie_type`.
    pub fn is_set(&self, pie_type: &str) -> bool {
        self.price_of(pie_type) > 0.0
    }
}

impl FromIterator<(String, f64)> for PriceTable {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            prices: iter.into_iter().collect(),
        }
    }
}

/// Today's counters for one (chat, type).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DailyLog {
    pub manufactured: i64,
    /// `None` until the remaining count has been entered.
    pub remaining: Option<i64>,
    pub written_off: i64,
}

impl DailyLog {
    pub fn remaining_or_zero(&self) -> i64 {
        self.remaining.unwrap_or(0)
    }
}

/// Result of adding baked pies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManufacturedUpdate {
    pub new_total: i64,
    /// The store cleared an already entered remaining count because production changed.
    pub remaining_was_reset: bool,
}

/// Per-type totals for a period, already aggregated by the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeriodAggregate {
    pub manufactured: i64,
    pub sold: i64,
    pub written_off: i64,
}

/// Raw payload of the period aggregation call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedStats {
    pub per_type: HashMap<String, PeriodAggregate>,
    pub expenses: f64,
}

/// Inclusive date range for reports and analytics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn single_day(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    pub fn is_single_day(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single_day() {
            write!(f, "for {}", self.start.format("%Y-%m-%d"))
        } else {
            write!(
                f,
                "for {} to {}",
                self.start.format("%Y-%m-%d"),
                self.end.format("%Y-%m-%d")
            )
        }
    }
}

/// One day of sales for one type. Input to the forecast service; field names are
/// part of the prompt payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesRecord {
    pub log_date: String,
    pub pie_type: String,
    pub sold_quantity: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfitabilityRank {
    pub pie_type: String,
    pub total_profit: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SalesRank {
    pub pie_type: String,
    pub total_sold: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeekdaySales {
    pub weekday: String,
    pub avg_sold: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_table_defaults_to_zero() {
        let mut prices = PriceTable::new();
        prices.set("Meat", 100.0);
        assert_eq!(prices.price_of("Meat"), 100.0);
        assert_eq!(prices.price_of("Potato"), 0.0);
        assert!(prices.is_set("Meat"));
        assert!(!prices.is_set("Potato"));
    }

    #[test]
    fn test_chat_identity_parse_trims() {
        assert_eq!(" 123 ".parse::<ChatIdentity>().unwrap(), ChatIdentity(123));
        assert!("abc".parse::<ChatIdentity>().is_err());
    }

    #[test]
    fn test_date_range_display() {
        let d = NaiveDate::from_ymd_opt(2024, 8, 9).unwrap();
        let e = NaiveDate::from_ymd_opt(2024, 8, 15).unwrap();
        assert_eq!(DateRange::single_day(d).to_string(), "for 2024-08-09");
        assert_eq!(
            DateRange::new(d, e).to_string(),
            "for 2024-08-09 to 2024-08-15"
        );
    }
}
