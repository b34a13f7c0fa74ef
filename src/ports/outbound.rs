//! Outbound ports. Application calls into infrastructure.
//!
//! Implemented by adapters. Every call is fallible; "no data" is an empty `Ok`,
//! never an error.

use crate::domain::{
    AggregatedStats, Attachment, ChatIdentity, DailyLog, DateRange, DomainError,
    ManufacturedUpdate, Menu, MessageRef, PriceTable, ProfitabilityRank, SalesRank, SalesRecord,
    WeekdaySales,
};
use std::collections::HashMap;

/// Persistent store for prices, daily logs and expenses. "Today" is resolved by the store.
#[async_trait::async_trait]
pub trait BakeryStore: Send + Sync {
    /// Stored prices for the chat. Missing types read as 0 via [`PriceTable::price_of`].
    async fn get_prices(&self, chat: ChatIdentity) -> Result<PriceTable, DomainError>;

    async fn set_price(
        &self,
        chat: ChatIdentity,
        pie_type: &str,
        price: f64,
    ) -> Result<(), DomainError>;

    /// Add to today's manufactured count.
    async fn add_manufactured(
        &self,
        chat: ChatIdentity,
        pie_type: &str,
        quantity: i64,
    ) -> Result<ManufacturedUpdate, DomainError>;

    /// Today's counters for one type; all-zero with `remaining: None` when absent.
    async fn get_daily_log(
        &self,
        chat: ChatIdentity,
        pie_type: &str,
    ) -> Result<DailyLog, DomainError>;

    /// Today's counters for every type with a log row.
    async fn get_todays_logs(
        &self,
        chat: ChatIdentity,
    ) -> Result<HashMap<String, DailyLog>, DomainError>;

    /// Fails when there is no log row for today to update.
    async fn set_remaining(
        &self,
        chat: ChatIdentity,
        pie_type: &str,
        quantity: i64,
    ) -> Result<(), DomainError>;

    /// Add to today's expenses. Returns the new daily total.
    async fn add_expense(&self, chat: ChatIdentity, amount: f64) -> Result<f64, DomainError>;

    /// Write off unsold stock. Returns today's new written-off total for the type;
    /// [`DomainError::Rejected`] carries a user-presentable reason.
    async fn write_off(
        &self,
        chat: ChatIdentity,
        pie_type: &str,
        quantity: i64,
    ) -> Result<i64, DomainError>;

    async fn get_aggregated_stats(
        &self,
        chat: ChatIdentity,
        range: DateRange,
    ) -> Result<AggregatedStats, DomainError>;

    async fn get_profitability_ranking(
        &self,
        chat: ChatIdentity,
        range: DateRange,
    ) -> Result<Vec<ProfitabilityRank>, DomainError>;

    async fn get_sales_ranking(
        &self,
        chat: ChatIdentity,
        range: DateRange,
    ) -> Result<Vec<SalesRank>, DomainError>;

    async fn get_weekday_analysis(
        &self,
        chat: ChatIdentity,
        range: DateRange,
    ) -> Result<Vec<WeekdaySales>, DomainError>;

    /// Per-day sales for days with an entered remaining count.
    async fn get_sales_history(
        &self,
        chat: ChatIdentity,
        range: DateRange,
    ) -> Result<Vec<SalesRecord>, DomainError>;
}

/// Outgoing side of the chat transport.
#[async_trait::async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_text(
        &self,
        chat: ChatIdentity,
        text: &str,
        attachment: Option<&Attachment>,
    ) -> Result<MessageRef, DomainError>;

    async fn edit_text(
        &self,
        chat: ChatIdentity,
        message: MessageRef,
        text: &str,
        menu: Option<&Menu>,
    ) -> Result<(), DomainError>;

    /// Replace the inline menu of a message. An empty menu hides the buttons.
    async fn edit_menu(
        &self,
        chat: ChatIdentity,
        message: MessageRef,
        menu: &Menu,
    ) -> Result<(), DomainError>;

    async fn delete_message(
        &self,
        chat: ChatIdentity,
        message: MessageRef,
    ) -> Result<(), DomainError>;

    /// Acknowledge a callback, optionally with a toast (`alert = false`) or a modal alert.
    async fn answer_callback(
        &self,
        callback_id: &str,
        notice: Option<&str>,
        alert: bool,
    ) -> Result<(), DomainError>;

    /// Show the "typing…" indicator while a slow answer is prepared.
    async fn send_typing(&self, chat: ChatIdentity) -> Result<(), DomainError>;
}

/// Generative forecast service.
#[async_trait::async_trait]
pub trait ForecastPort: Send + Sync {
    /// Next-day production recommendation as plain text.
    async fn forecast(&self, records: &[SalesRecord]) -> Result<String, DomainError>;
}
