//! Report service. Turns period statistics into a chat message.
//!
//! Shared by on-demand requests and the scheduled daily broadcast.

use crate::domain::{
    compute_stats, Attachment, ChatIdentity, DateRange, DomainError, Menu, MessageRef, Period,
    PeriodStats,
};
use crate::ports::{BakeryStore, ChatTransport};
use crate::shared::{format_count, format_number};
use chrono::{Datelike, Duration, NaiveDate};
use std::fmt::Write;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    OnDemand,
    Scheduled,
}

/// Date range for a fixed period ending today. `None` for [`Period::Custom`].
pub fn period_range(period: Period, today: NaiveDate) -> Option<DateRange> {
    let start = match period {
        Period::Today => today,
        Period::Week => today - Duration::days(6),
        Period::Month => today.with_day(1).unwrap_or(today),
        Period::Custom => return None,
    };
    Some(DateRange::new(start, today))
}

pub struct ReportService {
    store: Arc<dyn BakeryStore>,
    transport: Arc<dyn ChatTransport>,
    pie_types: Vec<String>,
    currency: String,
}

impl ReportService {
    pub fn new(
        store: Arc<dyn BakeryStore>,
        transport: Arc<dyn ChatTransport>,
        pie_types: Vec<String>,
        currency: String,
    ) -> Self {
        Self {
            store,
            transport,
            pie_types,
            currency,
        }
    }

    /// Fetch prices and aggregates, then compute totals.
    pub async fn load_stats(
        &self,
        chat: ChatIdentity,
        range: DateRange,
    ) -> Result<PeriodStats, DomainError> {
        let prices = self.store.get_prices(chat).await?;
        let aggregates = self.store.get_aggregated_stats(chat, range).await?;
        Ok(compute_stats(range, &prices, &aggregates, &self.pie_types))
    }

    pub fn render(&self, stats: &PeriodStats, kind: ReportKind) -> String {
        let cur = &self.currency;
        let header = match kind {
            ReportKind::OnDemand => "Statistics",
            ReportKind::Scheduled => "Automatic report",
        };

        let mut out = format!("📊 {} {}:\n\n", header, stats.period);
        for p in &stats.products {
            let _ = writeln!(
                out,
                "\"{}\" (price: {} {}):",
                p.pie_type,
                format_number(p.price),
                cur
            );
            let _ = writeln!(out, "- Manufactured: {}", format_count(p.manufactured));
            let _ = writeln!(out, "- Sold: {} pcs", format_count(p.sold));
            if p.written_off > 0 {
                let _ = writeln!(
                    out,
                    "- Written off: {} pcs (loss: {} {})",
                    format_count(p.written_off),
                    format_number(p.loss),
                    cur
                );
            }
            let _ = writeln!(
                out,
                "- Revenue ({}): {} {}.\n",
                p.pie_type,
                format_number(p.revenue),
                cur
            );
        }

        let _ = writeln!(
            out,
            "Total revenue: {} {}.",
            format_number(stats.total_revenue),
            cur
        );
        if stats.loss_from_write_off > 0.0 {
            let _ = writeln!(
                out,
                "🗑️ Write-off losses: {} {}.",
                format_number(stats.loss_from_write_off),
                cur
            );
        }
        let _ = writeln!(
            out,
            "💸 Expenses for the period: {} {}.",
            format_number(stats.expenses),
            cur
        );
        let _ = write!(out, "📈 Net profit: {} {}.", format_number(stats.profit), cur);
        out
    }

    /// Build and send a report with the main menu attached.
    ///
    /// With `loading`, that message is first edited into a progress notice.
    /// Returns `Ok(false)` when the statistics could not be loaded; the chat
    /// then gets a failure notice instead.
    pub async fn send_report(
        &self,
        chat: ChatIdentity,
        range: DateRange,
        kind: ReportKind,
        loading: Option<MessageRef>,
    ) -> Result<bool, DomainError> {
        info!(chat_id = chat.0, period = %range, ?kind, "building report");

        match loading {
            Some(message) => {
                let notice = format!("⏳ Loading statistics {}...", range);
                if let Err(e) = self
                    .transport
                    .edit_text(chat, message, &notice, Some(&Menu::empty()))
                    .await
                {
                    warn!(chat_id = chat.0, error = %e, "could not show loading notice");
                }
            }
            None => {
                if let Err(e) = self.transport.send_typing(chat).await {
                    debug!(chat_id = chat.0, error = %e, "typing indicator failed");
                }
            }
        }

        let stats = match self.load_stats(chat, range).await {
            Ok(stats) => stats,
            Err(e) => {
                warn!(chat_id = chat.0, period = %range, error = %e, "statistics unavailable");
                self.transport
                    .send_text(
                        chat,
                        &format!("❌ Could not load statistics {}.", range),
                        Some(&Attachment::MainMenu),
                    )
                    .await?;
                return Ok(false);
            }
        };

        let text = self.render(&stats, kind);
        self.transport
            .send_text(chat, &text, Some(&Attachment::MainMenu))
            .await?;
        Ok(true)
    }
}
