//! Scheduled daily report: broadcast today's statistics to every allow-listed chat.
//!
//! Runs as a background task next to the dispatcher and sleeps with
//! tokio::time::sleep between occurrences.

use crate::domain::{ChatIdentity, DateRange, DomainError};
use crate::usecases::report_service::{ReportKind, ReportService};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use croner::Cron;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

pub struct SchedulerService {
    reports: Arc<ReportService>,
    chats: Vec<ChatIdentity>,
    schedule: Cron,
    timezone: Tz,
    /// Pause between two chats of one broadcast.
    delay: Duration,
}

impl SchedulerService {
    /// Fails with [`DomainError::Schedule`] when `pattern` is not a valid cron expression.
    pub fn new(
        reports: Arc<ReportService>,
        chats: Vec<ChatIdentity>,
        pattern: &str,
        timezone: Tz,
        delay: Duration,
    ) -> Result<Self, DomainError> {
        let schedule = pattern
            .parse::<Cron>()
            .map_err(|e| DomainError::Schedule(format!("invalid cron pattern '{pattern}': {e}")))?;
        Ok(Self {
            reports,
            chats,
            schedule,
            timezone,
            delay,
        })
    }

    /// First occurrence strictly after `now`.
    pub fn next_run_after(&self, now: &DateTime<Tz>) -> Result<DateTime<Tz>, DomainError> {
        self.schedule
            .find_next_occurrence(now, false)
            .map_err(|e| DomainError::Schedule(e.to_string()))
    }

    /// Send the report for `day` to every chat, one after another.
    /// A failing chat is logged and skipped. Returns how many chats got a report.
    pub async fn run_once(&self, day: NaiveDate) -> usize {
        let range = DateRange::single_day(day);
        info!(chats = self.chats.len(), period = %range, "sending scheduled reports");

        let mut delivered = 0;
        for (i, &chat) in self.chats.iter().enumerate() {
            if i > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match self
                .reports
                .send_report(chat, range, ReportKind::Scheduled, None)
                .await
            {
                Ok(true) => delivered += 1,
                Ok(false) => warn!(chat_id = chat.0, "scheduled report sent without statistics"),
                Err(e) => warn!(chat_id = chat.0, error = %e, "scheduled report failed"),
            }
        }

        info!(delivered, total = self.chats.len(), "scheduled reports done");
        delivered
    }

    /// Sleep until each occurrence and broadcast. Runs until the process stops.
    pub async fn run_loop(&self) {
        if self.chats.is_empty() {
            warn!("no allow-listed chats; scheduled reports are disabled");
            return;
        }

        loop {
            let now = Utc::now().with_timezone(&self.timezone);
            let next = match self.next_run_after(&now) {
                Ok(next) => next,
                Err(e) => {
                    error!(error = %e, "no next report time; scheduler stopped");
                    return;
                }
            };
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            info!(next = %next, wait_secs = wait.as_secs(), "next scheduled report");
            tokio::time::sleep(wait).await;

            self.run_once(next.date_naive()).await;
        }
    }
}
