//! In-memory implementation of [`BakeryStore`].
//!
//! Mirrors the stored procedures' observable behaviour closely enough to drive
//! conversation flows in tests. Individual operations can be made to fail, and
//! every mutating call is recorded.

use crate::domain::{
    AggregatedStats, ChatIdentity, DailyLog, DateRange, DomainError, ManufacturedUpdate,
    PeriodAggregate, PriceTable, ProfitabilityRank, SalesRank, SalesRecord, WeekdaySales,
};
use crate::ports::BakeryStore;
use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

#[derive(Default)]
struct Tables {
    prices: HashMap<(ChatIdentity, String), f64>,
    logs: BTreeMap<(ChatIdentity, NaiveDate, String), DailyLog>,
    expenses: HashMap<(ChatIdentity, NaiveDate), f64>,
}

pub struct MemoryStore {
    today: NaiveDate,
    tables: Mutex<Tables>,
    failing: Mutex<HashSet<&'static str>>,
    calls: Mutex<Vec<String>>,
}

impl MemoryStore {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            tables: Mutex::new(Tables::default()),
            failing: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Make every later call of `operation` (trait method name) fail.
    pub fn fail_on(&self, operation: &'static str) {
        lock(&self.failing).insert(operation);
    }

    /// Mutating calls so far, formatted as `op(chat, args…)`.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    /// Seed a log row for an arbitrary day.
    pub fn put_log(&self, chat: ChatIdentity, day: NaiveDate, pie_type: &str, log: DailyLog) {
        lock(&self.tables)
            .logs
            .insert((chat, day, pie_type.to_string()), log);
    }

    pub fn put_expenses(&self, chat: ChatIdentity, day: NaiveDate, amount: f64) {
        lock(&self.tables).expenses.insert((chat, day), amount);
    }

    fn check(&self, operation: &'static str) -> Result<(), DomainError> {
        if lock(&self.failing).contains(operation) {
            return Err(DomainError::Store(format!("{operation} unavailable")));
        }
        Ok(())
    }

    fn record(&self, call: String) {
        lock(&self.calls).push(call);
    }

    fn sold(log: &DailyLog) -> i64 {
        match log.remaining {
            Some(remaining) => (log.manufactured - remaining - log.written_off).max(0),
            None => 0,
        }
    }

    fn in_range(
        &self,
        chat: ChatIdentity,
        range: DateRange,
    ) -> Vec<(NaiveDate, String, DailyLog)> {
        lock(&self.tables)
            .logs
            .iter()
            .filter(|((c, day, _), _)| *c == chat && *day >= range.start && *day <= range.end)
            .map(|((_, day, t), log)| (*day, t.clone(), *log))
            .collect()
    }

    fn price_of(&self, chat: ChatIdentity, pie_type: &str) -> f64 {
        lock(&self.tables)
            .prices
            .get(&(chat, pie_type.to_string()))
            .copied()
            .unwrap_or(0.0)
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait::async_trait]
impl BakeryStore for MemoryStore {
    async fn get_prices(&self, chat: ChatIdentity) -> Result<PriceTable, DomainError> {
        self.check("get_prices")?;
        Ok(lock(&self.tables)
            .prices
            .iter()
            .filter(|((c, _), _)| *c == chat)
            .map(|((_, t), p)| (t.clone(), *p))
            .collect())
    }

    async fn set_price(
        &self,
        chat: ChatIdentity,
        pie_type: &str,
        price: f64,
    ) -> Result<(), DomainError> {
        self.check("set_price")?;
        self.record(format!("set_price({chat}, {pie_type}, {price})"));
        lock(&self.tables)
            .prices
            .insert((chat, pie_type.to_string()), price);
        Ok(())
    }

    async fn add_manufactured(
        &self,
        chat: ChatIdentity,
        pie_type: &str,
        quantity: i64,
    ) -> Result<ManufacturedUpdate, DomainError> {
        self.check("add_manufactured")?;
        self.record(format!("add_manufactured({chat}, {pie_type}, {quantity})"));
        let mut tables = lock(&self.tables);
        let log = tables
            .logs
            .entry((chat, self.today, pie_type.to_string()))
            .or_default();
        log.manufactured += quantity;
        let remaining_was_reset = log.remaining.take().is_some();
        Ok(ManufacturedUpdate {
            new_total: log.manufactured,
            remaining_was_reset,
        })
    }

    async fn get_daily_log(
        &self,
        chat: ChatIdentity,
        pie_type: &str,
    ) -> Result<DailyLog, DomainError> {
        self.check("get_daily_log")?;
        Ok(lock(&self.tables)
            .logs
            .get(&(chat, self.today, pie_type.to_string()))
            .copied()
            .unwrap_or_default())
    }

    async fn get_todays_logs(
        &self,
        chat: ChatIdentity,
    ) -> Result<HashMap<String, DailyLog>, DomainError> {
        self.check("get_todays_logs")?;
        Ok(self
            .in_range(chat, DateRange::single_day(self.today))
            .into_iter()
            .map(|(_, t, log)| (t, log))
            .collect())
    }

    async fn set_remaining(
        &self,
        chat: ChatIdentity,
        pie_type: &str,
        quantity: i64,
    ) -> Result<(), DomainError> {
        self.check("set_remaining")?;
        self.record(format!("set_remaining({chat}, {pie_type}, {quantity})"));
        let mut tables = lock(&self.tables);
        let log = tables
            .logs
            .get_mut(&(chat, self.today, pie_type.to_string()))
            .ok_or_else(|| DomainError::Store("no log entry for today".into()))?;
        log.remaining = Some(quantity);
        Ok(())
    }

    async fn add_expense(&self, chat: ChatIdentity, amount: f64) -> Result<f64, DomainError> {
        self.check("add_expense")?;
        self.record(format!("add_expense({chat}, {amount})"));
        let mut tables = lock(&self.tables);
        let total = tables.expenses.entry((chat, self.today)).or_insert(0.0);
        *total += amount;
        Ok(*total)
    }

    async fn write_off(
        &self,
        chat: ChatIdentity,
        pie_type: &str,
        quantity: i64,
    ) -> Result<i64, DomainError> {
        self.check("write_off")?;
        self.record(format!("write_off({chat}, {pie_type}, {quantity})"));
        let mut tables = lock(&self.tables);
        let log = tables
            .logs
            .get_mut(&(chat, self.today, pie_type.to_string()))
            .ok_or_else(|| DomainError::Rejected("Database error.".into()))?;
        if quantity > log.remaining_or_zero() {
            return Err(DomainError::Rejected(
                "Write-off quantity exceeds the remaining stock.".into(),
            ));
        }
        log.remaining = Some(log.remaining_or_zero() - quantity);
        log.written_off += quantity;
        Ok(log.written_off)
    }

    async fn get_aggregated_stats(
        &self,
        chat: ChatIdentity,
        range: DateRange,
    ) -> Result<AggregatedStats, DomainError> {
        self.check("get_aggregated_stats")?;
        let mut stats = AggregatedStats::default();
        for (_, pie_type, log) in self.in_range(chat, range) {
            let entry: &mut PeriodAggregate = stats.per_type.entry(pie_type).or_default();
            entry.manufactured += log.manufactured;
            entry.sold += Self::sold(&log);
            entry.written_off += log.written_off;
        }
        stats.expenses = lock(&self.tables)
            .expenses
            .iter()
            .filter(|((c, day), _)| *c == chat && *day >= range.start && *day <= range.end)
            .map(|(_, amount)| amount)
            .sum();
        Ok(stats)
    }

    async fn get_profitability_ranking(
        &self,
        chat: ChatIdentity,
        range: DateRange,
    ) -> Result<Vec<ProfitabilityRank>, DomainError> {
        self.check("get_profitability_ranking")?;
        let mut totals: BTreeMap<String, f64> = BTreeMap::new();
        for (_, pie_type, log) in self.in_range(chat, range) {
            let price = self.price_of(chat, &pie_type);
            *totals.entry(pie_type).or_default() +=
                (Self::sold(&log) - log.written_off) as f64 * price;
        }
        let mut ranking: Vec<_> = totals
            .into_iter()
            .map(|(pie_type, total_profit)| ProfitabilityRank {
                pie_type,
                total_profit,
            })
            .collect();
        ranking.sort_by(|a, b| b.total_profit.total_cmp(&a.total_profit));
        Ok(ranking)
    }

    async fn get_sales_ranking(
        &self,
        chat: ChatIdentity,
        range: DateRange,
    ) -> Result<Vec<SalesRank>, DomainError> {
        self.check("get_sales_ranking")?;
        let mut totals: BTreeMap<String, i64> = BTreeMap::new();
        for (_, pie_type, log) in self.in_range(chat, range) {
            *totals.entry(pie_type).or_default() += Self::sold(&log);
        }
        let mut ranking: Vec<_> = totals
            .into_iter()
            .map(|(pie_type, total_sold)| SalesRank {
                pie_type,
                total_sold,
            })
            .collect();
        ranking.sort_by(|a, b| b.total_sold.cmp(&a.total_sold));
        Ok(ranking)
    }

    async fn get_weekday_analysis(
        &self,
        chat: ChatIdentity,
        range: DateRange,
    ) -> Result<Vec<WeekdaySales>, DomainError> {
        self.check("get_weekday_analysis")?;
        let mut per_day: BTreeMap<u32, (NaiveDate, i64, HashSet<NaiveDate>)> = BTreeMap::new();
        for (day, _, log) in self.in_range(chat, range) {
            let entry = per_day
                .entry(day.weekday().num_days_from_monday())
                .or_insert((day, 0, HashSet::new()));
            entry.1 += Self::sold(&log);
            entry.2.insert(day);
        }
        Ok(per_day
            .into_values()
            .map(|(day, sold, days)| WeekdaySales {
                weekday: day.format("%A").to_string(),
                avg_sold: sold as f64 / days.len() as f64,
            })
            .collect())
    }

    async fn get_sales_history(
        &self,
        chat: ChatIdentity,
        range: DateRange,
    ) -> Result<Vec<SalesRecord>, DomainError> {
        self.check("get_sales_history")?;
        Ok(self
            .in_range(chat, range)
            .into_iter()
            .filter(|(_, _, log)| log.remaining.is_some())
            .map(|(day, pie_type, log)| SalesRecord {
                log_date: day.format("%Y-%m-%d").to_string(),
                pie_type,
                sold_quantity: Self::sold(&log),
            })
            .collect())
    }
}
