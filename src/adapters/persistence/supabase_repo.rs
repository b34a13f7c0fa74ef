//! Supabase (PostgREST) implementation of [`BakeryStore`].
//!
//! Prices live in `chat_settings`, daily counters in `daily_log`; every counter
//! mutation and all period aggregation go through stored procedures under
//! `/rest/v1/rpc/*`. PostgREST may render `numeric` columns as strings, so
//! numeric row fields are decoded with the lenient helpers below.

use crate::domain::{
    AggregatedStats, ChatIdentity, DailyLog, DateRange, DomainError, ManufacturedUpdate,
    PeriodAggregate, PriceTable, ProfitabilityRank, SalesRank, SalesRecord, WeekdaySales,
};
use crate::ports::BakeryStore;
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use reqwest::{Client, RequestBuilder};
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Fragments the write-off procedure uses when the quantity exceeds stock.
const EXCEEDS_REMAINING_MARKERS: &[&str] = &["не может быть больше остатка", "exceed"];

const EXCEEDS_REMAINING_REASON: &str = "Write-off quantity exceeds the remaining stock.";
const DATABASE_ERROR_REASON: &str = "Database error.";

/// User-presentable reason for a write-off the procedure refused.
fn write_off_reason(message: &str) -> &'static str {
    let lowered = message.to_lowercase();
    if EXCEEDS_REMAINING_MARKERS
        .iter()
        .any(|m| lowered.contains(m))
    {
        EXCEEDS_REMAINING_REASON
    } else {
        DATABASE_ERROR_REASON
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row types
// ─────────────────────────────────────────────────────────────────────────────

/// A JSON number or a numeric string.
#[derive(Deserialize)]
#[serde(untagged)]
enum Numeric {
    Number(f64),
    Text(String),
}

impl Numeric {
    fn parse<E: de::Error>(self) -> Result<f64, E> {
        match self {
            Numeric::Number(n) => Ok(n),
            Numeric::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("not a number: {s:?}"))),
        }
    }
}

/// Null reads as 0.
fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    match Option::<Numeric>::deserialize(d)? {
        Some(n) => n.parse(),
        None => Ok(0.0),
    }
}

fn lenient_i64<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    lenient_f64(d).map(|v| v.round() as i64)
}

fn lenient_opt_i64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    match Option::<Numeric>::deserialize(d)? {
        Some(n) => n.parse().map(|v: f64| Some(v.round() as i64)),
        None => Ok(None),
    }
}

#[derive(Debug, Deserialize)]
struct PriceRow {
    pie_type: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    price: f64,
}

#[derive(Debug, Deserialize)]
struct DailyLogRow {
    #[serde(default)]
    pie_type: String,
    #[serde(default, deserialize_with = "lenient_i64")]
    manufactured: i64,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    remaining: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    written_off: i64,
}

impl From<&DailyLogRow> for DailyLog {
    fn from(row: &DailyLogRow) -> Self {
        DailyLog {
            manufactured: row.manufactured,
            remaining: row.remaining,
            written_off: row.written_off,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ManufacturedRow {
    #[serde(default)]
    remaining_reset: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct AggregatedPayload {
    #[serde(default)]
    logs: Option<Vec<AggregateRow>>,
    #[serde(default, deserialize_with = "lenient_f64")]
    expenses: f64,
}

#[derive(Debug, Deserialize)]
struct AggregateRow {
    pie_type: String,
    #[serde(default, deserialize_with = "lenient_i64")]
    total_manufactured: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    total_sold: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    total_written_off: i64,
}

#[derive(Debug, Deserialize)]
struct ProfitRow {
    pie_type: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    total_profit: f64,
}

#[derive(Debug, Deserialize)]
struct SalesRow {
    pie_type: String,
    #[serde(default, deserialize_with = "lenient_i64")]
    total_sold: i64,
}

#[derive(Debug, Deserialize)]
struct WeekdayRow {
    weekday: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    avg_sold: f64,
}

#[derive(Debug, Deserialize)]
struct HistoryRow {
    log_date: String,
    pie_type: String,
    #[serde(default, deserialize_with = "lenient_i64")]
    manufactured: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    remaining: i64,
}

/// A scalar procedure result (running totals).
#[derive(Debug, Deserialize)]
#[serde(transparent)]
struct Scalar(#[serde(deserialize_with = "lenient_f64")] f64);

// ─────────────────────────────────────────────────────────────────────────────
// Adapter
// ─────────────────────────────────────────────────────────────────────────────

/// Why an RPC did not produce a payload.
enum RpcFailure {
    /// Network, status without a PostgREST body, or undecodable response.
    Transport(String),
    /// The procedure raised; PostgREST returned its message.
    Raised(String),
}

impl RpcFailure {
    fn into_store_error(self, operation: &str) -> DomainError {
        match self {
            RpcFailure::Transport(e) | RpcFailure::Raised(e) => {
                DomainError::Store(format!("{operation}: {e}"))
            }
        }
    }
}

/// Procedures return either an array of rows, a single row, or nothing.
fn decode_rows<T: DeserializeOwned>(operation: &str, data: Value) -> Result<Vec<T>, DomainError> {
    let items = match data {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        single => vec![single],
    };
    items
        .into_iter()
        .map(serde_json::from_value)
        .collect::<Result<_, _>>()
        .map_err(|e| DomainError::Store(format!("{operation}: decode: {e}")))
}

fn decode_scalar(operation: &str, data: Value) -> Result<f64, DomainError> {
    if data.is_null() {
        return Err(DomainError::Store(format!("{operation}: returned no total")));
    }
    serde_json::from_value::<Scalar>(data)
        .map(|s| s.0)
        .map_err(|e| DomainError::Store(format!("{operation}: decode: {e}")))
}

fn range_args(chat: ChatIdentity, range: DateRange) -> Value {
    json!({
        "p_chat_id": chat.0,
        "p_start_date": iso(range.start),
        "p_end_date": iso(range.end),
    })
}

fn iso(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

pub struct SupabaseStore {
    client: Client,
    rest_url: String,
    api_key: String,
    /// Timezone that decides which `log_date` is "today".
    tz: Tz,
}

impl SupabaseStore {
    /// # Arguments
    /// * `base_url` - Project URL, e.g. `https://xyz.supabase.co`
    /// * `api_key` - Service or anon key; sent as both `apikey` and bearer token
    /// * `tz` - Timezone for today's `log_date`
    pub fn new(base_url: &str, api_key: String, tz: Tz) -> Self {
        Self {
            client: Client::new(),
            rest_url: format!("{}/rest/v1", base_url.trim_end_matches('/')),
            api_key,
            tz,
        }
    }

    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.tz).date_naive()
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    async fn rpc(&self, name: &str, args: Value) -> Result<Value, RpcFailure> {
        let url = format!("{}/rpc/{}", self.rest_url, name);
        debug!(rpc = name, "calling stored procedure");
        let response = self
            .authorized(self.client.post(&url))
            .json(&args)
            .send()
            .await
            .map_err(|e| RpcFailure::Transport(format!("request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RpcFailure::Transport(format!("read body: {}", e)))?;

        if !status.is_success() {
            warn!(rpc = name, status = %status, body = %body, "stored procedure failed");
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(String::from));
            return Err(match message {
                Some(m) => RpcFailure::Raised(m),
                None => RpcFailure::Transport(format!(
                    "status {}: {}",
                    status,
                    body.chars().take(200).collect::<String>()
                )),
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| RpcFailure::Transport(format!("decode: {}", e)))
    }

    async fn rpc_rows<T: DeserializeOwned>(
        &self,
        name: &str,
        args: Value,
    ) -> Result<Vec<T>, DomainError> {
        let data = self
            .rpc(name, args)
            .await
            .map_err(|f| f.into_store_error(name))?;
        decode_rows(name, data)
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, DomainError> {
        let url = format!("{}/{}", self.rest_url, table);
        let response = self
            .authorized(self.client.get(&url))
            .query(query)
            .send()
            .await
            .map_err(|e| DomainError::Store(format!("select {}: {}", table, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            warn!(table, status = %status, body = %text, "select failed");
            return Err(DomainError::Store(format!(
                "select {}: status {}",
                table, status
            )));
        }

        response
            .json::<Vec<T>>()
            .await
            .map_err(|e| DomainError::Store(format!("select {}: decode: {}", table, e)))
    }
}

#[async_trait::async_trait]
impl BakeryStore for SupabaseStore {
    async fn get_prices(&self, chat: ChatIdentity) -> Result<PriceTable, DomainError> {
        let rows: Vec<PriceRow> = self
            .select(
                "chat_settings",
                &[
                    ("select", "pie_type,price".to_string()),
                    ("chat_id", format!("eq.{}", chat)),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(|r| (r.pie_type, r.price)).collect())
    }

    async fn set_price(
        &self,
        chat: ChatIdentity,
        pie_type: &str,
        price: f64,
    ) -> Result<(), DomainError> {
        let url = format!("{}/chat_settings", self.rest_url);
        let response = self
            .authorized(self.client.post(&url))
            .query(&[("on_conflict", "chat_id,pie_type")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&json!({ "chat_id": chat.0, "pie_type": pie_type, "price": price }))
            .send()
            .await
            .map_err(|e| DomainError::Store(format!("save price: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            warn!(chat_id = chat.0, pie_type, status = %status, body = %text, "save price failed");
            return Err(DomainError::Store(format!("save price: status {}", status)));
        }
        Ok(())
    }

    async fn add_manufactured(
        &self,
        chat: ChatIdentity,
        pie_type: &str,
        quantity: i64,
    ) -> Result<ManufacturedUpdate, DomainError> {
        let rows: Vec<ManufacturedRow> = self
            .rpc_rows(
                "upsert_daily_manufactured",
                json!({ "p_chat_id": chat.0, "p_pie_type": pie_type, "p_add_quantity": quantity }),
            )
            .await?;
        let remaining_was_reset = rows
            .first()
            .and_then(|row| row.remaining_reset)
            .unwrap_or(false);

        // The procedure's own total is not reliable; read the row back.
        let fresh = self.get_daily_log(chat, pie_type).await?;

        Ok(ManufacturedUpdate {
            new_total: fresh.manufactured,
            remaining_was_reset,
        })
    }

    async fn get_daily_log(
        &self,
        chat: ChatIdentity,
        pie_type: &str,
    ) -> Result<DailyLog, DomainError> {
        let rows: Vec<DailyLogRow> = self
            .select(
                "daily_log",
                &[
                    ("select", "manufactured,remaining,written_off".to_string()),
                    ("chat_id", format!("eq.{}", chat)),
                    ("log_date", format!("eq.{}", iso(self.today()))),
                    ("pie_type", format!("eq.{}", pie_type)),
                ],
            )
            .await?;
        Ok(rows.first().map(DailyLog::from).unwrap_or_default())
    }

    async fn get_todays_logs(
        &self,
        chat: ChatIdentity,
    ) -> Result<HashMap<String, DailyLog>, DomainError> {
        let rows: Vec<DailyLogRow> = self
            .select(
                "daily_log",
                &[
                    (
                        "select",
                        "pie_type,manufactured,remaining,written_off".to_string(),
                    ),
                    ("chat_id", format!("eq.{}", chat)),
                    ("log_date", format!("eq.{}", iso(self.today()))),
                ],
            )
            .await?;
        Ok(rows
            .iter()
            .map(|row| (row.pie_type.clone(), DailyLog::from(row)))
            .collect())
    }

    async fn set_remaining(
        &self,
        chat: ChatIdentity,
        pie_type: &str,
        quantity: i64,
    ) -> Result<(), DomainError> {
        let data = self
            .rpc(
                "upsert_daily_remaining",
                json!({
                    "p_chat_id": chat.0,
                    "p_pie_type": pie_type,
                    "p_remaining_quantity": quantity,
                }),
            )
            .await
            .map_err(|f| f.into_store_error("upsert_daily_remaining"))?;
        if data.is_null() {
            return Err(DomainError::Store(
                "upsert_daily_remaining: no log entry for today".into(),
            ));
        }
        Ok(())
    }

    async fn add_expense(&self, chat: ChatIdentity, amount: f64) -> Result<f64, DomainError> {
        let data = self
            .rpc(
                "upsert_daily_expenses",
                json!({ "p_chat_id": chat.0, "p_add_amount": amount }),
            )
            .await
            .map_err(|f| f.into_store_error("upsert_daily_expenses"))?;
        decode_scalar("upsert_daily_expenses", data)
    }

    async fn write_off(
        &self,
        chat: ChatIdentity,
        pie_type: &str,
        quantity: i64,
    ) -> Result<i64, DomainError> {
        let result = self
            .rpc(
                "process_write_off",
                json!({
                    "p_chat_id": chat.0,
                    "p_pie_type": pie_type,
                    "p_quantity_to_write_off": quantity,
                }),
            )
            .await;
        match result {
            Ok(data) => decode_scalar("process_write_off", data).map(|v| v.round() as i64),
            Err(RpcFailure::Raised(message)) => {
                Err(DomainError::Rejected(write_off_reason(&message).to_string()))
            }
            Err(RpcFailure::Transport(e)) => {
                Err(DomainError::Store(format!("process_write_off: {}", e)))
            }
        }
    }

    async fn get_aggregated_stats(
        &self,
        chat: ChatIdentity,
        range: DateRange,
    ) -> Result<AggregatedStats, DomainError> {
        let payload = self
            .rpc_rows::<AggregatedPayload>("get_aggregated_stats", range_args(chat, range))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::Store("get_aggregated_stats: empty result".into()))?;

        let per_type = payload
            .logs
            .unwrap_or_default()
            .into_iter()
            .map(|log| {
                (
                    log.pie_type,
                    PeriodAggregate {
                        manufactured: log.total_manufactured,
                        sold: log.total_sold,
                        written_off: log.total_written_off,
                    },
                )
            })
            .collect();

        Ok(AggregatedStats {
            per_type,
            expenses: payload.expenses,
        })
    }

    async fn get_profitability_ranking(
        &self,
        chat: ChatIdentity,
        range: DateRange,
    ) -> Result<Vec<ProfitabilityRank>, DomainError> {
        let rows: Vec<ProfitRow> = self
            .rpc_rows("get_profitability_ranking", range_args(chat, range))
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| ProfitabilityRank {
                pie_type: r.pie_type,
                total_profit: r.total_profit,
            })
            .collect())
    }

    async fn get_sales_ranking(
        &self,
        chat: ChatIdentity,
        range: DateRange,
    ) -> Result<Vec<SalesRank>, DomainError> {
        let rows: Vec<SalesRow> = self
            .rpc_rows("get_sales_ranking", range_args(chat, range))
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| SalesRank {
                pie_type: r.pie_type,
                total_sold: r.total_sold,
            })
            .collect())
    }

    async fn get_weekday_analysis(
        &self,
        chat: ChatIdentity,
        range: DateRange,
    ) -> Result<Vec<WeekdaySales>, DomainError> {
        let rows: Vec<WeekdayRow> = self
            .rpc_rows("get_weekday_sales_analysis", range_args(chat, range))
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| WeekdaySales {
                weekday: r.weekday,
                avg_sold: r.avg_sold,
            })
            .collect())
    }

    async fn get_sales_history(
        &self,
        chat: ChatIdentity,
        range: DateRange,
    ) -> Result<Vec<SalesRecord>, DomainError> {
        let rows: Vec<HistoryRow> = self
            .select(
                "daily_log",
                &[
                    (
                        "select",
                        "log_date,pie_type,manufactured,remaining".to_string(),
                    ),
                    ("chat_id", format!("eq.{}", chat)),
                    ("log_date", format!("gte.{}", iso(range.start))),
                    ("log_date", format!("lte.{}", iso(range.end))),
                    ("remaining", "not.is.null".to_string()),
                    ("order", "log_date.asc".to_string()),
                ],
            )
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| SalesRecord {
                log_date: r.log_date,
                pie_type: r.pie_type,
                sold_quantity: (r.manufactured - r.remaining).max(0),
            })
            .collect())
    }
}
