//! Application configuration. Credentials, allow-list, product catalog, report schedule.

use crate::domain::{DomainError, Selector};
use chrono_tz::Tz;
use serde::Deserialize;
use tracing::warn;

pub const DEFAULT_PIE_TYPES: &[&str] = &["Meat", "Potato", "Sausage roll"];
pub const DEFAULT_CURRENCY_SYMBOL: &str = "sum";
pub const DEFAULT_REPORT_SCHEDULE: &str = "0 20 * * *";
pub const DEFAULT_REPORT_TIMEZONE: &str = "Asia/Tashkent";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
/// Pause between chats in the scheduled broadcast.
pub const DEFAULT_BROADCAST_DELAY_MS: u64 = 500;

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    /// Bot API token. Read from TELEGRAM_BOT_TOKEN.
    pub telegram_bot_token: Option<String>,

    /// PostgREST base URL of the store. Read from SUPABASE_URL.
    pub supabase_url: Option<String>,

    /// Service key for the store. Read from SUPABASE_KEY.
    pub supabase_key: Option<String>,

    /// Comma-separated chat ids allowed to use the bot. Read from ALLOWED_CHAT_IDS.
    #[serde(default)]
    pub allowed_chat_ids: Option<String>,

    // ─────────────────────────────────────────────────────────────────────────
    // Catalog
    // ─────────────────────────────────────────────────────────────────────────
    /// Comma-separated product types, in report order. Read from PIE_TYPES.
    #[serde(default)]
    pub pie_types: Option<String>,

    /// Read from CURRENCY_SYMBOL.
    #[serde(default)]
    pub currency_symbol: Option<String>,

    // ─────────────────────────────────────────────────────────────────────────
    // Scheduled report
    // ─────────────────────────────────────────────────────────────────────────
    /// Cron expression (5 fields). Read from REPORT_SCHEDULE.
    #[serde(default)]
    pub report_schedule: Option<String>,

    /// IANA timezone name. Read from REPORT_TIMEZONE.
    #[serde(default)]
    pub report_timezone: Option<String>,

    /// Milliseconds. Read from BROADCAST_DELAY_MS; kept raw so a bad value
    /// only falls back to the default.
    #[serde(default)]
    pub broadcast_delay_ms: Option<String>,

    // ─────────────────────────────────────────────────────────────────────────
    // Forecast (Gemini)
    // ─────────────────────────────────────────────────────────────────────────
    /// Forecasting is disabled when unset. Read from GEMINI_API_KEY.
    #[serde(default)]
    pub gemini_api_key: Option<String>,

    /// Read from GEMINI_MODEL.
    #[serde(default)]
    pub gemini_model: Option<String>,
}

impl AppConfig {
    /// Process environment plus the optional `BAKERY_CONFIG` file.
    /// `.env` is loaded by the binary before this runs.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::from_env(None)
    }

    /// `vars` replaces the process environment when given.
    fn from_env(vars: Option<config::Map<String, String>>) -> Result<Self, config::ConfigError> {
        let mut c = config::Config::builder();
        c = c.add_source(config::Environment::default().source(vars));
        if let Ok(path) = std::env::var("BAKERY_CONFIG") {
            c = c.add_source(config::File::with_name(&path));
        }
        c.build()?.try_deserialize()
    }

    /// Fails with every missing required variable named.
    pub fn validate(&self) -> Result<(), DomainError> {
        let required = [
            ("TELEGRAM_BOT_TOKEN", &self.telegram_bot_token),
            ("SUPABASE_URL", &self.supabase_url),
            ("SUPABASE_KEY", &self.supabase_key),
            ("ALLOWED_CHAT_IDS", &self.allowed_chat_ids),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.as_deref().is_none_or(|v| v.trim().is_empty()))
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(DomainError::Config(format!(
                "missing required settings: {}",
                missing.join(", ")
            )));
        }
        let pie_types = self.pie_types();
        if pie_types.is_empty() {
            return Err(DomainError::Config("PIE_TYPES lists no product types".into()));
        }
        let too_long: Vec<&str> = pie_types
            .iter()
            .filter(|t| !Selector::for_type(t).iter().all(Selector::fits_callback_data))
            .map(String::as_str)
            .collect();
        if !too_long.is_empty() {
            return Err(DomainError::Config(format!(
                "PIE_TYPES names too long for menu buttons: {}",
                too_long.join(", ")
            )));
        }
        Ok(())
    }

    pub fn telegram_bot_token(&self) -> String {
        self.telegram_bot_token.clone().unwrap_or_default()
    }

    pub fn supabase_url(&self) -> String {
        self.supabase_url.clone().unwrap_or_default()
    }

    pub fn supabase_key(&self) -> String {
        self.supabase_key.clone().unwrap_or_default()
    }

    pub fn allowed_chat_ids(&self) -> &str {
        self.allowed_chat_ids.as_deref().unwrap_or("")
    }

    /// Configured product types in order, or the defaults.
    pub fn pie_types(&self) -> Vec<String> {
        match self.pie_types.as_deref() {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect(),
            None => DEFAULT_PIE_TYPES.iter().map(|t| t.to_string()).collect(),
        }
    }

    pub fn currency_symbol_or_default(&self) -> String {
        self.currency_symbol
            .clone()
            .unwrap_or_else(|| DEFAULT_CURRENCY_SYMBOL.to_string())
    }

    pub fn report_schedule_or_default(&self) -> String {
        self.report_schedule
            .clone()
            .unwrap_or_else(|| DEFAULT_REPORT_SCHEDULE.to_string())
    }

    pub fn report_timezone_or_default(&self) -> String {
        self.report_timezone
            .clone()
            .unwrap_or_else(|| DEFAULT_REPORT_TIMEZONE.to_string())
    }

    /// Parsed report timezone; also used to decide what "today" is.
    pub fn timezone(&self) -> Result<Tz, DomainError> {
        let name = self.report_timezone_or_default();
        name.parse::<Tz>()
            .map_err(|e| DomainError::Config(format!("REPORT_TIMEZONE {name:?}: {e}")))
    }

    pub fn broadcast_delay_ms_or_default(&self) -> u64 {
        let Some(raw) = self.broadcast_delay_ms.as_deref() else {
            return DEFAULT_BROADCAST_DELAY_MS;
        };
        match raw.trim().parse() {
            Ok(ms) => ms,
            Err(_) => {
                warn!(value = %raw, "invalid BROADCAST_DELAY_MS; using default");
                DEFAULT_BROADCAST_DELAY_MS
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Forecast Configuration Helpers
    // ─────────────────────────────────────────────────────────────────────────

    pub fn gemini_api_key(&self) -> Option<String> {
        self.gemini_api_key.clone().filter(|k| !k.trim().is_empty())
    }

    pub fn gemini_model_or_default(&self) -> String {
        self.gemini_model
            .clone()
            .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> AppConfig {
        AppConfig {
            telegram_bot_token: Some("123:abc".into()),
            supabase_url: Some("https://example.supabase.co".into()),
            supabase_key: Some("key".into()),
            allowed_chat_ids: Some("1,2".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_names_missing_settings() {
        let cfg = AppConfig {
            supabase_key: Some("  ".into()),
            ..complete()
        };
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("SUPABASE_KEY"));
        assert!(!err.contains("TELEGRAM_BOT_TOKEN"));

        let err = AppConfig::default().validate().unwrap_err().to_string();
        assert!(err.contains("TELEGRAM_BOT_TOKEN"));
        assert!(err.contains("ALLOWED_CHAT_IDS"));
    }

    #[test]
    fn test_validate_complete_config() {
        assert!(complete().validate().is_ok());
    }

    #[test]
    fn test_defaults() {
        let cfg = complete();
        assert_eq!(cfg.pie_types(), vec!["Meat", "Potato", "Sausage roll"]);
        assert_eq!(cfg.report_schedule_or_default(), "0 20 * * *");
        assert_eq!(cfg.timezone().unwrap(), chrono_tz::Asia::Tashkent);
        assert_eq!(cfg.broadcast_delay_ms_or_default(), 500);
        assert_eq!(cfg.gemini_api_key(), None);
    }

    #[test]
    fn test_pie_types_parsed_in_order() {
        let cfg = AppConfig {
            pie_types: Some(" Cherry , ,Meat".into()),
            ..complete()
        };
        assert_eq!(cfg.pie_types(), vec!["Cherry", "Meat"]);

        let empty = AppConfig {
            pie_types: Some(" , ".into()),
            ..complete()
        };
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_bad_timezone_is_config_error() {
        let cfg = AppConfig {
            report_timezone: Some("Mars/Olympus".into()),
            ..complete()
        };
        assert!(matches!(cfg.timezone(), Err(DomainError::Config(_))));
    }

    fn env(pairs: &[(&str, &str)]) -> config::Map<String, String> {
        let mut vars: config::Map<String, String> = [
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("SUPABASE_URL", "https://example.supabase.co"),
            ("SUPABASE_KEY", "key"),
            ("ALLOWED_CHAT_IDS", "1,2"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        for (k, v) in pairs {
            vars.insert(k.to_string(), v.to_string());
        }
        vars
    }

    #[test]
    fn test_from_env_reads_variables() {
        let cfg = AppConfig::from_env(Some(env(&[("PIE_TYPES", "Cherry,Meat")]))).unwrap();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.supabase_url(), "https://example.supabase.co");
        assert_eq!(cfg.pie_types(), vec!["Cherry", "Meat"]);
    }

    #[test]
    fn test_malformed_broadcast_delay_falls_back() {
        let cfg = AppConfig::from_env(Some(env(&[("BROADCAST_DELAY_MS", "abc")]))).unwrap();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.broadcast_delay_ms_or_default(), DEFAULT_BROADCAST_DELAY_MS);

        let cfg = AppConfig::from_env(Some(env(&[("BROADCAST_DELAY_MS", " 250 ")]))).unwrap();
        assert_eq!(cfg.broadcast_delay_ms_or_default(), 250);
    }

    #[test]
    fn test_type_names_must_fit_callback_data() {
        let long = "Пирожок с капустой и яйцом домашний";
        let cfg = AppConfig {
            pie_types: Some(format!("Meat,{long}")),
            ..complete()
        };
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains(long));
        assert!(!err.contains("Meat"));

        let cfg = AppConfig {
            pie_types: Some("Мясо,Картошка".into()),
            ..complete()
        };
        assert!(cfg.validate().is_ok());
    }
}
