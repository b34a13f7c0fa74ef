//! Wiring & DI. Entry point: bootstrap adapters, inject into services, run the bot.
//! No business logic here.

use dotenv::dotenv;
use pie_ledger::adapters::ai::GeminiAdapter;
use pie_ledger::adapters::persistence::SupabaseStore;
use pie_ledger::adapters::telegram::{dispatcher, TeloxideTransport};
use pie_ledger::domain::AccessGuard;
use pie_ledger::ports::{BakeryStore, ChatTransport, EventPort, ForecastPort};
use pie_ledger::shared::config::AppConfig;
use pie_ledger::usecases::{
    AnalyticsService, BotService, BotSettings, ForecastService, ReportService, SchedulerService,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use teloxide::Bot;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let env_loaded = dotenv();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &env_loaded {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(_) => info!(cwd = %cwd.display(), "no .env found (check CWD)"),
    }

    let cfg = AppConfig::load().map_err(|e| anyhow::anyhow!("config: {}", e))?;
    if let Err(e) = cfg.validate() {
        anyhow::bail!("{}", e);
    }

    // A bad timezone only disables the schedule; "today" falls back to UTC.
    let timezone = cfg.timezone();
    let tz = match &timezone {
        Ok(tz) => *tz,
        Err(e) => {
            error!(error = %e, "invalid timezone; using UTC for dates");
            chrono_tz::UTC
        }
    };

    let pie_types = cfg.pie_types();
    let currency = cfg.currency_symbol_or_default();
    info!(types = ?pie_types, currency = %currency, timezone = %tz, "bakery settings");

    // --- Adapters ---
    let bot = Bot::new(cfg.telegram_bot_token());
    let transport: Arc<dyn ChatTransport> = Arc::new(TeloxideTransport::new(bot.clone()));
    let store: Arc<dyn BakeryStore> = Arc::new(SupabaseStore::new(
        &cfg.supabase_url(),
        cfg.supabase_key(),
        tz,
    ));

    let forecast_port: Option<Arc<dyn ForecastPort>> = match cfg.gemini_api_key() {
        Some(key) => {
            info!(model = %cfg.gemini_model_or_default(), "forecast enabled with Gemini adapter");
            Some(Arc::new(GeminiAdapter::new(key, cfg.gemini_model_or_default())))
        }
        None => {
            warn!("GEMINI_API_KEY not set; forecasts are disabled");
            None
        }
    };

    // --- Services ---
    let guard = AccessGuard::from_list(cfg.allowed_chat_ids());
    let reports = Arc::new(ReportService::new(
        Arc::clone(&store),
        Arc::clone(&transport),
        pie_types.clone(),
        currency.clone(),
    ));
    let analytics = AnalyticsService::new(
        Arc::clone(&store),
        ForecastService::new(forecast_port),
        currency.clone(),
    );

    match timezone {
        Ok(tz) => {
            let pattern = cfg.report_schedule_or_default();
            let delay = Duration::from_millis(cfg.broadcast_delay_ms_or_default());
            match SchedulerService::new(Arc::clone(&reports), guard.chats(), &pattern, tz, delay) {
                Ok(scheduler) => {
                    info!(schedule = %pattern, timezone = %tz, "scheduled reports enabled");
                    tokio::spawn(async move {
                        scheduler.run_loop().await;
                    });
                }
                Err(e) => error!(error = %e, "scheduled reports disabled"),
            }
        }
        Err(_) => error!("scheduled reports disabled: no valid timezone"),
    }

    let bot_service: Arc<dyn EventPort> = Arc::new(BotService::new(
        store,
        transport,
        reports,
        analytics,
        guard,
        BotSettings {
            pie_types,
            currency,
            timezone: tz,
        },
    ));

    // --- Run until Ctrl-C ---
    dispatcher::run(bot, bot_service).await;
    Ok(())
}
