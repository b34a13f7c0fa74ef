//! Application use cases. Orchestrate domain logic via ports.

pub mod analytics_service;
pub mod bot_service;
pub mod conversation_store;
pub mod forecast_service;
pub mod menus;
pub mod report_service;
pub mod scheduler_service;

#[cfg(test)]
pub mod test_support;

pub use analytics_service::AnalyticsService;
pub use bot_service::{BotService, BotSettings};
pub use conversation_store::ConversationStore;
pub use forecast_service::ForecastService;
pub use report_service::{ReportKind, ReportService};
pub use scheduler_service::SchedulerService;
