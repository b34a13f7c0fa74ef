//! Core domain layer. No external I/O dependencies.
//!
//! Entities and business rules live here. Dependencies flow inward.

pub mod access;
pub mod conversation;
pub mod entities;
pub mod errors;
pub mod event;
pub mod menu;
pub mod selector;
pub mod stats;

pub use access::AccessGuard;
pub use conversation::ConversationState;
pub use entities::{
    AggregatedStats, ChatIdentity, DailyLog, DateRange, ManufacturedUpdate, MessageRef,
    PeriodAggregate, PriceTable, ProfitabilityRank, SalesRank, SalesRecord, WeekdaySales,
};
pub use errors::DomainError;
pub use event::{BotCommand, InboundEvent};
pub use menu::{Attachment, MainMenuItem, Menu, MenuButton};
pub use selector::{AnalyticsKind, Period, Selector};
pub use stats::{compute_stats, PeriodStats, ProductStats};
