//! Port traits. API boundaries for the hexagon.
//!
//! - Inbound: Called by the Telegram adapter into the application
//! - Outbound: Called by application into infrastructure

pub mod inbound;
pub mod outbound;

pub use inbound::EventPort;
pub use outbound::{BakeryStore, ChatTransport, ForecastPort};
