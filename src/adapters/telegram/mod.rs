//! Telegram Bot API adapter (teloxide).
//!
//! Outgoing calls go through `TeloxideTransport`; incoming updates are
//! decoded by `mapper` and dispatched by `dispatcher::run`.

pub mod client;
pub mod dispatcher;
pub mod mapper;

pub use client::TeloxideTransport;
