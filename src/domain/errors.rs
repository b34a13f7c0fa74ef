//! Domain errors. Used by ports and use cases.
//!
//! Adapters map infrastructure errors into these.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Store error: {0}")]
    Store(String),

    /// The store refused the operation; the message is safe to show to the user.
    #[error("{0}")]
    Rejected(String),

    #[error("Forecast failed: {0}")]
    Forecast(String),

    #[error("Chat transport error: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Schedule error: {0}")]
    Schedule(String),
}
