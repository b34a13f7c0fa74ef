//! Inbound port. The chat transport adapter calls into the application.

use crate::domain::{DomainError, InboundEvent};

/// Receives decoded chat events, one at a time per chat.
#[async_trait::async_trait]
pub trait EventPort: Send + Sync {
    /// Errors are transport failures only; user mistakes are answered in-chat.
    async fn handle_event(&self, event: InboundEvent) -> Result<(), DomainError>;
}
