//! Per-chat conversation state table.
//!
//! In memory only; a restart drops every pending flow.

use crate::domain::{ChatIdentity, ConversationState};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct ConversationStore {
    states: RwLock<HashMap<ChatIdentity, ConversationState>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state, creating an idle entry on first contact.
    pub async fn get_or_create(&self, chat: ChatIdentity) -> ConversationState {
        if let Some(state) = self.states.read().await.get(&chat) {
            return state.clone();
        }
        self.states.write().await.entry(chat).or_default().clone()
    }

    pub async fn set(&self, chat: ChatIdentity, state: ConversationState) {
        self.states.write().await.insert(chat, state);
    }

    pub async fn reset(&self, chat: ChatIdentity) {
        self.set(chat, ConversationState::Idle).await;
    }

    /// Number of chats seen since start.
    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.states.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lazy_creation_and_reset() {
        let store = ConversationStore::new();
        let chat = ChatIdentity(1);

        assert_eq!(store.get_or_create(chat).await, ConversationState::Idle);
        assert_eq!(store.len().await, 1);

        store
            .set(
                chat,
                ConversationState::AwaitingPriceInput {
                    pie_type: "Meat".into(),
                },
            )
            .await;
        assert_eq!(
            store.get_or_create(chat).await.action(),
            "awaiting_price_input"
        );

        store.reset(chat).await;
        assert!(store.get_or_create(chat).await.is_idle());
    }

    #[tokio::test]
    async fn test_chats_are_independent() {
        let store = ConversationStore::new();
        store
            .set(ChatIdentity(1), ConversationState::AwaitingExpensesInput)
            .await;
        assert!(store.get_or_create(ChatIdentity(2)).await.is_idle());
        assert_eq!(
            store.get_or_create(ChatIdentity(1)).await,
            ConversationState::AwaitingExpensesInput
        );
    }
}
