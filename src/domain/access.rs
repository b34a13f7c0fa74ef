//! Static allow-list of chats permitted to use the bot.

use crate::domain::entities::ChatIdentity;
use std::fmt::Display;
use tracing::{info, warn};

/// Value shipped in example env files; treated the same as an empty list.
pub const ALLOW_LIST_PLACEHOLDER: &str = "YOUR_ID_1,YOUR_ID_2";

#[derive(Debug, Clone)]
pub struct AccessGuard {
    allowed: Vec<String>,
    configured: bool,
}

impl AccessGuard {
    /// Build from the comma-separated `ALLOWED_CHAT_IDS` value.
    pub fn from_list(raw: &str) -> Self {
        let raw = raw.trim();
        let configured = !raw.is_empty() && raw != ALLOW_LIST_PLACEHOLDER;
        let allowed = raw
            .split(',')
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect();
        Self {
            allowed,
            configured,
        }
    }

    /// Accepts numeric or string identities; both compare as trimmed strings.
    pub fn allowed(&self, chat: impl Display) -> bool {
        if !self.configured {
            warn!("ALLOWED_CHAT_IDS is empty or holds the placeholder; denying access");
            return false;
        }
        let chat = chat.to_string();
        let chat = chat.trim();
        let has_access = self.allowed.iter().any(|id| id == chat);
        if !has_access {
            info!(chat_id = %chat, "access denied: chat is not allow-listed");
        }
        has_access
    }

    /// Allow-listed chats usable as delivery targets. Non-numeric entries are skipped.
    pub fn chats(&self) -> Vec<ChatIdentity> {
        if !self.configured {
            return Vec::new();
        }
        self.allowed
            .iter()
            .filter_map(|id| match id.parse::<ChatIdentity>() {
                Ok(chat) => Some(chat),
                Err(_) => {
                    warn!(id = %id, "allow-list entry is not a numeric chat id; skipping");
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_list_number_and_string_equivalence() {
        let guard = AccessGuard::from_list("123,456,789");
        assert!(guard.allowed(123));
        assert!(guard.allowed(456));
        assert!(!guard.allowed(999));
        assert!(guard.allowed("123"));
        assert!(guard.allowed(ChatIdentity(789)));
    }

    #[test]
    fn test_allow_list_trims_entries() {
        let guard = AccessGuard::from_list(" 123 , 456 ");
        assert!(guard.allowed(456));
        assert!(guard.allowed(" 123"));
    }

    #[test]
    fn test_empty_or_placeholder_denies_everyone() {
        assert!(!AccessGuard::from_list("").allowed(123));
        assert!(!AccessGuard::from_list(ALLOW_LIST_PLACEHOLDER).allowed("YOUR_ID_1"));
        assert!(AccessGuard::from_list(ALLOW_LIST_PLACEHOLDER).chats().is_empty());
    }

    #[test]
    fn test_chats_skips_non_numeric() {
        let guard = AccessGuard::from_list("123,abc,-100200");
        assert_eq!(
            guard.chats(),
            vec![ChatIdentity(123), ChatIdentity(-100200)]
        );
    }
}
