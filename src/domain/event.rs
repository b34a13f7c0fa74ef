//! Inbound chat events, already decoded by the transport adapter.

use crate::domain::entities::{ChatIdentity, MessageRef};
use crate::domain::selector::Selector;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand {
    Start,
    Help,
}

impl BotCommand {
    /// Parses `/start` or `/start@bot_name`. Other commands return `None`.
    pub fn parse(text: &str) -> Option<BotCommand> {
        let word = text.trim().split_whitespace().next()?;
        let name = word.strip_prefix('/')?;
        let name = name.split('@').next().unwrap_or(name);
        match name {
            "start" => Some(BotCommand::Start),
            "help" => Some(BotCommand::Help),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Command {
        chat: ChatIdentity,
        command: BotCommand,
    },
    TextMessage {
        chat: ChatIdentity,
        text: String,
    },
    CallbackSelection {
        chat: ChatIdentity,
        message: MessageRef,
        callback_id: String,
        /// `None` when the callback payload could not be decoded.
        selector: Option<Selector>,
    },
}

impl InboundEvent {
    pub fn chat(&self) -> ChatIdentity {
        match self {
            InboundEvent::Command { chat, .. }
            | InboundEvent::TextMessage { chat, .. }
            | InboundEvent::CallbackSelection { chat, .. } => *chat,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        assert_eq!(BotCommand::parse("/start"), Some(BotCommand::Start));
        assert_eq!(BotCommand::parse("/help@pie_bot"), Some(BotCommand::Help));
        assert_eq!(BotCommand::parse("/unknown"), None);
        assert_eq!(BotCommand::parse("start"), None);
    }
}
