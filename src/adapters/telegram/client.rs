//! Implements ChatTransport using the teloxide Bot API client.
//!
//! "Message is not modified" answers from edits are treated as success.

use crate::adapters::telegram::mapper;
use crate::domain::{Attachment, ChatIdentity, DomainError, Menu, MessageRef};
use crate::ports::ChatTransport;
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{CallbackQueryId, ChatAction, MessageId};
use teloxide::{ApiError, RequestError};
use tracing::debug;

/// Outgoing Telegram adapter. `Bot` is cheap to clone; the dispatcher holds another handle.
#[derive(Clone)]
pub struct TeloxideTransport {
    bot: Bot,
}

impl TeloxideTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn transport_error(action: &str, e: RequestError) -> DomainError {
    DomainError::Transport(format!("{action}: {e}"))
}

fn not_modified(e: &RequestError) -> bool {
    matches!(e, RequestError::Api(ApiError::MessageNotModified))
}

#[async_trait]
impl ChatTransport for TeloxideTransport {
    async fn send_text(
        &self,
        chat: ChatIdentity,
        text: &str,
        attachment: Option<&Attachment>,
    ) -> Result<MessageRef, DomainError> {
        let mut request = self.bot.send_message(ChatId(chat.0), text);
        if let Some(attachment) = attachment {
            request = request.reply_markup(mapper::attachment_to_markup(attachment));
        }
        let sent = request.await.map_err(|e| transport_error("send message", e))?;
        Ok(MessageRef(sent.id.0))
    }

    async fn edit_text(
        &self,
        chat: ChatIdentity,
        message: MessageRef,
        text: &str,
        menu: Option<&Menu>,
    ) -> Result<(), DomainError> {
        let mut request = self
            .bot
            .edit_message_text(ChatId(chat.0), MessageId(message.0), text);
        if let Some(menu) = menu {
            request = request.reply_markup(mapper::menu_to_inline(menu));
        }
        match request.await {
            Ok(_) => Ok(()),
            Err(e) if not_modified(&e) => {
                debug!(chat_id = chat.0, message_id = message.0, "edit was a no-op");
                Ok(())
            }
            Err(e) => Err(transport_error("edit message", e)),
        }
    }

    async fn edit_menu(
        &self,
        chat: ChatIdentity,
        message: MessageRef,
        menu: &Menu,
    ) -> Result<(), DomainError> {
        let result = self
            .bot
            .edit_message_reply_markup(ChatId(chat.0), MessageId(message.0))
            .reply_markup(mapper::menu_to_inline(menu))
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(e) if not_modified(&e) => Ok(()),
            Err(e) => Err(transport_error("edit menu", e)),
        }
    }

    async fn delete_message(
        &self,
        chat: ChatIdentity,
        message: MessageRef,
    ) -> Result<(), DomainError> {
        self.bot
            .delete_message(ChatId(chat.0), MessageId(message.0))
            .await
            .map_err(|e| transport_error("delete message", e))?;
        Ok(())
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        notice: Option<&str>,
        alert: bool,
    ) -> Result<(), DomainError> {
        let mut request = self
            .bot
            .answer_callback_query(CallbackQueryId(callback_id.to_string()));
        if let Some(notice) = notice {
            request = request.text(notice).show_alert(alert);
        }
        request.await.map_err(|e| transport_error("answer callback", e))?;
        Ok(())
    }

    async fn send_typing(&self, chat: ChatIdentity) -> Result<(), DomainError> {
        self.bot
            .send_chat_action(ChatId(chat.0), ChatAction::Typing)
            .await
            .map_err(|e| transport_error("send typing indicator", e))?;
        Ok(())
    }
}
