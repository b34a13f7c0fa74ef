//! Map between teloxide types and domain events/menus.
//!
//! The pure halves (`*_from_parts`, `menu_to_inline`) carry the logic; the
//! teloxide-typed wrappers only pick fields out of updates.

use crate::domain::{
    Attachment, BotCommand, ChatIdentity, InboundEvent, MainMenuItem, Menu, MessageRef, Selector,
};
use teloxide::types::{
    CallbackQuery, InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup,
    Message, ReplyMarkup,
};

/// Inline keyboard for a menu. An empty menu maps to an empty keyboard.
pub fn menu_to_inline(menu: &Menu) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(menu.rows.iter().map(|row| {
        row.iter()
            .map(|b| InlineKeyboardButton::callback(b.label.clone(), b.selector.encode()))
            .collect::<Vec<_>>()
    }))
}

/// The persistent main-menu reply keyboard.
pub fn main_menu_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(MainMenuItem::LAYOUT.iter().map(|row| {
        row.iter()
            .map(|item| KeyboardButton::new(item.label()))
            .collect::<Vec<_>>()
    }))
    .resize_keyboard()
}

pub fn attachment_to_markup(attachment: &Attachment) -> ReplyMarkup {
    match attachment {
        Attachment::MainMenu => ReplyMarkup::Keyboard(main_menu_keyboard()),
        Attachment::Inline(menu) => ReplyMarkup::InlineKeyboard(menu_to_inline(menu)),
    }
}

/// A text message becomes a command when it parses as one. Other slash
/// commands are dropped so they never reach a pending input flow.
pub fn text_event_from_parts(chat: ChatIdentity, text: &str) -> Option<InboundEvent> {
    match BotCommand::parse(text) {
        Some(command) => Some(InboundEvent::Command { chat, command }),
        None if text.trim_start().starts_with('/') => None,
        None => Some(InboundEvent::TextMessage {
            chat,
            text: text.to_string(),
        }),
    }
}

pub fn callback_event_from_parts(
    chat: ChatIdentity,
    message: MessageRef,
    callback_id: String,
    data: Option<&str>,
) -> InboundEvent {
    InboundEvent::CallbackSelection {
        chat,
        message,
        callback_id,
        selector: data.and_then(Selector::decode),
    }
}

/// `None` for messages without text (stickers, photos, service messages)
/// and for unknown commands.
pub fn message_to_event(msg: &Message) -> Option<InboundEvent> {
    let text = msg.text()?;
    text_event_from_parts(ChatIdentity(msg.chat.id.0), text)
}

/// `None` when the originating message is unknown (inline-mode callbacks).
pub fn callback_to_event(q: &CallbackQuery) -> Option<InboundEvent> {
    let message = q.message.as_ref()?;
    Some(callback_event_from_parts(
        ChatIdentity(message.chat().id.0),
        MessageRef(message.id().0),
        q.id.0.clone(),
        q.data.as_deref(),
    ))
}
