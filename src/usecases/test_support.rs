//! Recording chat transport for use case tests.

use crate::domain::{Attachment, ChatIdentity, DomainError, Menu, MessageRef};
use crate::ports::ChatTransport;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Text {
        chat: ChatIdentity,
        text: String,
        attachment: Option<Attachment>,
    },
    EditText {
        chat: ChatIdentity,
        message: MessageRef,
        text: String,
        menu: Option<Menu>,
    },
    EditMenu {
        chat: ChatIdentity,
        message: MessageRef,
        menu: Menu,
    },
    Delete {
        chat: ChatIdentity,
        message: MessageRef,
    },
    Answer {
        callback_id: String,
        notice: Option<String>,
        alert: bool,
    },
    Typing {
        chat: ChatIdentity,
    },
}

pub struct RecordingTransport {
    sent: Mutex<Vec<Sent>>,
    next_id: AtomicI32,
    failing_chat: Option<ChatIdentity>,
    fail_edits: AtomicBool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            next_id: AtomicI32::new(100),
            failing_chat: None,
            fail_edits: AtomicBool::new(false),
        }
    }

    /// Every send to `chat` fails.
    pub fn failing_for(chat: ChatIdentity) -> Self {
        Self {
            failing_chat: Some(chat),
            ..Self::new()
        }
    }

    /// Make menu edits fail from now on.
    pub fn fail_edits(&self) {
        self.fail_edits.store(true, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    /// Texts of plain sends to `chat`, in order.
    pub fn texts(&self, chat: ChatIdentity) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Text { chat: c, text, .. } if c == chat => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn last_text(&self, chat: ChatIdentity) -> Option<String> {
        self.texts(chat).pop()
    }

    pub fn answers(&self) -> Vec<(Option<String>, bool)> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Answer { notice, alert, .. } => Some((notice, alert)),
                _ => None,
            })
            .collect()
    }

    fn push(&self, entry: Sent) {
        self.sent.lock().unwrap().push(entry);
    }
}

#[async_trait::async_trait]
impl ChatTransport for RecordingTransport {
    async fn send_text(
        &self,
        chat: ChatIdentity,
        text: &str,
        attachment: Option<&Attachment>,
    ) -> Result<MessageRef, DomainError> {
        if self.failing_chat == Some(chat) {
            return Err(DomainError::Transport(format!("chat {chat} unreachable")));
        }
        self.push(Sent::Text {
            chat,
            text: text.to_string(),
            attachment: attachment.cloned(),
        });
        Ok(MessageRef(self.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    async fn edit_text(
        &self,
        chat: ChatIdentity,
        message: MessageRef,
        text: &str,
        menu: Option<&Menu>,
    ) -> Result<(), DomainError> {
        self.push(Sent::EditText {
            chat,
            message,
            text: text.to_string(),
            menu: menu.cloned(),
        });
        Ok(())
    }

    async fn edit_menu(
        &self,
        chat: ChatIdentity,
        message: MessageRef,
        menu: &Menu,
    ) -> Result<(), DomainError> {
        if self.fail_edits.load(Ordering::SeqCst) {
            return Err(DomainError::Transport("message can't be edited".into()));
        }
        self.push(Sent::EditMenu {
            chat,
            message,
            menu: menu.clone(),
        });
        Ok(())
    }

    async fn delete_message(
        &self,
        chat: ChatIdentity,
        message: MessageRef,
    ) -> Result<(), DomainError> {
        self.push(Sent::Delete { chat, message });
        Ok(())
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        notice: Option<&str>,
        alert: bool,
    ) -> Result<(), DomainError> {
        self.push(Sent::Answer {
            callback_id: callback_id.to_string(),
            notice: notice.map(String::from),
            alert,
        });
        Ok(())
    }

    async fn send_typing(&self, chat: ChatIdentity) -> Result<(), DomainError> {
        self.push(Sent::Typing { chat });
        Ok(())
    }
}
