//! Transport-neutral menus. The Telegram adapter maps these to keyboards.

use crate::domain::selector::Selector;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuButton {
    pub label: String,
    pub selector: Selector,
}

impl MenuButton {
    pub fn new(label: impl Into<String>, selector: Selector) -> Self {
        Self {
            label: label.into(),
            selector,
        }
    }
}

/// Inline menu: rows of selectable buttons attached to one message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Menu {
    pub rows: Vec<Vec<MenuButton>>,
}

impl Menu {
    /// An empty menu; editing a message to it hides the previous buttons.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn row(mut self, buttons: Vec<MenuButton>) -> Self {
        self.rows.push(buttons);
        self
    }

    pub fn single(self, button: MenuButton) -> Self {
        self.row(vec![button])
    }

    pub fn buttons(&self) -> impl Iterator<Item = &MenuButton> {
        self.rows.iter().flatten()
    }
}

/// What to attach to an outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attachment {
    /// The persistent main-menu keyboard.
    MainMenu,
    Inline(Menu),
}

/// Entries of the persistent main menu. Selected by sending the label as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainMenuItem {
    AddBaked,
    EnterRemaining,
    WriteOff,
    EnterExpenses,
    Statistics,
    Settings,
}

impl MainMenuItem {
    /// Keyboard layout, row by row.
    pub const LAYOUT: &'static [&'static [MainMenuItem]] = &[
        &[MainMenuItem::AddBaked],
        &[MainMenuItem::EnterRemaining, MainMenuItem::WriteOff],
        &[MainMenuItem::EnterExpenses, MainMenuItem::Statistics],
        &[MainMenuItem::Settings],
    ];

    pub fn label(self) -> &'static str {
        match self {
            MainMenuItem::AddBaked => "➕ Add baked pies",
            MainMenuItem::EnterRemaining => "📦 Enter remaining",
            MainMenuItem::WriteOff => "🗑️ Write off",
            MainMenuItem::EnterExpenses => "💰 Enter expenses",
            MainMenuItem::Statistics => "📊 Statistics",
            MainMenuItem::Settings => "🛠 Settings",
        }
    }

    pub fn from_label(text: &str) -> Option<MainMenuItem> {
        let text = text.trim();
        Self::LAYOUT
            .iter()
            .flat_map(|row| row.iter())
            .copied()
            .find(|item| item.label() == text)
    }
}
