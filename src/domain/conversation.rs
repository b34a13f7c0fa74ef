//! Per-chat conversation state: which text reply the bot is waiting for, plus
//! the scratch values seeded by the selection that started the flow.

use chrono::NaiveDate;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConversationState {
    #[default]
    Idle,
    AwaitingPieQuantity {
        pie_type: String,
    },
    AwaitingRemainingInput {
        pie_type: String,
        manufactured: i64,
    },
    AwaitingWriteOffQuantity {
        pie_type: String,
        remaining: i64,
    },
    AwaitingExpensesInput,
    AwaitingPriceInput {
        pie_type: String,
    },
    AwaitingCustomStartDate,
    AwaitingCustomEndDate {
        start: NaiveDate,
    },
}

impl ConversationState {
    /// Stable action name, used in logs.
    pub fn action(&self) -> &'static str {
        match self {
            ConversationState::Idle => "none",
            ConversationState::AwaitingPieQuantity { .. } => "awaiting_pie_quantity",
            ConversationState::AwaitingRemainingInput { .. } => "awaiting_remaining_input",
            ConversationState::AwaitingWriteOffQuantity { .. } => "awaiting_write_off_quantity",
            ConversationState::AwaitingExpensesInput => "awaiting_expenses_input",
            ConversationState::AwaitingPriceInput { .. } => "awaiting_price_input",
            ConversationState::AwaitingCustomStartDate => "awaiting_custom_start_date",
            ConversationState::AwaitingCustomEndDate { .. } => "awaiting_custom_end_date",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, ConversationState::Idle)
    }
}
