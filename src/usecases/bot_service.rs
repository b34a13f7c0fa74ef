//! Bot service. Routes inbound chat events through the access guard and the
//! per-chat conversation state machine.
//!
//! Every flow is one selection followed by at most two text replies. Invalid
//! replies re-prompt and keep the state; a failed store or forecast call
//! resets the chat to idle and shows the main menu again.

use crate::domain::{
    AccessGuard, AnalyticsKind, Attachment, BotCommand, ChatIdentity, ConversationState, DailyLog,
    DateRange, DomainError, InboundEvent, MainMenuItem, Menu, MessageRef, Period, Selector,
};
use crate::ports::{BakeryStore, ChatTransport, EventPort};
use crate::shared::{format_count, format_number, parse_date};
use crate::usecases::analytics_service::{self, AnalyticsService};
use crate::usecases::conversation_store::ConversationStore;
use crate::usecases::menus;
use crate::usecases::report_service::{period_range, ReportKind, ReportService};
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

const ACCESS_DENIED: &str = "⛔ You do not have access to this bot.";
const CALLBACK_ACCESS_DENIED: &str = "⛔ You do not have access.";
const UNKNOWN_ACTION: &str = "Unknown action";
const CHOOSE_ACTION: &str = "Choose an action:";
const SAVE_FAILED: &str = "❌ Could not save.";
const LOAD_FAILED: &str = "❌ Could not load today's data.";
const BAD_COUNT: &str = "❌ Enter a valid number (greater than zero).";
const BAD_DATE: &str = "❌ Invalid format. Enter YYYY-MM-DD:";

const WELCOME: &str = "Hi! I will help you keep track of your pies. Choose an action:";
const HELP: &str = "I keep the bakery's daily books.\n\n\
➕ Add baked pies: record today's production.\n\
📦 Enter remaining: record what is left at the end of the day.\n\
🗑️ Write off: remove unsold stock.\n\
💰 Enter expenses: add to today's expenses.\n\
📊 Statistics: reports for a day, week, month or custom dates, plus analytics.\n\
🛠 Settings: set the price of each pie.\n\n\
A daily report is sent automatically every evening.";

/// Values the bot needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct BotSettings {
    pub pie_types: Vec<String>,
    pub currency: String,
    /// Decides which date is "today" for period reports.
    pub timezone: Tz,
}

/// Answer to a button press, shown as a toast or a modal alert.
struct Ack {
    text: String,
    alert: bool,
}

impl Ack {
    fn toast(text: impl Into<String>) -> Option<Ack> {
        Some(Ack {
            text: text.into(),
            alert: false,
        })
    }

    fn alert(text: impl Into<String>) -> Option<Ack> {
        Some(Ack {
            text: text.into(),
            alert: true,
        })
    }
}

/// Whole number for counts: surrounding whitespace only, no sign games.
fn parse_count(text: &str) -> Option<i64> {
    text.trim().parse::<i64>().ok()
}

/// Non-negative decimal amount; comma or dot as decimal separator.
fn parse_amount(text: &str) -> Option<f64> {
    text.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

pub struct BotService {
    store: Arc<dyn BakeryStore>,
    transport: Arc<dyn ChatTransport>,
    reports: Arc<ReportService>,
    analytics: AnalyticsService,
    conversations: ConversationStore,
    guard: AccessGuard,
    settings: BotSettings,
}

impl BotService {
    pub fn new(
        store: Arc<dyn BakeryStore>,
        transport: Arc<dyn ChatTransport>,
        reports: Arc<ReportService>,
        analytics: AnalyticsService,
        guard: AccessGuard,
        settings: BotSettings,
    ) -> Self {
        Self {
            store,
            transport,
            reports,
            analytics,
            conversations: ConversationStore::new(),
            guard,
            settings,
        }
    }

    pub fn conversations(&self) -> &ConversationStore {
        &self.conversations
    }

    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.settings.timezone).date_naive()
    }

    fn is_known_type(&self, pie_type: &str) -> bool {
        self.settings.pie_types.iter().any(|t| t == pie_type)
    }

    async fn say(&self, chat: ChatIdentity, text: &str) -> Result<(), DomainError> {
        self.transport.send_text(chat, text, None).await.map(|_| ())
    }

    async fn say_with_main_menu(&self, chat: ChatIdentity, text: &str) -> Result<(), DomainError> {
        self.transport
            .send_text(chat, text, Some(&Attachment::MainMenu))
            .await
            .map(|_| ())
    }

    async fn say_with_menu(
        &self,
        chat: ChatIdentity,
        text: &str,
        menu: Menu,
    ) -> Result<(), DomainError> {
        self.transport
            .send_text(chat, text, Some(&Attachment::Inline(menu)))
            .await
            .map(|_| ())
    }

    /// Log a failed external call, drop the pending flow and show `notice` with the main menu.
    async fn upstream_failure(
        &self,
        chat: ChatIdentity,
        operation: &str,
        error: &DomainError,
        notice: &str,
    ) -> Result<(), DomainError> {
        warn!(chat_id = chat.0, operation, error = %error, "upstream call failed");
        self.conversations.reset(chat).await;
        self.say_with_main_menu(chat, notice).await
    }

    /// Remove the buttons from a menu message; delete the message if that fails.
    async fn hide_menu(&self, chat: ChatIdentity, message: MessageRef) {
        if let Err(e) = self.transport.edit_menu(chat, message, &Menu::empty()).await {
            debug!(chat_id = chat.0, error = %e, "could not hide menu, deleting message");
            if let Err(e) = self.transport.delete_message(chat, message).await {
                warn!(chat_id = chat.0, error = %e, "could not delete menu message");
            }
        }
    }

    async fn deny(&self, event: &InboundEvent) -> Result<(), DomainError> {
        match event {
            InboundEvent::CallbackSelection { callback_id, .. } => {
                self.transport
                    .answer_callback(callback_id, Some(CALLBACK_ACCESS_DENIED), true)
                    .await
            }
            _ => self.say(event.chat(), ACCESS_DENIED).await,
        }
    }

    // Commands and main menu

    async fn on_command(&self, chat: ChatIdentity, command: BotCommand) -> Result<(), DomainError> {
        info!(chat_id = chat.0, ?command, "command");
        match command {
            BotCommand::Start => {
                self.conversations.reset(chat).await;
                self.say_with_main_menu(chat, WELCOME).await
            }
            BotCommand::Help => self.say_with_main_menu(chat, HELP).await,
        }
    }

    async fn on_main_menu(
        &self,
        chat: ChatIdentity,
        item: MainMenuItem,
    ) -> Result<(), DomainError> {
        info!(chat_id = chat.0, item = item.label(), "main menu");
        self.conversations.reset(chat).await;
        let types = &self.settings.pie_types;

        match item {
            MainMenuItem::AddBaked => {
                self.say_with_menu(chat, "Which pies did you bake?", menus::pie_types_menu(types))
                    .await
            }
            MainMenuItem::EnterRemaining => match self.store.get_todays_logs(chat).await {
                Ok(logs) => {
                    self.say_with_menu(
                        chat,
                        "Which pie do you want to enter the remaining count for?",
                        menus::remaining_menu(types, &logs),
                    )
                    .await
                }
                Err(e) => {
                    self.upstream_failure(chat, "get_todays_logs", &e, LOAD_FAILED)
                        .await
                }
            },
            MainMenuItem::WriteOff => match self.store.get_todays_logs(chat).await {
                Ok(logs) => {
                    self.say_with_menu(
                        chat,
                        "Choose a product to write off (remaining > 0):",
                        menus::write_off_menu(types, &logs),
                    )
                    .await
                }
                Err(e) => {
                    self.upstream_failure(chat, "get_todays_logs", &e, LOAD_FAILED)
                        .await
                }
            },
            MainMenuItem::EnterExpenses => {
                self.conversations
                    .set(chat, ConversationState::AwaitingExpensesInput)
                    .await;
                self.say(
                    chat,
                    &format!("Enter the expense amount in {}:", self.settings.currency),
                )
                .await
            }
            MainMenuItem::Statistics => {
                self.say_with_menu(
                    chat,
                    "Choose the statistics period:",
                    menus::stats_period_menu(),
                )
                .await
            }
            MainMenuItem::Settings => match self.store.get_prices(chat).await {
                Ok(prices) => {
                    self.say_with_menu(
                        chat,
                        "⚙️ Pie prices:",
                        menus::settings_menu(types, &prices, &self.settings.currency),
                    )
                    .await
                }
                Err(e) => {
                    self.upstream_failure(chat, "get_prices", &e, "❌ Could not load prices.")
                        .await
                }
            },
        }
    }

    // Text replies

    async fn on_text(&self, chat: ChatIdentity, text: &str) -> Result<(), DomainError> {
        if let Some(item) = MainMenuItem::from_label(text.trim()) {
            return self.on_main_menu(chat, item).await;
        }

        let state = self.conversations.get_or_create(chat).await;
        debug!(chat_id = chat.0, action = state.action(), "text reply");

        match state {
            ConversationState::Idle => {
                debug!(chat_id = chat.0, "ignoring text outside a flow");
                Ok(())
            }
            ConversationState::AwaitingPieQuantity { pie_type } => {
                self.complete_pie_quantity(chat, &pie_type, text).await
            }
            ConversationState::AwaitingRemainingInput {
                pie_type,
                manufactured,
            } => self.complete_remaining(chat, &pie_type, manufactured, text).await,
            ConversationState::AwaitingWriteOffQuantity {
                pie_type,
                remaining,
            } => self.complete_write_off(chat, &pie_type, remaining, text).await,
            ConversationState::AwaitingExpensesInput => self.complete_expenses(chat, text).await,
            ConversationState::AwaitingPriceInput { pie_type } => {
                self.complete_price(chat, &pie_type, text).await
            }
            ConversationState::AwaitingCustomStartDate => {
                let Some(start) = parse_date(text.trim()) else {
                    return self.say(chat, BAD_DATE).await;
                };
                self.conversations
                    .set(chat, ConversationState::AwaitingCustomEndDate { start })
                    .await;
                self.say(chat, "✅ Great. Now enter the end date (YYYY-MM-DD):")
                    .await
            }
            ConversationState::AwaitingCustomEndDate { start } => {
                let Some(end) = parse_date(text.trim()) else {
                    return self.say(chat, BAD_DATE).await;
                };
                if end < start {
                    return self
                        .say(chat, "❌ The end date cannot be earlier than the start date.")
                        .await;
                }
                self.conversations.reset(chat).await;
                self.reports
                    .send_report(chat, DateRange::new(start, end), ReportKind::OnDemand, None)
                    .await
                    .map(|_| ())
            }
        }
    }

    async fn complete_pie_quantity(
        &self,
        chat: ChatIdentity,
        pie_type: &str,
        text: &str,
    ) -> Result<(), DomainError> {
        let Some(quantity) = parse_count(text).filter(|q| *q > 0) else {
            return self.say(chat, BAD_COUNT).await;
        };

        match self.store.add_manufactured(chat, pie_type, quantity).await {
            Ok(update) => {
                info!(chat_id = chat.0, pie_type, quantity, total = update.new_total, "pies added");
                self.conversations.reset(chat).await;
                let mut reply = format!(
                    "✅ Added: {} \"{}\".\nTotal today: {}.",
                    format_count(quantity),
                    pie_type,
                    format_count(update.new_total)
                );
                if update.remaining_was_reset {
                    reply.push_str(&format!(
                        "\nℹ️ The remaining count for \"{pie_type}\" was reset. \
                         Enter it again at the end of the day."
                    ));
                }
                self.say_with_main_menu(chat, &reply).await
            }
            Err(e) => {
                self.upstream_failure(chat, "add_manufactured", &e, SAVE_FAILED)
                    .await
            }
        }
    }

    async fn complete_remaining(
        &self,
        chat: ChatIdentity,
        pie_type: &str,
        manufactured: i64,
        text: &str,
    ) -> Result<(), DomainError> {
        let Some(quantity) = parse_count(text).filter(|q| *q >= 0) else {
            return self.say(chat, "❌ Enter a valid number (0 or more).").await;
        };
        if quantity > manufactured {
            return self
                .say(
                    chat,
                    &format!(
                        "❌ The remaining count ({quantity}) cannot exceed \
                         the number baked ({manufactured})."
                    ),
                )
                .await;
        }

        if let Err(e) = self.store.set_remaining(chat, pie_type, quantity).await {
            return self
                .upstream_failure(
                    chat,
                    "set_remaining",
                    &e,
                    "❌ Could not save the remaining count.",
                )
                .await;
        }
        info!(chat_id = chat.0, pie_type, quantity, "remaining recorded");
        self.conversations.reset(chat).await;
        self.say(
            chat,
            &format!(
                "👍 Remaining for \"{}\" recorded: {}.",
                pie_type,
                format_count(quantity)
            ),
        )
        .await?;

        match self.store.get_todays_logs(chat).await {
            Ok(logs) => {
                self.say_with_menu(
                    chat,
                    "Pick the next pie or go back:",
                    menus::remaining_menu(&self.settings.pie_types, &logs),
                )
                .await
            }
            Err(e) => {
                self.upstream_failure(chat, "get_todays_logs", &e, CHOOSE_ACTION)
                    .await
            }
        }
    }

    async fn complete_write_off(
        &self,
        chat: ChatIdentity,
        pie_type: &str,
        remaining: i64,
        text: &str,
    ) -> Result<(), DomainError> {
        let Some(quantity) = parse_count(text).filter(|q| *q > 0) else {
            return self.say(chat, BAD_COUNT).await;
        };
        if quantity > remaining {
            return self
                .say(
                    chat,
                    &format!(
                        "❌ The write-off quantity ({quantity}) cannot exceed \
                         the remaining stock ({remaining}). Try again."
                    ),
                )
                .await;
        }

        match self.store.write_off(chat, pie_type, quantity).await {
            Ok(total) => {
                info!(chat_id = chat.0, pie_type, quantity, total, "stock written off");
                self.conversations.reset(chat).await;
                self.say(
                    chat,
                    &format!(
                        "✅ Wrote off {} pcs of \"{}\".",
                        format_count(quantity),
                        pie_type
                    ),
                )
                .await?;
                match self.store.get_todays_logs(chat).await {
                    Ok(logs) => {
                        self.say_with_menu(
                            chat,
                            "Pick the next product to write off:",
                            menus::write_off_menu(&self.settings.pie_types, &logs),
                        )
                        .await
                    }
                    Err(e) => {
                        self.upstream_failure(chat, "get_todays_logs", &e, CHOOSE_ACTION)
                            .await
                    }
                }
            }
            Err(DomainError::Rejected(reason)) => {
                let notice = format!("❌ Write-off failed: {reason}");
                self.upstream_failure(chat, "write_off", &DomainError::Rejected(reason), &notice)
                    .await
            }
            Err(e) => {
                self.upstream_failure(chat, "write_off", &e, "❌ Write-off failed: Database error.")
                    .await
            }
        }
    }

    async fn complete_expenses(&self, chat: ChatIdentity, text: &str) -> Result<(), DomainError> {
        let Some(amount) = parse_amount(text) else {
            return self.say(chat, "❌ Enter a valid amount.").await;
        };

        match self.store.add_expense(chat, amount).await {
            Ok(total) => {
                info!(chat_id = chat.0, amount, total, "expense added");
                self.conversations.reset(chat).await;
                self.say_with_main_menu(
                    chat,
                    &format!(
                        "✅ Expenses ({}) added. Total for today: {} {}.",
                        format_number(amount),
                        format_number(total),
                        self.settings.currency
                    ),
                )
                .await
            }
            Err(e) => self.upstream_failure(chat, "add_expense", &e, SAVE_FAILED).await,
        }
    }

    async fn complete_price(
        &self,
        chat: ChatIdentity,
        pie_type: &str,
        text: &str,
    ) -> Result<(), DomainError> {
        let Some(price) = parse_amount(text) else {
            return self.say(chat, "❌ Enter a valid price.").await;
        };

        if let Err(e) = self.store.set_price(chat, pie_type, price).await {
            return self.upstream_failure(chat, "set_price", &e, SAVE_FAILED).await;
        }
        info!(chat_id = chat.0, pie_type, price, "price set");
        self.conversations.reset(chat).await;
        self.say(
            chat,
            &format!(
                "✅ Price for \"{}\" set: {} {}.",
                pie_type,
                format_number(price),
                self.settings.currency
            ),
        )
        .await?;

        match self.store.get_prices(chat).await {
            Ok(prices) => {
                self.say_with_menu(
                    chat,
                    "Current prices:",
                    menus::settings_menu(
                        &self.settings.pie_types,
                        &prices,
                        &self.settings.currency,
                    ),
                )
                .await
            }
            Err(e) => self.upstream_failure(chat, "get_prices", &e, CHOOSE_ACTION).await,
        }
    }

    // Button selections

    async fn on_selection(
        &self,
        chat: ChatIdentity,
        message: MessageRef,
        callback_id: &str,
        selector: Option<Selector>,
    ) -> Result<(), DomainError> {
        let outcome = match selector {
            Some(selector) => {
                debug!(chat_id = chat.0, selector = %selector.encode(), "selection");
                self.apply_selection(chat, message, selector).await
            }
            None => {
                warn!(chat_id = chat.0, "unknown callback payload");
                Ok(Ack::toast(UNKNOWN_ACTION))
            }
        };

        let answered = match &outcome {
            Ok(Some(ack)) => {
                self.transport
                    .answer_callback(callback_id, Some(&ack.text), ack.alert)
                    .await
            }
            _ => self.transport.answer_callback(callback_id, None, false).await,
        };
        if let Err(e) = answered {
            warn!(chat_id = chat.0, error = %e, "could not answer callback");
        }
        outcome.map(|_| ())
    }

    async fn apply_selection(
        &self,
        chat: ChatIdentity,
        message: MessageRef,
        selector: Selector,
    ) -> Result<Option<Ack>, DomainError> {
        match selector {
            Selector::AddPie { pie_type }
            | Selector::EnterRemaining { pie_type }
            | Selector::WriteOff { pie_type }
            | Selector::SetPrice { pie_type }
                if !self.is_known_type(&pie_type) =>
            {
                warn!(chat_id = chat.0, pie_type = %pie_type, "selection for unknown pie type");
                Ok(Ack::toast(UNKNOWN_ACTION))
            }
            Selector::AddPie { pie_type } => {
                self.hide_menu(chat, message).await;
                let prompt = format!("How many \"{pie_type}\" pies did you bake?");
                self.conversations
                    .set(chat, ConversationState::AwaitingPieQuantity { pie_type })
                    .await;
                self.say(chat, &prompt).await?;
                Ok(None)
            }
            Selector::EnterRemaining { pie_type } => {
                self.select_remaining(chat, message, pie_type).await
            }
            Selector::WriteOff { pie_type } => self.select_write_off(chat, message, pie_type).await,
            Selector::SetPrice { pie_type } => {
                self.hide_menu(chat, message).await;
                let prompt = format!(
                    "Enter the new price for \"{}\" in {}:",
                    pie_type, self.settings.currency
                );
                self.conversations
                    .set(chat, ConversationState::AwaitingPriceInput { pie_type })
                    .await;
                self.say(chat, &prompt).await?;
                Ok(None)
            }
            Selector::StatsPeriod(Period::Custom) => {
                self.hide_menu(chat, message).await;
                self.conversations
                    .set(chat, ConversationState::AwaitingCustomStartDate)
                    .await;
                self.say(chat, "✍️ Enter the start date of the period (YYYY-MM-DD):")
                    .await?;
                Ok(None)
            }
            Selector::StatsPeriod(period) => {
                self.conversations.reset(chat).await;
                let Some(range) = period_range(period, self.today()) else {
                    return Ok(Ack::toast(UNKNOWN_ACTION));
                };
                self.reports
                    .send_report(chat, range, ReportKind::OnDemand, Some(message))
                    .await?;
                Ok(None)
            }
            Selector::AnalyticsMenu => {
                self.conversations.reset(chat).await;
                self.transport
                    .edit_text(chat, message, "Choose an analysis:", Some(&menus::analytics_menu()))
                    .await?;
                Ok(None)
            }
            Selector::BackToStats => {
                self.conversations.reset(chat).await;
                self.transport
                    .edit_text(
                        chat,
                        message,
                        "Choose the statistics period:",
                        Some(&menus::stats_period_menu()),
                    )
                    .await?;
                Ok(None)
            }
            Selector::Analytics(kind) => {
                self.conversations.reset(chat).await;
                self.run_analytics(chat, kind).await?;
                Ok(None)
            }
            Selector::BackToMain | Selector::Placeholder => {
                if let Err(e) = self.transport.delete_message(chat, message).await {
                    warn!(chat_id = chat.0, error = %e, "could not delete menu message");
                }
                self.conversations.reset(chat).await;
                self.say_with_main_menu(chat, CHOOSE_ACTION).await?;
                Ok(None)
            }
        }
    }

    async fn select_remaining(
        &self,
        chat: ChatIdentity,
        message: MessageRef,
        pie_type: String,
    ) -> Result<Option<Ack>, DomainError> {
        let log = match self.store.get_daily_log(chat, &pie_type).await {
            Ok(log) => log,
            Err(e) => {
                self.upstream_failure(chat, "get_daily_log", &e, LOAD_FAILED)
                    .await?;
                return Ok(None);
            }
        };

        if log.manufactured <= 0 {
            self.refresh_menu(chat, message, menus::remaining_menu).await;
            return Ok(Ack::toast(format!("\"{pie_type}\" has not been baked today.")));
        }

        self.hide_menu(chat, message).await;
        let previous = log
            .remaining
            .map(|r| format!(" (previously: {})", format_count(r)))
            .unwrap_or_default();
        let prompt = format!(
            "How many \"{}\" are left? (Baked: {}{})",
            pie_type,
            format_count(log.manufactured),
            previous
        );
        self.conversations
            .set(
                chat,
                ConversationState::AwaitingRemainingInput {
                    pie_type,
                    manufactured: log.manufactured,
                },
            )
            .await;
        self.say(chat, &prompt).await?;
        Ok(None)
    }

    async fn select_write_off(
        &self,
        chat: ChatIdentity,
        message: MessageRef,
        pie_type: String,
    ) -> Result<Option<Ack>, DomainError> {
        let log = match self.store.get_daily_log(chat, &pie_type).await {
            Ok(log) => log,
            Err(e) => {
                self.upstream_failure(chat, "get_daily_log", &e, LOAD_FAILED)
                    .await?;
                return Ok(None);
            }
        };

        let remaining = log.remaining_or_zero();
        if remaining <= 0 {
            self.refresh_menu(chat, message, menus::write_off_menu).await;
            return Ok(Ack::alert(format!("\"{pie_type}\" has no stock to write off.")));
        }

        self.hide_menu(chat, message).await;
        let prompt = format!(
            "How many \"{}\" should be written off? (Remaining: {}) Enter a number:",
            pie_type,
            format_count(remaining)
        );
        self.conversations
            .set(
                chat,
                ConversationState::AwaitingWriteOffQuantity {
                    pie_type,
                    remaining,
                },
            )
            .await;
        self.say(chat, &prompt).await?;
        Ok(None)
    }

    /// Rebuild a stock menu in place from fresh data. Failures are only logged.
    async fn refresh_menu<F>(&self, chat: ChatIdentity, message: MessageRef, build: F)
    where
        F: Fn(&[String], &HashMap<String, DailyLog>) -> Menu,
    {
        let logs = match self.store.get_todays_logs(chat).await {
            Ok(logs) => logs,
            Err(e) => {
                warn!(chat_id = chat.0, error = %e, "could not refresh menu");
                return;
            }
        };
        let menu = build(&self.settings.pie_types, &logs);
        if let Err(e) = self.transport.edit_menu(chat, message, &menu).await {
            warn!(chat_id = chat.0, error = %e, "could not refresh menu");
        }
    }

    async fn run_analytics(
        &self,
        chat: ChatIdentity,
        kind: AnalyticsKind,
    ) -> Result<(), DomainError> {
        if let Err(e) = self.transport.send_typing(chat).await {
            debug!(chat_id = chat.0, error = %e, "typing indicator failed");
        }
        match self.analytics.run(chat, kind, self.today()).await {
            Ok(text) => self.say_with_main_menu(chat, &text).await,
            Err(e) => {
                let notice = analytics_service::failure_notice(kind);
                self.upstream_failure(chat, "analytics", &e, notice).await
            }
        }
    }
}

#[async_trait::async_trait]
impl EventPort for BotService {
    async fn handle_event(&self, event: InboundEvent) -> Result<(), DomainError> {
        let chat = event.chat();
        if !self.guard.allowed(chat) {
            return self.deny(&event).await;
        }

        match event {
            InboundEvent::Command { command, .. } => self.on_command(chat, command).await,
            InboundEvent::TextMessage { text, .. } => self.on_text(chat, &text).await,
            InboundEvent::CallbackSelection {
                message,
                callback_id,
                selector,
                ..
            } => self.on_selection(chat, message, &callback_id, selector).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::MockForecastAdapter;
    use crate::adapters::persistence::MemoryStore;
    use crate::usecases::forecast_service::ForecastService;
    use crate::usecases::test_support::{RecordingTransport, Sent};

    const CHAT: ChatIdentity = ChatIdentity(7);

    struct Harness {
        store: Arc<MemoryStore>,
        transport: Arc<RecordingTransport>,
        bot: BotService,
    }

    fn harness() -> Harness {
        harness_with(RecordingTransport::new())
    }

    fn harness_with(transport: RecordingTransport) -> Harness {
        let today = Utc::now().with_timezone(&chrono_tz::UTC).date_naive();
        let store = Arc::new(MemoryStore::new(today));
        let transport = Arc::new(transport);
        let types: Vec<String> = vec!["Meat".into(), "Potato".into(), "Sausage roll".into()];
        let reports = Arc::new(ReportService::new(
            store.clone(),
            transport.clone(),
            types.clone(),
            "sum".into(),
        ));
        let analytics = AnalyticsService::new(
            store.clone(),
            ForecastService::new(Some(Arc::new(MockForecastAdapter::new()))),
            "sum".into(),
        );
        let bot = BotService::new(
            store.clone(),
            transport.clone(),
            reports,
            analytics,
            AccessGuard::from_list("7,8"),
            BotSettings {
                pie_types: types,
                currency: "sum".into(),
                timezone: chrono_tz::UTC,
            },
        );
        Harness {
            store,
            transport,
            bot,
        }
    }

    fn text(chat: ChatIdentity, text: &str) -> InboundEvent {
        InboundEvent::TextMessage {
            chat,
            text: text.into(),
        }
    }

    fn select(chat: ChatIdentity, selector: Selector) -> InboundEvent {
        InboundEvent::CallbackSelection {
            chat,
            message: MessageRef(1),
            callback_id: "cb".into(),
            selector: Some(selector),
        }
    }

    fn add_pie(pie_type: &str) -> Selector {
        Selector::AddPie {
            pie_type: pie_type.into(),
        }
    }

    fn enter_remaining(pie_type: &str) -> Selector {
        Selector::EnterRemaining {
            pie_type: pie_type.into(),
        }
    }

    fn write_off(pie_type: &str) -> Selector {
        Selector::WriteOff {
            pie_type: pie_type.into(),
        }
    }

    fn set_price(pie_type: &str) -> Selector {
        Selector::SetPrice {
            pie_type: pie_type.into(),
        }
    }

    impl Harness {
        async fn send(&self, event: InboundEvent) {
            self.bot.handle_event(event).await.unwrap();
        }

        async fn state(&self) -> ConversationState {
            self.bot.conversations().get_or_create(CHAT).await
        }

        fn last_text(&self) -> String {
            self.transport.last_text(CHAT).unwrap_or_default()
        }

        fn put_today(&self, pie_type: &str, log: DailyLog) {
            self.store.put_log(CHAT, self.store.today(), pie_type, log);
        }
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("12,5"), Some(12.5));
        assert_eq!(parse_amount(" 300 "), Some(300.0));
        assert_eq!(parse_amount("-1"), None);
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount("inf"), None);
        assert_eq!(parse_count("10"), Some(10));
        assert_eq!(parse_count("10abc"), None);
    }

    #[tokio::test]
    async fn test_add_manufactured_flow() {
        let h = harness();

        h.send(select(CHAT, add_pie("Meat"))).await;
        assert_eq!(
            h.state().await,
            ConversationState::AwaitingPieQuantity {
                pie_type: "Meat".into()
            }
        );

        h.send(text(CHAT, "10")).await;

        assert_eq!(h.store.calls(), vec!["add_manufactured(7, Meat, 10)"]);
        let reply = h.last_text();
        assert!(reply.contains("Added: 10 \"Meat\""));
        assert!(reply.contains("Total today: 10."));
        assert!(h.state().await.is_idle());
    }

    #[tokio::test]
    async fn test_add_manufactured_reports_reset_remaining() {
        let h = harness();
        h.put_today(
            "Meat",
            DailyLog {
                manufactured: 10,
                remaining: Some(3),
                written_off: 0,
            },
        );

        h.send(select(CHAT, add_pie("Meat"))).await;
        h.send(text(CHAT, "5")).await;

        let reply = h.last_text();
        assert!(reply.contains("Total today: 15."));
        assert!(reply.contains("was reset"));
    }

    #[tokio::test]
    async fn test_invalid_quantity_reprompts_and_keeps_state() {
        let h = harness();
        h.send(select(CHAT, add_pie("Potato"))).await;

        for bad in ["0", "-3", "ten", "2.5"] {
            h.send(text(CHAT, bad)).await;
            assert_eq!(h.last_text(), BAD_COUNT);
        }

        assert!(h.store.calls().is_empty());
        assert_eq!(h.state().await.action(), "awaiting_pie_quantity");
    }

    #[tokio::test]
    async fn test_remaining_bounded_by_manufactured() {
        let h = harness();
        h.put_today(
            "Meat",
            DailyLog {
                manufactured: 25,
                remaining: None,
                written_off: 0,
            },
        );

        h.send(select(CHAT, enter_remaining("Meat"))).await;
        assert!(h.last_text().contains("(Baked: 25)"));

        h.send(text(CHAT, "26")).await;
        assert!(h.last_text().contains("cannot exceed the number baked (25)"));
        assert_eq!(h.state().await.action(), "awaiting_remaining_input");

        h.send(text(CHAT, "5")).await;
        assert_eq!(h.store.calls(), vec!["set_remaining(7, Meat, 5)"]);
        assert!(h.state().await.is_idle());
        assert_eq!(h.last_text(), "Pick the next pie or go back:");
    }

    #[tokio::test]
    async fn test_remaining_for_unbaked_type_refreshes_menu() {
        let h = harness();

        h.send(select(CHAT, enter_remaining("Potato"))).await;

        assert!(h.state().await.is_idle());
        assert_eq!(
            h.transport.answers(),
            vec![(
                Some("\"Potato\" has not been baked today.".to_string()),
                false
            )]
        );
        assert!(h
            .transport
            .sent()
            .iter()
            .any(|s| matches!(s, Sent::EditMenu { menu, .. } if !menu.rows.is_empty())));
    }

    #[tokio::test]
    async fn test_write_off_bounded_by_remaining() {
        let h = harness();
        h.put_today(
            "Potato",
            DailyLog {
                manufactured: 15,
                remaining: Some(4),
                written_off: 0,
            },
        );

        h.send(select(CHAT, write_off("Potato"))).await;
        h.send(text(CHAT, "5")).await;
        assert!(h.last_text().contains("cannot exceed the remaining stock (4)"));
        assert!(h.store.calls().is_empty());

        h.send(text(CHAT, "3")).await;
        assert_eq!(h.store.calls(), vec!["write_off(7, Potato, 3)"]);
        assert!(h
            .transport
            .texts(CHAT)
            .contains(&"✅ Wrote off 3 pcs of \"Potato\".".to_string()));
        assert!(h.state().await.is_idle());
    }

    #[tokio::test]
    async fn test_write_off_without_stock_alerts() {
        let h = harness();
        h.send(select(CHAT, write_off("Meat"))).await;
        assert_eq!(
            h.transport.answers(),
            vec![(Some("\"Meat\" has no stock to write off.".to_string()), true)]
        );
        assert!(h.state().await.is_idle());
    }

    #[tokio::test]
    async fn test_write_off_rejected_by_store_resets_flow() {
        let h = harness();
        h.put_today(
            "Potato",
            DailyLog {
                manufactured: 15,
                remaining: Some(4),
                written_off: 0,
            },
        );
        h.send(select(CHAT, write_off("Potato"))).await;

        // Stock sold in the meantime; the prompt still allows 4.
        h.put_today(
            "Potato",
            DailyLog {
                manufactured: 15,
                remaining: Some(2),
                written_off: 0,
            },
        );
        h.send(text(CHAT, "3")).await;

        assert_eq!(h.store.calls(), vec!["write_off(7, Potato, 3)"]);
        let sent = h.transport.sent();
        assert!(matches!(
            sent.last(),
            Some(Sent::Text {
                text,
                attachment: Some(Attachment::MainMenu),
                ..
            }) if text == "❌ Write-off failed: Write-off quantity exceeds the remaining stock."
        ));
        assert!(h.state().await.is_idle());
    }

    #[tokio::test]
    async fn test_expenses_accept_comma() {
        let h = harness();
        h.send(text(CHAT, MainMenuItem::EnterExpenses.label())).await;
        assert_eq!(h.state().await, ConversationState::AwaitingExpensesInput);

        h.send(text(CHAT, "1500,5")).await;

        assert_eq!(h.store.calls(), vec!["add_expense(7, 1500.5)"]);
        assert!(h.last_text().contains("Total for today: 1\u{a0}500,5 sum."));
    }

    #[tokio::test]
    async fn test_price_flow_shows_settings() {
        let h = harness();
        h.send(select(CHAT, set_price("Meat"))).await;
        h.send(text(CHAT, "abc")).await;
        assert_eq!(h.last_text(), "❌ Enter a valid price.");

        h.send(text(CHAT, "120")).await;

        assert_eq!(h.store.calls(), vec!["set_price(7, Meat, 120)"]);
        assert_eq!(h.last_text(), "Current prices:");
        assert!(h.state().await.is_idle());
    }

    #[tokio::test]
    async fn test_custom_dates_reject_end_before_start() {
        let h = harness();
        h.send(select(CHAT, Selector::StatsPeriod(Period::Custom))).await;
        assert_eq!(h.state().await.action(), "awaiting_custom_start_date");

        h.send(text(CHAT, "2024-02-30")).await;
        assert_eq!(h.last_text(), BAD_DATE);

        h.send(text(CHAT, "2024-08-10")).await;
        assert_eq!(h.state().await.action(), "awaiting_custom_end_date");

        h.send(text(CHAT, "2024-08-01")).await;
        assert!(h.last_text().contains("cannot be earlier"));
        assert_eq!(h.state().await.action(), "awaiting_custom_end_date");

        h.send(text(CHAT, "2024-08-12")).await;
        assert!(h.state().await.is_idle());
        assert!(h
            .last_text()
            .starts_with("📊 Statistics for 2024-08-10 to 2024-08-12:"));
    }

    #[tokio::test]
    async fn test_upstream_failure_resets_state() {
        let h = harness();
        h.store.fail_on("add_manufactured");
        h.send(select(CHAT, add_pie("Meat"))).await;

        h.send(text(CHAT, "4")).await;

        assert!(h.state().await.is_idle());
        let sent = h.transport.sent();
        assert!(matches!(
            sent.last(),
            Some(Sent::Text {
                text,
                attachment: Some(Attachment::MainMenu),
                ..
            }) if text == SAVE_FAILED
        ));
    }

    #[tokio::test]
    async fn test_access_denied() {
        let h = harness();
        let stranger = ChatIdentity(999);

        h.bot.handle_event(text(stranger, "/start")).await.unwrap();
        h.bot
            .handle_event(InboundEvent::Command {
                chat: stranger,
                command: BotCommand::Start,
            })
            .await
            .unwrap();
        h.bot
            .handle_event(select(stranger, Selector::BackToMain))
            .await
            .unwrap();

        assert_eq!(
            h.transport.texts(stranger),
            vec![ACCESS_DENIED.to_string(), ACCESS_DENIED.to_string()]
        );
        assert_eq!(
            h.transport.answers(),
            vec![(Some(CALLBACK_ACCESS_DENIED.to_string()), true)]
        );
        assert_eq!(h.bot.conversations().len().await, 0);
    }

    #[tokio::test]
    async fn test_main_menu_label_overrides_pending_flow() {
        let h = harness();
        h.send(select(CHAT, set_price("Meat"))).await;

        h.send(text(CHAT, MainMenuItem::Statistics.label())).await;

        assert!(h.state().await.is_idle());
        assert_eq!(h.last_text(), "Choose the statistics period:");
    }

    #[tokio::test]
    async fn test_start_resets_state() {
        let h = harness();
        h.send(text(CHAT, MainMenuItem::EnterExpenses.label())).await;
        h.send(InboundEvent::Command {
            chat: CHAT,
            command: BotCommand::Start,
        })
        .await;
        assert!(h.state().await.is_idle());
        assert_eq!(h.last_text(), WELCOME);
    }

    #[tokio::test]
    async fn test_back_deletes_menu_and_shows_main_menu() {
        let h = harness();
        h.send(select(CHAT, Selector::Placeholder)).await;
        let sent = h.transport.sent();
        assert!(matches!(sent[0], Sent::Delete { message: MessageRef(1), .. }));
        assert!(matches!(
            &sent[1],
            Sent::Text { attachment: Some(Attachment::MainMenu), .. }
        ));
        assert!(matches!(sent[2], Sent::Answer { notice: None, .. }));
    }

    #[tokio::test]
    async fn test_hide_menu_falls_back_to_delete() {
        let h = harness();
        h.transport.fail_edits();
        h.send(select(CHAT, add_pie("Meat"))).await;
        assert!(matches!(h.transport.sent()[0], Sent::Delete { .. }));
    }

    #[tokio::test]
    async fn test_unknown_selector_and_type() {
        let h = harness();
        h.send(InboundEvent::CallbackSelection {
            chat: CHAT,
            message: MessageRef(1),
            callback_id: "cb".into(),
            selector: None,
        })
        .await;
        h.send(select(CHAT, add_pie("Cabbage"))).await;

        assert_eq!(
            h.transport.answers(),
            vec![
                (Some(UNKNOWN_ACTION.to_string()), false),
                (Some(UNKNOWN_ACTION.to_string()), false),
            ]
        );
        assert!(h.state().await.is_idle());
    }

    #[tokio::test]
    async fn test_period_report_from_button() {
        let h = harness();
        h.send(select(CHAT, Selector::StatsPeriod(Period::Today))).await;
        assert!(h.last_text().starts_with("📊 Statistics for "));
    }

    #[tokio::test]
    async fn test_analytics_failure_notice() {
        let h = harness();
        h.store.fail_on("get_sales_ranking");
        h.send(select(CHAT, Selector::Analytics(AnalyticsKind::MostSold)))
            .await;
        assert_eq!(h.last_text(), "❌ Could not load analytics.");
    }
}
