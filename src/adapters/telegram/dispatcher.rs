//! Long-polling update loop. Decodes updates and hands them to the [`EventPort`].
//!
//! teloxide's dispatcher already serializes updates per chat, so one chat's
//! flow never sees two of its own events at once.

use crate::adapters::telegram::mapper;
use crate::ports::EventPort;
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::RequestError;
use tracing::{debug, error, info};

type Port = Arc<dyn EventPort>;

async fn deliver(port: &Port, event: crate::domain::InboundEvent) {
    let chat_id = event.chat().0;
    if let Err(e) = port.handle_event(event).await {
        error!(chat_id, error = %e, "event handling failed");
    }
}

async fn on_message(msg: Message, port: Port) -> ResponseResult<()> {
    match mapper::message_to_event(&msg) {
        Some(event) => deliver(&port, event).await,
        None => debug!(chat_id = msg.chat.id.0, "ignoring non-text message or unknown command"),
    }
    respond(())
}

async fn on_callback(q: CallbackQuery, port: Port) -> ResponseResult<()> {
    match mapper::callback_to_event(&q) {
        Some(event) => deliver(&port, event).await,
        None => debug!("ignoring callback without a message"),
    }
    respond(())
}

fn schema() -> UpdateHandler<RequestError> {
    dptree::entry()
        .branch(Update::filter_message().endpoint(on_message))
        .branch(Update::filter_callback_query().endpoint(on_callback))
}

/// Poll until Ctrl-C.
pub async fn run(bot: Bot, port: Port) {
    info!("starting Telegram long polling");
    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![port])
        .default_handler(|_| async {})
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
    info!("Telegram polling stopped");
}
