//! Telegram listener for the source groups.

use std::sync::Arc;
use teloxide::prelude::*;
use tracing::{debug, info};

use super::InboundMessage;
use crate::engine::classifier::{IngestOutcome, Ingestor};

/// Run the long-polling listener until the process is stopped.
///
/// Every text or captioned message the bot can see is fed to the ingestor.
/// Nothing is ever sent back to the source chat.
pub async fn run_listener(bot: Bot, ingestor: Arc<Ingestor>) {
    info!("Telegram listener started");

    teloxide::repl(bot, move |msg: Message| {
        let ingestor = Arc::clone(&ingestor);
        async move {
            let Some(inbound) =
                InboundMessage::from_parts(msg.chat.title(), msg.text().or(msg.caption()))
            else {
                return respond(());
            };

            let outcome = ingestor
                .handle_message(&inbound.group_name, &inbound.text)
                .await;
            if outcome != IngestOutcome::Ignored {
                debug!(group = %inbound.group_name, outcome = ?outcome, "Message handled");
            }

            respond(())
        }
    })
    .await;

    info!("Telegram listener stopped");
}
