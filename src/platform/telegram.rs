use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use teloxide::prelude::*;
use teloxide::types::{ChatId, MessageEntityKind, UpdateKind};
use tracing::{debug, info};

use crate::bot::UpdateRouter;
use crate::platform::{IncomingUpdate, ReplySink, WebhookRegistrar};

impl IncomingUpdate {
    pub fn from_message(msg: &Message) -> Self {
        let user = msg.from.as_ref();
        let is_command = msg.entities().is_some_and(|entities| {
            entities
                .iter()
                .any(|e| e.offset == 0 && matches!(e.kind, MessageEntityKind::BotCommand))
        });

        Self {
            user_id: user.map(|u| u.id.0),
            user_name: user.map(|u| u.first_name.clone()),
            chat_id: Some(msg.chat.id.0),
            text: msg.text().map(str::to_string),
            is_command,
        }
    }

    /// Only new messages are handled; edits, callbacks and the rest yield `None`.
    pub fn from_update(update: &Update) -> Option<Self> {
        match &update.kind {
            UpdateKind::Message(msg) => Some(Self::from_message(msg)),
            _ => None,
        }
    }
}

#[async_trait]
impl ReplySink for Bot {
    async fn send_reply(&self, chat_id: i64, text: &str) -> Result<()> {
        self.send_message(ChatId(chat_id), text).await?;
        Ok(())
    }
}

#[async_trait]
impl WebhookRegistrar for Bot {
    async fn register_webhook(&self, url: Url) -> Result<()> {
        self.set_webhook(url.clone())
            .await
            .with_context(|| format!("Failed to set webhook to {url}"))?;
        Ok(())
    }
}

/// Long-poll Telegram until Ctrl-C. teloxide's listener drops any
/// registered webhook first and retries failed polls on its own.
pub async fn run_polling(bot: Bot, router: Arc<UpdateRouter>) -> Result<()> {
    info!("Starting in polling mode...");

    let handler = Update::filter_message().endpoint(handle_message);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![router])
        .default_handler(|upd| async move {
            debug!("Ignoring non-message update {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("telegram"))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_message(msg: Message, router: Arc<UpdateRouter>) -> ResponseResult<()> {
    router.dispatch(&IncomingUpdate::from_message(&msg)).await;
    Ok(())
}
