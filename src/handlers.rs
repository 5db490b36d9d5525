//! Canned responders. Each returns the reply text for one update.

use tracing::{error, info, warn};

use crate::platform::{IncomingUpdate, ReplySink};

pub const GREETING: &str = "Привет! Я твой первый бот, запущенный на Render! Рад тебя видеть.";

/// Sent for any text that is not the start command.
pub const ONLY_START: &str = "Я пока понимаю только команду /start 😉";

pub const ERROR_REPLY: &str = "Произошла ошибка при обработке вашего запроса.";

pub fn start(update: &IncomingUpdate) -> &'static str {
    info!(
        "User {} ({}) started the bot",
        display_id(update),
        update.user_name.as_deref().unwrap_or("unknown")
    );
    GREETING
}

pub fn text(update: &IncomingUpdate) -> &'static str {
    info!(
        "User {} sent a message: {}",
        display_id(update),
        update.text.as_deref().unwrap_or_default()
    );
    ONLY_START
}

/// Logs a failed update and, when the chat is known, tells the user.
/// Never fails itself.
pub async fn error(sink: &dyn ReplySink, update: Option<&IncomingUpdate>, err: &anyhow::Error) {
    error!("Error while handling update: {:#}", err);

    let Some(chat_id) = update.and_then(|u| u.chat_id) else {
        return;
    };
    if let Err(e) = sink.send_reply(chat_id, ERROR_REPLY).await {
        warn!("Failed to send error reply to chat {}: {:#}", chat_id, e);
    }
}

fn display_id(update: &IncomingUpdate) -> String {
    update
        .user_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use anyhow::{bail, Result};
    use async_trait::async_trait;

    use crate::platform::ReplySink;

    /// Records every delivery attempt; the first `failures` attempts fail.
    #[derive(Default)]
    pub struct RecordingSink {
        pub attempts: Mutex<usize>,
        pub sent: Mutex<Vec<(i64, String)>>,
        pub failures: usize,
    }

    impl RecordingSink {
        pub fn failing(failures: usize) -> Self {
            Self {
                failures,
                ..Default::default()
            }
        }

        pub fn attempts(&self) -> usize {
            *self.attempts.lock().unwrap()
        }

        pub fn sent(&self) -> Vec<(i64, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ReplySink for RecordingSink {
        async fn send_reply(&self, chat_id: i64, text: &str) -> Result<()> {
            let attempt = {
                let mut attempts = self.attempts.lock().unwrap();
                *attempts += 1;
                *attempts
            };
            if attempt <= self.failures {
                bail!("network down");
            }
            self.sent.lock().unwrap().push((chat_id, text.to_string()));
            Ok(())
        }
    }
}
