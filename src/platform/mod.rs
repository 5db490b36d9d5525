pub mod telegram;
pub mod webhook;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Url;

/// The command that gets the greeting.
pub const START_COMMAND: &str = "start";

/// A message received from the platform, reduced to what the handlers need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingUpdate {
    pub user_id: Option<u64>,
    /// Display name (first name) of the sender
    pub user_name: Option<String>,
    /// Chat the reply goes back to
    pub chat_id: Option<i64>,
    /// Absent for stickers, photos and other non-text messages
    pub text: Option<String>,
    /// The text starts with a bot command
    pub is_command: bool,
}

/// Which handler an update goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Start,
    Text,
    Ignore,
}

impl IncomingUpdate {
    /// Leading command split into its name and optional `@botname` suffix.
    pub fn command(&self) -> Option<(&str, Option<&str>)> {
        if !self.is_command {
            return None;
        }
        let token = self.text.as_deref()?.split_whitespace().next()?;
        let token = token.strip_prefix('/')?;
        Some(match token.split_once('@') {
            Some((name, mention)) => (name, Some(mention)),
            None => (token, None),
        })
    }

    /// `bot_username` is our own username; `/start@<other>` is meant for
    /// another bot and gets ignored.
    pub fn route(&self, bot_username: Option<&str>) -> Route {
        if let Some((name, mention)) = self.command() {
            let addressed_to_us = match (mention, bot_username) {
                (None, _) => true,
                (Some(mention), Some(own)) => mention.eq_ignore_ascii_case(own),
                (Some(_), None) => false,
            };
            if addressed_to_us && name.eq_ignore_ascii_case(START_COMMAND) {
                return Route::Start;
            }
        }
        match self.text.as_deref() {
            Some(text) if !text.is_empty() && !self.is_command => Route::Text,
            _ => Route::Ignore,
        }
    }
}

/// Outbound side of the platform: delivers a reply to a chat.
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn send_reply(&self, chat_id: i64, text: &str) -> Result<()>;
}

/// Tells the platform where to push updates.
#[async_trait]
pub trait WebhookRegistrar: Send + Sync {
    async fn register_webhook(&self, url: Url) -> Result<()>;
}
