use std::sync::Arc;

use anyhow::Context;
use tracing::debug;

use crate::handlers;
use crate::platform::{IncomingUpdate, ReplySink, Route};

/// Routes each update to exactly one handler and delivers its reply.
/// All failures stop here.
pub struct UpdateRouter {
    sink: Arc<dyn ReplySink>,
    /// Our own username, for telling `/start@us` from `/start@someone_else`
    bot_username: Option<String>,
}

impl UpdateRouter {
    pub fn new(sink: Arc<dyn ReplySink>) -> Self {
        Self {
            sink,
            bot_username: None,
        }
    }

    pub fn with_bot_username(mut self, username: impl Into<String>) -> Self {
        self.bot_username = Some(username.into());
        self
    }

    pub async fn dispatch(&self, update: &IncomingUpdate) -> Route {
        let route = update.route(self.bot_username.as_deref());
        let reply = match route {
            Route::Start => handlers::start(update),
            Route::Text => handlers::text(update),
            Route::Ignore => {
                debug!("Ignoring update from user {:?}", update.user_id);
                return route;
            }
        };

        if let Err(e) = self.reply(update, reply).await {
            handlers::error(self.sink.as_ref(), Some(update), &e).await;
        }
        route
    }

    async fn reply(&self, update: &IncomingUpdate, text: &str) -> anyhow::Result<()> {
        let chat_id = update
            .chat_id
            .context("Update has no chat to reply to")?;
        self.sink
            .send_reply(chat_id, text)
            .await
            .with_context(|| format!("Failed to send reply to chat {chat_id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::RecordingSink;
    use crate::handlers::{ERROR_REPLY, GREETING, ONLY_START};

    fn update(text: Option<&str>, is_command: bool) -> IncomingUpdate {
        IncomingUpdate {
            user_id: Some(42),
            user_name: Some("Ann".to_string()),
            chat_id: Some(42),
            text: text.map(str::to_string),
            is_command,
        }
    }

    fn router(sink: &Arc<RecordingSink>) -> UpdateRouter {
        UpdateRouter::new(sink.clone())
    }

    #[tokio::test]
    async fn test_start_gets_greeting() {
        let sink = Arc::new(RecordingSink::default());
        let route = router(&sink).dispatch(&update(Some("/start"), true)).await;
        assert_eq!(route, Route::Start);
        assert_eq!(sink.sent(), vec![(42, GREETING.to_string())]);
    }

    #[tokio::test]
    async fn test_text_gets_only_start_reply() {
        let sink = Arc::new(RecordingSink::default());
        for text in ["hello", "what can you do?", "😀"] {
            router(&sink).dispatch(&update(Some(text), false)).await;
        }
        let sent = sink.sent();
        assert_eq!(sent.len(), 3);
        assert!(sent.iter().all(|(_, reply)| reply == ONLY_START));
    }

    #[tokio::test]
    async fn test_no_text_sends_nothing() {
        let sink = Arc::new(RecordingSink::default());
        let route = router(&sink).dispatch(&update(None, false)).await;
        assert_eq!(route, Route::Ignore);
        assert_eq!(sink.attempts(), 0);
    }

    #[tokio::test]
    async fn test_unknown_command_sends_nothing() {
        let sink = Arc::new(RecordingSink::default());
        router(&sink).dispatch(&update(Some("/help"), true)).await;
        assert_eq!(sink.attempts(), 0);
    }

    #[tokio::test]
    async fn test_start_addressed_to_another_bot_sends_nothing() {
        let sink = Arc::new(RecordingSink::default());
        let router = UpdateRouter::new(sink.clone()).with_bot_username("greeter_bot");

        let route = router
            .dispatch(&update(Some("/start@some_other_bot"), true))
            .await;
        assert_eq!(route, Route::Ignore);
        assert_eq!(sink.attempts(), 0);

        let route = router.dispatch(&update(Some("/start@greeter_bot"), true)).await;
        assert_eq!(route, Route::Start);
        assert_eq!(sink.sent(), vec![(42, GREETING.to_string())]);
    }

    #[tokio::test]
    async fn test_failed_reply_sends_one_error_reply() {
        let sink = Arc::new(RecordingSink::failing(1));
        router(&sink).dispatch(&update(Some("hello"), false)).await;
        assert_eq!(sink.attempts(), 2);
        assert_eq!(sink.sent(), vec![(42, ERROR_REPLY.to_string())]);
    }

    #[tokio::test]
    async fn test_error_reply_failure_is_contained() {
        let sink = Arc::new(RecordingSink::failing(usize::MAX));
        let route = router(&sink).dispatch(&update(Some("/start"), true)).await;
        assert_eq!(route, Route::Start);
        assert_eq!(sink.attempts(), 2);
        assert!(sink.sent().is_empty());
    }

    #[tokio::test]
    async fn test_missing_chat_reports_without_reply() {
        let sink = Arc::new(RecordingSink::default());
        let mut upd = update(Some("hello"), false);
        upd.chat_id = None;
        router(&sink).dispatch(&upd).await;
        assert_eq!(sink.attempts(), 0);
    }
}
