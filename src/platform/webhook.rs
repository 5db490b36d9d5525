//! Push transport: an axum listener that accepts Telegram updates and
//! queues them for the [`UpdateRouter`].

use std::future::Future;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Router,
};
use teloxide::types::{Update, UpdateKind};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::bot::UpdateRouter;
use crate::platform::IncomingUpdate;

pub const STATUS_TEXT: &str = "Бот активен и работает в режиме webhook! 🚀";

pub type UpdateQueue = mpsc::UnboundedSender<Update>;

#[derive(Clone)]
struct WebhookState {
    queue: UpdateQueue,
}

pub fn router(queue: UpdateQueue) -> Router {
    Router::new()
        .route("/", get(status))
        .route("/webhook", post(receive_update))
        .with_state(WebhookState { queue })
}

/// Serve the webhook routes until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, queue: UpdateQueue, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(queue))
        .with_graceful_shutdown(shutdown)
        .await
        .context("Webhook server error")
}

async fn status() -> &'static str {
    STATUS_TEXT
}

async fn receive_update(State(state): State<WebhookState>, body: Bytes) -> StatusCode {
    let queued = decode_update(&body).and_then(|update| {
        state
            .queue
            .send(update)
            .map_err(|_| anyhow::anyhow!("Update queue is closed"))
    });

    match queued {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            error!("Rejected webhook request: {:#}", e);
            StatusCode::FORBIDDEN
        }
    }
}

/// Strict decode of one update body. Payloads teloxide cannot classify are
/// rejected as well.
pub fn decode_update(body: &[u8]) -> Result<Update> {
    let update: Update =
        serde_json::from_slice(body).context("Webhook body is not a valid update")?;
    if let UpdateKind::Error(raw) = &update.kind {
        bail!("Unrecognized update payload: {raw}");
    }
    Ok(update)
}

/// Drain the queue, running one task per update so a slow reply never
/// holds up the listener. Returns once the queue is closed and every
/// in-flight update has been handled.
pub async fn drain_queue(mut updates: mpsc::UnboundedReceiver<Update>, router: Arc<UpdateRouter>) {
    let mut tasks = JoinSet::new();

    loop {
        tokio::select! {
            next = updates.recv() => {
                let Some(update) = next else { break };
                let Some(incoming) = IncomingUpdate::from_update(&update) else {
                    debug!("Ignoring non-message update {:?}", update.id);
                    continue;
                };
                let router = router.clone();
                tasks.spawn(async move {
                    router.dispatch(&incoming).await;
                });
            }
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                if let Err(e) = joined {
                    error!("Update task failed: {}", e);
                }
            }
        }
    }

    info!("Update queue closed, finishing {} in-flight updates", tasks.len());
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            error!("Update task failed: {}", e);
        }
    }
}
