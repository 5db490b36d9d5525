use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Url;
use teloxide::requests::Requester;
use teloxide::Bot;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::bot::UpdateRouter;
use crate::config::Config;
use crate::platform::{telegram, webhook, WebhookRegistrar};

/// How updates reach the bot. Chosen once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Polling,
    Webhook { url: Url, port: u16 },
}

impl Mode {
    /// Webhook mode when a public hostname is configured, polling otherwise.
    pub fn select(config: &Config) -> Result<Self> {
        match config.webhook_url() {
            None => Ok(Mode::Polling),
            Some(raw) => {
                let url = Url::parse(&raw)
                    .with_context(|| format!("Invalid webhook URL: {raw}"))?;
                Ok(Mode::Webhook {
                    url,
                    port: config.port,
                })
            }
        }
    }
}

pub async fn run(config: &Config, mode: Mode) -> Result<()> {
    let bot = Bot::new(&config.bot_token);

    let me = bot
        .get_me()
        .await
        .context("Failed to fetch bot identity, is BOT_TOKEN valid?")?;
    let mut router = UpdateRouter::new(Arc::new(bot.clone()));
    if let Some(username) = me.user.username.clone() {
        info!("Running as @{}", username);
        router = router.with_bot_username(username);
    }
    let router = Arc::new(router);

    match mode {
        Mode::Polling => telegram::run_polling(bot, router).await,
        Mode::Webhook { url, port } => {
            run_webhook(&bot, router, url, port, shutdown_signal()).await
        }
    }
}

/// Register the webhook once, then serve it on `port` until `shutdown`.
pub async fn run_webhook<F>(
    registrar: &dyn WebhookRegistrar,
    router: Arc<UpdateRouter>,
    url: Url,
    port: u16,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!("Setting webhook to {}", url);
    registrar.register_webhook(url).await?;

    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;
    info!("Starting HTTP server on port {}", port);

    let (queue, updates) = mpsc::unbounded_channel();
    let worker = tokio::spawn(webhook::drain_queue(updates, router));

    webhook::serve(listener, queue, shutdown).await?;

    worker.await.context("Update worker panicked")?;
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl-C, shutting down"),
        Err(e) => {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
