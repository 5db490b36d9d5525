use anyhow::{bail, Context, Result};

pub const DEFAULT_PORT: u16 = 10000;

const BOT_TOKEN: &str = "BOT_TOKEN";
const PUBLIC_HOSTNAME: &str = "RENDER_EXTERNAL_HOSTNAME";
const PORT: &str = "PORT";

/// Process-wide settings, read once at startup.
#[derive(Clone, PartialEq)]
pub struct Config {
    pub bot_token: String,
    /// Public hostname the platform can reach us on. Selects webhook mode.
    pub public_hostname: Option<String>,
    /// HTTP listen port, only used in webhook mode.
    pub port: u16,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bot_token", &"<redacted>")
            .field("public_hostname", &self.public_hostname)
            .field("port", &self.port)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let Some(bot_token) = get(BOT_TOKEN) else {
            bail!("{BOT_TOKEN} environment variable is not set");
        };

        let public_hostname = get(PUBLIC_HOSTNAME);

        // PORT only matters for the webhook listener
        let port = match (&public_hostname, get(PORT)) {
            (Some(_), Some(raw)) => raw
                .parse::<u16>()
                .with_context(|| format!("Invalid {PORT} value: {raw:?}"))?,
            _ => DEFAULT_PORT,
        };

        Ok(Self {
            bot_token,
            public_hostname,
            port,
        })
    }

    /// `https://<hostname>/webhook`, when a public hostname is configured.
    pub fn webhook_url(&self) -> Option<String> {
        self.public_hostname
            .as_deref()
            .map(|host| format!("https://{host}/webhook"))
    }
}
