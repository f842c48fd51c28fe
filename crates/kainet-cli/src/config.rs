use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::Parser;

/// Credentials baked in at build time. Set these when building a client for
/// a fixed deployment; they take precedence over flags and the environment.
const EMBEDDED_DB_URL: Option<&str> = option_env!("KAINET_EMBEDDED_DB_URL");
const EMBEDDED_AUTH_TOKEN: Option<&str> = option_env!("KAINET_EMBEDDED_AUTH_TOKEN");

/// Placeholder tokens that MUST NOT be used.
const PLACEHOLDER_TOKENS: &[&str] = &["change-me", "change-me-to-a-random-string"];

/// Encrypted terminal chat over a shared libSQL table.
#[derive(Debug, Parser)]
#[command(name = "kainet", version)]
pub struct Args {
    /// Operator name shown next to your messages
    pub username: String,

    /// Room to join
    pub room: String,

    /// Remote database URL (libsql://, https:// or http://)
    #[arg(long, env = "KAINET_DB_URL")]
    pub db_url: Option<String>,

    /// Shared secret: database bearer token and encryption key source
    #[arg(long, env = "KAINET_AUTH_TOKEN", hide_env_values = true)]
    pub auth_token: Option<String>,

    /// Use a local SQLite file instead of the remote database
    #[arg(long, env = "KAINET_DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// Milliseconds between polls
    #[arg(long, env = "KAINET_POLL_INTERVAL_MS", default_value_t = 1000,
          value_parser = clap::value_parser!(u64).range(50..))]
    pub poll_interval_ms: u64,

    /// Messages replayed when joining
    #[arg(long = "history", env = "KAINET_HISTORY_LIMIT", default_value_t = 20)]
    pub history: u32,

    /// Skip the boot animation
    #[arg(long)]
    pub no_boot: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Local(PathBuf),
    Remote { url: String },
}

#[derive(Debug)]
pub struct Config {
    pub username: String,
    pub room: String,
    pub auth_token: String,
    pub backend: Backend,
    pub poll_interval: Duration,
    /// Upper bound on one remote store request.
    pub request_timeout: Duration,
    pub history: u32,
    pub boot: bool,
}

impl Args {
    pub fn resolve(self) -> Result<Config> {
        self.resolve_with(EMBEDDED_DB_URL, EMBEDDED_AUTH_TOKEN)
    }

    fn resolve_with(self, embedded_url: Option<&str>, embedded_token: Option<&str>) -> Result<Config> {
        let username = self.username.trim().to_string();
        let room = self.room.trim().to_string();
        if username.is_empty() || room.is_empty() {
            bail!("username and room name required");
        }

        let auth_token = first_set(embedded_token, self.auth_token.as_deref()).unwrap_or_default();
        if auth_token.is_empty() {
            bail!("credentials not found: set --auth-token or KAINET_AUTH_TOKEN");
        }
        if PLACEHOLDER_TOKENS.contains(&auth_token.as_str()) {
            bail!("auth token is still a placeholder");
        }

        let backend = match (self.db_path, first_set(embedded_url, self.db_url.as_deref())) {
            (Some(path), _) => Backend::Local(path),
            (None, Some(url)) => Backend::Remote { url },
            (None, None) => bail!("no database: set --db-url / KAINET_DB_URL or --db-path"),
        };

        let poll_interval = Duration::from_millis(self.poll_interval_ms);

        Ok(Config {
            username,
            room,
            auth_token,
            backend,
            poll_interval,
            request_timeout: request_timeout(poll_interval),
            history: self.history,
            boot: !self.no_boot,
        })
    }
}

/// Ten poll periods, kept between 2 and 30 seconds.
fn request_timeout(poll_interval: Duration) -> Duration {
    (poll_interval * 10).clamp(Duration::from_secs(2), Duration::from_secs(30))
}

/// Embedded value if present and non-empty, else the runtime one.
fn first_set(embedded: Option<&str>, runtime: Option<&str>) -> Option<String> {
    embedded
        .filter(|v| !v.trim().is_empty())
        .or(runtime)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
