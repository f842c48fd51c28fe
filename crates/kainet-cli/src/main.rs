mod banner;
mod config;

use std::io::Stdout;
use std::time::Duration;

use clap::Parser;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use kainet_client::render::{Line, Renderer, TerminalRenderer, Tone};
use kainet_client::{Driver, LocalStore, MessageStore, RemoteStore, Session};

use crate::config::{Args, Backend, Config};

fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging on stderr; stdout is the chat surface
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kainet=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Args::parse().resolve()?;

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(run(config));

    // A pending stdin read cannot be cancelled; don't wait for it
    runtime.shutdown_timeout(Duration::from_millis(100));
    result
}

async fn run(config: Config) -> anyhow::Result<()> {
    let mut screen = TerminalRenderer::stdout();

    banner::print_banner(&mut screen);
    if config.boot {
        banner::boot_sequence(&mut screen, &config.room).await;
    }

    match &config.backend {
        Backend::Local(path) => {
            info!("Using local database {}", path.display());
            let store = LocalStore::open(path)?;
            chat(store, &config, &mut screen).await
        }
        Backend::Remote { url } => {
            let store = RemoteStore::new(url, &config.auth_token, config.request_timeout)?;
            info!("Using remote database {}", store.pipeline_url());
            chat(store, &config, &mut screen).await
        }
    }
}

async fn chat<S: MessageStore>(
    store: S,
    config: &Config,
    screen: &mut TerminalRenderer<Stdout>,
) -> anyhow::Result<()> {
    screen.render(Line::step("establishing secure connection...").push(Tone::Success, " CONNECTED"));

    let mut session = match Session::connect(store, &config.auth_token, &config.room, &config.username).await {
        Ok(session) => session,
        Err(e) => {
            error!("Connect failed: {}", e);
            screen.render(Line::styled(Tone::Failure, format!("INITIALIZATION FAILED: {}", e)));
            return Err(e.into());
        }
    };
    screen.render(Line::step("initializing secure channel...").push(Tone::Success, " OK"));
    screen.render(Line::step("generating AES-256 encryption keys...").push(Tone::Success, " READY"));

    banner::channel_box(screen, &config.username, &config.room);
    screen.render(Line::styled(Tone::Dim, "commands: /burn (wipe history), /help, /quit"));
    screen.render(Line::blank());

    match session.history(config.history).await {
        Ok(history) => {
            for delivered in &history {
                screen.render(Line::delivered(delivered));
            }
        }
        Err(e) => {
            error!("History failed: {}", e);
            screen.render(Line::styled(Tone::Failure, format!("error loading history: {}", e)));
        }
    }

    let shutdown = CancellationToken::new();
    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    let input = BufReader::new(tokio::io::stdin());
    Driver::new(&mut session, screen)
        .run(input, config.poll_interval, shutdown)
        .await;

    screen.render(Line::styled(Tone::Dim, "secure channel closed"));
    Ok(())
}
