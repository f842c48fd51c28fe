use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::commands::{self, BURN_CONFIRMATION, Command};
use crate::render::{Line, Renderer, Tone};
use crate::session::Session;
use crate::store::MessageStore;

enum Flow {
    Continue,
    Quit,
}

/// Runs one connected session: operator input, the poll timer and rendering,
/// all on the current task.
pub struct Driver<'a, S, R> {
    session: &'a mut Session<S>,
    renderer: &'a mut R,
    burn_pending: bool,
    poll_failing: bool,
}

impl<'a, S: MessageStore, R: Renderer> Driver<'a, S, R> {
    pub fn new(session: &'a mut Session<S>, renderer: &'a mut R) -> Self {
        Self {
            session,
            renderer,
            burn_pending: false,
            poll_failing: false,
        }
    }

    /// Loop until input ends, `/quit`, or `shutdown` fires. Disconnects the
    /// session on the way out.
    pub async fn run<I>(mut self, input: I, poll_interval: Duration, shutdown: CancellationToken)
    where
        I: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let line = tokio::select! {
                _ = shutdown.cancelled() => break,
                line = lines.next_line() => line,
                _ = ticker.tick() => {
                    // Input and shutdown win over a slow store. A dropped poll
                    // has not touched the cursor and runs again next tick.
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        line = lines.next_line() => line,
                        _ = self.poll_once() => continue,
                    }
                }
            };

            match line {
                Ok(Some(line)) => {
                    let flow = tokio::select! {
                        _ = shutdown.cancelled() => break,
                        flow = self.handle_line(&line) => flow,
                    };
                    if let Flow::Quit = flow {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("error reading input: {}", e);
                    break;
                }
            }
        }

        self.session.disconnect();
        info!("Driver stopped");
    }

    /// Fetch and render anything new. Failures are reported once per outage;
    /// the next tick retries regardless.
    pub async fn poll_once(&mut self) {
        match self.session.poll().await {
            Ok(batch) => {
                if self.poll_failing {
                    info!("Polling recovered");
                    self.poll_failing = false;
                }
                for delivered in &batch {
                    self.renderer.render(Line::delivered(delivered));
                }
            }
            Err(e) => {
                warn!("error polling messages: {}", e);
                if !self.poll_failing {
                    self.poll_failing = true;
                    self.renderer
                        .render(Line::styled(Tone::Failure, format!("error polling messages: {}", e)));
                }
            }
        }
    }

    async fn handle_line(&mut self, line: &str) -> Flow {
        if self.burn_pending {
            self.burn_pending = false;
            if line.trim().eq_ignore_ascii_case(BURN_CONFIRMATION) {
                self.burn().await;
            } else {
                self.renderer.render(Line::styled(Tone::Dim, "burn aborted"));
            }
            return Flow::Continue;
        }

        match commands::parse(line) {
            Command::Empty => {}
            Command::Message { content } => self.send(&content).await,
            Command::Burn => {
                self.renderer.clear_input_line();
                self.renderer.render(Line::styled(
                    Tone::Warning,
                    format!(
                        "WARNING: this permanently erases all history for room '{}'. type '{}' to confirm",
                        self.session.room(),
                        BURN_CONFIRMATION
                    ),
                ));
                self.burn_pending = true;
            }
            Command::Help => {
                for (name, about) in commands::HELP {
                    self.renderer
                        .render(Line::styled(Tone::Accent, format!("{:<8}", name)).push(Tone::Dim, *about));
                }
            }
            Command::Quit => return Flow::Quit,
            Command::Unknown { input } => {
                self.renderer.clear_input_line();
                self.renderer.render(Line::styled(
                    Tone::Failure,
                    format!("COMMAND FAILED: unknown command: {}", input),
                ));
            }
        }

        Flow::Continue
    }

    async fn send(&mut self, content: &str) {
        match self.session.send(content).await {
            Ok(echo) => {
                self.renderer.clear_input_line();
                self.renderer.render(Line::delivered(&echo));
            }
            Err(e) => {
                warn!("send failed: {}", e);
                self.renderer
                    .render(Line::styled(Tone::Failure, format!("TRANSMISSION FAILED: {}", e)));
            }
        }
    }

    async fn burn(&mut self) {
        self.renderer.render(Line::styled(
            Tone::Warning,
            "WARNING: purging all encrypted transmissions for this room...",
        ));

        match self.session.burn().await {
            Ok(_) => {
                self.renderer.render(Line::styled(Tone::Success, "PURGED"));
                self.renderer.render(Line::styled(
                    Tone::Dim,
                    "all message history for this room has been permanently erased",
                ));
            }
            Err(e) => {
                self.renderer
                    .render(Line::styled(Tone::Failure, format!("COMMAND FAILED: purge failed: {}", e)));
            }
        }
    }
}
