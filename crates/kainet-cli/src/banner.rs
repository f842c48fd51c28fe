use std::time::Duration;

use kainet_client::render::{Line, Renderer, Tone};

const BANNER: &[&str] = &[
    "╔══════════════════════════════════════════════════════════╗",
    "║                                                          ║",
    "║   ██╗  ██╗ █████╗ ██╗███╗   ██╗███████╗████████╗         ║",
    "║   ██║ ██╔╝██╔══██╗██║████╗  ██║██╔════╝╚══██╔══╝         ║",
    "║   █████╔╝ ███████║██║██╔██╗ ██║█████╗     ██║            ║",
    "║   ██╔═██╗ ██╔══██║██║██║╚██╗██║██╔══╝     ██║            ║",
    "║   ██║  ██╗██║  ██║██║██║ ╚████║███████╗   ██║            ║",
    "║   ╚═╝  ╚═╝╚═╝  ╚═╝╚═╝╚═╝  ╚═══╝╚══════╝   ╚═╝            ║",
    "║                                                          ║",
    "║           CLASSIFIED COMMUNICATIONS TERMINAL             ║",
    "║              UNAUTHORIZED ACCESS PROHIBITED              ║",
    "║                                                          ║",
    "╚══════════════════════════════════════════════════════════╝",
];

/// Inner width of the channel status box.
const BOX_WIDTH: usize = 40;

pub fn print_banner<R: Renderer>(screen: &mut R) {
    for row in BANNER {
        screen.render(Line::styled(Tone::Success, *row));
    }
}

pub async fn boot_sequence<R: Renderer>(screen: &mut R, room: &str) {
    screen.render(Line::styled(Tone::Accent, "SYSTEM INITIALIZING..."));
    tokio::time::sleep(Duration::from_millis(200)).await;

    let steps = [
        "loading security protocols".to_string(),
        "verifying operator credentials".to_string(),
        format!("connecting to room: {}", room),
        "establishing quantum-resistant handshake".to_string(),
        "activating end-to-end encryption".to_string(),
    ];

    for step in steps {
        tokio::time::sleep(Duration::from_millis(150)).await;
        screen.render(Line::step(step).push(Tone::Success, " OK"));
    }

    screen.render(Line::blank());
}

/// The "SECURE CHANNEL ACTIVE" box shown once connected.
pub fn channel_box<R: Renderer>(screen: &mut R, username: &str, room: &str) {
    let rule = "═".repeat(BOX_WIDTH);
    let rows = [
        "SECURE CHANNEL ACTIVE".to_string(),
        format!("OPERATOR: {}", username.to_uppercase()),
        format!("ROOM: {}", room.to_uppercase()),
        "ENCRYPTION: AES-256-GCM".to_string(),
    ];

    screen.render(Line::blank());
    screen.render(Line::styled(Tone::Success, format!("╔{}╗", rule)));
    for row in rows {
        screen.render(Line::styled(Tone::Success, format!("║  {}║", fit(&row, BOX_WIDTH - 2))));
    }
    screen.render(Line::styled(Tone::Success, format!("╚{}╝", rule)));
    screen.render(Line::blank());
}

/// Pad or truncate to exactly `width` characters.
fn fit(text: &str, width: usize) -> String {
    let mut out: String = text.chars().take(width).collect();
    let len = out.chars().count();
    out.extend(std::iter::repeat_n(' ', width - len));
    out
}
