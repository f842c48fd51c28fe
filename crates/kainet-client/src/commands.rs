//! Command parsing for the chat prompt.
//!
//! Lines starting with `/` are commands. Anything else is a message.

/// Parsed line of operator input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Blank input; ignored.
    Empty,

    /// Send a message to the room.
    Message {
        /// Message content, trimmed.
        content: String,
    },

    /// Purge the room's history. Needs confirmation.
    Burn,

    /// List available commands.
    Help,

    /// Disconnect and exit.
    Quit,

    /// Unknown command.
    Unknown {
        /// The input as typed.
        input: String,
    },
}

/// Commands shown by `/help` and in the connect hint.
pub const HELP: &[(&str, &str)] = &[
    ("/burn", "wipe this room's history"),
    ("/help", "list commands"),
    ("/quit", "disconnect"),
];

/// Answer that confirms a pending `/burn`.
pub const BURN_CONFIRMATION: &str = "yes";

pub fn parse(input: &str) -> Command {
    let input = input.trim();

    if input.is_empty() {
        return Command::Empty;
    }

    let Some(cmd) = input.strip_prefix('/') else {
        return Command::Message { content: input.to_string() };
    };

    match cmd {
        "burn" => Command::Burn,
        "help" | "?" => Command::Help,
        "quit" | "q" => Command::Quit,
        _ => Command::Unknown { input: input.to_string() },
    }
}
