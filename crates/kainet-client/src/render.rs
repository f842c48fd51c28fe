use std::io::{self, Stdout, Write};

use crossterm::{
    cursor, queue,
    style::{Color, Print, PrintStyledContent, Stylize, style},
    terminal::{Clear, ClearType},
};
use tracing::warn;

use crate::session::{Body, Delivered};

/// Shown in place of a message that failed to decrypt.
pub const DECRYPT_PLACEHOLDER: &str = "[DECRYPT ERROR]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Plain,
    Dim,
    /// Prompts, incoming authors.
    Accent,
    Success,
    Warning,
    Failure,
    /// Our own messages.
    Own,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub tone: Tone,
    pub text: String,
}

/// One display line, built from styled spans.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Line {
    pub spans: Vec<Span>,
}

impl Line {
    pub fn blank() -> Self {
        Self::default()
    }

    pub fn styled(tone: Tone, text: impl Into<String>) -> Self {
        Self::blank().push(tone, text)
    }

    pub fn push(mut self, tone: Tone, text: impl Into<String>) -> Self {
        self.spans.push(Span {
            tone,
            text: text.into(),
        });
        self
    }

    /// `>>> label`, the prefix of every boot and connect step.
    pub fn step(label: impl Into<String>) -> Self {
        Self::styled(Tone::Accent, ">>> ").push(Tone::Plain, label)
    }

    /// `[HH:MM] author: text`
    pub fn delivered(delivered: &Delivered) -> Self {
        let author_tone = if delivered.own { Tone::Own } else { Tone::Accent };
        let line = Self::styled(Tone::Dim, format!("[{}] ", delivered.message.clock()))
            .push(author_tone, format!("{}: ", delivered.message.author));

        match &delivered.body {
            Body::Text(text) => line.push(Tone::Plain, text.clone()),
            Body::Undecryptable => line.push(Tone::Failure, DECRYPT_PLACEHOLDER),
        }
    }

    /// The line without styling.
    pub fn text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }
}

/// A surface that shows ordered text lines.
pub trait Renderer {
    fn render(&mut self, line: Line);

    /// Erase the line the operator just typed, so it can be replaced by its
    /// formatted echo.
    fn clear_input_line(&mut self) {}
}

/// ANSI terminal output.
pub struct TerminalRenderer<W: Write> {
    out: W,
}

impl TerminalRenderer<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    fn write_line(&mut self, line: &Line) -> io::Result<()> {
        for span in &line.spans {
            let text = span.text.as_str();
            match span.tone {
                Tone::Plain => queue!(self.out, Print(text))?,
                Tone::Dim => queue!(self.out, PrintStyledContent(style(text).dim()))?,
                Tone::Accent => queue!(self.out, PrintStyledContent(style(text).with(Color::Cyan)))?,
                Tone::Success => {
                    queue!(self.out, PrintStyledContent(style(text).with(Color::Green).bold()))?
                }
                Tone::Warning | Tone::Own => {
                    queue!(self.out, PrintStyledContent(style(text).with(Color::Yellow)))?
                }
                Tone::Failure => {
                    queue!(self.out, PrintStyledContent(style(text).with(Color::Red).bold()))?
                }
            }
        }
        queue!(self.out, Print("\n"))?;
        self.out.flush()
    }

    fn erase_previous_line(&mut self) -> io::Result<()> {
        queue!(
            self.out,
            cursor::MoveUp(1),
            Clear(ClearType::CurrentLine),
            cursor::MoveToColumn(0)
        )?;
        self.out.flush()
    }
}

impl<W: Write> Renderer for TerminalRenderer<W> {
    fn render(&mut self, line: Line) {
        if let Err(e) = self.write_line(&line) {
            warn!("Terminal write failed: {}", e);
        }
    }

    fn clear_input_line(&mut self) {
        if let Err(e) = self.erase_previous_line() {
            warn!("Terminal write failed: {}", e);
        }
    }
}

/// Keeps every rendered line in memory.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    pub lines: Vec<Line>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn texts(&self) -> Vec<String> {
        self.lines.iter().map(Line::text).collect()
    }
}

impl Renderer for RecordingRenderer {
    fn render(&mut self, line: Line) {
        self.lines.push(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kainet_types::Message;

    fn delivered(body: Body, own: bool) -> Delivered {
        Delivered {
            message: Message {
                id: 1,
                room: "ops".into(),
                author: "alice".into(),
                envelope: String::new(),
                timestamp: 1_700_000_000,
            },
            body,
            own,
        }
    }

    #[test]
    fn message_line_layout() {
        let line = Line::delivered(&delivered(Body::Text("hi".into()), false));
        let text = line.text();

        assert!(text.starts_with('['));
        assert!(text.ends_with("] alice: hi"));
        assert_eq!(line.spans[1].tone, Tone::Accent);
    }

    #[test]
    fn own_messages_use_own_tone() {
        let line = Line::delivered(&delivered(Body::Text("hi".into()), true));
        assert_eq!(line.spans[1].tone, Tone::Own);
    }

    #[test]
    fn undecryptable_shows_placeholder() {
        let line = Line::delivered(&delivered(Body::Undecryptable, false));
        assert!(line.text().ends_with("alice: [DECRYPT ERROR]"));
        assert_eq!(line.spans.last().unwrap().tone, Tone::Failure);
    }

    #[test]
    fn terminal_output_contains_text() {
        let mut buf = Vec::new();
        {
            let mut term = TerminalRenderer::new(&mut buf);
            term.render(Line::step("loading security protocols").push(Tone::Success, " OK"));
        }
        let out = String::from_utf8(buf).unwrap();
        assert!(out.contains("loading security protocols"));
        assert!(out.contains(" OK"));
        assert!(out.ends_with('\n'));
    }
}
