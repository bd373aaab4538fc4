//! Terminal Rendering
//!
//! Turns [`ChatMessage`]s into text for a line-oriented terminal. Live
//! updates carry the full buffer, so only the part not yet printed is
//! written.

use relay_core::{ChatMessage, NotifyLevel, Role};

/// Prompt printed when the chat is ready for input
pub const PROMPT: &str = "> ";

/// Where rendered text goes
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Output {
    /// Conversation text
    Stdout(String),
    /// Diagnostics
    Stderr(String),
}

/// Tracks what has been printed for the assistant turn being streamed
#[derive(Debug, Default)]
pub struct Renderer {
    /// Index of the assistant turn being printed
    current: Option<usize>,
    /// Content of that turn already on screen
    printed: String,
}

impl Renderer {
    /// Create a renderer
    pub fn new() -> Self {
        Self::default()
    }

    /// Render one message
    pub fn render(&mut self, msg: &ChatMessage) -> Option<Output> {
        match msg {
            ChatMessage::TurnAppended { index, turn } => {
                if turn.role == Role::Assistant {
                    self.current = Some(*index);
                    self.printed.clear();
                }
                None
            }
            ChatMessage::TurnUpdated { index, content } => {
                if self.current != Some(*index) {
                    return None;
                }
                self.delta(content).map(Output::Stdout)
            }
            ChatMessage::Loading { active: false } => {
                self.current = None;
                let mut out = String::new();
                if !self.printed.is_empty() && !self.printed.ends_with('\n') {
                    out.push('\n');
                }
                self.printed.clear();
                out.push_str(PROMPT);
                Some(Output::Stdout(out))
            }
            ChatMessage::Cleared => {
                self.current = None;
                self.printed.clear();
                Some(Output::Stdout(format!("(conversation cleared)\n{PROMPT}")))
            }
            ChatMessage::Notify { level, message } => {
                let tag = match level {
                    NotifyLevel::Info => "info",
                    NotifyLevel::Warning => "warning",
                    NotifyLevel::Error => "error",
                };
                Some(Output::Stderr(format!("[{tag}] {message}\n")))
            }
            ChatMessage::Loading { active: true } | ChatMessage::ScrollToBottom { .. } => None,
        }
    }

    /// Text still to print so the screen shows `content`
    fn delta(&mut self, content: &str) -> Option<String> {
        let out = if let Some(rest) = content.strip_prefix(self.printed.as_str()) {
            rest.to_string()
        } else {
            // Content was rewritten rather than extended; reprint it whole
            format!("\n{content}")
        };
        self.printed = content.to_string();
        (!out.is_empty()).then_some(out)
    }
}
