//! Conversation Store
//!
//! Holds the ordered turn history and applies live updates from the active
//! streaming session to the most recent assistant turn.
//!
//! # Design Philosophy
//!
//! Turns have no identity beyond their position. A submission always appends
//! a user turn followed by an empty assistant turn, so while a session is live
//! the last turn is the one being written. The store never mutates a turn on
//! its own initiative; it only reacts to session updates and finalization.

use serde::{Deserialize, Serialize};

/// Who authored a turn
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User input
    User,
    /// Generated response
    Assistant,
    /// System prompt (only ever sent, never stored)
    System,
}

/// One message in the conversation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Who authored this turn
    pub role: Role,
    /// Text content
    pub content: String,
}

impl Turn {
    /// Create a turn with the given role and content
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a user turn
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create a system turn
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// What a live update did to the assistant turn
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Empty buffer, or no assistant turn to write into
    Ignored,
    /// First content since the assistant turn was created
    Initialized,
    /// Content replaced with the latest buffer; the surface should scroll
    Replaced,
}

/// Ordered turn history
#[derive(Clone, Debug, Default)]
pub struct Conversation {
    turns: Vec<Turn>,
    /// Whether the current assistant turn has received its first update
    live: bool,
}

impl Conversation {
    /// Create an empty conversation
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a conversation from existing turns
    #[must_use]
    pub fn from_turns(turns: Vec<Turn>) -> Self {
        Self { turns, live: false }
    }

    /// Append a user turn and its empty assistant placeholder
    ///
    /// Returns the snapshot to hand to the streaming session, placeholder
    /// included.
    pub fn submit_user(&mut self, text: impl Into<String>) -> Vec<Turn> {
        self.turns.push(Turn::user(text));
        self.turns.push(Turn::assistant(String::new()));
        self.live = false;
        self.turns.clone()
    }

    /// Mirror the session's running buffer into the last assistant turn
    pub fn on_session_update(&mut self, buffer: &str) -> UpdateOutcome {
        if buffer.is_empty() {
            return UpdateOutcome::Ignored;
        }

        if !self.live {
            if !self.commit_last_assistant(buffer) {
                return UpdateOutcome::Ignored;
            }
            self.live = true;
            return UpdateOutcome::Initialized;
        }

        match self.turns.last_mut() {
            Some(turn) => {
                turn.content.clear();
                turn.content.push_str(buffer);
                UpdateOutcome::Replaced
            }
            None => UpdateOutcome::Ignored,
        }
    }

    /// Write `content` into the last turn if it is an assistant turn
    ///
    /// Returns false when the last turn is missing or not an assistant turn.
    pub fn commit_last_assistant(&mut self, content: &str) -> bool {
        match self.turns.last_mut() {
            Some(turn) if turn.role == Role::Assistant => {
                turn.content = content.to_string();
                true
            }
            _ => false,
        }
    }

    /// Mark the live assistant turn as settled
    pub(crate) fn settle(&mut self) {
        self.live = false;
    }

    /// Clear all turns
    pub fn reset(&mut self) {
        self.turns.clear();
        self.live = false;
    }

    /// All turns in chronological order
    #[must_use]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// The most recent turn
    #[must_use]
    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Number of turns
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether there are no turns
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
