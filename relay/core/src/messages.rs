//! Chat Messages
//!
//! Messages sent from the chat core to a UI surface. The surface renders what
//! it is told; it never edits the conversation itself.

use serde::{Deserialize, Serialize};

use crate::conversation::Turn;

/// Messages from the chat core to the UI surface
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatMessage {
    /// A turn was appended to the conversation
    TurnAppended {
        /// Position of the new turn
        index: usize,
        /// The turn itself
        turn: Turn,
    },

    /// A turn's content changed (live update or final commit)
    TurnUpdated {
        /// Position of the changed turn
        index: usize,
        /// Full new content
        content: String,
    },

    /// The surface should scroll to the newest content
    ScrollToBottom {
        /// Delay to apply before scrolling, so bursts of updates collapse
        delay_ms: u64,
    },

    /// Loading state changed; new submissions are refused while active
    Loading {
        /// Whether a session is in flight
        active: bool,
    },

    /// The conversation was cleared
    Cleared,

    /// Diagnostic notification
    Notify {
        /// Notification level
        level: NotifyLevel,
        /// Message content
        message: String,
    },
}

/// Notification levels
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotifyLevel {
    /// Informational
    Info,
    /// Warning
    Warning,
    /// Error
    Error,
}
