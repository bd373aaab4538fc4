//! Streaming Infrastructure
//!
//! Consumes the unframed response body of one request and turns it into an
//! ordered sequence of buffer updates.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     read loop (task)                          │
//! │                                                               │
//! │   body.next() ──► Utf8StreamDecoder ──► newline rule ──►      │
//! │        ▲                                   │                  │
//! │        │ cancel (oneshot)                  ▼                  │
//! │        │                          ResponseBuffer (owner)      │
//! └────────┼──────────────────────────────────┼───────────────────┘
//!          │                                  │ SessionEvent::Update(full text)
//!          │                                  ▼
//! ┌────────┴──────────────────────────────────────────────────────┐
//! │ StreamingSession (handle) ──► Chat ──► Conversation            │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each read is a single suspension point and cancellation is only observed
//! there, never in the middle of decoding a chunk.

mod decoder;
mod session;

pub use decoder::{is_duplicate_newline, ResponseBuffer, Utf8StreamDecoder};
pub use session::{FinishReason, SessionEvent, SessionId, StreamingSession, PLACEHOLDER};
