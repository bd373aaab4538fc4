//! Relay Core - Streaming Conversation Engine
//!
//! This crate consumes a chunked, unframed text response from a generation
//! endpoint and reconciles it, chunk by chunk, into a conversation history,
//! with cancellation at any point. It has no UI dependencies; a surface
//! drives it with submissions and cancels, and renders the [`ChatMessage`]s
//! it sends back.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                        UI Surface                           │
//! │        submit / cancel / reset          ChatMessage         │
//! └───────────────┬─────────────────────────────▲──────────────┘
//!                 │                             │
//! ┌───────────────▼─────────────────────────────┴──────────────┐
//! │                          Chat                               │
//! │  ┌──────────────┐   ┌────────────────────┐   ┌───────────┐  │
//! │  │ Conversation │◄──│ StreamingSession   │◄──│ Transport │  │
//! │  │   (turns)    │   │ (slot: idle/active)│   │  (HTTP)   │  │
//! │  └──────────────┘   └────────────────────┘   └───────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`Chat`]: owns the conversation and the single live session
//! - [`Conversation`]: ordered [`Turn`] history
//! - [`StreamingSession`]: one request/response lifecycle
//! - [`Transport`]: how requests reach the endpoint
//!
//! # Quick Start
//!
//! ```ignore
//! use relay_core::{Chat, ChatConfig, HttpTransport};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let (tx, mut rx) = mpsc::channel(100);
//!     let config = ChatConfig::default().with_endpoint("http://localhost:3000/api/generate");
//!     let mut chat = Chat::new(HttpTransport::new(), config, tx);
//!
//!     chat.submit("Hello!").await.unwrap();
//!     chat.run_until_idle().await;
//!
//!     while let Ok(msg) = rx.try_recv() {
//!         // Render message to UI
//!     }
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`backend`]: transport abstraction and the HTTP implementation
//! - [`chat`]: submission, live updates, finalize and cancellation
//! - [`config`]: TOML/env/CLI configuration
//! - [`conversation`]: turns and the conversation store
//! - [`messages`]: messages from the core to UI surfaces
//! - [`streaming`]: incremental decoding and the streaming session

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod chat;
pub mod config;
pub mod conversation;
pub mod messages;
pub mod streaming;

// Re-exports for convenience
pub use backend::{ByteStream, GenerateRequest, HttpTransport, Transport, TransportError};
pub use chat::{Chat, ChatConfig, ChatError};
pub use config::{
    default_config_path, load_config, load_config_from_path, ConfigError, ConfigOverrides,
    ConfigSource, RelayConfig, RelayToml,
};
pub use conversation::{Conversation, Role, Turn, UpdateOutcome};
pub use messages::{ChatMessage, NotifyLevel};
pub use streaming::{
    FinishReason, ResponseBuffer, SessionEvent, SessionId, StreamingSession, Utf8StreamDecoder,
    PLACEHOLDER,
};
