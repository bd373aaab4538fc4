//! Transport Traits
//!
//! Abstraction over the generation endpoint. The streaming session only needs
//! one thing from a transport: open a request and hand back the response body
//! as a stream of byte chunks. Tests plug in scripted transports through the
//! same trait.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::conversation::Turn;

/// Response body as a stream of raw byte chunks
pub type ByteStream = BoxStream<'static, Result<Bytes, TransportError>>;

/// Failures while opening or reading the response
#[derive(Debug, Error)]
pub enum TransportError {
    /// No endpoint was configured
    #[error("no endpoint configured")]
    NoEndpoint,

    /// The request could not be sent
    #[error("request failed: {0}")]
    Request(String),

    /// The endpoint answered with a non-success status
    #[error("endpoint returned {status}: {reason}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Status text or response body
        reason: String,
    },

    /// The response had no body to read (for HTTP, a 204 No Content)
    #[error("response has no body")]
    NoBody,

    /// Reading a chunk from the body failed
    #[error("read failed: {0}")]
    Read(String),
}

/// Outgoing request body: `{ "messages": [...] }`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Turns to send, system prompt first when present
    pub messages: Vec<Turn>,
}

impl GenerateRequest {
    /// Build a request from a conversation snapshot
    ///
    /// A non-empty system prompt is prepended as a `system` turn; it is never
    /// part of the stored conversation.
    #[must_use]
    pub fn new(snapshot: Vec<Turn>, system_prompt: Option<&str>) -> Self {
        let mut messages = Vec::with_capacity(snapshot.len() + 1);
        if let Some(system) = system_prompt.filter(|s| !s.is_empty()) {
            messages.push(Turn::system(system));
        }
        messages.extend(snapshot);
        Self { messages }
    }
}

/// Generation endpoint transport
///
/// Implement this trait to change how requests reach the endpoint.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Transport name for diagnostics
    fn name(&self) -> &str;

    /// Send the request and return the response body
    ///
    /// Resolves once response headers are in. Non-success statuses and a
    /// missing body are reported here, before any chunk is read.
    async fn open(
        &self,
        endpoint: &str,
        request: &GenerateRequest,
    ) -> Result<ByteStream, TransportError>;
}
