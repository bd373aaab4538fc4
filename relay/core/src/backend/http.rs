//! HTTP Transport
//!
//! POSTs the conversation as JSON and exposes the raw response body as a
//! byte stream. No framing is parsed here: whatever bytes arrive are handed
//! to the session untouched.
//!
//! The client is built without a request timeout. A stalled response blocks
//! until the user cancels it.

use async_trait::async_trait;
use futures::StreamExt;

use super::traits::{ByteStream, GenerateRequest, Transport, TransportError};

/// reqwest-backed transport
#[derive(Clone, Debug, Default)]
pub struct HttpTransport {
    http_client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with a default client
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport around an existing client
    #[must_use]
    pub fn with_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &'static str {
        "HTTP"
    }

    async fn open(
        &self,
        endpoint: &str,
        request: &GenerateRequest,
    ) -> Result<ByteStream, TransportError> {
        let response = self
            .http_client
            .post(endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let reason = status
                .canonical_reason()
                .map_or_else(|| status.to_string(), str::to_string);
            return Err(TransportError::Status {
                status: status.as_u16(),
                reason,
            });
        }

        // A success status that promises no content has nothing to stream
        if status == reqwest::StatusCode::NO_CONTENT {
            return Err(TransportError::NoBody);
        }

        tracing::debug!(
            endpoint = endpoint,
            status = status.as_u16(),
            "Response headers received"
        );

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| TransportError::Read(e.to_string())));

        Ok(stream.boxed())
    }
}
