//! Streaming Session
//!
//! One request/response lifecycle against the generation endpoint. The read
//! loop runs as its own task and is the only writer of the running buffer;
//! it reports progress as a finite, ordered sequence of [`SessionEvent`]s
//! that ends with exactly one terminal event.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::{mpsc, oneshot};

use super::decoder::ResponseBuffer;
use crate::backend::{GenerateRequest, Transport, TransportError};
use crate::conversation::Conversation;

/// Content committed when a session ends without producing any text
pub const PLACEHOLDER: &str = "...";

/// Why a session finished normally
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FinishReason {
    /// The transport reported end of stream
    Completed,
    /// The session was cancelled
    Cancelled,
}

/// Progress reported by the read loop
#[derive(Debug)]
pub enum SessionEvent {
    /// The running buffer changed; carries the full text so far
    Update(String),
    /// The stream ended or was cancelled
    Finished(FinishReason),
    /// The request or a read failed
    Failed(TransportError),
}

impl SessionEvent {
    /// Whether no further events follow this one
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Update(_))
    }
}

/// Session identifier, for diagnostics
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SessionId(pub u64);

impl SessionId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session_{}", self.0)
    }
}

/// Handle to one in-flight request
///
/// Dropping the handle cancels the read loop. [`finalize`](Self::finalize)
/// and [`fail`](Self::fail) consume the handle, so each session settles its
/// assistant turn at most once.
pub struct StreamingSession {
    id: SessionId,
    events: mpsc::Receiver<SessionEvent>,
    cancel_tx: Option<oneshot::Sender<()>>,
    /// Latest buffer delivered to the consumer
    buffer: String,
}

impl StreamingSession {
    /// Issue the request and start the read loop
    ///
    /// `capacity` bounds the number of undelivered events. Must be called
    /// from within a tokio runtime.
    pub fn start<T>(
        transport: Arc<T>,
        endpoint: impl Into<String>,
        request: GenerateRequest,
        capacity: usize,
    ) -> Self
    where
        T: Transport + ?Sized + 'static,
    {
        let id = SessionId::next();
        let endpoint = endpoint.into();
        let (tx, events) = mpsc::channel(capacity.max(1));
        let (cancel_tx, cancel_rx) = oneshot::channel();

        tracing::info!(
            session = %id,
            transport = transport.name(),
            endpoint = %endpoint,
            messages = request.messages.len(),
            "Starting streaming session"
        );

        tokio::spawn(read_loop(id, transport, endpoint, request, tx, cancel_rx));

        Self {
            id,
            events,
            cancel_tx: Some(cancel_tx),
            buffer: String::new(),
        }
    }

    /// Session identifier
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Latest full buffer delivered through [`SessionEvent::Update`]
    #[must_use]
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Whether any content has been delivered yet
    #[must_use]
    pub fn has_content(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Whether [`cancel`](Self::cancel) has been called
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_tx.is_none()
    }

    /// Wait for the next event
    ///
    /// A closed channel without a terminal event (the read task died) is
    /// reported as a read failure.
    pub async fn next_event(&mut self) -> SessionEvent {
        let event = self.events.recv().await.unwrap_or_else(|| {
            SessionEvent::Failed(TransportError::Read("stream task ended".to_string()))
        });
        self.observe(&event);
        event
    }

    /// Take the next event if one is ready
    pub fn try_next_event(&mut self) -> Option<SessionEvent> {
        let event = match self.events.try_recv() {
            Ok(event) => event,
            Err(mpsc::error::TryRecvError::Empty) => return None,
            Err(mpsc::error::TryRecvError::Disconnected) => {
                SessionEvent::Failed(TransportError::Read("stream task ended".to_string()))
            }
        };
        self.observe(&event);
        Some(event)
    }

    fn observe(&mut self, event: &SessionEvent) {
        if let SessionEvent::Update(text) = event {
            self.buffer.clone_from(text);
        }
    }

    /// Take every event already queued, keeping the newest buffer
    fn drain_queued(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.observe(&event);
        }
    }

    /// Ask the read loop to stop
    ///
    /// Takes effect at the loop's next suspension point. Does not wait for
    /// the transport to acknowledge. Calling it twice is harmless.
    pub fn cancel(&mut self) {
        if let Some(cancel_tx) = self.cancel_tx.take() {
            tracing::debug!(session = %self.id, "Cancelling streaming session");
            let _ = cancel_tx.send(());
        }
    }

    /// Commit the running buffer into the last assistant turn
    ///
    /// Updates the read loop queued but the consumer has not taken yet are
    /// folded in first. An empty buffer commits [`PLACEHOLDER`] instead.
    /// Returns the committed content.
    pub fn finalize(mut self, reason: FinishReason, conversation: &mut Conversation) -> String {
        self.cancel();
        self.drain_queued();
        let content = if self.buffer.is_empty() {
            PLACEHOLDER.to_string()
        } else {
            std::mem::take(&mut self.buffer)
        };

        conversation.commit_last_assistant(&content);
        conversation.settle();

        tracing::info!(
            session = %self.id,
            reason = ?reason,
            chars = content.chars().count(),
            "Streaming session finalized"
        );
        content
    }

    /// Give up after a transport failure
    ///
    /// The assistant turn is left exactly as it is.
    pub fn fail(mut self, error: &TransportError, conversation: &mut Conversation) {
        self.cancel();
        conversation.settle();
        tracing::error!(session = %self.id, error = %error, "Streaming session failed");
    }
}

impl std::fmt::Debug for StreamingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingSession")
            .field("id", &self.id)
            .field("buffer_len", &self.buffer.len())
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Read, decode, suppress, append, notify; strictly in that order
async fn read_loop<T>(
    id: SessionId,
    transport: Arc<T>,
    endpoint: String,
    request: GenerateRequest,
    tx: mpsc::Sender<SessionEvent>,
    mut cancel_rx: oneshot::Receiver<()>,
) where
    T: Transport + ?Sized,
{
    let opened = tokio::select! {
        biased;
        _ = &mut cancel_rx => {
            tracing::debug!(session = %id, "Cancelled before response headers");
            let _ = tx.send(SessionEvent::Finished(FinishReason::Cancelled)).await;
            return;
        }
        opened = transport.open(&endpoint, &request) => opened,
    };

    let mut body = match opened {
        Ok(body) => body,
        Err(e) => {
            let _ = tx.send(SessionEvent::Failed(e)).await;
            return;
        }
    };

    let mut buffer = ResponseBuffer::new();
    let mut chunks: u64 = 0;

    loop {
        let next = tokio::select! {
            biased;
            _ = &mut cancel_rx => {
                tracing::debug!(session = %id, chunks = chunks, "Read loop cancelled");
                let _ = tx.send(SessionEvent::Finished(FinishReason::Cancelled)).await;
                return;
            }
            next = body.next() => next,
        };

        match next {
            Some(Ok(bytes)) => {
                chunks += 1;
                tracing::trace!(session = %id, len = bytes.len(), "Chunk received");
                if buffer.push(&bytes)
                    && tx
                        .send(SessionEvent::Update(buffer.text().to_string()))
                        .await
                        .is_err()
                {
                    // Consumer is gone
                    return;
                }
            }
            Some(Err(e)) => {
                let _ = tx.send(SessionEvent::Failed(e)).await;
                return;
            }
            None => break,
        }
    }

    if buffer.finish() {
        let _ = tx
            .send(SessionEvent::Update(buffer.text().to_string()))
            .await;
    }

    tracing::debug!(session = %id, chunks = chunks, "Stream completed");
    let _ = tx
        .send(SessionEvent::Finished(FinishReason::Completed))
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use pretty_assertions::assert_eq;

    use crate::backend::ByteStream;
    use crate::conversation::Turn;

    /// Transport that replays fixed chunks and then ends
    struct Scripted(Vec<&'static str>);

    #[async_trait]
    impl Transport for Scripted {
        fn name(&self) -> &str {
            "Scripted"
        }

        async fn open(
            &self,
            _endpoint: &str,
            _request: &GenerateRequest,
        ) -> Result<ByteStream, TransportError> {
            let chunks: Vec<Result<Bytes, TransportError>> = self
                .0
                .iter()
                .map(|c| Ok(Bytes::from_static(c.as_bytes())))
                .collect();
            Ok(futures::stream::iter(chunks).boxed())
        }
    }

    /// Transport whose body never yields
    struct Stalled;

    #[async_trait]
    impl Transport for Stalled {
        fn name(&self) -> &str {
            "Stalled"
        }

        async fn open(
            &self,
            _endpoint: &str,
            _request: &GenerateRequest,
        ) -> Result<ByteStream, TransportError> {
            Ok(futures::stream::pending().boxed())
        }
    }

    fn request() -> GenerateRequest {
        GenerateRequest::new(vec![Turn::user("hi"), Turn::assistant("")], None)
    }

    async fn drain(session: &mut StreamingSession) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        loop {
            let event = session.next_event().await;
            let terminal = event.is_terminal();
            events.push(event);
            if terminal {
                return events;
            }
        }
    }

    #[tokio::test]
    async fn test_updates_carry_full_buffer() {
        let transport = Arc::new(Scripted(vec!["Hel", "lo"]));
        let mut session = StreamingSession::start(transport, "test://", request(), 8);

        let events = drain(&mut session).await;
        let updates: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::Update(text) => Some(text.as_str()),
                _ => None,
            })
            .collect();

        assert_eq!(updates, vec!["Hel", "Hello"]);
        assert!(matches!(
            events.last(),
            Some(SessionEvent::Finished(FinishReason::Completed))
        ));
        assert_eq!(session.buffer(), "Hello");
    }

    #[tokio::test]
    async fn test_suppressed_newline_emits_no_update() {
        let transport = Arc::new(Scripted(vec!["a", "\n", "\n"]));
        let mut session = StreamingSession::start(transport, "test://", request(), 8);

        let events = drain(&mut session).await;
        assert_eq!(events.len(), 3);
        assert_eq!(session.buffer(), "a\n");
    }

    #[tokio::test]
    async fn test_cancel_stalled_stream() {
        let mut session = StreamingSession::start(Arc::new(Stalled), "test://", request(), 8);
        session.cancel();
        assert!(session.is_cancelled());

        let event = session.next_event().await;
        assert!(matches!(
            event,
            SessionEvent::Finished(FinishReason::Cancelled)
        ));
    }

    #[tokio::test]
    async fn test_finalize_commits_buffer() {
        let transport = Arc::new(Scripted(vec!["done"]));
        let mut conversation = Conversation::new();
        conversation.submit_user("hi");

        let mut session = StreamingSession::start(transport, "test://", request(), 8);
        drain(&mut session).await;

        let content = session.finalize(FinishReason::Completed, &mut conversation);
        assert_eq!(content, "done");
        assert_eq!(conversation.last(), Some(&Turn::assistant("done")));
    }

    #[tokio::test]
    async fn test_finalize_folds_in_queued_updates() {
        let transport = Arc::new(Scripted(vec!["Hel", "lo"]));
        let mut conversation = Conversation::new();
        conversation.submit_user("hi");

        let session = StreamingSession::start(transport, "test://", request(), 8);
        // Let the read loop queue both updates and the finish without consuming any
        while session.events.len() < 3 {
            tokio::task::yield_now().await;
        }
        assert_eq!(session.buffer(), "");

        let content = session.finalize(FinishReason::Cancelled, &mut conversation);
        assert_eq!(content, "Hello");
        assert_eq!(conversation.last(), Some(&Turn::assistant("Hello")));
    }

    #[tokio::test]
    async fn test_finalize_empty_commits_placeholder() {
        let mut conversation = Conversation::new();
        conversation.submit_user("hi");

        let session = StreamingSession::start(Arc::new(Stalled), "test://", request(), 8);
        let content = session.finalize(FinishReason::Cancelled, &mut conversation);

        assert_eq!(content, PLACEHOLDER);
        assert_eq!(conversation.last(), Some(&Turn::assistant("...")));
    }

    #[test]
    fn test_session_ids_unique() {
        assert_ne!(SessionId::next(), SessionId::next());
    }
}
