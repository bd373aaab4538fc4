//! Chat - Submission, Live Updates and Cancellation
//!
//! `Chat` ties the pieces together. It owns:
//! - the [`Conversation`] turn history
//! - the session slot, which is either idle or holds the one live
//!   [`StreamingSession`]
//! - the transport used to reach the endpoint
//! - the channel to the UI surface
//!
//! # Design Philosophy
//!
//! The slot makes "is a request in flight" a property of the type rather
//! than of a nullable handle. Finalizing or failing moves the session out of
//! the slot, so a finished session can never touch the conversation again.
//! Failures stop at this boundary: the surface only ever sees turn updates,
//! loading changes and diagnostic notifications.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::backend::{GenerateRequest, Transport, TransportError};
use crate::conversation::{Conversation, UpdateOutcome};
use crate::messages::{ChatMessage, NotifyLevel};
use crate::streaming::{FinishReason, SessionEvent, StreamingSession};

/// Caller errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChatError {
    /// A submission arrived while a session is still streaming
    #[error("a response is still streaming; cancel it or wait for it to finish")]
    SessionActive,
}

/// Chat configuration
#[derive(Clone, Debug)]
pub struct ChatConfig {
    /// Generation endpoint URL
    pub endpoint: Option<String>,
    /// System prompt sent ahead of the conversation
    pub system_prompt: Option<String>,
    /// Capacity of the session event channel
    pub event_buffer: usize,
    /// Delay surfaces apply before scrolling to the bottom
    pub scroll_delay_ms: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            system_prompt: None,
            event_buffer: 100,
            scroll_delay_ms: 100,
        }
    }
}

impl ChatConfig {
    /// Set the endpoint
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the system prompt
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}

/// Whether a session is in flight
#[derive(Debug, Default)]
enum SessionSlot {
    #[default]
    Idle,
    Active(StreamingSession),
}

/// The chat core
pub struct Chat<T: Transport> {
    config: ChatConfig,
    transport: Arc<T>,
    conversation: Conversation,
    slot: SessionSlot,
    tx: mpsc::Sender<ChatMessage>,
}

impl<T: Transport + 'static> Chat<T> {
    /// Create a chat with the given transport
    pub fn new(transport: T, config: ChatConfig, tx: mpsc::Sender<ChatMessage>) -> Self {
        Self::with_shared_transport(Arc::new(transport), config, tx)
    }

    /// Create a chat around a transport shared with other owners
    pub fn with_shared_transport(
        transport: Arc<T>,
        config: ChatConfig,
        tx: mpsc::Sender<ChatMessage>,
    ) -> Self {
        Self {
            config,
            transport,
            conversation: Conversation::new(),
            slot: SessionSlot::Idle,
            tx,
        }
    }

    /// The conversation so far
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Whether a session is in flight
    pub fn is_loading(&self) -> bool {
        matches!(self.slot, SessionSlot::Active(_))
    }

    /// Current system prompt
    pub fn system_prompt(&self) -> Option<&str> {
        self.config.system_prompt.as_deref()
    }

    /// Current endpoint
    pub fn endpoint(&self) -> Option<&str> {
        self.config.endpoint.as_deref()
    }

    /// Change the endpoint used by later submissions
    pub fn set_endpoint(&mut self, endpoint: Option<String>) {
        self.config.endpoint = endpoint;
    }

    /// Submit user text and start streaming the answer
    ///
    /// Appends the user turn and an empty assistant turn before any network
    /// activity. A missing endpoint fails the session immediately, leaving
    /// the assistant turn empty.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::SessionActive`] while a previous response is
    /// still streaming.
    pub async fn submit(&mut self, text: impl Into<String>) -> Result<(), ChatError> {
        if self.is_loading() {
            tracing::warn!("Submission rejected: session already active");
            return Err(ChatError::SessionActive);
        }

        let snapshot = self.conversation.submit_user(text);
        let first_new = snapshot.len() - 2;
        for (offset, turn) in snapshot[first_new..].iter().enumerate() {
            self.send(ChatMessage::TurnAppended {
                index: first_new + offset,
                turn: turn.clone(),
            })
            .await;
        }
        self.send(ChatMessage::Loading { active: true }).await;

        let Some(endpoint) = self.config.endpoint.clone() else {
            self.report_failure(&TransportError::NoEndpoint).await;
            return Ok(());
        };

        let request = GenerateRequest::new(snapshot, self.config.system_prompt.as_deref());
        let session = StreamingSession::start(
            Arc::clone(&self.transport),
            endpoint,
            request,
            self.config.event_buffer,
        );
        self.slot = SessionSlot::Active(session);
        Ok(())
    }

    /// Wait for the next event of the live session
    ///
    /// Never resolves while idle, so it can sit in a `select!` next to other
    /// event sources.
    pub async fn next_event(&mut self) -> SessionEvent {
        match &mut self.slot {
            SessionSlot::Active(session) => session.next_event().await,
            SessionSlot::Idle => std::future::pending().await,
        }
    }

    /// Apply one session event to the conversation
    pub async fn apply(&mut self, event: SessionEvent) {
        if !self.is_loading() {
            tracing::debug!(?event, "Dropping event: no active session");
            return;
        }

        match event {
            SessionEvent::Update(buffer) => self.apply_update(&buffer).await,
            SessionEvent::Finished(reason) => self.finalize(reason).await,
            SessionEvent::Failed(error) => self.fail(&error).await,
        }
    }

    /// Apply every event that is already available, without waiting
    ///
    /// Returns true if there was activity.
    pub async fn poll(&mut self) -> bool {
        let mut activity = false;
        loop {
            let event = match &mut self.slot {
                SessionSlot::Active(session) => session.try_next_event(),
                SessionSlot::Idle => None,
            };
            let Some(event) = event else {
                return activity;
            };
            activity = true;
            self.apply(event).await;
        }
    }

    /// Drive the live session until it finishes or fails
    pub async fn run_until_idle(&mut self) {
        while self.is_loading() {
            let event = self.next_event().await;
            self.apply(event).await;
        }
    }

    /// Cancel the live session, committing what has arrived so far
    ///
    /// No-op when idle.
    pub async fn cancel(&mut self) {
        if let SessionSlot::Active(session) = &mut self.slot {
            session.cancel();
            self.finalize(FinishReason::Cancelled).await;
        }
    }

    /// Clear the conversation
    ///
    /// A live session is abandoned without finalizing: its turn no longer
    /// exists.
    pub async fn reset_conversation(&mut self) {
        if let SessionSlot::Active(mut session) = std::mem::take(&mut self.slot) {
            tracing::info!(session = %session.id(), "Abandoning session on reset");
            session.cancel();
            self.send(ChatMessage::Loading { active: false }).await;
        }
        self.conversation.reset();
        self.send(ChatMessage::Cleared).await;
    }

    /// Switch the system prompt and start a fresh conversation
    pub async fn set_system_prompt(&mut self, prompt: Option<String>) {
        tracing::info!(prompt = ?prompt, "System prompt changed");
        self.config.system_prompt = prompt;
        self.reset_conversation().await;
    }

    async fn apply_update(&mut self, buffer: &str) {
        let outcome = self.conversation.on_session_update(buffer);
        if outcome == UpdateOutcome::Ignored {
            return;
        }

        self.send(ChatMessage::TurnUpdated {
            index: self.conversation.len() - 1,
            content: buffer.to_string(),
        })
        .await;

        if outcome == UpdateOutcome::Replaced {
            self.send(ChatMessage::ScrollToBottom {
                delay_ms: self.config.scroll_delay_ms,
            })
            .await;
        }
    }

    async fn finalize(&mut self, reason: FinishReason) {
        let SessionSlot::Active(session) = std::mem::take(&mut self.slot) else {
            return;
        };

        let content = session.finalize(reason, &mut self.conversation);
        if let Some(index) = self.conversation.len().checked_sub(1) {
            self.send(ChatMessage::TurnUpdated { index, content }).await;
        }
        self.send(ChatMessage::Loading { active: false }).await;
    }

    async fn fail(&mut self, error: &TransportError) {
        let SessionSlot::Active(session) = std::mem::take(&mut self.slot) else {
            return;
        };

        session.fail(error, &mut self.conversation);
        self.notify(NotifyLevel::Error, &error.to_string()).await;
        self.send(ChatMessage::Loading { active: false }).await;
    }

    /// Failure before a session could start
    async fn report_failure(&mut self, error: &TransportError) {
        tracing::error!(error = %error, "Request not started");
        self.notify(NotifyLevel::Error, &error.to_string()).await;
        self.send(ChatMessage::Loading { active: false }).await;
    }

    async fn notify(&self, level: NotifyLevel, message: &str) {
        self.send(ChatMessage::Notify {
            level,
            message: message.to_string(),
        })
        .await;
    }

    /// Send a message to the UI surface
    async fn send(&self, msg: ChatMessage) {
        if let Err(e) = self.tx.send(msg).await {
            tracing::warn!("Failed to send message to surface: {}", e);
        }
    }
}
