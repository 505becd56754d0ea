//! Session State
//!
//! The conversation session: the ordered message list, the draft input, and
//! the single awaiting-response flag. This is the whole state machine of the
//! client - everything else is transport or rendering.
//!
//! # Design Philosophy
//!
//! The session is plain data plus synchronous transitions. It never performs
//! I/O and never triggers a redraw; the caller (the engine) is responsible
//! for opening streams and telling the UI to repaint. That keeps every
//! transition testable without a terminal or a network.
//!
//! # Invariants
//!
//! - Messages are append-only, except that the single in-progress assistant
//!   message grows while its stream is open.
//! - At most one in-progress assistant message exists at any time.
//! - `awaiting_response` is true exactly while a stream is open: set by
//!   `submit`, cleared by `complete_stream`/`fail_stream`. The in-progress
//!   assistant message appears on the first delivered chunk.

use serde::{Deserialize, Serialize};

use crate::messages::{Content, MessageId, Role};

/// A message in the conversation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: MessageId,
    /// Who sent this message
    pub role: Role,
    /// Message content
    pub content: Content,
    /// Whether the message is still receiving stream chunks
    pub streaming: bool,
}

impl Message {
    /// Create a new complete message
    pub fn new(role: Role, content: Content) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content,
            streaming: false,
        }
    }

    /// Create an in-progress assistant message (content arrives in chunks)
    pub fn streaming_assistant() -> Self {
        Self {
            id: MessageId::new(),
            role: Role::Assistant,
            content: Content::empty(),
            streaming: true,
        }
    }

    /// Append a chunk to text content
    ///
    /// Structured content never streams, so a chunk against it is a logic
    /// error upstream; it is ignored with a warning rather than panicking.
    pub fn append(&mut self, chunk: &str) {
        match &mut self.content {
            Content::Text(text) => text.push_str(chunk),
            Content::Structured(_) => {
                tracing::warn!("ignoring stream chunk for structured content");
            }
        }
    }

    /// Seal the message - no further chunks
    pub fn seal(&mut self) {
        self.streaming = false;
    }
}

/// The conversation session
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Session {
    /// Conversation history, oldest first
    messages: Vec<Message>,
    /// Not-yet-submitted input text
    draft: String,
    /// Whether a response stream is open
    awaiting_response: bool,
    /// The in-progress assistant message (if the stream has produced bytes)
    in_progress: Option<MessageId>,
}

impl Session {
    /// Create an empty session
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages, oldest first
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The current draft text
    #[must_use]
    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Whether a response stream is open
    #[must_use]
    pub fn is_awaiting(&self) -> bool {
        self.awaiting_response
    }

    /// Get a message by ID
    #[must_use]
    pub fn get_message(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.id == id)
    }

    /// The in-progress assistant message ID, if any
    #[must_use]
    pub fn in_progress_id(&self) -> Option<&MessageId> {
        self.in_progress.as_ref()
    }

    // ========================================================================
    // Draft editing
    // ========================================================================

    /// Replace the draft text
    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Append a character to the draft
    pub fn push_draft_char(&mut self, c: char) {
        self.draft.push(c);
    }

    /// Insert a literal newline into the draft (Shift+Enter)
    pub fn push_draft_newline(&mut self) {
        self.draft.push('\n');
    }

    /// Remove the last character from the draft
    pub fn pop_draft_char(&mut self) {
        self.draft.pop();
    }

    /// Clear the draft
    pub fn clear_draft(&mut self) {
        self.draft.clear();
    }

    // ========================================================================
    // Stream lifecycle
    // ========================================================================

    /// Submit the current draft as a user message
    ///
    /// Returns `None` without touching any state when the draft is empty or
    /// a response is already pending. Otherwise appends the user message,
    /// clears the draft, marks the session awaiting, and returns the new
    /// message's ID.
    pub fn submit(&mut self) -> Option<MessageId> {
        if self.draft.is_empty() || self.awaiting_response {
            return None;
        }

        let content = std::mem::take(&mut self.draft);
        let msg = Message::new(Role::User, Content::Text(content));
        let id = msg.id.clone();
        self.messages.push(msg);
        self.awaiting_response = true;
        tracing::debug!(message_id = %id.0, "submitted user message");
        Some(id)
    }

    /// Append a stream chunk to the in-progress assistant message
    ///
    /// Creates the in-progress message on the first chunk. Returns the ID of
    /// the message the chunk was applied to.
    pub fn append_assistant(&mut self, chunk: &str) -> MessageId {
        let id = match &self.in_progress {
            Some(id) => id.clone(),
            None => {
                let msg = Message::streaming_assistant();
                let id = msg.id.clone();
                self.messages.push(msg);
                self.in_progress = Some(id.clone());
                id
            }
        };

        if let Some(msg) = self.messages.iter_mut().find(|m| m.id == id) {
            msg.append(chunk);
        }
        id
    }

    /// Finish the open stream successfully
    ///
    /// Seals the in-progress message and clears the awaiting flag.
    /// Idempotent.
    pub fn complete_stream(&mut self) {
        if let Some(id) = self.in_progress.take() {
            if let Some(msg) = self.messages.iter_mut().find(|m| m.id == id) {
                msg.seal();
            }
        }
        self.awaiting_response = false;
    }

    /// Finish the open stream after a failure
    ///
    /// Identical to `complete_stream` except in intent: partial content that
    /// already arrived is retained, never rolled back. Reporting the failure
    /// to the user is the engine's job. Idempotent.
    pub fn fail_stream(&mut self) {
        if self.in_progress.is_some() {
            tracing::debug!("stream failed; retaining partial assistant content");
        }
        self.complete_stream();
    }

    /// Append a function-result message with a structured payload
    ///
    /// Integration point for tool/function output; callers provide an
    /// explicit JSON value rather than a raw response object.
    pub fn push_function_result(&mut self, value: serde_json::Value) -> MessageId {
        let msg = Message::new(Role::Function, Content::Structured(value));
        let id = msg.id.clone();
        self.messages.push(msg);
        id
    }
}
