//! Engine Messages
//!
//! Messages sent from the engine to the UI. These represent all the ways the
//! chat engine can communicate with whatever front end is driving it.
//!
//! # Design Philosophy
//!
//! The engine is the "brain" that owns the session and the response stream.
//! The UI is a pure renderer that displays what the engine tells it to. This
//! separation keeps the session state machine testable without a terminal
//! and leaves the front end free to be swapped out.

use serde::{Deserialize, Serialize};

/// Messages from the engine to the UI.
///
/// The UI should not contain any business logic - just render what it's told.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum EngineMessage {
    /// A complete message to display (user echo, function results)
    Message {
        /// Unique message ID for tracking
        id: MessageId,
        /// Who sent this message
        role: Role,
        /// The message content
        content: Content,
    },

    /// A streaming chunk (partial assistant response)
    Token {
        /// Message ID this chunk belongs to
        message_id: MessageId,
        /// The chunk text
        text: String,
    },

    /// Stream has completed
    StreamEnd {
        /// Message ID that completed
        message_id: MessageId,
        /// Final complete content
        final_content: String,
    },

    /// Stream encountered an error mid-flight
    ///
    /// Content appended before the error is retained; the UI keeps whatever
    /// it already rendered.
    StreamError {
        /// Message ID that errored
        message_id: MessageId,
        /// Error description
        error: String,
    },

    /// User-visible notification
    Notify {
        /// Notification kind
        kind: NotifyKind,
        /// Message content
        message: String,
    },

    /// Engine state change
    State {
        /// The new state
        state: EngineState,
    },
}

/// Message identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    /// Generate a new unique message ID
    pub fn new() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        Self(format!("msg_{id}"))
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

/// Who sent a message
///
/// Closed set - every match site handles all four variants. `Function`
/// carries structured results and gets its own rendering style rather than
/// falling through a silent default.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// User input
    User,
    /// The model's response
    Assistant,
    /// System message
    System,
    /// Function/tool result
    Function,
}

impl Role {
    /// Role name as the completion endpoint expects it
    #[must_use]
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
            Self::Function => "function",
        }
    }
}

/// Message content
///
/// Streaming appends only ever apply to `Text`. `Structured` carries an
/// opaque JSON payload (function results) and renders as formatted JSON.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Content {
    /// Plain or markdown text
    Text(String),
    /// Opaque structured value
    Structured(serde_json::Value),
}

impl Content {
    /// Create empty text content
    #[must_use]
    pub fn empty() -> Self {
        Self::Text(String::new())
    }

    /// The text, if this is text content
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Structured(_) => None,
        }
    }

    /// Render the content as a plain string
    ///
    /// Structured values are pretty-printed.
    #[must_use]
    pub fn to_display_string(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Structured(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
        }
    }
}

/// Notification kinds
///
/// Rate limiting is distinguished from every other failure so the UI can
/// word it differently.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotifyKind {
    /// The endpoint signalled request-quota exhaustion
    RateLimited,
    /// Any other failure (transport, endpoint, configuration)
    GenericError,
}

/// Engine operational states
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    /// Waiting for user input
    Ready,
    /// Request sent, no response bytes yet
    Thinking,
    /// Streaming a response
    Responding,
}

impl EngineState {
    /// Human-readable description for the status line
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Ready => "Ready",
            Self::Thinking => "Thinking...",
            Self::Responding => "Responding...",
        }
    }

    /// Whether a response is pending (submission is blocked)
    #[must_use]
    pub fn is_awaiting(&self) -> bool {
        matches!(self, Self::Thinking | Self::Responding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_id_unique() {
        let id1 = MessageId::new();
        let id2 = MessageId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_role_wire_names() {
        assert_eq!(Role::User.as_wire_str(), "user");
        assert_eq!(Role::Assistant.as_wire_str(), "assistant");
        assert_eq!(Role::System.as_wire_str(), "system");
        assert_eq!(Role::Function.as_wire_str(), "function");
    }

    #[test]
    fn test_content_display() {
        let text = Content::Text("hello".to_string());
        assert_eq!(text.to_display_string(), "hello");
        assert_eq!(text.as_text(), Some("hello"));

        let structured = Content::Structured(serde_json::json!({"status": 200}));
        assert!(structured.as_text().is_none());
        assert!(structured.to_display_string().contains("\"status\": 200"));
    }

    #[test]
    fn test_engine_state_description() {
        assert_eq!(EngineState::Ready.description(), "Ready");
        assert_eq!(EngineState::Responding.description(), "Responding...");
        assert!(!EngineState::Ready.is_awaiting());
        assert!(EngineState::Thinking.is_awaiting());
        assert!(EngineState::Responding.is_awaiting());
    }
}
