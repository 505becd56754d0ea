//! Completion Backend Traits
//!
//! Trait definitions for the completion endpoint. The abstraction keeps the
//! engine independent of any particular hosted provider and lets tests drive
//! the full stream lifecycle with a scripted backend.
//!
//! # Design Philosophy
//!
//! One request per submitted message, carrying the whole conversation. A
//! successful response is an open-ended text stream consumed until the
//! connection closes; everything else is an error the engine translates
//! into a user-visible notification.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::messages::Role;
use crate::session::Message;

/// Stream events from the completion endpoint
#[derive(Clone, Debug)]
pub enum StreamingToken {
    /// A chunk of response text
    Token(String),
    /// Response completed (connection closed cleanly)
    Complete {
        /// The complete message text
        message: String,
    },
    /// Error occurred mid-stream
    Error(String),
}

/// Errors raised while opening a response stream
#[derive(Debug, Error)]
pub enum BackendError {
    /// The endpoint signalled request-quota exhaustion (HTTP 429)
    #[error("rate limited by the completion endpoint")]
    RateLimited,

    /// The endpoint rejected the request with some other status
    #[error("completion endpoint returned {status}: {body}")]
    Endpoint {
        /// HTTP status code
        status: u16,
        /// Response body, if readable
        body: String,
    },

    /// The request never reached the endpoint
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    /// No endpoint URL is configured
    #[error("no completion endpoint configured")]
    NotConfigured,
}

/// One message of conversation context, as the endpoint expects it
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Role name on the wire
    pub role: &'static str,
    /// Flattened message content
    pub content: String,
}

/// A completion request: the full ordered message history
#[derive(Clone, Debug, Default, Serialize)]
pub struct CompletionRequest {
    /// Conversation context, oldest first
    pub messages: Vec<OutboundMessage>,
}

impl CompletionRequest {
    /// Build a request from an optional system prompt and the session history
    ///
    /// The in-progress assistant message (if a stream is somehow still open)
    /// is excluded; everything else is carried, structured content
    /// flattened to its display form.
    pub fn from_history(system: Option<&str>, history: &[Message]) -> Self {
        let mut messages = Vec::with_capacity(history.len() + 1);

        if let Some(system) = system {
            messages.push(OutboundMessage {
                role: Role::System.as_wire_str(),
                content: system.to_string(),
            });
        }

        for msg in history.iter().filter(|m| !m.streaming) {
            messages.push(OutboundMessage {
                role: msg.role.as_wire_str(),
                content: msg.content.to_display_string(),
            });
        }

        Self { messages }
    }
}

/// Completion backend trait
///
/// Implement this to target a different hosted provider.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// Send a request and get a streaming response
    ///
    /// Returns a channel receiver that yields text chunks as they arrive.
    /// The channel closes after a `Complete` or `Error` token. A 429 from
    /// the endpoint surfaces as `BackendError::RateLimited` before any
    /// stream is opened.
    async fn send_streaming(
        &self,
        request: &CompletionRequest,
    ) -> Result<mpsc::Receiver<StreamingToken>, BackendError>;
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::messages::Content;

    #[test]
    fn test_request_carries_full_history() {
        let history = vec![
            Message::new(Role::User, Content::Text("first".to_string())),
            Message::new(Role::Assistant, Content::Text("reply".to_string())),
            Message::new(Role::User, Content::Text("second".to_string())),
        ];

        let request = CompletionRequest::from_history(None, &history);

        assert_eq!(
            request.messages,
            vec![
                OutboundMessage { role: "user", content: "first".to_string() },
                OutboundMessage { role: "assistant", content: "reply".to_string() },
                OutboundMessage { role: "user", content: "second".to_string() },
            ]
        );
    }

    #[test]
    fn test_request_prepends_system_prompt() {
        let history = vec![Message::new(Role::User, Content::Text("hi".to_string()))];
        let request = CompletionRequest::from_history(Some("be brief"), &history);

        assert_eq!(request.messages[0].role, "system");
        assert_eq!(request.messages[0].content, "be brief");
        assert_eq!(request.messages[1].role, "user");
    }

    #[test]
    fn test_request_skips_streaming_message() {
        let mut streaming = Message::streaming_assistant();
        streaming.append("partial");
        let history = vec![
            Message::new(Role::User, Content::Text("hi".to_string())),
            streaming,
        ];

        let request = CompletionRequest::from_history(None, &history);
        assert_eq!(request.messages.len(), 1);
    }

    #[test]
    fn test_request_flattens_structured_content() {
        let history = vec![Message::new(
            Role::Function,
            Content::Structured(serde_json::json!({"ok": true})),
        )];

        let request = CompletionRequest::from_history(None, &history);
        assert_eq!(request.messages[0].role, "function");
        assert!(request.messages[0].content.contains("\"ok\": true"));
    }

    #[test]
    fn test_request_serializes_as_messages_array() {
        let history = vec![Message::new(Role::User, Content::Text("hi".to_string()))];
        let request = CompletionRequest::from_history(None, &history);

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "hi");
    }
}
