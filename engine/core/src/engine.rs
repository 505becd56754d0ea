//! Chat Engine
//!
//! The engine owns the session and the response stream. It orchestrates:
//! - Session state transitions (submit, append, complete, fail)
//! - The completion backend and the single open stream
//! - User-visible notifications and analytics events
//!
//! # Design Philosophy
//!
//! The engine is UI-agnostic. It doesn't know or care whether a terminal,
//! a test harness, or something else is driving it. It communicates through
//! [`EngineMessage`]s sent over a channel, and the front end calls its
//! methods directly. The stream is drained cooperatively: the front end
//! calls [`ChatEngine::poll_streaming`] every frame, and chunks are applied
//! to the session in arrival order.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::analytics::{default_sink, AnalyticsEvent, AnalyticsSink};
use crate::backend::{BackendError, CompletionBackend, CompletionRequest, StreamingToken};
use crate::config::EngineConfig;
use crate::messages::{Content, EngineMessage, EngineState, NotifyKind, Role};
use crate::session::{Message, Session};

/// Notification text for a 429 from the endpoint
pub const RATE_LIMIT_NOTICE: &str = "You have reached your request limit for the day.";

/// Notification text when no endpoint is configured
const NOT_CONFIGURED_NOTICE: &str =
    "No completion endpoint configured. Set POSTMUSE_ENDPOINT or add one to config.toml.";

/// The chat engine - headless session and stream orchestration
pub struct ChatEngine<B: CompletionBackend> {
    /// Configuration
    config: EngineConfig,
    /// Completion backend (`None` when no endpoint is configured; the UI
    /// still runs, submits fail with a notification)
    backend: Option<Arc<B>>,
    /// The conversation session
    session: Session,
    /// Analytics sink
    analytics: Arc<dyn AnalyticsSink>,
    /// Current operational state
    state: EngineState,
    /// Channel to the UI
    tx: mpsc::Sender<EngineMessage>,
    /// Receiver for the open stream, if any
    streaming_rx: Option<mpsc::Receiver<StreamingToken>>,
    /// The text of the in-flight submission, for analytics
    pending_input: Option<String>,
}

impl<B: CompletionBackend + 'static> ChatEngine<B> {
    /// Create a new engine
    pub fn new(backend: Option<B>, config: EngineConfig, tx: mpsc::Sender<EngineMessage>) -> Self {
        Self {
            config,
            backend: backend.map(Arc::new),
            session: Session::new(),
            analytics: default_sink(),
            state: EngineState::Ready,
            tx,
            streaming_rx: None,
            pending_input: None,
        }
    }

    /// Replace the analytics sink
    #[must_use]
    pub fn with_analytics(mut self, sink: Arc<dyn AnalyticsSink>) -> Self {
        self.analytics = sink;
        self
    }

    /// The session (read-only)
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Current state
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Whether a response is pending
    pub fn is_awaiting(&self) -> bool {
        self.session.is_awaiting()
    }

    /// Start the engine: report initial state and configuration problems
    pub async fn start(&mut self) {
        self.send(EngineMessage::State { state: self.state }).await;

        if self.backend.is_none() {
            tracing::warn!("starting without a configured completion endpoint");
            self.notify(NotifyKind::GenericError, NOT_CONFIGURED_NOTICE)
                .await;
        }
    }

    // ========================================================================
    // Draft passthroughs
    //
    // The session is the single source of truth for the draft; the front end
    // routes keystrokes here.
    // ========================================================================

    /// The current draft text
    pub fn draft(&self) -> &str {
        self.session.draft()
    }

    /// Replace the draft text
    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.session.set_draft(text);
    }

    /// Append a character to the draft
    pub fn push_draft_char(&mut self, c: char) {
        self.session.push_draft_char(c);
    }

    /// Insert a literal newline into the draft
    pub fn push_draft_newline(&mut self) {
        self.session.push_draft_newline();
    }

    /// Remove the last character from the draft
    pub fn pop_draft_char(&mut self) {
        self.session.pop_draft_char();
    }

    // ========================================================================
    // Stream lifecycle
    // ========================================================================

    /// Submit the current draft
    ///
    /// Silently does nothing when the draft is empty or a response is
    /// already pending. Otherwise echoes the user message to the UI and
    /// opens the response stream.
    pub async fn submit(&mut self) {
        let Some(user_msg_id) = self.session.submit() else {
            return;
        };

        let content = self
            .session
            .get_message(&user_msg_id)
            .and_then(|m| m.content.as_text())
            .unwrap_or_default()
            .to_string();

        self.send(EngineMessage::Message {
            id: user_msg_id,
            role: Role::User,
            content: Content::Text(content.clone()),
        })
        .await;

        self.pending_input = Some(content);
        self.set_state(EngineState::Thinking).await;

        let Some(backend) = self.backend.clone() else {
            self.finish_failed_request(NotifyKind::GenericError, NOT_CONFIGURED_NOTICE.to_string())
                .await;
            return;
        };

        let request = self.build_request();
        match backend.send_streaming(&request).await {
            Ok(rx) => {
                self.streaming_rx = Some(rx);
                if let Some(ref input) = self.pending_input {
                    self.analytics.record(&AnalyticsEvent::ChatInitiated {
                        input: input.clone(),
                    });
                }
            }
            Err(BackendError::RateLimited) => {
                self.analytics.record(&AnalyticsEvent::RateLimited);
                self.finish_failed_request(NotifyKind::RateLimited, RATE_LIMIT_NOTICE.to_string())
                    .await;
            }
            Err(e) => {
                let error = e.to_string();
                self.analytics.record(&AnalyticsEvent::ChatErrored {
                    input: self.pending_input.clone().unwrap_or_default(),
                    error: error.clone(),
                });
                self.finish_failed_request(NotifyKind::GenericError, error)
                    .await;
            }
        }
    }

    /// Poll for stream chunks
    ///
    /// Call this regularly (once per frame). Chunks are applied to the
    /// session in arrival order. Returns true if there was activity.
    pub async fn poll_streaming(&mut self) -> bool {
        // Collect what's available first to avoid borrowing across sends.
        let tokens: Vec<StreamingToken> = {
            let rx = match self.streaming_rx.as_mut() {
                Some(rx) => rx,
                None => return false,
            };

            let mut collected = Vec::new();
            while let Ok(token) = rx.try_recv() {
                let is_terminal = matches!(
                    token,
                    StreamingToken::Complete { .. } | StreamingToken::Error(_)
                );
                collected.push(token);
                if is_terminal {
                    break;
                }
            }
            collected
        };

        if tokens.is_empty() {
            return false;
        }

        for token in tokens {
            match token {
                StreamingToken::Token(text) => {
                    let message_id = self.session.append_assistant(&text);
                    if self.state == EngineState::Thinking {
                        self.set_state(EngineState::Responding).await;
                    }
                    self.send(EngineMessage::Token { message_id, text }).await;
                }

                StreamingToken::Complete { message } => {
                    let message_id = self.session.in_progress_id().cloned();
                    self.session.complete_stream();
                    self.streaming_rx = None;
                    self.pending_input = None;

                    if let Some(message_id) = message_id {
                        self.send(EngineMessage::StreamEnd {
                            message_id,
                            final_content: message,
                        })
                        .await;
                    }
                    self.set_state(EngineState::Ready).await;
                }

                StreamingToken::Error(error) => {
                    // Partial content stays in the session; only the stream
                    // lifecycle is finalized.
                    let message_id = self.session.in_progress_id().cloned();
                    self.session.fail_stream();
                    self.streaming_rx = None;

                    if let Some(message_id) = message_id {
                        self.send(EngineMessage::StreamError {
                            message_id,
                            error: error.clone(),
                        })
                        .await;
                    }

                    self.analytics.record(&AnalyticsEvent::ChatErrored {
                        input: self.pending_input.take().unwrap_or_default(),
                        error: error.clone(),
                    });
                    self.notify(NotifyKind::GenericError, &error).await;
                    self.set_state(EngineState::Ready).await;
                }
            }
        }

        true
    }

    /// Append a function-result message with a structured payload
    ///
    /// Integration stub for tool output; forwards the message to the UI.
    pub async fn push_function_result(&mut self, value: serde_json::Value) {
        let id = self.session.push_function_result(value.clone());
        self.send(EngineMessage::Message {
            id,
            role: Role::Function,
            content: Content::Structured(value),
        })
        .await;
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Build the outbound request from the session history
    fn build_request(&self) -> CompletionRequest {
        let messages = self.session.messages();
        let history: &[Message] = if self.config.max_history_messages > 0 {
            let start = messages
                .len()
                .saturating_sub(self.config.max_history_messages);
            &messages[start..]
        } else {
            messages
        };

        CompletionRequest::from_history(self.config.system_prompt.as_deref(), history)
    }

    /// Finalize a request that failed before producing a stream
    async fn finish_failed_request(&mut self, kind: NotifyKind, message: String) {
        self.session.fail_stream();
        self.pending_input = None;
        self.notify(kind, &message).await;
        self.set_state(EngineState::Ready).await;
    }

    /// Set state and tell the UI
    async fn set_state(&mut self, state: EngineState) {
        self.state = state;
        self.send(EngineMessage::State { state }).await;
    }

    /// Send a notification
    async fn notify(&self, kind: NotifyKind, message: &str) {
        self.send(EngineMessage::Notify {
            kind,
            message: message.to_string(),
        })
        .await;
    }

    /// Send a message to the UI
    async fn send(&self, msg: EngineMessage) {
        if let Err(e) = self.tx.send(msg).await {
            tracing::warn!("Failed to send message to UI: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;

    // Mock backend with scripted behavior
    enum MockBehavior {
        Stream(Vec<&'static str>),
        RateLimited,
        FailRequest,
        FailAfter(Vec<&'static str>),
    }

    struct MockBackend {
        behavior: MockBehavior,
    }

    #[async_trait]
    impl CompletionBackend for MockBackend {
        fn name(&self) -> &str {
            "mock"
        }

        async fn send_streaming(
            &self,
            _request: &CompletionRequest,
        ) -> Result<mpsc::Receiver<StreamingToken>, BackendError> {
            match &self.behavior {
                MockBehavior::Stream(chunks) => {
                    let (tx, rx) = mpsc::channel(16);
                    let chunks: Vec<String> = chunks.iter().map(|s| (*s).to_string()).collect();
                    tokio::spawn(async move {
                        let mut full = String::new();
                        for chunk in chunks {
                            full.push_str(&chunk);
                            let _ = tx.send(StreamingToken::Token(chunk)).await;
                        }
                        let _ = tx.send(StreamingToken::Complete { message: full }).await;
                    });
                    Ok(rx)
                }
                MockBehavior::RateLimited => Err(BackendError::RateLimited),
                MockBehavior::FailRequest => Err(BackendError::Endpoint {
                    status: 500,
                    body: "boom".to_string(),
                }),
                MockBehavior::FailAfter(chunks) => {
                    let (tx, rx) = mpsc::channel(16);
                    let chunks: Vec<String> = chunks.iter().map(|s| (*s).to_string()).collect();
                    tokio::spawn(async move {
                        for chunk in chunks {
                            let _ = tx.send(StreamingToken::Token(chunk)).await;
                        }
                        let _ = tx
                            .send(StreamingToken::Error("connection reset".to_string()))
                            .await;
                    });
                    Ok(rx)
                }
            }
        }
    }

    // Analytics sink that records events for assertions
    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<AnalyticsEvent>>,
    }

    impl AnalyticsSink for RecordingSink {
        fn record(&self, event: &AnalyticsEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    fn engine_with(
        behavior: MockBehavior,
    ) -> (ChatEngine<MockBackend>, mpsc::Receiver<EngineMessage>) {
        let (tx, rx) = mpsc::channel(100);
        let engine = ChatEngine::new(
            Some(MockBackend { behavior }),
            EngineConfig::default(),
            tx,
        );
        (engine, rx)
    }

    /// Drive poll_streaming until the stream closes (bounded)
    async fn drain(engine: &mut ChatEngine<MockBackend>) {
        for _ in 0..100 {
            engine.poll_streaming().await;
            if !engine.is_awaiting() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("stream never finished");
    }

    #[tokio::test]
    async fn test_submit_streams_and_completes() {
        let (mut engine, mut rx) = engine_with(MockBehavior::Stream(vec!["Hi", " there"]));

        engine.set_draft("Hello");
        engine.submit().await;
        assert!(engine.is_awaiting());
        assert_eq!(engine.draft(), "");

        drain(&mut engine).await;

        // Session holds user message + single completed assistant message.
        let messages = engine.session().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].content.as_text(), Some("Hello"));
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].content.as_text(), Some("Hi there"));
        assert!(!messages[1].streaming);
        assert_eq!(engine.state(), EngineState::Ready);

        // UI saw the echo, chunks in order, and the end of stream.
        let mut saw_echo = false;
        let mut chunk_text = String::new();
        let mut saw_end = false;
        while let Ok(msg) = rx.try_recv() {
            match msg {
                EngineMessage::Message {
                    role: Role::User, ..
                } => saw_echo = true,
                EngineMessage::Token { text, .. } => chunk_text.push_str(&text),
                EngineMessage::StreamEnd { final_content, .. } => {
                    saw_end = true;
                    assert_eq!(final_content, "Hi there");
                }
                _ => {}
            }
        }
        assert!(saw_echo);
        assert_eq!(chunk_text, "Hi there");
        assert!(saw_end);
    }

    #[tokio::test]
    async fn test_empty_submit_is_silent() {
        let (mut engine, mut rx) = engine_with(MockBehavior::Stream(vec!["x"]));

        engine.submit().await;

        assert!(!engine.is_awaiting());
        assert!(engine.session().messages().is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_submit_while_awaiting_is_noop() {
        let (mut engine, _rx) = engine_with(MockBehavior::Stream(vec!["x"]));

        engine.set_draft("first");
        engine.submit().await;

        engine.set_draft("second");
        engine.submit().await;

        assert_eq!(engine.session().messages().len(), 1);
        assert_eq!(engine.draft(), "second");
    }

    #[tokio::test]
    async fn test_rate_limited_notifies_once_without_assistant_message() {
        let (tx, mut rx) = mpsc::channel(100);
        let sink = Arc::new(RecordingSink::default());
        let mut engine = ChatEngine::new(
            Some(MockBackend {
                behavior: MockBehavior::RateLimited,
            }),
            EngineConfig::default(),
            tx,
        )
        .with_analytics(sink.clone());

        engine.set_draft("Hello");
        engine.submit().await;

        assert!(!engine.is_awaiting());
        // Only the user message exists - no assistant message was created.
        assert_eq!(engine.session().messages().len(), 1);

        let mut rate_limited_notices = 0;
        while let Ok(msg) = rx.try_recv() {
            if let EngineMessage::Notify {
                kind: NotifyKind::RateLimited,
                message,
            } = msg
            {
                rate_limited_notices += 1;
                assert_eq!(message, RATE_LIMIT_NOTICE);
            }
        }
        assert_eq!(rate_limited_notices, 1);

        let events = sink.events.lock().unwrap();
        assert_eq!(events.as_slice(), &[AnalyticsEvent::RateLimited]);
    }

    #[tokio::test]
    async fn test_request_failure_notifies_generic_error() {
        let (mut engine, mut rx) = engine_with(MockBehavior::FailRequest);

        engine.set_draft("Hello");
        engine.submit().await;

        assert!(!engine.is_awaiting());
        assert_eq!(engine.state(), EngineState::Ready);

        let generic = std::iter::from_fn(|| rx.try_recv().ok())
            .filter(|msg| {
                matches!(
                    msg,
                    EngineMessage::Notify {
                        kind: NotifyKind::GenericError,
                        ..
                    }
                )
            })
            .count();
        assert_eq!(generic, 1);
    }

    #[tokio::test]
    async fn test_mid_stream_failure_retains_partial_content() {
        let (tx, mut rx) = mpsc::channel(100);
        let sink = Arc::new(RecordingSink::default());
        let mut engine = ChatEngine::new(
            Some(MockBackend {
                behavior: MockBehavior::FailAfter(vec!["partial "]),
            }),
            EngineConfig::default(),
            tx,
        )
        .with_analytics(sink.clone());

        engine.set_draft("Hello");
        engine.submit().await;
        drain(&mut engine).await;

        let messages = engine.session().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].content.as_text(), Some("partial "));
        assert!(!messages[1].streaming);

        let mut saw_stream_error = false;
        while let Ok(msg) = rx.try_recv() {
            if let EngineMessage::StreamError { error, .. } = msg {
                saw_stream_error = true;
                assert_eq!(error, "connection reset");
            }
        }
        assert!(saw_stream_error);

        let events = sink.events.lock().unwrap();
        assert!(matches!(
            events.last(),
            Some(AnalyticsEvent::ChatErrored { input, error })
                if input == "Hello" && error == "connection reset"
        ));
    }

    #[tokio::test]
    async fn test_chat_initiated_fires_when_stream_opens() {
        let (tx, _rx) = mpsc::channel(100);
        let sink = Arc::new(RecordingSink::default());
        let mut engine = ChatEngine::new(
            Some(MockBackend {
                behavior: MockBehavior::Stream(vec!["ok"]),
            }),
            EngineConfig::default(),
            tx,
        )
        .with_analytics(sink.clone());

        engine.set_draft("Hello");
        engine.submit().await;

        let events = sink.events.lock().unwrap();
        assert!(matches!(
            events.first(),
            Some(AnalyticsEvent::ChatInitiated { input }) if input == "Hello"
        ));
    }

    #[tokio::test]
    async fn test_no_backend_fails_politely() {
        let (tx, mut rx) = mpsc::channel(100);
        let mut engine: ChatEngine<MockBackend> =
            ChatEngine::new(None, EngineConfig::default(), tx);

        engine.set_draft("Hello");
        engine.submit().await;

        assert!(!engine.is_awaiting());
        let notified = std::iter::from_fn(|| rx.try_recv().ok()).any(|msg| {
            matches!(
                msg,
                EngineMessage::Notify {
                    kind: NotifyKind::GenericError,
                    ..
                }
            )
        });
        assert!(notified);
    }

    #[tokio::test]
    async fn test_resubmit_after_failure_works() {
        let (mut engine, _rx) = engine_with(MockBehavior::FailRequest);

        engine.set_draft("one");
        engine.submit().await;
        assert!(!engine.is_awaiting());

        engine.set_draft("two");
        engine.submit().await;
        // Second user message was accepted.
        assert_eq!(
            engine
                .session()
                .messages()
                .iter()
                .filter(|m| m.role == Role::User)
                .count(),
            2
        );
    }
}
