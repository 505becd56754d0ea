//! Engine Client
//!
//! Thin wrapper around the embedded chat engine for TUI integration.
//!
//! # Architecture
//!
//! The TUI is a thin client - it doesn't contain any business logic. All
//! session and stream orchestration happens in the engine. The TUI's job is:
//! 1. Convert terminal events to engine calls
//! 2. Receive `EngineMessage`s
//! 3. Apply them to display state and render

use tokio::sync::mpsc;

use engine_core::{
    load_config, ChatEngine, EngineConfig, EngineMessage, EngineState, HttpCompletionBackend,
};

/// Client for the embedded chat engine
pub struct EngineClient {
    /// The embedded engine
    engine: ChatEngine<HttpCompletionBackend>,
    /// Receiver for messages from the engine
    rx: mpsc::Receiver<EngineMessage>,
}

impl EngineClient {
    /// Create a client with configuration from file + environment
    pub fn new() -> Self {
        let config = load_config().unwrap_or_else(|e| {
            tracing::warn!("config file problem, falling back to environment: {e}");
            EngineConfig::from_env()
        });
        Self::with_config(config)
    }

    /// Create a client with explicit configuration
    pub fn with_config(config: EngineConfig) -> Self {
        // Channel for engine -> TUI messages. Headroom above the backend's
        // chunk buffer so a full frame of tokens can never fill it.
        let (tx, rx) = mpsc::channel(256);

        // No endpoint configured is not fatal; the engine reports it and the
        // catalog still renders.
        let backend = HttpCompletionBackend::from_config(&config.endpoint).ok();

        let engine = ChatEngine::new(backend, config, tx);
        Self { engine, rx }
    }

    /// Start the engine (initial state + configuration notices)
    pub async fn start(&mut self) {
        self.engine.start().await;
    }

    /// Submit the current draft
    pub async fn submit(&mut self) {
        self.engine.submit().await;
    }

    /// Poll for stream chunks (call every frame)
    pub async fn poll_streaming(&mut self) -> bool {
        self.engine.poll_streaming().await
    }

    /// Receive all pending messages from the engine (non-blocking)
    pub fn recv_all(&mut self) -> Vec<EngineMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            messages.push(msg);
        }
        messages
    }

    /// The current draft text
    pub fn draft(&self) -> &str {
        self.engine.draft()
    }

    /// Replace the draft text
    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.engine.set_draft(text);
    }

    /// Append a character to the draft
    pub fn push_draft_char(&mut self, c: char) {
        self.engine.push_draft_char(c);
    }

    /// Insert a literal newline into the draft
    pub fn push_draft_newline(&mut self) {
        self.engine.push_draft_newline();
    }

    /// Remove the last character from the draft
    pub fn pop_draft_char(&mut self) {
        self.engine.pop_draft_char();
    }

    /// Whether a response is pending
    pub fn is_awaiting(&self) -> bool {
        self.engine.is_awaiting()
    }

    /// Current engine state
    pub fn state(&self) -> EngineState {
        self.engine.state()
    }
}

impl Default for EngineClient {
    fn default() -> Self {
        Self::new()
    }
}
