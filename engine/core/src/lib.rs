//! Engine Core - Headless chat session engine for postmuse
//!
//! This crate provides the session state machine and stream consumer for a
//! chat client talking to a hosted language-model completion endpoint. It is
//! completely independent of any UI framework: it can drive a TUI, run in a
//! test harness, or be embedded elsewhere.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                      Front End                       │
//! │              (postmuse-tui, tests, ...)              │
//! │                                                      │
//! │        method calls (down)    EngineMessage (up)     │
//! └───────────────┬──────────────────────▲───────────────┘
//!                 │                      │
//! ┌───────────────▼──────────────────────┴───────────────┐
//! │                      ChatEngine                      │
//! │  ┌──────────┐  ┌───────────┐  ┌────────────────────┐ │
//! │  │ Session  │  │  Catalog  │  │      Backend       │ │
//! │  │  State   │  │           │  │ (HTTP stream)      │ │
//! │  └──────────┘  └───────────┘  └────────────────────┘ │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`ChatEngine`]: owns the session and the single open response stream
//! - [`Session`]: ordered messages, draft input, awaiting-response flag
//! - [`EngineMessage`]: messages sent from the engine to the front end
//! - [`CompletionBackend`]: the seam to the hosted endpoint
//! - [`SUGGESTIONS`]: the canned prompt catalog
//!
//! # No UI Dependencies
//!
//! This crate has **zero** dependencies on ratatui, crossterm, or any other
//! UI framework. Every state transition is testable headlessly.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod analytics;
pub mod backend;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod messages;
pub mod session;

// Re-exports for convenience
pub use analytics::{AnalyticsEvent, AnalyticsSink, NullAnalytics, TracingAnalytics};
pub use backend::{
    BackendError, CompletionBackend, CompletionRequest, HttpCompletionBackend, OutboundMessage,
    StreamingToken,
};
pub use catalog::{PromptSuggestion, SUGGESTIONS};
pub use config::{
    default_config_path, load_config, load_config_from_path, ConfigError, EndpointConfig,
    EngineConfig,
};
pub use engine::{ChatEngine, RATE_LIMIT_NOTICE};
pub use messages::{Content, EngineMessage, EngineState, MessageId, NotifyKind, Role};
pub use session::{Message, Session};
