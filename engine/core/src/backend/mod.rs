//! Completion Backend
//!
//! Abstraction over the hosted completion endpoint, plus the HTTP
//! implementation used by the TUI.

pub mod http;
pub mod traits;

pub use http::HttpCompletionBackend;
pub use traits::{
    BackendError, CompletionBackend, CompletionRequest, OutboundMessage, StreamingToken,
};
