//! Analytics Seam
//!
//! Named, fire-and-forget usage events. The engine emits them at the same
//! points a hosted deployment would track; nothing in the engine depends on
//! whether anyone is listening, and a sink that does nothing is a valid
//! sink.

use std::sync::Arc;

/// A usage event
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnalyticsEvent {
    /// A submitted message produced a response stream
    ChatInitiated {
        /// The submitted text
        input: String,
    },
    /// The endpoint rate-limited a request
    RateLimited,
    /// A request or stream failed
    ChatErrored {
        /// The submitted text
        input: String,
        /// The failure text
        error: String,
    },
}

impl AnalyticsEvent {
    /// Event name, for sinks that key on strings
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::ChatInitiated { .. } => "chat-initiated",
            Self::RateLimited => "rate-limited",
            Self::ChatErrored { .. } => "chat-errored",
        }
    }
}

/// Destination for usage events
///
/// Implementations must not block and must not fail loudly - events are
/// purely observational.
pub trait AnalyticsSink: Send + Sync {
    /// Record one event
    fn record(&self, event: &AnalyticsEvent);
}

/// Default sink: events become tracing records
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAnalytics;

impl AnalyticsSink for TracingAnalytics {
    fn record(&self, event: &AnalyticsEvent) {
        match event {
            AnalyticsEvent::ChatInitiated { input } => {
                tracing::info!(event = event.name(), input = %input, "analytics");
            }
            AnalyticsEvent::RateLimited => {
                tracing::info!(event = event.name(), "analytics");
            }
            AnalyticsEvent::ChatErrored { input, error } => {
                tracing::info!(event = event.name(), input = %input, error = %error, "analytics");
            }
        }
    }
}

/// Sink that drops everything
#[derive(Clone, Copy, Debug, Default)]
pub struct NullAnalytics;

impl AnalyticsSink for NullAnalytics {
    fn record(&self, _event: &AnalyticsEvent) {}
}

/// The default sink used when none is supplied
pub fn default_sink() -> Arc<dyn AnalyticsSink> {
    Arc::new(TracingAnalytics)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        let event = AnalyticsEvent::ChatInitiated {
            input: "hi".to_string(),
        };
        assert_eq!(event.name(), "chat-initiated");
        assert_eq!(AnalyticsEvent::RateLimited.name(), "rate-limited");
        let event = AnalyticsEvent::ChatErrored {
            input: "hi".to_string(),
            error: "boom".to_string(),
        };
        assert_eq!(event.name(), "chat-errored");
    }

    #[test]
    fn test_null_sink_accepts_everything() {
        let sink = NullAnalytics;
        sink.record(&AnalyticsEvent::RateLimited);
    }
}
