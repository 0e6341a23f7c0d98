//! Logging sink passed into the execution layer
//!
//! Components receive an `Arc<dyn LogSink>` at construction instead of
//! reaching for a global logger. Logging never fails from the caller's
//! point of view.

use std::sync::Arc;

/// Receives tag + message pairs for failures and decision points
pub trait LogSink: Send + Sync {
    fn log(&self, tag: &str, message: &str);
    fn error(&self, tag: &str, message: &str);
}

/// Forwards sink events to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, tag: &str, message: &str) {
        tracing::info!(tag = %tag, "{}", message);
    }

    fn error(&self, tag: &str, message: &str) {
        tracing::error!(tag = %tag, "{}", message);
    }
}

/// Sink that drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl LogSink for NullSink {
    fn log(&self, _tag: &str, _message: &str) {}
    fn error(&self, _tag: &str, _message: &str) {}
}

/// Shared tracing sink, the default for the CLI
pub fn tracing_sink() -> Arc<dyn LogSink> {
    Arc::new(TracingSink)
}
