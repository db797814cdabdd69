//! Logger collaborator
//!
//! Fire-and-forget sink for non-fatal notices such as deprecated variable
//! use. Nothing reads back from it.

/// Host logger
pub trait Logger: Send + Sync {
    fn warn(&self, message: &str);
    fn debug(&self, message: &str);
}

/// Forwards to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn warn(&self, message: &str) {
        tracing::warn!(target: "filterscript", "{message}");
    }

    fn debug(&self, message: &str) {
        tracing::debug!(target: "filterscript", "{message}");
    }
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn warn(&self, _message: &str) {}
    fn debug(&self, _message: &str) {}
}
