//! Diagnostic sinks.
//!
//! Sinks are invoked by the collector's drain task, one diagnostic at a time,
//! in the order the diagnostics were received.

use std::sync::Mutex;

use crate::{Diagnostic, Severity};

/// Destination for drained diagnostics.
pub trait DiagnosticsSink: Send + Sync {
    fn write(&self, diagnostic: &Diagnostic);
}

/// Forwards diagnostics to `tracing`.
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn write(&self, d: &Diagnostic) {
        let line = d.line.unwrap_or_default();
        let column = d.column.unwrap_or_default();
        match d.severity {
            Severity::Error => {
                tracing::error!(file = %d.file, line, column, "{}", d.message);
            }
            Severity::Warning => {
                tracing::warn!(file = %d.file, line, column, "{}", d.message);
            }
        }
    }
}

/// Keeps every diagnostic in memory.
///
/// Used by tests and by callers that want to inspect diagnostics after the
/// collector has stopped.
#[derive(Default)]
pub struct MemorySink {
    items: Mutex<Vec<Diagnostic>>,
}

impl MemorySink {
    /// Snapshot of all diagnostics written so far.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.items
            .lock()
            .map(|items| items.clone())
            .unwrap_or_default()
    }

    /// Messages of all diagnostics written so far.
    pub fn messages(&self) -> Vec<String> {
        self.diagnostics().into_iter().map(|d| d.message).collect()
    }
}

impl DiagnosticsSink for MemorySink {
    fn write(&self, diagnostic: &Diagnostic) {
        if let Ok(mut items) = self.items.lock() {
            items.push(diagnostic.clone());
        }
    }
}
