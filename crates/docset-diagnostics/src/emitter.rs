//! Producer handles for the diagnostics channel.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use tokio::sync::mpsc::UnboundedSender;

use crate::Diagnostic;
use crate::collector::Shared;

/// Cloneable producer handle.
///
/// Writes go onto an unbounded queue and never block. After the owning
/// [`DiagnosticsCollector`](crate::DiagnosticsCollector) has been completed,
/// writes are dropped.
#[derive(Clone)]
pub struct Emitter {
    tx: UnboundedSender<Diagnostic>,
    shared: Arc<Shared>,
}

impl Emitter {
    pub(crate) fn new(tx: UnboundedSender<Diagnostic>, shared: Arc<Shared>) -> Self {
        Self { tx, shared }
    }

    /// Queue a diagnostic.
    ///
    /// Returns `false` if the channel no longer accepts writes.
    pub fn emit(&self, diagnostic: Diagnostic) -> bool {
        if self.shared.cancelled.load(Ordering::Acquire) {
            return false;
        }
        self.tx.send(diagnostic).is_ok()
    }

    /// Queue an error without position information.
    pub fn error(&self, file: impl Into<String>, message: impl Into<String>) {
        self.emit(Diagnostic::error(file, message));
    }

    /// Queue a warning without position information.
    pub fn warning(&self, file: impl Into<String>, message: impl Into<String>) {
        self.emit(Diagnostic::warning(file, message));
    }

    /// Record a cross-link URL seen in the documentation set.
    ///
    /// Cross-links bypass the queue; they are collected for `links.json`.
    pub fn emit_cross_link(&self, url: impl Into<String>) {
        if let Ok(mut links) = self.shared.cross_links.lock() {
            links.push(url.into());
        }
    }

    /// Bind this emitter to a source file.
    #[must_use]
    pub fn for_file(&self, file: impl Into<String>) -> FileEmitter {
        FileEmitter {
            emitter: self.clone(),
            file: file.into().into(),
            skip_validation: false,
        }
    }
}

/// An [`Emitter`] bound to one source file.
///
/// When `skip_validation` is set every write is silently discarded; minimal
/// parses use this so diagnostics are only reported once, by the full parse.
#[derive(Clone)]
pub struct FileEmitter {
    emitter: Emitter,
    file: Arc<str>,
    skip_validation: bool,
}

impl FileEmitter {
    /// Suppress all diagnostics written through this handle.
    #[must_use]
    pub fn with_skip_validation(mut self, skip: bool) -> Self {
        self.skip_validation = skip;
        self
    }

    /// Same file, different "skip validation" setting.
    #[must_use]
    pub fn skipping(&self, skip: bool) -> Self {
        self.clone().with_skip_validation(skip)
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn skip_validation(&self) -> bool {
        self.skip_validation
    }

    /// The unbound emitter, for diagnostics attributed to other files.
    pub fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    pub fn error(&self, message: impl Into<String>) {
        self.write(Diagnostic::error(&*self.file, message));
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.write(Diagnostic::warning(&*self.file, message));
    }

    /// Error with a line number (1-indexed).
    pub fn error_at_line(&self, line: usize, message: impl Into<String>) {
        self.write(Diagnostic::error(&*self.file, message).with_line(line));
    }

    /// Warning with a line number (1-indexed).
    pub fn warning_at_line(&self, line: usize, message: impl Into<String>) {
        self.write(Diagnostic::warning(&*self.file, message).with_line(line));
    }

    /// Error with a full source span.
    pub fn error_at(&self, line: usize, column: usize, length: usize, message: impl Into<String>) {
        self.write(Diagnostic::error(&*self.file, message).with_span(line, column, length));
    }

    /// Warning with a full source span.
    pub fn warning_at(
        &self,
        line: usize,
        column: usize,
        length: usize,
        message: impl Into<String>,
    ) {
        self.write(Diagnostic::warning(&*self.file, message).with_span(line, column, length));
    }

    pub fn emit_cross_link(&self, url: impl Into<String>) {
        if !self.skip_validation {
            self.emitter.emit_cross_link(url);
        }
    }

    fn write(&self, diagnostic: Diagnostic) {
        if self.skip_validation {
            return;
        }
        self.emitter.emit(diagnostic);
    }
}
