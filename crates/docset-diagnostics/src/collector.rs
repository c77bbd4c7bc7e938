//! Single consumer side of the diagnostics channel.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use crate::{Diagnostic, DiagnosticsSink, Emitter, Severity};

type Sinks = Arc<Vec<Arc<dyn DiagnosticsSink>>>;

/// State shared between the collector, its drain task and every emitter.
pub(crate) struct Shared {
    pub(crate) cancelled: AtomicBool,
    wake: Notify,
    errors: AtomicUsize,
    warnings: AtomicUsize,
    offending_files: Mutex<BTreeSet<String>>,
    pub(crate) cross_links: Mutex<Vec<String>>,
}

impl Shared {
    fn handle(&self, diagnostic: &Diagnostic, sinks: &[Arc<dyn DiagnosticsSink>]) {
        match diagnostic.severity {
            Severity::Error => self.errors.fetch_add(1, Ordering::AcqRel),
            Severity::Warning => self.warnings.fetch_add(1, Ordering::AcqRel),
        };
        if let Ok(mut files) = self.offending_files.lock() {
            files.insert(diagnostic.file.clone());
        }
        for sink in sinks {
            sink.write(diagnostic);
        }
    }
}

/// Collects diagnostics from every [`Emitter`] and fans them out to sinks.
///
/// Lifecycle:
///
/// 1. [`new`](Self::new) creates the channel; [`emitter`](Self::emitter) hands
///    out producer handles.
/// 2. [`start`](Self::start) spawns the drain task on the current tokio
///    runtime. Alternatively [`drain_pending`](Self::drain_pending) processes
///    queued items synchronously (tests, single threaded tools).
/// 3. [`complete`](Self::complete) stops accepting writes.
/// 4. [`stop`](Self::stop) waits for the drain task to process the backlog.
pub struct DiagnosticsCollector {
    tx: Option<UnboundedSender<Diagnostic>>,
    rx: Option<UnboundedReceiver<Diagnostic>>,
    shared: Arc<Shared>,
    sinks: Sinks,
    task: Option<JoinHandle<()>>,
}

impl DiagnosticsCollector {
    /// Create a collector writing to `sinks`.
    #[must_use]
    pub fn new(sinks: Vec<Arc<dyn DiagnosticsSink>>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx: Some(tx),
            rx: Some(rx),
            shared: Arc::new(Shared {
                cancelled: AtomicBool::new(false),
                wake: Notify::new(),
                errors: AtomicUsize::new(0),
                warnings: AtomicUsize::new(0),
                offending_files: Mutex::new(BTreeSet::new()),
                cross_links: Mutex::new(Vec::new()),
            }),
            sinks: Arc::new(sinks),
            task: None,
        }
    }

    /// Producer handle for this collector.
    ///
    /// Handles created after [`complete`](Self::complete) reject every write.
    #[must_use]
    pub fn emitter(&self) -> Emitter {
        let tx = match &self.tx {
            Some(tx) => tx.clone(),
            None => mpsc::unbounded_channel().0,
        };
        Emitter::new(tx, Arc::clone(&self.shared))
    }

    /// Spawn the drain task on the current tokio runtime.
    ///
    /// Calling `start` twice is a no-op.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime context.
    pub fn start(&mut self) {
        let Some(rx) = self.rx.take() else {
            return;
        };
        let shared = Arc::clone(&self.shared);
        let sinks = Arc::clone(&self.sinks);
        self.task = Some(tokio::spawn(drain_loop(rx, shared, sinks)));
    }

    /// Process every queued diagnostic on the calling thread.
    ///
    /// Only has an effect when the drain task was not started. Returns the
    /// number of diagnostics processed.
    pub fn drain_pending(&mut self) -> usize {
        let Some(rx) = self.rx.as_mut() else {
            return 0;
        };
        let mut count = 0;
        while let Ok(diagnostic) = rx.try_recv() {
            self.shared.handle(&diagnostic, &self.sinks);
            count += 1;
        }
        count
    }

    /// Stop accepting writes and signal the drain task to finish.
    pub fn complete(&mut self) {
        self.shared.cancelled.store(true, Ordering::Release);
        self.tx = None;
        self.shared.wake.notify_one();
    }

    /// Complete the channel and wait until the backlog has been drained.
    pub async fn stop(&mut self) {
        self.complete();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            tracing::warn!(error = %e, "diagnostics drain task failed");
        }
        self.drain_pending();
    }

    /// Whether [`complete`](Self::complete) has been called.
    pub fn is_completed(&self) -> bool {
        self.shared.cancelled.load(Ordering::Acquire)
    }

    pub fn errors(&self) -> usize {
        self.shared.errors.load(Ordering::Acquire)
    }

    pub fn warnings(&self) -> usize {
        self.shared.warnings.load(Ordering::Acquire)
    }

    /// Files that received at least one diagnostic, sorted.
    pub fn offending_files(&self) -> Vec<String> {
        self.shared
            .offending_files
            .lock()
            .map(|files| files.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Unique cross-link URLs recorded so far, in first-seen order.
    pub fn cross_links(&self) -> Vec<String> {
        let Ok(links) = self.shared.cross_links.lock() else {
            return Vec::new();
        };
        let mut seen = BTreeSet::new();
        links
            .iter()
            .filter(|link| seen.insert(link.as_str()))
            .cloned()
            .collect()
    }

    /// Exit status for a build.
    ///
    /// In strict mode warnings count as failures.
    pub fn exit_code(&self, strict: bool) -> usize {
        if strict {
            self.errors() + self.warnings()
        } else {
            self.errors()
        }
    }
}

async fn drain_loop(mut rx: UnboundedReceiver<Diagnostic>, shared: Arc<Shared>, sinks: Sinks) {
    loop {
        tokio::select! {
            biased;
            item = rx.recv() => match item {
                Some(diagnostic) => shared.handle(&diagnostic, &sinks),
                None => break,
            },
            () = shared.wake.notified() => break,
        }
    }
    // Finish the backlog queued before completion.
    while let Ok(diagnostic) = rx.try_recv() {
        shared.handle(&diagnostic, &sinks);
    }
    tracing::debug!(
        errors = shared.errors.load(Ordering::Acquire),
        warnings = shared.warnings.load(Ordering::Acquire),
        "diagnostics drained"
    );
}
