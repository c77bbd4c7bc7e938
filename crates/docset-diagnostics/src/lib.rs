//! Diagnostics for docset builds.
//!
//! Every stage of a build (configuration, parsing, link resolution) reports
//! problems as [`Diagnostic`] values instead of failing. Diagnostics flow from
//! many producers into a single consumer:
//!
//! ```text
//! rayon workers ──► Emitter ─┐
//! config loader ──► Emitter ─┼─► unbounded mpsc ──► drain task ──► sinks
//! resolver      ──► Emitter ─┘                        │
//!                                                     └─► error / warning counters
//! ```
//!
//! # Architecture
//!
//! - [`DiagnosticsCollector`] owns the receiving half, the counters and the
//!   registered [`DiagnosticsSink`]s. [`start`](DiagnosticsCollector::start)
//!   spawns the drain task on the current tokio runtime.
//! - [`Emitter`] is the cloneable producer handle. Writes never block.
//! - [`FileEmitter`] binds an emitter to one source file and carries the
//!   "skip validation" flag used by minimal parses.
//!
//! Once [`complete`](DiagnosticsCollector::complete) is called new writes are
//! rejected, and the drain task finishes whatever is already queued before it
//! exits.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use docset_diagnostics::{DiagnosticsCollector, MemorySink};
//!
//! let sink = Arc::new(MemorySink::default());
//! let mut collector = DiagnosticsCollector::new(vec![sink.clone()]);
//! let emitter = collector.emitter();
//!
//! emitter.for_file("docs/index.md").error("Found empty url");
//! collector.drain_pending();
//!
//! assert_eq!(collector.errors(), 1);
//! assert_eq!(sink.messages(), vec!["Found empty url".to_owned()]);
//! ```

mod collector;
mod diagnostic;
mod emitter;
mod sink;

pub use collector::DiagnosticsCollector;
pub use diagnostic::{Diagnostic, Severity};
pub use emitter::{Emitter, FileEmitter};
pub use sink::{DiagnosticsSink, MemorySink, TracingSink};
