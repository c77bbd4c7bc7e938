//! CLI command implementations.

pub(crate) mod build;
pub(crate) mod check_links;

use std::sync::Arc;

use docset_diagnostics::{DiagnosticsCollector, DiagnosticsSink, TracingSink};

pub(crate) use build::BuildArgs;
pub(crate) use check_links::CheckLinksArgs;

use crate::error::CliError;
use crate::output::{ConsoleSink, Output};

/// Collector printing to the terminal, and to the log when `verbose`.
///
/// Must be called from within the tokio runtime.
fn start_collector(verbose: bool) -> DiagnosticsCollector {
    let mut sinks: Vec<Arc<dyn DiagnosticsSink>> = vec![Arc::new(ConsoleSink::new())];
    if verbose {
        sinks.push(Arc::new(TracingSink));
    }
    let mut collector = DiagnosticsCollector::new(sinks);
    collector.start();
    collector
}

/// Flush the collector, print totals and turn failures into an error.
async fn finish(mut collector: DiagnosticsCollector, strict: bool) -> Result<(), CliError> {
    collector.stop().await;
    Output::new().summary(&collector);
    match collector.exit_code(strict) {
        0 => Ok(()),
        _ if strict && collector.errors() == 0 => Err(CliError::Validation(
            "Warnings are treated as errors in strict mode".to_owned(),
        )),
        _ => Err(CliError::Validation(format!(
            "Found problems in {} file(s)",
            collector.offending_files().len()
        ))),
    }
}
