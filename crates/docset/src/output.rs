//! Colored terminal output utilities.

use console::{Style, Term};
use docset_diagnostics::{Diagnostic, DiagnosticsCollector, DiagnosticsSink, Severity};

/// Terminal output formatter.
pub(crate) struct Output {
    term: Term,
    green: Style,
    yellow: Style,
    red: Style,
}

impl Output {
    /// Create a new output formatter.
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            green: Style::new().green(),
            yellow: Style::new().yellow(),
            red: Style::new().red(),
        }
    }

    /// Print an info message.
    pub(crate) fn info(&self, msg: &str) {
        let _ = self.term.write_line(msg);
    }

    /// Print a success message (green).
    pub(crate) fn success(&self, msg: &str) {
        let _ = self.term.write_line(&self.green.apply_to(msg).to_string());
    }

    /// Print a warning message (yellow).
    pub(crate) fn warning(&self, msg: &str) {
        let _ = self.term.write_line(&self.yellow.apply_to(msg).to_string());
    }

    /// Print an error message (red).
    pub(crate) fn error(&self, msg: &str) {
        let _ = self.term.write_line(&self.red.apply_to(msg).to_string());
    }

    /// Print the error and warning totals of a finished run.
    pub(crate) fn summary(&self, collector: &DiagnosticsCollector) {
        let msg = summary_line(collector.errors(), collector.warnings());
        match (collector.errors(), collector.warnings()) {
            (0, 0) => self.success(&msg),
            (0, _) => self.warning(&msg),
            _ => self.error(&msg),
        }
    }
}

/// Writes each diagnostic to the terminal as it is drained.
pub(crate) struct ConsoleSink {
    output: Output,
}

impl ConsoleSink {
    pub(crate) fn new() -> Self {
        Self { output: Output::new() }
    }
}

impl DiagnosticsSink for ConsoleSink {
    fn write(&self, diagnostic: &Diagnostic) {
        let line = diagnostic.to_string();
        match diagnostic.severity {
            Severity::Error => self.output.error(&line),
            Severity::Warning => self.output.warning(&line),
        }
    }
}

fn summary_line(errors: usize, warnings: usize) -> String {
    let plural = |n: usize, word: &str| if n == 1 { format!("{n} {word}") } else { format!("{n} {word}s") };
    format!("{}, {}", plural(errors, "error"), plural(warnings, "warning"))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_summary_line() {
        assert_eq!(summary_line(0, 0), "0 errors, 0 warnings");
        assert_eq!(summary_line(1, 2), "1 error, 2 warnings");
        assert_eq!(summary_line(3, 1), "3 errors, 1 warning");
    }
}
