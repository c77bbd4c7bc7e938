//! Validation of every published cross-link in the link index.

use docset_diagnostics::Emitter;

use crate::resolver::{CrossLinkError, FetchedCrossLinks};
use crate::uri::CrossLinkUri;

/// Validates the `cross_links` every repository has published.
///
/// With [`inbound_to`](Self::inbound_to) only links pointing into one
/// repository are checked; combined with a local `links.json` swapped into
/// the snapshot this verifies a change before it is published.
pub struct LinkIndexLinkChecker<'a> {
    links: &'a FetchedCrossLinks,
    inbound_to: Option<String>,
}

impl<'a> LinkIndexLinkChecker<'a> {
    #[must_use]
    pub fn new(links: &'a FetchedCrossLinks) -> Self {
        Self {
            links,
            inbound_to: None,
        }
    }

    /// Only check links whose target repository is `repository`.
    #[must_use]
    pub fn inbound_to(mut self, repository: impl Into<String>) -> Self {
        self.inbound_to = Some(repository.into());
        self
    }

    /// Resolve every cross-link, reporting failures against the repository
    /// that published the link. Returns the number of failures.
    pub fn check(&self, emitter: &Emitter) -> usize {
        let mut repositories: Vec<_> = self.links.link_references.iter().collect();
        repositories.sort_by(|a, b| a.0.cmp(b.0));

        let mut failures = 0;
        for (repository, reference) in repositories {
            tracing::info!(repository = %repository, "validating cross links");
            for cross_link in &reference.cross_links {
                let Some(uri) = CrossLinkUri::parse(cross_link) else {
                    emitter.error(repository.as_str(), format!("'{cross_link}' is not a valid cross link uri."));
                    failures += 1;
                    continue;
                };
                if self
                    .inbound_to
                    .as_deref()
                    .is_some_and(|target| uri.scheme != target)
                {
                    continue;
                }
                if let Err(e) = self.links.resolve(&uri) {
                    emitter.error(repository.as_str(), describe(repository, &e));
                    failures += 1;
                }
            }
        }
        failures
    }
}

fn describe(repository: &str, error: &CrossLinkError) -> String {
    match error {
        CrossLinkError::UnknownLink {
            path,
            repository: target,
        } => format!(
            "'elastic/{repository}' links to unknown file: '{path}' in the '{target}' cross link repository."
        ),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use docset_diagnostics::{DiagnosticsCollector, MemorySink};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::LinkReference;

    fn reference(cross_links: &[&str], links: &[&str]) -> LinkReference {
        let links: Vec<String> = links.iter().map(|l| format!(r#""{l}":{{}}"#)).collect();
        LinkReference::from_json(&format!(
            r#"{{"origin":{{"branch":"main","remote":"r","ref":"x"}},"url_path_prefix":"",
            "links":{{{}}},"cross_links":{}}}"#,
            links.join(","),
            serde_json::to_string(cross_links).unwrap()
        ))
        .unwrap()
    }

    fn fetched() -> FetchedCrossLinks {
        FetchedCrossLinks::declared(["docs-content", "kibana"])
            .with_reference("docs-content", reference(&["kibana://index.md"], &["index.md"]))
            .with_reference(
                "kibana",
                reference(
                    &["docs-content://index.md", "docs-content://missing.md", "unknown://a.md"],
                    &["index.md"],
                ),
            )
    }

    #[test]
    fn test_reports_unknown_files_against_source_repository() {
        let sink = Arc::new(MemorySink::default());
        let mut collector = DiagnosticsCollector::new(vec![sink.clone()]);
        let links = fetched();

        let failures = LinkIndexLinkChecker::new(&links).check(&collector.emitter());
        collector.drain_pending();

        assert_eq!(failures, 2);
        assert_eq!(
            sink.messages(),
            vec![
                "'elastic/kibana' links to unknown file: 'missing.md' in the 'docs-content' cross link repository.",
                "'unknown' is not declared as valid cross link repository in docset.yml under cross_links",
            ]
        );
        assert_eq!(collector.offending_files(), vec!["kibana"]);
    }

    #[test]
    fn test_inbound_filter() {
        let sink = Arc::new(MemorySink::default());
        let mut collector = DiagnosticsCollector::new(vec![sink.clone()]);
        let links = fetched();

        let failures = LinkIndexLinkChecker::new(&links)
            .inbound_to("kibana")
            .check(&collector.emitter());
        collector.drain_pending();

        assert_eq!(failures, 0);
        assert!(sink.messages().is_empty());
    }
}
