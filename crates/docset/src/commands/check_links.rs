//! `docset check-links` command implementation.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use docset_diagnostics::DiagnosticsCollector;
use docset_links::{
    CrossLinkFetcher, FetchedCrossLinks, FileLinksCache, HttpTransport, LinkIndexLinkChecker,
    LinkReference,
};

use super::{finish, start_collector};
use crate::error::CliError;
use crate::output::Output;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Arguments for the check-links command.
#[derive(Args)]
pub(crate) struct CheckLinksArgs {
    /// Only validate links pointing into this repository.
    #[arg(short, long)]
    repository: Option<String>,

    /// Local links.json used in place of the published one of `--repository`.
    #[arg(short, long, requires = "repository")]
    links: Option<PathBuf>,

    /// Directory for cached links.json documents.
    #[arg(long, default_value = ".artifacts/cache/links")]
    cache_dir: PathBuf,
}

impl CheckLinksArgs {
    /// Execute the check-links command.
    ///
    /// # Errors
    ///
    /// Returns an error if link data cannot be fetched or any cross-link is
    /// broken.
    pub(crate) async fn execute(self, verbose: bool) -> Result<(), CliError> {
        let collector = start_collector(verbose);
        let result = tokio::task::block_in_place(|| self.check(&collector));
        match result {
            Ok(()) => finish(collector, false).await,
            Err(e) => {
                let _ = finish(collector, false).await;
                Err(e)
            }
        }
    }

    fn check(&self, collector: &DiagnosticsCollector) -> Result<(), CliError> {
        let output = Output::new();
        let fetcher = CrossLinkFetcher::new(Box::new(HttpTransport::new(FETCH_TIMEOUT)))
            .with_cache(Box::new(FileLinksCache::new(self.cache_dir.clone())));
        let links = self.with_local_override(fetcher.fetch_all()?)?;
        output.info(&format!(
            "Checking cross-links of {} repositories",
            links.link_references.len()
        ));

        let mut checker = LinkIndexLinkChecker::new(&links);
        if let Some(repository) = &self.repository {
            checker = checker.inbound_to(repository.as_str());
        }
        let failures = checker.check(&collector.emitter());
        tracing::info!(failures, "Checked cross-links");
        Ok(())
    }

    fn with_local_override(&self, links: FetchedCrossLinks) -> Result<FetchedCrossLinks, CliError> {
        let (Some(repository), Some(path)) = (&self.repository, &self.links) else {
            return Ok(links);
        };
        let reference = LinkReference::from_json(&fs::read_to_string(path)?)?;
        tracing::info!(repository = %repository, path = %path.display(), "Using local links.json");
        Ok(links.with_reference(repository.as_str(), reference))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use clap::Parser;
    use docset_links::GitCheckoutInformation;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;
    use crate::{Cli, Commands};

    fn args(argv: &[&str]) -> CheckLinksArgs {
        let cli = Cli::try_parse_from(argv).unwrap();
        let Commands::CheckLinks(args) = cli.command else {
            panic!("expected check-links command");
        };
        args
    }

    #[test]
    fn test_links_requires_repository() {
        assert!(Cli::try_parse_from(["docset", "check-links", "--links", "links.json"]).is_err());
    }

    #[test]
    fn test_local_links_override() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("links.json");
        let reference = LinkReference {
            origin: GitCheckoutInformation::unavailable(),
            url_path_prefix: None,
            links: BTreeMap::new(),
            cross_links: vec!["kibana://index.md".to_owned()],
            redirects: None,
        };
        fs::write(&path, reference.to_json().unwrap()).unwrap();
        let path = path.to_string_lossy().into_owned();

        let args = args(&["docset", "check-links", "--repository", "docs-content", "--links", &path]);
        let links = args.with_local_override(FetchedCrossLinks::empty()).unwrap();

        assert_eq!(
            links.link_references["docs-content"].cross_links,
            vec!["kibana://index.md"]
        );
    }
}
