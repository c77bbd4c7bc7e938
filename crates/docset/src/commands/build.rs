//! `docset build` command implementation.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use docset_config::{BuildSettings, CliSettings, Config};
use docset_diagnostics::{DiagnosticsCollector, Emitter};
use docset_links::{
    CrossLinkFetcher, CrossLinkResolver, FetchedCrossLinks, FileLinksCache, HttpTransport,
};
use docset_site::{BuildSummary, DocumentationGenerator, DocumentationSet, git_checkout};

use super::{finish, start_collector};
use crate::error::CliError;
use crate::output::Output;

/// Timeout for link index and `links.json` requests.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Arguments for the build command.
#[derive(Args)]
pub(crate) struct BuildArgs {
    /// Documentation source directory.
    #[arg(short, long, default_value = ".")]
    path: PathBuf,

    /// Output directory (default: <path>/.artifacts/docs/html).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Docset file to use instead of discovering docset.yml.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Prefix prepended to every generated URL.
    #[arg(long, env = "DOCSET_PATH_PREFIX")]
    path_prefix: Option<String>,

    /// Treat warnings as errors.
    #[arg(long)]
    strict: bool,

    /// Do not fetch cross-link data; cross-links are resolved from their URI only.
    #[arg(long)]
    offline: bool,

    /// Directory for cached links.json documents.
    #[arg(long)]
    cache_dir: Option<PathBuf>,
}

impl BuildArgs {
    fn cli_settings(&self) -> CliSettings {
        CliSettings {
            config_file: self.config.clone(),
            output_dir: self.output.clone(),
            url_path_prefix: self.path_prefix.clone(),
            strict: self.strict.then_some(true),
            offline: self.offline.then_some(true),
            cache_dir: self.cache_dir.clone(),
        }
    }

    /// Execute the build command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration or output fails, or if the build
    /// reported errors (or warnings in strict mode).
    pub(crate) async fn execute(self, verbose: bool) -> Result<(), CliError> {
        let collector = start_collector(verbose);
        let result = tokio::task::block_in_place(|| self.build(&collector));
        match result {
            Ok(strict) => finish(collector, strict).await,
            Err(e) => {
                // Flush what was reported before the failure
                let _ = finish(collector, false).await;
                Err(e)
            }
        }
    }

    /// Returns whether the build ran in strict mode.
    fn build(&self, collector: &DiagnosticsCollector) -> Result<bool, CliError> {
        let output = Output::new();
        let emitter = collector.emitter();
        let config = Config::load(&self.path, Some(&self.cli_settings()), &emitter)?;

        output.info(&format!("Source: {}", config.docset.root.display()));
        output.info(&format!("Output: {}", config.build.output_dir.display()));

        let links = fetch_links(&config.build, &config.docset.cross_links, &emitter)?;
        let resolver = CrossLinkResolver::new(links);
        let set = DocumentationSet::new(config.docset, config.build.url_path_prefix.as_str(), &emitter);
        let origin = git_checkout(&config.build.source_dir);

        let BuildSummary { pages, .. } =
            DocumentationGenerator::new(&set, &config.build, &resolver, origin).generate(collector)?;

        output.success(&format!(
            "Built {pages} pages to {}",
            config.build.output_dir.display()
        ));
        Ok(config.build.strict)
    }
}

fn fetch_links(
    settings: &BuildSettings,
    cross_links: &[String],
    emitter: &Emitter,
) -> Result<FetchedCrossLinks, CliError> {
    if settings.offline || cross_links.is_empty() {
        tracing::info!(repositories = cross_links.len(), "Skipping cross-link fetch");
        return Ok(FetchedCrossLinks::declared(cross_links.iter().cloned()));
    }
    let fetcher = CrossLinkFetcher::new(Box::new(HttpTransport::new(FETCH_TIMEOUT)))
        .with_cache(Box::new(FileLinksCache::new(settings.cache_dir.clone())));
    fetcher.fetch_declared(cross_links).map_err(|e| {
        emitter.error(
            settings.source_dir.display().to_string(),
            format!("Could not fetch cross-link data: {e}"),
        );
        CliError::from(e)
    })
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use pretty_assertions::assert_eq;

    use crate::{Cli, Commands};

    #[test]
    fn test_build_args_to_cli_settings() {
        let cli = Cli::parse_from([
            "docset",
            "build",
            "--path",
            "docs",
            "--path-prefix",
            "/guide",
            "--strict",
        ]);
        let Commands::Build(args) = cli.command else {
            panic!("expected build command");
        };

        let settings = args.cli_settings();

        assert_eq!(args.path.to_str(), Some("docs"));
        assert_eq!(settings.url_path_prefix.as_deref(), Some("/guide"));
        assert_eq!(settings.strict, Some(true));
        assert_eq!(settings.offline, None);
        assert_eq!(settings.output_dir, None);
    }
}
