//! Full build of a documentation set.
//!
//! # Pipeline
//!
//! 1. Clear the output directory
//! 2. Resolve the outlines of all pages ([`DocumentationSet::resolve`])
//! 3. Parse and render every page in parallel, validating links against the
//!    outlines
//! 4. Copy images and other static files
//! 5. Write `links.json` describing the set for other repositories

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use docset_config::BuildSettings;
use docset_diagnostics::DiagnosticsCollector;
use docset_links::{GitCheckoutInformation, LinkResolver};
use docset_markdown::MarkdownParser;
use rayon::prelude::*;

use crate::error::BuildError;
use crate::files::{DocumentationFile, FileKind};
use crate::layout::{PageLayout, PageLink};
use crate::set::{DocumentationSet, MarkdownPage, PageIndex};

/// Name of the link reference written next to the pages.
pub const LINKS_FILE: &str = "links.json";

/// Calculate elapsed time in milliseconds.
fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Outcome of a successful build.
#[derive(Clone, Debug, PartialEq)]
pub struct BuildSummary {
    pub pages: usize,
    pub copied_files: usize,
    pub links_file: PathBuf,
}

/// Writes a documentation set to the output directory.
pub struct DocumentationGenerator<'a> {
    set: &'a DocumentationSet,
    settings: &'a BuildSettings,
    resolver: &'a dyn LinkResolver,
    origin: GitCheckoutInformation,
}

impl<'a> DocumentationGenerator<'a> {
    pub fn new(
        set: &'a DocumentationSet,
        settings: &'a BuildSettings,
        resolver: &'a dyn LinkResolver,
        origin: GitCheckoutInformation,
    ) -> Self {
        Self {
            set,
            settings,
            resolver,
            origin,
        }
    }

    /// Build every page.
    ///
    /// Document problems are reported through `collector`; only I/O failures
    /// abort the build.
    pub fn generate(&self, collector: &DiagnosticsCollector) -> Result<BuildSummary, BuildError> {
        let start = Instant::now();
        let emitter = collector.emitter();
        if !self.set.root().is_dir() {
            return Err(BuildError::SourceNotFound(self.set.root().to_path_buf()));
        }
        self.clear_output()?;

        let resolve_start = Instant::now();
        let index = self.set.resolve(&self.set.parser(self.resolver), &emitter);
        let resolve_ms = elapsed_ms(resolve_start);

        let render_start = Instant::now();
        let parser = self.set.parser(self.resolver).with_documents(&index);
        let pages = self.render_pages(&parser, &index, collector)?;
        let render_ms = elapsed_ms(render_start);

        let copied_files = self.copy_files()?;

        let reference = self
            .set
            .link_reference(&index, self.origin.clone(), collector.cross_links());
        let links_file = self.settings.output_dir.join(LINKS_FILE);
        fs::write(&links_file, reference.to_json()?).map_err(BuildError::write(&links_file))?;

        tracing::info!(
            pages,
            copied_files,
            resolve_ms,
            render_ms,
            elapsed_ms = elapsed_ms(start),
            output = %self.settings.output_dir.display(),
            "Generated documentation"
        );
        Ok(BuildSummary {
            pages,
            copied_files,
            links_file,
        })
    }

    fn clear_output(&self) -> Result<(), BuildError> {
        let output = &self.settings.output_dir;
        if self.set.root().starts_with(output) {
            return Err(BuildError::OutputContainsSource(output.clone()));
        }
        if output.exists() {
            tracing::debug!(output = %output.display(), "Clearing output directory");
            fs::remove_dir_all(output).map_err(BuildError::write(output))?;
        }
        fs::create_dir_all(output).map_err(BuildError::write(output))
    }

    fn render_pages(
        &self,
        parser: &MarkdownParser<'_>,
        index: &PageIndex,
        collector: &DiagnosticsCollector,
    ) -> Result<usize, BuildError> {
        let emitter = collector.emitter();
        let navigation = self.set.navigation();
        let pages: Vec<&MarkdownPage> = navigation.pages().filter_map(|p| index.get(p)).collect();
        let processed = AtomicUsize::new(0);

        pages.par_iter().try_for_each(|&page| -> Result<(), BuildError> {
            let file_emitter = emitter.for_file(page.relative_path.as_str());
            let rendered = parser.parse(&page.path, &file_emitter)?;

            let link = |path: Option<&str>| path.and_then(|p| index.get(p)).map(PageLink::from);
            let layout = PageLayout {
                page,
                project: self.set.configuration().project.as_deref(),
                parents: navigation
                    .parents(&page.relative_path)
                    .into_iter()
                    .rev()
                    .filter_map(|p| link(Some(p)))
                    .collect(),
                previous: link(navigation.previous(&page.relative_path)),
                next: link(navigation.next(&page.relative_path)),
            };

            let output = self.output_path(&page.relative_path);
            write_file(&output, &layout.render(&rendered.html))?;

            let done = processed.fetch_add(1, Ordering::Relaxed) + 1;
            if done % 100 == 0 {
                tracing::info!(processed = done, total = pages.len(), "Rendering pages");
            }
            Ok(())
        })?;

        Ok(processed.into_inner())
    }

    fn copy_files(&self) -> Result<usize, BuildError> {
        let config_file = &self.set.configuration().source_file;
        let copied: Vec<&DocumentationFile> = self
            .set
            .files()
            .iter()
            .filter(|f| matches!(f.kind, FileKind::Image { .. } | FileKind::Static))
            .filter(|f| &f.path != config_file)
            .collect();

        copied.par_iter().try_for_each(|file| -> Result<(), BuildError> {
            let target = self.settings.output_dir.join(&file.relative_path);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(BuildError::write(parent))?;
            }
            fs::copy(&file.path, &target).map_err(BuildError::write(&target))?;
            Ok(())
        })?;
        tracing::debug!(files = copied.len(), "Copied static files");
        Ok(copied.len())
    }

    /// `index.md` becomes `index.html`, other pages `<name>/index.html`.
    fn output_path(&self, relative_path: &str) -> PathBuf {
        let page = relative_path.strip_suffix(".md").unwrap_or(relative_path);
        let folder = if page == "index" {
            ""
        } else {
            page.strip_suffix("/index").unwrap_or(page)
        };
        self.settings.output_dir.join(folder).join("index.html")
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), BuildError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(BuildError::write(parent))?;
    }
    fs::write(path, contents).map_err(BuildError::write(path))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use docset_diagnostics::MemorySink;
    use docset_links::{FetchedCrossLinks, LinkReference};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;
    use docset_config::ConfigurationFile;

    fn write(root: &Path, path: &str, content: &str) {
        let path = root.join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn settings(source: &Path, output: &Path) -> BuildSettings {
        BuildSettings {
            source_dir: source.to_path_buf(),
            output_dir: output.to_path_buf(),
            url_path_prefix: String::new(),
            strict: false,
            offline: true,
            cache_dir: output.join(".cache"),
        }
    }

    #[test]
    fn test_generate_site() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("docs");
        let output = tmp.path().join("out");
        write(
            &source,
            "docset.yml",
            "project: Guide\ntoc:\n  - file: index.md\n  - folder: guide\n    children:\n      - file: index.md\n      - file: setup.md\n",
        );
        write(&source, "index.md", "# Home\n\nSee [setup](guide/setup.md#install).\n");
        write(&source, "guide/index.md", "# Guide\n");
        write(&source, "guide/setup.md", "# Setup\n\n## Install\n\n![logo](../images/logo.png)\n");
        write(&source, "images/logo.png", "png");
        write(&output, "stale.html", "old");

        let sink = Arc::new(MemorySink::default());
        let mut collector = DiagnosticsCollector::new(vec![sink.clone()]);
        let config = ConfigurationFile::load(&source.join("docset.yml"), &collector.emitter()).unwrap();
        let set = DocumentationSet::new(config, "", &collector.emitter());
        let settings = settings(&source, &output);
        let links = FetchedCrossLinks::empty();

        let summary = DocumentationGenerator::new(&set, &settings, &links, GitCheckoutInformation::unavailable())
            .generate(&collector)
            .unwrap();
        collector.drain_pending();

        assert_eq!(sink.messages(), Vec::<String>::new());
        assert_eq!(summary.pages, 3);
        assert_eq!(summary.copied_files, 1);
        assert!(!output.join("stale.html").exists());
        assert!(output.join("images/logo.png").exists());

        let home = fs::read_to_string(output.join("index.html")).unwrap();
        assert!(home.contains("<title>Home | Guide</title>"));
        assert!(home.contains("<a rel=\"next\" href=\"/guide/\">Guide</a>"));

        let setup = fs::read_to_string(output.join("guide/setup/index.html")).unwrap();
        assert!(setup.contains("<li><a href=\"/\">Home</a></li><li><a href=\"/guide/\">Guide</a></li>"));
        assert!(setup.contains("<a rel=\"prev\" href=\"/guide/\">Guide</a>"));

        let reference = LinkReference::from_json(&fs::read_to_string(summary.links_file).unwrap()).unwrap();
        let paths: Vec<_> = reference.links.keys().map(String::as_str).collect();
        assert_eq!(paths, vec!["guide/index.md", "guide/setup.md", "index.md"]);
        assert_eq!(
            reference.links["guide/setup.md"].anchors,
            Some(vec!["install".to_owned()])
        );
    }

    #[test]
    fn test_refuses_output_containing_sources() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("docs");
        write(&source, "docset.yml", "toc:\n  - file: index.md\n");
        write(&source, "index.md", "# Home\n");

        let collector = DiagnosticsCollector::new(vec![]);
        let config = ConfigurationFile::load(&source.join("docset.yml"), &collector.emitter()).unwrap();
        let set = DocumentationSet::new(config, "", &collector.emitter());
        let settings = settings(&source, tmp.path());
        let links = FetchedCrossLinks::empty();

        let result = DocumentationGenerator::new(&set, &settings, &links, GitCheckoutInformation::unavailable())
            .generate(&collector);

        assert!(matches!(result, Err(BuildError::OutputContainsSource(_))));
        assert!(source.join("index.md").exists());
    }
}
