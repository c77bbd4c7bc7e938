//! The documentation set: every file below the root, the navigation tree
//! and the outlines of all pages.
//!
//! # Architecture
//!
//! [`DocumentationSet::new`] discovers and classifies files, builds the
//! [`Navigation`] and validates redirect targets. It does not read markdown.
//!
//! [`DocumentationSet::resolve`] minimally parses every page in parallel and
//! returns a [`PageIndex`]: titles, tables of contents and anchors (merged
//! with those of included snippets). The index is the [`DocumentLookup`] the
//! full parse validates links against.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use docset_config::ConfigurationFile;
use docset_diagnostics::Emitter;
use docset_links::model::AnchorMap;
use docset_links::{GitCheckoutInformation, LinkMetadata, LinkReference, LinkResolver};
use docset_markdown::{
    DocumentLookup, MarkdownDocument, MarkdownParser, PageInfo, PageTocItem, Substitutions,
    normalize, strip_markdown,
};
use rayon::prelude::*;

use crate::files::{DocumentationFile, FileKind, discover};
use crate::navigation::Navigation;
use crate::snippets::SnippetCache;

/// A page after the minimal parse.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkdownPage {
    pub path: PathBuf,
    pub relative_path: String,
    /// Site URL, including the URL path prefix.
    pub url: String,
    pub title: String,
    pub navigation_title: String,
    /// Own headings followed by those of included snippets.
    pub toc: Vec<PageTocItem>,
    pub anchors: BTreeSet<String>,
    pub hidden: bool,
    pub navigation_index: usize,
}

/// Outlines of every page, keyed by relative path.
#[derive(Debug, Default)]
pub struct PageIndex {
    pages: HashMap<String, MarkdownPage>,
    by_path: HashMap<PathBuf, Arc<PageInfo>>,
}

impl PageIndex {
    pub fn get(&self, relative_path: &str) -> Option<&MarkdownPage> {
        self.pages.get(relative_path)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl DocumentLookup for PageIndex {
    fn lookup(&self, path: &Path) -> Option<Arc<PageInfo>> {
        self.by_path.get(path).cloned()
    }
}

/// Site URL of a markdown file.
///
/// `index.md` maps to its folder, other files drop the `.md` extension.
pub fn page_url(relative_path: &str, url_path_prefix: &str) -> String {
    let prefix = url_path_prefix.trim_end_matches('/');
    if relative_path == "index.md" {
        return format!("{prefix}/");
    }
    if let Some(folder) = relative_path.strip_suffix("/index.md") {
        return format!("{prefix}/{folder}/");
    }
    let page = relative_path.strip_suffix(".md").unwrap_or(relative_path);
    format!("{prefix}/{page}")
}

/// Files, navigation and configuration of one documentation root.
pub struct DocumentationSet {
    config: ConfigurationFile,
    url_path_prefix: String,
    substitutions: Arc<BTreeMap<String, String>>,
    files: Vec<DocumentationFile>,
    by_path: HashMap<String, usize>,
    navigation: Navigation,
    anchor_remapping: BTreeMap<String, AnchorMap>,
}

impl DocumentationSet {
    /// Discover the files below the configured root.
    ///
    /// Reports files missing from the table of contents, unreachable pages
    /// and invalid redirect targets.
    pub fn new(config: ConfigurationFile, url_path_prefix: impl Into<String>, emitter: &Emitter) -> Self {
        let config_file = config.source_file.display().to_string();
        let files = discover(&config.root, &config, emitter);
        let by_path = files
            .iter()
            .enumerate()
            .map(|(idx, f)| (f.relative_path.clone(), idx))
            .collect();
        let navigation = Navigation::build(&config.toc, &files, &config_file, emitter);

        for file in files.iter().filter(|f| f.is_markdown()) {
            if navigation.entry(&file.relative_path).is_none() {
                emitter.error(
                    &config_file,
                    format!(
                        "{} is unreachable in the TOC because one of its parents matches exclusion glob",
                        file.relative_path
                    ),
                );
            }
        }

        let substitutions = Arc::new(config.substitutions.clone());
        let mut set = Self {
            config,
            url_path_prefix: url_path_prefix.into(),
            substitutions,
            files,
            by_path,
            navigation,
            anchor_remapping: BTreeMap::new(),
        };
        set.validate_redirects(&config_file, emitter);
        tracing::info!(
            root = %set.config.root.display(),
            files = set.files.len(),
            pages = set.navigation.pages().count(),
            "Created documentation set"
        );
        set
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    pub fn configuration(&self) -> &ConfigurationFile {
        &self.config
    }

    pub fn url_path_prefix(&self) -> &str {
        &self.url_path_prefix
    }

    pub fn files(&self) -> &[DocumentationFile] {
        &self.files
    }

    pub fn file(&self, relative_path: &str) -> Option<&DocumentationFile> {
        self.by_path.get(relative_path).map(|&idx| &self.files[idx])
    }

    pub fn navigation(&self) -> &Navigation {
        &self.navigation
    }

    /// Anchor remaps declared by redirects, keyed by target page.
    pub fn anchor_remapping(&self, relative_path: &str) -> Option<&AnchorMap> {
        self.anchor_remapping.get(relative_path)
    }

    /// Parser configured for this set.
    pub fn parser<'a>(&'a self, resolver: &'a dyn LinkResolver) -> MarkdownParser<'a> {
        MarkdownParser::new(&self.config.root, resolver)
            .with_url_path_prefix(&self.url_path_prefix)
            .with_substitutions(Arc::clone(&self.substitutions))
    }

    /// Minimally parse every page and collect their outlines.
    ///
    /// Anchor remaps of redirects are validated against the result.
    pub fn resolve(&self, parser: &MarkdownParser<'_>, emitter: &Emitter) -> PageIndex {
        let snippets = SnippetCache::new(
            self.files
                .iter()
                .filter(|f| f.kind == FileKind::Snippet)
                .map(|f| normalize(&f.path)),
        );
        let paths: Vec<&str> = self.navigation.pages().collect();
        let pages: Vec<MarkdownPage> = paths
            .par_iter()
            .filter_map(|relative_path| {
                let file = self.file(relative_path)?;
                let file_emitter = emitter.for_file(*relative_path);
                match parser.minimal_parse(&file.path, &file_emitter) {
                    Ok(document) => Some(self.page(file, document, &snippets, parser, emitter)),
                    Err(e) => {
                        file_emitter.error(e.to_string());
                        None
                    }
                }
            })
            .collect();

        let mut index = PageIndex::default();
        for page in pages {
            let file_name = page
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let info = PageInfo {
                file_name,
                title: page.title.clone(),
                toc: page.toc.clone(),
                anchors: page.anchors.clone(),
            };
            index.by_path.insert(normalize(&page.path), Arc::new(info));
            index.pages.insert(page.relative_path.clone(), page);
        }
        self.validate_anchor_remapping(&index, emitter);
        tracing::info!(pages = index.len(), "Resolved documentation tree");
        index
    }

    fn page(
        &self,
        file: &DocumentationFile,
        document: MarkdownDocument,
        snippets: &SnippetCache,
        parser: &MarkdownParser<'_>,
        emitter: &Emitter,
    ) -> MarkdownPage {
        let file_emitter = emitter.for_file(file.relative_path.as_str());
        let title = document.title.as_deref().map(strip_markdown).unwrap_or_else(|| {
            file_emitter.warning("Document has no title, using file name as title.");
            file.relative_path.clone()
        });
        let navigation_title = match document.front_matter.navigation_title.as_deref() {
            Some(nav) if !nav.is_empty() => {
                let quiet = file_emitter.skipping(true);
                let subs = Substitutions::new(Arc::clone(&self.substitutions))
                    .with_front_matter(&document.front_matter.substitutions, &quiet);
                strip_markdown(&subs.replace(nav))
            }
            _ => title.clone(),
        };

        let mut toc = document.toc;
        let mut anchors = document.anchors;
        for snippet in snippets.collect(&document.includes, parser, emitter) {
            toc.extend(snippet.toc.iter().cloned());
            anchors.extend(snippet.anchors.iter().cloned());
        }

        let entry = self.navigation.entry(&file.relative_path);
        MarkdownPage {
            path: file.path.clone(),
            relative_path: file.relative_path.clone(),
            url: page_url(&file.relative_path, &self.url_path_prefix),
            title,
            navigation_title,
            toc,
            anchors,
            hidden: entry.is_some_and(|e| e.hidden),
            navigation_index: entry.map_or(0, |e| e.navigation_index),
        }
    }

    fn validate_redirects(&mut self, config_file: &str, emitter: &Emitter) {
        let Some(redirects) = self.config.redirects.clone() else {
            return;
        };
        for (from, redirect) in &redirects {
            if let Some(to) = &redirect.to {
                self.validate_redirect(from, to, redirect.anchors.as_ref(), config_file, emitter);
            } else if let Some(many) = &redirect.many {
                for candidate in many {
                    if let Some(to) = &candidate.to {
                        self.validate_redirect(from, to, candidate.anchors.as_ref(), config_file, emitter);
                    }
                }
            }
        }
    }

    fn validate_redirect(
        &mut self,
        from: &str,
        to: &str,
        anchors: Option<&AnchorMap>,
        config_file: &str,
        emitter: &Emitter,
    ) {
        let Some(file) = self.file(to) else {
            emitter.error(config_file, format!("Redirect {from} points to {to} which does not exist"));
            return;
        };
        if !file.is_markdown() {
            emitter.error(
                config_file,
                format!("Redirect {from} points to {to} which is not a markdown file"),
            );
            return;
        }
        let Some(anchors) = anchors.filter(|a| !a.is_empty()) else {
            return;
        };
        let remapping = self.anchor_remapping.entry(to.to_owned()).or_default();
        for (old, new) in anchors {
            remapping.entry(old.clone()).or_insert_with(|| new.clone());
        }
    }

    fn validate_anchor_remapping(&self, index: &PageIndex, emitter: &Emitter) {
        let config_file = self.config.source_file.display().to_string();
        for (relative_path, remapping) in &self.anchor_remapping {
            let Some(page) = index.get(relative_path) else {
                continue;
            };
            for value in remapping.values().flatten() {
                if value.is_empty() || value == "!" || page.anchors.contains(&value.to_lowercase()) {
                    continue;
                }
                emitter.error(
                    &config_file,
                    format!("Bad anchor remap '{value}' does not exist in {relative_path}"),
                );
            }
        }
    }

    /// The `links.json` document describing this set.
    pub fn link_reference(
        &self,
        index: &PageIndex,
        origin: GitCheckoutInformation,
        cross_links: Vec<String>,
    ) -> LinkReference {
        let links = self
            .navigation
            .pages()
            .filter_map(|path| index.get(path))
            .map(|page| {
                let anchors = (!page.anchors.is_empty()).then(|| page.anchors.iter().cloned().collect());
                (
                    page.relative_path.clone(),
                    LinkMetadata {
                        anchors,
                        hidden: page.hidden,
                    },
                )
            })
            .collect();
        LinkReference {
            origin,
            url_path_prefix: Some(self.url_path_prefix.clone()).filter(|p| !p.is_empty()),
            links,
            cross_links,
            redirects: self.config.redirects.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use docset_diagnostics::{DiagnosticsCollector, MemorySink};
    use docset_links::FetchedCrossLinks;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    struct Fixture {
        _tmp: TempDir,
        set: DocumentationSet,
        collector: DiagnosticsCollector,
        sink: Arc<MemorySink>,
    }

    impl Fixture {
        fn new(files: &[(&str, &str)]) -> Self {
            let tmp = TempDir::new().unwrap();
            for (path, content) in files {
                let path = tmp.path().join(path);
                fs::create_dir_all(path.parent().unwrap()).unwrap();
                fs::write(path, content).unwrap();
            }
            let sink = Arc::new(MemorySink::default());
            let collector = DiagnosticsCollector::new(vec![sink.clone()]);
            let emitter = collector.emitter();
            let config = ConfigurationFile::load(&tmp.path().join("docset.yml"), &emitter).unwrap();
            let set = DocumentationSet::new(config, "/docs", &emitter);
            Self {
                _tmp: tmp,
                set,
                collector,
                sink,
            }
        }

        fn resolve(&self) -> PageIndex {
            let links = FetchedCrossLinks::empty();
            let parser = self.set.parser(&links);
            self.set.resolve(&parser, &self.collector.emitter())
        }

        fn messages(&mut self) -> Vec<String> {
            self.collector.drain_pending();
            self.sink.messages()
        }
    }

    const DOCSET: &str = "subs:\n  product: Elastic\ntoc:\n  - file: index.md\n  - file: setup.md\n  - hidden: notes.md\n";

    #[test]
    fn test_page_url() {
        assert_eq!(page_url("index.md", ""), "/");
        assert_eq!(page_url("guide/index.md", "/docs"), "/docs/guide/");
        assert_eq!(page_url("guide/setup.md", "/docs/"), "/docs/guide/setup");
    }

    #[test]
    fn test_resolve_merges_snippet_outlines() {
        let mut fixture = Fixture::new(&[
            ("docset.yml", DOCSET),
            (
                "index.md",
                "---\nnavigation_title: Home of {{product}}\n---\n# Welcome to *{{product}}*\n\n:::{include} _snippets/shared.md\n:::\n",
            ),
            ("_snippets/shared.md", "## Shared section\n"),
            ("setup.md", "Setup without a title\n"),
            ("notes.md", "# Notes\n"),
        ]);

        let index = fixture.resolve();
        let home = index.get("index.md").unwrap();

        assert_eq!(home.title, "Welcome to Elastic");
        assert_eq!(home.navigation_title, "Home of Elastic");
        assert_eq!(home.url, "/docs/");
        assert_eq!(home.toc[0].slug, "shared-section");
        assert!(home.anchors.contains("shared-section"));
        assert!(index.get("notes.md").unwrap().hidden);

        let info = index.lookup(&fixture.set.root().join("index.md")).unwrap();
        assert_eq!(info.file_name, "index.md");
        assert_eq!(index.get("setup.md").unwrap().title, "setup.md");
        assert_eq!(
            fixture.messages(),
            vec!["Document has no title, using file name as title."]
        );
    }

    #[test]
    fn test_redirect_validation() {
        let mut fixture = Fixture::new(&[
            ("docset.yml", DOCSET),
            (
                "redirects.yml",
                "redirects:\n  old.md: missing.md\n  logo.md: logo.png\n  moved.md:\n    to: setup.md\n    anchors:\n      old-install: Install\n      gone: ''\n      bad: nope\n",
            ),
            ("index.md", "# Home\n"),
            ("setup.md", "# Setup\n\n## Install\n"),
            ("notes.md", "# Notes\n"),
            ("logo.png", ""),
        ]);
        fixture.resolve();

        let remapping = fixture.set.anchor_remapping("setup.md").unwrap();
        assert_eq!(remapping["old-install"].as_deref(), Some("Install"));
        assert_eq!(
            fixture.messages(),
            vec![
                "Redirect logo.md points to logo.png which is not a markdown file",
                "Redirect old.md points to missing.md which does not exist",
                "Bad anchor remap 'nope' does not exist in setup.md",
            ]
        );
    }

    #[test]
    fn test_link_reference() {
        let fixture = Fixture::new(&[
            ("docset.yml", DOCSET),
            ("index.md", "# Home\n"),
            ("setup.md", "# Setup\n\n## Install\n"),
            ("notes.md", "# Notes\n"),
        ]);
        let index = fixture.resolve();

        let reference = fixture.set.link_reference(
            &index,
            GitCheckoutInformation::unavailable(),
            vec!["kibana://index.md".to_owned()],
        );

        assert_eq!(reference.url_path_prefix.as_deref(), Some("/docs"));
        assert_eq!(reference.links["index.md"].anchors, None);
        assert_eq!(reference.links["setup.md"].anchors, Some(vec!["install".to_owned()]));
        assert!(reference.links["notes.md"].hidden);
        assert_eq!(reference.cross_links, vec!["kibana://index.md"]);
    }
}
