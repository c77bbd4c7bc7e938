//! MyST markdown parsing, validation and rendering.
//!
//! A markdown file is processed in two passes:
//!
//! 1. [`MarkdownParser::minimal_parse`] reads front matter, builds the
//!    directive block tree and derives the outline (title, table of contents,
//!    anchors, included snippets). Diagnostics are suppressed so the pass can
//!    run for every file before any file is validated.
//! 2. [`MarkdownParser::parse`] repeats the block pass with diagnostics
//!    enabled and renders HTML, validating links against the outlines of the
//!    other pages through a [`DocumentLookup`].
//!
//! # Architecture
//!
//! - [`directive`]: line-based directive engine producing a [`Block`] tree;
//!   plain markdown between directives is kept as chunks.
//! - `events`: pulldown-cmark events of one chunk, shared by the outline
//!   and the renderer so both derive identical heading slugs.
//! - `callout`: code block languages and callout annotations.
//! - `substitution`: layered `{{key}}` scopes.
//! - `links`: link and image URL validation and rewriting.
//! - `render`: HTML output.
//!
//! # Example
//!
//! ```
//! use std::path::Path;
//!
//! use docset_diagnostics::DiagnosticsCollector;
//! use docset_links::FetchedCrossLinks;
//! use docset_markdown::MarkdownParser;
//!
//! let collector = DiagnosticsCollector::new(vec![]);
//! let links = FetchedCrossLinks::empty();
//! let parser = MarkdownParser::new(Path::new("/docs"), &links);
//! let emitter = collector.emitter().for_file("index.md");
//!
//! let rendered = parser.parse_str(Path::new("/docs/index.md"), "# Hello\n\n## World\n", &emitter);
//! assert_eq!(rendered.document.title.as_deref(), Some("Hello"));
//! assert_eq!(rendered.document.toc[0].slug, "world");
//! ```

mod callout;
mod context;
pub mod directive;
mod document;
mod events;
mod fence;
mod front_matter;
mod links;
mod render;
mod slug;
mod substitution;
#[cfg(test)]
mod test_support;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use docset_diagnostics::FileEmitter;
use docset_links::LinkResolver;

pub use callout::{CallOut, EnhancedCode, is_known_language};
pub use context::{
    DocumentLookup, PageInfo, PageTocItem, ParserContext, normalize, relative_url,
};
pub use directive::{Block, DirectiveBlock, MarkdownChunk};
pub use document::MarkdownDocument;
pub use fence::Fence;
pub use front_matter::FrontMatter;
pub use slug::{escape_html, slugify, strip_markdown};
pub use substitution::{PAGE_TITLE_KEY, SubstitutionToken, Substitutions, substitution_tokens};

use crate::directive::parser::parse_blocks;
use crate::render::HtmlRenderer;

/// Errors reading markdown sources.
#[derive(Debug, thiserror::Error)]
pub enum MarkdownError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A fully parsed and rendered file.
#[derive(Clone, Debug)]
pub struct RenderedDocument {
    pub document: MarkdownDocument,
    pub html: String,
}

/// Parses markdown files of one documentation set.
///
/// Holds the immutable, set-wide configuration; every call creates its own
/// [`ParserContext`], so a parser can be shared across threads.
pub struct MarkdownParser<'a> {
    root: &'a Path,
    resolver: &'a dyn LinkResolver,
    url_path_prefix: &'a str,
    substitutions: Arc<BTreeMap<String, String>>,
    documents: Option<&'a dyn DocumentLookup>,
}

impl<'a> MarkdownParser<'a> {
    /// Create a parser for the documentation rooted at `root`.
    pub fn new(root: &'a Path, resolver: &'a dyn LinkResolver) -> Self {
        Self {
            root,
            resolver,
            url_path_prefix: "",
            substitutions: Arc::default(),
            documents: None,
        }
    }

    /// Prefix prepended to rewritten internal URLs.
    #[must_use]
    pub fn with_url_path_prefix(mut self, prefix: &'a str) -> Self {
        self.url_path_prefix = prefix;
        self
    }

    /// Global substitutions. Keys must be lowercase.
    #[must_use]
    pub fn with_substitutions(mut self, substitutions: Arc<BTreeMap<String, String>>) -> Self {
        self.substitutions = substitutions;
        self
    }

    /// Outlines of the other pages, used to validate anchors and derive
    /// link text.
    #[must_use]
    pub fn with_documents(mut self, documents: &'a dyn DocumentLookup) -> Self {
        self.documents = Some(documents);
        self
    }

    pub fn root(&self) -> &Path {
        self.root
    }

    /// Read and parse `path` without reporting diagnostics.
    pub fn minimal_parse(&self, path: &Path, emitter: &FileEmitter) -> Result<MarkdownDocument, MarkdownError> {
        let source = read(path)?;
        Ok(self.minimal_parse_str(path, &source, emitter))
    }

    /// [`minimal_parse`](Self::minimal_parse) of an in-memory source.
    pub fn minimal_parse_str(&self, path: &Path, source: &str, emitter: &FileEmitter) -> MarkdownDocument {
        let quiet = emitter.skipping(true);
        let split = front_matter::split(source);
        let front_matter = self.front_matter(split.front_matter, &quiet);
        let substitutions = self.substitutions(&front_matter, &quiet);
        let context = self.context(path, substitutions, quiet);
        let blocks = parse_blocks(split.body, split.body_line, &context);
        MarkdownDocument::new(front_matter, blocks, &context.substitutions)
    }

    /// Read, validate and render `path`.
    pub fn parse(&self, path: &Path, emitter: &FileEmitter) -> Result<RenderedDocument, MarkdownError> {
        let source = read(path)?;
        Ok(self.parse_str(path, &source, emitter))
    }

    /// [`parse`](Self::parse) of an in-memory source.
    pub fn parse_str(&self, path: &Path, source: &str, emitter: &FileEmitter) -> RenderedDocument {
        tracing::debug!(path = %path.display(), "Parsing markdown");
        let split = front_matter::split(source);
        let front_matter = self.front_matter(split.front_matter, emitter);
        let substitutions = self.substitutions(&front_matter, emitter);
        let mut context = self.context(path, substitutions, emitter.clone());
        let blocks = parse_blocks(split.body, split.body_line, &context);
        let document = MarkdownDocument::new(front_matter, blocks, &context.substitutions);

        if let Some(title) = &document.title {
            context.substitutions = context.substitutions.with_context(PAGE_TITLE_KEY, title.clone());
        }
        let html = HtmlRenderer::new(&context).render(&document.blocks);
        RenderedDocument { document, html }
    }

    fn front_matter(&self, yaml: Option<&str>, emitter: &FileEmitter) -> FrontMatter {
        let Some(yaml) = yaml else {
            return FrontMatter::default();
        };
        match FrontMatter::parse(yaml) {
            Ok(front_matter) => {
                if front_matter.title.as_deref().is_some_and(|t| !t.is_empty()) {
                    emitter.warning(
                        "'title' is no longer supported in yaml frontmatter please use a level 1 header instead.",
                    );
                }
                front_matter
            }
            Err(e) => {
                tracing::debug!(file = emitter.file(), error = %e, "Invalid front matter");
                emitter.error("Failed to parse yaml front matter block.");
                FrontMatter::default()
            }
        }
    }

    fn substitutions(&self, front_matter: &FrontMatter, emitter: &FileEmitter) -> Substitutions {
        Substitutions::new(Arc::clone(&self.substitutions))
            .with_front_matter(&front_matter.substitutions, emitter)
    }

    fn context(&self, path: &Path, substitutions: Substitutions, emitter: FileEmitter) -> ParserContext<'a> {
        ParserContext {
            path: normalize(path),
            root: self.root,
            url_path_prefix: self.url_path_prefix,
            substitutions,
            emitter,
            resolver: self.resolver,
            documents: self.documents,
            include_stack: Vec::new(),
        }
    }
}

fn read(path: &Path) -> Result<String, MarkdownError> {
    std::fs::read_to_string(path).map_err(|source| MarkdownError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeSet, HashMap};

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::test_support::Harness;

    #[test]
    fn test_minimal_parse_is_silent() {
        let mut harness = Harness::new();
        let path = harness.write("index.md", "---\nsub:\n  product: Other\n---\n# Title\n\n[bad](missing.md)\n");
        let emitter = harness.collector.emitter().for_file("index.md");

        let document = harness.parser().minimal_parse(&path, &emitter).unwrap();

        assert_eq!(document.title.as_deref(), Some("Title"));
        assert!(harness.messages().is_empty());
    }

    #[test]
    fn test_front_matter_diagnostics() {
        let mut harness = Harness::new();
        let emitter = harness.collector.emitter().for_file("index.md");
        let parser = harness.parser();
        let path = harness.root().join("index.md");

        parser.parse_str(&path, "---\ntitle: Old\nsub:\n  Product: Other\n  version: '9'\n---\n# T {{version}}\n", &emitter);
        parser.parse_str(&path, "---\nsub: [unclosed\n---\n# T\n", &emitter);

        assert_eq!(
            harness.messages(),
            vec![
                "'title' is no longer supported in yaml frontmatter please use a level 1 header instead.",
                "{product} can not be redeclared in front matter as its a global substitution",
                "Failed to parse yaml front matter block.",
            ]
        );
    }

    #[test]
    fn test_parse_renders_with_page_title_substitution() {
        let mut harness = Harness::new();
        let emitter = harness.collector.emitter().for_file("index.md");
        let path = harness.root().join("index.md");

        let rendered = harness
            .parser()
            .parse_str(&path, "# About {{product}}\n\nYou are reading {{context.page_title}}.\n", &emitter);

        assert_eq!(rendered.document.title.as_deref(), Some("About Elastic"));
        assert_eq!(
            rendered.html,
            r#"<h1 id="about-product">About Elastic</h1><p>You are reading About Elastic.</p>"#
        );
        assert!(harness.messages().is_empty());
    }

    #[test]
    fn test_parse_validates_links_against_documents() {
        let mut harness = Harness::new();
        let target = harness.write("setup.md", "# Setup\n");
        let path = harness.write("index.md", "# Home\n\n[](setup.md#missing)\n");
        let documents: HashMap<PathBuf, Arc<PageInfo>> = HashMap::from([(
            target,
            Arc::new(PageInfo {
                file_name: "setup.md".to_owned(),
                title: "Setup".to_owned(),
                toc: Vec::new(),
                anchors: BTreeSet::new(),
            }),
        )]);
        let emitter = harness.collector.emitter().for_file("index.md");

        let rendered = harness
            .parser()
            .with_documents(&documents)
            .parse(&path, &emitter)
            .unwrap();

        assert!(rendered.html.contains(r#"<a href="/setup#missing">Setup</a>"#));
        assert_eq!(harness.messages(), vec!["`missing` does not exist in setup.md."]);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let harness = Harness::new();
        let emitter = harness.collector.emitter().for_file("nope.md");
        let result = harness.parser().minimal_parse(&harness.root().join("nope.md"), &emitter);
        assert!(matches!(result, Err(MarkdownError::Io { .. })));
    }
}
