//! Shared fixtures for unit tests.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use docset_diagnostics::{Diagnostic, DiagnosticsCollector, MemorySink};
use docset_links::FetchedCrossLinks;
use tempfile::TempDir;

use crate::MarkdownParser;
use crate::context::ParserContext;
use crate::directive::Block;
use crate::directive::parser::parse_blocks;
use crate::substitution::Substitutions;

/// A temporary docset root with a diagnostics collector.
pub(crate) struct Harness {
    pub(crate) dir: TempDir,
    pub(crate) sink: Arc<MemorySink>,
    pub(crate) collector: DiagnosticsCollector,
    pub(crate) links: FetchedCrossLinks,
    pub(crate) globals: Arc<BTreeMap<String, String>>,
}

impl Harness {
    pub(crate) fn new() -> Self {
        let sink = Arc::new(MemorySink::default());
        let collector = DiagnosticsCollector::new(vec![sink.clone()]);
        let globals = BTreeMap::from([("product".to_owned(), "Elastic".to_owned())]);
        Self {
            dir: TempDir::new().unwrap(),
            sink,
            collector,
            links: FetchedCrossLinks::declared(["kibana"]),
            globals: Arc::new(globals),
        }
    }

    pub(crate) fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write `content` to `relative` under the root, creating directories.
    pub(crate) fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    pub(crate) fn context(&self, file: &str) -> ParserContext<'_> {
        ParserContext {
            path: self.root().join(file),
            root: self.root(),
            url_path_prefix: "",
            substitutions: Substitutions::new(Arc::clone(&self.globals)),
            emitter: self.collector.emitter().for_file(file),
            resolver: &self.links,
            documents: None,
            include_stack: Vec::new(),
        }
    }

    pub(crate) fn parser(&self) -> MarkdownParser<'_> {
        MarkdownParser::new(self.root(), &self.links).with_substitutions(Arc::clone(&self.globals))
    }

    /// Block tree of `text` parsed as `index.md`.
    pub(crate) fn blocks(&mut self, text: &str) -> Vec<Block> {
        let context = self.context("index.md");
        parse_blocks(text, 1, &context)
    }

    pub(crate) fn diagnostics(&mut self) -> Vec<Diagnostic> {
        self.collector.drain_pending();
        self.sink.diagnostics()
    }

    pub(crate) fn messages(&mut self) -> Vec<String> {
        self.collector.drain_pending();
        self.sink.messages()
    }
}
