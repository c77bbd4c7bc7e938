//! Anchors and headings contributed by included snippets.
//!
//! A page that includes a snippet can be linked to by the snippet's anchors.
//! Each snippet is parsed at most once per build; nested includes are
//! followed with a per-resolution in-progress set so mutually including
//! snippets terminate.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use docset_diagnostics::Emitter;
use docset_markdown::{MarkdownParser, PageTocItem};

/// Outline of a snippet, including everything it includes itself.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SnippetAnchors {
    pub anchors: BTreeSet<String>,
    pub toc: Vec<PageTocItem>,
}

pub(crate) struct SnippetCache {
    snippets: HashSet<PathBuf>,
    entries: Mutex<HashMap<PathBuf, Option<Arc<SnippetAnchors>>>>,
}

impl SnippetCache {
    pub(crate) fn new(snippets: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            snippets: snippets.into_iter().collect(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Outlines of `includes`, in order. Paths that are not snippets of the
    /// documentation set are skipped.
    pub(crate) fn collect(
        &self,
        includes: &[PathBuf],
        parser: &MarkdownParser<'_>,
        emitter: &Emitter,
    ) -> Vec<Arc<SnippetAnchors>> {
        let mut in_progress = HashSet::new();
        includes
            .iter()
            .filter_map(|path| self.get(path, parser, emitter, &mut in_progress))
            .collect()
    }

    fn get(
        &self,
        path: &Path,
        parser: &MarkdownParser<'_>,
        emitter: &Emitter,
        in_progress: &mut HashSet<PathBuf>,
    ) -> Option<Arc<SnippetAnchors>> {
        if !self.snippets.contains(path) {
            return None;
        }
        if let Ok(entries) = self.entries.lock()
            && let Some(cached) = entries.get(path)
        {
            return cached.clone();
        }
        if !in_progress.insert(path.to_path_buf()) {
            tracing::debug!(snippet = %path.display(), "Include cycle while collecting snippet anchors");
            return None;
        }

        let computed = self.compute(path, parser, emitter, in_progress);
        in_progress.remove(path);

        if let Ok(mut entries) = self.entries.lock() {
            // A concurrent resolution may have finished first; keep its result.
            return entries.entry(path.to_path_buf()).or_insert(computed).clone();
        }
        computed
    }

    fn compute(
        &self,
        path: &Path,
        parser: &MarkdownParser<'_>,
        emitter: &Emitter,
        in_progress: &mut HashSet<PathBuf>,
    ) -> Option<Arc<SnippetAnchors>> {
        let file = emitter.for_file(path.display().to_string());
        let document = match parser.minimal_parse(path, &file) {
            Ok(document) => document,
            Err(e) => {
                tracing::debug!(error = %e, "Skipping unreadable snippet");
                return None;
            }
        };

        let mut outline = SnippetAnchors {
            anchors: document.anchors,
            toc: document.toc,
        };
        for include in &document.includes {
            if let Some(nested) = self.get(include, parser, emitter, in_progress) {
                outline.anchors.extend(nested.anchors.iter().cloned());
                outline.toc.extend(nested.toc.iter().cloned());
            }
        }
        Some(Arc::new(outline))
    }
}
