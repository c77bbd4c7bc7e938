//! Per-file parsing context.

use std::collections::{BTreeSet, HashMap};
use std::hash::BuildHasher;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use docset_diagnostics::FileEmitter;
use docset_links::LinkResolver;

use crate::substitution::Substitutions;

/// A heading in a page's table of contents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageTocItem {
    /// Heading text with substitutions applied.
    pub heading: String,
    pub slug: String,
    pub level: u8,
}

/// What other pages need to know about a page when linking to it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PageInfo {
    /// File name, used in diagnostics.
    pub file_name: String,
    pub title: String,
    pub toc: Vec<PageTocItem>,
    /// Every linkable fragment, lowercase.
    pub anchors: BTreeSet<String>,
}

impl PageInfo {
    /// Heading for `anchor`, if the page's table of contents has one.
    pub fn heading(&self, anchor: &str) -> Option<&PageTocItem> {
        self.toc.iter().find(|item| item.slug.eq_ignore_ascii_case(anchor))
    }

    /// Whether `anchor` can be linked to, ignoring case.
    pub fn has_anchor(&self, anchor: &str) -> bool {
        self.anchors.contains(&anchor.to_lowercase())
    }
}

/// Looks up already parsed pages by absolute path.
pub trait DocumentLookup: Send + Sync {
    fn lookup(&self, path: &Path) -> Option<Arc<PageInfo>>;
}

impl<S: BuildHasher + Send + Sync> DocumentLookup for HashMap<PathBuf, Arc<PageInfo>, S> {
    fn lookup(&self, path: &Path) -> Option<Arc<PageInfo>> {
        self.get(path).cloned()
    }
}

/// Everything block and inline processing needs for one file.
#[derive(Clone)]
pub struct ParserContext<'a> {
    /// Absolute path of the file being parsed.
    pub path: PathBuf,
    /// Documentation root.
    pub root: &'a Path,
    pub url_path_prefix: &'a str,
    pub substitutions: Substitutions,
    pub emitter: FileEmitter,
    pub resolver: &'a dyn LinkResolver,
    pub documents: Option<&'a dyn DocumentLookup>,
    /// Files currently being included, outermost first.
    pub include_stack: Vec<PathBuf>,
}

impl<'a> ParserContext<'a> {
    /// Directory containing the current file.
    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or(self.root)
    }

    /// Resolve `url` against the root when it starts with `/`, otherwise
    /// against the current file's directory.
    pub fn resolve_path(&self, url: &str) -> PathBuf {
        let url = url.replace('\\', "/");
        match url.strip_prefix('/') {
            Some(rooted) => normalize(&self.root.join(rooted)),
            None => normalize(&self.directory().join(url)),
        }
    }

    /// Path relative to the documentation root, for diagnostics.
    pub fn display_path(&self, path: &Path) -> String {
        relative_url(self.root, path)
    }

    /// Context for rendering the snippet at `path` from within this file.
    ///
    /// Diagnostics are attributed to the snippet.
    pub fn for_include(&self, path: &Path) -> Self {
        let mut include_stack = self.include_stack.clone();
        include_stack.push(self.path.clone());
        Self {
            path: path.to_path_buf(),
            emitter: self
                .emitter
                .emitter()
                .for_file(self.display_path(path))
                .with_skip_validation(self.emitter.skip_validation()),
            include_stack,
            ..self.clone()
        }
    }

    /// Whether including `path` would recurse into a file already being
    /// rendered.
    pub fn is_including(&self, path: &Path) -> bool {
        self.path == path || self.include_stack.iter().any(|p| p == path)
    }
}

/// Lexically normalize `path`, resolving `.` and `..` components.
pub fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// `path` relative to `root`, `/` separated.
pub fn relative_url(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Line and column (both 1-indexed) of byte `offset` in a chunk of text
/// starting on `first_line`.
pub(crate) fn line_column(text: &str, first_line: usize, offset: usize) -> (usize, usize) {
    let before = &text[..offset.min(text.len())];
    let line = first_line + before.matches('\n').count();
    let column = before.rfind('\n').map_or(before.len(), |i| before.len() - i - 1) + 1;
    (line, column)
}

#[cfg(test)]
mod tests {
    use docset_diagnostics::DiagnosticsCollector;
    use docset_links::FetchedCrossLinks;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/docs/a/../b/./c.md")), PathBuf::from("/docs/b/c.md"));
        assert_eq!(normalize(Path::new("a/../../b")), PathBuf::from("../b"));
    }

    #[test]
    fn test_relative_url() {
        assert_eq!(
            relative_url(Path::new("/docs"), Path::new("/docs/guide/setup.md")),
            "guide/setup.md"
        );
    }

    #[test]
    fn test_line_column() {
        let text = "first\nsecond line\n";
        assert_eq!(line_column(text, 10, 0), (10, 1));
        assert_eq!(line_column(text, 10, 13), (11, 8));
    }

    #[test]
    fn test_resolve_path_and_include_stack() {
        let collector = DiagnosticsCollector::new(vec![]);
        let links = FetchedCrossLinks::empty();
        let root = PathBuf::from("/docs");
        let context = ParserContext {
            path: root.join("guide/index.md"),
            root: &root,
            url_path_prefix: "",
            substitutions: Substitutions::default(),
            emitter: collector.emitter().for_file("guide/index.md"),
            resolver: &links,
            documents: None,
            include_stack: Vec::new(),
        };

        assert_eq!(context.resolve_path("../img/a.png"), root.join("img/a.png"));
        assert_eq!(context.resolve_path("/_snippets/s.md"), root.join("_snippets/s.md"));

        let snippet = root.join("_snippets/s.md");
        let child = context.for_include(&snippet);
        assert_eq!(child.emitter.file(), "_snippets/s.md");
        assert!(child.is_including(&root.join("guide/index.md")));
        assert!(child.is_including(&snippet));
        assert!(!context.is_including(&snippet));
    }
}
