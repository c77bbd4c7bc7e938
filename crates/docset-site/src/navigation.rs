//! Navigation tree built from the table of contents.
//!
//! # Architecture
//!
//! Every table of contents level becomes a [`DocumentationGroup`]. A file
//! entry with `children` opens a nested group with that file as its index
//! page; a folder entry opens a nested group whose index is its `index.md`
//! (or its first file). Folders listed without children include every file
//! directly inside them.
//!
//! Each markdown page receives a 1-based navigation index in table of
//! contents order. Pages listed as `hidden` keep their index but are left
//! out of the navigation items and skipped by previous/next lookups.

use std::collections::{BTreeMap, HashMap};

use docset_config::{FileReference, TocItem};
use docset_diagnostics::Emitter;

use crate::files::{DocumentationFile, FileKind};

/// Visible entry of a [`DocumentationGroup`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NavigationItem {
    File(FileNavigation),
    Group(DocumentationGroup),
}

/// A page shown in the navigation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileNavigation {
    /// Position in the table of contents level.
    pub order: usize,
    pub depth: usize,
    /// Relative path of the page.
    pub path: String,
}

/// One level of the navigation tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentationGroup {
    pub id: usize,
    pub order: usize,
    pub depth: usize,
    /// Landing page of the group.
    pub index: Option<String>,
    /// Pages listed directly in this group, except the index.
    pub files: Vec<String>,
    pub items: Vec<NavigationItem>,
}

impl DocumentationGroup {
    /// Whether `path` is shown anywhere below this group.
    pub fn contains_page(&self, path: &str) -> bool {
        self.items.iter().any(|item| match item {
            NavigationItem::File(file) => file.path == path,
            NavigationItem::Group(group) => group.contains_page(path),
        })
    }

    /// Whether `path` belongs to this group or any nested group, visible or
    /// not.
    pub fn holds(&self, path: &str) -> bool {
        self.index.as_deref() == Some(path)
            || self.files.iter().any(|f| f == path)
            || self.groups().any(|group| group.holds(path))
    }

    /// Nested groups in table of contents order.
    pub fn groups(&self) -> impl Iterator<Item = &DocumentationGroup> {
        self.items.iter().filter_map(|item| match item {
            NavigationItem::Group(group) => Some(group),
            NavigationItem::File(_) => None,
        })
    }

    /// Chain of groups from `self` down to the innermost group holding
    /// `path` directly.
    fn ancestors<'g>(&'g self, path: &str, chain: &mut Vec<&'g DocumentationGroup>) -> bool {
        chain.push(self);
        if self.groups().any(|group| group.ancestors(path, chain)) {
            return true;
        }
        if self.index.as_deref() == Some(path) || self.files.iter().any(|f| f == path) {
            return true;
        }
        chain.pop();
        false
    }
}

/// Position of a page in the navigation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NavigationEntry {
    /// 1-based position in table of contents order.
    pub navigation_index: usize,
    pub hidden: bool,
    /// Group whose table of contents lists the page.
    pub group: usize,
}

/// The navigation tree with per-page lookups.
#[derive(Clone, Debug)]
pub struct Navigation {
    pub tree: DocumentationGroup,
    entries: HashMap<String, NavigationEntry>,
    by_index: BTreeMap<usize, String>,
}

impl Navigation {
    /// Build the tree for `toc`, reporting table of contents problems against
    /// `config_file`.
    pub(crate) fn build(
        toc: &[TocItem],
        files: &[DocumentationFile],
        config_file: &str,
        emitter: &Emitter,
    ) -> Self {
        let mut folders: HashMap<&str, Vec<&DocumentationFile>> = HashMap::new();
        for file in files {
            folders.entry(file.relative_folder.as_str()).or_default().push(file);
        }
        let mut builder = NavigationBuilder {
            lookup: files.iter().map(|f| (f.relative_path.as_str(), f)).collect(),
            folders,
            emitter,
            config_file,
            file_index: 0,
            next_group: 0,
            entries: HashMap::new(),
        };
        let tree = builder.group(toc, 0, 0, None);
        let by_index = builder
            .entries
            .iter()
            .map(|(path, entry)| (entry.navigation_index, path.clone()))
            .collect();
        tracing::debug!(pages = builder.entries.len(), "Built navigation");
        Self {
            tree,
            entries: builder.entries,
            by_index,
        }
    }

    pub fn entry(&self, path: &str) -> Option<NavigationEntry> {
        self.entries.get(path).copied()
    }

    /// Pages in navigation order, hidden pages included.
    pub fn pages(&self) -> impl Iterator<Item = &str> {
        self.by_index.values().map(String::as_str)
    }

    /// Closest preceding page that is not hidden.
    pub fn previous(&self, path: &str) -> Option<&str> {
        let index = self.entry(path)?.navigation_index;
        self.by_index
            .range(..index)
            .rev()
            .map(|(_, p)| p.as_str())
            .find(|p| self.entries.get(*p).is_some_and(|e| !e.hidden))
    }

    /// Closest following page that is not hidden.
    pub fn next(&self, path: &str) -> Option<&str> {
        let index = self.entry(path)?.navigation_index;
        self.by_index
            .range(index + 1..)
            .map(|(_, p)| p.as_str())
            .find(|p| self.entries.get(*p).is_some_and(|e| !e.hidden))
    }

    /// Index pages of the groups above `path`, innermost first.
    pub fn parents(&self, path: &str) -> Vec<&str> {
        let mut chain = Vec::new();
        if !self.tree.ancestors(path, &mut chain) {
            return Vec::new();
        }
        chain
            .into_iter()
            .rev()
            .filter_map(|group| group.index.as_deref())
            .filter(|index| *index != path)
            .collect()
    }
}

struct NavigationBuilder<'a> {
    lookup: HashMap<&'a str, &'a DocumentationFile>,
    folders: HashMap<&'a str, Vec<&'a DocumentationFile>>,
    emitter: &'a Emitter,
    config_file: &'a str,
    file_index: usize,
    next_group: usize,
    entries: HashMap<String, NavigationEntry>,
}

impl NavigationBuilder<'_> {
    fn group(
        &mut self,
        toc: &[TocItem],
        order: usize,
        depth: usize,
        configured_index: Option<String>,
    ) -> DocumentationGroup {
        let id = self.next_group;
        self.next_group += 1;

        let mut index = configured_index;
        let mut files: Vec<String> = Vec::new();
        let mut items = Vec::new();

        for (position, item) in toc.iter().enumerate() {
            match item {
                TocItem::File(file) => {
                    let Some(path) = self.page(file, id) else {
                        continue;
                    };
                    if !file.children.is_empty() {
                        if file.hidden {
                            self.error(format!(
                                "The following file is hidden but has children: {}",
                                file.path
                            ));
                        }
                        let group = self.group(&file.children, position, depth + 1, Some(path));
                        items.push(NavigationItem::Group(group));
                        continue;
                    }

                    if index.is_none() && path.ends_with("index.md") {
                        index = Some(path.clone());
                    }
                    if index.as_deref() != Some(path.as_str()) && !file.hidden {
                        items.push(NavigationItem::File(FileNavigation {
                            order: position,
                            depth,
                            path: path.clone(),
                        }));
                    }
                    files.push(path);
                }
                TocItem::Folder(folder) => {
                    let children = if folder.children.is_empty() {
                        self.implicit_children(&folder.path)
                    } else {
                        folder.children.clone()
                    };
                    let group = self.group(&children, position, depth + 1, None);
                    items.push(NavigationItem::Group(group));
                }
            }
        }

        let index = index.or_else(|| files.first().cloned());
        files.retain(|f| Some(f) != index.as_ref());
        DocumentationGroup {
            id,
            order,
            depth,
            index,
            files,
            items,
        }
    }

    /// Register a page listed in the group `group`. Returns its path if it
    /// is a buildable markdown file.
    fn page(&mut self, file: &FileReference, group: usize) -> Option<String> {
        let Some(&found) = self.lookup.get(file.path.as_str()) else {
            self.error(format!(
                "The following file could not be located: {} it may be excluded from the build in docset.yml",
                file.path
            ));
            return None;
        };
        match found.kind {
            FileKind::Markdown => {}
            FileKind::Excluded => {
                self.error(format!(
                    "{} matches exclusion glob from docset.yml yet appears in TOC",
                    found.relative_path
                ));
                return None;
            }
            _ => return None,
        }

        self.file_index += 1;
        self.entries.insert(
            found.relative_path.clone(),
            NavigationEntry {
                navigation_index: self.file_index,
                hidden: file.hidden,
                group,
            },
        );
        Some(found.relative_path.clone())
    }

    fn implicit_children(&self, folder: &str) -> Vec<TocItem> {
        self.folders
            .get(folder)
            .map(|files| {
                files
                    .iter()
                    .map(|f| {
                        TocItem::File(FileReference {
                            path: f.relative_path.clone(),
                            found: true,
                            hidden: false,
                            children: Vec::new(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn error(&self, message: String) {
        self.emitter.error(self.config_file, message);
    }
}
