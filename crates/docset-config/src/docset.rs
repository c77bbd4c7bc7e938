//! `docset.yml` and nested `toc.yml` files.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use docset_diagnostics::Emitter;
use docset_links::model::Redirects;
use glob::{MatchOptions, Pattern};
use serde_yaml::Value;

use crate::ConfigError;
use crate::reader::{YamlReader, read_top_level, scalar_to_string};
use crate::redirects::{load_redirects, redirect_file_name};

/// Glob options shared by exclusion and implicit folder matching.
pub(crate) const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// An entry of the table of contents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TocItem {
    File(FileReference),
    Folder(FolderReference),
}

/// A markdown file listed in the table of contents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileReference {
    /// Path relative to the documentation root, `/` separated.
    pub path: String,
    /// Whether the file existed when the TOC was read.
    pub found: bool,
    /// Listed with `hidden:`: built and linkable but not in navigation.
    pub hidden: bool,
    pub children: Vec<TocItem>,
}

/// A folder listed in the table of contents, or the root of a nested toc.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FolderReference {
    /// Path relative to the documentation root, `/` separated.
    pub path: String,
    pub found: bool,
    /// Empty for implicit folders: every markdown file in the folder.
    pub children: Vec<TocItem>,
}

/// A parsed `docset.yml`.
#[derive(Debug)]
pub struct ConfigurationFile {
    /// The docset file. May not exist.
    pub source_file: PathBuf,
    /// Documentation root: the directory holding the docset file.
    pub root: PathBuf,
    pub project: Option<String>,
    pub exclude: Vec<Pattern>,
    /// Repositories cross-links may point into.
    pub cross_links: Vec<String>,
    /// Global substitutions, lowercase keys.
    pub substitutions: BTreeMap<String, String>,
    pub toc: Vec<TocItem>,
    /// Lowercased relative paths of every file named in the TOC.
    pub files: BTreeSet<String>,
    /// Folders listed without children.
    pub implicit_folders: BTreeSet<String>,
    /// `{folder}/*.md` for every implicit folder.
    pub globs: Vec<Pattern>,
    pub redirects: Option<Redirects>,
}

impl ConfigurationFile {
    /// Configuration for a documentation root without a docset file.
    ///
    /// Emits "No configuration file found".
    pub fn missing(source_file: PathBuf, root: PathBuf, emitter: &Emitter) -> Self {
        emitter.warning(source_file.display().to_string(), "No configuration file found");
        let mut config = Self::empty(source_file, root);
        config.project = Some("unknown".to_owned());
        config
    }

    fn empty(source_file: PathBuf, root: PathBuf) -> Self {
        Self {
            source_file,
            root,
            project: None,
            exclude: Vec::new(),
            cross_links: Vec::new(),
            substitutions: BTreeMap::new(),
            toc: Vec::new(),
            files: BTreeSet::new(),
            implicit_folders: BTreeSet::new(),
            globs: Vec::new(),
            redirects: None,
        }
    }

    /// Load a docset file. Its directory becomes the documentation root.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file (or a nested toc file) cannot be
    /// read or is not valid YAML.
    pub fn load(source_file: &Path, emitter: &Emitter) -> Result<Self, ConfigError> {
        let root = source_file
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        let mut config = Self::load_nested(source_file, &root, emitter, 0, "")?;

        let file_name = source_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        config.redirects = load_redirects(&root.join(redirect_file_name(&file_name)), emitter)?;
        config.globs = config
            .implicit_folders
            .iter()
            .filter_map(|folder| Pattern::new(&format!("{}/*.md", Pattern::escape(folder))).ok())
            .collect();

        tracing::debug!(
            file = %source_file.display(),
            files = config.files.len(),
            implicit_folders = config.implicit_folders.len(),
            "loaded docset configuration"
        );
        Ok(config)
    }

    fn load_nested(
        source_file: &Path,
        root: &Path,
        emitter: &Emitter,
        depth: usize,
        parent_path: &str,
    ) -> Result<Self, ConfigError> {
        let reader = YamlReader::new(emitter.for_file(source_file.display().to_string()));
        let entries = read_top_level(source_file).inspect_err(|e| {
            reader.error(format!("Could not load {}: {e}", source_file.display()));
        })?;

        let mut config = Self::empty(source_file.to_path_buf(), root.to_path_buf());
        let mut toc = TocReader {
            reader: &reader,
            root,
            emitter,
            depth,
            files: BTreeSet::new(),
            implicit_folders: BTreeSet::new(),
        };

        for (key, value) in entries {
            match key.as_str() {
                "project" => config.project = reader.read_string(&key, &value),
                "exclude" => {
                    config.exclude = YamlReader::read_string_array(&value)
                        .iter()
                        .filter_map(|pattern| match Pattern::new(pattern) {
                            Ok(p) => Some(p),
                            Err(e) => {
                                reader.error(format!("'{pattern}' is not a valid glob: {e}"));
                                None
                            }
                        })
                        .collect();
                }
                "cross_links" => config.cross_links = YamlReader::read_string_array(&value),
                "subs" => config.substitutions = reader.read_dictionary(&key, &value),
                "toc" => {
                    if depth > 1 {
                        reader.error("toc.yml files may only be linked from docset.yml");
                        continue;
                    }
                    config.toc = toc.read_children(&key, &value, parent_path)?;
                }
                "external_hosts" => reader.warning(format!("{key} has been deprecated and will be removed")),
                _ => reader.warning(format!("{key} is not a known configuration")),
            }
        }

        config.files = toc.files;
        config.implicit_folders = toc.implicit_folders;
        Ok(config)
    }

    /// Whether `relative_path` matches an `exclude` glob.
    pub fn is_excluded(&self, relative_path: &str) -> bool {
        self.exclude
            .iter()
            .any(|p| p.matches_with(relative_path, MATCH_OPTIONS))
    }

    /// Whether `relative_path` is named in the TOC or lives directly in an
    /// implicit folder.
    pub fn is_in_toc(&self, relative_path: &str) -> bool {
        self.files.contains(&relative_path.to_lowercase())
            || self
                .globs
                .iter()
                .any(|p| p.matches_with(relative_path, MATCH_OPTIONS))
    }
}

/// Walks `toc` entries, collecting referenced files and implicit folders.
struct TocReader<'a> {
    reader: &'a YamlReader,
    root: &'a Path,
    emitter: &'a Emitter,
    depth: usize,
    files: BTreeSet<String>,
    implicit_folders: BTreeSet<String>,
}

impl TocReader<'_> {
    fn read_children(
        &mut self,
        key: &str,
        value: &Value,
        parent_path: &str,
    ) -> Result<Vec<TocItem>, ConfigError> {
        let Some(sequence) = value.as_sequence() else {
            self.reader.warning(format!("'{key}' is not an array"));
            return Ok(Vec::new());
        };

        let mut items = Vec::new();
        for entry in sequence {
            if let Some(mapping) = entry.as_mapping()
                && let Some(item) = self.read_child(mapping, parent_path)?
            {
                items.push(item);
            }
        }
        Ok(items)
    }

    fn read_child(
        &mut self,
        mapping: &serde_yaml::Mapping,
        parent_path: &str,
    ) -> Result<Option<TocItem>, ConfigError> {
        let mut parent_path = parent_path.to_owned();
        let mut file = None;
        let mut folder = None;
        let mut nested = None;
        let mut file_found = false;
        let mut folder_found = false;
        let mut hidden = false;
        let mut children = None;

        for (key, value) in mapping {
            let Some(key) = scalar_to_string(key) else {
                continue;
            };
            match key.as_str() {
                "toc" => nested = self.read_nested_toc(&key, value)?,
                "file" | "hidden" => {
                    hidden = key == "hidden";
                    (file, file_found) = self.read_file(&key, value, &parent_path);
                }
                "folder" => {
                    (folder, folder_found) = self.read_folder(&key, value, &parent_path);
                    if let Some(folder) = &folder {
                        parent_path = format!("{parent_path}/{folder}");
                    }
                }
                "children" => children = Some(self.read_children(&key, value, &parent_path)?),
                _ => {}
            }
        }

        if let Some((path, found, nested)) = nested {
            self.files.extend(nested.files);
            self.implicit_folders.extend(nested.implicit_folders);
            return Ok(Some(TocItem::Folder(FolderReference {
                path,
                found,
                children: nested.toc,
            })));
        }

        if let Some(file) = file {
            return Ok(Some(TocItem::File(FileReference {
                path: join_relative(&parent_path, &file),
                found: file_found,
                hidden,
                children: children.unwrap_or_default(),
            })));
        }

        if folder.is_some() {
            let path = parent_path.trim_start_matches('/').to_owned();
            if children.is_none() {
                self.implicit_folders.insert(path.clone());
            }
            return Ok(Some(TocItem::Folder(FolderReference {
                path,
                found: folder_found,
                children: children.unwrap_or_default(),
            })));
        }

        Ok(None)
    }

    fn read_file(&mut self, key: &str, value: &Value, parent_path: &str) -> (Option<String>, bool) {
        let Some(file) = self.reader.read_string(key, value) else {
            return (None, false);
        };
        let relative = join_relative(parent_path, &file);
        let path = self.root.join(&relative);
        let found = path.is_file();
        if !found {
            self.reader
                .error(format!("File '{}' does not exist", path.display()));
        }
        self.files.insert(relative.to_lowercase());
        (Some(file), found)
    }

    fn read_folder(&self, key: &str, value: &Value, parent_path: &str) -> (Option<String>, bool) {
        let Some(folder) = self.reader.read_string(key, value) else {
            return (None, false);
        };
        let path = self.root.join(join_relative(parent_path, &folder));
        let found = path.is_dir();
        if !found {
            self.reader
                .error(format!("Directory '{}' does not exist", path.display()));
        }
        (Some(folder), found)
    }

    /// Read `toc: <dir>`: the `toc.yml` (or `_toc.yml`) inside `<dir>`.
    fn read_nested_toc(
        &self,
        key: &str,
        value: &Value,
    ) -> Result<Option<(String, bool, ConfigurationFile)>, ConfigError> {
        let Some(toc_path) = self.reader.read_string(key, value) else {
            self.reader.error("Empty toc: reference");
            return Ok(None);
        };
        let toc_path = toc_path.trim_matches('/').to_owned();
        let directory = self.root.join(&toc_path);
        let Some(source) = ["toc.yml", "_toc.yml"]
            .iter()
            .map(|name| directory.join(name))
            .find(|candidate| candidate.is_file())
        else {
            self.reader.error(format!(
                "Nested toc: '{}' directory has no toc.yml or _toc.yml file",
                directory.display()
            ));
            return Ok(Some((
                toc_path.clone(),
                false,
                ConfigurationFile::empty(directory.join("toc.yml"), self.root.to_path_buf()),
            )));
        };

        let nested = ConfigurationFile::load_nested(&source, self.root, self.emitter, self.depth + 1, &toc_path)?;
        Ok(Some((toc_path, true, nested)))
    }
}

fn join_relative(parent_path: &str, file: &str) -> String {
    format!("{parent_path}/{file}")
        .trim_start_matches('/')
        .to_owned()
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use docset_diagnostics::{DiagnosticsCollector, MemorySink};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    fn write(root: &Path, path: &str, content: &str) {
        let path = root.join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn load(root: &Path) -> (ConfigurationFile, Vec<String>) {
        let sink = Arc::new(MemorySink::default());
        let mut collector = DiagnosticsCollector::new(vec![sink.clone()]);
        let config = ConfigurationFile::load(&root.join("docset.yml"), &collector.emitter()).unwrap();
        collector.drain_pending();
        (config, sink.messages())
    }

    #[test]
    fn test_reads_top_level_keys() {
        let tmp = TempDir::new().unwrap();
        write(
            tmp.path(),
            "docset.yml",
            "project: 'Elastic docs'\nexclude: ['_*.md', 'drafts/**']\ncross_links: [docs-content, kibana]\nsubs:\n  Stack: Elastic Stack\nexternal_hosts: [a]\nunknown: 1\n",
        );

        let (config, messages) = load(tmp.path());

        assert_eq!(config.project.as_deref(), Some("Elastic docs"));
        assert_eq!(config.cross_links, vec!["docs-content", "kibana"]);
        assert_eq!(config.substitutions["stack"], "Elastic Stack");
        assert!(config.is_excluded("_draft.md"));
        assert!(config.is_excluded("drafts/a/b.md"));
        assert!(!config.is_excluded("guide/_draft.md"));
        assert_eq!(
            messages,
            vec![
                "external_hosts has been deprecated and will be removed",
                "unknown is not a known configuration",
            ]
        );
    }

    #[test]
    fn test_toc_files_folders_and_implicit_folders() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "index.md", "# Home");
        write(tmp.path(), "guide/index.md", "# Guide");
        write(tmp.path(), "guide/setup.md", "# Setup");
        write(tmp.path(), "reference/api.md", "# API");
        write(
            tmp.path(),
            "docset.yml",
            "toc:\n  - file: index.md\n  - folder: guide\n    children:\n      - file: index.md\n      - hidden: setup.md\n  - folder: reference\n  - file: missing.md\n  - folder: nowhere\n",
        );

        let (config, messages) = load(tmp.path());

        assert_eq!(config.toc.len(), 5);
        let TocItem::Folder(guide) = &config.toc[1] else {
            panic!("expected folder");
        };
        assert_eq!(guide.path, "guide");
        assert_eq!(
            guide.children[1],
            TocItem::File(FileReference {
                path: "guide/setup.md".to_owned(),
                found: true,
                hidden: true,
                children: vec![],
            })
        );
        assert!(config.is_in_toc("guide/setup.md"));
        assert!(config.is_in_toc("Guide/Index.md"));
        assert!(config.is_in_toc("reference/api.md"));
        assert!(!config.is_in_toc("reference/deep/api.md"));
        assert_eq!(
            config.implicit_folders.iter().collect::<Vec<_>>(),
            vec!["nowhere", "reference"]
        );
        assert_eq!(messages.len(), 2);
        assert!(messages[0].starts_with("File '") && messages[0].ends_with("missing.md' does not exist"));
        assert!(messages[1].starts_with("Directory '") && messages[1].ends_with("nowhere' does not exist"));
    }

    #[test]
    fn test_nested_toc() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "dev/index.md", "# Dev");
        write(tmp.path(), "dev/toc.yml", "toc:\n  - file: index.md\n");
        write(tmp.path(), "docset.yml", "toc:\n  - toc: dev\n  - toc: empty\n");
        fs::create_dir_all(tmp.path().join("empty")).unwrap();

        let (config, messages) = load(tmp.path());

        let TocItem::Folder(dev) = &config.toc[0] else {
            panic!("expected folder");
        };
        assert_eq!(dev.path, "dev");
        assert!(dev.found);
        assert!(matches!(&dev.children[0], TocItem::File(f) if f.path == "dev/index.md"));
        assert!(config.is_in_toc("dev/index.md"));
        assert_eq!(messages.len(), 1);
        assert!(messages[0].starts_with("Nested toc: '"));
    }

    #[test]
    fn test_toc_must_be_a_sequence() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "docset.yml", "toc: index.md\n");

        let (config, messages) = load(tmp.path());

        assert!(config.toc.is_empty());
        assert_eq!(messages, vec!["'toc' is not an array"]);
    }

    #[test]
    fn test_file_with_children() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "a.md", "");
        write(tmp.path(), "b.md", "");
        write(tmp.path(), "docset.yml", "toc:\n  - file: a.md\n    children:\n      - file: b.md\n");

        let (config, _) = load(tmp.path());

        let TocItem::File(a) = &config.toc[0] else {
            panic!("expected file");
        };
        assert_eq!(a.children.len(), 1);
    }

    #[test]
    fn test_loads_redirects_next_to_docset() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "docset.yml", "toc: []\n");
        write(tmp.path(), "redirects.yml", "redirects:\n  old.md: new.md\n");

        let (config, _) = load(tmp.path());

        assert_eq!(
            config.redirects.unwrap()["old.md"].to.as_deref(),
            Some("new.md")
        );
    }

    #[test]
    fn test_invalid_yaml_is_fatal() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "docset.yml", "toc: [\n");
        let collector = DiagnosticsCollector::new(vec![]);

        let result = ConfigurationFile::load(&tmp.path().join("docset.yml"), &collector.emitter());

        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
