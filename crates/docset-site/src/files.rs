//! File discovery and classification.
//!
//! Every non-hidden file below the documentation root becomes a
//! [`DocumentationFile`]. Markdown files are classified against the
//! configuration: only files reachable from the table of contents are built
//! as pages.

use std::fs;
use std::path::{Component, Path, PathBuf};

use docset_config::ConfigurationFile;
use docset_diagnostics::Emitter;

/// What a discovered file is used for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileKind {
    /// Markdown page listed in the table of contents.
    Markdown,
    /// Markdown under a `_snippets` folder, only used through `{include}`.
    Snippet,
    /// Markdown that is not built.
    Excluded,
    Image { mime: &'static str },
    /// Anything else; copied to the output unchanged.
    Static,
}

/// A file below the documentation root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentationFile {
    pub path: PathBuf,
    /// Path relative to the root, `/` separated.
    pub relative_path: String,
    /// Folder of `relative_path`; empty for files in the root.
    pub relative_folder: String,
    pub kind: FileKind,
}

impl DocumentationFile {
    pub fn is_markdown(&self) -> bool {
        self.kind == FileKind::Markdown
    }
}

/// Walk `root` and classify every file, sorted by relative path.
pub(crate) fn discover(root: &Path, config: &ConfigurationFile, emitter: &Emitter) -> Vec<DocumentationFile> {
    let mut paths = Vec::new();
    walk(root, &mut paths);
    paths.sort();

    let config_file = config.source_file.display().to_string();
    paths
        .into_iter()
        .filter_map(|path| {
            let relative_path = relative(root, &path)?;
            let kind = classify(&relative_path, config, &config_file, emitter);
            let relative_folder = relative_path
                .rsplit_once('/')
                .map(|(folder, _)| folder.to_owned())
                .unwrap_or_default();
            Some(DocumentationFile {
                path,
                relative_path,
                relative_folder,
                kind,
            })
        })
        .collect()
}

fn walk(dir: &Path, paths: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.filter_map(Result::ok) {
        // Skip hidden files/dirs
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        let path = entry.path();
        if entry.file_type().is_ok_and(|t| t.is_dir()) {
            walk(&path, paths);
        } else {
            paths.push(path);
        }
    }
}

fn relative(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect();
    Some(parts.join("/"))
}

fn classify(relative_path: &str, config: &ConfigurationFile, config_file: &str, emitter: &Emitter) -> FileKind {
    let extension = relative_path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "md" => {}
        "jpg" | "jpeg" => return FileKind::Image { mime: "image/jpeg" },
        "gif" => return FileKind::Image { mime: "image/gif" },
        "svg" => return FileKind::Image { mime: "image/svg+xml" },
        "png" => return FileKind::Image { mime: "image/png" },
        _ => return FileKind::Static,
    }

    if config.is_excluded(relative_path) {
        return FileKind::Excluded;
    }
    if relative_path.contains("_snippets") {
        return FileKind::Snippet;
    }
    if config.is_in_toc(relative_path) {
        return FileKind::Markdown;
    }
    // Folders starting with an underscore are never built
    if relative_path.starts_with('_') || relative_path.contains("/_") {
        return FileKind::Excluded;
    }
    emitter.error(config_file, format!("Not linked in toc: {relative_path}"));
    FileKind::Excluded
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use docset_diagnostics::{DiagnosticsCollector, MemorySink};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    fn write(root: &Path, path: &str) {
        let path = root.join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "# T\n").unwrap();
    }

    #[test]
    fn test_classifies_files() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        for path in [
            "docset.yml",
            "index.md",
            "guide/setup.md",
            "_snippets/part.md",
            "drafts/wip.md",
            "_internal/notes.md",
            "orphan.md",
            "images/logo.PNG",
            ".hidden/secret.md",
            ".gitignore",
        ] {
            write(root, path);
        }
        fs::write(
            root.join("docset.yml"),
            "exclude: ['drafts/**']\ntoc:\n  - file: index.md\n  - folder: guide\n",
        )
        .unwrap();

        let sink = Arc::new(MemorySink::default());
        let mut collector = DiagnosticsCollector::new(vec![sink.clone()]);
        let emitter = collector.emitter();
        let config = ConfigurationFile::load(&root.join("docset.yml"), &emitter).unwrap();

        let files = discover(root, &config, &emitter);
        collector.drain_pending();

        let kinds: Vec<_> = files
            .iter()
            .map(|f| (f.relative_path.as_str(), f.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("_internal/notes.md", FileKind::Excluded),
                ("_snippets/part.md", FileKind::Snippet),
                ("docset.yml", FileKind::Static),
                ("drafts/wip.md", FileKind::Excluded),
                ("guide/setup.md", FileKind::Markdown),
                ("images/logo.PNG", FileKind::Image { mime: "image/png" }),
                ("index.md", FileKind::Markdown),
                ("orphan.md", FileKind::Excluded),
            ]
        );
        assert_eq!(files[4].relative_folder, "guide");
        assert_eq!(files[6].relative_folder, "");
        assert_eq!(sink.messages(), vec!["Not linked in toc: orphan.md"]);
    }
}
