//! Configuration for documentation set builds.
//!
//! A documentation set is described by a `docset.yml` (or `_docset.yml`)
//! file at its root. It lists the table of contents, global substitutions,
//! exclusion globs and the repositories cross-links may point into. A
//! `redirects.yml` next to it maps historical paths to current ones.
//!
//! Problems with individual keys are reported as diagnostics; only a file
//! that cannot be read or parsed is a [`ConfigError`].
//!
//! CLI settings are applied during load via [`CliSettings`].

mod docset;
mod reader;
mod redirects;

use std::path::{Path, PathBuf};

use docset_diagnostics::Emitter;

pub use docset::{ConfigurationFile, FileReference, FolderReference, TocItem};
pub use redirects::{load_redirects, redirect_file_name};

/// Docset file names, in lookup order.
const CONFIG_FILENAMES: [&str; 2] = ["docset.yml", "_docset.yml"];

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Source directory or explicit docset file not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// YAML parsing error.
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
}

/// CLI settings that override configuration defaults.
///
/// All fields are optional. Only non-None values override the defaults.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Explicit docset file instead of discovery.
    pub config_file: Option<PathBuf>,
    /// Output directory for rendered pages.
    pub output_dir: Option<PathBuf>,
    /// Prefix prepended to every generated URL.
    pub url_path_prefix: Option<String>,
    /// Treat warnings as failures.
    pub strict: Option<bool>,
    /// Do not fetch cross-link data.
    pub offline: Option<bool>,
    /// Directory for cached `links.json` documents.
    pub cache_dir: Option<PathBuf>,
}

/// Resolved build settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSettings {
    /// Directory the build was started for.
    pub source_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Empty, or `/`-prefixed without a trailing `/`.
    pub url_path_prefix: String,
    pub strict: bool,
    pub offline: bool,
    pub cache_dir: PathBuf,
}

impl BuildSettings {
    fn defaults(source_dir: &Path) -> Self {
        let artifacts = source_dir.join(".artifacts");
        Self {
            source_dir: source_dir.to_path_buf(),
            output_dir: artifacts.join("docs").join("html"),
            url_path_prefix: String::new(),
            strict: false,
            offline: false,
            cache_dir: artifacts.join("cache").join("links"),
        }
    }

    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(output_dir) = &settings.output_dir {
            self.output_dir.clone_from(output_dir);
        }
        if let Some(prefix) = &settings.url_path_prefix {
            self.url_path_prefix = normalize_prefix(prefix);
        }
        if let Some(strict) = settings.strict {
            self.strict = strict;
        }
        if let Some(offline) = settings.offline {
            self.offline = offline;
        }
        if let Some(cache_dir) = &settings.cache_dir {
            self.cache_dir.clone_from(cache_dir);
        }
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

/// Everything a build needs to know before reading markdown.
#[derive(Debug)]
pub struct Config {
    pub docset: ConfigurationFile,
    pub build: BuildSettings,
}

impl Config {
    /// Load configuration for the documentation in `source_dir`.
    ///
    /// Uses `cli_settings.config_file` if given, otherwise looks for a docset
    /// file in `source_dir` and its `docs/` child. Without one, a warning is
    /// emitted and an empty configuration is used.
    ///
    /// # Errors
    ///
    /// Returns error if `source_dir` or an explicit docset file does not
    /// exist, or if the docset file cannot be parsed.
    pub fn load(
        source_dir: &Path,
        cli_settings: Option<&CliSettings>,
        emitter: &Emitter,
    ) -> Result<Self, ConfigError> {
        if !source_dir.is_dir() {
            return Err(ConfigError::NotFound(source_dir.to_path_buf()));
        }

        let explicit = cli_settings.and_then(|s| s.config_file.as_deref());
        let docset = match explicit {
            Some(path) if !path.is_file() => return Err(ConfigError::NotFound(path.to_path_buf())),
            Some(path) => ConfigurationFile::load(path, emitter)?,
            None => match discover_config(source_dir) {
                Some(path) => ConfigurationFile::load(&path, emitter)?,
                None => {
                    let root = default_root(source_dir);
                    ConfigurationFile::missing(root.join(CONFIG_FILENAMES[0]), root, emitter)
                }
            },
        };

        let mut build = BuildSettings::defaults(source_dir);
        if let Some(settings) = cli_settings {
            build.apply_cli_settings(settings);
        }

        Ok(Self { docset, build })
    }
}

/// Find a docset file in `source_dir` or its `docs/` child.
pub fn discover_config(source_dir: &Path) -> Option<PathBuf> {
    [source_dir.to_path_buf(), source_dir.join("docs")]
        .into_iter()
        .flat_map(|dir| CONFIG_FILENAMES.map(|name| dir.join(name)))
        .find(|candidate| candidate.is_file())
}

fn default_root(source_dir: &Path) -> PathBuf {
    let docs = source_dir.join("docs");
    if docs.is_dir() {
        docs
    } else {
        source_dir.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use docset_diagnostics::{DiagnosticsCollector, MemorySink};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_discovers_docset_in_docs_folder() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("docs")).unwrap();
        fs::write(tmp.path().join("docs/_docset.yml"), "project: x\n").unwrap();

        assert_eq!(
            discover_config(tmp.path()),
            Some(tmp.path().join("docs/_docset.yml"))
        );
    }

    #[test]
    fn test_prefers_source_dir_over_docs_folder() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("docs")).unwrap();
        fs::write(tmp.path().join("docset.yml"), "").unwrap();
        fs::write(tmp.path().join("docs/docset.yml"), "").unwrap();

        assert_eq!(discover_config(tmp.path()), Some(tmp.path().join("docset.yml")));
    }

    #[test]
    fn test_missing_docset_warns() {
        let tmp = TempDir::new().unwrap();
        let sink = Arc::new(MemorySink::default());
        let mut collector = DiagnosticsCollector::new(vec![sink.clone()]);

        let config = Config::load(tmp.path(), None, &collector.emitter()).unwrap();
        collector.drain_pending();

        assert_eq!(config.docset.root, tmp.path());
        assert_eq!(config.docset.project.as_deref(), Some("unknown"));
        assert_eq!(sink.messages(), vec!["No configuration file found"]);
    }

    #[test]
    fn test_missing_source_dir_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let collector = DiagnosticsCollector::new(vec![]);

        let result = Config::load(&tmp.path().join("nope"), None, &collector.emitter());

        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_cli_settings_override_defaults() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("docset.yml"), "").unwrap();
        let collector = DiagnosticsCollector::new(vec![]);
        let settings = CliSettings {
            url_path_prefix: Some("docs/".to_owned()),
            strict: Some(true),
            output_dir: Some(PathBuf::from("/out")),
            ..CliSettings::default()
        };

        let config = Config::load(tmp.path(), Some(&settings), &collector.emitter()).unwrap();

        assert_eq!(config.build.url_path_prefix, "/docs");
        assert!(config.build.strict);
        assert!(!config.build.offline);
        assert_eq!(config.build.output_dir, PathBuf::from("/out"));
        assert_eq!(
            config.build.cache_dir,
            tmp.path().join(".artifacts/cache/links")
        );
    }

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix(""), "");
        assert_eq!(normalize_prefix("/"), "");
        assert_eq!(normalize_prefix("/docs/"), "/docs");
        assert_eq!(normalize_prefix("guide/v2"), "/guide/v2");
    }
}
