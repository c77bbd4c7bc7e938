use std::path::PathBuf;

use docset_markdown::MarkdownError;

/// Error that aborts a build.
///
/// Problems with individual documents are diagnostics, not errors.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Documentation root does not exist.
    #[error("Source directory not found: {}", .0.display())]
    SourceNotFound(PathBuf),
    /// Clearing the output directory would delete the sources.
    #[error("Output directory {} contains the documentation sources", .0.display())]
    OutputContainsSource(PathBuf),
    /// Markdown source could not be read.
    #[error(transparent)]
    Markdown(#[from] MarkdownError),
    /// Output could not be written.
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// `links.json` could not be serialized.
    #[error("Failed to serialize links.json: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl BuildError {
    pub(crate) fn write(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Write { path, source }
    }
}
