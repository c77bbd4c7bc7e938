//! On-disk cache for fetched `links.json` documents.
//!
//! Entries are keyed by repository and branch. Each entry file starts with the
//! ETag the content was fetched under:
//!
//! ```text
//! [etag_len: u32 LE][etag bytes][links.json bytes]
//! ```
//!
//! A lookup only reads the header when the stored ETag does not match the one
//! published in the link index, so stale entries cost a few bytes of I/O.
//!
//! The cache root carries a `VERSION` file; a missing or different version
//! wipes the whole directory.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Version written to the cache root. Bump when the entry format changes.
pub const CACHE_VERSION: &str = "links-v1";

/// Storage for fetched `links.json` bodies, validated by ETag.
pub trait LinksCache: Send + Sync {
    /// Cached body for `repository`/`branch` if it was stored under `etag`.
    fn get(&self, repository: &str, branch: &str, etag: &str) -> Option<Vec<u8>>;

    /// Store `body` for `repository`/`branch` under `etag`.
    ///
    /// Failures are logged and otherwise ignored.
    fn set(&self, repository: &str, branch: &str, etag: &str, body: &[u8]);
}

/// Cache that never stores anything.
pub struct NullLinksCache;

impl LinksCache for NullLinksCache {
    fn get(&self, _repository: &str, _branch: &str, _etag: &str) -> Option<Vec<u8>> {
        None
    }

    fn set(&self, _repository: &str, _branch: &str, _etag: &str, _body: &[u8]) {}
}

/// [`LinksCache`] rooted at a directory on disk.
///
/// Layout:
/// ```text
/// {root}/
/// +-- VERSION
/// +-- kibana/
///     +-- main.json
/// ```
pub struct FileLinksCache {
    root: PathBuf,
}

impl FileLinksCache {
    /// Open the cache at `root`, wiping it when its version is stale.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        validate_version(&root, CACHE_VERSION);
        Self { root }
    }

    fn entry_path(&self, repository: &str, branch: &str) -> PathBuf {
        self.root
            .join(sanitize(repository))
            .join(format!("{}.json", sanitize(branch)))
    }
}

/// Keep keys inside the cache root.
fn sanitize(segment: &str) -> String {
    segment
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c => c,
        })
        .collect::<String>()
        .trim_start_matches('.')
        .to_owned()
}

impl LinksCache for FileLinksCache {
    fn get(&self, repository: &str, branch: &str, etag: &str) -> Option<Vec<u8>> {
        let mut file = File::open(self.entry_path(repository, branch)).ok()?;

        let mut len_buf = [0u8; 4];
        file.read_exact(&mut len_buf).ok()?;
        let etag_len = u64::from(u32::from_le_bytes(len_buf));
        let file_len = file.metadata().ok()?.len();
        if etag_len > file_len.saturating_sub(len_buf.len() as u64) {
            tracing::debug!(repository, branch, "cached links.json entry is corrupt");
            return None;
        }

        let mut stored = vec![0u8; usize::try_from(etag_len).ok()?];
        file.read_exact(&mut stored).ok()?;
        if stored != etag.as_bytes() {
            tracing::debug!(repository, branch, "cached links.json is stale");
            return None;
        }

        let mut body = Vec::new();
        file.read_to_end(&mut body).ok()?;
        Some(body)
    }

    fn set(&self, repository: &str, branch: &str, etag: &str, body: &[u8]) {
        let path = self.entry_path(repository, branch);
        let Some(parent) = path.parent() else {
            return;
        };
        if let Err(e) = fs::create_dir_all(parent) {
            tracing::warn!(error = %e, repository, "failed to create links cache directory");
            return;
        }

        let Ok(etag_len) = u32::try_from(etag.len()) else {
            return;
        };
        let mut buf = Vec::with_capacity(4 + etag.len() + body.len());
        buf.extend_from_slice(&etag_len.to_le_bytes());
        buf.extend_from_slice(etag.as_bytes());
        buf.extend_from_slice(body);

        if let Err(e) = fs::write(&path, &buf) {
            tracing::warn!(error = %e, repository, "failed to write links cache entry");
        }
    }
}

fn validate_version(root: &Path, version: &str) {
    let version_file = root.join("VERSION");
    match fs::read_to_string(&version_file) {
        Ok(stored) if stored == version => return,
        Ok(stored) => {
            tracing::info!(stored = %stored, current = version, "links cache version changed, wiping");
        }
        Err(_) => tracing::debug!(root = %root.display(), "initializing links cache"),
    }

    if root.exists()
        && let Err(e) = fs::remove_dir_all(root)
    {
        tracing::warn!(error = %e, "failed to remove links cache directory");
    }
    if let Err(e) = fs::create_dir_all(root) {
        tracing::warn!(error = %e, "failed to create links cache directory");
        return;
    }
    if let Err(e) = fs::write(&version_file, version) {
        tracing::warn!(error = %e, "failed to write links cache VERSION file");
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_hit_requires_matching_etag() {
        let tmp = TempDir::new().unwrap();
        let cache = FileLinksCache::new(tmp.path().join("links"));

        cache.set("kibana", "main", "etag-1", br#"{"links":{}}"#);

        assert_eq!(
            cache.get("kibana", "main", "etag-1"),
            Some(br#"{"links":{}}"#.to_vec())
        );
        assert_eq!(cache.get("kibana", "main", "etag-2"), None);
        assert_eq!(cache.get("kibana", "8.x", "etag-1"), None);
    }

    #[test]
    fn test_newer_etag_replaces_entry() {
        let tmp = TempDir::new().unwrap();
        let cache = FileLinksCache::new(tmp.path().join("links"));

        cache.set("elasticsearch", "main", "a", b"first");
        cache.set("elasticsearch", "main", "b", b"second");

        assert_eq!(cache.get("elasticsearch", "main", "a"), None);
        assert_eq!(cache.get("elasticsearch", "main", "b"), Some(b"second".to_vec()));
    }

    #[test]
    fn test_version_mismatch_wipes_entries() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("links");

        let cache = FileLinksCache::new(root.clone());
        cache.set("kibana", "main", "e", b"data");
        fs::write(root.join("VERSION"), "links-v0").unwrap();

        let reopened = FileLinksCache::new(root.clone());
        assert_eq!(reopened.get("kibana", "main", "e"), None);
        assert_eq!(fs::read_to_string(root.join("VERSION")).unwrap(), CACHE_VERSION);
    }

    #[test]
    fn test_reopen_with_same_version_keeps_entries() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("links");

        FileLinksCache::new(root.clone()).set("kibana", "main", "e", b"data");

        let reopened = FileLinksCache::new(root);
        assert_eq!(reopened.get("kibana", "main", "e"), Some(b"data".to_vec()));
    }

    #[test]
    fn test_keys_cannot_escape_root() {
        let tmp = TempDir::new().unwrap();
        let cache = FileLinksCache::new(tmp.path().join("links"));

        cache.set("../outside", "main", "e", b"data");

        assert!(!tmp.path().join("outside").exists());
        assert_eq!(cache.get("../outside", "main", "e"), Some(b"data".to_vec()));
    }

    #[test]
    fn test_corrupt_etag_length_is_a_miss() {
        let tmp = TempDir::new().unwrap();
        let cache = FileLinksCache::new(tmp.path().join("links"));
        cache.set("kibana", "main", "e", b"data");

        let mut entry = u32::MAX.to_le_bytes().to_vec();
        entry.extend_from_slice(b"e");
        fs::write(cache.entry_path("kibana", "main"), entry).unwrap();

        assert_eq!(cache.get("kibana", "main", "e"), None);
    }

    #[test]
    fn test_null_cache_never_hits() {
        let cache = NullLinksCache;
        cache.set("kibana", "main", "e", b"data");
        assert_eq!(cache.get("kibana", "main", "e"), None);
    }
}
