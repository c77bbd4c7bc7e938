//! Git checkout information recorded in `links.json`.
//!
//! Reads `.git/HEAD` and `.git/config` directly; no git binary is needed.

use std::fs;
use std::path::Path;

use docset_links::GitCheckoutInformation;

/// Describe the git checkout at `source_dir`.
///
/// The remote is taken from `GITHUB_REPOSITORY` when set, otherwise from the
/// remote tracked by the current branch, `main` or `master`.
pub fn git_checkout(source_dir: &Path) -> GitCheckoutInformation {
    let git = source_dir.join(".git");
    let Ok(config) = fs::read_to_string(git.join("config")) else {
        return GitCheckoutInformation::unavailable();
    };

    let head = read_trimmed(&git.join("HEAD")).unwrap_or_default();
    let (branch, git_ref) = match head.strip_prefix("ref: ") {
        Some(reference) => (
            reference.trim_start_matches("refs/heads/").to_owned(),
            read_trimmed(&git.join(reference)).unwrap_or_else(|| reference.to_owned()),
        ),
        None => ("detached/head".to_owned(), head),
    };

    let remote = std::env::var("GITHUB_REPOSITORY")
        .ok()
        .filter(|r| !r.is_empty())
        .or_else(|| {
            [branch.as_str(), "main", "master"]
                .into_iter()
                .find_map(|b| tracking_remote(&config, b))
        })
        .unwrap_or_else(|| "elastic/docs-builder-unknown".to_owned());

    GitCheckoutInformation {
        branch,
        remote: normalize_remote(&remote),
        git_ref,
    }
}

fn read_trimmed(path: &Path) -> Option<String> {
    fs::read_to_string(path).ok().map(|s| s.trim().to_owned())
}

/// URL of the remote `branch` tracks.
fn tracking_remote(config: &str, branch: &str) -> Option<String> {
    let remote = setting(config, &format!("branch \"{branch}\""), "remote")?;
    setting(config, &format!("remote \"{remote}\""), "url")
}

/// Value of `key` in `[section]` of a git config file.
fn setting(config: &str, section: &str, key: &str) -> Option<String> {
    let mut in_section = false;
    for line in config.lines().map(str::trim) {
        if let Some(header) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            in_section = header == section;
            continue;
        }
        if !in_section {
            continue;
        }
        if let Some((name, value)) = line.split_once('=')
            && name.trim() == key
        {
            return Some(value.trim().to_owned());
        }
    }
    None
}

fn normalize_remote(remote: &str) -> String {
    let remote = remote.strip_suffix(".git").unwrap_or(remote);
    remote.trim_end_matches('/').to_owned()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    const CONFIG: &str = r#"[core]
	bare = false
[remote "origin"]
	url = git@github.com:elastic/docs-content.git
	fetch = +refs/heads/*:refs/remotes/origin/*
[branch "main"]
	remote = origin
	merge = refs/heads/main
"#;

    #[test]
    fn test_reads_branch_ref_and_remote() {
        let tmp = TempDir::new().unwrap();
        let git = tmp.path().join(".git");
        fs::create_dir_all(git.join("refs/heads")).unwrap();
        fs::write(git.join("config"), CONFIG).unwrap();
        fs::write(git.join("HEAD"), "ref: refs/heads/feature\n").unwrap();
        fs::write(git.join("refs/heads/feature"), "abc123\n").unwrap();

        let info = git_checkout(tmp.path());

        assert_eq!(info.branch, "feature");
        assert_eq!(info.git_ref, "abc123");
        if std::env::var("GITHUB_REPOSITORY").is_err() {
            assert_eq!(info.remote, "git@github.com:elastic/docs-content");
            assert_eq!(info.repository_name(), "docs-content");
        }
    }

    #[test]
    fn test_without_git_directory() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(git_checkout(tmp.path()), GitCheckoutInformation::unavailable());
    }

    #[test]
    fn test_setting_lookup() {
        assert_eq!(setting(CONFIG, "branch \"main\"", "remote").as_deref(), Some("origin"));
        assert_eq!(setting(CONFIG, "branch \"dev\"", "remote"), None);
    }
}
