//! Serialized link data: `links.json` and `link-index.json`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Anchor remapping of a redirect: old fragment to new fragment.
///
/// A `None` value drops the fragment. The key [`CATCH_ALL_ANCHOR`] accepts
/// any fragment and drops it.
pub type AnchorMap = BTreeMap<String, Option<String>>;

/// Anchor key meaning "accept any fragment, map to none".
pub const CATCH_ALL_ANCHOR: &str = "!";

/// Bootstrap registry: repository name to branch to the location of that
/// repository's `links.json`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkIndex {
    pub repositories: BTreeMap<String, BTreeMap<String, LinkIndexEntry>>,
}

impl LinkIndex {
    /// Look up the entry for a repository and branch.
    pub fn entry(&self, repository: &str, branch: &str) -> Option<&LinkIndexEntry> {
        self.repositories.get(repository)?.get(branch)
    }
}

/// Location of one repository's `links.json`, content-addressed by `etag`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkIndexEntry {
    pub repository: String,
    pub path: String,
    pub branch: String,
    pub etag: String,
}

/// Git checkout a `links.json` was produced from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitCheckoutInformation {
    pub branch: String,
    pub remote: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
}

impl GitCheckoutInformation {
    /// Placeholder used when no git checkout can be found.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            branch: "unavailable".to_owned(),
            remote: "unavailable".to_owned(),
            git_ref: "unavailable".to_owned(),
        }
    }

    /// Repository name derived from the last segment of the remote URL.
    pub fn repository_name(&self) -> &str {
        let remote = self.remote.trim_end_matches('/');
        let name = remote.rsplit('/').next().unwrap_or(remote);
        name.strip_suffix(".git").unwrap_or(name)
    }
}

fn default_anchors() -> Option<Vec<String>> {
    Some(Vec::new())
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(value: &bool) -> bool {
    !*value
}

/// Per-page entry of `links.json`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkMetadata {
    /// Anchors of the page. An absent key means "no anchors" (empty list),
    /// an explicit `null` means the page publishes no anchor information.
    #[serde(default = "default_anchors", skip_serializing_if = "Option::is_none")]
    pub anchors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub hidden: bool,
}

impl LinkMetadata {
    pub fn has_anchor(&self, anchor: &str) -> bool {
        self.anchors
            .as_ref()
            .is_some_and(|anchors| anchors.iter().any(|a| a == anchor))
    }
}

/// One redirect candidate.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSingleRedirect {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchors: Option<AnchorMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

impl LinkSingleRedirect {
    /// Whether the anchor map contains the catch-all key.
    pub fn is_catch_all(&self) -> bool {
        self.anchors
            .as_ref()
            .is_some_and(|anchors| anchors.contains_key(CATCH_ALL_ANCHOR))
    }
}

/// A redirect for one historical path.
///
/// Either a single target (`to` + `anchors`) or a list of candidates in
/// `many`, disambiguated by the requested fragment.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRedirect {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchors: Option<AnchorMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub many: Option<Vec<LinkSingleRedirect>>,
}

impl LinkRedirect {
    /// Redirect to `to` accepting any fragment.
    #[must_use]
    pub fn catch_all(to: impl Into<String>) -> Self {
        Self {
            anchors: Some(AnchorMap::from([(
                CATCH_ALL_ANCHOR.to_owned(),
                Some(CATCH_ALL_ANCHOR.to_owned()),
            )])),
            to: Some(to.into()),
            many: None,
        }
    }

    /// Plain redirect to `to`.
    #[must_use]
    pub fn to(to: impl Into<String>) -> Self {
        Self {
            to: Some(to.into()),
            ..Self::default()
        }
    }

    /// Candidates in resolution order: every `many` entry, then the redirect
    /// itself. Candidates without a target are skipped.
    pub fn candidates(&self) -> Vec<LinkSingleRedirect> {
        self.many
            .iter()
            .flatten()
            .cloned()
            .chain(std::iter::once(LinkSingleRedirect {
                anchors: self.anchors.clone(),
                to: self.to.clone(),
            }))
            .filter(|r| r.to.as_deref().is_some_and(|to| !to.is_empty()))
            .collect()
    }
}

/// Redirects keyed by historical relative path.
pub type Redirects = BTreeMap<String, LinkRedirect>;

/// A repository's published link graph (`links.json`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkReference {
    pub origin: GitCheckoutInformation,
    pub url_path_prefix: Option<String>,
    /// Relative markdown path to page metadata.
    #[serde(default)]
    pub links: BTreeMap<String, LinkMetadata>,
    #[serde(default)]
    pub cross_links: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirects: Option<Redirects>,
}

impl LinkReference {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
