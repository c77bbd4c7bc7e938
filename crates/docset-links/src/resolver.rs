//! Cross-link resolution against fetched `links.json` documents.
//!
//! # Architecture
//!
//! [`FetchedCrossLinks`] is an immutable snapshot: every known repository's
//! [`LinkReference`] plus the repositories declared in `docset.yml`.
//! [`CrossLinkResolver`] holds the current snapshot behind a lock and swaps
//! it atomically when a reference is replaced, so readers on other threads
//! always see a complete snapshot.
//!
//! Links into the canonical repository are fully validated: the path must be
//! published (possibly through a redirect) and the fragment must be a known
//! anchor. Links into other declared repositories resolve best-effort.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use crate::model::{LinkMetadata, LinkReference, LinkSingleRedirect};
use crate::uri::CrossLinkUri;

/// Repository whose links are validated fully.
pub const CANONICAL_REPOSITORY: &str = "docs-content";

/// Host serving every repository's published pages.
pub const DEFAULT_BASE_URL: &str = "https://docs-v3-preview.elastic.dev";

/// Branch links resolve against.
const DEFAULT_BRANCH: &str = "main";

/// Why a cross-link could not be resolved.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CrossLinkError {
    #[error("'{0}' is not declared as valid cross link repository in docset.yml under cross_links")]
    Undeclared(String),

    #[error("'{path}' is not a valid link in the '{repository}' cross link repository.")]
    UnknownLink { path: String, repository: String },

    #[error("'{path}' is set a redirect but none of redirect '{}' match or exist in links.json.", .targets.join(", "))]
    UnresolvedRedirect { path: String, targets: Vec<String> },

    #[error("'{path}' does not have any anchors so linking to '{fragment}' is impossible.")]
    NoAnchors { path: String, fragment: String },

    #[error("'{path}' has no anchor named: '{fragment}'.")]
    UnknownAnchor { path: String, fragment: String },
}

/// Snapshot of every fetched link reference.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FetchedCrossLinks {
    /// Repository name to its published link graph.
    pub link_references: HashMap<String, LinkReference>,
    /// Repositories listed under `cross_links` in `docset.yml`.
    pub declared_repositories: HashSet<String>,
}

impl FetchedCrossLinks {
    /// No references and no declared repositories.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Snapshot without fetched references; only declarations are known.
    #[must_use]
    pub fn declared<I, S>(repositories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            link_references: HashMap::new(),
            declared_repositories: repositories.into_iter().map(Into::into).collect(),
        }
    }

    /// Add or replace a repository's reference.
    #[must_use]
    pub fn with_reference(mut self, repository: impl Into<String>, reference: LinkReference) -> Self {
        self.link_references.insert(repository.into(), reference);
        self
    }

    /// Resolve a cross-link to an absolute URL.
    pub fn resolve(&self, uri: &CrossLinkUri) -> Result<String, CrossLinkError> {
        self.resolve_with_base(uri, DEFAULT_BASE_URL)
    }

    /// Resolve a cross-link against a custom base URL.
    pub fn resolve_with_base(&self, uri: &CrossLinkUri, base_url: &str) -> Result<String, CrossLinkError> {
        let repository = uri.scheme.as_str();
        if repository == CANONICAL_REPOSITORY {
            let reference = self
                .link_references
                .get(repository)
                .ok_or_else(|| CrossLinkError::Undeclared(repository.to_owned()))?;
            let path = validate(reference, uri)?;
            return Ok(published_url(base_url, repository, &path));
        }

        if !self.declared_repositories.contains(repository) {
            return Err(CrossLinkError::Undeclared(repository.to_owned()));
        }

        let path = to_target_url_path(&uri.lookup_path()) + &uri.fragment_with_hash();
        Ok(published_url(base_url, repository, &path))
    }
}

fn published_url(base_url: &str, repository: &str, path: &str) -> String {
    format!(
        "{}/elastic/{repository}/tree/{DEFAULT_BRANCH}/{path}",
        base_url.trim_end_matches('/')
    )
}

/// Full validation against a repository's reference. Returns the URL path
/// below the repository root, fragment included.
fn validate(reference: &LinkReference, uri: &CrossLinkUri) -> Result<String, CrossLinkError> {
    let (lookup_path, link, fragment) = lookup_link(reference, uri)?;
    let mut path = to_target_url_path(&lookup_path);

    if let Some(fragment) = fragment.as_deref().filter(|f| !f.is_empty()) {
        let anchor = fragment.trim_start_matches('#');
        if link.anchors.is_none() {
            return Err(CrossLinkError::NoAnchors {
                path: lookup_path,
                fragment: uri.fragment_with_hash(),
            });
        }
        if !link.has_anchor(anchor) {
            return Err(CrossLinkError::UnknownAnchor {
                path: lookup_path,
                fragment: fragment.to_owned(),
            });
        }
        path.push('#');
        path.push_str(anchor);
    }
    Ok(path)
}

/// Find the published page for `uri`, following redirects.
///
/// Returns the final lookup path, its metadata and the fragment to check.
fn lookup_link<'r>(
    reference: &'r LinkReference,
    uri: &CrossLinkUri,
) -> Result<(String, &'r LinkMetadata, Option<String>), CrossLinkError> {
    let lookup_path = uri.lookup_path();

    if let Some(redirect) = reference
        .redirects
        .as_ref()
        .and_then(|redirects| redirects.get(&lookup_path))
    {
        return resolve_redirect(reference, uri, &lookup_path, &redirect.candidates());
    }

    if let Some(link) = reference.links.get(&lookup_path) {
        return Ok((lookup_path, link, Some(uri.fragment_with_hash())));
    }

    Err(CrossLinkError::UnknownLink {
        path: lookup_path,
        repository: uri.scheme.clone(),
    })
}

/// Pick the first redirect candidate that exists and accepts the fragment.
fn resolve_redirect<'r>(
    reference: &'r LinkReference,
    uri: &CrossLinkUri,
    lookup_path: &str,
    candidates: &[LinkSingleRedirect],
) -> Result<(String, &'r LinkMetadata, Option<String>), CrossLinkError> {
    let fragment = uri.fragment().unwrap_or_default();

    for candidate in candidates {
        let Some(to) = candidate.to.as_deref().filter(|to| !to.is_empty()) else {
            continue;
        };
        let Some(link) = reference.links.get(to) else {
            continue;
        };

        if fragment.is_empty() {
            return Ok((to.to_owned(), link, None));
        }

        let anchors = match &candidate.anchors {
            Some(anchors) if !anchors.is_empty() => anchors,
            _ => {
                // Without an anchor map a candidate is only unambiguous alone.
                if candidates.len() > 1 {
                    continue;
                }
                return Ok((to.to_owned(), link, Some(uri.fragment_with_hash())));
            }
        };

        if candidate.is_catch_all() {
            return Ok((to.to_owned(), link, None));
        }

        if let Some(new_fragment) = anchors.get(fragment) {
            return Ok((to.to_owned(), link, new_fragment.clone()));
        }
    }

    Err(CrossLinkError::UnresolvedRedirect {
        path: lookup_path.to_owned(),
        targets: candidates
            .iter()
            .map(|c| c.to.clone().unwrap_or_default())
            .collect(),
    })
}

/// Convert a repository-relative markdown path to its published URL path.
///
/// `.md` is removed, a trailing `/index` is dropped and a root `index`
/// becomes the empty path.
pub fn to_target_url_path(lookup_path: &str) -> String {
    let path = lookup_path.replace(".md", "");
    if let Some(stripped) = path.strip_suffix("/index") {
        return stripped.to_owned();
    }
    if path == "index" {
        return String::new();
    }
    path
}

/// Resolves cross-links against the current [`FetchedCrossLinks`] snapshot.
///
/// Shared across threads; every resolution reads one consistent snapshot.
pub struct CrossLinkResolver {
    links: RwLock<Arc<FetchedCrossLinks>>,
    base_url: String,
}

impl Default for CrossLinkResolver {
    fn default() -> Self {
        Self::new(FetchedCrossLinks::empty())
    }
}

impl CrossLinkResolver {
    #[must_use]
    pub fn new(links: FetchedCrossLinks) -> Self {
        Self {
            links: RwLock::new(Arc::new(links)),
            base_url: DEFAULT_BASE_URL.to_owned(),
        }
    }

    /// Override the host resolved URLs point to.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Arc<FetchedCrossLinks> {
        match self.links.read() {
            Ok(links) => Arc::clone(&*links),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    /// Replace the whole snapshot.
    pub fn replace(&self, links: FetchedCrossLinks) -> Arc<FetchedCrossLinks> {
        let links = Arc::new(links);
        match self.links.write() {
            Ok(mut current) => *current = Arc::clone(&links),
            Err(poisoned) => *poisoned.into_inner() = Arc::clone(&links),
        }
        links
    }

    /// Swap in a local reference for `repository`, e.g. a freshly built
    /// `links.json` that has not been published yet.
    pub fn update_link_reference(
        &self,
        repository: &str,
        reference: LinkReference,
    ) -> Arc<FetchedCrossLinks> {
        let next = (*self.snapshot()).clone().with_reference(repository, reference);
        self.replace(next)
    }

    /// Resolve a cross-link URI.
    pub fn resolve(&self, uri: &CrossLinkUri) -> Result<String, CrossLinkError> {
        self.snapshot().resolve_with_base(uri, &self.base_url)
    }
}

/// Anything that can turn a cross-link into a URL.
///
/// Markdown parsing depends on this seam rather than on a concrete resolver.
pub trait LinkResolver: Send + Sync {
    fn resolve(&self, uri: &CrossLinkUri) -> Result<String, CrossLinkError>;
}

impl LinkResolver for CrossLinkResolver {
    fn resolve(&self, uri: &CrossLinkUri) -> Result<String, CrossLinkError> {
        CrossLinkResolver::resolve(self, uri)
    }
}

impl LinkResolver for FetchedCrossLinks {
    fn resolve(&self, uri: &CrossLinkUri) -> Result<String, CrossLinkError> {
        FetchedCrossLinks::resolve(self, uri)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{AnchorMap, GitCheckoutInformation, LinkRedirect};

    const DOCS_CONTENT: &str = r#"{
      "origin": { "branch": "main", "remote": "elastic/docs-content", "ref": "abc" },
      "url_path_prefix": "",
      "cross_links": [],
      "links": {
        "index.md": {},
        "get-started/index.md": {
          "anchors": ["elasticsearch-intro-elastic-stack", "elasticsearch-intro-use-cases"]
        },
        "solutions/observability/apps/apm-server-binary.md": { "anchors": ["apm-deb"] },
        "no-anchors.md": { "anchors": null }
      },
      "redirects": {
        "moved.md": { "to": "index.md" },
        "catch-all.md": { "to": "get-started/index.md", "anchors": { "!": "!" } },
        "remapped.md": {
          "to": "get-started/index.md",
          "anchors": { "old-intro": "elasticsearch-intro-use-cases", "dropped": null }
        },
        "split.md": {
          "many": [
            { "to": "missing.md", "anchors": { "!": "!" } },
            { "to": "index.md" },
            { "to": "solutions/observability/apps/apm-server-binary.md", "anchors": { "deb": "apm-deb" } },
            { "to": "get-started/index.md", "anchors": { "!": "!" } }
          ]
        },
        "nowhere.md": { "many": [ { "to": "a.md", "anchors": { "x": "y" } }, { "to": "b.md" } ] }
      }
    }"#;

    fn fetched() -> FetchedCrossLinks {
        FetchedCrossLinks::declared(["docs-content", "kibana", "elasticsearch"])
            .with_reference("docs-content", LinkReference::from_json(DOCS_CONTENT).unwrap())
    }

    fn resolve(url: &str) -> Result<String, CrossLinkError> {
        fetched().resolve(&CrossLinkUri::parse(url).unwrap())
    }

    fn message(url: &str) -> String {
        resolve(url).unwrap_err().to_string()
    }

    #[test]
    fn test_resolves_canonical_link_with_anchor() {
        assert_eq!(
            resolve("docs-content://get-started/index.md#elasticsearch-intro-elastic-stack").unwrap(),
            "https://docs-v3-preview.elastic.dev/elastic/docs-content/tree/main/get-started#elasticsearch-intro-elastic-stack"
        );
        assert_eq!(
            resolve("docs-content://index.md").unwrap(),
            "https://docs-v3-preview.elastic.dev/elastic/docs-content/tree/main/"
        );
    }

    #[test]
    fn test_unknown_canonical_path() {
        assert_eq!(
            message("docs-content://does/not/exist.md"),
            "'does/not/exist.md' is not a valid link in the 'docs-content' cross link repository."
        );
    }

    #[test]
    fn test_unknown_anchor() {
        assert_eq!(
            message("docs-content://get-started/index.md#nope"),
            "'get-started/index.md' has no anchor named: '#nope'."
        );
        assert_eq!(
            message("docs-content://no-anchors.md#x"),
            "'no-anchors.md' does not have any anchors so linking to '#x' is impossible."
        );
    }

    #[test]
    fn test_best_effort_for_declared_repository() {
        assert_eq!(
            resolve("kibana://reference/setup/index.md#install").unwrap(),
            "https://docs-v3-preview.elastic.dev/elastic/kibana/tree/main/reference/setup#install"
        );
    }

    #[test]
    fn test_undeclared_repository() {
        assert_eq!(
            message("logstash://index.md"),
            "'logstash' is not declared as valid cross link repository in docset.yml under cross_links"
        );

        let empty = FetchedCrossLinks::declared(["docs-content"]);
        assert_eq!(
            empty
                .resolve(&CrossLinkUri::parse("docs-content://index.md").unwrap())
                .unwrap_err(),
            CrossLinkError::Undeclared("docs-content".to_owned())
        );
    }

    #[test]
    fn test_plain_redirect_keeps_fragmentless_link() {
        assert!(resolve("docs-content://moved.md").unwrap().ends_with("/tree/main/"));
    }

    #[test]
    fn test_single_redirect_without_anchor_map_keeps_fragment() {
        assert_eq!(
            message("docs-content://moved.md#somewhere"),
            "'index.md' has no anchor named: '#somewhere'."
        );
    }

    #[test]
    fn test_catch_all_redirect_drops_fragment() {
        assert!(
            resolve("docs-content://catch-all.md#anything-at-all")
                .unwrap()
                .ends_with("/tree/main/get-started")
        );
    }

    #[test]
    fn test_redirect_remaps_fragment() {
        assert!(
            resolve("docs-content://remapped.md#old-intro")
                .unwrap()
                .ends_with("/get-started#elasticsearch-intro-use-cases")
        );
        assert!(
            resolve("docs-content://remapped.md#dropped")
                .unwrap()
                .ends_with("/get-started")
        );
        assert_eq!(
            message("docs-content://remapped.md#unmapped"),
            "'remapped.md' is set a redirect but none of redirect 'get-started/index.md' match or exist in links.json."
        );
    }

    #[test]
    fn test_many_redirect_first_matching_candidate_wins() {
        // Candidates without anchor maps are skipped when several exist.
        assert!(
            resolve("docs-content://split.md#deb")
                .unwrap()
                .ends_with("/apm-server-binary#apm-deb")
        );
        // The catch-all candidate accepts any fragment.
        assert!(
            resolve("docs-content://split.md#whatever")
                .unwrap()
                .ends_with("/tree/main/get-started")
        );
        // Without a fragment the first existing target wins.
        assert!(resolve("docs-content://split.md").unwrap().ends_with("/tree/main/"));
    }

    #[test]
    fn test_many_redirect_without_match() {
        assert_eq!(
            message("docs-content://nowhere.md#x"),
            "'nowhere.md' is set a redirect but none of redirect 'a.md, b.md' match or exist in links.json."
        );
    }

    #[test]
    fn test_catch_all_candidate_accepts_every_fragment() {
        let mut links = BTreeMap::new();
        links.insert(
            "target.md".to_owned(),
            LinkMetadata {
                anchors: Some(vec![]),
                hidden: false,
            },
        );
        let redirect = LinkRedirect {
            many: Some(vec![
                LinkSingleRedirect {
                    anchors: Some(AnchorMap::from([("a".to_owned(), Some("b".to_owned()))])),
                    to: Some("target.md".to_owned()),
                },
                LinkSingleRedirect {
                    anchors: LinkRedirect::catch_all("target.md").anchors,
                    to: Some("target.md".to_owned()),
                },
            ]),
            ..LinkRedirect::default()
        };
        let reference = LinkReference {
            origin: GitCheckoutInformation::unavailable(),
            url_path_prefix: None,
            links,
            cross_links: vec![],
            redirects: Some(BTreeMap::from([("old.md".to_owned(), redirect)])),
        };
        let fetched = FetchedCrossLinks::declared(["docs-content"]).with_reference("docs-content", reference);

        for fragment in ["x", "y-z", "b", "123"] {
            let uri = CrossLinkUri::parse(&format!("docs-content://old.md#{fragment}")).unwrap();
            assert!(fetched.resolve(&uri).is_ok(), "fragment {fragment}");
        }
    }

    #[test]
    fn test_to_target_url_path() {
        assert_eq!(to_target_url_path("index.md"), "");
        assert_eq!(to_target_url_path("a/b/index.md"), "a/b");
        assert_eq!(to_target_url_path("a/setup.md"), "a/setup");
    }

    #[test]
    fn test_update_link_reference_swaps_snapshot() {
        let resolver = CrossLinkResolver::new(FetchedCrossLinks::declared(["docs-content"]));
        let uri = CrossLinkUri::parse("docs-content://index.md").unwrap();
        assert!(resolver.resolve(&uri).is_err());

        let before = resolver.snapshot();
        resolver.update_link_reference("docs-content", LinkReference::from_json(DOCS_CONTENT).unwrap());

        assert!(before.link_references.is_empty());
        assert!(resolver.resolve(&uri).is_ok());
    }

    #[test]
    fn test_custom_base_url() {
        let resolver = CrossLinkResolver::new(fetched()).with_base_url("http://localhost:4000/");
        let uri = CrossLinkUri::parse("kibana://index.md").unwrap();
        assert_eq!(
            resolver.resolve(&uri).unwrap(),
            "http://localhost:4000/elastic/kibana/tree/main/"
        );
    }
}
