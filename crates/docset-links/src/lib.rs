//! Cross-link plumbing for documentation sets.
//!
//! Every published repository uploads a `links.json` describing its pages,
//! their anchors and its redirects. A bootstrap `link-index.json` maps each
//! repository and branch to that file and its ETag.
//!
//! # Architecture
//!
//! - [`model`]: serde types for both documents.
//! - [`CrossLinkFetcher`]: fetches the index once and every `links.json`
//!   through a [`Transport`], backed by an ETag validated [`LinksCache`].
//! - [`CrossLinkResolver`]: resolves `repository://path#anchor` URIs
//!   against the current [`FetchedCrossLinks`] snapshot.
//! - [`LinkIndexLinkChecker`]: validates every published cross-link.
//!
//! # Example
//!
//! ```
//! use docset_links::{CrossLinkUri, FetchedCrossLinks};
//!
//! let links = FetchedCrossLinks::declared(["kibana"]);
//! let uri = CrossLinkUri::parse("kibana://reference/index.md#setup").unwrap();
//! assert_eq!(
//!     links.resolve(&uri).unwrap(),
//!     "https://docs-v3-preview.elastic.dev/elastic/kibana/tree/main/reference#setup"
//! );
//! ```

mod cache;
mod checker;
mod fetcher;
pub mod model;
mod resolver;
mod uri;

pub use cache::{CACHE_VERSION, FileLinksCache, LinksCache, NullLinksCache};
pub use checker::LinkIndexLinkChecker;
pub use fetcher::{CrossLinkFetcher, DEFAULT_INDEX_URL, FetchError, HttpTransport, Transport};
pub use model::{
    GitCheckoutInformation, LinkIndex, LinkIndexEntry, LinkMetadata, LinkRedirect, LinkReference,
    LinkSingleRedirect,
};
pub use resolver::{
    CANONICAL_REPOSITORY, CrossLinkError, CrossLinkResolver, DEFAULT_BASE_URL, FetchedCrossLinks,
    LinkResolver, to_target_url_path,
};
pub use uri::{CrossLinkUri, EXCLUDED_SCHEMES, is_cross_link};
