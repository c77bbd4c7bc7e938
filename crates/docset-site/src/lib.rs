//! Documentation sets and site builds.
//!
//! This crate provides:
//! - [`DocumentationSet`]: file discovery, classification and the navigation
//!   tree of one documentation root
//! - [`PageIndex`]: outlines of all pages from the minimal parse
//! - [`DocumentationGenerator`]: the full build writing HTML, static files and
//!   `links.json`
//!
//! # Quick Start
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use std::path::Path;
//! use docset_config::Config;
//! use docset_diagnostics::DiagnosticsCollector;
//! use docset_links::FetchedCrossLinks;
//! use docset_site::{DocumentationGenerator, DocumentationSet, git_checkout};
//!
//! let collector = DiagnosticsCollector::new(vec![]);
//! let config = Config::load(Path::new("docs"), None, &collector.emitter())?;
//! let set = DocumentationSet::new(config.docset, &config.build.url_path_prefix, &collector.emitter());
//! let links = FetchedCrossLinks::empty();
//!
//! let origin = git_checkout(&config.build.source_dir);
//! let summary = DocumentationGenerator::new(&set, &config.build, &links, origin).generate(&collector)?;
//! println!("built {} pages", summary.pages);
//! # Ok(())
//! # }
//! ```

mod error;
mod files;
mod generator;
mod git;
mod layout;
mod navigation;
mod set;
mod snippets;

pub use error::BuildError;
pub use files::{DocumentationFile, FileKind};
pub use generator::{BuildSummary, DocumentationGenerator, LINKS_FILE};
pub use git::git_checkout;
pub use layout::{PageLayout, PageLink};
pub use navigation::{DocumentationGroup, FileNavigation, Navigation, NavigationEntry, NavigationItem};
pub use set::{DocumentationSet, MarkdownPage, PageIndex, page_url};
pub use snippets::SnippetAnchors;
