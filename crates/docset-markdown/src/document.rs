//! The parsed document model and its outline.

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::context::{PageInfo, PageTocItem};
use crate::directive::Block;
use crate::events::ChunkEvents;
use crate::front_matter::FrontMatter;
use crate::slug::{HeadingSlugs, slugify};
use crate::substitution::Substitutions;

/// A parsed markdown file.
#[derive(Clone, Debug, Default)]
pub struct MarkdownDocument {
    pub front_matter: FrontMatter,
    /// First level-1 heading, with substitutions applied. Falls back to the
    /// deprecated front matter `title`.
    pub title: Option<String>,
    /// Headings of level 2 and deeper, in document order.
    pub toc: Vec<PageTocItem>,
    /// Heading slugs, inline anchors and directive cross-reference names.
    ///
    /// Anchors of included snippets are not part of this set; the
    /// documentation set merges them in.
    pub anchors: BTreeSet<String>,
    /// Snippets pulled in by `{include}`, in document order.
    pub includes: Vec<PathBuf>,
    pub blocks: Vec<Block>,
}

impl MarkdownDocument {
    pub(crate) fn new(
        front_matter: FrontMatter,
        blocks: Vec<Block>,
        substitutions: &Substitutions,
    ) -> Self {
        let mut outline = Outline {
            substitutions,
            slugs: HeadingSlugs::default(),
            title: None,
            toc: Vec::new(),
            anchors: BTreeSet::new(),
            includes: Vec::new(),
        };
        outline.walk(&blocks, true);

        let title = outline
            .title
            .or_else(|| front_matter.title.as_deref().map(|t| substitutions.replace(t)));
        // Anchors are matched case-insensitively
        let anchors = outline
            .anchors
            .into_iter()
            .chain(outline.toc.iter().map(|item| item.slug.clone()))
            .filter(|anchor| !anchor.is_empty())
            .map(|anchor| anchor.to_lowercase())
            .collect();

        Self {
            front_matter,
            title,
            toc: outline.toc,
            anchors,
            includes: outline.includes,
            blocks,
        }
    }

    /// Title shown in navigation: the front matter `navigation_title` if
    /// set, otherwise the page title.
    pub fn navigation_title(&self) -> Option<&str> {
        self.front_matter
            .navigation_title
            .as_deref()
            .filter(|t| !t.is_empty())
            .or(self.title.as_deref())
    }

    /// Summary for linking from other pages.
    pub fn page_info(&self, file_name: impl Into<String>) -> PageInfo {
        PageInfo {
            file_name: file_name.into(),
            title: self.title.clone().unwrap_or_default(),
            toc: self.toc.clone(),
            anchors: self.anchors.clone(),
        }
    }
}

struct Outline<'s> {
    substitutions: &'s Substitutions,
    slugs: HeadingSlugs,
    title: Option<String>,
    toc: Vec<PageTocItem>,
    anchors: BTreeSet<String>,
    includes: Vec<PathBuf>,
}

impl Outline<'_> {
    fn walk(&mut self, blocks: &[Block], top_level: bool) {
        for block in blocks {
            match block {
                Block::Markdown(chunk) => self.chunk(&chunk.text, top_level),
                Block::Directive(directive) => {
                    if let Some(name) = &directive.cross_reference_name {
                        self.anchors.insert(slugify(name));
                    }
                    if let Some(path) = directive.included_snippet() {
                        self.includes.push(path.clone());
                    }
                    self.walk(&directive.children, false);
                }
            }
        }
    }

    fn chunk(&mut self, text: &str, top_level: bool) {
        let events = ChunkEvents::parse(text);
        for idx in events.headings() {
            let slug = heading_slug(&events, idx, &mut self.slugs);
            let text = events.heading_text(idx);
            match events.heading_level(idx) {
                Some(1) => {
                    if top_level && self.title.is_none() && events.depths[idx] == 0 {
                        self.title = Some(self.substitutions.replace(&text));
                    }
                }
                Some(level) => self.toc.push(PageTocItem {
                    heading: self.substitutions.replace(&text),
                    slug,
                    level,
                }),
                None => {}
            }
        }
        self.anchors
            .extend(events.inline_anchors().iter().map(|a| slugify(a)));
    }
}

/// Slug for the heading starting at `idx`.
///
/// An explicit `[#id]` suffix wins. Level-1 headings never take part in
/// de-duplication.
pub(crate) fn heading_slug(events: &ChunkEvents<'_>, idx: usize, slugs: &mut HeadingSlugs) -> String {
    if let Some(anchor) = events.heading_anchors.get(&idx) {
        return slugify(anchor);
    }
    let text = events.heading_text(idx);
    if events.heading_level(idx) == Some(1) {
        slugify(&text)
    } else {
        slugs.next(&text)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::test_support::Harness;

    fn document(harness: &mut Harness, text: &str) -> MarkdownDocument {
        let blocks = harness.blocks(text);
        let context = harness.context("index.md");
        MarkdownDocument::new(FrontMatter::default(), blocks, &context.substitutions)
    }

    #[test]
    fn test_title_and_toc() {
        let mut harness = Harness::new();
        let doc = document(
            &mut harness,
            "# About {{product}}\n\n## Install\n\n### Install\n\n## Custom [#my-id]\n",
        );

        assert_eq!(doc.title.as_deref(), Some("About Elastic"));
        let slugs: Vec<_> = doc.toc.iter().map(|t| (t.slug.as_str(), t.level)).collect();
        assert_eq!(slugs, vec![("install", 2), ("install-1", 3), ("my-id", 2)]);
        assert_eq!(doc.toc[2].heading, "Custom");
    }

    #[test]
    fn test_anchors_are_lowercase() {
        let mut harness = Harness::new();
        let doc = document(&mut harness, "## Upgrade [#Upgrade-Notes]\n\nSee $$$Legacy$$$\n");

        let anchors: Vec<_> = doc.anchors.iter().map(String::as_str).collect();
        assert_eq!(anchors, vec!["legacy", "upgrade-notes"]);
    }

    #[test]
    fn test_title_only_from_top_level() {
        let mut harness = Harness::new();
        let doc = document(&mut harness, ":::{note}\n# Inside\n:::\n\n> # Quoted\n\n# Real\n");
        assert_eq!(doc.title.as_deref(), Some("Real"));
    }

    #[test]
    fn test_anchor_sources() {
        let mut harness = Harness::new();
        harness.write("_snippets/part.md", "## Part\n");
        let doc = document(
            &mut harness,
            "## Setup\n\nSee $$$Inline-Anchor$$$\n\n```\n$$$in-code$$$\n```\n\n:::{note}\n:name: Named Note\n:::\n\n:::{include} _snippets/part.md\n:::\n",
        );

        let anchors: Vec<_> = doc.anchors.iter().map(String::as_str).collect();
        assert_eq!(anchors, vec!["inline-anchor", "named-note", "setup"]);
        assert_eq!(doc.includes, vec![harness.root().join("_snippets/part.md")]);
        assert!(harness.messages().is_empty());
    }

    #[test]
    fn test_front_matter_title_fallback() {
        let mut harness = Harness::new();
        let blocks = harness.blocks("Just text\n");
        let front_matter = FrontMatter {
            title: Some("Old {{product}}".to_owned()),
            navigation_title: Some("Nav".to_owned()),
            ..FrontMatter::default()
        };
        let context = harness.context("index.md");
        let doc = MarkdownDocument::new(front_matter, blocks, &context.substitutions);

        assert_eq!(doc.title.as_deref(), Some("Old Elastic"));
        assert_eq!(doc.navigation_title(), Some("Nav"));
        assert_eq!(doc.page_info("index.md").title, "Old Elastic");
    }
}
