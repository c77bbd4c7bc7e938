//! pulldown-cmark events for one markdown chunk.
//!
//! Shared by the outline pass and the renderer so both see the same
//! headings, anchors and slugs.

use std::collections::HashMap;
use std::ops::Range;
use std::sync::LazyLock;

use pulldown_cmark::{CowStr, Event, HeadingLevel, Options, Parser, Tag};
use regex::Regex;

/// `## Heading [#custom-id]`
static HEADING_ANCHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\[]+)\]\s*$").unwrap());

/// `$$$anchor$$$`
pub(crate) static INLINE_ANCHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\$\$([^$]+)\$\$\$").unwrap());

pub(crate) fn parser_options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS
}

/// Events of a chunk with their source ranges and tree structure.
pub(crate) struct ChunkEvents<'a> {
    pub(crate) events: Vec<(Event<'a>, Range<usize>)>,
    /// For a `Start` event, index of its matching `End`; otherwise the
    /// event's own index.
    pub(crate) ends: Vec<usize>,
    /// Nesting depth of each event.
    pub(crate) depths: Vec<usize>,
    /// Explicit `[#id]` anchors by heading start index.
    pub(crate) heading_anchors: HashMap<usize, String>,
}

impl<'a> ChunkEvents<'a> {
    pub(crate) fn parse(text: &'a str) -> Self {
        let mut events: Vec<(Event<'a>, Range<usize>)> = Vec::new();
        for (event, range) in Parser::new_ext(text, parser_options()).into_offset_iter() {
            // `[`, `#id` and `]` arrive as separate text events
            if let Event::Text(next) = &event
                && let Some((Event::Text(previous), previous_range)) = events.last_mut()
            {
                let mut merged = previous.to_string();
                merged.push_str(next);
                *previous = CowStr::from(merged);
                previous_range.end = range.end;
                continue;
            }
            events.push((event, range));
        }

        let mut ends: Vec<usize> = (0..events.len()).collect();
        let mut depths = vec![0; events.len()];
        let mut open = Vec::new();
        for (idx, (event, _)) in events.iter().enumerate() {
            match event {
                Event::Start(_) => {
                    depths[idx] = open.len();
                    open.push(idx);
                }
                Event::End(_) => {
                    if let Some(start) = open.pop() {
                        ends[start] = idx;
                    }
                    depths[idx] = open.len();
                }
                _ => depths[idx] = open.len(),
            }
        }

        let mut heading_anchors = HashMap::new();
        for idx in 0..events.len() {
            if !matches!(events[idx].0, Event::Start(Tag::Heading { .. })) {
                continue;
            }
            let last = ends[idx].saturating_sub(1);
            if last <= idx {
                continue;
            }
            let stripped = match &events[last].0 {
                Event::Text(text) => HEADING_ANCHOR.captures(text).map(|caps| {
                    let start = caps.get(0).map_or(0, |m| m.start());
                    (caps[1].to_owned(), text[..start].trim_end().to_owned())
                }),
                _ => None,
            };
            if let Some((anchor, text)) = stripped {
                events[last].0 = Event::Text(CowStr::from(text));
                heading_anchors.insert(idx, anchor);
            }
        }

        Self {
            events,
            ends,
            depths,
            heading_anchors,
        }
    }

    /// Level of the heading starting at `idx`.
    pub(crate) fn heading_level(&self, idx: usize) -> Option<u8> {
        match &self.events[idx].0 {
            Event::Start(Tag::Heading { level, .. }) => Some(heading_level(*level)),
            _ => None,
        }
    }

    /// Plain text of the heading starting at `idx`, without inline anchors.
    pub(crate) fn heading_text(&self, idx: usize) -> String {
        let mut text = String::new();
        for (event, _) in &self.events[idx + 1..self.ends[idx]] {
            match event {
                Event::Text(t) | Event::Code(t) => text.push_str(t),
                Event::SoftBreak | Event::HardBreak => text.push(' '),
                _ => {}
            }
        }
        INLINE_ANCHOR.replace_all(&text, "").trim().to_owned()
    }

    /// Start indexes of all headings, in document order.
    pub(crate) fn headings(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.events.len()).filter(|&idx| self.heading_level(idx).is_some())
    }

    /// Inline anchors outside code blocks.
    pub(crate) fn inline_anchors(&self) -> Vec<String> {
        let mut anchors = Vec::new();
        let mut idx = 0;
        while idx < self.events.len() {
            match &self.events[idx].0 {
                Event::Start(Tag::CodeBlock(_)) => {
                    idx = self.ends[idx];
                }
                Event::Text(text) => anchors.extend(
                    INLINE_ANCHOR
                        .captures_iter(text)
                        .map(|caps| caps[1].to_owned()),
                ),
                _ => {}
            }
            idx += 1;
        }
        anchors
    }
}

pub(crate) fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_heading_anchor_is_stripped() {
        let chunk = ChunkEvents::parse("## Install the `agent` [#install]\n");
        let heading = chunk.headings().next().unwrap();

        assert_eq!(chunk.heading_level(heading), Some(2));
        assert_eq!(chunk.heading_text(heading), "Install the agent");
        assert_eq!(chunk.heading_anchors.get(&heading).map(String::as_str), Some("#install"));
    }

    #[test]
    fn test_heading_without_anchor() {
        let chunk = ChunkEvents::parse("# Title $$$top$$$\n");
        let heading = chunk.headings().next().unwrap();

        assert_eq!(chunk.heading_text(heading), "Title");
        assert!(chunk.heading_anchors.is_empty());
        assert_eq!(chunk.depths[heading], 0);
    }

    #[test]
    fn test_inline_anchors_skip_code() {
        let chunk = ChunkEvents::parse("Text $$$first$$$ here.\n\n```\n$$$not-me$$$\n```\n");
        assert_eq!(chunk.inline_anchors(), vec!["first"]);
    }

    #[test]
    fn test_ends_match_starts() {
        let chunk = ChunkEvents::parse("- a\n- b\n");
        assert_eq!(chunk.ends[0], chunk.events.len() - 1);
        assert!(matches!(chunk.events[chunk.ends[0]].0, Event::End(_)));
    }
}
