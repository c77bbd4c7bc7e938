//! Text helpers shared by the parser and the renderer.

use std::collections::HashMap;

use pulldown_cmark::{Event, Parser};

/// Generate a URL fragment from text.
///
/// Lowercases, turns whitespace runs into a single `-`, drops everything but
/// ASCII letters, digits, `-`, `.` and `_`, then collapses repeated dashes.
///
/// ```
/// use docset_markdown::slugify;
///
/// assert_eq!(slugify("Getting Started"), "getting-started");
/// assert_eq!(slugify("[#custom-id]"), "custom-id");
/// assert_eq!(slugify("  API v2.0 -- Notes "), "api-v2.0-notes");
/// ```
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.trim().chars() {
        let c = if c.is_whitespace() {
            '-'
        } else {
            c.to_ascii_lowercase()
        };
        if c == '-' && slug.ends_with('-') {
            continue;
        }
        if c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_') {
            slug.push(c);
        }
    }
    slug
}

/// Render inline markdown as plain text.
pub fn strip_markdown(markdown: &str) -> String {
    let mut text = String::with_capacity(markdown.len());
    for event in Parser::new(markdown) {
        match event {
            Event::Text(t) | Event::Code(t) => text.push_str(&t),
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            _ => {}
        }
    }
    text.trim_end().to_owned()
}

/// Escape HTML special characters.
pub fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}

/// Capitalize the first letter of every word.
pub(crate) fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Hands out heading slugs that are unique within one document.
///
/// Repeats of a slug get a `-N` suffix in order of appearance.
#[derive(Debug, Default)]
pub(crate) struct HeadingSlugs {
    id_counts: HashMap<String, usize>,
}

impl HeadingSlugs {
    pub(crate) fn next(&mut self, text: &str) -> String {
        let base = slugify(text);
        let count = self.id_counts.entry(base.clone()).or_insert(0);
        let slug = if *count == 0 {
            base
        } else {
            format!("{base}-{count}")
        };
        *count += 1;
        slug
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("What's new?"), "whats-new");
        assert_eq!(slugify("C# & .NET"), "c-.net");
        assert_eq!(slugify("snake_case stays"), "snake_case-stays");
        assert_eq!(slugify(""), "");
    }

    #[test]
    fn test_strip_markdown() {
        assert_eq!(strip_markdown("Install **Elastic** `agent`"), "Install Elastic agent");
        assert_eq!(strip_markdown("See [the docs](x.md)"), "See the docs");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("tip"), "Tip");
        assert_eq!(title_case("version added"), "Version Added");
    }

    #[test]
    fn test_heading_slugs_are_unique() {
        let mut slugs = HeadingSlugs::default();

        assert_eq!(slugs.next("Example"), "example");
        assert_eq!(slugs.next("Example"), "example-1");
        assert_eq!(slugs.next("Other"), "other");
        assert_eq!(slugs.next("example"), "example-2");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a href=\"x\">&</a>"), "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;");
    }
}
