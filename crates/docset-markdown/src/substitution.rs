//! `{{key}}` substitutions.
//!
//! Three layers are consulted in order: the page's front matter `sub`, the
//! docset's global `subs`, and values derived while parsing (such as
//! `context.page_title`). Keys are case-insensitive. A front matter key that
//! is also a global key is rejected, so the global value always wins.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::{Arc, LazyLock};

use docset_diagnostics::FileEmitter;
use regex::Regex;

static SUBSTITUTION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{\{[^\r\n}]+?\}\}").unwrap());

/// Context key holding the page title.
pub const PAGE_TITLE_KEY: &str = "context.page_title";

/// A `{{key}}` occurrence in a piece of text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubstitutionToken {
    /// Byte range of the whole token, braces included.
    pub range: Range<usize>,
    /// Lowercased key.
    pub key: String,
}

/// Find substitution tokens in `text`.
///
/// Keys containing whitespace are not substitutions and are skipped.
pub fn substitution_tokens(text: &str) -> impl Iterator<Item = SubstitutionToken> + '_ {
    SUBSTITUTION.find_iter(text).filter_map(|m| {
        let key = m.as_str().trim_matches(|c| c == '{' || c == '}');
        if key.is_empty() || key.contains(char::is_whitespace) {
            return None;
        }
        Some(SubstitutionToken {
            range: m.range(),
            key: key.to_lowercase(),
        })
    })
}

/// Layered substitution scopes for one page.
#[derive(Clone, Debug, Default)]
pub struct Substitutions {
    front_matter: BTreeMap<String, String>,
    global: Arc<BTreeMap<String, String>>,
    context: BTreeMap<String, String>,
}

impl Substitutions {
    /// Scopes holding only the docset's global substitutions.
    ///
    /// Global keys are expected to be lowercase already.
    pub fn new(global: Arc<BTreeMap<String, String>>) -> Self {
        Self {
            global,
            ..Self::default()
        }
    }

    /// Add front matter substitutions.
    ///
    /// Keys already defined globally are reported through `emitter` and
    /// dropped.
    #[must_use]
    pub fn with_front_matter(mut self, subs: &BTreeMap<String, String>, emitter: &FileEmitter) -> Self {
        for (key, value) in subs {
            let key = key.to_lowercase();
            if self.global.contains_key(&key) {
                emitter.error(format!(
                    "{{{key}}} can not be redeclared in front matter as its a global substitution"
                ));
                continue;
            }
            self.front_matter.insert(key, value.clone());
        }
        self
    }

    /// Add a derived value, e.g. [`PAGE_TITLE_KEY`].
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into().to_lowercase(), value.into());
        self
    }

    /// Look up `key` across all scopes.
    pub fn get(&self, key: &str) -> Option<&str> {
        let key = key.to_lowercase();
        self.front_matter
            .get(&key)
            .or_else(|| self.global.get(&key))
            .or_else(|| self.context.get(&key))
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.front_matter.is_empty() && self.global.is_empty() && self.context.is_empty()
    }

    /// Replace every known key in `text`.
    ///
    /// Returns whether anything was replaced along with the resulting text.
    /// Unknown keys are left as written.
    pub fn resolve<'t>(&self, text: &'t str) -> (bool, Cow<'t, str>) {
        if self.is_empty() || !text.contains("}}") {
            return (false, Cow::Borrowed(text));
        }
        let mut found = false;
        let mut result = String::with_capacity(text.len());
        let mut last = 0;
        for token in substitution_tokens(text) {
            let Some(value) = self.get(&token.key) else {
                continue;
            };
            result.push_str(&text[last..token.range.start]);
            result.push_str(value);
            last = token.range.end;
            found = true;
        }
        if !found {
            return (false, Cow::Borrowed(text));
        }
        result.push_str(&text[last..]);
        (true, Cow::Owned(result))
    }

    /// [`resolve`](Self::resolve) when only the text matters.
    pub fn replace(&self, text: &str) -> String {
        self.resolve(text).1.into_owned()
    }
}
