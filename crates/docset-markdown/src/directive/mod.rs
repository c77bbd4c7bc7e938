//! MyST directive blocks.
//!
//! Directives are fenced containers opened by three or more colons or
//! backticks followed by `{name}` and optional arguments:
//!
//! ```text
//! :::{note} Optional title
//! :open:
//! Body content, which may hold nested directives.
//! :::
//! ```
//!
//! Lines starting with `:` right after the opening line are properties.
//! Directives close on a bare fence of the same character that is at least
//! as long as the opener, so nested directives use longer fences.
//!
//! # Architecture
//!
//! - [`parser`]: line-based block tree builder, skipping code fences.
//! - [`registry`]: directive name to [`DirectiveType`].
//! - One module per directive family turning the parsed opening into a
//!   typed [`DirectiveKind`] and reporting invalid usage.

mod admonition;
mod image;
mod include;
pub(crate) mod parser;
mod registry;
pub(crate) mod settings;
mod tabs;
mod version;

use std::path::PathBuf;

use docset_diagnostics::FileEmitter;

pub use admonition::Admonition;
pub use image::ImageDirective;
pub use include::IncludeDirective;
pub(crate) use registry::DirectiveType;
pub use settings::SettingsDirective;
pub use tabs::{TabItem, TabSet};
pub use version::VersionDirective;

use crate::context::ParserContext;
use crate::fence::Fence;

/// A piece of plain markdown between directives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkdownChunk {
    pub text: String,
    /// 1-indexed source line of the first line of `text`.
    pub line: usize,
}

/// A node of the block tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Block {
    Markdown(MarkdownChunk),
    Directive(DirectiveBlock),
}

/// Directive properties in declaration order.
///
/// Keys are lowercase. A property may have an empty value, e.g. `:open:`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Properties(Vec<(String, String)>);

impl Properties {
    /// Set `key`, replacing an earlier value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into().to_lowercase();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    fn raw(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .find_map(|key| self.0.iter().find(|(k, _)| k == key))
            .map(|(_, v)| v.as_str())
    }

    /// First non-empty value among `keys`, which are aliases of each other.
    pub fn get(&self, keys: &[&str]) -> Option<&str> {
        self.raw(keys).filter(|v| !v.is_empty())
    }

    /// Boolean property: present without a value, or `true`.
    pub fn flag(&self, keys: &[&str]) -> bool {
        self.try_flag(keys).unwrap_or(false)
    }

    /// Boolean property, `None` when absent.
    pub fn try_flag(&self, keys: &[&str]) -> Option<bool> {
        self.raw(keys)
            .map(|v| v.is_empty() || v.eq_ignore_ascii_case("true"))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// What a directive turned out to be after validation.
#[derive(Clone, Debug, PartialEq)]
pub enum DirectiveKind {
    Admonition(Admonition),
    Dropdown(Admonition),
    Image(ImageDirective),
    Figure(ImageDirective),
    Include(IncludeDirective),
    LiteralInclude(IncludeDirective),
    Settings(SettingsDirective),
    TabSet(TabSet),
    TabItem(TabItem),
    Version(VersionDirective),
    Mermaid,
    /// A known MyST directive this builder does not support yet.
    Unsupported { issue: u32 },
    /// Any other name. Children are rendered as plain content.
    Unknown,
}

/// A parsed and validated directive.
#[derive(Clone, Debug, PartialEq)]
pub struct DirectiveBlock {
    pub name: String,
    pub arguments: Option<String>,
    pub properties: Properties,
    /// Linkable name declared through `:name:` or `:label:`.
    pub cross_reference_name: Option<String>,
    pub line: usize,
    pub column: usize,
    pub fence: Fence,
    pub children: Vec<Block>,
    pub kind: DirectiveKind,
}

impl DirectiveBlock {
    /// Non-literal include target that exists on disk.
    pub fn included_snippet(&self) -> Option<&PathBuf> {
        match &self.kind {
            DirectiveKind::Include(include) if include.found && !include.literal => {
                include.path.as_ref()
            }
            _ => None,
        }
    }
}

/// The opening line of a directive with its properties.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Opening {
    pub(crate) name: String,
    pub(crate) arguments: Option<String>,
    pub(crate) properties: Properties,
    pub(crate) line: usize,
    pub(crate) column: usize,
    pub(crate) fence: Fence,
    pub(crate) directive_type: DirectiveType,
}

/// The enclosing tab set of a tab item.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct TabSetRef {
    pub(crate) index: usize,
    pub(crate) group: Option<String>,
}

/// Position of a block's siblings and parent, needed by tab items.
#[derive(Clone, Debug, Default)]
pub(crate) struct Placement {
    pub(crate) sibling_index: usize,
    pub(crate) tab_set: Option<TabSetRef>,
}

/// Reports diagnostics at a directive's opening.
pub(crate) struct DirectiveEmitter<'c> {
    emitter: &'c FileEmitter,
    line: usize,
    column: usize,
    length: usize,
}

impl DirectiveEmitter<'_> {
    pub(crate) fn error(&self, message: impl Into<String>) {
        self.emitter
            .error_at(self.line, self.column, self.length, message);
    }

    pub(crate) fn warning(&self, message: impl Into<String>) {
        self.emitter
            .warning_at(self.line, self.column, self.length, message);
    }
}

/// Validate a closed directive and attach its children.
pub(crate) fn finalize(
    opening: Opening,
    children: Vec<Block>,
    placement: &Placement,
    context: &ParserContext<'_>,
) -> DirectiveBlock {
    let emit = DirectiveEmitter {
        emitter: &context.emitter,
        line: opening.line,
        column: opening.column,
        length: opening.name.len(),
    };
    let kind = match opening.directive_type {
        DirectiveType::Admonition => {
            DirectiveKind::Admonition(Admonition::new(&opening, context))
        }
        DirectiveType::Dropdown => DirectiveKind::Dropdown(Admonition::new(&opening, context)),
        DirectiveType::Image => DirectiveKind::Image(ImageDirective::new(&opening, context, &emit)),
        DirectiveType::Figure => {
            DirectiveKind::Figure(ImageDirective::new(&opening, context, &emit))
        }
        DirectiveType::Include => {
            let include = IncludeDirective::new(&opening, false, context, &emit);
            if include.literal {
                DirectiveKind::LiteralInclude(include)
            } else {
                DirectiveKind::Include(include)
            }
        }
        DirectiveType::LiteralInclude => {
            DirectiveKind::LiteralInclude(IncludeDirective::new(&opening, true, context, &emit))
        }
        DirectiveType::Settings => {
            DirectiveKind::Settings(SettingsDirective::new(&opening, context, &emit))
        }
        DirectiveType::TabSet => DirectiveKind::TabSet(TabSet::new(&opening)),
        DirectiveType::TabItem => {
            DirectiveKind::TabItem(TabItem::new(&opening, placement, context, &emit))
        }
        DirectiveType::Version => {
            DirectiveKind::Version(VersionDirective::new(&opening, context, &emit))
        }
        DirectiveType::Mermaid => DirectiveKind::Mermaid,
        DirectiveType::Unsupported(issue) => {
            emit.warning(format!(
                "Directive block '{}' is unsupported. See https://github.com/elastic/docs-builder/issues/{issue} for more information.",
                opening.name
            ));
            DirectiveKind::Unsupported { issue }
        }
        DirectiveType::Unknown => DirectiveKind::Unknown,
    };

    let cross_reference_name = match &kind {
        DirectiveKind::Image(image) | DirectiveKind::Figure(image) => image.label.clone(),
        DirectiveKind::Include(include) | DirectiveKind::LiteralInclude(include) => {
            include.label.clone()
        }
        _ => opening.properties.get(&["name"]).map(str::to_owned),
    };

    DirectiveBlock {
        name: opening.name,
        arguments: opening.arguments,
        properties: opening.properties,
        cross_reference_name,
        line: opening.line,
        column: opening.column,
        fence: opening.fence,
        children,
        kind,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_properties_aliases_and_flags() {
        let mut props = Properties::default();
        props.insert("W", "100");
        props.insert("open", "");
        props.insert("selected", "false");
        props.insert("w", "200");

        assert_eq!(props.get(&["width", "w"]), Some("200"));
        assert_eq!(props.get(&["open"]), None);
        assert!(props.flag(&["open"]));
        assert_eq!(props.try_flag(&["selected"]), Some(false));
        assert_eq!(props.try_flag(&["missing"]), None);
        assert_eq!(props.iter().count(), 3);
    }
}
