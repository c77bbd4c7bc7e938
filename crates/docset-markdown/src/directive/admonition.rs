//! `note`, `tip`, `important`, `warning`, `admonition` and `dropdown`.

use super::Opening;
use crate::context::ParserContext;
use crate::slug::title_case;

/// A callout box with a title.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Admonition {
    /// Directive name, e.g. `note`.
    pub kind: String,
    pub title: String,
    /// Extra CSS classes: `plain` for generic admonitions, `dropdown` when
    /// `:open:` is given.
    pub classes: Option<String>,
    /// `:open:` for collapsible admonitions. `None` when not collapsible.
    pub open: Option<bool>,
}

impl Admonition {
    pub(super) fn new(opening: &Opening, context: &ParserContext<'_>) -> Self {
        let kind = opening.name.clone();
        let mut classes = (kind == "admonition").then(|| "plain".to_owned());
        let open = opening.properties.try_flag(&["open"]);
        if open.is_some() {
            classes = Some("dropdown".to_owned());
        }

        let mut title = title_case(&kind);
        match opening.arguments.as_deref() {
            Some(arguments) if kind == "admonition" || kind == "dropdown" => {
                arguments.clone_into(&mut title);
            }
            Some(arguments) => {
                title.push(' ');
                title.push_str(arguments);
            }
            None => {}
        }

        Self {
            title: context.substitutions.replace(&title),
            kind,
            classes,
            open,
        }
    }

    /// Whether the admonition renders as a collapsible `<details>` element.
    pub fn is_collapsible(&self) -> bool {
        self.kind == "dropdown" || self.open.is_some()
    }
}
