//! Directive name lookup.

/// The family a directive name belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DirectiveType {
    Admonition,
    Dropdown,
    Image,
    Figure,
    Include,
    LiteralInclude,
    Settings,
    TabSet,
    TabItem,
    Version,
    Mermaid,
    /// Known MyST directive, tracked by an issue number.
    Unsupported(u32),
    Unknown,
}

const DIRECTIVES: &[(&str, DirectiveType)] = &[
    ("bibliography", DirectiveType::Unsupported(5)),
    ("blockquote", DirectiveType::Unsupported(6)),
    ("csv-table", DirectiveType::Unsupported(9)),
    ("iframe", DirectiveType::Unsupported(14)),
    ("list-table", DirectiveType::Unsupported(17)),
    ("myst", DirectiveType::Unsupported(22)),
    ("topic", DirectiveType::Unsupported(24)),
    ("exercise", DirectiveType::Unsupported(30)),
    ("solution", DirectiveType::Unsupported(31)),
    ("toctree", DirectiveType::Unsupported(32)),
    ("grid", DirectiveType::Unsupported(26)),
    ("grid-item-card", DirectiveType::Unsupported(26)),
    ("card", DirectiveType::Unsupported(25)),
    ("aside", DirectiveType::Unsupported(4)),
    ("margin", DirectiveType::Unsupported(4)),
    ("sidebar", DirectiveType::Unsupported(4)),
    ("code-cell", DirectiveType::Unsupported(8)),
    ("attention", DirectiveType::Unsupported(3)),
    ("caution", DirectiveType::Unsupported(3)),
    ("danger", DirectiveType::Unsupported(3)),
    ("error", DirectiveType::Unsupported(3)),
    ("hint", DirectiveType::Unsupported(3)),
    ("seealso", DirectiveType::Unsupported(3)),
    ("tab-set", DirectiveType::TabSet),
    ("tab-item", DirectiveType::TabItem),
    ("dropdown", DirectiveType::Dropdown),
    ("image", DirectiveType::Image),
    ("figure", DirectiveType::Figure),
    ("figure-md", DirectiveType::Figure),
    ("mermaid", DirectiveType::Mermaid),
    ("include", DirectiveType::Include),
    ("literalinclude", DirectiveType::LiteralInclude),
    ("settings", DirectiveType::Settings),
    ("important", DirectiveType::Admonition),
    ("warning", DirectiveType::Admonition),
    ("note", DirectiveType::Admonition),
    ("tip", DirectiveType::Admonition),
    ("admonition", DirectiveType::Admonition),
    ("versionadded", DirectiveType::Version),
    ("versionchanged", DirectiveType::Version),
    ("versionremoved", DirectiveType::Version),
    ("deprecated", DirectiveType::Version),
];

/// Look up a directive by name. Unregistered names are [`DirectiveType::Unknown`].
pub(crate) fn lookup(name: &str) -> DirectiveType {
    DIRECTIVES
        .iter()
        .find(|(n, _)| *n == name)
        .map_or(DirectiveType::Unknown, |(_, t)| *t)
}

/// Valid names contain only alphanumeric characters, hyphens and
/// underscores.
pub(crate) fn is_valid_directive_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(lookup("tip"), DirectiveType::Admonition);
        assert_eq!(lookup("figure-md"), DirectiveType::Figure);
        assert_eq!(lookup("mermaid"), DirectiveType::Mermaid);
        assert_eq!(lookup("sidebar"), DirectiveType::Unsupported(4));
        assert_eq!(lookup("my-widget"), DirectiveType::Unknown);
    }

    #[test]
    fn test_is_valid_directive_name() {
        assert!(is_valid_directive_name("tab-item"));
        assert!(is_valid_directive_name("my_directive"));
        assert!(!is_valid_directive_name(""));
        assert!(!is_valid_directive_name("bad name"));
        assert!(!is_valid_directive_name("a.b"));
    }
}
