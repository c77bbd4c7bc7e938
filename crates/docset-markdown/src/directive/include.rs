//! `include` and `literalinclude`.

use std::path::PathBuf;

use super::{DirectiveEmitter, Opening};
use crate::context::ParserContext;

/// Folder name snippets must live under to be included as markdown.
pub(crate) const SNIPPETS_FOLDER: &str = "_snippets";

/// Inclusion of another file, either parsed as a markdown snippet or shown
/// verbatim as code.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IncludeDirective {
    /// Absolute, normalized path of the included file.
    pub path: Option<PathBuf>,
    /// Path relative to the documentation root.
    pub path_from_root: Option<String>,
    pub found: bool,
    pub literal: bool,
    pub language: Option<String>,
    pub caption: Option<String>,
    pub label: Option<String>,
}

impl IncludeDirective {
    pub(super) fn new(
        opening: &Opening,
        literal: bool,
        context: &ParserContext<'_>,
        emit: &DirectiveEmitter<'_>,
    ) -> Self {
        let props = &opening.properties;
        let mut include = Self {
            literal: literal || props.flag(&["literal"]),
            language: props.get(&["lang", "language", "code"]).map(str::to_owned),
            caption: props.get(&["caption"]).map(str::to_owned),
            label: props.get(&["label"]).map(str::to_owned),
            ..Self::default()
        };

        let Some(argument) = opening.arguments.as_deref() else {
            emit.error("include requires an argument.");
            return include;
        };
        let path = context.resolve_path(argument);
        let relative = context.display_path(&path);
        if path.is_file() {
            include.found = true;
        } else {
            emit.error(format!("`{relative}` does not exist."));
        }

        if !include.literal {
            let in_snippets = path
                .parent()
                .is_some_and(|dir| dir.to_string_lossy().contains(SNIPPETS_FOLDER));
            if !in_snippets {
                emit.error(format!(
                    "{{include}} only supports including snippets from `_snippet` folders. `{relative}` is not a snippet"
                ));
                include.found = false;
            }
            if path == context.path {
                emit.error(format!(
                    "{{include}} cyclical include detected `{relative}` points to itself"
                ));
                include.found = false;
            }
        }

        include.path = Some(path);
        include.path_from_root = Some(relative);
        include
    }
}
