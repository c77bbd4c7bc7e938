//! `tab-set` and `tab-item`.

use super::{DirectiveEmitter, Opening, Placement};
use crate::context::ParserContext;

/// A group of tabs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TabSet {
    /// Unique within a page: the line the tab set opens on.
    pub index: usize,
    /// Tab sets sharing a group switch tabs together.
    pub group: Option<String>,
}

impl TabSet {
    pub(super) fn new(opening: &Opening) -> Self {
        Self {
            index: opening.line,
            group: opening.properties.get(&["group"]).map(str::to_owned),
        }
    }
}

/// One tab of a [`TabSet`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TabItem {
    pub title: String,
    /// Position among the parent's children.
    pub index: usize,
    /// Index of the enclosing tab set, `None` outside one.
    pub tab_set_index: Option<usize>,
    pub tab_set_group: Option<String>,
    pub sync_key: Option<String>,
    pub selected: bool,
}

impl TabItem {
    pub(super) fn new(
        opening: &Opening,
        placement: &Placement,
        context: &ParserContext<'_>,
        emit: &DirectiveEmitter<'_>,
    ) -> Self {
        if opening.arguments.is_none() {
            emit.error("{tab-item} requires an argument to name the tab.");
        }
        let title = opening.arguments.as_deref().unwrap_or("{undefined}");
        Self {
            title: context.substitutions.replace(title),
            index: placement.sibling_index,
            tab_set_index: placement.tab_set.as_ref().map(|set| set.index),
            tab_set_group: placement.tab_set.as_ref().and_then(|set| set.group.clone()),
            sync_key: opening.properties.get(&["sync"]).map(str::to_owned),
            selected: opening.properties.flag(&["selected"]),
        }
    }
}
