//! `image` and `figure`.

use super::{DirectiveEmitter, Opening};
use crate::context::ParserContext;

/// An image, optionally captioned by the directive body when used as a
/// figure.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImageDirective {
    /// Image URL as written.
    pub url: Option<String>,
    /// URL to render: external URLs unchanged, local files relative to the
    /// site root.
    pub src: Option<String>,
    pub found: bool,
    pub label: Option<String>,
    pub alt: Option<String>,
    pub align: Option<String>,
    pub height: Option<String>,
    pub width: Option<String>,
    pub scale: Option<String>,
    /// Link target making the image clickable.
    pub target: Option<String>,
}

impl ImageDirective {
    pub(super) fn new(
        opening: &Opening,
        context: &ParserContext<'_>,
        emit: &DirectiveEmitter<'_>,
    ) -> Self {
        let props = &opening.properties;
        let owned = |keys: &[&str]| props.get(keys).map(str::to_owned);
        let mut image = Self {
            label: owned(&["label", "name"]),
            alt: owned(&["alt"]),
            align: owned(&["align"]),
            height: owned(&["height", "h"]),
            width: owned(&["width", "w"]),
            scale: owned(&["scale"]),
            target: owned(&["target"]),
            ..Self::default()
        };

        let Some(url) = opening.arguments.as_deref() else {
            emit.error(format!("{} requires an argument.", opening.name));
            return image;
        };
        image.url = Some(url.to_owned());

        if url.starts_with("http://") || url.starts_with("https://") {
            emit.warning(format!("{} is using an external URI: {url} ", opening.name));
            image.found = true;
            image.src = Some(url.to_owned());
            return image;
        }

        let path = context.resolve_path(url);
        let relative = context.display_path(&path);
        image.src = Some(format!("{}/{relative}", context.url_path_prefix));
        if path.is_file() {
            image.found = true;
        } else {
            emit.error(format!("`{url}` does not exist. resolved to `{relative}"));
        }
        image
    }
}
