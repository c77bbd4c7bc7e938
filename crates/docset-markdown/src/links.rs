//! Link and image URL validation.
//!
//! Every inline link goes through [`process_link`], which reports problems
//! and returns the URL to emit. Internal links to markdown files are
//! rewritten to site URLs and may borrow the target page's title as their
//! text.

use docset_links::{CrossLinkUri, is_cross_link};

use crate::context::ParserContext;

/// Source span of a link, for diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Span {
    pub(crate) line: usize,
    pub(crate) column: usize,
    pub(crate) length: usize,
}

/// What the renderer should emit for a link.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct LinkOutcome {
    pub(crate) url: String,
    /// Text for links written without any, e.g. `[](setup.md)`.
    pub(crate) auto_title: Option<String>,
}

impl LinkOutcome {
    fn unchanged(url: &str) -> Self {
        Self {
            url: url.to_owned(),
            auto_title: None,
        }
    }
}

/// Validate `url` and compute what to render.
pub(crate) fn process_link(
    url: &str,
    has_text: bool,
    is_image: bool,
    context: &ParserContext<'_>,
    span: Span,
) -> LinkOutcome {
    let error = |message: String| {
        context
            .emitter
            .error_at(span.line, span.column, span.length, message);
    };
    let warning = |message: String| {
        context
            .emitter
            .warning_at(span.line, span.column, span.length, message);
    };

    if url.is_empty() {
        error("Found empty url".to_owned());
        return LinkOutcome::unchanged(url);
    }
    if url.contains("{{") || url.contains("}}") {
        warning(
            "The url contains a template expression. Please do not use template expressions in links. \
             See https://github.com/elastic/docs-builder/issues/182 for further information."
                .to_owned(),
        );
        return LinkOutcome::unchanged(url);
    }

    if is_cross_link(url)
        && let Some(uri) = CrossLinkUri::parse(url)
    {
        context.emitter.emit_cross_link(url);
        return match context.resolver.resolve(&uri) {
            Ok(resolved) => LinkOutcome {
                url: resolved,
                auto_title: None,
            },
            Err(e) => {
                error(e.to_string());
                LinkOutcome::unchanged(url)
            }
        };
    }

    match scheme(url) {
        Some("http" | "https") => return LinkOutcome::unchanged(url),
        Some("mailto") => {
            let host = mail_host(url);
            if base_domain(host) != "elastic.co" {
                warning(format!(
                    "mailto links should be to elastic.co domains. Found {host} in {url}. "
                ));
            }
            return LinkOutcome::unchanged(url);
        }
        Some(_) => return LinkOutcome::unchanged(url),
        None => {}
    }

    internal_link(url, has_text, is_image, context, &error, &warning)
}

fn internal_link(
    full_url: &str,
    has_text: bool,
    is_image: bool,
    context: &ParserContext<'_>,
    error: &dyn Fn(String),
    warning: &dyn Fn(String),
) -> LinkOutcome {
    let (url, anchor) = match full_url.split_once('#') {
        Some((url, anchor)) => (url, Some(anchor.trim()).filter(|a| !a.is_empty())),
        None => (full_url, None),
    };
    let file = if url.trim().is_empty() {
        context.path.clone()
    } else {
        let file = context.resolve_path(url);
        if !file.is_file() {
            error(format!(
                "`{url}` does not exist. resolved to `{}",
                context.display_path(&file)
            ));
        }
        file
    };

    let mut auto_title = None;
    if !is_image && (!has_text || anchor.is_some()) {
        let page = context.documents.and_then(|documents| documents.lookup(&file));
        match (&page, context.documents) {
            (None, Some(_)) if !has_text => warning(format!(
                "'{url}' could not be resolved to a markdown file while creating an auto text link, '{}' does not exist.",
                context.display_path(&file)
            )),
            (Some(page), _) => {
                let mut title = page.title.clone();
                if let Some(anchor) = anchor {
                    if !page.has_anchor(anchor) {
                        error(format!("`{anchor}` does not exist in {}.", page.file_name));
                    }
                    if let Some(heading) = page.heading(anchor) {
                        title.push_str(" > ");
                        title.push_str(&heading.heading);
                    }
                }
                if !has_text && !title.is_empty() {
                    auto_title = Some(title);
                }
            }
            _ => {}
        }
    }

    let mut target = String::new();
    if !url.trim().is_empty() {
        let mut path = format!("/{}", context.display_path(&file));
        if let Some(directory) = path.strip_suffix("/index.md") {
            path = format!("{directory}/");
        } else if let Some(page) = path.strip_suffix(".md") {
            path = page.to_owned();
        }
        target = format!("{}{path}", context.url_path_prefix.trim_end_matches('/'));
    }
    if let Some(anchor) = anchor {
        target.push('#');
        target.push_str(anchor);
    }

    LinkOutcome {
        url: target,
        auto_title,
    }
}

/// URI scheme, if `url` is absolute.
fn scheme(url: &str) -> Option<&str> {
    let (scheme, _) = url.split_once(':')?;
    let valid = scheme.len() > 1
        && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some(scheme)
}

fn mail_host(url: &str) -> &str {
    let address = url.trim_start_matches("mailto:");
    let address = address.split(['?', '#']).next().unwrap_or_default();
    address.rsplit_once('@').map_or("", |(_, host)| host)
}

fn base_domain(host: &str) -> String {
    if host == "localhost" {
        return host.to_owned();
    }
    let labels: Vec<&str> = host.split('.').collect();
    labels[labels.len().saturating_sub(2)..].join(".")
}
