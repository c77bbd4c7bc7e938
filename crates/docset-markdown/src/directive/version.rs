//! `versionadded`, `versionchanged`, `versionremoved` and `deprecated`.

use semver::Version;

use super::{DirectiveEmitter, Opening};
use crate::context::ParserContext;
use crate::slug::title_case;

/// A version note, e.g. `Version Added (8.0.0): New setting`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionDirective {
    /// CSS class: the directive name without `version`.
    pub class: String,
    pub title: String,
    pub version: Option<Version>,
}

impl VersionDirective {
    pub(super) fn new(
        opening: &Opening,
        context: &ParserContext<'_>,
        emit: &DirectiveEmitter<'_>,
    ) -> Self {
        let name = opening.name.as_str();
        let class = name.replace("version", "");
        let arguments = opening.arguments.as_deref().unwrap_or_default();
        let Some((token, rest)) = split_version(arguments) else {
            emit.error(format!("{name} needs exactly 2 arguments: <version> <title>"));
            return Self {
                class,
                title: String::new(),
                version: None,
            };
        };

        let version = parse_version(token);
        if version.is_none() {
            emit.error(format!("'{token}' is not a valid version"));
        }

        let mut title = format!(
            "{} ({})",
            title_case(&name.replace("version", "version ")),
            version.as_ref().map(ToString::to_string).unwrap_or_default()
        );
        if !rest.is_empty() {
            title.push_str(": ");
            title.push_str(rest);
        }

        Self {
            class,
            title: context.substitutions.replace(&title),
            version,
        }
    }
}

fn split_version(arguments: &str) -> Option<(&str, &str)> {
    let arguments = arguments.trim();
    if arguments.is_empty() {
        return None;
    }
    Some(match arguments.split_once(' ') {
        Some((token, rest)) => (token, rest.trim()),
        None => (arguments, ""),
    })
}

/// Parse a semantic version, accepting `major.minor` as `major.minor.0`.
fn parse_version(token: &str) -> Option<Version> {
    if let Ok(version) = Version::parse(token) {
        return Some(version);
    }
    let parts: Vec<&str> = token.split('.').filter(|p| !p.is_empty()).collect();
    match parts.as_slice() {
        [major, minor] => Version::parse(&format!("{major}.{minor}.0")).ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version("8.17.1"), Some(Version::new(8, 17, 1)));
        assert_eq!(parse_version("7.17"), Some(Version::new(7, 17, 0)));
        assert_eq!(parse_version("8"), None);
        assert_eq!(parse_version("a.b"), None);
    }

    #[test]
    fn test_split_version() {
        assert_eq!(split_version("8.0 Adds  things"), Some(("8.0", "Adds  things")));
        assert_eq!(split_version(" 8.0 "), Some(("8.0", "")));
        assert_eq!(split_version(""), None);
    }
}
