//! Cross-link URIs: `<repository>://<path>[#fragment]`.

use std::fmt;

/// URI schemes that are never treated as cross-links.
pub const EXCLUDED_SCHEMES: [&str; 6] = ["http", "https", "tel", "jdbc", "mailto", "file"];

/// A parsed cross-link.
///
/// The scheme names the target repository. The authority and path together
/// form the repository-relative markdown path:
/// `kibana://reference/setup.md#install` has host `reference`, path
/// `/setup.md` and fragment `install`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CrossLinkUri {
    pub scheme: String,
    pub host: String,
    pub path: String,
    /// Fragment without the leading `#`. `None` when the URI has no `#`.
    pub fragment: Option<String>,
}

impl CrossLinkUri {
    /// Parse an absolute URI of the form `scheme://host/path#fragment`.
    ///
    /// Scheme and host are lowercased. Returns `None` when the string has no
    /// `://` separator or the scheme is malformed.
    pub fn parse(url: &str) -> Option<Self> {
        let (scheme, rest) = url.split_once("://")?;
        if !is_valid_scheme(scheme) {
            return None;
        }
        let (rest, fragment) = match rest.split_once('#') {
            Some((rest, fragment)) => (rest, Some(fragment.to_owned())),
            None => (rest, None),
        };
        let (host, path) = match rest.find('/') {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, ""),
        };
        Some(Self {
            scheme: scheme.to_ascii_lowercase(),
            host: host.to_ascii_lowercase(),
            path: path.to_owned(),
            fragment,
        })
    }

    /// Repository-relative path used to look the link up in `links.json`.
    pub fn lookup_path(&self) -> String {
        let joined = format!("{}/{}", self.host, self.path.trim_start_matches('/'));
        let trimmed = joined.trim_matches('/');
        if trimmed.is_empty() && self.host.ends_with(".md") {
            return self.host.clone();
        }
        trimmed.to_owned()
    }

    /// Non-empty fragment, if any.
    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref().filter(|f| !f.is_empty())
    }

    /// Fragment rendered with its `#`, or an empty string.
    pub fn fragment_with_hash(&self) -> String {
        self.fragment()
            .map_or_else(String::new, |fragment| format!("#{fragment}"))
    }
}

impl fmt::Display for CrossLinkUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}{}", self.scheme, self.host, self.path)?;
        if let Some(fragment) = &self.fragment {
            write!(f, "#{fragment}")?;
        }
        Ok(())
    }
}

fn is_valid_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Whether `url` is a cross-link: an absolute URI whose scheme is not one of
/// [`EXCLUDED_SCHEMES`].
pub fn is_cross_link(url: &str) -> bool {
    CrossLinkUri::parse(url).is_some_and(|uri| !EXCLUDED_SCHEMES.contains(&uri.scheme.as_str()))
}
