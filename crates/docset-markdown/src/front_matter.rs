//! YAML front matter.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_yaml::Value;

/// Page level settings declared between `---` lines at the top of a file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrontMatter {
    /// Deprecated; pages take their title from the first level 1 heading.
    pub title: Option<String>,
    pub navigation_title: Option<String>,
    /// Page substitutions (`sub`), keys as written.
    pub substitutions: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct RawFrontMatter {
    title: Option<String>,
    navigation_title: Option<String>,
    #[serde(default)]
    sub: Option<serde_yaml::Mapping>,
}

impl FrontMatter {
    /// Parse the YAML between the front matter delimiters.
    pub fn parse(yaml: &str) -> Result<Self, serde_yaml::Error> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let raw: RawFrontMatter = serde_yaml::from_str(yaml)?;
        let substitutions = raw
            .sub
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(k, v)| Some((scalar(&k)?, scalar(&v)?)))
            .collect();
        Ok(Self {
            title: raw.title,
            navigation_title: raw.navigation_title,
            substitutions,
        })
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// A markdown source split into its front matter and body.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct SplitSource<'a> {
    pub(crate) front_matter: Option<&'a str>,
    pub(crate) body: &'a str,
    /// 1-indexed line the body starts on.
    pub(crate) body_line: usize,
}

/// Split off a leading `---` delimited YAML block.
///
/// The block is closed by a `---` or `...` line. Without a closing line the
/// whole source is body.
pub(crate) fn split(source: &str) -> SplitSource<'_> {
    let unsplit = SplitSource {
        front_matter: None,
        body: source,
        body_line: 1,
    };
    let mut lines = source.split_inclusive('\n');
    match lines.next() {
        Some(first) if first.trim_end() == "---" => {}
        _ => return unsplit,
    }

    let yaml_start = source.find('\n').map_or(source.len(), |i| i + 1);
    let mut offset = yaml_start;
    for (idx, line) in lines.enumerate() {
        let trimmed = line.trim_end();
        if trimmed == "---" || trimmed == "..." {
            return SplitSource {
                front_matter: Some(&source[yaml_start..offset]),
                body: &source[offset + line.len()..],
                body_line: idx + 3,
            };
        }
        offset += line.len();
    }
    unsplit
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_split_front_matter() {
        let split = split("---\nsub:\n  a: b\n---\n# Title\n");

        assert_eq!(split.front_matter, Some("sub:\n  a: b\n"));
        assert_eq!(split.body, "# Title\n");
        assert_eq!(split.body_line, 5);
    }

    #[test]
    fn test_no_front_matter() {
        let split = split("# Title\n---\n");
        assert_eq!(split.front_matter, None);
        assert_eq!(split.body_line, 1);
    }

    #[test]
    fn test_unclosed_front_matter_is_body() {
        let source = "---\ntitle: x\n";
        assert_eq!(split(source).body, source);
    }

    #[test]
    fn test_parse_front_matter() {
        let fm = FrontMatter::parse("title: Old\nnavigation_title: Short\nsub:\n  version: 8\n  product: Kibana\napplies_to: {}\n")
            .unwrap();

        assert_eq!(fm.title.as_deref(), Some("Old"));
        assert_eq!(fm.navigation_title.as_deref(), Some("Short"));
        assert_eq!(fm.substitutions.get("version").map(String::as_str), Some("8"));
        assert_eq!(fm.substitutions.get("product").map(String::as_str), Some("Kibana"));
    }

    #[test]
    fn test_invalid_front_matter() {
        assert!(FrontMatter::parse("sub: [unclosed").is_err());
    }
}
