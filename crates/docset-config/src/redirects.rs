//! `redirects.yml` parsing.
//!
//! ```yaml
//! redirects:
//!   old.md: new.md            # plain redirect
//!   gone.md: '!new.md'        # catch-all anchors
//!   removed.md:               # redirect to index.md, catch-all anchors
//!   renamed.md:
//!     to: new.md
//!     anchors: { old-anchor: new-anchor, dropped: }
//!   split.md:
//!     many:
//!       - to: part-1.md
//!         anchors: { intro: intro }
//!       - to: part-2.md
//!         anchors: '!'
//! ```

use std::path::Path;

use docset_diagnostics::Emitter;
use docset_links::model::{LinkRedirect, LinkSingleRedirect, Redirects};
use serde_yaml::{Mapping, Value};

use crate::ConfigError;
use crate::reader::{YamlReader, read_top_level, scalar_to_string};

/// Name of the redirects file next to a docset file called `docset_file_name`.
pub fn redirect_file_name(docset_file_name: &str) -> &'static str {
    if docset_file_name.starts_with('_') {
        "_redirects.yml"
    } else {
        "redirects.yml"
    }
}

/// Parse a redirects file. A missing file yields `Ok(None)`.
pub fn load_redirects(path: &Path, emitter: &Emitter) -> Result<Option<Redirects>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let reader = YamlReader::new(emitter.for_file(path.display().to_string()));
    let entries = read_top_level(path).inspect_err(|e| {
        reader.error(format!("Could not load {}: {e}", path.display()));
    })?;

    let mut redirects = None;
    for (key, value) in entries {
        match key.as_str() {
            "redirects" => redirects = read_redirects(&reader, &value),
            _ => reader.warning(format!("{key} is not a known configuration")),
        }
    }
    Ok(redirects)
}

fn read_redirects(reader: &YamlReader, value: &Value) -> Option<Redirects> {
    let mapping = reader.read_mapping("redirects", value)?;

    let mut redirects = Redirects::new();
    for (key, value) in mapping {
        let Some(from) = scalar_to_string(key) else {
            continue;
        };
        if value.is_null() {
            redirects.insert(from, LinkRedirect::catch_all("index.md"));
            continue;
        }
        if let Some(to) = scalar_to_string(value) {
            let redirect = if to.is_empty() {
                LinkRedirect::catch_all("index.md")
            } else if let Some(to) = to.strip_prefix('!') {
                LinkRedirect::catch_all(to.trim_start_matches('!'))
            } else {
                LinkRedirect::to(to)
            };
            redirects.insert(from, redirect);
            continue;
        }

        let Some(mapping) = reader.read_mapping(&from, value) else {
            continue;
        };
        if let Some(redirect) = read_link_redirect(reader, &from, mapping) {
            redirects.insert(from, redirect);
        }
    }
    Some(redirects)
}

fn read_link_redirect(reader: &YamlReader, from: &str, mapping: &Mapping) -> Option<LinkRedirect> {
    let mut redirect = LinkRedirect::default();
    for (key, value) in mapping {
        let Some(key) = scalar_to_string(key) else {
            continue;
        };
        match key.as_str() {
            "anchors" => redirect.anchors = Some(reader.read_anchor_map(&key, value)),
            "to" => {
                if let Some(to) = reader.read_string(&key, value) {
                    redirect.to = Some(to);
                }
            }
            "many" => redirect.many = read_many(reader, from, value),
            _ => {}
        }
    }

    let no_many = redirect.many.as_ref().is_none_or(Vec::is_empty);
    if redirect.to.is_none() && redirect.anchors.is_none() && redirect.many.is_none() {
        return None;
    }
    // Only an anchor map: remap anchors within the same page.
    if redirect.to.is_none() && no_many {
        redirect.to = Some(from.to_owned());
        return Some(redirect);
    }
    if redirect.to.as_deref().is_none_or(str::is_empty) && no_many {
        return None;
    }
    Some(redirect)
}

fn read_many(reader: &YamlReader, from: &str, value: &Value) -> Option<Vec<LinkSingleRedirect>> {
    let items = value.as_sequence()?;

    let mut many = Vec::new();
    for item in items {
        let Some(mapping) = item.as_mapping() else {
            continue;
        };
        let mut redirect = LinkSingleRedirect::default();
        for (key, value) in mapping {
            let Some(key) = scalar_to_string(key) else {
                continue;
            };
            match key.as_str() {
                "anchors" => redirect.anchors = Some(reader.read_anchor_map(&key, value)),
                "to" => {
                    if let Some(to) = reader.read_string(&key, value) {
                        redirect.to = Some(to);
                    }
                }
                _ => {}
            }
        }
        if redirect.to.is_none() && redirect.anchors.is_some() {
            redirect.to = Some(from.to_owned());
        }
        many.push(redirect);
    }

    if many.is_empty() {
        return None;
    }
    Some(
        many.into_iter()
            .filter(|r| r.to.is_some() && r.anchors.is_some())
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use docset_diagnostics::{DiagnosticsCollector, MemorySink};
    use docset_links::model::AnchorMap;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    fn load(yaml: &str) -> (Option<Redirects>, Vec<String>) {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("redirects.yml");
        fs::write(&path, yaml).unwrap();

        let sink = Arc::new(MemorySink::default());
        let mut collector = DiagnosticsCollector::new(vec![sink.clone()]);
        let redirects = load_redirects(&path, &collector.emitter()).unwrap();
        collector.drain_pending();
        (redirects, sink.messages())
    }

    #[test]
    fn test_scalar_shorthands() {
        let (redirects, messages) = load(
            "redirects:\n  a.md: b.md\n  c.md: '!d.md'\n  e.md:\n  f.md: ''\n",
        );
        let redirects = redirects.unwrap();

        assert!(messages.is_empty());
        assert_eq!(redirects["a.md"], LinkRedirect::to("b.md"));
        assert_eq!(redirects["c.md"], LinkRedirect::catch_all("d.md"));
        assert_eq!(redirects["e.md"], LinkRedirect::catch_all("index.md"));
        assert_eq!(redirects["f.md"], LinkRedirect::catch_all("index.md"));
    }

    #[test]
    fn test_mapping_with_anchors() {
        let (redirects, _) = load(
            "redirects:\n  old.md:\n    to: new.md\n    anchors:\n      intro: overview\n      dropped:\n",
        );
        let redirect = &redirects.unwrap()["old.md"];

        assert_eq!(redirect.to.as_deref(), Some("new.md"));
        assert_eq!(
            redirect.anchors,
            Some(AnchorMap::from([
                ("intro".to_owned(), Some("overview".to_owned())),
                ("dropped".to_owned(), None),
            ]))
        );
    }

    #[test]
    fn test_anchors_only_redirects_to_itself() {
        let (redirects, _) = load("redirects:\n  page.md:\n    anchors: { a: b }\n");
        assert_eq!(redirects.unwrap()["page.md"].to.as_deref(), Some("page.md"));
    }

    #[test]
    fn test_empty_mapping_is_skipped() {
        let (redirects, _) = load("redirects:\n  page.md: {}\n  other.md:\n    to: ''\n");
        assert!(redirects.unwrap().is_empty());
    }

    #[test]
    fn test_many_candidates() {
        let (redirects, _) = load(
            "redirects:\n  split.md:\n    many:\n      - to: a.md\n        anchors: { x: y }\n      - anchors: '!'\n      - to: no-anchors.md\n",
        );
        let redirect = &redirects.unwrap()["split.md"];
        let many = redirect.many.as_ref().unwrap();

        let targets: Vec<_> = many.iter().map(|r| r.to.clone().unwrap()).collect();
        assert_eq!(targets, vec!["a.md", "split.md"]);
        assert!(many[1].is_catch_all());
        assert_eq!(redirect.to, None);
    }

    #[test]
    fn test_unknown_top_level_key_warns() {
        let (redirects, messages) = load("redirects: {}\nextra: 1\n");
        assert!(redirects.unwrap().is_empty());
        assert_eq!(messages, vec!["extra is not a known configuration"]);
    }

    #[test]
    fn test_missing_file_is_none() {
        let tmp = TempDir::new().unwrap();
        let collector = DiagnosticsCollector::new(vec![]);
        let redirects = load_redirects(&tmp.path().join("redirects.yml"), &collector.emitter()).unwrap();
        assert!(redirects.is_none());
    }

    #[test]
    fn test_redirect_file_name() {
        assert_eq!(redirect_file_name("docset.yml"), "redirects.yml");
        assert_eq!(redirect_file_name("_docset.yml"), "_redirects.yml");
    }
}
