//! Lenient YAML reading.
//!
//! Configuration files are parsed into a generic [`Value`] tree and then
//! interpreted key by key, so a wrong shape for one key becomes a diagnostic
//! instead of failing the whole document.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use docset_diagnostics::FileEmitter;
use docset_links::model::{AnchorMap, CATCH_ALL_ANCHOR};
use serde_yaml::{Mapping, Value};

use crate::ConfigError;

/// Top level entries of a YAML document, in document order.
pub(crate) fn read_top_level(path: &Path) -> Result<Vec<(String, Value)>, ConfigError> {
    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    let document: Value = serde_yaml::from_str(&content)?;
    match document {
        Value::Null => Ok(Vec::new()),
        Value::Mapping(mapping) => Ok(mapping
            .into_iter()
            .filter_map(|(key, value)| scalar_to_string(&key).map(|key| (key, value)))
            .collect()),
        _ => Err(ConfigError::Validation(format!(
            "{} must contain a YAML mapping",
            path.display()
        ))),
    }
}

/// Render a scalar as a string. Non-scalars and null yield `None`.
pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Reads typed values out of a YAML tree, reporting shape problems against
/// the file being read.
pub(crate) struct YamlReader {
    file: FileEmitter,
}

impl YamlReader {
    pub(crate) fn new(file: FileEmitter) -> Self {
        Self { file }
    }

    pub(crate) fn error(&self, message: impl Into<String>) {
        self.file.error(message);
    }

    pub(crate) fn warning(&self, message: impl Into<String>) {
        self.file.warning(message);
    }

    /// A scalar value. Null is absent; anything else is an error.
    pub(crate) fn read_string(&self, key: &str, value: &Value) -> Option<String> {
        if value.is_null() {
            return None;
        }
        let scalar = scalar_to_string(value);
        if scalar.is_none() {
            self.error(format!("'{key}' is not a string"));
        }
        scalar
    }

    /// Scalars of a sequence; anything else is ignored.
    pub(crate) fn read_string_array(value: &Value) -> Vec<String> {
        value
            .as_sequence()
            .map(|items| items.iter().filter_map(scalar_to_string).collect())
            .unwrap_or_default()
    }

    pub(crate) fn read_mapping<'v>(&self, key: &str, value: &'v Value) -> Option<&'v Mapping> {
        let mapping = value.as_mapping();
        if mapping.is_none() {
            self.warning(format!("'{key}' is not a dictionary"));
        }
        mapping
    }

    /// String to string dictionary. Keys are lowercased.
    pub(crate) fn read_dictionary(&self, key: &str, value: &Value) -> BTreeMap<String, String> {
        let Some(mapping) = self.read_mapping(key, value) else {
            return BTreeMap::new();
        };
        mapping
            .iter()
            .filter_map(|(k, v)| {
                let k = scalar_to_string(k)?;
                let v = self.read_string(&k, v)?;
                Some((k.to_lowercase(), v))
            })
            .collect()
    }

    /// Anchor remapping of a redirect.
    ///
    /// The scalar `!` is shorthand for the catch-all map. Empty and `null`
    /// values map a fragment to nothing.
    pub(crate) fn read_anchor_map(&self, key: &str, value: &Value) -> AnchorMap {
        if let Some(shorthand) = scalar_to_string(value) {
            if shorthand == CATCH_ALL_ANCHOR {
                return AnchorMap::from([(
                    CATCH_ALL_ANCHOR.to_owned(),
                    Some(CATCH_ALL_ANCHOR.to_owned()),
                )]);
            }
            self.error(format!("'{shorthand}' is not a valid redirect anchor value"));
            return AnchorMap::new();
        }
        let Some(mapping) = self.read_mapping(key, value) else {
            return AnchorMap::new();
        };

        let mut anchors = AnchorMap::new();
        for (k, v) in mapping {
            let Some(k) = scalar_to_string(k) else {
                continue;
            };
            if v.is_null() {
                anchors.insert(k, None);
                continue;
            }
            match self.read_string(&k, v) {
                Some(v) if v.is_empty() || v == "null" => {
                    anchors.insert(k, None);
                }
                Some(v) => {
                    anchors.insert(k, Some(v));
                }
                None => {}
            }
        }
        anchors
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use docset_diagnostics::{DiagnosticsCollector, MemorySink};
    use pretty_assertions::assert_eq;

    use super::*;

    fn reader() -> (YamlReader, DiagnosticsCollector, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::default());
        let collector = DiagnosticsCollector::new(vec![sink.clone()]);
        let reader = YamlReader::new(collector.emitter().for_file("docset.yml"));
        (reader, collector, sink)
    }

    #[test]
    fn test_read_dictionary_lowercases_keys() {
        let (reader, mut collector, sink) = reader();
        let value: Value = serde_yaml::from_str("Product: Elasticsearch\nversion: 8\nnested: [1]").unwrap();

        let subs = reader.read_dictionary("subs", &value);
        collector.drain_pending();

        assert_eq!(subs.get("product").map(String::as_str), Some("Elasticsearch"));
        assert_eq!(subs.get("version").map(String::as_str), Some("8"));
        assert_eq!(sink.messages(), vec!["'nested' is not a string"]);
    }

    #[test]
    fn test_read_anchor_map_variants() {
        let (reader, mut collector, sink) = reader();

        let catch_all = reader.read_anchor_map("anchors", &Value::String("!".to_owned()));
        assert_eq!(catch_all.get("!"), Some(&Some("!".to_owned())));

        let value: Value = serde_yaml::from_str("old: new\ngone:\nempty: ''").unwrap();
        let map = reader.read_anchor_map("anchors", &value);
        assert_eq!(map.get("old"), Some(&Some("new".to_owned())));
        assert_eq!(map.get("gone"), Some(&None));
        assert_eq!(map.get("empty"), Some(&None));

        let bad = reader.read_anchor_map("anchors", &Value::String("oops".to_owned()));
        assert!(bad.is_empty());
        collector.drain_pending();
        assert_eq!(sink.messages(), vec!["'oops' is not a valid redirect anchor value"]);
    }

    #[test]
    fn test_read_string_array_skips_non_scalars() {
        let value: Value = serde_yaml::from_str("[kibana, {a: b}, 7]").unwrap();
        assert_eq!(YamlReader::read_string_array(&value), vec!["kibana", "7"]);
    }
}
