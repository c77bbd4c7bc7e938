//! `settings`: renders a YAML settings reference file.

use std::fmt::Write;
use std::path::PathBuf;

use serde::Deserialize;

use super::{DirectiveEmitter, Opening};
use crate::context::ParserContext;
use crate::slug::{escape_html, slugify};

/// Reference to a YAML settings file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SettingsDirective {
    pub path: Option<PathBuf>,
    pub found: bool,
}

impl SettingsDirective {
    pub(super) fn new(
        opening: &Opening,
        context: &ParserContext<'_>,
        emit: &DirectiveEmitter<'_>,
    ) -> Self {
        let Some(argument) = opening.arguments.as_deref() else {
            emit.error(format!("{} requires an argument.", opening.name));
            return Self::default();
        };
        let path = context.resolve_path(argument);
        let found = path.is_file();
        if !found {
            emit.error(format!("`{}` does not exist.", context.display_path(&path)));
        }
        Self {
            path: Some(path),
            found,
        }
    }
}

/// A settings reference document.
#[derive(Debug, Default, Deserialize)]
pub struct YamlSettings {
    pub product: Option<String>,
    pub collection: Option<String>,
    #[serde(default)]
    pub groups: Vec<SettingsGroup>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SettingsGroup {
    #[serde(rename = "group")]
    pub name: Option<String>,
    #[serde(rename = "self")]
    pub id: Option<String>,
    #[serde(default)]
    pub settings: Vec<Setting>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Setting {
    #[serde(rename = "setting")]
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type", default)]
    pub mutability: SettingMutability,
    pub options: Option<Vec<AllowedValue>>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingMutability {
    #[default]
    Static,
    Dynamic,
}

#[derive(Debug, Default, Deserialize)]
pub struct AllowedValue {
    pub option: Option<String>,
    pub description: Option<String>,
}

impl YamlSettings {
    pub fn parse(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Render as HTML. Descriptions are markdown, rendered by `markdown`.
    pub fn to_html(&self, markdown: &dyn Fn(&str) -> String) -> String {
        let mut html = String::new();
        for group in &self.groups {
            let name = group.name.as_deref().unwrap_or_default();
            let id = group.id.as_deref().map_or_else(|| slugify(name), slugify);
            let _ = write!(html, r#"<h2 id="{id}">{}</h2>"#, escape_html(name));
            for setting in &group.settings {
                render_setting(&mut html, setting, markdown);
            }
        }
        html
    }
}

fn render_setting(html: &mut String, setting: &Setting, markdown: &dyn Fn(&str) -> String) {
    let name = setting.name.as_deref().unwrap_or_default();
    let _ = write!(
        html,
        r#"<div class="setting" id="{}"><dt><code>{}</code>"#,
        slugify(name),
        escape_html(name)
    );
    if setting.mutability == SettingMutability::Dynamic {
        html.push_str(r#" <span class="setting-dynamic">Dynamic</span>"#);
    }
    html.push_str("</dt><dd>");
    if let Some(description) = &setting.description {
        html.push_str(&markdown(description));
    }
    if let Some(options) = setting.options.as_ref().filter(|o| !o.is_empty()) {
        html.push_str("<ul>");
        for option in options {
            let _ = write!(
                html,
                "<li><code>{}</code>",
                escape_html(option.option.as_deref().unwrap_or_default())
            );
            if let Some(description) = &option.description {
                html.push_str(": ");
                html.push_str(&markdown(description));
            }
            html.push_str("</li>");
        }
        html.push_str("</ul>");
    }
    html.push_str("</dd></div>");
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const SETTINGS: &str = r"
product: Kibana
collection: General settings
groups:
  - group: General
    self: general-settings
    settings:
      - setting: server.port
        description: Port to **listen** on.
        type: static
      - setting: logging.level
        description: Level.
        type: dynamic
        options:
          - option: info
            description: Default.
";

    #[test]
    fn test_parse_settings() {
        let settings = YamlSettings::parse(SETTINGS).unwrap();

        assert_eq!(settings.product.as_deref(), Some("Kibana"));
        assert_eq!(settings.groups.len(), 1);
        assert_eq!(settings.groups[0].settings.len(), 2);
        assert_eq!(settings.groups[0].settings[1].mutability, SettingMutability::Dynamic);
    }

    #[test]
    fn test_render_settings() {
        let settings = YamlSettings::parse(SETTINGS).unwrap();
        let html = settings.to_html(&|md: &str| format!("<p>{md}</p>"));

        assert!(html.starts_with(r#"<h2 id="general-settings">General</h2>"#));
        assert!(html.contains(r#"<div class="setting" id="server.port"><dt><code>server.port</code></dt><dd><p>Port to **listen** on.</p>"#));
        assert!(html.contains(r#"<span class="setting-dynamic">Dynamic</span>"#));
        assert!(html.contains("<li><code>info</code>: <p>Default.</p></li>"));
    }

    #[test]
    fn test_invalid_settings() {
        assert!(YamlSettings::parse("groups: 5").is_err());
    }
}
