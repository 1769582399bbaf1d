use serde::Deserialize;

/// Top-level app config (`dashcfg.yaml`), anchored by the config dir.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub title: Option<String>,
    // Path to the widget catalog, relative to the config dir.
    #[serde(default = "default_catalog")]
    pub catalog: String,
    // Optional existing entry to seed the editor with.
    #[serde(default)]
    pub entry: Option<String>,
    // Save target for the sanitized fragment.
    #[serde(default = "default_output")]
    pub output: String,
    // Collaborator command returning the known variable names.
    #[serde(default = "default_env_keys_cmd")]
    pub env_keys_cmd: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: Some("DASHCFG".to_string()),
            catalog: default_catalog(),
            entry: None,
            output: default_output(),
            env_keys_cmd: default_env_keys_cmd(),
        }
    }
}

fn default_catalog() -> String {
    "catalog.yaml".to_string()
}

fn default_output() -> String {
    "widget.yaml".to_string()
}

fn default_env_keys_cmd() -> String {
    "${APP_BIN} env-keys".to_string()
}

/// The widget catalog: one schema per widget type, interpreted by the
/// generic form controller instead of one handwritten form per integration.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct WidgetCatalog {
    pub widgets: Vec<WidgetSchema>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct WidgetSchema {
    // Discriminator emitted as the fragment's `type` key.
    #[serde(rename = "type")]
    pub type_name: String,
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
    #[serde(default)]
    pub rules: Vec<FieldRule>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct FieldSpec {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub kind: FieldSpecKind,
    #[serde(default)]
    pub required: bool,
    // Whether the value may reference a dashboard variable ({{NAME}});
    // `secret` fields are always reference-aware.
    #[serde(default)]
    pub env: bool,
    // Default for checkboxes ("true"/"false") and selects (option value).
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub placeholder: Option<String>,
    // Select options.
    #[serde(default)]
    pub options: Vec<String>,
    // Numeric bounds (inclusive).
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FieldSpecKind {
    #[default]
    Text,
    Secret,
    Bool,
    Integer,
    Number,
    Select,
}

/// Cross-field rule, written in the catalog as a small bag of options —
/// exactly one shape must be set per rule.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct FieldRule {
    // At least one of the listed fields must be set.
    #[serde(default)]
    pub any_of: Option<Vec<String>>,
    // If `if_set` is non-empty, `then_required` must be set too.
    #[serde(default)]
    pub if_set: Option<String>,
    #[serde(default)]
    pub then_required: Option<String>,
}

pub(crate) fn validate_catalog(cat: &WidgetCatalog) -> Result<(), String> {
    use std::collections::HashSet;
    let mut types = HashSet::new();
    for (i, w) in cat.widgets.iter().enumerate() {
        if w.type_name.trim().is_empty() {
            return Err(format!("widget at index {i} has an empty type"));
        }
        if !types.insert(&w.type_name) {
            return Err(format!(
                "duplicate widget type: '{}' at index {}",
                w.type_name, i
            ));
        }
        let mut names = HashSet::new();
        for f in &w.fields {
            if !names.insert(&f.name) {
                return Err(format!(
                    "widget '{}' declares field '{}' twice",
                    w.type_name, f.name
                ));
            }
            if f.kind == FieldSpecKind::Select && f.options.is_empty() {
                return Err(format!(
                    "widget '{}' select field '{}' has no options",
                    w.type_name, f.name
                ));
            }
            if let Some(dflt) = &f.default {
                if f.kind == FieldSpecKind::Select && !f.options.iter().any(|o| o == dflt) {
                    return Err(format!(
                        "widget '{}' field '{}' default '{}' is not among its options",
                        w.type_name, f.name, dflt
                    ));
                }
            }
        }
        for (ri, r) in w.rules.iter().enumerate() {
            let is_any_of = r.any_of.is_some();
            let is_requires = r.if_set.is_some() || r.then_required.is_some();
            if is_any_of == is_requires {
                return Err(format!(
                    "widget '{}' rule {} must set either any_of or if_set/then_required",
                    w.type_name, ri
                ));
            }
            if is_requires && (r.if_set.is_none() || r.then_required.is_none()) {
                return Err(format!(
                    "widget '{}' rule {} needs both if_set and then_required",
                    w.type_name, ri
                ));
            }
            let referenced: Vec<&String> = r
                .any_of
                .iter()
                .flatten()
                .chain(r.if_set.iter())
                .chain(r.then_required.iter())
                .collect();
            for name in referenced {
                if !names.contains(name) {
                    return Err(format!(
                        "widget '{}' rule {} references unknown field '{}'",
                        w.type_name, ri, name
                    ));
                }
            }
        }
    }
    Ok(())
}
