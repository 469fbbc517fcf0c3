//! Per-module configuration of a deployment.
//!
//! A module config keys its text under its own `localization_prefix`
//! (`hu_journal`, `hu_symptom`, ...) rather than its position in the
//! deployment, so adding or removing configs never shifts another config's
//! keys. Besides the declared fields, string leaves of `config_body` under
//! [`CONFIG_BODY_TEXT_KEYS`] are extracted too.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::deployment::{EnableStatus, FIRST_VERSION};
use crate::error::CoreError;
use crate::localizable::{
    entity, extract_string, sanitize_placeholder, substitute, text, Localizable,
    LocalizableField, LocalizableValue, TranslationMap, MAX_ENTITY_NAME_LENGTH,
    PLACEHOLDER_PREFIX,
};
use crate::types::{EntityId, Timestamp};

pub const SYMPTOM_MODULE_ID: &str = "Symptom";
pub const QUESTIONNAIRE_MODULE_ID: &str = "Questionnaire";

/// `config_body` object keys whose string values are user-facing text.
pub const CONFIG_BODY_TEXT_KEYS: &[&str] = &[
    "name",
    "text",
    "description",
    "shortText",
    "placeholder",
    "lowerBoundLabel",
    "upperBoundLabel",
    "label",
    "value",
    "errorMessage",
    "trademarkText",
    "buttonText",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleConfig {
    pub id: Option<EntityId>,
    pub module_id: String,
    pub module_name: Option<String>,
    pub short_module_name: Option<String>,
    pub status: EnableStatus,
    pub order: i32,
    pub config_body: serde_json::Value,
    pub about: Option<String>,
    pub footnote: Option<Footnote>,
    /// Articles of the same deployment's learn tree.
    pub learn_article_ids: Vec<EntityId>,
    pub version: i32,
    pub notification_data: Option<NotificationData>,
    /// Symptom modules only.
    pub rag_thresholds: Vec<RagThreshold>,
    /// Set on first extraction and kept afterwards.
    pub localization_prefix: Option<String>,
    pub created_at: Option<Timestamp>,
    pub updated_at: Option<Timestamp>,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            id: None,
            module_id: String::new(),
            module_name: None,
            short_module_name: None,
            status: EnableStatus::default(),
            order: 0,
            config_body: serde_json::Value::Object(Default::default()),
            about: None,
            footnote: None,
            learn_article_ids: Vec::new(),
            version: FIRST_VERSION,
            notification_data: None,
            rag_thresholds: Vec::new(),
            localization_prefix: None,
            created_at: None,
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Footnote {
    pub enabled: bool,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationData {
    pub title: Option<String>,
    pub body: Option<String>,
}

/// Colour band of a symptom reading.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagThreshold {
    #[serde(rename = "type")]
    pub threshold_type: Option<String>,
    pub severity: Option<i32>,
    pub threshold_range: Vec<ThresholdRange>,
    pub color: Option<String>,
    /// Name of a complex symptom in `config_body`; after extraction, the
    /// placeholder key of that name.
    pub field_name: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdRange {
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub exact_value_str: Option<String>,
}

pub const FOOTNOTE_FIELDS: &[LocalizableField] = &[LocalizableField::text("text")];

pub const NOTIFICATION_DATA_FIELDS: &[LocalizableField] = &[
    LocalizableField::bounded_text("body", MAX_ENTITY_NAME_LENGTH),
    LocalizableField::bounded_text("title", MAX_ENTITY_NAME_LENGTH),
];

pub const MODULE_CONFIG_FIELDS: &[LocalizableField] = &[
    LocalizableField::text("about"),
    LocalizableField::entity("footnote", FOOTNOTE_FIELDS),
    LocalizableField::entity("notification_data", NOTIFICATION_DATA_FIELDS),
];

/// Symptom modules carry no translatable footnote.
pub const SYMPTOM_MODULE_CONFIG_FIELDS: &[LocalizableField] = &[
    LocalizableField::text("about"),
    LocalizableField::entity("notification_data", NOTIFICATION_DATA_FIELDS),
];

impl Localizable for Footnote {
    fn localizable_fields(&self) -> &'static [LocalizableField] {
        FOOTNOTE_FIELDS
    }

    fn localizable_values(&mut self) -> Vec<LocalizableValue<'_>> {
        vec![text(&mut self.text)]
    }
}

impl Localizable for NotificationData {
    fn localizable_fields(&self) -> &'static [LocalizableField] {
        NOTIFICATION_DATA_FIELDS
    }

    fn localizable_values(&mut self) -> Vec<LocalizableValue<'_>> {
        vec![text(&mut self.body), text(&mut self.title)]
    }
}

impl ModuleConfig {
    pub fn is_symptom(&self) -> bool {
        self.module_id == SYMPTOM_MODULE_ID
    }

    /// Prefix for this config's keys: `hu_{module}`, or for questionnaires
    /// `hu_{module_name}`, falling back to `{path}_questionnaire` when unnamed.
    fn default_localization_prefix(&self, path: &str) -> String {
        let module = self.module_id.to_lowercase();
        let raw = if module.is_empty() {
            format!("{path}_module")
        } else if self.module_id == QUESTIONNAIRE_MODULE_ID {
            match self.module_name.as_deref().filter(|name| !name.is_empty()) {
                Some(name) => format!("{PLACEHOLDER_PREFIX}{}", name.to_lowercase()),
                None => format!("{path}_{module}"),
            }
        } else {
            format!("{PLACEHOLDER_PREFIX}{module}")
        };
        sanitize_placeholder(&raw)
    }

    /// Point each rag threshold at the key its complex symptom name was
    /// extracted under. Names with no matching key are left as they are.
    fn link_rag_thresholds(&mut self, prefix: &str, translations: &TranslationMap) {
        let symptoms = format!("{prefix}_complexSymptoms");
        for threshold in &mut self.rag_thresholds {
            if threshold.field_name.is_empty()
                || threshold.field_name.starts_with(PLACEHOLDER_PREFIX)
            {
                continue;
            }
            let key = translations.iter().find_map(|(key, value)| {
                (key.starts_with(&symptoms)
                    && key.ends_with("_name")
                    && *value == threshold.field_name)
                    .then(|| key.clone())
            });
            if let Some(key) = key {
                threshold.field_name = key;
            }
        }
    }
}

impl Localizable for ModuleConfig {
    fn localizable_fields(&self) -> &'static [LocalizableField] {
        if self.is_symptom() {
            SYMPTOM_MODULE_CONFIG_FIELDS
        } else {
            MODULE_CONFIG_FIELDS
        }
    }

    fn localizable_values(&mut self) -> Vec<LocalizableValue<'_>> {
        if self.is_symptom() {
            return vec![text(&mut self.about), entity(&mut self.notification_data)];
        }
        vec![
            text(&mut self.about),
            entity(&mut self.footnote),
            entity(&mut self.notification_data),
        ]
    }

    fn extract_custom(
        &mut self,
        path: &str,
        translations: &mut TranslationMap,
    ) -> Result<Option<String>, CoreError> {
        let prefix = match self.localization_prefix.as_deref() {
            Some(prefix) if !prefix.is_empty() => prefix.to_string(),
            _ => self.default_localization_prefix(path),
        };
        self.localization_prefix = Some(prefix.clone());

        extract_config_body(&mut self.config_body, &prefix, translations)?;
        if self.is_symptom() {
            self.link_rag_thresholds(&prefix, translations);
        }
        Ok(Some(prefix))
    }

    fn apply_custom(&mut self, table: &TranslationMap) {
        apply_config_body(&mut self.config_body, "", table);
        for threshold in &mut self.rag_thresholds {
            substitute(&mut threshold.field_name, table);
        }
    }
}

/// `value` is only text inside autocomplete options and symptom scales.
fn is_text_key(key: &str, path: &str) -> bool {
    CONFIG_BODY_TEXT_KEYS.contains(&key)
        && (key != "value" || path.contains("autocomplete") || path.contains("scale"))
}

fn extract_config_body(
    body: &mut Value,
    path: &str,
    translations: &mut TranslationMap,
) -> Result<(), CoreError> {
    let Value::Object(map) = body else {
        return Ok(());
    };
    for (key, child) in map.iter_mut() {
        let child_path = format!("{path}_{key}");
        if let Value::Array(items) = child {
            for (index, item) in items.iter_mut().enumerate() {
                extract_config_body(item, &format!("{child_path}_{index}"), translations)?;
            }
        } else if child.is_object() {
            extract_config_body(child, &child_path, translations)?;
        } else if let Value::String(slot) = child {
            if !slot.is_empty() && is_text_key(key, path) {
                extract_string(slot, &child_path, None, translations)?;
            }
        }
    }
    Ok(())
}

fn apply_config_body(body: &mut Value, path: &str, table: &TranslationMap) {
    let Value::Object(map) = body else {
        return;
    };
    for (key, child) in map.iter_mut() {
        let child_path = format!("{path}_{key}");
        if let Value::Array(items) = child {
            for item in items.iter_mut() {
                apply_config_body(item, &child_path, table);
            }
        } else if child.is_object() {
            apply_config_body(child, &child_path, table);
        } else if let Value::String(slot) = child {
            if is_text_key(key, path) {
                substitute(slot, table);
            }
        }
    }
}
