//! Localizable text fields and the tree walks over them.
//!
//! Every entity type that carries human-readable text implements
//! [`Localizable`]: a static declaration of its text-bearing fields
//! ([`LocalizableField`]) plus mutable access to the current values
//! ([`LocalizableValue`]). Three walks are built on top of it:
//!
//! - [`collect_localized_paths`] -- read-only, shape-only listing of dotted paths.
//! - [`LocalizationExtractor`] -- moves literal text into a translation table and
//!   leaves `hu_` placeholder keys behind.
//! - [`apply_translations`] -- the inverse, substituting placeholders from a table.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Reserved prefix marking a string as a translation key rather than text.
pub const PLACEHOLDER_PREFIX: &str = "hu_";

/// Root path used when generating the master translation of a deployment.
pub const MASTER_TRANSLATION_ROOT: &str = "hu";

/// Maximum length of entity-name style text fields.
pub const MAX_ENTITY_NAME_LENGTH: usize = 255;

static NON_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\W+").expect("valid regex"));

/// Placeholder key -> source text, for one language.
pub type TranslationMap = BTreeMap<String, String>;

// ---------------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------------

/// What a localizable field holds.
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    /// A single string.
    Text { max_len: Option<usize> },
    /// A list of plain strings.
    TextList { max_len: Option<usize> },
    /// A nested localizable entity.
    Entity(&'static [LocalizableField]),
    /// A list of nested localizable entities.
    EntityList(&'static [LocalizableField]),
    /// A string-keyed map whose values are localizable entities.
    EntityMap(&'static [LocalizableField]),
}

/// Static declaration of one text-bearing field of an entity type.
#[derive(Debug, Clone, Copy)]
pub struct LocalizableField {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl LocalizableField {
    pub const fn text(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Text { max_len: None },
        }
    }

    pub const fn bounded_text(name: &'static str, max_len: usize) -> Self {
        Self {
            name,
            kind: FieldKind::Text {
                max_len: Some(max_len),
            },
        }
    }

    pub const fn text_list(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::TextList { max_len: None },
        }
    }

    pub const fn entity(name: &'static str, fields: &'static [LocalizableField]) -> Self {
        Self {
            name,
            kind: FieldKind::Entity(fields),
        }
    }

    pub const fn entity_list(name: &'static str, fields: &'static [LocalizableField]) -> Self {
        Self {
            name,
            kind: FieldKind::EntityList(fields),
        }
    }

    pub const fn entity_map(name: &'static str, fields: &'static [LocalizableField]) -> Self {
        Self {
            name,
            kind: FieldKind::EntityMap(fields),
        }
    }
}

/// Mutable view of one declared field's current value.
pub enum LocalizableValue<'a> {
    /// The field is unset; nothing to visit.
    Absent,
    Text(&'a mut String),
    TextList(&'a mut Vec<String>),
    Entity(&'a mut dyn Localizable),
    EntityList(Vec<&'a mut dyn Localizable>),
    EntityMap(Vec<(&'a str, &'a mut dyn Localizable)>),
}

/// An entity type that carries human-readable text.
///
/// `localizable_values` must yield exactly one value per declared field, in
/// declaration order.
pub trait Localizable {
    fn localizable_fields(&self) -> &'static [LocalizableField];

    fn localizable_values(&mut self) -> Vec<LocalizableValue<'_>>;

    /// Extract text that does not fit a static declaration, such as free-form
    /// JSON, before the declared fields are visited.
    ///
    /// Returns the key prefix for the declared fields when the entity keys its
    /// text under its own prefix instead of `path`.
    fn extract_custom(
        &mut self,
        _path: &str,
        _translations: &mut TranslationMap,
    ) -> Result<Option<String>, CoreError> {
        Ok(None)
    }

    /// Inverse of [`Localizable::extract_custom`].
    fn apply_custom(&mut self, _table: &TranslationMap) {}
}

// ---------------------------------------------------------------------------
// Value helpers for `Localizable` impls
// ---------------------------------------------------------------------------

pub fn text(slot: &mut Option<String>) -> LocalizableValue<'_> {
    match slot {
        Some(value) => LocalizableValue::Text(value),
        None => LocalizableValue::Absent,
    }
}

pub fn entity<T: Localizable>(slot: &mut Option<T>) -> LocalizableValue<'_> {
    match slot {
        Some(value) => LocalizableValue::Entity(value),
        None => LocalizableValue::Absent,
    }
}

pub fn entity_list<T: Localizable>(items: &mut [T]) -> LocalizableValue<'_> {
    LocalizableValue::EntityList(
        items
            .iter_mut()
            .map(|item| item as &mut dyn Localizable)
            .collect(),
    )
}

pub fn entity_map<T: Localizable>(map: &mut BTreeMap<String, T>) -> LocalizableValue<'_> {
    LocalizableValue::EntityMap(
        map.iter_mut()
            .map(|(key, value)| (key.as_str(), value as &mut dyn Localizable))
            .collect(),
    )
}

// ---------------------------------------------------------------------------
// Path collection
// ---------------------------------------------------------------------------

/// List the dotted path of every localizable leaf reachable from `root`.
///
/// Paths are field-shaped: a list of nested entities contributes one
/// `prefix.field.child` template regardless of its length, and the result
/// depends only on the type of `root`, never on its data.
pub fn collect_localized_paths(root: &dyn Localizable, prefix: &str) -> BTreeSet<String> {
    let mut paths = BTreeSet::new();
    collect_fields(root.localizable_fields(), prefix, &mut paths);
    paths
}

fn collect_fields(fields: &[LocalizableField], path: &str, paths: &mut BTreeSet<String>) {
    for field in fields {
        let field_path = format!("{path}.{}", field.name);
        match field.kind {
            FieldKind::Text { .. } | FieldKind::TextList { .. } => {
                paths.insert(field_path);
            }
            FieldKind::Entity(nested)
            | FieldKind::EntityList(nested)
            | FieldKind::EntityMap(nested) => collect_fields(nested, &field_path, paths),
        }
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Collapse every run of non-word characters into a single `_`.
pub fn sanitize_placeholder(raw: &str) -> String {
    NON_WORD_RE.replace_all(raw, "_").into_owned()
}

/// Result of a successful extraction: the rewritten tree and the completed table.
#[derive(Debug, Clone)]
pub struct Extraction<T> {
    pub tree: T,
    pub translations: TranslationMap,
}

/// Replaces literal text with placeholder keys, collecting the text into a
/// translation table for one language.
#[derive(Debug, Clone)]
pub struct LocalizationExtractor {
    root_path: String,
}

impl Default for LocalizationExtractor {
    fn default() -> Self {
        Self::new(MASTER_TRANSLATION_ROOT)
    }
}

impl LocalizationExtractor {
    pub fn new(root_path: impl Into<String>) -> Self {
        Self {
            root_path: root_path.into(),
        }
    }

    /// Extract text from a copy of `root`, seeding the table with `existing`.
    ///
    /// Neither input is modified; on error nothing of the partial rewrite
    /// escapes. Existing table entries for `hu_` keys are never overwritten.
    pub fn extract<T>(&self, root: &T, existing: &TranslationMap) -> Result<Extraction<T>, CoreError>
    where
        T: Localizable + Clone,
    {
        let mut tree = root.clone();
        let mut translations = existing.clone();
        extract_entity(&mut tree, &self.root_path, &mut translations)?;
        Ok(Extraction { tree, translations })
    }
}

fn extract_entity(
    entity: &mut dyn Localizable,
    path: &str,
    translations: &mut TranslationMap,
) -> Result<(), CoreError> {
    let own_path = entity
        .extract_custom(path, translations)?
        .unwrap_or_else(|| path.to_string());
    let path = own_path.as_str();

    let fields = entity.localizable_fields();
    let values = entity.localizable_values();
    if fields.len() != values.len() {
        return Err(CoreError::Internal(format!(
            "Localizable declaration at '{path}' has {} fields but {} values",
            fields.len(),
            values.len()
        )));
    }

    for (field, value) in fields.iter().zip(values) {
        let name = field.name;
        match (field.kind, value) {
            (_, LocalizableValue::Absent) => {}
            (FieldKind::Text { max_len }, LocalizableValue::Text(slot)) => {
                if slot.is_empty() {
                    continue;
                }
                extract_string(slot, &format!("{path}_{name}"), max_len, translations)?;
            }
            (FieldKind::TextList { max_len }, LocalizableValue::TextList(items)) => {
                for (index, item) in items.iter_mut().enumerate() {
                    if item.is_empty() {
                        continue;
                    }
                    extract_string(item, &format!("{path}_{name}_{index}"), max_len, translations)?;
                }
            }
            (FieldKind::Entity(_), LocalizableValue::Entity(nested)) => {
                extract_entity(nested, &format!("{path}_{name}"), translations)?;
            }
            (FieldKind::EntityList(_), LocalizableValue::EntityList(items)) => {
                for (index, item) in items.into_iter().enumerate() {
                    extract_entity(item, &format!("{path}_{name}_{index}"), translations)?;
                }
            }
            (FieldKind::EntityMap(_), LocalizableValue::EntityMap(entries)) => {
                for (key, item) in entries {
                    extract_entity(item, &format!("{path}_{name}_{key}"), translations)?;
                }
            }
            _ => {
                return Err(CoreError::Internal(format!(
                    "Localizable value for '{path}.{name}' does not match its declaration"
                )));
            }
        }
    }
    Ok(())
}

/// Extract a single non-empty string stored at `slot`.
///
/// An existing table entry is never replaced. When the key derived from
/// `raw_key` already holds different text, the first free `_2`, `_3`, ...
/// suffix is used instead.
pub(crate) fn extract_string(
    slot: &mut String,
    raw_key: &str,
    max_len: Option<usize>,
    translations: &mut TranslationMap,
) -> Result<(), CoreError> {
    if slot.starts_with(PLACEHOLDER_PREFIX) {
        translations.entry(slot.clone()).or_default();
        return Ok(());
    }

    let placeholder = free_key(&sanitize_placeholder(raw_key), slot, translations);
    if let Some(max_len) = max_len {
        if placeholder.chars().count() > max_len {
            return Err(CoreError::Validation(format!(
                "Generated translation key '{placeholder}' exceeds the field limit of {max_len} characters"
            )));
        }
    }

    let original = std::mem::replace(slot, placeholder.clone());
    translations.insert(placeholder, original);
    Ok(())
}

/// First key starting at `base` that is unused or already maps to `text`.
fn free_key(base: &str, text: &str, translations: &TranslationMap) -> String {
    let is_free = |key: &str| translations.get(key).is_none_or(|existing| existing == text);
    if is_free(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{base}_{n}"))
        .find(|key| is_free(key))
        .unwrap_or_else(|| base.to_string())
}

// ---------------------------------------------------------------------------
// Substitution
// ---------------------------------------------------------------------------

/// Replace every placeholder found in `table` with its (non-empty) text.
///
/// Strings that are not keys of `table` are left as they are.
pub fn apply_translations(entity: &mut dyn Localizable, table: &TranslationMap) {
    entity.apply_custom(table);
    for value in entity.localizable_values() {
        match value {
            LocalizableValue::Absent => {}
            LocalizableValue::Text(slot) => substitute(slot, table),
            LocalizableValue::TextList(items) => {
                for item in items.iter_mut() {
                    substitute(item, table);
                }
            }
            LocalizableValue::Entity(nested) => apply_translations(nested, table),
            LocalizableValue::EntityList(items) => {
                for item in items {
                    apply_translations(item, table);
                }
            }
            LocalizableValue::EntityMap(entries) => {
                for (_, item) in entries {
                    apply_translations(item, table);
                }
            }
        }
    }
}

pub(crate) fn substitute(slot: &mut String, table: &TranslationMap) {
    if let Some(text) = table.get(slot.as_str()) {
        if !text.is_empty() {
            *slot = text.clone();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
