//! Participant profile settings, app features and custom profile fields.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::localizable::{
    entity, entity_list, text, Localizable, LocalizableField, LocalizableValue,
    MAX_ENTITY_NAME_LENGTH,
};

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub fields: Option<ProfileFields>,
}

/// Which profile fields are collected, and the selectable options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileFields {
    pub given_name: bool,
    pub family_name: bool,
    pub date_of_birth: bool,
    pub gender: bool,
    pub ethnicity: bool,
    pub gender_options: Vec<GenderOption>,
    pub ethnicity_options: Vec<EthnicityOption>,
    pub mandatory_onboarding_fields: Vec<String>,
    pub ordering: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenderOption {
    pub display_name: Option<String>,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EthnicityOption {
    pub display_name: Option<String>,
    pub value: String,
}

const DISPLAY_NAME_FIELDS: &[LocalizableField] =
    &[LocalizableField::bounded_text("display_name", MAX_ENTITY_NAME_LENGTH)];

pub const PROFILE_FIELDS_FIELDS: &[LocalizableField] = &[
    LocalizableField::entity_list("gender_options", DISPLAY_NAME_FIELDS),
    LocalizableField::entity_list("ethnicity_options", DISPLAY_NAME_FIELDS),
];

pub const PROFILE_FIELDS: &[LocalizableField] =
    &[LocalizableField::entity("fields", PROFILE_FIELDS_FIELDS)];

impl Localizable for GenderOption {
    fn localizable_fields(&self) -> &'static [LocalizableField] {
        DISPLAY_NAME_FIELDS
    }

    fn localizable_values(&mut self) -> Vec<LocalizableValue<'_>> {
        vec![text(&mut self.display_name)]
    }
}

impl Localizable for EthnicityOption {
    fn localizable_fields(&self) -> &'static [LocalizableField] {
        DISPLAY_NAME_FIELDS
    }

    fn localizable_values(&mut self) -> Vec<LocalizableValue<'_>> {
        vec![text(&mut self.display_name)]
    }
}

impl Localizable for ProfileFields {
    fn localizable_fields(&self) -> &'static [LocalizableField] {
        PROFILE_FIELDS_FIELDS
    }

    fn localizable_values(&mut self) -> Vec<LocalizableValue<'_>> {
        vec![
            entity_list(&mut self.gender_options),
            entity_list(&mut self.ethnicity_options),
        ]
    }
}

impl Localizable for Profile {
    fn localizable_fields(&self) -> &'static [LocalizableField] {
        PROFILE_FIELDS
    }

    fn localizable_values(&mut self) -> Vec<LocalizableValue<'_>> {
        vec![entity(&mut self.fields)]
    }
}

// ---------------------------------------------------------------------------
// Features
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Features {
    pub appointment: bool,
    pub off_boarding: bool,
    pub proxy: bool,
    pub labels: bool,
    pub messaging: Option<Messaging>,
}

/// Predefined messages clinicians can send to participants.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Messaging {
    pub enabled: bool,
    pub messages: Vec<String>,
    pub allow_custom_message: bool,
}

pub const MESSAGING_FIELDS: &[LocalizableField] = &[LocalizableField::text_list("messages")];

pub const FEATURES_FIELDS: &[LocalizableField] =
    &[LocalizableField::entity("messaging", MESSAGING_FIELDS)];

impl Localizable for Messaging {
    fn localizable_fields(&self) -> &'static [LocalizableField] {
        MESSAGING_FIELDS
    }

    fn localizable_values(&mut self) -> Vec<LocalizableValue<'_>> {
        vec![LocalizableValue::TextList(&mut self.messages)]
    }
}

impl Localizable for Features {
    fn localizable_fields(&self) -> &'static [LocalizableField] {
        FEATURES_FIELDS
    }

    fn localizable_values(&mut self) -> Vec<LocalizableValue<'_>> {
        vec![entity(&mut self.messaging)]
    }
}

// ---------------------------------------------------------------------------
// Extra custom fields
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomFieldType {
    #[default]
    Text,
    Numeric,
}

/// An additional profile field defined by the deployment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtraCustomFieldConfig {
    pub field_type: CustomFieldType,
    pub order: i32,
    pub required: bool,
    pub clinician_update: bool,
    pub validation: Option<String>,
    pub error_message: Option<String>,
    pub onboarding_collection_text: Option<String>,
    pub profile_collection_text: Option<String>,
    pub description: Option<String>,
}

pub const EXTRA_CUSTOM_FIELD_FIELDS: &[LocalizableField] = &[
    LocalizableField::text("error_message"),
    LocalizableField::text("onboarding_collection_text"),
    LocalizableField::text("profile_collection_text"),
    LocalizableField::text("description"),
];

impl Localizable for ExtraCustomFieldConfig {
    fn localizable_fields(&self) -> &'static [LocalizableField] {
        EXTRA_CUSTOM_FIELD_FIELDS
    }

    fn localizable_values(&mut self) -> Vec<LocalizableValue<'_>> {
        vec![
            text(&mut self.error_message),
            text(&mut self.onboarding_collection_text),
            text(&mut self.profile_collection_text),
            text(&mut self.description),
        ]
    }
}

/// Custom profile fields keyed by field name.
pub type ExtraCustomFields = BTreeMap<String, ExtraCustomFieldConfig>;
