//! The deployment aggregate: a study configuration and everything it owns.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::activation::{ActivationCodeKind, ActivationCodes};
use crate::asset::AssetRef;
use crate::consent::{Consent, EConsent, CONSENT_FIELDS, ECONSENT_FIELDS};
use crate::error::CoreError;
use crate::learn::{Learn, LEARN_FIELDS};
use crate::localizable::{
    entity, entity_list, entity_map, text, Localizable, LocalizableField, LocalizableValue,
    TranslationMap, MAX_ENTITY_NAME_LENGTH,
};
use crate::module_config::{ModuleConfig, MODULE_CONFIG_FIELDS};
use crate::profile::{
    ExtraCustomFields, Features, Profile, EXTRA_CUSTOM_FIELD_FIELDS, FEATURES_FIELDS,
    PROFILE_FIELDS,
};
use crate::types::{new_id, EntityId, Timestamp};

/// Version assigned to a newly created deployment, consent or e-consent.
pub const FIRST_VERSION: i32 = 0;

/// Default deployment language.
pub const DEFAULT_LANGUAGE: &str = "en";

// ---------------------------------------------------------------------------
// Statuses
// ---------------------------------------------------------------------------

/// Lifecycle status of a deployment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeploymentStatus {
    #[default]
    Draft,
    Deployed,
    Archived,
}

impl DeploymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Deployed => "DEPLOYED",
            Self::Archived => "ARCHIVED",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnableStatus {
    #[default]
    Enabled,
    Disabled,
}

// ---------------------------------------------------------------------------
// Owned entities without localizable text of their own (besides key actions)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OnboardingModuleConfig {
    pub id: Option<EntityId>,
    pub onboarding_id: String,
    pub status: EnableStatus,
    pub config_body: serde_json::Value,
    pub order: i32,
    pub version: i32,
    pub user_types: Vec<String>,
}

/// A custom role scoped to one deployment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Role {
    pub id: Option<EntityId>,
    pub name: String,
    pub permissions: Vec<String>,
    pub user_type: Option<String>,
}

/// A reminder or task triggered for participants.
///
/// Points at exactly one of a module config or a learn article of the
/// same deployment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyActionConfig {
    pub id: Option<EntityId>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub action_type: Option<String>,
    pub trigger: Option<String>,
    pub delta_from_trigger_time: Option<String>,
    pub duration_from_trigger: Option<String>,
    pub duration_iso: Option<String>,
    pub number_of_notifications: Option<i32>,
    pub module_id: Option<String>,
    pub module_config_id: Option<EntityId>,
    pub learn_article_id: Option<EntityId>,
}

pub const KEY_ACTION_FIELDS: &[LocalizableField] = &[
    LocalizableField::bounded_text("title", MAX_ENTITY_NAME_LENGTH),
    LocalizableField::text("description"),
];

impl Localizable for KeyActionConfig {
    fn localizable_fields(&self) -> &'static [LocalizableField] {
        KEY_ACTION_FIELDS
    }

    fn localizable_values(&mut self) -> Vec<LocalizableValue<'_>> {
        vec![text(&mut self.title), text(&mut self.description)]
    }
}

impl KeyActionConfig {
    pub fn validate(&self) -> Result<(), CoreError> {
        match (self.module_config_id, self.learn_article_id) {
            (Some(_), None) | (None, Some(_)) => Ok(()),
            _ => Err(CoreError::Validation(
                "Key action must reference exactly one of module_config_id or learn_article_id"
                    .into(),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Deployment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Deployment {
    pub id: Option<EntityId>,
    pub name: String,
    pub description: Option<String>,
    pub status: DeploymentStatus,
    pub color: Option<String>,
    pub icon: Option<AssetRef>,
    pub code: Option<String>,
    pub duration: Option<String>,
    pub language: Option<String>,
    pub version: i32,
    pub user_activation_code: Option<String>,
    pub manager_activation_code: Option<String>,
    pub proxy_activation_code: Option<String>,
    pub consent: Option<Consent>,
    pub econsent: Option<EConsent>,
    pub learn: Option<Learn>,
    pub module_configs: Vec<ModuleConfig>,
    pub onboarding_configs: Vec<OnboardingModuleConfig>,
    pub key_actions: Vec<KeyActionConfig>,
    pub key_actions_enabled: Option<bool>,
    pub roles: Vec<Role>,
    pub profile: Option<Profile>,
    pub features: Option<Features>,
    pub extra_custom_fields: ExtraCustomFields,
    pub enrollment_counter: Option<i64>,
    pub stats: Option<serde_json::Value>,
    /// Locale -> (placeholder key -> text).
    pub localizations: BTreeMap<String, TranslationMap>,
    pub created_at: Option<Timestamp>,
    pub updated_at: Option<Timestamp>,
}

pub const DEPLOYMENT_FIELDS: &[LocalizableField] = &[
    LocalizableField::entity("consent", CONSENT_FIELDS),
    LocalizableField::entity("econsent", ECONSENT_FIELDS),
    LocalizableField::entity_list("module_configs", MODULE_CONFIG_FIELDS),
    LocalizableField::entity("learn", LEARN_FIELDS),
    LocalizableField::entity_map("extra_custom_fields", EXTRA_CUSTOM_FIELD_FIELDS),
    LocalizableField::entity_list("key_actions", KEY_ACTION_FIELDS),
    LocalizableField::entity("profile", PROFILE_FIELDS),
    LocalizableField::entity("features", FEATURES_FIELDS),
];

impl Localizable for Deployment {
    fn localizable_fields(&self) -> &'static [LocalizableField] {
        DEPLOYMENT_FIELDS
    }

    fn localizable_values(&mut self) -> Vec<LocalizableValue<'_>> {
        vec![
            entity(&mut self.consent),
            entity(&mut self.econsent),
            entity_list(&mut self.module_configs),
            entity(&mut self.learn),
            entity_map(&mut self.extra_custom_fields),
            entity_list(&mut self.key_actions),
            entity(&mut self.profile),
            entity(&mut self.features),
        ]
    }
}

impl Deployment {
    /// Reject documents that cannot be stored.
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_entity_name("name", &self.name)?;
        if let Some(description) = &self.description {
            validate_entity_name("description", description)?;
        }
        if let Some(econsent) = &self.econsent {
            econsent.validate()?;
        }
        self.key_actions
            .iter()
            .try_for_each(KeyActionConfig::validate)
    }

    /// Prepare a submitted document for first insertion.
    ///
    /// Mints every missing id, stamps timestamps and resets the version.
    /// Activation codes are assigned by the repository.
    pub fn prepare_new(&mut self, now: Timestamp) -> EntityId {
        let id = new_id();
        self.id = Some(id);
        self.version = FIRST_VERSION;
        self.created_at = Some(now);
        self.updated_at = Some(now);
        self.language.get_or_insert_with(|| DEFAULT_LANGUAGE.to_string());
        self.clear_activation_codes();

        if let Some(consent) = &mut self.consent {
            consent.id.get_or_insert_with(new_id);
            consent.created_at.get_or_insert(now);
        }
        if let Some(econsent) = &mut self.econsent {
            econsent.id.get_or_insert_with(new_id);
            econsent.created_at.get_or_insert(now);
            for section in &mut econsent.sections {
                section.id.get_or_insert_with(new_id);
            }
        }
        if let Some(learn) = &mut self.learn {
            learn.id.get_or_insert_with(new_id);
            for section in &mut learn.sections {
                section.id.get_or_insert_with(new_id);
                section.created_at.get_or_insert(now);
                for article in &mut section.articles {
                    article.id.get_or_insert_with(new_id);
                    article.created_at.get_or_insert(now);
                }
            }
        }
        for config in &mut self.module_configs {
            config.id.get_or_insert_with(new_id);
            config.created_at.get_or_insert(now);
        }
        for config in &mut self.onboarding_configs {
            config.id.get_or_insert_with(new_id);
        }
        for role in &mut self.roles {
            role.id.get_or_insert_with(new_id);
        }
        for action in &mut self.key_actions {
            action.id.get_or_insert_with(new_id);
        }
        id
    }

    pub fn activation_codes(&self) -> Option<ActivationCodes> {
        Some(ActivationCodes {
            user: self.user_activation_code.clone()?,
            manager: self.manager_activation_code.clone()?,
            proxy: self.proxy_activation_code.clone()?,
        })
    }

    pub fn set_activation_codes(&mut self, codes: &ActivationCodes) {
        self.user_activation_code = Some(codes.get(ActivationCodeKind::User).to_string());
        self.manager_activation_code = Some(codes.get(ActivationCodeKind::Manager).to_string());
        self.proxy_activation_code = Some(codes.get(ActivationCodeKind::Proxy).to_string());
    }

    pub fn clear_activation_codes(&mut self) {
        self.user_activation_code = None;
        self.manager_activation_code = None;
        self.proxy_activation_code = None;
    }
}

/// Names and short texts must be non-blank and at most
/// [`MAX_ENTITY_NAME_LENGTH`] characters.
pub fn validate_entity_name(field: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::Validation(format!("{field} must not be empty")));
    }
    let len = value.chars().count();
    if len > MAX_ENTITY_NAME_LENGTH {
        return Err(CoreError::Validation(format!(
            "{field} must be at most {MAX_ENTITY_NAME_LENGTH} characters, got {len}"
        )));
    }
    Ok(())
}
