//! Consent and e-consent sub-aggregates.

use serde::{Deserialize, Serialize};

use crate::asset::AssetRef;
use crate::deployment::{EnableStatus, FIRST_VERSION};
use crate::error::CoreError;
use crate::localizable::{
    entity_list, text, Localizable, LocalizableField, LocalizableValue, MAX_ENTITY_NAME_LENGTH,
};
use crate::types::{EntityId, Timestamp};

// ---------------------------------------------------------------------------
// Consent
// ---------------------------------------------------------------------------

/// Paper-style consent shown before enrollment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Consent {
    pub id: Option<EntityId>,
    /// Bumped on every publish.
    pub revision: i32,
    pub enabled: EnableStatus,
    pub institute_name: Option<String>,
    pub institute_full_name: Option<String>,
    pub institute_text: Option<String>,
    pub sections: Vec<ConsentSection>,
    pub created_at: Option<Timestamp>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsentSection {
    pub section_type: String,
    pub title: Option<String>,
    pub details: Option<String>,
    pub review_details: Option<String>,
}

pub const CONSENT_SECTION_FIELDS: &[LocalizableField] = &[
    LocalizableField::bounded_text("title", MAX_ENTITY_NAME_LENGTH),
    LocalizableField::text("details"),
    LocalizableField::text("review_details"),
];

pub const CONSENT_FIELDS: &[LocalizableField] = &[
    LocalizableField::text("institute_text"),
    LocalizableField::entity_list("sections", CONSENT_SECTION_FIELDS),
];

impl Localizable for ConsentSection {
    fn localizable_fields(&self) -> &'static [LocalizableField] {
        CONSENT_SECTION_FIELDS
    }

    fn localizable_values(&mut self) -> Vec<LocalizableValue<'_>> {
        vec![
            text(&mut self.title),
            text(&mut self.details),
            text(&mut self.review_details),
        ]
    }
}

impl Localizable for Consent {
    fn localizable_fields(&self) -> &'static [LocalizableField] {
        CONSENT_FIELDS
    }

    fn localizable_values(&mut self) -> Vec<LocalizableValue<'_>> {
        vec![
            text(&mut self.institute_text),
            entity_list(&mut self.sections),
        ]
    }
}

impl Consent {
    /// Reset identity and revision for a freshly created copy.
    pub fn reset_for_copy(&mut self, id: EntityId, now: Timestamp) {
        self.id = Some(id);
        self.revision = FIRST_VERSION;
        self.created_at = Some(now);
    }
}

// ---------------------------------------------------------------------------
// EConsent
// ---------------------------------------------------------------------------

/// Media kind of an e-consent section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentType {
    #[default]
    Image,
    Video,
}

/// Interactive consent with media-backed sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EConsent {
    pub id: Option<EntityId>,
    pub revision: i32,
    pub enabled: EnableStatus,
    pub title: Option<String>,
    pub overview_text: Option<String>,
    pub contact_text: Option<String>,
    pub sections: Vec<EConsentSection>,
    pub created_at: Option<Timestamp>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EConsentSection {
    pub id: Option<EntityId>,
    pub section_type: String,
    pub content_type: ContentType,
    pub title: Option<String>,
    pub details: Option<String>,
    pub review_details: Option<String>,
    pub thumbnail_url: Option<String>,
    pub thumbnail_location: Option<AssetRef>,
    pub video_url: Option<String>,
    pub video_location: Option<AssetRef>,
}

pub const ECONSENT_SECTION_FIELDS: &[LocalizableField] = &[
    LocalizableField::bounded_text("title", MAX_ENTITY_NAME_LENGTH),
    LocalizableField::text("details"),
    LocalizableField::text("review_details"),
];

pub const ECONSENT_FIELDS: &[LocalizableField] = &[
    LocalizableField::bounded_text("title", MAX_ENTITY_NAME_LENGTH),
    LocalizableField::text("overview_text"),
    LocalizableField::text("contact_text"),
    LocalizableField::entity_list("sections", ECONSENT_SECTION_FIELDS),
];

impl Localizable for EConsentSection {
    fn localizable_fields(&self) -> &'static [LocalizableField] {
        ECONSENT_SECTION_FIELDS
    }

    fn localizable_values(&mut self) -> Vec<LocalizableValue<'_>> {
        vec![
            text(&mut self.title),
            text(&mut self.details),
            text(&mut self.review_details),
        ]
    }
}

impl Localizable for EConsent {
    fn localizable_fields(&self) -> &'static [LocalizableField] {
        ECONSENT_FIELDS
    }

    fn localizable_values(&mut self) -> Vec<LocalizableValue<'_>> {
        vec![
            text(&mut self.title),
            text(&mut self.overview_text),
            text(&mut self.contact_text),
            entity_list(&mut self.sections),
        ]
    }
}

impl EConsentSection {
    /// Check that the section's media is set through exactly one source.
    ///
    /// Image sections use `thumbnail_url` or `thumbnail_location`; video
    /// sections use `video_url` or `video_location` and may carry a thumbnail
    /// from either source, but not both.
    pub fn validate(&self) -> Result<(), CoreError> {
        let section = self.title.as_deref().unwrap_or(&self.section_type);
        let thumbnail_sources =
            self.thumbnail_url.is_some() as u8 + self.thumbnail_location.is_some() as u8;
        let video_sources = self.video_url.is_some() as u8 + self.video_location.is_some() as u8;

        if thumbnail_sources > 1 {
            return Err(CoreError::Validation(format!(
                "EConsent section '{section}' sets both thumbnail_url and thumbnail_location"
            )));
        }
        match self.content_type {
            ContentType::Image => {
                if thumbnail_sources == 0 {
                    return Err(CoreError::Validation(format!(
                        "Image section '{section}' requires thumbnail_url or thumbnail_location"
                    )));
                }
                if video_sources > 0 {
                    return Err(CoreError::Validation(format!(
                        "Image section '{section}' must not reference a video"
                    )));
                }
            }
            ContentType::Video => {
                if video_sources != 1 {
                    return Err(CoreError::Validation(format!(
                        "Video section '{section}' requires exactly one of video_url or video_location"
                    )));
                }
            }
        }
        Ok(())
    }
}

impl EConsent {
    pub fn validate(&self) -> Result<(), CoreError> {
        self.sections.iter().try_for_each(EConsentSection::validate)
    }

    pub fn reset_for_copy(&mut self, id: EntityId, now: Timestamp) {
        self.id = Some(id);
        self.revision = FIRST_VERSION;
        self.created_at = Some(now);
    }
}
