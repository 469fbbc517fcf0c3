//! Educational content: sections of articles.

use serde::{Deserialize, Serialize};

use crate::asset::AssetRef;
use crate::localizable::{
    entity, entity_list, text, Localizable, LocalizableField, LocalizableValue,
    MAX_ENTITY_NAME_LENGTH,
};
use crate::types::{EntityId, Timestamp};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Learn {
    pub id: Option<EntityId>,
    pub sections: Vec<LearnSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnSection {
    pub id: Option<EntityId>,
    pub title: Option<String>,
    pub order: i32,
    pub articles: Vec<LearnArticle>,
    pub created_at: Option<Timestamp>,
    pub updated_at: Option<Timestamp>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnArticle {
    pub id: Option<EntityId>,
    pub title: Option<String>,
    pub article_type: Option<String>,
    pub order: i32,
    /// Stored thumbnail image.
    pub thumbnail: Option<AssetRef>,
    pub content: Option<ArticleContent>,
    pub created_at: Option<Timestamp>,
    pub updated_at: Option<Timestamp>,
}

/// Body of an article. Video content is either a stored asset or an external URL.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArticleContent {
    pub content_type: Option<String>,
    pub text_details: Option<String>,
    pub url: Option<String>,
    pub video: Option<AssetRef>,
}

pub const ARTICLE_CONTENT_FIELDS: &[LocalizableField] =
    &[LocalizableField::text("text_details")];

pub const LEARN_ARTICLE_FIELDS: &[LocalizableField] = &[
    LocalizableField::bounded_text("title", MAX_ENTITY_NAME_LENGTH),
    LocalizableField::entity("content", ARTICLE_CONTENT_FIELDS),
];

pub const LEARN_SECTION_FIELDS: &[LocalizableField] = &[
    LocalizableField::bounded_text("title", MAX_ENTITY_NAME_LENGTH),
    LocalizableField::entity_list("articles", LEARN_ARTICLE_FIELDS),
];

pub const LEARN_FIELDS: &[LocalizableField] =
    &[LocalizableField::entity_list("sections", LEARN_SECTION_FIELDS)];

impl Localizable for ArticleContent {
    fn localizable_fields(&self) -> &'static [LocalizableField] {
        ARTICLE_CONTENT_FIELDS
    }

    fn localizable_values(&mut self) -> Vec<LocalizableValue<'_>> {
        vec![text(&mut self.text_details)]
    }
}

impl Localizable for LearnArticle {
    fn localizable_fields(&self) -> &'static [LocalizableField] {
        LEARN_ARTICLE_FIELDS
    }

    fn localizable_values(&mut self) -> Vec<LocalizableValue<'_>> {
        vec![text(&mut self.title), entity(&mut self.content)]
    }
}

impl Localizable for LearnSection {
    fn localizable_fields(&self) -> &'static [LocalizableField] {
        LEARN_SECTION_FIELDS
    }

    fn localizable_values(&mut self) -> Vec<LocalizableValue<'_>> {
        vec![text(&mut self.title), entity_list(&mut self.articles)]
    }
}

impl Localizable for Learn {
    fn localizable_fields(&self) -> &'static [LocalizableField] {
        LEARN_FIELDS
    }

    fn localizable_values(&mut self) -> Vec<LocalizableValue<'_>> {
        vec![entity_list(&mut self.sections)]
    }
}

impl Learn {
    /// Ids of every article in every section.
    pub fn article_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.sections
            .iter()
            .flat_map(|section| section.articles.iter())
            .filter_map(|article| article.id)
    }
}
