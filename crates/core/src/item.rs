use serde::{Deserialize, Serialize};

use crate::clock::Timestamp;
use crate::ids::ItemId;
use crate::status::ReviewStatus;

/// Baseline catalog entry. Never mutated after the catalog is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: ItemId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
}

impl ContentItem {
    pub fn new(id: impl Into<ItemId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            category: None,
            description: None,
            link: None,
            media: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn with_media(mut self, media: impl Into<String>) -> Self {
        self.media = Some(media.into());
        self
    }
}

/// Baseline item with every overlay applied. Derived on demand, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveItem {
    pub id: ItemId,
    pub title: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub media: Option<String>,
    pub status: ReviewStatus,
    pub is_edited: bool,
    pub comment: String,
    pub status_updated_at: Option<Timestamp>,
    pub edit_updated_at: Option<Timestamp>,
    pub comment_updated_at: Option<Timestamp>,
}

impl EffectiveItem {
    pub fn has_media(&self) -> bool {
        self.media.as_deref().is_some_and(|m| !m.is_empty())
    }

    pub fn has_comment(&self) -> bool {
        !self.comment.is_empty()
    }
}
