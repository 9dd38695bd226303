use serde::{Deserialize, Serialize};

use crate::clock::Timestamp;
use crate::ids::{ItemId, ReviewId};
use crate::status::ReviewStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub review_id: ReviewId,
    pub item_id: ItemId,
    pub status: ReviewStatus,
    pub updated_at: Timestamp,
}

/// Field overrides for one item. `None` means "use the baseline value";
/// the presence of the record alone marks the item as edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditRecord {
    pub review_id: ReviewId,
    pub item_id: ItemId,
    pub title: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub updated_at: Timestamp,
}

impl EditRecord {
    pub fn from_patch(
        review_id: ReviewId,
        item_id: ItemId,
        patch: EditPatch,
        updated_at: Timestamp,
    ) -> Self {
        Self {
            review_id,
            item_id,
            title: patch.title,
            category: patch.category,
            description: patch.description,
            link: patch.link,
            updated_at,
        }
    }

    /// True when the record carries the same overrides, ignoring timestamps.
    pub fn same_fields(&self, other: &EditRecord) -> bool {
        self.title == other.title
            && self.category == other.category
            && self.description == other.description
            && self.link == other.link
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub review_id: ReviewId,
    pub item_id: ItemId,
    pub comment: String,
    pub updated_at: Timestamp,
}

/// Partial edit submitted by a reviewer. Fields left unset are stored as
/// "no override".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

impl EditPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.category.is_none()
            && self.description.is_none()
            && self.link.is_none()
    }
}

/// Everything persisted for one review id, as returned by a remote query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlaySnapshot {
    pub statuses: Vec<StatusRecord>,
    pub edits: Vec<EditRecord>,
    pub comments: Vec<CommentRecord>,
}

impl OverlaySnapshot {
    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty() && self.edits.is_empty() && self.comments.is_empty()
    }
}
