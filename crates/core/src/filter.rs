use serde::{Deserialize, Serialize};

use crate::item::EffectiveItem;
use crate::status::ReviewStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    #[default]
    All,
    Images,
    Text,
}

/// Stateless list filter over effective items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFilter {
    pub status: Option<ReviewStatus>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub content: ContentKind,
}

impl ItemFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: ReviewStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn search(mut self, query: impl Into<String>) -> Self {
        self.search = Some(query.into());
        self
    }

    pub fn content(mut self, content: ContentKind) -> Self {
        self.content = content;
        self
    }

    pub fn is_active(&self) -> bool {
        self.status.is_some()
            || self.category.as_deref().is_some_and(|c| !c.is_empty())
            || self.search.as_deref().is_some_and(|q| !q.is_empty())
            || self.content != ContentKind::All
    }

    pub fn matches(&self, item: &EffectiveItem) -> bool {
        if let Some(status) = self.status {
            if item.status != status {
                return false;
            }
        }

        match self.content {
            ContentKind::All => {}
            ContentKind::Images if !item.has_media() => return false,
            ContentKind::Text if item.has_media() => return false,
            _ => {}
        }

        if let Some(category) = self.category.as_deref().filter(|c| !c.is_empty()) {
            if item.category.as_deref() != Some(category) {
                return false;
            }
        }

        if let Some(query) = self.search.as_deref().filter(|q| !q.is_empty()) {
            let query = query.to_lowercase();
            let in_title = item.title.to_lowercase().contains(&query);
            let in_description = item
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&query));
            if !in_title && !in_description {
                return false;
            }
        }

        true
    }

    pub fn apply<'a>(&self, items: &'a [EffectiveItem]) -> Vec<&'a EffectiveItem> {
        items.iter().filter(|item| self.matches(item)).collect()
    }
}
