use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::error::CoreError;
use crate::ids::ItemId;
use crate::item::ContentItem;

/// Immutable baseline list of content items, in canonical display order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: Vec<ContentItem>,
    index: BTreeMap<ItemId, usize>,
}

impl Catalog {
    pub fn new(items: Vec<ContentItem>) -> Result<Self, CoreError> {
        let mut index = BTreeMap::new();
        for (position, item) in items.iter().enumerate() {
            if index.insert(item.id.clone(), position).is_some() {
                return Err(CoreError::DuplicateItem(item.id.to_string()));
            }
        }
        Ok(Self { items, index })
    }

    /// Parse a catalog document: a JSON array of content items.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let items: Vec<ContentItem> = serde_json::from_str(json)?;
        Self::new(items)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn items(&self) -> &[ContentItem] {
        &self.items
    }

    pub fn get(&self, item_id: &ItemId) -> Option<&ContentItem> {
        self.index.get(item_id).map(|&position| &self.items[position])
    }

    pub fn contains(&self, item_id: &ItemId) -> bool {
        self.index.contains_key(item_id)
    }

    pub fn position(&self, item_id: &ItemId) -> Option<usize> {
        self.index.get(item_id).copied()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Distinct non-empty baseline categories, in first-seen order.
    pub fn categories(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.items
            .iter()
            .filter_map(|item| item.category.as_deref())
            .filter(|category| !category.is_empty())
            .filter(|category| seen.insert(*category))
            .map(str::to_string)
            .collect()
    }
}
