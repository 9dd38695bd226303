use std::collections::HashMap;

use crate::clock::Timestamp;
use crate::ids::ItemId;
use crate::item::{ContentItem, EffectiveItem};
use crate::records::{CommentRecord, EditRecord, StatusRecord};
use crate::status::ReviewStatus;

/// Produce the effective view of every baseline item, in baseline order.
///
/// Each overlay collection is indexed by item id first, so the whole merge
/// stays linear in catalog size. When a collection holds more than one
/// record for an id, the most recent `updated_at` wins (later element on a
/// tie).
pub fn merge(
    baseline: &[ContentItem],
    statuses: &[StatusRecord],
    edits: &[EditRecord],
    comments: &[CommentRecord],
) -> Vec<EffectiveItem> {
    let status_map = latest_by_item(statuses, |r| (&r.item_id, r.updated_at));
    let edit_map = latest_by_item(edits, |r| (&r.item_id, r.updated_at));
    let comment_map = latest_by_item(comments, |r| (&r.item_id, r.updated_at));

    baseline
        .iter()
        .map(|item| {
            merge_item(
                item,
                status_map.get(&item.id).copied(),
                edit_map.get(&item.id).copied(),
                comment_map.get(&item.id).copied(),
            )
        })
        .collect()
}

/// Overlay a single baseline item.
pub fn merge_item(
    item: &ContentItem,
    status: Option<&StatusRecord>,
    edit: Option<&EditRecord>,
    comment: Option<&CommentRecord>,
) -> EffectiveItem {
    let mut effective = EffectiveItem {
        id: item.id.clone(),
        title: item.title.clone(),
        category: item.category.clone(),
        description: item.description.clone(),
        link: item.link.clone(),
        media: item.media.clone(),
        status: status.map_or(ReviewStatus::Unreviewed, |r| r.status),
        is_edited: edit.is_some(),
        comment: comment.map(|r| r.comment.clone()).unwrap_or_default(),
        status_updated_at: status.map(|r| r.updated_at),
        edit_updated_at: edit.map(|r| r.updated_at),
        comment_updated_at: comment.map(|r| r.updated_at),
    };

    if let Some(edit) = edit {
        if let Some(title) = &edit.title {
            effective.title = title.clone();
        }
        if let Some(category) = &edit.category {
            effective.category = Some(category.clone());
        }
        if let Some(description) = &edit.description {
            effective.description = Some(description.clone());
        }
        if let Some(link) = &edit.link {
            effective.link = Some(link.clone());
        }
    }

    effective
}

fn latest_by_item<'a, R>(
    records: &'a [R],
    key: impl Fn(&'a R) -> (&'a ItemId, Timestamp),
) -> HashMap<&'a ItemId, &'a R> {
    let mut map: HashMap<&'a ItemId, (&'a R, Timestamp)> = HashMap::with_capacity(records.len());
    for record in records {
        let (item_id, updated_at) = key(record);
        let newer = map
            .get(item_id)
            .is_none_or(|(_, existing)| *existing <= updated_at);
        if newer {
            map.insert(item_id, (record, updated_at));
        }
    }
    map.into_iter().map(|(id, (record, _))| (id, record)).collect()
}
