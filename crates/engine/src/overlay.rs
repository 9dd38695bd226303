use std::collections::BTreeMap;

use curate_core::{
    CommentRecord, EditRecord, ItemId, OverlaySnapshot, ReviewId, StatusRecord, Timestamp,
};

/// A record plus the overlay revision that wrote it. Revisions are unique
/// across the store and strictly increasing, so a pending call can tell
/// whether the live record is still the one it wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    pub record: T,
    pub revision: u64,
}

/// Local status, edit and comment overlays for one review id, each keyed
/// by item id.
///
/// Readable by anyone; mutated only by the sync controller.
#[derive(Debug)]
pub struct OverlayStore {
    review_id: ReviewId,
    statuses: BTreeMap<ItemId, Versioned<StatusRecord>>,
    edits: BTreeMap<ItemId, Versioned<EditRecord>>,
    comments: BTreeMap<ItemId, Versioned<CommentRecord>>,
    next_revision: u64,
}

impl OverlayStore {
    pub fn new(review_id: ReviewId) -> Self {
        Self {
            review_id,
            statuses: BTreeMap::new(),
            edits: BTreeMap::new(),
            comments: BTreeMap::new(),
            next_revision: 1,
        }
    }

    pub fn review_id(&self) -> &ReviewId {
        &self.review_id
    }

    pub fn status(&self, item_id: &ItemId) -> Option<&StatusRecord> {
        self.statuses.get(item_id).map(|v| &v.record)
    }

    pub fn edit(&self, item_id: &ItemId) -> Option<&EditRecord> {
        self.edits.get(item_id).map(|v| &v.record)
    }

    pub fn comment(&self, item_id: &ItemId) -> Option<&CommentRecord> {
        self.comments.get(item_id).map(|v| &v.record)
    }

    pub fn status_revision(&self, item_id: &ItemId) -> Option<u64> {
        self.statuses.get(item_id).map(|v| v.revision)
    }

    /// Clone the current records into merge-ready lists.
    pub fn snapshot(&self) -> OverlaySnapshot {
        OverlaySnapshot {
            statuses: self.statuses.values().map(|v| v.record.clone()).collect(),
            edits: self.edits.values().map(|v| v.record.clone()).collect(),
            comments: self.comments.values().map(|v| v.record.clone()).collect(),
        }
    }

    fn bump(&mut self) -> u64 {
        let revision = self.next_revision;
        self.next_revision += 1;
        revision
    }

    /// Replace the overlay with a remote snapshot. Records for another
    /// review id are dropped; duplicates for one item keep the latest.
    pub(crate) fn load(&mut self, snapshot: OverlaySnapshot) {
        self.statuses.clear();
        self.edits.clear();
        self.comments.clear();

        let mut foreign = 0usize;
        for record in snapshot.statuses {
            if record.review_id != self.review_id {
                foreign += 1;
                continue;
            }
            if is_newer(self.status(&record.item_id).map(|r| r.updated_at), record.updated_at) {
                let revision = self.bump();
                self.statuses
                    .insert(record.item_id.clone(), Versioned { record, revision });
            }
        }
        for record in snapshot.edits {
            if record.review_id != self.review_id {
                foreign += 1;
                continue;
            }
            if is_newer(self.edit(&record.item_id).map(|r| r.updated_at), record.updated_at) {
                let revision = self.bump();
                self.edits
                    .insert(record.item_id.clone(), Versioned { record, revision });
            }
        }
        for record in snapshot.comments {
            if record.review_id != self.review_id {
                foreign += 1;
                continue;
            }
            if is_newer(self.comment(&record.item_id).map(|r| r.updated_at), record.updated_at) {
                let revision = self.bump();
                self.comments
                    .insert(record.item_id.clone(), Versioned { record, revision });
            }
        }

        if foreign > 0 {
            tracing::warn!(review = %self.review_id, foreign, "ignored overlay records for another review");
        }
    }

    pub(crate) fn put_status(&mut self, record: StatusRecord) -> u64 {
        let revision = self.bump();
        self.statuses
            .insert(record.item_id.clone(), Versioned { record, revision });
        revision
    }

    /// Put back the last confirmed record after a failed write, or clear
    /// the status when nothing was ever confirmed.
    pub(crate) fn restore_status(&mut self, item_id: &ItemId, previous: Option<StatusRecord>) {
        match previous {
            Some(record) => {
                self.put_status(record);
            }
            None => {
                self.statuses.remove(item_id);
            }
        }
    }

    pub(crate) fn put_edit(&mut self, record: EditRecord) -> u64 {
        let revision = self.bump();
        self.edits
            .insert(record.item_id.clone(), Versioned { record, revision });
        revision
    }

    pub(crate) fn remove_edit(&mut self, item_id: &ItemId) -> Option<EditRecord> {
        self.edits.remove(item_id).map(|v| v.record)
    }

    pub(crate) fn put_comment(&mut self, record: CommentRecord) -> u64 {
        let revision = self.bump();
        self.comments
            .insert(record.item_id.clone(), Versioned { record, revision });
        revision
    }

    /// Adopt the store's timestamp, but only if the record written at
    /// `revision` is still live. Returns whether anything changed.
    pub(crate) fn reconcile_status(&mut self, item_id: &ItemId, revision: u64, updated_at: Timestamp) -> bool {
        match self.statuses.get_mut(item_id) {
            Some(versioned) if versioned.revision == revision => {
                versioned.record.updated_at = updated_at;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn reconcile_edit(&mut self, item_id: &ItemId, revision: u64, updated_at: Timestamp) -> bool {
        match self.edits.get_mut(item_id) {
            Some(versioned) if versioned.revision == revision => {
                versioned.record.updated_at = updated_at;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn reconcile_comment(&mut self, item_id: &ItemId, revision: u64, updated_at: Timestamp) -> bool {
        match self.comments.get_mut(item_id) {
            Some(versioned) if versioned.revision == revision => {
                versioned.record.updated_at = updated_at;
                true
            }
            _ => false,
        }
    }
}

fn is_newer(existing: Option<Timestamp>, candidate: Timestamp) -> bool {
    existing.is_none_or(|existing| existing <= candidate)
}
