use curate_core::{
    ids::{ItemId, ReviewId},
    records::{CommentRecord, EditRecord, OverlaySnapshot, StatusRecord},
};

use crate::error::StorageError;

/// Key-value persistence for the three overlay tables.
///
/// Every table is keyed by `(review_id, item_id)`. Upserts are idempotent
/// under that key: repeating one replaces the stored row. Each upsert
/// returns the row as stored, including the store's own `updated_at`.
pub trait RemoteStore {
    fn fetch_statuses(&self, review_id: &ReviewId) -> Result<Vec<StatusRecord>, StorageError>;

    fn fetch_edits(&self, review_id: &ReviewId) -> Result<Vec<EditRecord>, StorageError>;

    fn fetch_comments(&self, review_id: &ReviewId) -> Result<Vec<CommentRecord>, StorageError>;

    fn upsert_status(&mut self, record: &StatusRecord) -> Result<StatusRecord, StorageError>;

    fn upsert_edit(&mut self, record: &EditRecord) -> Result<EditRecord, StorageError>;

    fn upsert_comment(&mut self, record: &CommentRecord) -> Result<CommentRecord, StorageError>;

    /// Remove the edit row for an item. Deleting a missing row succeeds.
    fn delete_edit(&mut self, review_id: &ReviewId, item_id: &ItemId) -> Result<(), StorageError>;

    /// Load everything stored for one review.
    fn query(&self, review_id: &ReviewId) -> Result<OverlaySnapshot, StorageError> {
        Ok(OverlaySnapshot {
            statuses: self.fetch_statuses(review_id)?,
            edits: self.fetch_edits(review_id)?,
            comments: self.fetch_comments(review_id)?,
        })
    }
}

impl<S: RemoteStore + ?Sized> RemoteStore for Box<S> {
    fn fetch_statuses(&self, review_id: &ReviewId) -> Result<Vec<StatusRecord>, StorageError> {
        (**self).fetch_statuses(review_id)
    }

    fn fetch_edits(&self, review_id: &ReviewId) -> Result<Vec<EditRecord>, StorageError> {
        (**self).fetch_edits(review_id)
    }

    fn fetch_comments(&self, review_id: &ReviewId) -> Result<Vec<CommentRecord>, StorageError> {
        (**self).fetch_comments(review_id)
    }

    fn upsert_status(&mut self, record: &StatusRecord) -> Result<StatusRecord, StorageError> {
        (**self).upsert_status(record)
    }

    fn upsert_edit(&mut self, record: &EditRecord) -> Result<EditRecord, StorageError> {
        (**self).upsert_edit(record)
    }

    fn upsert_comment(&mut self, record: &CommentRecord) -> Result<CommentRecord, StorageError> {
        (**self).upsert_comment(record)
    }

    fn delete_edit(&mut self, review_id: &ReviewId, item_id: &ItemId) -> Result<(), StorageError> {
        (**self).delete_edit(review_id, item_id)
    }
}
