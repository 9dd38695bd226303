use std::collections::VecDeque;

use curate_core::{
    CallId, Channel, CommentRecord, EditRecord, ItemId, OverlaySnapshot, ReviewId, StatusRecord,
    Timestamp,
};
use curate_storage::{RemoteStore, StorageError};

/// One remote mutation, keyed by `(review_id, item_id)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteRequest {
    UpsertStatus(StatusRecord),
    UpsertEdit(EditRecord),
    DeleteEdit { review_id: ReviewId, item_id: ItemId },
    UpsertComment(CommentRecord),
}

impl RemoteRequest {
    pub fn item_id(&self) -> &ItemId {
        match self {
            Self::UpsertStatus(record) => &record.item_id,
            Self::UpsertEdit(record) => &record.item_id,
            Self::DeleteEdit { item_id, .. } => item_id,
            Self::UpsertComment(record) => &record.item_id,
        }
    }

    pub fn channel(&self) -> Channel {
        match self {
            Self::UpsertStatus(_) => Channel::Status,
            Self::UpsertEdit(_) | Self::DeleteEdit { .. } => Channel::Edits,
            Self::UpsertComment(_) => Channel::Comment,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::UpsertStatus(_) => "upsert_status",
            Self::UpsertEdit(_) => "upsert_edit",
            Self::DeleteEdit { .. } => "delete_edit",
            Self::UpsertComment(_) => "upsert_comment",
        }
    }

    /// Run the request against a store.
    pub fn execute<S: RemoteStore + ?Sized>(&self, store: &mut S) -> Result<RemoteResponse, StorageError> {
        match self {
            Self::UpsertStatus(record) => store.upsert_status(record).map(RemoteResponse::Status),
            Self::UpsertEdit(record) => store.upsert_edit(record).map(RemoteResponse::Edit),
            Self::DeleteEdit { review_id, item_id } => store
                .delete_edit(review_id, item_id)
                .map(|()| RemoteResponse::Deleted),
            Self::UpsertComment(record) => store.upsert_comment(record).map(RemoteResponse::Comment),
        }
    }
}

/// What the store reported back for a successful request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteResponse {
    Status(StatusRecord),
    Edit(EditRecord),
    Deleted,
    Comment(CommentRecord),
}

impl RemoteResponse {
    pub fn updated_at(&self) -> Option<Timestamp> {
        match self {
            Self::Status(record) => Some(record.updated_at),
            Self::Edit(record) => Some(record.updated_at),
            Self::Deleted => None,
            Self::Comment(record) => Some(record.updated_at),
        }
    }
}

#[derive(Debug)]
pub struct Completion {
    pub call: CallId,
    pub result: Result<RemoteResponse, StorageError>,
}

/// Non-blocking seam between the sync controller and a remote store.
///
/// `send` only queues; outcomes surface later through `poll`, in whatever
/// order the transport resolves them.
pub trait Transport {
    /// Read every overlay record stored for one review.
    fn query(&mut self, review_id: &ReviewId) -> Result<OverlaySnapshot, StorageError>;

    fn send(&mut self, call: CallId, request: RemoteRequest, now: Timestamp);

    fn poll(&mut self, now: Timestamp) -> Vec<Completion>;

    /// Requests sent but not yet returned by `poll`.
    fn in_flight(&self) -> usize;
}

/// Executes each request against the store as soon as it is sent and
/// reports the outcome on the next poll.
pub struct DirectTransport<S: RemoteStore> {
    store: S,
    ready: VecDeque<Completion>,
}

impl<S: RemoteStore> DirectTransport<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            ready: VecDeque::new(),
        }
    }
}

impl<S: RemoteStore> Transport for DirectTransport<S> {
    fn query(&mut self, review_id: &ReviewId) -> Result<OverlaySnapshot, StorageError> {
        self.store.query(review_id)
    }

    fn send(&mut self, call: CallId, request: RemoteRequest, _now: Timestamp) {
        let result = request.execute(&mut self.store);
        if let Err(e) = &result {
            tracing::debug!(%call, kind = request.kind(), item = %request.item_id(), "remote call failed: {e}");
        }
        self.ready.push_back(Completion { call, result });
    }

    fn poll(&mut self, _now: Timestamp) -> Vec<Completion> {
        self.ready.drain(..).collect()
    }

    fn in_flight(&self) -> usize {
        self.ready.len()
    }
}
