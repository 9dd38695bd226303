use std::collections::{BTreeMap, BTreeSet};

use curate_core::{
    CallId, Channel, CommentRecord, EditPatch, EditRecord, ItemId, ReviewId, ReviewStatus,
    SaveState, StatusRecord, Timestamp,
};

use crate::error::EngineError;
use crate::overlay::OverlayStore;
use crate::save_state::{SaveKey, SaveTracker};
use crate::transport::{Completion, RemoteRequest, Transport};

/// What the controller wrote optimistically for a call, carried until the
/// call resolves so the outcome can be matched against live state.
#[derive(Debug, Clone)]
enum Attempt {
    Status {
        revision: u64,
        status: ReviewStatus,
    },
    Edit {
        revision: u64,
    },
    Reset,
    Comment {
        revision: u64,
    },
}

#[derive(Debug, Clone)]
struct PendingCall {
    item_id: ItemId,
    channel: Channel,
    attempt: Attempt,
}

/// How to re-issue a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RetryIntent {
    Status(ReviewStatus),
    Edits,
    Reset,
    Comment,
}

/// Observable result of driving the controller forward.
#[derive(Debug)]
pub enum SyncEvent {
    Saved {
        item_id: ItemId,
        channel: Channel,
    },
    /// A mutation failed. Carries `EngineError::Save`.
    Failed(EngineError),
    /// A failed status write was undone locally.
    RolledBack {
        item_id: ItemId,
        restored: ReviewStatus,
    },
    /// A call resolved after a newer call for the same item and channel
    /// was issued; its outcome was not applied.
    Superseded {
        item_id: ItemId,
        channel: Channel,
        call: CallId,
    },
    /// A `saved` indicator expired.
    Idle {
        item_id: ItemId,
        channel: Channel,
    },
    /// A completion arrived for an unknown call or after teardown.
    Discarded {
        call: CallId,
    },
}

/// Applies every mutation to the local overlay first, then reconciles it
/// with the remote store, tracking a save-state per item and channel.
///
/// Without a transport the controller runs local-only: each operation is
/// applied and immediately reported `saved`.
pub struct SyncController {
    review_id: ReviewId,
    overlay: OverlayStore,
    tracker: SaveTracker,
    remote: Option<Box<dyn Transport>>,
    in_flight: BTreeMap<CallId, PendingCall>,
    latest: BTreeMap<SaveKey, CallId>,
    retries: BTreeMap<SaveKey, RetryIntent>,
    /// Last status the remote acknowledged per item, in completion order.
    /// A missing entry means the remote holds no status record.
    confirmed: BTreeMap<ItemId, StatusRecord>,
    /// Items whose live status is a rollback to `confirmed`, untouched since.
    rolled_back: BTreeSet<ItemId>,
    closed: bool,
}

impl SyncController {
    pub fn new(
        review_id: ReviewId,
        remote: Option<Box<dyn Transport>>,
        revert_delay: chrono::TimeDelta,
    ) -> Self {
        Self {
            overlay: OverlayStore::new(review_id.clone()),
            review_id,
            tracker: SaveTracker::new(revert_delay),
            remote,
            in_flight: BTreeMap::new(),
            latest: BTreeMap::new(),
            retries: BTreeMap::new(),
            confirmed: BTreeMap::new(),
            rolled_back: BTreeSet::new(),
            closed: false,
        }
    }

    pub fn review_id(&self) -> &ReviewId {
        &self.review_id
    }

    pub fn overlay(&self) -> &OverlayStore {
        &self.overlay
    }

    pub fn tracker(&self) -> &SaveTracker {
        &self.tracker
    }

    pub fn is_local_only(&self) -> bool {
        self.remote.is_none()
    }

    pub fn state(&self, item_id: &ItemId, channel: Channel) -> SaveState {
        self.tracker.state(item_id, channel)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// No call is awaiting a response.
    pub fn is_settled(&self) -> bool {
        self.in_flight.is_empty()
    }

    /// Fetch the persisted overlay for this review and replace the local one.
    /// A no-op in local-only mode.
    pub fn load(&mut self) -> Result<(), EngineError> {
        let Some(remote) = self.remote.as_mut() else {
            return Ok(());
        };
        let snapshot = remote
            .query(&self.review_id)
            .map_err(|e| EngineError::Load(e.to_string()))?;
        tracing::info!(
            review = %self.review_id,
            statuses = snapshot.statuses.len(),
            edits = snapshot.edits.len(),
            comments = snapshot.comments.len(),
            "overlay loaded"
        );
        self.overlay.load(snapshot);
        self.confirmed = self
            .overlay
            .snapshot()
            .statuses
            .into_iter()
            .map(|record| (record.item_id.clone(), record))
            .collect();
        self.rolled_back.clear();
        Ok(())
    }

    /// Choose a status for an item. Choosing the active status again clears
    /// it back to `unreviewed`. Returns the status that was applied.
    pub fn set_status(
        &mut self,
        item_id: &ItemId,
        requested: ReviewStatus,
        now: Timestamp,
    ) -> Result<ReviewStatus, EngineError> {
        self.ensure_open()?;
        let current = self
            .overlay
            .status(item_id)
            .map_or(ReviewStatus::Unreviewed, |record| record.status);
        let target = current.toggle(requested);
        self.apply_status(item_id, target, now);
        Ok(target)
    }

    fn apply_status(&mut self, item_id: &ItemId, status: ReviewStatus, now: Timestamp) {
        let record = StatusRecord {
            review_id: self.review_id.clone(),
            item_id: item_id.clone(),
            status,
            updated_at: now,
        };
        let revision = self.overlay.put_status(record.clone());
        self.rolled_back.remove(item_id);
        tracing::debug!(item = %item_id, %status, revision, "status applied locally");

        let attempt = Attempt::Status { revision, status };
        self.dispatch(item_id, Channel::Status, RemoteRequest::UpsertStatus(record), attempt, now);
    }

    /// Store field overrides for an item. Fields missing from the patch
    /// fall back to the baseline.
    pub fn save_edits(
        &mut self,
        item_id: &ItemId,
        patch: EditPatch,
        now: Timestamp,
    ) -> Result<(), EngineError> {
        self.ensure_open()?;
        let record = EditRecord::from_patch(self.review_id.clone(), item_id.clone(), patch, now);
        self.send_edit(record, now);
        Ok(())
    }

    fn send_edit(&mut self, record: EditRecord, now: Timestamp) {
        let item_id = record.item_id.clone();
        let revision = self.overlay.put_edit(record.clone());
        self.dispatch(
            &item_id,
            Channel::Edits,
            RemoteRequest::UpsertEdit(record),
            Attempt::Edit { revision },
            now,
        );
    }

    /// Drop every override for an item. The local record stays until the
    /// remote delete is confirmed.
    pub fn reset_edits(&mut self, item_id: &ItemId, now: Timestamp) -> Result<(), EngineError> {
        self.ensure_open()?;
        if self.remote.is_none() {
            self.overlay.remove_edit(item_id);
        }
        let request = RemoteRequest::DeleteEdit {
            review_id: self.review_id.clone(),
            item_id: item_id.clone(),
        };
        self.dispatch(item_id, Channel::Edits, request, Attempt::Reset, now);
        Ok(())
    }

    /// Store a reviewer comment. An empty comment is still stored.
    pub fn save_comment(
        &mut self,
        item_id: &ItemId,
        comment: String,
        now: Timestamp,
    ) -> Result<(), EngineError> {
        self.ensure_open()?;
        let record = CommentRecord {
            review_id: self.review_id.clone(),
            item_id: item_id.clone(),
            comment,
            updated_at: now,
        };
        self.send_comment(record, now);
        Ok(())
    }

    fn send_comment(&mut self, record: CommentRecord, now: Timestamp) {
        let item_id = record.item_id.clone();
        let revision = self.overlay.put_comment(record.clone());
        self.dispatch(
            &item_id,
            Channel::Comment,
            RemoteRequest::UpsertComment(record),
            Attempt::Comment { revision },
            now,
        );
    }

    /// Re-issue the operation that left `(item, channel)` in `error`.
    pub fn retry(&mut self, item_id: &ItemId, channel: Channel, now: Timestamp) -> Result<(), EngineError> {
        self.ensure_open()?;
        let key = (item_id.clone(), channel);
        let intent = match self.tracker.state(item_id, channel) {
            SaveState::Error => self.retries.get(&key).copied(),
            _ => None,
        };
        let nothing = || EngineError::NothingToRetry {
            item_id: item_id.clone(),
            channel,
        };

        tracing::info!(item = %item_id, %channel, "retrying save");
        match intent.ok_or_else(nothing)? {
            RetryIntent::Status(status) => self.apply_status(item_id, status, now),
            RetryIntent::Edits => {
                let mut record = self.overlay.edit(item_id).cloned().ok_or_else(nothing)?;
                record.updated_at = now;
                self.send_edit(record, now);
            }
            RetryIntent::Reset => self.reset_edits(item_id, now)?,
            RetryIntent::Comment => {
                let mut record = self.overlay.comment(item_id).cloned().ok_or_else(nothing)?;
                record.updated_at = now;
                self.send_comment(record, now);
            }
        }
        Ok(())
    }

    fn dispatch(
        &mut self,
        item_id: &ItemId,
        channel: Channel,
        request: RemoteRequest,
        attempt: Attempt,
        now: Timestamp,
    ) {
        let key = (item_id.clone(), channel);
        self.retries.remove(&key);

        let Some(remote) = self.remote.as_mut() else {
            if let Attempt::Reset = attempt {
                tracing::debug!(item = %item_id, "edits reset locally");
            }
            self.tracker.succeed(item_id, channel, now);
            return;
        };

        let call = CallId::new();
        tracing::debug!(%call, kind = request.kind(), item = %item_id, "remote call sent");
        self.tracker.begin(item_id, channel);
        self.latest.insert(key, call);
        self.in_flight.insert(
            call,
            PendingCall {
                item_id: item_id.clone(),
                channel,
                attempt,
            },
        );
        remote.send(call, request, now);
    }

    /// Apply remote completions, then fire due save-state reverts.
    pub fn poll(&mut self, now: Timestamp) -> Vec<SyncEvent> {
        let completions = match self.remote.as_mut() {
            Some(remote) => remote.poll(now),
            None => Vec::new(),
        };

        let mut events = Vec::new();
        for completion in completions {
            self.complete(completion, now, &mut events);
        }

        events.extend(
            self.tracker
                .poll(now)
                .into_iter()
                .map(|(item_id, channel)| SyncEvent::Idle { item_id, channel }),
        );
        events
    }

    fn complete(&mut self, completion: Completion, now: Timestamp, events: &mut Vec<SyncEvent>) {
        let Completion { call, result } = completion;
        let Some(pending) = self.in_flight.remove(&call) else {
            tracing::debug!(%call, "completion for unknown call");
            events.push(SyncEvent::Discarded { call });
            return;
        };
        if self.closed {
            tracing::debug!(%call, item = %pending.item_id, "completion after teardown ignored");
            events.push(SyncEvent::Discarded { call });
            return;
        }

        let PendingCall {
            item_id,
            channel,
            attempt,
        } = pending;
        let key = (item_id.clone(), channel);
        let is_latest = self.latest.get(&key) == Some(&call);
        if is_latest {
            self.latest.remove(&key);
        }

        match result {
            Ok(response) => {
                let stored_at = response.updated_at().unwrap_or(now);
                if let Attempt::Status { status, .. } = &attempt {
                    self.confirm_status(&item_id, *status, stored_at);
                }
                if !is_latest {
                    tracing::debug!(%call, item = %item_id, %channel, "superseded success ignored");
                    events.push(SyncEvent::Superseded { item_id, channel, call });
                    return;
                }
                self.apply_success(&item_id, &attempt, stored_at);
                self.tracker.succeed(&item_id, channel, now);
                events.push(SyncEvent::Saved { item_id, channel });
            }
            Err(err) => {
                let reason = err.to_string();
                tracing::warn!(%call, item = %item_id, %channel, "save failed: {reason}");

                if let Attempt::Status { revision, status } = &attempt {
                    // Undo only our own write; a newer local write stays.
                    // Fall back to what the remote last acknowledged, never
                    // to another unconfirmed write.
                    if self.overlay.status_revision(&item_id) == Some(*revision) {
                        let confirmed = self.confirmed.get(&item_id).cloned();
                        let restored = confirmed
                            .as_ref()
                            .map_or(ReviewStatus::Unreviewed, |record| record.status);
                        self.overlay.restore_status(&item_id, confirmed);
                        self.rolled_back.insert(item_id.clone());
                        tracing::warn!(item = %item_id, attempted = %status, %restored, "status rolled back");
                        events.push(SyncEvent::RolledBack {
                            item_id: item_id.clone(),
                            restored,
                        });
                    }
                }

                if !is_latest {
                    events.push(SyncEvent::Superseded { item_id, channel, call });
                    return;
                }

                let intent = match attempt {
                    Attempt::Status { status, .. } => RetryIntent::Status(status),
                    Attempt::Edit { .. } => RetryIntent::Edits,
                    Attempt::Reset => RetryIntent::Reset,
                    Attempt::Comment { .. } => RetryIntent::Comment,
                };
                self.retries.insert(key, intent);
                self.tracker.fail(&item_id, channel, reason.clone());
                events.push(SyncEvent::Failed(EngineError::Save {
                    item_id,
                    channel,
                    reason,
                }));
            }
        }
    }

    /// Record a status the remote acknowledged. An item showing a rollback
    /// with no newer status call in flight follows it.
    fn confirm_status(&mut self, item_id: &ItemId, status: ReviewStatus, stored_at: Timestamp) {
        let record = StatusRecord {
            review_id: self.review_id.clone(),
            item_id: item_id.clone(),
            status,
            updated_at: stored_at,
        };
        self.confirmed.insert(item_id.clone(), record.clone());

        let newer_pending = self.latest.contains_key(&(item_id.clone(), Channel::Status));
        if self.rolled_back.contains(item_id) && !newer_pending {
            tracing::debug!(item = %item_id, %status, "rolled-back status follows late confirmation");
            self.overlay.put_status(record);
        }
    }

    fn apply_success(&mut self, item_id: &ItemId, attempt: &Attempt, stored_at: Timestamp) {
        match attempt {
            Attempt::Status { revision, .. } => {
                self.overlay.reconcile_status(item_id, *revision, stored_at);
            }
            Attempt::Edit { revision } => {
                self.overlay.reconcile_edit(item_id, *revision, stored_at);
            }
            Attempt::Comment { revision } => {
                self.overlay.reconcile_comment(item_id, *revision, stored_at);
            }
            Attempt::Reset => {
                self.overlay.remove_edit(item_id);
            }
        }
    }

    /// Cancel local timers. Calls still in flight are left to resolve, but
    /// their outcomes are discarded.
    pub fn teardown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.tracker.teardown();
        tracing::info!(review = %self.review_id, in_flight = self.in_flight.len(), "sync controller torn down");
    }

    fn ensure_open(&self) -> Result<(), EngineError> {
        if self.closed {
            Err(EngineError::SessionClosed)
        } else {
            Ok(())
        }
    }
}
