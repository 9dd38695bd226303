use std::collections::BTreeMap;

use chrono::TimeDelta;
use curate_core::{Channel, ItemId, SaveState, Timestamp};

use crate::timers::DeferredTasks;

pub type SaveKey = (ItemId, Channel);

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    state: SaveState,
    failure: Option<String>,
}

/// Per item, per channel save-state machines:
/// `idle -> saving -> {saved, error}`, `saved -> idle` after a delay.
///
/// Every transition cancels the pending revert for that key; only entering
/// `saved` arms a new one.
#[derive(Debug)]
pub struct SaveTracker {
    entries: BTreeMap<SaveKey, Entry>,
    reverts: DeferredTasks<SaveKey>,
    revert_delay: TimeDelta,
}

impl SaveTracker {
    pub fn new(revert_delay: TimeDelta) -> Self {
        Self {
            entries: BTreeMap::new(),
            reverts: DeferredTasks::new(),
            revert_delay,
        }
    }

    pub fn state(&self, item_id: &ItemId, channel: Channel) -> SaveState {
        self.entries
            .get(&(item_id.clone(), channel))
            .map_or(SaveState::Idle, |entry| entry.state)
    }

    /// Single indicator for an item across its channels.
    pub fn item_state(&self, item_id: &ItemId) -> SaveState {
        Channel::ALL
            .iter()
            .map(|&channel| self.state(item_id, channel))
            .max_by_key(SaveState::severity)
            .unwrap_or_default()
    }

    pub fn failure(&self, item_id: &ItemId, channel: Channel) -> Option<&str> {
        self.entries
            .get(&(item_id.clone(), channel))
            .and_then(|entry| entry.failure.as_deref())
    }

    pub fn pending_reverts(&self) -> usize {
        self.reverts.len()
    }

    pub(crate) fn begin(&mut self, item_id: &ItemId, channel: Channel) {
        self.set(item_id, channel, SaveState::Saving, None);
    }

    pub(crate) fn succeed(&mut self, item_id: &ItemId, channel: Channel, now: Timestamp) {
        self.set(item_id, channel, SaveState::Saved, None);
        self.reverts
            .schedule((item_id.clone(), channel), now, self.revert_delay);
    }

    pub(crate) fn fail(&mut self, item_id: &ItemId, channel: Channel, reason: String) {
        self.set(item_id, channel, SaveState::Error, Some(reason));
    }

    fn set(&mut self, item_id: &ItemId, channel: Channel, state: SaveState, failure: Option<String>) {
        let key = (item_id.clone(), channel);
        self.reverts.cancel(&key);
        tracing::debug!(item = %item_id, %channel, %state, "save state");
        self.entries.insert(key, Entry { state, failure });
    }

    /// Fire reverts that are due and return the keys now back at `idle`.
    pub(crate) fn poll(&mut self, now: Timestamp) -> Vec<SaveKey> {
        let mut cleared = Vec::new();
        for fired in self.reverts.take_due(now) {
            // A revert is only armed while its entry sits at `saved`.
            if let Some(entry) = self.entries.get_mut(&fired.key) {
                entry.state = SaveState::Idle;
                tracing::debug!(item = %fired.key.0, channel = %fired.key.1, "saved indicator cleared");
                cleared.push(fired.key);
            }
        }
        cleared
    }

    /// Cancel every pending revert; later polls fire nothing.
    pub(crate) fn teardown(&mut self) {
        self.reverts.close();
    }
}
