use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};
use curate_core::Timestamp;

/// Owned, cancelable deferred tasks, at most one per key.
///
/// Scheduling a key that already has a pending task replaces it. Each
/// scheduled task gets a fresh generation so a holder can tell whether the
/// task it fired is still the one it armed. Once closed, nothing fires.
#[derive(Debug)]
pub struct DeferredTasks<K: Ord + Clone> {
    tasks: BTreeMap<K, Deferred>,
    next_generation: u64,
    closed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Deferred {
    due: Timestamp,
    generation: u64,
}

/// A task whose deadline has passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fired<K> {
    pub key: K,
    pub generation: u64,
    pub due: Timestamp,
}

impl<K: Ord + Clone> Default for DeferredTasks<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + Clone> DeferredTasks<K> {
    pub fn new() -> Self {
        Self {
            tasks: BTreeMap::new(),
            next_generation: 1,
            closed: false,
        }
    }

    /// Arm (or re-arm) the task for `key` to fire `delay` after `now`.
    /// Returns the generation of the new task, or `None` once closed.
    pub fn schedule(&mut self, key: K, now: Timestamp, delay: TimeDelta) -> Option<u64> {
        if self.closed {
            return None;
        }
        let generation = self.next_generation;
        self.next_generation += 1;
        let due = now
            .checked_add_signed(delay)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.tasks.insert(key, Deferred { due, generation });
        Some(generation)
    }

    pub fn cancel(&mut self, key: &K) -> bool {
        self.tasks.remove(key).is_some()
    }

    /// Remove and return every task due at or before `now`, earliest first.
    pub fn take_due(&mut self, now: Timestamp) -> Vec<Fired<K>> {
        if self.closed {
            return Vec::new();
        }
        let due_keys: Vec<K> = self
            .tasks
            .iter()
            .filter(|(_, task)| task.due <= now)
            .map(|(key, _)| key.clone())
            .collect();

        let mut fired: Vec<Fired<K>> = due_keys
            .into_iter()
            .filter_map(|key| {
                self.tasks.remove(&key).map(|task| Fired {
                    key,
                    generation: task.generation,
                    due: task.due,
                })
            })
            .collect();
        fired.sort_by(|a, b| a.due.cmp(&b.due).then(a.generation.cmp(&b.generation)));
        fired
    }

    pub fn next_due(&self) -> Option<Timestamp> {
        self.tasks.values().map(|task| task.due).min()
    }

    /// Cancel everything and refuse further scheduling.
    pub fn close(&mut self) {
        self.tasks.clear();
        self.closed = true;
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
