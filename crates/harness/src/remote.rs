use std::cell::RefCell;
use std::collections::{BTreeSet, VecDeque};
use std::rc::Rc;

use chrono::TimeDelta;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use curate_core::{CallId, ItemId, OverlaySnapshot, ReviewId, Timestamp};
use curate_engine::{Completion, RemoteRequest, Transport};
use curate_storage::{RemoteStore, SqliteRemoteStore, StorageError};

#[derive(Debug)]
struct Queued {
    call: CallId,
    request: RemoteRequest,
    deliver_at: Timestamp,
    seq: u64,
    failure: Option<String>,
}

struct RemoteState {
    store: SqliteRemoteStore,
    queue: Vec<Queued>,
    latency: TimeDelta,
    scheduled_latencies: VecDeque<TimeDelta>,
    fail_next: usize,
    failing_items: BTreeSet<ItemId>,
    offline: bool,
    fail_query: bool,
    failure_rate: f64,
    rng: StdRng,
    seq: u64,
    sent: Vec<RemoteRequest>,
}

/// In-process remote with controllable latency and injected failures.
///
/// Requests are queued on `send` and executed against an in-memory SQLite
/// store only when their delivery time has passed, so completions can
/// arrive in a different order than they were sent. Clones share state:
/// hand one to the session and keep one to steer it.
#[derive(Clone)]
pub struct SimulatedRemote {
    state: Rc<RefCell<RemoteState>>,
}

impl SimulatedRemote {
    pub fn new() -> Result<Self, StorageError> {
        Ok(Self::with_store(SqliteRemoteStore::open_in_memory()?))
    }

    pub fn with_store(store: SqliteRemoteStore) -> Self {
        Self {
            state: Rc::new(RefCell::new(RemoteState {
                store,
                queue: Vec::new(),
                latency: TimeDelta::zero(),
                scheduled_latencies: VecDeque::new(),
                fail_next: 0,
                failing_items: BTreeSet::new(),
                offline: false,
                fail_query: false,
                failure_rate: 0.0,
                rng: StdRng::seed_from_u64(0),
                seq: 0,
                sent: Vec::new(),
            })),
        }
    }

    /// Default round-trip time for every request.
    pub fn set_latency_ms(&self, ms: i64) {
        self.state.borrow_mut().latency = TimeDelta::milliseconds(ms);
    }

    /// Latency for the next request only. Queued values are consumed in
    /// send order before the default applies again.
    pub fn push_latency_ms(&self, ms: i64) {
        self.state
            .borrow_mut()
            .scheduled_latencies
            .push_back(TimeDelta::milliseconds(ms));
    }

    /// Fail the next `count` requests.
    pub fn fail_next(&self, count: usize) {
        self.state.borrow_mut().fail_next += count;
    }

    /// Fail every request for `item_id` until healed.
    pub fn fail_item(&self, item_id: impl Into<ItemId>) {
        self.state.borrow_mut().failing_items.insert(item_id.into());
    }

    pub fn heal_item(&self, item_id: &ItemId) {
        self.state.borrow_mut().failing_items.remove(item_id);
    }

    pub fn set_offline(&self, offline: bool) {
        self.state.borrow_mut().offline = offline;
    }

    pub fn set_fail_query(&self, fail: bool) {
        self.state.borrow_mut().fail_query = fail;
    }

    /// Fail requests at random with probability `rate`, from a seeded
    /// generator so runs are reproducible.
    pub fn set_failure_rate(&self, seed: u64, rate: f64) {
        let mut state = self.state.borrow_mut();
        state.rng = StdRng::seed_from_u64(seed);
        state.failure_rate = rate.clamp(0.0, 1.0);
    }

    /// Every request sent so far, in send order.
    pub fn sent(&self) -> Vec<RemoteRequest> {
        self.state.borrow().sent.clone()
    }

    pub fn pending(&self) -> usize {
        self.state.borrow().queue.len()
    }

    /// What the store holds for a review right now, bypassing fault
    /// injection.
    pub fn stored(&self, review_id: &ReviewId) -> Result<OverlaySnapshot, StorageError> {
        self.state.borrow().store.query(review_id)
    }
}

impl RemoteState {
    fn failure_for(&mut self, request: &RemoteRequest) -> Option<String> {
        if self.offline {
            return Some("offline".into());
        }
        if self.fail_next > 0 {
            self.fail_next -= 1;
            return Some("injected failure".into());
        }
        if self.failing_items.contains(request.item_id()) {
            return Some(format!("item {} rejected", request.item_id()));
        }
        if self.failure_rate > 0.0 && self.rng.gen_bool(self.failure_rate) {
            return Some("random failure".into());
        }
        None
    }
}

impl Transport for SimulatedRemote {
    fn query(&mut self, review_id: &ReviewId) -> Result<OverlaySnapshot, StorageError> {
        let state = self.state.borrow();
        if state.fail_query || state.offline {
            return Err(StorageError::Unavailable("query failed".into()));
        }
        state.store.query(review_id)
    }

    fn send(&mut self, call: CallId, request: RemoteRequest, now: Timestamp) {
        let mut state = self.state.borrow_mut();
        let latency = state
            .scheduled_latencies
            .pop_front()
            .unwrap_or(state.latency);
        let failure = state.failure_for(&request);
        let seq = state.seq;
        state.seq += 1;
        state.sent.push(request.clone());
        state.queue.push(Queued {
            call,
            request,
            deliver_at: now + latency,
            seq,
            failure,
        });
    }

    fn poll(&mut self, now: Timestamp) -> Vec<Completion> {
        let mut state = self.state.borrow_mut();
        let (mut due, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut state.queue)
            .into_iter()
            .partition(|q| q.deliver_at <= now);
        state.queue = waiting;
        due.sort_by_key(|q| (q.deliver_at, q.seq));

        let mut completions = Vec::with_capacity(due.len());
        for queued in due {
            let result = match queued.failure {
                Some(reason) => Err(StorageError::Unavailable(reason)),
                None => queued.request.execute(&mut state.store),
            };
            tracing::trace!(call = %queued.call, kind = queued.request.kind(), ok = result.is_ok(), "simulated delivery");
            completions.push(Completion {
                call: queued.call,
                result,
            });
        }
        completions
    }

    fn in_flight(&self) -> usize {
        self.state.borrow().queue.len()
    }
}
