use std::path::Path;

use curate_core::{
    Catalog, Channel, Clock, EditPatch, EffectiveItem, ItemFilter, ItemId, Progress, ReviewId,
    ReviewStatus, SaveState, SystemClock, Timestamp,
    merge::{merge, merge_item},
};

use crate::config::SessionConfig;
use crate::error::EngineError;
use crate::focus::{FocusCommand, FocusNavigator, FocusOutcome, KeyInput, Panel};
use crate::sync::{SyncController, SyncEvent};
use crate::transport::Transport;

/// Read a catalog document. Any failure is a load error: there is no
/// partial catalog.
pub fn load_catalog(path: &Path) -> Result<Catalog, EngineError> {
    Catalog::from_path(path).map_err(|e| EngineError::Load(format!("{}: {e}", path.display())))
}

pub struct SessionBuilder {
    review_id: ReviewId,
    catalog: Catalog,
    remote: Option<Box<dyn Transport>>,
    clock: Box<dyn Clock>,
    config: SessionConfig,
}

impl SessionBuilder {
    pub fn remote(mut self, transport: impl Transport + 'static) -> Self {
        self.remote = Some(Box::new(transport));
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Fetch the persisted overlay and start the session.
    pub fn open(self) -> Result<ReviewSession, EngineError> {
        let mut sync = SyncController::new(
            self.review_id.clone(),
            self.remote,
            self.config.saved_revert_delay(),
        );
        sync.load()?;
        tracing::info!(
            review = %self.review_id,
            items = self.catalog.len(),
            local_only = sync.is_local_only(),
            "review session opened"
        );
        Ok(ReviewSession {
            review_id: self.review_id,
            catalog: self.catalog,
            sync,
            clock: self.clock,
            config: self.config,
            focus: None,
            closed: false,
        })
    }
}

/// One reviewer's session over one review id: the baseline catalog, the
/// sync controller that owns the overlay, and an optional focus navigator.
pub struct ReviewSession {
    review_id: ReviewId,
    catalog: Catalog,
    sync: SyncController,
    clock: Box<dyn Clock>,
    config: SessionConfig,
    focus: Option<FocusNavigator>,
    closed: bool,
}

impl ReviewSession {
    pub fn builder(review_id: impl Into<ReviewId>, catalog: Catalog) -> SessionBuilder {
        SessionBuilder {
            review_id: review_id.into(),
            catalog,
            remote: None,
            clock: Box::new(SystemClock),
            config: SessionConfig::default(),
        }
    }

    pub fn review_id(&self) -> &ReviewId {
        &self.review_id
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn sync(&self) -> &SyncController {
        &self.sync
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    // ------------------------------------------------------------------
    // Effective view
    // ------------------------------------------------------------------

    pub fn items(&self) -> Vec<EffectiveItem> {
        let overlay = self.sync.overlay().snapshot();
        merge(
            self.catalog.items(),
            &overlay.statuses,
            &overlay.edits,
            &overlay.comments,
        )
    }

    pub fn item(&self, item_id: &ItemId) -> Option<EffectiveItem> {
        let baseline = self.catalog.get(item_id)?;
        let overlay = self.sync.overlay();
        Some(merge_item(
            baseline,
            overlay.status(item_id),
            overlay.edit(item_id),
            overlay.comment(item_id),
        ))
    }

    pub fn filtered(&self, filter: &ItemFilter) -> Vec<EffectiveItem> {
        self.items()
            .into_iter()
            .filter(|item| filter.matches(item))
            .collect()
    }

    pub fn categories(&self) -> Vec<String> {
        self.catalog.categories()
    }

    pub fn progress(&self) -> Progress {
        Progress::of(&self.items())
    }

    pub fn save_state(&self, item_id: &ItemId) -> SaveState {
        self.sync.tracker().item_state(item_id)
    }

    pub fn channel_state(&self, item_id: &ItemId, channel: Channel) -> SaveState {
        self.sync.state(item_id, channel)
    }

    pub fn save_failure(&self, item_id: &ItemId, channel: Channel) -> Option<&str> {
        self.sync.tracker().failure(item_id, channel)
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    pub fn set_status(&mut self, item_id: &ItemId, status: ReviewStatus) -> Result<ReviewStatus, EngineError> {
        self.check_item(item_id)?;
        let now = self.clock.now();
        self.sync.set_status(item_id, status, now)
    }

    pub fn save_edits(&mut self, item_id: &ItemId, patch: EditPatch) -> Result<(), EngineError> {
        self.check_item(item_id)?;
        let now = self.clock.now();
        self.sync.save_edits(item_id, patch, now)?;
        self.close_focus_panel(item_id, Panel::Edit);
        Ok(())
    }

    pub fn reset_edits(&mut self, item_id: &ItemId) -> Result<(), EngineError> {
        self.check_item(item_id)?;
        let now = self.clock.now();
        self.sync.reset_edits(item_id, now)?;
        self.close_focus_panel(item_id, Panel::Edit);
        Ok(())
    }

    pub fn save_comment(&mut self, item_id: &ItemId, comment: impl Into<String>) -> Result<(), EngineError> {
        self.check_item(item_id)?;
        let comment = comment.into();
        let cleared = comment.is_empty();
        let now = self.clock.now();
        self.sync.save_comment(item_id, comment, now)?;
        if cleared {
            self.close_focus_panel(item_id, Panel::Comment);
        }
        Ok(())
    }

    pub fn retry(&mut self, item_id: &ItemId, channel: Channel) -> Result<(), EngineError> {
        self.check_item(item_id)?;
        let now = self.clock.now();
        self.sync.retry(item_id, channel, now)
    }

    fn check_item(&self, item_id: &ItemId) -> Result<(), EngineError> {
        if self.closed {
            return Err(EngineError::SessionClosed);
        }
        if !self.catalog.contains(item_id) {
            return Err(EngineError::UnknownItem(item_id.to_string()));
        }
        Ok(())
    }

    fn close_focus_panel(&mut self, item_id: &ItemId, panel: Panel) {
        if let Some(nav) = self.focus.as_mut() {
            if nav.current_item() == Some(item_id) {
                nav.close_panel(panel);
            }
        }
    }

    // ------------------------------------------------------------------
    // Event loop
    // ------------------------------------------------------------------

    /// Deliver remote completions and fire every deferred task that is due
    /// at the clock's current time.
    pub fn pump(&mut self) -> Vec<SyncEvent> {
        let now = self.clock.now();
        let events = self.sync.poll(now);
        if let Some(nav) = self.focus.as_mut() {
            nav.poll(now);
        }
        events
    }

    /// Pump until no remote call is outstanding or `max_rounds` is spent.
    pub fn settle(&mut self, max_rounds: usize) -> Vec<SyncEvent> {
        let mut events = Vec::new();
        for _ in 0..max_rounds {
            events.extend(self.pump());
            if self.sync.is_settled() {
                break;
            }
        }
        events
    }

    /// End the session: cancel save-state reverts and any pending focus
    /// transition. Remote calls already sent still resolve, but `pump`
    /// discards them.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.sync.teardown();
        if let Some(mut nav) = self.focus.take() {
            nav.teardown();
        }
        tracing::info!(review = %self.review_id, "review session closed");
    }

    // ------------------------------------------------------------------
    // Focus mode
    // ------------------------------------------------------------------

    /// Enter focus mode over the effective items, optionally filtered. The
    /// item order is fixed for the lifetime of the navigator.
    pub fn enter_focus(&mut self, filter: Option<&ItemFilter>) -> Result<&FocusNavigator, EngineError> {
        if self.closed {
            return Err(EngineError::SessionClosed);
        }
        let items = match filter {
            Some(filter) => self.filtered(filter),
            None => self.items(),
        };
        let nav = FocusNavigator::new(&items, self.config.transition_delay());
        tracing::debug!(items = nav.len(), start = ?nav.current_index(), "focus mode entered");
        Ok(self.focus.insert(nav))
    }

    pub fn focus(&self) -> Option<&FocusNavigator> {
        self.focus.as_ref()
    }

    pub fn exit_focus(&mut self) {
        if let Some(mut nav) = self.focus.take() {
            nav.teardown();
            tracing::debug!("focus mode exited");
        }
    }

    /// Item under the focus cursor, with overlays applied.
    pub fn focused_item(&self) -> Option<EffectiveItem> {
        let item_id = self.focus.as_ref()?.current_item()?;
        self.item(item_id)
    }

    pub fn focus_command(&mut self, command: FocusCommand) -> Result<FocusOutcome, EngineError> {
        let now = self.clock.now();
        let nav = self.focus.as_mut().ok_or(EngineError::FocusInactive)?;
        let outcome = nav.dispatch(command, now);
        self.apply_focus_outcome(&outcome, now)?;
        Ok(outcome)
    }

    pub fn focus_key(&mut self, input: KeyInput) -> Result<FocusOutcome, EngineError> {
        let now = self.clock.now();
        let nav = self.focus.as_mut().ok_or(EngineError::FocusInactive)?;
        let outcome = nav.handle_key(input, now);
        self.apply_focus_outcome(&outcome, now)?;
        Ok(outcome)
    }

    fn apply_focus_outcome(&mut self, outcome: &FocusOutcome, now: Timestamp) -> Result<(), EngineError> {
        match outcome {
            FocusOutcome::ApplyStatus { item_id, status, .. } => {
                self.sync.set_status(item_id, *status, now)?;
            }
            FocusOutcome::Exit => self.exit_focus(),
            _ => {}
        }
        Ok(())
    }
}

impl Drop for ReviewSession {
    fn drop(&mut self) {
        self.close();
    }
}
