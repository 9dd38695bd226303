use chrono::{DateTime, TimeDelta, Utc};
use curate_core::{EffectiveItem, ItemId, ReviewStatus, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Next,
    Prev,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Edit,
    Comment,
}

/// Where keyboard focus sat when a key was pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyTarget {
    #[default]
    Body,
    TextInput,
    TextArea,
    Select,
}

impl KeyTarget {
    pub fn accepts_typing(&self) -> bool {
        !matches!(self, Self::Body)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Space,
    Left,
    Right,
    Escape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    pub key: Key,
    pub target: KeyTarget,
}

impl KeyInput {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            target: KeyTarget::Body,
        }
    }

    pub fn in_target(key: Key, target: KeyTarget) -> Self {
        Self { key, target }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusCommand {
    Status(ReviewStatus),
    Next,
    Prev,
    Skip,
    ToggleEdit,
    ToggleComment,
    Escape,
}

impl FocusCommand {
    /// Single-key bindings.
    pub fn for_key(key: Key) -> Option<Self> {
        match key {
            Key::Char('1') => Some(Self::Status(ReviewStatus::Use)),
            Key::Char('2') => Some(Self::Status(ReviewStatus::Like)),
            Key::Char('3') => Some(Self::Status(ReviewStatus::Remove)),
            Key::Char('c') => Some(Self::ToggleComment),
            Key::Char('e') => Some(Self::ToggleEdit),
            Key::Space => Some(Self::Skip),
            Key::Left => Some(Self::Prev),
            Key::Right => Some(Self::Next),
            Key::Escape => Some(Self::Escape),
            Key::Char(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusOutcome {
    /// Rejected: locked, out of bounds, or not a bound key.
    Ignored,
    /// A transition toward `target` started.
    Moving { target: usize, direction: Direction },
    /// The caller should apply `status` to `item_id`. `advancing` is true
    /// when a transition to the next item was started.
    ApplyStatus {
        item_id: ItemId,
        status: ReviewStatus,
        advancing: bool,
    },
    PanelToggled { panel: Panel, open: bool },
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingTransition {
    target: usize,
    due: Timestamp,
}

/// Single-cursor sequential reviewer over a fixed list of item ids.
///
/// Moving is a two-step affair: `go_to` takes the transition lock and arms
/// one deferred commit; `poll` commits the new index once the delay has
/// passed and releases the lock. While locked, navigation and status
/// commands are no-ops.
#[derive(Debug)]
pub struct FocusNavigator {
    items: Vec<ItemId>,
    current: Option<usize>,
    direction: Direction,
    editing: bool,
    commenting: bool,
    pending: Option<PendingTransition>,
    transition_delay: TimeDelta,
    closed: bool,
}

impl FocusNavigator {
    /// Start at the first unreviewed item, or the first item when every
    /// item has a status.
    pub fn new(items: &[EffectiveItem], transition_delay: TimeDelta) -> Self {
        let current = if items.is_empty() {
            None
        } else {
            Some(
                items
                    .iter()
                    .position(|item| !item.status.is_reviewed())
                    .unwrap_or(0),
            )
        };
        Self {
            items: items.iter().map(|item| item.id.clone()).collect(),
            current,
            direction: Direction::Next,
            editing: false,
            commenting: false,
            pending: None,
            transition_delay,
            closed: false,
        }
    }

    pub fn items(&self) -> &[ItemId] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_item(&self) -> Option<&ItemId> {
        self.current.and_then(|index| self.items.get(index))
    }

    pub fn is_transitioning(&self) -> bool {
        self.pending.is_some()
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn is_editing(&self) -> bool {
        self.editing
    }

    pub fn is_commenting(&self) -> bool {
        self.commenting
    }

    pub fn go_to(&mut self, index: usize, direction: Direction, now: Timestamp) -> bool {
        if self.closed || index >= self.items.len() || self.pending.is_some() {
            return false;
        }
        self.direction = direction;
        self.editing = false;
        self.commenting = false;
        let due = now
            .checked_add_signed(self.transition_delay)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.pending = Some(PendingTransition { target: index, due });
        tracing::debug!(to = index, ?direction, "focus transition started");
        true
    }

    pub fn go_next(&mut self, now: Timestamp) -> bool {
        match self.current {
            Some(index) if index + 1 < self.items.len() => self.go_to(index + 1, Direction::Next, now),
            _ => false,
        }
    }

    pub fn go_prev(&mut self, now: Timestamp) -> bool {
        match self.current {
            Some(index) if index > 0 => self.go_to(index - 1, Direction::Prev, now),
            _ => false,
        }
    }

    /// Status the current item and advance when it is not the last one.
    /// Rejected while a transition is animating.
    pub fn handle_status(&mut self, status: ReviewStatus, now: Timestamp) -> FocusOutcome {
        if self.closed || self.pending.is_some() {
            return FocusOutcome::Ignored;
        }
        let Some(item_id) = self.current_item().cloned() else {
            return FocusOutcome::Ignored;
        };
        let advancing = self.go_next(now);
        FocusOutcome::ApplyStatus {
            item_id,
            status,
            advancing,
        }
    }

    pub fn toggle_edit(&mut self) -> bool {
        self.editing = !self.editing;
        self.editing
    }

    pub fn toggle_comment(&mut self) -> bool {
        self.commenting = !self.commenting;
        self.commenting
    }

    pub fn close_panel(&mut self, panel: Panel) {
        match panel {
            Panel::Edit => self.editing = false,
            Panel::Comment => self.commenting = false,
        }
    }

    pub fn dispatch(&mut self, command: FocusCommand, now: Timestamp) -> FocusOutcome {
        match command {
            FocusCommand::Status(status) => self.handle_status(status, now),
            FocusCommand::Next | FocusCommand::Skip => self.moved(|nav| nav.go_next(now)),
            FocusCommand::Prev => self.moved(|nav| nav.go_prev(now)),
            FocusCommand::ToggleEdit => FocusOutcome::PanelToggled {
                panel: Panel::Edit,
                open: self.toggle_edit(),
            },
            FocusCommand::ToggleComment => FocusOutcome::PanelToggled {
                panel: Panel::Comment,
                open: self.toggle_comment(),
            },
            FocusCommand::Escape => {
                if self.commenting {
                    self.commenting = false;
                    FocusOutcome::PanelToggled {
                        panel: Panel::Comment,
                        open: false,
                    }
                } else if self.editing {
                    self.editing = false;
                    FocusOutcome::PanelToggled {
                        panel: Panel::Edit,
                        open: false,
                    }
                } else {
                    FocusOutcome::Exit
                }
            }
        }
    }

    fn moved(&mut self, step: impl FnOnce(&mut Self) -> bool) -> FocusOutcome {
        if step(self) {
            match self.pending {
                Some(pending) => FocusOutcome::Moving {
                    target: pending.target,
                    direction: self.direction,
                },
                None => FocusOutcome::Ignored,
            }
        } else {
            FocusOutcome::Ignored
        }
    }

    /// Keyboard entry point. Keys are ignored while a panel is open or
    /// while the key landed in a text control.
    pub fn handle_key(&mut self, input: KeyInput, now: Timestamp) -> FocusOutcome {
        if self.editing || self.commenting || input.target.accepts_typing() {
            return FocusOutcome::Ignored;
        }
        match FocusCommand::for_key(input.key) {
            Some(command) => self.dispatch(command, now),
            None => FocusOutcome::Ignored,
        }
    }

    /// Commit a due transition. Returns the new index when one landed.
    pub fn poll(&mut self, now: Timestamp) -> Option<usize> {
        if self.closed {
            return None;
        }
        let pending = self.pending?;
        if pending.due > now {
            return None;
        }
        self.pending = None;
        self.current = Some(pending.target);
        tracing::debug!(index = pending.target, "focus transition committed");
        Some(pending.target)
    }

    /// Drop any pending transition; nothing fires afterwards.
    pub fn teardown(&mut self) {
        self.pending = None;
        self.closed = true;
    }
}
