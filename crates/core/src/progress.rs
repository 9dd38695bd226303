use serde::Serialize;

use crate::item::EffectiveItem;
use crate::status::ReviewStatus;

/// Review tallies over a list of effective items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub total: usize,
    pub reviewed: usize,
    pub use_count: usize,
    pub like_count: usize,
    pub remove_count: usize,
    pub edited: usize,
    pub commented: usize,
}

impl Progress {
    pub fn of(items: &[EffectiveItem]) -> Self {
        let mut progress = Self {
            total: items.len(),
            ..Self::default()
        };
        for item in items {
            match item.status {
                ReviewStatus::Unreviewed => {}
                ReviewStatus::Use => progress.use_count += 1,
                ReviewStatus::Like => progress.like_count += 1,
                ReviewStatus::Remove => progress.remove_count += 1,
            }
            if item.status.is_reviewed() {
                progress.reviewed += 1;
            }
            if item.is_edited {
                progress.edited += 1;
            }
            if item.has_comment() {
                progress.commented += 1;
            }
        }
        progress
    }

    /// Share of reviewed items, rounded to the nearest whole percent.
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        ((self.reviewed as f64 / self.total as f64) * 100.0).round() as u32
    }

    pub fn remaining(&self) -> usize {
        self.total - self.reviewed
    }
}
