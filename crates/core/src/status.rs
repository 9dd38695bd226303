use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    #[default]
    Unreviewed,
    Use,
    Like,
    Remove,
}

impl ReviewStatus {
    pub const ALL: [ReviewStatus; 4] = [Self::Unreviewed, Self::Use, Self::Like, Self::Remove];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unreviewed => "unreviewed",
            Self::Use => "use",
            Self::Like => "like",
            Self::Remove => "remove",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "unreviewed" => Ok(Self::Unreviewed),
            "use" => Ok(Self::Use),
            "like" => Ok(Self::Like),
            "remove" => Ok(Self::Remove),
            _ => Err(CoreError::UnknownStatus(s.to_string())),
        }
    }

    pub fn is_reviewed(&self) -> bool {
        !matches!(self, Self::Unreviewed)
    }

    /// Status that results from choosing `requested` while `self` is active.
    /// Choosing the active status again clears it.
    pub fn toggle(self, requested: ReviewStatus) -> ReviewStatus {
        if self == requested {
            Self::Unreviewed
        } else {
            requested
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Life cycle of one pending remote mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveState {
    #[default]
    Idle,
    Saving,
    Saved,
    Error,
}

impl SaveState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Saving => "saving",
            Self::Saved => "saved",
            Self::Error => "error",
        }
    }

    /// Ordering used when several channels of one item are folded into a
    /// single indicator: an error outranks an in-flight save, which outranks
    /// a fresh confirmation.
    pub fn severity(&self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Saved => 1,
            Self::Saving => 2,
            Self::Error => 3,
        }
    }
}

impl fmt::Display for SaveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overlay stream a mutation belongs to. Each channel has its own
/// save-state per item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Status,
    Edits,
    Comment,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Self::Status, Self::Edits, Self::Comment];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Edits => "edits",
            Self::Comment => "comment",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
