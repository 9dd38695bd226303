use curate_core::{Channel, CoreError, ItemId};
use curate_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("load failed: {0}")]
    Load(String),

    #[error("save failed for {item_id} ({channel}): {reason}")]
    Save {
        item_id: ItemId,
        channel: Channel,
        reason: String,
    },

    #[error("unknown item: {0}")]
    UnknownItem(String),

    #[error("nothing to retry for {item_id} ({channel})")]
    NothingToRetry { item_id: ItemId, channel: Channel },

    #[error("focus mode is not active")]
    FocusInactive,

    #[error("session closed")]
    SessionClosed,

    #[error("config error: {0}")]
    Config(String),
}
