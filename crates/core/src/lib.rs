pub mod catalog;
pub mod clock;
pub mod error;
pub mod export;
pub mod filter;
pub mod ids;
pub mod item;
pub mod merge;
pub mod progress;
pub mod records;
pub mod status;

pub use catalog::Catalog;
pub use clock::{Clock, SystemClock, Timestamp};
pub use error::CoreError;
pub use filter::{ContentKind, ItemFilter};
pub use ids::*;
pub use item::{ContentItem, EffectiveItem};
pub use merge::merge;
pub use progress::Progress;
pub use records::{CommentRecord, EditPatch, EditRecord, OverlaySnapshot, StatusRecord};
pub use status::{Channel, ReviewStatus, SaveState};
