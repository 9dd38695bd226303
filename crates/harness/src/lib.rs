//! Test support: a hand-driven clock, an in-process remote with fault
//! injection, and canned catalogs.

mod clock;
mod fixtures;
mod remote;

pub use clock::ManualClock;
pub use fixtures::{
    REVIEW_ID, TestSession, item_id, numbered_catalog, sample_catalog, sample_items,
};
pub use remote::SimulatedRemote;
