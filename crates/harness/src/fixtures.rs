use curate_core::{Catalog, ContentItem, CoreError, EffectiveItem, ItemId};
use curate_engine::{EngineError, ReviewSession, SessionConfig, SyncEvent};
use curate_storage::StorageError;

use crate::{ManualClock, SimulatedRemote};

pub const REVIEW_ID: &str = "review-1";

pub fn item_id(id: &str) -> ItemId {
    ItemId::new(id)
}

/// Five items across two categories; two carry media.
pub fn sample_items() -> Vec<ContentItem> {
    vec![
        ContentItem::new("a", "Harbour at dawn")
            .with_category("Photos")
            .with_description("Fishing boats leaving the harbour")
            .with_media("https://cdn.example.com/a.jpg"),
        ContentItem::new("b", "Quarterly letter")
            .with_category("Articles")
            .with_description("Notes from the editor")
            .with_link("https://example.com/letter"),
        ContentItem::new("c", "Market stalls")
            .with_category("Photos")
            .with_media("https://cdn.example.com/c.jpg"),
        ContentItem::new("d", "Reading list").with_category("Articles"),
        ContentItem::new("e", "Untitled draft"),
    ]
}

pub fn sample_catalog() -> Result<Catalog, CoreError> {
    Catalog::new(sample_items())
}

/// Catalog of `n` bare items with ids `item-0 .. item-{n-1}`.
pub fn numbered_catalog(n: usize) -> Result<Catalog, CoreError> {
    Catalog::new(
        (0..n)
            .map(|i| ContentItem::new(format!("item-{i}"), format!("Item {i}")))
            .collect(),
    )
}

/// A session wired to a simulated remote and a manual clock, with handles
/// to both kept for steering.
pub struct TestSession {
    pub session: ReviewSession,
    pub clock: ManualClock,
    pub remote: SimulatedRemote,
}

impl TestSession {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self::with_catalog(sample_catalog()?, SimulatedRemote::new()?)?)
    }

    pub fn with_catalog(catalog: Catalog, remote: SimulatedRemote) -> Result<Self, EngineError> {
        Self::with_config(catalog, remote, SessionConfig::default())
    }

    pub fn with_config(
        catalog: Catalog,
        remote: SimulatedRemote,
        config: SessionConfig,
    ) -> Result<Self, EngineError> {
        let clock = ManualClock::new();
        let session = ReviewSession::builder(REVIEW_ID, catalog)
            .remote(remote.clone())
            .clock(clock.clone())
            .config(config)
            .open()?;
        Ok(Self {
            session,
            clock,
            remote,
        })
    }

    /// Session with no remote configured.
    pub fn local_only() -> Result<(ReviewSession, ManualClock), Box<dyn std::error::Error>> {
        let clock = ManualClock::new();
        let session = ReviewSession::builder(REVIEW_ID, sample_catalog()?)
            .clock(clock.clone())
            .open()?;
        Ok((session, clock))
    }

    pub fn pump(&mut self) -> Vec<SyncEvent> {
        self.session.pump()
    }

    /// Move the clock forward, then pump.
    pub fn advance_ms(&mut self, ms: i64) -> Vec<SyncEvent> {
        self.clock.advance_ms(ms);
        self.session.pump()
    }

    pub fn item(&self, id: &str) -> Option<EffectiveItem> {
        self.session.item(&item_id(id))
    }

    pub fn stored(&self) -> Result<curate_core::OverlaySnapshot, StorageError> {
        self.remote.stored(self.session.review_id())
    }
}
