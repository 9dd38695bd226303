pub mod config;
pub mod error;
pub mod focus;
pub mod overlay;
pub mod save_state;
pub mod session;
pub mod sync;
pub mod timers;
pub mod transport;

pub use config::SessionConfig;
pub use error::EngineError;
pub use focus::{
    Direction, FocusCommand, FocusNavigator, FocusOutcome, Key, KeyInput, KeyTarget, Panel,
};
pub use overlay::{OverlayStore, Versioned};
pub use save_state::{SaveKey, SaveTracker};
pub use session::{ReviewSession, SessionBuilder, load_catalog};
pub use sync::{SyncController, SyncEvent};
pub use timers::{DeferredTasks, Fired};
pub use transport::{Completion, DirectTransport, RemoteRequest, RemoteResponse, Transport};
