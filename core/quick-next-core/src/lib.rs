//! # quick-next-core
//!
//! Engine behind the Quick Next floating button: a "Next" control injected into
//! a job-search page that clicks the site's own pagination for you.
//!
//! ## Design Principles
//!
//! - **Host-driven**: no DOM, clock or runtime dependency. A host shim forwards
//!   events and time; the engine answers through the [`HostPage`] trait.
//! - **Single-threaded**: one engine per page context, owned by the
//!   [`InstanceRegistry`]. Shared handles are `Rc<RefCell<_>>`.
//! - **Graceful degradation**: lookup misses, storage outages and host errors
//!   are logged and absorbed; nothing here takes the page down.
//! - **Deterministic**: every timer is a deadline in host milliseconds, so the
//!   whole lifecycle can be replayed in tests.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use quick_next_core::{QuickNext, QuickNextConfig, MemoryStorage, SimulatedPage};
//!
//! let page = SimulatedPage::new("https://www.linkedin.com/jobs/search/");
//! page.add_next_button();
//! let mut engine = QuickNext::new(Box::new(page), Box::new(MemoryStorage::new()), QuickNextConfig::default());
//! engine.start(0);
//! engine.advance(1000); // control created
//! ```

pub mod config;
pub mod control;
pub mod drag;
pub mod engine;
pub mod error;
pub mod host;
pub mod pagination;
pub mod popup;
pub mod registry;
pub mod sim;
pub mod storage;
pub mod timers;
pub mod types;
pub mod watcher;

pub use config::{load_config, load_default_config, QuickNextConfig};
pub use control::{ClickOutcome, FloatingControl, MaterializeOutcome, TriggerAttempt};
pub use engine::QuickNext;
pub use error::{HostError, QuickNextError, Result};
pub use host::{AdvisoryId, ControlMarkup, ElementInfo, HostPage, BUTTON_ID, CONTROL_ID};
pub use popup::{handle_message, handle_request, tab_status, TabStatus};
pub use registry::{ContextId, InstanceRegistry, SharedEngine};
pub use sim::{PageSetup, SimulatedPage};
pub use storage::{
    JsonFileStorage, KeyValueStorage, MemoryStorage, PositionStore, StorageProvider,
    UnavailableStorage,
};
pub use types::*;
pub use watcher::{Evaluation, NavigationState, PageWatcher};
