//! QuickNext - the entry point a host shim drives.
//!
//! The engine is host-driven and synchronous:
//! - **Events in**: the shim forwards DOM-ready, mutation batches, pointer and
//!   click events on the control, each stamped with the current time.
//! - **Timers out**: the engine never sleeps. The shim asks for
//!   [`QuickNext::next_deadline`], arms one real timer for it, and calls
//!   [`QuickNext::advance`] when it fires.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use quick_next_core::{QuickNext, QuickNextConfig, MemoryStorage, SimulatedPage};
//!
//! let page = SimulatedPage::new("https://www.linkedin.com/jobs/search/");
//! let mut engine = QuickNext::new(Box::new(page), Box::new(MemoryStorage::new()), QuickNextConfig::default());
//! engine.start(0);
//! engine.advance(1000);
//! ```

use quick_next_protocol::TriggerOutcome;

use crate::config::QuickNextConfig;
use crate::control::{ClickOutcome, FloatingControl, MaterializeOutcome, TriggerAttempt};
use crate::error::Result;
use crate::host::{HostPage, CONTROL_ID};
use crate::pagination::{activate, find_next_control, log_pagination_candidates};
use crate::storage::{KeyValueStorage, PositionStore};
use crate::types::{ControlState, Point, Position};
use crate::watcher::{NavigationState, PageWatcher};

/// Upper bound on timers fired by one `advance` call. Zero-delay retries
/// against a host that never becomes ready would otherwise spin.
const MAX_FIRES_PER_ADVANCE: usize = 256;

pub struct QuickNext {
    host: Box<dyn HostPage>,
    config: QuickNextConfig,
    watcher: PageWatcher,
    control: FloatingControl,
}

impl QuickNext {
    pub fn new(
        host: Box<dyn HostPage>,
        storage: Box<dyn KeyValueStorage>,
        config: QuickNextConfig,
    ) -> Self {
        let store = PositionStore::new(
            storage,
            config.storage_key.clone(),
            config.default_position(),
        );
        Self {
            watcher: PageWatcher::new(&config),
            control: FloatingControl::new(&config, store),
            host,
            config,
        }
    }

    /// Loads the saved position, then starts watching. The control is only
    /// created after the load, so it never flashes at the default spot.
    pub fn start(&mut self, now: u64) -> bool {
        if self.watcher.is_observing() {
            return false;
        }
        self.control.load_position();
        self.watcher.start(self.host.as_mut(), now)
    }

    pub fn on_dom_ready(&mut self, now: u64) {
        self.watcher.on_dom_ready(now);
    }

    pub fn on_mutation(&mut self, now: u64) {
        let present = self.control.state().is_present();
        self.watcher.on_mutation(self.host.as_ref(), present, now);
    }

    pub fn pointer_down(&mut self, point: Point) {
        self.control.pointer_down(self.host.as_mut(), point);
    }

    pub fn pointer_move(&mut self, point: Point) {
        self.control.pointer_move(self.host.as_mut(), point);
    }

    pub fn pointer_up(&mut self, now: u64) -> bool {
        self.control.pointer_up(now)
    }

    pub fn click(&mut self, now: u64) -> ClickOutcome {
        self.control.click(self.host.as_mut(), now)
    }

    /// Runs the control's trigger regardless of gesture state.
    pub fn trigger(&mut self, now: u64) -> TriggerAttempt {
        self.control.trigger(self.host.as_mut(), now)
    }

    /// Fires every timer due at `now`, earliest first. Returns how many fired.
    pub fn advance(&mut self, now: u64) -> usize {
        let mut fired = 0;
        while fired < MAX_FIRES_PER_ADVANCE {
            let watch_due = self.watcher.peek_due(now);
            let control_due = self.control.peek_due(now);
            let progressed = match (watch_due, control_due) {
                (None, None) => break,
                (Some(w), Some(c)) if c < w => self.control.fire_due(self.host.as_mut(), now),
                (Some(_), _) => {
                    self.watcher
                        .fire_due(self.host.as_mut(), &mut self.control, now)
                }
                (None, Some(_)) => self.control.fire_due(self.host.as_mut(), now),
            };
            if !progressed {
                break;
            }
            fired += 1;
        }
        if fired == MAX_FIRES_PER_ADVANCE {
            tracing::warn!(now, "Timer budget exhausted; remaining timers deferred");
        }
        fired
    }

    /// Earliest pending deadline, for the host to arm a real timer.
    pub fn next_deadline(&self) -> Option<u64> {
        match (self.watcher.next_deadline(), self.control.next_deadline()) {
            (Some(w), Some(c)) => Some(w.min(c)),
            (w, c) => w.or(c),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Popup-facing operations
    // ─────────────────────────────────────────────────────────────────────

    pub fn is_visible(&self) -> bool {
        self.host.element_exists(CONTROL_ID)
    }

    pub fn materialize(&mut self) -> MaterializeOutcome {
        self.control.materialize(self.host.as_mut())
    }

    pub fn destroy(&mut self) -> bool {
        self.control.destroy(self.host.as_mut())
    }

    /// Like [`destroy`](Self::destroy), but also clears an element with the
    /// control's id that this engine did not create.
    pub fn hide(&mut self) -> bool {
        self.control.remove_any(self.host.as_mut())
    }

    /// Tears the control down and injects a fresh one, whatever the URL.
    /// Returns whether a control is present afterwards.
    pub fn reinject(&mut self) -> bool {
        self.control.remove_any(self.host.as_mut());
        self.control.materialize(self.host.as_mut());
        self.control.state().is_present()
    }

    /// Activates the host's next control without going through the floating
    /// control or its in-flight guard.
    pub fn trigger_direct(&mut self) -> TriggerOutcome {
        let Some(next) = find_next_control(self.host.as_ref(), &self.config.next_selectors) else {
            log_pagination_candidates(self.host.as_ref());
            return TriggerOutcome::NotFound;
        };
        match activate(self.host.as_mut(), &next) {
            Ok(()) => TriggerOutcome::Success {
                selector: next.selector,
            },
            Err(err) => {
                tracing::warn!(error = %err, "Direct trigger failed");
                TriggerOutcome::NotFound
            }
        }
    }

    pub fn reset_position(&mut self) -> Result<Position> {
        self.control.reset_position(self.host.as_mut())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Inspection
    // ─────────────────────────────────────────────────────────────────────

    pub fn state(&self) -> ControlState {
        self.control.state()
    }

    pub fn position(&self) -> Position {
        self.control.position()
    }

    pub fn is_processing(&self) -> bool {
        self.control.is_processing()
    }

    pub fn is_dragging(&self) -> bool {
        self.control.is_dragging()
    }

    pub fn navigation(&self) -> &NavigationState {
        self.watcher.navigation()
    }

    pub fn is_target_page(&self) -> bool {
        self.host
            .current_url()
            .map(|url| crate::pagination::is_target_page(&url, &self.config.target_path))
            .unwrap_or(false)
    }
}
