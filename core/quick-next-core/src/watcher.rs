//! Page watcher: decides when the control should exist and in which state.
//!
//! The host page mutates constantly, so nothing here reacts to a mutation
//! directly. Each mutation batch either notices a URL change (SPA navigation)
//! and arms the navigation timer, or, when the URL is unchanged and a control
//! exists, arms the shorter refresh timer. Both timers are single-slot: a new
//! schedule replaces the pending one, so a burst of mutations costs one
//! evaluation.
//!
//! ```text
//! mutation ──► URL changed? ──yes──► Navigation (settle) ──► create / refresh / destroy
//!                  │
//!                  no, control present
//!                  ▼
//!              Refresh (debounce) ──► refresh_state
//! ```

use crate::config::QuickNextConfig;
use crate::control::{FloatingControl, MaterializeOutcome};
use crate::host::HostPage;
use crate::pagination::is_target_page;
use crate::timers::TimerSlots;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchTimer {
    /// First creation after the script starts.
    Startup,
    /// Re-evaluation after a URL change has settled.
    Navigation,
    /// Debounced state refresh after plain DOM churn.
    Refresh,
    /// Retry of a failed observer registration.
    Observe,
}

/// URL bookkeeping for spotting SPA navigation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationState {
    pub current_url: String,
    pub last_observed_url: String,
}

/// What a navigation evaluation decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    Created,
    Refreshed,
    Destroyed,
    Retrying,
    Unchanged,
}

pub struct PageWatcher {
    navigation: NavigationState,
    observing: bool,
    awaiting_dom_ready: bool,
    timers: TimerSlots<WatchTimer>,
    target_path: String,
    navigation_settle_ms: u64,
    refresh_debounce_ms: u64,
    startup_delay_ms: u64,
    retry_ms: u64,
}

impl PageWatcher {
    pub fn new(config: &QuickNextConfig) -> Self {
        Self {
            navigation: NavigationState::default(),
            observing: false,
            awaiting_dom_ready: false,
            timers: TimerSlots::new(),
            target_path: config.target_path.clone(),
            navigation_settle_ms: config.navigation_settle_ms,
            refresh_debounce_ms: config.refresh_debounce_ms,
            startup_delay_ms: config.startup_delay_ms,
            retry_ms: config.not_ready_retry_ms,
        }
    }

    pub fn navigation(&self) -> &NavigationState {
        &self.navigation
    }

    pub fn is_observing(&self) -> bool {
        self.observing
    }

    pub fn is_pending(&self, timer: WatchTimer) -> bool {
        self.timers.is_pending(timer)
    }

    /// Begins observing and arms the initial creation. Idempotent: returns
    /// false if already started.
    pub fn start(&mut self, host: &mut dyn HostPage, now: u64) -> bool {
        if self.observing || self.timers.is_pending(WatchTimer::Observe) {
            return false;
        }

        match host.current_url() {
            Ok(url) => {
                tracing::info!(url = %url, "Quick Next starting");
                self.navigation.current_url = url.clone();
                self.navigation.last_observed_url = url;
            }
            Err(err) => tracing::debug!(error = %err, "URL unavailable at start"),
        }

        self.register_observer(host, now);

        if host.is_ready() {
            self.timers
                .schedule(WatchTimer::Startup, now, self.startup_delay_ms);
        } else {
            self.awaiting_dom_ready = true;
        }
        true
    }

    /// The host's DOMContentLoaded.
    pub fn on_dom_ready(&mut self, now: u64) {
        if std::mem::take(&mut self.awaiting_dom_ready) {
            self.timers.schedule(WatchTimer::Startup, now, 0);
        }
    }

    fn register_observer(&mut self, host: &mut dyn HostPage, now: u64) {
        match host.observe_mutations() {
            Ok(()) => self.observing = true,
            Err(err) => {
                tracing::warn!(error = %err, "Mutation observer unavailable; retrying");
                self.timers.schedule(WatchTimer::Observe, now, self.retry_ms);
            }
        }
    }

    /// One batch of DOM mutations was delivered.
    pub fn on_mutation(&mut self, host: &dyn HostPage, control_present: bool, now: u64) {
        let url = match host.current_url() {
            Ok(url) => url,
            Err(err) => {
                // The batch may have carried a navigation; re-check once the URL is readable.
                tracing::debug!(error = %err, "URL unavailable during mutation; retrying");
                self.timers.schedule(WatchTimer::Navigation, now, self.retry_ms);
                return;
            }
        };
        self.navigation.current_url = url.clone();

        if url != self.navigation.last_observed_url {
            tracing::info!(url = %url, "URL changed");
            self.navigation.last_observed_url = url;
            self.timers.cancel(WatchTimer::Navigation);
            self.timers
                .schedule(WatchTimer::Navigation, now, self.navigation_settle_ms);
        } else if control_present {
            self.timers
                .schedule(WatchTimer::Refresh, now, self.refresh_debounce_ms);
        }
    }

    /// Creates, refreshes or removes the control to match the current URL.
    pub fn evaluate_navigation(
        &mut self,
        host: &mut dyn HostPage,
        control: &mut FloatingControl,
        now: u64,
    ) -> Evaluation {
        let url = match host.current_url() {
            Ok(url) => url,
            Err(err) => {
                tracing::debug!(error = %err, "URL unavailable; retrying evaluation");
                self.timers.schedule(WatchTimer::Navigation, now, self.retry_ms);
                return Evaluation::Retrying;
            }
        };
        self.navigation.current_url = url.clone();
        self.navigation.last_observed_url = url.clone();

        let present = control.state().is_present();
        if is_target_page(&url, &self.target_path) {
            if present {
                tracing::debug!("Refreshing existing control after navigation");
                control.refresh_state(host);
                return Evaluation::Refreshed;
            }
            match control.materialize(host) {
                MaterializeOutcome::Created(_) => Evaluation::Created,
                MaterializeOutcome::AlreadyPresent => Evaluation::Unchanged,
                MaterializeOutcome::Deferred => {
                    self.timers.schedule(WatchTimer::Navigation, now, self.retry_ms);
                    Evaluation::Retrying
                }
            }
        } else if present {
            tracing::debug!(url = %url, "Left target page; removing control");
            control.destroy(host);
            Evaluation::Destroyed
        } else {
            Evaluation::Unchanged
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Timers
    // ─────────────────────────────────────────────────────────────────────

    pub fn peek_due(&self, now: u64) -> Option<u64> {
        self.timers.peek_due(now)
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.timers.peek_due(u64::MAX)
    }

    /// Fires the earliest due timer, if any. Returns false when nothing was due.
    pub fn fire_due(
        &mut self,
        host: &mut dyn HostPage,
        control: &mut FloatingControl,
        now: u64,
    ) -> bool {
        let Some(timer) = self.timers.pop_due(now) else {
            return false;
        };
        match timer {
            WatchTimer::Startup => {
                if host.is_ready() {
                    let outcome = self.evaluate_navigation(host, control, now);
                    tracing::debug!(?outcome, "Startup evaluation");
                } else {
                    tracing::debug!("Host not ready at startup; retrying");
                    self.timers.schedule(WatchTimer::Startup, now, self.retry_ms);
                }
            }
            WatchTimer::Navigation => {
                let outcome = self.evaluate_navigation(host, control, now);
                tracing::debug!(?outcome, "Navigation evaluation");
            }
            WatchTimer::Refresh => {
                control.refresh_state(host);
            }
            WatchTimer::Observe => self.register_observer(host, now),
        }
        true
    }
}
