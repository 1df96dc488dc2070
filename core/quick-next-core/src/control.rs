//! The floating "Next" control.
//!
//! Owns the injected element's lifecycle, its on-screen position, the
//! click/drag gesture handling and the trigger that activates the host page's
//! own pagination.
//!
//! # Guards
//!
//! Two flags keep the gestures honest:
//!
//! - `processing` is set for the whole life of a trigger attempt, up to and
//!   including the settle delay. Repeated clicks inside that window are
//!   absorbed, and state refreshes are skipped so they cannot race the click.
//! - `is_dragging` is raised once a press moves past the drag threshold and is
//!   lowered shortly *after* release, so the click the host delivers with the
//!   same release still sees it and is suppressed.

use crate::config::QuickNextConfig;
use crate::drag::DragSession;
use crate::error::QuickNextError;
use crate::host::{AdvisoryId, ControlMarkup, HostPage};
use crate::pagination::{activate, find_next_control, log_pagination_candidates};
use crate::storage::PositionStore;
use crate::timers::TimerSlots;
use crate::types::{ControlState, Point, Position};

pub const NO_NEXT_PAGE_MESSAGE: &str = "No next page available";
pub const ACTIVATION_FAILED_MESSAGE: &str = "Error clicking next button";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlTimer {
    /// End of the post-trigger settle delay.
    TriggerSettle,
    /// Lowers the drag latch after a release.
    DragLatch,
    AdvisoryDismiss(AdvisoryId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterializeOutcome {
    Created(ControlState),
    /// This control, or a leftover element with the reserved id, is already in the page.
    AlreadyPresent,
    /// The host could not take the element yet; retry later.
    Deferred,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerAttempt {
    /// A previous attempt is still in flight.
    Ignored,
    Activated { selector: String },
    NoNextPage,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    SuppressedByDrag,
    NotClickable,
    Triggered(TriggerAttempt),
}

pub struct FloatingControl {
    markup: ControlMarkup,
    selectors: Vec<String>,
    store: PositionStore,
    state: ControlState,
    position: Position,
    processing: bool,
    is_dragging: bool,
    drag: Option<DragSession>,
    timers: TimerSlots<ControlTimer>,
    trigger_settle_ms: u64,
    advisory_ms: u64,
    drag_threshold_px: f64,
    drag_release_ms: u64,
}

impl FloatingControl {
    pub fn new(config: &QuickNextConfig, store: PositionStore) -> Self {
        Self {
            markup: ControlMarkup::default(),
            selectors: config.next_selectors.clone(),
            position: store.default_position(),
            store,
            state: ControlState::Absent,
            processing: false,
            is_dragging: false,
            drag: None,
            timers: TimerSlots::new(),
            trigger_settle_ms: config.trigger_settle_ms,
            advisory_ms: config.advisory_ms,
            drag_threshold_px: config.drag_threshold_px,
            drag_release_ms: config.drag_release_ms,
        }
    }

    pub fn state(&self) -> ControlState {
        self.state
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    pub fn is_dragging(&self) -> bool {
        self.is_dragging
    }

    pub fn can_click(&self) -> bool {
        self.state.can_click()
    }

    /// Reads the persisted position into memory.
    pub fn load_position(&mut self) -> Position {
        self.position = self.store.load();
        tracing::debug!(position = ?self.position, "Loaded control position");
        self.position
    }

    // ─────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────

    pub fn materialize(&mut self, host: &mut dyn HostPage) -> MaterializeOutcome {
        if self.state.is_present() || host.element_exists(&self.markup.container_id) {
            return MaterializeOutcome::AlreadyPresent;
        }

        let position = self.load_position();
        if let Err(err) = host.inject_control(&self.markup, &position) {
            tracing::warn!(error = %err, "Failed to inject control; will retry");
            return MaterializeOutcome::Deferred;
        }

        let state = self.derive_state(host);
        self.apply_state(host, state);
        tracing::info!(state = ?state, position = ?position, "Control created");
        MaterializeOutcome::Created(state)
    }

    /// Removes the control. Returns false when there was nothing to remove.
    pub fn destroy(&mut self, host: &mut dyn HostPage) -> bool {
        if !self.state.is_present() {
            return false;
        }

        host.remove_control(&self.markup.container_id);
        self.state = ControlState::Absent;
        self.drag = None;
        self.is_dragging = false;
        self.processing = false;
        self.timers.cancel(ControlTimer::TriggerSettle);
        self.timers.cancel(ControlTimer::DragLatch);
        tracing::info!("Control removed");
        true
    }

    /// Removes this control or, failing that, any leftover element holding
    /// its id. Returns false when the page had neither.
    pub fn remove_any(&mut self, host: &mut dyn HostPage) -> bool {
        if self.destroy(host) {
            return true;
        }
        if !host.element_exists(&self.markup.container_id) {
            return false;
        }
        host.remove_control(&self.markup.container_id);
        tracing::info!("Removed leftover control element");
        true
    }

    /// Re-derives Enabled/Disabled from the host's pagination. Skipped while a
    /// trigger is in flight or when there is no control.
    pub fn refresh_state(&mut self, host: &mut dyn HostPage) -> ControlState {
        if self.processing || !self.state.is_present() {
            return self.state;
        }

        let state = self.derive_state(host);
        if state != self.state {
            tracing::debug!(from = ?self.state, to = ?state, "Control state changed");
            self.apply_state(host, state);
        }
        self.state
    }

    fn derive_state(&self, host: &dyn HostPage) -> ControlState {
        ControlState::from_affordance(find_next_control(host, &self.selectors).is_some())
    }

    fn apply_state(&mut self, host: &mut dyn HostPage, state: ControlState) {
        self.state = state;
        host.set_control_enabled(state.can_click());
    }

    // ─────────────────────────────────────────────────────────────────────
    // Trigger
    // ─────────────────────────────────────────────────────────────────────

    pub fn trigger(&mut self, host: &mut dyn HostPage, now: u64) -> TriggerAttempt {
        if self.processing {
            tracing::debug!("Trigger ignored; previous attempt in flight");
            return TriggerAttempt::Ignored;
        }
        self.processing = true;

        let attempt = match find_next_control(host, &self.selectors) {
            Some(next) => match activate(host, &next) {
                Ok(()) => {
                    tracing::info!(selector = %next.selector, "Activated next-page control");
                    TriggerAttempt::Activated {
                        selector: next.selector,
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, "Activating next-page control failed");
                    self.show_advisory(host, ACTIVATION_FAILED_MESSAGE, now);
                    TriggerAttempt::Failed
                }
            },
            None => {
                tracing::info!(error = %QuickNextError::LookupMiss, "Trigger found nothing to click");
                log_pagination_candidates(host);
                self.show_advisory(host, NO_NEXT_PAGE_MESSAGE, now);
                TriggerAttempt::NoNextPage
            }
        };

        // `processing` drops when this fires, whatever the outcome above.
        self.timers
            .schedule(ControlTimer::TriggerSettle, now, self.trigger_settle_ms);
        attempt
    }

    fn show_advisory(&mut self, host: &mut dyn HostPage, text: &str, now: u64) {
        let id = host.show_advisory(text);
        self.timers
            .schedule(ControlTimer::AdvisoryDismiss(id), now, self.advisory_ms);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Pointer / touch gestures
    // ─────────────────────────────────────────────────────────────────────

    pub fn pointer_down(&mut self, host: &mut dyn HostPage, pointer: Point) {
        if !self.state.is_present() {
            return;
        }
        let Some(rect) = host.control_rect() else {
            tracing::debug!("Press ignored; control has no layout box");
            return;
        };
        self.drag = Some(DragSession::begin(pointer, rect));
        self.is_dragging = false;
        self.timers.cancel(ControlTimer::DragLatch);
    }

    pub fn pointer_move(&mut self, host: &mut dyn HostPage, pointer: Point) {
        let viewport = host.viewport();
        let Some(session) = self.drag.as_mut() else {
            return;
        };
        let Some(top_left) = session.update(pointer, self.drag_threshold_px, viewport) else {
            return;
        };

        self.is_dragging = true;
        self.position = Position::absolute(top_left.x, top_left.y);
        if let Err(err) = host.apply_position(&self.position) {
            tracing::debug!(error = %err, "Failed to apply drag position");
        }
    }

    /// Ends the gesture. Returns true when it was a drag.
    pub fn pointer_up(&mut self, now: u64) -> bool {
        let Some(session) = self.drag.take() else {
            return false;
        };
        if !session.has_exceeded_threshold() {
            return false;
        }

        if let Some(top_left) = session.last_position() {
            self.position = Position::absolute(top_left.x, top_left.y);
            self.store.save_detached(&self.position);
        }
        self.timers
            .schedule(ControlTimer::DragLatch, now, self.drag_release_ms);
        true
    }

    /// Click on the control's button.
    pub fn click(&mut self, host: &mut dyn HostPage, now: u64) -> ClickOutcome {
        if self.is_dragging {
            return ClickOutcome::SuppressedByDrag;
        }
        if !self.can_click() {
            return ClickOutcome::NotClickable;
        }
        ClickOutcome::Triggered(self.trigger(host, now))
    }

    /// Puts the control back in its anchored default corner.
    pub fn reset_position(&mut self, host: &mut dyn HostPage) -> Result<Position, QuickNextError> {
        self.position = self.store.reset()?;
        if self.state.is_present() {
            host.apply_position(&self.position)?;
        }
        Ok(self.position)
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
    pub fn fire_due(&mut self, host: &mut dyn HostPage, now: u64) -> bool {
        let Some(timer) = self.timers.pop_due(now) else {
            return false;
        };
        match timer {
            ControlTimer::TriggerSettle => {
                self.processing = false;
                self.refresh_state(host);
            }
            ControlTimer::DragLatch => self.is_dragging = false,
            ControlTimer::AdvisoryDismiss(id) => host.dismiss_advisory(id),
        }
        true
    }
}
