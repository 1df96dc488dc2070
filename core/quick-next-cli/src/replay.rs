//! Replays a scripted page session against the simulated page.
//!
//! A trace is a page description plus time-stamped events. The engine is
//! started at t=0; before each event every timer due at its timestamp fires,
//! so the report reflects exactly what a real tab would have seen.
//!
//! ```json
//! {
//!   "page": { "url": "https://www.linkedin.com/jobs/search/", "remaining_pages": 2 },
//!   "events": [
//!     { "at_ms": 1200, "event": { "type": "click" } },
//!     { "at_ms": 2000, "event": { "type": "advance" } }
//!   ]
//! }
//! ```

use std::path::Path;

use quick_next_core::{
    handle_request, ClickOutcome, ContextId, ControlState, InstanceRegistry, KeyValueStorage,
    PageSetup, Point, Position, QuickNext, QuickNextConfig, SimulatedPage, TriggerAttempt,
};
use quick_next_protocol::{PopupRequest, PopupResponse};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Trace {
    #[serde(default)]
    pub page: PageSetup,
    #[serde(default)]
    pub events: Vec<TimedEvent>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimedEvent {
    pub at_ms: u64,
    pub event: TraceEvent,
}

/// One host-side event. DOM-changing events (`navigate`, `set_next_button`)
/// also deliver a mutation batch, as the real page would.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TraceEvent {
    Mutation,
    Navigate { url: String },
    DomReady,
    PointerDown { x: f64, y: f64 },
    PointerMove { x: f64, y: f64 },
    PointerUp,
    Click,
    SetNextButton {
        present: bool,
        #[serde(default)]
        disabled: bool,
    },
    Popup { request: PopupRequest },
    /// Only fires due timers.
    Advance,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub url: String,
    pub state: ControlState,
    pub position: Position,
    pub processing: bool,
    pub native_activations: u32,
    pub synthetic_clicks: u32,
    pub advisories: Vec<String>,
    pub clicks: Vec<String>,
    pub popup_responses: Vec<PopupResponse>,
    pub pending_deadline: Option<u64>,
}

pub fn load_trace(path: &Path) -> Result<Trace, String> {
    let content = fs_err::read_to_string(path).map_err(|err| err.to_string())?;
    serde_json::from_str(&content).map_err(|err| format!("Invalid trace {}: {}", path.display(), err))
}

pub fn run(
    trace: &Trace,
    config: QuickNextConfig,
    storage: Box<dyn KeyValueStorage>,
) -> Result<ReplayReport, String> {
    let page = SimulatedPage::from_setup(&trace.page);
    let registry = InstanceRegistry::new();
    let context = ContextId::new("replay");
    let engine = registry.get_or_create(&context, || {
        QuickNext::new(Box::new(page.clone()), storage, config)
    });
    engine.borrow_mut().start(0);

    let mut clicks = Vec::new();
    let mut popup_responses = Vec::new();
    let mut last_at = 0;

    for (index, timed) in trace.events.iter().enumerate() {
        if timed.at_ms < last_at {
            return Err(format!(
                "Event {} at {}ms is earlier than the previous event at {}ms",
                index, timed.at_ms, last_at
            ));
        }
        last_at = timed.at_ms;
        let now = timed.at_ms;
        engine.borrow_mut().advance(now);
        tracing::debug!(at_ms = now, event = ?timed.event, "Replaying event");

        match &timed.event {
            TraceEvent::Mutation => engine.borrow_mut().on_mutation(now),
            TraceEvent::Navigate { url } => {
                page.navigate(url);
                engine.borrow_mut().on_mutation(now);
            }
            TraceEvent::DomReady => {
                page.set_ready(true);
                engine.borrow_mut().on_dom_ready(now);
            }
            TraceEvent::PointerDown { x, y } => engine.borrow_mut().pointer_down(Point::new(*x, *y)),
            TraceEvent::PointerMove { x, y } => engine.borrow_mut().pointer_move(Point::new(*x, *y)),
            TraceEvent::PointerUp => {
                engine.borrow_mut().pointer_up(now);
            }
            TraceEvent::Click => {
                let outcome = engine.borrow_mut().click(now);
                clicks.push(describe_click(&outcome));
            }
            TraceEvent::SetNextButton { present, disabled } => {
                page.remove_next_button();
                if *present {
                    page.add_next_button();
                    page.set_next_disabled(*disabled);
                }
                engine.borrow_mut().on_mutation(now);
            }
            TraceEvent::Popup { request } => {
                popup_responses.push(handle_request(&registry, &context, request));
            }
            TraceEvent::Advance => {}
        }
    }

    let engine = engine.borrow();
    Ok(ReplayReport {
        url: page.url(),
        state: engine.state(),
        position: engine.position(),
        processing: engine.is_processing(),
        native_activations: page.direct_clicks(),
        synthetic_clicks: page.dispatched_clicks(),
        advisories: page.advisory_history(),
        clicks,
        popup_responses,
        pending_deadline: engine.next_deadline(),
    })
}

fn describe_click(outcome: &ClickOutcome) -> String {
    match outcome {
        ClickOutcome::SuppressedByDrag => "suppressed_by_drag".to_string(),
        ClickOutcome::NotClickable => "not_clickable".to_string(),
        ClickOutcome::Triggered(TriggerAttempt::Ignored) => "ignored".to_string(),
        ClickOutcome::Triggered(TriggerAttempt::Activated { selector }) => {
            format!("activated:{selector}")
        }
        ClickOutcome::Triggered(TriggerAttempt::NoNextPage) => "no_next_page".to_string(),
        ClickOutcome::Triggered(TriggerAttempt::Failed) => "failed".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quick_next_core::MemoryStorage;

    fn replay(json: &str) -> ReplayReport {
        let trace: Trace = serde_json::from_str(json).unwrap();
        run(&trace, QuickNextConfig::default(), Box::new(MemoryStorage::new())).unwrap()
    }

    #[test]
    fn test_click_through_two_pages() {
        let report = replay(
            r#"{
                "page": {"remaining_pages": 2},
                "events": [
                    {"at_ms": 1100, "event": {"type": "click"}},
                    {"at_ms": 1200, "event": {"type": "click"}},
                    {"at_ms": 1700, "event": {"type": "click"}},
                    {"at_ms": 2300, "event": {"type": "click"}}
                ]
            }"#,
        );
        assert_eq!(report.native_activations, 2);
        assert_eq!(report.state, ControlState::Disabled);
        assert_eq!(report.clicks[1], "ignored");
        assert_eq!(report.clicks[3], "not_clickable");
    }

    #[test]
    fn test_navigation_away_and_back() {
        let report = replay(
            r#"{
                "events": [
                    {"at_ms": 1500, "event": {"type": "navigate", "url": "https://www.linkedin.com/feed/"}},
                    {"at_ms": 2000, "event": {"type": "advance"}},
                    {"at_ms": 2100, "event": {"type": "popup", "request": {"protocol_version": 1, "command": "is_visible"}}},
                    {"at_ms": 2200, "event": {"type": "navigate", "url": "https://www.linkedin.com/jobs/view/1/"}},
                    {"at_ms": 2700, "event": {"type": "advance"}}
                ]
            }"#,
        );
        assert_eq!(report.popup_responses[0].flag(), Some(false));
        assert_eq!(report.state, ControlState::Enabled);
    }

    #[test]
    fn test_out_of_order_events_are_rejected() {
        let trace: Trace = serde_json::from_str(
            r#"{"events": [
                {"at_ms": 50, "event": {"type": "mutation"}},
                {"at_ms": 10, "event": {"type": "mutation"}}
            ]}"#,
        )
        .unwrap();
        let err = run(&trace, QuickNextConfig::default(), Box::new(MemoryStorage::new())).unwrap_err();
        assert!(err.contains("earlier"));
    }
}
