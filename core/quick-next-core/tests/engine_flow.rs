//! Integration tests driving the engine through a simulated page and clock.

use quick_next_core::{
    ClickOutcome, ContextId, ControlState, InstanceRegistry, JsonFileStorage, KeyValueStorage,
    MemoryStorage, PageSetup, Point, Position, QuickNext, QuickNextConfig, SimulatedPage,
    TriggerAttempt, UnavailableStorage,
};
use quick_next_protocol::{PopupCommand, PopupRequest};
use serde_json::json;
use tempfile::tempdir;

const JOBS_URL: &str = "https://www.linkedin.com/jobs/search/?keywords=rust";
const FEED_URL: &str = "https://www.linkedin.com/feed/";

fn engine_on(page: &SimulatedPage, storage: Box<dyn KeyValueStorage>) -> QuickNext {
    QuickNext::new(Box::new(page.clone()), storage, QuickNextConfig::default())
}

/// Starts an engine at t=0 and runs it past the startup delay.
fn started(page: &SimulatedPage, memory: &MemoryStorage) -> QuickNext {
    let mut engine = engine_on(page, Box::new(memory.clone()));
    assert!(engine.start(0));
    engine.advance(1000);
    engine
}

#[test]
fn test_startup_creates_control_after_delay() {
    let page = SimulatedPage::new(JOBS_URL);
    page.add_next_button();
    let mut engine = engine_on(&page, Box::new(MemoryStorage::new()));

    engine.start(0);
    assert_eq!(engine.next_deadline(), Some(1000));
    engine.advance(999);
    assert_eq!(engine.state(), ControlState::Absent);

    engine.advance(1000);
    assert_eq!(engine.state(), ControlState::Enabled);
    assert_eq!(page.control_count(), 1);
    assert_eq!(page.observer_count(), 1);
    assert!(engine.is_visible());
}

#[test]
fn test_loading_document_starts_on_dom_ready() {
    let page = SimulatedPage::new(JOBS_URL);
    page.set_ready(false);
    let mut engine = engine_on(&page, Box::new(MemoryStorage::new()));

    engine.start(0);
    assert_eq!(engine.next_deadline(), None);

    page.set_ready(true);
    engine.on_dom_ready(300);
    engine.advance(300);
    assert_eq!(engine.state(), ControlState::Disabled);
}

#[test]
fn test_mutation_burst_costs_one_refresh() {
    let page = SimulatedPage::new(JOBS_URL);
    page.add_next_button();
    let memory = MemoryStorage::new();
    let mut engine = started(&page, &memory);
    assert_eq!(engine.state(), ControlState::Enabled);

    page.set_next_disabled(true);
    for i in 0..10 {
        engine.on_mutation(2000 + i * 30);
    }
    assert_eq!(engine.next_deadline(), Some(2270 + 300));

    assert_eq!(engine.advance(2569), 0);
    assert_eq!(engine.state(), ControlState::Enabled);
    assert_eq!(engine.advance(2570), 1);
    assert_eq!(engine.state(), ControlState::Disabled);
    assert_eq!(page.control_enabled(), Some(false));
    assert_eq!(engine.next_deadline(), None);
}

#[test]
fn test_spa_navigation_onto_target_creates_once() {
    let page = SimulatedPage::new(FEED_URL);
    page.add_next_button();
    let memory = MemoryStorage::new();
    let mut engine = started(&page, &memory);
    assert_eq!(engine.state(), ControlState::Absent);

    page.navigate(JOBS_URL);
    engine.on_mutation(1500);
    engine.on_mutation(1600);
    assert_eq!(engine.navigation().last_observed_url, JOBS_URL);

    engine.advance(1999);
    assert_eq!(engine.state(), ControlState::Absent);
    engine.advance(2000);
    assert_eq!(engine.state(), ControlState::Enabled);

    engine.on_mutation(2100);
    engine.advance(5000);
    assert_eq!(page.control_count(), 1);
}

#[test]
fn test_leaving_target_removes_control() {
    let page = SimulatedPage::new(JOBS_URL);
    let memory = MemoryStorage::new();
    let mut engine = started(&page, &memory);
    assert!(engine.state().is_present());

    page.navigate(FEED_URL);
    engine.on_mutation(3000);
    engine.advance(3500);
    assert_eq!(engine.state(), ControlState::Absent);
    assert_eq!(page.control_count(), 0);
    assert!(!engine.is_target_page());
}

#[test]
fn test_click_pages_until_exhausted() {
    let setup = PageSetup {
        url: JOBS_URL.to_string(),
        remaining_pages: Some(2),
        ..PageSetup::default()
    };
    let page = SimulatedPage::from_setup(&setup);
    let memory = MemoryStorage::new();
    let mut engine = started(&page, &memory);

    assert!(matches!(
        engine.click(1100),
        ClickOutcome::Triggered(TriggerAttempt::Activated { .. })
    ));
    assert_eq!(
        engine.click(1200),
        ClickOutcome::Triggered(TriggerAttempt::Ignored)
    );
    assert!(engine.is_processing());
    engine.advance(1600);
    assert!(!engine.is_processing());
    assert_eq!(engine.state(), ControlState::Enabled);

    engine.click(1700);
    engine.advance(2200);
    assert_eq!(engine.state(), ControlState::Disabled);
    assert_eq!(engine.click(2300), ClickOutcome::NotClickable);
    assert_eq!(page.direct_clicks(), 2);
    assert_eq!(page.dispatched_clicks(), 2);
}

#[test]
fn test_lookup_miss_shows_advisory() {
    let page = SimulatedPage::new(JOBS_URL);
    let memory = MemoryStorage::new();
    let mut engine = started(&page, &memory);

    assert_eq!(engine.trigger(1100), TriggerAttempt::NoNextPage);
    assert_eq!(page.visible_advisories(), vec!["No next page available"]);
    engine.advance(3100);
    assert!(page.visible_advisories().is_empty());
    assert_eq!(page.advisory_history().len(), 1);
}

#[test]
fn test_drag_suppresses_click_then_releases() {
    let page = SimulatedPage::new(JOBS_URL);
    page.add_next_button();
    let memory = MemoryStorage::new();
    let mut engine = started(&page, &memory);
    let rect = page.control_rect_now().unwrap();

    engine.pointer_down(rect.center());
    engine.pointer_move(Point::new(rect.center().x - 200.0, rect.center().y - 200.0));
    assert!(engine.is_dragging());
    assert!(engine.pointer_up(1500));
    assert_eq!(engine.click(1500), ClickOutcome::SuppressedByDrag);
    assert_eq!(page.direct_clicks(), 0);

    engine.advance(1510);
    assert!(!engine.is_dragging());
    assert!(matches!(engine.click(1600), ClickOutcome::Triggered(_)));
}

#[test]
fn test_dragged_position_survives_reload() {
    let memory = MemoryStorage::new();
    let first_page = SimulatedPage::new(JOBS_URL);
    let mut first = started(&first_page, &memory);
    let rect = first_page.control_rect_now().unwrap();

    first.pointer_down(rect.origin());
    first.pointer_move(Point::new(37.0, 84.0));
    first.pointer_up(1200);
    assert_eq!(
        memory.snapshot()["quickNextPosition"],
        json!({"left": "37px", "top": "84px"})
    );

    let second_page = SimulatedPage::new(JOBS_URL);
    let second = started(&second_page, &memory);
    assert_eq!(second.position(), Position::absolute(37.0, 84.0));
    assert_eq!(
        second_page.control_position(),
        Some(Position::absolute(37.0, 84.0))
    );
}

#[test]
fn test_pinned_position_wins_over_anchor() {
    let memory = MemoryStorage::new();
    memory
        .set(
            "quickNextPosition",
            json!({"left": "37px", "top": "84px", "bottom": "20px", "right": "20px"}),
        )
        .unwrap();
    let page = SimulatedPage::new(JOBS_URL);
    let engine = started(&page, &memory);
    assert_eq!(engine.position(), Position::absolute(37.0, 84.0));
}

#[test]
fn test_file_storage_persists_between_engines() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("storage.json");

    let page = SimulatedPage::new(JOBS_URL);
    let mut engine = engine_on(&page, Box::new(JsonFileStorage::new(&path)));
    engine.start(0);
    engine.advance(1000);
    let rect = page.control_rect_now().unwrap();
    engine.pointer_down(rect.origin());
    engine.pointer_move(Point::new(100.0, 120.0));
    engine.pointer_up(1100);

    let reloaded = SimulatedPage::new(JOBS_URL);
    let mut again = engine_on(&reloaded, Box::new(JsonFileStorage::new(&path)));
    again.start(0);
    again.advance(1000);
    assert_eq!(again.position(), Position::absolute(100.0, 120.0));

    let reset = again.reset_position().unwrap();
    assert_eq!(reset, Position::default());
    assert_eq!(reloaded.control_position(), Some(Position::default()));
}

#[test]
fn test_unavailable_storage_degrades_to_default() {
    let page = SimulatedPage::new(JOBS_URL);
    let mut engine = engine_on(&page, Box::new(UnavailableStorage));
    engine.start(0);
    engine.advance(1000);
    assert_eq!(engine.position(), Position::default());

    let rect = page.control_rect_now().unwrap();
    engine.pointer_down(rect.origin());
    engine.pointer_move(Point::new(50.0, 50.0));
    assert!(engine.pointer_up(1100));
    assert_eq!(engine.position(), Position::absolute(50.0, 50.0));
}

#[test]
fn test_popup_commands_reach_registered_engine() {
    let page = SimulatedPage::new(JOBS_URL);
    page.add_next_button();
    let registry = InstanceRegistry::new();
    let context = ContextId::new("tab-1");
    let engine = registry.get_or_create(&context, || {
        engine_on(&page, Box::new(MemoryStorage::new()))
    });
    engine.borrow_mut().start(0);
    engine.borrow_mut().advance(1000);

    let visible = quick_next_core::handle_request(
        &registry,
        &context,
        &PopupRequest::new(PopupCommand::IsVisible),
    );
    assert_eq!(visible.flag(), Some(true));

    let hidden = quick_next_core::handle_message(
        &registry,
        &context,
        br#"{"protocol_version":1,"command":"toggle_visibility","id":"p1"}"#,
    );
    assert_eq!(hidden.text(), Some("hidden"));
    assert_eq!(hidden.id.as_deref(), Some("p1"));
    assert_eq!(page.control_count(), 0);

    let trigger = quick_next_core::handle_request(
        &registry,
        &context,
        &PopupRequest::new(PopupCommand::TriggerNext),
    );
    assert!(trigger.text().unwrap().starts_with("success:"));
}
