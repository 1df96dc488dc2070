//! Page-side handler for popup commands.
//!
//! The popup only ever talks to the engine registered for the active tab's
//! context. It cannot reach the page's DOM on its own, so when no engine is
//! registered it gets an answer telling it to inject the script first.

use quick_next_protocol::{
    parse_request, PopupCommand, PopupRequest, PopupResponse, ToggleOutcome,
};
use serde::Serialize;
use serde_json::Value;

use crate::registry::{ContextId, InstanceRegistry};

/// What the popup shows for a tab before any command runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TabStatus {
    pub active: bool,
    pub message: &'static str,
}

pub fn tab_status(url: &str, site_marker: &str) -> TabStatus {
    if url.contains(site_marker) {
        TabStatus {
            active: true,
            message: "Active on LinkedIn Jobs",
        }
    } else {
        TabStatus {
            active: false,
            message: "Not on LinkedIn Jobs page",
        }
    }
}

/// Decodes and runs a raw popup message.
pub fn handle_message(registry: &InstanceRegistry, context: &ContextId, bytes: &[u8]) -> PopupResponse {
    match parse_request(bytes) {
        Ok(request) => handle_request(registry, context, &request),
        Err(error) => PopupResponse::error_with_info(None, error),
    }
}

pub fn handle_request(
    registry: &InstanceRegistry,
    context: &ContextId,
    request: &PopupRequest,
) -> PopupResponse {
    let id = request.id.clone();
    let Some(engine) = registry.get(context) else {
        tracing::debug!(context = %context, command = ?request.command, "No engine for popup command");
        return match request.command {
            PopupCommand::ToggleVisibility => {
                PopupResponse::ok(id, Value::from(ToggleOutcome::Inject.as_str()))
            }
            PopupCommand::IsVisible | PopupCommand::Reinject => {
                PopupResponse::ok(id, Value::from(false))
            }
            PopupCommand::TriggerNext => {
                PopupResponse::error(id, "no_instance", "Quick Next is not running in this page")
            }
        };
    };

    let Ok(mut engine) = engine.try_borrow_mut() else {
        return PopupResponse::error(id, "busy", "Quick Next is handling another event");
    };

    let data = match request.command {
        PopupCommand::ToggleVisibility => {
            let outcome = if engine.hide() {
                ToggleOutcome::Hidden
            } else {
                engine.materialize();
                if engine.state().is_present() {
                    ToggleOutcome::Shown
                } else {
                    ToggleOutcome::Inject
                }
            };
            Value::from(outcome.as_str())
        }
        PopupCommand::TriggerNext => Value::from(engine.trigger_direct().to_wire()),
        PopupCommand::Reinject => Value::from(engine.reinject()),
        PopupCommand::IsVisible => Value::from(engine.is_visible()),
    };

    tracing::info!(context = %context, command = ?request.command, result = %data, "Popup command handled");
    PopupResponse::ok(id, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QuickNextConfig;
    use crate::engine::QuickNext;
    use crate::host::CONTROL_ID;
    use crate::sim::SimulatedPage;
    use crate::storage::MemoryStorage;
    use quick_next_protocol::TriggerOutcome;

    const JOBS_URL: &str = "https://www.linkedin.com/jobs/search/";

    fn registry_with(page: &SimulatedPage) -> (InstanceRegistry, ContextId) {
        let registry = InstanceRegistry::new();
        let context = ContextId::new("tab-7");
        let page = page.clone();
        registry.get_or_create(&context, move || {
            QuickNext::new(
                Box::new(page),
                Box::new(MemoryStorage::new()),
                QuickNextConfig::default(),
            )
        });
        (registry, context)
    }

    #[test]
    fn tab_status_checks_site_marker() {
        assert!(tab_status("https://www.linkedin.com/jobs/search/?k=1", "linkedin.com/jobs").active);
        assert!(!tab_status("https://www.linkedin.com/feed/", "linkedin.com/jobs").active);
    }

    #[test]
    fn toggle_without_engine_asks_for_injection() {
        let registry = InstanceRegistry::new();
        let response = handle_request(
            &registry,
            &ContextId::new("none"),
            &PopupRequest::new(PopupCommand::ToggleVisibility),
        );
        assert_eq!(response.text(), Some("inject"));
    }

    #[test]
    fn toggle_hides_then_shows() {
        let page = SimulatedPage::new(JOBS_URL);
        page.add_next_button();
        let (registry, context) = registry_with(&page);
        let toggle = PopupRequest::new(PopupCommand::ToggleVisibility).with_id("t");

        let shown = handle_request(&registry, &context, &toggle);
        assert_eq!(shown.text(), Some("shown"));
        assert_eq!(shown.id.as_deref(), Some("t"));
        assert_eq!(page.control_count(), 1);

        let hidden = handle_request(&registry, &context, &toggle);
        assert_eq!(hidden.text(), Some("hidden"));
        assert_eq!(page.control_count(), 0);

        let visible = handle_request(&registry, &context, &PopupRequest::new(PopupCommand::IsVisible));
        assert_eq!(visible.flag(), Some(false));
    }

    #[test]
    fn toggle_clears_leftover_element() {
        let page = SimulatedPage::new(JOBS_URL);
        page.add_foreign_element(CONTROL_ID);
        let (registry, context) = registry_with(&page);
        let toggle = PopupRequest::new(PopupCommand::ToggleVisibility);
        let is_visible = PopupRequest::new(PopupCommand::IsVisible);

        assert_eq!(handle_request(&registry, &context, &is_visible).flag(), Some(true));
        assert_eq!(handle_request(&registry, &context, &toggle).text(), Some("hidden"));
        assert_eq!(handle_request(&registry, &context, &is_visible).flag(), Some(false));

        assert_eq!(handle_request(&registry, &context, &toggle).text(), Some("shown"));
        assert_eq!(page.control_count(), 1);
    }

    #[test]
    fn trigger_next_reports_selector() {
        let page = SimulatedPage::new(JOBS_URL);
        page.add_next_button();
        let (registry, context) = registry_with(&page);

        let response = handle_request(&registry, &context, &PopupRequest::new(PopupCommand::TriggerNext));
        let outcome = TriggerOutcome::parse(response.text().unwrap()).unwrap();
        assert!(matches!(outcome, TriggerOutcome::Success { .. }));
        assert_eq!(page.direct_clicks(), 1);

        page.remove_next_button();
        let missing = handle_request(&registry, &context, &PopupRequest::new(PopupCommand::TriggerNext));
        assert_eq!(missing.text(), Some("not_found"));
    }

    #[test]
    fn reinject_replaces_control() {
        let page = SimulatedPage::new(JOBS_URL);
        let (registry, context) = registry_with(&page);

        let response = handle_request(&registry, &context, &PopupRequest::new(PopupCommand::Reinject));
        assert_eq!(response.flag(), Some(true));
        let again = handle_request(&registry, &context, &PopupRequest::new(PopupCommand::Reinject));
        assert_eq!(again.flag(), Some(true));
        assert_eq!(page.control_count(), 1);
    }

    #[test]
    fn reinject_replaces_leftover_element() {
        let page = SimulatedPage::new(JOBS_URL);
        page.add_foreign_element(CONTROL_ID);
        let (registry, context) = registry_with(&page);

        let response = handle_request(&registry, &context, &PopupRequest::new(PopupCommand::Reinject));
        assert_eq!(response.flag(), Some(true));
        assert_eq!(page.control_count(), 1);
    }

    #[test]
    fn malformed_message_is_rejected() {
        let registry = InstanceRegistry::new();
        let response = handle_message(&registry, &ContextId::new("x"), b"{");
        assert!(!response.ok);
        assert_eq!(response.error.unwrap().code, "invalid_json");
    }
}
