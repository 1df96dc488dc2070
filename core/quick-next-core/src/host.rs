//! The host page as seen by the engine.
//!
//! Everything the engine needs from the DOM goes through [`HostPage`]. A
//! content-script shim implements it against the real document; tests and the
//! CLI use [`SimulatedPage`](crate::sim::SimulatedPage).

use serde::{Deserialize, Serialize};

use crate::error::HostError;
use crate::types::{Point, Position, Rect, Size};

/// Element id of the injected container. The popup checks for it.
pub const CONTROL_ID: &str = "linkedin-quick-next";
/// Element id of the interactive button inside the container.
pub const BUTTON_ID: &str = "quick-next-btn";

/// What the host has to build when the control is injected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlMarkup {
    pub container_id: String,
    pub button_id: String,
    pub label: String,
    /// SVG path for the chevron icon.
    pub icon_path: String,
}

impl Default for ControlMarkup {
    fn default() -> Self {
        Self {
            container_id: CONTROL_ID.to_string(),
            button_id: BUTTON_ID.to_string(),
            label: "Next".to_string(),
            icon_path: "M8.59 16.59L13.17 12L8.59 7.41L10 6l6 6-6 6-1.41-1.41z".to_string(),
        }
    }
}

/// Snapshot of a host element returned by a selector lookup.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ElementInfo {
    /// Opaque handle the host uses to find the element again.
    #[serde(default)]
    pub handle: u64,
    #[serde(default)]
    pub class_name: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub aria_label: Option<String>,
    /// The element's `disabled` property.
    #[serde(default)]
    pub disabled: bool,
    /// Whether a `disabled` attribute is present, whatever the property says.
    #[serde(default)]
    pub has_disabled_attribute: bool,
    #[serde(default)]
    pub rect: Rect,
}

impl ElementInfo {
    pub fn is_usable(&self) -> bool {
        !self.disabled && !self.has_disabled_attribute
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AdvisoryId(pub u64);

/// Capabilities the engine needs from the host document.
///
/// Implementors should not panic; report failures through [`HostError`] and
/// let the engine decide how to degrade.
pub trait HostPage {
    /// Full `location.href`.
    fn current_url(&self) -> Result<String, HostError>;

    /// False while the document is still loading or has no body.
    fn is_ready(&self) -> bool;

    /// First element matching `selector`.
    fn query_selector(&self, selector: &str) -> Result<Option<ElementInfo>, HostError>;

    fn query_selector_all(&self, selector: &str) -> Result<Vec<ElementInfo>, HostError>;

    /// Whether an element with this id exists anywhere in the document.
    fn element_exists(&self, id: &str) -> bool;

    /// Builds the control, positions it and appends it to the body.
    fn inject_control(&mut self, markup: &ControlMarkup, position: &Position)
        -> Result<(), HostError>;

    /// Removes the element with this id; a no-op when it is already gone.
    fn remove_control(&mut self, container_id: &str);

    fn apply_position(&mut self, position: &Position) -> Result<(), HostError>;

    /// Marks the button enabled or visually disabled. It stays draggable.
    fn set_control_enabled(&mut self, enabled: bool);

    fn control_rect(&self) -> Option<Rect>;

    fn viewport(&self) -> Size;

    /// Dispatches a synthetic bubbling primary-button click at `at`.
    /// Returns the `dispatchEvent` result.
    fn dispatch_click(&mut self, element: &ElementInfo, at: Point) -> Result<bool, HostError>;

    /// Calls the element's own `click()`.
    fn click(&mut self, element: &ElementInfo) -> Result<(), HostError>;

    /// Shows a transient, non-blocking message.
    fn show_advisory(&mut self, text: &str) -> AdvisoryId;

    fn dismiss_advisory(&mut self, id: AdvisoryId);

    /// Starts delivering subtree child-list mutations to the engine.
    fn observe_mutations(&mut self) -> Result<(), HostError>;
}
