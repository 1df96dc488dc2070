//! In-memory stand-in for the host document.
//!
//! Selectors are matched by exact string, not parsed as CSS: a page is set up
//! by registering elements under the selectors the engine will ask for. Clones
//! share one model, so a test keeps a handle while the engine owns another.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use crate::error::HostError;
use crate::host::{AdvisoryId, ControlMarkup, ElementInfo, HostPage};
use crate::pagination::{DEFAULT_NEXT_SELECTORS, DIAGNOSTIC_SELECTOR};
use crate::types::{Point, Position, Rect, Size};

/// Selector the simulated next button is registered under.
pub const SIM_NEXT_SELECTOR: &str = DEFAULT_NEXT_SELECTORS[4];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimElement {
    pub selector: String,
    #[serde(flatten)]
    pub element: ElementInfo,
}

/// Declarative page description, as read from a replay trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageSetup {
    pub url: String,
    pub ready: bool,
    pub viewport: Size,
    pub control_size: Size,
    /// Adds the standard next button when set; the value is its disabled flag.
    pub next_button_disabled: Option<bool>,
    /// After this many activations the next button turns disabled.
    pub remaining_pages: Option<u32>,
    pub elements: Vec<SimElement>,
}

impl Default for PageSetup {
    fn default() -> Self {
        Self {
            url: "https://www.linkedin.com/jobs/search/".to_string(),
            ready: true,
            viewport: Size::new(1280.0, 800.0),
            control_size: Size::new(96.0, 40.0),
            next_button_disabled: Some(false),
            remaining_pages: None,
            elements: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct InjectedControl {
    markup: ControlMarkup,
    position: Position,
    enabled: bool,
}

#[derive(Debug, Clone, PartialEq)]
struct Advisory {
    id: AdvisoryId,
    text: String,
    visible: bool,
}

#[derive(Debug, Default)]
struct PageModel {
    url: String,
    ready: bool,
    viewport: Size,
    control_size: Size,
    elements: Vec<SimElement>,
    invalid_selectors: HashSet<String>,
    foreign_ids: HashSet<String>,
    controls: Vec<InjectedControl>,
    advisories: Vec<Advisory>,
    next_advisory: u64,
    next_handle: u64,
    observers: u32,
    dispatched_clicks: u32,
    direct_clicks: u32,
    remaining_pages: Option<u32>,
    activation_failure: Option<HostError>,
    url_failure: bool,
    observe_failure: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SimulatedPage {
    model: Rc<RefCell<PageModel>>,
}

impl SimulatedPage {
    /// A ready page at `url` with a 1280x800 viewport and no elements.
    pub fn new(url: &str) -> Self {
        let page = Self::default();
        {
            let mut model = page.model.borrow_mut();
            model.url = url.to_string();
            model.ready = true;
            model.viewport = Size::new(1280.0, 800.0);
            model.control_size = Size::new(96.0, 40.0);
        }
        page
    }

    pub fn from_setup(setup: &PageSetup) -> Self {
        let page = Self::new(&setup.url);
        page.set_ready(setup.ready);
        page.set_viewport(setup.viewport.width, setup.viewport.height);
        page.set_control_size(setup.control_size.width, setup.control_size.height);
        if let Some(disabled) = setup.next_button_disabled {
            page.add_next_button();
            page.set_next_disabled(disabled);
        }
        page.model.borrow_mut().remaining_pages = setup.remaining_pages;
        for element in &setup.elements {
            page.add_element(&element.selector, element.element.clone());
        }
        page
    }

    // ─────────────────────────────────────────────────────────────────────
    // Page setup
    // ─────────────────────────────────────────────────────────────────────

    pub fn navigate(&self, url: &str) {
        self.model.borrow_mut().url = url.to_string();
    }

    pub fn set_ready(&self, ready: bool) {
        self.model.borrow_mut().ready = ready;
    }

    pub fn set_viewport(&self, width: f64, height: f64) {
        self.model.borrow_mut().viewport = Size::new(width, height);
    }

    pub fn set_control_size(&self, width: f64, height: f64) {
        self.model.borrow_mut().control_size = Size::new(width, height);
    }

    pub fn add_element(&self, selector: &str, mut element: ElementInfo) {
        let mut model = self.model.borrow_mut();
        model.next_handle += 1;
        element.handle = model.next_handle;
        model.elements.push(SimElement {
            selector: selector.to_string(),
            element,
        });
    }

    pub fn remove_elements(&self, selector: &str) {
        self.model
            .borrow_mut()
            .elements
            .retain(|element| element.selector != selector);
    }

    /// Registers the site's usual next button.
    pub fn add_next_button(&self) {
        self.add_element(
            SIM_NEXT_SELECTOR,
            ElementInfo {
                class_name: "artdeco-button jobs-search-pagination__button--next".to_string(),
                text: "Next".to_string(),
                aria_label: Some("View next page".to_string()),
                rect: Rect::new(600.0, 700.0, 80.0, 32.0),
                ..ElementInfo::default()
            },
        );
    }

    pub fn remove_next_button(&self) {
        self.remove_elements(SIM_NEXT_SELECTOR);
    }

    pub fn set_next_disabled(&self, disabled: bool) {
        let mut model = self.model.borrow_mut();
        for element in model
            .elements
            .iter_mut()
            .filter(|element| element.selector == SIM_NEXT_SELECTOR)
        {
            element.element.disabled = disabled;
            element.element.has_disabled_attribute = disabled;
        }
    }

    pub fn set_invalid_selector(&self, selector: &str) {
        self.model
            .borrow_mut()
            .invalid_selectors
            .insert(selector.to_string());
    }

    /// An element with this id that the engine did not create.
    pub fn add_foreign_element(&self, id: &str) {
        self.model.borrow_mut().foreign_ids.insert(id.to_string());
    }

    pub fn fail_activation(&self, error: HostError) {
        self.model.borrow_mut().activation_failure = Some(error);
    }

    /// While set, `current_url` reports a script error.
    pub fn fail_url(&self, failing: bool) {
        self.model.borrow_mut().url_failure = failing;
    }

    /// While set, observer registration is refused.
    pub fn fail_observe(&self, failing: bool) {
        self.model.borrow_mut().observe_failure = failing;
    }

    // ─────────────────────────────────────────────────────────────────────
    // Inspection
    // ─────────────────────────────────────────────────────────────────────

    pub fn url(&self) -> String {
        self.model.borrow().url.clone()
    }

    pub fn control_count(&self) -> usize {
        self.model.borrow().controls.len()
    }

    pub fn control_enabled(&self) -> Option<bool> {
        self.model.borrow().controls.first().map(|c| c.enabled)
    }

    pub fn control_position(&self) -> Option<Position> {
        self.model.borrow().controls.first().map(|c| c.position)
    }

    pub fn control_rect_now(&self) -> Option<Rect> {
        let model = self.model.borrow();
        let control = model.controls.first()?;
        Some(layout(&control.position, model.control_size, model.viewport))
    }

    pub fn dispatched_clicks(&self) -> u32 {
        self.model.borrow().dispatched_clicks
    }

    pub fn direct_clicks(&self) -> u32 {
        self.model.borrow().direct_clicks
    }

    pub fn observer_count(&self) -> u32 {
        self.model.borrow().observers
    }

    pub fn visible_advisories(&self) -> Vec<String> {
        self.model
            .borrow()
            .advisories
            .iter()
            .filter(|advisory| advisory.visible)
            .map(|advisory| advisory.text.clone())
            .collect()
    }

    pub fn advisory_history(&self) -> Vec<String> {
        self.model
            .borrow()
            .advisories
            .iter()
            .map(|advisory| advisory.text.clone())
            .collect()
    }
}

fn layout(position: &Position, size: Size, viewport: Size) -> Rect {
    let (left, top) = match position {
        Position::Absolute { left, top } => (left.value(), top.value()),
        Position::Anchored { bottom, right } => (
            viewport.width - right.value() - size.width,
            viewport.height - bottom.value() - size.height,
        ),
    };
    Rect::new(left, top, size.width, size.height)
}

fn looks_like_pagination(element: &SimElement) -> bool {
    let aria_next = element
        .element
        .aria_label
        .as_deref()
        .is_some_and(|label| label.contains("Next") || label.contains("next"));
    element.element.class_name.contains("pagination") || aria_next
}

impl HostPage for SimulatedPage {
    fn current_url(&self) -> Result<String, HostError> {
        let model = self.model.borrow();
        if model.url_failure {
            return Err(HostError::Script("location unavailable".to_string()));
        }
        Ok(model.url.clone())
    }

    fn is_ready(&self) -> bool {
        self.model.borrow().ready
    }

    fn query_selector(&self, selector: &str) -> Result<Option<ElementInfo>, HostError> {
        Ok(self.query_selector_all(selector)?.into_iter().next())
    }

    fn query_selector_all(&self, selector: &str) -> Result<Vec<ElementInfo>, HostError> {
        let model = self.model.borrow();
        if model.invalid_selectors.contains(selector) {
            return Err(HostError::InvalidSelector(selector.to_string()));
        }
        let diagnostic = selector == DIAGNOSTIC_SELECTOR;
        Ok(model
            .elements
            .iter()
            .filter(|element| {
                element.selector == selector || (diagnostic && looks_like_pagination(element))
            })
            .map(|element| element.element.clone())
            .collect())
    }

    fn element_exists(&self, id: &str) -> bool {
        let model = self.model.borrow();
        model.foreign_ids.contains(id)
            || model
                .controls
                .iter()
                .any(|control| control.markup.container_id == id || control.markup.button_id == id)
    }

    fn inject_control(
        &mut self,
        markup: &ControlMarkup,
        position: &Position,
    ) -> Result<(), HostError> {
        let mut model = self.model.borrow_mut();
        if !model.ready {
            return Err(HostError::NotReady);
        }
        model.controls.push(InjectedControl {
            markup: markup.clone(),
            position: *position,
            enabled: false,
        });
        Ok(())
    }

    fn remove_control(&mut self, container_id: &str) {
        let mut model = self.model.borrow_mut();
        model
            .controls
            .retain(|control| control.markup.container_id != container_id);
        model.foreign_ids.remove(container_id);
    }

    fn apply_position(&mut self, position: &Position) -> Result<(), HostError> {
        let mut model = self.model.borrow_mut();
        let control = model
            .controls
            .first_mut()
            .ok_or_else(|| HostError::ElementNotFound("control".to_string()))?;
        control.position = *position;
        Ok(())
    }

    fn set_control_enabled(&mut self, enabled: bool) {
        if let Some(control) = self.model.borrow_mut().controls.first_mut() {
            control.enabled = enabled;
        }
    }

    fn control_rect(&self) -> Option<Rect> {
        self.control_rect_now()
    }

    fn viewport(&self) -> Size {
        self.model.borrow().viewport
    }

    fn dispatch_click(&mut self, _element: &ElementInfo, _at: Point) -> Result<bool, HostError> {
        let mut model = self.model.borrow_mut();
        if let Some(err) = model.activation_failure.clone() {
            return Err(err);
        }
        model.dispatched_clicks += 1;
        Ok(true)
    }

    fn click(&mut self, element: &ElementInfo) -> Result<(), HostError> {
        let mut model = self.model.borrow_mut();
        if let Some(err) = model.activation_failure.clone() {
            return Err(err);
        }
        model.direct_clicks += 1;

        let exhausted = match model.remaining_pages {
            Some(remaining) => {
                let remaining = remaining.saturating_sub(1);
                model.remaining_pages = Some(remaining);
                remaining == 0
            }
            None => false,
        };
        if exhausted {
            for sim in model
                .elements
                .iter_mut()
                .filter(|sim| sim.element.handle == element.handle)
            {
                sim.element.disabled = true;
                sim.element.has_disabled_attribute = true;
            }
        }
        Ok(())
    }

    fn show_advisory(&mut self, text: &str) -> AdvisoryId {
        let mut model = self.model.borrow_mut();
        model.next_advisory += 1;
        let id = AdvisoryId(model.next_advisory);
        model.advisories.push(Advisory {
            id,
            text: text.to_string(),
            visible: true,
        });
        id
    }

    fn dismiss_advisory(&mut self, id: AdvisoryId) {
        if let Some(advisory) = self
            .model
            .borrow_mut()
            .advisories
            .iter_mut()
            .find(|advisory| advisory.id == id)
        {
            advisory.visible = false;
        }
    }

    fn observe_mutations(&mut self) -> Result<(), HostError> {
        let mut model = self.model.borrow_mut();
        if model.observe_failure {
            return Err(HostError::NotReady);
        }
        model.observers += 1;
        Ok(())
    }
}
