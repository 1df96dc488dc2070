//! Finding and activating the host page's own "next page" control.
//!
//! The host's class names are not ours and change without notice, so lookup is
//! an ordered fallback chain: compound class selectors first, `aria-label`
//! matches last. The first candidate that exists and is not disabled wins.

use url::Url;

use crate::error::{QuickNextError, Result};
use crate::host::{ElementInfo, HostPage};

/// Default lookup chain, most specific first.
pub const DEFAULT_NEXT_SELECTORS: [&str; 7] = [
    ".artdeco-button.artdeco-button--muted.artdeco-button--icon-right.jobs-search-pagination__button--next",
    ".jobs-search-pagination__button.jobs-search-pagination__button--next",
    ".artdeco-button.jobs-search-pagination__button--next",
    "button.jobs-search-pagination__button--next",
    ".jobs-search-pagination__button--next",
    "button[aria-label=\"Next\"]",
    "button[aria-label=\"Next page\"]",
];

/// Broad query used only to log what the page offers after a lookup miss.
pub const DIAGNOSTIC_SELECTOR: &str =
    "[class*=\"pagination\"], button[aria-label*=\"Next\"], button[aria-label*=\"next\"]";

/// A usable next-page control and the selector that found it.
#[derive(Debug, Clone, PartialEq)]
pub struct NextControl {
    pub selector: String,
    pub element: ElementInfo,
}

/// Walks the selector chain and returns the first usable match.
///
/// Selector errors are logged and skipped; they never end the walk.
pub fn find_next_control(host: &dyn HostPage, selectors: &[String]) -> Option<NextControl> {
    for selector in selectors {
        match host.query_selector(selector) {
            Ok(Some(element)) if element.is_usable() => {
                tracing::debug!(selector = %selector, "Found next-page control");
                return Some(NextControl {
                    selector: selector.clone(),
                    element,
                });
            }
            Ok(Some(_)) => {
                tracing::trace!(selector = %selector, "Next-page control present but disabled");
            }
            Ok(None) => {}
            Err(err) => {
                tracing::debug!(selector = %selector, error = %err, "Selector lookup failed");
            }
        }
    }
    None
}

/// Fires a synthetic click at the control's centre, then calls its own
/// `click()`. Some host handlers listen on only one of those paths.
pub fn activate(host: &mut dyn HostPage, control: &NextControl) -> Result<()> {
    let activation_err = |source| QuickNextError::Activation {
        selector: control.selector.clone(),
        source,
    };

    let at = control.element.rect.center();
    let dispatched = host
        .dispatch_click(&control.element, at)
        .map_err(activation_err)?;
    tracing::debug!(selector = %control.selector, dispatched, "Synthetic click dispatched");

    host.click(&control.element).map_err(activation_err)?;
    Ok(())
}

/// Logs every pagination-looking element so a selector update can be made
/// from a user's log.
pub fn log_pagination_candidates(host: &dyn HostPage) {
    match host.query_selector_all(DIAGNOSTIC_SELECTOR) {
        Ok(elements) => {
            tracing::debug!(count = elements.len(), "Pagination candidates after lookup miss");
            for element in elements {
                tracing::debug!(
                    classes = %element.class_name,
                    text = %element.text.trim(),
                    aria_label = ?element.aria_label,
                    disabled = element.disabled,
                    "Pagination candidate"
                );
            }
        }
        Err(err) => tracing::debug!(error = %err, "Pagination diagnostics unavailable"),
    }
}

/// Whether `href` is on the job-search pages the control serves.
///
/// Matches the path segment when the URL parses, and falls back to a plain
/// substring check when it does not.
pub fn is_target_page(href: &str, target_path: &str) -> bool {
    match Url::parse(href) {
        Ok(url) => url.path().contains(target_path),
        Err(_) => href.contains(target_path),
    }
}
