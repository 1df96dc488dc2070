//! Engine configuration and its on-disk location.
//!
//! Every field has a default, so a partial or missing config file still yields
//! a working engine. The selector list and the target path are the contract
//! with the host site; they live here so a site redesign is a config change.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::pagination::DEFAULT_NEXT_SELECTORS;
use crate::types::{Position, DEFAULT_ANCHOR_PX};

pub const DEFAULT_STORAGE_KEY: &str = "quickNextPosition";
pub const DEFAULT_TARGET_PATH: &str = "/jobs/";
pub const DEFAULT_SITE_MARKER: &str = "linkedin.com/jobs";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuickNextConfig {
    /// Wait after a URL change before re-evaluating the page.
    pub navigation_settle_ms: u64,
    /// Debounce for state refreshes driven by plain DOM churn.
    pub refresh_debounce_ms: u64,
    /// Wait after activating the host's control before re-deriving state.
    pub trigger_settle_ms: u64,
    pub advisory_ms: u64,
    /// Movement (per axis) past which a press becomes a drag.
    pub drag_threshold_px: f64,
    /// How long the drag latch survives a release.
    pub drag_release_ms: u64,
    pub startup_delay_ms: u64,
    pub not_ready_retry_ms: u64,
    pub target_path: String,
    /// Substring the popup uses to decide whether a tab is on the target site.
    pub site_marker: String,
    pub storage_key: String,
    pub default_bottom_px: f64,
    pub default_right_px: f64,
    /// Tried in order, most specific first.
    pub next_selectors: Vec<String>,
}

impl Default for QuickNextConfig {
    fn default() -> Self {
        Self {
            navigation_settle_ms: 500,
            refresh_debounce_ms: 300,
            trigger_settle_ms: 500,
            advisory_ms: 2000,
            drag_threshold_px: 5.0,
            drag_release_ms: 10,
            startup_delay_ms: 1000,
            not_ready_retry_ms: 250,
            target_path: DEFAULT_TARGET_PATH.to_string(),
            site_marker: DEFAULT_SITE_MARKER.to_string(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            default_bottom_px: DEFAULT_ANCHOR_PX,
            default_right_px: DEFAULT_ANCHOR_PX,
            next_selectors: DEFAULT_NEXT_SELECTORS
                .iter()
                .map(|selector| selector.to_string())
                .collect(),
        }
    }
}

impl QuickNextConfig {
    pub fn default_position(&self) -> Position {
        Position::anchored(self.default_bottom_px, self.default_right_px)
    }
}

/// Returns the directory for Quick Next configuration (`<config dir>/quick-next`).
pub fn get_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("quick-next"))
}

/// Returns the path to the configuration file.
pub fn get_config_path() -> Option<PathBuf> {
    get_config_dir().map(|d| d.join("config.json"))
}

/// Returns the default JSON storage file (`<data dir>/quick-next/storage.json`).
pub fn get_storage_path() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("quick-next").join("storage.json"))
}

/// Loads the configuration, returning defaults if the file is missing or malformed.
pub fn load_config(path: &Path) -> QuickNextConfig {
    let content = match fs_err::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return QuickNextConfig::default()
        }
        Err(err) => {
            tracing::warn!(error = %err, "Failed to read config; using defaults");
            return QuickNextConfig::default();
        }
    };

    match serde_json::from_str(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                error = %err,
                path = %path.display(),
                "Config file malformed; using defaults"
            );
            QuickNextConfig::default()
        }
    }
}

/// Loads the configuration from the default location.
pub fn load_default_config() -> QuickNextConfig {
    get_config_path()
        .map(|path| load_config(&path))
        .unwrap_or_default()
}
