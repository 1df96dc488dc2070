//! Core value types shared by the watcher, the control and the host adapters.
//!
//! Positions are persisted as JSON in the same shape CSS uses for the control's
//! inline style (`{"left": "37px", "top": "84px"}`), so a host shim can apply
//! them without translation.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::QuickNextError;

// ═══════════════════════════════════════════════════════════════════════════════
// Control State
// ═══════════════════════════════════════════════════════════════════════════════

/// Lifecycle state of the injected control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlState {
    /// No DOM node exists for the control.
    #[default]
    Absent,
    /// Node exists and trigger actions are permitted.
    Enabled,
    /// Node exists, primary action is off, dragging still works.
    Disabled,
}

impl ControlState {
    pub fn is_present(self) -> bool {
        !matches!(self, Self::Absent)
    }

    pub fn can_click(self) -> bool {
        matches!(self, Self::Enabled)
    }

    pub(crate) fn from_affordance(has_next: bool) -> Self {
        if has_next {
            Self::Enabled
        } else {
            Self::Disabled
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Lengths and Positions
// ═══════════════════════════════════════════════════════════════════════════════

/// A CSS pixel length, serialized as `"<n>px"`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "LengthRepr", into = "String")]
pub struct Length(f64);

impl Length {
    pub fn px(value: f64) -> Self {
        Self(value)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn parse(input: &str) -> Result<Self, QuickNextError> {
        let trimmed = input.trim();
        let number = trimmed.strip_suffix("px").unwrap_or(trimmed).trim();
        match number.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(Self(value)),
            _ => Err(QuickNextError::InvalidLength(input.to_string())),
        }
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}px", self.0)
    }
}

impl From<Length> for String {
    fn from(length: Length) -> Self {
        length.to_string()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LengthRepr {
    Text(String),
    Number(f64),
}

impl TryFrom<LengthRepr> for Length {
    type Error = QuickNextError;

    fn try_from(repr: LengthRepr) -> Result<Self, Self::Error> {
        match repr {
            LengthRepr::Text(text) => Length::parse(&text),
            LengthRepr::Number(value) if value.is_finite() => Ok(Length(value)),
            LengthRepr::Number(value) => Err(QuickNextError::InvalidLength(value.to_string())),
        }
    }
}

/// Where the control sits on screen.
///
/// Exactly one form is active. A user drag always produces `Absolute`, which
/// then supersedes any anchored value until the position is reset.
/// `Absolute` is tried first when decoding so a record carrying both forms
/// resolves to the pinned one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Position {
    Absolute { left: Length, top: Length },
    Anchored { bottom: Length, right: Length },
}

impl Position {
    pub fn anchored(bottom: f64, right: f64) -> Self {
        Self::Anchored {
            bottom: Length::px(bottom),
            right: Length::px(right),
        }
    }

    pub fn absolute(left: f64, top: f64) -> Self {
        Self::Absolute {
            left: Length::px(left),
            top: Length::px(top),
        }
    }

    pub fn is_absolute(&self) -> bool {
        matches!(self, Self::Absolute { .. })
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::anchored(DEFAULT_ANCHOR_PX, DEFAULT_ANCHOR_PX)
    }
}

pub const DEFAULT_ANCHOR_PX: f64 = 20.0;

// ═══════════════════════════════════════════════════════════════════════════════
// Geometry
// ═══════════════════════════════════════════════════════════════════════════════

/// A point in viewport (client) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Bounding box in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn origin(&self) -> Point {
        Point::new(self.left, self.top)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn center(&self) -> Point {
        Point::new(self.left + self.width / 2.0, self.top + self.height / 2.0)
    }
}
