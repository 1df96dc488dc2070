//! Message types exchanged between the Quick Next popup and the page engine.
//!
//! Both sides link this crate so the schema cannot drift. The page side is the
//! authority on validation, but the popup reuses the same types to build
//! well-formed requests and to interpret results.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const PROTOCOL_VERSION: u32 = 1;
pub const MAX_REQUEST_BYTES: usize = 16 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub enum PopupCommand {
    /// Remove the control if present, otherwise bring it back.
    ToggleVisibility,
    /// Activate the host page's own "next" control directly.
    TriggerNext,
    /// Tear the control down and inject a fresh one.
    Reinject,
    /// Report whether the control element is currently in the page.
    IsVisible,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PopupRequest {
    pub protocol_version: u32,
    pub command: PopupCommand,
    #[serde(default)]
    pub id: Option<String>,
}

impl PopupRequest {
    pub fn new(command: PopupCommand) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            command,
            id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopupResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

impl PopupResponse {
    pub fn ok(id: Option<String>, data: Value) -> Self {
        Self {
            ok: true,
            id,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(id: Option<String>, code: &str, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            id,
            data: None,
            error: Some(ErrorInfo::new(code, message)),
        }
    }

    pub fn error_with_info(id: Option<String>, error: ErrorInfo) -> Self {
        Self {
            ok: false,
            id,
            data: None,
            error: Some(error),
        }
    }

    /// String payload, for commands that answer with a status word.
    pub fn text(&self) -> Option<&str> {
        self.data.as_ref().and_then(Value::as_str)
    }

    /// Boolean payload, for commands that answer yes/no.
    pub fn flag(&self) -> Option<bool> {
        self.data.as_ref().and_then(Value::as_bool)
    }
}

/// Result of [`PopupCommand::ToggleVisibility`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Hidden,
    Shown,
    /// No engine lives in the page; the popup has to inject the script first.
    Inject,
}

impl ToggleOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hidden => "hidden",
            Self::Shown => "shown",
            Self::Inject => "inject",
        }
    }
}

/// Result of [`PopupCommand::TriggerNext`], carried on the wire as
/// `success:<selector>` or `not_found`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    Success { selector: String },
    NotFound,
}

const SUCCESS_PREFIX: &str = "success:";
const NOT_FOUND: &str = "not_found";

impl TriggerOutcome {
    pub fn to_wire(&self) -> String {
        match self {
            Self::Success { selector } => format!("{SUCCESS_PREFIX}{selector}"),
            Self::NotFound => NOT_FOUND.to_string(),
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        if let Some(selector) = value.strip_prefix(SUCCESS_PREFIX) {
            return Some(Self::Success {
                selector: selector.to_string(),
            });
        }
        (value == NOT_FOUND).then_some(Self::NotFound)
    }
}

pub fn parse_request(bytes: &[u8]) -> Result<PopupRequest, ErrorInfo> {
    if bytes.len() > MAX_REQUEST_BYTES {
        return Err(ErrorInfo::new(
            "request_too_large",
            format!("request exceeds {MAX_REQUEST_BYTES} bytes"),
        ));
    }

    let request: PopupRequest = serde_json::from_slice(bytes)
        .map_err(|err| ErrorInfo::new("invalid_json", err.to_string()))?;

    if request.protocol_version != PROTOCOL_VERSION {
        return Err(ErrorInfo::new(
            "protocol_mismatch",
            format!(
                "expected protocol_version {PROTOCOL_VERSION}, got {}",
                request.protocol_version
            ),
        ));
    }

    if let Some(id) = request.id.as_deref() {
        if id.len() > 128 {
            return Err(ErrorInfo::new(
                "invalid_id",
                "id must be 128 characters or fewer",
            ));
        }
    }

    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_request_accepts_current_version() {
        let bytes = br#"{"protocol_version":1,"command":"trigger_next","id":"a1"}"#;
        let request = parse_request(bytes).expect("valid request");
        assert_eq!(request.command, PopupCommand::TriggerNext);
        assert_eq!(request.id.as_deref(), Some("a1"));
    }

    #[test]
    fn parse_request_rejects_version_mismatch() {
        let bytes = br#"{"protocol_version":9,"command":"reinject"}"#;
        let err = parse_request(bytes).unwrap_err();
        assert_eq!(err.code, "protocol_mismatch");
    }

    #[test]
    fn parse_request_rejects_unknown_fields() {
        let bytes = br#"{"protocol_version":1,"command":"reinject","extra":true}"#;
        let err = parse_request(bytes).unwrap_err();
        assert_eq!(err.code, "invalid_json");
    }

    #[test]
    fn parse_request_rejects_oversized_payload() {
        let bytes = vec![b' '; MAX_REQUEST_BYTES + 1];
        let err = parse_request(&bytes).unwrap_err();
        assert_eq!(err.code, "request_too_large");
    }

    #[test]
    fn trigger_outcome_wire_format() {
        let success = TriggerOutcome::Success {
            selector: "button[aria-label=\"Next\"]".to_string(),
        };
        assert_eq!(success.to_wire(), "success:button[aria-label=\"Next\"]");
        assert_eq!(TriggerOutcome::parse(&success.to_wire()), Some(success));
        assert_eq!(
            TriggerOutcome::parse("not_found"),
            Some(TriggerOutcome::NotFound)
        );
        assert_eq!(TriggerOutcome::parse("bogus"), None);
    }

    #[test]
    fn response_payload_accessors() {
        let text = PopupResponse::ok(None, Value::from("hidden"));
        assert_eq!(text.text(), Some("hidden"));
        assert_eq!(text.flag(), None);

        let flag = PopupResponse::ok(Some("x".to_string()), Value::from(true));
        assert_eq!(flag.flag(), Some(true));
        assert!(serde_json::to_string(&flag).unwrap().contains("\"id\":\"x\""));
    }
}
