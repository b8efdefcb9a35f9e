//! Live reload message protocol.
//!
//! - `connected`: sent once after the handshake
//! - `reload`: full page reload
//! - `css`: re-fetch stylesheets without reloading

use serde::{Deserialize, Serialize};

/// Message sent over the live-reload WebSocket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReloadMessage {
    /// Connection established
    Connected {
        /// Server version
        version: String,
    },

    /// Full page reload
    Reload {
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    /// Stylesheets changed
    Css,
}

impl ReloadMessage {
    pub fn connected() -> Self {
        Self::Connected {
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn reload_with_reason(reason: impl Into<String>) -> Self {
        Self::Reload {
            reason: Some(reason.into()),
        }
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"type":"reload"}"#.to_string())
    }

    /// Parse from JSON string
    pub fn from_json(s: &str) -> Option<Self> {
        serde_json::from_str(s).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reload_message() {
        let json = ReloadMessage::reload_with_reason("index.html changed").to_json();
        assert_eq!(json, r#"{"type":"reload","reason":"index.html changed"}"#);
    }

    #[test]
    fn test_reload_without_reason() {
        let json = ReloadMessage::Reload { reason: None }.to_json();
        assert_eq!(json, r#"{"type":"reload"}"#);
    }

    #[test]
    fn test_css_message() {
        assert_eq!(ReloadMessage::Css.to_json(), r#"{"type":"css"}"#);
    }

    #[test]
    fn test_connected_carries_version() {
        let json = ReloadMessage::connected().to_json();
        assert!(json.starts_with(r#"{"type":"connected","version":""#));
        assert_eq!(
            ReloadMessage::from_json(&json),
            Some(ReloadMessage::connected())
        );
    }

    #[test]
    fn test_from_json_rejects_unknown() {
        assert_eq!(ReloadMessage::from_json(r#"{"type":"patch"}"#), None);
    }
}
