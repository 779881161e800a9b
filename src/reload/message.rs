//! Hot Reload Message Protocol
//!
//! JSON messages sent over WebSocket to the injected client script.
//!
//! # Message Types
//!
//! - `reload`: full page reload
//! - `css`: re-fetch stylesheets in place
//! - `connected`: handshake
//! - `error` / `clear_error`: build error overlay

use serde::{Deserialize, Serialize};

/// Hot reload message sent over WebSocket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum HotReloadMessage {
    /// Full page reload
    Reload {
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    /// Only stylesheets changed
    Css {
        /// Changed stylesheets, build-dir relative
        paths: Vec<String>,
    },

    /// Connection established
    Connected {
        /// Server version for compatibility check
        version: String,
    },

    /// Task failure (display overlay, no reload)
    Error { task: String, error: String },

    /// Clear error overlay (the task succeeded again)
    #[serde(rename = "clear_error")]
    ClearError,
}

impl HotReloadMessage {
    pub fn reload_with_reason(reason: impl Into<String>) -> Self {
        Self::Reload {
            reason: Some(reason.into()),
        }
    }

    pub fn css(paths: Vec<String>) -> Self {
        Self::Css { paths }
    }

    pub fn connected() -> Self {
        Self::Connected {
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn error(task: impl Into<String>, error: impl Into<String>) -> Self {
        Self::Error {
            task: task.into(),
            error: error.into(),
        }
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"type":"reload"}"#.to_string())
    }
}
