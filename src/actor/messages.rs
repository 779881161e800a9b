//! Actor Message Definitions
//!
//! ```text
//! FsActor --Changed--> TaskActor --Error/ClearError--> WsActor
//! FsActor --Changed--> ReloadActor --Reload/Css------> WsActor
//! ```

use std::path::PathBuf;

use crate::task::{PipelineError, TaskReport};

// =============================================================================
// TaskActor Messages
// =============================================================================

/// Messages to Task Actor
#[derive(Debug)]
pub enum TaskMsg {
    /// Debounced source changes
    Changed(Vec<PathBuf>),
    /// A bound pipeline finished on its worker
    Finished {
        binding: usize,
        result: Result<Vec<TaskReport>, PipelineError>,
    },
    /// Shutdown
    Shutdown,
}

// =============================================================================
// ReloadActor Messages
// =============================================================================

/// Messages to Reload Actor
#[derive(Debug)]
pub enum ReloadMsg {
    /// Debounced build-dir changes
    Changed(Vec<PathBuf>),
    /// Shutdown
    Shutdown,
}

// =============================================================================
// WsActor Messages
// =============================================================================

/// Messages to WebSocket Actor
#[derive(Debug)]
pub enum WsMsg {
    /// Reload page
    Reload { reason: String },
    /// Re-fetch stylesheets (build-dir relative paths)
    Css { paths: Vec<String> },
    /// Task failure (display overlay, no reload)
    Error { task: String, error: String },
    /// Clear error overlay (the failing task succeeded)
    ClearError,
    /// Add a client whose handshake already completed
    AddClient(tungstenite::WebSocket<std::net::TcpStream>),
    /// Shutdown
    Shutdown,
}
