//! Actor System for Watch Mode
//!
//! Message-passing concurrency for `watch`, `serve` and `dev`:
//!
//! ```text
//! FsActor(src) --> TaskActor --[Error/ClearError]--+
//!  (watch)         (dispatch)                      v
//! FsActor(build) --> ReloadActor --[Css/Reload]--> WsActor --> Browser
//!  (watch)           (classify)                   (broadcast)
//! ```
//!
//! # Module Structure
//!
//! - `messages` - Message types for inter-actor communication
//! - `fs` - File system watcher with debouncing
//! - `task` - Runs the pipelines bound to changed sources
//! - `reload` - Turns build-dir changes into reload messages
//! - `ws` - WebSocket broadcast
//! - `coordinator` - Wires up and runs actors

pub mod coordinator;
pub mod fs;
pub mod messages;
pub mod reload;
pub mod task;
pub mod ws;

pub use coordinator::Coordinator;
