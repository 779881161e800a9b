//! Live reload for the dev server.
//!
//! ```text
//! build dir change ─> FsActor ─> ReloadActor ─> WsActor ─> Browser
//!                                   (css | reload)
//! ```
//!
//! - `message` - JSON messages understood by the injected client
//! - `server` - WebSocket acceptor handing clients to the `WsActor`

pub mod message;
pub mod server;
