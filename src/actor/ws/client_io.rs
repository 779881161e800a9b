use std::io::ErrorKind;
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tungstenite::WebSocket;
use tungstenite::protocol::Message;

use super::{Clients, WsActor};
use crate::reload::message::HotReloadMessage;

/// Poll interval of the reader thread
const READ_POLL: Duration = Duration::from_millis(100);

impl WsActor {
    /// Greet a handshaken client and register it.
    pub(super) fn add_client(&self, mut ws: WebSocket<TcpStream>) {
        // The reader thread polls, so reads must not block
        let _ = ws.get_ref().set_nonblocking(true);

        let mut greeting = vec![HotReloadMessage::connected()];
        greeting.extend(self.pending_error.clone());
        for msg in greeting {
            if let Err(e) = ws.send(Message::Text(msg.to_json().into())) {
                crate::log!("ws"; "failed to greet client: {}", e);
                return;
            }
        }

        let mut clients = self.clients.lock();
        clients.push(ws);
        crate::debug!("ws"; "client connected (total: {})", clients.len());
    }
}

/// Drain client frames so closes and dead sockets are noticed.
pub(super) fn reader_loop(clients: &Clients, stop: &AtomicBool) {
    while !stop.load(Ordering::SeqCst) {
        std::thread::sleep(READ_POLL);

        clients.lock().retain_mut(|ws| match ws.read() {
            Ok(Message::Close(_)) => false,
            Ok(_) => true,
            Err(tungstenite::Error::Io(ref e)) if e.kind() == ErrorKind::WouldBlock => true,
            Err(_) => false,
        });
    }
}
