//! WebSocket Actor - Live Reload Broadcast
//!
//! This actor is responsible for:
//! - Managing WebSocket client connections
//! - Broadcasting reload/css/error messages to all connected clients
//! - Replaying the current error to clients that connect later
//!
//! # Architecture
//!
//! ```text
//! ReloadActor/TaskActor --[WsMsg]--> WsActor --[broadcast]--> Clients
//!                                               reader thread <--+ (close)
//! ```

mod client_io;
mod delivery;

use std::net::TcpStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tungstenite::WebSocket;

use super::messages::WsMsg;
use crate::reload::message::HotReloadMessage;

type Clients = Arc<Mutex<Vec<WebSocket<TcpStream>>>>;

/// WebSocket Actor - manages client connections and broadcasts
pub struct WsActor {
    /// Channel to receive messages
    rx: mpsc::Receiver<WsMsg>,
    /// Connected clients (shared for broadcast + read thread)
    clients: Clients,
    /// Error to show to clients connecting while a task is failing
    pending_error: Option<HotReloadMessage>,
    /// Stops the reader thread
    stop: Arc<AtomicBool>,
}

impl WsActor {
    pub fn new(rx: mpsc::Receiver<WsMsg>) -> Self {
        Self {
            rx,
            clients: Arc::new(Mutex::new(Vec::new())),
            pending_error: None,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        let clients = Arc::clone(&self.clients);
        let stop = Arc::clone(&self.stop);
        std::thread::spawn(move || client_io::reader_loop(&clients, &stop));

        while let Some(msg) = self.rx.recv().await {
            match msg {
                WsMsg::Reload { reason } => {
                    crate::debug!("ws"; "sending reload: {}", reason);
                    self.broadcast(&HotReloadMessage::reload_with_reason(reason));
                }

                WsMsg::Css { paths } => {
                    self.broadcast(&HotReloadMessage::css(paths));
                }

                WsMsg::Error { task, error } => {
                    let msg = HotReloadMessage::error(task, error);
                    self.broadcast(&msg);
                    self.pending_error = Some(msg);
                }

                WsMsg::ClearError => {
                    self.pending_error = None;
                    self.broadcast(&HotReloadMessage::ClearError);
                }

                WsMsg::AddClient(ws) => self.add_client(ws),

                WsMsg::Shutdown => {
                    crate::debug!("ws"; "shutting down");
                    break;
                }
            }
        }

        self.stop.store(true, Ordering::SeqCst);
        let mut clients = self.clients.lock();
        for mut ws in clients.drain(..) {
            let _ = ws.close(None);
            let _ = ws.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::{TcpListener, TcpStream};
    use std::time::Duration;

    use tungstenite::protocol::Message;

    use super::*;

    #[test]
    fn test_broadcast_without_clients_is_noop() {
        let (_tx, rx) = mpsc::channel(1);
        let actor = WsActor::new(rx);
        actor.broadcast(&HotReloadMessage::reload_with_reason("x"));
        assert!(actor.clients.lock().is_empty());
    }

    /// A handshaken (server, client) pair over loopback.
    fn connect_pair() -> (WebSocket<TcpStream>, WebSocket<TcpStream>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = std::thread::spawn(move || {
            let stream = TcpStream::connect(addr).unwrap();
            stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
            tungstenite::client(format!("ws://{addr}/"), stream).unwrap().0
        });
        let (stream, _) = listener.accept().unwrap();
        let server = tungstenite::accept(stream).unwrap();
        (server, client.join().unwrap())
    }

    /// Next text frame, skipping control frames.
    fn read_text(ws: &mut WebSocket<TcpStream>) -> String {
        loop {
            if let Message::Text(text) = ws.read().unwrap() {
                return text.as_str().to_owned();
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_client_receives_greeting_and_broadcast() {
        let (tx, rx) = mpsc::channel(8);
        let actor = tokio::spawn(WsActor::new(rx).run());
        let (server, client) = tokio::task::spawn_blocking(connect_pair).await.unwrap();

        tx.send(WsMsg::Error {
            task: "styles".into(),
            error: "boom".into(),
        })
        .await
        .unwrap();
        tx.send(WsMsg::AddClient(server)).await.unwrap();
        tx.send(WsMsg::Reload {
            reason: "index.html".into(),
        })
        .await
        .unwrap();

        let texts = tokio::task::spawn_blocking(move || {
            let mut client = client;
            (0..3).map(|_| read_text(&mut client)).collect::<Vec<_>>()
        })
        .await
        .unwrap();
        assert!(texts[0].contains(r#""type":"connected""#));
        // Late joiners see the current error.
        assert_eq!(texts[1], r#"{"type":"error","task":"styles","error":"boom"}"#);
        assert_eq!(texts[2], r#"{"type":"reload","reason":"index.html"}"#);

        tx.send(WsMsg::Shutdown).await.unwrap();
        actor.await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_disconnected_client_leaves_broadcast_set() {
        let (tx, rx) = mpsc::channel(8);
        let actor = WsActor::new(rx);
        let clients = Arc::clone(&actor.clients);
        let handle = tokio::spawn(actor.run());

        let (server_a, stays) = tokio::task::spawn_blocking(connect_pair).await.unwrap();
        let (server_b, leaves) = tokio::task::spawn_blocking(connect_pair).await.unwrap();
        tx.send(WsMsg::AddClient(server_a)).await.unwrap();
        tx.send(WsMsg::AddClient(server_b)).await.unwrap();

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while clients.lock().len() < 2 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(clients.lock().len(), 2);

        // Mid-session disconnect without a close frame.
        drop(leaves);
        while clients.lock().len() > 1 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        tx.send(WsMsg::Reload {
            reason: "about.html".into(),
        })
        .await
        .unwrap();

        let texts = tokio::task::spawn_blocking(move || {
            let mut stays = stays;
            (0..2).map(|_| read_text(&mut stays)).collect::<Vec<_>>()
        })
        .await
        .unwrap();
        assert!(texts[0].contains(r#""type":"connected""#));
        assert_eq!(texts[1], r#"{"type":"reload","reason":"about.html"}"#);
        assert_eq!(clients.lock().len(), 1);

        tx.send(WsMsg::Shutdown).await.unwrap();
        handle.await.unwrap();
    }
}
