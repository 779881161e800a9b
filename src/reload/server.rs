//! WebSocket Server for Live Reload
//!
//! Accepts connections, runs each handshake on its own short-lived thread
//! and hands finished `WebSocket`s to the `WsActor`, which owns the clients
//! from then on.

use std::net::{IpAddr, TcpListener, TcpStream};
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tungstenite::WebSocket;

use crate::actor::messages::WsMsg;

/// Maximum port retry attempts
pub const MAX_PORT_RETRIES: u16 = 10;

/// A peer that has not sent its upgrade request by then is dropped.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(2);

/// Start the acceptor thread. Returns the port actually bound.
///
/// The thread exits on shutdown or once the actor is gone.
pub fn start_ws_server(interface: IpAddr, base_port: u16, ws_tx: mpsc::Sender<WsMsg>) -> Result<u16> {
    let (listener, actual_port) = try_bind_port(interface, base_port, MAX_PORT_RETRIES)?;
    listener.set_nonblocking(true)?;

    std::thread::spawn(move || {
        while !crate::core::is_shutdown() {
            if ws_tx.is_closed() {
                crate::debug!("reload"; "actor gone, stopping acceptor");
                break;
            }
            match listener.accept() {
                Ok((stream, addr)) => {
                    crate::debug!("reload"; "client connected: {}", addr);
                    let ws_tx = ws_tx.clone();
                    std::thread::spawn(move || {
                        if let Some(ws) = handshake(stream) {
                            let _ = ws_tx.blocking_send(WsMsg::AddClient(ws));
                        }
                    });
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    std::thread::sleep(Duration::from_millis(100));
                }
                Err(e) => {
                    crate::log!("reload"; "accept error: {}", e);
                    std::thread::sleep(Duration::from_millis(100));
                }
            }
        }
    });

    Ok(actual_port)
}

/// Upgrade `stream`, giving up after `HANDSHAKE_TIMEOUT` of silence.
fn handshake(stream: TcpStream) -> Option<WebSocket<TcpStream>> {
    let configured = stream
        .set_nonblocking(false)
        .and_then(|()| stream.set_read_timeout(Some(HANDSHAKE_TIMEOUT)));
    if let Err(e) = configured {
        crate::debug!("reload"; "cannot configure client socket: {}", e);
        return None;
    }

    match tungstenite::accept(stream) {
        Ok(ws) => {
            let _ = ws.get_ref().set_read_timeout(None);
            Some(ws)
        }
        Err(e) => {
            crate::debug!("reload"; "handshake failed: {}", e);
            None
        }
    }
}

/// Try binding to port, retry with incremented port if in use
fn try_bind_port(interface: IpAddr, base_port: u16, max_retries: u16) -> Result<(TcpListener, u16)> {
    let mut last_error = None;

    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        match TcpListener::bind((interface, port)) {
            Ok(listener) => {
                let actual_port = listener.local_addr()?.port();
                if offset > 0 {
                    crate::debug!("reload"; "port {} in use, using {}", base_port, actual_port);
                }
                return Ok((listener, actual_port));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(anyhow::anyhow!(
        "Failed to bind WebSocket server after {} attempts: {}",
        max_retries,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use tungstenite::protocol::Message;

    use crate::actor::ws::WsActor;

    const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    #[test]
    fn test_bind_retries_next_port() {
        let (taken, port) = try_bind_port(LOCALHOST, 0, 1).unwrap();
        // Port 0 asks the OS; reuse the assigned port to force a retry.
        let result = try_bind_port(LOCALHOST, port, 3);
        if let Ok((_, next)) = result {
            assert_ne!(next, port);
        }
        drop(taken);
    }

    #[test]
    fn test_bind_fails_after_retries() {
        let (_taken, port) = try_bind_port(LOCALHOST, 0, 1).unwrap();
        let err = try_bind_port(LOCALHOST, port, 1).unwrap_err();
        assert!(err.to_string().contains("after 1 attempts"));
    }

    #[test]
    fn test_silent_peer_times_out() {
        let listener = TcpListener::bind((LOCALHOST, 0)).unwrap();
        let addr = listener.local_addr().unwrap();
        let _idle = TcpStream::connect(addr).unwrap();
        let (stream, _) = listener.accept().unwrap();

        let started = std::time::Instant::now();
        assert!(handshake(stream).is_none());
        assert!(started.elapsed() < HANDSHAKE_TIMEOUT * 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_idle_peer_does_not_delay_other_clients() {
        let (ws_tx, ws_rx) = mpsc::channel(8);
        let actor = tokio::spawn(WsActor::new(ws_rx).run());
        let port = start_ws_server(LOCALHOST, 0, ws_tx.clone()).unwrap();

        let greeting = tokio::task::spawn_blocking(move || {
            // Connects but never sends an upgrade request.
            let _idle = TcpStream::connect((LOCALHOST, port)).unwrap();

            let stream = TcpStream::connect((LOCALHOST, port)).unwrap();
            stream.set_read_timeout(Some(Duration::from_secs(1))).unwrap();
            let (mut ws, _) = tungstenite::client(format!("ws://127.0.0.1:{port}/"), stream).unwrap();
            loop {
                if let Message::Text(text) = ws.read().unwrap() {
                    return text.as_str().to_owned();
                }
            }
        })
        .await
        .unwrap();
        assert!(greeting.contains(r#""type":"connected""#));

        ws_tx.send(WsMsg::Shutdown).await.unwrap();
        actor.await.unwrap();
    }
}
