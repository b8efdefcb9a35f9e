//! WebSocket server for live reload.
//!
//! An acceptor thread performs the handshake and registers clients; a reader
//! thread drains incoming frames and drops closed connections. Broadcasts go
//! through `ReloadHandle`, which any task may clone.

use std::io::ErrorKind;
use std::net::{IpAddr, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use parking_lot::Mutex;
use tungstenite::WebSocket;
use tungstenite::protocol::Message;

use super::message::ReloadMessage;
use crate::core::is_shutdown;
use crate::{debug, log};

/// Maximum port retry attempts
const MAX_PORT_RETRIES: u16 = 10;

/// Poll interval of the acceptor and reader threads
const POLL_INTERVAL: Duration = Duration::from_millis(100);

type Clients = Arc<Mutex<Vec<WebSocket<TcpStream>>>>;

/// Cloneable sender side of the live-reload server.
#[derive(Clone)]
pub struct ReloadHandle {
    clients: Clients,
    port: u16,
}

impl std::fmt::Debug for ReloadHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadHandle")
            .field("port", &self.port)
            .field("clients", &self.client_count())
            .finish()
    }
}

impl ReloadHandle {
    /// Port the server actually bound.
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn client_count(&self) -> usize {
        self.clients.lock().len()
    }

    /// Ask every client for a full reload.
    pub fn reload(&self, reason: &str) {
        debug!("reload"; "reload: {}", reason);
        self.broadcast(&ReloadMessage::reload_with_reason(reason));
    }

    /// Ask every client to re-fetch its stylesheets.
    pub fn refresh_css(&self) {
        self.broadcast(&ReloadMessage::Css);
    }

    /// Send to all clients, dropping any that fail.
    pub fn broadcast(&self, msg: &ReloadMessage) {
        let text = Message::Text(msg.to_json().into());
        let mut clients = self.clients.lock();
        if clients.is_empty() {
            debug!("reload"; "no clients connected");
            return;
        }

        clients.retain_mut(|ws| keep_after_send(ws.send(text.clone())));
        debug!("reload"; "broadcast to {} clients", clients.len());
    }
}

/// Whether a client survives a send. A full socket buffer keeps the frame
/// queued inside tungstenite; the reader loop flushes it later.
fn keep_after_send(result: tungstenite::Result<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(tungstenite::Error::Io(ref e)) if e.kind() == ErrorKind::WouldBlock => true,
        Err(e) => {
            debug!("reload"; "client disconnected: {}", e);
            false
        }
    }
}

/// Bind the WebSocket server and start its threads.
pub fn start_ws_server(interface: IpAddr, base_port: u16) -> Result<ReloadHandle> {
    let (listener, port) = try_bind_port(interface, base_port, MAX_PORT_RETRIES)?;
    listener.set_nonblocking(true)?;

    let clients: Clients = Arc::new(Mutex::new(Vec::new()));

    let registry = Arc::clone(&clients);
    thread::spawn(move || accept_loop(&listener, &registry));

    let registry = Arc::clone(&clients);
    thread::spawn(move || reader_loop(&registry));

    debug!("reload"; "ws://{}", SocketAddr::new(interface, port));
    Ok(ReloadHandle { clients, port })
}

fn accept_loop(listener: &TcpListener, clients: &Clients) {
    while !is_shutdown() {
        match listener.accept() {
            Ok((stream, addr)) => {
                debug!("reload"; "client connected: {}", addr);
                // Blocking for the handshake, non-blocking for polled reads
                let _ = stream.set_nonblocking(false);
                add_client(stream, clients);
            }
            Err(ref e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                log!("reload"; "accept error: {}", e);
                thread::sleep(POLL_INTERVAL);
            }
        }
    }
}

fn add_client(stream: TcpStream, clients: &Clients) {
    match tungstenite::accept(stream) {
        Ok(mut ws) => {
            if let Err(e) = ws.send(Message::Text(ReloadMessage::connected().to_json().into())) {
                log!("reload"; "failed to send connected message: {}", e);
                return;
            }
            let _ = ws.get_ref().set_nonblocking(true);

            let mut clients = clients.lock();
            clients.push(ws);
            debug!("reload"; "client registered (total: {})", clients.len());
        }
        Err(e) => log!("reload"; "handshake failed: {}", e),
    }
}

/// Drain client frames so pings are answered and closed sockets are pruned.
fn reader_loop(clients: &Clients) {
    while !is_shutdown() {
        thread::sleep(POLL_INTERVAL);

        let mut clients = clients.lock();
        clients.retain_mut(|ws| match ws.read() {
            Ok(Message::Close(_)) => false,
            Ok(_) => true,
            Err(tungstenite::Error::Io(ref e)) if e.kind() == ErrorKind::WouldBlock => true,
            Err(_) => false,
        });
    }
}

/// Try binding to port, retry with incremented port if in use
fn try_bind_port(interface: IpAddr, base_port: u16, max_retries: u16) -> Result<(TcpListener, u16)> {
    let mut last_error = None;

    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        match TcpListener::bind(SocketAddr::new(interface, port)) {
            Ok(listener) => {
                let actual_port = listener.local_addr()?.port();
                if offset > 0 {
                    log!("reload"; "port {} in use, using {} instead", base_port, actual_port);
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

    const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    #[test]
    fn test_try_bind_port_skips_taken() {
        let (held, port) = try_bind_port(LOCALHOST, 0, 1).unwrap();
        let (_, next) = try_bind_port(LOCALHOST, port, 3).unwrap();
        assert_ne!(next, port);
        drop(held);
    }

    #[test]
    fn test_client_receives_connected_and_broadcasts() {
        let handle = start_ws_server(LOCALHOST, 0).unwrap();
        let url = format!("ws://127.0.0.1:{}", handle.port());
        let (mut ws, _) = tungstenite::connect(url).unwrap();

        let first = ws.read().unwrap();
        let msg = ReloadMessage::from_json(first.to_text().unwrap()).unwrap();
        assert!(matches!(msg, ReloadMessage::Connected { .. }));

        // Registration happens right after the connected message is sent.
        for _ in 0..50 {
            if handle.client_count() == 1 {
                break;
            }
            thread::sleep(Duration::from_millis(20));
        }
        handle.refresh_css();
        let next = ws.read().unwrap();
        assert_eq!(next.to_text().unwrap(), r#"{"type":"css"}"#);
    }

    #[test]
    fn test_full_send_buffer_keeps_client() {
        let would_block = std::io::Error::from(ErrorKind::WouldBlock);
        assert!(keep_after_send(Err(tungstenite::Error::Io(would_block))));
        assert!(keep_after_send(Ok(())));

        let reset = std::io::Error::from(ErrorKind::ConnectionReset);
        assert!(!keep_after_send(Err(tungstenite::Error::Io(reset))));
        assert!(!keep_after_send(Err(tungstenite::Error::ConnectionClosed)));
    }

    #[test]
    fn test_broadcast_without_clients_is_noop() {
        let handle = ReloadHandle {
            clients: Arc::new(Mutex::new(Vec::new())),
            port: 0,
        };
        handle.reload("nothing listening");
        assert_eq!(handle.client_count(), 0);
    }
}
