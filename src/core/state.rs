//! Shutdown state for long-running modes.
//!
//! - `SHUTDOWN`: has Ctrl+C been received?
//! - `SERVER`: preview server to unblock on shutdown
//! - `SHUTDOWN_TX`: wakes the watch loop

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use crossbeam::channel::{self, Receiver, Sender};
use tiny_http::Server;

/// Shutdown has been requested (Ctrl+C received)
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// HTTP server reference for graceful shutdown
static SERVER: OnceLock<Arc<Server>> = OnceLock::new();

/// Shutdown signal channel, created on first use
static SHUTDOWN_CHANNEL: OnceLock<(Sender<()>, Receiver<()>)> = OnceLock::new();

fn channel() -> &'static (Sender<()>, Receiver<()>) {
    SHUTDOWN_CHANNEL.get_or_init(channel::unbounded)
}

/// Setup the global Ctrl+C handler. Call once at program start.
///
/// Before anything long-running is registered the process exits right away;
/// afterwards the server is unblocked and the watch loop is signalled.
pub fn setup_shutdown_handler() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        SHUTDOWN.store(true, Ordering::SeqCst);
        let _ = channel().0.send(());

        if let Some(server) = SERVER.get() {
            crate::log!("serve"; "shutting down...");
            server.unblock();
        } else if !LONG_RUNNING.load(Ordering::SeqCst) {
            std::process::exit(130);
        }
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}

/// Set once something (watcher or server) wants a graceful shutdown.
static LONG_RUNNING: AtomicBool = AtomicBool::new(false);

/// Register the HTTP server for graceful shutdown
pub fn register_server(server: Arc<Server>) {
    LONG_RUNNING.store(true, Ordering::SeqCst);
    let _ = SERVER.set(server);
}

/// Receiver that yields once Ctrl+C is pressed.
pub fn shutdown_signal() -> Receiver<()> {
    LONG_RUNNING.store(true, Ordering::SeqCst);
    channel().1.clone()
}

/// Check if shutdown has been requested
pub fn is_shutdown() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_shutdown_by_default() {
        assert!(!is_shutdown());
    }

    #[test]
    fn test_shutdown_signal_is_shared() {
        let rx = shutdown_signal();
        channel().0.send(()).unwrap();
        assert!(rx.try_recv().is_ok());
    }
}
