//! Preview server over the HTML root with live reload.
//!
//! ```text
//! browser ──HTTP──► tiny_http ──► rayon pool ──► resolve ──► file / listing / 404
//!    ▲                                              │
//!    └──────────────WS (reload::server)◄────────────┘ reload.js injected into HTML
//! ```

mod path;
mod response;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use tiny_http::{Request, Server};

use crate::config::PipelineConfig;
use crate::core::{is_shutdown, register_server};
use crate::embed::serve::RELOAD_JS_PATH;
use crate::reload::{ReloadHandle, start_ws_server};
use crate::utils::exec::Cmd;
use crate::{debug, log};

use path::Target;

/// Maximum number of port binding attempts.
const MAX_PORT_RETRIES: u16 = 10;

/// Worker threads answering requests.
const REQUEST_THREADS: usize = 4;

/// Start the WebSocket and HTTP servers, returning the reload handle.
///
/// The request loop runs on its own thread until shutdown unblocks it.
pub fn start(config: Arc<PipelineConfig>) -> Result<ReloadHandle> {
    let reload = start_ws_server(config.serve.interface, config.serve.ws_port)?;

    let (server, addr) = bind_with_retry(config.serve.interface, config.serve.port)?;
    let server = Arc::new(server);
    register_server(Arc::clone(&server));

    spawn_request_loop(server, config.paths.html_path.clone(), reload.port())?;

    let url = format!("http://{}", browsable(addr));
    log!("serve"; "{} (serving {})", url, config.root_relative(&config.paths.html_path).display());

    if config.serve.open {
        open_browser(url);
    }

    Ok(reload)
}

/// Bind to the specified interface and port, with automatic port retry.
fn bind_with_retry(interface: IpAddr, base_port: u16) -> Result<(Server, SocketAddr)> {
    let mut last_error = String::new();

    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);

        match Server::http(SocketAddr::new(interface, port)) {
            Ok(server) => {
                let addr = server
                    .server_addr()
                    .to_ip()
                    .unwrap_or_else(|| SocketAddr::new(interface, port));
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, addr.port());
                }
                return Ok((server, addr));
            }
            Err(e) => last_error = e.to_string(),
        }
    }

    anyhow::bail!(
        "Failed to bind after {} attempts (ports {}-{}): {}",
        MAX_PORT_RETRIES,
        base_port,
        base_port.saturating_add(MAX_PORT_RETRIES - 1),
        last_error
    )
}

fn spawn_request_loop(server: Arc<Server>, root: PathBuf, ws_port: u16) -> Result<()> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(REQUEST_THREADS)
        .thread_name(|i| format!("spritely-http-{i}"))
        .build()
        .context("Failed to create request thread pool")?;
    let root = Arc::new(root);

    thread::Builder::new()
        .name("spritely-serve".into())
        .spawn(move || {
            for request in server.incoming_requests() {
                let root = Arc::clone(&root);
                pool.spawn(move || {
                    if let Err(e) = handle_request(request, &root, ws_port) {
                        log!("serve"; "request error: {e}");
                    }
                });
            }
            debug!("serve"; "request loop stopped");
        })
        .context("Failed to spawn server thread")?;

    Ok(())
}

/// Handle a single HTTP request
fn handle_request(request: Request, root: &Path, ws_port: u16) -> Result<()> {
    if is_shutdown() {
        return response::respond_unavailable(request);
    }

    let url = request.url().to_string();
    debug!("serve"; "{} {}", request.method(), url);

    if url.split('?').next() == Some(RELOAD_JS_PATH) {
        return response::respond_reload_js(request, ws_port);
    }

    match path::resolve(&url, root) {
        Some(Target::File(file)) => response::respond_file(request, &file),
        Some(Target::Listing(dir)) => {
            response::respond_listing(request, &dir, &path::normalize_url(&url))
        }
        None => response::respond_not_found(request),
    }
}

/// Address a browser can open: wildcard binds are reached via loopback.
fn browsable(addr: SocketAddr) -> SocketAddr {
    if addr.ip().is_unspecified() {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), addr.port())
    } else {
        addr
    }
}

fn open_browser(url: String) {
    let opener: &'static [&'static str] = if cfg!(target_os = "macos") {
        &["open"]
    } else if cfg!(windows) {
        &["cmd", "/C", "start", ""]
    } else {
        &["xdg-open"]
    };

    thread::spawn(move || {
        if let Err(e) = Cmd::from_slice(opener).arg(&url).run() {
            log!("serve"; "could not open browser: {}", e);
        }
    });
}
