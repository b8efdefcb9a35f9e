//! HTTP response handlers.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use tiny_http::{Header, Method, Request, Response, StatusCode};

use crate::embed::serve::{LISTING_HTML, ListingVars, RELOAD_JS, ReloadVars, reload_tag};
use crate::utils::mime::{self, types};
use crate::utils::path::is_hidden;

/// Characters escaped in listing hrefs.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`');

/// Respond with a static file, injecting the reload script into HTML.
pub fn respond_file(request: Request, path: &Path) -> Result<()> {
    let content_type = mime::from_path(path);

    if is_head_request(&request) {
        return send_head(request, 200, content_type);
    }

    let body = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let body = if content_type == types::HTML {
        inject_reload_script(&body)
    } else {
        body
    };

    send_body(request, 200, content_type, body)
}

/// Respond with a directory index.
pub fn respond_listing(request: Request, dir: &Path, url_path: &str) -> Result<()> {
    if is_head_request(&request) {
        return send_head(request, 200, types::HTML);
    }

    let html = render_listing(dir, url_path)?;
    send_body(request, 200, types::HTML, inject_reload_script(html.as_bytes()))
}

pub fn respond_not_found(request: Request) -> Result<()> {
    if is_head_request(&request) {
        return send_head(request, 404, types::PLAIN);
    }
    send_body(request, 404, types::PLAIN, b"404 Not Found".to_vec())
}

/// Respond with 503 Service Unavailable (server shutting down).
pub fn respond_unavailable(request: Request) -> Result<()> {
    send_body(request, 503, types::PLAIN, b"503 Service Unavailable".to_vec())
}

/// Respond with reload.js from memory.
pub fn respond_reload_js(request: Request, ws_port: u16) -> Result<()> {
    let body = RELOAD_JS.render(&ReloadVars { ws_port });
    send_body(request, 200, types::JAVASCRIPT, body.into_bytes())
}

// ============================================================================
// Body rendering
// ============================================================================

/// Insert the reload `<script>` before the last `</body>`, or append it.
pub fn inject_reload_script(content: &[u8]) -> Vec<u8> {
    const PATTERN: &[u8] = b"</body>";

    let script = reload_tag();
    let script_bytes = script.as_bytes();
    let mut result = Vec::with_capacity(content.len() + script_bytes.len());

    match content
        .windows(PATTERN.len())
        .rposition(|w| w.eq_ignore_ascii_case(PATTERN))
    {
        Some(pos) => {
            result.extend_from_slice(&content[..pos]);
            result.extend_from_slice(script_bytes);
            result.extend_from_slice(&content[pos..]);
        }
        None => {
            result.extend_from_slice(content);
            result.extend_from_slice(script_bytes);
        }
    }
    result
}

/// Render the listing page for `dir`, reached at `url_path` (no slashes at
/// either end).
pub fn render_listing(dir: &Path, url_path: &str) -> Result<String> {
    let mut entries: Vec<(String, bool)> = fs::read_dir(dir)
        .with_context(|| format!("Failed to list {}", dir.display()))?
        .filter_map(Result::ok)
        .filter(|e| !is_hidden(&e.path()))
        .map(|e| {
            let is_dir = e.file_type().is_ok_and(|t| t.is_dir());
            (e.file_name().to_string_lossy().into_owned(), is_dir)
        })
        .collect();

    // Directories first, then by name
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let mut rows = String::new();
    if !url_path.is_empty() {
        rows.push_str("<li><a href=\"../\">../</a></li>\n");
    }
    for (name, is_dir) in &entries {
        let slash = if *is_dir { "/" } else { "" };
        let href = utf8_percent_encode(name, SEGMENT);
        rows.push_str(&format!(
            "<li><a href=\"{href}{slash}\">{}{slash}</a></li>\n",
            escape_html(name)
        ));
    }

    let title = if url_path.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", escape_html(url_path))
    };

    Ok(LISTING_HTML.render(&ListingVars { title, rows }))
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

// ============================================================================
// Transport
// ============================================================================

fn is_head_request(request: &Request) -> bool {
    request.method() == &Method::Head
}

fn send_head(request: Request, status: u16, content_type: &'static str) -> Result<()> {
    let response = Response::empty(StatusCode(status))
        .with_header(make_header("Content-Type", content_type)?)
        .with_header(make_header("Cache-Control", "no-cache")?);
    request.respond(response)?;
    Ok(())
}

fn send_body(
    request: Request,
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
) -> Result<()> {
    let response = Response::from_data(body)
        .with_status_code(StatusCode(status))
        .with_header(make_header("Content-Type", content_type)?)
        .with_header(make_header("Cache-Control", "no-cache")?);
    request.respond(response)?;
    Ok(())
}

fn make_header(key: &'static str, value: &'static str) -> Result<Header> {
    Header::from_bytes(key, value).map_err(|()| anyhow::anyhow!("invalid header `{key}`"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn injected(html: &str) -> String {
        String::from_utf8(inject_reload_script(html.as_bytes())).unwrap()
    }

    #[test]
    fn test_inject_before_last_body() {
        let out = injected("<html><body><p>x</p></BODY></html>");
        let script = out.find("<script").unwrap();
        assert!(script < out.find("</BODY>").unwrap());
        assert!(out.ends_with("</BODY></html>"));
    }

    #[test]
    fn test_inject_without_body_appends() {
        let out = injected("<p>fragment</p>");
        assert!(out.starts_with("<p>fragment</p><script"));
    }

    #[test]
    fn test_listing_orders_dirs_first() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.html"), "").unwrap();
        fs::write(dir.path().join(".hidden"), "").unwrap();
        fs::create_dir(dir.path().join("z dir")).unwrap();

        let html = render_listing(dir.path(), "").unwrap();
        let dir_pos = html.find("href=\"z%20dir/\"").unwrap();
        let file_pos = html.find("href=\"b.html\"").unwrap();
        assert!(dir_pos < file_pos);
        assert!(!html.contains(".hidden"));
        assert!(!html.contains("../"));
        assert!(html.contains("Index of /<"));
    }

    #[test]
    fn test_listing_nested_has_parent_link() {
        let dir = TempDir::new().unwrap();
        let html = render_listing(dir.path(), "img/<sprite>").unwrap();
        assert!(html.contains("href=\"../\""));
        assert!(html.contains("Index of /img/&lt;sprite&gt;/"));
    }
}
