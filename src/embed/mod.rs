//! Embedded static resources for the preview server.
//!
//! ```ignore
//! use embed::serve::{RELOAD_JS, ReloadVars};
//!
//! let js = RELOAD_JS.render(&ReloadVars { ws_port: 35729 });
//! ```

mod template;

pub use template::{Template, TemplateVars};

pub mod serve {
    use super::{Template, TemplateVars};

    /// URL the live-reload client is served from.
    pub const RELOAD_JS_PATH: &str = "/__spritely/reload.js";

    /// Variables for reload.js.
    pub struct ReloadVars {
        pub ws_port: u16,
    }

    impl TemplateVars for ReloadVars {
        fn apply(&self, content: &str) -> String {
            content.replace("__SPRITELY_WS_PORT__", &self.ws_port.to_string())
        }
    }

    /// Live-reload client with WebSocket port injection.
    pub const RELOAD_JS: Template<ReloadVars> = Template::new(include_str!("serve/reload.js"));

    /// `<script>` tag injected before `</body>` of served HTML.
    pub fn reload_tag() -> String {
        format!(r#"<script src="{RELOAD_JS_PATH}" defer></script>"#)
    }

    /// Variables for listing.html.
    pub struct ListingVars {
        /// Escaped request path
        pub title: String,
        /// Pre-rendered `<li>` rows
        pub rows: String,
    }

    impl TemplateVars for ListingVars {
        fn apply(&self, content: &str) -> String {
            content
                .replace("__TITLE__", &self.title)
                .replace("__ROWS__", &self.rows)
        }
    }

    /// Directory listing page.
    pub const LISTING_HTML: Template<ListingVars> =
        Template::new(include_str!("serve/listing.html"));
}

#[cfg(test)]
mod tests {
    use super::serve::*;

    #[test]
    fn test_reload_js_port_injection() {
        let js = RELOAD_JS.render(&ReloadVars { ws_port: 40000 });
        assert!(js.contains("40000"));
        assert!(!js.contains("__SPRITELY_WS_PORT__"));
    }

    #[test]
    fn test_listing_render() {
        let html = LISTING_HTML.render(&ListingVars {
            title: "/css/".into(),
            rows: "<li>x</li>".into(),
        });
        assert!(html.contains("<title>Index of /css/</title>"));
        assert!(html.contains("<li>x</li>"));
    }

    #[test]
    fn test_reload_tag_points_at_script() {
        assert!(reload_tag().contains(RELOAD_JS_PATH));
    }
}
