//! Per-group SCSS fragment rendering.
//!
//! ```scss
//! $sp_icons-image: '../img/sprite/sp_icons.png';
//! $sp_icons-width: 74px;
//! $sp_icons-height: 24px;
//!
//! $sp_icons: (
//!   'arrow': (0px, 0px, 0px, 0px, 24px, 24px),
//!   'close': (34px, 0px, -34px, 0px, 16px, 16px),
//! );
//! ```
//!
//! Each frame entry is `(x, y, offset-x, offset-y, width, height)`, where the
//! offsets are ready to use as `background-position`.

use std::fmt::Write;

use super::PackedSheet;

pub fn render(sheet: &PackedSheet, image_url: &str) -> String {
    let ident = super::ident(&sheet.group);
    let mut out = String::with_capacity(128 + sheet.frames.len() * 64);

    // Infallible: writing into a String.
    let _ = writeln!(
        out,
        "// Generated from sprite group `{}`; changes are overwritten.",
        sheet.group
    );
    let _ = writeln!(out, "${ident}-image: '{}';", escape(image_url));
    let _ = writeln!(out, "${ident}-width: {}px;", sheet.width);
    let _ = writeln!(out, "${ident}-height: {}px;", sheet.height);
    out.push('\n');

    let _ = writeln!(out, "${ident}: (");
    for frame in &sheet.frames {
        let r = frame.rect;
        let _ = writeln!(
            out,
            "  '{}': ({}px, {}px, {}px, {}px, {}px, {}px),",
            escape(&frame.name),
            r.x,
            r.y,
            offset(r.x),
            offset(r.y),
            r.width,
            r.height,
        );
    }
    out.push_str(");\n");
    out
}

fn offset(v: u32) -> i64 {
    -i64::from(v)
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}
