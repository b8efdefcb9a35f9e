//! lightningcss wrappers: vendor prefixing and minification.

use anyhow::{Result, anyhow};
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};

use crate::config::Device;

/// Encode a browser version the way lightningcss expects it.
const fn version(major: u32, minor: u32) -> Option<u32> {
    Some((major << 16) | (minor << 8))
}

/// Oldest browsers each device class still supports.
///
/// Desktop keeps IE 8 and every Edge; mobile reaches back to the first
/// Android and iOS browsers.
pub fn targets_for(device: Device) -> Targets {
    let browsers = match device {
        Device::Desktop => Browsers {
            chrome: version(120, 0),
            edge: version(12, 0),
            firefox: version(120, 0),
            ie: version(8, 0),
            opera: version(105, 0),
            safari: version(16, 0),
            ..Browsers::default()
        },
        Device::Mobile => Browsers {
            android: version(2, 1),
            ios_saf: version(3, 2),
            firefox: version(4, 0),
            ..Browsers::default()
        },
    };
    Targets::from(browsers)
}

/// Add the vendor prefixes `targets` need. Output stays readable.
pub fn autoprefix(source: &str, filename: &str, targets: Targets) -> Result<String> {
    let mut sheet = parse(source, filename)?;
    sheet
        .minify(MinifyOptions {
            targets,
            ..MinifyOptions::default()
        })
        .map_err(|e| anyhow!("{filename}: {e}"))?;

    let out = sheet
        .to_css(PrinterOptions {
            targets,
            ..PrinterOptions::default()
        })
        .map_err(|e| anyhow!("{filename}: {e}"))?;
    Ok(out.code)
}

/// Minify without changing browser support.
pub fn minify_css(source: &str, filename: &str) -> Result<String> {
    let mut sheet = parse(source, filename)?;
    sheet
        .minify(MinifyOptions::default())
        .map_err(|e| anyhow!("{filename}: {e}"))?;

    let out = sheet
        .to_css(PrinterOptions {
            minify: true,
            ..PrinterOptions::default()
        })
        .map_err(|e| anyhow!("{filename}: {e}"))?;
    Ok(out.code)
}

fn parse<'i>(source: &'i str, filename: &str) -> Result<StyleSheet<'i>> {
    StyleSheet::parse(
        source,
        ParserOptions {
            filename: filename.to_string(),
            ..ParserOptions::default()
        },
    )
    .map_err(|e| anyhow!("{filename}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLEX: &str = ".row { display: flex; user-select: none; }";

    #[test]
    fn test_mobile_targets_prefix_flexbox() {
        let out = autoprefix(FLEX, "row.css", targets_for(Device::Mobile)).unwrap();
        assert!(out.contains("-webkit-box"), "{out}");
        assert!(out.contains("-webkit-user-select: none"), "{out}");
        assert!(out.contains("display: flex"), "{out}");
    }

    #[test]
    fn test_autoprefix_keeps_expanded_style() {
        let out = autoprefix(".a { color: red }", "a.css", targets_for(Device::Desktop)).unwrap();
        assert!(out.contains(".a {\n"));
    }

    #[test]
    fn test_minify_css() {
        let out = minify_css(".a {\n  margin: 0px 0px;\n}\n", "a.css").unwrap();
        assert_eq!(out, ".a{margin:0}");
    }
}
