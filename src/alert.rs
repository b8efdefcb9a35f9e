//! Desktop notifications for failed tasks (`build.notify`).
//!
//! Uses `notify-send` on Linux and `osascript` on macOS. A missing notifier
//! is logged once at debug level and otherwise ignored.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::debug;
use crate::utils::exec::Cmd;

/// Longest message body passed to the notifier.
const MAX_BODY: usize = 240;

static MISSING_REPORTED: AtomicBool = AtomicBool::new(false);

/// Show a notification for a failed task. Never fails.
pub fn notify_failure(task: &str, error: &anyhow::Error) {
    let title = format!("spritely: `{task}` failed");
    let body = summarize(&format!("{error:#}"));

    let Some(cmd) = notifier(&title, &body) else {
        report_missing("no notifier for this platform");
        return;
    };
    if let Err(e) = cmd.run() {
        report_missing(&format!("{e:#}"));
    }
}

#[cfg(target_os = "macos")]
fn notifier(title: &str, body: &str) -> Option<Cmd> {
    let script = format!(
        "display notification \"{}\" with title \"{}\" sound name \"Pop\"",
        escape_applescript(body),
        escape_applescript(title)
    );
    Some(Cmd::new("osascript").arg("-e").arg(script))
}

#[cfg(all(unix, not(target_os = "macos")))]
fn notifier(title: &str, body: &str) -> Option<Cmd> {
    Some(Cmd::new("notify-send").args(["--app-name=spritely", title, body]))
}

#[cfg(not(unix))]
fn notifier(_title: &str, _body: &str) -> Option<Cmd> {
    None
}

fn report_missing(reason: &str) {
    if !MISSING_REPORTED.swap(true, Ordering::SeqCst) {
        debug!("notify"; "notifications unavailable: {}", reason);
    }
}

/// First line of the error, trimmed to `MAX_BODY` characters.
fn summarize(message: &str) -> String {
    let first = message.lines().next().unwrap_or_default().trim();
    if first.chars().count() <= MAX_BODY {
        return first.to_string();
    }
    let mut cut: String = first.chars().take(MAX_BODY - 1).collect();
    cut.push('…');
    cut
}

#[cfg(any(target_os = "macos", test))]
fn escape_applescript(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_keeps_first_line() {
        assert_eq!(summarize("Command `sass` failed\nline 2"), "Command `sass` failed");
    }

    #[test]
    fn test_summarize_truncates() {
        let long = "x".repeat(MAX_BODY * 2);
        let out = summarize(&long);
        assert_eq!(out.chars().count(), MAX_BODY);
        assert!(out.ends_with('…'));
    }

    #[test]
    fn test_escape_applescript() {
        assert_eq!(escape_applescript(r#"say "hi" \o/"#), r#"say \"hi\" \\o/"#);
    }
}
