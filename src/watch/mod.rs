//! Watch loop: filesystem events → debounced batches → task re-runs.
//!
//! ```text
//! notify ─► bridge thread ─► mpsc ─► Debouncer ─► Routes::plan ─► Session::run
//!                                                              └► ReloadHandle::reload
//! ```
//!
//! Batches run one after another on the loop task, so a re-run never overlaps
//! the previous one.

mod debouncer;
mod route;

pub use debouncer::{ChangeKind, Debouncer};
pub use route::{Action, Plan, Routes};

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use notify::Watcher;
use rustc_hash::FxHashMap;
use tokio::sync::{mpsc, oneshot};

use crate::core::shutdown_signal;
use crate::task::{Outcome, Session};
use crate::utils::plural::plural_count;
use crate::{debug, log, logger};

/// Watch until Ctrl+C: every source when `watch` was requested, otherwise
/// only the served pages.
pub async fn run(session: Arc<Session>) -> Result<()> {
    let paths = &session.config().paths;
    let routes = if session.is_watching() {
        Routes::new(paths)
    } else {
        Routes::reload_only(paths)
    };

    let (notify_tx, notify_rx) = std::sync::mpsc::channel();
    let mut watcher = notify::recommended_watcher(move |res| {
        let _ = notify_tx.send(res);
    })
    .context("Failed to create file watcher")?;

    let mut watched = 0;
    for (dir, mode) in routes.watch_targets() {
        if !dir.is_dir() {
            debug!("watch"; "skip missing {}", dir.display());
            continue;
        }
        watcher
            .watch(dir, mode)
            .with_context(|| format!("Failed to watch {}", dir.display()))?;
        watched += 1;
    }

    let (event_tx, mut event_rx) = mpsc::channel::<notify::Event>(64);
    thread::spawn(move || {
        while let Ok(result) = notify_rx.recv() {
            match result {
                Ok(event) => {
                    if event_tx.blocking_send(event).is_err() {
                        break;
                    }
                }
                Err(e) => log!("watch"; "notify error: {}", e),
            }
        }
    });

    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
    let signal = shutdown_signal();
    thread::spawn(move || {
        let _ = signal.recv();
        let _ = stop_tx.send(());
    });

    log!("watch"; "watching {} (Ctrl+C to stop)", plural_count(watched, "folder"));

    let mut debouncer = Debouncer::new();
    loop {
        tokio::select! {
            biased;
            _ = &mut stop_rx => break,
            Some(event) = event_rx.recv() => debouncer.add_event(&event),
            () = tokio::time::sleep(debouncer.sleep_duration()) => {
                if let Some(changes) = debouncer.take_if_ready() {
                    rerun(&session, &routes, changes).await;
                }
            }
        }
    }

    drop(watcher);
    debug!("watch"; "stopped");
    Ok(())
}

/// Run the tasks one batch calls for, then reload pages if needed.
async fn rerun(session: &Arc<Session>, routes: &Routes, changes: FxHashMap<PathBuf, ChangeKind>) {
    let plan = routes.plan(changes.keys());
    if plan.is_empty() {
        debug!("watch"; "{} ignored", plural_count(changes.len(), "change"));
        return;
    }

    if !plan.tasks.is_empty() {
        logger::status_detach();
        let names: Vec<_> = plan.tasks.iter().map(|t| t.name()).collect();

        match session.run(&plan.tasks).await {
            Ok(report) if report.is_success() => {
                logger::status_success(&names.join(", "));
            }
            Ok(report) => {
                let detail: Vec<_> = report
                    .entries()
                    .iter()
                    .filter_map(|(task, outcome)| match outcome {
                        Outcome::Failed(msg) => Some(format!("{task}: {msg}")),
                        _ => None,
                    })
                    .collect();
                logger::status_error(
                    &format!("{} failed", plural_count(detail.len(), "task")),
                    &detail.join("\n"),
                );
            }
            Err(e) => logger::status_error("watch", &format!("{e:#}")),
        }
    }

    if !plan.reload.is_empty()
        && let Some(reload) = session.reload_handle()
    {
        let config = session.config();
        let pages: Vec<_> = plan
            .reload
            .iter()
            .map(|p| config.root_relative(p).display().to_string())
            .collect();
        reload.reload(&format!("{} changed", pages.join(", ")));
    }
}
