//! Task dispatch against one loaded configuration.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use parking_lot::Mutex;

use super::{RunReport, Task, run_graph};
use crate::config::PipelineConfig;
use crate::reload::ReloadHandle;
use crate::{alert, debug, log, serve, sprite, style, template};

/// State shared by every task of a process.
///
/// Holds the live-reload handle once `browserSync` has started, and
/// remembers whether `watch` was requested.
pub struct Session {
    config: Arc<PipelineConfig>,
    reload: Mutex<Option<ReloadHandle>>,
    watching: AtomicBool,
}

impl Session {
    pub fn new(config: Arc<PipelineConfig>) -> Arc<Self> {
        Arc::new(Self {
            config,
            reload: Mutex::new(None),
            watching: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &Arc<PipelineConfig> {
        &self.config
    }

    pub fn reload_handle(&self) -> Option<ReloadHandle> {
        self.reload.lock().clone()
    }

    pub fn is_watching(&self) -> bool {
        self.watching.load(Ordering::SeqCst)
    }

    /// Whether the process should stay alive after the initial run.
    pub fn is_long_running(&self) -> bool {
        self.is_watching() || self.reload.lock().is_some()
    }

    /// Run `targets` and their dependencies.
    pub async fn run(self: &Arc<Self>, targets: &[Task]) -> Result<RunReport<Task>> {
        let graph = Task::graph();
        if graph.closure(targets)?.contains(&Task::Watch) {
            self.watching.store(true, Ordering::SeqCst);
        }

        let session = Arc::clone(self);
        let report = run_graph(&graph, targets, move |task| {
            let session = Arc::clone(&session);
            async move { session.execute(task).await }
        })
        .await?;
        Ok(report)
    }

    async fn execute(self: Arc<Self>, task: Task) -> Result<()> {
        let result = self.dispatch(task).await;
        if let Err(err) = &result
            && self.config.build.notify
        {
            alert::notify_failure(task.name(), err);
        }
        result
    }

    async fn dispatch(&self, task: Task) -> Result<()> {
        match task {
            Task::BrowserSync => self.start_server(),
            Task::TemplateHtml => {
                blocking(&self.config, template::compile).await?;
                Ok(())
            }
            Task::Sass => {
                blocking(&self.config, style::compile).await?;
                if let Some(reload) = self.reload_handle() {
                    reload.refresh_css();
                }
                Ok(())
            }
            Task::SpritePack => {
                sprite::pack_all(Arc::clone(&self.config)).await?;
                Ok(())
            }
            Task::SpriteMap => {
                blocking(&self.config, sprite::map::write_map).await?;
                Ok(())
            }
            Task::HashSprite => {
                blocking(&self.config, sprite::hash::run).await?;
                Ok(())
            }
            Task::SassBuild => {
                blocking(&self.config, style::build).await?;
                Ok(())
            }
            Task::Minify => {
                blocking(&self.config, style::minify).await?;
                Ok(())
            }
            Task::Watch => {
                debug!("watch"; "initial build done");
                Ok(())
            }
            // Pure aggregates: their work is their dependencies.
            Task::Sprite | Task::Default | Task::Dev | Task::Build => Ok(()),
        }
    }

    fn start_server(&self) -> Result<()> {
        if !self.config.build.browser_sync {
            log!("serve"; "disabled by `build.browser_sync`");
            return Ok(());
        }

        let mut slot = self.reload.lock();
        if slot.is_some() {
            debug!("serve"; "already running");
            return Ok(());
        }
        *slot = Some(serve::start(Arc::clone(&self.config))?);
        Ok(())
    }
}

/// Run a config-bound step on the blocking pool.
async fn blocking<T, F>(config: &Arc<PipelineConfig>, step: F) -> Result<T>
where
    F: FnOnce(&PipelineConfig) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let config = Arc::clone(config);
    tokio::task::spawn_blocking(move || step(&config)).await?
}
