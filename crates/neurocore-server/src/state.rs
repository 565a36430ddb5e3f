use neurocore_core::builtin;
use neurocore_core::command::{CommandRunner, SystemCommandRunner};
use neurocore_core::config::Config;
use neurocore_core::executor::Executor;
use neurocore_core::metrics::{self, SharedMetrics};
use neurocore_core::prefs::{JsonFileStore, KeyValueStore};
use std::path::PathBuf;
use std::sync::Arc;

/// Shared application state passed to all route handlers.
///
/// The executor lives for the whole server process, so statuses accumulate
/// across requests.
#[derive(Clone)]
pub struct AppState {
    pub root: PathBuf,
    pub config: Arc<Config>,
    pub executor: Arc<Executor>,
    pub metrics: SharedMetrics,
    pub prefs: Arc<dyn KeyValueStore>,
}

impl AppState {
    /// Load `.neurocore/config.yaml` under `root` and wire the real
    /// collaborators: OS command runner, configured metrics source, and the
    /// on-disk preference store.
    pub fn new(root: PathBuf) -> neurocore_core::Result<Self> {
        let config = Config::load_or_default(&root)?;
        let metrics = metrics::shared(metrics::from_config(&config.metrics));
        let prefs = Arc::new(JsonFileStore::open(&root));
        Self::with_parts(root, config, Arc::new(SystemCommandRunner), metrics, prefs)
    }

    pub fn with_parts(
        root: PathBuf,
        config: Config,
        runner: Arc<dyn CommandRunner>,
        metrics: SharedMetrics,
        prefs: Arc<dyn KeyValueStore>,
    ) -> neurocore_core::Result<Self> {
        let catalog = builtin::catalog(&config, runner, metrics.clone())?;
        Ok(Self {
            root,
            config: Arc::new(config),
            executor: Arc::new(Executor::new(Arc::new(catalog))),
            metrics,
            prefs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn new_state_uses_default_config() {
        let dir = TempDir::new().unwrap();
        let state = AppState::new(dir.path().to_path_buf()).unwrap();
        assert_eq!(state.root, dir.path());
        assert_eq!(state.config.server.port, 3141);
        assert_eq!(
            state.executor.statuses().len(),
            builtin::ACTIONS.len()
        );
    }
}
