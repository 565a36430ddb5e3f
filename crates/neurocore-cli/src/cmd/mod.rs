pub mod actions;
pub mod config;
pub mod metrics;
pub mod prefs;
pub mod run;
pub mod serve;
pub mod settings;
pub mod status;

use anyhow::Context;
use neurocore_core::builtin;
use neurocore_core::command::SystemCommandRunner;
use neurocore_core::config::Config;
use neurocore_core::executor::Executor;
use neurocore_core::metrics as core_metrics;
use std::path::Path;
use std::sync::Arc;

pub fn load_config(root: &Path) -> anyhow::Result<Config> {
    Config::load_or_default(root).context("failed to load config")
}

/// A fresh executor over the builtin catalog. Statuses live only as long as
/// this process.
pub fn executor(root: &Path) -> anyhow::Result<Executor> {
    let config = load_config(root)?;
    let metrics = core_metrics::shared(core_metrics::from_config(&config.metrics));
    let catalog = builtin::catalog(&config, Arc::new(SystemCommandRunner), metrics)
        .context("failed to build action catalog")?;
    Ok(Executor::new(Arc::new(catalog)))
}
