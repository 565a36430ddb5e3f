use futures::future::BoxFuture;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::action::{Operation, OptimizationResult};
use crate::error::Result;

/// Deletes regular files directly inside each temp directory.
///
/// Subdirectories are left alone. Files that cannot be inspected or removed
/// (typically because another process holds them open) are skipped.
#[derive(Debug, Clone)]
pub struct TempCleanup {
    dirs: Vec<PathBuf>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    pub removed_files: usize,
    pub removed_bytes: u64,
    pub skipped: usize,
}

impl TempCleanup {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    /// `TEMP`, `TMP`, the OS temp dir, and the `Temp` folders under the roaming
    /// and local app-data roots. Duplicates removed, order preserved.
    pub fn platform_dirs() -> Vec<PathBuf> {
        let mut found: Vec<PathBuf> = Vec::new();
        let candidates = [
            std::env::var_os("TEMP").map(PathBuf::from),
            std::env::var_os("TMP").map(PathBuf::from),
            Some(std::env::temp_dir()),
            dirs::data_dir().map(|d| d.join("Temp")),
            dirs::data_local_dir().map(|d| d.join("Temp")),
        ];
        for dir in candidates.into_iter().flatten() {
            if !found.contains(&dir) {
                found.push(dir);
            }
        }
        found
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Blocking sweep over every configured directory.
    pub fn sweep(&self) -> CleanupReport {
        let mut report = CleanupReport::default();
        for dir in &self.dirs {
            sweep_dir(dir, &mut report);
        }
        report
    }
}

fn sweep_dir(dir: &Path, report: &mut CleanupReport) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(dir = %dir.display(), error = %e, "temp dir not readable");
            return;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let meta = match std::fs::symlink_metadata(&path) {
            Ok(m) => m,
            Err(_) => {
                report.skipped += 1;
                continue;
            }
        };
        if !meta.is_file() {
            continue;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => {
                report.removed_files += 1;
                report.removed_bytes += meta.len();
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "file in use, skipped");
                report.skipped += 1;
            }
        }
    }
}

impl Operation for TempCleanup {
    fn execute(&self) -> BoxFuture<'_, Result<OptimizationResult>> {
        let this = self.clone();
        Box::pin(async move {
            let report = tokio::task::spawn_blocking(move || this.sweep())
                .await
                .map_err(std::io::Error::other)?;
            info!(
                files = report.removed_files,
                bytes = report.removed_bytes,
                skipped = report.skipped,
                "temp cleanup finished"
            );
            let mb = report.removed_bytes as f64 / (1024.0 * 1024.0);
            Ok(OptimizationResult::ok("Temporary files cleaned")
                .with_details(format!(
                    "Removed {} files, freed {mb:.1} MB",
                    report.removed_files
                ))
                .with_data(json!({
                    "cleaned_files": report.removed_files,
                    "cleaned_size": report.removed_bytes,
                    "skipped": report.skipped,
                })))
        })
    }
}
