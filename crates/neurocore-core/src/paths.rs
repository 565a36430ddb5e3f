use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const NEUROCORE_DIR: &str = ".neurocore";
pub const CONFIG_FILE: &str = ".neurocore/config.yaml";
pub const PREFERENCES_FILE: &str = ".neurocore/preferences.json";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn neurocore_dir(root: &Path) -> PathBuf {
    root.join(NEUROCORE_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn preferences_path(root: &Path) -> PathBuf {
    root.join(PREFERENCES_FILE)
}
