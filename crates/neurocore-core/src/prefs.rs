//! Persisted user preferences.
//!
//! A flat JSON key/value store plus `UiSettings`, the typed view over the
//! handful of keys the presentation layers care about.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

use crate::error::{CoreError, Result};
use crate::io;
use crate::paths;
use crate::types::Theme;

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>>;
    fn set(&self, key: &str, value: Value) -> Result<()>;
    /// Returns whether the key existed.
    fn delete(&self, key: &str) -> Result<bool>;

    fn has(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, Value>>> {
        self.values
            .lock()
            .map_err(|_| CoreError::Io(std::io::Error::other("preferences lock poisoned")))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.map()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        self.map()?.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.map()?.remove(key).is_some())
    }
}

// ---------------------------------------------------------------------------
// JsonFileStore
// ---------------------------------------------------------------------------

/// One JSON object on disk, rewritten atomically on every change.
///
/// The file is re-read on each access so separate processes (CLI and server)
/// see each other's writes.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// `<root>/.neurocore/preferences.json`
    pub fn open(root: &Path) -> Self {
        Self::new(paths::preferences_path(root))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Map<String, Value>> {
        let Some(data) = io::read_optional(&self.path)? else {
            return Ok(Map::new());
        };
        if data.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&data)? {
            Value::Object(map) => Ok(map),
            _ => {
                warn!(path = %self.path.display(), "preferences file is not an object; ignoring");
                Ok(Map::new())
            }
        }
    }

    fn write(&self, map: &Map<String, Value>) -> Result<()> {
        let data = serde_json::to_vec_pretty(map)?;
        io::atomic_write(&self.path, &data)
    }

    fn modify<T>(&self, f: impl FnOnce(&mut Map<String, Value>) -> T) -> Result<T> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| CoreError::Io(std::io::Error::other("preferences lock poisoned")))?;
        let mut map = self.read()?;
        let out = f(&mut map);
        self.write(&map)?;
        Ok(out)
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.read()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        self.modify(|map| {
            map.insert(key.to_string(), value);
        })
    }

    fn delete(&self, key: &str) -> Result<bool> {
        self.modify(|map| map.remove(key).is_some())
    }
}

// ---------------------------------------------------------------------------
// UiSettings
// ---------------------------------------------------------------------------

pub const THEME_KEY: &str = "theme";
pub const THEME_AUTO_SWITCH_KEY: &str = "theme_auto_switch";
pub const SIDEBAR_OPEN_KEY: &str = "sidebar_open";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiSettings {
    pub theme: Theme,
    pub auto_switch: bool,
    pub sidebar_open: bool,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            theme: Theme::Dark,
            auto_switch: false,
            sidebar_open: true,
        }
    }
}

impl UiSettings {
    /// Missing or malformed keys fall back to their defaults.
    pub fn load(store: &dyn KeyValueStore) -> Result<Self> {
        let defaults = Self::default();
        let theme = match store.get(THEME_KEY)? {
            Some(Value::String(s)) => s.parse().unwrap_or_else(|_| {
                warn!(theme = %s, "unknown theme in preferences; using default");
                defaults.theme
            }),
            _ => defaults.theme,
        };
        let auto_switch = store
            .get(THEME_AUTO_SWITCH_KEY)?
            .and_then(|v| v.as_bool())
            .unwrap_or(defaults.auto_switch);
        let sidebar_open = store
            .get(SIDEBAR_OPEN_KEY)?
            .and_then(|v| v.as_bool())
            .unwrap_or(defaults.sidebar_open);
        Ok(Self {
            theme,
            auto_switch,
            sidebar_open,
        })
    }

    pub fn save(&self, store: &dyn KeyValueStore) -> Result<()> {
        store.set(THEME_KEY, Value::String(self.theme.as_str().to_string()))?;
        store.set(THEME_AUTO_SWITCH_KEY, Value::Bool(self.auto_switch))?;
        store.set(SIDEBAR_OPEN_KEY, Value::Bool(self.sidebar_open))?;
        Ok(())
    }
}
