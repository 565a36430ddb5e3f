use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::command;
use crate::error::Result;
use crate::io;
use crate::metrics::MetricsKind;
use crate::params::{
    AppName, DriveLetter, ExecutableName, HostName, ProfileName, ServiceName,
};
use crate::paths;

/// Programs the system-mode recipes invoke.
const SYSTEM_TOOLS: &[&str] = &[
    "powershell",
    "reg",
    "sc",
    "powercfg",
    "netsh",
    "defrag",
    "fsutil",
    "cleanmgr",
    "sfc",
    "DISM",
    "ping",
];

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// ExecutionConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Every action resolves after a fixed delay without touching the host.
    #[default]
    Mock,
    /// Actions invoke the real OS tools.
    System,
}

impl ExecutionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionMode::Mock => "mock",
            ExecutionMode::System => "system",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    #[serde(default)]
    pub mode: ExecutionMode,
    #[serde(default = "default_mock_delay")]
    pub mock_delay_ms: u64,
}

fn default_mock_delay() -> u64 {
    1500
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::default(),
            mock_delay_ms: default_mock_delay(),
        }
    }
}

// ---------------------------------------------------------------------------
// MetricsConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub source: MetricsKind,
    #[serde(default = "default_interval")]
    pub interval_ms: u64,
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_interval() -> u64 {
    1000
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            source: MetricsKind::default(),
            interval_ms: default_interval(),
            seed: None,
        }
    }
}

// ---------------------------------------------------------------------------
// SystemConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    #[serde(default = "default_drive")]
    pub drive: String,
    #[serde(default = "default_services_to_disable")]
    pub services_to_disable: Vec<String>,
    #[serde(default = "default_services_to_manual")]
    pub services_to_manual: Vec<String>,
    #[serde(default = "default_apps_to_remove")]
    pub apps_to_remove: Vec<String>,
    #[serde(default = "default_ping_host")]
    pub ping_host: String,
    /// Empty means the platform temp directories.
    #[serde(default)]
    pub temp_dirs: Vec<PathBuf>,
}

fn default_drive() -> String {
    "C".into()
}

fn default_services_to_disable() -> Vec<String> {
    vec!["DiagTrack".into(), "dmwappushservice".into(), "SysMain".into()]
}

fn default_services_to_manual() -> Vec<String> {
    vec!["WSearch".into()]
}

fn default_apps_to_remove() -> Vec<String> {
    vec![
        "BingWeather".into(),
        "GetHelp".into(),
        "Microsoft3DViewer".into(),
    ]
}

fn default_ping_host() -> String {
    "8.8.8.8".into()
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            drive: default_drive(),
            services_to_disable: default_services_to_disable(),
            services_to_manual: default_services_to_manual(),
            apps_to_remove: default_apps_to_remove(),
            ping_host: default_ping_host(),
            temp_dirs: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// QosConfig / ServerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QosConfig {
    #[serde(default = "default_profile")]
    pub profile_name: String,
    #[serde(default = "default_application")]
    pub application: String,
}

fn default_profile() -> String {
    "NeuroCore".into()
}

fn default_application() -> String {
    "game.exe".into()
}

impl Default for QosConfig {
    fn default() -> Self {
        Self {
            profile_name: default_profile(),
            application: default_application(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    3141
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub system: SystemConfig,
    #[serde(default)]
    pub qos: QosConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

fn default_version() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            execution: ExecutionConfig::default(),
            metrics: MetricsConfig::default(),
            system: SystemConfig::default(),
            qos: QosConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Config {
    pub fn exists(root: &Path) -> bool {
        paths::config_path(root).exists()
    }

    /// Load `.neurocore/config.yaml`, falling back to defaults when absent.
    pub fn load_or_default(root: &Path) -> Result<Self> {
        match io::read_optional(&paths::config_path(root))? {
            Some(data) => Ok(serde_yaml::from_str(&data)?),
            None => Ok(Self::default()),
        }
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        io::atomic_write(&path, data.as_bytes())
    }

    pub fn drive(&self) -> Result<DriveLetter> {
        DriveLetter::parse(&self.system.drive)
    }

    pub fn ping_host(&self) -> Result<HostName> {
        HostName::parse(&self.system.ping_host)
    }

    pub fn qos_profile(&self) -> Result<ProfileName> {
        ProfileName::parse(&self.qos.profile_name)
    }

    pub fn qos_application(&self) -> Result<ExecutableName> {
        ExecutableName::parse(&self.qos.application)
    }

    pub fn services_to_disable(&self) -> Result<Vec<ServiceName>> {
        self.system
            .services_to_disable
            .iter()
            .map(|s| ServiceName::parse(s))
            .collect()
    }

    pub fn services_to_manual(&self) -> Result<Vec<ServiceName>> {
        self.system
            .services_to_manual
            .iter()
            .map(|s| ServiceName::parse(s))
            .collect()
    }

    pub fn apps_to_remove(&self) -> Result<Vec<AppName>> {
        self.system
            .apps_to_remove
            .iter()
            .map(|a| AppName::parse(a))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Tools the system-mode recipes need that `available` does not find.
    /// Always empty in mock mode.
    pub fn missing_tools(&self, available: impl Fn(&str) -> bool) -> Vec<&'static str> {
        if self.execution.mode != ExecutionMode::System {
            return Vec::new();
        }
        SYSTEM_TOOLS
            .iter()
            .copied()
            .filter(|t| !available(t))
            .collect()
    }

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let mut error = |e: crate::error::CoreError| {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: e.to_string(),
            })
        };

        if let Err(e) = self.drive() {
            error(e);
        }
        if let Err(e) = self.ping_host() {
            error(e);
        }
        if let Err(e) = self.qos_profile() {
            error(e);
        }
        if let Err(e) = self.qos_application() {
            error(e);
        }
        for name in self
            .system
            .services_to_disable
            .iter()
            .chain(&self.system.services_to_manual)
        {
            if let Err(e) = ServiceName::parse(name) {
                error(e);
            }
        }
        for app in &self.system.apps_to_remove {
            if let Err(e) = AppName::parse(app) {
                error(e);
            }
        }

        if self.metrics.interval_ms == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "metrics.interval_ms must be greater than zero".into(),
            });
        }
        if self.execution.mock_delay_ms > 60_000 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "execution.mock_delay_ms is {} ms; mock actions will take over a minute",
                    self.execution.mock_delay_ms
                ),
            });
        }
        let missing = self.missing_tools(command::is_available);
        if !missing.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "system mode is selected but these tools are not on PATH: {}",
                    missing.join(", ")
                ),
            });
        }
        if self.version != 1 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!("unknown config version {}", self.version),
            });
        }

        warnings
    }

    pub fn has_errors(&self) -> bool {
        self.validate().iter().any(|w| w.level == WarnLevel::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_are_valid() {
        assert!(Config::default().validate().is_empty());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::load_or_default(dir.path()).unwrap();
        assert_eq!(cfg.execution.mode, ExecutionMode::Mock);
        assert_eq!(cfg.server.port, 3141);
    }

    #[test]
    fn save_load_preserves_edits() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::default();
        cfg.execution.mock_delay_ms = 0;
        cfg.metrics.seed = Some(9);
        cfg.save(dir.path()).unwrap();
        assert!(Config::exists(dir.path()));

        let loaded = Config::load_or_default(dir.path()).unwrap();
        assert_eq!(loaded.execution.mock_delay_ms, 0);
        assert_eq!(loaded.metrics.seed, Some(9));
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let yaml = "execution:\n  mode: system\nqos:\n  application: valorant.exe\n";
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.execution.mode, ExecutionMode::System);
        assert_eq!(cfg.execution.mock_delay_ms, 1500);
        assert_eq!(cfg.qos.profile_name, "NeuroCore");
        assert_eq!(cfg.qos.application, "valorant.exe");
    }

    #[test]
    fn validate_flags_bad_values() {
        let mut cfg = Config::default();
        cfg.system.drive = "C: & del".into();
        cfg.system.services_to_disable.push("svc; rm".into());
        cfg.qos.application = "C:\\game.exe".into();
        cfg.metrics.interval_ms = 0;
        let errors: Vec<_> = cfg
            .validate()
            .into_iter()
            .filter(|w| w.level == WarnLevel::Error)
            .collect();
        assert_eq!(errors.len(), 4);
        assert!(cfg.has_errors());
    }

    #[test]
    fn missing_tools_only_checked_in_system_mode() {
        let mut cfg = Config::default();
        assert!(cfg.missing_tools(|_| false).is_empty());

        cfg.execution.mode = ExecutionMode::System;
        let missing = cfg.missing_tools(|t| t == "powershell");
        for tool in ["defrag", "fsutil", "cleanmgr", "sfc", "DISM", "ping", "reg"] {
            assert!(missing.contains(&tool), "{tool} not reported");
        }
        assert!(!missing.contains(&"powershell"));
        assert!(cfg.missing_tools(|_| true).is_empty());
    }

    #[test]
    fn long_mock_delay_is_warning() {
        let mut cfg = Config::default();
        cfg.execution.mock_delay_ms = 120_000;
        let warnings = cfg.validate();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].level, WarnLevel::Warning);
        assert!(!cfg.has_errors());
    }
}
