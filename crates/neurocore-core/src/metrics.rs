//! System metrics sources.
//!
//! `MetricsSource` is the seam between the presentation layers and wherever
//! numbers come from: a seedable random generator (`MockMetrics`), the host
//! (`LiveMetrics`, via `sysinfo`), or a fixture (`FixedMetrics`).

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock};
use sysinfo::{Disks, Networks, System};
use tracing::debug;

use crate::action::{Operation, OptimizationResult};
use crate::command::{CommandRunner, CommandSpec};
use crate::config::MetricsConfig;
use crate::error::{CoreError, Result};
use crate::params::HostName;

// ---------------------------------------------------------------------------
// Snapshot types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub cpu: CpuMetrics,
    pub memory: MemoryMetrics,
    pub disks: Vec<DiskMetrics>,
    pub networks: Vec<NetworkMetrics>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuMetrics {
    /// Percent, 0..=100.
    pub usage: f32,
    pub frequency_mhz: u64,
    /// Celsius, when the source can read it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    pub cores: Vec<CoreMetrics>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreMetrics {
    pub core: usize,
    pub usage: f32,
    pub frequency_mhz: u64,
}

/// Byte counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryMetrics {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub usage: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskMetrics {
    pub device: String,
    pub total_bytes: u64,
    pub available_bytes: u64,
    pub usage: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkMetrics {
    pub interface: String,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub rx_packets: u64,
    pub tx_packets: u64,
    pub rx_errors: u64,
    pub tx_errors: u64,
}

fn percent(part: u64, whole: u64) -> f32 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 / whole as f64 * 100.0) as f32
    }
}

// ---------------------------------------------------------------------------
// MetricsSource
// ---------------------------------------------------------------------------

pub trait MetricsSource: Send {
    fn name(&self) -> &'static str;
    fn sample(&mut self) -> Result<MetricsSnapshot>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricsKind {
    #[default]
    Mock,
    Live,
}

impl MetricsKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricsKind::Mock => "mock",
            MetricsKind::Live => "live",
        }
    }
}

impl fmt::Display for MetricsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MetricsKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mock" => Ok(MetricsKind::Mock),
            "live" => Ok(MetricsKind::Live),
            other => Err(CoreError::InvalidParameter {
                kind: "metrics source",
                value: other.to_string(),
            }),
        }
    }
}

pub fn from_config(cfg: &MetricsConfig) -> Box<dyn MetricsSource> {
    match cfg.source {
        MetricsKind::Mock => Box::new(match cfg.seed {
            Some(seed) => MockMetrics::seeded(seed),
            None => MockMetrics::new(),
        }),
        MetricsKind::Live => Box::new(LiveMetrics::new()),
    }
}

/// A metrics source shared between an operation and a presentation layer.
pub type SharedMetrics = Arc<Mutex<Box<dyn MetricsSource>>>;

pub fn shared(source: Box<dyn MetricsSource>) -> SharedMetrics {
    Arc::new(Mutex::new(source))
}

pub fn sample_shared(metrics: &SharedMetrics) -> Result<MetricsSnapshot> {
    let mut source = metrics
        .lock()
        .map_err(|_| CoreError::Metrics("metrics source poisoned".into()))?;
    source.sample()
}

// ---------------------------------------------------------------------------
// MockMetrics
// ---------------------------------------------------------------------------

const MOCK_TOTAL_MEMORY: u64 = 16 * 1024 * 1024 * 1024;
const MOCK_DISK_TOTAL: u64 = 512 * 1000 * 1000 * 1000;

/// Random values in plausible gaming-rig ranges.
pub struct MockMetrics {
    rng: StdRng,
    cores: usize,
}

impl MockMetrics {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            cores: 8,
        }
    }

    /// Same seed, same sequence of snapshots.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            cores: 8,
        }
    }

    pub fn with_cores(mut self, cores: usize) -> Self {
        self.cores = cores;
        self
    }

    fn network(&mut self, interface: &str, scale: f64, packets: u64, errors: u64) -> NetworkMetrics {
        NetworkMetrics {
            interface: interface.to_string(),
            rx_bytes: (self.rng.gen::<f64>() * scale) as u64,
            tx_bytes: (self.rng.gen::<f64>() * scale) as u64,
            rx_packets: self.rng.gen_range(0..packets),
            tx_packets: self.rng.gen_range(0..packets),
            rx_errors: self.rng.gen_range(0..errors),
            tx_errors: self.rng.gen_range(0..errors),
        }
    }
}

impl Default for MockMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsSource for MockMetrics {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn sample(&mut self) -> Result<MetricsSnapshot> {
        let cores: Vec<CoreMetrics> = (0..self.cores)
            .map(|core| CoreMetrics {
                core,
                usage: self.rng.gen_range(0.0..100.0),
                frequency_mhz: self.rng.gen_range(2000..4000),
            })
            .collect();

        let used = (MOCK_TOTAL_MEMORY as f64 * self.rng.gen_range(0.3..0.8)) as u64;
        let disk_free = (MOCK_DISK_TOTAL as f64 * self.rng.gen_range(0.1..0.6)) as u64;

        Ok(MetricsSnapshot {
            timestamp: Utc::now(),
            cpu: CpuMetrics {
                usage: self.rng.gen_range(0.0..100.0),
                frequency_mhz: self.rng.gen_range(2000..4000),
                temperature: Some(self.rng.gen_range(45.0..75.0)),
                cores,
            },
            memory: MemoryMetrics {
                total: MOCK_TOTAL_MEMORY,
                used,
                free: MOCK_TOTAL_MEMORY - used,
                usage: percent(used, MOCK_TOTAL_MEMORY),
            },
            disks: vec![DiskMetrics {
                device: "C:".into(),
                total_bytes: MOCK_DISK_TOTAL,
                available_bytes: disk_free,
                usage: percent(MOCK_DISK_TOTAL - disk_free, MOCK_DISK_TOTAL),
            }],
            networks: vec![
                self.network("Ethernet", 1_000_000.0, 10_000, 10),
                self.network("Wi-Fi", 500_000.0, 5_000, 5),
            ],
        })
    }
}

// ---------------------------------------------------------------------------
// LiveMetrics
// ---------------------------------------------------------------------------

/// Host metrics via `sysinfo`.
///
/// CPU usage is computed from the delta between two refreshes, so the first
/// sample after construction reads near zero.
pub struct LiveMetrics {
    system: System,
    disks: Disks,
    networks: Networks,
}

impl LiveMetrics {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu_all();
        system.refresh_memory();
        Self {
            system,
            disks: Disks::new_with_refreshed_list(),
            networks: Networks::new_with_refreshed_list(),
        }
    }
}

impl Default for LiveMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsSource for LiveMetrics {
    fn name(&self) -> &'static str {
        "live"
    }

    fn sample(&mut self) -> Result<MetricsSnapshot> {
        self.system.refresh_cpu_all();
        self.system.refresh_memory();
        self.disks.refresh(true);
        self.networks.refresh(true);

        let cpus = self.system.cpus();
        let cores = cpus
            .iter()
            .enumerate()
            .map(|(core, cpu)| CoreMetrics {
                core,
                usage: cpu.cpu_usage(),
                frequency_mhz: cpu.frequency(),
            })
            .collect();
        let frequency_mhz = cpus.first().map(|c| c.frequency()).unwrap_or(0);

        let total = self.system.total_memory();
        let used = self.system.used_memory();

        let disks = self
            .disks
            .list()
            .iter()
            .map(|d| {
                let total = d.total_space();
                let available = d.available_space();
                DiskMetrics {
                    device: d.mount_point().display().to_string(),
                    total_bytes: total,
                    available_bytes: available,
                    usage: percent(total.saturating_sub(available), total),
                }
            })
            .collect();

        let mut networks: Vec<NetworkMetrics> = self
            .networks
            .iter()
            .map(|(name, data)| NetworkMetrics {
                interface: name.clone(),
                rx_bytes: data.total_received(),
                tx_bytes: data.total_transmitted(),
                rx_packets: data.total_packets_received(),
                tx_packets: data.total_packets_transmitted(),
                rx_errors: data.total_errors_on_received(),
                tx_errors: data.total_errors_on_transmitted(),
            })
            .collect();
        networks.sort_by(|a, b| a.interface.cmp(&b.interface));

        Ok(MetricsSnapshot {
            timestamp: Utc::now(),
            cpu: CpuMetrics {
                usage: self.system.global_cpu_usage(),
                frequency_mhz,
                temperature: None,
                cores,
            },
            memory: MemoryMetrics {
                total,
                used,
                free: self.system.available_memory(),
                usage: percent(used, total),
            },
            disks,
            networks,
        })
    }
}

// ---------------------------------------------------------------------------
// FixedMetrics
// ---------------------------------------------------------------------------

/// Returns the same snapshot every time.
#[derive(Debug, Clone)]
pub struct FixedMetrics(pub MetricsSnapshot);

impl FixedMetrics {
    /// A quiet 4-core machine at 25% CPU and 50% memory.
    pub fn idle() -> Self {
        let total = 8 * 1024 * 1024 * 1024;
        Self(MetricsSnapshot {
            timestamp: DateTime::<Utc>::UNIX_EPOCH,
            cpu: CpuMetrics {
                usage: 25.0,
                frequency_mhz: 3200,
                temperature: Some(50.0),
                cores: (0..4)
                    .map(|core| CoreMetrics {
                        core,
                        usage: 25.0,
                        frequency_mhz: 3200,
                    })
                    .collect(),
            },
            memory: MemoryMetrics {
                total,
                used: total / 2,
                free: total / 2,
                usage: 50.0,
            },
            disks: vec![DiskMetrics {
                device: "C:".into(),
                total_bytes: 256_000_000_000,
                available_bytes: 128_000_000_000,
                usage: 50.0,
            }],
            networks: vec![NetworkMetrics {
                interface: "Ethernet".into(),
                rx_bytes: 1024,
                tx_bytes: 512,
                rx_packets: 10,
                tx_packets: 5,
                rx_errors: 0,
                tx_errors: 0,
            }],
        })
    }
}

impl MetricsSource for FixedMetrics {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn sample(&mut self) -> Result<MetricsSnapshot> {
        Ok(self.0.clone())
    }
}

// ---------------------------------------------------------------------------
// MetricsOperation
// ---------------------------------------------------------------------------

/// Which slice of a snapshot a monitoring action reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricsView {
    /// CPU, memory and disk load as rounded percentages.
    Health,
    /// The whole snapshot.
    Performance,
    /// Per-interface traffic counters.
    Network,
}

pub struct MetricsOperation {
    metrics: SharedMetrics,
    view: MetricsView,
}

impl MetricsOperation {
    pub fn new(metrics: SharedMetrics, view: MetricsView) -> Self {
        Self { metrics, view }
    }

    fn report(&self, snap: MetricsSnapshot) -> Result<OptimizationResult> {
        let result = match self.view {
            MetricsView::Health => {
                let disk = snap.disks.first().map(|d| d.usage).unwrap_or(0.0);
                OptimizationResult::ok("System health collected")
                    .with_details(format!(
                        "CPU {:.0}%, memory {:.0}%, disk {:.0}%",
                        snap.cpu.usage, snap.memory.usage, disk
                    ))
                    .with_data(json!({
                        "cpu": snap.cpu.usage.round(),
                        "memory": snap.memory.usage.round(),
                        "disk": disk.round(),
                        "temperature": snap.cpu.temperature,
                        "timestamp": snap.timestamp,
                    }))
            }
            MetricsView::Performance => OptimizationResult::ok("Performance metrics collected")
                .with_data(serde_json::to_value(&snap)?),
            MetricsView::Network => {
                let count = snap.networks.len();
                OptimizationResult::ok("Network statistics collected")
                    .with_details(format!("{count} interfaces"))
                    .with_data(serde_json::to_value(&snap.networks)?)
            }
        };
        Ok(result)
    }
}

impl Operation for MetricsOperation {
    fn execute(&self) -> BoxFuture<'_, Result<OptimizationResult>> {
        Box::pin(async move {
            let snap = sample_shared(&self.metrics)?;
            self.report(snap)
        })
    }
}

// ---------------------------------------------------------------------------
// PingOperation
// ---------------------------------------------------------------------------

fn latency_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:time|tempo)[=<]\s*([0-9]+(?:\.[0-9]+)?)\s*ms").unwrap())
}

/// Round-trip time in milliseconds from one line of `ping` output.
pub fn parse_latency(output: &str) -> Option<f64> {
    latency_re()
        .captures(output)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Sends one echo request and reports the round-trip time.
pub struct PingOperation {
    runner: Arc<dyn CommandRunner>,
    host: HostName,
}

impl PingOperation {
    pub fn new(runner: Arc<dyn CommandRunner>, host: HostName) -> Self {
        Self { runner, host }
    }

    pub fn command(&self) -> CommandSpec {
        let count_flag = if cfg!(windows) { "-n" } else { "-c" };
        CommandSpec::new("ping").args([count_flag, "1", self.host.as_str()])
    }
}

impl Operation for PingOperation {
    fn execute(&self) -> BoxFuture<'_, Result<OptimizationResult>> {
        Box::pin(async move {
            let spec = self.command();
            let output = match self.runner.run(&spec).await {
                Ok(out) => out,
                Err(e @ CoreError::CommandFailed { .. }) => {
                    return Ok(OptimizationResult::failed(format!("{} unreachable", self.host))
                        .with_details(e.to_string())
                        .with_data(json!({ "server": self.host.as_str(), "ping": 0 })));
                }
                Err(e) => return Err(e),
            };
            let latency = parse_latency(&output.stdout);
            debug!(host = %self.host, ?latency, "ping finished");
            match latency {
                Some(ms) => Ok(OptimizationResult::ok(format!("{} responded in {ms} ms", self.host))
                    .with_data(json!({ "server": self.host.as_str(), "ping": ms }))),
                None => Ok(OptimizationResult::failed(format!(
                    "no latency in ping output for {}",
                    self.host
                ))
                .with_details(output.summary())),
            }
        })
    }
}
