//! The NeuroCore action set.
//!
//! Every action is declared once in `ACTIONS` with its display metadata and
//! the canned outcome used in mock mode. `catalog` binds each declaration to
//! an operation for the configured execution mode.

use futures::future::BoxFuture;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::action::{Operation, OptimizationAction, OptimizationResult};
use crate::catalog::Catalog;
use crate::cleanup::TempCleanup;
use crate::command::{CommandRunner, CommandSpec};
use crate::config::{Config, ExecutionMode};
use crate::error::{CoreError, Result};
use crate::metrics::{MetricsOperation, MetricsView, PingOperation, SharedMetrics};
use crate::mock::MockOperation;
use crate::params::{ProfileName, RestorePointDescription, ServiceName};
use crate::tweaks::{
    self, AdapterProperty, CommandSequence, ItemProperty, PowerSetting, RegistryDelete,
    RegistryValue, ServiceChange, StartMode, Step, GAMING_PLAN_GUID, QOS_ROOT,
    ULTIMATE_PERFORMANCE_GUID,
};

// ---------------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------------

pub struct ActionDef {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub category: &'static str,
    pub secs: u32,
    pub warning: Option<&'static str>,
    /// Mock-mode result message and details.
    pub mock: (&'static str, &'static str),
}

const fn def(
    id: &'static str,
    title: &'static str,
    category: &'static str,
    secs: u32,
    description: &'static str,
    warning: Option<&'static str>,
    mock: (&'static str, &'static str),
) -> ActionDef {
    ActionDef {
        id,
        title,
        description,
        category,
        secs,
        warning,
        mock,
    }
}

const REBOOT: Option<&str> = Some("Requires a reboot to take full effect");
const NET_RESTART: Option<&str> = Some("Requires a network restart");

pub const ACTIONS: &[ActionDef] = &[
    // System
    def("restore-point", "Create Restore Point", "System", 30,
        "Creates a system restore point before any changes are made",
        Some("Requires administrator privileges"),
        ("Restore point created", r"Restore point stored under C:\System Volume Information")),
    def("debloat", "Remove Preinstalled Apps", "Debloat", 45,
        "Removes bundled store apps that run in the background",
        Some("Some apps may be useful. Review the list before removing."),
        ("Preinstalled apps removed", "Removed Bing Weather, Get Help, 3D Viewer")),
    def("registry", "Optimize Registry", "System", 25,
        "Applies gaming-oriented scheduler and multimedia registry values",
        Some("Changes system settings. Use with care."),
        ("Registry optimized", "Applied 8 registry optimizations")),
    def("services", "Optimize Services", "System", 35,
        "Disables telemetry services and sets heavy indexers to manual start",
        Some("Some services are essential. Do not disable what you do not know."),
        ("Services optimized", "Disabled 3 unnecessary services, set 1 to manual")),
    // Cleanup and storage
    def("temp-cleanup", "Clean Temporary Files", "Cleanup", 20,
        "Deletes files from the user and system temp folders",
        None,
        ("Temporary files cleaned", "Freed 2.5 GB of disk space")),
    def("disk-optimization", "Optimize Disk", "Storage", 120,
        "Analyzes fragmentation on the system drive",
        Some("May take a while depending on disk size"),
        ("Disk C: optimized", "Defragmentation analysis complete")),
    def("trim-ssd", "Run TRIM (SSD)", "Storage", 15,
        "Sends TRIM to the system drive to keep SSD write performance",
        Some("SSDs only. Do not run on spinning disks."),
        ("TRIM completed on drive C:", "Retrim finished")),
    // Network
    def("optimize-dns-priority", "DNS Priority Settings", "Network", 15,
        "Raises DNS resolver priority", NET_RESTART,
        ("DNS priority optimized", "DNS settings tuned for faster resolution")),
    def("optimize-network-throttling", "Network Throttling Index", "Network", 20,
        "Removes multimedia network throttling", Some("May affect other applications"),
        ("Network throttling removed", "Network limits removed for better throughput")),
    def("optimize-tcpip", "TCP/IP Optimizations", "Network", 25,
        "Tunes TCP port range and timed-wait parameters", NET_RESTART,
        ("TCP/IP optimized", "TCP/IP parameters tuned for gaming")),
    def("optimize-mtu", "MTU Optimization", "Network", 18,
        "Pins interface MTU to 1500", Some("May cause problems on some networks"),
        ("MTU optimized", "MTU set to 1500 on Ethernet and Wi-Fi")),
    def("optimize-nagles-algorithm", "Disable Nagle's Algorithm", "Network", 12,
        "Sends small packets immediately instead of batching them",
        Some("Increases bandwidth usage"),
        ("Nagle's algorithm disabled", "TCP_NODELAY and ACK frequency applied")),
    def("optimize-network-offload", "Network Offload Settings", "Network", 22,
        "Disables receive coalescing and large send offload",
        Some("May increase CPU usage"),
        ("Network offload optimized", "RSC and LSO disabled on active adapters")),
    def("manage-ipv6", "IPv6 Management", "Network", 16,
        "Unbinds IPv6 from all adapters", Some("Disables IPv6"),
        ("IPv6 disabled", "IPv6 unbound from all adapters")),
    def("optimize-network-interfaces", "Network Interface Optimizations", "Network", 30,
        "Disables flow control and interrupt moderation, enlarges buffers", NET_RESTART,
        ("Network interfaces optimized", "Adapter buffers and moderation tuned")),
    // GPU
    def("optimize-nvidia-profile", "NVIDIA Driver Profile", "GPU", 35,
        "Enables hardware GPU scheduling and relaxes TDR timeouts",
        Some("Requires a driver restart"),
        ("GPU driver profile optimized", "Hardware scheduling enabled")),
    def("create-custom-power-plan", "Custom Power Plan", "GPU", 40,
        "Creates and activates the NeuroCore gaming power plan",
        Some("Replaces the active power plan"),
        ("Gaming power plan created", "NeuroCore Gaming Plan is now active")),
    def("optimize-gpu-memory", "GPU Memory Management", "GPU", 28,
        "Disables GPU preemption and pins processor state to maximum",
        Some("May affect other applications"),
        ("GPU memory optimized", "Preemption disabled, processor state pinned")),
    // CPU
    def("cpu-power-management", "CPU Power Management", "CPU", 3,
        "Keeps the processor at full performance state", REBOOT,
        ("CPU power management optimized", "Processor throttling disabled")),
    def("core-parking", "Core Parking", "CPU", 2,
        "Keeps every core unparked", None,
        ("Core parking disabled", "All cores stay active")),
    def("frequency-scaling", "Frequency Scaling", "CPU", 3,
        "Sets aggressive turbo boost policy", None,
        ("Frequency scaling optimized", "Boost mode set to aggressive")),
    // Memory
    def("memory-management", "Memory Management", "Memory", 3,
        "Tunes kernel memory manager values", REBOOT,
        ("Memory management optimized", "Memory manager values applied")),
    def("page-file", "Page File", "Memory", 4,
        "Keeps the kernel in RAM and skips page file clearing at shutdown",
        Some("Requires a reboot. Do not use on low-memory systems."),
        ("Page file optimized", "Paging executive disabled")),
    def("memory-compression", "Memory Compression", "Memory", 2,
        "Disables memory compression", None,
        ("Memory compression disabled", "MMAgent compression turned off")),
    def("memory-pool", "Memory Pool", "Memory", 3,
        "Removes paged and non-paged pool quotas", None,
        ("Memory pool optimized", "Pool quotas removed")),
    def("memory-cache", "Memory Cache", "Memory", 3,
        "Prefers application memory over system file cache", None,
        ("Memory cache optimized", "System cache reduced")),
    // Storage
    def("storage-performance", "Storage Performance", "Storage", 4,
        "Disables NTFS last-access and 8.3 name updates", REBOOT,
        ("Storage performance optimized", "NTFS metadata updates reduced")),
    def("disk-cache", "Disk Cache", "Storage", 4,
        "Tunes I/O page lock limit", None,
        ("Disk cache optimized", "I/O page lock limit raised")),
    def("file-system", "File System", "Storage", 4,
        "Tunes NTFS memory usage and metadata updates",
        Some("Some settings require a reboot"),
        ("File system optimized", "NTFS tuned")),
    def("disk-cleanup", "Disk Cleanup", "Storage", 5,
        "Runs Windows Disk Cleanup with the saved profile",
        Some("Removes temporary files and system logs"),
        ("Disk cleanup completed", "Disk Cleanup profile 1 executed")),
    def("storage-policies", "Storage Policies", "Storage", 3,
        "Applies NTFS behavior flags with fsutil", None,
        ("Storage policies applied", "fsutil behavior flags set")),
    // Tools
    def("autoruns", "Startup Management", "Tools", 3,
        "Removes programs from automatic startup",
        Some("Removes every program from automatic startup"),
        ("Startup entries removed", "Run and RunOnce keys cleared")),
    def("windows-updates", "Block Windows Updates", "Tools", 3,
        "Disables the update and transfer services",
        Some("Disables automatic Windows updates"),
        ("Windows Update blocked", "wuauserv and BITS disabled")),
    def("uac", "UAC Management", "Tools", 2,
        "Lowers UAC prompting", Some("Reduces UAC prompts. Use with care."),
        ("UAC prompts reduced", "Consent prompts disabled")),
    def("file-extensions", "Show File Extensions", "Tools", 2,
        "Shows file extensions and hidden files in Explorer", None,
        ("File extensions visible", "Explorer settings updated")),
    def("dark-mode", "Dark Mode", "Tools", 2,
        "Switches apps and the shell to the dark theme", None,
        ("Dark mode enabled", "Apps and system use the dark theme")),
    def("privacy", "Privacy Optimization", "Tools", 4,
        "Turns off telemetry collection", Some("Disables Windows telemetry features"),
        ("Privacy settings applied", "Telemetry disabled")),
    // QoS
    def("qos-create", "Create QoS Policy", "QoS", 5,
        "Marks traffic from the configured game with DSCP 46", None,
        ("QoS policy created", "Profile NeuroCore prioritizing game.exe")),
    def("qos-revert", "Revert QoS Policy", "QoS", 3,
        "Deletes the configured QoS policy", None,
        ("QoS policy reverted", "Profile NeuroCore removed")),
    def("qos-list", "List QoS Policies", "QoS", 2,
        "Lists QoS policies present in the registry", None,
        ("QoS policies listed", "NeuroCore")),
    // Monitoring
    def("real-ping", "Real Ping", "Monitoring", 2,
        "Measures round-trip time to the configured host", None,
        ("8.8.8.8 responded in 18 ms", "")),
    def("system-health", "System Health", "Monitoring", 3,
        "Reports CPU, memory and disk load", None,
        ("System health collected", "CPU 35%, memory 55%, disk 48%")),
    def("performance-metrics", "Performance Metrics", "Monitoring", 3,
        "Collects a full metrics snapshot", None,
        ("Performance metrics collected", "")),
    def("diagnostics", "Full Diagnostics", "Monitoring", 5,
        "Runs system file and component store checks",
        Some("May take several minutes to complete"),
        ("Diagnostics completed", "No integrity violations found")),
    def("network-monitor", "Network Monitor", "Monitoring", 3,
        "Reports per-interface traffic counters", None,
        ("Network statistics collected", "2 interfaces")),
];

// ---------------------------------------------------------------------------
// Catalog construction
// ---------------------------------------------------------------------------

/// Build the catalog for the configured execution mode.
pub fn catalog(
    config: &Config,
    runner: Arc<dyn CommandRunner>,
    metrics: SharedMetrics,
) -> Result<Catalog> {
    let actions = match config.execution.mode {
        ExecutionMode::Mock => {
            let delay = Duration::from_millis(config.execution.mock_delay_ms);
            ACTIONS
                .iter()
                .map(|d| bind(d, Arc::new(MockOperation::new(delay, mock_result(d)))))
                .collect()
        }
        ExecutionMode::System => {
            let ctx = SystemContext {
                config,
                runner,
                metrics,
            };
            ACTIONS
                .iter()
                .map(|d| Ok(bind(d, ctx.operation(d.id)?)))
                .collect::<Result<Vec<_>>>()?
        }
    };
    Catalog::new(actions)
}

fn bind(d: &ActionDef, operation: Arc<dyn Operation>) -> OptimizationAction {
    let action = OptimizationAction::new(d.id, d.title, d.category, d.secs, operation)
        .describe(d.description);
    match d.warning {
        Some(w) => action.warn(w),
        None => action,
    }
}

fn mock_result(d: &ActionDef) -> OptimizationResult {
    let (message, details) = d.mock;
    let result = OptimizationResult::ok(message);
    if details.is_empty() {
        result
    } else {
        result.with_details(details)
    }
}

// ---------------------------------------------------------------------------
// System-mode recipes
// ---------------------------------------------------------------------------

const TCPIP: &str = r"HKLM\SYSTEM\CurrentControlSet\Services\Tcpip\Parameters";
const TCPIP_INTERFACES: &str = r"HKLM:\SYSTEM\CurrentControlSet\Services\Tcpip\Parameters\Interfaces\*";
const MEMORY_MANAGEMENT: &str =
    r"HKLM\SYSTEM\CurrentControlSet\Control\Session Manager\Memory Management";
const FILE_SYSTEM: &str = r"HKLM\SYSTEM\CurrentControlSet\Control\FileSystem";
const GRAPHICS_DRIVERS: &str = r"HKLM\SYSTEM\CurrentControlSet\Control\GraphicsDrivers";
const SYSTEM_PROFILE: &str =
    r"HKLM\SOFTWARE\Microsoft\Windows NT\CurrentVersion\Multimedia\SystemProfile";
const GAMES_TASK: &str =
    r"HKLM\SOFTWARE\Microsoft\Windows NT\CurrentVersion\Multimedia\SystemProfile\Tasks\Games";
const POLICIES_SYSTEM: &str = r"HKLM\SOFTWARE\Microsoft\Windows\CurrentVersion\Policies\System";
const EXPLORER_ADVANCED: &str = r"HKCU\SOFTWARE\Microsoft\Windows\CurrentVersion\Explorer\Advanced";
const PERSONALIZE: &str = r"HKCU\SOFTWARE\Microsoft\Windows\CurrentVersion\Themes\Personalize";
const DATA_COLLECTION: &str = r"HKLM\SOFTWARE\Policies\Microsoft\Windows\DataCollection";

const RESTORE_POINT_DESCRIPTION: &str = "NeuroCore Optimization";
const GAMING_PLAN_NAME: &str = "NeuroCore Gaming Plan";

struct SystemContext<'a> {
    config: &'a Config,
    runner: Arc<dyn CommandRunner>,
    metrics: SharedMetrics,
}

fn dword(key: &str, name: &str, value: u32) -> RegistryValue {
    RegistryValue::dword(key, name, value)
}

fn mm(name: &str, value: u32) -> RegistryValue {
    dword(MEMORY_MANAGEMENT, name, value)
}

fn adapters(props: &[(&'static str, &'static str)]) -> Vec<AdapterProperty> {
    props
        .iter()
        .map(|&(k, v)| AdapterProperty::new(k, v))
        .collect()
}

impl SystemContext<'_> {
    fn seq(&self, message: &str) -> CommandSequence {
        CommandSequence::new(self.runner.clone(), message)
    }

    fn operation(&self, id: &str) -> Result<Arc<dyn Operation>> {
        let op: Arc<dyn Operation> = match id {
            "restore-point" => {
                let desc = RestorePointDescription::parse(RESTORE_POINT_DESCRIPTION)?;
                Arc::new(self.seq("Restore point created").required([CommandSpec::powershell(
                    format!(
                        "Checkpoint-Computer -Description '{desc}' -RestorePointType MODIFY_SETTINGS"
                    ),
                )]))
            }
            "debloat" => {
                let apps = self.config.apps_to_remove()?;
                let details = apps
                    .iter()
                    .map(|a| a.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                Arc::new(
                    self.seq("Preinstalled apps removed")
                        .details(format!("Targeted: {details}"))
                        .best_effort(apps.iter().map(tweaks::remove_app)),
                )
            }
            "registry" => Arc::new(self.seq("Registry optimized").best_effort([
                dword(SYSTEM_PROFILE, "SystemResponsiveness", 0),
                dword(SYSTEM_PROFILE, "NetworkThrottlingIndex", u32::MAX),
                dword(GAMES_TASK, "GPU Priority", 8),
                dword(GAMES_TASK, "Priority", 6),
                dword(r"HKCU\System\GameConfigStore", "GameDVR_Enabled", 0),
                dword(r"HKLM\SOFTWARE\Policies\Microsoft\Windows\GameDVR", "AllowGameDVR", 0),
                dword(
                    r"HKLM\SYSTEM\CurrentControlSet\Control\PriorityControl",
                    "Win32PrioritySeparation",
                    38,
                ),
                dword(r"HKCU\Control Panel\Mouse", "MouseHoverTime", 10),
            ])),
            "services" => {
                let disable = self.config.services_to_disable()?;
                let manual = self.config.services_to_manual()?;
                let mut steps = Vec::new();
                for svc in &disable {
                    steps.push(ServiceChange::SetStart(svc.clone(), StartMode::Disabled));
                    steps.push(ServiceChange::Stop(svc.clone()));
                }
                for svc in &manual {
                    steps.push(ServiceChange::SetStart(svc.clone(), StartMode::Demand));
                }
                Arc::new(
                    self.seq("Services optimized")
                        .details(format!(
                            "Disabled {} services, set {} to manual",
                            disable.len(),
                            manual.len()
                        ))
                        .best_effort(steps),
                )
            }
            "temp-cleanup" => {
                let dirs = if self.config.system.temp_dirs.is_empty() {
                    TempCleanup::platform_dirs()
                } else {
                    self.config.system.temp_dirs.clone()
                };
                Arc::new(TempCleanup::new(dirs))
            }
            "disk-optimization" => {
                let drive = self.config.drive()?;
                Arc::new(
                    self.seq(&format!("Disk {} optimized", drive.volume()))
                        .required([tweaks::defrag_analyze(drive)]),
                )
            }
            "trim-ssd" => {
                let drive = self.config.drive()?;
                Arc::new(
                    self.seq(&format!("TRIM completed on drive {}", drive.volume()))
                        .required([tweaks::retrim(drive)]),
                )
            }

            // Network
            "optimize-dns-priority" => Arc::new(self.seq("DNS priority optimized").required([
                dword(TCPIP, "DnsPriority", 1),
                dword(TCPIP, "DnsPriorityClass", 1),
            ])),
            "optimize-network-throttling" => Arc::new(
                self.seq("Network throttling removed")
                    .required([dword(SYSTEM_PROFILE, "NetworkThrottlingIndex", u32::MAX)])
                    .required([
                        ItemProperty::new(TCPIP_INTERFACES, "TcpAckFrequency", 1),
                        ItemProperty::new(TCPIP_INTERFACES, "TCPNoDelay", 1),
                    ]),
            ),
            "optimize-tcpip" => Arc::new(self.seq("TCP/IP optimized").required([
                dword(TCPIP, "TcpTimedWaitDelay", 30),
                dword(TCPIP, "MaxUserPort", 65534),
                dword(TCPIP, "MaxFreeTcbs", 65536),
                dword(TCPIP, "MaxHashTableSize", 65536),
                dword(TCPIP, "TcpMaxDupAcks", 2),
            ])),
            "optimize-mtu" => Arc::new(
                self.seq("MTU optimized").best_effort(["Ethernet", "Wi-Fi"].map(|iface| {
                    CommandSpec::new("netsh").args([
                        "interface",
                        "ipv4",
                        "set",
                        "subinterface",
                        iface,
                        "mtu=1500",
                        "store=persistent",
                    ])
                })),
            ),
            "optimize-nagles-algorithm" => {
                Arc::new(self.seq("Nagle's algorithm disabled").required([
                    ItemProperty::new(TCPIP_INTERFACES, "TcpAckFrequency", 1),
                    ItemProperty::new(TCPIP_INTERFACES, "TCPNoDelay", 1),
                ]))
            }
            "optimize-network-offload" => Arc::new(
                self.seq("Network offload optimized").required(adapters(&[
                    ("*RscIPv4", "0"),
                    ("*RscIPv6", "0"),
                    ("*LsoV2IPv4", "0"),
                    ("*LsoV2IPv6", "0"),
                ])),
            ),
            "manage-ipv6" => Arc::new(
                self.seq("IPv6 disabled")
                    .required([CommandSpec::powershell(
                        "Disable-NetAdapterBinding -Name '*' -ComponentID ms_tcpip6",
                    )])
                    .required([dword(
                        r"HKLM\SYSTEM\CurrentControlSet\Services\Tcpip6\Parameters",
                        "DisabledComponents",
                        u32::MAX,
                    )]),
            ),
            "optimize-network-interfaces" => Arc::new(
                self.seq("Network interfaces optimized").required(adapters(&[
                    ("*FlowControl", "0"),
                    ("*InterruptModeration", "0"),
                    ("*ReceiveBuffers", "2048"),
                    ("*TransmitBuffers", "2048"),
                ])),
            ),

            // GPU
            "optimize-nvidia-profile" => {
                Arc::new(self.seq("GPU driver profile optimized").required([
                    dword(GRAPHICS_DRIVERS, "HwSchMode", 2),
                    dword(GRAPHICS_DRIVERS, "TdrDelay", 10),
                    dword(GRAPHICS_DRIVERS, "TdrDdiDelay", 10),
                    dword(
                        &format!(r"{GRAPHICS_DRIVERS}\Power"),
                        "MonitorLatencyTolerance",
                        1,
                    ),
                ]))
            }
            "create-custom-power-plan" => Arc::new(
                self.seq("Gaming power plan created")
                    .details(format!("{GAMING_PLAN_NAME} is now active"))
                    // Fails when the plan already exists, which is fine.
                    .step(Step::best_effort(CommandSpec::new("powercfg").args([
                        "-duplicatescheme",
                        ULTIMATE_PERFORMANCE_GUID,
                        GAMING_PLAN_GUID,
                    ])))
                    .required([CommandSpec::new("powercfg").args([
                        "-changename",
                        GAMING_PLAN_GUID,
                        GAMING_PLAN_NAME,
                        "Power plan tuned for gaming",
                    ])])
                    .required([
                        PowerSetting::processor("PERFBOOSTPOL", 100),
                        PowerSetting::processor("PERFBOOSTMODE", 2),
                    ])
                    .required([activate_gaming_plan()]),
            ),
            "optimize-gpu-memory" => Arc::new(
                self.seq("GPU memory optimized")
                    .required([
                        dword(GRAPHICS_DRIVERS, "EnablePreemption", 0),
                        dword(
                            &format!(r"{GRAPHICS_DRIVERS}\MemoryManager"),
                            "DedicatedSegmentSize",
                            0,
                        ),
                    ])
                    .required([
                        PowerSetting::processor("PROCTHROTTLEMIN", 100),
                        PowerSetting::processor("PROCTHROTTLEMAX", 100),
                        PowerSetting::processor("PERFBOOSTPOL", 100),
                    ]),
            ),

            // CPU
            "cpu-power-management" => Arc::new(
                self.seq("CPU power management optimized")
                    .required([
                        PowerSetting::processor("PROCTHROTTLEMIN", 100),
                        PowerSetting::processor("PROCTHROTTLEMAX", 100),
                        PowerSetting::processor("PERFBOOSTPOL", 100),
                        PowerSetting::processor("PERFBOOSTMODE", 2),
                    ])
                    .required([activate_gaming_plan()]),
            ),
            "core-parking" => Arc::new(
                self.seq("Core parking disabled")
                    .required([
                        PowerSetting::processor("CPMINCORES", 100),
                        PowerSetting::processor("CPMAXCORES", 100),
                    ])
                    .required([activate_gaming_plan()]),
            ),
            "frequency-scaling" => Arc::new(
                self.seq("Frequency scaling optimized")
                    .required([
                        PowerSetting::processor("PERFBOOSTPOL", 100),
                        PowerSetting::processor("PERFBOOSTMODE", 2),
                    ])
                    .required([activate_gaming_plan()]),
            ),

            // Memory
            "memory-management" => Arc::new(self.seq("Memory management optimized").required([
                mm("ClearPageFileAtShutdown", 0),
                mm("LargeSystemCache", 0),
                mm("IoPageLockLimit", 983_040),
                mm("SecondLevelDataCache", 1024),
                mm("SessionPoolSize", 48),
                mm("SessionViewSize", 192),
            ])),
            "page-file" => Arc::new(self.seq("Page file optimized").required([
                mm("DisablePagingExecutive", 1),
                mm("ClearPageFileAtShutdown", 0),
                mm("LargeSystemCache", 0),
            ])),
            "memory-compression" => Arc::new(
                self.seq("Memory compression disabled")
                    .required([CommandSpec::powershell("Disable-MMAgent -MemoryCompression")])
                    .required([mm("DisablePagingExecutive", 1)]),
            ),
            "memory-pool" => Arc::new(self.seq("Memory pool optimized").required([
                mm("PagedPoolQuota", 0),
                mm("NonPagedPoolQuota", 0),
                mm("PagedPoolSize", u32::MAX),
                mm("NonPagedPoolSize", u32::MAX),
                mm("SessionPoolSize", 48),
            ])),
            "memory-cache" => Arc::new(self.seq("Memory cache optimized").required([
                mm("LargeSystemCache", 0),
                mm("IoPageLockLimit", 983_040),
                mm("SystemPages", u32::MAX),
            ])),

            // Storage
            "storage-performance" => {
                Arc::new(self.seq("Storage performance optimized").required([
                    dword(FILE_SYSTEM, "NtfsDisableLastAccessUpdate", 1),
                    dword(FILE_SYSTEM, "NtfsDisable8dot3NameCreation", 1),
                ]))
            }
            "disk-cache" => Arc::new(self.seq("Disk cache optimized").required([
                mm("IoPageLockLimit", 983_040),
                mm("LargeSystemCache", 0),
            ])),
            "file-system" => Arc::new(self.seq("File system optimized").required([
                dword(FILE_SYSTEM, "NtfsDisableLastAccessUpdate", 1),
                dword(FILE_SYSTEM, "NtfsDisable8dot3NameCreation", 1),
                dword(FILE_SYSTEM, "NtfsMemoryUsage", 2),
            ])),
            "disk-cleanup" => Arc::new(
                self.seq("Disk cleanup completed")
                    .required([CommandSpec::new("cleanmgr").arg("/sagerun:1")]),
            ),
            "storage-policies" => Arc::new(self.seq("Storage policies applied").required([
                CommandSpec::new("fsutil").args(["behavior", "set", "disablelastaccess", "1"]),
                CommandSpec::new("fsutil").args(["behavior", "set", "disable8dot3", "1"]),
            ])),

            // Tools
            "autoruns" => Arc::new(self.seq("Startup entries removed").best_effort(
                [
                    r"HKLM:\SOFTWARE\Microsoft\Windows\CurrentVersion\Run",
                    r"HKCU:\SOFTWARE\Microsoft\Windows\CurrentVersion\Run",
                    r"HKLM:\SOFTWARE\Microsoft\Windows\CurrentVersion\RunOnce",
                    r"HKCU:\SOFTWARE\Microsoft\Windows\CurrentVersion\RunOnce",
                ]
                .map(|key| {
                    CommandSpec::powershell(format!("Remove-ItemProperty -Path '{key}' -Name '*'"))
                }),
            )),
            "windows-updates" => {
                let mut steps = Vec::new();
                for name in ["wuauserv", "BITS"] {
                    let svc = ServiceName::parse(name)?;
                    steps.push(Step::required(ServiceChange::SetStart(
                        svc.clone(),
                        StartMode::Disabled,
                    )));
                    steps.push(Step::best_effort(ServiceChange::Stop(svc)));
                }
                Arc::new(
                    steps
                        .into_iter()
                        .fold(self.seq("Windows Update blocked"), CommandSequence::step),
                )
            }
            "uac" => Arc::new(self.seq("UAC prompts reduced").required([
                dword(POLICIES_SYSTEM, "ConsentPromptBehaviorAdmin", 0),
                dword(POLICIES_SYSTEM, "PromptOnSecureDesktop", 0),
                dword(POLICIES_SYSTEM, "EnableLUA", 0),
            ])),
            "file-extensions" => Arc::new(self.seq("File extensions visible").required([
                dword(EXPLORER_ADVANCED, "HideFileExt", 0),
                dword(EXPLORER_ADVANCED, "Hidden", 1),
            ])),
            "dark-mode" => Arc::new(self.seq("Dark mode enabled").required([
                dword(PERSONALIZE, "AppsUseLightTheme", 0),
                dword(PERSONALIZE, "SystemUsesLightTheme", 0),
            ])),
            "privacy" => {
                let diag = ServiceName::parse("DiagTrack")?;
                Arc::new(
                    self.seq("Privacy settings applied")
                        .required([
                            dword(DATA_COLLECTION, "AllowTelemetry", 0),
                            dword(DATA_COLLECTION, "AllowDeviceNameInTelemetry", 0),
                        ])
                        .best_effort([
                            ServiceChange::SetStart(diag.clone(), StartMode::Disabled),
                            ServiceChange::Stop(diag),
                        ]),
                )
            }

            // QoS
            "qos-create" => {
                let profile = self.config.qos_profile()?;
                let app = self.config.qos_application()?;
                Arc::new(
                    self.seq("QoS policy created")
                        .details(format!("Profile {profile} prioritizing {app}"))
                        .required(tweaks::qos_policy(&profile, &app)),
                )
            }
            "qos-revert" => {
                let profile = self.config.qos_profile()?;
                Arc::new(
                    self.seq("QoS policy reverted")
                        .details(format!("Profile {profile} removed"))
                        .required([RegistryDelete {
                            key: tweaks::qos_key(&profile),
                        }]),
                )
            }
            "qos-list" => Arc::new(QosList {
                runner: self.runner.clone(),
            }),

            // Monitoring
            "real-ping" => Arc::new(PingOperation::new(
                self.runner.clone(),
                self.config.ping_host()?,
            )),
            "system-health" => Arc::new(MetricsOperation::new(
                self.metrics.clone(),
                MetricsView::Health,
            )),
            "performance-metrics" => Arc::new(MetricsOperation::new(
                self.metrics.clone(),
                MetricsView::Performance,
            )),
            "network-monitor" => Arc::new(MetricsOperation::new(
                self.metrics.clone(),
                MetricsView::Network,
            )),
            "diagnostics" => Arc::new(self.seq("Diagnostics completed").required([
                CommandSpec::new("sfc").arg("/scannow"),
                CommandSpec::new("DISM").args(["/Online", "/Cleanup-Image", "/CheckHealth"]),
            ])),

            other => {
                return Err(CoreError::InvalidAction {
                    id: other.to_string(),
                    reason: "no system operation bound".into(),
                })
            }
        };
        Ok(op)
    }
}

fn activate_gaming_plan() -> CommandSpec {
    CommandSpec::new("powercfg").args(["-setactive", GAMING_PLAN_GUID])
}

// ---------------------------------------------------------------------------
// QosList
// ---------------------------------------------------------------------------

/// Lists policy names under the QoS policy root. A missing root key means no
/// policies, not a failure.
struct QosList {
    runner: Arc<dyn CommandRunner>,
}

pub fn parse_profile_list(stdout: &str) -> Vec<String> {
    stdout
        .trim()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

impl Operation for QosList {
    fn execute(&self) -> BoxFuture<'_, Result<OptimizationResult>> {
        Box::pin(async move {
            let root = QOS_ROOT.replacen("HKLM", "HKLM:", 1);
            let spec = CommandSpec::powershell(format!(
                "(Get-ChildItem '{root}' -ErrorAction SilentlyContinue | \
                 Select-Object -ExpandProperty PSChildName) -join ','"
            ));
            let profiles = match self.runner.run(&spec).await {
                Ok(out) => parse_profile_list(&out.stdout),
                Err(CoreError::CommandFailed { .. }) => Vec::new(),
                Err(e) => return Err(e),
            };
            // Names outside the allowed pattern are reported but flagged.
            let valid = profiles
                .iter()
                .filter(|p| ProfileName::parse(p).is_ok())
                .count();
            Ok(OptimizationResult::ok("QoS policies listed")
                .with_details(format!("{} policies", profiles.len()))
                .with_data(json!({ "profiles": profiles, "valid": valid })))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::testing::{Reply, ScriptedRunner};
    use crate::executor::Executor;
    use crate::metrics::{shared, FixedMetrics};
    use crate::types::ActionStatus;
    use std::collections::HashSet;

    fn mock_config() -> Config {
        let mut cfg = Config::default();
        cfg.execution.mock_delay_ms = 0;
        cfg
    }

    fn system_config() -> Config {
        let mut cfg = Config::default();
        cfg.execution.mode = ExecutionMode::System;
        cfg
    }

    fn fixed() -> SharedMetrics {
        shared(Box::new(FixedMetrics::idle()))
    }

    #[test]
    fn declared_ids_are_unique() {
        let mut seen = HashSet::new();
        for d in ACTIONS {
            assert!(seen.insert(d.id), "duplicate id {}", d.id);
        }
    }

    #[test]
    fn mock_catalog_has_every_action() {
        let catalog = catalog(&mock_config(), Arc::new(ScriptedRunner::new()), fixed()).unwrap();
        assert_eq!(catalog.len(), ACTIONS.len());
        assert!(catalog.contains("temp-cleanup"));
        assert!(catalog.contains("qos-list"));
        assert_eq!(catalog.categories()[0], "System");
    }

    #[test]
    fn system_catalog_binds_every_action() {
        let catalog = catalog(&system_config(), Arc::new(ScriptedRunner::new()), fixed()).unwrap();
        assert_eq!(catalog.len(), ACTIONS.len());
    }

    #[test]
    fn system_catalog_rejects_bad_config() {
        let mut cfg = system_config();
        cfg.system.drive = "C: & del".into();
        let err = catalog(&cfg, Arc::new(ScriptedRunner::new()), fixed()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidParameter { kind: "drive letter", .. }));
    }

    #[tokio::test]
    async fn mock_run_completes_with_canned_result() {
        let catalog = catalog(&mock_config(), Arc::new(ScriptedRunner::new()), fixed()).unwrap();
        let exec = Executor::new(Arc::new(catalog));
        let result = exec.run("restore-point").await.unwrap();
        assert!(result.success);
        assert_eq!(result.message, "Restore point created");
        assert_eq!(
            exec.status("restore-point").unwrap().status,
            ActionStatus::Completed
        );
    }

    #[tokio::test]
    async fn system_services_recipe_uses_config() {
        let runner = Arc::new(ScriptedRunner::new().on("stop SysMain", Reply::Exit(1062, "not started")));
        let catalog = catalog(&system_config(), runner.clone(), fixed()).unwrap();
        let exec = Executor::new(Arc::new(catalog));
        let result = exec.run("services").await.unwrap();
        assert!(result.success);
        assert_eq!(result.data.unwrap()["skipped"], 1);
        let calls = runner.rendered();
        assert!(calls.contains(&"sc config DiagTrack start= disabled".to_string()));
        assert!(calls.contains(&"sc config WSearch start= demand".to_string()));
    }

    #[tokio::test]
    async fn system_trim_failure_marks_failed() {
        let runner = Arc::new(ScriptedRunner::new().on("defrag C: /L", Reply::Exit(5, "access denied")));
        let catalog = catalog(&system_config(), runner, fixed()).unwrap();
        let exec = Executor::new(Arc::new(catalog));
        let result = exec.run("trim-ssd").await.unwrap();
        assert!(!result.success);
        let status = exec.status("trim-ssd").unwrap();
        assert_eq!(status.status, ActionStatus::Failed);
        assert_eq!(status.failure, Some(crate::types::FailureKind::Rejected));
    }

    #[tokio::test]
    async fn system_health_reads_metrics() {
        let catalog = catalog(&system_config(), Arc::new(ScriptedRunner::new()), fixed()).unwrap();
        let exec = Executor::new(Arc::new(catalog));
        let result = exec.run("system-health").await.unwrap();
        assert_eq!(result.data.unwrap()["cpu"], 25.0);
    }

    #[tokio::test]
    async fn qos_create_writes_dscp() {
        let runner = Arc::new(ScriptedRunner::new());
        let catalog = catalog(&system_config(), runner.clone(), fixed()).unwrap();
        let exec = Executor::new(Arc::new(catalog));
        let result = exec.run("qos-create").await.unwrap();
        assert!(result.success);
        assert_eq!(result.details.as_deref(), Some("Profile NeuroCore prioritizing game.exe"));
        assert!(runner
            .rendered()
            .iter()
            .any(|c| c.contains(r"QoS\NeuroCore") && c.contains("\"DSCP Value\"") && c.contains(" 46 ")));
    }

    #[tokio::test]
    async fn qos_list_parses_and_tolerates_missing_root() {
        let runner = Arc::new(ScriptedRunner::new().on("PSChildName", Reply::Ok("NeuroCore,Valorant\r\n")));
        let op = QosList { runner };
        let data = op.execute().await.unwrap().data.unwrap();
        assert_eq!(data["profiles"], json!(["NeuroCore", "Valorant"]));

        let runner = Arc::new(ScriptedRunner::new().on("PSChildName", Reply::Exit(1, "")));
        let op = QosList { runner };
        let result = op.execute().await.unwrap();
        assert!(result.success);
        assert_eq!(result.data.unwrap()["profiles"], json!([]));
    }

    #[test]
    fn profile_list_parsing() {
        assert!(parse_profile_list("  \n").is_empty());
        assert_eq!(parse_profile_list("a, b,,c"), ["a", "b", "c"]);
    }
}
