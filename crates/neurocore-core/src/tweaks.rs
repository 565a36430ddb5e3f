//! Declarative tweak recipes.
//!
//! A recipe is a list of `Step`s, each wrapping one `CommandSpec`. Steps are
//! built from typed descriptions (`RegistryValue`, `PowerSetting`,
//! `ServiceChange`, `AdapterProperty`) so the argument vectors are assembled in
//! exactly one place per tool.
//!
//! `CommandSequence` runs the steps in order:
//! - a `Required` step that exits non-zero stops the sequence and yields
//!   `success: false`; a `Required` step that cannot be spawned is an error
//! - a `BestEffort` step that fails for any reason is logged and counted
//! - earlier steps are never rolled back

use futures::future::BoxFuture;
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

use crate::action::{Operation, OptimizationResult};
use crate::command::{CommandRunner, CommandSpec};
use crate::error::{CoreError, Result};
use crate::params::{AppName, DriveLetter, ExecutableName, ProfileName, ServiceName};

/// GUID the gaming power plan is duplicated into.
pub const GAMING_PLAN_GUID: &str = "88888888-8888-8888-8888-888888888888";
/// Built-in "Ultimate Performance" scheme used as the duplication source.
pub const ULTIMATE_PERFORMANCE_GUID: &str = "e9a42b02-d5df-448d-aa00-03f14749eb61";

pub const QOS_ROOT: &str = r"HKLM\SOFTWARE\Policies\Microsoft\Windows\QoS";

/// Anything that compiles to a single command invocation.
pub trait ToCommand {
    fn to_command(&self) -> CommandSpec;
}

impl ToCommand for CommandSpec {
    fn to_command(&self) -> CommandSpec {
        self.clone()
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegData {
    Dword(u32),
    Sz(String),
}

/// `reg add <key> /v <name> /t <type> /d <data> /f`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryValue {
    pub key: String,
    pub name: String,
    pub data: RegData,
}

impl RegistryValue {
    pub fn dword(key: impl Into<String>, name: impl Into<String>, value: u32) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            data: RegData::Dword(value),
        }
    }

    pub fn sz(key: impl Into<String>, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            data: RegData::Sz(value.into()),
        }
    }
}

impl ToCommand for RegistryValue {
    fn to_command(&self) -> CommandSpec {
        let (kind, data) = match &self.data {
            RegData::Dword(v) => ("REG_DWORD", v.to_string()),
            RegData::Sz(s) => ("REG_SZ", s.clone()),
        };
        CommandSpec::new("reg").args([
            "add",
            self.key.as_str(),
            "/v",
            self.name.as_str(),
            "/t",
            kind,
            "/d",
            data.as_str(),
            "/f",
        ])
    }
}

/// `reg delete <key> /f`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryDelete {
    pub key: String,
}

impl ToCommand for RegistryDelete {
    fn to_command(&self) -> CommandSpec {
        CommandSpec::new("reg").args(["delete", self.key.as_str(), "/f"])
    }
}

/// `Set-ItemProperty` for keys `reg add` cannot address, such as the
/// per-interface `Tcpip\Parameters\Interfaces\*` wildcard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemProperty {
    pub path: &'static str,
    pub name: &'static str,
    pub value: u32,
}

impl ItemProperty {
    pub const fn new(path: &'static str, name: &'static str, value: u32) -> Self {
        Self { path, name, value }
    }
}

impl ToCommand for ItemProperty {
    fn to_command(&self) -> CommandSpec {
        CommandSpec::powershell(format!(
            "Set-ItemProperty -Path '{}' -Name '{}' -Value {}",
            self.path, self.name, self.value
        ))
    }
}

// ---------------------------------------------------------------------------
// Power plan
// ---------------------------------------------------------------------------

/// `powercfg -setacvalueindex <scheme> <subgroup> <setting> <value>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowerSetting {
    pub scheme: &'static str,
    pub subgroup: &'static str,
    pub setting: &'static str,
    pub value: u32,
}

impl PowerSetting {
    pub fn processor(setting: &'static str, value: u32) -> Self {
        Self {
            scheme: GAMING_PLAN_GUID,
            subgroup: "SUB_PROCESSOR",
            setting,
            value,
        }
    }
}

impl ToCommand for PowerSetting {
    fn to_command(&self) -> CommandSpec {
        CommandSpec::new("powercfg").args([
            "-setacvalueindex".to_string(),
            self.scheme.to_string(),
            self.subgroup.to_string(),
            self.setting.to_string(),
            self.value.to_string(),
        ])
    }
}

// ---------------------------------------------------------------------------
// Services
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartMode {
    Disabled,
    Demand,
    Auto,
}

impl StartMode {
    fn as_sc_arg(self) -> &'static str {
        match self {
            StartMode::Disabled => "disabled",
            StartMode::Demand => "demand",
            StartMode::Auto => "auto",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceChange {
    /// `sc config <name> start= <mode>`
    SetStart(ServiceName, StartMode),
    /// `sc stop <name>`
    Stop(ServiceName),
}

impl ToCommand for ServiceChange {
    fn to_command(&self) -> CommandSpec {
        match self {
            ServiceChange::SetStart(name, mode) => CommandSpec::new("sc").args([
                "config",
                name.as_str(),
                "start=",
                mode.as_sc_arg(),
            ]),
            ServiceChange::Stop(name) => CommandSpec::new("sc").args(["stop", name.as_str()]),
        }
    }
}

// ---------------------------------------------------------------------------
// Network adapters
// ---------------------------------------------------------------------------

/// Advanced driver property applied to every adapter that is up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterProperty {
    pub keyword: &'static str,
    pub value: &'static str,
}

impl AdapterProperty {
    pub const fn new(keyword: &'static str, value: &'static str) -> Self {
        Self { keyword, value }
    }
}

impl ToCommand for AdapterProperty {
    fn to_command(&self) -> CommandSpec {
        CommandSpec::powershell(format!(
            "Get-NetAdapter | Where-Object {{$_.Status -eq 'Up'}} | \
             Set-NetAdapterAdvancedProperty -RegistryKeyword '{}' -RegistryValue '{}'",
            self.keyword, self.value
        ))
    }
}

// ---------------------------------------------------------------------------
// Parameterized one-off commands
// ---------------------------------------------------------------------------

/// `defrag <drive>: /A /V`
pub fn defrag_analyze(drive: DriveLetter) -> CommandSpec {
    CommandSpec::new("defrag").args([drive.volume(), "/A".into(), "/V".into()])
}

/// `defrag <drive>: /L /V`
pub fn retrim(drive: DriveLetter) -> CommandSpec {
    CommandSpec::new("defrag").args([drive.volume(), "/L".into(), "/V".into()])
}

pub fn remove_app(app: &AppName) -> CommandSpec {
    CommandSpec::powershell(format!(
        "Get-AppxPackage -AllUsers '*{app}*' | Remove-AppxPackage"
    ))
}

pub fn qos_key(profile: &ProfileName) -> String {
    format!(r"{QOS_ROOT}\{profile}")
}

/// Registry values for a DSCP 46 policy prioritizing `app`.
pub fn qos_policy(profile: &ProfileName, app: &ExecutableName) -> Vec<RegistryValue> {
    let key = qos_key(profile);
    let mut values = vec![
        RegistryValue::sz(&key, "Version", "1.0"),
        RegistryValue::sz(&key, "Application Name", app.as_str()),
    ];
    for name in [
        "Protocol",
        "Local Port",
        "Local IP",
        "Local IP Prefix Length",
        "Remote Port",
        "Remote IP",
        "Remote IP Prefix Length",
    ] {
        values.push(RegistryValue::sz(&key, name, "*"));
    }
    values.push(RegistryValue::sz(&key, "DSCP Value", "46"));
    values.push(RegistryValue::sz(&key, "Throttle Rate", "-1"));
    values
}

// ---------------------------------------------------------------------------
// Step / CommandSequence
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPolicy {
    Required,
    BestEffort,
}

#[derive(Debug, Clone)]
pub struct Step {
    pub command: CommandSpec,
    pub policy: StepPolicy,
}

impl Step {
    pub fn required(cmd: impl ToCommand) -> Self {
        Self {
            command: cmd.to_command(),
            policy: StepPolicy::Required,
        }
    }

    pub fn best_effort(cmd: impl ToCommand) -> Self {
        Self {
            command: cmd.to_command(),
            policy: StepPolicy::BestEffort,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.command, f)
    }
}

pub struct CommandSequence {
    runner: Arc<dyn CommandRunner>,
    steps: Vec<Step>,
    message: String,
    details: Option<String>,
}

impl CommandSequence {
    pub fn new(runner: Arc<dyn CommandRunner>, message: impl Into<String>) -> Self {
        Self {
            runner,
            steps: Vec::new(),
            message: message.into(),
            details: None,
        }
    }

    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn required<I, C>(mut self, cmds: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: ToCommand,
    {
        self.steps.extend(cmds.into_iter().map(Step::required));
        self
    }

    pub fn best_effort<I, C>(mut self, cmds: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: ToCommand,
    {
        self.steps.extend(cmds.into_iter().map(Step::best_effort));
        self
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    async fn run_steps(&self) -> Result<OptimizationResult> {
        let total = self.steps.len();
        let mut skipped = 0usize;

        for (i, step) in self.steps.iter().enumerate() {
            debug!(step = i + 1, total, command = %step, "running step");
            match self.runner.run(&step.command).await {
                Ok(_) => {}
                Err(e) if step.policy == StepPolicy::BestEffort => {
                    info!(command = %step, error = %e, "best-effort step skipped");
                    skipped += 1;
                }
                Err(e @ CoreError::CommandFailed { .. }) => {
                    return Ok(OptimizationResult::failed(format!(
                        "step {} of {total} failed: {step}",
                        i + 1
                    ))
                    .with_details(e.to_string())
                    .with_data(json!({
                        "steps": total,
                        "completed": i,
                        "failed_step": i + 1,
                        "skipped": skipped,
                    })));
                }
                Err(e) => return Err(e),
            }
        }

        let mut result = OptimizationResult::ok(self.message.clone())
            .with_data(json!({ "steps": total, "skipped": skipped }));
        if let Some(details) = &self.details {
            result = result.with_details(details.clone());
        }
        Ok(result)
    }
}

impl Operation for CommandSequence {
    fn execute(&self) -> BoxFuture<'_, Result<OptimizationResult>> {
        Box::pin(self.run_steps())
    }
}
