use crate::output::{print_json, print_table};
use anyhow::bail;
use neurocore_core::metrics::{self, MetricsKind, MetricsSnapshot};
use std::path::Path;
use std::time::Duration;

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

pub fn run(
    root: &Path,
    samples: u32,
    source: Option<MetricsKind>,
    json: bool,
) -> anyhow::Result<()> {
    if samples == 0 {
        bail!("--samples must be at least 1");
    }
    let mut config = super::load_config(root)?;
    if let Some(kind) = source {
        config.metrics.source = kind;
    }
    let interval = Duration::from_millis(config.metrics.interval_ms);
    let mut source = metrics::from_config(&config.metrics);
    tracing::debug!(source = source.name(), samples, "sampling metrics");

    let mut snapshots = Vec::with_capacity(samples as usize);
    for i in 0..samples {
        if i > 0 {
            std::thread::sleep(interval);
        }
        let snap = source.sample()?;
        if !json {
            print_snapshot(&snap);
        }
        snapshots.push(snap);
    }

    if json {
        match snapshots.as_slice() {
            [one] => print_json(one)?,
            many => print_json(&many)?,
        }
    }
    Ok(())
}

fn print_snapshot(snap: &MetricsSnapshot) {
    println!(
        "{}  CPU {:.1}% @ {} MHz  RAM {:.1}% ({:.1}/{:.1} GiB){}",
        snap.timestamp.format("%H:%M:%S"),
        snap.cpu.usage,
        snap.cpu.frequency_mhz,
        snap.memory.usage,
        snap.memory.used as f64 / GIB,
        snap.memory.total as f64 / GIB,
        snap.cpu
            .temperature
            .map(|t| format!("  {t:.0}°C"))
            .unwrap_or_default(),
    );
    if !snap.disks.is_empty() {
        let rows = snap
            .disks
            .iter()
            .map(|d| {
                vec![
                    d.device.clone(),
                    format!("{:.1}%", d.usage),
                    format!("{:.1} GiB free", d.available_bytes as f64 / GIB),
                ]
            })
            .collect();
        print_table(&["DISK", "USED", "FREE"], rows);
    }
}
