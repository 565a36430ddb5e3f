use crate::output::{print_json, print_table};
use neurocore_core::executor::OptimizationStatus;
use std::path::Path;

pub fn run(root: &Path, id: Option<&str>, json: bool) -> anyhow::Result<()> {
    let executor = super::executor(root)?;

    let statuses: Vec<OptimizationStatus> = match id {
        Some(id) => vec![executor.status(id)?],
        None => executor.statuses(),
    };

    if json {
        return match id {
            Some(_) => print_json(&statuses[0]),
            None => print_json(&statuses),
        };
    }

    let rows = statuses
        .iter()
        .map(|s| {
            vec![
                s.id.clone(),
                s.status.to_string(),
                s.last_run
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "-".into()),
                s.last_result
                    .as_ref()
                    .map(|r| r.message.clone())
                    .unwrap_or_default(),
            ]
        })
        .collect();
    print_table(&["ID", "STATUS", "LAST RUN", "MESSAGE"], rows);
    Ok(())
}
