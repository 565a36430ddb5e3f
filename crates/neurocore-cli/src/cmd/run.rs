use crate::output::{print_json, print_table};
use anyhow::{anyhow, bail};
use futures::future::join_all;
use neurocore_core::action::OptimizationResult;
use neurocore_core::error::CoreError;
use neurocore_core::types::ActionStatus;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;

#[derive(Serialize)]
struct RunOutcome {
    id: String,
    #[serde(flatten)]
    outcome: Outcome,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Outcome {
    Result(OptimizationResult),
    Error { success: bool, error: String },
}

impl RunOutcome {
    fn succeeded(&self) -> bool {
        matches!(&self.outcome, Outcome::Result(r) if r.success)
    }
}

pub fn run(root: &Path, ids: &[String], strict: bool, json: bool) -> anyhow::Result<()> {
    let executor = super::executor(root)?;

    // Reject typos up front so nothing runs on a partially bad command line.
    for id in ids {
        if !executor.catalog().contains(id) {
            return Err(CoreError::UnknownAction(id.clone()).into());
        }
    }
    let mut seen = HashSet::new();
    let ids: Vec<&String> = ids.iter().filter(|id| seen.insert(id.as_str())).collect();

    let rt = tokio::runtime::Runtime::new()?;
    let outcomes = rt.block_on(async {
        let mut events = executor.subscribe();
        let progress = (!json).then(|| {
            tokio::spawn(async move {
                while let Ok(change) = events.recv().await {
                    if change.status == ActionStatus::Running {
                        eprintln!("→ {} running", change.id);
                    }
                }
            })
        });

        let runs = ids.iter().map(|id| {
            let executor = &executor;
            async move {
                let outcome = if strict {
                    executor.run_strict(id).await
                } else {
                    executor.run(id).await
                };
                RunOutcome {
                    id: id.to_string(),
                    outcome: match outcome {
                        Ok(result) => Outcome::Result(result),
                        Err(e) => Outcome::Error {
                            success: false,
                            error: e.to_string(),
                        },
                    },
                }
            }
        });
        let outcomes = join_all(runs).await;
        if let Some(handle) = progress {
            handle.abort();
        }
        outcomes
    });

    if json {
        print_json(&outcomes)?;
    } else {
        let rows = outcomes
            .iter()
            .map(|o| {
                let (mark, message, details) = match &o.outcome {
                    Outcome::Result(r) => (
                        if r.success { "ok" } else { "failed" },
                        r.message.clone(),
                        r.details.clone().unwrap_or_default(),
                    ),
                    Outcome::Error { error, .. } => ("error", error.clone(), String::new()),
                };
                vec![o.id.clone(), mark.to_string(), message, details]
            })
            .collect();
        print_table(&["ID", "RESULT", "MESSAGE", "DETAILS"], rows);
    }

    let failed: Vec<&str> = outcomes
        .iter()
        .filter(|o| !o.succeeded())
        .map(|o| o.id.as_str())
        .collect();
    match failed.len() {
        0 => Ok(()),
        1 => Err(anyhow!("action '{}' failed", failed[0])),
        n => bail!("{n} actions failed: {}", failed.join(", ")),
    }
}
