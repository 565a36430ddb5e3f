use crate::output::{print_json, print_table};
use clap::Subcommand;
use neurocore_core::action::ActionInfo;
use neurocore_core::error::CoreError;
use std::path::Path;

#[derive(Subcommand)]
pub enum ActionsSubcommand {
    /// List actions in catalog order
    List {
        /// Only actions in this category (case-insensitive)
        #[arg(long)]
        category: Option<String>,
    },

    /// Show one action's metadata
    Show { id: String },
}

pub fn run(root: &Path, subcmd: ActionsSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ActionsSubcommand::List { category } => list(root, category.as_deref(), json),
        ActionsSubcommand::Show { id } => show(root, &id, json),
    }
}

fn list(root: &Path, category: Option<&str>, json: bool) -> anyhow::Result<()> {
    let executor = super::executor(root)?;
    let actions: Vec<ActionInfo> = executor
        .catalog()
        .list()
        .iter()
        .filter(|a| category.map_or(true, |c| a.category.eq_ignore_ascii_case(c)))
        .map(|a| a.info())
        .collect();

    if json {
        return print_json(&actions);
    }
    if actions.is_empty() {
        println!("No actions match.");
        return Ok(());
    }

    let rows = actions
        .iter()
        .map(|a| {
            vec![
                a.id.clone(),
                a.category.clone(),
                a.title.clone(),
                format!("{}s", a.estimated_duration_secs),
                if a.warning.is_some() { "!" } else { "" }.to_string(),
            ]
        })
        .collect();
    print_table(&["ID", "CATEGORY", "TITLE", "EST", "WARN"], rows);
    Ok(())
}

fn show(root: &Path, id: &str, json: bool) -> anyhow::Result<()> {
    let executor = super::executor(root)?;
    let info = executor
        .catalog()
        .get(id)
        .map(|a| a.info())
        .ok_or_else(|| CoreError::UnknownAction(id.to_string()))?;

    if json {
        return print_json(&info);
    }

    println!("{} ({})", info.title, info.id);
    println!("Category:  {}", info.category);
    println!("Estimate:  {}s", info.estimated_duration_secs);
    if !info.description.is_empty() {
        println!("\n{}", info.description);
    }
    if let Some(w) = &info.warning {
        println!("\nWarning: {w}");
    }
    Ok(())
}
