use crate::output::print_json;
use clap::{Subcommand, ValueEnum};
use neurocore_core::prefs::{JsonFileStore, UiSettings};
use neurocore_core::types::Theme;
use std::path::Path;

#[derive(Subcommand)]
pub enum SettingsSubcommand {
    /// Show the current UI settings
    Show,

    /// Set the theme: dark, light, neon, or terminal
    Theme { name: Theme },

    /// Open or close the sidebar
    Sidebar { state: SidebarState },

    /// Follow the OS light/dark setting
    AutoSwitch { state: Toggle },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum SidebarState {
    Open,
    Closed,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

pub fn run(root: &Path, subcmd: SettingsSubcommand, json: bool) -> anyhow::Result<()> {
    let store = JsonFileStore::open(root);
    let mut settings = UiSettings::load(&store)?;

    let changed = match subcmd {
        SettingsSubcommand::Show => false,
        SettingsSubcommand::Theme { name } => {
            settings.theme = name;
            true
        }
        SettingsSubcommand::Sidebar { state } => {
            settings.sidebar_open = matches!(state, SidebarState::Open);
            true
        }
        SettingsSubcommand::AutoSwitch { state } => {
            settings.auto_switch = matches!(state, Toggle::On);
            true
        }
    };
    if changed {
        settings.save(&store)?;
    }

    if json {
        print_json(&settings)?;
    } else {
        println!("theme:        {}", settings.theme);
        println!("auto switch:  {}", settings.auto_switch);
        println!(
            "sidebar:      {}",
            if settings.sidebar_open { "open" } else { "closed" }
        );
    }
    Ok(())
}
