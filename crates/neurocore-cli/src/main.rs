mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    actions::ActionsSubcommand, config::ConfigSubcommand, prefs::PrefsSubcommand,
    settings::SettingsSubcommand,
};
use neurocore_core::metrics::MetricsKind;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "neurocore",
    about = "Run and track Windows gaming optimizations from a fixed action catalog",
    version,
    propagate_version = true
)]
struct Cli {
    /// Directory holding .neurocore/ (default: auto-detect upward from cwd)
    #[arg(long, global = true, env = "NEUROCORE_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse the action catalog
    Actions {
        #[command(subcommand)]
        subcommand: ActionsSubcommand,
    },

    /// Run one or more actions concurrently
    Run {
        /// Action ids
        #[arg(required = true)]
        ids: Vec<String>,

        /// Treat a failed action as an error instead of a failed result
        #[arg(long)]
        strict: bool,
    },

    /// Show action statuses (live state is only kept by `serve`)
    ///
    /// Statuses are tracked per process. Outside `neurocore serve` every
    /// action reads `pending`; query GET /api/status on a running server for
    /// live state.
    Status {
        /// Single action id (omit for all)
        id: Option<String>,
    },

    /// Sample system metrics
    Metrics {
        /// Number of samples to take
        #[arg(long, default_value = "1")]
        samples: u32,

        /// Override the configured source: mock or live
        #[arg(long)]
        source: Option<MetricsKind>,
    },

    /// Read and write stored preferences
    Prefs {
        #[command(subcommand)]
        subcommand: PrefsSubcommand,
    },

    /// Show or change UI settings
    Settings {
        #[command(subcommand)]
        subcommand: SettingsSubcommand,
    },

    /// Create, show, or validate .neurocore/config.yaml
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Serve the HTTP API
    Serve {
        /// Port to listen on (default: server.port from config; 0 = OS-assigned)
        #[arg(long)]
        port: Option<u16>,

        /// Don't open a browser
        #[arg(long)]
        no_open: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Actions { subcommand } => cmd::actions::run(&root, subcommand, cli.json),
        Commands::Run { ids, strict } => cmd::run::run(&root, &ids, strict, cli.json),
        Commands::Status { id } => cmd::status::run(&root, id.as_deref(), cli.json),
        Commands::Metrics { samples, source } => {
            cmd::metrics::run(&root, samples, source, cli.json)
        }
        Commands::Prefs { subcommand } => cmd::prefs::run(&root, subcommand, cli.json),
        Commands::Settings { subcommand } => cmd::settings::run(&root, subcommand, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
        Commands::Serve { port, no_open } => cmd::serve::run(&root, port, no_open),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
