use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use podkit_core::UiKind;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "podkit", about = "Manage podkit extensions")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Settings file to read and update
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// User interface to evaluate extension availability for
    #[arg(long, global = true, value_enum, default_value_t = Ui::Cli)]
    ui: Ui,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Ui {
    Gtk,
    Cli,
    Web,
}

impl From<Ui> for UiKind {
    fn from(ui: Ui) -> Self {
        match ui {
            Ui::Gtk => UiKind::Gtk,
            Ui::Cli => UiKind::Cli,
            Ui::Web => UiKind::Web,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Manage extensions
    Extension(commands::extension::ExtensionArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let options = commands::extension::HostOptions {
        settings: cli
            .config
            .unwrap_or_else(commands::extension::default_settings),
        ui: cli.ui.into(),
    };

    match cli.command {
        Commands::Extension(args) => commands::extension::run(args, &options),
    }
}
