//! Euphoriae CLI Application

mod preset;
mod render;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "euphoriae")]
#[command(about = "Offline host for the Euphoriae audio effects engine", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Push a WAV file through the engine and write the result
    Render(render::RenderArgs),

    /// Inspect and export effect presets
    Preset {
        #[command(subcommand)]
        action: PresetAction,
    },
}

#[derive(Subcommand)]
enum PresetAction {
    /// List factory presets and any saved in a directory
    List {
        /// Directory of saved `<name>.toml` presets
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Print a preset
    Show {
        /// Factory preset name, saved preset name, or path to a TOML file
        name: String,

        #[arg(long)]
        dir: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = Format::Toml)]
        format: Format,
    },

    /// Write a preset to a file
    Export {
        name: String,

        /// Destination file
        output: PathBuf,

        #[arg(long)]
        dir: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = Format::Toml)]
        format: Format,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Format {
    Toml,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "euphoriae_core=debug,euphoriae=debug,info"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Render(args) => render::run(args).await,
        Command::Preset { action } => match action {
            PresetAction::List { dir } => preset::list(dir).await,
            PresetAction::Show { name, dir, format } => preset::show(&name, dir, format).await,
            PresetAction::Export {
                name,
                output,
                dir,
                format,
            } => preset::export(&name, dir, &output, format).await,
        },
    }
}
