// Entrypoint for the CLI application.
// - Parses arguments, sets up logging and the interrupt watcher.
// - Runs one command and turns its failure into a distinct exit code.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ego_upload::api::{ApiClient, Registry};
use ego_upload::config::Settings;
use ego_upload::session::ShutdownHooks;
use ego_upload::ui::Terminal;
use ego_upload::{signal, telemetry, PublishError, Publisher, UploadOptions};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::Level;

#[derive(Parser)]
#[command(name = "ego-upload")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Publish GNOME Shell extensions to extensions.gnome.org", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload an extension to extensions.gnome.org
    Upload {
        /// The extension ZIP (default: dist/<uuid>.shell-extension.zip)
        artifact: Option<PathBuf>,

        /// Your e.g.o username (default: $EGO_USERNAME)
        #[arg(short, long)]
        username: Option<String>,

        /// Never prompt; fail if anything is missing
        #[arg(long)]
        no_interaction: bool,

        /// Confirmations saved earlier with confirm-upload
        #[arg(long)]
        confirmations: Option<PathBuf>,
    },

    /// Answer the upload prompts now and save the answers for a later upload
    ConfirmUpload {
        /// File to save the confirmations to
        target: PathBuf,
    },
}

fn run(cli: Cli) -> Result<()> {
    let hooks = ShutdownHooks::new();
    signal::watch_interrupts(hooks.clone()).context("Failed to install interrupt handler")?;

    let settings = Settings::from_env();
    let registry: Arc<dyn Registry> =
        Arc::new(ApiClient::new(&settings).context("Failed to build HTTP client")?);
    let project_dir = std::env::current_dir().context("Failed to get current directory")?;
    let terminal = Terminal::new();
    let publisher = Publisher::new(registry, &terminal, hooks, settings, project_dir);

    match cli.command {
        Commands::Upload {
            artifact,
            username,
            no_interaction,
            confirmations,
        } => {
            let published = publisher.upload(&UploadOptions {
                artifact,
                username,
                interactive: !no_interaction,
                confirmations,
            })?;
            println!("{}", published);
        }
        Commands::ConfirmUpload { target } => {
            publisher.confirm_upload(&target)?;
            println!("Saved confirmations to {}", target.display());
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    telemetry::init_tracing(cli.json, level);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = err
                .downcast_ref::<PublishError>()
                .map(|err| err.kind().exit_code())
                .unwrap_or(1);
            eprintln!("error: {:#}", err);
            ExitCode::from(code)
        }
    }
}
