//! Command-line interface for the mdtts batch TTS dispatcher.
//!
//! This module provides the top-level CLI application structure and
//! subcommands for submitting a directory of Markdown files for speech
//! synthesis, resuming a partially-completed directory, and generating
//! shell completion scripts.
//!
//! # Architecture
//!
//! The CLI is built using `clap` and follows a subcommand pattern:
//! - `submit` - submit every eligible file in a directory as a new batch
//! - `continue` - resume a directory, submitting only files still missing audio
//! - `completions` - shell completion script generation
//!
//! # Examples
//!
//! ```bash
//! # Submit every markdown file in a directory
//! mdtts submit ./uploads/my-book --servers servers.json --voice zh-CN-XiaoxiaoNeural
//!
//! # Resume a directory after a partial run
//! mdtts continue ./uploads/my-book --servers servers.json --voice zh-CN-XiaoxiaoNeural
//! ```

mod continue_args;
mod generate_completion_args;
mod submit_args;
pub mod ui;

use clap::{Parser, Subcommand};
pub use continue_args::ContinueArgs;
pub use generate_completion_args::GenerateCompletionArgs;
pub use submit_args::SubmitArgs;
pub use ui::{create_progress_bar, print_error, print_success, print_warning};

/// Main CLI application structure defining the top-level interface.
#[derive(Parser, Debug)]
#[command(name = "mdtts")]
#[command(about = "Batch Markdown-to-speech dispatcher")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for the mdtts CLI application.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Submit every eligible `.md` file in a directory as a new batch
    Submit(SubmitArgs),

    /// Resume a directory, submitting only files still missing audio
    Continue(ContinueArgs),

    /// Generate shell completion scripts
    Completions(GenerateCompletionArgs),
}

/// Executes the mdtts CLI application with parsed arguments.
///
/// This is the main entry point for CLI execution, routing parsed
/// command-line arguments to their respective command handlers.
///
/// # Errors
///
/// Returns a [`crate::Result<()>`] that wraps any errors encountered
/// during command execution. Errors are propagated up to the main
/// function for proper exit code handling.
pub async fn run() -> crate::Result<()> {
    let config_service = std::sync::Arc::new(crate::config::ProductionConfigService::new()?);
    run_with_config(config_service.as_ref()).await
}

/// Run the CLI with a provided configuration service.
///
/// This function enables dependency injection of configuration services,
/// making it easier to test and providing better control over configuration
/// management.
///
/// # Errors
///
/// Returns an error if command execution fails.
pub async fn run_with_config(
    config_service: &dyn crate::config::ConfigService,
) -> crate::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Submit(args) => {
            crate::commands::submit_command::execute(args, config_service).await?;
        }
        Commands::Continue(args) => {
            crate::commands::continue_command::execute(args, config_service).await?;
        }
        Commands::Completions(args) => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            let cmd_name = cmd.get_name().to_string();
            let mut stdout = std::io::stdout();
            clap_complete::generate(args.shell, &mut cmd, cmd_name, &mut stdout);
        }
    }
    Ok(())
}
