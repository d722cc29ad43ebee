use crate::{cli::Commands, config::ConfigService, Result};
use std::sync::Arc;

/// Central command dispatcher to avoid code duplication.
///
/// This module provides a unified way to dispatch commands, eliminating
/// duplication between the CLI entry point and any future embedding of this
/// crate as a library.
///
/// # Examples
///
/// ```rust
/// use mdtts_cli::commands::dispatcher::dispatch_command;
/// use mdtts_cli::cli::{Commands, ContinueArgs};
/// use mdtts_cli::config::TestConfigService;
/// use std::sync::Arc;
/// use std::path::PathBuf;
///
/// # async fn example() -> mdtts_cli::Result<()> {
/// let config_service = Arc::new(TestConfigService::with_defaults());
/// let args = ContinueArgs {
///     directory: PathBuf::from("/tmp/does-not-exist"),
///     servers: PathBuf::from("/tmp/servers.json"),
///     voice: "zh-CN-XiaoxiaoNeural".to_string(),
///     speed: 1.0,
///     pitch: 1.0,
///     response_format: "mp3".to_string(),
///     concurrency: 0,
/// };
///
/// let _ = dispatch_command(Commands::Continue(args), config_service).await;
/// # Ok(())
/// # }
/// ```
pub async fn dispatch_command(command: Commands, config_service: Arc<dyn ConfigService>) -> Result<()> {
    dispatch_command_with_ref(command, config_service.as_ref()).await
}

/// Dispatch a command with a borrowed config service reference.
///
/// This version is used by the CLI interface, which holds a borrowed
/// reference to the configuration service rather than an owned `Arc`.
pub async fn dispatch_command_with_ref(
    command: Commands,
    config_service: &dyn ConfigService,
) -> Result<()> {
    match command {
        Commands::Submit(args) => crate::commands::submit_command::execute(args, config_service).await,
        Commands::Continue(args) => {
            crate::commands::continue_command::execute(args, config_service).await
        }
        Commands::Completions(args) => {
            let mut cmd = <crate::cli::Cli as clap::CommandFactory>::command();
            let cmd_name = cmd.get_name().to_string();
            let mut stdout = std::io::stdout();
            clap_complete::generate(args.shell, &mut cmd, cmd_name, &mut stdout);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ContinueArgs;
    use crate::config::TestConfigService;
    use std::path::PathBuf;

    #[tokio::test]
    async fn dispatch_continue_on_empty_directory_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let servers_path = dir.path().join("servers.json");
        std::fs::write(&servers_path, "[]").unwrap();

        let config_service = Arc::new(TestConfigService::with_defaults());
        let args = ContinueArgs {
            directory: dir.path().to_path_buf(),
            servers: servers_path,
            voice: "zh-CN-XiaoxiaoNeural".to_string(),
            speed: 1.0,
            pitch: 1.0,
            response_format: "mp3".to_string(),
            concurrency: 0,
        };

        let result = dispatch_command(Commands::Continue(args), config_service).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn dispatch_submit_rejects_missing_directory() {
        let config_service = Arc::new(TestConfigService::with_defaults());
        let args = crate::cli::SubmitArgs {
            directory: PathBuf::from("/no/such/directory"),
            servers: PathBuf::from("/no/such/servers.json"),
            voice: "zh-CN-XiaoxiaoNeural".to_string(),
            speed: 1.0,
            pitch: 1.0,
            response_format: "mp3".to_string(),
            concurrency: 0,
        };

        let result = dispatch_command(Commands::Submit(args), config_service).await;
        assert!(result.is_err());
    }
}
