// src/commands/continue_command.rs
//! `mdtts continue`: resume a directory, submitting only files still
//! missing a sibling audio output. Idempotent: an already-finished
//! directory prints "nothing to do" and exits successfully.

use crate::cli::{print_success, ContinueArgs};
use crate::commands::submit_command::{eligible_markdown_files, load_servers, run_batch};
use crate::config::ConfigService;
use crate::core::registry::{BatchParams, CleaningOptions};

/// Execute `mdtts continue`.
pub async fn execute(args: ContinueArgs, config_service: &dyn ConfigService) -> crate::Result<()> {
    let config = config_service.get_config()?;
    let servers = load_servers(&args.servers)?;
    let filenames = eligible_markdown_files(&args.directory, &args.response_format)?;

    if filenames.is_empty() {
        print_success("nothing to do: every .md file already has its audio output");
        return Ok(());
    }

    let params = BatchParams {
        voice: args.voice.clone(),
        speed: args.speed,
        pitch: args.pitch,
        response_format: args.response_format.clone(),
        cleaning_options: CleaningOptions::default(),
    };

    run_batch(
        &args.directory,
        &servers,
        params,
        &config,
        args.concurrency,
        filenames,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TestConfigService;
    use tempfile::tempdir;

    #[tokio::test]
    async fn continue_on_a_fully_finished_directory_is_a_noop() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.md"), "hello").unwrap();
        std::fs::write(dir.path().join("a.mp3"), "fake audio").unwrap();

        let servers_path = dir.path().join("servers.json");
        std::fs::write(&servers_path, "[]").unwrap();

        let args = ContinueArgs {
            directory: dir.path().to_path_buf(),
            servers: servers_path,
            voice: "zh-CN-XiaoxiaoNeural".to_string(),
            speed: 1.0,
            pitch: 1.0,
            response_format: "mp3".to_string(),
            concurrency: 0,
        };
        let config_service = TestConfigService::with_defaults();

        let result = execute(args, &config_service).await;
        assert!(result.is_ok());
    }
}
