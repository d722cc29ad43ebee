// src/commands/submit_command.rs
//! `mdtts submit`: scan a directory for eligible Markdown files, build a
//! batch over every one of them, and run it to completion.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tabled::Tabled;
use tokio::sync::Semaphore;

use crate::cli::{create_progress_bar, print_success, print_warning, SubmitArgs};
use crate::config::ConfigService;
use crate::core::dispatcher::Dispatcher;
use crate::core::registry::{BatchParams, CleaningOptions, Registry};
use crate::core::worker::{UpstreamServer, WorkerStatus, WorkerStatusView};
use crate::error::MdttsError;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Execute `mdtts submit`.
pub async fn execute(args: SubmitArgs, config_service: &dyn ConfigService) -> crate::Result<()> {
    let config = config_service.get_config()?;
    let servers = load_servers(&args.servers)?;
    let filenames = eligible_markdown_files(&args.directory, &args.response_format)?;

    if filenames.is_empty() {
        print_warning("no eligible .md files found in the given directory");
        return Ok(());
    }

    let params = BatchParams {
        voice: args.voice.clone(),
        speed: args.speed,
        pitch: args.pitch,
        response_format: args.response_format.clone(),
        cleaning_options: CleaningOptions::default(),
    };

    run_batch(&args.directory, &servers, params, &config, args.concurrency, filenames).await
}

/// Shared by `submit` and `continue`: create a batch over `filenames`, run
/// the dispatcher to completion with a progress bar, and print the
/// per-worker summary table.
pub(super) async fn run_batch(
    directory: &Path,
    servers: &[UpstreamServer],
    params: BatchParams,
    config: &crate::config::Config,
    concurrency_override: usize,
    filenames: Vec<String>,
) -> crate::Result<()> {
    if !servers.iter().any(|s| s.enabled) {
        return Err(MdttsError::validation("no enabled upstream servers in --servers file"));
    }

    let registry = Arc::new(Registry::new());
    let total = filenames.len() as u64;
    let batch_id = registry.create_batch(params.clone(), directory.to_path_buf(), &filenames);

    let mut effective_config = config.clone();
    if concurrency_override > 0 {
        effective_config.dispatch.balancer_max_concurrency = concurrency_override;
    }
    let process_semaphore = if config.dispatch.global_concurrency_limit > 0 {
        Some(Arc::new(Semaphore::new(config.dispatch.global_concurrency_limit)))
    } else {
        None
    };

    let dispatcher = Arc::new(Dispatcher::new(
        Arc::clone(&registry),
        batch_id,
        directory.to_path_buf(),
        params,
        servers,
        &effective_config,
        process_semaphore,
    ));

    let pb = create_progress_bar(total);
    let run_registry = Arc::clone(&registry);
    let run_dispatcher = Arc::clone(&dispatcher);
    let run_handle = tokio::spawn(async move { run_dispatcher.run().await });

    loop {
        let snapshot = run_registry.snapshot(batch_id)?;
        pb.set_position(snapshot.completed_files as u64);
        if let Some(current) = &snapshot.current_file {
            pb.set_message(current.clone());
        }
        if snapshot.completed_files >= snapshot.total_files {
            break;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
    pb.finish_and_clear();

    run_handle
        .await
        .map_err(|e| MdttsError::batch_fatal(batch_id.to_string(), e.to_string()))??;

    print_summary(&dispatcher.worker_snapshot().await);

    let final_view = registry.snapshot(batch_id)?;
    if let Some(reason) = final_view.stopped_reason {
        return Err(MdttsError::batch_fatal(batch_id.to_string(), reason));
    }

    print_success(&format!(
        "batch {} finished: {}/{} files completed",
        batch_id, final_view.completed_files, final_view.total_files
    ));
    Ok(())
}

#[derive(Tabled)]
struct WorkerRow {
    #[tabled(rename = "worker")]
    name: String,
    status: String,
    #[tabled(rename = "in-flight")]
    in_flight: String,
    completed: u64,
    failed: u64,
    timeouts: u64,
}

fn print_summary(workers: &[WorkerStatusView]) {
    let rows: Vec<WorkerRow> = workers
        .iter()
        .map(|w| WorkerRow {
            name: w.name.clone(),
            status: status_label(w.status).to_string(),
            in_flight: format!("{}/{}", w.in_flight, w.capacity),
            completed: w.completed,
            failed: w.failed,
            timeouts: w.timeouts,
        })
        .collect();
    println!("{}", tabled::Table::new(rows));
}

fn status_label(status: WorkerStatus) -> &'static str {
    match status {
        WorkerStatus::Idle => "idle",
        WorkerStatus::Busy => "busy",
        WorkerStatus::Full => "full",
        WorkerStatus::Error => "error",
    }
}

/// Parse a `--servers` JSON file into an upstream server list.
pub(super) fn load_servers(path: &Path) -> crate::Result<Vec<UpstreamServer>> {
    let raw = std::fs::read_to_string(path)?;
    let servers: Vec<UpstreamServer> = serde_json::from_str(&raw)?;
    Ok(servers)
}

/// List `.md` files directly under `directory` that have no sibling file
/// with the given `response_format` extension.
pub(super) fn eligible_markdown_files(
    directory: &Path,
    response_format: &str,
) -> crate::Result<Vec<String>> {
    if !directory.is_dir() {
        return Err(MdttsError::validation(format!(
            "not a directory: {}",
            directory.display()
        )));
    }

    let mut filenames = Vec::new();
    for entry in walkdir::WalkDir::new(directory).min_depth(1).max_depth(1) {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("md") {
            continue;
        }
        let sibling: PathBuf = path.with_extension(response_format);
        if !sibling.exists() {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                filenames.push(name.to_string());
            }
        }
    }
    filenames.sort();
    Ok(filenames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn eligible_files_skip_ones_with_existing_output() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.md"), "hello").unwrap();
        std::fs::write(dir.path().join("b.md"), "world").unwrap();
        std::fs::write(dir.path().join("b.mp3"), "fake audio").unwrap();

        let files = eligible_markdown_files(dir.path(), "mp3").unwrap();
        assert_eq!(files, vec!["a.md".to_string()]);
    }

    #[test]
    fn eligible_files_errors_on_missing_directory() {
        let result = eligible_markdown_files(Path::new("/no/such/directory"), "mp3");
        assert!(result.is_err());
    }

    #[test]
    fn load_servers_parses_json_array() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("servers.json");
        std::fs::write(
            &path,
            r#"[{"name":"s1","url":"http://tts1","api_key":"k","enabled":true,"concurrency":null}]"#,
        )
        .unwrap();
        let servers = load_servers(&path).unwrap();
        assert_eq!(servers.len(), 1);
        assert_eq!(servers[0].name, "s1");
    }
}
