//! Task Executor (C4, §4.4): given a paired `(task, worker)`, reads the
//! source document, calls upstream, classifies the outcome, and produces
//! exactly one settlement event.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tokio::fs;

use crate::core::outcome::{classify_http, classify_transport_error, min_audio_size, Outcome};
use crate::core::registry::BatchParams;
use crate::services::tts_client::{SpeechResponse, TtsClient};

/// One settlement: the single terminal event per task execution.
pub struct Settlement {
    /// Task id that settled.
    pub task_id: String,
    /// Worker index the task ran on.
    pub worker_idx: usize,
    /// Classified outcome.
    pub outcome: Outcome,
    /// Wall-clock time spent on this attempt.
    pub elapsed: Duration,
}

/// Executes exactly one task attempt against one worker.
pub struct TaskExecutor {
    client: TtsClient,
}

impl TaskExecutor {
    /// Build an executor sharing the given HTTP client.
    pub fn new(client: TtsClient) -> Self {
        Self { client }
    }

    /// Run one attempt: read source, call upstream, validate and write
    /// audio, and return the settlement.
    pub async fn execute(
        &self,
        task_id: &str,
        worker_idx: usize,
        source_path: &Path,
        worker_url: &str,
        worker_api_key: &str,
        params: &BatchParams,
        audio: &crate::config::AudioConfig,
    ) -> Settlement {
        let start = Instant::now();
        let outcome = self
            .run(source_path, worker_url, worker_api_key, params, audio)
            .await;
        Settlement {
            task_id: task_id.to_string(),
            worker_idx,
            outcome,
            elapsed: start.elapsed(),
        }
    }

    async fn run(
        &self,
        source_path: &Path,
        worker_url: &str,
        worker_api_key: &str,
        params: &BatchParams,
        audio: &crate::config::AudioConfig,
    ) -> Outcome {
        let text = match fs::read_to_string(source_path).await {
            Ok(t) => t,
            Err(_) => return Outcome::SourceUnreadable,
        };

        let response = self
            .client
            .synthesize(worker_url, worker_api_key, &text, params)
            .await;

        match response {
            SpeechResponse::TransportError {
                is_timeout,
                detail_lower,
            } => classify_transport_error(is_timeout, &detail_lower),
            SpeechResponse::Responded { status, body } => {
                if status == 200 {
                    let required = min_audio_size(
                        text.chars().count(),
                        audio.min_size_bytes,
                        audio.min_bytes_per_char,
                    );
                    if (body.len() as u64) < required {
                        Outcome::AudioTooSmall
                    } else {
                        let output_path = output_path_for(source_path, &params.response_format);
                        match write_atomic(&output_path, &body).await {
                            Ok(()) => Outcome::Success,
                            Err(_) => Outcome::LocalIo,
                        }
                    }
                } else {
                    let body_lower = String::from_utf8_lossy(&body).to_lowercase();
                    classify_http(status, &body_lower)
                }
            }
        }
    }
}

/// Build the sibling output path for a source `.md` file: same stem, the
/// given extension (`response_format`, e.g. "mp3").
pub fn output_path_for(source_path: &Path, response_format: &str) -> PathBuf {
    source_path.with_extension(response_format)
}

/// Write `bytes` to `path` atomically: write to a sibling temp file, then
/// rename. Leaves no partial file behind on failure.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp_path = path.with_extension(format!(
        "{}.tmp",
        path.extension().and_then(|e| e.to_str()).unwrap_or("out")
    ));
    fs::write(&tmp_path, bytes).await?;
    fs::rename(&tmp_path, path).await?;
    Ok(())
}
