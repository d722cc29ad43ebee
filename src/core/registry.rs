//! Batch Registry (C1): the sole source of truth for batch and task state.
//!
//! The registry owns every [`Batch`] and its [`Task`]s. All mutation is
//! serialized per batch behind an `RwLock`; readers always observe a
//! coherent snapshot of a single batch's fields.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;
use uuid::Uuid;

use crate::core::worker::WorkerStatusView;
use crate::error::{MdttsError, MdttsResult};

/// Opaque 128-bit batch identifier.
pub type BatchId = Uuid;

/// Stable task identifier: batch id plus source filename.
pub type TaskId = String;

/// Per-task lifecycle state.
///
/// `Processing -> AwaitingRetry -> Processing` may repeat until a terminal
/// cap is reached; all other transitions are monotonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Queued, not yet dispatched.
    Waiting,
    /// Currently paired with a worker and in flight.
    Processing,
    /// Settled with a transient failure; scheduled to re-enter `pending`/`retry`.
    AwaitingRetry,
    /// Terminal success.
    Completed,
    /// Terminal failure; retry caps exhausted or unrecoverable.
    Failed,
}

impl TaskState {
    /// Whether this state is terminal (no further transitions expected).
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }
}

/// Per-failure-class attempt counters for a single task.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AttemptCounters {
    /// Attempts classified as `general` failures.
    pub general_attempts: u32,
    /// Attempts classified as `rate_limited` failures.
    pub rate_limit_attempts: u32,
    /// Attempts classified as `timeout` failures.
    pub timeout_attempts: u32,
}

impl AttemptCounters {
    /// Total attempts across all failure classes.
    pub fn total(&self) -> u32 {
        self.general_attempts + self.rate_limit_attempts + self.timeout_attempts
    }
}

/// A single TTS job within a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Stable id: `{batch_id}:{filename}`.
    pub id: TaskId,
    /// Source filename (e.g. `report.md`).
    pub filename: String,
    /// Current lifecycle state.
    pub state: TaskState,
    /// Free-form, human-readable stage string for UI display.
    pub stage: String,
    /// Attempt counters keyed by failure class.
    pub attempts: AttemptCounters,
    /// Index into the batch's worker list the task last ran on, if any.
    pub last_worker_idx: Option<usize>,
}

impl Task {
    fn new(batch_id: BatchId, filename: &str) -> Self {
        Self {
            id: format!("{}:{}", batch_id, filename),
            filename: filename.to_string(),
            state: TaskState::Waiting,
            stage: "queued".to_string(),
            attempts: AttemptCounters::default(),
            last_worker_idx: None,
        }
    }
}

/// Patch applied to a task by the executor or dispatcher.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    /// New state, if changing.
    pub state: Option<TaskState>,
    /// New stage string, if changing.
    pub stage: Option<String>,
    /// Replacement attempt counters, if changing.
    pub attempts: Option<AttemptCounters>,
    /// Worker index the task was last paired with.
    pub last_worker_idx: Option<usize>,
}

/// Submission-time parameters for a batch, forwarded verbatim into every
/// task's upstream request payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchParams {
    /// Voice label, e.g. `zh-CN-XiaoxiaoNeural`.
    pub voice: String,
    /// Playback speed multiplier.
    pub speed: f32,
    /// Pitch parameter; passed through opaquely, semantics owned upstream.
    pub pitch: f32,
    /// Requested response audio format (e.g. `mp3`).
    pub response_format: String,
    /// Upstream-side text cleaning flags, forwarded verbatim.
    pub cleaning_options: CleaningOptions,
}

/// Upstream-side input sanitization flags (§6). Forwarded verbatim; the
/// dispatcher never inspects or acts on these itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningOptions {
    /// Strip Markdown syntax before synthesis.
    pub remove_markdown: bool,
    /// Strip emoji before synthesis.
    pub remove_emoji: bool,
    /// Strip URLs before synthesis.
    pub remove_urls: bool,
    /// Collapse line breaks before synthesis.
    pub remove_line_breaks: bool,
    /// Strip citation-style numeric markers before synthesis.
    pub remove_citation_numbers: bool,
}

impl Default for CleaningOptions {
    fn default() -> Self {
        Self {
            remove_markdown: true,
            remove_emoji: true,
            remove_urls: true,
            remove_line_breaks: true,
            remove_citation_numbers: true,
        }
    }
}

impl Default for BatchParams {
    fn default() -> Self {
        Self {
            voice: "zh-CN-XiaoxiaoNeural".to_string(),
            speed: 1.0,
            pitch: 1.0,
            response_format: "mp3".to_string(),
            cleaning_options: CleaningOptions::default(),
        }
    }
}

/// A batch: a set of TTS tasks plus submission configuration.
#[derive(Debug, Clone)]
pub struct Batch {
    /// Opaque id.
    pub id: BatchId,
    /// Submission parameters shared by every task in the batch.
    pub params: BatchParams,
    /// The upload directory this batch reads sources from / writes audio to.
    pub directory: PathBuf,
    /// Ordered task list; insertion order is the `pending` queue's initial order.
    pub tasks: Vec<Task>,
    /// Number of tasks that have reached a terminal state.
    pub completed: usize,
    /// Filename of the task currently (most recently) being processed, for UI display.
    pub current: Option<String>,
    /// Set when the dispatcher hits an unexpected, batch-wide fatal error.
    pub stopped_reason: Option<String>,
}

impl Batch {
    /// Total number of tasks in the batch.
    pub fn total(&self) -> usize {
        self.tasks.len()
    }
}

/// Read-only projection of a batch's progress, the shape returned to the
/// CLI / an external control plane.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressView {
    /// Batch id.
    pub batch_id: BatchId,
    /// Total task count.
    pub total_files: usize,
    /// Tasks that have reached a terminal state.
    pub completed_files: usize,
    /// Filename currently being processed, if any.
    pub current_file: Option<String>,
    /// Per-task status projection, keyed by task id.
    pub files: HashMap<TaskId, TaskView>,
    /// Set if the batch stopped due to a fatal dispatcher error.
    pub stopped_reason: Option<String>,
}

/// Per-task projection exposed through [`ProgressView`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskView {
    /// Source filename.
    pub filename: String,
    /// Current lifecycle state.
    pub status: TaskState,
    /// 0-100 percent-complete indicator (0 until terminal, 100 when terminal success).
    pub progress: u8,
    /// Free-form stage string.
    pub stage: String,
}

/// The Batch Registry: owns every live batch and its tasks.
#[derive(Default)]
pub struct Registry {
    batches: RwLock<HashMap<BatchId, Batch>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a batch from submission parameters and an ordered filename
    /// list. Returns the new batch's id.
    pub fn create_batch(
        &self,
        params: BatchParams,
        directory: PathBuf,
        filenames: &[String],
    ) -> BatchId {
        let id = Uuid::new_v4();
        let tasks = filenames.iter().map(|f| Task::new(id, f)).collect();
        let batch = Batch {
            id,
            params,
            directory,
            tasks,
            completed: 0,
            current: None,
            stopped_reason: None,
        };
        self.batches.write().unwrap().insert(id, batch);
        id
    }

    /// Append a single task to an existing batch (used by `continue`, which
    /// may discover additional eligible files after initial creation).
    pub fn add_task(&self, batch_id: BatchId, filename: &str) -> MdttsResult<()> {
        let mut batches = self.batches.write().unwrap();
        let batch = batches
            .get_mut(&batch_id)
            .ok_or_else(|| MdttsError::UnknownBatch(batch_id.to_string()))?;
        batch.tasks.push(Task::new(batch_id, filename));
        Ok(())
    }

    /// Apply a patch to a task, updating progress counters if the patch
    /// moves the task into a terminal state for the first time.
    pub fn update_task(
        &self,
        batch_id: BatchId,
        task_id: &str,
        patch: TaskPatch,
    ) -> MdttsResult<()> {
        let mut batches = self.batches.write().unwrap();
        let batch = batches
            .get_mut(&batch_id)
            .ok_or_else(|| MdttsError::UnknownBatch(batch_id.to_string()))?;
        let task = batch
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| MdttsError::validation(format!("unknown task: {}", task_id)))?;

        let was_terminal = task.state.is_terminal();
        if let Some(state) = patch.state {
            task.state = state;
        }
        if let Some(stage) = patch.stage {
            task.stage = stage;
        }
        if let Some(attempts) = patch.attempts {
            task.attempts = attempts;
        }
        if let Some(idx) = patch.last_worker_idx {
            task.last_worker_idx = Some(idx);
        }

        if !was_terminal && task.state.is_terminal() {
            batch.completed += 1;
        }
        batch.current = Some(task.filename.clone());
        Ok(())
    }

    /// Mark a batch as stopped due to an unexpected fatal error.
    pub fn mark_batch_fatal(&self, batch_id: BatchId, reason: &str) -> MdttsResult<()> {
        let mut batches = self.batches.write().unwrap();
        let batch = batches
            .get_mut(&batch_id)
            .ok_or_else(|| MdttsError::UnknownBatch(batch_id.to_string()))?;
        batch.stopped_reason = Some(reason.to_string());
        Ok(())
    }

    /// Project the current progress of a batch.
    pub fn snapshot(&self, batch_id: BatchId) -> MdttsResult<ProgressView> {
        let batches = self.batches.read().unwrap();
        let batch = batches
            .get(&batch_id)
            .ok_or_else(|| MdttsError::UnknownBatch(batch_id.to_string()))?;

        let files = batch
            .tasks
            .iter()
            .map(|t| {
                let progress = match t.state {
                    TaskState::Completed => 100,
                    TaskState::Failed => 100,
                    _ => 0,
                };
                (
                    t.id.clone(),
                    TaskView {
                        filename: t.filename.clone(),
                        status: t.state,
                        progress,
                        stage: t.stage.clone(),
                    },
                )
            })
            .collect();

        Ok(ProgressView {
            batch_id: batch.id,
            total_files: batch.total(),
            completed_files: batch.completed,
            current_file: batch.current.clone(),
            files,
            stopped_reason: batch.stopped_reason.clone(),
        })
    }

    /// Returns true once every task in the batch has reached a terminal state.
    pub fn is_finished(&self, batch_id: BatchId) -> MdttsResult<bool> {
        let batches = self.batches.read().unwrap();
        let batch = batches
            .get(&batch_id)
            .ok_or_else(|| MdttsError::UnknownBatch(batch_id.to_string()))?;
        Ok(batch.completed >= batch.total())
    }

    /// Ids of all tasks currently in the `Failed` state for a batch.
    pub fn find_failed(&self, batch_id: BatchId) -> MdttsResult<Vec<TaskId>> {
        let batches = self.batches.read().unwrap();
        let batch = batches
            .get(&batch_id)
            .ok_or_else(|| MdttsError::UnknownBatch(batch_id.to_string()))?;
        Ok(batch
            .tasks
            .iter()
            .filter(|t| t.state == TaskState::Failed)
            .map(|t| t.id.clone())
            .collect())
    }

    /// Clone of every task currently in `Waiting` state, in insertion order.
    pub fn waiting_tasks(&self, batch_id: BatchId) -> MdttsResult<Vec<Task>> {
        let batches = self.batches.read().unwrap();
        let batch = batches
            .get(&batch_id)
            .ok_or_else(|| MdttsError::UnknownBatch(batch_id.to_string()))?;
        Ok(batch
            .tasks
            .iter()
            .filter(|t| t.state == TaskState::Waiting)
            .cloned()
            .collect())
    }

    /// Read a task's current attempt counters and state.
    pub fn get_task(&self, batch_id: BatchId, task_id: &str) -> MdttsResult<Task> {
        let batches = self.batches.read().unwrap();
        let batch = batches
            .get(&batch_id)
            .ok_or_else(|| MdttsError::UnknownBatch(batch_id.to_string()))?;
        batch
            .tasks
            .iter()
            .find(|t| t.id == task_id)
            .cloned()
            .ok_or_else(|| MdttsError::validation(format!("unknown task: {}", task_id)))
    }

    /// Re-enqueue all Failed tasks of a batch back to `Waiting`, resetting
    /// their attempt counters. Returns the number of tasks re-queued.
    ///
    /// Realizes `/retry_failed`'s contract (§6): an error is surfaced by the
    /// caller when this returns 0.
    pub fn requeue_failed(&self, batch_id: BatchId) -> MdttsResult<Vec<TaskId>> {
        let mut batches = self.batches.write().unwrap();
        let batch = batches
            .get_mut(&batch_id)
            .ok_or_else(|| MdttsError::UnknownBatch(batch_id.to_string()))?;
        let mut requeued = Vec::new();
        for task in batch.tasks.iter_mut() {
            if task.state == TaskState::Failed {
                task.state = TaskState::Waiting;
                task.stage = "requeued".to_string();
                task.attempts = AttemptCounters::default();
                batch.completed = batch.completed.saturating_sub(1);
                requeued.push(task.id.clone());
            }
        }
        Ok(requeued)
    }

    /// Current per-worker status projection for a batch's worker pool.
    pub fn snapshot_servers(&self, statuses: Vec<WorkerStatusView>) -> Vec<WorkerStatusView> {
        statuses
    }
}
