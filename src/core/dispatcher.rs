//! Dispatcher (C3, §4.3): pairs ready tasks with ready workers under a
//! global concurrency cap, paces warm-up, and drains a batch to completion.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio::time::sleep;

use crate::config::Config;
use crate::core::controller::AdaptiveController;
use crate::core::executor::{output_path_for, TaskExecutor};
use crate::core::outcome::Outcome;
use crate::core::registry::{BatchId, BatchParams, Registry, TaskPatch, TaskState};
use crate::core::retry;
use crate::core::worker::{SettlementKind, UpstreamServer, WorkerPool};
use crate::error::{MdttsError, MdttsResult};
use crate::services::tts_client::TtsClient;

const PAIRING_IDLE_SLEEP: Duration = Duration::from_millis(100);
const WARMUP_MIN: usize = 10;

/// Computes the global concurrency cap `G = max(1, min(env_override, num_workers))`.
pub fn global_cap(env_override: usize, num_workers: usize) -> usize {
    let bound = if env_override > 0 {
        env_override.min(num_workers.max(1))
    } else {
        num_workers.max(1)
    };
    bound.max(1)
}

fn warmup_phases(total: usize, g: usize) -> (usize, usize) {
    let w1 = total.min(WARMUP_MIN.max(2 * g));
    let w2 = (total.saturating_sub(w1)).min(WARMUP_MIN.max(g));
    (w1, w2)
}

fn base_interval(dispatch_count: usize, w1: usize, w2: usize) -> Duration {
    if dispatch_count <= w1 {
        Duration::from_millis(1000)
    } else if dispatch_count <= w1 + w2 {
        Duration::from_millis(500)
    } else {
        Duration::from_millis(200)
    }
}

/// Drives one batch from its initial `Waiting` task set to completion.
pub struct Dispatcher {
    registry: Arc<Registry>,
    worker_pool: Arc<Mutex<WorkerPool>>,
    controller: Arc<Mutex<AdaptiveController>>,
    client: TtsClient,
    global_semaphore: Arc<Semaphore>,
    process_semaphore: Option<Arc<Semaphore>>,
    batch_id: BatchId,
    directory: PathBuf,
    params: BatchParams,
    audio: crate::config::AudioConfig,
}

impl Dispatcher {
    /// Build a dispatcher for a freshly created batch.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<Registry>,
        batch_id: BatchId,
        directory: PathBuf,
        params: BatchParams,
        servers: &[UpstreamServer],
        config: &Config,
        process_semaphore: Option<Arc<Semaphore>>,
    ) -> Self {
        let default_capacity = if config.dispatch.balancer_max_concurrency > 0 {
            config.dispatch.balancer_max_concurrency
        } else {
            servers.iter().filter(|s| s.enabled).count().max(1)
        };
        let worker_pool = WorkerPool::new(servers, default_capacity);
        let g = global_cap(config.dispatch.balancer_max_concurrency, worker_pool.len());

        Self {
            registry,
            worker_pool: Arc::new(Mutex::new(worker_pool)),
            controller: Arc::new(Mutex::new(AdaptiveController::new())),
            client: TtsClient::new(),
            global_semaphore: Arc::new(Semaphore::new(g)),
            process_semaphore,
            batch_id,
            directory,
            params,
            audio: config.audio.clone(),
        }
    }

    /// Run the dispatcher to completion: pairs tasks with workers until
    /// every task has reached a terminal state. Any unexpected error is a
    /// batch-local fatal: the batch is marked `stopped_reason` before the
    /// error is re-propagated, so callers can observe it via the registry
    /// snapshot even if they only hold a `JoinHandle`.
    pub async fn run(&self) -> MdttsResult<()> {
        let result = self.run_inner().await;
        if let Err(ref e) = result {
            let _ = self.registry.mark_batch_fatal(self.batch_id, &e.to_string());
        }
        result
    }

    async fn run_inner(&self) -> MdttsResult<()> {
        if self.worker_pool.lock().await.is_empty() {
            return Err(MdttsError::validation("no enabled upstream servers"));
        }

        let waiting = self.registry.waiting_tasks(self.batch_id)?;
        let total = waiting.len();
        let pending: Arc<Mutex<VecDeque<String>>> =
            Arc::new(Mutex::new(waiting.into_iter().map(|t| t.id).collect()));
        let retry_queue: Arc<Mutex<VecDeque<String>>> = Arc::new(Mutex::new(VecDeque::new()));

        let (settle_tx, mut settle_rx) = mpsc::channel::<crate::core::executor::Settlement>(256);

        let g = self.global_semaphore.available_permits();
        let (w1, w2) = warmup_phases(total, g);
        let mut dispatch_count = 0usize;

        let mut finished = 0usize;

        loop {
            if finished >= total {
                break;
            }

            // Drain any settled executions without blocking the pairing loop.
            while let Ok(settlement) = settle_rx.try_recv() {
                finished += self.settle(settlement, &retry_queue).await?;
            }
            if finished >= total {
                break;
            }

            let permit = match self.acquire_permits().await {
                Some(p) => p,
                None => {
                    if let Some(settlement) =
                        self.idle_wait(&mut settle_rx, PAIRING_IDLE_SLEEP).await
                    {
                        finished += self.settle(settlement, &retry_queue).await?;
                    }
                    continue;
                }
            };

            let worker_idx = { self.worker_pool.lock().await.pick_eligible() };
            let Some(worker_idx) = worker_idx else {
                drop(permit);
                if let Some(settlement) =
                    self.idle_wait(&mut settle_rx, PAIRING_IDLE_SLEEP).await
                {
                    finished += self.settle(settlement, &retry_queue).await?;
                }
                continue;
            };

            let task_id = {
                let mut retry_q = retry_queue.lock().await;
                if let Some(id) = retry_q.pop_front() {
                    Some(id)
                } else {
                    let mut pending_q = pending.lock().await;
                    pending_q.pop_front()
                }
            };

            let Some(task_id) = task_id else {
                drop(permit);
                if let Some(settlement) =
                    self.idle_wait(&mut settle_rx, PAIRING_IDLE_SLEEP).await
                {
                    finished += self.settle(settlement, &retry_queue).await?;
                }
                continue;
            };

            self.worker_pool.lock().await.acquire(worker_idx);
            self.registry.update_task(
                self.batch_id,
                &task_id,
                TaskPatch {
                    state: Some(TaskState::Processing),
                    stage: Some("processing".to_string()),
                    last_worker_idx: Some(worker_idx),
                    ..Default::default()
                },
            )?;

            dispatch_count += 1;
            self.spawn_execution(task_id, worker_idx, permit, settle_tx.clone());

            let base = base_interval(dispatch_count, w1, w2);
            let adaptive = self.controller.lock().await.interval();
            sleep(base.max(Duration::from_secs_f64(adaptive))).await;
        }

        // Drain any remaining settlements after the pairing loop exits.
        while finished < total {
            if let Some(settlement) = settle_rx.recv().await {
                finished += self.settle(settlement, &retry_queue).await?;
            } else {
                break;
            }
        }

        Ok(())
    }

    /// Current per-worker status projection, for CLI/UI summary output.
    pub async fn worker_snapshot(&self) -> Vec<crate::core::worker::WorkerStatusView> {
        self.worker_pool.lock().await.snapshot()
    }

    /// Wait for either a settlement to arrive or `timeout` to elapse,
    /// whichever comes first, so an idle pairing loop wakes promptly when
    /// an execution settles instead of always sleeping the full interval.
    async fn idle_wait(
        &self,
        settle_rx: &mut mpsc::Receiver<crate::core::executor::Settlement>,
        timeout: Duration,
    ) -> Option<crate::core::executor::Settlement> {
        use futures::future::{select, Either};

        match select(Box::pin(settle_rx.recv()), Box::pin(sleep(timeout))).await {
            Either::Left((settlement, _)) => settlement,
            Either::Right(((), _)) => None,
        }
    }

    async fn acquire_permits(&self) -> Option<GlobalPermit> {
        let global = Arc::clone(&self.global_semaphore).try_acquire_owned().ok()?;
        let process = match &self.process_semaphore {
            Some(sem) => match Arc::clone(sem).try_acquire_owned() {
                Ok(p) => Some(p),
                Err(_) => return None,
            },
            None => None,
        };
        Some(GlobalPermit {
            _global: global,
            _process: process,
        })
    }

    fn spawn_execution(
        &self,
        task_id: String,
        worker_idx: usize,
        permit: GlobalPermit,
        settle_tx: mpsc::Sender<crate::core::executor::Settlement>,
    ) {
        let registry = Arc::clone(&self.registry);
        let worker_pool = Arc::clone(&self.worker_pool);
        let executor_client = self.client.clone();
        let directory = self.directory.clone();
        let params = self.params.clone();
        let audio = self.audio.clone();
        let batch_id = self.batch_id;

        tokio::spawn(async move {
            let _permit = permit;
            let task = match registry.get_task(batch_id, &task_id) {
                Ok(t) => t,
                Err(_) => return,
            };
            let (url, api_key) = {
                let pool = worker_pool.lock().await;
                let w = pool.worker(worker_idx);
                (w.url.clone(), w.api_key.clone())
            };
            let source_path = directory.join(&task.filename);

            let executor = TaskExecutor::new(executor_client);
            let settlement = executor
                .execute(&task_id, worker_idx, &source_path, &url, &api_key, &params, &audio)
                .await;

            let _ = settle_tx.send(settlement).await;
        });
    }

    /// Apply a settlement to the registry, worker pool, and retry policy.
    /// Returns 1 if the task reached a terminal state this call, else 0.
    async fn settle(
        &self,
        settlement: crate::core::executor::Settlement,
        retry_queue: &Arc<Mutex<VecDeque<String>>>,
    ) -> MdttsResult<usize> {
        let crate::core::executor::Settlement {
            task_id,
            worker_idx,
            outcome,
            elapsed: _,
        } = settlement;

        let kind = match outcome {
            Outcome::Success => SettlementKind::Success,
            Outcome::Timeout => SettlementKind::Timeout,
            _ => SettlementKind::Failure,
        };
        self.worker_pool.lock().await.release(worker_idx, kind);
        self.controller.lock().await.record(outcome.is_success());

        if outcome.is_success() {
            self.registry.update_task(
                self.batch_id,
                &task_id,
                TaskPatch {
                    state: Some(TaskState::Completed),
                    stage: Some("completed".to_string()),
                    ..Default::default()
                },
            )?;
            return Ok(1);
        }

        if matches!(outcome, Outcome::AudioTooSmall) {
            let task = self.registry.get_task(self.batch_id, &task_id)?;
            let source_path = self.directory.join(&task.filename);
            let output_path = output_path_for(&source_path, &self.params.response_format);
            let _ = tokio::fs::remove_file(&output_path).await;
        }

        if outcome.is_terminal() {
            self.registry.update_task(
                self.batch_id,
                &task_id,
                TaskPatch {
                    state: Some(TaskState::Failed),
                    stage: Some(format!("failed: {:?}", outcome)),
                    ..Default::default()
                },
            )?;
            return Ok(1);
        }

        let task = self.registry.get_task(self.batch_id, &task_id)?;
        let class = outcome.failure_class().expect("non-success outcome has a failure class");
        let new_counters = retry::increment(class, task.attempts);
        let n = retry::attempts_for(class, &new_counters);

        if retry::cap_reached(class, n) {
            self.registry.update_task(
                self.batch_id,
                &task_id,
                TaskPatch {
                    state: Some(TaskState::Failed),
                    stage: Some(format!("failed: {:?}", outcome)),
                    attempts: Some(new_counters),
                    ..Default::default()
                },
            )?;
            return Ok(1);
        }

        self.registry.update_task(
            self.batch_id,
            &task_id,
            TaskPatch {
                state: Some(TaskState::AwaitingRetry),
                stage: Some(format!("retrying ({:?})", outcome)),
                attempts: Some(new_counters),
                ..Default::default()
            },
        )?;

        let delay = retry::backoff(class, n);
        let retry_queue = Arc::clone(retry_queue);
        let registry = Arc::clone(&self.registry);
        let batch_id = self.batch_id;
        let task_id_for_timer = task_id.clone();
        tokio::spawn(async move {
            sleep(delay).await;
            let _ = registry.update_task(
                batch_id,
                &task_id_for_timer,
                TaskPatch {
                    state: Some(TaskState::Processing),
                    stage: Some("re-queued".to_string()),
                    ..Default::default()
                },
            );
            retry_queue.lock().await.push_back(task_id_for_timer);
        });

        Ok(0)
    }
}

/// Holds the permits acquired for one in-flight execution; dropping it
/// releases both the global and (if enabled) process-wide semaphores.
struct GlobalPermit {
    _global: tokio::sync::OwnedSemaphorePermit,
    _process: Option<tokio::sync::OwnedSemaphorePermit>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_cap_uses_env_override_when_smaller() {
        assert_eq!(global_cap(2, 5), 2);
    }

    #[test]
    fn global_cap_falls_back_to_worker_count() {
        assert_eq!(global_cap(0, 3), 3);
    }

    #[test]
    fn global_cap_is_never_zero() {
        assert_eq!(global_cap(0, 0), 1);
    }

    #[test]
    fn warmup_phases_match_the_spec_formula() {
        // W1 = min(total, max(10, 2G)), W2 = min(total - W1, max(10, G))
        let (w1, w2) = warmup_phases(100, 2);
        assert_eq!(w1, 10);
        assert_eq!(w2, 10);

        let (w1, w2) = warmup_phases(5, 2);
        assert_eq!(w1, 5);
        assert_eq!(w2, 0);
    }

    #[test]
    fn base_interval_follows_the_three_phases() {
        let (w1, w2) = (10, 10);
        assert_eq!(base_interval(1, w1, w2), Duration::from_millis(1000));
        assert_eq!(base_interval(15, w1, w2), Duration::from_millis(500));
        assert_eq!(base_interval(25, w1, w2), Duration::from_millis(200));
    }
}
