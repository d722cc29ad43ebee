//! Worker Pool (C2): one logical worker per upstream TTS server.
//!
//! Selection priority is grounded on the original load balancer's
//! `select_best_server`: prefer a never-used worker, then lower in-flight
//! count, then fewer lifetime uses, then lower failure rate, then
//! least-recently-used — with a rotating cursor to break ties so
//! later-indexed workers are never starved.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Configuration record for one upstream TTS server, received from the
/// submitter. Immutable within a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamServer {
    /// Display name.
    pub name: String,
    /// Base URL, e.g. `http://tts1.example.com`.
    pub url: String,
    /// Bearer API key.
    pub api_key: String,
    /// Whether this server participates in dispatch.
    pub enabled: bool,
    /// Optional per-server capacity override.
    pub concurrency: Option<usize>,
}

/// Observable worker health/load projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    /// Never used, or used and currently quiet with no recent failures.
    Idle,
    /// Has in-flight requests, below capacity.
    Busy,
    /// In-flight count equals capacity.
    Full,
    /// In cooldown or circuit-open following failures.
    Error,
}

const COOLDOWN_SECS: u64 = 10;
const CIRCUIT_OPEN_SECS: u64 = 60;
const CIRCUIT_OPEN_THRESHOLD: u32 = 3;

/// One upstream server's scheduler-side state.
#[derive(Debug)]
pub struct Worker {
    /// Index into the batch's worker list.
    pub index: usize,
    /// Display name.
    pub name: String,
    /// Base URL.
    pub url: String,
    /// Bearer API key.
    pub api_key: String,
    /// Max concurrent in-flight requests.
    pub capacity: usize,
    /// Current in-flight count.
    pub in_flight: usize,
    /// Cumulative completed count.
    pub completed: u64,
    /// Cumulative failed count.
    pub failed: u64,
    /// Cumulative timeout count.
    pub timeouts: u64,
    /// Cumulative service time across all completed requests.
    pub total_service_time: Duration,
    /// Consecutive failures since the last success.
    pub consecutive_failures: u32,
    /// Timestamp after which this worker is eligible again.
    pub cooldown_until: Instant,
    /// Lifetime uses (acquisitions), used for "fewer lifetime uses" tie-breaking.
    pub lifetime_uses: u64,
    /// Timestamp of the last acquisition, used for least-recently-used tie-breaking.
    pub last_used: Option<Instant>,
}

impl Worker {
    /// Build a worker from an [`UpstreamServer`] record and a default
    /// capacity (the dispatcher's concurrency, unless overridden per-server).
    pub fn from_server(index: usize, server: &UpstreamServer, default_capacity: usize) -> Self {
        Self {
            index,
            name: server.name.clone(),
            url: server.url.clone(),
            api_key: server.api_key.clone(),
            capacity: server.concurrency.unwrap_or(default_capacity).max(1),
            in_flight: 0,
            completed: 0,
            failed: 0,
            timeouts: 0,
            total_service_time: Duration::ZERO,
            consecutive_failures: 0,
            cooldown_until: Instant::now(),
            lifetime_uses: 0,
            last_used: None,
        }
    }

    /// Eligible iff below capacity and cooldown has elapsed.
    pub fn is_eligible(&self, now: Instant) -> bool {
        self.in_flight < self.capacity && now >= self.cooldown_until
    }

    fn failure_rate(&self) -> f64 {
        let total = self.completed + self.failed;
        if total == 0 {
            0.0
        } else {
            self.failed as f64 / total as f64
        }
    }

    /// Current observable status projection.
    pub fn status(&self, now: Instant) -> WorkerStatus {
        if now < self.cooldown_until {
            WorkerStatus::Error
        } else if self.in_flight >= self.capacity {
            WorkerStatus::Full
        } else if self.in_flight > 0 {
            WorkerStatus::Busy
        } else {
            WorkerStatus::Idle
        }
    }

    fn view(&self, now: Instant) -> WorkerStatusView {
        WorkerStatusView {
            index: self.index,
            name: self.name.clone(),
            status: self.status(now),
            in_flight: self.in_flight,
            capacity: self.capacity,
            completed: self.completed,
            failed: self.failed,
            timeouts: self.timeouts,
            consecutive_failures: self.consecutive_failures,
        }
    }
}

/// Serializable worker status projection exposed to the CLI / control plane.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerStatusView {
    /// Worker index.
    pub index: usize,
    /// Display name.
    pub name: String,
    /// Observable health/load status.
    pub status: WorkerStatus,
    /// Current in-flight count.
    pub in_flight: usize,
    /// Max concurrent in-flight requests.
    pub capacity: usize,
    /// Cumulative completed count.
    pub completed: u64,
    /// Cumulative failed count.
    pub failed: u64,
    /// Cumulative timeout count.
    pub timeouts: u64,
    /// Consecutive failures since the last success.
    pub consecutive_failures: u32,
}

/// Settlement outcome, as reported to the worker pool by the task executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementKind {
    /// Request succeeded.
    Success,
    /// Request failed and was classified as a timeout.
    Timeout,
    /// Request failed for any other reason (rate-limit, network, bad audio, etc).
    Failure,
}

/// Pool of workers for a single batch.
pub struct WorkerPool {
    workers: Vec<Worker>,
    cursor: usize,
}

impl WorkerPool {
    /// Build a pool from the batch's enabled servers.
    pub fn new(servers: &[UpstreamServer], default_capacity: usize) -> Self {
        let workers = servers
            .iter()
            .enumerate()
            .filter(|(_, s)| s.enabled)
            .map(|(i, s)| Worker::from_server(i, s, default_capacity))
            .collect();
        Self { workers, cursor: 0 }
    }

    /// Number of workers in the pool.
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    /// Whether the pool has no workers.
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Pick any eligible worker, preferring (never-used, lower in-flight,
    /// fewer lifetime uses, lower failure rate, least-recently-used), with a
    /// rotating cursor to break remaining ties.
    pub fn pick_eligible(&mut self) -> Option<usize> {
        let now = Instant::now();
        let n = self.workers.len();
        if n == 0 {
            return None;
        }

        let mut best: Option<usize> = None;
        for offset in 0..n {
            let idx = (self.cursor + offset) % n;
            let w = &self.workers[idx];
            if !w.is_eligible(now) {
                continue;
            }
            best = Some(match best {
                None => idx,
                Some(current) => {
                    if Self::better(w, &self.workers[current]) {
                        idx
                    } else {
                        current
                    }
                }
            });
        }

        if let Some(idx) = best {
            self.cursor = (idx + 1) % n;
        }
        best
    }

    fn better(a: &Worker, b: &Worker) -> bool {
        let a_used = a.lifetime_uses > 0;
        let b_used = b.lifetime_uses > 0;
        if a_used != b_used {
            return !a_used; // never-used wins
        }
        if a.in_flight != b.in_flight {
            return a.in_flight < b.in_flight;
        }
        if a.lifetime_uses != b.lifetime_uses {
            return a.lifetime_uses < b.lifetime_uses;
        }
        let a_rate = a.failure_rate();
        let b_rate = b.failure_rate();
        if (a_rate - b_rate).abs() > f64::EPSILON {
            return a_rate < b_rate;
        }
        match (a.last_used, b.last_used) {
            (None, Some(_)) => true,
            (Some(_), None) => false,
            (Some(a_t), Some(b_t)) => a_t < b_t,
            (None, None) => false,
        }
    }

    /// Acquire a worker: increment in-flight and lifetime counters.
    pub fn acquire(&mut self, idx: usize) {
        let now = Instant::now();
        let w = &mut self.workers[idx];
        w.in_flight += 1;
        w.lifetime_uses += 1;
        w.last_used = Some(now);
    }

    /// Release a worker after settlement, applying the cooldown policy.
    pub fn release(&mut self, idx: usize, outcome: SettlementKind) {
        let now = Instant::now();
        let w = &mut self.workers[idx];
        w.in_flight = w.in_flight.saturating_sub(1);

        match outcome {
            SettlementKind::Success => {
                w.completed += 1;
                w.consecutive_failures = 0;
                w.cooldown_until = now;
            }
            SettlementKind::Timeout | SettlementKind::Failure => {
                w.failed += 1;
                if outcome == SettlementKind::Timeout {
                    w.timeouts += 1;
                }
                w.consecutive_failures += 1;
                let cooldown = if w.consecutive_failures >= CIRCUIT_OPEN_THRESHOLD {
                    Duration::from_secs(CIRCUIT_OPEN_SECS)
                } else {
                    Duration::from_secs(COOLDOWN_SECS)
                };
                w.cooldown_until = now + cooldown;
            }
        }
    }

    /// Current status projection for every worker.
    pub fn snapshot(&self) -> Vec<WorkerStatusView> {
        let now = Instant::now();
        self.workers.iter().map(|w| w.view(now)).collect()
    }

    /// Borrow a worker's URL/API key for request assembly.
    pub fn worker(&self, idx: usize) -> &Worker {
        &self.workers[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(name: &str) -> UpstreamServer {
        UpstreamServer {
            name: name.to_string(),
            url: format!("http://{}", name),
            api_key: "k".to_string(),
            enabled: true,
            concurrency: None,
        }
    }

    #[test]
    fn pick_eligible_prefers_never_used() {
        let mut pool = WorkerPool::new(&[server("s1"), server("s2")], 2);
        let idx = pool.pick_eligible().unwrap();
        pool.acquire(idx);
        pool.release(idx, SettlementKind::Success);

        // s1 has now been used once; s2 is still never-used and should win.
        let next = pool.pick_eligible().unwrap();
        assert_ne!(next, idx);
    }

    #[test]
    fn release_failure_sets_ten_second_cooldown() {
        let mut pool = WorkerPool::new(&[server("s1")], 1);
        let idx = pool.pick_eligible().unwrap();
        pool.acquire(idx);
        pool.release(idx, SettlementKind::Failure);
        assert!(!pool.worker(idx).is_eligible(Instant::now()));
        assert!(pool.worker(idx).is_eligible(Instant::now() + Duration::from_secs(11)));
    }

    #[test]
    fn three_consecutive_failures_open_circuit_for_sixty_seconds() {
        let mut pool = WorkerPool::new(&[server("s1"), server("s2")], 1);
        for _ in 0..3 {
            pool.acquire(0);
            pool.release(0, SettlementKind::Failure);
        }
        assert_eq!(pool.worker(0).consecutive_failures, 3);
        assert!(!pool.worker(0).is_eligible(Instant::now() + Duration::from_secs(11)));
        assert!(pool.worker(0).is_eligible(Instant::now() + Duration::from_secs(61)));
    }

    #[test]
    fn success_resets_consecutive_failures_and_clears_cooldown() {
        let mut pool = WorkerPool::new(&[server("s1")], 1);
        pool.acquire(0);
        pool.release(0, SettlementKind::Failure);
        pool.acquire(0);
        pool.release(0, SettlementKind::Success);
        assert_eq!(pool.worker(0).consecutive_failures, 0);
        assert!(pool.worker(0).is_eligible(Instant::now()));
    }

    #[test]
    fn in_flight_never_exceeds_capacity_accounting() {
        let mut pool = WorkerPool::new(&[server("s1")], 2);
        pool.acquire(0);
        pool.acquire(0);
        assert_eq!(pool.worker(0).in_flight, 2);
        assert!(!pool.worker(0).is_eligible(Instant::now()));
        pool.release(0, SettlementKind::Success);
        assert!(pool.worker(0).is_eligible(Instant::now()));
    }

    #[test]
    fn disabled_servers_are_excluded_from_the_pool() {
        let mut disabled = server("s2");
        disabled.enabled = false;
        let pool = WorkerPool::new(&[server("s1"), disabled], 1);
        assert_eq!(pool.len(), 1);
    }
}
