//! Adaptive Controller (part of C5, §4.5): a sliding window of recent
//! outcomes that modulates the dispatcher's pacing interval.

use std::collections::VecDeque;

const WINDOW_SIZE: usize = 20;
const MIN_SAMPLES: usize = 5;
const RAISE_THRESHOLD: f64 = 0.20;
const LOWER_THRESHOLD: f64 = 0.10;
const MIN_INTERVAL: f64 = 0.2;
const MAX_INTERVAL: f64 = 1.5;
const RAISE_STEP: f64 = 0.1;
const LOWER_STEP: f64 = 0.05;
const RAISE_FLOOR: f64 = 0.5;

/// Maintains the last `N = 20` outcomes and the current adaptive interval.
pub struct AdaptiveController {
    window: VecDeque<bool>,
    interval: f64,
}

impl Default for AdaptiveController {
    fn default() -> Self {
        Self {
            window: VecDeque::with_capacity(WINDOW_SIZE),
            interval: MIN_INTERVAL,
        }
    }
}

impl AdaptiveController {
    /// Create a fresh controller with the interval at its floor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a single task settlement outcome (`true` = success) and
    /// recompute the adaptive interval per the raise/lower rules.
    pub fn record(&mut self, success: bool) {
        if self.window.len() == WINDOW_SIZE {
            self.window.pop_front();
        }
        self.window.push_back(success);

        if self.window.len() < MIN_SAMPLES {
            return;
        }

        let failures = self.window.iter().filter(|s| !**s).count();
        let failure_rate = failures as f64 / self.window.len() as f64;

        if failure_rate >= RAISE_THRESHOLD {
            self.interval = (self.interval.max(RAISE_FLOOR) + RAISE_STEP).min(MAX_INTERVAL);
        } else if failure_rate <= LOWER_THRESHOLD && self.interval > MIN_INTERVAL {
            self.interval = (self.interval - LOWER_STEP).max(MIN_INTERVAL);
        }
    }

    /// Current adaptive interval in seconds; always within `[0.2, 1.5]`.
    pub fn interval(&self) -> f64 {
        self.interval
    }
}
