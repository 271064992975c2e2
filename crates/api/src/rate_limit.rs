use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Above this many tracked clients, drained entries are swept out of the map
/// at most once per window.
const SWEEP_THRESHOLD: usize = 1024;

/// Sliding-window limiter keyed by client address.
#[derive(Debug, Clone)]
pub struct IpRateLimiter {
    inner: Arc<Mutex<LimiterState>>,
    window: Duration,
    max_requests: usize,
}

#[derive(Debug, Default)]
struct LimiterState {
    hits: HashMap<String, VecDeque<Instant>>,
    last_sweep: Option<Instant>,
}

impl IpRateLimiter {
    pub fn new(window: Duration, max_requests: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(LimiterState::default())),
            window,
            max_requests: max_requests.max(1),
        }
    }

    /// Records a hit for `key`, or returns how long until the oldest hit
    /// leaves the window.
    pub fn check(&self, key: &str) -> Result<(), Duration> {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> Result<(), Duration> {
        let mut state = self.inner.lock();
        if state.hits.len() > SWEEP_THRESHOLD {
            self.sweep(&mut state, now);
        }

        let queue = state.hits.entry(key.to_string()).or_default();
        prune(queue, now, self.window);

        if queue.len() >= self.max_requests {
            let oldest = queue.front().copied().unwrap_or(now);
            return Err(self.window.saturating_sub(now.duration_since(oldest)));
        }

        queue.push_back(now);
        Ok(())
    }

    fn sweep(&self, state: &mut LimiterState, now: Instant) {
        let due = state
            .last_sweep
            .map_or(true, |last| now.duration_since(last) >= self.window);
        if !due {
            return;
        }

        let window = self.window;
        state.hits.retain(|_, queue| {
            prune(queue, now, window);
            !queue.is_empty()
        });
        state.last_sweep = Some(now);
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        self.inner.lock().hits.len()
    }
}

fn prune(queue: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(front) = queue.front() {
        if now.duration_since(*front) >= window {
            queue.pop_front();
        } else {
            break;
        }
    }
}
