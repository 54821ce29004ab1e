use std::collections::VecDeque;

use serde::Serialize;

const WINDOW_SIZE: usize = 1000;

#[derive(Debug, Clone, Serialize)]
pub struct LatencyStats {
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub min_us: u64,
    pub max_us: u64,
    pub count: usize,
}

impl Default for LatencyStats {
    fn default() -> Self {
        Self { p50_us: 0, p95_us: 0, p99_us: 0, min_us: 0, max_us: 0, count: 0 }
    }
}

/// Rolling per-stage latency windows for the tick cycle: sale generation
/// and trigger evaluation, plus per-cycle wall time.
pub struct LatencyTracker {
    generation_latencies: VecDeque<u64>,
    evaluation_latencies: VecDeque<u64>,
    cycle_latencies: VecDeque<u64>,
}

impl LatencyTracker {
    pub fn new() -> Self {
        Self {
            generation_latencies: VecDeque::with_capacity(WINDOW_SIZE),
            evaluation_latencies: VecDeque::with_capacity(WINDOW_SIZE),
            cycle_latencies: VecDeque::with_capacity(WINDOW_SIZE),
        }
    }

    pub fn reset(&mut self) {
        self.generation_latencies.clear();
        self.evaluation_latencies.clear();
        self.cycle_latencies.clear();
    }

    pub fn record_cycle(&mut self, generation_us: u64, evaluation_us: u64) {
        push_capped(&mut self.generation_latencies, generation_us);
        push_capped(&mut self.evaluation_latencies, evaluation_us);
        push_capped(&mut self.cycle_latencies, generation_us + evaluation_us);
    }

    pub fn generation_stats(&self) -> LatencyStats {
        compute_stats(&self.generation_latencies)
    }

    pub fn evaluation_stats(&self) -> LatencyStats {
        compute_stats(&self.evaluation_latencies)
    }

    pub fn cycle_stats(&self) -> LatencyStats {
        compute_stats(&self.cycle_latencies)
    }
}

impl Default for LatencyTracker {
    fn default() -> Self {
        Self::new()
    }
}

fn push_capped(q: &mut VecDeque<u64>, val: u64) {
    if q.len() >= WINDOW_SIZE {
        q.pop_front();
    }
    q.push_back(val);
}

fn compute_stats(q: &VecDeque<u64>) -> LatencyStats {
    if q.is_empty() {
        return LatencyStats::default();
    }
    let mut sorted: Vec<u64> = q.iter().copied().collect();
    sorted.sort_unstable();
    let n = sorted.len();
    LatencyStats {
        p50_us: sorted[n * 50 / 100],
        p95_us: sorted[n * 95 / 100],
        p99_us: sorted[(n * 99 / 100).min(n - 1)],
        min_us: sorted[0],
        max_us: sorted[n - 1],
        count: n,
    }
}
