//! Named lap timings for the phases of a mining run.

use std::time::{Duration, Instant};

use indexmap::IndexMap;
use tracing::info;

#[derive(Debug, Clone, Copy, Default)]
struct LapStats {
    count: u32,
    total: Duration,
}

/// Accumulates elapsed time per task name across repeated laps.
#[derive(Debug)]
pub struct Stopwatch {
    started: Instant,
    laps: IndexMap<String, LapStats>,
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}

impl Stopwatch {
    /// A stopwatch with no laps, started now.
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            laps: IndexMap::new(),
        }
    }

    /// Restart the clock without recording a lap.
    pub fn reset(&mut self) {
        self.started = Instant::now();
    }

    /// Record the time since the last lap or reset under `task` and restart.
    pub fn lap(&mut self, task: &str) -> Duration {
        let elapsed = self.started.elapsed();
        self.reset();

        let stats = self.laps.entry(task.to_string()).or_default();
        stats.count += 1;
        stats.total += elapsed;
        info!(
            task,
            iteration = stats.count,
            seconds = elapsed.as_secs_f64(),
            "lap"
        );
        elapsed
    }

    /// One line per task: `average,count,total,task`, times in seconds.
    pub fn summary(&self) -> String {
        self.laps
            .iter()
            .map(|(task, stats)| {
                let total = stats.total.as_secs_f64();
                let average = total / f64::from(stats.count.max(1));
                format!("{average:.3},{},{total:.3},{task}", stats.count)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
