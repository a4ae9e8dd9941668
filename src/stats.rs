//! Performance statistics collection for `--stats` output.

use std::time::{Duration, Instant};

use crate::engine::TranspositionSummary;

/// Collects phase timings and exchange counters for the coordinator.
///
/// Created when `--stats` is passed, threaded as `Option<&mut Stats>`.
/// Zero cost when `None`: no timing calls, no counter updates.
pub struct Stats {
    total_start: Instant,
    phases: Vec<(&'static str, Duration)>,
    pub num_ranks: usize,
    pub data_size: usize,
    pub local_sorter: &'static str,
    // Transposition counters (coordinator's view)
    pub rounds: usize,
    pub exchanges: usize,
    pub idle_rounds: usize,
    pub elements_received: usize,
    pub verified: Option<bool>,
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

impl Stats {
    pub fn new() -> Self {
        Self {
            total_start: Instant::now(),
            phases: Vec::new(),
            num_ranks: 0,
            data_size: 0,
            local_sorter: "",
            rounds: 0,
            exchanges: 0,
            idle_rounds: 0,
            elements_received: 0,
            verified: None,
        }
    }

    /// Record a completed phase with its duration.
    pub fn add_phase(&mut self, name: &'static str, duration: Duration) {
        self.phases.push((name, duration));
    }

    pub fn phases(&self) -> &[(&'static str, Duration)] {
        &self.phases
    }

    pub fn record_transposition(&mut self, summary: &TranspositionSummary) {
        self.rounds += summary.rounds;
        self.exchanges += summary.exchanges;
        self.idle_rounds += summary.idle_rounds;
        self.elements_received += summary.elements_received;
    }

    /// Print the stats table to stderr.
    pub fn display(&self) {
        let total = self.total_start.elapsed();
        eprintln!();
        eprintln!("=== Odd-Even Transposition Sort Stats ===");
        eprintln!("  Ranks:                  {}", self.num_ranks);
        eprintln!("  Data size:              {}", self.data_size);
        eprintln!("  Local sorter:           {}", self.local_sorter);

        for (name, dur) in &self.phases {
            eprintln!("  {:<24} {:>8.3}s", name, dur.as_secs_f64());
        }

        if self.rounds > 0 {
            eprintln!(
                "  Rounds:                 {}  (exchanged={}  idle={})",
                self.rounds, self.exchanges, self.idle_rounds
            );
            eprintln!("  Elements received:      {}", self.elements_received);
        }

        if let Some(verified) = self.verified {
            eprintln!("  Verified:               {}", if verified { "yes" } else { "NO" });
        }

        eprintln!("  ─────────────────────────────────");
        eprintln!("  Total:                  {:>8.3}s", total.as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_phases_in_order() {
        let mut stats = Stats::new();
        stats.add_phase("scatter", Duration::from_millis(2));
        stats.add_phase("local sort", Duration::from_millis(5));
        let names: Vec<&str> = stats.phases().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["scatter", "local sort"]);
    }

    #[test]
    fn accumulates_transposition_counters() {
        let mut stats = Stats::new();
        stats.record_transposition(&TranspositionSummary {
            rounds: 3,
            exchanges: 2,
            idle_rounds: 1,
            elements_received: 8,
        });
        assert_eq!(stats.rounds, 3);
        assert_eq!(stats.exchanges, 2);
        assert_eq!(stats.idle_rounds, 1);
        assert_eq!(stats.elements_received, 8);
    }
}
