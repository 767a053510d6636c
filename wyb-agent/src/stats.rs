//! Search statistics tracking.

use std::time::Instant;

use log::debug;

/// Counters collected while searching.
#[derive(Debug, Default, Clone)]
pub struct SearchStats {
    /// Root searches run
    pub searches: u64,

    /// States visited below the root (interior nodes and leaves)
    pub nodes: u64,

    /// Leaves scored by the evaluator
    pub leaves: u64,

    /// Forced passes searched because a side had no legal action
    pub passes: u64,

    /// Alpha-beta cutoffs
    pub cutoffs: u64,

    /// Sibling actions skipped by cutoffs
    pub pruned: u64,

    /// For rate calculation
    start_time: Option<Instant>,
}

impl SearchStats {
    pub fn new() -> Self {
        Self {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    /// Clear all counters and restart the clock.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Record a cutoff that skipped `skipped` remaining siblings.
    #[inline]
    pub fn record_cutoff(&mut self, skipped: usize) {
        self.cutoffs += 1;
        self.pruned += skipped as u64;
    }

    /// Nodes visited per second since the stats were created.
    pub fn nodes_per_sec(&self) -> f64 {
        if let Some(start) = self.start_time {
            let elapsed = start.elapsed().as_secs_f64();
            if elapsed > 0.0 {
                return self.nodes as f64 / elapsed;
            }
        }
        0.0
    }

    /// Share of generated actions that were never searched, in percent.
    pub fn pruned_pct(&self) -> f64 {
        if self.nodes + self.pruned > 0 {
            100.0 * self.pruned as f64 / (self.nodes + self.pruned) as f64
        } else {
            0.0
        }
    }

    /// Log a one-line summary at debug level.
    pub fn log_summary(&self, label: &str) {
        debug!(
            "{}: searches={} nodes={} leaves={} passes={} cutoffs={} pruned={:.1}% rate={:.0}/s",
            label,
            self.searches,
            self.nodes,
            self.leaves,
            self.passes,
            self.cutoffs,
            self.pruned_pct(),
            self.nodes_per_sec(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_cutoff() {
        let mut stats = SearchStats::new();
        stats.record_cutoff(3);
        stats.record_cutoff(0);
        assert_eq!(stats.cutoffs, 2);
        assert_eq!(stats.pruned, 3);
    }

    #[test]
    fn test_pruned_pct() {
        let mut stats = SearchStats::new();
        assert_eq!(stats.pruned_pct(), 0.0);
        stats.nodes = 3;
        stats.pruned = 1;
        assert_eq!(stats.pruned_pct(), 25.0);
    }

    #[test]
    fn test_reset() {
        let mut stats = SearchStats::new();
        stats.nodes = 10;
        stats.searches = 2;
        stats.reset();
        assert_eq!(stats.nodes, 0);
        assert_eq!(stats.searches, 0);
    }
}
