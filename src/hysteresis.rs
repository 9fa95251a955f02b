//! Debouncing of raw per-tick detections
//!
//! Two run-length counters track consecutive detected and consecutive normal
//! ticks; each raw outcome extends one run and breaks the other. A run of
//! `threshold` ticks commits its classification, anything shorter reports
//! `Monitoring`.

use crate::types::Classification;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hysteresis {
    threshold: u32,
    consecutive_detected: u32,
    consecutive_normal: u32,
    /// Last committed stable classification
    committed: Classification,
}

impl Hysteresis {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            consecutive_detected: 0,
            consecutive_normal: 0,
            committed: Classification::Monitoring,
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn consecutive_detected(&self) -> u32 {
        self.consecutive_detected
    }

    pub fn consecutive_normal(&self) -> u32 {
        self.consecutive_normal
    }

    pub fn committed(&self) -> Classification {
        self.committed
    }

    /// Feed one raw outcome and get the classification for this tick.
    pub fn update(&mut self, raw_detection: bool) -> Classification {
        if raw_detection {
            self.consecutive_detected = self.consecutive_detected.saturating_add(1);
            self.consecutive_normal = 0;
        } else {
            self.consecutive_normal = self.consecutive_normal.saturating_add(1);
            self.consecutive_detected = 0;
        }

        if self.consecutive_detected >= self.threshold {
            self.commit(Classification::Doomscrolling);
            Classification::Doomscrolling
        } else if self.consecutive_normal >= self.threshold {
            self.commit(Classification::Normal);
            Classification::Normal
        } else {
            Classification::Monitoring
        }
    }

    /// Commit a classification without touching the counters.
    pub fn force(&mut self, classification: Classification) {
        self.commit(classification);
    }

    /// Zero both runs, keeping the committed classification.
    pub fn restart_counters(&mut self) {
        self.consecutive_detected = 0;
        self.consecutive_normal = 0;
    }

    pub fn reset(&mut self) {
        self.restart_counters();
        self.committed = Classification::Monitoring;
    }

    fn commit(&mut self, classification: Classification) {
        if self.committed != classification {
            log::info!("Attention state: {} -> {}", self.committed, classification);
        }
        self.committed = classification;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn needs_a_full_run_to_commit() {
        let mut h = Hysteresis::new(3);
        assert_eq!(h.update(true), Classification::Monitoring);
        assert_eq!(h.update(true), Classification::Monitoring);
        assert_eq!(h.update(true), Classification::Doomscrolling);
        assert_eq!(h.committed(), Classification::Doomscrolling);
        assert_eq!(h.update(true), Classification::Doomscrolling);
    }

    #[test]
    fn dissenting_tick_breaks_the_run() {
        let mut h = Hysteresis::new(3);
        h.update(true);
        h.update(true);
        assert_eq!(h.update(false), Classification::Monitoring);
        assert_eq!(h.consecutive_detected(), 0);
        assert_eq!(h.consecutive_normal(), 1);
        assert_eq!(h.update(true), Classification::Monitoring);
        assert_eq!(h.update(true), Classification::Monitoring);
        assert_eq!(h.update(true), Classification::Doomscrolling);
    }

    #[test]
    fn leaving_a_committed_state_passes_through_monitoring() {
        let mut h = Hysteresis::new(3);
        for _ in 0..3 {
            h.update(false);
        }
        assert_eq!(h.committed(), Classification::Normal);
        assert_eq!(h.update(true), Classification::Monitoring);
        assert_eq!(h.committed(), Classification::Normal);
    }

    #[test]
    fn force_keeps_counters() {
        let mut h = Hysteresis::new(3);
        h.update(false);
        h.update(false);
        h.force(Classification::Doomscrolling);
        assert_eq!(h.committed(), Classification::Doomscrolling);
        assert_eq!(h.consecutive_normal(), 2);
        assert_eq!(h.update(false), Classification::Normal);
    }

    #[test]
    fn reset_returns_to_monitoring() {
        let mut h = Hysteresis::new(2);
        h.update(true);
        h.update(true);
        h.reset();
        assert_eq!(h, Hysteresis::new(2));
    }

    #[test]
    fn threshold_of_one_commits_immediately() {
        let mut h = Hysteresis::new(1);
        assert_eq!(h.update(true), Classification::Doomscrolling);
        assert_eq!(h.update(false), Classification::Normal);
    }
}
