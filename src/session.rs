//! Session bookkeeping on top of the detector output
//!
//! [`SessionStats`] keeps the focused/distracted clock and the alert count;
//! [`Feedback`] picks the line shown to the user for the current state.

use crate::types::Classification;
use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};

pub const ROAST_ROTATION: Duration = Duration::from_secs(3);

const ROASTS: &[&str] = &[
    "That feed will still be there in an hour. Your deadline won't.",
    "Thumb cardio is not a workout.",
    "Another swipe, another minute you won't get back.",
    "The algorithm thanks you for your service.",
    "Nothing down there is more important than what's on the screen.",
    "Your neck called. It wants its posture back.",
    "Scrolling is not a personality.",
    "Put it face down. You know you want to.",
    "Zero notifications were worth this.",
    "Eyes up, champ. The work is this way.",
];

const ENCOURAGEMENTS: &[&str] = &[
    "Locked in. Keep going.",
    "Head up, eyes forward. Nice.",
    "This is what focus looks like.",
    "Phone down, progress up.",
    "Steady. You're doing great.",
    "Deep work mode engaged.",
];

/// Time spent focused and distracted, plus how often distraction kicked in
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionStats {
    pub focused: Duration,
    pub distracted: Duration,
    pub alert_count: u32,
    #[serde(skip)]
    last: Option<(Classification, Instant)>,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the classification reported at `now`. The time since the previous
    /// record is credited to the previous classification.
    /// Returns true when this record raised a new alert.
    pub fn record(&mut self, classification: Classification, now: Instant) -> bool {
        let previous = self.last.map(|(c, _)| c);
        if let Some((prev, since)) = self.last {
            let elapsed = now.saturating_duration_since(since);
            match prev {
                Classification::Normal => self.focused += elapsed,
                Classification::Doomscrolling => self.distracted += elapsed,
                _ => {}
            }
        }
        self.last = Some((classification, now));

        let alert = classification == Classification::Doomscrolling
            && previous != Some(Classification::Doomscrolling);
        if alert {
            self.alert_count += 1;
        }
        alert
    }

    /// Share of tracked time spent focused, if any time was tracked
    pub fn focus_ratio(&self) -> Option<f32> {
        let total = self.focused + self.distracted;
        if total.is_zero() {
            None
        } else {
            Some(self.focused.as_secs_f32() / total.as_secs_f32())
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn clock(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "focused {} | distracted {} | alerts {}",
            clock(self.focused),
            clock(self.distracted),
            self.alert_count
        )
    }
}

/// Picks roasts while doomscrolling and encouragement while focused.
pub struct Feedback {
    rng: fastrand::Rng,
    roast: Option<(&'static str, Instant)>,
}

impl Default for Feedback {
    fn default() -> Self {
        Self::new()
    }
}

impl Feedback {
    pub fn new() -> Self {
        Self::with_rng(fastrand::Rng::new())
    }

    pub fn with_rng(rng: fastrand::Rng) -> Self {
        Self { rng, roast: None }
    }

    /// Line to show for this tick, if any. A roast is held for at least
    /// [`ROAST_ROTATION`] before a new one is drawn.
    pub fn message(
        &mut self,
        classification: Classification,
        now: Instant,
    ) -> Option<&'static str> {
        match classification {
            Classification::Doomscrolling => {
                let due = match self.roast {
                    Some((_, at)) => now.saturating_duration_since(at) >= ROAST_ROTATION,
                    None => true,
                };
                if due {
                    let line = ROASTS[self.rng.usize(..ROASTS.len())];
                    self.roast = Some((line, now));
                }
                self.roast.map(|(line, _)| line)
            }
            Classification::Normal => Some(ENCOURAGEMENTS[self.rng.usize(..ENCOURAGEMENTS.len())]),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_is_credited_to_the_previous_state() {
        let t0 = Instant::now();
        let mut stats = SessionStats::new();
        stats.record(Classification::Normal, t0);
        stats.record(Classification::Monitoring, t0 + Duration::from_secs(4));
        stats.record(Classification::Doomscrolling, t0 + Duration::from_secs(5));
        stats.record(Classification::Normal, t0 + Duration::from_secs(7));

        assert_eq!(stats.focused, Duration::from_secs(4));
        assert_eq!(stats.distracted, Duration::from_secs(2));
        assert_eq!(stats.focus_ratio(), Some(4.0 / 6.0));
        assert_eq!(stats.to_string(), "focused 0:04 | distracted 0:02 | alerts 1");
    }

    #[test]
    fn alerts_count_entries_not_ticks() {
        let t0 = Instant::now();
        let mut stats = SessionStats::new();
        assert!(stats.record(Classification::Doomscrolling, t0));
        assert!(!stats.record(Classification::Doomscrolling, t0));
        assert!(!stats.record(Classification::Monitoring, t0));
        assert!(stats.record(Classification::Doomscrolling, t0));
        assert_eq!(stats.alert_count, 2);

        stats.reset();
        assert_eq!(stats, SessionStats::default());
    }

    #[test]
    fn roasts_rotate_no_faster_than_the_interval() {
        let t0 = Instant::now();
        let mut feedback = Feedback::with_rng(fastrand::Rng::with_seed(7));
        let first = feedback.message(Classification::Doomscrolling, t0).expect("roast");
        for ms in [100, 1000, 2999] {
            let at = t0 + Duration::from_millis(ms);
            let again = feedback.message(Classification::Doomscrolling, at);
            assert_eq!(again, Some(first));
        }
        let later = feedback
            .message(Classification::Doomscrolling, t0 + Duration::from_secs(3))
            .expect("roast");
        assert!(ROASTS.contains(&later));
    }

    #[test]
    fn only_normal_and_doomscrolling_get_a_message() {
        let mut feedback = Feedback::new();
        let now = Instant::now();
        let line = feedback.message(Classification::Normal, now).expect("encouragement");
        assert!(ENCOURAGEMENTS.contains(&line));
        for c in [
            Classification::Calibrating,
            Classification::Monitoring,
            Classification::NoFace,
            Classification::Error,
        ] {
            assert_eq!(feedback.message(c, now), None);
        }
    }
}
