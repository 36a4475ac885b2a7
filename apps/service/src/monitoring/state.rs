//! Last-known status per target and up/down transition detection.
//!
//! ```text
//! (none) --Up-->   FirstObservationUp
//! (none) --Down--> FirstObservationDown
//! Up     --Down--> WentDown
//! Down   --Up-->   WentUp
//! X      --X-->    None
//! ```
//!
//! The stored outcome is replaced on every observation, whatever the transition.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::types::{CheckResult, Outcome, TargetId};

/// Change (or first sighting) of a target's classification between two checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    None,
    WentDown,
    WentUp,
    FirstObservationDown,
    FirstObservationUp,
}

impl Transition {
    /// Pure classification of `current` against the previously stored outcome
    pub fn classify(previous: Option<Outcome>, current: Outcome) -> Self {
        match (previous, current) {
            (None, Outcome::Up) => Transition::FirstObservationUp,
            (None, Outcome::Down) => Transition::FirstObservationDown,
            (Some(Outcome::Up), Outcome::Down) => Transition::WentDown,
            (Some(Outcome::Down), Outcome::Up) => Transition::WentUp,
            (Some(_), _) => Transition::None,
        }
    }

    pub fn is_first_observation(self) -> bool {
        matches!(self, Transition::FirstObservationDown | Transition::FirstObservationUp)
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Transition::None => "none",
            Transition::WentDown => "went_down",
            Transition::WentUp => "went_up",
            Transition::FirstObservationDown => "first_observation_down",
            Transition::FirstObservationUp => "first_observation_up",
        };
        f.write_str(name)
    }
}

/// Owner of the per-target last-status map
#[derive(Debug, Default)]
pub struct StateTracker {
    last: HashMap<TargetId, Outcome>,
}

impl StateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify `result` against the stored outcome, then store its outcome
    pub fn observe(&mut self, result: &CheckResult) -> Transition {
        let previous = self.last.insert(result.target_id, result.outcome);
        let transition = Transition::classify(previous, result.outcome);

        match transition {
            Transition::WentDown | Transition::WentUp => {
                info!(url = %result.url, target = %result.target_id, %transition, "Target changed state");
            }
            _ => {
                debug!(url = %result.url, target = %result.target_id, %transition, "Target observed");
            }
        }

        transition
    }

    pub fn last_outcome(&self, target: TargetId) -> Option<Outcome> {
        self.last.get(&target).copied()
    }

    /// Number of targets with a recorded outcome
    pub fn len(&self) -> usize {
        self.last.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::types::Target;
    use chrono::Local;
    use std::time::Duration;
    use url::Url;

    fn result_for(target: &Target, outcome: Outcome) -> CheckResult {
        let code = if outcome == Outcome::Up { 200 } else { 500 };
        CheckResult::responded(target, Local::now(), code, Duration::from_millis(5))
    }

    fn target(id: usize) -> Target {
        Target::new(id, Url::parse("https://example.com").unwrap())
    }

    #[test]
    fn test_first_observation_is_never_an_edge() {
        let mut tracker = StateTracker::new();
        assert_eq!(tracker.observe(&result_for(&target(0), Outcome::Down)), Transition::FirstObservationDown);
        assert_eq!(tracker.observe(&result_for(&target(1), Outcome::Up)), Transition::FirstObservationUp);
    }

    #[test]
    fn test_went_down_once_per_down_period() {
        let mut tracker = StateTracker::new();
        let t = target(0);
        let sequence = [Outcome::Up, Outcome::Up, Outcome::Down, Outcome::Down, Outcome::Down, Outcome::Up];

        let transitions: Vec<_> = sequence.iter().map(|o| tracker.observe(&result_for(&t, *o))).collect();

        assert_eq!(
            transitions,
            vec![
                Transition::FirstObservationUp,
                Transition::None,
                Transition::WentDown,
                Transition::None,
                Transition::None,
                Transition::WentUp,
            ]
        );
        assert_eq!(tracker.last_outcome(t.id), Some(Outcome::Up));
    }

    #[test]
    fn test_duplicate_urls_are_independent() {
        let mut tracker = StateTracker::new();
        let (a, b) = (target(0), target(1));

        tracker.observe(&result_for(&a, Outcome::Up));
        tracker.observe(&result_for(&b, Outcome::Down));

        assert_eq!(tracker.observe(&result_for(&a, Outcome::Down)), Transition::WentDown);
        assert_eq!(tracker.observe(&result_for(&b, Outcome::Down)), Transition::None);
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn test_classify_is_pure() {
        assert_eq!(Transition::classify(Some(Outcome::Up), Outcome::Up), Transition::None);
        assert_eq!(Transition::classify(Some(Outcome::Down), Outcome::Down), Transition::None);
        assert_eq!(Transition::classify(Some(Outcome::Up), Outcome::Down), Transition::WentDown);
        assert_eq!(Transition::classify(Some(Outcome::Down), Outcome::Up), Transition::WentUp);
    }
}
