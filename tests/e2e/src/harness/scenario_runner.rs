//! Scenario Runner
//!
//! Replays rating plans on a fresh card and compares the results with
//! alignment fixtures:
//! - Deterministic scheduler (fuzzing off) and a fixed start time
//! - Fixture loading from `testdata/`
//! - Field-by-field comparison with a float tolerance

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Duration, TimeZone, Utc};
use lethe_core::records::ScenarioPlan;
use lethe_core::{AlignmentFile, AlignmentScenario, Card, CardSnapshot, Rating, Scheduler, SchedulerConfig};

/// One field that differs between two replays of the same scenario
#[derive(Debug, Clone, PartialEq)]
pub struct Mismatch {
    pub scenario: String,
    pub step: usize,
    pub field: &'static str,
    pub expected: String,
    pub actual: String,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} step {}: {} expected {} got {}",
            self.scenario, self.step, self.field, self.expected, self.actual
        )
    }
}

/// Replays scenarios on a deterministic scheduler
///
/// # Example
///
/// ```rust,ignore
/// let runner = ScenarioRunner::new();
/// let fixture = ScenarioRunner::load_fixture("alignment.json");
/// for expected in &fixture.scenarios {
///     let actual = runner.replay_named(&expected.name);
///     assert!(ScenarioRunner::compare(expected, &actual, 1e-6).is_empty());
/// }
/// ```
pub struct ScenarioRunner {
    scheduler: Scheduler,
    t0: DateTime<Utc>,
}

impl Default for ScenarioRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScenarioRunner {
    /// Default weights, fuzzing off, starting 2025-06-15T10:00:00Z
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    /// Custom scheduler config; fuzzing is always turned off
    pub fn with_config(config: SchedulerConfig) -> Self {
        let scheduler = Scheduler::new(config.without_fuzzing()).expect("Invalid scheduler config");
        Self {
            scheduler,
            t0: Self::default_t0(),
        }
    }

    pub fn default_t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 10, 0, 0).unwrap()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn t0(&self) -> DateTime<Utc> {
        self.t0
    }

    /// Card after every review of `plan`
    pub fn run(&self, plan: &[(Rating, Duration)]) -> Vec<Card> {
        let mut card = Card::new(0, self.t0);
        plan.iter()
            .map(|&(rating, offset)| {
                card = self
                    .scheduler
                    .review(&card, rating, self.t0 + offset)
                    .expect("Review failed")
                    .0;
                card.clone()
            })
            .collect()
    }

    /// Replay one of the standard plans by name
    pub fn replay_named(&self, name: &str) -> AlignmentScenario {
        let (name, plan) = Self::plan(name);
        AlignmentScenario::replay(name, &plan, &self.scheduler, self.t0).expect("Replay failed")
    }

    pub fn plan(name: &str) -> ScenarioPlan {
        AlignmentScenario::standard_plans()
            .into_iter()
            .find(|(n, _)| *n == name)
            .unwrap_or_else(|| panic!("Unknown scenario {name}"))
    }

    pub fn fixture_path(file: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata").join(file)
    }

    pub fn load_fixture(file: &str) -> AlignmentFile {
        let path = Self::fixture_path(file);
        let text = std::fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("Failed to read {}: {e}", path.display()));
        serde_json::from_str(&text).unwrap_or_else(|e| panic!("Failed to parse {}: {e}", path.display()))
    }

    /// Every field that differs; floats are compared within `tolerance`
    pub fn compare(expected: &AlignmentScenario, actual: &AlignmentScenario, tolerance: f64) -> Vec<Mismatch> {
        let mut out = Vec::new();
        let mut push = |step: usize, field: &'static str, e: String, a: String| {
            out.push(Mismatch {
                scenario: expected.name.clone(),
                step,
                field,
                expected: e,
                actual: a,
            });
        };

        if expected.steps.len() != actual.steps.len() {
            push(
                0,
                "steps",
                expected.steps.len().to_string(),
                actual.steps.len().to_string(),
            );
            return out;
        }

        for (i, (e, a)) in expected.steps.iter().zip(&actual.steps).enumerate() {
            if e.rating != a.rating {
                push(i, "rating", e.rating.to_string(), a.rating.to_string());
            }
            if e.review_time != a.review_time {
                push(i, "review_time", e.review_time.to_rfc3339(), a.review_time.to_rfc3339());
            }
            compare_snapshot(i, &e.card, &a.card, tolerance, &mut push);
        }
        out
    }
}

fn compare_snapshot(
    step: usize,
    e: &CardSnapshot,
    a: &CardSnapshot,
    tolerance: f64,
    push: &mut impl FnMut(usize, &'static str, String, String),
) {
    if e.state != a.state {
        push(step, "state", e.state.to_string(), a.state.to_string());
    }
    if e.step != a.step {
        push(step, "step", format!("{:?}", e.step), format!("{:?}", a.step));
    }
    if e.due != a.due {
        push(step, "due", format!("{:?}", e.due), format!("{:?}", a.due));
    }
    for (field, ev, av) in [
        ("stability", e.stability, a.stability),
        ("difficulty", e.difficulty, a.difficulty),
    ] {
        let close = match (ev, av) {
            (Some(x), Some(y)) => (x - y).abs() <= tolerance,
            (None, None) => true,
            _ => false,
        };
        if !close {
            push(step, field, format!("{ev:?}"), format!("{av:?}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_replays_match() {
        let runner = ScenarioRunner::new();
        let a = runner.replay_named("good_good_good");
        let b = runner.replay_named("good_good_good");
        assert!(ScenarioRunner::compare(&a, &b, 0.0).is_empty());
    }

    #[test]
    fn test_compare_reports_float_drift() {
        let runner = ScenarioRunner::new();
        let expected = runner.replay_named("hard_from_new");
        let mut actual = expected.clone();
        actual.steps[0].card.stability = actual.steps[0].card.stability.map(|s| s + 1e-3);

        let mismatches = ScenarioRunner::compare(&expected, &actual, 1e-6);
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].field, "stability");
        assert!(ScenarioRunner::compare(&expected, &actual, 1e-2).is_empty());
    }
}
