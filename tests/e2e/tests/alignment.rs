//! Alignment Tests
//!
//! Replays the reference scenarios and checks every snapshot against a
//! fixture produced by an independent implementation of the same formulas.

use chrono::Duration;
use lethe_core::{AlignmentFile, AlignmentScenario, State};
use lethe_e2e_tests::ScenarioRunner;

const TOLERANCE: f64 = 1e-6;

fn fixture() -> AlignmentFile {
    ScenarioRunner::load_fixture("alignment.json")
}

#[test]
fn test_fixture_metadata() {
    let file = fixture();
    assert_eq!(file.parameters, "default");
    assert_eq!(file.desired_retention, 0.9);
    assert!(!file.enable_fuzz);

    let names: Vec<&str> = file.scenarios.iter().map(|s| s.name.as_str()).collect();
    let expected: Vec<&str> = AlignmentScenario::standard_plans().iter().map(|(n, _)| *n).collect();
    assert_eq!(names, expected);
}

#[test]
fn test_every_scenario_matches_fixture() {
    let runner = ScenarioRunner::new();
    let mut failures = Vec::new();
    for expected in &fixture().scenarios {
        let actual = runner.replay_named(&expected.name);
        failures.extend(ScenarioRunner::compare(expected, &actual, TOLERANCE));
    }
    assert!(
        failures.is_empty(),
        "alignment mismatches:\n{}",
        failures.iter().map(|m| m.to_string()).collect::<Vec<_>>().join("\n")
    );
}

#[test]
fn test_generated_file_matches_fixture() {
    let runner = ScenarioRunner::new();
    let generated = AlignmentFile::generate(runner.scheduler(), runner.t0()).unwrap();
    let fixture = fixture();
    assert_eq!(generated.scenarios.len(), fixture.scenarios.len());
    for (expected, actual) in fixture.scenarios.iter().zip(&generated.scenarios) {
        assert!(ScenarioRunner::compare(expected, actual, TOLERANCE).is_empty());
    }
}

#[test]
fn test_hard_from_new_waits_mean_of_first_steps() {
    let runner = ScenarioRunner::new();
    let scenario = runner.replay_named("hard_from_new");
    let step = &scenario.steps[0];
    assert_eq!(step.card.state, State::Learning);
    assert_eq!(step.card.step, Some(0));
    assert_eq!(step.card.due, Some(runner.t0() + Duration::seconds(330)));
}

#[test]
fn test_relearning_scenario_shape() {
    let scenario = ScenarioRunner::new().replay_named("good_good_again_relearning_good");
    let states: Vec<State> = scenario.steps.iter().map(|s| s.card.state).collect();
    assert_eq!(
        states,
        vec![State::Learning, State::Review, State::Relearning, State::Review]
    );
    let lapse = &scenario.steps[2];
    assert_eq!(lapse.card.due, Some(lapse.review_time + Duration::minutes(10)));
    assert!(lapse.card.stability < scenario.steps[1].card.stability);
}

#[test]
fn test_fixture_roundtrips_through_json() {
    let file = fixture();
    let json = serde_json::to_string(&file).unwrap();
    let back: AlignmentFile = serde_json::from_str(&json).unwrap();
    assert_eq!(back, file);
}
