//! Scheduling Journey Tests
//!
//! A card's life from first sight through lapses and recovery, driven
//! through the public scheduler API.

use chrono::Duration;
use lethe_core::{Card, Rating, Scheduler, SchedulerConfig, State, retrievability_now, review};
use lethe_e2e_tests::{ScenarioRunner, TestDataFactory};

fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() < epsilon
}

#[test]
fn test_good_good_good_graduates_and_grows() {
    let runner = ScenarioRunner::new();
    let cards = runner.run(&ScenarioRunner::plan("good_good_good").1);

    assert_eq!(cards[0].state, State::Learning);
    assert_eq!(cards[0].step, Some(1));
    assert_eq!(cards[1].state, State::Review);
    assert_eq!(cards[1].step, None);

    let s1 = cards[1].stability.unwrap();
    let s2 = cards[2].stability.unwrap();
    assert!(s2 > s1 * 3.0, "cross-day Good should multiply stability: {s1} -> {s2}");
    assert!(cards[2].due - cards[2].last_review.unwrap() > Duration::days(7));
}

#[test]
fn test_lapse_and_recover_cycle() {
    let scheduler = Scheduler::new(SchedulerConfig::default().without_fuzzing()).unwrap();
    let t = TestDataFactory::epoch();
    let card = TestDataFactory::review_card(1, 20.0, 5.0, t);
    let now = t + Duration::days(25);

    let (lapsed, log) = scheduler.review(&card, Rating::Again, now).unwrap();
    assert_eq!(log.rating, Rating::Again);
    assert_eq!(lapsed.state, State::Relearning);
    assert_eq!(lapsed.step, Some(0));
    assert!(lapsed.stability.unwrap() < 20.0);
    assert!(lapsed.difficulty.unwrap() > 5.0);

    let (recovered, _) = scheduler.review(&lapsed, Rating::Good, lapsed.due).unwrap();
    assert_eq!(recovered.state, State::Review);
    let s = recovered.stability.unwrap();
    assert!(s > 0.0 && s < 20.0);
    assert!(recovered.due >= lapsed.due + Duration::days(1));
}

#[test]
fn test_hard_repeats_current_learning_step() {
    let scheduler = Scheduler::default();
    let t = TestDataFactory::epoch();
    let card = TestDataFactory::learning_card(1, 1, t);
    let now = t + Duration::minutes(10);
    let (next, _) = scheduler.review(&card, Rating::Hard, now).unwrap();
    assert_eq!(next.state, State::Learning);
    assert_eq!(next.step, Some(1));
    assert_eq!(next.due, now + Duration::minutes(10));
}

#[test]
fn test_preview_orders_intervals() {
    let scheduler = Scheduler::new(SchedulerConfig::default().without_fuzzing()).unwrap();
    let t = TestDataFactory::epoch();
    let card = TestDataFactory::review_card(1, 10.0, 5.0, t);
    let now = t + Duration::days(10);
    let preview = scheduler.preview(&card, now).unwrap();

    assert!(preview.again.due < preview.hard.due);
    assert!(preview.hard.due <= preview.good.due);
    assert!(preview.good.due < preview.easy.due);
    assert_eq!(preview.get(Rating::Good), &preview.good);
}

#[test]
fn test_reschedule_matches_step_by_step_review() {
    let logs = TestDataFactory::corpus(&TestDataFactory::true_weights(), 20, 8, 3);
    let scheduler = Scheduler::new(
        SchedulerConfig::default()
            .with_weights(TestDataFactory::true_weights())
            .without_fuzzing(),
    )
    .unwrap();

    for card_logs in TestDataFactory::logs_by_card(&logs) {
        let start = Card::new(card_logs[0].card_id, card_logs[0].review_time);
        let replayed = scheduler.reschedule(&start, &card_logs).unwrap();

        let mut stepped = start;
        for log in &card_logs {
            stepped = scheduler.review(&stepped, log.rating, log.review_time).unwrap().0;
        }
        assert_eq!(replayed, stepped);
    }
}

#[test]
fn test_free_functions_agree_with_scheduler() {
    let config = SchedulerConfig::default().without_fuzzing();
    let scheduler = Scheduler::new(config.clone()).unwrap();
    let t = TestDataFactory::epoch();
    let card = TestDataFactory::review_card(7, 8.0, 4.0, t);
    let now = t + Duration::days(9);

    let (a, _) = review(&card, Rating::Good, now, &config).unwrap();
    let (b, _) = scheduler.review(&card, Rating::Good, now).unwrap();
    assert_eq!(a, b);

    let r1 = retrievability_now(&card, now, &config).unwrap();
    let r2 = scheduler.retrievability(&card, now).unwrap();
    assert!(approx_eq(r1, r2, 1e-12));
    assert!(r1 < 0.9);
}

#[test]
fn test_fuzzed_schedules_replay_identically() {
    let config = SchedulerConfig {
        fuzz_seed: 99,
        ..SchedulerConfig::default()
    };
    let scheduler = Scheduler::new(config).unwrap();
    let t = TestDataFactory::epoch();
    let card = TestDataFactory::review_card(5, 30.0, 5.0, t);
    let now = t + Duration::days(30);

    let (a, _) = scheduler.review(&card, Rating::Good, now).unwrap();
    let (b, _) = scheduler.review(&card, Rating::Good, now).unwrap();
    assert_eq!(a.due, b.due);
}

#[test]
fn test_retention_target_shortens_intervals() {
    let t = TestDataFactory::epoch();
    let card = TestDataFactory::review_card(1, 15.0, 5.0, t);
    let now = t + Duration::days(15);
    let strict = Scheduler::new(SchedulerConfig::default().with_retention(0.95).without_fuzzing()).unwrap();
    let relaxed = Scheduler::new(SchedulerConfig::default().with_retention(0.8).without_fuzzing()).unwrap();

    let (a, _) = strict.review(&card, Rating::Good, now).unwrap();
    let (b, _) = relaxed.review(&card, Rating::Good, now).unwrap();
    assert!(a.due < b.due);
}
