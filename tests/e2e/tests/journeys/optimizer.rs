//! Optimizer Journey Tests
//!
//! Generate a corpus from known weights, fit weights back from it starting at
//! the defaults, then pick a retention target for the fitted weights.

use lethe_core::optimizer::{CostModel, RetentionConfig, optimal_retention, simulate_cost};
use lethe_core::records::{entries_from_logs, logs_from_entries};
use lethe_core::{Optimizer, OptimizerBaseline, OptimizerConfig, ReviewLog, Weights};
use lethe_e2e_tests::TestDataFactory;

/// Initial-stability band for w[0], the only initial stability the corpus exercises
const W0_TOLERANCE: f64 = 0.03;

fn corpus() -> Vec<ReviewLog> {
    TestDataFactory::corpus(&TestDataFactory::true_weights(), 300, 10, 42)
}

fn config() -> OptimizerConfig {
    OptimizerConfig {
        epochs: 3,
        mini_batch_size: 256,
        ..OptimizerConfig::default()
    }
}

fn quick_retention() -> RetentionConfig {
    RetentionConfig {
        num_cards: 100,
        horizon_days: 180,
        refine_iterations: 3,
        ..RetentionConfig::default()
    }
}

#[test]
fn test_fit_recovers_loss_of_true_weights() {
    let logs = corpus();
    let optimizer = Optimizer::new(config()).unwrap();

    let default_loss = optimizer.batch_loss(&Weights::default(), &logs).unwrap();
    let true_loss = optimizer.batch_loss(&TestDataFactory::true_weights(), &logs).unwrap();
    let fit = optimizer.fit(&logs, Weights::default()).unwrap();

    assert!(fit.weights.validate().is_ok());
    assert!((fit.initial_loss - default_loss).abs() < 1e-12);
    assert!(fit.loss <= default_loss + 1e-12);
    assert!(
        fit.loss <= true_loss + 0.02,
        "fitted loss {} far above true-weight loss {}",
        fit.loss,
        true_loss
    );
}

#[test]
fn test_fit_recovers_identifiable_weights() {
    let truth = TestDataFactory::true_weights();
    let logs = TestDataFactory::corpus(&truth, 500, 10, 42);
    let optimizer = Optimizer::new(OptimizerConfig::default()).unwrap();
    let fit = optimizer.fit(&logs, Weights::default()).unwrap();

    let w0 = fit.weights.0[0];
    assert!(
        (w0 - truth.0[0]).abs() <= W0_TOLERANCE,
        "w[0] = {w0}, generated from {}",
        truth.0[0]
    );
    assert!((w0 - truth.0[0]).abs() < (Weights::default().0[0] - truth.0[0]).abs());

    // Every synthetic card opens with Again, so S0 for Hard/Good/Easy gets no gradient
    for i in 1..4 {
        assert_eq!(fit.weights.0[i], Weights::default().0[i], "w[{i}] moved");
    }
    assert!(fit.weights.validate().is_ok());

    let true_loss = optimizer.batch_loss(&truth, &logs).unwrap();
    assert!(fit.loss <= true_loss + 0.02);
}

#[test]
fn test_fit_survives_corpus_file_roundtrip() {
    let logs = corpus();
    let json = serde_json::to_string(&entries_from_logs(&logs)).unwrap();
    let reloaded = logs_from_entries(serde_json::from_str(&json).unwrap()).unwrap();
    assert_eq!(reloaded, logs);

    let optimizer = Optimizer::new(OptimizerConfig {
        epochs: 1,
        ..config()
    })
    .unwrap();
    let a = optimizer.fit(&logs, Weights::default()).unwrap();
    let b = optimizer.fit(&reloaded, Weights::default()).unwrap();
    assert_eq!(a.weights, b.weights);
}

#[test]
fn test_step_budget_stops_unconverged() {
    let optimizer = Optimizer::new(OptimizerConfig {
        max_steps: Some(2),
        ..config()
    })
    .unwrap();
    let fit = optimizer.fit(&corpus(), Weights::default()).unwrap();
    assert!(!fit.converged);
    assert_eq!(fit.epochs_run, 1);
    assert!(fit.loss <= fit.initial_loss);
}

#[test]
fn test_retention_search_on_fitted_weights() {
    let logs = corpus();
    let fit = Optimizer::new(OptimizerConfig {
        epochs: 1,
        ..config()
    })
    .unwrap()
    .fit(&logs, Weights::default())
    .unwrap();

    let cost_model = CostModel::from_logs(&logs).unwrap();
    let retention_config = quick_retention();
    let best = optimal_retention(&fit.weights, &cost_model, &retention_config).unwrap();
    assert!((0.70..=0.95).contains(&best));

    let best_cost = simulate_cost(&fit.weights, best, &cost_model, &retention_config).unwrap();
    for &candidate in &retention_config.candidates {
        let c = simulate_cost(&fit.weights, candidate, &cost_model, &retention_config).unwrap();
        assert!(best_cost <= c + 1e-9, "{best} costs {best_cost}, {candidate} costs {c}");
    }
}

#[test]
fn test_baseline_record_shape() {
    let logs = corpus();
    let optimizer = Optimizer::new(OptimizerConfig {
        epochs: 1,
        ..config()
    })
    .unwrap();
    let fit = optimizer.fit(&logs, Weights::default()).unwrap();
    let baseline = OptimizerBaseline {
        true_parameters: TestDataFactory::true_weights(),
        optimized_parameters: fit.weights,
        batch_loss: fit.loss,
        default_loss: optimizer.batch_loss(&Weights::default(), &logs).unwrap(),
        optimal_retention: None,
    };

    let json = serde_json::to_value(&baseline).unwrap();
    assert_eq!(json["true_parameters"].as_array().unwrap().len(), 21);
    assert_eq!(json["optimized_parameters"].as_array().unwrap().len(), 21);
    assert!(json["optimal_retention"].is_null());
    let back: OptimizerBaseline = serde_json::from_value(json).unwrap();
    assert_eq!(back, baseline);
}
