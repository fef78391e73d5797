// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

use approx::assert_relative_eq;
use wse_evaluator::config::{EvaluatorConfig, EvaluatorKind};
use wse_evaluator::dataset::SampleGraph;
use wse_evaluator::lp::LpEvaluator;
use wse_evaluator::surrogate::{OraclePredictor, SurrogateEvaluator, SurrogatePredictor};
use wse_evaluator::types::EvalError;
use wse_evaluator::{LatencyEvaluator, build_evaluator};

mod common;
use common::pipeline;

struct FixedPredictor(f64);

impl SurrogatePredictor for FixedPredictor {
    fn predict(&self, _sample: &SampleGraph) -> Result<f64, EvalError> {
        Ok(self.0)
    }
}

#[test]
fn oracle_matches_lp() {
    let (graph, mapper, workload) = pipeline();
    let lp = LpEvaluator::new(&graph, &mapper, &workload).unwrap();
    let oracle = OraclePredictor::new(&graph, &mapper, &workload).unwrap();
    let surrogate =
        SurrogateEvaluator::new(&graph, &mapper, &workload, Box::new(oracle)).unwrap();

    assert_relative_eq!(
        surrogate.total_latency().unwrap(),
        lp.total_latency().unwrap(),
        max_relative = 1e-3
    );
    assert_relative_eq!(
        surrogate.bottleneck_frequency().unwrap(),
        250.0,
        max_relative = 1e-3
    );
}

#[test]
fn prediction_scales_latency() {
    let (graph, mapper, workload) = pipeline();
    let surrogate =
        SurrogateEvaluator::new(&graph, &mapper, &workload, Box::new(FixedPredictor(2.0)))
            .unwrap();

    // Reticle 0 is the first task on the hottest link and sends 3MB
    let iteration = 2.0 * 3_000_001.0 / 1e9;
    assert_relative_eq!(
        surrogate.iteration_latency().unwrap(),
        iteration,
        max_relative = 1e-12
    );
    assert_relative_eq!(
        surrogate.total_latency().unwrap(),
        2.0 * iteration,
        max_relative = 1e-12
    );
}

#[test]
fn invalid_prediction() {
    let (graph, mapper, workload) = pipeline();
    let surrogate = SurrogateEvaluator::new(
        &graph,
        &mapper,
        &workload,
        Box::new(FixedPredictor(f64::NAN)),
    )
    .unwrap();
    assert!(matches!(
        surrogate.total_latency(),
        Err(EvalError::Prediction(_))
    ));
}

#[test]
fn evaluator_from_config() {
    let (graph, mapper, workload) = pipeline();

    let mut config = EvaluatorConfig::default();
    let lp = build_evaluator(&config, &graph, &mapper, &workload, None).unwrap();
    assert_eq!(lp.name(), "lp");

    config.evaluator = EvaluatorKind::Surrogate;
    let oracle = build_evaluator(&config, &graph, &mapper, &workload, None).unwrap();
    assert_eq!(oracle.name(), "surrogate");
    assert_relative_eq!(
        oracle.total_latency().unwrap(),
        lp.total_latency().unwrap(),
        max_relative = 1e-3
    );

    let fixed = build_evaluator(
        &config,
        &graph,
        &mapper,
        &workload,
        Some(Box::new(FixedPredictor(1.0))),
    )
    .unwrap();
    assert_relative_eq!(
        fixed.total_latency().unwrap(),
        2.0 * 3_000_001.0 / 1e9,
        max_relative = 1e-12
    );
}
