// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! Throughput of a workload mapped onto a wafer-scale engine.
//!
//! The demand of every task is attached to the resources of a
//! [ResourceGraph] ([annotate](annotate::annotate)). A linear program then
//! finds the bottleneck frequency: the highest rate at which the whole
//! workload can be repeated without any compute, DRAM or link resource being
//! oversubscribed ([solver]).
//!
//! From the same annotated graph the crate derives utilisation and payload
//! reports ([report]) and graph datasets used to train a surrogate model
//! ([dataset]). A trained model can be used through
//! [SurrogateEvaluator](surrogate::SurrogateEvaluator) in place of the linear
//! program.
//!
//! # Example
//!
//! ```rust
//! use wse_evaluator::LatencyEvaluator;
//! use wse_evaluator::lp::LpEvaluator;
//! use wse_evaluator::task::Workload;
//! use wse_hardware::Coordinate;
//! use wse_hardware::test_helpers::{TableMapper, build_row};
//!
//! let graph = build_row(1, 50.0, None, 1e9).unwrap();
//! let mapper = TableMapper::new().with_reticle(0, Coordinate::new(0, 0));
//! let workload = Workload::from_string(
//!     "
//! tasks:
//!   - kind: compute
//!     virtual_reticle_id: 0
//!     compute_amount: 100
//!     repeated_times: 4
//! ",
//! )
//! .unwrap();
//!
//! let evaluator = LpEvaluator::new(&graph, &mapper, &workload).unwrap();
//! let frequency = evaluator.bottleneck_frequency().unwrap();
//! assert!((frequency - 0.5).abs() < 1e-9);
//! ```

use wse_hardware::ResourceGraph;
use wse_hardware::mapper::Mapper;

use crate::config::{EvaluatorConfig, EvaluatorKind};
use crate::lp::LpEvaluator;
use crate::surrogate::{OraclePredictor, SurrogateEvaluator, SurrogatePredictor};
use crate::task::Workload;
use crate::types::EvalError;

pub mod annotate;
pub mod config;
pub mod context;
pub mod dataset;
pub mod lp;
pub mod report;
pub mod solver;
pub mod surrogate;
pub mod task;
pub mod types;

/// Anything that can estimate how fast a workload runs.
pub trait LatencyEvaluator {
    fn name(&self) -> &'static str;

    /// Rate (per second) at which one iteration of the workload completes.
    fn bottleneck_frequency(&self) -> Result<f64, EvalError>;

    /// Seconds to run every repetition of the workload.
    fn total_latency(&self) -> Result<f64, EvalError>;
}

/// Create the evaluator selected by `config`.
///
/// A surrogate evaluator uses `predictor`, or an [OraclePredictor] if none is
/// given.
pub fn build_evaluator<'a>(
    config: &EvaluatorConfig,
    graph: &'a ResourceGraph,
    mapper: &'a dyn Mapper,
    workload: &'a Workload,
    predictor: Option<Box<dyn SurrogatePredictor + 'a>>,
) -> Result<Box<dyn LatencyEvaluator + 'a>, EvalError> {
    config.validate()?;
    match config.evaluator {
        EvaluatorKind::Lp => Ok(Box::new(
            LpEvaluator::new(graph, mapper, workload)?
                .with_tolerance(config.consistency_tolerance),
        )),
        EvaluatorKind::Surrogate => {
            let predictor = match predictor {
                Some(predictor) => predictor,
                None => Box::new(OraclePredictor::new(graph, mapper, workload)?),
            };
            Ok(Box::new(SurrogateEvaluator::new(
                graph, mapper, workload, predictor,
            )?))
        }
    }
}
