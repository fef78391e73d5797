// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! Approximate evaluation using a learned model in place of the linear
//! program.
//!
//! Only the graph around the first task on the link carrying the most data
//! is given to the model. The predicted flits-per-service value is turned
//! back into a latency in the same way as a training label.

use log::debug;
use wse_hardware::ResourceGraph;
use wse_hardware::mapper::Mapper;

use crate::LatencyEvaluator;
use crate::context::EvaluationContext;
use crate::dataset::{SampleGraph, hottest_link_vars, reconstructed_latency, sample_graph};
use crate::eval_error;
use crate::lp::LpEvaluator;
use crate::task::Workload;
use crate::types::EvalError;

pub trait SurrogatePredictor {
    /// Predict the flits-per-service label of `sample`.
    fn predict(&self, sample: &SampleGraph) -> Result<f64, EvalError>;
}

/// A predictor which answers with the exact label.
pub struct OraclePredictor<'a> {
    lp: LpEvaluator<'a>,
}

impl<'a> OraclePredictor<'a> {
    pub fn new(
        graph: &'a ResourceGraph,
        mapper: &'a dyn Mapper,
        workload: &'a Workload,
    ) -> Result<Self, EvalError> {
        Ok(Self {
            lp: LpEvaluator::new(graph, mapper, workload)?,
        })
    }
}

impl SurrogatePredictor for OraclePredictor<'_> {
    fn predict(&self, sample: &SampleGraph) -> Result<f64, EvalError> {
        self.lp.flits_per_service(sample.task)
    }
}

pub struct SurrogateEvaluator<'a> {
    ctx: EvaluationContext<'a>,
    predictor: Box<dyn SurrogatePredictor + 'a>,
}

impl<'a> SurrogateEvaluator<'a> {
    pub fn new(
        graph: &'a ResourceGraph,
        mapper: &'a dyn Mapper,
        workload: &'a Workload,
        predictor: Box<dyn SurrogatePredictor + 'a>,
    ) -> Result<Self, EvalError> {
        Ok(Self {
            ctx: EvaluationContext::new(graph, mapper, workload)?,
            predictor,
        })
    }

    /// Latency of a single iteration of the workload.
    pub fn iteration_latency(&self) -> Result<f64, EvalError> {
        let annotated = self.ctx.annotate()?;
        let vars = self.ctx.variables();
        let Some(var) = hottest_link_vars(&annotated)?.first().copied() else {
            return eval_error!(DegenerateWorkload, "No task uses the hottest link");
        };
        let task = vars.virtual_reticle_id(var);
        let profile = self.ctx.task_profile(task)?;
        let sample = sample_graph(&annotated, vars, var, &profile)?;
        let prediction = self.predictor.predict(&sample)?;
        if !(prediction.is_finite() && prediction > 0.0) {
            return eval_error!(
                Prediction,
                "Invalid flits-per-service {prediction} for task {task}"
            );
        }

        let latency = reconstructed_latency(
            &sample.aux_latencies,
            prediction,
            self.ctx.graph().clock_frequency(),
        );
        debug!("Task {task}: predicted {prediction:.4} flits per service, latency {latency:e}s");
        Ok(latency)
    }
}

impl LatencyEvaluator for SurrogateEvaluator<'_> {
    fn name(&self) -> &'static str {
        "surrogate"
    }

    fn bottleneck_frequency(&self) -> Result<f64, EvalError> {
        Ok(1.0 / self.iteration_latency()?)
    }

    fn total_latency(&self) -> Result<f64, EvalError> {
        Ok(self.iteration_latency()? * self.ctx.workload().repeated_times() as f64)
    }
}
