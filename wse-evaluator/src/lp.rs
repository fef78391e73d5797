// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! Exact evaluation through the bottleneck frequency linear program.

use log::debug;
use wse_hardware::ResourceGraph;
use wse_hardware::mapper::Mapper;

use crate::LatencyEvaluator;
use crate::annotate::AnnotatedGraph;
use crate::config::DEFAULT_CONSISTENCY_TOLERANCE;
use crate::context::EvaluationContext;
use crate::dataset::{
    HeteroGraph, TrainingSample, flits_per_service, hetero_graph, hottest_link_vars,
    reconstructed_latency, sample_graph,
};
use crate::report::{PayloadReport, UtilizationReport};
use crate::solver::solve;
use crate::task::Workload;
use crate::types::EvalError;

pub struct LpEvaluator<'a> {
    ctx: EvaluationContext<'a>,
    tolerance: f64,
}

impl<'a> LpEvaluator<'a> {
    pub fn new(
        graph: &'a ResourceGraph,
        mapper: &'a dyn Mapper,
        workload: &'a Workload,
    ) -> Result<Self, EvalError> {
        Ok(Self {
            ctx: EvaluationContext::new(graph, mapper, workload)?,
            tolerance: DEFAULT_CONSISTENCY_TOLERANCE,
        })
    }

    /// Set the largest relative error allowed between the latency rebuilt
    /// from a training sample and the LP latency.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    #[must_use]
    pub fn context(&self) -> &EvaluationContext<'a> {
        &self.ctx
    }

    fn annotate_and_solve(&self) -> Result<(AnnotatedGraph<'a>, f64), EvalError> {
        let annotated = self.ctx.annotate()?;
        let frequency = solve(&annotated, self.ctx.variables())?;
        Ok((annotated, frequency))
    }

    /// Utilisation of every resource at the bottleneck frequency.
    pub fn utilization_report(&self) -> Result<UtilizationReport, EvalError> {
        let (annotated, frequency) = self.annotate_and_solve()?;
        Ok(UtilizationReport::new(
            &annotated,
            self.ctx.variables(),
            frequency,
        ))
    }

    pub fn payload_report(&self) -> Result<PayloadReport, EvalError> {
        self.ctx.payload_report()
    }

    pub fn hottest_link_tasks(&self) -> Result<Vec<usize>, EvalError> {
        self.ctx.hottest_link_tasks()
    }

    pub fn hetero_graph(&self) -> Result<HeteroGraph, EvalError> {
        let (annotated, frequency) = self.annotate_and_solve()?;
        hetero_graph(&annotated, self.ctx.variables(), frequency)
    }

    /// The exact flits-per-service label of one task, without checking that
    /// it rebuilds the LP latency.
    pub fn flits_per_service(&self, virtual_reticle_id: usize) -> Result<f64, EvalError> {
        let (annotated, frequency) = self.annotate_and_solve()?;
        Ok(self
            .unchecked_sample(&annotated, frequency, virtual_reticle_id)?
            .label)
    }

    /// The labelled graph around one task.
    ///
    /// Fails with [EvalError::Inconsistent] when the latency rebuilt from the
    /// label is not within tolerance of the LP latency.
    pub fn localized_sample(&self, virtual_reticle_id: usize) -> Result<TrainingSample, EvalError> {
        let (annotated, frequency) = self.annotate_and_solve()?;
        self.labelled_sample(&annotated, frequency, virtual_reticle_id)
    }

    /// One sample for each task on the link carrying the most data.
    pub fn training_samples(&self) -> Result<Vec<TrainingSample>, EvalError> {
        let (annotated, frequency) = self.annotate_and_solve()?;
        let mut samples = Vec::new();
        for var in hottest_link_vars(&annotated)? {
            let virtual_reticle_id = self.ctx.variables().virtual_reticle_id(var);
            samples.push(self.labelled_sample(&annotated, frequency, virtual_reticle_id)?);
        }
        Ok(samples)
    }

    fn unchecked_sample(
        &self,
        annotated: &AnnotatedGraph,
        frequency: f64,
        virtual_reticle_id: usize,
    ) -> Result<TrainingSample, EvalError> {
        let vars = self.ctx.variables();
        let var = vars.var(virtual_reticle_id)?;
        let profile = self.ctx.task_profile(virtual_reticle_id)?;
        let graph = sample_graph(annotated, vars, var, &profile)?;
        let label = flits_per_service(
            annotated,
            var,
            graph.aux_latencies.num_total_flit,
            frequency,
        );
        Ok(TrainingSample { graph, label })
    }

    fn labelled_sample(
        &self,
        annotated: &AnnotatedGraph,
        frequency: f64,
        virtual_reticle_id: usize,
    ) -> Result<TrainingSample, EvalError> {
        let sample = self.unchecked_sample(annotated, frequency, virtual_reticle_id)?;
        let label = sample.label;

        let clock = self.ctx.graph().clock_frequency();
        let estimated = reconstructed_latency(&sample.graph.aux_latencies, label, clock);
        let ground_truth = 1.0 / frequency;
        let ape = (estimated - ground_truth).abs() / ground_truth;
        debug!(
            "Task {virtual_reticle_id}: label {label:.4}, latency {estimated:e}s vs {ground_truth:e}s"
        );
        if ape > self.tolerance {
            return Err(EvalError::Inconsistent {
                task: virtual_reticle_id,
                estimated,
                ground_truth,
                utilization: Box::new(UtilizationReport::new(
                    annotated,
                    self.ctx.variables(),
                    frequency,
                )),
            });
        }

        Ok(sample)
    }
}

impl LatencyEvaluator for LpEvaluator<'_> {
    fn name(&self) -> &'static str {
        "lp"
    }

    fn bottleneck_frequency(&self) -> Result<f64, EvalError> {
        Ok(self.annotate_and_solve()?.1)
    }

    fn total_latency(&self) -> Result<f64, EvalError> {
        let frequency = self.bottleneck_frequency()?;
        Ok(self.ctx.workload().repeated_times() as f64 / frequency)
    }
}
