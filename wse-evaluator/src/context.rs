// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! The inputs shared by every evaluator and the queries which do not need a
//! solved frequency.

use wse_hardware::ResourceGraph;
use wse_hardware::mapper::Mapper;

use crate::annotate::{AnnotatedGraph, annotate};
use crate::dataset::{TaskProfile, hottest_link_vars};
use crate::report::PayloadReport;
use crate::task::{VariableIndex, Workload};
use crate::types::EvalError;

/// A workload mapped onto a wafer.
///
/// The [VariableIndex] is fixed when the context is created. Every query
/// annotates the graph afresh, nothing is cached between calls.
pub struct EvaluationContext<'a> {
    graph: &'a ResourceGraph,
    mapper: &'a dyn Mapper,
    workload: &'a Workload,
    vars: VariableIndex,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(
        graph: &'a ResourceGraph,
        mapper: &'a dyn Mapper,
        workload: &'a Workload,
    ) -> Result<Self, EvalError> {
        workload.validate()?;
        let vars = VariableIndex::new(workload);
        Ok(Self {
            graph,
            mapper,
            workload,
            vars,
        })
    }

    #[must_use]
    pub fn graph(&self) -> &'a ResourceGraph {
        self.graph
    }

    #[must_use]
    pub fn workload(&self) -> &'a Workload {
        self.workload
    }

    #[must_use]
    pub fn variables(&self) -> &VariableIndex {
        &self.vars
    }

    pub fn annotate(&self) -> Result<AnnotatedGraph<'a>, EvalError> {
        annotate(self.graph, self.mapper, self.workload, &self.vars)
    }

    pub fn payload_report(&self) -> Result<PayloadReport, EvalError> {
        Ok(PayloadReport::new(&self.annotate()?))
    }

    /// Virtual reticle ids of the tasks on the link carrying the most data.
    pub fn hottest_link_tasks(&self) -> Result<Vec<usize>, EvalError> {
        let vars = hottest_link_vars(&self.annotate()?)?;
        Ok(vars
            .into_iter()
            .map(|var| self.vars.virtual_reticle_id(var))
            .collect())
    }

    pub fn task_profile(&self, virtual_reticle_id: usize) -> Result<TaskProfile, EvalError> {
        self.vars.var(virtual_reticle_id)?;
        TaskProfile::new(self.graph, self.mapper, self.workload, virtual_reticle_id)
    }
}
