// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! Bottleneck frequency linear program.
//!
//! With one variable `f_i` per task variable and a global frequency `f`:
//!
//! ```txt
//! maximise   f
//! subject to sum_i (demand_r[i] / capacity_r) * f_i <= 1   for each resource r
//!            f - f_i <= 0                                  for each task i
//!            f, f_i >= 0
//! ```

use log::debug;
use minilp::{ComparisonOp, LinearExpr, OptimizationDirection, Problem};

use crate::annotate::{AnnotatedGraph, DemandMark};
use crate::eval_error;
use crate::task::{TaskVar, VariableIndex};
use crate::types::EvalError;

/// One capacity constraint: `(variable, coefficient)` pairs.
pub type CapacityRow = Vec<(TaskVar, f64)>;

#[derive(Debug, Clone, PartialEq)]
pub struct LpProgram {
    num_task_vars: usize,
    rows: Vec<CapacityRow>,
}

fn capacity_row(mark: &DemandMark, capacity: f64) -> Option<CapacityRow> {
    let row: CapacityRow = mark
        .iter()
        .filter(|(_, amount)| *amount > 0.0)
        .map(|(var, amount)| (var, amount / capacity))
        .collect();
    if row.is_empty() { None } else { Some(row) }
}

impl LpProgram {
    /// Build one capacity row per used resource of `annotated`.
    ///
    /// Resources whose demand is all zero impose no constraint and are left
    /// out.
    pub fn formulate(
        annotated: &AnnotatedGraph,
        vars: &VariableIndex,
    ) -> Result<Self, EvalError> {
        if vars.is_empty() {
            return eval_error!(InvalidWorkload, "No tasks to bound the frequency");
        }

        let graph = annotated.graph();
        let mut rows = Vec::new();
        for (node, mark) in annotated.compute_marks() {
            if let Some(capacity) = graph.compute_capacity(*node)
                && let Some(row) = capacity_row(mark, capacity)
            {
                rows.push(row);
            }
        }
        for (node, mark) in annotated.dram_marks() {
            if let Some(capacity) = graph.dram_capacity(*node)
                && let Some(row) = capacity_row(mark, capacity)
            {
                rows.push(row);
            }
        }
        for (link, mark) in annotated.transmission_marks() {
            if let Some(row) = capacity_row(mark, graph.link_capacity(*link)) {
                rows.push(row);
            }
        }

        if rows.is_empty() {
            return eval_error!(
                DegenerateWorkload,
                "The workload places no demand on any resource"
            );
        }

        Ok(Self {
            num_task_vars: vars.len(),
            rows,
        })
    }

    #[must_use]
    pub fn num_task_vars(&self) -> usize {
        self.num_task_vars
    }

    /// Capacity rows, in the order compute, DRAM, links.
    #[must_use]
    pub fn capacity_rows(&self) -> &[CapacityRow] {
        &self.rows
    }

    /// Solve for the bottleneck frequency `f`.
    pub fn solve(&self) -> Result<f64, EvalError> {
        let mut problem = Problem::new(OptimizationDirection::Maximize);
        let task_vars: Vec<_> = (0..self.num_task_vars)
            .map(|_| problem.add_var(0.0, (0.0, f64::INFINITY)))
            .collect();
        let frequency = problem.add_var(1.0, (0.0, f64::INFINITY));

        for row in &self.rows {
            let mut expr = LinearExpr::empty();
            for (var, coefficient) in row {
                expr.add(task_vars[*var], *coefficient);
            }
            problem.add_constraint(expr, ComparisonOp::Le, 1.0);
        }
        for task_var in &task_vars {
            let mut expr = LinearExpr::empty();
            expr.add(frequency, 1.0);
            expr.add(*task_var, -1.0);
            problem.add_constraint(expr, ComparisonOp::Le, 0.0);
        }

        let solution = problem
            .solve()
            .map_err(|e| EvalError::Solver(format!("{e:?}")))?;
        let f = solution[frequency];
        debug!(
            "LP with {} task variables and {} capacity rows: f = {f:e}",
            self.num_task_vars,
            self.rows.len()
        );

        if !(f.is_finite() && f > 0.0) {
            return eval_error!(Solver, "Invalid bottleneck frequency {f}");
        }
        Ok(f)
    }
}

/// Build and solve the bottleneck frequency program for `annotated`.
pub fn solve(annotated: &AnnotatedGraph, vars: &VariableIndex) -> Result<f64, EvalError> {
    LpProgram::formulate(annotated, vars)?.solve()
}
