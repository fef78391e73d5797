// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! Error type shared by every evaluator operation.

use std::error::Error;
use std::fmt;

use wse_hardware::types::HwError;

use crate::report::UtilizationReport;

#[macro_export]
/// Build an `Err(EvalError::<kind>)` from a format string and arguments
macro_rules! eval_error {
    ($kind:ident, $($arg:tt)*) => {
        Err($crate::types::EvalError::$kind(format!($($arg)*)))
    };
}

#[derive(Debug, Clone)]
pub enum EvalError {
    /// Invalid hardware description, placement or resource lookup
    Hardware(HwError),

    /// Workload that cannot be parsed, fails validation or places no tasks
    InvalidWorkload(String),

    /// Task `kind` that the evaluator does not know how to annotate
    UnsupportedTask(String),

    /// Query that is undefined for the workload, e.g. no active link
    DegenerateWorkload(String),

    /// The linear program could not be solved
    Solver(String),

    /// The surrogate predictor returned an unusable value
    Prediction(String),

    /// The flit level latency of `task` disagrees with the LP latency
    Inconsistent {
        task: usize,
        estimated: f64,
        ground_truth: f64,
        utilization: Box<UtilizationReport>,
    },

    /// Evaluator settings could not be loaded
    Config(String),
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EvalError::Hardware(e) => write!(f, "{e}"),
            EvalError::InvalidWorkload(msg) => write!(f, "Error: invalid workload: {msg}"),
            EvalError::UnsupportedTask(msg) => write!(f, "Error: unsupported task kind {msg}"),
            EvalError::DegenerateWorkload(msg) => write!(f, "Error: degenerate workload: {msg}"),
            EvalError::Solver(msg) => write!(f, "Error: LP solver failed: {msg}"),
            EvalError::Prediction(msg) => write!(f, "Error: surrogate prediction: {msg}"),
            EvalError::Inconsistent {
                task,
                estimated,
                ground_truth,
                utilization,
            } => {
                let ape = (estimated - ground_truth).abs() / ground_truth;
                writeln!(
                    f,
                    "Error: latency of task {task} reconstructed from flits ({estimated:e}s) \
                     differs from the LP latency ({ground_truth:e}s) by {:.2}%",
                    ape * 100.0
                )?;
                write!(f, "{utilization}")
            }
            EvalError::Config(msg) => write!(f, "Error: configuration: {msg}"),
        }
    }
}

impl Error for EvalError {}

impl From<HwError> for EvalError {
    fn from(e: HwError) -> Self {
        EvalError::Hardware(e)
    }
}

pub type EvalResult = Result<(), EvalError>;
