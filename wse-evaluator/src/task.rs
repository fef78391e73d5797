// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! Workload description: the tasks to be evaluated and the mapping of their
//! virtual reticle identities onto LP variables.
//!
//! A workload file is a YAML list of tasks, each with a `kind`:
//!
//! ```yaml
//! tasks:
//!   - kind: compute
//!     virtual_reticle_id: 0
//!     compute_amount: 1.0e9
//!   - kind: fused
//!     subtasks:
//!       - kind: dram_access
//!         virtual_reticle_id: 0
//!         virtual_dram_port: 3
//!         access_type: read
//!         data_amount: 4MB
//!       - kind: peer_access
//!         virtual_reticle_id: 0
//!         peer_virtual_reticle_id: 1
//!         access_type: write
//!         data_amount: 1MiB
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use wse_hardware::mapper::AccessType;
use wse_hardware::types::parse_rate;

use crate::eval_error;
use crate::types::{EvalError, EvalResult};

/// Index of a task variable in the linear program.
pub type TaskVar = usize;

const TASK_KINDS: [&str; 4] = ["compute", "dram_access", "peer_access", "fused"];

fn one() -> u64 {
    1
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ComputeTask {
    pub virtual_reticle_id: usize,

    /// Number of operations
    pub compute_amount: f64,

    #[serde(default = "one")]
    pub repeated_times: u64,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DramAccessTask {
    pub virtual_reticle_id: usize,
    pub virtual_dram_port: usize,
    pub access_type: AccessType,

    /// Number of bytes moved
    #[serde(deserialize_with = "parse_rate")]
    pub data_amount: f64,

    #[serde(default = "one")]
    pub repeated_times: u64,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PeerAccessTask {
    pub virtual_reticle_id: usize,
    pub peer_virtual_reticle_id: usize,
    pub access_type: AccessType,

    /// Number of bytes moved
    #[serde(deserialize_with = "parse_rate")]
    pub data_amount: f64,

    #[serde(default = "one")]
    pub repeated_times: u64,
}

/// Tasks executed together by the same reticle.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FusedTask {
    pub subtasks: Vec<Task>,

    #[serde(default = "one")]
    pub repeated_times: u64,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Task {
    Compute(ComputeTask),
    DramAccess(DramAccessTask),
    PeerAccess(PeerAccessTask),
    Fused(FusedTask),
}

/// A task which places demand directly on resources.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LeafTask<'a> {
    Compute(&'a ComputeTask),
    DramAccess(&'a DramAccessTask),
    PeerAccess(&'a PeerAccessTask),
}

impl LeafTask<'_> {
    #[must_use]
    pub fn virtual_reticle_id(&self) -> usize {
        match self {
            LeafTask::Compute(t) => t.virtual_reticle_id,
            LeafTask::DramAccess(t) => t.virtual_reticle_id,
            LeafTask::PeerAccess(t) => t.virtual_reticle_id,
        }
    }
}

impl Task {
    #[must_use]
    pub fn repeated_times(&self) -> u64 {
        match self {
            Task::Compute(t) => t.repeated_times,
            Task::DramAccess(t) => t.repeated_times,
            Task::PeerAccess(t) => t.repeated_times,
            Task::Fused(t) => t.repeated_times,
        }
    }

    /// Expand fused tasks (recursively) into the tasks they are made of.
    #[must_use]
    pub fn unfuse(&self) -> Vec<LeafTask<'_>> {
        let mut leaves = Vec::new();
        self.collect_leaves(&mut leaves);
        leaves
    }

    fn collect_leaves<'a>(&'a self, leaves: &mut Vec<LeafTask<'a>>) {
        match self {
            Task::Compute(t) => leaves.push(LeafTask::Compute(t)),
            Task::DramAccess(t) => leaves.push(LeafTask::DramAccess(t)),
            Task::PeerAccess(t) => leaves.push(LeafTask::PeerAccess(t)),
            Task::Fused(t) => {
                for subtask in &t.subtasks {
                    subtask.collect_leaves(leaves);
                }
            }
        }
    }

    fn validate(&self, path: &str, errors: &mut Vec<String>) {
        if self.repeated_times() == 0 {
            errors.push(format!("Task {path}: repeated_times must be at least 1"));
        }
        let (name, amount) = match self {
            Task::Compute(t) => ("compute_amount", t.compute_amount),
            Task::DramAccess(t) => ("data_amount", t.data_amount),
            Task::PeerAccess(t) => ("data_amount", t.data_amount),
            Task::Fused(t) => {
                if t.subtasks.is_empty() {
                    errors.push(format!("Task {path}: fused task has no subtasks"));
                }
                for (i, subtask) in t.subtasks.iter().enumerate() {
                    subtask.validate(&format!("{path}.{i}"), errors);
                }
                return;
            }
        };
        if !(amount.is_finite() && amount >= 0.0) {
            errors.push(format!(
                "Task {path}: {name} must be a non-negative number, got {amount}"
            ));
        }
    }
}

/// Reject any task whose `kind` is not known before handing the document to
/// serde, so that the failure can be reported as an unsupported task.
fn check_task_kinds(tasks: &Value, path: &str) -> EvalResult {
    let Some(tasks) = tasks.as_sequence() else {
        return Ok(());
    };
    for (i, task) in tasks.iter().enumerate() {
        let task_path = if path.is_empty() {
            i.to_string()
        } else {
            format!("{path}.{i}")
        };
        let Some(kind) = task.get("kind") else {
            continue;
        };
        match kind.as_str() {
            Some(kind) if TASK_KINDS.contains(&kind) => {}
            Some(kind) => return eval_error!(UnsupportedTask, "'{kind}' (task {task_path})"),
            None => return eval_error!(UnsupportedTask, "{kind:?} (task {task_path})"),
        }
        if let Some(subtasks) = task.get("subtasks") {
            check_task_kinds(subtasks, &task_path)?;
        }
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Workload {
    pub tasks: Vec<Task>,
}

impl Workload {
    pub fn new(tasks: Vec<Task>) -> Result<Self, EvalError> {
        let workload = Self { tasks };
        workload.validate()?;
        Ok(workload)
    }

    pub fn from_file(workload_path: &Path) -> Result<Self, EvalError> {
        let s = std::fs::read_to_string(workload_path).map_err(|e| {
            EvalError::InvalidWorkload(format!("Unable to read {}: {e}", workload_path.display()))
        })?;
        Self::from_string(&s)
    }

    pub fn from_string(workload_str: &str) -> Result<Self, EvalError> {
        let value: Value = serde_yaml::from_str(workload_str)
            .map_err(|e| EvalError::InvalidWorkload(format!("serde_yaml::from_str failed: {e}")))?;
        if let Some(tasks) = value.get("tasks") {
            check_task_kinds(tasks, "")?;
        }
        let workload: Workload = serde_yaml::from_value(value).map_err(|e| {
            EvalError::InvalidWorkload(format!("serde_yaml::from_value failed: {e}"))
        })?;
        workload.validate()?;
        Ok(workload)
    }

    pub fn validate(&self) -> EvalResult {
        let mut errors = Vec::new();
        if self.tasks.is_empty() {
            errors.push("No tasks to bound the frequency".to_string());
        }
        for (i, task) in self.tasks.iter().enumerate() {
            task.validate(&i.to_string(), &mut errors);
        }

        if !errors.is_empty() {
            return eval_error!(
                InvalidWorkload,
                "Failed to validate workload:\n{}",
                errors.join("\n")
            );
        }
        Ok(())
    }

    /// Number of times the whole workload is executed.
    #[must_use]
    pub fn repeated_times(&self) -> u64 {
        self.tasks
            .iter()
            .map(Task::repeated_times)
            .max()
            .unwrap_or(1)
    }

    /// Every task with fused tasks expanded, in workload order.
    #[must_use]
    pub fn leaves(&self) -> Vec<LeafTask<'_>> {
        self.tasks.iter().flat_map(Task::unfuse).collect()
    }
}

/// Bijection between the virtual reticles used by a workload and the LP
/// variables `0..n`.
///
/// Variables are assigned in ascending virtual reticle id order.
#[derive(Clone, Debug, PartialEq)]
pub struct VariableIndex {
    var_by_reticle: BTreeMap<usize, TaskVar>,
    reticles: Vec<usize>,
}

impl VariableIndex {
    #[must_use]
    pub fn new(workload: &Workload) -> Self {
        let reticles: Vec<usize> = workload
            .leaves()
            .iter()
            .map(LeafTask::virtual_reticle_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let var_by_reticle = reticles
            .iter()
            .enumerate()
            .map(|(var, vrid)| (*vrid, var))
            .collect();
        Self {
            var_by_reticle,
            reticles,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.reticles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reticles.is_empty()
    }

    pub fn var(&self, virtual_reticle_id: usize) -> Result<TaskVar, EvalError> {
        match self.var_by_reticle.get(&virtual_reticle_id) {
            Some(var) => Ok(*var),
            None => eval_error!(
                InvalidWorkload,
                "Virtual reticle {virtual_reticle_id} is not used by the workload"
            ),
        }
    }

    /// Virtual reticle id of an LP variable.
    #[must_use]
    pub fn virtual_reticle_id(&self, var: TaskVar) -> usize {
        self.reticles[var]
    }

    pub fn virtual_reticle_ids(&self) -> impl Iterator<Item = usize> + '_ {
        self.reticles.iter().copied()
    }
}
