// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! Utilisation and payload reports over an annotated graph.

use std::fmt;

use serde::Serialize;
use wse_hardware::Coordinate;

use crate::annotate::{AnnotatedGraph, DemandMark};
use crate::task::VariableIndex;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceClass {
    Compute,
    InterReticle,
    Dram,
}

impl fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ResourceClass::Compute => write!(f, "compute"),
            ResourceClass::InterReticle => write!(f, "inter-reticle"),
            ResourceClass::Dram => write!(f, "DRAM"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Reticle(Coordinate),
    DramPort(Coordinate),
    Link(Coordinate, Coordinate),
}

impl Resource {
    #[must_use]
    pub fn class(&self) -> ResourceClass {
        match self {
            Resource::Reticle(_) => ResourceClass::Compute,
            Resource::DramPort(_) => ResourceClass::Dram,
            Resource::Link(_, _) => ResourceClass::InterReticle,
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Resource::Reticle(c) => write!(f, "reticle {c}"),
            Resource::DramPort(c) => write!(f, "DRAM port {c}"),
            Resource::Link(from, to) => write!(f, "link {from} -> {to}"),
        }
    }
}

/// Share of a resource taken by one task.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TaskUtilization {
    pub virtual_reticle_id: usize,
    pub utilization: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResourceUtilization {
    pub resource: Resource,
    pub utilization: f64,
    pub per_task: Vec<TaskUtilization>,
}

/// Aggregate utilisation of every resource of one class, idle ones included.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct ClassUtilization {
    pub mean: f64,
    pub max: f64,
    pub count: usize,
}

impl ClassUtilization {
    fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        Self {
            mean: values.iter().sum::<f64>() / values.len() as f64,
            max: values.iter().copied().fold(0.0, f64::max),
            count: values.len(),
        }
    }
}

/// Utilisation of every resource at the bottleneck frequency.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UtilizationReport {
    pub frequency: f64,
    pub compute: ClassUtilization,
    pub inter_reticle: ClassUtilization,
    pub dram: ClassUtilization,

    /// Resources used by at least one task, ordered compute, DRAM, links
    pub resources: Vec<ResourceUtilization>,
}

fn resource_utilization(
    resource: Resource,
    mark: &DemandMark,
    capacity: f64,
    frequency: f64,
    vars: &VariableIndex,
) -> ResourceUtilization {
    let per_task = mark
        .iter()
        .map(|(var, amount)| TaskUtilization {
            virtual_reticle_id: vars.virtual_reticle_id(var),
            utilization: amount * frequency / capacity,
        })
        .collect();
    ResourceUtilization {
        resource,
        utilization: mark.total() * frequency / capacity,
        per_task,
    }
}

impl UtilizationReport {
    #[must_use]
    pub fn new(annotated: &AnnotatedGraph, vars: &VariableIndex, frequency: f64) -> Self {
        let graph = annotated.graph();
        let mut resources = Vec::new();
        let mut compute = Vec::new();
        let mut dram = Vec::new();
        let mut links = Vec::new();

        for node in graph.node_ids() {
            let coordinate = graph.coordinate(node);
            if let Some(capacity) = graph.compute_capacity(node) {
                match annotated.compute_mark(node) {
                    Some(mark) => {
                        let used = resource_utilization(
                            Resource::Reticle(coordinate),
                            mark,
                            capacity,
                            frequency,
                            vars,
                        );
                        compute.push(used.utilization);
                        resources.push(used);
                    }
                    None => compute.push(0.0),
                }
            }
        }
        for node in graph.node_ids() {
            let coordinate = graph.coordinate(node);
            if let Some(capacity) = graph.dram_capacity(node) {
                match annotated.dram_mark(node) {
                    Some(mark) => {
                        let used = resource_utilization(
                            Resource::DramPort(coordinate),
                            mark,
                            capacity,
                            frequency,
                            vars,
                        );
                        dram.push(used.utilization);
                        resources.push(used);
                    }
                    None => dram.push(0.0),
                }
            }
        }
        for link in graph.link_ids() {
            match annotated.transmission_mark(link) {
                Some(mark) => {
                    let (from, to) = graph.link_endpoints(link);
                    let used = resource_utilization(
                        Resource::Link(graph.coordinate(from), graph.coordinate(to)),
                        mark,
                        graph.link_capacity(link),
                        frequency,
                        vars,
                    );
                    links.push(used.utilization);
                    resources.push(used);
                }
                None => links.push(0.0),
            }
        }

        Self {
            frequency,
            compute: ClassUtilization::from_values(&compute),
            inter_reticle: ClassUtilization::from_values(&links),
            dram: ClassUtilization::from_values(&dram),
            resources,
        }
    }

    #[must_use]
    pub fn class(&self, class: ResourceClass) -> &ClassUtilization {
        match class {
            ResourceClass::Compute => &self.compute,
            ResourceClass::InterReticle => &self.inter_reticle,
            ResourceClass::Dram => &self.dram,
        }
    }

    /// Highest utilisation of any resource.
    #[must_use]
    pub fn max(&self) -> f64 {
        self.compute
            .max
            .max(self.inter_reticle.max)
            .max(self.dram.max)
    }

    /// The first of the most utilised resources.
    #[must_use]
    pub fn bottleneck(&self) -> Option<&ResourceUtilization> {
        let max = self.max();
        self.resources.iter().find(|r| r.utilization == max)
    }
}

impl fmt::Display for UtilizationReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Bottleneck frequency: {:e}/s", self.frequency)?;
        for class in [
            ResourceClass::Compute,
            ResourceClass::InterReticle,
            ResourceClass::Dram,
        ] {
            let u = self.class(class);
            writeln!(
                f,
                "  {:<14} mean {:>7.2}%  max {:>7.2}%  ({} resources)",
                format!("{class}:"),
                u.mean * 100.0,
                u.max * 100.0,
                u.count
            )?;
        }
        write!(f, "Used resources:")?;
        for used in &self.resources {
            write!(f, "\n  {}: {:.2}%", used.resource, used.utilization * 100.0)?;
            for task in &used.per_task {
                write!(
                    f,
                    "\n    task {}: {:.2}%",
                    task.virtual_reticle_id,
                    task.utilization * 100.0
                )?;
            }
        }
        Ok(())
    }
}

/// Total demand placed on each class of resource. Links count once per hop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct PayloadReport {
    /// Operations
    pub compute: f64,

    /// Bytes summed over every link crossed
    pub inter_reticle: f64,

    /// Bytes
    pub dram: f64,
}

impl PayloadReport {
    #[must_use]
    pub fn new(annotated: &AnnotatedGraph) -> Self {
        Self {
            compute: annotated.compute_marks().map(|(_, m)| m.total()).sum(),
            inter_reticle: annotated.transmission_marks().map(|(_, m)| m.total()).sum(),
            dram: annotated.dram_marks().map(|(_, m)| m.total()).sum(),
        }
    }
}

impl fmt::Display for PayloadReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Payload:")?;
        writeln!(f, "  compute:       {:e} ops", self.compute)?;
        writeln!(f, "  inter-reticle: {:e} bytes", self.inter_reticle)?;
        write!(f, "  DRAM:          {:e} bytes", self.dram)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_stats() {
        let u = ClassUtilization::from_values(&[0.0, 0.5, 1.0, 0.5]);
        assert_eq!(u.mean, 0.5);
        assert_eq!(u.max, 1.0);
        assert_eq!(u.count, 4);
        assert_eq!(ClassUtilization::from_values(&[]), ClassUtilization::default());
    }
}
