// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! Attach the demand of each task to the resources it uses.
//!
//! The [ResourceGraph] itself is never modified. Demand is recorded in a
//! [DemandOverlay] of sparse maps keyed by [NodeId]/[LinkId] which is built
//! from scratch for every query.

use std::collections::BTreeMap;
use std::collections::btree_map;

use log::trace;
use wse_hardware::mapper::{Mapper, RouteTarget};
use wse_hardware::types::HwError;
use wse_hardware::{LinkId, NodeId, ResourceGraph};

use crate::task::{LeafTask, TaskVar, VariableIndex, Workload};
use crate::types::EvalError;

/// Demand placed on one resource, per task variable.
///
/// Only resources used by at least one task have a mark.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DemandMark(BTreeMap<TaskVar, f64>);

impl DemandMark {
    pub fn add(&mut self, var: TaskVar, amount: f64) {
        *self.0.entry(var).or_insert(0.0) += amount;
    }

    #[must_use]
    pub fn get(&self, var: TaskVar) -> Option<f64> {
        self.0.get(&var).copied()
    }

    #[must_use]
    pub fn contains(&self, var: TaskVar) -> bool {
        self.0.contains_key(&var)
    }

    #[must_use]
    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `(variable, demand)` pairs in variable order.
    pub fn iter(&self) -> impl Iterator<Item = (TaskVar, f64)> + '_ {
        self.0.iter().map(|(var, amount)| (*var, *amount))
    }
}

#[derive(Debug, Default)]
pub struct DemandOverlay {
    pub compute: BTreeMap<NodeId, DemandMark>,
    pub dram: BTreeMap<NodeId, DemandMark>,
    pub transmission: BTreeMap<LinkId, DemandMark>,
}

/// A [ResourceGraph] together with the demand of one workload.
pub struct AnnotatedGraph<'a> {
    graph: &'a ResourceGraph,
    overlay: DemandOverlay,
}

impl<'a> AnnotatedGraph<'a> {
    #[must_use]
    pub fn new(graph: &'a ResourceGraph, overlay: DemandOverlay) -> Self {
        Self { graph, overlay }
    }

    #[must_use]
    pub fn graph(&self) -> &'a ResourceGraph {
        self.graph
    }

    #[must_use]
    pub fn compute_mark(&self, node: NodeId) -> Option<&DemandMark> {
        self.overlay.compute.get(&node)
    }

    #[must_use]
    pub fn dram_mark(&self, node: NodeId) -> Option<&DemandMark> {
        self.overlay.dram.get(&node)
    }

    #[must_use]
    pub fn transmission_mark(&self, link: LinkId) -> Option<&DemandMark> {
        self.overlay.transmission.get(&link)
    }

    pub fn compute_marks(&self) -> btree_map::Iter<'_, NodeId, DemandMark> {
        self.overlay.compute.iter()
    }

    pub fn dram_marks(&self) -> btree_map::Iter<'_, NodeId, DemandMark> {
        self.overlay.dram.iter()
    }

    /// Links carrying data, in link order.
    pub fn transmission_marks(&self) -> btree_map::Iter<'_, LinkId, DemandMark> {
        self.overlay.transmission.iter()
    }
}

/// Record `amount` of demand by `var` on `key`. Zero demand leaves no mark.
fn mark<K: Ord>(marks: &mut BTreeMap<K, DemandMark>, key: K, var: TaskVar, amount: f64) {
    if amount > 0.0 {
        marks.entry(key).or_default().add(var, amount);
    }
}

fn require_compute(graph: &ResourceGraph, node: NodeId) -> Result<(), HwError> {
    if graph.compute_capacity(node).is_none() {
        return Err(HwError(format!(
            "Node {} has no compute resource",
            graph.coordinate(node)
        )));
    }
    Ok(())
}

fn require_dram(graph: &ResourceGraph, node: NodeId) -> Result<(), HwError> {
    if graph.dram_capacity(node).is_none() {
        return Err(HwError(format!(
            "Node {} has no DRAM port",
            graph.coordinate(node)
        )));
    }
    Ok(())
}

/// Resolve every task of `workload` through `mapper` and accumulate its demand
/// onto the resources of `graph`.
pub fn annotate<'a>(
    graph: &'a ResourceGraph,
    mapper: &dyn Mapper,
    workload: &Workload,
    vars: &VariableIndex,
) -> Result<AnnotatedGraph<'a>, EvalError> {
    let mut overlay = DemandOverlay::default();

    for leaf in workload.leaves() {
        let var = vars.var(leaf.virtual_reticle_id())?;
        let reticle = mapper.physical_reticle(leaf.virtual_reticle_id())?;
        match leaf {
            LeafTask::Compute(task) => {
                let node = graph.node_idx(reticle)?;
                require_compute(graph, node)?;
                trace!(
                    "compute: reticle {} at {reticle} += {}",
                    task.virtual_reticle_id, task.compute_amount
                );
                mark(&mut overlay.compute, node, var, task.compute_amount);
            }
            LeafTask::DramAccess(task) => {
                let port = mapper.physical_dram_port(task.virtual_dram_port)?;
                let node = graph.node_idx(port)?;
                require_dram(graph, node)?;
                mark(&mut overlay.dram, node, var, task.data_amount);

                let route =
                    mapper.routing_path(reticle, port, task.access_type, RouteTarget::Dram)?;
                trace!(
                    "dram {}: reticle {} at {reticle}, port {port}, {} bytes over {} links",
                    task.access_type,
                    task.virtual_reticle_id,
                    task.data_amount,
                    route.len()
                );
                for (from, to) in route {
                    let link = graph.link_idx(from, to)?;
                    mark(&mut overlay.transmission, link, var, task.data_amount);
                }
            }
            LeafTask::PeerAccess(task) => {
                let peer = mapper.physical_reticle(task.peer_virtual_reticle_id)?;
                let route =
                    mapper.routing_path(reticle, peer, task.access_type, RouteTarget::Peer)?;
                trace!(
                    "peer {}: reticle {} at {reticle}, peer at {peer}, {} bytes over {} links",
                    task.access_type,
                    task.virtual_reticle_id,
                    task.data_amount,
                    route.len()
                );
                for (from, to) in route {
                    let link = graph.link_idx(from, to)?;
                    mark(&mut overlay.transmission, link, var, task.data_amount);
                }
            }
        }
    }

    Ok(AnnotatedGraph::new(graph, overlay))
}
