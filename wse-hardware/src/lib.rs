// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! Hardware description of a wafer-scale engine.
//!
//! The [ResourceGraph] is a directed graph of physical coordinates. Each node
//! may carry a [ComputeSlot] (a reticle) and/or a [DramSlot] (a DRAM port) and
//! each directed edge is a link with a [LinkSlot]. The graph is built once per
//! hardware configuration and is never modified by evaluation; per-query
//! demand is kept in separate overlays keyed by [NodeId]/[LinkId].
//!
//! Workloads refer to reticles and DRAM ports through virtual identities which
//! are resolved by a [Mapper](crate::mapper::Mapper).

use std::collections::HashMap;
use std::fmt::{self, Display};
use std::path::Path;

use petgraph::Direction;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use serde::{Deserialize, Serialize};

use crate::types::{HwError, WaferConfig};

pub mod builder;
pub mod mapper;
pub mod test_helpers;
pub mod types;

pub type NodeId = NodeIndex;
pub type LinkId = EdgeIndex;

/// A physical location on the wafer.
///
/// `x` indexes rows of the reticle array and `y` indexes columns. DRAM ports
/// surrounding the array sit at `-1` or one past the last row/column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(from = "(i32, i32)", into = "(i32, i32)")]
pub struct Coordinate {
    pub x: i32,
    pub y: i32,
}

impl Coordinate {
    #[must_use]
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for Coordinate {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

impl From<Coordinate> for (i32, i32) {
    fn from(c: Coordinate) -> Self {
        (c.x, c.y)
    }
}

impl Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Compute resource of a reticle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ComputeSlot {
    /// Operations per second
    pub capacity: f64,
}

/// Access bandwidth of a DRAM port.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DramSlot {
    /// Bytes per second
    pub capacity: f64,
}

/// Bandwidth of a directed link.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinkSlot {
    /// Bytes per second
    pub capacity: f64,
}

#[derive(Clone, Debug)]
pub struct ResourceNode {
    pub coordinate: Coordinate,
    pub compute: Option<ComputeSlot>,
    pub dram: Option<DramSlot>,
}

pub struct ResourceGraph {
    graph: DiGraph<ResourceNode, LinkSlot>,
    node_idx_by_coordinate: HashMap<Coordinate, NodeId>,
    clock_frequency: f64,
    flit_size: f64,
}

impl ResourceGraph {
    /// Create an empty graph.
    ///
    /// `clock_frequency` is in Hz and `flit_size` in bytes; both are used to
    /// quantise link transfers into flits.
    pub fn new(clock_frequency: f64, flit_size: f64) -> Result<Self, HwError> {
        if !(clock_frequency.is_finite() && clock_frequency > 0.0) {
            return hw_error!("Invalid clock frequency {clock_frequency}");
        }
        if !(flit_size.is_finite() && flit_size > 0.0) {
            return hw_error!("Invalid flit size {flit_size}");
        }
        Ok(Self {
            graph: DiGraph::new(),
            node_idx_by_coordinate: HashMap::new(),
            clock_frequency,
            flit_size,
        })
    }

    pub fn from_wafer_file(wafer_path: &Path) -> Result<Self, HwError> {
        let cfg = WaferConfig::from_file(wafer_path)?;
        builder::build_wafer_graph(&cfg)
    }

    pub fn from_wafer_string(wafer_config: &str) -> Result<Self, HwError> {
        let cfg = WaferConfig::from_string(wafer_config)?;
        builder::build_wafer_graph(&cfg)
    }

    pub fn add_node(
        &mut self,
        coordinate: Coordinate,
        compute: Option<ComputeSlot>,
        dram: Option<DramSlot>,
    ) -> Result<NodeId, HwError> {
        if self.node_idx_by_coordinate.contains_key(&coordinate) {
            return hw_error!("Duplicate node {coordinate}");
        }
        if let Some(slot) = &compute
            && !(slot.capacity.is_finite() && slot.capacity > 0.0)
        {
            return hw_error!("Node {coordinate}: invalid compute capacity {}", slot.capacity);
        }
        if let Some(slot) = &dram
            && !(slot.capacity.is_finite() && slot.capacity > 0.0)
        {
            return hw_error!("Node {coordinate}: invalid DRAM capacity {}", slot.capacity);
        }

        let idx = self.graph.add_node(ResourceNode {
            coordinate,
            compute,
            dram,
        });
        self.node_idx_by_coordinate.insert(coordinate, idx);
        Ok(idx)
    }

    pub fn add_link(
        &mut self,
        from: Coordinate,
        to: Coordinate,
        slot: LinkSlot,
    ) -> Result<LinkId, HwError> {
        let from_idx = self.node_idx(from)?;
        let to_idx = self.node_idx(to)?;
        if self.graph.find_edge(from_idx, to_idx).is_some() {
            return hw_error!("Duplicate link {from} -> {to}");
        }
        if !(slot.capacity.is_finite() && slot.capacity > 0.0) {
            return hw_error!("Link {from} -> {to}: invalid capacity {}", slot.capacity);
        }
        Ok(self.graph.add_edge(from_idx, to_idx, slot))
    }

    pub fn node_idx(&self, coordinate: Coordinate) -> Result<NodeId, HwError> {
        match self.node_idx_by_coordinate.get(&coordinate) {
            Some(idx) => Ok(*idx),
            None => hw_error!("No node at {coordinate}"),
        }
    }

    pub fn link_idx(&self, from: Coordinate, to: Coordinate) -> Result<LinkId, HwError> {
        let from_idx = self.node_idx(from)?;
        let to_idx = self.node_idx(to)?;
        match self.graph.find_edge(from_idx, to_idx) {
            Some(idx) => Ok(idx),
            None => hw_error!("No link {from} -> {to}"),
        }
    }

    #[must_use]
    pub fn node(&self, idx: NodeId) -> &ResourceNode {
        &self.graph[idx]
    }

    #[must_use]
    pub fn link(&self, idx: LinkId) -> &LinkSlot {
        &self.graph[idx]
    }

    #[must_use]
    pub fn coordinate(&self, idx: NodeId) -> Coordinate {
        self.graph[idx].coordinate
    }

    /// Source and destination node of a link.
    #[must_use]
    pub fn link_endpoints(&self, idx: LinkId) -> (NodeId, NodeId) {
        let edge = &self.graph.raw_edges()[idx.index()];
        (edge.source(), edge.target())
    }

    #[must_use]
    pub fn compute_capacity(&self, idx: NodeId) -> Option<f64> {
        self.graph[idx].compute.map(|slot| slot.capacity)
    }

    #[must_use]
    pub fn dram_capacity(&self, idx: NodeId) -> Option<f64> {
        self.graph[idx].dram.map(|slot| slot.capacity)
    }

    #[must_use]
    pub fn link_capacity(&self, idx: LinkId) -> f64 {
        self.graph[idx].capacity
    }

    /// Nodes in insertion order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.node_indices()
    }

    /// Links in insertion order.
    pub fn link_ids(&self) -> impl Iterator<Item = LinkId> + '_ {
        self.graph.edge_indices()
    }

    /// Nodes reachable over one outgoing link.
    pub fn successors(&self, idx: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.neighbors_directed(idx, Direction::Outgoing)
    }

    #[must_use]
    pub fn num_nodes(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn num_links(&self) -> usize {
        self.graph.edge_count()
    }

    #[must_use]
    pub fn clock_frequency(&self) -> f64 {
        self.clock_frequency
    }

    #[must_use]
    pub fn flit_size(&self) -> f64 {
        self.flit_size
    }

    /// Bandwidth of the link the flit size was derived from.
    #[must_use]
    pub fn reference_link_bandwidth(&self) -> f64 {
        self.flit_size * self.clock_frequency
    }
}

impl Display for ResourceGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let num_reticles = self
            .graph
            .node_weights()
            .filter(|n| n.compute.is_some())
            .count();
        let num_dram_ports = self
            .graph
            .node_weights()
            .filter(|n| n.dram.is_some())
            .count();
        writeln!(f, "Nodes: {}", self.num_nodes())?;
        writeln!(f, "  reticles: {num_reticles}")?;
        writeln!(f, "  DRAM ports: {num_dram_ports}")?;
        writeln!(f, "Links: {}", self.num_links())?;
        write!(
            f,
            "Clock: {:.3}GHz, flit: {} bytes",
            self.clock_frequency / 1e9,
            self.flit_size
        )
    }
}
