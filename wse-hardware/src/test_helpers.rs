// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! Helpers for building small hand-made topologies in tests.

use std::collections::HashMap;

use crate::mapper::{AccessType, Mapper, Route, RouteTarget};
use crate::types::HwError;
use crate::{ComputeSlot, Coordinate, DramSlot, LinkSlot, ResourceGraph, hw_error};

type RouteKey = (Coordinate, Coordinate, AccessType, RouteTarget);

/// A [Mapper] where every placement and every route is given explicitly.
///
/// Accesses between two identical coordinates have an empty route unless one
/// has been provided.
#[derive(Default)]
pub struct TableMapper {
    reticles: HashMap<usize, Coordinate>,
    dram_ports: HashMap<usize, Coordinate>,
    routes: HashMap<RouteKey, Route>,
}

impl TableMapper {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_reticle(mut self, virtual_reticle_id: usize, coordinate: Coordinate) -> Self {
        self.reticles.insert(virtual_reticle_id, coordinate);
        self
    }

    #[must_use]
    pub fn with_dram_port(mut self, virtual_dram_port: usize, coordinate: Coordinate) -> Self {
        self.dram_ports.insert(virtual_dram_port, coordinate);
        self
    }

    /// Register the route used by accesses from `src` to `dst`.
    #[must_use]
    pub fn with_route(
        mut self,
        src: Coordinate,
        dst: Coordinate,
        access: AccessType,
        target: RouteTarget,
        route: Route,
    ) -> Self {
        self.routes.insert((src, dst, access, target), route);
        self
    }
}

impl Mapper for TableMapper {
    fn physical_reticle(&self, virtual_reticle_id: usize) -> Result<Coordinate, HwError> {
        match self.reticles.get(&virtual_reticle_id) {
            Some(c) => Ok(*c),
            None => hw_error!("Virtual reticle {virtual_reticle_id} has not been placed"),
        }
    }

    fn physical_dram_port(&self, virtual_dram_port: usize) -> Result<Coordinate, HwError> {
        match self.dram_ports.get(&virtual_dram_port) {
            Some(c) => Ok(*c),
            None => hw_error!("Virtual DRAM port {virtual_dram_port} has not been placed"),
        }
    }

    fn routing_path(
        &self,
        src: Coordinate,
        dst: Coordinate,
        access: AccessType,
        target: RouteTarget,
    ) -> Result<Route, HwError> {
        match self.routes.get(&(src, dst, access, target)) {
            Some(route) => Ok(route.clone()),
            None if src == dst => Ok(Route::new()),
            None => hw_error!("No {access} route from {src} to {dst}"),
        }
    }
}

/// Build a row of nodes `(0, 0) .. (0, n-1)` with links in both directions
/// between neighbours.
///
/// Every node is given a compute slot, and a DRAM slot when `dram_capacity`
/// is provided.
pub fn build_row(
    n: usize,
    compute_capacity: f64,
    dram_capacity: Option<f64>,
    link_capacity: f64,
) -> Result<ResourceGraph, HwError> {
    let mut graph = ResourceGraph::new(1e9, link_capacity / 1e9)?;
    for y in 0..n as i32 {
        graph.add_node(
            Coordinate::new(0, y),
            Some(ComputeSlot {
                capacity: compute_capacity,
            }),
            dram_capacity.map(|capacity| DramSlot { capacity }),
        )?;
    }
    for y in 1..n as i32 {
        let a = Coordinate::new(0, y - 1);
        let b = Coordinate::new(0, y);
        let slot = LinkSlot {
            capacity: link_capacity,
        };
        graph.add_link(a, b, slot)?;
        graph.add_link(b, a, slot)?;
    }
    Ok(graph)
}
