// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! Translation of a workload's virtual identities to physical resources.
//!
//! A [Mapper] resolves virtual reticle ids and virtual DRAM ports to
//! [Coordinate]s and provides the links used to move data between two
//! coordinates.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::{HwError, PlacementConfig, RoutingAlgorithm, WaferConfig};
use crate::{Coordinate, hw_error};

/// Direction of a data access relative to the reticle issuing it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    /// Data flows from the target to the requesting reticle
    Read,

    /// Data flows from the requesting reticle to the target
    Write,
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AccessType::Read => write!(f, "read"),
            AccessType::Write => write!(f, "write"),
        }
    }
}

/// What kind of resource is at the far end of an access.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RouteTarget {
    Dram,
    Peer,
}

/// Ordered list of `(from, to)` links.
pub type Route = Vec<(Coordinate, Coordinate)>;

pub trait Mapper {
    fn physical_reticle(&self, virtual_reticle_id: usize) -> Result<Coordinate, HwError>;

    fn physical_dram_port(&self, virtual_dram_port: usize) -> Result<Coordinate, HwError>;

    /// Links used by an access issued by the reticle at `src` to the DRAM
    /// port or peer reticle at `dst`.
    fn routing_path(
        &self,
        src: Coordinate,
        dst: Coordinate,
        access: AccessType,
        target: RouteTarget,
    ) -> Result<Route, HwError>;
}

/// Walk from `from` to `to` one hop at a time, finishing one dimension before
/// starting the other.
#[must_use]
pub fn dimension_ordered_route(
    from: Coordinate,
    to: Coordinate,
    algorithm: RoutingAlgorithm,
) -> Route {
    let mut route = Route::new();
    let mut here = from;
    while here != to {
        let step_x = here.x != to.x;
        let step_y = here.y != to.y;
        let move_y = match algorithm {
            RoutingAlgorithm::ColumnFirst => step_y,
            RoutingAlgorithm::RowFirst => !step_x,
        };
        let next = if move_y {
            Coordinate::new(here.x, here.y + (to.y - here.y).signum())
        } else {
            Coordinate::new(here.x + (to.x - here.x).signum(), here.y)
        };
        route.push((here, next));
        here = next;
    }
    route
}

/// A mapper with fixed placement tables and dimension-ordered routing.
pub struct StaticMapper {
    placement: PlacementConfig,
    routing: RoutingAlgorithm,
    array_height: i32,
    array_width: i32,
}

impl StaticMapper {
    pub fn new(placement: PlacementConfig, wafer: &WaferConfig) -> Result<Self, HwError> {
        placement.validate(wafer)?;
        Ok(Self {
            placement,
            routing: wafer.routing(),
            array_height: wafer.reticle_array_height as i32,
            array_width: wafer.reticle_array_width as i32,
        })
    }

    pub fn from_file(placement_path: &Path, wafer: &WaferConfig) -> Result<Self, HwError> {
        Self::new(PlacementConfig::from_file(placement_path)?, wafer)
    }

    pub fn from_string(placement: &str, wafer: &WaferConfig) -> Result<Self, HwError> {
        Self::new(PlacementConfig::from_string(placement)?, wafer)
    }

    #[must_use]
    pub fn num_reticles(&self) -> usize {
        self.placement.reticles.len()
    }

    #[must_use]
    pub fn num_dram_ports(&self) -> usize {
        self.placement.dram_ports.len()
    }

    /// Routing order for traffic that leaves a DRAM port.
    ///
    /// Ports on the left/right of the array must first move along the row
    /// they sit on; ports above/below must first move along their column.
    fn dram_egress_order(&self, port: Coordinate) -> RoutingAlgorithm {
        if port.y < 0 || port.y >= self.array_width {
            RoutingAlgorithm::ColumnFirst
        } else if port.x < 0 || port.x >= self.array_height {
            RoutingAlgorithm::RowFirst
        } else {
            self.routing
        }
    }
}

impl Mapper for StaticMapper {
    fn physical_reticle(&self, virtual_reticle_id: usize) -> Result<Coordinate, HwError> {
        match self.placement.reticles.get(&virtual_reticle_id) {
            Some(coordinate) => Ok(*coordinate),
            None => hw_error!("Virtual reticle {virtual_reticle_id} has not been placed"),
        }
    }

    fn physical_dram_port(&self, virtual_dram_port: usize) -> Result<Coordinate, HwError> {
        match self.placement.dram_ports.get(&virtual_dram_port) {
            Some(coordinate) => Ok(*coordinate),
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
        let route = match (target, access) {
            (RouteTarget::Peer, AccessType::Read) => dimension_ordered_route(dst, src, self.routing),
            (RouteTarget::Peer, AccessType::Write) => {
                dimension_ordered_route(src, dst, self.routing)
            }
            (RouteTarget::Dram, AccessType::Read) => {
                dimension_ordered_route(dst, src, self.dram_egress_order(dst))
            }
            (RouteTarget::Dram, AccessType::Write) => {
                dimension_ordered_route(src, dst, self.dram_egress_order(dst).flipped())
            }
        };
        Ok(route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(x: i32, y: i32) -> Coordinate {
        Coordinate::new(x, y)
    }

    #[test]
    fn column_first() {
        let route = dimension_ordered_route(c(0, 0), c(2, 1), RoutingAlgorithm::ColumnFirst);
        assert_eq!(
            route,
            vec![(c(0, 0), c(0, 1)), (c(0, 1), c(1, 1)), (c(1, 1), c(2, 1))]
        );
    }

    #[test]
    fn row_first() {
        let route = dimension_ordered_route(c(0, 0), c(2, 1), RoutingAlgorithm::RowFirst);
        assert_eq!(
            route,
            vec![(c(0, 0), c(1, 0)), (c(1, 0), c(2, 0)), (c(2, 0), c(2, 1))]
        );
    }

    #[test]
    fn negative_direction() {
        let route = dimension_ordered_route(c(1, 1), c(-1, 1), RoutingAlgorithm::ColumnFirst);
        assert_eq!(route, vec![(c(1, 1), c(0, 1)), (c(0, 1), c(-1, 1))]);
    }

    #[test]
    fn same_place() {
        assert!(dimension_ordered_route(c(3, 3), c(3, 3), RoutingAlgorithm::RowFirst).is_empty());
    }
}
