// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! Build a [ResourceGraph] from a [WaferConfig].
//!
//! The wafer is laid out as a grid covering the reticle array plus a one node
//! wide ring around it (the four corners are not populated):
//!
//! ```txt
//!        y=-1   y=0   y=1   y=W
//!  x=-1          d  -  d
//!                |     |
//!  x=0    d  -   R  -  R  -  d
//!                |     |
//!  x=1    d  -   R  -  R  -  d
//!                |     |
//!  x=H           d  -  d
//! ```
//!
//! Reticles (`R`) occupy the inner array. With 2D stacking the DRAM ports
//! (`d`) occupy the ring, with 3D stacking each reticle node also holds a DRAM
//! port and the ring nodes are plain routers. Every pair of 4-neighbours is
//! connected by a link in each direction.

use log::debug;

use crate::types::{DramStacking, HwError, WaferConfig};
use crate::{ComputeSlot, Coordinate, DramSlot, LinkSlot, ResourceGraph};

fn is_corner(cfg: &WaferConfig, coordinate: Coordinate) -> bool {
    let h = cfg.reticle_array_height as i32;
    let w = cfg.reticle_array_width as i32;
    (coordinate.x == -1 || coordinate.x == h) && (coordinate.y == -1 || coordinate.y == w)
}

fn grid_coordinates(cfg: &WaferConfig) -> Vec<Coordinate> {
    let h = cfg.reticle_array_height as i32;
    let w = cfg.reticle_array_width as i32;
    let mut coordinates = Vec::new();
    for x in -1..=h {
        for y in -1..=w {
            let coordinate = Coordinate::new(x, y);
            if !is_corner(cfg, coordinate) {
                coordinates.push(coordinate);
            }
        }
    }
    coordinates
}

pub fn build_wafer_graph(cfg: &WaferConfig) -> Result<ResourceGraph, HwError> {
    cfg.validate()?;

    let mut graph = ResourceGraph::new(cfg.clock_frequency(), cfg.flit_size())?;
    let coordinates = grid_coordinates(cfg);

    for coordinate in &coordinates {
        let compute = if cfg.is_reticle(*coordinate) {
            Some(ComputeSlot {
                capacity: cfg.reticle_compute_power,
            })
        } else {
            None
        };
        let dram = if cfg.is_dram_port(*coordinate) {
            Some(DramSlot {
                capacity: cfg.dram_bandwidth,
            })
        } else {
            None
        };
        graph.add_node(*coordinate, compute, dram)?;
    }

    let slot = LinkSlot {
        capacity: cfg.inter_reticle_bandwidth,
    };
    for coordinate in &coordinates {
        for (dx, dy) in [(1, 0), (0, 1)] {
            let neighbour = Coordinate::new(coordinate.x + dx, coordinate.y + dy);
            if graph.node_idx(neighbour).is_err() {
                continue;
            }
            graph.add_link(*coordinate, neighbour, slot)?;
            graph.add_link(neighbour, *coordinate, slot)?;
        }
    }

    debug!(
        "Built {}x{} wafer ({:?} DRAM): {} nodes, {} links",
        cfg.reticle_array_height,
        cfg.reticle_array_width,
        cfg.dram_stacking,
        graph.num_nodes(),
        graph.num_links()
    );
    if cfg.dram_stacking == DramStacking::TwoD {
        debug!("{} DRAM ports on the perimeter", cfg.num_dram_ports());
    }

    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners() {
        let cfg = WaferConfig::from_string(
            "
reticle_array_height: 2
reticle_array_width: 3
reticle_compute_power: 1
inter_reticle_bandwidth: 1
dram_bandwidth: 1
dram_stacking: 2d
",
        )
        .unwrap();
        let coordinates = grid_coordinates(&cfg);
        assert_eq!(coordinates.len(), 4 * 5 - 4);
        assert!(!coordinates.contains(&Coordinate::new(-1, -1)));
        assert!(!coordinates.contains(&Coordinate::new(2, 3)));
        assert!(coordinates.contains(&Coordinate::new(-1, 0)));
    }
}
