// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

#![allow(dead_code)]

use wse_evaluator::task::Workload;
use wse_hardware::mapper::{AccessType, RouteTarget};
use wse_hardware::test_helpers::{TableMapper, build_row};
use wse_hardware::{Coordinate, ResourceGraph};

pub fn c(x: i32, y: i32) -> Coordinate {
    Coordinate::new(x, y)
}

/// Three reticles in a row with 1GB/s links (1 byte flits).
///
/// Reticle 0 computes a little and writes 3MB to reticle 2, reticle 1 writes
/// 1MB to reticle 2. The link (0, 1) -> (0, 2) carries 4MB and is the
/// bottleneck, giving a frequency of 250/s.
pub fn pipeline() -> (ResourceGraph, TableMapper, Workload) {
    let graph = build_row(3, 1e12, Some(1e9), 1e9).unwrap();
    let mapper = TableMapper::new()
        .with_reticle(0, c(0, 0))
        .with_reticle(1, c(0, 1))
        .with_reticle(2, c(0, 2))
        .with_route(
            c(0, 0),
            c(0, 2),
            AccessType::Write,
            RouteTarget::Peer,
            vec![(c(0, 0), c(0, 1)), (c(0, 1), c(0, 2))],
        )
        .with_route(
            c(0, 1),
            c(0, 2),
            AccessType::Write,
            RouteTarget::Peer,
            vec![(c(0, 1), c(0, 2))],
        );
    let workload = Workload::from_string(
        "
tasks:
  - kind: fused
    repeated_times: 2
    subtasks:
      - kind: compute
        virtual_reticle_id: 0
        compute_amount: 100
      - kind: peer_access
        virtual_reticle_id: 0
        peer_virtual_reticle_id: 2
        access_type: write
        data_amount: 3.0e6
  - kind: peer_access
    virtual_reticle_id: 1
    peer_virtual_reticle_id: 2
    access_type: write
    data_amount: 1.0e6
",
    )
    .unwrap();
    (graph, mapper, workload)
}

pub const WAFER: &str = "
reticle_array_height: 3
reticle_array_width: 3
reticle_compute_power: 1.0e12
inter_reticle_bandwidth: 1.0e11
dram_bandwidth: 5.0e10
dram_stacking: 2d
";

pub const PLACEMENT: &str = "
reticles:
  0: [0, 0]
  1: [0, 2]
  2: [1, 1]
  3: [2, 2]
dram_ports:
  0: [-1, 0]
  1: [1, 3]
";

pub const WORKLOAD: &str = "
tasks:
  - kind: compute
    virtual_reticle_id: 0
    compute_amount: 2.0e9
  - kind: compute
    virtual_reticle_id: 1
    compute_amount: 1.0e9
    repeated_times: 10
  - kind: dram_access
    virtual_reticle_id: 0
    virtual_dram_port: 0
    access_type: read
    data_amount: 8.0e6
  - kind: peer_access
    virtual_reticle_id: 1
    peer_virtual_reticle_id: 2
    access_type: write
    data_amount: 4.0e6
  - kind: fused
    subtasks:
      - kind: compute
        virtual_reticle_id: 3
        compute_amount: 5.0e8
      - kind: dram_access
        virtual_reticle_id: 3
        virtual_dram_port: 1
        access_type: write
        data_amount: 2.0e6
      - kind: peer_access
        virtual_reticle_id: 3
        peer_virtual_reticle_id: 0
        access_type: read
        data_amount: 1.0e6
";
