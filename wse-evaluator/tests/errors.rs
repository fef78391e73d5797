// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

use wse_evaluator::LatencyEvaluator;
use wse_evaluator::lp::LpEvaluator;
use wse_evaluator::task::Workload;
use wse_hardware::mapper::{AccessType, RouteTarget};
use wse_hardware::test_helpers::{TableMapper, build_row};

mod common;
use common::c;

fn frequency(mapper: &TableMapper, workload: &str) -> f64 {
    let graph = build_row(2, 1e9, None, 1e9).unwrap();
    let workload = Workload::from_string(workload).unwrap();
    LpEvaluator::new(&graph, mapper, &workload)
        .unwrap()
        .bottleneck_frequency()
        .unwrap()
}

#[test]
#[should_panic(expected = "'matmul' (task 1)")]
fn unknown_task_kind() {
    Workload::from_string(
        "
tasks:
  - kind: compute
    virtual_reticle_id: 0
    compute_amount: 1
  - kind: matmul
    virtual_reticle_id: 0
",
    )
    .unwrap();
}

#[test]
#[should_panic(expected = "'collective' (task 0.1)")]
fn unknown_fused_subtask_kind() {
    Workload::from_string(
        "
tasks:
  - kind: fused
    subtasks:
      - kind: compute
        virtual_reticle_id: 0
        compute_amount: 1
      - kind: collective
",
    )
    .unwrap();
}

#[test]
#[should_panic(expected = "Task 0: data_amount must be a non-negative number, got -5")]
fn negative_amount() {
    Workload::from_string(
        "
tasks:
  - kind: peer_access
    virtual_reticle_id: 0
    peer_virtual_reticle_id: 1
    access_type: read
    data_amount: -5
",
    )
    .unwrap();
}

#[test]
#[should_panic(expected = "Task 0.0: repeated_times must be at least 1")]
fn zero_repeats() {
    Workload::from_string(
        "
tasks:
  - kind: fused
    subtasks:
      - kind: compute
        virtual_reticle_id: 0
        compute_amount: 1
        repeated_times: 0
",
    )
    .unwrap();
}

#[test]
#[should_panic(expected = "Task 0: fused task has no subtasks")]
fn empty_fused() {
    Workload::from_string(
        "
tasks:
  - kind: fused
    subtasks: []
",
    )
    .unwrap();
}

#[test]
#[should_panic(expected = "No tasks to bound the frequency")]
fn empty_workload() {
    Workload::from_string("tasks: []").unwrap();
}

#[test]
#[should_panic(expected = "unknown field `bytes`")]
fn bad_field() {
    Workload::from_string(
        "
tasks:
  - kind: compute
    virtual_reticle_id: 0
    bytes: 1
",
    )
    .unwrap();
}

#[test]
#[should_panic(expected = "Virtual reticle 0 has not been placed")]
fn unplaced_reticle() {
    frequency(
        &TableMapper::new(),
        "
tasks:
  - kind: compute
    virtual_reticle_id: 0
    compute_amount: 1
",
    );
}

#[test]
#[should_panic(expected = "Virtual DRAM port 3 has not been placed")]
fn unplaced_dram_port() {
    frequency(
        &TableMapper::new().with_reticle(0, c(0, 0)),
        "
tasks:
  - kind: dram_access
    virtual_reticle_id: 0
    virtual_dram_port: 3
    access_type: write
    data_amount: 1
",
    );
}

#[test]
#[should_panic(expected = "Node (0, 1) has no DRAM port")]
fn not_a_dram_port() {
    frequency(
        &TableMapper::new()
            .with_reticle(0, c(0, 0))
            .with_dram_port(0, c(0, 1)),
        "
tasks:
  - kind: dram_access
    virtual_reticle_id: 0
    virtual_dram_port: 0
    access_type: write
    data_amount: 1
",
    );
}

#[test]
#[should_panic(expected = "No node at (5, 5)")]
fn reticle_off_the_wafer() {
    frequency(
        &TableMapper::new().with_reticle(0, c(5, 5)),
        "
tasks:
  - kind: compute
    virtual_reticle_id: 0
    compute_amount: 1
",
    );
}

#[test]
#[should_panic(expected = "No link (0, 0) -> (0, 2)")]
fn route_over_missing_link() {
    let graph = build_row(3, 1e9, None, 1e9).unwrap();
    let mapper = TableMapper::new()
        .with_reticle(0, c(0, 0))
        .with_reticle(1, c(0, 2))
        .with_route(
            c(0, 0),
            c(0, 2),
            AccessType::Write,
            RouteTarget::Peer,
            vec![(c(0, 0), c(0, 2))],
        );
    let workload = Workload::from_string(
        "
tasks:
  - kind: peer_access
    virtual_reticle_id: 0
    peer_virtual_reticle_id: 1
    access_type: write
    data_amount: 1
",
    )
    .unwrap();
    LpEvaluator::new(&graph, &mapper, &workload)
        .unwrap()
        .bottleneck_frequency()
        .unwrap();
}

#[test]
#[should_panic(expected = "No read route from (0, 0) to (0, 1)")]
fn missing_route() {
    frequency(
        &TableMapper::new()
            .with_reticle(0, c(0, 0))
            .with_reticle(1, c(0, 1)),
        "
tasks:
  - kind: peer_access
    virtual_reticle_id: 0
    peer_virtual_reticle_id: 1
    access_type: read
    data_amount: 1
",
    );
}

#[test]
#[should_panic(expected = "The workload places no demand on any resource")]
fn no_demand() {
    frequency(
        &TableMapper::new().with_reticle(0, c(0, 0)),
        "
tasks:
  - kind: compute
    virtual_reticle_id: 0
    compute_amount: 0
",
    );
}
