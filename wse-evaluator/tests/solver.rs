// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

use approx::assert_relative_eq;
use wse_evaluator::LatencyEvaluator;
use wse_evaluator::lp::LpEvaluator;
use wse_evaluator::solver::LpProgram;
use wse_evaluator::task::{LeafTask, Workload};
use wse_hardware::mapper::{AccessType, Mapper, RouteTarget, StaticMapper};
use wse_hardware::test_helpers::{TableMapper, build_row};
use wse_hardware::types::WaferConfig;
use wse_hardware::{ComputeSlot, ResourceGraph};

mod common;
use common::{PLACEMENT, WAFER, WORKLOAD, c};

#[test]
fn single_compute_task() {
    let graph = build_row(1, 50.0, None, 1e9).unwrap();
    let mapper = TableMapper::new().with_reticle(0, c(0, 0));
    let workload = Workload::from_string(
        "
tasks:
  - kind: compute
    virtual_reticle_id: 0
    compute_amount: 100
    repeated_times: 3
",
    )
    .unwrap();

    let evaluator = LpEvaluator::new(&graph, &mapper, &workload).unwrap();
    let frequency = evaluator.bottleneck_frequency().unwrap();
    assert_relative_eq!(frequency, 0.5, max_relative = 1e-9);
    assert_relative_eq!(
        evaluator.total_latency().unwrap(),
        6.0,
        max_relative = 1e-9
    );
}

#[test]
fn slowest_task_is_the_bottleneck() {
    let mut graph = ResourceGraph::new(1e9, 1.0).unwrap();
    graph
        .add_node(c(0, 0), Some(ComputeSlot { capacity: 10.0 }), None)
        .unwrap();
    graph
        .add_node(c(0, 1), Some(ComputeSlot { capacity: 20.0 }), None)
        .unwrap();
    let mapper = TableMapper::new()
        .with_reticle(0, c(0, 0))
        .with_reticle(1, c(0, 1));
    // Task bounds of 1.0 and 0.5
    let workload = Workload::from_string(
        "
tasks:
  - kind: compute
    virtual_reticle_id: 0
    compute_amount: 10
  - kind: compute
    virtual_reticle_id: 1
    compute_amount: 40
",
    )
    .unwrap();

    let evaluator = LpEvaluator::new(&graph, &mapper, &workload).unwrap();
    assert_relative_eq!(
        evaluator.bottleneck_frequency().unwrap(),
        0.5,
        max_relative = 1e-9
    );

    let report = evaluator.utilization_report().unwrap();
    assert_eq!(report.compute.count, 2);
    assert_relative_eq!(report.compute.max, 1.0, max_relative = 1e-9);
    assert_relative_eq!(report.compute.mean, 0.75, max_relative = 1e-9);
    assert_eq!(report.bottleneck().unwrap().resource.to_string(), "reticle (0, 1)");
}

#[test]
fn dram_and_link_saturate_together() {
    let graph = build_row(2, 1e12, Some(1e9), 1e9).unwrap();
    let mapper = TableMapper::new()
        .with_reticle(0, c(0, 0))
        .with_dram_port(0, c(0, 1))
        .with_route(
            c(0, 0),
            c(0, 1),
            AccessType::Read,
            RouteTarget::Dram,
            vec![(c(0, 1), c(0, 0))],
        );
    let workload = Workload::from_string(
        "
tasks:
  - kind: dram_access
    virtual_reticle_id: 0
    virtual_dram_port: 0
    access_type: read
    data_amount: 1MB
",
    )
    .unwrap();

    let evaluator = LpEvaluator::new(&graph, &mapper, &workload).unwrap();
    let annotated = evaluator.context().annotate().unwrap();
    let program = LpProgram::formulate(&annotated, evaluator.context().variables()).unwrap();
    assert_eq!(program.num_task_vars(), 1);
    assert_eq!(program.capacity_rows().len(), 2);

    let report = evaluator.utilization_report().unwrap();
    assert_relative_eq!(report.frequency, 1000.0, max_relative = 1e-9);
    assert_eq!(report.compute.max, 0.0);
    assert_eq!(report.compute.count, 2);
    assert_relative_eq!(report.dram.max, 1.0, max_relative = 1e-9);
    assert_relative_eq!(report.dram.mean, 0.5, max_relative = 1e-9);
    assert_relative_eq!(report.inter_reticle.max, 1.0, max_relative = 1e-9);
    assert_eq!(report.inter_reticle.count, 2);

    let used: Vec<String> = report
        .resources
        .iter()
        .map(|r| r.resource.to_string())
        .collect();
    assert_eq!(used, vec!["DRAM port (0, 1)", "link (0, 1) -> (0, 0)"]);
}

#[test]
fn no_tasks() {
    let result = Workload::new(Vec::new());
    assert!(result.is_err());
    assert!(
        result
            .unwrap_err()
            .to_string()
            .contains("No tasks to bound the frequency")
    );
}

fn wafer_setup() -> (WaferConfig, ResourceGraph, StaticMapper, Workload) {
    let wafer = WaferConfig::from_string(WAFER).unwrap();
    let graph = ResourceGraph::from_wafer_string(WAFER).unwrap();
    let mapper = StaticMapper::from_string(PLACEMENT, &wafer).unwrap();
    let workload = Workload::from_string(WORKLOAD).unwrap();
    (wafer, graph, mapper, workload)
}

#[test]
fn capacity_and_tightness() {
    let (_, graph, mapper, workload) = wafer_setup();
    let evaluator = LpEvaluator::new(&graph, &mapper, &workload).unwrap();
    let report = evaluator.utilization_report().unwrap();

    for used in &report.resources {
        assert!(
            used.utilization <= 1.0 + 1e-9,
            "{} is oversubscribed",
            used.resource
        );
        let per_task: f64 = used.per_task.iter().map(|t| t.utilization).sum();
        assert_relative_eq!(per_task, used.utilization, max_relative = 1e-9);
    }
    assert_relative_eq!(report.max(), 1.0, max_relative = 1e-6);
    assert!(report.bottleneck().is_some());
}

#[test]
fn latency_identity() {
    let (_, graph, mapper, workload) = wafer_setup();
    let evaluator = LpEvaluator::new(&graph, &mapper, &workload).unwrap();
    let frequency = evaluator.bottleneck_frequency().unwrap();
    assert_eq!(workload.repeated_times(), 10);
    assert_eq!(evaluator.total_latency().unwrap(), 10.0 / frequency);
}

#[test]
fn payload_conservation() {
    let (_, graph, mapper, workload) = wafer_setup();
    let evaluator = LpEvaluator::new(&graph, &mapper, &workload).unwrap();
    let payload = evaluator.payload_report().unwrap();

    let mut compute = 0.0;
    let mut dram = 0.0;
    let mut transmission = 0.0;
    for leaf in workload.leaves() {
        match leaf {
            LeafTask::Compute(t) => compute += t.compute_amount,
            LeafTask::DramAccess(t) => {
                let src = mapper.physical_reticle(t.virtual_reticle_id).unwrap();
                let dst = mapper.physical_dram_port(t.virtual_dram_port).unwrap();
                let route = mapper
                    .routing_path(src, dst, t.access_type, RouteTarget::Dram)
                    .unwrap();
                dram += t.data_amount;
                transmission += t.data_amount * route.len() as f64;
            }
            LeafTask::PeerAccess(t) => {
                let src = mapper.physical_reticle(t.virtual_reticle_id).unwrap();
                let dst = mapper.physical_reticle(t.peer_virtual_reticle_id).unwrap();
                let route = mapper
                    .routing_path(src, dst, t.access_type, RouteTarget::Peer)
                    .unwrap();
                transmission += t.data_amount * route.len() as f64;
            }
        }
    }

    assert_relative_eq!(payload.compute, 3.5e9, max_relative = 1e-12);
    assert_relative_eq!(payload.compute, compute, max_relative = 1e-12);
    assert_relative_eq!(payload.dram, 10.0e6, max_relative = 1e-12);
    assert_relative_eq!(payload.dram, dram, max_relative = 1e-12);
    assert_relative_eq!(payload.inter_reticle, 24.0e6, max_relative = 1e-12);
    assert_relative_eq!(payload.inter_reticle, transmission, max_relative = 1e-12);
}

#[test]
fn deterministic() {
    let (_, graph, mapper, workload) = wafer_setup();
    let evaluator = LpEvaluator::new(&graph, &mapper, &workload).unwrap();

    assert_eq!(
        evaluator.bottleneck_frequency().unwrap(),
        evaluator.bottleneck_frequency().unwrap()
    );
    assert_eq!(
        evaluator.utilization_report().unwrap(),
        evaluator.utilization_report().unwrap()
    );
    assert_eq!(
        evaluator.payload_report().unwrap(),
        evaluator.payload_report().unwrap()
    );
    assert_eq!(
        evaluator.hetero_graph().unwrap(),
        evaluator.hetero_graph().unwrap()
    );
}

#[test]
fn report_display() {
    let (_, graph, mapper, workload) = wafer_setup();
    let evaluator = LpEvaluator::new(&graph, &mapper, &workload).unwrap();
    let text = evaluator.utilization_report().unwrap().to_string();
    assert!(text.starts_with("Bottleneck frequency:"));
    assert!(text.contains("inter-reticle:"));
    assert!(text.contains("reticle (0, 0)"));
    assert!(text.contains("DRAM port (-1, 0)"));
}
