// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

use std::fmt::Write;

use criterion::{Criterion, criterion_group, criterion_main};
use wse_evaluator::LatencyEvaluator;
use wse_evaluator::lp::LpEvaluator;
use wse_evaluator::task::Workload;
use wse_hardware::ResourceGraph;
use wse_hardware::builder::build_wafer_graph;
use wse_hardware::mapper::StaticMapper;
use wse_hardware::types::WaferConfig;

const SIDE: usize = 8;

fn wafer_str() -> String {
    format!(
        "
reticle_array_height: {SIDE}
reticle_array_width: {SIDE}
reticle_compute_power: 1.0e12
inter_reticle_bandwidth: 1.0e11
dram_bandwidth: 5.0e10
dram_stacking: 3d
"
    )
}

/// One virtual reticle and one DRAM port per physical reticle.
fn placement_str() -> String {
    let mut reticles = String::from("reticles:\n");
    let mut dram_ports = String::from("dram_ports:\n");
    for x in 0..SIDE {
        for y in 0..SIDE {
            let id = x * SIDE + y;
            writeln!(reticles, "  {id}: [{x}, {y}]").unwrap();
            writeln!(dram_ports, "  {id}: [{y}, {x}]").unwrap();
        }
    }
    reticles + &dram_ports
}

/// Every reticle computes, reads from a transposed DRAM port and writes to
/// its neighbour in the next row.
fn workload_str() -> String {
    let mut tasks = String::from("tasks:\n");
    for id in 0..SIDE * SIDE {
        let peer = (id + SIDE) % (SIDE * SIDE);
        write!(
            tasks,
            "  - kind: fused
    subtasks:
      - kind: compute
        virtual_reticle_id: {id}
        compute_amount: {compute}
      - kind: dram_access
        virtual_reticle_id: {id}
        virtual_dram_port: {id}
        access_type: read
        data_amount: 4MB
      - kind: peer_access
        virtual_reticle_id: {id}
        peer_virtual_reticle_id: {peer}
        access_type: write
        data_amount: 2MB
",
            compute = 1.0e9 * (1 + id % 3) as f64,
        )
        .unwrap();
    }
    tasks
}

fn setup() -> (ResourceGraph, StaticMapper, Workload) {
    let wafer = WaferConfig::from_string(&wafer_str()).unwrap();
    let graph = build_wafer_graph(&wafer).unwrap();
    let mapper = StaticMapper::from_string(&placement_str(), &wafer).unwrap();
    let workload = Workload::from_string(&workload_str()).unwrap();
    (graph, mapper, workload)
}

fn bench_solver(c: &mut Criterion) {
    let (graph, mapper, workload) = setup();
    let evaluator = LpEvaluator::new(&graph, &mapper, &workload).unwrap();

    let mut group = c.benchmark_group("solver");

    group.bench_function("bottleneck_frequency", |b| {
        b.iter(|| evaluator.bottleneck_frequency().unwrap());
    });

    group.bench_function("training_samples", |b| {
        b.iter(|| evaluator.training_samples().unwrap());
    });

    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(20);
    targets = bench_solver
}
criterion_main!(benches);
