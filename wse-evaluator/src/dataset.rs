// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! Graph datasets for training and querying a surrogate latency model.
//!
//! Two extractions are provided:
//!  - [hetero_graph]: every used resource of the workload together with the
//!    tasks using it, labelled with the utilisation of each link.
//!  - [sample_graph]: the links around one task, labelled (by
//!    [flits_per_service]) with the number of flits a link has to send for each
//!    flit of that task. The label is enough to rebuild the latency of the
//!    whole workload through [reconstructed_latency].

use std::collections::{BTreeMap, BTreeSet};

use itertools::iproduct;
use serde::Serialize;
use wse_hardware::mapper::Mapper;
use wse_hardware::types::HwError;
use wse_hardware::{Coordinate, LinkId, NodeId, ResourceGraph};

use crate::annotate::{AnnotatedGraph, DemandMark};
use crate::eval_error;
use crate::task::{LeafTask, TaskVar, VariableIndex, Workload};
use crate::types::EvalError;

/// Flits needed to move `data_amount` bytes: one per started flit plus one to
/// initiate the transfer.
#[must_use]
pub fn flit_count(data_amount: f64, flit_size: f64) -> u64 {
    (data_amount / flit_size).ceil() as u64 + 1
}

/// Edges of one relation of a [HeteroGraph].
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Relation {
    pub src: Vec<usize>,
    pub dst: Vec<usize>,
    pub features: Vec<Vec<f64>>,
}

impl Relation {
    fn push(&mut self, src: usize, dst: usize, features: Vec<f64>) {
        self.src.push(src);
        self.dst.push(dst);
        self.features.push(features);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.src.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.src.is_empty()
    }

    #[must_use]
    pub fn reversed(&self) -> Self {
        Self {
            src: self.dst.clone(),
            dst: self.src.clone(),
            features: self.features.clone(),
        }
    }
}

/// Heterogeneous graph of tasks, reticles, DRAM ports and links.
///
/// Node indices of each type refer to the matching vector (`tasks`,
/// `reticles`, `dram_ports` or `links`).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HeteroGraph {
    /// Virtual reticle id of each task node
    pub tasks: Vec<usize>,
    pub reticles: Vec<Coordinate>,
    pub dram_ports: Vec<Coordinate>,
    pub links: Vec<(Coordinate, Coordinate)>,

    /// reticle -> task, `[demand / capacity, 1]`
    pub reticle_used_by: Relation,
    /// DRAM port -> task, `[demand / capacity, 1]`
    pub dram_port_used_by: Relation,
    /// link -> task, `[demand / capacity, 1]`
    pub link_used_by: Relation,
    pub uses_reticle: Relation,
    pub uses_dram_port: Relation,
    pub uses_link: Relation,

    /// link `(u, v)` -> link `(v, w)`, `[share of (u, v) data continuing]`
    pub connect_to: Relation,
    /// link `(v, w)` -> link `(u, v)`, `[share of (v, w) data arriving]`
    pub connected_by: Relation,

    /// Utilisation of each link at the bottleneck frequency
    pub link_label: Vec<f64>,
}

fn used_by(
    marks: impl Iterator<Item = (f64, DemandMark)>,
    relation: &mut Relation,
) {
    for (resource, (capacity, mark)) in marks.enumerate() {
        for (var, amount) in mark.iter() {
            relation.push(resource, var, vec![amount / capacity, 1.0]);
        }
    }
}

/// Fraction of the data on `from` which also uses `to`, per task.
fn continuing_share(from: &DemandMark, to: &DemandMark) -> f64 {
    let total = from.total();
    if total <= 0.0 {
        return 0.0;
    }
    let overlap: f64 = from
        .iter()
        .filter_map(|(var, amount)| to.get(var).map(|other| amount.min(other)))
        .sum();
    overlap / total
}

/// Build the heterogeneous graph of all used resources.
pub fn hetero_graph(
    annotated: &AnnotatedGraph,
    vars: &VariableIndex,
    frequency: f64,
) -> Result<HeteroGraph, EvalError> {
    let graph = annotated.graph();
    let links: Vec<(LinkId, &DemandMark)> = annotated
        .transmission_marks()
        .map(|(link, mark)| (*link, mark))
        .collect();
    if links.is_empty() {
        return eval_error!(
            DegenerateWorkload,
            "No link carries any data so there is no graph to extract"
        );
    }

    let mut reticles = Vec::new();
    let mut compute = Vec::new();
    for (node, mark) in annotated.compute_marks() {
        if let Some(capacity) = graph.compute_capacity(*node) {
            reticles.push(graph.coordinate(*node));
            compute.push((capacity, mark.clone()));
        }
    }
    let mut dram_ports = Vec::new();
    let mut dram = Vec::new();
    for (node, mark) in annotated.dram_marks() {
        if let Some(capacity) = graph.dram_capacity(*node) {
            dram_ports.push(graph.coordinate(*node));
            dram.push((capacity, mark.clone()));
        }
    }

    let mut reticle_used_by = Relation::default();
    used_by(compute.into_iter(), &mut reticle_used_by);
    let mut dram_port_used_by = Relation::default();
    used_by(dram.into_iter(), &mut dram_port_used_by);
    let mut link_used_by = Relation::default();
    used_by(
        links
            .iter()
            .map(|(link, mark)| (graph.link_capacity(*link), (*mark).clone())),
        &mut link_used_by,
    );

    let endpoints: Vec<(NodeId, NodeId)> = links
        .iter()
        .map(|(link, _)| graph.link_endpoints(*link))
        .collect();
    let mut connect_to = Relation::default();
    let mut connected_by = Relation::default();
    for (i, j) in iproduct!(0..links.len(), 0..links.len()) {
        if i == j || endpoints[i].1 != endpoints[j].0 {
            continue;
        }
        let (prev, next) = (links[i].1, links[j].1);
        connect_to.push(i, j, vec![continuing_share(prev, next)]);
        connected_by.push(j, i, vec![continuing_share(next, prev)]);
    }

    let link_label = links
        .iter()
        .map(|(link, mark)| mark.total() * frequency / graph.link_capacity(*link))
        .collect();

    Ok(HeteroGraph {
        tasks: vars.virtual_reticle_ids().collect(),
        reticles,
        dram_ports,
        links: endpoints
            .iter()
            .map(|(from, to)| (graph.coordinate(*from), graph.coordinate(*to)))
            .collect(),
        uses_reticle: reticle_used_by.reversed(),
        uses_dram_port: dram_port_used_by.reversed(),
        uses_link: link_used_by.reversed(),
        reticle_used_by,
        dram_port_used_by,
        link_used_by,
        connect_to,
        connected_by,
        link_label,
    })
}

/// Workload-level figures of one task needed to rebuild its latency.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TaskProfile {
    /// Operations
    pub compute_amount: f64,
    /// Bytes moved by DRAM and peer accesses
    pub transmission_amount: f64,
    pub compute_latency: f64,
    pub dram_latency: f64,
    /// Time to move `transmission_amount` over a single idle link
    pub ideal_transmission_latency: f64,
}

impl TaskProfile {
    pub fn new(
        graph: &ResourceGraph,
        mapper: &dyn Mapper,
        workload: &Workload,
        virtual_reticle_id: usize,
    ) -> Result<Self, EvalError> {
        let mut compute_amount = 0.0;
        let mut compute_latency = 0.0;
        let mut dram_latency = 0.0;
        let mut transmission_amount = 0.0;

        let leaves = workload.leaves();
        for leaf in leaves
            .iter()
            .filter(|leaf| leaf.virtual_reticle_id() == virtual_reticle_id)
        {
            match leaf {
                LeafTask::Compute(task) => {
                    let node = graph.node_idx(mapper.physical_reticle(virtual_reticle_id)?)?;
                    let Some(capacity) = graph.compute_capacity(node) else {
                        return Err(HwError(format!(
                            "Node {} has no compute resource",
                            graph.coordinate(node)
                        ))
                        .into());
                    };
                    compute_amount += task.compute_amount;
                    compute_latency += task.compute_amount / capacity;
                }
                LeafTask::DramAccess(task) => {
                    let node = graph.node_idx(mapper.physical_dram_port(task.virtual_dram_port)?)?;
                    let Some(capacity) = graph.dram_capacity(node) else {
                        return Err(HwError(format!(
                            "Node {} has no DRAM port",
                            graph.coordinate(node)
                        ))
                        .into());
                    };
                    dram_latency += task.data_amount / capacity;
                    transmission_amount += task.data_amount;
                }
                LeafTask::PeerAccess(task) => {
                    transmission_amount += task.data_amount;
                }
            }
        }

        Ok(Self {
            compute_amount,
            transmission_amount,
            compute_latency,
            dram_latency,
            ideal_transmission_latency: transmission_amount / graph.reference_link_bandwidth(),
        })
    }

    /// `ln(compute latency / ideal transmission latency)`, or 0 without
    /// compute or transmission.
    #[must_use]
    pub fn compute_transmission_ratio(&self) -> f64 {
        if self.compute_latency > 0.0 && self.ideal_transmission_latency > 0.0 {
            (self.compute_latency / self.ideal_transmission_latency).ln()
        } else {
            0.0
        }
    }
}

/// Values, besides the label, needed to turn a prediction back into a latency.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct AuxLatencies {
    pub num_total_flit: u64,
    pub compute_latency: f64,
    pub dram_latency: f64,
}

/// The links around one task, in the form consumed by a surrogate model.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SampleGraph {
    /// Virtual reticle id of the task
    pub task: usize,
    pub nodes: Vec<Coordinate>,
    /// `[is_compute, is_not_compute, log2(compute capacity / clock), ln(compute / transmission)]`
    pub node_features: Vec<Vec<f64>>,
    pub edge_list: Vec<(usize, usize)>,
    /// `[number of flows, log2(link capacity / clock)]`
    pub edge_features: Vec<Vec<f64>>,
    pub aux_latencies: AuxLatencies,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrainingSample {
    #[serde(flatten)]
    pub graph: SampleGraph,

    /// Flits sent by the busiest link of the task per flit of the task,
    /// scaled by the task's share of its total flits
    pub label: f64,
}

fn task_links<'a>(annotated: &'a AnnotatedGraph<'_>, var: TaskVar) -> Vec<(LinkId, &'a DemandMark)> {
    annotated
        .transmission_marks()
        .filter(|(_, mark)| mark.contains(var))
        .map(|(link, mark)| (*link, mark))
        .collect()
}

/// Extract the links carrying data of task `var` and the links out of their
/// one hop neighbourhood that carry any data.
pub fn sample_graph(
    annotated: &AnnotatedGraph,
    vars: &VariableIndex,
    var: TaskVar,
    profile: &TaskProfile,
) -> Result<SampleGraph, EvalError> {
    let graph = annotated.graph();
    let virtual_reticle_id = vars.virtual_reticle_id(var);
    let own_links = task_links(annotated, var);
    if own_links.is_empty() || profile.transmission_amount <= 0.0 {
        return eval_error!(
            DegenerateWorkload,
            "Task {virtual_reticle_id} does not transmit any data"
        );
    }

    let mut region = BTreeSet::new();
    for (link, _) in &own_links {
        let (from, _) = graph.link_endpoints(*link);
        region.insert(from);
        region.extend(graph.successors(from));
    }

    let edges: Vec<(NodeId, NodeId, &DemandMark, f64)> = annotated
        .transmission_marks()
        .filter_map(|(link, mark)| {
            let (from, to) = graph.link_endpoints(*link);
            (region.contains(&from) && region.contains(&to))
                .then(|| (from, to, mark, graph.link_capacity(*link)))
        })
        .collect();

    let used: BTreeSet<NodeId> = edges
        .iter()
        .flat_map(|(from, to, _, _)| [*from, *to])
        .collect();
    let alias: BTreeMap<NodeId, usize> = used
        .iter()
        .enumerate()
        .map(|(i, node)| (*node, i))
        .collect();

    let clock = graph.clock_frequency();
    let ratio = profile.compute_transmission_ratio();
    let node_features = used
        .iter()
        .map(|node| {
            let is_compute = annotated
                .compute_mark(*node)
                .is_some_and(|mark| mark.contains(var));
            let compute_power = graph
                .compute_capacity(*node)
                .map_or(0.0, |capacity| (capacity / clock).log2());
            if is_compute {
                vec![1.0, 0.0, compute_power, ratio]
            } else {
                vec![0.0, 1.0, compute_power, 0.0]
            }
        })
        .collect();

    let edge_list = edges
        .iter()
        .map(|(from, to, _, _)| (alias[from], alias[to]))
        .collect();
    let edge_features = edges
        .iter()
        .map(|(_, _, mark, capacity)| vec![mark.len() as f64, (capacity / clock).log2()])
        .collect();

    Ok(SampleGraph {
        task: virtual_reticle_id,
        nodes: used.iter().map(|node| graph.coordinate(*node)).collect(),
        node_features,
        edge_list,
        edge_features,
        aux_latencies: AuxLatencies {
            num_total_flit: flit_count(profile.transmission_amount, graph.flit_size()),
            compute_latency: profile.compute_latency,
            dram_latency: profile.dram_latency,
        },
    })
}

/// The training label of task `var` at bottleneck `frequency`.
///
/// For each link carrying the task, the number of flits sent per flit of the
/// task is the relative flit count of every flow sharing the link while the
/// link is busy, and 1 otherwise. It is scaled by the share of the task's
/// flits that use the link and the largest value over all links is returned.
#[must_use]
pub fn flits_per_service(
    annotated: &AnnotatedGraph,
    var: TaskVar,
    num_total_flit: u64,
    frequency: f64,
) -> f64 {
    let graph = annotated.graph();
    let flit_size = graph.flit_size();
    let mut factor: f64 = 0.0;
    for (link, mark) in task_links(annotated, var) {
        let Some(amount) = mark.get(var) else {
            continue;
        };
        let own_flits = flit_count(amount, flit_size) as f64;
        let relative_flits: f64 = mark
            .iter()
            .map(|(_, other)| flit_count(other, flit_size) as f64 / own_flits)
            .sum();
        let bw_util = mark.total() * frequency / graph.link_capacity(link);
        let per_service = relative_flits * bw_util + (1.0 - bw_util);
        factor = factor.max(per_service * own_flits / num_total_flit as f64);
    }
    factor
}

/// Latency of one iteration of the workload rebuilt from a flits-per-service
/// value of the task described by `aux`.
#[must_use]
pub fn reconstructed_latency(aux: &AuxLatencies, flits_per_service: f64, clock: f64) -> f64 {
    let transmission = flits_per_service * aux.num_total_flit as f64 / clock;
    transmission.max(aux.compute_latency).max(aux.dram_latency)
}

/// Tasks using the link with the most data, in variable order.
///
/// Ties between links are won by the first link.
pub fn hottest_link_vars(annotated: &AnnotatedGraph) -> Result<Vec<TaskVar>, EvalError> {
    let mut hottest: Option<(f64, &DemandMark)> = None;
    for (_, mark) in annotated.transmission_marks() {
        let total = mark.total();
        if hottest.is_none_or(|(max, _)| total > max) {
            hottest = Some((total, mark));
        }
    }
    match hottest {
        Some((total, mark)) if total > 0.0 => Ok(mark.iter().map(|(var, _)| var).collect()),
        _ => eval_error!(DegenerateWorkload, "No link carries any data"),
    }
}
