/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Scenario 4: two resources with relative speeds `{1.0, 2.0}`; a 10-rank
//! DAG with one critical-path node per rank costing twice its siblings.
//! After a warm-up iteration, critical-path nodes must land on the faster
//! resource (relative speed 2.0) at least 80% of the time.
//!
//! Which resource actually ran a node is recovered from the worker
//! thread's name (`gts-worker-{resource_index}-{worker_id}`, set in
//! `WorkerPool::start`) rather than plumbing resource identity through
//! `Workload` itself. The same `MacroScheduler` is reused across
//! iterations via `reset()` — building a fresh one each time would mean
//! the underlying `Node` arena's readiness counters (shared through the
//! cloned `Arc`) are already all zeroed from the previous run, which
//! would seed every node as ready instead of only the roots.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use gts_core::{ComputeResource, MacroScheduler, MacroSchedulerBuilder, Node, NodeId, SchedulePolicy, Workload};
use gts_workers::CpuComputeResource;

const RANKS: u32 = 10;

fn resource_index_of_current_thread() -> Option<u32> {
    std::thread::current()
        .name()
        .and_then(|n| n.strip_prefix("gts-worker-"))
        .and_then(|rest| rest.split('-').next())
        .and_then(|idx| idx.parse().ok())
}

fn build_ladder(recorder: Arc<Mutex<Vec<(NodeId, u32)>>>) -> (MacroSchedulerBuilder, HashSet<NodeId>) {
    let mut builder = MacroSchedulerBuilder::new();
    let mut critical = HashSet::with_capacity(RANKS as usize);
    let mut prev_critical: Option<NodeId> = None;

    for rank in 0..RANKS {
        let rec = recorder.clone();
        let crit = builder.add_node(Node::new(
            format!("critical{rank}"),
            Workload::lambda(move |ctx| {
                std::thread::sleep(Duration::from_micros(400));
                if let Some(idx) = resource_index_of_current_thread() {
                    rec.lock().unwrap().push((ctx.node_id(), idx));
                }
            }),
        ));
        let rec = recorder.clone();
        let sib = builder.add_node(Node::new(
            format!("sibling{rank}"),
            Workload::lambda(move |ctx| {
                std::thread::sleep(Duration::from_micros(200));
                if let Some(idx) = resource_index_of_current_thread() {
                    rec.lock().unwrap().push((ctx.node_id(), idx));
                }
            }),
        ));
        if let Some(pred) = prev_critical {
            builder.add_edge(pred, crit);
            builder.add_edge(pred, sib);
        }
        prev_critical = Some(crit);
        critical.insert(crit);
    }
    (builder, critical)
}

#[test]
fn critical_path_favors_the_faster_resource_after_warm_up() {
    let recorder = Arc::new(Mutex::new(Vec::new()));
    let (builder, critical) = build_ladder(recorder.clone());
    let nodes = builder.freeze().unwrap();

    let slow = Arc::new(CpuComputeResource::new("slow", 0, 1.0, 2, nodes.clone()));
    let fast = Arc::new(CpuComputeResource::new("fast", 1, 2.0, 2, nodes.clone()));
    let resources: Vec<Arc<dyn ComputeResource>> = vec![slow.clone(), fast.clone()];
    let scheduler = MacroScheduler::with_nodes(nodes, SchedulePolicy::CriticalNode, resources);

    // Warm-up iteration: discard, as real schedulers' first run pays for
    // cold caches and thread spin-up the steady state doesn't repeat.
    scheduler.run().unwrap();
    scheduler.reset();
    recorder.lock().unwrap().clear();

    let iterations = 10;
    for _ in 0..iterations {
        scheduler.run().unwrap();
        scheduler.reset();
    }

    slow.shutdown();
    fast.shutdown();

    let log = recorder.lock().unwrap();
    let mut critical_total = 0u32;
    let mut critical_on_fast = 0u32;
    for &(node_id, resource_idx) in log.iter() {
        if critical.contains(&node_id) {
            critical_total += 1;
            if resource_idx == 1 {
                critical_on_fast += 1;
            }
        }
    }
    assert_eq!(critical_total, RANKS * iterations);
    assert!(
        critical_on_fast * 10 >= critical_total * 8,
        "only {critical_on_fast}/{critical_total} critical-path runs landed on the fast resource"
    );
}
