/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Two resources with relative speeds `{1.0,
//! 2.0}`; a 10-rank DAG with one critical-path node per rank costing
//! twice its siblings. After a warm-up iteration, critical-path nodes
//! must land on the faster resource at least 80% of the time.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use gts_core::{ComputeResource, MacroScheduler, MacroSchedulerBuilder, Node, NodeId, SchedulePolicy, Workload};
use gts_workers::CpuComputeResource;

#[derive(Parser)]
#[command(about = "Run the heterogeneous critical-node scenario")]
struct Args {
    #[arg(long, default_value_t = 10)]
    ranks: u32,
    #[arg(long, default_value_t = 10)]
    iterations: u32,
}

fn resource_index_of_current_thread() -> Option<u32> {
    std::thread::current()
        .name()
        .and_then(|n| n.strip_prefix("gts-worker-"))
        .and_then(|rest| rest.split('-').next())
        .and_then(|idx| idx.parse().ok())
}

fn build_ladder(ranks: u32, recorder: Arc<Mutex<Vec<(NodeId, u32)>>>) -> (MacroSchedulerBuilder, HashSet<NodeId>) {
    let mut builder = MacroSchedulerBuilder::new();
    let mut critical = HashSet::with_capacity(ranks as usize);
    let mut prev_critical: Option<NodeId> = None;

    for rank in 0..ranks {
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

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let recorder = Arc::new(Mutex::new(Vec::new()));
    let (builder, critical) = build_ladder(args.ranks, recorder.clone());
    let nodes = builder.freeze().map_err(|e| anyhow::anyhow!("{e}"))?;

    let slow = Arc::new(CpuComputeResource::new("slow", 0, 1.0, 2, nodes.clone()));
    let fast = Arc::new(CpuComputeResource::new("fast", 1, 2.0, 2, nodes.clone()));
    let resources: Vec<Arc<dyn ComputeResource>> = vec![slow.clone(), fast.clone()];
    let scheduler = MacroScheduler::with_nodes(nodes, SchedulePolicy::CriticalNode, resources);

    scheduler.run().map_err(|e| anyhow::anyhow!("{e}"))?;
    scheduler.reset();
    recorder.lock().unwrap().clear();

    for i in 0..args.iterations {
        scheduler.run().map_err(|e| anyhow::anyhow!("{e}"))?;
        scheduler.reset();
        tracing::info!(iteration = i, "heterogeneous iteration complete");
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
    let pct = 100.0 * critical_on_fast as f64 / critical_total.max(1) as f64;
    println!("{critical_on_fast}/{critical_total} critical-path runs landed on the fast resource ({pct:.1}%)");
    Ok(())
}
