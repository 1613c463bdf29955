/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! A seeded random DAG (rank=100, 3-10 nodes per
//! rank, 50% edge probability). Every iteration's observed completion
//! order must be a valid topological ordering.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use gts_core::{ComputeResource, MacroSchedulerBuilder, MicroSchedulerResource, Node, NodeId, SchedulePolicy, Workload};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Parser)]
#[command(about = "Run the random-DAG scenario")]
struct Args {
    #[arg(long, default_value_t = 1)]
    seed: u64,
    #[arg(long, default_value_t = 5)]
    iterations: u32,
}

fn build_random_dag(seed: u64) -> MacroSchedulerBuilder {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut builder = MacroSchedulerBuilder::new();
    let mut prev_rank: Vec<NodeId> = Vec::new();

    for rank in 0..100 {
        let width = rng.gen_range(3..=10);
        let mut this_rank = Vec::with_capacity(width);
        for i in 0..width {
            let id = builder.add_node(Node::new(format!("r{rank}n{i}"), Workload::lambda(|_| {})));
            if !prev_rank.is_empty() {
                let mut wired = false;
                for &pred in &prev_rank {
                    if rng.gen_bool(0.5) {
                        builder.add_edge(pred, id);
                        wired = true;
                    }
                }
                if !wired {
                    builder.add_edge(prev_rank[0], id);
                }
            }
            this_rank.push(id);
        }
        prev_rank = this_rank;
    }
    builder
}

fn is_topological_order(node_count: usize, order: &[NodeId], predecessors_of: impl Fn(NodeId) -> Vec<NodeId>) -> bool {
    let mut position = vec![usize::MAX; node_count];
    for (pos, id) in order.iter().enumerate() {
        position[id.index()] = pos;
    }
    for id in order.iter() {
        for pred in predecessors_of(*id) {
            if position[pred.index()] >= position[id.index()] {
                return false;
            }
        }
    }
    true
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let builder = build_random_dag(args.seed);
    let node_count = builder.node_count();
    let nodes = builder.freeze().map_err(|e| anyhow::anyhow!("{e}"))?;
    let resource = Arc::new(MicroSchedulerResource::new("single", 0, 1.0));
    let scheduler = Arc::new(gts_core::MacroScheduler::with_nodes(
        nodes,
        SchedulePolicy::CentralQueue,
        vec![resource.clone() as Arc<dyn ComputeResource>],
    ));

    for iteration in 0..args.iterations {
        let s2 = scheduler.clone();
        let handle = std::thread::spawn(move || s2.run());

        let mut order = Vec::with_capacity(node_count);
        while order.len() < node_count {
            if let Some(id) = resource.pull() {
                order.push(id);
                resource.complete(id);
            } else {
                std::thread::yield_now();
            }
        }
        handle.join().unwrap()?;

        let valid = is_topological_order(node_count, &order, |id| scheduler.node(id).predecessors.clone());
        tracing::info!(iteration, valid, "random DAG iteration complete");
        println!("iteration {iteration}: topological order valid = {valid}");
        assert!(valid);
        scheduler.reset();
    }
    Ok(())
}
