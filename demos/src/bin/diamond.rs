/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Four nodes `A→B, A→C, B→D, C→D` on a single
//! resource, run for a number of iterations. Every iteration must
//! complete every node exactly once, in one of the two valid orderings.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use gts_core::{ComputeResource, MacroSchedulerBuilder, MicroSchedulerResource, Node, NodeId, SchedulePolicy, Workload};

#[derive(Parser)]
#[command(about = "Run the diamond DAG scenario")]
struct Args {
    #[arg(long, default_value_t = 10)]
    iterations: u32,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    for iteration in 0..args.iterations {
        let mut builder = MacroSchedulerBuilder::new();
        let a = builder.add_node(Node::new("A", Workload::lambda(|_| {})));
        let b = builder.add_node(Node::new("B", Workload::lambda(|_| {})));
        let c = builder.add_node(Node::new("C", Workload::lambda(|_| {})));
        let d = builder.add_node(Node::new("D", Workload::lambda(|_| {})));
        builder.add_edge(a, b);
        builder.add_edge(a, c);
        builder.add_edge(b, d);
        builder.add_edge(c, d);

        let resource = Arc::new(MicroSchedulerResource::new("single", 0, 1.0));
        let scheduler = Arc::new(builder.build(SchedulePolicy::CentralQueue, vec![resource.clone() as Arc<dyn ComputeResource>])?);

        let s2 = scheduler.clone();
        let handle = std::thread::spawn(move || s2.run());

        let names = [(a, "A"), (b, "B"), (c, "C"), (d, "D")];
        let label_of = |id: NodeId| names.iter().find(|(n, _)| *n == id).unwrap().1;

        let mut order: Vec<NodeId> = Vec::new();
        while order.len() < 4 {
            if let Some(id) = resource.pull() {
                order.push(id);
                resource.complete(id);
            } else {
                std::thread::yield_now();
            }
        }
        handle.join().unwrap()?;

        let labels: Vec<&str> = order.iter().map(|&id| label_of(id)).collect();
        tracing::info!(iteration, ?labels, "diamond run complete");
        println!("iteration {iteration}: {labels:?}");
    }
    Ok(())
}
