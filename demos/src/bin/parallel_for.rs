/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! A node whose workload fans iterations out
//! across the worker pool must have every iteration observably complete
//! before a successor node runs.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use clap::Parser;
use gts_core::{ComputeResource, MacroSchedulerBuilder, Node, SchedulePolicy, Workload};
use gts_workers::CpuComputeResource;

#[derive(Parser)]
#[command(about = "Run the parallel-for-inside-a-node scenario")]
struct Args {
    #[arg(long, default_value_t = 64)]
    width: usize,
    #[arg(long, default_value_t = 4)]
    workers: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let results = Arc::new(Mutex::new(vec![0u32; args.width]));
    let mut builder = MacroSchedulerBuilder::new();

    let r = results.clone();
    let width = args.width as u32;
    let fan_out = builder.add_node(Node::new(
        "fan_out",
        Workload::parallel_for(width, move |i, _ctx| {
            r.lock().unwrap()[i as usize] = i * i;
        }),
    ));

    let r = results.clone();
    let check = builder.add_node(Node::new(
        "check",
        Workload::lambda(move |_ctx| {
            let snapshot = r.lock().unwrap();
            for (i, &v) in snapshot.iter().enumerate() {
                assert_eq!(v, (i * i) as u32, "successor ran before index {i} was written");
            }
        }),
    ));
    builder.add_edge(fan_out, check);

    let nodes = builder.freeze().map_err(|e| anyhow::anyhow!("{e}"))?;
    let resource = Arc::new(CpuComputeResource::new("cpu", 0, 1.0, args.workers, nodes.clone()));
    let resources: Vec<Arc<dyn ComputeResource>> = vec![resource.clone()];
    let scheduler = gts_core::MacroScheduler::with_nodes(nodes, SchedulePolicy::CentralQueue, resources);

    scheduler.run().map_err(|e| anyhow::anyhow!("{e}"))?;
    resource.shutdown();

    let final_results = results.lock().unwrap();
    for (i, &v) in final_results.iter().enumerate() {
        assert_eq!(v, (i * i) as u32);
    }
    println!("{} iterations fanned out and observed complete by the successor", args.width);
    Ok(())
}
