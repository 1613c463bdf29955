/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Affinity pinning: the quick-start diamond with `A, B, D`
//! affinitized to resource 0 and `C` to resource 1. `A`/`B`/`D` must run
//! on resource 0, `C` on resource 1, every iteration.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use clap::Parser;
use gts_core::{ComputeResource, MacroSchedulerBuilder, MicroSchedulerResource, Node, NodeId, ResourceAffinity, SchedulePolicy, Workload};

#[derive(Parser)]
#[command(about = "Run the affinity-pinning scenario")]
struct Args {
    #[arg(long, default_value_t = 10)]
    iterations: u32,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    for iteration in 0..args.iterations {
        let mut builder = MacroSchedulerBuilder::new();
        let mut a = Node::new("A", Workload::lambda(|_| {}));
        a.affinity = ResourceAffinity::pinned_to([0]);
        let a = builder.add_node(a);
        let mut b = Node::new("B", Workload::lambda(|_| {}));
        b.affinity = ResourceAffinity::pinned_to([0]);
        let b = builder.add_node(b);
        let mut c = Node::new("C", Workload::lambda(|_| {}));
        c.affinity = ResourceAffinity::pinned_to([1]);
        let c = builder.add_node(c);
        let mut d = Node::new("D", Workload::lambda(|_| {}));
        d.affinity = ResourceAffinity::pinned_to([0]);
        let d = builder.add_node(d);
        builder.add_edge(a, b);
        builder.add_edge(a, c);
        builder.add_edge(b, d);
        builder.add_edge(c, d);

        let r0 = Arc::new(MicroSchedulerResource::new("r0", 0, 1.0));
        let r1 = Arc::new(MicroSchedulerResource::new("r1", 1, 1.0));
        let resources: Vec<Arc<dyn ComputeResource>> = vec![r0.clone(), r1.clone()];
        let scheduler = Arc::new(builder.build(SchedulePolicy::CentralQueue, resources)?);

        let s2 = scheduler.clone();
        let handle = std::thread::spawn(move || s2.run());

        let seen: Arc<Mutex<Vec<(NodeId, u32)>>> = Arc::new(Mutex::new(Vec::new()));
        while seen.lock().unwrap().len() < 4 {
            if let Some(id) = r0.pull() {
                seen.lock().unwrap().push((id, 0));
                r0.complete(id);
            }
            if let Some(id) = r1.pull() {
                seen.lock().unwrap().push((id, 1));
                r1.complete(id);
            }
            if seen.lock().unwrap().len() < 4 {
                std::thread::yield_now();
            }
        }
        handle.join().unwrap()?;

        let seen = seen.lock().unwrap();
        let on_r1: Vec<NodeId> = seen.iter().filter(|(_, r)| *r == 1).map(|(id, _)| *id).collect();
        assert_eq!(on_r1, vec![c], "only C may run on resource 1");
        tracing::info!(iteration, "affinity iteration complete");
        println!("iteration {iteration}: C ran on resource 1, everything else on resource 0");
    }
    Ok(())
}
