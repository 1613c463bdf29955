/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Scenario 5: the diamond from `diamond.rs`, with `A`, `B`, `D` pinned to
//! resource 0 and `C` pinned to resource 1. Every iteration, `A`/`B`/`D`
//! must run on resource 0 and `C` on resource 1 — never the reverse, and
//! never on some other resource the schedule might otherwise have chosen.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use gts_core::{MacroSchedulerBuilder, MicroSchedulerResource, Node, NodeId, ResourceAffinity, SchedulePolicy, Workload};

fn counting_lambda(counter: Arc<AtomicU32>) -> Workload {
    Workload::lambda(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    })
}

#[test]
fn pinned_nodes_only_ever_run_on_their_resource() {
    for policy in [SchedulePolicy::CentralQueue, SchedulePolicy::Dynamic, SchedulePolicy::CriticalNode] {
        let ran_on_0 = Arc::new(AtomicU32::new(0));
        let ran_on_1 = Arc::new(AtomicU32::new(0));

        let mut builder = MacroSchedulerBuilder::new();
        let a = builder.add_node(Node::new("A", counting_lambda(ran_on_0.clone())).with_affinity(ResourceAffinity::pinned_to([0])));
        let b = builder.add_node(Node::new("B", counting_lambda(ran_on_0.clone())).with_affinity(ResourceAffinity::pinned_to([0])));
        let c = builder.add_node(Node::new("C", counting_lambda(ran_on_1.clone())).with_affinity(ResourceAffinity::pinned_to([1])));
        let d = builder.add_node(Node::new("D", counting_lambda(ran_on_0.clone())).with_affinity(ResourceAffinity::pinned_to([0])));
        builder.add_edge(a, b);
        builder.add_edge(a, c);
        builder.add_edge(b, d);
        builder.add_edge(c, d);

        let r0 = Arc::new(MicroSchedulerResource::new("r0", 0, 1.0));
        let r1 = Arc::new(MicroSchedulerResource::new("r1", 1, 1.0));
        let scheduler = Arc::new(
            builder
                .build(
                    policy,
                    vec![
                        r0.clone() as Arc<dyn gts_core::ComputeResource>,
                        r1.clone() as Arc<dyn gts_core::ComputeResource>,
                    ],
                )
                .unwrap(),
        );

        let seen_0 = Arc::new(std::sync::Mutex::new(Vec::<NodeId>::new()));
        let seen_1 = Arc::new(std::sync::Mutex::new(Vec::<NodeId>::new()));

        let s2 = scheduler.clone();
        let run = std::thread::spawn(move || s2.run());

        let (s0, r0w) = (seen_0.clone(), r0.clone());
        let w0 = std::thread::spawn(move || loop {
            if let Some(id) = r0w.pull() {
                s0.lock().unwrap().push(id);
                r0w.complete(id);
            }
            if ran_on_0.load(Ordering::SeqCst) == 3 && ran_on_1.load(Ordering::SeqCst) == 1 {
                break;
            }
            std::thread::yield_now();
        });
        let (s1, r1w) = (seen_1.clone(), r1.clone());
        let w1 = std::thread::spawn(move || loop {
            if let Some(id) = r1w.pull() {
                s1.lock().unwrap().push(id);
                r1w.complete(id);
            }
            if s1.lock().unwrap().len() == 1 {
                break;
            }
            std::thread::yield_now();
        });

        w0.join().unwrap();
        w1.join().unwrap();
        run.join().unwrap().unwrap();

        let on_0: Vec<NodeId> = seen_0.lock().unwrap().clone();
        let on_1: Vec<NodeId> = seen_1.lock().unwrap().clone();
        assert_eq!(on_1, vec![c], "policy {policy:?}: resource 1 must see only C");
        let mut sorted_0 = on_0.clone();
        sorted_0.sort();
        assert_eq!(sorted_0, vec![a, b, d], "policy {policy:?}: resource 0 must see exactly A, B, D");
    }
}
