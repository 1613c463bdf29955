/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Shared test helpers: a synchronous drain loop that exercises a built
//! [`gts_core::Schedule`] without a real worker engine attached, and a
//! topological-order checker for the random-DAG scenario.

use std::sync::Arc;

use gts_core::{CheckForTask, Node, NodeId, Schedule};

/// Drain `schedule` to completion on the calling thread, polling
/// `resource_count` resource indices round-robin. Returns the order nodes
/// were observed entering (one entry per `check_for_task` hit), matching
/// what a real engine's idle loop would produce for a single worker per
/// resource with no real concurrency.
pub fn drain_single_threaded(schedule: &Arc<dyn Schedule>, resource_count: u32) -> Vec<NodeId> {
    let mut order = Vec::with_capacity(schedule.node_count());
    loop {
        let mut progressed = false;
        for r in 0..resource_count.max(1) {
            if let Some(id) = schedule.check_for_task(r) {
                order.push(id);
                schedule.on_node_complete(id);
                progressed = true;
            }
        }
        if order.len() == schedule.node_count() {
            break;
        }
        assert!(progressed, "schedule stalled after observing {} of {} nodes", order.len(), schedule.node_count());
    }
    order
}

/// True if `order` is a valid topological ordering of `nodes`: for every
/// edge `pred -> succ`, `pred` appears strictly before `succ`.
pub fn is_topological_order(nodes: &[Node], order: &[NodeId]) -> bool {
    let mut position = vec![usize::MAX; nodes.len()];
    for (pos, id) in order.iter().enumerate() {
        position[id.index()] = pos;
    }
    for (i, node) in nodes.iter().enumerate() {
        for &pred in &node.predecessors {
            if position[pred.index()] >= position[i] {
                return false;
            }
        }
    }
    true
}

/// Same check, driven by a predecessor-lookup closure instead of a node
/// slice — for callers holding a built `MacroScheduler` rather than the
/// raw `Node`s it was constructed from.
pub fn is_topological_order_by(node_count: usize, order: &[NodeId], predecessors_of: impl Fn(NodeId) -> Vec<NodeId>) -> bool {
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
