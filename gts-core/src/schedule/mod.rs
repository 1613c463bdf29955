/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Schedule policies: central-queue, dynamic, and critical-node. A
//! [`Schedule`] is the object an external task engine talks to through
//! [`CheckForTask`] once the [`crate::macro_scheduler::MacroScheduler`]
//! has registered it with every [`ComputeResource`].
//!
//! All three policies share [`ScheduleCore`] for the parts that don't vary
//! by policy: the frozen node arena, the outstanding-node counter, and the
//! completion event a run blocks on.

pub mod central_queue;
pub mod critical_node;
pub mod dynamic;

pub use central_queue::CentralQueueSchedule;
pub use critical_node::CriticalNodeSchedule;
pub use dynamic::DynamicSchedule;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::resource::{CheckForTask, ComputeResource};
use crate::sync::platform::{Event, Platform, StdPlatform};
use crate::task::{Node, NodeId};

/// Implemented by every schedule policy. A policy is built once per run
/// from a frozen node arena and the registered resources, then driven
/// entirely through the inherited [`CheckForTask`] methods until every node
/// has completed.
pub trait Schedule: CheckForTask + Send + Sync {
    fn node_count(&self) -> usize;

    /// Block the calling thread until every node has completed.
    fn wait_until_complete(&self);
}

/// State shared by every schedule policy: the node arena, how many nodes
/// remain unfinished, and the event a `run()` call waits on.
pub(crate) struct ScheduleCore {
    nodes: Arc<[Node]>,
    remaining: AtomicUsize,
    done: Box<dyn Event>,
}

impl ScheduleCore {
    fn new(nodes: Arc<[Node]>) -> Self {
        let remaining = nodes.len();
        Self { nodes, remaining: AtomicUsize::new(remaining), done: StdPlatform.new_event() }
    }

    pub(crate) fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Record that one node finished. Returns `true` exactly once, for the
    /// call that brings `remaining` to zero.
    pub(crate) fn mark_node_complete(&self) -> bool {
        let prev = self.remaining.fetch_sub(1, Ordering::AcqRel);
        if prev == 1 {
            self.done.signal();
            true
        } else {
            false
        }
    }

    pub(crate) fn wait(&self) {
        self.done.wait();
    }

    pub(crate) fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// Every node in `nodes` with no predecessors — the initial ready set a
/// fresh run seeds its queue(s) with.
pub(crate) fn initially_ready(nodes: &[Node]) -> impl Iterator<Item = NodeId> + '_ {
    nodes.iter().enumerate().filter(|(_, n)| n.is_ready()).map(|(i, _)| NodeId(i as u32))
}

/// Validate that every predecessor/successor reference resolves to a real
/// node and that the graph is acyclic (Kahn's algorithm over
/// `init_predecessor_count`), catching a cycle at construction time
/// rather than discovering it mid-run.
pub fn validate_dag(nodes: &[Node]) -> Result<(), crate::error::SchedulerError> {
    use crate::error::SchedulerError;

    for (i, node) in nodes.iter().enumerate() {
        for &p in &node.predecessors {
            if p.index() >= nodes.len() {
                return Err(SchedulerError::UnknownNodeRef { node: node.debug_name.clone(), referenced: p.0 });
            }
        }
        for &s in &node.successors {
            if s.index() >= nodes.len() {
                return Err(SchedulerError::UnknownNodeRef { node: node.debug_name.clone(), referenced: s.0 });
            }
        }
        let _ = i;
    }

    let mut indegree: Vec<u32> = nodes.iter().map(|n| n.init_predecessor_count()).collect();
    let mut queue: Vec<usize> = indegree.iter().enumerate().filter(|(_, &d)| d == 0).map(|(i, _)| i).collect();
    let mut visited = 0usize;
    while let Some(i) = queue.pop() {
        visited += 1;
        for &succ in &nodes[i].successors {
            let d = &mut indegree[succ.index()];
            *d -= 1;
            if *d == 0 {
                queue.push(succ.index());
            }
        }
    }
    if visited != nodes.len() {
        let stuck = indegree.iter().position(|&d| d != 0).unwrap_or(0);
        return Err(SchedulerError::CycleDetected { node: nodes[stuck].debug_name.clone() });
    }
    Ok(())
}

/// Which policy a [`crate::macro_scheduler::MacroScheduler`] should build
/// for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulePolicy {
    /// One global ready queue plus per-resource affinity queues; simplest
    /// policy, best suited to a homogeneous resource set.
    CentralQueue,
    /// Per-resource queues with cross-resource stealing on starvation;
    /// minimal central state, delegating most placement decisions to
    /// whichever resource happens to be idle.
    Dynamic,
    /// Heterogeneity-aware: nodes on the critical path (highest up-rank)
    /// are steered toward the fastest registered resource.
    CriticalNode,
}

/// The two faces a built schedule is used through: [`Schedule`] by the
/// [`crate::macro_scheduler::MacroScheduler`] that owns the run, and
/// [`CheckForTask`] by whatever engine drives the registered resources.
/// Both `Arc`s point at the same concrete schedule object — each is an
/// independent unsizing coercion from that concrete type, so no trait
/// object upcasting is needed to produce them.
pub struct BuiltSchedule {
    pub schedule: Arc<dyn Schedule>,
    pub bridge: Arc<dyn CheckForTask>,
}

fn erase<T: Schedule + 'static>(concrete: T) -> BuiltSchedule {
    let concrete = Arc::new(concrete);
    BuiltSchedule { schedule: concrete.clone(), bridge: concrete }
}

impl SchedulePolicy {
    pub(crate) fn build(
        self,
        nodes: Arc<[Node]>,
        resources: &[Arc<dyn ComputeResource>],
    ) -> Result<BuiltSchedule, crate::error::SchedulerError> {
        match self {
            SchedulePolicy::CentralQueue => Ok(erase(CentralQueueSchedule::build(nodes, resources)?)),
            SchedulePolicy::Dynamic => Ok(erase(DynamicSchedule::build(nodes, resources)?)),
            SchedulePolicy::CriticalNode => Ok(erase(CriticalNodeSchedule::build(nodes, resources)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Workload;

    fn linear_chain(len: usize) -> Vec<Node> {
        let mut nodes: Vec<Node> = (0..len).map(|i| Node::new(format!("n{i}"), Workload::lambda(|_| {}))).collect();
        for i in 1..len {
            let pred = NodeId((i - 1) as u32);
            nodes[i].add_predecessor(pred);
            let succ = NodeId(i as u32);
            nodes[i - 1].add_successor(succ);
        }
        nodes
    }

    #[test]
    fn validate_dag_accepts_linear_chain() {
        let nodes = linear_chain(5);
        assert!(validate_dag(&nodes).is_ok());
    }

    #[test]
    fn validate_dag_rejects_cycle() {
        let mut nodes = linear_chain(3);
        // Introduce a back-edge 0 -> 2 -> 0.
        let n0 = NodeId(0);
        nodes[0].add_predecessor(NodeId(2));
        nodes[2].add_successor(n0);
        match validate_dag(&nodes) {
            Err(crate::error::SchedulerError::CycleDetected { .. }) => {}
            other => panic!("expected CycleDetected, got {other:?}"),
        }
    }

    #[test]
    fn validate_dag_rejects_unknown_reference() {
        let mut nodes = linear_chain(2);
        nodes[0].add_predecessor(NodeId(99));
        match validate_dag(&nodes) {
            Err(crate::error::SchedulerError::UnknownNodeRef { referenced: 99, .. }) => {}
            other => panic!("expected UnknownNodeRef, got {other:?}"),
        }
    }

    #[test]
    fn initially_ready_finds_only_root_nodes() {
        let nodes = linear_chain(4);
        let ready: Vec<_> = initially_ready(&nodes).collect();
        assert_eq!(ready, vec![NodeId(0)]);
    }
}
