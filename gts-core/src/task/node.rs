/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Node: one vertex of the DAG.
//!
//! Predecessor/successor edges are stored as [`NodeId`] handles into the
//! owning [`crate::macro_scheduler::MacroScheduler`]'s node arena rather
//! than as direct references, so the graph has no lifetime entanglement
//! and no `Rc`/`Weak` cycle bookkeeping.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use super::affinity::ResourceAffinity;
use super::workload::Workload;

/// An index into a [`crate::macro_scheduler::MacroScheduler`]'s node
/// arena. Stable for the lifetime of the schedule that built it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Smoothing factor for [`Node::observe_execution_cost`]'s exponential
/// moving average: each new sample contributes 1/4 of the update.
const EWMA_SHIFT: u64 = 2;

/// One DAG vertex: a workload plus the two-phase predecessor-readiness
/// handshake a re-runnable DAG vertex needs, and the observed execution
/// cost the critical-node policy ranks nodes by.
///
/// `curr_predecessor_count` and `predecessor_complete_count` are both
/// initialized to `init_predecessor_count` and both count *down*, but they
/// gate two different things, decremented in two separate passes over a
/// finishing predecessor's successors:
///
/// 1. First pass, one `signal_predecessor_queued()` call per successor:
///    decrements `curr_predecessor_count`. Reaching zero means every
///    predecessor has been observed to finish — the caller enqueues the
///    node onto the schedule right away, in this same pass.
/// 2. Second pass, only after every successor has gone through step 1,
///    one `signal_predecessor_complete()` call per successor: decrements
///    `predecessor_complete_count`. Reaching zero is the signal a node
///    itself waits for (via [`Node::wait_until_safe_to_run`]) before
///    entering its `Workload`.
///
/// Splitting the handshake this way means a node can already be sitting in
/// a ready queue, possibly even picked up by an idle resource, before every
/// one of its predecessors has fully published the release fence that
/// makes its outputs visible — the node's own spin-wait in step 2 is the
/// *sole* synchronization point between "newly ready" and "safe to run",
/// matching the ordering guarantees a Workload relies on to see its
/// predecessors' writes.
pub struct Node {
    pub debug_name: String,
    pub workload: Workload,
    pub affinity: ResourceAffinity,
    pub predecessors: Vec<NodeId>,
    pub successors: Vec<NodeId>,
    init_predecessor_count: u32,
    curr_predecessor_count: AtomicU32,
    predecessor_complete_count: AtomicU32,
    /// EWMA of observed execution cost, in nanoseconds, on whichever
    /// resource most recently ran this node. Zero until the first
    /// observation. Feeds the critical-node policy's up-rank pass.
    execution_cost_nanos: AtomicU64,
}

impl Node {
    pub fn new(debug_name: impl Into<String>, workload: Workload) -> Self {
        Self {
            debug_name: debug_name.into(),
            workload,
            affinity: ResourceAffinity::Any,
            predecessors: Vec::new(),
            successors: Vec::new(),
            init_predecessor_count: 0,
            curr_predecessor_count: AtomicU32::new(0),
            predecessor_complete_count: AtomicU32::new(0),
            execution_cost_nanos: AtomicU64::new(0),
        }
    }

    pub fn with_affinity(mut self, affinity: ResourceAffinity) -> Self {
        self.affinity = affinity;
        self
    }

    /// Record that `pred` must complete before this node can run. Called
    /// while building the graph, before any run starts; bumps both the
    /// recorded edge list and the readiness counters in lockstep.
    pub fn add_predecessor(&mut self, pred: NodeId) {
        self.predecessors.push(pred);
        self.init_predecessor_count += 1;
        self.curr_predecessor_count.fetch_add(1, Ordering::Relaxed);
        self.predecessor_complete_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_successor(&mut self, succ: NodeId) {
        self.successors.push(succ);
    }

    pub fn init_predecessor_count(&self) -> u32 {
        self.init_predecessor_count
    }

    /// Remaining predecessor completions this node is still waiting on
    /// before it is safe to run (step 2 of the handshake). Zero once every
    /// predecessor's effects are guaranteed visible.
    pub fn predecessor_complete_count(&self) -> u32 {
        self.predecessor_complete_count.load(Ordering::Acquire)
    }

    /// True once every predecessor has been observed to finish (step 1 of
    /// the handshake) and this node has not yet itself been marked
    /// complete for the current run. A node can be `is_ready()` and still
    /// not be safe to run — see [`Node::wait_until_safe_to_run`].
    pub fn is_ready(&self) -> bool {
        self.curr_predecessor_count.load(Ordering::Acquire) == 0
    }

    /// Step 1: called once per successor edge, for every successor of a
    /// predecessor that just finished running, in one pass over all of
    /// that predecessor's successors. Returns `true` if this call was the
    /// one that brought the node to ready — the caller should enqueue it
    /// onto the schedule now, in this same pass, before moving on to step
    /// 2 for any successor.
    pub fn signal_predecessor_queued(&self) -> bool {
        self.curr_predecessor_count.fetch_sub(1, Ordering::AcqRel) == 1
    }

    /// Step 2: called once per successor edge, in a second pass over all
    /// of a finishing predecessor's successors, strictly after step 1 has
    /// run for every one of them. `Release` here forms the publish half of
    /// the handshake; [`Node::wait_until_safe_to_run`] is the matching
    /// `Acquire`.
    pub fn signal_predecessor_complete(&self) -> bool {
        self.predecessor_complete_count.fetch_sub(1, Ordering::Release) == 1
    }

    /// Spin-wait until every predecessor's completion has been published
    /// (step 2 above has run for every predecessor edge). Call this
    /// immediately before running this node's `Workload` — it is the only
    /// point at which the workload is guaranteed to observe every write
    /// its predecessors made.
    pub fn wait_until_safe_to_run(&self) {
        let mut backoff = crate::sync::Backoff::new();
        while self.predecessor_complete_count.load(Ordering::Acquire) != 0 {
            backoff.spin();
        }
    }

    /// Reset readiness counters for a fresh run of the same graph. Only
    /// valid once every predecessor signal from the previous run has been
    /// accounted for — enforced as a precondition rather than silently
    /// resetting over a still-in-flight run.
    pub fn reset_for_rerun(&self) {
        let remaining = self.predecessor_complete_count.load(Ordering::Acquire);
        if remaining != 0 {
            crate::error::precondition(&format!(
                "reset_for_rerun called on node '{}' with {remaining} of {} predecessor completions still outstanding",
                self.debug_name, self.init_predecessor_count,
            ));
        }
        self.curr_predecessor_count.store(self.init_predecessor_count, Ordering::Release);
        self.predecessor_complete_count.store(self.init_predecessor_count, Ordering::Release);
    }

    /// Fold a freshly observed execution cost (nanoseconds, on whatever
    /// resource just ran this node) into the running EWMA. The first
    /// observation is taken verbatim rather than blended against the
    /// zero-initialized average.
    pub fn observe_execution_cost(&self, nanos: u64) {
        let mut prev = self.execution_cost_nanos.load(Ordering::Relaxed);
        loop {
            let new = if prev == 0 { nanos } else { prev - (prev >> EWMA_SHIFT) + (nanos >> EWMA_SHIFT) };
            match self.execution_cost_nanos.compare_exchange_weak(prev, new, Ordering::Relaxed, Ordering::Relaxed) {
                Ok(_) => return,
                Err(cur) => prev = cur,
            }
        }
    }

    /// Current EWMA execution cost in nanoseconds; zero until the node has
    /// run at least once.
    pub fn execution_cost(&self) -> u64 {
        self.execution_cost_nanos.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf_node(name: &str) -> Node {
        Node::new(name, Workload::lambda(|_| {}))
    }

    #[test]
    fn node_with_no_predecessors_is_ready() {
        let n = leaf_node("root");
        assert!(n.is_ready());
    }

    #[test]
    fn node_becomes_ready_after_all_predecessors_queued() {
        let mut n = leaf_node("child");
        n.add_predecessor(NodeId(0));
        n.add_predecessor(NodeId(1));
        assert!(!n.is_ready());
        assert!(!n.signal_predecessor_queued());
        assert!(!n.is_ready());
        assert!(n.signal_predecessor_queued());
        assert!(n.is_ready());
    }

    #[test]
    fn ready_does_not_imply_safe_to_run() {
        let mut n = leaf_node("child");
        n.add_predecessor(NodeId(0));
        assert!(n.signal_predecessor_queued());
        assert!(n.is_ready());
        assert_eq!(n.predecessor_complete_count(), 1);
        assert!(n.signal_predecessor_complete());
        assert_eq!(n.predecessor_complete_count(), 0);
        n.wait_until_safe_to_run();
    }

    #[test]
    fn reset_for_rerun_restores_initial_counts() {
        let mut n = leaf_node("child");
        n.add_predecessor(NodeId(0));
        n.signal_predecessor_queued();
        n.signal_predecessor_complete();
        assert!(n.is_ready());
        n.reset_for_rerun();
        assert!(!n.is_ready());
        assert_eq!(n.predecessor_complete_count(), n.init_predecessor_count());
    }

    #[test]
    #[should_panic(expected = "still outstanding")]
    fn reset_before_all_completions_panics() {
        let mut n = leaf_node("child");
        n.add_predecessor(NodeId(0));
        n.add_predecessor(NodeId(1));
        n.signal_predecessor_queued();
        n.signal_predecessor_complete();
        n.reset_for_rerun();
    }

    #[test]
    fn idempotent_rerun_matches_init_count_after_full_cycle() {
        let mut n = leaf_node("child");
        for i in 0..3 {
            n.add_predecessor(NodeId(i));
        }
        for _ in 0..3 {
            n.signal_predecessor_queued();
        }
        for _ in 0..3 {
            n.signal_predecessor_complete();
        }
        assert_eq!(n.predecessor_complete_count(), 0);
        n.reset_for_rerun();
        assert_eq!(n.predecessor_complete_count(), n.init_predecessor_count());
        for _ in 0..3 {
            n.signal_predecessor_queued();
        }
        for _ in 0..3 {
            n.signal_predecessor_complete();
        }
        assert_eq!(n.predecessor_complete_count(), 0);
    }

    #[test]
    fn execution_cost_starts_at_zero_and_tracks_observations() {
        let n = leaf_node("n");
        assert_eq!(n.execution_cost(), 0);
        n.observe_execution_cost(1000);
        assert_eq!(n.execution_cost(), 1000);
        n.observe_execution_cost(1000);
        assert_eq!(n.execution_cost(), 1000);
    }

    #[test]
    fn execution_cost_smooths_toward_new_samples_without_jumping() {
        let n = leaf_node("n");
        n.observe_execution_cost(1000);
        n.observe_execution_cost(100);
        let cost = n.execution_cost();
        assert!(cost < 1000 && cost > 100, "expected a smoothed value between samples, got {cost}");
    }
}
