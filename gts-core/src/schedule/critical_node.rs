/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Critical-node schedule: heterogeneity-aware
//! placement. An up-rank pass (longest path to a sink, weighted by each
//! node's observed [`Node::execution_cost`] rather than by plain node
//! count) identifies the critical path once at build time; nodes on the
//! upper half of the rank distribution are critical. Rather than a single
//! shared critical queue plus one general queue per resource, every
//! processor this schedule can place work on gets its own ready-queue
//! "rank" — a four-worker CPU pool contributes four ranks, a single-lane
//! resource contributes one — and critical nodes are handed out into those
//! ranks through a down-rank pass that fills the fastest resource's window
//! of ranks first, moving on to the next resource's window only once that
//! one saturates.
//!
//! A node's [`Node::execution_cost`] starts at zero (no observations yet),
//! so the very first `run()` over a freshly-built graph ranks every node
//! by plain depth-to-sink, same as a uniform-cost graph. Each [`crate::macro_scheduler::MacroScheduler::run`]
//! reports the actual wall-clock cost of every node it executes back
//! through [`CheckForTask::report_execution_cost`]; a subsequent `run()`
//! over the same graph (after [`crate::macro_scheduler::MacroScheduler::reset`])
//! builds a fresh schedule and therefore a fresh up-rank pass seeded by
//! those observations, so placement sharpens over repeated runs of the
//! same graph shape.

use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::SchedulerError;
use crate::resource::{CheckForTask, ComputeResource};
use crate::sync::MpmcQueue;
use crate::task::{Node, NodeId, ResourceAffinity};

use super::{initially_ready, validate_dag, Schedule, ScheduleCore};

/// Compute each node's up-rank: the longest path to any sink, weighted by
/// [`Node::execution_cost`] (nanoseconds), falling back to a uniform unit
/// cost of `1` for any node with no observation yet — so an unprofiled
/// graph still ranks by plain depth rather than collapsing every node to
/// rank zero. Requires the graph already validated acyclic by
/// [`validate_dag`]; processes nodes in reverse topological order so every
/// successor's rank is known before its predecessors are visited.
fn compute_up_ranks(nodes: &[Node]) -> Vec<u64> {
    let mut rank: Vec<Option<u64>> = vec![None; nodes.len()];
    let mut remaining_out: Vec<usize> = nodes.iter().map(|n| n.successors.len()).collect();
    let mut frontier: Vec<usize> = remaining_out.iter().enumerate().filter(|(_, &d)| d == 0).map(|(i, _)| i).collect();

    let cost = |n: &Node| -> u64 {
        let observed = n.execution_cost();
        if observed == 0 {
            1
        } else {
            observed
        }
    };

    while let Some(i) = frontier.pop() {
        // A sink contributes rank 0; every other node's rank is the best
        // of its successors' ranks plus its own observed (or default
        // unit) cost.
        let r = if nodes[i].successors.is_empty() {
            0
        } else {
            let own_cost = cost(&nodes[i]);
            nodes[i]
                .successors
                .iter()
                .map(|s| rank[s.index()].expect("successor ranked before predecessor in reverse-topo order"))
                .max()
                .expect("non-empty successors")
                + own_cost
        };
        rank[i] = Some(r);
        for &p in &nodes[i].predecessors {
            let out = &mut remaining_out[p.index()];
            *out -= 1;
            if *out == 0 {
                frontier.push(p.index());
            }
        }
    }

    rank.into_iter().map(|r| r.expect("validate_dag guarantees every node is reachable from a sink")).collect()
}

/// Assigns processor ranks to resources: each resource claims a
/// contiguous range of rank indices sized to its
/// [`ComputeResource::processor_count`], with faster resources (by
/// [`ComputeResource::relative_speed`]) claiming the lowest-numbered
/// ranks. Critical nodes are filled into this range order so the fastest
/// resource's ranks saturate first.
struct RankPlan {
    /// `(resource_index, rank_range)`, ordered fastest-first.
    by_speed: Vec<(u32, Range<usize>)>,
    total_ranks: usize,
}

impl RankPlan {
    fn build(resources: &[Arc<dyn ComputeResource>]) -> Self {
        let mut ordered: Vec<&Arc<dyn ComputeResource>> = resources.iter().collect();
        ordered.sort_by(|a, b| b.relative_speed().total_cmp(&a.relative_speed()));
        let mut by_speed = Vec::with_capacity(ordered.len());
        let mut cursor = 0usize;
        for r in ordered {
            let width = r.processor_count().max(1) as usize;
            by_speed.push((r.resource_index(), cursor..cursor + width));
            cursor += width;
        }
        Self { by_speed, total_ranks: cursor.max(1) }
    }

    fn range_for(&self, resource_index: u32) -> Option<Range<usize>> {
        self.by_speed.iter().find(|(idx, _)| *idx == resource_index).map(|(_, r)| r.clone())
    }

    /// The rank a node at down-rank position `cursor` (0, 1, 2, ...) lands
    /// in: walk the fastest-first resource windows in order, wrapping back
    /// to the fastest resource's window once every resource's window has
    /// been visited once. This is the "move the rank window down, one
    /// resource's window before the next" pass.
    fn rank_for_cursor(&self, cursor: usize) -> usize {
        if self.by_speed.is_empty() {
            return 0;
        }
        let slot = cursor % self.total_ranks;
        let mut offset = 0usize;
        for (_, range) in &self.by_speed {
            let width = range.end - range.start;
            if slot < offset + width {
                return range.start + (slot - offset);
            }
            offset += width;
        }
        self.by_speed[0].1.start
    }
}

pub struct CriticalNodeSchedule {
    core: ScheduleCore,
    up_rank: Vec<u64>,
    critical_threshold: u64,
    plan: RankPlan,
    rank_queues: Vec<MpmcQueue<NodeId>>,
    down_rank_cursor: AtomicUsize,
    round_robin: AtomicUsize,
}

impl CriticalNodeSchedule {
    pub fn build(nodes: Arc<[Node]>, resources: &[Arc<dyn ComputeResource>]) -> Result<Self, SchedulerError> {
        validate_dag(&nodes)?;
        if nodes.is_empty() {
            return Err(SchedulerError::NoNodes);
        }
        let up_rank = compute_up_ranks(&nodes);
        let mut sorted_ranks = up_rank.clone();
        sorted_ranks.sort_unstable();
        let critical_threshold = sorted_ranks[sorted_ranks.len() / 2];

        let plan = RankPlan::build(resources);
        let capacity = nodes.len().max(2);
        let schedule = Self {
            rank_queues: (0..plan.total_ranks).map(|_| MpmcQueue::with_capacity(capacity)).collect(),
            down_rank_cursor: AtomicUsize::new(0),
            round_robin: AtomicUsize::new(0),
            critical_threshold,
            up_rank,
            plan,
            core: ScheduleCore::new(nodes),
        };
        for node_id in initially_ready(schedule.core.nodes()) {
            schedule.enqueue_ready(node_id)?;
        }
        Ok(schedule)
    }

    fn is_critical(&self, node_id: NodeId) -> bool {
        self.up_rank[node_id.index()] >= self.critical_threshold
    }

    fn enqueue_ready(&self, node_id: NodeId) -> Result<(), SchedulerError> {
        let node = &self.core.nodes()[node_id.index()];

        if let ResourceAffinity::Pinned(_) = node.affinity {
            let target = node
                .affinity
                .lowest_resource()
                .ok_or_else(|| SchedulerError::NoAvailableResource { node: node.debug_name.clone() })?;
            let range = self
                .plan
                .range_for(target)
                .ok_or_else(|| SchedulerError::UnknownResource { node: node.debug_name.clone(), resource: target })?;
            let rank = range.start + (self.round_robin.fetch_add(1, Ordering::Relaxed) % (range.end - range.start).max(1));
            return self.rank_queues[rank]
                .try_push(node_id)
                .map_err(|_| SchedulerError::NoAvailableResource { node: node.debug_name.clone() });
        }

        let rank = if self.is_critical(node_id) {
            let cursor = self.down_rank_cursor.fetch_add(1, Ordering::Relaxed);
            self.plan.rank_for_cursor(cursor)
        } else {
            self.round_robin.fetch_add(1, Ordering::Relaxed) % self.rank_queues.len().max(1)
        };
        self.rank_queues[rank].try_push(node_id).map_err(|_| SchedulerError::NoAvailableResource { node: node.debug_name.clone() })
    }

    /// The rank range this resource owns, or `None` if it was never
    /// registered with this schedule.
    fn own_range(&self, resource_index: u32) -> Option<Range<usize>> {
        self.plan.range_for(resource_index)
    }
}

impl CheckForTask for CriticalNodeSchedule {
    fn check_for_task(&self, resource_index: u32) -> Option<NodeId> {
        let total = self.rank_queues.len();
        let own = self.own_range(resource_index).unwrap_or(0..0);
        // Own ranks first — a resource always prefers the work placed for
        // it before reaching into another resource's window.
        for rank in own.clone() {
            if let Some(id) = self.rank_queues[rank].try_pop() {
                return Some(id);
            }
        }
        // Scan upward from this resource's own window, wrapping around,
        // so an idle fast resource can help drain a slower resource's
        // backlog rather than starve it.
        for offset in 0..total {
            let rank = (own.end + offset) % total;
            if rank >= own.start && rank < own.end {
                continue;
            }
            if let Some(id) = self.rank_queues[rank].try_pop() {
                return Some(id);
            }
        }
        None
    }

    fn on_node_complete(&self, node_id: NodeId) {
        let node = &self.core.nodes()[node_id.index()];
        for &succ_id in &node.successors {
            let succ = &self.core.nodes()[succ_id.index()];
            if succ.signal_predecessor_queued() {
                let _ = self.enqueue_ready(succ_id);
            }
        }
        for &succ_id in &node.successors {
            self.core.nodes()[succ_id.index()].signal_predecessor_complete();
        }
        self.core.mark_node_complete();
    }

    fn report_execution_cost(&self, _resource_index: u32, node_id: NodeId, nanos: u64) {
        self.core.nodes()[node_id.index()].observe_execution_cost(nanos);
    }
}

impl Schedule for CriticalNodeSchedule {
    fn node_count(&self) -> usize {
        self.core.node_count()
    }

    fn wait_until_complete(&self) {
        self.core.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Workload;

    fn resources_with_one_fast(slow_count: usize) -> Vec<Arc<dyn ComputeResource>> {
        let mut v: Vec<Arc<dyn ComputeResource>> = (0..slow_count)
            .map(|i| Arc::new(crate::micro_scheduler::MicroSchedulerResource::new(format!("slow{i}"), i as u32, 1.0)) as Arc<dyn ComputeResource>)
            .collect();
        v.push(Arc::new(crate::micro_scheduler::MicroSchedulerResource::new("fast", slow_count as u32, 4.0)));
        v
    }

    fn chain(len: usize) -> Vec<Node> {
        let mut nodes: Vec<Node> = (0..len).map(|i| Node::new(format!("n{i}"), Workload::lambda(|_| {}))).collect();
        for i in 1..len {
            nodes[i].add_predecessor(NodeId((i - 1) as u32));
            nodes[i - 1].add_successor(NodeId(i as u32));
        }
        nodes
    }

    #[test]
    fn up_ranks_decrease_toward_the_sink_with_uniform_unobserved_cost() {
        let nodes = chain(5);
        let ranks = compute_up_ranks(&nodes);
        for w in ranks.windows(2) {
            assert!(w[0] > w[1]);
        }
        assert_eq!(ranks[4], 0);
    }

    #[test]
    fn sink_rank_is_not_confused_with_unranked() {
        let nodes = chain(1);
        let ranks = compute_up_ranks(&nodes);
        assert_eq!(ranks, vec![0]);
    }

    #[test]
    fn up_rank_follows_observed_execution_cost_once_reported() {
        let nodes = chain(3);
        nodes[0].observe_execution_cost(1_000);
        nodes[1].observe_execution_cost(1);
        nodes[2].observe_execution_cost(1);
        let ranks = compute_up_ranks(&nodes);
        // n0's own large cost dominates its rank even though it is two
        // hops from the sink, not just its hop-count.
        assert!(ranks[0] > ranks[1]);
        assert!(ranks[1] >= ranks[2]);
    }

    #[test]
    fn rank_plan_gives_the_fastest_resource_the_lowest_rank_window() {
        let resources = resources_with_one_fast(2);
        let plan = RankPlan::build(&resources);
        // "fast" (index 2, speed 4.0) must own rank 0.
        let fast_range = plan.range_for(2).unwrap();
        assert_eq!(fast_range.start, 0);
        assert_eq!(plan.total_ranks, 3);
    }

    #[test]
    fn down_rank_cursor_fills_the_fast_window_before_spilling_to_the_next() {
        let resources = resources_with_one_fast(1);
        let plan = RankPlan::build(&resources);
        // Two single-processor resources: fast owns rank 0, slow owns rank 1.
        assert_eq!(plan.rank_for_cursor(0), 0);
        assert_eq!(plan.rank_for_cursor(1), 1);
        assert_eq!(plan.rank_for_cursor(2), 0);
    }

    #[test]
    fn majority_of_a_long_chain_is_placed_on_the_fast_resource() {
        let len = 50;
        let nodes: Arc<[Node]> = chain(len).into();
        let resources = resources_with_one_fast(4);
        let schedule: Arc<dyn Schedule> = Arc::new(CriticalNodeSchedule::build(nodes, &resources).unwrap());
        let fast_idx = 4u32;
        let mut fast_count = 0u32;
        let mut total = 0u32;
        loop {
            let mut progressed = false;
            for r in (0..=fast_idx).rev() {
                if let Some(id) = schedule.check_for_task(r) {
                    if r == fast_idx {
                        fast_count += 1;
                    }
                    total += 1;
                    schedule.on_node_complete(id);
                    progressed = true;
                    break;
                }
            }
            if total as usize == schedule.node_count() {
                break;
            }
            assert!(progressed, "deadlocked before completing the chain");
        }
        assert!(fast_count * 10 >= total * 5, "fast resource only got {fast_count}/{total} nodes");
    }

    #[test]
    fn reported_execution_cost_is_folded_into_the_nodes_ewma() {
        let nodes: Arc<[Node]> = chain(2).into();
        let schedule = CriticalNodeSchedule::build(nodes, &[]).unwrap();
        schedule.report_execution_cost(0, NodeId(0), 4_000);
        assert_eq!(schedule.core.nodes()[0].execution_cost(), 4_000);
    }
}
