/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! The Macro-Scheduler: owns the node arena, picks a [`SchedulePolicy`],
//! and drives one run by registering the built
//! schedule's [`CheckForTask`] bridge with every attached
//! [`ComputeResource`] and blocking until it reports completion.
//!
//! Building happens through [`MacroSchedulerBuilder`] while the graph is
//! still mutable (adding nodes, wiring predecessor/successor edges);
//! `build()` freezes the arena into an `Arc<[Node]>` so it can be shared,
//! read-only, with whatever schedule and engine end up running it.

use std::sync::Arc;

use crate::error::SchedulerError;
use crate::resource::ComputeResource;
use crate::schedule::{validate_dag, Schedule, SchedulePolicy};
use crate::task::{Node, NodeId};

/// Accumulates nodes and edges before a run. Not `Send`/`Sync` — intended
/// to be built up on one thread before `build()` hands ownership to the
/// immutable, freely-shareable [`MacroScheduler`].
#[derive(Default)]
pub struct MacroSchedulerBuilder {
    nodes: Vec<Node>,
}

impl MacroSchedulerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Record that `succ` must wait for `pred` to complete.
    pub fn add_edge(&mut self, pred: NodeId, succ: NodeId) {
        self.nodes[succ.index()].add_predecessor(pred);
        self.nodes[pred.index()].add_successor(succ);
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Freeze the graph and attach the resources it will run on.
    pub fn build(
        self,
        policy: SchedulePolicy,
        resources: Vec<Arc<dyn ComputeResource>>,
    ) -> Result<MacroScheduler, SchedulerError> {
        let nodes = self.freeze()?;
        Ok(MacroScheduler { nodes, resources, policy })
    }

    /// Validate and freeze the graph into a shareable node arena without
    /// attaching any resources yet. Exists for engines whose
    /// [`ComputeResource`] needs read access to the node arena at
    /// construction time (e.g. to look up a node's workload after
    /// pulling its id) — those resources can only be built from the
    /// frozen arena, which in turn must exist before [`MacroScheduler`]
    /// does. Pair with [`MacroScheduler::with_nodes`] to finish
    /// construction once the resources are ready.
    pub fn freeze(self) -> Result<Arc<[Node]>, SchedulerError> {
        if self.nodes.is_empty() {
            return Err(SchedulerError::NoNodes);
        }
        validate_dag(&self.nodes)?;
        Ok(self.nodes.into())
    }
}

/// An immutable, runnable DAG plus the resources it may execute on.
/// Cheap to share: everything inside is either `Arc` or interior-mutable
/// through atomics, so `run()` can be called from any thread and,
/// sequentially, any number of times (after [`MacroScheduler::reset`]).
pub struct MacroScheduler {
    nodes: Arc<[Node]>,
    resources: Vec<Arc<dyn ComputeResource>>,
    policy: SchedulePolicy,
}

impl MacroScheduler {
    /// Finish construction from a node arena already frozen by
    /// [`MacroSchedulerBuilder::freeze`], once the resources that needed
    /// to see that arena have been built.
    pub fn with_nodes(nodes: Arc<[Node]>, policy: SchedulePolicy, resources: Vec<Arc<dyn ComputeResource>>) -> Self {
        Self { nodes, resources, policy }
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// A cheap `Arc` clone of the node arena, for an external engine that
    /// needs to look up a [`Node`]'s [`crate::task::Workload`] by
    /// [`NodeId`] after pulling it through [`crate::resource::CheckForTask`]
    /// — the scheduler itself only ever hands out node identities, never
    /// the workload, so the engine keeps its own handle on the arena.
    pub fn nodes_handle(&self) -> Arc<[Node]> {
        self.nodes.clone()
    }

    pub fn policy(&self) -> SchedulePolicy {
        self.policy
    }

    /// Build a fresh schedule for this policy, register it with every
    /// resource, and block the calling thread until every node has
    /// completed. Whatever engine each [`ComputeResource`] wraps is
    /// responsible for actually pulling nodes through
    /// [`crate::resource::CheckForTask`] and running their workloads —
    /// this call only drives the handshake and waits.
    pub fn run(&self) -> Result<(), SchedulerError> {
        tracing::info!(nodes = self.nodes.len(), resources = self.resources.len(), policy = ?self.policy, "starting macro-scheduler run");
        let built = self.policy.build(self.nodes.clone(), &self.resources)?;
        for resource in &self.resources {
            resource.register_schedule(built.bridge.clone());
        }
        built.schedule.wait_until_complete();
        tracing::info!("macro-scheduler run complete");
        Ok(())
    }

    /// Reset every node's readiness counters for another `run()` call over
    /// the same graph (the idempotent re-execution property). Each
    /// node enforces, via [`crate::task::Node::reset_for_rerun`], that the
    /// previous run actually finished before allowing the reset.
    pub fn reset(&self) {
        for node in self.nodes.iter() {
            node.reset_for_rerun();
        }
    }
}
