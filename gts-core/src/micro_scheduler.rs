/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! The Micro-Scheduler Compute Resource bridge: a small,
//! reusable [`ComputeResource`] implementation that any external task
//! engine can sit behind. It does nothing but hold the
//! [`CheckForTask`] a schedule registers and hand it back out through
//! [`MicroSchedulerResource::pull`]/[`MicroSchedulerResource::complete`] —
//! the engine itself (e.g. `gts_workers::pool::WorkerPool`) owns the actual
//! worker threads and calls these two methods from its idle loop.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::resource::{CheckForTask, ComputeResource};
use crate::sync::{RwSpinLock, SpinMutex};
use crate::task::NodeId;

/// Holds the registered [`CheckForTask`] bridge for one resource index and
/// exposes it to whatever engine drives that resource's workers. Also
/// holds the directly-dispatched queue a [`crate::schedule::DynamicSchedule`]
/// pushes into through [`ComputeResource::receive_ready_node`], since this
/// type is the resource every demo and test attaches when it has no worker
/// pool of its own to delegate to.
pub struct MicroSchedulerResource {
    name: String,
    index: u32,
    relative_speed: f64,
    bridge: RwSpinLock<Option<Arc<dyn CheckForTask>>>,
    pending: SpinMutex<VecDeque<NodeId>>,
}

impl MicroSchedulerResource {
    pub fn new(name: impl Into<String>, index: u32, relative_speed: f64) -> Self {
        Self {
            name: name.into(),
            index,
            relative_speed,
            bridge: RwSpinLock::new(None),
            pending: SpinMutex::new(VecDeque::new()),
        }
    }

    /// Called by an idle worker: first drain anything routed straight to
    /// this resource via [`ComputeResource::receive_ready_node`], then ask
    /// the registered schedule (if any) for the next ready node.
    pub fn pull(&self) -> Option<NodeId> {
        if let Some(id) = self.pending.lock().pop_front() {
            return Some(id);
        }
        self.bridge.read().as_ref()?.check_for_task(self.index)
    }

    /// Called by the engine once a node's workload finishes running.
    pub fn complete(&self, node_id: NodeId) {
        if let Some(bridge) = self.bridge.read().as_ref() {
            bridge.on_node_complete(node_id);
        }
    }

    /// Called by the engine with how long `node_id` actually took to run,
    /// so a cost-aware schedule (critical-node) can fold the observation
    /// into its ranking.
    pub fn report_execution_cost(&self, node_id: NodeId, nanos: u64) {
        if let Some(bridge) = self.bridge.read().as_ref() {
            bridge.report_execution_cost(self.index, node_id, nanos);
        }
    }

    pub fn is_registered(&self) -> bool {
        self.bridge.read().is_some()
    }
}

impl ComputeResource for MicroSchedulerResource {
    fn name(&self) -> &str {
        &self.name
    }

    fn resource_index(&self) -> u32 {
        self.index
    }

    fn register_schedule(&self, check_for_task: Arc<dyn CheckForTask>) {
        *self.bridge.write() = Some(check_for_task);
    }

    fn relative_speed(&self) -> f64 {
        self.relative_speed
    }

    fn receive_ready_node(&self, node_id: NodeId) {
        self.pending.lock().push_back(node_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingBridge {
        completed: Mutex<Vec<NodeId>>,
    }
    impl CheckForTask for RecordingBridge {
        fn check_for_task(&self, resource_index: u32) -> Option<NodeId> {
            Some(NodeId(resource_index))
        }
        fn on_node_complete(&self, node_id: NodeId) {
            self.completed.lock().unwrap().push(node_id);
        }
    }

    #[test]
    fn pull_returns_none_before_registration() {
        let r = MicroSchedulerResource::new("r0", 0, 1.0);
        assert_eq!(r.pull(), None);
        assert!(!r.is_registered());
    }

    #[test]
    fn pull_and_complete_route_through_registered_bridge() {
        let r = MicroSchedulerResource::new("r1", 7, 2.0);
        let bridge = Arc::new(RecordingBridge { completed: Mutex::new(Vec::new()) });
        r.register_schedule(bridge.clone());
        assert_eq!(r.pull(), Some(NodeId(7)));
        r.complete(NodeId(42));
        assert_eq!(*bridge.completed.lock().unwrap(), vec![NodeId(42)]);
    }

    #[test]
    fn relative_speed_reports_configured_value() {
        let r = MicroSchedulerResource::new("fast", 0, 4.0);
        assert_eq!(r.relative_speed(), 4.0);
    }

    #[test]
    fn directly_dispatched_nodes_are_pulled_before_the_bridge() {
        let r = MicroSchedulerResource::new("r0", 0, 1.0);
        let bridge = Arc::new(RecordingBridge { completed: Mutex::new(Vec::new()) });
        r.register_schedule(bridge);
        r.receive_ready_node(NodeId(99));
        assert_eq!(r.pull(), Some(NodeId(99)));
        // Pending drained, falls through to the bridge's `check_for_task`.
        assert_eq!(r.pull(), Some(NodeId(0)));
    }
}
