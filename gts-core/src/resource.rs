/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Compute Resource and the Micro-Scheduler bridge.
//!
//! A [`ComputeResource`] is the macro-scheduler's handle onto some external
//! task engine (a worker pool, a GPU queue, whatever actually runs
//! workloads). The engine pulls work through [`CheckForTask`], which a
//! [`crate::schedule::Schedule`] implements; the macro-scheduler's only job
//! is to hand each registered resource the schedule's `CheckForTask`
//! implementation and otherwise stay out of the engine's way.

use std::sync::Arc;

use crate::task::NodeId;

/// Implemented by a [`crate::schedule::Schedule`] so an external task
/// engine, through the [`ComputeResource`] it is attached to, can pull the
/// next ready node and report completion — this is the entire contract
/// the callback interface requires.
pub trait CheckForTask: Send + Sync {
    /// The engine calls this when a worker attached to `resource_index` is
    /// idle. Returns the next node ready to run on that resource, or
    /// `None` if nothing is ready right now (the engine should go idle or
    /// try stealing from elsewhere).
    fn check_for_task(&self, resource_index: u32) -> Option<NodeId>;

    /// The engine calls this once the workload for `node_id` has finished
    /// running to completion on the resource that claimed it.
    fn on_node_complete(&self, node_id: NodeId);

    /// The engine reports how long `node_id` actually took to run on
    /// `resource_index`, in nanoseconds. Default is a no-op; only policies
    /// that rank nodes by observed cost (critical-node) override it.
    fn report_execution_cost(&self, _resource_index: u32, _node_id: NodeId, _nanos: u64) {}
}

/// A compute resource the macro-scheduler can place nodes on: a CPU worker
/// pool, a GPU queue, or any other external execution engine reachable
/// through the [`CheckForTask`] bridge.
pub trait ComputeResource: Send + Sync {
    fn name(&self) -> &str;

    /// Stable index used by [`crate::task::ResourceAffinity`] bitmasks.
    /// Must be unique within one [`crate::macro_scheduler::MacroScheduler`].
    fn resource_index(&self) -> u32;

    /// Wire this resource's engine up to a schedule's [`CheckForTask`]
    /// implementation. Called once by the macro-scheduler before a run
    /// starts.
    fn register_schedule(&self, check_for_task: Arc<dyn CheckForTask>);

    /// Relative processing speed for heterogeneity-aware placement
    /// (critical-node policy). `1.0` is the baseline;
    /// a resource that finishes the same node 4x faster than baseline
    /// reports `4.0`.
    fn relative_speed(&self) -> f64 {
        1.0
    }

    /// Number of independent execution units (worker threads, queues,
    /// lanes) this resource actually runs nodes on. The critical-node
    /// policy allocates one ready-queue "rank" per processor across every
    /// registered resource, not one per resource — a four-worker CPU pool
    /// contributes four ranks, not one. Default is `1` (a resource that is
    /// itself a single execution unit).
    fn processor_count(&self) -> u32 {
        1
    }

    /// Hand a ready node straight to this resource's own execution
    /// machinery, bypassing any schedule-owned ready queue. Used by the
    /// dynamic policy (see [`crate::schedule::DynamicSchedule`]), which
    /// holds no queues of its own and delegates all successor placement
    /// to whichever resource a node is routed to — that resource's own
    /// work-stealing then decides when and where the node actually runs.
    ///
    /// Default pushes nowhere; a resource that a dynamic schedule will run
    /// against must override this.
    fn receive_ready_node(&self, _node_id: NodeId) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FakeCheckForTask(Mutex<Vec<NodeId>>);
    impl CheckForTask for FakeCheckForTask {
        fn check_for_task(&self, _resource_index: u32) -> Option<NodeId> {
            self.0.lock().unwrap().pop()
        }
        fn on_node_complete(&self, _node_id: NodeId) {}
    }

    struct FakeResource {
        index: u32,
        registered: Mutex<Option<Arc<dyn CheckForTask>>>,
    }
    impl ComputeResource for FakeResource {
        fn name(&self) -> &str {
            "fake"
        }
        fn resource_index(&self) -> u32 {
            self.index
        }
        fn register_schedule(&self, check_for_task: Arc<dyn CheckForTask>) {
            *self.registered.lock().unwrap() = Some(check_for_task);
        }
    }

    #[test]
    fn register_schedule_stores_the_bridge() {
        let resource = FakeResource { index: 0, registered: Mutex::new(None) };
        let bridge: Arc<dyn CheckForTask> = Arc::new(FakeCheckForTask(Mutex::new(vec![NodeId(3)])));
        resource.register_schedule(bridge);
        let stored = resource.registered.lock().unwrap().clone().unwrap();
        assert_eq!(stored.check_for_task(0), Some(NodeId(3)));
    }

    #[test]
    fn default_relative_speed_is_baseline() {
        let resource = FakeResource { index: 1, registered: Mutex::new(None) };
        assert_eq!(resource.relative_speed(), 1.0);
    }
}
