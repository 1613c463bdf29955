/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! `CpuComputeResource`: the concrete [`ComputeResource`] every demo and
//! integration test attaches to a `MacroScheduler`. It
//! composes a [`MicroSchedulerResource`] (holds the registered
//! `CheckForTask` bridge) with a [`WorkerPool`] (the threads that
//! actually drive it).

use std::sync::Arc;

use gts_core::task::Node;
use gts_core::{CheckForTask, ComputeResource, MicroSchedulerResource};

use crate::pool::WorkerPool;

pub struct CpuComputeResource {
    bridge: Arc<MicroSchedulerResource>,
    pool: Arc<WorkerPool>,
}

impl CpuComputeResource {
    /// Build a CPU resource with `worker_count` threads (0 defers to
    /// `num_cpus::get()`), attached to resource index `index`, running
    /// workloads looked up from `nodes`.
    pub fn new(name: impl Into<String>, index: u32, relative_speed: f64, worker_count: usize, nodes: Arc<[Node]>) -> Self {
        let worker_count = if worker_count == 0 { num_cpus::get() } else { worker_count };
        let bridge = Arc::new(MicroSchedulerResource::new(name, index, relative_speed));
        let pool = WorkerPool::start(worker_count, index, bridge.clone(), nodes);
        Self { bridge, pool }
    }

    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    pub fn shutdown(&self) {
        self.pool.shutdown();
    }
}

impl ComputeResource for CpuComputeResource {
    fn name(&self) -> &str {
        self.bridge.name()
    }

    fn resource_index(&self) -> u32 {
        self.bridge.resource_index()
    }

    fn register_schedule(&self, check_for_task: Arc<dyn CheckForTask>) {
        self.bridge.register_schedule(check_for_task)
    }

    fn relative_speed(&self) -> f64 {
        self.bridge.relative_speed()
    }

    fn processor_count(&self) -> u32 {
        self.pool.worker_count() as u32
    }

    fn receive_ready_node(&self, node_id: gts_core::task::NodeId) {
        // Hands straight to the bridge's own pending queue, which every
        // idle worker in `self.pool` drains ahead of its `check_for_task`
        // fallback (see `MicroSchedulerResource::pull`) — the dynamic
        // policy never needs to know this resource is backed by a real
        // worker pool at all.
        self.bridge.receive_ready_node(node_id)
    }
}
