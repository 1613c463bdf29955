/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Central-queue schedule: one global MPMC ready queue plus
//! one affinity queue per resource, for nodes pinned to a specific
//! resource. Simplest policy; best suited to a homogeneous resource set
//! where any idle worker can usefully take any unpinned node.

use std::sync::Arc;

use crate::error::SchedulerError;
use crate::resource::{CheckForTask, ComputeResource};
use crate::sync::MpmcQueue;
use crate::task::{Node, NodeId, ResourceAffinity};

use super::{initially_ready, validate_dag, Schedule, ScheduleCore};

pub struct CentralQueueSchedule {
    core: ScheduleCore,
    global: MpmcQueue<NodeId>,
    affinity_queues: Vec<MpmcQueue<NodeId>>,
}

impl CentralQueueSchedule {
    pub fn build(nodes: Arc<[Node]>, resources: &[Arc<dyn ComputeResource>]) -> Result<Self, SchedulerError> {
        validate_dag(&nodes)?;
        if nodes.is_empty() {
            return Err(SchedulerError::NoNodes);
        }
        let capacity = nodes.len().max(2);
        let schedule = Self {
            global: MpmcQueue::with_capacity(capacity),
            affinity_queues: (0..resources.len()).map(|_| MpmcQueue::with_capacity(capacity)).collect(),
            core: ScheduleCore::new(nodes),
        };
        for node_id in initially_ready(schedule.core.nodes()) {
            schedule.enqueue_ready(node_id)?;
        }
        Ok(schedule)
    }

    fn enqueue_ready(&self, node_id: NodeId) -> Result<(), SchedulerError> {
        let node = &self.core.nodes()[node_id.index()];
        match node.affinity {
            ResourceAffinity::Any => {
                self.global
                    .try_push(node_id)
                    .map_err(|_| SchedulerError::NoAvailableResource { node: node.debug_name.clone() })
            }
            ResourceAffinity::Pinned(_) => {
                let Some(target) = node.affinity.lowest_resource() else {
                    return Err(SchedulerError::NoAvailableResource { node: node.debug_name.clone() });
                };
                let queue = self
                    .affinity_queues
                    .get(target as usize)
                    .ok_or_else(|| SchedulerError::UnknownResource { node: node.debug_name.clone(), resource: target })?;
                queue.try_push(node_id).map_err(|_| SchedulerError::NoAvailableResource { node: node.debug_name.clone() })
            }
        }
    }
}

impl CheckForTask for CentralQueueSchedule {
    fn check_for_task(&self, resource_index: u32) -> Option<NodeId> {
        if let Some(queue) = self.affinity_queues.get(resource_index as usize) {
            if let Some(id) = queue.try_pop() {
                return Some(id);
            }
        }
        self.global.try_pop()
    }

    fn on_node_complete(&self, node_id: NodeId) {
        let node = &self.core.nodes()[node_id.index()];
        // Pass 1: every successor observes this predecessor finishing;
        // enqueue whichever successors that makes fully ready.
        for &succ_id in &node.successors {
            let succ = &self.core.nodes()[succ_id.index()];
            if succ.signal_predecessor_queued() {
                // Best-effort: an enqueue failure here means the relevant
                // queue is momentarily full, which cannot happen since
                // every queue is sized to the node count.
                let _ = self.enqueue_ready(succ_id);
            }
        }
        // Pass 2, strictly after pass 1 ran for every successor: publish
        // completion so each successor's own wait in `run_workload` can
        // unblock with every predecessor's writes visible.
        for &succ_id in &node.successors {
            self.core.nodes()[succ_id.index()].signal_predecessor_complete();
        }
        self.core.mark_node_complete();
    }
}

impl Schedule for CentralQueueSchedule {
    fn node_count(&self) -> usize {
        self.core.node_count()
    }

    fn wait_until_complete(&self) {
        self.core.wait();
    }
}
