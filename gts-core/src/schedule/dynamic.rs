/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Dynamic schedule: holds only the source/sink bookkeeping
//! in [`ScheduleCore`], no ready queues of its own. A node becoming ready
//! is handed straight to a resource's own execution machinery through
//! [`crate::resource::ComputeResource::receive_ready_node`] — unpinned
//! nodes round-robin across the registered resources, affinity-pinned
//! nodes go straight to their resource — and from that point on it is
//! entirely up to the resource's own work-stealing (its worker pool's
//! `crossbeam_deque` injector/stealers, not anything this schedule tracks)
//! to decide when and on which worker the node actually runs. This is
//! what distinguishes "dynamic" from the central-queue policy: there is no
//! shared ready-queue state here to contend on at all.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::SchedulerError;
use crate::resource::{CheckForTask, ComputeResource};
use crate::task::{Node, NodeId, ResourceAffinity};

use super::{initially_ready, validate_dag, Schedule, ScheduleCore};

pub struct DynamicSchedule {
    core: ScheduleCore,
    resources: Vec<Arc<dyn ComputeResource>>,
    round_robin: AtomicUsize,
}

impl DynamicSchedule {
    pub fn build(nodes: Arc<[Node]>, resources: &[Arc<dyn ComputeResource>]) -> Result<Self, SchedulerError> {
        validate_dag(&nodes)?;
        if nodes.is_empty() {
            return Err(SchedulerError::NoNodes);
        }
        let schedule = Self {
            resources: resources.to_vec(),
            round_robin: AtomicUsize::new(0),
            core: ScheduleCore::new(nodes),
        };
        for node_id in initially_ready(schedule.core.nodes()) {
            schedule.dispatch(node_id)?;
        }
        Ok(schedule)
    }

    /// Route a newly-ready node straight to a resource, never to a queue
    /// this schedule owns. Affinity-pinned nodes go to their pinned
    /// resource (`receiveAffinitizedNode`); unpinned nodes round-robin
    /// across every registered resource and are left entirely to that
    /// resource's own stealing to redistribute from there.
    fn dispatch(&self, node_id: NodeId) -> Result<(), SchedulerError> {
        let node = &self.core.nodes()[node_id.index()];
        if self.resources.is_empty() {
            return Err(SchedulerError::NoAvailableResource { node: node.debug_name.clone() });
        }
        let target = match node.affinity {
            ResourceAffinity::Any => {
                let n = self.resources.len();
                self.round_robin.fetch_add(1, Ordering::Relaxed) % n
            }
            ResourceAffinity::Pinned(_) => {
                let Some(target) = node.affinity.lowest_resource() else {
                    return Err(SchedulerError::NoAvailableResource { node: node.debug_name.clone() });
                };
                let target = target as usize;
                if self.resources.iter().position(|r| r.resource_index() == target as u32).is_none() {
                    return Err(SchedulerError::UnknownResource { node: node.debug_name.clone(), resource: target as u32 });
                }
                target
            }
        };
        let resource = self
            .resources
            .iter()
            .find(|r| r.resource_index() == target as u32)
            .unwrap_or(&self.resources[target % self.resources.len()]);
        resource.receive_ready_node(node_id);
        Ok(())
    }
}

impl CheckForTask for DynamicSchedule {
    /// The schedule never queues anything itself; every ready node was
    /// already handed straight to a resource at the moment it became
    /// ready, so there is nothing left here for a resource to pull.
    fn check_for_task(&self, _resource_index: u32) -> Option<NodeId> {
        None
    }

    fn on_node_complete(&self, node_id: NodeId) {
        let node = &self.core.nodes()[node_id.index()];
        for &succ_id in &node.successors {
            let succ = &self.core.nodes()[succ_id.index()];
            if succ.signal_predecessor_queued() {
                let _ = self.dispatch(succ_id);
            }
        }
        for &succ_id in &node.successors {
            self.core.nodes()[succ_id.index()].signal_predecessor_complete();
        }
        self.core.mark_node_complete();
    }
}

impl Schedule for DynamicSchedule {
    fn node_count(&self) -> usize {
        self.core.node_count()
    }

    fn wait_until_complete(&self) {
        self.core.wait();
    }
}
