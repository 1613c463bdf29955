/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Two-level task scheduling core for heterogeneous compute resources.
//!
//! The Macro-Scheduler ([`macro_scheduler`]) owns a DAG of [`task::Node`]s
//! and picks one of three [`schedule::SchedulePolicy`] strategies for
//! placing ready nodes onto registered [`resource::ComputeResource`]s. The
//! actual running of a node's [`task::Workload`] is left to whatever engine
//! sits behind each resource — `gts-workers` is the reference
//! work-stealing engine this crate ships alongside, but any engine that
//! implements [`resource::ComputeResource`] and drives it through
//! [`resource::CheckForTask`] can plug in instead.
//!
//! [`mem`] is an unrelated concern bundled into this crate because the
//! reference engine's per-task allocations are frequent and small enough
//! that the system allocator's contention becomes the bottleneck: a
//! thread-caching binned allocator, modeled on the segmented allocators in
//! wide use for this workload shape.

pub mod capture;
pub mod config;
pub mod error;
pub mod macro_scheduler;
pub mod mem;
pub mod micro_scheduler;
pub mod resource;
pub mod schedule;
pub mod sync;
pub mod task;

#[cfg(feature = "c-abi")]
pub mod alloc_abi;

pub use capture::{capture_mask, is_enabled, set_capture_mask, CaptureMask};
pub use error::{AllocError, SchedulerError};
pub use macro_scheduler::{MacroScheduler, MacroSchedulerBuilder};
pub use micro_scheduler::MicroSchedulerResource;
pub use resource::{CheckForTask, ComputeResource};
pub use schedule::{BuiltSchedule, Schedule, SchedulePolicy};
pub use task::{CustomWorkload, Node, NodeId, ResourceAffinity, Workload, WorkloadContext};
