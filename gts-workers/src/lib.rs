/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Reference work-stealing task engine for `gts-core`. Nothing in
//! `gts-core` depends on this crate — it is one possible collaborator
//! behind the [`gts_core::ComputeResource`]/[`gts_core::CheckForTask`]
//! seam, built on top of per-thread `crossbeam-deque` worker/stealer
//! pairs and a shared injector queue.

pub mod cpu_resource;
pub mod pool;

pub use cpu_resource::CpuComputeResource;
pub use gts_core::MicroSchedulerResource;
pub use pool::WorkerPool;
