/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! The DAG data model: [`Node`], [`Workload`], and [`ResourceAffinity`].

pub mod affinity;
pub mod node;
pub mod workload;

pub use affinity::ResourceAffinity;
pub use node::{Node, NodeId};
pub use workload::{CustomWorkload, Workload, WorkloadContext};
