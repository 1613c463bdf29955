/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Concurrency primitives shared by the allocator and the schedule
//! policies: spin locks, an intrusive list, a bounded MPMC queue, an
//! escalating backoff, and the platform seam.

pub mod backoff;
pub mod intrusive_list;
pub mod mpmc;
pub mod platform;
pub mod spin;

pub use backoff::Backoff;
pub use intrusive_list::{IntrusiveList, Linked, Links};
pub use mpmc::MpmcQueue;
pub use platform::{Event, Platform, StdPlatform};
pub use spin::{RwSpinLock, SpinMutex};
