/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error types for the allocator and the macro-scheduler.
//!
//! Two independent enums model the two failure layers of this crate:
//!
//! * [`AllocError`] — memory-store / binned-allocator failures.
//! * [`SchedulerError`] — macro-scheduler construction and run failures.
//!
//! A third category, precondition violations (caller misuse — e.g. pushing
//! a cyclic edge, or freeing a pointer this allocator never handed out), is
//! not an error value at all: it goes through [`precondition`], which calls
//! the process [`assert_hook`] instead of returning `Result`.

use std::sync::atomic::{AtomicPtr, Ordering};
use thiserror::Error;

/// Failures raised by the memory store or binned allocator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AllocError {
    /// The OS (or the configured backing store) has no more address space
    /// or committed pages to give out.
    #[error("out of memory: failed to reserve/commit {requested_bytes} bytes")]
    OutOfMemory { requested_bytes: usize },

    /// A caller-supplied size or alignment is not usable by this allocator.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A lookup (e.g. "find the page owning this pointer") found nothing.
    #[error("not found: {0}")]
    NotFound(String),
}

/// Failures raised while building or running a [`crate::macro_scheduler::MacroScheduler`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// `build()`/`run()` was called against an empty node graph.
    #[error("no nodes provided — node graph is empty")]
    NoNodes,

    /// The node graph has a cycle; only DAGs are schedulable.
    #[error("cycle detected in node graph at node '{node}'")]
    CycleDetected { node: String },

    /// A node listed a predecessor or successor `NodeId` that does not exist.
    #[error("node '{node}' references unknown node id {referenced}")]
    UnknownNodeRef { node: String, referenced: u32 },

    /// No compute resource registered with the schedule can run this node.
    #[error("no compute resource available for node '{node}'")]
    NoAvailableResource { node: String },

    /// A [`crate::resource::ComputeResource`] affinity-pinned to a resource
    /// index that was never registered with the schedule.
    #[error("node '{node}' is pinned to resource {resource} which is not registered")]
    UnknownResource { node: String, resource: u32 },
}

/// Hook invoked on precondition violation; terminates the process.
/// Defaults to [`panic!`], which aborts a release binary built
/// with `panic = "abort"` (see the workspace `[profile.release]`), while
/// remaining observable via `#[should_panic]` in tests.
static ASSERT_HOOK: AtomicPtr<()> = AtomicPtr::new(std::ptr::null_mut());

/// Replace the precondition-violation hook. Intended for tests that need to
/// observe a violation without aborting the test process; production code
/// should not need to call this.
pub fn set_assert_hook(hook: fn(&str) -> !) {
    ASSERT_HOOK.store(hook as *mut (), Ordering::SeqCst);
}

/// Raise a precondition violation: a programming error in the caller, not a
/// recoverable runtime condition. Never returns.
#[track_caller]
pub fn precondition(message: &str) -> ! {
    let raw = ASSERT_HOOK.load(Ordering::SeqCst);
    if raw.is_null() {
        panic!("precondition violation: {message}");
    }
    let hook: fn(&str) -> ! = unsafe { std::mem::transmute(raw) };
    hook(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_error_display() {
        let e = AllocError::OutOfMemory { requested_bytes: 4096 };
        assert_eq!(e.to_string(), "out of memory: failed to reserve/commit 4096 bytes");
    }

    #[test]
    fn scheduler_error_display() {
        let e = SchedulerError::CycleDetected { node: "n1".into() };
        assert_eq!(e.to_string(), "cycle detected in node graph at node 'n1'");
    }

    #[test]
    #[should_panic(expected = "precondition violation: test message")]
    fn precondition_panics_by_default() {
        precondition("test message");
    }
}
