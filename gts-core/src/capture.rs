/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Capture-mask channels: a process-wide bitmask naming which
//! instrumentation channels are live. Each subsystem has a debug and a
//! profile sub-channel; the remaining high bits are reserved for
//! user-defined channels. A channel that isn't set is a no-op at the call
//! site — the check happens before any `tracing` event is built, not
//! after, so disabled channels cost one atomic load.
//!
//! Channels still map onto `tracing` target strings
//! (`gts::worker_pool`, `gts::binned_allocator`, …) so a caller can filter
//! further with `RUST_LOG`/`EnvFilter` on top of this mask; the two
//! mechanisms compose rather than compete.

use std::sync::atomic::{AtomicU64, Ordering};

use bitflags::bitflags;

bitflags! {
    /// Which instrumentation channels are currently live.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CaptureMask: u64 {
        const WORKER_POOL_DEBUG         = 1 << 0;
        const WORKER_POOL_PROFILE       = 1 << 1;
        const MICRO_SCHEDULER_DEBUG     = 1 << 2;
        const MICRO_SCHEDULER_PROFILE   = 1 << 3;
        const THREAD_DEBUG              = 1 << 4;
        const THREAD_PROFILE            = 1 << 5;
        const BINNED_ALLOCATOR_DEBUG    = 1 << 6;
        const BINNED_ALLOCATOR_PROFILE  = 1 << 7;
        const MACRO_SCHEDULER_DEBUG     = 1 << 8;
        const MACRO_SCHEDULER_PROFILE   = 1 << 9;

        /// Bits 16..64 are reserved for caller-defined channels; this crate
        /// never sets or tests them itself.
        const USER_DEFINED = 0xffff_ffff_ffff_0000;
    }
}

impl CaptureMask {
    /// The `tracing` target a channel's events should be emitted under.
    pub fn target(self) -> &'static str {
        if self.intersects(Self::WORKER_POOL_DEBUG | Self::WORKER_POOL_PROFILE) {
            "gts::worker_pool"
        } else if self.intersects(Self::MICRO_SCHEDULER_DEBUG | Self::MICRO_SCHEDULER_PROFILE) {
            "gts::micro_scheduler"
        } else if self.intersects(Self::THREAD_DEBUG | Self::THREAD_PROFILE) {
            "gts::thread"
        } else if self.intersects(Self::BINNED_ALLOCATOR_DEBUG | Self::BINNED_ALLOCATOR_PROFILE) {
            "gts::binned_allocator"
        } else if self.intersects(Self::MACRO_SCHEDULER_DEBUG | Self::MACRO_SCHEDULER_PROFILE) {
            "gts::macro_scheduler"
        } else {
            "gts::user"
        }
    }
}

static ACTIVE_MASK: AtomicU64 = AtomicU64::new(0);

/// Replace the process-wide capture mask. Takes effect for every thread
/// immediately; there is no per-thread override.
pub fn set_capture_mask(mask: CaptureMask) {
    ACTIVE_MASK.store(mask.bits(), Ordering::Relaxed);
}

/// The currently active capture mask.
pub fn capture_mask() -> CaptureMask {
    CaptureMask::from_bits_truncate(ACTIVE_MASK.load(Ordering::Relaxed))
}

/// Whether every bit of `channel` is set in the active mask.
pub fn is_enabled(channel: CaptureMask) -> bool {
    capture_mask().contains(channel)
}
