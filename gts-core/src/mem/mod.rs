/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Memory Store → Binned Allocator → Block Allocator hierarchy: slab
//! reservation, size-class bin arithmetic, and the per-thread fast-path
//! allocator built on top of both.

pub mod bins;
pub mod binned_allocator;
pub mod slab;
pub mod store;

pub use binned_allocator::MALLOC_ALIGNMENT;
pub use bins::{bin_index_for, class_size, size_class_for, MAX_BINNED_SIZE, NUM_SIZE_CLASSES};
pub use store::{MemoryStore, Page};
