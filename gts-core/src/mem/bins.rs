/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Size-class and bin arithmetic.
//!
//! Every request is rounded up to one of a fixed set of size classes, each
//! with its own free list inside a [`crate::mem::binned_allocator::BinnedAllocator`].
//! Four size-class bands, each carved from its own page-size class so a
//! page never mixes wildly different block sizes:
//!
//! * `(0, 1 KiB]` — linear steps of [`MALLOC_ALIGNMENT`], backed by 16 KiB pages.
//! * `(1 KiB, 8 KiB]` — four bins per power-of-two octave, backed by 64 KiB pages.
//! * `(8 KiB, 32 KiB]` — four bins per power-of-two octave, backed by 128 KiB pages.
//! * `(32 KiB, 512 KiB]` — one bin for the whole band, backed by 512 KiB pages.
//!
//! A request above 512 KiB is oversized and bypasses the binned allocator
//! entirely. Bin and page-class lookups are closed-form arithmetic
//! (`ilog2` plus a quarter-octave divisor) rather than a table scan, so
//! neither grows with the number of bins.

/// Every size class is a multiple of this, so plain `alloc` already
/// satisfies it without any alignment bump.
pub const MALLOC_ALIGNMENT: usize = 16;

const CLASS0_MAX: usize = 1024;
const CLASS1_MAX: usize = 8 * 1024;
const CLASS2_MAX: usize = 32 * 1024;
const CLASS3_MAX: usize = 512 * 1024;

pub const MAX_BINNED_SIZE: usize = CLASS3_MAX;

/// How many bins one power-of-two octave is split into, above [`CLASS0_MAX`].
const SUB_BINS_PER_OCTAVE: usize = 4;

const CLASS0_BINS: usize = CLASS0_MAX / MALLOC_ALIGNMENT;
const CLASS1_BASE: usize = CLASS0_BINS;
const CLASS1_BINS: usize = (CLASS1_MAX / CLASS0_MAX).trailing_zeros() as usize * SUB_BINS_PER_OCTAVE;
const CLASS2_BASE: usize = CLASS1_BASE + CLASS1_BINS;
const CLASS2_BINS: usize = (CLASS2_MAX / CLASS1_MAX).trailing_zeros() as usize * SUB_BINS_PER_OCTAVE;
const CLASS3_BASE: usize = CLASS2_BASE + CLASS2_BINS;

pub const NUM_SIZE_CLASSES: usize = CLASS3_BASE + 1;

/// Page-size classes the memory store carves slabs into, one per size-class
/// band above: 16 KiB, 64 KiB, 128 KiB, 512 KiB.
pub const PAGE_SIZE_CLASSES: [usize; 4] = [16 * 1024, 64 * 1024, 128 * 1024, 512 * 1024];

/// Which page-size class (index into [`PAGE_SIZE_CLASSES`]) serves `bin`.
pub fn page_class_for_bin(bin: usize) -> usize {
    if bin < CLASS1_BASE {
        0
    } else if bin < CLASS2_BASE {
        1
    } else if bin < CLASS3_BASE {
        2
    } else {
        3
    }
}

/// Bin index for a request falling inside one power-of-two octave above
/// `base_bin`'s band: the octave is identified by `ilog2(requested - 1)`
/// relative to the band's floor exponent, then quartered.
fn quarter_bin(requested: usize, base_bin: usize, floor_k: u32) -> usize {
    let k = (requested - 1).ilog2();
    let octave_index = (k - floor_k) as usize;
    let octave_floor = 1usize << k;
    let quarter_width = (octave_floor / SUB_BINS_PER_OCTAVE).max(1);
    let quarter = ((requested - 1 - octave_floor) / quarter_width).min(SUB_BINS_PER_OCTAVE - 1);
    base_bin + octave_index * SUB_BINS_PER_OCTAVE + quarter
}

/// Index of the bin serving `requested`, or `None` if oversized.
pub fn bin_index_for(requested: usize) -> Option<usize> {
    if requested == 0 {
        return Some(0);
    }
    if requested > MAX_BINNED_SIZE {
        return None;
    }
    if requested <= CLASS0_MAX {
        return Some((requested - 1) / MALLOC_ALIGNMENT);
    }
    if requested <= CLASS1_MAX {
        return Some(quarter_bin(requested, CLASS1_BASE, CLASS0_MAX.ilog2()));
    }
    if requested <= CLASS2_MAX {
        return Some(quarter_bin(requested, CLASS2_BASE, CLASS1_MAX.ilog2()));
    }
    Some(CLASS3_BASE)
}

/// The largest request `bin` serves — the inverse of [`bin_index_for`].
pub fn class_size(bin: usize) -> usize {
    if bin < CLASS1_BASE {
        (bin + 1) * MALLOC_ALIGNMENT
    } else if bin < CLASS2_BASE {
        octave_upper_bound(bin - CLASS1_BASE, CLASS0_MAX.ilog2())
    } else if bin < CLASS3_BASE {
        octave_upper_bound(bin - CLASS2_BASE, CLASS1_MAX.ilog2())
    } else {
        CLASS3_MAX
    }
}

fn octave_upper_bound(local_bin: usize, floor_k: u32) -> usize {
    let octave_index = local_bin / SUB_BINS_PER_OCTAVE;
    let quarter = local_bin % SUB_BINS_PER_OCTAVE;
    let octave_floor = 1usize << (floor_k + octave_index as u32);
    let quarter_width = octave_floor / SUB_BINS_PER_OCTAVE;
    octave_floor + (quarter + 1) * quarter_width
}

/// Round `requested` up to the smallest size class that can hold it.
/// Returns `None` if `requested` exceeds [`MAX_BINNED_SIZE`] (the caller
/// must take the oversized path instead).
pub fn size_class_for(requested: usize) -> Option<usize> {
    bin_index_for(requested).map(class_size)
}
