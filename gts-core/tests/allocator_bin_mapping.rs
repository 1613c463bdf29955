/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Allocator invariant: bin mapping — every size in a bin's
//! range maps to that bin, and a pointer allocated for a given size maps
//! back to the same bin via its owning page.

use gts_core::mem::binned_allocator::{alloc, dealloc};
use gts_core::mem::store::Page;
use gts_core::mem::{bin_index_for, class_size, size_class_for, NUM_SIZE_CLASSES, MAX_BINNED_SIZE};

const BINNED_PAGE_CLASS: usize = 0;

#[test]
fn every_size_in_a_bins_range_maps_to_that_bin() {
    let mut lower = 1usize;
    for bin in 0..NUM_SIZE_CLASSES {
        let upper = class_size(bin);
        for probe in [lower, (lower + upper) / 2, upper] {
            assert_eq!(bin_index_for(probe), Some(bin), "probe={probe} expected bin {bin} (range {lower}..={upper})");
            assert_eq!(size_class_for(probe), Some(upper));
        }
        lower = upper + 1;
    }
}

#[test]
fn oversized_requests_have_no_bin() {
    assert_eq!(bin_index_for(MAX_BINNED_SIZE + 1), None);
    assert_eq!(size_class_for(MAX_BINNED_SIZE + 1), None);
}

#[test]
fn allocated_pointer_maps_back_to_the_bin_it_was_requested_from() {
    for size in [16usize, 48, 300, 8000] {
        let expected_bin = bin_index_for(size).unwrap();
        let p = alloc(size).unwrap().unwrap();
        let page = unsafe { Page::page_for(p, BINNED_PAGE_CLASS) };
        let actual_block_size = unsafe { page.as_ref() }.block_size;
        assert_eq!(actual_block_size, class_size(expected_bin), "size={size}");
        unsafe { dealloc(p, size) };
    }
}
