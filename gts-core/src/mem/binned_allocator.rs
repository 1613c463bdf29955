/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Per-thread binned allocator: each thread keeps one active
//! [`Page`] per size-class bin. The fast path (`alloc`/`dealloc` on the
//! owning thread) never touches an atomic; the slow path reclaims
//! cross-thread frees, fetches a fresh page from the [`MemoryStore`], or
//! releases an empty page back to the store.
//!
//! This mirrors the fast-path/slow-path split of a per-CPU allocator cache:
//! `#[cold]` slow functions do the refill/drain work so the hot path stays
//! small and branch-predictable.

use std::cell::RefCell;
use std::ptr::NonNull;
use std::sync::OnceLock;

use crate::config::StoreConfig;
use crate::error::AllocError;
use crate::mem::bins::{bin_index_for, class_size, page_class_for_bin, NUM_SIZE_CLASSES};
use crate::mem::store::{MemoryStore, Page};

/// Every size class is a multiple of this, so plain `alloc` already
/// satisfies it without any alignment bump.
pub const MALLOC_ALIGNMENT: usize = 16;

static GLOBAL_STORE: OnceLock<MemoryStore> = OnceLock::new();

fn global_store() -> &'static MemoryStore {
    GLOBAL_STORE.get_or_init(|| MemoryStore::new(StoreConfig::default()))
}

/// Per-thread state: one active page per size class. Torn down when the
/// thread exits, abandoning any page that still has outstanding blocks so a
/// future `acquire_page` elsewhere can adopt it.
struct ThreadCache {
    active: [Option<NonNull<Page>>; NUM_SIZE_CLASSES],
}

impl ThreadCache {
    fn new() -> Self {
        Self { active: [None; NUM_SIZE_CLASSES] }
    }
}

impl Drop for ThreadCache {
    fn drop(&mut self) {
        let store = global_store();
        for page in self.active.iter().flatten() {
            let page_class = unsafe { page.as_ref() }.page_class;
            if unsafe { page.as_ref() }.is_fully_free() {
                store.release_page(page_class, *page);
            } else {
                store.abandon_page(page_class, *page);
            }
        }
    }
}

thread_local! {
    static CACHE: RefCell<ThreadCache> = RefCell::new(ThreadCache::new());
}

/// Allocate `size` bytes via the calling thread's binned cache. Returns the
/// oversized marker `None` when `size` exceeds every bin, in which case the
/// caller should fall back to the oversized path.
pub fn alloc(size: usize) -> Result<Option<NonNull<u8>>, AllocError> {
    let Some(bin) = bin_index_for(size) else { return Ok(None) };
    CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();
        loop {
            if let Some(mut page) = cache.active[bin] {
                if let Some(block) = unsafe { page.as_mut() }.pop_local() {
                    return Ok(Some(block));
                }
                unsafe { page.as_mut() }.reclaim();
                if let Some(block) = unsafe { page.as_mut() }.pop_local() {
                    return Ok(Some(block));
                }
            }
            refill(&mut cache, bin)?;
        }
    })
}

/// Allocate `size` bytes aligned to `align` (must be a power of two).
/// Over-sizes the underlying binned request by `align - 1` and bumps the
/// returned pointer up to the boundary, so freeing requires
/// [`dealloc_aligned`] rather than [`dealloc`] — the pointer a caller holds
/// is no longer the block's true start.
pub fn alloc_aligned(size: usize, align: usize) -> Result<Option<NonNull<u8>>, AllocError> {
    if align <= MALLOC_ALIGNMENT {
        return alloc(size);
    }
    if !align.is_power_of_two() {
        return Err(AllocError::InvalidArgument(format!("alignment {align} is not a power of two")));
    }
    let padded = size + (align - 1);
    let Some(block) = alloc(padded)? else { return Ok(None) };
    let bumped = (block.as_ptr() as usize + align - 1) & !(align - 1);
    Ok(NonNull::new(bumped as *mut u8))
}

/// Free a block previously returned by [`alloc_aligned`]. The true block
/// start is recovered by modular arithmetic against the owning
/// [`crate::mem::store::Page`]'s `block_size`, then reclaimed through the
/// non-local free path — the bin this pointer's *requested* size maps to
/// may not be the (larger, padded) bin the block actually lives in, so the
/// owning thread's local-cache fast path can't be trusted to recognize it.
///
/// # Safety
/// `ptr` must be a still-live pointer returned by `alloc_aligned`.
pub unsafe fn dealloc_aligned(ptr: NonNull<u8>) {
    let owner = global_store().recover_page(ptr);
    let true_start = unsafe { block_start_of(owner, ptr) };
    unsafe { owner.as_ref() }.push_non_local(true_start);
}

/// Remaining bytes from `ptr` to the end of its owning block, accounting
/// for any alignment bump.
///
/// # Safety
/// `ptr` must be a still-live pointer returned by `alloc` or `alloc_aligned`.
pub unsafe fn usable_size(ptr: NonNull<u8>) -> usize {
    let owner = global_store().recover_page(ptr);
    let page = unsafe { owner.as_ref() };
    let true_start = unsafe { block_start_of(owner, ptr) };
    page.block_size - (ptr.as_ptr() as usize - true_start.as_ptr() as usize)
}

unsafe fn block_start_of(page: NonNull<Page>, ptr: NonNull<u8>) -> NonNull<u8> {
    let page = unsafe { page.as_ref() };
    let base = page.base.as_ptr() as usize;
    let offset = ptr.as_ptr() as usize - base;
    let block_index = offset / page.block_size;
    NonNull::new((base + block_index * page.block_size) as *mut u8).expect("block start is never null")
}

/// Allocate an oversized request (above every binned size class) through
/// the memory store's dedicated single-page slab path, rather than
/// bypassing this allocator's bookkeeping entirely.
pub fn alloc_oversized(size: usize, align: usize) -> Result<NonNull<u8>, AllocError> {
    global_store().acquire_oversized(size, align)
}

/// Free a block previously returned by [`alloc_oversized`].
///
/// # Safety
/// `ptr` must be a still-live pointer returned by `alloc_oversized`.
pub unsafe fn dealloc_oversized(ptr: NonNull<u8>) {
    global_store().release_oversized(ptr);
}

#[cold]
fn refill(cache: &mut ThreadCache, bin: usize) -> Result<(), AllocError> {
    let block_size = class_size(bin);
    let fresh = global_store().acquire_page(page_class_for_bin(bin), block_size)?;
    if crate::capture::is_enabled(crate::capture::CaptureMask::BINNED_ALLOCATOR_PROFILE) {
        tracing::trace!(target: "gts::binned_allocator", bin, block_size, "refilled active page for bin");
    }
    cache.active[bin] = Some(fresh);
    Ok(())
}

/// Free a block previously returned by `alloc` with the same `size`.
///
/// # Safety
/// `ptr` must be a still-live block returned by `alloc(size)` and not
/// already freed.
pub unsafe fn dealloc(ptr: NonNull<u8>, size: usize) {
    let Some(bin) = bin_index_for(size) else {
        crate::error::precondition("dealloc called with an oversized `size` — no bin owns this pointer");
    };
    let mut owner = unsafe { Page::page_for(ptr, page_class_for_bin(bin)) };

    let freed_locally = CACHE.with(|cache| {
        let cache = cache.borrow();
        if cache.active[bin] == Some(owner) {
            unsafe { owner.as_mut() }.push_local(ptr);
            true
        } else {
            false
        }
    });

    if !freed_locally {
        unsafe { owner.as_ref() }.push_non_local(ptr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_dealloc_round_trip_same_thread() {
        let block = alloc(32).unwrap().unwrap();
        unsafe { dealloc(block, 32) };
        let again = alloc(32).unwrap().unwrap();
        assert_eq!(again, block);
        unsafe { dealloc(again, 32) };
    }

    #[test]
    fn oversized_request_returns_none() {
        assert_eq!(alloc(10 * 1024 * 1024).unwrap(), None);
    }

    #[test]
    fn distinct_bins_get_distinct_pages() {
        let a = alloc(16).unwrap().unwrap();
        let b = alloc(2048).unwrap().unwrap();
        assert_ne!(a, b);
        unsafe {
            dealloc(a, 16);
            dealloc(b, 2048);
        }
    }

    #[test]
    fn cross_thread_free_uses_non_local_path() {
        let block = alloc(48).unwrap().unwrap();
        let owner = unsafe { Page::page_for(block, page_class_for_bin(bin_index_for(48).unwrap())) };
        let used_before = unsafe { owner.as_ref() }.used.load(std::sync::atomic::Ordering::Relaxed);
        let addr = block.as_ptr() as usize;
        let handle = std::thread::spawn(move || {
            let ptr = NonNull::new(addr as *mut u8).unwrap();
            // The freeing thread never made this bin active, so this must
            // go through `push_non_local` rather than panicking or
            // corrupting the owning thread's local free list.
            unsafe { dealloc(ptr, 48) };
        });
        handle.join().unwrap();
        let used_after = unsafe { owner.as_ref() }.used.load(std::sync::atomic::Ordering::Relaxed);
        assert_eq!(used_after, used_before - 1);
        // Still allocatable afterwards, whether served from remaining local
        // free blocks or reclaimed from the non-local list.
        let next = alloc(48).unwrap().unwrap();
        unsafe { dealloc(next, 48) };
    }

    #[test]
    fn aligned_alloc_honors_power_of_two_alignment() {
        for align in [16usize, 32, 64, 256] {
            let p = alloc_aligned(48, align).unwrap().unwrap();
            assert_eq!(p.as_ptr() as usize % align, 0);
            unsafe { dealloc_aligned(p) };
        }
    }

    #[test]
    fn aligned_alloc_rejects_non_power_of_two() {
        assert!(alloc_aligned(48, 24).is_err());
    }

    #[test]
    fn usable_size_covers_requested_bytes_and_alignment_bump() {
        let p = alloc_aligned(40, 64).unwrap().unwrap();
        assert!(unsafe { usable_size(p) } >= 40);
        unsafe { dealloc_aligned(p) };
    }

    #[test]
    fn many_alloc_dealloc_cycles_do_not_leak_distinct_pages() {
        let mut blocks = Vec::new();
        for _ in 0..500 {
            blocks.push(alloc(24).unwrap().unwrap());
        }
        for b in blocks.drain(..) {
            unsafe { dealloc(b, 24) };
        }
        let a = alloc(24).unwrap().unwrap();
        unsafe { dealloc(a, 24) };
    }
}
