/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! The memory store: owns every [`Slab`] reservation, hands
//! out [`Page`]s to per-thread binned allocators, and reclaims pages a
//! thread abandoned (exited while still holding live allocations) so a
//! different thread can adopt them rather than leaking the slab.

use std::ptr::NonNull;
use std::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::config::StoreConfig;
use crate::error::AllocError;
use crate::mem::bins::PAGE_SIZE_CLASSES;
use crate::mem::slab::Slab;
use crate::sync::{IntrusiveList, Linked, Links, SpinMutex};

/// A single free block inside a [`Page`]'s intrusive free list.
pub(crate) struct FreeBlock {
    pub next: *mut FreeBlock,
}

/// One committed page, carved from a [`Slab`] and sliced into fixed-size
/// blocks of `block_size` bytes.
pub struct Page {
    pub slab_id: usize,
    pub base: NonNull<u8>,
    pub page_class: usize,
    pub block_size: usize,
    pub capacity: u32,
    /// Count of blocks currently handed out and not yet freed.
    pub used: AtomicUsize,
    /// Free list the owning thread pushes/pops without synchronization.
    pub local_free: *mut FreeBlock,
    /// Free list other threads push onto when freeing a block they don't
    /// own; the owner periodically splices this into `local_free` (Treiber
    /// stack: CAS-linked push, exchange-to-drain pop).
    pub non_local_free: AtomicPtr<FreeBlock>,
    links: Links<Page>,
}

unsafe impl Send for Page {}

impl Linked for Page {
    fn links(&mut self) -> &mut Links<Page> {
        &mut self.links
    }
}

impl Page {
    fn new(slab_id: usize, base: NonNull<u8>, page_class: usize, block_size: usize) -> NonNull<Page> {
        let page_bytes = PAGE_SIZE_CLASSES[page_class];
        // Block 0 is reserved as a header slot that stores a pointer back
        // to this Page's metadata, so a bare block pointer (all a caller
        // holds at `dealloc` time) can find its owning Page without a
        // separate lookup table: mask the pointer down to the page-class
        // alignment and read the header (see `page_for`).
        let total_blocks = page_bytes / block_size;
        let capacity = total_blocks.saturating_sub(1) as u32;
        let mut local_free: *mut FreeBlock = std::ptr::null_mut();
        for i in (1..total_blocks).rev() {
            let block_ptr = unsafe { base.as_ptr().add(i * block_size) } as *mut FreeBlock;
            unsafe { (*block_ptr).next = local_free };
            local_free = block_ptr;
        }
        let page = Box::new(Page {
            slab_id,
            base,
            page_class,
            block_size,
            capacity,
            used: AtomicUsize::new(0),
            local_free,
            non_local_free: AtomicPtr::new(std::ptr::null_mut()),
            links: Links::new(),
        });
        let raw = Box::into_raw(page);
        unsafe { *(base.as_ptr() as *mut usize) = raw as usize };
        NonNull::new(raw).unwrap()
    }

    /// Recover the owning `Page` for a block pointer previously handed out
    /// by a page of this `page_class`, by masking down to the page-class
    /// alignment and reading the header word written in [`Page::new`].
    ///
    /// # Safety
    /// `ptr` must have been allocated from a page of exactly this
    /// `page_class`.
    pub unsafe fn page_for(ptr: NonNull<u8>, page_class: usize) -> NonNull<Page> {
        let page_bytes = PAGE_SIZE_CLASSES[page_class];
        let page_base = (ptr.as_ptr() as usize) & !(page_bytes - 1);
        let raw = unsafe { *(page_base as *const usize) } as *mut Page;
        NonNull::new(raw).expect("block pointer does not map to a live page")
    }

    /// Pop a block from the local free list. Caller must be the page's
    /// owning thread.
    pub fn pop_local(&mut self) -> Option<NonNull<u8>> {
        let block = self.local_free;
        if block.is_null() {
            return None;
        }
        self.local_free = unsafe { (*block).next };
        self.used.fetch_add(1, Ordering::Relaxed);
        NonNull::new(block as *mut u8)
    }

    /// Push a block back to the local free list (owner-thread free).
    pub fn push_local(&mut self, block: NonNull<u8>) {
        let block_ptr = block.as_ptr() as *mut FreeBlock;
        unsafe { (*block_ptr).next = self.local_free };
        self.local_free = block_ptr;
        self.used.fetch_sub(1, Ordering::Relaxed);
    }

    /// Push a block onto the non-local free list (cross-thread free) with a
    /// lock-free CAS splice.
    pub fn push_non_local(&self, block: NonNull<u8>) {
        let block_ptr = block.as_ptr() as *mut FreeBlock;
        let mut head = self.non_local_free.load(Ordering::Relaxed);
        loop {
            unsafe { (*block_ptr).next = head };
            match self.non_local_free.compare_exchange_weak(
                head,
                block_ptr,
                Ordering::Release,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    self.used.fetch_sub(1, Ordering::Relaxed);
                    return;
                }
                Err(cur) => head = cur,
            }
        }
    }

    /// Atomically take the entire non-local free list, to be spliced into
    /// `local_free` by the owning thread.
    pub fn drain_non_local(&self) -> *mut FreeBlock {
        self.non_local_free.swap(std::ptr::null_mut(), Ordering::Acquire)
    }

    /// Splice any pending non-local frees into the local free list. Call
    /// before `pop_local` returns `None` to recover blocks freed by other
    /// threads.
    pub fn reclaim(&mut self) {
        let mut drained = self.drain_non_local();
        if drained.is_null() {
            return;
        }
        while !drained.is_null() {
            let next = unsafe { (*drained).next };
            unsafe { (*drained).next = self.local_free };
            self.local_free = drained;
            drained = next;
        }
    }

    pub fn is_fully_free(&self) -> bool {
        self.used.load(Ordering::Relaxed) == 0 && self.non_local_free.load(Ordering::Relaxed).is_null()
    }
}

/// Owns all [`Slab`] reservations and the free/abandoned page lists that
/// per-thread binned allocators draw from.
pub struct MemoryStore {
    config: StoreConfig,
    /// Slabs reserved for each page-size class, kept in per-class pools
    /// (rather than one pool shared by every class) so that a pointer
    /// recovered without a known size ([`MemoryStore::recover_page`]) can
    /// be checked against only the slabs that could possibly have produced
    /// it, instead of every slab in the store.
    slabs: Vec<SpinMutex<Vec<Arc<Slab>>>>,
    /// One bump-carve cursor slab index per page-size class. Kept separate
    /// per class (rather than one shared cursor) because `Page::page_for`'s
    /// address-masking recovery only works if every page of a given class
    /// is aligned to that class's own page size — true only if a slab's
    /// cursor is never asked to carve any other page size in between.
    active_slab: Vec<AtomicUsize>,
    free_pages: Vec<SpinMutex<IntrusiveList<Page>>>,
    abandoned_pages: Vec<SpinMutex<IntrusiveList<Page>>>,
    /// One dedicated slab per oversized request — no size class owns these,
    /// so each gets exactly the one page it needs rather than sharing a
    /// bump-carve cursor with anything else.
    oversized: SpinMutex<Vec<Arc<Slab>>>,
}

impl MemoryStore {
    pub fn new(config: StoreConfig) -> Self {
        let n = PAGE_SIZE_CLASSES.len();
        Self {
            config,
            slabs: (0..n).map(|_| SpinMutex::new(Vec::new())).collect(),
            active_slab: (0..n).map(|_| AtomicUsize::new(usize::MAX)).collect(),
            free_pages: (0..n).map(|_| SpinMutex::new(IntrusiveList::new())).collect(),
            abandoned_pages: (0..n).map(|_| SpinMutex::new(IntrusiveList::new())).collect(),
            oversized: SpinMutex::new(Vec::new()),
        }
    }

    /// Serve an oversized request (above every binned size class) with its
    /// own dedicated slab reservation, sized and carved as a single page
    /// covering the whole reservation — no shared bump cursor, no free
    /// list, just reserve-carve-release for the life of this one
    /// allocation. `align` must be a power of two; the returned pointer is
    /// the slab's own base, which [`Slab::reserve`] already aligns to the
    /// slab's (power-of-two) size.
    pub fn acquire_oversized(&self, size: usize, align: usize) -> Result<NonNull<u8>, AllocError> {
        let slab_bytes = size.max(align).max(self.config.os_page_bytes).next_power_of_two();
        let slab = Slab::reserve(slab_bytes)?;
        let base = slab
            .carve_page(slab_bytes)?
            .expect("a freshly reserved slab always has room to carve its own full size");
        self.oversized.lock().push(Arc::new(slab));
        tracing::debug!(size, align, slab_bytes, "reserved oversized slab");
        Ok(base)
    }

    /// Release a pointer previously returned by [`MemoryStore::acquire_oversized`],
    /// releasing its dedicated slab back to the OS immediately.
    pub fn release_oversized(&self, ptr: NonNull<u8>) {
        let mut oversized = self.oversized.lock();
        if let Some(idx) = oversized.iter().position(|s| s.base() == ptr) {
            oversized.remove(idx);
        } else {
            crate::error::precondition("released pointer does not match any oversized slab this store owns");
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Acquire a page able to serve `block_size`-byte blocks from
    /// `page_class`. Checks the free list, then the abandoned list
    /// (adopting a slab another thread's allocator exited without fully
    /// freeing), then carves a fresh page from the current or a newly
    /// reserved slab.
    pub fn acquire_page(&self, page_class: usize, block_size: usize) -> Result<NonNull<Page>, AllocError> {
        if let Some(mut page) = self.free_pages[page_class].lock().pop_front() {
            unsafe { page.as_mut() }.block_size = block_size;
            tracing::trace!(page_class, block_size, "reused free page");
            return Ok(page);
        }
        if let Some(mut page) = self.abandoned_pages[page_class].lock().pop_front() {
            unsafe { page.as_mut() }.block_size = block_size;
            tracing::debug!(page_class, block_size, "adopted abandoned page");
            return Ok(page);
        }

        let page_bytes = PAGE_SIZE_CLASSES[page_class];
        let mut slabs = self.slabs[page_class].lock();
        loop {
            let idx = self.active_slab[page_class].load(Ordering::Relaxed);
            if idx != usize::MAX {
                if let Some(base) = slabs[idx].carve_page(page_bytes)? {
                    let slab_id = slabs[idx].id;
                    drop(slabs);
                    return Ok(Page::new(slab_id, base, page_class, block_size));
                }
            }
            let slab = Slab::reserve(self.config.slab_bytes)?;
            slabs.push(Arc::new(slab));
            self.active_slab[page_class].store(slabs.len() - 1, Ordering::Relaxed);
        }
    }

    /// Recover the owning `Page` for a block pointer whose page-size class
    /// is not known at the call site (no paired `size`, unlike `alloc`'s
    /// known-bin path). Tries each page-size class' alignment in turn,
    /// but only dereferences the masked-down header word if that address
    /// actually falls inside a slab this store reserved for that exact
    /// class — per-class slab pools never overlap in address space, so
    /// that containment check alone rules out every wrong class before any
    /// read happens, and the `page_class`/`base` cross-check on the
    /// resulting header rules out the rest.
    pub fn recover_page(&self, ptr: NonNull<u8>) -> NonNull<Page> {
        for (class, &page_bytes) in PAGE_SIZE_CLASSES.iter().enumerate() {
            let page_base = (ptr.as_ptr() as usize) & !(page_bytes - 1);
            let slabs = self.slabs[class].lock();
            let owns_address = slabs.iter().any(|s| {
                let base = s.base().as_ptr() as usize;
                page_base >= base && page_base < base + s.size()
            });
            drop(slabs);
            if !owns_address {
                continue;
            }
            let raw = unsafe { *(page_base as *const usize) } as *mut Page;
            if let Some(candidate) = NonNull::new(raw) {
                let candidate_ref = unsafe { candidate.as_ref() };
                if candidate_ref.page_class == class && candidate_ref.base.as_ptr() as usize == page_base {
                    return candidate;
                }
            }
        }
        crate::error::precondition("pointer does not map to any page this store owns")
    }

    /// Return a page to the free list for future reuse by any thread's
    /// allocator through this store.
    pub fn release_page(&self, page_class: usize, page: NonNull<Page>) {
        unsafe { self.free_pages[page_class].lock().push_front(page) };
    }

    /// Mark a page abandoned: its owning thread is gone but the page may
    /// still have live blocks outstanding (freed later via
    /// `push_non_local`). A future `acquire_page` call may adopt it once
    /// [`Page::is_fully_free`] holds, or reuse it immediately for a
    /// same-size-class request since its local free list is still valid.
    pub fn abandon_page(&self, page_class: usize, page: NonNull<Page>) {
        unsafe { self.abandoned_pages[page_class].lock().push_front(page) };
    }

    pub fn free_page_count(&self, page_class: usize) -> usize {
        self.free_pages[page_class].lock().len()
    }

    pub fn abandoned_page_count(&self, page_class: usize) -> usize {
        self.abandoned_pages[page_class].lock().len()
    }

    pub fn slab_count(&self) -> usize {
        self.slabs.iter().map(|pool| pool.lock().len()).sum()
    }

    /// Total bytes currently committed (resident) across every slab this
    /// store has reserved, including oversized single-page slabs.
    pub fn committed_bytes(&self) -> usize {
        let binned: usize = self.slabs.iter().map(|pool| pool.lock().iter().map(|s| s.committed_bytes()).sum::<usize>()).sum();
        let oversized: usize = self.oversized.lock().iter().map(|s| s.committed_bytes()).sum();
        binned + oversized
    }

    /// Tear the store down: release every slab's reservation back to the OS
    /// and drop the boxed [`Page`] metadata of every page still sitting on
    /// a free or abandoned list. After this returns, [`MemoryStore::committed_bytes`]
    /// is zero.
    ///
    /// # Safety
    /// Every page this store ever handed out via `acquire_page` must
    /// already have been returned through `release_page`/`abandon_page` —
    /// a page still held by a live `ThreadCache` is dangling once its
    /// backing slab is released.
    pub unsafe fn shutdown(&self) {
        for class in 0..self.free_pages.len() {
            let mut free = self.free_pages[class].lock();
            while let Some(page) = free.pop_front() {
                drop(unsafe { Box::from_raw(page.as_ptr()) });
            }
            let mut abandoned = self.abandoned_pages[class].lock();
            while let Some(page) = abandoned.pop_front() {
                drop(unsafe { Box::from_raw(page.as_ptr()) });
            }
            self.active_slab[class].store(usize::MAX, Ordering::Relaxed);
            self.slabs[class].lock().clear();
        }
        self.oversized.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_release_round_trip() {
        let store = MemoryStore::new(StoreConfig::default());
        let page = store.acquire_page(0, 64).unwrap();
        assert_eq!(unsafe { page.as_ref() }.capacity > 0, true);
        store.release_page(0, page);
        assert_eq!(store.free_page_count(0), 1);
        let reused = store.acquire_page(0, 64).unwrap();
        assert_eq!(reused, page);
    }

    #[test]
    fn abandoned_page_is_adopted() {
        let store = MemoryStore::new(StoreConfig::default());
        let page = store.acquire_page(1, 128).unwrap();
        store.abandon_page(1, page);
        assert_eq!(store.abandoned_page_count(1), 1);
        let adopted = store.acquire_page(1, 128).unwrap();
        assert_eq!(adopted, page);
        assert_eq!(store.abandoned_page_count(1), 0);
    }

    #[test]
    fn exhausting_a_slab_reserves_another() {
        let mut cfg = StoreConfig::default();
        cfg.slab_bytes = 128 * 1024; // two class-0 (64 KiB) pages per slab
        let store = MemoryStore::new(cfg);
        let _p1 = store.acquire_page(0, 64).unwrap();
        let _p2 = store.acquire_page(0, 64).unwrap();
        assert_eq!(store.slab_count(), 1);
        let _p3 = store.acquire_page(0, 64).unwrap();
        assert_eq!(store.slab_count(), 2);
    }

    #[test]
    fn page_local_alloc_and_free_round_trip() {
        let store = MemoryStore::new(StoreConfig::default());
        let mut page = store.acquire_page(0, 64).unwrap();
        let page_ref = unsafe { page.as_mut() };
        let cap = page_ref.capacity;
        let mut blocks = Vec::new();
        for _ in 0..cap {
            blocks.push(page_ref.pop_local().unwrap());
        }
        assert!(page_ref.pop_local().is_none());
        for b in blocks {
            page_ref.push_local(b);
        }
        assert!(page_ref.is_fully_free());
    }

    #[test]
    fn page_for_recovers_owning_page_from_block_pointer() {
        let store = MemoryStore::new(StoreConfig::default());
        let mut page = store.acquire_page(0, 64).unwrap();
        let block = unsafe { page.as_mut() }.pop_local().unwrap();
        let recovered = unsafe { Page::page_for(block, 0) };
        assert_eq!(recovered, page);
    }

    #[test]
    fn committed_bytes_tracks_carved_pages() {
        let store = MemoryStore::new(StoreConfig::default());
        assert_eq!(store.committed_bytes(), 0);
        let _p1 = store.acquire_page(0, 64).unwrap();
        assert_eq!(store.committed_bytes(), PAGE_SIZE_CLASSES[0]);
        let _p2 = store.acquire_page(1, 128).unwrap();
        assert_eq!(store.committed_bytes(), PAGE_SIZE_CLASSES[0] + PAGE_SIZE_CLASSES[1]);
    }

    #[test]
    fn shutdown_releases_every_slab_and_zeroes_committed_bytes() {
        let store = MemoryStore::new(StoreConfig::default());
        let page = store.acquire_page(0, 64).unwrap();
        store.release_page(0, page);
        assert!(store.committed_bytes() > 0);
        unsafe { store.shutdown() };
        assert_eq!(store.committed_bytes(), 0);
        assert_eq!(store.slab_count(), 0);
        assert_eq!(store.free_page_count(0), 0);
    }

    #[test]
    fn oversized_acquire_release_round_trip() {
        let store = MemoryStore::new(StoreConfig::default());
        let ptr = store.acquire_oversized(1024 * 1024, 16).unwrap();
        assert_eq!(store.committed_bytes(), (1024 * 1024usize).next_power_of_two());
        unsafe {
            std::ptr::write_bytes(ptr.as_ptr(), 0x7, 1024 * 1024);
            assert_eq!(*ptr.as_ptr(), 0x7);
        }
        store.release_oversized(ptr);
        assert_eq!(store.committed_bytes(), 0);
    }

    #[test]
    fn oversized_acquire_honors_alignment() {
        let store = MemoryStore::new(StoreConfig::default());
        let ptr = store.acquire_oversized(3000, 4096).unwrap();
        assert_eq!(ptr.as_ptr() as usize % 4096, 0);
        store.release_oversized(ptr);
    }

    #[test]
    fn recover_page_disambiguates_across_page_classes() {
        let store = MemoryStore::new(StoreConfig::default());
        let mut page0 = store.acquire_page(0, 64).unwrap();
        let mut page2 = store.acquire_page(2, 512).unwrap();
        let block0 = unsafe { page0.as_mut() }.pop_local().unwrap();
        let block2 = unsafe { page2.as_mut() }.pop_local().unwrap();
        assert_eq!(store.recover_page(block0), page0);
        assert_eq!(store.recover_page(block2), page2);
    }

    #[test]
    fn non_local_free_reclaims_into_local() {
        let store = MemoryStore::new(StoreConfig::default());
        let mut page = store.acquire_page(0, 64).unwrap();
        let page_ref = unsafe { page.as_mut() };
        let block = page_ref.pop_local().unwrap();
        page_ref.push_non_local(block);
        assert!(page_ref.is_fully_free());
        page_ref.reclaim();
        let again = page_ref.pop_local().unwrap();
        assert_eq!(again, block);
    }
}
