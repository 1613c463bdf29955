/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Slab reservation: one OS-aligned virtual-address-space
//! reservation that pages are bump-carved from. A slab's address range is
//! reserved whole up front (`mmap` with `PROT_NONE`, no physical backing)
//! and only the bytes actually carved into a page get committed
//! (`mprotect` to `PROT_READ | PROT_WRITE`) — carving a page is what turns
//! virtual address space into resident memory, mirroring the
//! reserve-then-commit two-step real segmented allocators use to keep RSS
//! proportional to live pages rather than to the slab's full reservation.
//! A slab is released whole, on `Drop`, back to the OS; individual pages
//! inside it are committed/decommitted but the reservation itself is never
//! partially freed.

use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::AllocError;

static NEXT_SLAB_ID: AtomicUsize = AtomicUsize::new(1);

/// One reserved, `slab_bytes`-aligned region of address space.
pub struct Slab {
    pub id: usize,
    base: NonNull<u8>,
    size: usize,
    cursor: AtomicUsize,
    committed: AtomicUsize,
}

unsafe impl Send for Slab {}
unsafe impl Sync for Slab {}

impl Slab {
    /// Reserve a new slab of exactly `size` bytes, aligned to `size`
    /// (`size` must be a power of two — validated by
    /// [`crate::config::StoreConfig::validate`] before this is ever
    /// called). Nothing is committed yet; every byte of the reservation is
    /// `PROT_NONE` (or platform-equivalent) until [`Slab::carve_page`]
    /// commits a slice of it.
    pub fn reserve(size: usize) -> Result<Self, AllocError> {
        let base = platform::reserve(size)?;
        Ok(Self {
            id: NEXT_SLAB_ID.fetch_add(1, Ordering::Relaxed),
            base,
            size,
            cursor: AtomicUsize::new(0),
            committed: AtomicUsize::new(0),
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn base(&self) -> NonNull<u8> {
        self.base
    }

    /// True once every byte of the slab has been bump-carved into a page.
    pub fn is_exhausted(&self) -> bool {
        self.cursor.load(Ordering::Relaxed) >= self.size
    }

    /// Bytes of this slab's reservation currently committed (resident),
    /// i.e. handed out as pages and not yet decommitted.
    pub fn committed_bytes(&self) -> usize {
        self.committed.load(Ordering::Relaxed)
    }

    /// Bump-carve `page_bytes` from the slab's reserved address space and
    /// commit it. `Ok(None)` means the slab has no more address space left
    /// for a page this size — the caller should reserve a fresh slab.
    /// `Err` means the slab had room but the OS refused to commit it
    /// (real memory pressure, not slab exhaustion).
    pub fn carve_page(&self, page_bytes: usize) -> Result<Option<NonNull<u8>>, AllocError> {
        loop {
            let cur = self.cursor.load(Ordering::Relaxed);
            let next = match cur.checked_add(page_bytes) {
                Some(n) if n <= self.size => n,
                _ => return Ok(None),
            };
            if self
                .cursor
                .compare_exchange_weak(cur, next, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                let ptr = unsafe { self.base.as_ptr().add(cur) };
                platform::commit(ptr, page_bytes)?;
                self.committed.fetch_add(page_bytes, Ordering::Relaxed);
                return Ok(NonNull::new(ptr));
            }
        }
    }
}

impl Drop for Slab {
    fn drop(&mut self) {
        platform::release(self.base, self.size);
    }
}

#[cfg(unix)]
mod platform {
    use std::ptr::NonNull;

    use crate::error::AllocError;

    /// Reserve `size` bytes of address space aligned to `size`, with no
    /// physical backing committed. Over-reserves by one alignment unit and
    /// trims the unaligned slack off either end — the guess-then-verify
    /// alignment strategy real segmented allocators use around `mmap`,
    /// since POSIX gives no way to request an aligned mapping directly.
    pub fn reserve(size: usize) -> Result<NonNull<u8>, AllocError> {
        unsafe {
            let overshoot = size * 2;
            let raw = libc::mmap(
                std::ptr::null_mut(),
                overshoot,
                libc::PROT_NONE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_NORESERVE,
                -1,
                0,
            );
            if raw == libc::MAP_FAILED {
                return Err(AllocError::OutOfMemory { requested_bytes: size });
            }
            let raw = raw as usize;
            let aligned = (raw + size - 1) & !(size - 1);
            let head_slack = aligned - raw;
            let tail_slack = overshoot - head_slack - size;
            if head_slack > 0 {
                libc::munmap(raw as *mut libc::c_void, head_slack);
            }
            if tail_slack > 0 {
                libc::munmap((aligned + size) as *mut libc::c_void, tail_slack);
            }
            Ok(NonNull::new(aligned as *mut u8).expect("mmap never returns a null address on success"))
        }
    }

    pub fn commit(ptr: *mut u8, len: usize) -> Result<(), AllocError> {
        let rc = unsafe { libc::mprotect(ptr as *mut libc::c_void, len, libc::PROT_READ | libc::PROT_WRITE) };
        if rc != 0 {
            return Err(AllocError::OutOfMemory { requested_bytes: len });
        }
        Ok(())
    }

    pub fn release(base: NonNull<u8>, size: usize) {
        unsafe { libc::munmap(base.as_ptr() as *mut libc::c_void, size) };
    }
}

#[cfg(not(unix))]
mod platform {
    use std::alloc::{alloc, dealloc, Layout};
    use std::ptr::NonNull;

    use crate::error::AllocError;

    /// No `mmap`/`mprotect` off this target; every byte handed back by the
    /// system allocator is resident immediately, so there is no distinct
    /// reserve-without-commit step to model here.
    pub fn reserve(size: usize) -> Result<NonNull<u8>, AllocError> {
        let layout = Layout::from_size_align(size, size).map_err(|e| AllocError::InvalidArgument(e.to_string()))?;
        let base = unsafe { alloc(layout) };
        NonNull::new(base).ok_or(AllocError::OutOfMemory { requested_bytes: size })
    }

    pub fn commit(_ptr: *mut u8, _len: usize) -> Result<(), AllocError> {
        Ok(())
    }

    pub fn release(base: NonNull<u8>, size: usize) {
        let layout = Layout::from_size_align(size, size).expect("size validated at reserve time");
        unsafe { dealloc(base.as_ptr(), layout) };
    }
}
