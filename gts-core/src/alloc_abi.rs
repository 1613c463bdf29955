/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! C allocator ABI surface: `malloc`/`calloc`/`realloc`/
//! `free` and their POSIX aligned-allocation variants, built on the same
//! per-thread binned allocator as the Rust-facing API. Gated behind the
//! `c-abi` feature — see `SPEC_FULL.md` §4.2 — so linking this crate never
//! silently shadows the platform allocator.

use std::ffi::c_void;
use std::ptr::NonNull;

use crate::mem::binned_allocator;
use crate::mem::bins::{size_class_for, MALLOC_ALIGNMENT, MAX_BINNED_SIZE};

/// Requests this large bypass the binned allocator's size classes but still
/// go through [`crate::mem::store::MemoryStore`] — each gets its own
/// dedicated single-page slab rather than falling through to the system
/// allocator.
unsafe fn oversized_alloc(size: usize) -> *mut u8 {
    match binned_allocator::alloc_oversized(size, MALLOC_ALIGNMENT) {
        Ok(ptr) => ptr.as_ptr(),
        Err(_) => std::ptr::null_mut(),
    }
}

unsafe fn oversized_dealloc(ptr: *mut u8, _size: usize) {
    if let Some(nn) = NonNull::new(ptr) {
        unsafe { binned_allocator::dealloc_oversized(nn) };
    }
}

/// # Safety
/// Standard `malloc` contract: the returned pointer, if non-null, must be
/// freed exactly once via [`gts_free`] with the matching size remembered by
/// the caller (this allocator does not track per-allocation size itself;
/// callers needing that should use the Rust-facing `mem` API instead).
#[no_mangle]
pub unsafe extern "C" fn gts_malloc(size: usize) -> *mut c_void {
    if size == 0 {
        return std::ptr::null_mut();
    }
    match size_class_for(size) {
        Some(class) => match binned_allocator::alloc(class) {
            Ok(Some(ptr)) => ptr.as_ptr() as *mut c_void,
            _ => std::ptr::null_mut(),
        },
        None => unsafe { oversized_alloc(size) as *mut c_void },
    }
}

/// # Safety
/// See [`gts_malloc`]; `nmemb * size` must not overflow `usize`.
#[no_mangle]
pub unsafe extern "C" fn gts_calloc(nmemb: usize, size: usize) -> *mut c_void {
    let Some(total) = nmemb.checked_mul(size) else { return std::ptr::null_mut() };
    let ptr = unsafe { gts_malloc(total) };
    if !ptr.is_null() {
        unsafe { std::ptr::write_bytes(ptr as *mut u8, 0, total) };
    }
    ptr
}

/// Free memory obtained from [`gts_malloc`]/[`gts_calloc`]. `size` must be
/// the exact size originally requested (this ABI, unlike libc's `free`,
/// requires it — the binned allocator does not stash per-block size
/// metadata beyond the bin it lives in).
///
/// # Safety
/// `ptr` must either be null or a live allocation from this module with
/// matching `size`.
#[no_mangle]
pub unsafe extern "C" fn gts_free(ptr: *mut c_void, size: usize) {
    if ptr.is_null() || size == 0 {
        return;
    }
    let ptr = ptr as *mut u8;
    match size_class_for(size) {
        Some(class) => {
            let nn = NonNull::new(ptr).expect("checked non-null above");
            unsafe { binned_allocator::dealloc(nn, class) };
        }
        None => unsafe { oversized_dealloc(ptr, size) },
    }
}

/// # Safety
/// `ptr` must be null or a live allocation of `old_size`; see [`gts_malloc`]
/// for the returned pointer's obligations.
#[no_mangle]
pub unsafe extern "C" fn gts_realloc(ptr: *mut c_void, old_size: usize, new_size: usize) -> *mut c_void {
    if ptr.is_null() {
        return unsafe { gts_malloc(new_size) };
    }
    if new_size == 0 {
        unsafe { gts_free(ptr, old_size) };
        return std::ptr::null_mut();
    }
    let new_ptr = unsafe { gts_malloc(new_size) };
    if new_ptr.is_null() {
        return std::ptr::null_mut();
    }
    let copy_len = old_size.min(new_size);
    unsafe { std::ptr::copy_nonoverlapping(ptr as *const u8, new_ptr as *mut u8, copy_len) };
    unsafe { gts_free(ptr, old_size) };
    new_ptr
}

/// # Safety
/// `align` must be a power of two. Free the result with [`gts_aligned_free`]
/// using the same `size`/`align`, not [`gts_free`].
#[no_mangle]
pub unsafe extern "C" fn gts_aligned_alloc(size: usize, align: usize) -> *mut c_void {
    if size == 0 {
        return std::ptr::null_mut();
    }
    if size.saturating_add(align) > MAX_BINNED_SIZE {
        return match binned_allocator::alloc_oversized(size, align) {
            Ok(ptr) => ptr.as_ptr() as *mut c_void,
            Err(_) => std::ptr::null_mut(),
        };
    }
    match binned_allocator::alloc_aligned(size, align) {
        Ok(Some(ptr)) => ptr.as_ptr() as *mut c_void,
        _ => std::ptr::null_mut(),
    }
}

/// # Safety
/// `ptr` must either be null or a live allocation from [`gts_aligned_alloc`]
/// with the matching `size`/`align`.
#[no_mangle]
pub unsafe extern "C" fn gts_aligned_free(ptr: *mut c_void, size: usize, align: usize) {
    if ptr.is_null() || size == 0 {
        return;
    }
    let nn = NonNull::new(ptr as *mut u8).expect("checked non-null above");
    if size.saturating_add(align) > MAX_BINNED_SIZE {
        unsafe { binned_allocator::dealloc_oversized(nn) };
        return;
    }
    unsafe { binned_allocator::dealloc_aligned(nn) };
}

/// Remaining usable bytes from `ptr` forward, accounting for any alignment
/// bump applied by [`gts_aligned_alloc`].
///
/// # Safety
/// `ptr` must be a still-live allocation from [`gts_malloc`]/
/// [`gts_aligned_alloc`] (not the oversized passthrough path, which has no
/// block metadata to recover this from).
#[no_mangle]
pub unsafe extern "C" fn gts_usable_size(ptr: *mut c_void) -> usize {
    if ptr.is_null() {
        return 0;
    }
    let nn = NonNull::new(ptr as *mut u8).expect("checked non-null above");
    unsafe { binned_allocator::usable_size(nn) }
}
