// src/kalloc.rs — page pool.
//
// A bump allocator: pages are handed out by advancing a high-water
// mark through a fixed physical region and are never reclaimed. This
// replaces this file's earlier xv6-style reclaimable free-list design
// (see DESIGN.md).

use crate::memlayout::{PAGE_POOL_BASE, PAGE_POOL_END, PGSIZE};
use crate::spinlock::SpinLock;

struct PagePool {
    lock: SpinLock,
    next: u64, // next address to hand out
    end: u64,  // one past the last usable address
}

static mut KMEM: PagePool = PagePool {
    lock: SpinLock::new(b"kmem\0" as *const u8),
    next: 0,
    end: 0,
};

/// Initialize the page pool to span `[PAGE_POOL_BASE, PAGE_POOL_END)`.
///
/// # Safety
/// Must only be called once during kernel bring-up.
pub unsafe fn kinit() {
    KMEM.lock.acquire();
    KMEM.next = PAGE_POOL_BASE;
    KMEM.end = PAGE_POOL_END;
    KMEM.lock.release();
}

/// Hand out one zeroed, page-aligned page, or null if the pool is
/// exhausted. Allocated pages are never returned to the pool.
///
/// # Safety
/// The returned page is valid until the kernel halts; there is no
/// reclaim path, so callers must not assume freeing it makes the
/// address reusable.
pub unsafe fn kalloc() -> *mut u8 {
    KMEM.lock.acquire();
    let candidate = KMEM.next;
    if candidate + PGSIZE > KMEM.end {
        KMEM.lock.release();
        return core::ptr::null_mut();
    }
    KMEM.next = candidate + PGSIZE;
    KMEM.lock.release();

    let page = candidate as *mut u8;
    core::ptr::write_bytes(page, 0, PGSIZE as usize);
    page
}

/// Page reclaim is not supported (see DESIGN.md's "Page reclaim" open
/// question); kept as a documented no-op so callers can still pair
/// every `kalloc` with a `kfree`.
///
/// # Safety
/// `pa` must have been returned by `kalloc`, or null.
pub unsafe fn kfree(_pa: *mut u8) {}

/// Bytes currently handed out, for observability.
pub unsafe fn allocated_bytes() -> u64 {
    KMEM.lock.acquire();
    let used = KMEM.next - PAGE_POOL_BASE;
    KMEM.lock.release();
    used
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_case]
    fn pages_are_distinct_and_page_aligned() {
        unsafe {
            kinit();
            let a = kalloc();
            let b = kalloc();
            assert_ne!(a, b);
            assert_eq!((a as u64) % PGSIZE, 0);
            assert_eq!((b as u64) % PGSIZE, 0);
            assert_eq!(b as u64 - a as u64, PGSIZE);
        }
    }

    #[test_case]
    fn exhaustion_returns_null() {
        unsafe {
            KMEM.lock.acquire();
            KMEM.next = PAGE_POOL_BASE;
            KMEM.end = PAGE_POOL_BASE + PGSIZE;
            KMEM.lock.release();
            assert!(!kalloc().is_null());
            assert!(kalloc().is_null());
        }
    }
}
