// src/sync.rs — counting semaphore and a recursive, owner-tracking mutex
// built on top of `SpinLock`.

use crate::spinlock::SpinLock;

/// A counting semaphore. `wait()` spins (releasing and reacquiring the
/// guard lock) while the count is non-positive, matching the source
/// system's busy-wait semaphore; there is no blocked-task queue here.
pub struct Semaphore {
    lock: SpinLock,
    count: i32,
}

impl Semaphore {
    pub const fn new(name: *const u8, initial: i32) -> Self {
        Semaphore {
            lock: SpinLock::new(name),
            count: initial,
        }
    }

    /// Block (by spinning) until the count is positive, then consume one.
    pub unsafe fn wait(&mut self) {
        loop {
            self.lock.acquire();
            if self.count > 0 {
                self.count -= 1;
                self.lock.release();
                return;
            }
            self.lock.release();
            core::hint::spin_loop();
        }
    }

    /// Release one unit back to the semaphore.
    pub unsafe fn signal(&mut self) {
        self.lock.acquire();
        self.count += 1;
        self.lock.release();
    }

    pub unsafe fn count(&mut self) -> i32 {
        self.lock.acquire();
        let c = self.count;
        self.lock.release();
        c
    }
}

/// A spinlock-backed mutex that tracks its owning task's PID and
/// supports recursive locking by that same owner.
///
/// The source system's mutex type declares `owner` and `wait_queue`
/// fields but its lock/unlock never consult them, so any task can
/// "unlock" a mutex it never held and recursive locking by the owner
/// just deadlocks against the inner spinlock. This version uses `owner`
/// for real: re-entering the lock from the owning task bumps a
/// recursion count instead of spinning forever, and unlocking from a
/// non-owner task is rejected rather than silently corrupting state.
pub struct Mutex {
    lock: SpinLock,
    owner: i32, // 0 means unlocked; no real task has pid 0
    depth: u32,
}

impl Mutex {
    pub const fn new(name: *const u8) -> Self {
        Mutex {
            lock: SpinLock::new(name),
            owner: 0,
            depth: 0,
        }
    }

    /// Acquire the mutex. Safe to call again from the same owning task
    /// (the pid passed by the caller, typically the current task's pid);
    /// each such call must be matched by an `unlock`.
    pub unsafe fn lock(&mut self, pid: i32) {
        loop {
            self.lock.acquire();
            if self.depth == 0 {
                self.owner = pid;
                self.depth = 1;
                self.lock.release();
                return;
            }
            if self.owner == pid {
                self.depth += 1;
                self.lock.release();
                return;
            }
            self.lock.release();
            core::hint::spin_loop();
        }
    }

    /// Release one level of ownership. Returns `false` (and leaves the
    /// mutex untouched) if `pid` does not currently hold it.
    pub unsafe fn unlock(&mut self, pid: i32) -> bool {
        self.lock.acquire();
        if self.depth == 0 || self.owner != pid {
            self.lock.release();
            return false;
        }
        self.depth -= 1;
        if self.depth == 0 {
            self.owner = 0;
        }
        self.lock.release();
        true
    }

    pub unsafe fn holder(&mut self) -> Option<i32> {
        self.lock.acquire();
        let owner = if self.depth > 0 { Some(self.owner) } else { None };
        self.lock.release();
        owner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_case]
    fn mutex_recursive_lock_by_owner_succeeds() {
        let mut m = Mutex::new(core::ptr::null());
        unsafe {
            m.lock(7);
            m.lock(7); // re-entrant, same owner
            assert_eq!(m.holder(), Some(7));
            assert!(m.unlock(7));
            assert_eq!(m.holder(), Some(7)); // still held, depth 1
            assert!(m.unlock(7));
            assert_eq!(m.holder(), None);
        }
    }

    #[test_case]
    fn mutex_rejects_non_owner_unlock() {
        let mut m = Mutex::new(core::ptr::null());
        unsafe {
            m.lock(1);
            assert!(!m.unlock(2));
            assert_eq!(m.holder(), Some(1));
            assert!(m.unlock(1));
        }
    }
}
