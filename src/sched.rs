// src/sched.rs — cooperative round-robin scheduler.
//
// Grounded on this crate's earlier xv6-style `scheduler()`/`sched()`/
// `yield_()`, corrected per DESIGN.md's open-question resolution: the
// source system's `schedule()` only swapped a `current` pointer and
// never actually transferred control, so a preempted task's registers
// were never saved or restored. This version performs a real context
// switch through `swtch`, an xv6-style naked function that saves and
// restores the callee-saved register set.

use crate::proc::{self, Context, TaskState};
use crate::spinlock::SpinLock;

static mut READY_HEAD: Option<usize> = None;
static mut READY_TAIL: Option<usize> = None;
static mut READY_LOCK: SpinLock = SpinLock::new(b"ready_queue\0" as *const u8);

/// Save `*old`'s callee-saved registers and restore `*new`'s, then
/// return (into whatever `ra` the destination context holds).
#[naked]
unsafe extern "C" fn swtch(old: *mut Context, new: *const Context) {
    core::arch::asm!(
        "sd ra, 0(a0)",
        "sd sp, 8(a0)",
        "sd s0, 16(a0)",
        "sd s1, 24(a0)",
        "sd s2, 32(a0)",
        "sd s3, 40(a0)",
        "sd s4, 48(a0)",
        "sd s5, 56(a0)",
        "sd s6, 64(a0)",
        "sd s7, 72(a0)",
        "sd s8, 80(a0)",
        "sd s9, 88(a0)",
        "sd s10, 96(a0)",
        "sd s11, 104(a0)",
        "ld ra, 0(a1)",
        "ld sp, 8(a1)",
        "ld s0, 16(a1)",
        "ld s1, 24(a1)",
        "ld s2, 32(a1)",
        "ld s3, 40(a1)",
        "ld s4, 48(a1)",
        "ld s5, 56(a1)",
        "ld s6, 64(a1)",
        "ld s7, 72(a1)",
        "ld s8, 80(a1)",
        "ld s9, 88(a1)",
        "ld s10, 96(a1)",
        "ld s11, 104(a1)",
        "ret",
        options(noreturn)
    );
}

/// Push `slot` onto the tail of the ready queue.
pub unsafe fn enqueue(slot: usize) {
    READY_LOCK.acquire();
    proc::task_mut(slot).next_ready = None;
    match READY_TAIL {
        Some(tail) => proc::task_mut(tail).next_ready = Some(slot),
        None => READY_HEAD = Some(slot),
    }
    READY_TAIL = Some(slot);
    READY_LOCK.release();
}

unsafe fn dequeue() -> Option<usize> {
    READY_LOCK.acquire();
    let head = READY_HEAD;
    if let Some(slot) = head {
        READY_HEAD = proc::task_mut(slot).next_ready;
        if READY_HEAD.is_none() {
            READY_TAIL = None;
        }
        proc::task_mut(slot).next_ready = None;
    }
    READY_LOCK.release();
    head
}

/// Per-cpu context the scheduler loop itself runs on; `yield_task`
/// switches back into this to pick the next ready task.
static mut SCHEDULER_CONTEXT: Context = Context {
    ra: 0,
    sp: 0,
    s0: 0,
    s1: 0,
    s2: 0,
    s3: 0,
    s4: 0,
    s5: 0,
    s6: 0,
    s7: 0,
    s8: 0,
    s9: 0,
    s10: 0,
    s11: 0,
};

/// Give up the CPU. If the current task is still RUNNING, it is
/// demoted to READY and re-enqueued before handing control to the
/// scheduler loop; a BLOCKED or ZOMBIE task is left off the ready
/// queue entirely. Returns once this task is chosen again.
pub unsafe fn yield_task() {
    let slot = proc::current();
    if proc::state_of(slot) == TaskState::Running {
        proc::set_state(slot, TaskState::Ready);
        enqueue(slot);
    }
    let ctx = proc::context_mut(slot);
    swtch(ctx, &SCHEDULER_CONTEXT as *const Context);
}

/// The scheduler's own loop: repeatedly pop the next ready task and
/// switch into it. Never returns.
///
/// Task 0 (idle) has no stack and no context to switch into — it is
/// represented by this loop itself spinning on the ready queue. When
/// the queue is empty, idle is "current" by definition and the loop
/// just keeps polling; it never needs `swtch`.
pub unsafe fn run() -> ! {
    loop {
        match dequeue() {
            Some(next) => {
                proc::set_state(next, TaskState::Running);
                proc::set_current(next);
                let ctx = proc::context_mut(next);
                swtch(&mut SCHEDULER_CONTEXT as *mut Context, ctx);
                // Control returns here only when `next` yields or blocks;
                // the loop goes around to pick whatever is ready now.
            }
            None => {
                proc::set_current(proc::IDLE_SLOT);
                proc::set_state(proc::IDLE_SLOT, TaskState::Running);
                core::hint::spin_loop();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_case]
    fn ready_queue_is_fifo() {
        unsafe {
            READY_HEAD = None;
            READY_TAIL = None;
            // Slots here are just indices; no real Task backing is
            // needed since enqueue/dequeue only touch next_ready links
            // through proc::task_mut, which is fine against the static
            // TASKS array's default (FREE) slots for this link-only test.
            enqueue(1);
            enqueue(2);
            enqueue(3);
            assert_eq!(dequeue(), Some(1));
            assert_eq!(dequeue(), Some(2));
            assert_eq!(dequeue(), Some(3));
            assert_eq!(dequeue(), None);
        }
    }
}
