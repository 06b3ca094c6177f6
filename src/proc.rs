// src/proc.rs — task table.
//
// A fixed-capacity array of task slots addressed by index (not PID).
// Grounded on this crate's earlier xv6-style `Proc`/`Cpu`/`Context`
// (kept for the callee-saved-register context shape and per-CPU
// bookkeeping) and on the source system's `task_t`/`task_create`/
// `task_exit`/`task_fork`/`task_wait` for the task lifecycle, with the
// all-tasks list and ready queue kept as small-integer slot indices
// (arena-plus-index) instead of raw intrusive pointers, so the two
// lists never alias the same storage the way the source's single
// `next` field does.

use crate::kalloc;
use crate::param::{MAX_TASKS, TASK_NAME_LEN};
use crate::riscv::{self, PGSIZE};
use crate::spinlock::SpinLock;
use crate::sync::Mutex;

/// Registers saved for kernel context switches (callee-saved + ra/sp;
/// the only registers a cooperative `swtch` needs to preserve across a
/// yield point, since the calling convention already spills the
/// caller-saved registers before any call).
#[repr(C)]
#[derive(Copy, Clone, Default)]
pub struct Context {
    pub ra: u64,
    pub sp: u64,
    pub s0: u64,
    pub s1: u64,
    pub s2: u64,
    pub s3: u64,
    pub s4: u64,
    pub s5: u64,
    pub s6: u64,
    pub s7: u64,
    pub s8: u64,
    pub s9: u64,
    pub s10: u64,
    pub s11: u64,
}

/// Per-CPU state. `NCPU` is 1 in this baseline; kept as an array for
/// the same reason the source keeps `Cpu` separate from `Proc` — it is
/// the natural extension point for more harts.
#[repr(C)]
pub struct Cpu {
    pub task: Option<usize>, // index of the task running on this cpu
    pub context: Context,    // swtch() here to enter the scheduler
    pub noff: i32,           // depth of push_off() nesting
    pub intena: bool,        // were interrupts enabled before push_off()
}

const EMPTY_CPU: Cpu = Cpu {
    task: None,
    context: Context {
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
    },
    noff: 0,
    intena: false,
};

static mut CPUS: [Cpu; crate::param::NCPU] = [EMPTY_CPU; crate::param::NCPU];

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum TaskState {
    Free,
    Ready,
    Running,
    Blocked,
    Zombie,
}

/// One task-table slot.
pub struct Task {
    /// Full general-register snapshot (used by trap entry and by
    /// `fork`'s register copy; the scheduler's own `swtch` only touches
    /// `context`, the callee-saved subset).
    pub regs: [u64; 32],
    pub pc: u64,
    pub sp: u64,
    /// Root page-table pointer; always null in this identity-mapped
    /// baseline (virtual memory is a documented extension point, not
    /// implemented here).
    pub pagetable: *mut u8,
    pub state: TaskState,
    pub pid: i32,
    pub parent_pid: i32,
    pub name: [u8; TASK_NAME_LEN],
    pub kstack: *mut u8,
    pub exit_code: i32,
    /// Guards this task's state/exit_code transition so `exit` and a
    /// concurrent `wait` never observe a torn update.
    pub wait_lock: Mutex,
    pub next: Option<usize>,       // all-tasks list link
    pub prev: Option<usize>,       // all-tasks list link
    pub next_ready: Option<usize>, // ready-queue link
    pub context: Context,          // swtch() here to run this task
}

impl Task {
    const fn empty() -> Task {
        Task {
            regs: [0; 32],
            pc: 0,
            sp: 0,
            pagetable: core::ptr::null_mut(),
            state: TaskState::Free,
            pid: 0,
            parent_pid: 0,
            name: [0; TASK_NAME_LEN],
            kstack: core::ptr::null_mut(),
            exit_code: 0,
            wait_lock: Mutex::new(b"task_wait\0" as *const u8),
            next: None,
            prev: None,
            next_ready: None,
            context: Context {
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
            },
        }
    }
}

const EMPTY_TASK: Task = Task::empty();
static mut TASKS: [Task; MAX_TASKS] = [EMPTY_TASK; MAX_TASKS];

static mut PROC_LOCK: SpinLock = SpinLock::new(b"proc_table\0" as *const u8);
static mut PID_LOCK: SpinLock = SpinLock::new(b"nextpid\0" as *const u8);
static mut NEXT_PID: i32 = 1;
static mut ALL_HEAD: Option<usize> = None;
static mut CURRENT: Option<usize> = None;

/// Index of the always-present idle task.
pub const IDLE_SLOT: usize = 0;

/// Direct access to a task slot. Callers are expected to hold
/// `PROC_LOCK` (or otherwise know no concurrent mutation is possible,
/// e.g. single-hart cooperative code operating on its own current task).
pub unsafe fn task_mut(i: usize) -> &'static mut Task {
    &mut TASKS[i]
}

pub unsafe fn current() -> usize {
    CURRENT.expect("no current task")
}

pub unsafe fn set_current(i: usize) {
    CURRENT = Some(i);
}

pub unsafe fn current_pid() -> i32 {
    TASKS[current()].pid
}

#[inline]
pub unsafe fn mycpu() -> *mut Cpu {
    // Single-hart baseline: hart id always maps to CPUS[0].
    &mut CPUS[0]
}

/// Initialize the task table: zero every slot (already the static
/// default) and install task 0 as the idle task, RUNNING, with no
/// stack.
pub unsafe fn init() {
    PROC_LOCK.acquire();
    TASKS[IDLE_SLOT].pid = 0;
    TASKS[IDLE_SLOT].parent_pid = 0;
    TASKS[IDLE_SLOT].state = TaskState::Running;
    set_name(&mut TASKS[IDLE_SLOT], b"idle");
    TASKS[IDLE_SLOT].next = None;
    TASKS[IDLE_SLOT].prev = None;
    ALL_HEAD = Some(IDLE_SLOT);
    CURRENT = Some(IDLE_SLOT);
    NEXT_PID = 1;
    PROC_LOCK.release();
}

unsafe fn set_name(t: &mut Task, name: &[u8]) {
    let n = core::cmp::min(name.len(), TASK_NAME_LEN - 1);
    t.name[..n].copy_from_slice(&name[..n]);
    t.name[n] = 0;
}

unsafe fn allocpid() -> i32 {
    PID_LOCK.acquire();
    let pid = NEXT_PID;
    NEXT_PID += 1;
    PID_LOCK.release();
    pid
}

/// Locate the first FREE or ZOMBIE slot. Returns `None` if the table is
/// full. Caller must hold `PROC_LOCK`.
unsafe fn find_free_slot() -> Option<usize> {
    for i in 0..MAX_TASKS {
        if TASKS[i].state == TaskState::Free || TASKS[i].state == TaskState::Zombie {
            return Some(i);
        }
    }
    None
}

/// Entry trampoline for newly created tasks: the saved context's `ra`
/// points here on first resume. `s1` carries the task's real entry
/// address (packed in at creation, restored by `swtch` before we ever
/// run).
#[naked]
unsafe extern "C" fn task_trampoline() -> ! {
    core::arch::asm!("jr s1", options(noreturn));
}

/// Create a new task running `entry` (a bare `extern "C" fn() -> !`).
/// Returns the new slot index, or `None` on table-full or page
/// exhaustion.
pub unsafe fn create(name: &[u8], entry: extern "C" fn() -> !) -> Option<usize> {
    PROC_LOCK.acquire();
    let slot = match find_free_slot() {
        Some(s) => s,
        None => {
            PROC_LOCK.release();
            return None;
        }
    };

    let stack = kalloc::kalloc();
    if stack.is_null() {
        PROC_LOCK.release();
        return None;
    }

    let t = &mut TASKS[slot];
    *t = Task::empty();
    t.pid = allocpid();
    t.parent_pid = TASKS[current()].pid;
    set_name(t, name);
    t.kstack = stack;
    t.sp = stack as u64 + PGSIZE;
    t.pc = entry as usize as u64;
    t.state = TaskState::Ready;
    t.context = Context::default();
    t.context.ra = task_trampoline as usize as u64;
    t.context.sp = t.sp;
    t.context.s1 = entry as usize as u64;

    t.next = ALL_HEAD;
    if let Some(head) = ALL_HEAD {
        TASKS[head].prev = Some(slot);
    }
    ALL_HEAD = Some(slot);

    PROC_LOCK.release();

    crate::sched::enqueue(slot);
    Some(slot)
}

/// Remove a slot from the global all-tasks list. Caller must hold
/// `PROC_LOCK`.
unsafe fn unlink_all(slot: usize) {
    let (prev, next) = (TASKS[slot].prev, TASKS[slot].next);
    match prev {
        Some(p) => TASKS[p].next = next,
        None => ALL_HEAD = next,
    }
    if let Some(n) = next {
        TASKS[n].prev = prev;
    }
    TASKS[slot].next = None;
    TASKS[slot].prev = None;
}

/// Terminate the current task with `code`. Never returns.
pub unsafe fn exit(code: i32) -> ! {
    let slot = current();
    let pid = TASKS[slot].pid;

    TASKS[slot].wait_lock.lock(pid);
    TASKS[slot].state = TaskState::Zombie;
    TASKS[slot].exit_code = code;
    TASKS[slot].wait_lock.unlock(pid);

    PROC_LOCK.acquire();
    unlink_all(slot);
    PROC_LOCK.release();

    crate::sched::yield_task();
    unreachable!("a zombie task was rescheduled");
}

/// Clone the current task. Copies the kernel stack contents (not just
/// the stack pointer) and demultiplexes the return value: the parent's
/// call returns the child's PID; the child's first resume re-enters at
/// this same call site and sees 0.
///
/// Correctness note (see DESIGN.md): the copied stack's saved
/// frame-pointer chain is only rewritten for the immediate `sp`/`s0`
/// pair captured at the fork point, the same assumption stackful-fiber
/// libraries make. Deeper frames that stash an absolute stack address
/// in a non-frame-pointer callee-saved register are not relocated.
pub unsafe fn fork() -> i32 {
    let parent_slot = current();
    let mut saved = Context::default();
    let is_parent = capture_context(&mut saved);

    if is_parent == 0 {
        // Resumed as the child: the parent already finished wiring us
        // into the table before we were ever scheduled.
        return 0;
    }

    PROC_LOCK.acquire();
    let child_slot = match find_free_slot() {
        Some(s) => s,
        None => {
            PROC_LOCK.release();
            return -1;
        }
    };
    let child_stack = kalloc::kalloc();
    if child_stack.is_null() {
        PROC_LOCK.release();
        return -1;
    }

    let parent_kstack = TASKS[parent_slot].kstack as u64;
    core::ptr::copy_nonoverlapping(parent_kstack as *const u8, child_stack, PGSIZE as usize);

    let rebase = |addr: u64| -> u64 { child_stack as u64 + (addr - parent_kstack) };

    let child_pid = allocpid();
    let parent_name = TASKS[parent_slot].name;
    let parent_pid = TASKS[parent_slot].pid;

    let c = &mut TASKS[child_slot];
    *c = Task::empty();
    c.pid = child_pid;
    c.parent_pid = parent_pid;
    c.name = parent_name;
    c.kstack = child_stack;
    c.state = TaskState::Ready;

    let resume_sp = rebase(saved.sp);
    let resume_pc = saved.ra;
    let push_at = (resume_sp - 8) as *mut u64;
    *push_at = resume_pc;

    c.context.sp = resume_sp - 8;
    c.context.ra = fork_child_entry as usize as u64;
    c.context.s0 = rebase(saved.s0);
    c.context.s1 = saved.s1;
    c.context.s2 = saved.s2;
    c.context.s3 = saved.s3;
    c.context.s4 = saved.s4;
    c.context.s5 = saved.s5;
    c.context.s6 = saved.s6;
    c.context.s7 = saved.s7;
    c.context.s8 = saved.s8;
    c.context.s9 = saved.s9;
    c.context.s10 = saved.s10;
    c.context.s11 = saved.s11;

    c.next = ALL_HEAD;
    if let Some(head) = ALL_HEAD {
        TASKS[head].prev = Some(child_slot);
    }
    ALL_HEAD = Some(child_slot);

    PROC_LOCK.release();

    crate::sched::enqueue(child_slot);
    child_pid
}

/// Capture the caller's callee-saved registers and stack/frame
/// pointers without switching away; returns 1 on the direct call
/// (parent), and will later "return" 0 if this exact call site is
/// re-entered via `fork_child_entry` after a context switch into a
/// freshly forked child.
#[naked]
unsafe extern "C" fn capture_context(ctx: *mut Context) -> u64 {
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
        "li a0, 1",
        "ret",
        options(noreturn)
    );
}

/// Entry point a freshly forked child's `swtch` lands on: pop the real
/// resume address pushed just below the restored stack pointer, force
/// the return-value register to 0 (fork's child-side return value),
/// and jump there.
#[naked]
unsafe extern "C" fn fork_child_entry() -> ! {
    core::arch::asm!(
        "ld t0, 0(sp)",
        "addi sp, sp, 8",
        "li a0, 0",
        "jr t0",
        options(noreturn)
    );
}

/// Rewrite the current task's program counter to `entry` (resolved by
/// the external ELF loader) and reset its stack pointer to the top of
/// its stack page. Returns 0 on success.
///
/// The actual file load and entry-address resolution is the ELF
/// loader's job (see `elf::load`); this just performs the task-side
/// bookkeeping the source's `task_exec` does after a successful load.
pub unsafe fn exec_replace(entry: u64) -> i32 {
    let slot = current();
    let t = &mut TASKS[slot];
    t.pc = entry;
    t.sp = t.kstack as u64 + PGSIZE;
    0
}

/// Wait for a child of the current task to become a zombie, reap it,
/// and return its exit code. Returns -1 if the current task has no
/// children.
pub unsafe fn wait(pid: i32) -> i32 {
    let me = current_pid();
    loop {
        PROC_LOCK.acquire();
        let mut found = None;
        for i in 0..MAX_TASKS {
            if TASKS[i].parent_pid == me && TASKS[i].pid == pid && TASKS[i].state != TaskState::Free {
                found = Some(i);
                break;
            }
        }
        let child_slot = match found {
            Some(s) => s,
            None => {
                PROC_LOCK.release();
                return -1;
            }
        };
        let zombie = TASKS[child_slot].state == TaskState::Zombie;
        PROC_LOCK.release();

        if zombie {
            PROC_LOCK.acquire();
            let code = TASKS[child_slot].exit_code;
            TASKS[child_slot] = Task::empty();
            PROC_LOCK.release();
            return code;
        }

        crate::sched::yield_task();
    }
}

pub unsafe fn name_of(slot: usize) -> &'static [u8] {
    &TASKS[slot].name
}

pub unsafe fn pid_of(slot: usize) -> i32 {
    TASKS[slot].pid
}

pub unsafe fn state_of(slot: usize) -> TaskState {
    TASKS[slot].state
}

pub(crate) unsafe fn context_mut(slot: usize) -> *mut Context {
    &mut TASKS[slot].context
}

pub(crate) unsafe fn set_state(slot: usize, s: TaskState) {
    TASKS[slot].state = s;
}

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn test_task_entry() -> ! {
        loop {}
    }

    /// Reset the task table to a fresh post-`init` state. Run before
    /// every test so `NEXT_PID`/`TASKS`/`ALL_HEAD` carry no state left
    /// over by an earlier test in the same binary.
    fn with_proc<F: FnOnce()>(f: F) {
        unsafe {
            for t in TASKS.iter_mut() {
                *t = Task::empty();
            }
            ALL_HEAD = None;
            CURRENT = None;
            init();
        }
        f();
    }

    #[test_case]
    fn create_assigns_monotonically_increasing_pids() {
        with_proc(|| unsafe {
            let a = create(b"a", test_task_entry).expect("slot available");
            let b = create(b"b", test_task_entry).expect("slot available");
            assert!(pid_of(b) > pid_of(a));
            assert_eq!(state_of(a), TaskState::Ready);
            assert_eq!(state_of(b), TaskState::Ready);
            assert_eq!(&name_of(a)[..1], b"a");
            assert_eq!(&name_of(b)[..1], b"b");
        });
    }

    #[test_case]
    fn create_links_new_task_as_child_of_current() {
        with_proc(|| unsafe {
            let parent_pid = current_pid();
            let slot = create(b"child", test_task_entry).expect("slot available");
            assert_eq!(TASKS[slot].parent_pid, parent_pid);
        });
    }

    #[test_case]
    fn fork_returns_child_pid_to_parent_and_links_it_ready() {
        with_proc(|| unsafe {
            let parent_pid = current_pid();
            let child_pid = fork();
            assert!(child_pid > 0, "parent call returns the child's pid");

            let child_slot = (0..MAX_TASKS)
                .find(|&i| TASKS[i].pid == child_pid)
                .expect("forked child present in the task table");
            assert_eq!(TASKS[child_slot].parent_pid, parent_pid);
            assert_eq!(TASKS[child_slot].state, TaskState::Ready);
        });
    }

    /// Covers the fork/exit/wait lifecycle (a zombie child reaped back
    /// to FREE). The exit side is simulated by hand rather than calling
    /// `exit`, since `exit` hands off through a real `swtch` into the
    /// scheduler loop's context, which is only meaningful once
    /// `sched::run` is driving the hart.
    #[test_case]
    fn wait_reaps_zombie_child_back_to_free() {
        with_proc(|| unsafe {
            let child_pid = fork();
            assert!(child_pid > 0);
            let child_slot = (0..MAX_TASKS)
                .find(|&i| TASKS[i].pid == child_pid)
                .expect("forked child present in the task table");

            TASKS[child_slot].state = TaskState::Zombie;
            TASKS[child_slot].exit_code = 7;

            let code = wait(child_pid);
            assert_eq!(code, 7);
            assert_eq!(TASKS[child_slot].state, TaskState::Free);
        });
    }

    #[test_case]
    fn wait_returns_negative_one_for_unknown_pid() {
        with_proc(|| unsafe {
            assert_eq!(wait(99_999), -1);
        });
    }
}
