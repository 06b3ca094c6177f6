// src/trap.rs — single supervisor trap vector.
//
// The source copy declared a `kernelvec`/`uservec`/`trampoline` trio
// that lived in an assembly file this crate never actually built, so
// every trap path was dead code reaching for undefined symbols (see
// DESIGN.md). There is also no separate user address space here, so
// the user/kernel trapframe split that dead code modeled does not
// apply: every task runs in supervisor mode on its own kernel stack,
// and a trap is serviced on that same stack. `kernelvec` below is a
// self-contained entry point built from `global_asm!`; the only
// interrupt this kernel acts on is the supervisor timer, which bumps
// a tick counter and yields. Every other cause is fatal.

use crate::riscv::{intr_get, r_scause, r_sepc, r_sstatus, r_stval, r_time, w_stimecmp, w_stvec, SSTATUS_SPP};
use crate::spinlock::SpinLock;

/// About a tenth of a second at the `virt` machine's default timebase,
/// matching the interval the source system's clock interrupt handler
/// rearms with.
const TIMER_INTERVAL: u64 = 1_000_000;

const SCAUSE_SUPERVISOR_TIMER: u64 = 0x8000_0000_0000_0005;

pub static mut TICKS_LOCK: SpinLock = SpinLock::new(b"ticks\0" as *const u8);
static mut TICKS: u64 = 0;

extern "C" {
    fn kernelvec();
}

/// Point `stvec` at the kernel trap entry and arm the first timer
/// interrupt. Must run once per hart before interrupts are enabled.
pub unsafe fn init_hart() {
    w_stvec(kernelvec as u64);
    w_stimecmp(r_time() + TIMER_INTERVAL);
}

pub unsafe fn ticks() -> u64 {
    TICKS_LOCK.acquire();
    let t = TICKS;
    TICKS_LOCK.release();
    t
}

/// Entered from `kernelvec` with interrupts disabled and every
/// caller-saved register already spilled to the interrupted task's own
/// stack. Dispatches on `scause`; `sepc`/`sstatus` are restored by
/// `kernelvec` after this returns, so a timer-triggered yield that
/// switches away and later switches back still resumes exactly where
/// it was interrupted.
#[no_mangle]
unsafe extern "C" fn kerneltrap() {
    let sepc = r_sepc();
    let sstatus = r_sstatus();
    let scause = r_scause();

    if (sstatus & SSTATUS_SPP) == 0 {
        panic!("kerneltrap: trap from a mode other than supervisor");
    }
    if intr_get() {
        panic!("kerneltrap: interrupts were enabled on trap entry");
    }

    if scause == SCAUSE_SUPERVISOR_TIMER {
        TICKS_LOCK.acquire();
        TICKS += 1;
        TICKS_LOCK.release();
        w_stimecmp(r_time() + TIMER_INTERVAL);

        if crate::proc::current() != crate::proc::IDLE_SLOT {
            crate::sched::yield_task();
        }
    } else {
        log::error!(
            "unhandled trap: scause={:#x} sepc={:#x} stval={:#x}",
            scause,
            sepc,
            r_stval()
        );
        panic!("kerneltrap: unrecognized cause");
    }
}

// Register save-area layout used by `kernelvec`'s prologue/epilogue.
// Offsets are in bytes from the adjusted `sp`; `sp` itself is not
// saved, since it is trivially recovered by undoing the `addi`.
//
//   0   ra      64  a0     128  s2     192  s10
//   8   gp      72  a1     136  s3     200  s11
//  16   tp      80  a2     144  s4     208  t3
//  24   t0      88  a3     152  s5     216  t4
//  32   t1      96  a4     160  s6     224  t5
//  40   t2     104  a5     168  s7     232  t6
//  48   s0     112  a6     176  s8
//  56   s1     120  a7     184  s9
core::arch::global_asm!(
    ".global kernelvec",
    ".align 4",
    "kernelvec:",
    "addi sp, sp, -240",
    "sd ra, 0(sp)",
    "sd gp, 8(sp)",
    "sd tp, 16(sp)",
    "sd t0, 24(sp)",
    "sd t1, 32(sp)",
    "sd t2, 40(sp)",
    "sd s0, 48(sp)",
    "sd s1, 56(sp)",
    "sd a0, 64(sp)",
    "sd a1, 72(sp)",
    "sd a2, 80(sp)",
    "sd a3, 88(sp)",
    "sd a4, 96(sp)",
    "sd a5, 104(sp)",
    "sd a6, 112(sp)",
    "sd a7, 120(sp)",
    "sd s2, 128(sp)",
    "sd s3, 136(sp)",
    "sd s4, 144(sp)",
    "sd s5, 152(sp)",
    "sd s6, 160(sp)",
    "sd s7, 168(sp)",
    "sd s8, 176(sp)",
    "sd s9, 184(sp)",
    "sd s10, 192(sp)",
    "sd s11, 200(sp)",
    "sd t3, 208(sp)",
    "sd t4, 216(sp)",
    "sd t5, 224(sp)",
    "sd t6, 232(sp)",
    "call kerneltrap",
    "ld ra, 0(sp)",
    "ld gp, 8(sp)",
    "ld tp, 16(sp)",
    "ld t0, 24(sp)",
    "ld t1, 32(sp)",
    "ld t2, 40(sp)",
    "ld s0, 48(sp)",
    "ld s1, 56(sp)",
    "ld a0, 64(sp)",
    "ld a1, 72(sp)",
    "ld a2, 80(sp)",
    "ld a3, 88(sp)",
    "ld a4, 96(sp)",
    "ld a5, 104(sp)",
    "ld a6, 112(sp)",
    "ld a7, 120(sp)",
    "ld s2, 128(sp)",
    "ld s3, 136(sp)",
    "ld s4, 144(sp)",
    "ld s5, 152(sp)",
    "ld s6, 160(sp)",
    "ld s7, 168(sp)",
    "ld s8, 176(sp)",
    "ld s9, 184(sp)",
    "ld s10, 192(sp)",
    "ld s11, 200(sp)",
    "ld t3, 208(sp)",
    "ld t4, 216(sp)",
    "ld t5, 224(sp)",
    "ld t6, 232(sp)",
    "addi sp, sp, 240",
    "sret",
);
