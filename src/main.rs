#![no_std]
#![no_main]
#![feature(naked_functions)]
#![feature(custom_test_frameworks)]
#![test_runner(crate::test::test_runner)]
#![reexport_test_harness_main = "test_main"]

mod console;
mod elf;
mod error;
mod fs;
mod heap;
mod kalloc;
mod lang_items;
mod logger;
mod memlayout;
mod param;
mod proc;
mod riscv;
mod sbi;
mod sched;
mod shell;
mod spinlock;
mod start;
mod string;
mod sync;
mod syscall;
mod test;
mod test_device;
mod trap;
mod types;
mod uart;

#[global_allocator]
static ALLOCATOR: heap::KernelAllocator = heap::KernelAllocator;

/// Kernel entry, reached from `start::start`'s `mret` into supervisor
/// mode. Brings subsystems up in the fixed order (UART, heap, page
/// pool, timer, file system, scheduler, task table, shell task), then
/// enters the scheduler loop. Any failure before the first task exists
/// is fatal.
#[no_mangle]
pub unsafe extern "C" fn rust_main() -> ! {
    uart::init();
    logger::init();
    log::info!("uart ready");

    heap::init();
    log::info!("heap ready");

    kalloc::kinit();
    log::info!("page pool ready");

    trap::init_hart();
    riscv::intr_on();
    log::info!("timer armed");

    fs::init();
    log::info!("file system ready ({} files)", fs::file_count());

    proc::init();
    log::info!("scheduler ready, idle task installed");

    match proc::create(b"shell", shell::run) {
        Some(_) => log::info!("shell task created"),
        None => {
            log::error!("failed to create shell task");
            panic!("rust_main: could not create shell task");
        }
    }

    #[cfg(test)]
    test_main();

    sched::run();
}
