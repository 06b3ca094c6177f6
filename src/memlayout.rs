// memlayout.rs

//! Physical memory layout
//!
//! qemu -machine virt is set up like this,
//! based on qemu's hw/riscv/virt.c:
//!
//! 00001000 -- boot ROM, provided by qemu
//! 02000000 -- CLINT
//! 0C000000 -- PLIC
//! 10000000 -- uart0
//! 10001000 -- virtio disk
//! 80000000 -- boot ROM jumps here in machine mode
//!             -kernel loads the kernel here
//! unused RAM after 80000000.

pub use crate::riscv::PGSIZE;

// qemu puts UART registers here in physical memory.
pub const UART0: u64 = 0x1000_0000;
pub const UART0_IRQ: u64 = 10;

// virtio mmio interface. Not driven by this kernel (see DESIGN.md); kept
// as documentation of the platform's physical memory map.
pub const VIRTIO0: u64 = 0x1000_1000;
pub const VIRTIO0_IRQ: u64 = 1;

// qemu puts platform-level interrupt controller (PLIC) here. Not routed
// by this kernel; only the timer interrupt is handled.
pub const PLIC: u64 = 0x0c00_0000;
pub const PLIC_PRIORITY: u64 = PLIC + 0x0;
pub const PLIC_PENDING: u64 = PLIC + 0x1000;

// The kernel expects there to be RAM
// for use by the kernel from physical address 0x80000000 to PHYSTOP.
pub const KERNBASE: u64 = 0x8000_0000;
pub const PHYSTOP: u64 = KERNBASE + 128 * 1024 * 1024;

// Byte-granular heap: a fixed region below the page pool.
pub const HEAP_BASE: u64 = 0x8040_0000;
pub const HEAP_END: u64 = 0x8800_0000;

// Page pool: bump-allocated, never reclaimed.
pub const PAGE_POOL_BASE: u64 = 0x9000_0000;
pub const PAGE_POOL_END: u64 = 0x9800_0000;

// Memory-mapped storage region backing the flat file system.
pub const DISK_BASE: u64 = 0xA000_0000;
