//! ELF (Executable and Linkable Format) type definitions

/// ELF Magic number: "\x7FELF" in little endian
pub const ELF_MAGIC: u32 = 0x464C457F;

/// ELF file header
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ElfHeader {
    /// Must equal ELF_MAGIC
    pub magic: u32,
    /// ELF identification
    pub elf: [u8; 12],
    /// Object file type
    pub type_: u16,
    /// Machine type
    pub machine: u16,
    /// Object file version
    pub version: u32,
    /// Entry point virtual address
    pub entry: u64,
    /// Program header table file offset
    pub phoff: u64,
    /// Section header table file offset
    pub shoff: u64,
    /// Processor-specific flags
    pub flags: u32,
    /// ELF header size in bytes
    pub ehsize: u16,
    /// Program header table entry size
    pub phentsize: u16,
    /// Program header table entry count
    pub phnum: u16,
    /// Section header table entry size
    pub shentsize: u16,
    /// Section header table entry count
    pub shnum: u16,
    /// Section header string table index
    pub shstrndx: u16,
}

/// Program section header
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ProgramHeader {
    /// Segment type
    pub type_: u32,
    /// Segment flags
    pub flags: u32,
    /// Segment file offset
    pub off: u64,
    /// Segment virtual address
    pub vaddr: u64,
    /// Segment physical address
    pub paddr: u64,
    /// Segment size in file
    pub filesz: u64,
    /// Segment size in memory
    pub memsz: u64,
    /// Segment alignment
    pub align: u64,
}

/// Program header type values
pub mod ph_type {
    /// Loadable program segment
    pub const LOAD: u32 = 1;
}

/// Program header flags
pub mod ph_flags {
    /// Execute permission
    pub const EXEC: u32 = 1;
    /// Write permission
    pub const WRITE: u32 = 2;
    /// Read permission
    pub const READ: u32 = 4;
}

/// `e_machine` value for RISC-V, per the source system's `elf_load`.
pub const EM_RISCV: u16 = 0xF3;

impl ElfHeader {
    /// Check if the header has a valid ELF magic number
    pub fn is_valid(&self) -> bool {
        self.magic == ELF_MAGIC
    }
}

use crate::error::{KError, KResult};
use crate::fs;
use crate::kalloc;
use core::mem::size_of;

/// Load `path` from the file system into memory and return its entry
/// address. Grounded on original_source/kernel/elf.c's `elf_load`:
/// read the header, validate magic and machine, then for each
/// `PT_LOAD` program header copy `p_filesz` bytes from the file to
/// `p_vaddr` and zero the BSS tail `[p_vaddr+p_filesz, p_vaddr+p_memsz)`.
pub unsafe fn load(path: &[u8]) -> KResult<u64> {
    let mut ehdr_buf = [0u8; size_of::<ElfHeader>()];
    if fs::read_at(path, &mut ehdr_buf, 0).map_err(|_| KError::NotFound)? != ehdr_buf.len() {
        return Err(KError::Corrupt);
    }
    let ehdr = core::ptr::read_unaligned(ehdr_buf.as_ptr() as *const ElfHeader);
    if !ehdr.is_valid() || ehdr.machine != EM_RISCV {
        return Err(KError::InvalidArgument);
    }

    for i in 0..ehdr.phnum as u32 {
        let mut phdr_buf = [0u8; size_of::<ProgramHeader>()];
        let phdr_offset = ehdr.phoff as u32 + i * ehdr.phentsize as u32;
        if fs::read_at(path, &mut phdr_buf, phdr_offset)? != phdr_buf.len() {
            continue;
        }
        let phdr = core::ptr::read_unaligned(phdr_buf.as_ptr() as *const ProgramHeader);
        if phdr.type_ != ph_type::LOAD {
            continue;
        }

        let vaddr = phdr.vaddr as *mut u8;
        let filesz = phdr.filesz as usize;
        let page = crate::riscv::PGSIZE as usize;
        let mut written = 0usize;
        while written < filesz {
            let chunk = (filesz - written).min(page);
            let staging = kalloc::kalloc();
            if staging.is_null() {
                return Err(KError::OutOfResources);
            }
            let staging_slice = core::slice::from_raw_parts_mut(staging, chunk);
            let got = fs::read_at(path, staging_slice, phdr.off as u32 + written as u32)?;
            if got != chunk {
                kalloc::kfree(staging);
                return Err(KError::Corrupt);
            }
            core::ptr::copy_nonoverlapping(staging, vaddr.add(written), chunk);
            kalloc::kfree(staging);
            written += chunk;
        }
        if phdr.memsz > phdr.filesz {
            core::ptr::write_bytes(vaddr.add(filesz), 0, (phdr.memsz - phdr.filesz) as usize);
        }
    }

    Ok(ehdr.entry)
}
