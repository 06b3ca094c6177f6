//! Kernel error taxonomy and its mapping onto the negative-int / null
//! sentinel conventions the external interfaces use.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KError {
    /// A caller violated a documented precondition (bad argument, lock
    /// already held by the calling context, etc).
    InvalidArgument,
    /// A fixed-capacity resource (heap, page pool, task table, file
    /// table, disk blocks) has no room left.
    OutOfResources,
    /// A named object (file, task, child) does not exist.
    NotFound,
    /// On-disk or in-memory state failed a structural check (bad magic,
    /// corrupt bitmap).
    Corrupt,
    /// A trap arrived that the kernel has no handler for.
    UnhandledTrap,
}

impl KError {
    /// Collapse to the negative-`errno`-style sentinel used at syscall
    /// and C-shaped module boundaries. There is a single error code
    /// (`-1`) at that boundary, matching the source system's syscall
    /// surface; the richer variant is for internal diagnostics only.
    pub const fn to_errno(self) -> i64 {
        -1
    }
}

pub type KResult<T> = Result<T, KError>;
