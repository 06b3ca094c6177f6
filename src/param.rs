// param.rs — compile-time kernel limits.

// Task table.
pub const MAX_TASKS: usize = 64; // fixed task-table capacity
pub const NCPU: usize = 1; // single-hart baseline
pub const TASK_NAME_LEN: usize = 32;
pub const MAXARG: usize = 32; // max exec arguments

// Stacks.
pub const KERNEL_STACK_PAGES: usize = 4;

// Flat file system.
pub const BLOCK_SIZE: usize = 512;
pub const FS_BLOCKS: usize = 2048;
pub const MAX_FILES: usize = 64;
pub const MAX_FILENAME: usize = 256;

// Path related.
pub const MAXPATH: usize = 128;
