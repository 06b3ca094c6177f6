// Basic unsigned integer types
pub type uint = u32;
pub type ushort = u16;
pub type uchar = u8;

// Fixed-width unsigned integer types
pub type uint8 = u8;
pub type uint16 = u16;
pub type uint32 = u32;
pub type uint64 = u64;

// Page directory entry type
pub type pde_t = uint64;
