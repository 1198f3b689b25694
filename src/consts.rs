pub const FILE_SIGNATURE: u32 = 0x28635349; // "ISc(" stored little-endian

pub const MIN_VERSION: u32 = 5;
pub const MAX_VERSION: u32 = 13;

// File entry flags:
pub const FLAG_SPLIT: u16 = 0x1;
pub const FLAG_OBFUSCATED: u16 = 0x2;
pub const FLAG_COMPRESSED: u16 = 0x4;
pub const FLAG_INVALID: u16 = 0x8;

/// Stride of one record in the version >= 6 file table.
pub const FILE_RECORD_SIZE: u64 = 0x57;

/// Upper bound on a stored path, to keep a missing NUL terminator in a
/// malformed name area from turning into a runaway read.
pub const MAX_NAME_SIZE: usize = 1024;
