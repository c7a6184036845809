// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

/// First 10 bytes of every `trace.dat` file.
pub const TRACING_SIGNATURE: &[u8; 10] = b"\x17\x08\x44tracing";

/// Version string written (NUL-terminated) after the signature.
/// 0.6 is the first version with a saved_cmdlines section.
pub const FILE_VERSION: &str = "0.6";

/// Mode marker for a single unsegmented trace buffer. Includes the NUL.
pub const LATENCY_MARKER: &[u8; 10] = b"latency  \0";

/// Mode marker for page-aligned per-CPU data blocks. Includes the NUL.
pub const FLYRECORD_MARKER: &[u8; 10] = b"flyrecord\0";

/// Section names include the NUL terminator.
pub const HEADER_PAGE_NAME: &[u8] = b"header_page\0";
pub const HEADER_EVENT_NAME: &[u8] = b"header_event\0";

/// Entry of the flyrecord CPU table: where one CPU's data block lives in the file.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[repr(C)]
pub struct CpuDataSection {
    /// Offset of the block from the start of the file. Page-aligned.
    pub offset: u64,
    /// Size of the block in bytes.
    pub size: u64,
}

/// Size of one CPU table entry in the file.
pub const CPU_DATA_SECTION_SIZE: u64 = core::mem::size_of::<CpuDataSection>() as u64;
