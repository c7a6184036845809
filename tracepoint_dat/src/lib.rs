// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

#![warn(missing_docs)]
#![allow(clippy::needless_return)]

//! trace.dat file writing
//!
//! A `trace.dat` file packages the kernel's tracing metadata (ring buffer
//! header layout, event format descriptions, symbol table, printk formats,
//! saved command lines) together with captured trace buffer data so that it can
//! be decoded on another machine.
//!
//! Layout (all integers after the byte order flag are in host byte order):
//!
//! ```text
//! "\x17\x08\x44tracing" "0.6\0" big_endian:u8 long_size:u8 page_size:u32
//! metadata sections (see DatFileWriter)
//! cpus:u32
//! "latency  \0" trace...                                  (latency mode)
//! "flyrecord\0" { offset:u64 size:u64 }[cpus] ... blocks  (flyrecord mode)
//! ```
//!
//! In flyrecord mode, each CPU's block starts on a page boundary so a reader
//! can map it directly.

pub use cpu_layout::plan_cpu_layout;
pub use error::DatFileError;
pub use file_abi::CpuDataSection;
pub use file_writer::DatFileWriter;
pub use file_writer::DatFileWriterState;
pub use options::DatFileOptions;
pub use tracefs::find_tracing_dir;
pub use tracefs::ftrace_enable;
pub use tracefs::host_big_endian;
pub use tracefs::host_long_size;
pub use tracefs::system_page_size;

pub mod changelog;

mod cpu_layout;
mod error;
mod file_abi;
mod file_writer;
mod input_file;
mod metadata;
mod options;
mod output_file;
mod tracefs;
