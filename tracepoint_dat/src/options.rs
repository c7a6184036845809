// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

use std::path;

use crate::tracefs;

/// Settings for a [`crate::DatFileWriter`].
///
/// The defaults describe the running system: tracing directory found on first
/// use, `sysconf(_SC_PAGESIZE)` page size, host `long` size, and
/// `/proc/kallsyms` as the symbol table.
#[derive(Clone, Debug)]
pub struct DatFileOptions {
    pub(crate) tracing_dir: Option<path::PathBuf>,
    pub(crate) page_size: Option<u32>,
    pub(crate) kallsyms_path: path::PathBuf,
    pub(crate) long_size: u8,
}

impl DatFileOptions {
    /// Default location of the kernel symbol table.
    pub const DEFAULT_KALLSYMS_PATH: &'static str = "/proc/kallsyms";

    /// Returns options describing the running system.
    pub fn new() -> Self {
        Self {
            tracing_dir: None,
            page_size: None,
            kallsyms_path: path::PathBuf::from(Self::DEFAULT_KALLSYMS_PATH),
            long_size: tracefs::host_long_size(),
        }
    }

    /// Use `dir` as the tracing directory instead of searching for tracefs.
    /// The directory should contain `events/`, `printk_formats`, `saved_cmdlines`,
    /// and (for latency mode) `trace`.
    pub fn tracing_dir(mut self, dir: impl Into<path::PathBuf>) -> Self {
        self.tracing_dir = Some(dir.into());
        self
    }

    /// Record `page_size` instead of the system page size. Must be a non-zero
    /// power of two; this is checked when a file is created.
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Read the symbol table from `path` instead of `/proc/kallsyms`.
    pub fn kallsyms_path(mut self, path: impl Into<path::PathBuf>) -> Self {
        self.kallsyms_path = path.into();
        self
    }

    /// Record `long_size` as the size of `long` on the traced system.
    pub fn long_size(mut self, long_size: u8) -> Self {
        self.long_size = long_size;
        self
    }
}

impl Default for DatFileOptions {
    fn default() -> Self {
        Self::new()
    }
}
