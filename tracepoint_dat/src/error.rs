// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

use std::collections;
use std::io;
use std::path;

use thiserror::Error;

/// Errors returned while building a `trace.dat` file.
///
/// Every error is fatal for the file being built: the writer closes its output
/// and leaves whatever was already written on disk.
#[derive(Debug, Error)]
pub enum DatFileError {
    /// Open, read, seek, or metadata query failed for a source file or directory.
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        /// The file or directory that failed.
        path: path::PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },

    /// Write, seek, or flush failed on the output file.
    #[error("I/O error on output file: {0}")]
    Output(#[from] io::Error),

    /// The number of bytes copied for a section does not match the size that
    /// was already written for it.
    #[error("wrong size for '{}': expected {expected} bytes, copied {actual}", .path.display())]
    SizeMismatch {
        /// Source of the section.
        path: path::PathBuf,
        /// Size recorded in the file.
        expected: u64,
        /// Bytes actually copied.
        actual: u64,
    },

    /// A source that every `trace.dat` file needs does not exist, e.g. the
    /// `events` directory or the `events/ftrace` system.
    #[error("required source '{}' does not exist", .path.display())]
    MissingRequiredSource {
        /// The missing file or directory.
        path: path::PathBuf,
    },

    /// Could not reserve memory for a directory listing or the CPU table.
    #[error("allocation failure: {0}")]
    AllocationFailure(#[from] collections::TryReserveError),

    /// Page size is zero or not a power of two.
    #[error("invalid page size {0}: must be a non-zero power of two")]
    InvalidPageSize(u32),

    /// Content of a section with a 32-bit size field is 4GB or larger.
    #[error("'{}' is too large for its section ({size} bytes)", .path.display())]
    SectionTooLarge {
        /// Source of the section.
        path: path::PathBuf,
        /// Measured size of the source.
        size: u64,
    },

    /// No tracefs or debugfs mount could be found.
    #[error("could not find the tracefs or debugfs tracing directory")]
    TracingDirNotFound,

    /// The writer has no open output file.
    #[error("no output file is open")]
    NotOpen,
}

impl DatFileError {
    pub(crate) fn io(path: &path::Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
