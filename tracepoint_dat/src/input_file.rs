// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

use std::fs;
use std::io;
use std::io::Read;
use std::io::Seek;
use std::path;

use crate::DatFileError;

const MEASURE_BUFFER_SIZE: usize = 8 * 1024;

/// A source file (tracefs file, symbol table, or per-CPU capture) being copied
/// into the output.
#[derive(Debug)]
pub(crate) struct InputFile {
    inner: fs::File,
    path: path::PathBuf,
}

impl InputFile {
    pub fn new(path: &path::Path) -> Result<Self, DatFileError> {
        let mut options = fs::OpenOptions::new();
        options.read(true);

        return match options.open(path) {
            Ok(inner) => Ok(Self {
                inner,
                path: path.to_path_buf(),
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(DatFileError::MissingRequiredSource {
                    path: path.to_path_buf(),
                })
            }
            Err(e) => Err(DatFileError::io(path, e)),
        };
    }

    /// Opens a source that may legitimately be absent or unreadable, e.g.
    /// `/proc/kallsyms` for an unprivileged user. Returns `None` in that case.
    pub fn new_optional(path: &path::Path) -> Result<Option<Self>, DatFileError> {
        return match Self::new(path) {
            Ok(file) => Ok(Some(file)),
            Err(DatFileError::MissingRequiredSource { .. }) => Ok(None),
            Err(DatFileError::Io { source, .. })
                if source.kind() == io::ErrorKind::PermissionDenied =>
            {
                Ok(None)
            }
            Err(e) => Err(e),
        };
    }

    pub fn path(&self) -> &path::Path {
        &self.path
    }

    /// Reads the file to the end to count its bytes, then rewinds to the start.
    /// Needed for pseudo-files, which cannot be stat'ed for size.
    pub fn measure_len(&mut self) -> Result<u64, DatFileError> {
        let mut buf = [0u8; MEASURE_BUFFER_SIZE];
        let mut len = 0u64;
        loop {
            match self.inner.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => len += n as u64,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(DatFileError::io(&self.path, e)),
            }
        }

        self.inner
            .seek(io::SeekFrom::Start(0))
            .map_err(|e| DatFileError::io(&self.path, e))?;
        return Ok(len);
    }
}

/// Size reported by the file system for `path`, without opening it.
pub(crate) fn source_len(path: &path::Path) -> Result<u64, DatFileError> {
    return match fs::metadata(path) {
        Ok(metadata) => Ok(metadata.len()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(DatFileError::MissingRequiredSource {
                path: path.to_path_buf(),
            })
        }
        Err(e) => Err(DatFileError::io(path, e)),
    };
}

impl io::Read for InputFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}
