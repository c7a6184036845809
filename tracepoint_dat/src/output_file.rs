// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

use core::mem;
use core::slice;

use std::fs;
use std::io;
use std::io::Read;
use std::io::Seek;
use std::io::Write;
use std::path;

use crate::input_file::InputFile;
use crate::DatFileError;

const COPY_BUFFER_SIZE: usize = 8 * 1024;

/// The `trace.dat` file being written. Tracks the write position so callers
/// never need to query the descriptor.
#[derive(Debug)]
pub(crate) struct OutputFile {
    inner: fs::File,
    inner_pos: u64,
}

impl OutputFile {
    pub fn new(path: &path::Path) -> io::Result<Self> {
        let mut options = fs::OpenOptions::new();
        options.create(true);
        options.truncate(true);
        options.read(true);
        options.write(true);

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o644);
        }

        return Ok(Self {
            inner: options.open(path)?,
            inner_pos: 0,
        });
    }

    pub fn pos(&self) -> u64 {
        self.inner_pos
    }

    pub fn flush(&mut self) -> io::Result<()> {
        return self.inner.flush();
    }

    pub fn seek_absolute(&mut self, new_pos: u64) -> io::Result<u64> {
        self.inner_pos = self.inner.seek(io::SeekFrom::Start(new_pos))?;
        return Ok(self.inner_pos);
    }

    pub fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.inner.write_all(data)?;
        self.inner_pos += data.len() as u64;
        return Ok(());
    }

    /// Writes value in host byte order.
    pub fn write_u32(&mut self, value: u32) -> io::Result<()> {
        return self.write_all(&value.to_ne_bytes());
    }

    /// Writes value in host byte order.
    pub fn write_u64(&mut self, value: u64) -> io::Result<()> {
        return self.write_all(&value.to_ne_bytes());
    }

    /// Writes value followed by a `0` byte.
    pub fn write_string_z(&mut self, value: &[u8]) -> io::Result<()> {
        self.write_all(value)?;
        return self.write_all(&[0]);
    }

    pub fn write_struct<T>(&mut self, value: &T) -> io::Result<()>
    where
        T: Copy, // Proxy for "T is a plain-old-data struct"
    {
        return self.write_all(unsafe {
            slice::from_raw_parts(value as *const T as *const u8, mem::size_of::<T>())
        });
    }

    /// Copies everything from source until it reports end of data.
    /// Returns the number of bytes copied.
    ///
    /// Short reads are retried until `read` returns 0. A failed read or write
    /// aborts the copy. The caller compares the returned count against the size
    /// it already wrote for the section.
    pub fn copy_from(&mut self, source: &mut InputFile) -> Result<u64, DatFileError> {
        let mut buf = [0u8; COPY_BUFFER_SIZE];
        let mut copied = 0u64;
        loop {
            let len = match source.read(&mut buf) {
                Ok(0) => break,
                Ok(len) => len,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(DatFileError::io(source.path(), e)),
            };

            self.write_all(&buf[..len])?;
            copied += len as u64;
        }

        return Ok(copied);
    }

    /// Copies source and verifies that exactly `expected` bytes were copied.
    pub fn copy_checked_from(
        &mut self,
        source: &mut InputFile,
        expected: u64,
    ) -> Result<(), DatFileError> {
        let actual = self.copy_from(source)?;
        if actual != expected {
            tracing::warn!(
                path = %source.path().display(),
                expected,
                actual,
                "wrong size for section source"
            );
            return Err(DatFileError::SizeMismatch {
                path: source.path().to_path_buf(),
                expected,
                actual,
            });
        }

        return Ok(());
    }
}
