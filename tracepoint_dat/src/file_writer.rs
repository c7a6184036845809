// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

use std::path;
use std::vec;

use crate::cpu_layout;
use crate::file_abi::*;
use crate::input_file::InputFile;
use crate::metadata;
use crate::output_file::OutputFile;
use crate::tracefs;
use crate::CpuDataSection;
use crate::DatFileError;
use crate::DatFileOptions;

/// Progress of a [`DatFileWriter`] through its output file.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DatFileWriterState {
    /// No file has been created yet.
    Unopened,
    /// Signature, version, byte order, long size, and page size are written.
    HeaderWritten,
    /// All metadata sections are written.
    MetadataWritten,
    /// The mode marker is written; trace data is being (or has been) written.
    TerminalSectionInProgress,
    /// The output file is closed, either by [`DatFileWriter::close`] or
    /// because an error occurred.
    Closed,
}

/// Writes `trace.dat` files.
///
/// Usage procedure:
/// - Construct a writer: `let mut writer = DatFileWriter::new();`, or use
///   [`DatFileWriter::with_options`] to override the tracing directory, page size,
///   and so on.
/// - Create the file in one of two modes:
///   - `writer.create_latency_file(filename, cpus)` copies the `trace` file of the
///     tracing directory as one unsegmented block.
///   - `writer.create_flyrecord_file(filename, &cpu_data_files)` copies each CPU's
///     raw buffer capture to its own page-aligned block.
///   - Either call writes the complete file before returning.
/// - Close the file: `writer.close();` (also done on drop).
///
/// If a create call fails, the writer closes the file and leaves what was
/// written so far on disk. The partial file is not a valid `trace.dat`. Write to
/// a temporary path and rename on success if that matters.
#[derive(Debug)]
pub struct DatFileWriter {
    options: DatFileOptions,
    state: DatFileWriterState,
    file: Option<OutputFile>,
    page_size: u32,
    tracing_dir: Option<path::PathBuf>,
}

impl DatFileWriter {
    /// Returns a new writer using the running system's tracing directory and
    /// page size.
    pub fn new() -> Self {
        Self::with_options(DatFileOptions::new())
    }

    /// Returns a new writer using the specified options.
    pub fn with_options(options: DatFileOptions) -> Self {
        Self {
            options,
            state: DatFileWriterState::Unopened,
            file: None,
            page_size: 0,
            tracing_dir: None,
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> DatFileWriterState {
        self.state
    }

    /// Returns the position at which the next byte would be written.
    /// Returns `None` if the file is closed.
    pub fn file_pos(&self) -> Option<u64> {
        self.file.as_ref().map(|f| f.pos())
    }

    /// Returns the page size recorded in the current file, or 0 if no file
    /// has been created.
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Returns the tracing directory used for the current file, if it has
    /// been resolved.
    pub fn tracing_dir(&self) -> Option<&path::Path> {
        self.tracing_dir.as_deref()
    }

    /// Closes the output file (if any). Safe to call more than once.
    pub fn close(&mut self) {
        if let Some(mut file) = self.file.take() {
            if let Err(e) = file.flush() {
                tracing::warn!(error = %e, "flush failed while closing output file");
            }
        }

        self.tracing_dir = None;
        if self.state != DatFileWriterState::Unopened {
            self.state = DatFileWriterState::Closed;
        }
    }

    /// Creates a latency-mode `trace.dat` file: headers, metadata, `cpus`, the
    /// `"latency  "` marker, then the content of the tracing directory's `trace`
    /// file up to the end of the output.
    ///
    /// `cpus` is recorded as given.
    pub fn create_latency_file(
        &mut self,
        path: impl AsRef<path::Path>,
        cpus: u32,
    ) -> Result<(), DatFileError> {
        let path = path.as_ref();
        let result = self
            .create_file(path, cpus)
            .and_then(|()| self.write_latency_data());
        return self.finish(path, result);
    }

    /// Creates a flyrecord-mode `trace.dat` file: headers, metadata, the number
    /// of CPUs, the `"flyrecord"` marker, the CPU table, then each entry of
    /// `cpu_data_files` at a page-aligned offset.
    ///
    /// `cpu_data_files[i]` holds the raw ring buffer pages captured for CPU `i`.
    /// On success, returns the CPU table that was written.
    pub fn create_flyrecord_file<P>(
        &mut self,
        path: impl AsRef<path::Path>,
        cpu_data_files: &[P],
    ) -> Result<vec::Vec<CpuDataSection>, DatFileError>
    where
        P: AsRef<path::Path>,
    {
        let path = path.as_ref();
        let cpu_data_files: vec::Vec<path::PathBuf> = cpu_data_files
            .iter()
            .map(|p| p.as_ref().to_path_buf())
            .collect();

        debug_assert!(cpu_data_files.len() <= u32::MAX as usize);
        let result = self
            .create_file(path, cpu_data_files.len() as u32)
            .and_then(|()| self.write_flyrecord_data(&cpu_data_files));
        return self.finish(path, result);
    }

    /// On success, leaves the file open. On error, closes it.
    fn finish<T>(
        &mut self,
        path: &path::Path,
        result: Result<T, DatFileError>,
    ) -> Result<T, DatFileError> {
        match &result {
            Ok(_) => {
                tracing::debug!(path = %path.display(), size = ?self.file_pos(), "trace.dat written");
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to write trace.dat");
                self.close();
            }
        }

        return result;
    }

    /// Closes any previous output file, creates a new file, then writes
    /// everything up to and including the CPU count.
    fn create_file(&mut self, path: &path::Path, cpus: u32) -> Result<(), DatFileError> {
        self.close();

        let page_size = self
            .options
            .page_size
            .unwrap_or_else(tracefs::system_page_size);
        if !page_size.is_power_of_two() {
            return Err(DatFileError::InvalidPageSize(page_size));
        }

        self.page_size = page_size;
        self.state = DatFileWriterState::Unopened;

        let mut file = OutputFile::new(path).map_err(|e| DatFileError::io(path, e))?;
        file.write_all(TRACING_SIGNATURE)?;
        file.write_string_z(FILE_VERSION.as_bytes())?;

        // Everything after this is in host byte order.
        file.write_all(&[tracefs::host_big_endian() as u8])?;

        // Size of long on the traced system (may not be what the kernel uses).
        file.write_all(&[self.options.long_size])?;
        file.write_u32(page_size)?;
        self.file = Some(file);
        self.state = DatFileWriterState::HeaderWritten;

        let tracing_dir = self.resolve_tracing_dir()?.to_path_buf();
        let file = self.file.as_mut().ok_or(DatFileError::NotOpen)?;
        metadata::write_metadata(
            file,
            metadata::MetadataSources {
                tracing_dir: &tracing_dir,
                kallsyms_path: &self.options.kallsyms_path,
            },
        )?;
        self.state = DatFileWriterState::MetadataWritten;

        file.write_u32(cpus)?;
        return Ok(());
    }

    fn write_latency_data(&mut self) -> Result<(), DatFileError> {
        let trace_path = self.resolve_tracing_dir()?.join("trace");
        let file = self.file.as_mut().ok_or(DatFileError::NotOpen)?;
        file.write_all(LATENCY_MARKER)?;
        self.state = DatFileWriterState::TerminalSectionInProgress;

        let mut trace = InputFile::new(&trace_path)?;
        let size = file.copy_from(&mut trace)?;
        tracing::debug!(path = %trace_path.display(), size, "copied latency trace");
        file.flush()?;
        return Ok(());
    }

    fn write_flyrecord_data(
        &mut self,
        cpu_data_files: &[path::PathBuf],
    ) -> Result<vec::Vec<CpuDataSection>, DatFileError> {
        let file = self.file.as_mut().ok_or(DatFileError::NotOpen)?;
        file.write_all(FLYRECORD_MARKER)?;
        self.state = DatFileWriterState::TerminalSectionInProgress;

        let layout = cpu_layout::write_cpu_data(file, self.page_size, cpu_data_files)?;
        file.flush()?;
        return Ok(layout);
    }

    /// Finds the tracing directory on first use.
    fn resolve_tracing_dir(&mut self) -> Result<&path::Path, DatFileError> {
        if self.tracing_dir.is_none() {
            let dir = match &self.options.tracing_dir {
                Some(dir) => dir.clone(),
                None => tracefs::find_tracing_dir()?,
            };
            tracing::debug!(dir = %dir.display(), "using tracing directory");
            self.tracing_dir = Some(dir);
        }

        return self
            .tracing_dir
            .as_deref()
            .ok_or(DatFileError::TracingDirNotFound);
    }
}

impl Default for DatFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DatFileWriter {
    fn drop(&mut self) {
        self.close();
    }
}
