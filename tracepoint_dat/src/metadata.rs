// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Writes the metadata sections that follow the fixed file header:
//!
//! ```text
//! "header_page\0"  size:u64 data
//! "header_event\0" size:u64 data
//! ftrace:          count:u32 { size:u64 format }...
//! systems:         count:u32 { name\0 count:u32 { size:u64 format }... }...
//! kallsyms:        size:u32 data
//! printk_formats:  size:u32 data
//! saved_cmdlines:  size:u64 data
//! ```
//!
//! Sizes are in host byte order.

use std::borrow;
use std::ffi;
use std::fs;
use std::io;
use std::path;
use std::vec;

use crate::file_abi::*;
use crate::input_file::InputFile;
use crate::output_file::OutputFile;
use crate::DatFileError;

const FTRACE_SYSTEM: &str = "ftrace";
const FORMAT_FILE: &str = "format";

/// Sources for the metadata sections.
#[derive(Clone, Copy, Debug)]
pub(crate) struct MetadataSources<'a> {
    pub tracing_dir: &'a path::Path,
    pub kallsyms_path: &'a path::Path,
}

/// Writes all metadata sections, in file order.
pub(crate) fn write_metadata(
    file: &mut OutputFile,
    sources: MetadataSources,
) -> Result<(), DatFileError> {
    let events_dir = sources.tracing_dir.join("events");
    if !events_dir.is_dir() {
        tracing::warn!(dir = %events_dir.display(), "events directory not found");
        return Err(DatFileError::MissingRequiredSource { path: events_dir });
    }

    write_header_files(file, &events_dir)?;
    write_ftrace_system(file, &events_dir)?;
    write_event_systems(file, &events_dir)?;
    write_file_section(file, sources.kallsyms_path, 4)?;
    write_file_section(file, &sources.tracing_dir.join("printk_formats"), 4)?;
    write_file_section(file, &sources.tracing_dir.join("saved_cmdlines"), 8)?;
    return Ok(());
}

/// `header_page` and `header_event` describe the ring buffer layout.
/// Old kernels don't have them; those get empty sections with the same names.
fn write_header_files(file: &mut OutputFile, events_dir: &path::Path) -> Result<(), DatFileError> {
    file.write_all(HEADER_PAGE_NAME)?;
    write_file_section(file, &events_dir.join("header_page"), 8)?;
    file.write_all(HEADER_EVENT_NAME)?;
    write_file_section(file, &events_dir.join("header_event"), 8)?;
    return Ok(());
}

/// The "ftrace" system is written first and without a name.
fn write_ftrace_system(file: &mut OutputFile, events_dir: &path::Path) -> Result<(), DatFileError> {
    let system_dir = events_dir.join(FTRACE_SYSTEM);
    return write_event_system(file, &system_dir);
}

fn write_event_systems(file: &mut OutputFile, events_dir: &path::Path) -> Result<(), DatFileError> {
    let systems = list_event_systems(events_dir)?;

    debug_assert!(systems.len() <= u32::MAX as usize);
    file.write_u32(systems.len() as u32)?;

    for (name, system_dir) in &systems {
        file.write_string_z(&system_name_bytes(name))?;
        write_event_system(file, system_dir)?;
    }

    return Ok(());
}

/// Writes the count of events in `system_dir`, then the `format` file of each.
/// The directory is listed once so the count always matches the entries written.
fn write_event_system(file: &mut OutputFile, system_dir: &path::Path) -> Result<(), DatFileError> {
    let formats = list_event_formats(system_dir)?;

    tracing::debug!(
        system = %system_dir.display(),
        events = formats.len(),
        "writing event system"
    );

    debug_assert!(formats.len() <= u32::MAX as usize);
    file.write_u32(formats.len() as u32)?;

    for format_path in &formats {
        // Can't stat tracefs files for size.
        let mut format = InputFile::new(format_path)?;
        let size = format.measure_len()?;
        file.write_u64(size)?;
        file.copy_checked_from(&mut format, size)?;
    }

    return Ok(());
}

/// The directory name exactly as the kernel reported it.
#[cfg(unix)]
fn system_name_bytes(name: &ffi::OsStr) -> borrow::Cow<'_, [u8]> {
    use std::os::unix::ffi::OsStrExt;
    return borrow::Cow::Borrowed(name.as_bytes());
}

#[cfg(not(unix))]
fn system_name_bytes(name: &ffi::OsStr) -> borrow::Cow<'_, [u8]> {
    return match name.to_string_lossy() {
        borrow::Cow::Borrowed(s) => borrow::Cow::Borrowed(s.as_bytes()),
        borrow::Cow::Owned(s) => borrow::Cow::Owned(s.into_bytes()),
    };
}

/// Returns (name, path) of every subdirectory of `events_dir` other than "ftrace",
/// in directory order.
fn list_event_systems(
    events_dir: &path::Path,
) -> Result<vec::Vec<(ffi::OsString, path::PathBuf)>, DatFileError> {
    let mut systems = vec::Vec::new();
    for entry in read_required_dir(events_dir)? {
        let entry = entry.map_err(|e| DatFileError::io(events_dir, e))?;
        let name = entry.file_name();
        if name == FTRACE_SYSTEM {
            continue;
        }

        let system_dir = entry.path();
        match fs::metadata(&system_dir) {
            Ok(metadata) if metadata.is_dir() => {
                systems.try_reserve(1)?;
                systems.push((name, system_dir));
            }
            _ => continue,
        }
    }

    return Ok(systems);
}

/// Returns the path of `<entry>/format` for every entry of `system_dir` that
/// has one, in directory order.
fn list_event_formats(system_dir: &path::Path) -> Result<vec::Vec<path::PathBuf>, DatFileError> {
    let mut formats = vec::Vec::new();
    for entry in read_required_dir(system_dir)? {
        let entry = entry.map_err(|e| DatFileError::io(system_dir, e))?;
        let format_path = entry.path().join(FORMAT_FILE);
        if fs::metadata(&format_path).is_ok() {
            formats.try_reserve(1)?;
            formats.push(format_path);
        }
    }

    return Ok(formats);
}

fn read_required_dir(dir: &path::Path) -> Result<fs::ReadDir, DatFileError> {
    return match fs::read_dir(dir) {
        Ok(read_dir) => Ok(read_dir),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::warn!(dir = %dir.display(), "can't read directory");
            Err(DatFileError::MissingRequiredSource {
                path: dir.to_path_buf(),
            })
        }
        Err(e) => Err(DatFileError::io(dir, e)),
    };
}

/// Writes section_size (uN) + the content of `path`.
/// size_of_section_size must be 4 (section_size is u32) or 8 (section_size is u64).
/// A missing or unreadable source gets section_size 0 and no content.
fn write_file_section(
    file: &mut OutputFile,
    path: &path::Path,
    size_of_section_size: usize,
) -> Result<(), DatFileError> {
    debug_assert!(size_of_section_size == 4 || size_of_section_size == 8);

    let mut source = match InputFile::new_optional(path)? {
        Some(source) => source,
        None => {
            tracing::debug!(path = %path.display(), "source not available, writing empty section");
            return write_section_size(file, size_of_section_size, 0);
        }
    };

    let size = source.measure_len()?;
    if size_of_section_size == 4 && size > u32::MAX as u64 {
        tracing::warn!(path = %path.display(), size, "source too large for 32-bit section");
        return Err(DatFileError::SectionTooLarge {
            path: path.to_path_buf(),
            size,
        });
    }

    tracing::debug!(path = %path.display(), size, "writing section");
    write_section_size(file, size_of_section_size, size)?;
    return file.copy_checked_from(&mut source, size);
}

fn write_section_size(
    file: &mut OutputFile,
    size_of_section_size: usize,
    size: u64,
) -> Result<(), DatFileError> {
    if size_of_section_size == 8 {
        file.write_u64(size)?;
    } else {
        file.write_u32(size as u32)?;
    }

    return Ok(());
}
