// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Queries against the running system: where tracefs lives, page size, and the
//! host's byte order and `long` size.

use core::mem;

use std::fs;
use std::io;
use std::io::Write;
use std::os::raw;
use std::path;

use crate::DatFileError;

const DEFAULT_TRACING_DIR: &str = "/sys/kernel/tracing";
const PROC_MOUNTS: &str = "/proc/mounts";
const FTRACE_ENABLED: &str = "/proc/sys/kernel/ftrace_enabled";

/// Returns the path of the kernel tracing directory, e.g. `/sys/kernel/tracing`
/// or `/sys/kernel/debug/tracing`.
///
/// Tries the usual tracefs mount point first, then searches `/proc/mounts`,
/// preferring a `tracefs` mount over `debugfs`.
pub fn find_tracing_dir() -> Result<path::PathBuf, DatFileError> {
    let default_dir = path::Path::new(DEFAULT_TRACING_DIR);
    if default_dir.join("events").is_dir() {
        return Ok(default_dir.to_path_buf());
    }

    let mounts = match fs::read_to_string(PROC_MOUNTS) {
        Ok(mounts) => mounts,
        Err(e) => {
            tracing::warn!(error = %e, "can't read {}", PROC_MOUNTS);
            return Err(DatFileError::TracingDirNotFound);
        }
    };

    return tracing_dir_from_mounts(&mounts).ok_or(DatFileError::TracingDirNotFound);
}

/// Parses `/proc/mounts` content ("device mount_point fs_type options...").
/// A `tracefs` mount point wins over `debugfs` + `/tracing`, regardless of order.
pub(crate) fn tracing_dir_from_mounts(mounts: &str) -> Option<path::PathBuf> {
    let mut debugfs_dir = None;
    for line in mounts.lines() {
        let mut parts = line.split_ascii_whitespace();
        let mount_point = match (parts.next(), parts.next()) {
            (Some(_device), Some(mount_point)) => mount_point,
            _ => continue,
        };

        match parts.next() {
            Some("tracefs") => return Some(path::PathBuf::from(unescape_mount(mount_point))),
            Some("debugfs") if debugfs_dir.is_none() => {
                debugfs_dir = Some(path::Path::new(&unescape_mount(mount_point)).join("tracing"));
            }
            _ => {}
        }
    }

    return debugfs_dir;
}

/// `/proc/mounts` escapes space, tab, newline, and backslash as `\ooo`.
fn unescape_mount(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut pos = 0;
    while pos < bytes.len() {
        if bytes[pos] == b'\\'
            && pos + 3 < bytes.len()
            && bytes[pos + 1..pos + 4].iter().all(|b| (b'0'..=b'7').contains(b))
        {
            let octal = bytes[pos + 1..pos + 4]
                .iter()
                .fold(0u32, |acc, b| acc * 8 + (b - b'0') as u32);
            result.push(octal as u8);
            pos += 4;
        } else {
            result.push(bytes[pos]);
            pos += 1;
        }
    }

    return String::from_utf8_lossy(&result).into_owned();
}

/// Returns the page size of the running system (`sysconf(_SC_PAGESIZE)`).
pub fn system_page_size() -> u32 {
    #[cfg(unix)]
    {
        let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if let Ok(page_size @ 1..) = u32::try_from(page_size) {
            return page_size;
        }
    }

    return 4096;
}

/// true if running on a big-endian system.
pub const fn host_big_endian() -> bool {
    cfg!(target_endian = "big")
}

/// Size of the host's C `long` type in bytes.
pub const fn host_long_size() -> u8 {
    mem::size_of::<raw::c_long>() as u8
}

/// Turns function tracing on or off via `/proc/sys/kernel/ftrace_enabled`.
///
/// Returns `Ok(false)` and does nothing if the kernel has no such switch,
/// `Ok(true)` if the value was written.
pub fn ftrace_enable(set: bool) -> Result<bool, DatFileError> {
    let switch_path = path::Path::new(FTRACE_ENABLED);
    match fs::metadata(switch_path) {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(DatFileError::io(switch_path, e)),
    }

    let mut switch = fs::OpenOptions::new()
        .write(true)
        .open(switch_path)
        .map_err(|e| DatFileError::io(switch_path, e))?;
    switch
        .write_all(if set { b"1" } else { b"0" })
        .map_err(|e| DatFileError::io(switch_path, e))?;
    return Ok(true);
}
