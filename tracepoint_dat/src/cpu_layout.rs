// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Flyrecord layout: a table of (offset, size) per CPU, followed by each CPU's
//! data block starting on a page boundary.

use std::path;
use std::vec;

use crate::file_abi::*;
use crate::input_file;
use crate::input_file::InputFile;
use crate::output_file::OutputFile;
use crate::DatFileError;

/// Rounds `pos` up to the next multiple of `page_size`.
/// PRECONDITION: `page_size` is a power of two.
pub(crate) fn align_up(pos: u64, page_size: u64) -> u64 {
    assert!(page_size.is_power_of_two(), "page size must be a power of two");
    return (pos + (page_size - 1)) & !(page_size - 1);
}

/// Computes the CPU table for data blocks of the given sizes, where the table
/// itself starts at `table_pos`. The first block starts at the first page
/// boundary after the table; each following block starts at the first page
/// boundary after the previous block.
///
/// PRECONDITION: `page_size` is a power of two.
pub fn plan_cpu_layout(
    table_pos: u64,
    page_size: u32,
    block_sizes: &[u64],
) -> vec::Vec<CpuDataSection> {
    let page_size = page_size as u64;

    // Hold room for the table, then lay out the data.
    let mut offset = align_up(
        table_pos + block_sizes.len() as u64 * CPU_DATA_SECTION_SIZE,
        page_size,
    );

    let mut layout = vec::Vec::with_capacity(block_sizes.len());
    for &size in block_sizes {
        layout.push(CpuDataSection { offset, size });
        offset = align_up(offset + size, page_size);
    }

    return layout;
}

/// Writes the CPU table at the current position of `file`, then copies each
/// CPU's data file to its reserved offset.
///
/// Block sizes come from the file system size of each data file. Each file is
/// opened only while it is copied. A data file that changes size between the
/// table being written and being copied fails with
/// [`DatFileError::SizeMismatch`].
pub(crate) fn write_cpu_data(
    file: &mut OutputFile,
    page_size: u32,
    cpu_data_files: &[path::PathBuf],
) -> Result<vec::Vec<CpuDataSection>, DatFileError> {
    let mut sizes = vec::Vec::new();
    sizes.try_reserve_exact(cpu_data_files.len())?;
    for cpu_data_file in cpu_data_files {
        sizes.push(input_file::source_len(cpu_data_file)?);
    }

    let layout = plan_cpu_layout(file.pos(), page_size, &sizes);
    for section in &layout {
        file.write_struct(section)?;
    }

    for (cpu, (cpu_data_file, section)) in cpu_data_files.iter().zip(&layout).enumerate() {
        tracing::debug!(cpu, offset = section.offset, size = section.size, "writing cpu data");
        let mut source = InputFile::new(cpu_data_file)?;

        // Empty blocks are not written, so don't move past the end of the file.
        if section.size != 0 {
            file.seek_absolute(section.offset)?;
        }

        file.copy_checked_from(&mut source, section.size)?;
    }

    return Ok(layout);
}
