// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Release history

#[allow(unused_imports)]
use crate::*; // For docs

/// # v0.1.0 (2026-10-18)
/// - Initial release: [`DatFileWriter`] with latency and flyrecord modes.
/// - [`find_tracing_dir`], [`system_page_size`], [`ftrace_enable`] helpers.
pub mod v0_1_0 {}
