// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

use std::fs;

use pretty_assertions::assert_eq;

use tracepoint_dat::*;

mod common;
use common::*;

#[test]
fn empty_trace() -> Result<(), Box<dyn std::error::Error>> {
    let dir = FakeTracingDir::new()?;
    dir.add_event("ftrace", "function", &format_text("ftrace", "function", 1))?;
    let output = dir.output_path("trace.dat");

    let mut writer = DatFileWriter::with_options(dir.options());
    writer.create_latency_file(&output, 8)?;
    assert_eq!(writer.state(), DatFileWriterState::TerminalSectionInProgress);
    writer.close();

    let data = fs::read(&output)?;
    let file = DatFile::parse(&data);
    assert_eq!(file.marker, b"latency  \0".to_vec());
    assert_eq!(file.cpus, 8);
    assert_eq!(file.page_size, 4096);
    assert_eq!(file.ftrace_formats.len(), 1);
    assert!(file.systems.is_empty());

    // Nothing after the marker.
    assert_eq!(data.len(), file.data_pos);
    return Ok(());
}

#[test]
fn trace_copied_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let dir = FakeTracingDir::new()?;
    dir.add_event("sched", "sched_switch", &format_text("sched", "sched_switch", 316))?;
    let trace: Vec<u8> = b"# tracer: wakeup_rt\n#\n"
        .iter()
        .cycle()
        .take(50_000)
        .copied()
        .collect();
    fs::write(dir.root().join("trace"), &trace)?;
    let output = dir.output_path("trace.dat");

    let mut writer = DatFileWriter::with_options(dir.options().page_size(16384));
    writer.create_latency_file(&output, 1)?;
    assert_eq!(writer.file_pos(), Some(fs::metadata(&output)?.len()));
    writer.close();

    let data = fs::read(&output)?;
    let file = DatFile::parse(&data);
    assert_eq!(file.cpus, 1);
    assert_eq!(file.page_size, 16384);
    assert_eq!(file.systems.len(), 1);
    assert_eq!(file.systems[0].0, b"sched");
    assert_eq!(&data[file.data_pos..], &trace[..]);
    return Ok(());
}

#[test]
fn missing_trace_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = FakeTracingDir::new()?;
    fs::remove_file(dir.root().join("trace"))?;
    let output = dir.output_path("trace.dat");

    let mut writer = DatFileWriter::with_options(dir.options());
    match writer.create_latency_file(&output, 1) {
        Err(DatFileError::MissingRequiredSource { path }) => {
            assert_eq!(path, dir.root().join("trace"))
        }
        other => panic!("unexpected result: {:?}", other),
    }

    assert_eq!(writer.state(), DatFileWriterState::Closed);

    // Everything up to the marker was written before the failure.
    let data = fs::read(&output)?;
    let file = DatFile::parse(&data);
    assert_eq!(file.marker, b"latency  \0".to_vec());
    assert_eq!(data.len(), file.data_pos);
    return Ok(());
}

#[test]
fn ftrace_only_without_events() -> Result<(), Box<dyn std::error::Error>> {
    // An "ftrace" system with no events is still valid.
    let dir = FakeTracingDir::new()?;
    let output = dir.output_path("trace.dat");

    let mut writer = DatFileWriter::with_options(dir.options());
    writer.create_latency_file(&output, 0)?;
    drop(writer);

    let data = fs::read(&output)?;
    let file = DatFile::parse(&data);
    assert!(file.ftrace_formats.is_empty());
    assert!(file.systems.is_empty());
    assert_eq!(file.cpus, 0);
    return Ok(());
}
