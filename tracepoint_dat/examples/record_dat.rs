// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Demonstrates how to use [`td::DatFileWriter`] to package the running
//! system's tracing metadata and current `trace` buffer into a latency-mode
//! `trace.dat` file. Usually needs root.

use std::env;
use std::process;

use tracepoint_dat as td;

fn main() -> process::ExitCode {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("tracepoint_dat=info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let mut args = env::args().skip(1);
    let output = match (args.next(), args.next()) {
        (Some(output), None) if !output.starts_with('-') => output,
        _ => {
            eprintln!("Usage: record_dat <output.dat>");
            return process::ExitCode::FAILURE;
        }
    };

    let tracing_dir = match td::find_tracing_dir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("Error {}", e);
            return process::ExitCode::FAILURE;
        }
    };

    println!("Tracing directory: {}", tracing_dir.display());
    println!("Page size: {}", td::system_page_size());

    let mut writer =
        td::DatFileWriter::with_options(td::DatFileOptions::new().tracing_dir(tracing_dir));
    if let Err(e) = writer.create_latency_file(&output, 1) {
        eprintln!("Error {} create_latency_file {}", e, output);
        return process::ExitCode::FAILURE;
    }

    println!("Wrote {} bytes to {}", writer.file_pos().unwrap_or(0), output);
    writer.close();
    process::ExitCode::SUCCESS
}
