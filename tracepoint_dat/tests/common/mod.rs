// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

#![allow(dead_code)]

use std::fs;
use std::io;
use std::path;

use tempfile::TempDir;

pub const HEADER_PAGE: &[u8] = b"\tfield: u64 timestamp;\toffset:0;\tsize:8;\tsigned:0;\n";
pub const HEADER_EVENT: &[u8] = b"# compressed entry header\n\ttype_len    :    5 bits\n";
pub const KALLSYMS: &[u8] = b"ffffffff81000000 T _stext\nffffffff81000010 T do_one_initcall\n";
pub const PRINTK_FORMATS: &[u8] = b"0xffffffff8200a3c8 : \"rcu_barrier\"\n";
pub const SAVED_CMDLINES: &[u8] = b"1 systemd\n42 bash\n";

/// Builds a directory tree shaped like tracefs.
pub struct FakeTracingDir {
    pub temp: TempDir,
}

impl FakeTracingDir {
    /// Tree with header files, printk_formats, saved_cmdlines, an empty
    /// `trace`, a kallsyms file, and an empty "ftrace" system.
    pub fn new() -> io::Result<Self> {
        let temp = tempfile::tempdir()?;
        let dir = Self { temp };
        fs::create_dir_all(dir.events_dir().join("ftrace"))?;
        fs::write(dir.events_dir().join("header_page"), HEADER_PAGE)?;
        fs::write(dir.events_dir().join("header_event"), HEADER_EVENT)?;
        fs::write(dir.events_dir().join("enable"), b"0\n")?;
        fs::write(dir.root().join("printk_formats"), PRINTK_FORMATS)?;
        fs::write(dir.root().join("saved_cmdlines"), SAVED_CMDLINES)?;
        fs::write(dir.root().join("trace"), b"")?;
        fs::write(dir.kallsyms_path(), KALLSYMS)?;
        return Ok(dir);
    }

    pub fn root(&self) -> path::PathBuf {
        self.temp.path().join("tracing")
    }

    pub fn events_dir(&self) -> path::PathBuf {
        self.root().join("events")
    }

    pub fn kallsyms_path(&self) -> path::PathBuf {
        self.temp.path().join("kallsyms")
    }

    pub fn output_path(&self, name: &str) -> path::PathBuf {
        self.temp.path().join(name)
    }

    /// Adds `events/<system>/<event>/format`, plus the `enable` and `filter`
    /// files that tracefs also puts in those directories.
    pub fn add_event(&self, system: &str, event: &str, format: &str) -> io::Result<()> {
        let system_dir = self.events_dir().join(system);
        let event_dir = system_dir.join(event);
        fs::create_dir_all(&event_dir)?;
        fs::write(event_dir.join("format"), format)?;
        fs::write(event_dir.join("enable"), b"0\n")?;
        fs::write(system_dir.join("enable"), b"0\n")?;
        fs::write(system_dir.join("filter"), b"none\n")?;
        return Ok(());
    }

    pub fn write_file(&self, name: &str, data: &[u8]) -> io::Result<path::PathBuf> {
        let path = self.temp.path().join(name);
        fs::write(&path, data)?;
        return Ok(path);
    }

    pub fn options(&self) -> tracepoint_dat::DatFileOptions {
        tracepoint_dat::DatFileOptions::new()
            .tracing_dir(self.root())
            .kallsyms_path(self.kallsyms_path())
            .page_size(4096)
    }
}

pub fn format_text(system: &str, event: &str, id: u32) -> String {
    format!(
        "name: {event}\nID: {id}\nformat:\n\tfield:unsigned short common_type;\toffset:0;\tsize:2;\tsigned:0;\n\nprint fmt: \"{system}\"\n"
    )
}

/// The parts of a `trace.dat` file, as decoded by [`DatFile::parse`].
#[derive(Debug, Default)]
pub struct DatFile {
    pub version: String,
    pub big_endian: u8,
    pub long_size: u8,
    pub page_size: u32,
    pub header_page: Vec<u8>,
    pub header_event: Vec<u8>,
    pub ftrace_formats: Vec<Vec<u8>>,
    pub systems: Vec<(Vec<u8>, Vec<Vec<u8>>)>,
    pub kallsyms: Vec<u8>,
    pub printk: Vec<u8>,
    pub saved_cmdlines: Vec<u8>,
    pub cpus: u32,
    pub marker: Vec<u8>,
    /// Position just after the marker.
    pub data_pos: usize,
}

impl DatFile {
    /// Decodes everything up to and including the mode marker. Panics if any
    /// size field runs past the end of the data.
    pub fn parse(data: &[u8]) -> Self {
        let mut reader = Reader { data, pos: 0 };
        assert_eq!(reader.take(10), b"\x17\x08\x44tracing");

        let mut file = DatFile::default();
        file.version = String::from_utf8(reader.take_sz().to_vec()).unwrap();
        file.big_endian = reader.take(1)[0];
        file.long_size = reader.take(1)[0];
        file.page_size = reader.u32();

        assert_eq!(reader.take_sz(), b"header_page");
        file.header_page = reader.section64();
        assert_eq!(reader.take_sz(), b"header_event");
        file.header_event = reader.section64();

        file.ftrace_formats = reader.event_system();

        let system_count = reader.u32();
        for _ in 0..system_count {
            let name = reader.take_sz().to_vec();
            let formats = reader.event_system();
            file.systems.push((name, formats));
        }

        file.kallsyms = reader.section32();
        file.printk = reader.section32();
        file.saved_cmdlines = reader.section64();
        file.cpus = reader.u32();
        file.marker = reader.take(10).to_vec();
        file.data_pos = reader.pos;
        return file;
    }

    /// Reads the flyrecord CPU table that starts at `data_pos`.
    pub fn cpu_table(&self, data: &[u8]) -> Vec<(u64, u64)> {
        let mut reader = Reader {
            data,
            pos: self.data_pos,
        };
        return (0..self.cpus).map(|_| (reader.u64(), reader.u64())).collect();
    }

    /// Returns the formats of the named system, sorted (directory order is not).
    pub fn system_formats(&self, name: impl AsRef<[u8]>) -> Option<Vec<Vec<u8>>> {
        let name = name.as_ref();
        let (_, formats) = self.systems.iter().find(|(n, _)| n.as_slice() == name)?;
        let mut formats = formats.clone();
        formats.sort();
        return Some(formats);
    }
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> &'a [u8] {
        assert!(self.data.len() - self.pos >= len, "section runs past end of file");
        let value = &self.data[self.pos..self.pos + len];
        self.pos += len;
        return value;
    }

    fn take_sz(&mut self) -> &'a [u8] {
        let len = self.data[self.pos..].iter().position(|&b| b == 0).unwrap();
        let value = self.take(len);
        self.take(1);
        return value;
    }

    fn u32(&mut self) -> u32 {
        u32::from_ne_bytes(self.take(4).try_into().unwrap())
    }

    fn u64(&mut self) -> u64 {
        u64::from_ne_bytes(self.take(8).try_into().unwrap())
    }

    fn section32(&mut self) -> Vec<u8> {
        let len = self.u32() as usize;
        self.take(len).to_vec()
    }

    fn section64(&mut self) -> Vec<u8> {
        let len = self.u64() as usize;
        self.take(len).to_vec()
    }

    fn event_system(&mut self) -> Vec<Vec<u8>> {
        let count = self.u32();
        (0..count).map(|_| self.section64()).collect()
    }
}
