//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use anyhow::Result;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::cell::RefCell;
use std::io::Write;

use native_deps::process::{Cmd, CmdResult, Executor};
use native_deps::source::download::Downloader;

/// Records commands instead of running them.
pub struct RecordingExecutor {
    pub commands: Vec<Cmd>,
    fail: Box<dyn Fn(&Cmd) -> bool>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::failing_when(|_| false)
    }

    pub fn failing_when(fail: impl Fn(&Cmd) -> bool + 'static) -> Self {
        Self {
            commands: Vec::new(),
            fail: Box::new(fail),
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.commands.iter().map(|c| c.to_string()).collect()
    }
}

impl Executor for RecordingExecutor {
    fn execute(&mut self, cmd: &Cmd) -> Result<CmdResult> {
        self.commands.push(cmd.clone());
        if (self.fail)(cmd) {
            Ok(CmdResult::failed(2))
        } else {
            Ok(CmdResult::ok())
        }
    }
}

/// Serves the same body for every URL and remembers what was requested.
pub struct FakeDownloader {
    body: Vec<u8>,
    pub requests: RefCell<Vec<String>>,
}

impl FakeDownloader {
    pub fn serving(body: Vec<u8>) -> Self {
        Self {
            body,
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl Downloader for FakeDownloader {
    fn fetch(&self, url: &str, sink: &mut dyn Write) -> Result<u64> {
        self.requests.borrow_mut().push(url.to_string());
        sink.write_all(&self.body)?;
        Ok(self.body.len() as u64)
    }
}

/// A gzip-compressed tarball containing `files` (path, contents).
pub fn tar_gz(files: &[(&str, &str)]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (path, contents) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, path, contents.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}
