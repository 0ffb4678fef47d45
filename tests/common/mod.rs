//! Common test utilities for integration tests
//!
//! Provides shared fixtures, helpers, and test utilities used across
//! multiple integration test files.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};

use tempfile::TempDir;
use topiclog::domain::models::Mode;
use topiclog::Options;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::MakeWriter;

/// Create a temporary directory for test isolation
///
/// Returns a TempDir that will be cleaned up when dropped.
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// In-memory writer shared between the logger and the test.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }

    pub fn make(&self) -> BoxMakeWriter {
        BoxMakeWriter::new(self.clone())
    }
}

impl io::Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for SharedBuffer {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Parameter store from literal pairs.
pub fn store(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

/// Console buffers plus options writing into them.
pub struct Fixture {
    pub stdout: SharedBuffer,
    pub stderr: SharedBuffer,
    pub options: Options,
}

/// Options with captured console writers, entry `APP_LOG` and the given
/// parameters.
pub fn fixture(mode: Mode, pairs: &[(&str, &str)]) -> Fixture {
    let stdout = SharedBuffer::default();
    let stderr = SharedBuffer::default();
    let options = Options::new(mode)
        .with_entry("APP_LOG")
        .with_store(store(pairs))
        .with_console_writers(stdout.make(), stderr.make());
    Fixture {
        stdout,
        stderr,
        options,
    }
}

/// Options with captured console writers and no parameter store.
pub fn console_fixture(mode: Mode) -> Fixture {
    let stdout = SharedBuffer::default();
    let stderr = SharedBuffer::default();
    let options = Options::new(mode).with_console_writers(stdout.make(), stderr.make());
    Fixture {
        stdout,
        stderr,
        options,
    }
}
