#![allow(dead_code)]

use std::{
    collections::BTreeMap,
    io,
    path::{Path, PathBuf},
    pin::Pin,
    sync::{Arc, Mutex},
    task::{Context, Poll},
};

use serde_json::Value;
use singer_ingest::{BoxFuture, StateFileSystem};
use tokio::io::{AsyncRead, ReadBuf};

/// In-memory state file system with a fixed current directory.
#[derive(Clone, Debug, Default)]
pub struct MemoryFileSystem {
    files: Arc<Mutex<BTreeMap<PathBuf, String>>>,
    writes: Arc<Mutex<usize>>,
}

impl MemoryFileSystem {
    pub const CWD: &'static str = "/singer";

    pub fn read(&self, path: impl AsRef<Path>) -> Option<String> {
        self.files.lock().unwrap().get(path.as_ref()).cloned()
    }

    pub fn state_file(&self) -> Option<String> {
        self.read(Path::new(Self::CWD).join("State.json"))
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.lock().unwrap().keys().cloned().collect()
    }

    pub fn write_count(&self) -> usize {
        *self.writes.lock().unwrap()
    }
}

impl StateFileSystem for MemoryFileSystem {
    fn current_dir(&self) -> io::Result<PathBuf> {
        Ok(PathBuf::from(Self::CWD))
    }

    fn write_all_text<'a>(
        &'a self,
        path: &'a Path,
        contents: &'a str,
    ) -> BoxFuture<'a, io::Result<()>> {
        Box::pin(async move {
            self.files
                .lock()
                .unwrap()
                .insert(path.to_path_buf(), contents.to_string());
            *self.writes.lock().unwrap() += 1;
            Ok(())
        })
    }
}

pub fn input(text: &str) -> std::io::Cursor<Vec<u8>> {
    std::io::Cursor::new(text.as_bytes().to_vec())
}

/// Serves `bytes`, then fails every later read with `BrokenPipe`.
pub struct BrokenSource {
    bytes: Vec<u8>,
}

impl BrokenSource {
    pub fn after(text: &str) -> Self {
        Self {
            bytes: text.as_bytes().to_vec(),
        }
    }
}

impl AsyncRead for BrokenSource {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.bytes.is_empty() {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "tap process went away",
            )));
        }
        let n = self.bytes.len().min(buf.remaining());
        let served: Vec<u8> = self.bytes.drain(..n).collect();
        buf.put_slice(&served);
        Poll::Ready(Ok(()))
    }
}

pub fn jsonl(messages: &[Value]) -> String {
    messages
        .iter()
        .map(|message| message.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|err| panic!("failed to read fixture {}: {err}", path.display()))
}
