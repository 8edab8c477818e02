use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

const CHUNK_SIZE_BYTES: usize = 8192;

#[derive(Debug)]
pub(crate) enum BoundedLine {
    Line {
        line_number: usize,
        bytes: Vec<u8>,
    },
    /// The line grew past the limit. `observed_bytes` counts what was read of it so far; the
    /// rest of the line is never read.
    LineTooLong {
        line_number: usize,
        observed_bytes: usize,
        max_line_bytes: usize,
    },
    IoError {
        line_number: usize,
        source: io::Error,
    },
}

/// `\n` framing over an async byte source. Holds at most one chunk plus `max_line_bytes` of the
/// current line, and stops at the first over-long line or read error.
pub(crate) struct BoundedLineReader<R: AsyncRead + Unpin> {
    reader: R,
    max_line_bytes: usize,
    chunk: Box<[u8]>,
    start: usize,
    end: usize,
    pending: Vec<u8>,
    lines_read: usize,
    exhausted: bool,
}

impl<R: AsyncRead + Unpin> BoundedLineReader<R> {
    pub(crate) fn new(reader: R, max_line_bytes: usize) -> Self {
        Self {
            reader,
            max_line_bytes,
            chunk: vec![0u8; CHUNK_SIZE_BYTES].into_boxed_slice(),
            start: 0,
            end: 0,
            pending: Vec::new(),
            lines_read: 0,
            exhausted: false,
        }
    }

    async fn refill(&mut self) -> io::Result<usize> {
        self.start = 0;
        self.end = 0;
        let n = loop {
            match self.reader.read(&mut self.chunk).await {
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                other => break other?,
            }
        };
        self.end = n;
        Ok(n)
    }

    fn emit(&mut self, item: impl FnOnce(usize, Vec<u8>) -> BoundedLine) -> BoundedLine {
        self.lines_read += 1;
        item(self.lines_read, std::mem::take(&mut self.pending))
    }

    pub(crate) async fn next_line(&mut self) -> Option<BoundedLine> {
        if self.exhausted {
            return None;
        }

        loop {
            if self.start == self.end {
                match self.refill().await {
                    Ok(0) => {
                        self.exhausted = true;
                        if self.pending.is_empty() {
                            return None;
                        }
                        return Some(self.emit(|line_number, bytes| BoundedLine::Line {
                            line_number,
                            bytes,
                        }));
                    }
                    Ok(_) => {}
                    Err(source) => {
                        self.exhausted = true;
                        return Some(self.emit(|line_number, _| BoundedLine::IoError {
                            line_number,
                            source,
                        }));
                    }
                }
            }

            let available = &self.chunk[self.start..self.end];
            let newline = available.iter().position(|b| *b == b'\n');
            let take = newline.unwrap_or(available.len());

            let observed_bytes = self.pending.len() + take;
            if observed_bytes > self.max_line_bytes {
                self.exhausted = true;
                let max_line_bytes = self.max_line_bytes;
                return Some(self.emit(|line_number, _| BoundedLine::LineTooLong {
                    line_number,
                    observed_bytes,
                    max_line_bytes,
                }));
            }

            self.pending.extend_from_slice(&available[..take]);
            match newline {
                Some(idx) => {
                    self.start += idx + 1;
                    return Some(self.emit(|line_number, bytes| BoundedLine::Line {
                        line_number,
                        bytes,
                    }));
                }
                None => self.start = self.end,
            }
        }
    }
}
