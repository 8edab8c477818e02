mod bounded;

use tokio::io::AsyncRead;

use crate::config::IngestLimits;
use crate::error::{ReadFailureKind, SingerError};

use bounded::{BoundedLine, BoundedLineReader};

/// A non-blank input line together with its 1-based physical line number.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RawLine {
    pub line_number: usize,
    pub text: String,
}

/// Lazily yields the non-blank lines of a UTF-8 byte source, in order.
///
/// Line numbers count every physical line, blank ones included. The first read failure is
/// returned once and the tokenizer is exhausted afterwards.
pub struct LineTokenizer<R: AsyncRead + Unpin> {
    lines: BoundedLineReader<R>,
    done: bool,
}

impl<R: AsyncRead + Unpin> LineTokenizer<R> {
    pub fn new(reader: R, limits: IngestLimits) -> Self {
        Self {
            lines: BoundedLineReader::new(reader, limits.max_line_bytes),
            done: false,
        }
    }

    fn fail(
        &mut self,
        line_number: usize,
        kind: ReadFailureKind,
    ) -> Option<Result<RawLine, SingerError>> {
        self.done = true;
        Some(Err(SingerError::Read { line_number, kind }))
    }

    pub async fn next_line(&mut self) -> Option<Result<RawLine, SingerError>> {
        if self.done {
            return None;
        }

        loop {
            let Some(next) = self.lines.next_line().await else {
                self.done = true;
                return None;
            };
            match next {
                BoundedLine::IoError {
                    line_number,
                    source,
                } => return self.fail(line_number, ReadFailureKind::Io(source)),
                BoundedLine::LineTooLong {
                    line_number,
                    observed_bytes,
                    max_line_bytes,
                } => {
                    return self.fail(
                        line_number,
                        ReadFailureKind::LineTooLong {
                            observed_bytes,
                            max_line_bytes,
                        },
                    )
                }
                BoundedLine::Line { line_number, bytes } => {
                    let Ok(mut text) = String::from_utf8(bytes) else {
                        return self.fail(line_number, ReadFailureKind::InvalidUtf8);
                    };
                    if line_number == 1 && text.starts_with('\u{feff}') {
                        text.drain(..'\u{feff}'.len_utf8());
                    }
                    if text.ends_with('\r') {
                        text.pop();
                    }
                    if text.chars().all(char::is_whitespace) {
                        continue;
                    }
                    return Some(Ok(RawLine { line_number, text }));
                }
            }
        }
    }
}
