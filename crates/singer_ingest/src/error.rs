use std::{io, path::PathBuf};

use thiserror::Error;

/// Boxed error returned by caller-supplied state handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Terminal faults of a Singer ingest run.
///
/// Every variant carries the 1-based physical line number of the input line that caused it.
/// Once one of these is returned the reader yields nothing further.
#[derive(Debug, Error)]
pub enum SingerError {
    #[error("failed to read Singer input at line {line_number}: {kind}")]
    Read {
        line_number: usize,
        #[source]
        kind: ReadFailureKind,
    },
    #[error("line {line_number} is not valid JSON: {source}: `{line}`")]
    Parse {
        line_number: usize,
        line: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("line {line_number} violates the Singer protocol: {message}: `{line}`")]
    Protocol {
        line_number: usize,
        line: String,
        message: String,
    },
    #[error("schema violation in stream `{stream}` at line {line_number}: {message}")]
    SchemaViolation {
        line_number: usize,
        stream: String,
        message: String,
    },
    #[error("state handler failed for STATE at line {line_number}: {source}")]
    StateHandler {
        line_number: usize,
        #[source]
        source: BoxError,
    },
    #[error("failed to persist STATE at line {line_number}: {kind}")]
    StateWrite {
        line_number: usize,
        #[source]
        kind: StateWriteFailureKind,
    },
}

#[derive(Debug, Error)]
pub enum ReadFailureKind {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid UTF-8")]
    InvalidUtf8,
    #[error("line too long (observed_bytes={observed_bytes}, max_line_bytes={max_line_bytes})")]
    LineTooLong {
        observed_bytes: usize,
        max_line_bytes: usize,
    },
}

#[derive(Debug, Error)]
pub enum StateWriteFailureKind {
    #[error("no file system capability was supplied")]
    MissingFileSystem,
    #[error("failed to serialize state value: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("failed to write `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Fieldless discriminant of [`SingerError`], handy for assertions and metrics labels.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum SingerErrorKind {
    ReadFailure,
    ParseError,
    ProtocolViolation,
    SchemaViolation,
    StateHandlerFailure,
    StateWriteFailure,
}

impl SingerError {
    pub fn line_number(&self) -> usize {
        match self {
            SingerError::Read { line_number, .. }
            | SingerError::Parse { line_number, .. }
            | SingerError::Protocol { line_number, .. }
            | SingerError::SchemaViolation { line_number, .. }
            | SingerError::StateHandler { line_number, .. }
            | SingerError::StateWrite { line_number, .. } => *line_number,
        }
    }

    pub fn kind(&self) -> SingerErrorKind {
        match self {
            SingerError::Read { .. } => SingerErrorKind::ReadFailure,
            SingerError::Parse { .. } => SingerErrorKind::ParseError,
            SingerError::Protocol { .. } => SingerErrorKind::ProtocolViolation,
            SingerError::SchemaViolation { .. } => SingerErrorKind::SchemaViolation,
            SingerError::StateHandler { .. } => SingerErrorKind::StateHandlerFailure,
            SingerError::StateWrite { .. } => SingerErrorKind::StateWriteFailure,
        }
    }

    /// The offending input line, for faults that were raised after the line was read.
    pub fn line(&self) -> Option<&str> {
        match self {
            SingerError::Parse { line, .. } | SingerError::Protocol { line, .. } => Some(line),
            _ => None,
        }
    }

    pub(crate) fn protocol(line_number: usize, line: &str, message: impl Into<String>) -> Self {
        SingerError::Protocol {
            line_number,
            line: line.to_string(),
            message: message.into(),
        }
    }
}
