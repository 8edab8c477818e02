#![forbid(unsafe_code)]
//! Streaming reader for the output of a Singer tap.
//!
//! Input is newline-delimited JSON where each line is a `SCHEMA`, `RECORD` or `STATE`
//! message. [`SingerReader`] reads it lazily and in order:
//! - `SCHEMA` compiles the stream's JSON Schema into a per-run [`SchemaRegistry`]
//!   (last declaration wins).
//! - `RECORD` is validated against its stream's current schema, if any, and surfaced as an
//!   [`OutputRecord`].
//! - `STATE` goes to a caller-supplied [`StateHandler`], or is written to `State.json` in the
//!   current directory of the configured [`StateFileSystem`].
//!
//! The first fault (unreadable input, invalid JSON, protocol violation, schema violation,
//! failed state handling) ends the run; records returned before it remain valid.

mod builder;
mod config;
mod driver;
mod error;
mod message;
mod reader;
mod record;
mod registry;
mod state;
mod validate;

pub use builder::SingerReaderBuilder;
pub use config::{IngestConfig, IngestLimits, DEFAULT_STATE_FILE_NAME, DEFAULT_STATE_VARIABLE};
pub use driver::{RunState, SingerReader, SingerRun, Termination};
pub use error::{
    BoxError, ReadFailureKind, SingerError, SingerErrorKind, StateWriteFailureKind,
};
pub use message::{
    decode_line, MessageKind, RecordMessage, SchemaMessage, SingerMessage, StateMessage,
};
pub use reader::{LineTokenizer, RawLine};
pub use record::OutputRecord;
pub use registry::{InvalidSchema, RegisteredSchema, SchemaRegistry};
pub use state::{BoxFuture, LocalFileSystem, StateFileSystem, StateHandler, StateScope};
pub use validate::{validate_record, Validation};

pub use tokio_util::sync::CancellationToken;
