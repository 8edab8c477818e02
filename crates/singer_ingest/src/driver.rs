use futures_core::Stream;
use serde_json::Value;
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::builder::SingerReaderBuilder;
use crate::error::SingerError;
use crate::message::{decode_line, RecordMessage, SingerMessage};
use crate::reader::{LineTokenizer, RawLine};
use crate::record::OutputRecord;
use crate::registry::SchemaRegistry;
use crate::state::StateRouter;
use crate::validate::validate_record;

/// Where a [`SingerReader`] is in its run. `Completed`, `Failed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RunState {
    /// Built but not yet pulled.
    Idle,
    Reading,
    Completed,
    Failed,
    Cancelled,
}

/// Why a run stopped producing records.
#[derive(Debug)]
pub enum Termination {
    Completed,
    Cancelled,
    Failed(SingerError),
}

/// Everything a run produced, plus how it ended.
#[derive(Debug)]
pub struct SingerRun {
    pub records: Vec<OutputRecord>,
    pub termination: Termination,
}

impl SingerRun {
    pub fn is_completed(&self) -> bool {
        matches!(self.termination, Termination::Completed)
    }

    pub fn error(&self) -> Option<&SingerError> {
        match &self.termination {
            Termination::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Drops the records of a failed run in favour of its error.
    pub fn into_result(self) -> Result<Vec<OutputRecord>, SingerError> {
        match self.termination {
            Termination::Failed(err) => Err(err),
            Termination::Completed | Termination::Cancelled => Ok(self.records),
        }
    }
}

/// Pull-driven reader over Singer tap output.
///
/// Each call to [`SingerReader::next_record`] reads only as many lines as it takes to produce
/// the next validated RECORD. SCHEMA lines update the registry and STATE lines are routed
/// (handler or state file) on the way, strictly in input order. The first fault is returned
/// once; afterwards the reader yields `None`, and records already returned stay valid.
pub struct SingerReader<R: AsyncRead + Unpin> {
    lines: LineTokenizer<R>,
    registry: SchemaRegistry,
    router: StateRouter,
    cancellation: CancellationToken,
    state: RunState,
    records_emitted: usize,
}

impl<R: AsyncRead + Unpin> SingerReader<R> {
    /// Reader with default settings; see [`SingerReaderBuilder`].
    pub fn new(reader: R) -> Self {
        SingerReaderBuilder::new().build(reader)
    }

    pub(crate) fn from_builder(builder: SingerReaderBuilder, reader: R) -> Self {
        let SingerReaderBuilder {
            config,
            handler,
            file_system,
            cancellation,
        } = builder;
        Self {
            lines: LineTokenizer::new(reader, config.limits),
            registry: SchemaRegistry::new(),
            router: StateRouter::new(
                handler,
                file_system,
                config.state_file_name,
                config.state_variable,
                config.variables,
            ),
            cancellation,
            state: RunState::Idle,
            records_emitted: 0,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn records_emitted(&self) -> usize {
        self.records_emitted
    }

    /// Next validated record, the fault that ended the run, or `None` once the run is over.
    pub async fn next_record(&mut self) -> Option<Result<OutputRecord, SingerError>> {
        if self.state == RunState::Idle {
            self.state = RunState::Reading;
        }
        loop {
            if self.state != RunState::Reading {
                return None;
            }
            if self.cancellation.is_cancelled() {
                self.state = RunState::Cancelled;
                debug!(records = self.records_emitted, "Singer ingest cancelled");
                return None;
            }

            let line = match self.lines.next_line().await {
                Some(Ok(line)) => line,
                Some(Err(err)) => return Some(Err(self.fail(err))),
                None => {
                    self.state = RunState::Completed;
                    debug!(
                        records = self.records_emitted,
                        streams = self.registry.len(),
                        "Singer input exhausted"
                    );
                    return None;
                }
            };

            match self.dispatch(line).await {
                Ok(Some(record)) => {
                    self.records_emitted += 1;
                    return Some(Ok(record));
                }
                Ok(None) => continue,
                Err(err) => return Some(Err(self.fail(err))),
            }
        }
    }

    async fn dispatch(&mut self, line: RawLine) -> Result<Option<OutputRecord>, SingerError> {
        let RawLine { line_number, text } = line;
        match decode_line(line_number, &text)? {
            SingerMessage::Schema(schema) => {
                let entry = self
                    .registry
                    .declare(schema)
                    .map_err(|err| SingerError::protocol(line_number, &text, err.to_string()))?;
                debug!(
                    line_number,
                    stream = entry.stream(),
                    key_properties = ?entry.key_properties(),
                    "SCHEMA declared"
                );
                Ok(None)
            }
            SingerMessage::Record(RecordMessage {
                stream,
                record,
                time_extracted,
            }) => {
                let payload = Value::Object(record);
                validate_record(&self.registry, line_number, &stream, &payload)?;
                let Value::Object(fields) = payload else {
                    return Err(SingerError::protocol(
                        line_number,
                        &text,
                        "RECORD payload is not a JSON object",
                    ));
                };
                Ok(Some(OutputRecord::new(
                    stream,
                    line_number,
                    time_extracted,
                    fields,
                )))
            }
            SingerMessage::State(state) => {
                self.router.route(line_number, state.value).await?;
                Ok(None)
            }
        }
    }

    fn fail(&mut self, err: SingerError) -> SingerError {
        self.state = RunState::Failed;
        warn!(
            line_number = err.line_number(),
            kind = ?err.kind(),
            records = self.records_emitted,
            error = %err,
            "Singer ingest stopped"
        );
        err
    }

    /// Reads until the run ends, keeping records produced before any fault.
    pub async fn read_all(mut self) -> SingerRun {
        let mut records = Vec::new();
        while let Some(item) = self.next_record().await {
            match item {
                Ok(record) => records.push(record),
                Err(err) => {
                    return SingerRun {
                        records,
                        termination: Termination::Failed(err),
                    }
                }
            }
        }
        let termination = match self.state {
            RunState::Cancelled => Termination::Cancelled,
            _ => Termination::Completed,
        };
        SingerRun {
            records,
            termination,
        }
    }

    /// Adapts the reader into a [`Stream`] with the same items as [`SingerReader::next_record`].
    pub fn into_stream(self) -> impl Stream<Item = Result<OutputRecord, SingerError>> {
        futures_util::stream::unfold(self, |mut reader| async move {
            reader.next_record().await.map(|item| (item, reader))
        })
    }
}
