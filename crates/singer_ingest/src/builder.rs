use std::sync::Arc;

use serde_json::Value;
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;

use crate::config::IngestConfig;
use crate::driver::SingerReader;
use crate::state::{LocalFileSystem, StateFileSystem, StateHandler};

/// Configures a [`SingerReader`].
///
/// Defaults: 64 KiB line limit, no state handler, STATE written to `State.json` in the process
/// working directory through [`LocalFileSystem`], and a cancellation token nobody else holds.
pub struct SingerReaderBuilder {
    pub(crate) config: IngestConfig,
    pub(crate) handler: Option<Box<dyn StateHandler>>,
    pub(crate) file_system: Option<Arc<dyn StateFileSystem>>,
    pub(crate) cancellation: CancellationToken,
}

impl Default for SingerReaderBuilder {
    fn default() -> Self {
        Self {
            config: IngestConfig::default(),
            handler: None,
            file_system: Some(Arc::new(LocalFileSystem::new())),
            cancellation: CancellationToken::new(),
        }
    }
}

impl SingerReaderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: IngestConfig) -> Self {
        self.config = config;
        self
    }

    pub fn max_line_bytes(mut self, max_line_bytes: usize) -> Self {
        self.config.limits.max_line_bytes = max_line_bytes;
        self
    }

    /// Routes every STATE message to `handler` instead of the state file.
    pub fn state_handler(mut self, handler: impl StateHandler + 'static) -> Self {
        self.handler = Some(Box::new(handler));
        self
    }

    pub fn file_system(mut self, file_system: impl StateFileSystem + 'static) -> Self {
        self.file_system = Some(Arc::new(file_system));
        self
    }

    pub fn shared_file_system(mut self, file_system: Arc<dyn StateFileSystem>) -> Self {
        self.file_system = Some(file_system);
        self
    }

    /// Removes the file system capability. Without a handler, any STATE then fails the run.
    pub fn without_file_system(mut self) -> Self {
        self.file_system = None;
        self
    }

    pub fn state_file_name(mut self, name: impl Into<String>) -> Self {
        self.config.state_file_name = name.into();
        self
    }

    pub fn state_variable(mut self, name: impl Into<String>) -> Self {
        self.config.state_variable = name.into();
        self
    }

    /// Adds a variable to the parent scope handlers see beneath the checkpoint binding.
    pub fn variable(mut self, name: impl Into<String>, value: Value) -> Self {
        self.config.variables.insert(name.into(), value);
        self
    }

    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn build<R: AsyncRead + Unpin>(self, reader: R) -> SingerReader<R> {
        SingerReader::from_builder(self, reader)
    }
}
