use serde_json::{Map, Value};

pub const DEFAULT_STATE_FILE_NAME: &str = "State.json";
pub const DEFAULT_STATE_VARIABLE: &str = "item";

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct IngestLimits {
    pub max_line_bytes: usize,
}

impl Default for IngestLimits {
    fn default() -> Self {
        Self {
            max_line_bytes: 64 * 1024,
        }
    }
}

/// Settings for one ingest run that are independent of the input and collaborators.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestConfig {
    pub limits: IngestLimits,
    /// File name the default state sink writes under the file system's current directory.
    pub state_file_name: String,
    /// Variable name a handler sees the checkpoint value bound to.
    pub state_variable: String,
    /// Parent scope visible to state handlers underneath the checkpoint binding.
    pub variables: Map<String, Value>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            limits: IngestLimits::default(),
            state_file_name: DEFAULT_STATE_FILE_NAME.to_string(),
            state_variable: DEFAULT_STATE_VARIABLE.to_string(),
            variables: Map::new(),
        }
    }
}
