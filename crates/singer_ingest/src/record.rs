use serde_json::{Map, Value};
use time::OffsetDateTime;

/// A validated RECORD payload, in the field order it had on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRecord {
    stream: String,
    line_number: usize,
    time_extracted: Option<OffsetDateTime>,
    fields: Map<String, Value>,
}

impl OutputRecord {
    pub(crate) fn new(
        stream: String,
        line_number: usize,
        time_extracted: Option<OffsetDateTime>,
        fields: Map<String, Value>,
    ) -> Self {
        Self {
            stream,
            line_number,
            time_extracted,
            fields,
        }
    }

    pub fn stream(&self) -> &str {
        &self.stream
    }

    /// 1-based input line the RECORD came from.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    pub fn time_extracted(&self) -> Option<OffsetDateTime> {
        self.time_extracted
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}

impl From<OutputRecord> for Value {
    fn from(record: OutputRecord) -> Self {
        Value::Object(record.fields)
    }
}
