use std::fmt;

use serde::de::{self, DeserializeOwned, Deserializer, IgnoredAny, MapAccess, Visitor};
use serde::Deserialize;
use serde_json::{Map, Value};
use time::format_description::well_known::{Iso8601, Rfc3339};
use time::{OffsetDateTime, PrimitiveDateTime};

use crate::error::SingerError;

/// One decoded line of Singer tap output.
#[derive(Debug, Clone, PartialEq)]
pub enum SingerMessage {
    Schema(SchemaMessage),
    Record(RecordMessage),
    State(StateMessage),
}

impl SingerMessage {
    pub fn kind(&self) -> MessageKind {
        match self {
            SingerMessage::Schema(_) => MessageKind::Schema,
            SingerMessage::Record(_) => MessageKind::Record,
            SingerMessage::State(_) => MessageKind::State,
        }
    }

    /// Stream name for SCHEMA and RECORD messages; STATE is not tied to a stream.
    pub fn stream(&self) -> Option<&str> {
        match self {
            SingerMessage::Schema(schema) => Some(&schema.stream),
            SingerMessage::Record(record) => Some(&record.stream),
            SingerMessage::State(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SchemaMessage {
    pub stream: String,
    pub schema: Map<String, Value>,
    #[serde(default)]
    pub key_properties: Vec<String>,
    #[serde(default)]
    pub bookmark_properties: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RecordMessage {
    pub stream: String,
    pub record: Map<String, Value>,
    /// ISO-8601; a timestamp written without an offset is taken as UTC.
    #[serde(default, deserialize_with = "deserialize_time_extracted")]
    pub time_extracted: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StateMessage {
    pub value: Value,
}

fn deserialize_time_extracted<'de, D>(
    deserializer: D,
) -> Result<Option<OffsetDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    parse_timestamp(&raw)
        .map(Some)
        .ok_or_else(|| de::Error::custom(format!("invalid time_extracted `{raw}`")))
}

fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(raw, &Rfc3339)
        .or_else(|_| OffsetDateTime::parse(raw, &Iso8601::DEFAULT))
        .ok()
        .or_else(|| {
            PrimitiveDateTime::parse(raw, &Iso8601::DEFAULT)
                .ok()
                .map(PrimitiveDateTime::assume_utc)
        })
}

/// First key/value pair of a JSON object in wire order. Later duplicates of that key are
/// skipped rather than overwriting it.
struct LeadingEntry(Option<(String, Value)>);

impl<'de> Deserialize<'de> for LeadingEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct LeadingEntryVisitor;

        impl<'de> Visitor<'de> for LeadingEntryVisitor {
            type Value = LeadingEntry;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<LeadingEntry, A::Error> {
                let first = map.next_entry::<String, serde_json::Value>()?;
                while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
                Ok(LeadingEntry(first))
            }
        }

        deserializer.deserialize_map(LeadingEntryVisitor)
    }
}

/// Value of the `type` discriminant.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum MessageKind {
    Schema,
    Record,
    State,
}

impl MessageKind {
    /// Case-insensitive lookup of a discriminant value.
    pub fn from_discriminant(raw: &str) -> Option<Self> {
        [MessageKind::Schema, MessageKind::Record, MessageKind::State]
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(raw))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::Schema => "SCHEMA",
            MessageKind::Record => "RECORD",
            MessageKind::State => "STATE",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decodes a single non-blank line into a [`SingerMessage`].
///
/// The `type` property must be the first key of the top-level object; its value picks the
/// message shape before the rest of the object is decoded. Invalid JSON is a
/// [`SingerError::Parse`]; everything else that is wrong with the line is a
/// [`SingerError::Protocol`].
pub fn decode_line(line_number: usize, line: &str) -> Result<SingerMessage, SingerError> {
    let value: Value = serde_json::from_str(line).map_err(|source| SingerError::Parse {
        line_number,
        line: line.to_string(),
        source,
    })?;

    let Value::Object(object) = value else {
        return Err(SingerError::protocol(
            line_number,
            line,
            "message is not a JSON object",
        ));
    };

    let LeadingEntry(leading) = serde_json::from_str(line).map_err(|err| {
        SingerError::protocol(line_number, line, format!("unreadable message object: {err}"))
    })?;
    let kind = match &leading {
        Some((key, discriminant)) if key.eq_ignore_ascii_case("type") => {
            let Some(raw) = discriminant.as_str() else {
                return Err(SingerError::protocol(
                    line_number,
                    line,
                    "type discriminant must be a string",
                ));
            };
            MessageKind::from_discriminant(raw).ok_or_else(|| {
                SingerError::protocol(line_number, line, format!("unknown message type `{raw}`"))
            })?
        }
        _ => {
            return Err(SingerError::protocol(
                line_number,
                line,
                "missing or misplaced type discriminant",
            ))
        }
    };

    let object = Value::Object(object);
    let message = match kind {
        MessageKind::Schema => SingerMessage::Schema(decode_shape(kind, object, line_number, line)?),
        MessageKind::Record => SingerMessage::Record(decode_shape(kind, object, line_number, line)?),
        MessageKind::State => SingerMessage::State(decode_shape(kind, object, line_number, line)?),
    };
    Ok(message)
}

fn decode_shape<T: DeserializeOwned>(
    kind: MessageKind,
    object: Value,
    line_number: usize,
    line: &str,
) -> Result<T, SingerError> {
    serde_json::from_value(object).map_err(|err| {
        SingerError::protocol(line_number, line, format!("invalid {kind} message: {err}"))
    })
}
