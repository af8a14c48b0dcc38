//! Serialization layer. Defaults to pretty JSON via serde_json.
//!
//! Implement [`Serializer`] if you need a different format (INI, TOML, etc.)
//! and register it for a file extension with
//! [`registry::register`](crate::registry::register).

use crate::error::{Error, Result};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};

/// Knobs passed to [`Serializer::serialize`] on every save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializeOptions {
    /// Spaces per nesting level. `None` renders everything on one line.
    pub indent: Option<usize>,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self { indent: Some(2) }
    }
}

/// Converts a tree snapshot to/from text for persistence.
pub trait Serializer: Send + Sync {
    /// File extension this serializer claims, without the leading dot.
    fn extension(&self) -> &str;

    /// Render a mapping as text.
    fn serialize(&self, data: &Map<String, Value>, options: &SerializeOptions) -> Result<String>;

    /// Parse text back into a mapping.
    fn deserialize(&self, text: &str) -> Result<Map<String, Value>>;
}

/// Deterministic JSON: keys sorted at every level, fixed indent step,
/// `,` and `: ` separators, no trailing newline.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrettyJson;

impl PrettyJson {
    /// Extension claimed by the default serializer.
    pub const EXTENSION: &'static str = "json";
}

impl Serializer for PrettyJson {
    fn extension(&self) -> &str {
        Self::EXTENSION
    }

    fn serialize(&self, data: &Map<String, Value>, options: &SerializeOptions) -> Result<String> {
        let data = sorted_map(data);
        let mut buf = Vec::new();
        match options.indent {
            Some(width) => {
                let indent = vec![b' '; width];
                let formatter = PrettyFormatter::with_indent(&indent);
                let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
                data.serialize(&mut ser)?;
            }
            None => serde_json::to_writer(&mut buf, &data)?,
        }
        String::from_utf8(buf).map_err(|e| Error::Serialize(e.to_string()))
    }

    fn deserialize(&self, text: &str) -> Result<Map<String, Value>> {
        match serde_json::from_str(text)? {
            Value::Object(map) => Ok(map),
            other => Err(Error::Deserialize(format!(
                "top-level value must be an object, found {}",
                kind_of(&other)
            ))),
        }
    }
}

// serde_json keeps insertion order when some crate in the graph turns on
// `preserve_order`, so ordering is enforced here rather than assumed.
fn sorted_map(map: &Map<String, Value>) -> Map<String, Value> {
    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
        .into_iter()
        .map(|(k, v)| (k.clone(), sorted_value(v)))
        .collect()
}

fn sorted_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(sorted_map(map)),
        Value::Array(items) => Value::Array(items.iter().map(sorted_value).collect()),
        leaf => leaf.clone(),
    }
}

pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
