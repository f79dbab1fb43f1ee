//! Parameter block parsing

use log::debug;
use serde_json::{Map, Value};

use crate::error::EmbedError;

/// Untyped key/value view of a pdf block.
///
/// Values are kept exactly as written; every consumer checks types itself.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawParameterBlock {
    fields: Map<String, Value>,
}

impl RawParameterBlock {
    #[must_use]
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key).filter(|v| !v.is_null())
    }

    /// The raw `url` field, when it is a string.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.get("url").and_then(Value::as_str)
    }
}

/// Parse the text of a pdf block.
///
/// An unquoted `[[link]]` value is not valid JSON, so when the text contains
/// `[[` but never `"[[`, the first `[[` and the first `]]` get a quote added
/// before anything else sees the text. Later unquoted links are left alone.
pub fn parse(raw: &str) -> Result<RawParameterBlock, EmbedError> {
    let text = quote_first_wikilink(raw);

    let value: Value =
        serde_json::from_str(&text).map_err(|e| EmbedError::syntax(e.to_string()))?;

    match value {
        Value::Object(fields) => Ok(RawParameterBlock::new(fields)),
        other => Err(EmbedError::syntax(format!(
            "expected an object with a \"url\" field, found {}",
            json_kind(&other)
        ))),
    }
}

fn quote_first_wikilink(raw: &str) -> String {
    if !raw.contains("[[") || raw.contains("\"[[") {
        return raw.to_string();
    }
    debug!("Quoting unquoted [[link]] value in pdf block");
    raw.replacen("[[", "\"[[", 1).replacen("]]", "]]\"", 1)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
