use serde::de::{Error as _, IgnoredAny};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Origin-specific payload stored alongside a repo.
///
/// The store never interprets it. Raw bytes and text are checked to be JSON
/// and kept verbatim; structured values are encoded with indentation.
#[derive(Debug, Clone, PartialEq)]
pub enum Metadata {
    Raw(Vec<u8>),
    Text(String),
    Value(Value),
}

impl Default for Metadata {
    fn default() -> Self {
        Metadata::Value(Value::Null)
    }
}

impl Metadata {
    /// Wrap any serializable value
    pub fn from_serializable<T: Serialize>(value: &T) -> serde_json::Result<Self> {
        Ok(Metadata::Value(serde_json::to_value(value)?))
    }

    /// Canonical encoded form, as written to the `metadata` column
    pub fn encode(&self) -> serde_json::Result<String> {
        match self {
            Metadata::Raw(bytes) => {
                let text = std::str::from_utf8(bytes).map_err(serde_json::Error::custom)?;
                validate(text)?;
                Ok(text.to_owned())
            }
            Metadata::Text(text) => {
                validate(text)?;
                Ok(text.clone())
            }
            Metadata::Value(value) => serde_json::to_string_pretty(value),
        }
    }

    /// Parse the payload into a JSON value
    pub fn to_value(&self) -> serde_json::Result<Value> {
        match self {
            Metadata::Raw(bytes) => serde_json::from_slice(bytes),
            Metadata::Text(text) => serde_json::from_str(text),
            Metadata::Value(value) => Ok(value.clone()),
        }
    }
}

fn validate(text: &str) -> serde_json::Result<()> {
    serde_json::from_str::<IgnoredAny>(text).map(|_| ())
}

impl Serialize for Metadata {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Metadata {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Metadata::Value)
    }
}
