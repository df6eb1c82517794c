//! Serializable argument values carried by mutation events.
//!
//! The set of value types is deliberately closed: the wire codec enumerates
//! it exhaustively, so adding a variant is a compile-time-visible change at
//! both the encoding and decoding end. It is not an open type system.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A single typed argument of a mutation event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArgValue {
    /// UTF-8 text — entity keys and names.
    Text(String),
    /// 64-bit signed integer — authoritative row ids.
    Long(i64),
    /// A serialized entity envelope.
    Record(EntityRecord),
}

impl ArgValue {
    /// Returns the text content, if this is a `Text` value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer content, if this is a `Long` value.
    pub fn as_long(&self) -> Option<i64> {
        match self {
            Self::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the record content, if this is a `Record` value.
    pub fn as_record(&self) -> Option<&EntityRecord> {
        match self {
            Self::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Stable name of the value's type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Long(_) => "long",
            Self::Record(_) => "record",
        }
    }
}

/// The serialized form of one stored entity: its key plus the JSON payload.
///
/// Entities cross the replication boundary only in this envelope; the
/// receiving side decodes the payload back into its typed form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// The entity's key, unique within its store.
    pub key: String,
    /// The entity value, serialized as JSON.
    pub payload: String,
}

impl EntityRecord {
    /// Creates a record from an already-serialized payload.
    pub fn new(key: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            payload: payload.into(),
        }
    }

    /// Serializes a typed entity value into a record.
    pub fn from_value<T: Serialize>(
        key: impl Into<String>,
        value: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            key: key.into(),
            payload: serde_json::to_string(value)?,
        })
    }

    /// Decodes the payload back into a typed entity value.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.payload)
    }
}
