//! The message value type and its schemaless record codec

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A schemaless key/value record as stored in the remote collection.
///
/// Wire field names are fixed by the store schema: `text`, `author`,
/// `photoUrl`. Unknown fields are preserved on decode input but ignored.
pub type Record = Map<String, Value>;

/// A single chat message.
///
/// Immutable once constructed: built by the send pipeline at dispatch
/// time, or decoded from a remote append event. Ordering and identity
/// live in the store's server-assigned keys, not on the message itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    pub author: String,
    /// Empty string means "no photo attached".
    #[serde(rename = "photoUrl")]
    pub photo_url: String,
}

impl Message {
    pub fn new(
        text: impl Into<String>,
        author: impl Into<String>,
        photo_url: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            author: author.into(),
            photo_url: photo_url.into(),
        }
    }

    /// Decode from a remote record, substituting `""` for any missing,
    /// null, or non-string field. Never fails: the store is schemaless
    /// and partially-written records must not abort the stream.
    pub fn from_record(record: &Record) -> Self {
        Self {
            text: string_field(record, "text"),
            author: string_field(record, "author"),
            photo_url: string_field(record, "photoUrl"),
        }
    }

    /// Encode to the record shape expected by the store.
    pub fn to_record(&self) -> Record {
        let mut record = Map::new();
        record.insert("text".to_string(), Value::String(self.text.clone()));
        record.insert("author".to_string(), Value::String(self.author.clone()));
        record.insert(
            "photoUrl".to_string(),
            Value::String(self.photo_url.clone()),
        );
        record
    }

    /// True when a photo is attached.
    pub fn has_photo(&self) -> bool {
        !self.photo_url.is_empty()
    }
}

fn string_field(record: &Record, key: &str) -> String {
    match record.get(key) {
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    }
}
