// /////////////////////////////////////////////////////////////////////////////
// Tagstore
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Tag Values
//!
//! A tag value is the typed value of a given tag on a given object.  Values
//! are a closed set of scalar and set types plus *opaque* byte payloads with
//! a MIME type.
//!
//! ## Storage encoding
//!
//! Values are serialised to JSON at the storage boundary:
//!
//! - null / boolean / integer / float / string map to the corresponding
//!   JSON value
//! - a set of strings maps to a JSON array
//! - an opaque value stores only `{"mime-type": …, "size": …}` in the main
//!   row; the body is content-addressed by SHA-256 and joined through
//!   `opaque_value_link`
//!
//! The same tagged representation drives the index field-suffix scheme, so
//! changing the encoding requires a clean index rebuild.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::error::TagstoreError;

/// An opaque tag value: an arbitrary byte payload with a MIME type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpaqueValue {
    pub mime_type: String,
    pub contents: Vec<u8>,
}

/// The typed value of a tag on an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TagValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    StringSet(Vec<String>),
    Opaque(OpaqueValue),
}

impl TagValue {
    /// A short name for the value's type, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            TagValue::Null => "null",
            TagValue::Boolean(_) => "boolean",
            TagValue::Integer(_) => "integer",
            TagValue::Float(_) => "float",
            TagValue::Text(_) => "string",
            TagValue::StringSet(_) => "set",
            TagValue::Opaque(_) => "opaque",
        }
    }

    /// Checks if this value carries an opaque payload
    pub fn is_opaque(&self) -> bool {
        matches!(self, TagValue::Opaque(_))
    }

    /// Encodes the value to the JSON form stored in the main row.
    ///
    /// Opaque values are reduced to their `{"mime-type", "size"}` metadata;
    /// the body is stored out-of-line by the caller.
    pub fn to_stored_json(&self) -> serde_json::Value {
        match self {
            TagValue::Null => serde_json::Value::Null,
            TagValue::Boolean(value) => json!(value),
            TagValue::Integer(value) => json!(value),
            TagValue::Float(value) => json!(value),
            TagValue::Text(value) => json!(value),
            TagValue::StringSet(values) => json!(values),
            TagValue::Opaque(opaque) => json!({
                "mime-type": opaque.mime_type,
                "size": opaque.contents.len(),
            }),
        }
    }

    /// Decodes a stored JSON value back into a `TagValue`.
    ///
    /// `contents` supplies the out-of-line body for opaque values; passing
    /// `None` for an opaque row is an error because the link join must have
    /// produced one.
    pub fn from_stored_json(
        value: &serde_json::Value,
        contents: Option<Vec<u8>>,
    ) -> Result<Self, TagstoreError> {
        match value {
            serde_json::Value::Null => Ok(TagValue::Null),
            serde_json::Value::Bool(value) => Ok(TagValue::Boolean(*value)),
            serde_json::Value::Number(number) => {
                if let Some(value) = number.as_i64() {
                    Ok(TagValue::Integer(value))
                } else if let Some(value) = number.as_f64() {
                    Ok(TagValue::Float(value))
                } else {
                    Err(TagstoreError::SerializationError(format!(
                        "unrepresentable number: {}",
                        number
                    )))
                }
            }
            serde_json::Value::String(value) => Ok(TagValue::Text(value.clone())),
            serde_json::Value::Array(values) => {
                let mut items = Vec::with_capacity(values.len());
                for item in values {
                    match item.as_str() {
                        Some(text) => items.push(text.to_string()),
                        None => {
                            return Err(TagstoreError::SerializationError(format!(
                                "set values must be strings, got: {}",
                                item
                            )))
                        }
                    }
                }
                Ok(TagValue::StringSet(items))
            }
            serde_json::Value::Object(fields) => {
                let mime_type = fields
                    .get("mime-type")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| {
                        TagstoreError::SerializationError(
                            "opaque value row is missing mime-type".to_string(),
                        )
                    })?;
                let contents = contents.ok_or_else(|| {
                    TagstoreError::SerializationError(
                        "opaque value row has no linked content".to_string(),
                    )
                })?;
                Ok(TagValue::Opaque(OpaqueValue {
                    mime_type: mime_type.to_string(),
                    contents,
                }))
            }
        }
    }
}

/// A tag value as returned by the read APIs: the value itself plus who
/// wrote it and when.
#[derive(Debug, Clone, PartialEq)]
pub struct TagValueEntry {
    pub value: TagValue,
    pub username: String,
    pub creation_time: DateTime<Utc>,
}

impl TagValueEntry {
    /// The virtual `fluiddb/id` value for an object: the object's own UUID,
    /// never read from storage.
    pub fn object_id(object_id: Uuid) -> Self {
        Self {
            value: TagValue::Text(object_id.to_string()),
            username: "fluiddb".to_string(),
            creation_time: Utc::now(),
        }
    }
}
