use serde_json::{Map, Value};
use std::fmt;

/// A single scalar value extracted from a catalog document.
///
/// SOLR documents carry strings, integers, floats and booleans; anything else
/// (arrays, nested objects, null) is not a valid value for the snapshot
/// schema and is treated as malformed.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl FieldValue {
    /// Convert a decoded JSON value into a scalar, or `None` if it is not one.
    pub fn from_json(value: &Value) -> Option<FieldValue> {
        match value {
            Value::String(s) => Some(FieldValue::Str(s.clone())),
            Value::Bool(b) => Some(FieldValue::Bool(*b)),
            Value::Number(n) => n
                .as_i64()
                .map(FieldValue::Int)
                .or_else(|| n.as_f64().map(FieldValue::Float)),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Str(s) => f.write_str(s),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::Float(x) => write!(f, "{}", x),
            // Snapshot format spells booleans with a capital letter.
            FieldValue::Bool(true) => f.write_str("True"),
            FieldValue::Bool(false) => f.write_str("False"),
        }
    }
}

/// One dataset-version catalog entry, holding the extracted field values in
/// the same order as the query's field list. Never mutated after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRecord {
    values: Vec<FieldValue>,
}

/// A decoded document was missing a required field, or carried a non-scalar
/// value for it. The record is skipped and counted, never written.
#[derive(Debug, thiserror::Error)]
#[error("document is missing or has a non-scalar value for required field {field:?}")]
pub struct MalformedDocumentError {
    pub field: String,
}

impl DocumentRecord {
    /// Extract the requested fields, in order, from a decoded SOLR document.
    pub fn from_doc(
        doc: &Map<String, Value>,
        fields: &[String],
    ) -> Result<DocumentRecord, MalformedDocumentError> {
        let mut values = Vec::with_capacity(fields.len());
        for field in fields {
            let value = doc
                .get(field)
                .and_then(FieldValue::from_json)
                .ok_or_else(|| MalformedDocumentError {
                    field: field.clone(),
                })?;
            values.push(value);
        }
        Ok(DocumentRecord { values })
    }

    /// Field values in the fixed dump order.
    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }
}
