//! Input validation — shape, size, and range bounds for every external input.
//!
//! All bounds sit well below any hard storage limit; a request that fails
//! here never reaches a store handle. Unknown metadata keys are relocated
//! under a `custom` sub-map rather than rejected, keeping the envelope
//! forward-compatible.

use serde_json::{Map, Value};

use crate::error::MemoryError;

pub const MAX_CONTENT_LEN: usize = 100_000;
pub const MAX_QUERY_LEN: usize = 1_000;
pub const MAX_CONTEXT_LEN: usize = 10_000;
pub const MAX_METADATA_STRING_LEN: usize = 5_000;
pub const MAX_METADATA_BYTES: usize = 50_000;
pub const MAX_TAGS: usize = 50;
pub const MAX_TAG_LEN: usize = 100;
pub const MAX_RELATED_IDS: usize = 100;
pub const MAX_LIMIT: usize = 1_000;
pub const DEFAULT_LIMIT: usize = 10;
/// 2100-01-01T00:00:00Z.
pub const MAX_TIMESTAMP: f64 = 4_102_444_800.0;

/// Default author-provided weight when metadata carries none.
pub const DEFAULT_IMPORTANCE: f64 = 0.7;

/// The recognized metadata keys, validated and promoted to columns or kept
/// in the stored envelope. Everything else moves under `custom`.
const RECOGNIZED_KEYS: [&str; 7] = [
    "context",
    "importance",
    "emotional_intensity",
    "tags",
    "related_ids",
    "timestamp",
    "source",
];

/// Validated, normalized metadata for a save operation.
#[derive(Debug, Clone, Default)]
pub struct MetadataEnvelope {
    pub context: String,
    pub importance: Option<f64>,
    pub emotional_intensity: Option<f64>,
    pub timestamp: Option<f64>,
    pub tags: Vec<String>,
    pub related_ids: Vec<i64>,
    pub source: Option<String>,
    pub custom: Map<String, Value>,
}

impl MetadataEnvelope {
    /// Serialize the stored portion of the envelope (everything that is not
    /// promoted to a column). Returns `None` when there is nothing to store.
    pub fn to_stored_json(&self) -> Result<Option<String>, MemoryError> {
        let mut map = Map::new();
        if !self.tags.is_empty() {
            map.insert("tags".into(), Value::from(self.tags.clone()));
        }
        if !self.related_ids.is_empty() {
            map.insert("related_ids".into(), Value::from(self.related_ids.clone()));
        }
        if let Some(source) = &self.source {
            map.insert("source".into(), Value::from(source.clone()));
        }
        if !self.custom.is_empty() {
            map.insert("custom".into(), Value::Object(self.custom.clone()));
        }
        if map.is_empty() {
            return Ok(None);
        }
        let serialized = serde_json::to_string(&Value::Object(map))
            .map_err(|e| MemoryError::Internal(format!("metadata serialization: {e}")))?;
        if serialized.len() > MAX_METADATA_BYTES {
            return Err(validation(
                "metadata",
                format!("serialized metadata exceeds {MAX_METADATA_BYTES} bytes"),
            ));
        }
        Ok(Some(serialized))
    }
}

fn validation(field: &str, message: impl Into<String>) -> MemoryError {
    MemoryError::Validation {
        field: field.to_string(),
        message: message.into(),
    }
}

/// Trim and bound the content of a save operation.
pub fn validate_content(content: &str) -> Result<String, MemoryError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(MemoryError::InvalidContent("content must not be empty".into()));
    }
    let len = trimmed.chars().count();
    if len > MAX_CONTENT_LEN {
        return Err(MemoryError::InvalidContent(format!(
            "content is {len} characters; the maximum is {MAX_CONTENT_LEN}"
        )));
    }
    Ok(trimmed.to_string())
}

/// Bound the search query of a recall operation.
pub fn validate_query(query: &str) -> Result<String, MemoryError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(MemoryError::InvalidQuery("query must not be empty".into()));
    }
    let len = trimmed.chars().count();
    if len > MAX_QUERY_LEN {
        return Err(MemoryError::InvalidQuery(format!(
            "query is {len} characters; the maximum is {MAX_QUERY_LEN}"
        )));
    }
    Ok(trimmed.to_string())
}

/// Bound an optional limit, applying the default.
pub fn validate_limit(limit: Option<i64>) -> Result<usize, MemoryError> {
    match limit {
        None => Ok(DEFAULT_LIMIT),
        Some(n) if (1..=MAX_LIMIT as i64).contains(&n) => Ok(n as usize),
        Some(n) => Err(validation(
            "limit",
            format!("limit {n} is outside [1, {MAX_LIMIT}]"),
        )),
    }
}

fn validate_unit_interval(field: &str, value: f64) -> Result<f64, MemoryError> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(validation(field, format!("{value} is outside [0, 1]")));
    }
    Ok(value)
}

fn validate_timestamp(value: f64) -> Result<f64, MemoryError> {
    if !value.is_finite() || !(0.0..=MAX_TIMESTAMP).contains(&value) {
        return Err(validation(
            "timestamp",
            format!("{value} is outside [0, {MAX_TIMESTAMP}]"),
        ));
    }
    Ok(value)
}

fn expect_string(field: &str, value: &Value, max_len: usize) -> Result<String, MemoryError> {
    let s = value
        .as_str()
        .ok_or_else(|| validation(field, "expected a string"))?;
    if s.chars().count() > max_len {
        return Err(validation(field, format!("exceeds {max_len} characters")));
    }
    Ok(s.to_string())
}

/// Validate and normalize a raw metadata map.
///
/// Recognized keys are checked against the bounds table; unknown keys are
/// relocated under `custom` (string values there still bounded).
pub fn normalize_metadata(raw: Option<&Value>) -> Result<MetadataEnvelope, MemoryError> {
    let mut envelope = MetadataEnvelope::default();
    let Some(raw) = raw else {
        return Ok(envelope);
    };
    let map = raw
        .as_object()
        .ok_or_else(|| MemoryError::InvalidInput("metadata must be an object".into()))?;

    for (key, value) in map {
        match key.as_str() {
            "context" => {
                envelope.context = expect_string("metadata.context", value, MAX_CONTEXT_LEN)?;
            }
            "importance" => {
                let v = value
                    .as_f64()
                    .ok_or_else(|| validation("metadata.importance", "expected a number"))?;
                envelope.importance = Some(validate_unit_interval("metadata.importance", v)?);
            }
            "emotional_intensity" => {
                let v = value.as_f64().ok_or_else(|| {
                    validation("metadata.emotional_intensity", "expected a number")
                })?;
                envelope.emotional_intensity =
                    Some(validate_unit_interval("metadata.emotional_intensity", v)?);
            }
            "timestamp" => {
                let v = value
                    .as_f64()
                    .ok_or_else(|| validation("metadata.timestamp", "expected a number"))?;
                envelope.timestamp = Some(validate_timestamp(v)?);
            }
            "tags" => {
                let tags = value
                    .as_array()
                    .ok_or_else(|| validation("metadata.tags", "expected an array"))?;
                if tags.len() > MAX_TAGS {
                    return Err(validation(
                        "metadata.tags",
                        format!("{} tags; the maximum is {MAX_TAGS}", tags.len()),
                    ));
                }
                for tag in tags {
                    envelope
                        .tags
                        .push(expect_string("metadata.tags", tag, MAX_TAG_LEN)?);
                }
            }
            "related_ids" => {
                let ids = value
                    .as_array()
                    .ok_or_else(|| validation("metadata.related_ids", "expected an array"))?;
                if ids.len() > MAX_RELATED_IDS {
                    return Err(validation(
                        "metadata.related_ids",
                        format!("{} ids; the maximum is {MAX_RELATED_IDS}", ids.len()),
                    ));
                }
                for id in ids {
                    let id = id
                        .as_i64()
                        .ok_or_else(|| validation("metadata.related_ids", "expected integers"))?;
                    envelope.related_ids.push(id);
                }
            }
            "source" => {
                envelope.source =
                    Some(expect_string("metadata.source", value, MAX_METADATA_STRING_LEN)?);
            }
            _ => {
                if let Some(s) = value.as_str() {
                    if s.chars().count() > MAX_METADATA_STRING_LEN {
                        return Err(validation(
                            &format!("metadata.{key}"),
                            format!("exceeds {MAX_METADATA_STRING_LEN} characters"),
                        ));
                    }
                }
                envelope.custom.insert(key.clone(), value.clone());
            }
        }
    }

    debug_assert!(RECOGNIZED_KEYS
        .iter()
        .all(|k| !envelope.custom.contains_key(*k)));

    Ok(envelope)
}
