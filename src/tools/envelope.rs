//! Uniform success and error envelopes for tool responses.

use serde_json::{json, Value};

use crate::error::MemoryError;

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// `{ success: true, tool, timestamp, data }`
pub fn success(tool: &str, data: Value) -> String {
    json!({
        "success": true,
        "tool": tool,
        "timestamp": now_ms(),
        "data": data,
    })
    .to_string()
}

/// `{ success: false, error: { code, message, statusCode, timestamp, tool, … } }`
///
/// `retryAfterMs` is present on rate-limit denials; `details` carries the
/// opaque engine code on store errors. With `debug` set, store and internal
/// messages pass through sanitization instead of being replaced wholesale.
pub fn failure(tool: &str, err: &MemoryError, debug: bool) -> String {
    let mut error = json!({
        "code": err.code(),
        "message": err.public_message(debug),
        "statusCode": err.status_code(),
        "timestamp": now_ms(),
        "tool": tool,
    });

    if let MemoryError::RateLimited { retry_after_ms, .. } = err {
        error["retryAfterMs"] = json!(retry_after_ms);
    }
    if let Some(code) = err.engine_code() {
        error["details"] = json!({ "engineCode": code });
    }

    json!({
        "success": false,
        "error": error,
    })
    .to_string()
}
