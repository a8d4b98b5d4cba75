//! Error types for the memory engine.
//!
//! Every failure that can reach a tool caller is a [`MemoryError`]. Each
//! variant maps to a stable error code string and an HTTP-style status code,
//! and produces a sanitized message safe to emit to clients.

use thiserror::Error;

/// Unified error type for all memory operations.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// A request field failed shape, size, range, or cross-field validation.
    #[error("validation failed for '{field}': {message}")]
    Validation { field: String, message: String },

    /// The request arguments were structurally malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A layer name that is neither canonical nor a known alias.
    #[error("invalid layer: '{0}'")]
    InvalidLayer(String),

    /// Content failed its bounds check.
    #[error("invalid content: {0}")]
    InvalidContent(String),

    /// Search query failed its bounds check.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Request denied by the rate limiter.
    #[error("rate limit exceeded for '{operation}'")]
    RateLimited { operation: String, retry_after_ms: u64 },

    /// The storage engine reported an error on a read path.
    #[error("database error: {message}")]
    Database {
        message: String,
        /// Opaque engine-specific code, surfaced in `details`.
        code: Option<i32>,
    },

    /// No usable store handle for a layer.
    #[error("connection error: {0}")]
    Connection(String),

    /// The truth store rejected a mutation.
    #[error("write error: {message}")]
    Write {
        message: String,
        code: Option<i32>,
    },

    /// A startup-time invariant was violated.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Operation name outside the fixed vocabulary.
    #[error("unknown tool: '{0}'")]
    UnknownTool(String),

    /// Anything else.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MemoryError {
    /// Stable error code, drawn from the fixed set exposed to clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::InvalidLayer(_) => "INVALID_LAYER",
            Self::InvalidContent(_) => "INVALID_CONTENT",
            Self::InvalidQuery(_) => "INVALID_QUERY",
            Self::RateLimited { .. } => "RATE_LIMIT_EXCEEDED",
            Self::Database { .. } => "DATABASE_ERROR",
            Self::Connection(_) => "CONNECTION_ERROR",
            Self::Write { .. } => "WRITE_ERROR",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::UnknownTool(_) => "UNKNOWN_TOOL",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP-mirroring status code for the envelope.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation { .. }
            | Self::InvalidInput(_)
            | Self::InvalidLayer(_)
            | Self::InvalidContent(_)
            | Self::InvalidQuery(_)
            | Self::UnknownTool(_) => 400,
            Self::RateLimited { .. } => 429,
            Self::Configuration(_) => 503,
            Self::Database { .. }
            | Self::Connection(_)
            | Self::Write { .. }
            | Self::Internal(_) => 500,
        }
    }

    /// Message safe to show to a client. Store and internal errors collapse
    /// to a generic string unless `debug` is set; everything else passes
    /// through [`sanitize`].
    pub fn public_message(&self, debug: bool) -> String {
        match self {
            Self::Database { .. } if !debug => "a storage error occurred".to_string(),
            Self::Write { .. } if !debug => "the write could not be completed".to_string(),
            Self::Internal(_) if !debug => "an internal error occurred".to_string(),
            other => sanitize(&other.to_string()),
        }
    }

    /// The opaque engine code carried in `details`, if any.
    pub fn engine_code(&self) -> Option<i32> {
        match self {
            Self::Database { code, .. } | Self::Write { code, .. } => *code,
            _ => None,
        }
    }

    /// Classify a rusqlite failure on the read path.
    pub fn database(err: rusqlite::Error) -> Self {
        let code = sqlite_code(&err);
        Self::Database {
            message: err.to_string(),
            code,
        }
    }

    /// Classify a rusqlite failure on the write path.
    pub fn write(err: rusqlite::Error) -> Self {
        let code = sqlite_code(&err);
        Self::Write {
            message: err.to_string(),
            code,
        }
    }
}

fn sqlite_code(err: &rusqlite::Error) -> Option<i32> {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => Some(e.extended_code),
        _ => None,
    }
}

/// Strip path-like and address-like tokens from a user-visible message.
///
/// Tokens containing a path separator are replaced with `<path>`; tokens that
/// parse as dotted-quad addresses become `<addr>`. This is a coarse filter,
/// applied to every message that leaves the process.
pub fn sanitize(message: &str) -> String {
    message
        .split_whitespace()
        .map(|token| {
            let bare = token.trim_matches(|c: char| "\"'(),:;".contains(c));
            if bare.contains('/') || bare.contains('\\') {
                "<path>"
            } else if is_dotted_quad(bare) {
                "<addr>"
            } else {
                token
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_dotted_quad(token: &str) -> bool {
    let parts: Vec<&str> = token.split('.').collect();
    parts.len() == 4 && parts.iter().all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
}
