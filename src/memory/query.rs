//! Filter DSL compiler — structured filters to parameterized scans.
//!
//! The only path from user input to SQL. Every value travels in a parameter
//! slot; the statement text itself is assembled exclusively from
//! whitelisted column names and fixed fragments. Substring filters escape
//! `%`, `_`, and `\` and match with an explicit ESCAPE character.

use rusqlite::types::Value as SqlValue;
use serde::Deserialize;

use crate::error::MemoryError;

/// Column list shared by every scan; order matches
/// [`crate::memory::types::MemoryRecord::from_row`].
pub const SELECT_COLUMNS: &str = "id, timestamp, content, context, importance, \
     emotional_intensity, effective_importance, last_accessed, metadata, access_count";

/// Columns a caller may order by. Anything else falls back to `timestamp`.
const ORDERABLE_COLUMNS: [&str; 7] = [
    "id",
    "timestamp",
    "content",
    "event",
    "context",
    "emotional_intensity",
    "importance",
];

/// The recognized filter keys. Unknown keys are a validation error, not a
/// silently ignored predicate.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueryFilters {
    pub id: Option<i64>,
    pub importance_min: Option<f64>,
    pub importance_max: Option<f64>,
    pub emotional_intensity_min: Option<f64>,
    pub emotional_intensity_max: Option<f64>,
    pub timestamp_after: Option<f64>,
    pub timestamp_before: Option<f64>,
    pub content_contains: Option<String>,
    pub context_contains: Option<String>,
    pub effective_importance_min: Option<f64>,
    pub effective_importance_max: Option<f64>,
}

/// A compiled, fully parameterized scan.
#[derive(Debug)]
pub struct CompiledQuery {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// Compile a filter map plus ordering into a scan over one layer store.
///
/// Unless `include_decayed` is set, the visibility conjunct
/// `(effective_importance IS NULL OR effective_importance >= threshold)` is
/// AND-joined; the NULL branch keeps unswept rows visible.
pub fn compile_scan(
    filters: &QueryFilters,
    order_by: Option<&str>,
    limit: usize,
    include_decayed: bool,
    visibility_threshold: f64,
) -> Result<CompiledQuery, MemoryError> {
    validate_cross_filters(filters)?;

    let mut clauses: Vec<String> = Vec::new();
    let mut params: Vec<SqlValue> = Vec::new();

    fn push(clause: &str, value: SqlValue, clauses: &mut Vec<String>, params: &mut Vec<SqlValue>) {
        params.push(value);
        clauses.push(clause.replace('?', &format!("?{}", params.len())));
    }

    if let Some(id) = filters.id {
        push("id = ?", SqlValue::from(id), &mut clauses, &mut params);
    }
    if let Some(v) = filters.importance_min {
        push("importance >= ?", SqlValue::from(v), &mut clauses, &mut params);
    }
    if let Some(v) = filters.importance_max {
        push("importance <= ?", SqlValue::from(v), &mut clauses, &mut params);
    }
    if let Some(v) = filters.emotional_intensity_min {
        push("emotional_intensity >= ?", SqlValue::from(v), &mut clauses, &mut params);
    }
    if let Some(v) = filters.emotional_intensity_max {
        push("emotional_intensity <= ?", SqlValue::from(v), &mut clauses, &mut params);
    }
    if let Some(v) = filters.timestamp_after {
        push("timestamp >= ?", SqlValue::from(v), &mut clauses, &mut params);
    }
    if let Some(v) = filters.timestamp_before {
        push("timestamp <= ?", SqlValue::from(v), &mut clauses, &mut params);
    }
    if let Some(fragment) = &filters.content_contains {
        let pattern = like_pattern(fragment);
        params.push(SqlValue::from(pattern.clone()));
        let a = params.len();
        params.push(SqlValue::from(pattern));
        let b = params.len();
        clauses.push(format!(
            "(event LIKE ?{a} ESCAPE '\\' OR content LIKE ?{b} ESCAPE '\\')"
        ));
    }
    if let Some(fragment) = &filters.context_contains {
        push(
            "context LIKE ? ESCAPE '\\'",
            SqlValue::from(like_pattern(fragment)),
            &mut clauses,
            &mut params,
        );
    }
    if let Some(v) = filters.effective_importance_min {
        push("effective_importance >= ?", SqlValue::from(v), &mut clauses, &mut params);
    }
    if let Some(v) = filters.effective_importance_max {
        push("effective_importance <= ?", SqlValue::from(v), &mut clauses, &mut params);
    }

    if !include_decayed {
        params.push(SqlValue::from(visibility_threshold));
        clauses.push(format!(
            "(effective_importance IS NULL OR effective_importance >= ?{})",
            params.len()
        ));
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };

    params.push(SqlValue::from(limit as i64));
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM memories{where_sql} ORDER BY {} LIMIT ?{}",
        parse_order_by(order_by),
        params.len()
    );

    Ok(CompiledQuery { sql, params })
}

/// Compile the recall search: an escaped substring match over `event`,
/// `content`, and `context`, ranked by decayed importance then recency.
pub fn compile_search(
    query: &str,
    limit: usize,
    include_decayed: bool,
    visibility_threshold: f64,
) -> CompiledQuery {
    let pattern = like_pattern(query);
    let mut params: Vec<SqlValue> = vec![
        SqlValue::from(pattern.clone()),
        SqlValue::from(pattern.clone()),
        SqlValue::from(pattern),
    ];
    let mut where_sql = String::from(
        "(event LIKE ?1 ESCAPE '\\' OR content LIKE ?2 ESCAPE '\\' OR context LIKE ?3 ESCAPE '\\')",
    );

    if !include_decayed {
        params.push(SqlValue::from(visibility_threshold));
        where_sql.push_str(&format!(
            " AND (effective_importance IS NULL OR effective_importance >= ?{})",
            params.len()
        ));
    }

    params.push(SqlValue::from(limit as i64));
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM memories WHERE {where_sql} \
         ORDER BY COALESCE(effective_importance, importance) DESC, timestamp DESC LIMIT ?{}",
        params.len()
    );

    CompiledQuery { sql, params }
}

/// Escape LIKE metacharacters and wrap the fragment in `%…%`.
fn like_pattern(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len() + 2);
    for c in fragment.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    format!("%{escaped}%")
}

/// Parse an `order_by` string like `"importance desc"`.
///
/// A bare whitelisted column sorts descending. Unknown columns or
/// directions collapse to `timestamp DESC`.
fn parse_order_by(order_by: Option<&str>) -> String {
    const FALLBACK: &str = "timestamp DESC";

    let Some(raw) = order_by else {
        return FALLBACK.to_string();
    };
    let mut tokens = raw.split_whitespace();
    let Some(column) = tokens.next() else {
        return FALLBACK.to_string();
    };
    let column = column.to_lowercase();
    if !ORDERABLE_COLUMNS.contains(&column.as_str()) {
        return FALLBACK.to_string();
    }
    let direction = match tokens.next().map(str::to_lowercase) {
        None => "DESC",
        Some(d) if d == "asc" || d == "ascending" => "ASC",
        Some(d) if d == "desc" || d == "descending" => "DESC",
        Some(_) => return FALLBACK.to_string(),
    };
    if tokens.next().is_some() {
        return FALLBACK.to_string();
    }
    format!("{column} {direction}")
}

fn validate_cross_filters(filters: &QueryFilters) -> Result<(), MemoryError> {
    let pairs = [
        ("importance", filters.importance_min, filters.importance_max),
        (
            "emotional_intensity",
            filters.emotional_intensity_min,
            filters.emotional_intensity_max,
        ),
        (
            "effective_importance",
            filters.effective_importance_min,
            filters.effective_importance_max,
        ),
        ("timestamp", filters.timestamp_after, filters.timestamp_before),
    ];
    for (field, min, max) in pairs {
        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                return Err(MemoryError::Validation {
                    field: field.to_string(),
                    message: format!("minimum {min} exceeds maximum {max}"),
                });
            }
        }
    }
    Ok(())
}
