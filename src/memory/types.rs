//! Core memory type definitions.
//!
//! Defines [`Layer`] (the six cognitive layers and their alias table),
//! [`MemoryRecord`] (a full stored row), and [`NewRecord`] (the write-side
//! shape handed to the coordinator).

use serde::{Deserialize, Serialize};

use crate::error::MemoryError;

/// The six cognitive layers. Declaration order is the tie-break order used
/// by the content router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    /// Events, sessions, conversations.
    Episodic,
    /// Facts and knowledge.
    Semantic,
    /// How-to, workflows, processes.
    Procedural,
    /// Insights, reflections, reasoning about reasoning.
    Meta,
    /// Self-model: values, preferences, personality.
    Identity,
    /// Short-lived task state.
    Working,
}

impl Layer {
    /// All layers, in fixed routing order.
    pub const ALL: [Layer; 6] = [
        Layer::Episodic,
        Layer::Semantic,
        Layer::Procedural,
        Layer::Meta,
        Layer::Identity,
        Layer::Working,
    ];

    /// SQL- and filename-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Episodic => "episodic",
            Self::Semantic => "semantic",
            Self::Procedural => "procedural",
            Self::Meta => "meta",
            Self::Identity => "identity",
            Self::Working => "working",
        }
    }

    /// Store filename for this layer, identical under truth and cache roots.
    pub fn file_name(&self) -> String {
        format!("{}_memory.db", self.as_str())
    }

    /// Resolve a user-supplied layer name: case-folded, canonical names and
    /// aliases both accepted.
    pub fn resolve(name: &str) -> Result<Layer, MemoryError> {
        let folded = name.trim().to_lowercase();
        match folded.as_str() {
            "episodic" | "events" | "conversations" => Ok(Self::Episodic),
            "semantic" | "facts" | "knowledge" => Ok(Self::Semantic),
            "procedural" | "skills" | "howto" => Ok(Self::Procedural),
            "meta" | "insights" | "reasoning" => Ok(Self::Meta),
            "identity" | "core" | "self" | "values" => Ok(Self::Identity),
            "working" | "temp" | "scratch" | "wip" => Ok(Self::Working),
            _ => Err(MemoryError::InvalidLayer(name.to_string())),
        }
    }
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Layer {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::resolve(s)
    }
}

/// A stored record, matching the `memories` table schema.
#[derive(Debug, Clone, Serialize)]
pub struct MemoryRecord {
    /// Monotonic rowid, unique within one layer.
    pub id: i64,
    /// Creation time, fractional seconds since epoch.
    pub timestamp: f64,
    pub content: String,
    pub context: String,
    pub importance: f64,
    pub emotional_intensity: f64,
    /// Materialized decay output. `None` on rows the sweeper has not
    /// visited since their columns were added.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_importance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_accessed: Option<f64>,
    pub access_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl MemoryRecord {
    /// Map a full `SELECT *`-ordered row. Column order must match
    /// [`crate::memory::query::SELECT_COLUMNS`].
    pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        let metadata: Option<String> = row.get(8)?;
        Ok(Self {
            id: row.get(0)?,
            timestamp: row.get(1)?,
            content: row.get(2)?,
            context: row.get(3)?,
            importance: row.get(4)?,
            emotional_intensity: row.get(5)?,
            effective_importance: row.get(6)?,
            last_accessed: row.get(7)?,
            access_count: row.get(9)?,
            metadata: metadata.and_then(|m| serde_json::from_str(&m).ok()),
        })
    }

    /// Ranking key for recall: materialized effective importance when
    /// present, raw importance otherwise.
    pub fn rank_importance(&self) -> f64 {
        self.effective_importance.unwrap_or(self.importance)
    }
}

/// Write-side record shape handed to the coordinator.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub timestamp: f64,
    pub content: String,
    pub context: String,
    pub importance: f64,
    pub emotional_intensity: f64,
    /// Pre-serialized metadata envelope, if non-empty.
    pub metadata_json: Option<String>,
    pub last_accessed: f64,
    pub effective_importance: f64,
}
