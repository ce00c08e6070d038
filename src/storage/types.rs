use anyhow::Context;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::trend::{SearchVolume, Trend};
use crate::util::clean_text;

// ============================================================================
// Error Types
// ============================================================================

/// Errors opening the database, with user-facing messages.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another process holds a lock on the database file
    #[error("The radar database is locked by another process. Please close it and try again.")]
    InstanceLocked,

    #[error("Database migration failed: {0}")]
    Migration(String),

    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    fn is_lock_message(message: &str) -> bool {
        let message = message.to_lowercase();
        message.contains("database is locked")
            || message.contains("database table is locked")
            || message.contains("sqlite_busy")
            || message.contains("sqlite_locked")
    }

    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if Self::is_lock_message(&err.to_string()) {
            return DatabaseError::InstanceLocked;
        }
        DatabaseError::Other(err)
    }

    pub(crate) fn from_migration(err: anyhow::Error) -> Self {
        if Self::is_lock_message(&err.to_string()) {
            return DatabaseError::InstanceLocked;
        }
        DatabaseError::Migration(format!("{err:#}"))
    }
}

// ============================================================================
// Data Structures
// ============================================================================

/// A content category from the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub name: String,
    pub slug: String,
    pub description: String,
    /// Presentation color token (e.g. `bg-red-500`)
    pub color: String,
    pub icon: String,
    /// Numeric category id understood by the trends provider
    pub provider_id: i64,
}

/// What a bookmark points at.
///
/// Text form: a stored trend id is written as plain digits (`"12"`), a
/// previewed trend's client key with a `key:` prefix (`"key:2026"`). Any
/// other text parses as a client key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum TrendRef {
    /// Id of a row in `trends`
    #[serde(rename = "trendId")]
    Stored(i64),
    /// Client key of a trend that only existed in view state
    #[serde(rename = "clientKey")]
    Preview(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrendRefError {
    #[error("Trend reference cannot be empty")]
    Empty,
    #[error("Trend id out of range: {0}")]
    IdOutOfRange(String),
}

impl TrendRef {
    const KEY_PREFIX: &'static str = "key:";

    /// Reference to a previewed trend; blank keys are rejected.
    pub fn preview(key: &str) -> Result<Self, TrendRefError> {
        clean_text(key)
            .map(TrendRef::Preview)
            .ok_or(TrendRefError::Empty)
    }

    pub fn stored_id(&self) -> Option<i64> {
        match self {
            TrendRef::Stored(id) => Some(*id),
            TrendRef::Preview(_) => None,
        }
    }

    pub fn client_key(&self) -> Option<&str> {
        match self {
            TrendRef::Stored(_) => None,
            TrendRef::Preview(key) => Some(key),
        }
    }
}

impl FromStr for TrendRef {
    type Err = TrendRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(key) = s.strip_prefix(Self::KEY_PREFIX) {
            return Self::preview(key);
        }
        if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
            return s
                .parse()
                .map(TrendRef::Stored)
                .map_err(|_| TrendRefError::IdOutOfRange(s.to_string()));
        }
        Self::preview(s)
    }
}

impl fmt::Display for TrendRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendRef::Stored(id) => write!(f, "{id}"),
            TrendRef::Preview(key) => write!(f, "{}{key}", Self::KEY_PREFIX),
        }
    }
}

/// A user's bookmark of a trend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedTrend {
    pub id: i64,
    pub user_id: String,
    pub trend_ref: TrendRef,
    /// Milliseconds since the Unix epoch
    pub saved_at: i64,
    pub notes: Option<String>,
}

/// Result of a bookmark insert under the configured duplicate policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookmarkInsert {
    Inserted(i64),
    /// Refused: the user already bookmarked this trend.
    Duplicate,
}

// ============================================================================
// Helper Types
// ============================================================================

/// Raw `trends` row; keywords are stored as a JSON array.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct TrendRow {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category: String,
    pub keywords: String,
    pub relevance_score: i64,
    pub search_volume: String,
    pub created_at: i64,
    pub source: String,
}

impl TrendRow {
    pub(crate) fn into_trend(self) -> anyhow::Result<Trend> {
        let keywords: Vec<String> = serde_json::from_str(&self.keywords)
            .with_context(|| format!("Corrupt keywords column for trend {}", self.id))?;
        let relevance_score = u8::try_from(self.relevance_score)
            .with_context(|| format!("Relevance score out of range for trend {}", self.id))?;

        Ok(Trend {
            id: self.id,
            title: self.title,
            description: self.description,
            category: self.category,
            keywords,
            relevance_score,
            search_volume: SearchVolume::from_stored(self.search_volume),
            created_at: self.created_at,
            source: self.source,
        })
    }
}

/// Raw `saved_trends` row; exactly one of `trend_id` and `client_key` is set.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct BookmarkRow {
    pub id: i64,
    pub user_id: String,
    pub trend_id: Option<i64>,
    pub client_key: Option<String>,
    pub saved_at: i64,
    pub notes: Option<String>,
}

impl BookmarkRow {
    pub(crate) fn into_saved(self) -> anyhow::Result<SavedTrend> {
        let trend_ref = match (self.trend_id, self.client_key) {
            (Some(id), None) => TrendRef::Stored(id),
            (None, Some(key)) => TrendRef::Preview(key),
            _ => anyhow::bail!("Bookmark {} has an invalid trend reference", self.id),
        };

        Ok(SavedTrend {
            id: self.id,
            user_id: self.user_id,
            trend_ref,
            saved_at: self.saved_at,
            notes: self.notes,
        })
    }
}
