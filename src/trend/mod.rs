//! Trend data model, scoring and normalization.
//!
//! - [`normalizer`] turns raw provider items into [`NewTrend`] records
//! - [`scoring`] holds the [`Scorer`] interface the normalizer draws
//!   relevance scores and fallback search volumes from
//!
//! [`Trend`] is the persisted form, read back from the store with its id and
//! server-assigned `created_at`.

mod normalizer;
mod scoring;

pub use normalizer::{describe, NormalizeError, Normalizer, DEFAULT_WINDOW_LABEL};
pub use scoring::{RandomScorer, Scorer, MAX_SEARCH_VOLUME};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Highest relevance score a trend can carry.
pub const MAX_RELEVANCE: u8 = 99;

/// Keywords kept per trend; the rest are dropped.
pub const MAX_KEYWORDS: usize = 4;

/// Search magnitude as reported by the provider (`"1200"`, `"50K+"`) or as a
/// plain count when generated locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SearchVolume {
    Count(u64),
    Label(String),
}

impl SearchVolume {
    /// Rebuild a value from its stored text form. Pure digits read back as
    /// `Count`, anything else as `Label`.
    pub(crate) fn from_stored(text: String) -> Self {
        match text.parse::<u64>() {
            Ok(n) => SearchVolume::Count(n),
            Err(_) => SearchVolume::Label(text),
        }
    }
}

impl fmt::Display for SearchVolume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchVolume::Count(n) => write!(f, "{n}"),
            SearchVolume::Label(s) => f.write_str(s),
        }
    }
}

/// Display band of a relevance score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelevanceTier {
    High,
    Medium,
    Low,
}

impl RelevanceTier {
    pub fn for_score(score: u8) -> Self {
        match score {
            90.. => RelevanceTier::High,
            80..=89 => RelevanceTier::Medium,
            _ => RelevanceTier::Low,
        }
    }
}

/// A normalized trend that has not been persisted yet.
///
/// This is what a preview fetch hands back for immediate display, and what
/// the store receives on insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTrend {
    pub title: String,
    pub description: String,
    pub category: String,
    pub keywords: Vec<String>,
    pub relevance_score: u8,
    pub search_volume: SearchVolume,
    pub source: String,
}

impl NewTrend {
    /// Identifier used for a trend that only exists in view state.
    pub fn client_key(&self) -> &str {
        &self.title
    }

    pub fn tier(&self) -> RelevanceTier {
        RelevanceTier::for_score(self.relevance_score)
    }
}

/// A trend row from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Trend {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category: String,
    pub keywords: Vec<String>,
    pub relevance_score: u8,
    pub search_volume: SearchVolume,
    /// Milliseconds since the Unix epoch, set once at insert.
    pub created_at: i64,
    pub source: String,
}

impl Trend {
    pub fn tier(&self) -> RelevanceTier {
        RelevanceTier::for_score(self.relevance_score)
    }
}

/// Stand-in shown while a category has no recent data yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub category: String,
    pub title: String,
    pub description: String,
}

impl Placeholder {
    pub fn searching(category: &str) -> Self {
        Self {
            category: category.to_string(),
            title: "🔄 Buscando tendências em tempo real...".to_string(),
            description: "Aguarde enquanto coletamos os dados mais recentes para você."
                .to_string(),
        }
    }
}

/// Outcome of a "recent trends by category" read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecentTrends {
    /// Nothing was stored for the category within the window.
    Placeholder(Placeholder),
    /// Rows exist within the window but none reach the minimum score.
    Empty,
    /// Qualifying rows, most recent first.
    Rows(Vec<Trend>),
}

impl RecentTrends {
    /// Real rows only; empty for the placeholder and empty variants.
    pub fn rows(&self) -> &[Trend] {
        match self {
            RecentTrends::Rows(rows) => rows,
            RecentTrends::Placeholder(_) | RecentTrends::Empty => &[],
        }
    }
}
