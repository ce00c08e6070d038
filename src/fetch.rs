//! Fetch orchestration: provider call, normalization, optional persistence.
//!
//! Two distinct operations:
//! - [`preview_trends`] returns normalized trends for immediate display and
//!   writes nothing
//! - [`refresh_category`] does the same fetch and then inserts the batch into
//!   the store in one transaction; every row of the batch shares one
//!   store-assigned `created_at`
//!
//! A failure anywhere in the pipeline is reported as a single [`FetchError`];
//! there are no retries and no partial results.

use thiserror::Error;

use crate::provider::{ProviderClient, ProviderError, RequestError};
use crate::storage::{find_category, Category, Database};
use crate::trend::{NewTrend, NormalizeError, Normalizer};

/// Errors that can occur while fetching trends for a category.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The slug is not in the category registry
    #[error("Unknown category: {0}")]
    UnknownCategory(String),
    /// No usable provider endpoint is configured
    #[error(transparent)]
    NotConfigured(#[from] ProviderError),
    /// The provider call failed or returned an unusable body
    #[error(transparent)]
    Request(#[from] RequestError),
    /// An item could not be normalized (missing title)
    #[error("Malformed response: {0}")]
    Normalize(#[from] NormalizeError),
    /// Storing the normalized batch failed
    #[error("Database error: {0}")]
    Database(String),
}

/// Broad class of a fetch failure, for user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    UnknownCategory,
    ProviderUnavailable,
    MalformedResponse,
    Storage,
}

impl FetchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::UnknownCategory(_) => FailureKind::UnknownCategory,
            FetchError::NotConfigured(_) => FailureKind::ProviderUnavailable,
            FetchError::Request(e) if e.is_unavailable() => FailureKind::ProviderUnavailable,
            FetchError::Request(_) | FetchError::Normalize(_) => FailureKind::MalformedResponse,
            FetchError::Database(_) => FailureKind::Storage,
        }
    }

    pub fn is_provider_unavailable(&self) -> bool {
        self.kind() == FailureKind::ProviderUnavailable
    }
}

/// Outcome of a persisting fetch.
///
/// Failures are carried as data rather than returned as `Err`, so a caller
/// can show the error and let the user select the category again.
#[derive(Debug)]
pub struct FetchReport {
    /// Slug the fetch was issued for
    pub category: String,
    /// Ids of the inserted trends in provider order, or the error
    pub result: Result<Vec<i64>, FetchError>,
}

impl FetchReport {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Number of trends stored; zero on failure.
    pub fn stored(&self) -> usize {
        self.result.as_ref().map_or(0, Vec::len)
    }
}

/// Resolve a slug against the registry.
pub fn resolve_category(slug: &str) -> Result<Category, FetchError> {
    find_category(slug).ok_or_else(|| FetchError::UnknownCategory(slug.to_string()))
}

/// Fetch and normalize trends for display only. Nothing is persisted.
///
/// The result keeps the provider's order.
pub async fn preview_trends(
    client: &ProviderClient,
    normalizer: &Normalizer,
    category: &Category,
) -> Result<Vec<NewTrend>, FetchError> {
    let raws = client.fetch_raw(category).await?;
    let trends = normalizer.normalize_batch(&raws, &category.slug)?;

    tracing::info!(
        category = %category.slug,
        count = trends.len(),
        "Fetched trend preview"
    );
    Ok(trends)
}

/// Fetch, normalize and persist trends for a category.
///
/// The whole batch is inserted in one transaction, so either every trend is
/// stored or none is.
pub async fn refresh_category(
    db: &Database,
    client: &ProviderClient,
    normalizer: &Normalizer,
    category: &Category,
) -> FetchReport {
    let result = fetch_and_store(db, client, normalizer, category).await;

    match &result {
        Ok(ids) => {
            tracing::info!(category = %category.slug, stored = ids.len(), "Refreshed category");
        }
        Err(e) => {
            tracing::warn!(
                category = %category.slug,
                kind = ?e.kind(),
                error = %e,
                "Category refresh failed"
            );
        }
    }

    FetchReport {
        category: category.slug.clone(),
        result,
    }
}

async fn fetch_and_store(
    db: &Database,
    client: &ProviderClient,
    normalizer: &Normalizer,
    category: &Category,
) -> Result<Vec<i64>, FetchError> {
    let trends = preview_trends(client, normalizer, category).await?;
    db.insert_trends(&trends)
        .await
        .map_err(|e| FetchError::Database(format!("{e:#}")))
}
