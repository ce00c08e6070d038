//! Service facade: the store, the provider and the auth gate behind one type.
//!
//! Reads (categories, recent trends, previews) need no identity. Bookmark
//! writes and exports need a signed-in user and fail with
//! [`BookmarkError::Unauthenticated`] otherwise; the bookmark listing reads
//! as empty for an anonymous caller.

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

use crate::auth::{AuthGate, UserId};
use crate::config::{Config, DuplicatePolicy};
use crate::export::{ExportDocument, ExportItem};
use crate::fetch::{self, FetchError, FetchReport};
use crate::provider::{ProviderClient, ProviderError};
use crate::storage::{BookmarkInsert, Category, Database, RecentQuery, SavedTrend, TrendRef};
use crate::trend::{NewTrend, Normalizer, RecentTrends};

/// Message carried by a successful export acknowledgment.
pub const EXPORT_SUCCESS_MESSAGE: &str = "Tendências exportadas com sucesso!";

/// Errors from the auth-gated bookmark operations.
#[derive(Debug, Error)]
pub enum BookmarkError {
    #[error("You must be signed in to do that")]
    Unauthenticated,
    #[error("This trend is already in your saved list")]
    Duplicate,
    #[error("Select at least one trend to export")]
    EmptySelection,
    #[error("Trend reference cannot be empty")]
    EmptyTrendRef,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Reply to an export request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportAck {
    pub success: bool,
    pub message: String,
    /// Number of bookmarks in `document`
    pub exported: usize,
    pub document: ExportDocument,
}

pub struct Radar<A: AuthGate> {
    db: Database,
    provider: Option<ProviderClient>,
    normalizer: Normalizer,
    auth: A,
    recent: RecentQuery,
    duplicates: DuplicatePolicy,
}

impl<A: AuthGate> Radar<A> {
    /// A radar with default read settings and no provider attached.
    pub fn new(db: Database, normalizer: Normalizer, auth: A) -> Self {
        Self {
            db,
            provider: None,
            normalizer,
            auth,
            recent: RecentQuery::default(),
            duplicates: DuplicatePolicy::default(),
        }
    }

    /// Build from configuration.
    ///
    /// A missing `provider.base_url` leaves the radar usable for store reads
    /// and bookmarks; previews and refreshes then fail with
    /// [`FetchError::NotConfigured`]. An invalid base URL is an error.
    pub fn from_config(
        db: Database,
        config: &Config,
        http: reqwest::Client,
        auth: A,
    ) -> Result<Self, ProviderError> {
        let provider = match ProviderClient::new(http, &config.provider) {
            Ok(client) => Some(client),
            Err(ProviderError::MissingBaseUrl) => None,
            Err(e) => return Err(e),
        };

        Ok(Self {
            provider,
            recent: RecentQuery::from(&config.recent),
            duplicates: config.bookmarks.duplicates,
            ..Self::new(
                db,
                Normalizer::with_random_scores(config.provider.source_label.clone()),
                auth,
            )
        })
    }

    pub fn with_provider(mut self, client: ProviderClient) -> Self {
        self.provider = Some(client);
        self
    }

    pub fn with_recent_query(mut self, query: RecentQuery) -> Self {
        self.recent = query;
        self
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicates = policy;
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn current_user(&self) -> Option<UserId> {
        self.auth.current_user()
    }

    fn require_user(&self, action: &str) -> Result<UserId, BookmarkError> {
        self.auth.current_user().ok_or_else(|| {
            tracing::warn!(action = action, "Rejected unauthenticated request");
            BookmarkError::Unauthenticated
        })
    }

    fn provider(&self) -> Result<&ProviderClient, FetchError> {
        self.provider
            .as_ref()
            .ok_or(FetchError::NotConfigured(ProviderError::MissingBaseUrl))
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub async fn list_categories(&self) -> anyhow::Result<Vec<Category>> {
        self.db.list_categories().await
    }

    /// Recent high-scoring trends of a category, using the configured window.
    ///
    /// The slug is checked against the stored `categories` table.
    pub async fn recent_trends(&self, slug: &str) -> anyhow::Result<RecentTrends> {
        let category = self
            .db
            .get_category(slug)
            .await?
            .ok_or_else(|| FetchError::UnknownCategory(slug.to_string()))?;
        self.db
            .recent_trends_by_category(&category.slug, &self.recent, Utc::now().timestamp_millis())
            .await
    }

    /// Fetch trends for display without storing them.
    pub async fn preview(&self, slug: &str) -> Result<Vec<NewTrend>, FetchError> {
        let category = fetch::resolve_category(slug)?;
        fetch::preview_trends(self.provider()?, &self.normalizer, &category).await
    }

    /// Fetch trends and store them.
    pub async fn refresh(&self, slug: &str) -> FetchReport {
        let target = fetch::resolve_category(slug)
            .and_then(|category| Ok((category, self.provider()?)));

        match target {
            Ok((category, client)) => {
                fetch::refresh_category(&self.db, client, &self.normalizer, &category).await
            }
            Err(e) => {
                tracing::warn!(category = %slug, error = %e, "Category refresh not attempted");
                FetchReport {
                    category: slug.to_string(),
                    result: Err(e),
                }
            }
        }
    }

    // ========================================================================
    // Bookmarks
    // ========================================================================

    /// Bookmark a trend for the current user.
    ///
    /// `trend_ref` is a stored trend id or the client key of a previewed
    /// trend. Returns the bookmark id.
    pub async fn save_bookmark(
        &self,
        trend_ref: &TrendRef,
        notes: Option<&str>,
    ) -> Result<i64, BookmarkError> {
        let user = self.require_user("save_bookmark")?;
        let trend_ref = match trend_ref {
            TrendRef::Stored(id) => TrendRef::Stored(*id),
            TrendRef::Preview(key) => {
                TrendRef::preview(key).map_err(|_| BookmarkError::EmptyTrendRef)?
            }
        };

        match self
            .db
            .insert_bookmark(&user, &trend_ref, notes, self.duplicates)
            .await?
        {
            BookmarkInsert::Inserted(id) => {
                tracing::info!(user = %user, trend_ref = %trend_ref, id = id, "Saved bookmark");
                Ok(id)
            }
            BookmarkInsert::Duplicate => {
                tracing::info!(user = %user, trend_ref = %trend_ref, "Rejected duplicate bookmark");
                Err(BookmarkError::Duplicate)
            }
        }
    }

    /// The current user's bookmarks, oldest first. Empty when nobody is
    /// signed in.
    pub async fn saved_bookmarks(&self) -> anyhow::Result<Vec<SavedTrend>> {
        match self.auth.current_user() {
            Some(user) => self.db.list_bookmarks(&user).await,
            None => {
                tracing::debug!("Anonymous bookmark listing");
                Ok(Vec::new())
            }
        }
    }

    /// Export the current user's bookmarks whose reference is in `trend_refs`.
    ///
    /// Nothing is written anywhere; the caller decides what to do with the
    /// returned document.
    pub async fn export_bookmarks(
        &self,
        trend_refs: &[TrendRef],
    ) -> Result<ExportAck, BookmarkError> {
        let user = self.require_user("export_bookmarks")?;
        if trend_refs.is_empty() {
            return Err(BookmarkError::EmptySelection);
        }

        let bookmarks = self.db.bookmarks_for_refs(&user, trend_refs).await?;
        let mut items = Vec::with_capacity(bookmarks.len());
        for bookmark in bookmarks {
            // Only a stored id joins; a client key never names a row
            let trend = match bookmark.trend_ref.stored_id() {
                Some(id) => self.db.get_trend(id).await?,
                None => None,
            };
            items.push(ExportItem { bookmark, trend });
        }

        let document = ExportDocument {
            user_id: user.to_string(),
            exported_at: Utc::now(),
            items,
        };
        tracing::info!(
            user = %user,
            requested = trend_refs.len(),
            exported = document.len(),
            "Exported bookmarks"
        );

        Ok(ExportAck {
            success: true,
            message: EXPORT_SUCCESS_MESSAGE.to_string(),
            exported: document.len(),
            document,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticIdentity;
    use crate::provider::RawTrend;
    use crate::trend::{Scorer, SearchVolume};
    use std::sync::Arc;

    struct FixedScorer;

    impl Scorer for FixedScorer {
        fn relevance(&self, _raw: &RawTrend) -> u8 {
            92
        }

        fn search_volume(&self, _raw: &RawTrend) -> u64 {
            10
        }
    }

    async fn radar(auth: StaticIdentity) -> Radar<StaticIdentity> {
        let db = Database::open(":memory:").await.unwrap();
        Radar::new(db, Normalizer::new(Arc::new(FixedScorer), "Test"), auth)
    }

    fn ana() -> StaticIdentity {
        StaticIdentity::signed_in(UserId::new("ana").unwrap())
    }

    fn key(k: &str) -> TrendRef {
        TrendRef::preview(k).unwrap()
    }

    fn new_trend(title: &str) -> NewTrend {
        NewTrend {
            title: title.into(),
            description: "d".into(),
            category: "esporte".into(),
            keywords: vec![],
            relevance_score: 95,
            search_volume: SearchVolume::Count(5),
            source: "s".into(),
        }
    }

    #[tokio::test]
    async fn test_save_requires_user() {
        let radar = radar(StaticIdentity::anonymous()).await;
        let result = radar.save_bookmark(&TrendRef::Stored(1), None).await;
        assert!(matches!(result, Err(BookmarkError::Unauthenticated)));

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM saved_trends")
            .fetch_one(&radar.database().pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_saved_bookmarks_anonymous_is_empty() {
        let radar = radar(StaticIdentity::anonymous()).await;
        assert!(radar.saved_bookmarks().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_twice_allowed_by_default() {
        let radar = radar(ana()).await;
        let first = radar.save_bookmark(&key("Copa"), None).await.unwrap();
        let second = radar.save_bookmark(&key("Copa"), None).await.unwrap();
        assert_ne!(first, second);
        assert_eq!(radar.saved_bookmarks().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_save_twice_rejected_by_policy() {
        let radar = radar(ana())
            .await
            .with_duplicate_policy(DuplicatePolicy::Reject);
        radar.save_bookmark(&key("Copa"), None).await.unwrap();
        let second = radar.save_bookmark(&key("Copa"), None).await;
        assert!(matches!(second, Err(BookmarkError::Duplicate)));
        assert_eq!(radar.saved_bookmarks().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_blank_trend_ref_rejected() {
        let radar = radar(ana()).await;
        assert!(matches!(
            radar.save_bookmark(&TrendRef::Preview("  ".into()), None).await,
            Err(BookmarkError::EmptyTrendRef)
        ));
    }

    #[tokio::test]
    async fn test_export_requires_user() {
        let radar = radar(StaticIdentity::anonymous()).await;
        let result = radar.export_bookmarks(&[TrendRef::Stored(1)]).await;
        assert!(matches!(result, Err(BookmarkError::Unauthenticated)));
    }

    #[tokio::test]
    async fn test_export_empty_selection() {
        let radar = radar(ana()).await;
        let result = radar.export_bookmarks(&[]).await;
        assert!(matches!(result, Err(BookmarkError::EmptySelection)));
    }

    #[tokio::test]
    async fn test_export_joins_stored_trends() {
        let radar = radar(ana()).await;
        let id = radar.database().insert_trend(&new_trend("Flamengo")).await.unwrap();
        radar.save_bookmark(&TrendRef::Stored(id), Some("ver")).await.unwrap();
        radar.save_bookmark(&key("Só no preview"), None).await.unwrap();
        radar.save_bookmark(&key("Não selecionado"), None).await.unwrap();

        let ack = radar
            .export_bookmarks(&[TrendRef::Stored(id), key("Só no preview")])
            .await
            .unwrap();

        assert!(ack.success);
        assert_eq!(ack.message, EXPORT_SUCCESS_MESSAGE);
        assert_eq!(ack.exported, 2);
        assert_eq!(ack.document.user_id, "ana");
        let items = &ack.document.items;
        assert_eq!(items[0].trend.as_ref().unwrap().title, "Flamengo");
        assert_eq!(items[0].bookmark.notes.as_deref(), Some("ver"));
        assert!(items[1].trend.is_none());
    }

    #[tokio::test]
    async fn test_numeric_preview_title_does_not_join() {
        let radar = radar(ana()).await;
        let id = radar.database().insert_trend(&new_trend("Flamengo")).await.unwrap();
        assert_eq!(id, 1);
        radar.save_bookmark(&key("1"), None).await.unwrap();

        let ack = radar.export_bookmarks(&[key("1")]).await.unwrap();
        assert_eq!(ack.exported, 1);
        assert_eq!(ack.document.items[0].bookmark.trend_ref, key("1"));
        assert!(ack.document.items[0].trend.is_none());

        let none = radar.export_bookmarks(&[TrendRef::Stored(1)]).await.unwrap();
        assert_eq!(none.exported, 0);
    }

    #[tokio::test]
    async fn test_export_only_sees_own_bookmarks() {
        let db = Database::open(":memory:").await.unwrap();
        let normalizer = || Normalizer::new(Arc::new(FixedScorer), "Test");
        let bia = Radar::new(
            db.clone(),
            normalizer(),
            StaticIdentity::signed_in(UserId::new("bia").unwrap()),
        );
        bia.save_bookmark(&TrendRef::Stored(7), None).await.unwrap();

        let own = Radar::new(db, normalizer(), ana());
        let ack = own.export_bookmarks(&[TrendRef::Stored(7)]).await.unwrap();
        assert_eq!(ack.exported, 0);
        assert!(ack.success);
    }

    #[tokio::test]
    async fn test_preview_without_provider() {
        let radar = radar(ana()).await;
        let err = radar.preview("esporte").await.unwrap_err();
        assert!(matches!(err, FetchError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn test_refresh_unknown_category() {
        let radar = radar(ana()).await;
        let report = radar.refresh("nope").await;
        assert!(!report.is_success());
        assert!(matches!(report.result, Err(FetchError::UnknownCategory(_))));
    }

    #[tokio::test]
    async fn test_recent_trends_uses_configured_query() {
        let radar = radar(StaticIdentity::anonymous()).await.with_recent_query(RecentQuery {
            min_score: 95,
            ..RecentQuery::default()
        });
        let mut low = new_trend("Low");
        low.relevance_score = 94;
        radar.database().insert_trend(&low).await.unwrap();

        assert_eq!(radar.recent_trends("esporte").await.unwrap(), RecentTrends::Empty);
        let err = radar.recent_trends("nope").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FetchError>(),
            Some(FetchError::UnknownCategory(_))
        ));
    }

    #[tokio::test]
    async fn test_from_config_without_base_url() {
        let db = Database::open(":memory:").await.unwrap();
        let radar =
            Radar::from_config(db, &Config::default(), reqwest::Client::new(), ana()).unwrap();
        assert!(radar.provider.is_none());
        assert_eq!(radar.recent, RecentQuery::default());
    }

    #[tokio::test]
    async fn test_from_config_rejects_bad_base_url() {
        let db = Database::open(":memory:").await.unwrap();
        let mut config = Config::default();
        config.provider.base_url = Some("http://example.com/".into());
        let result = Radar::from_config(db, &config, reqwest::Client::new(), ana());
        assert!(matches!(result, Err(ProviderError::InvalidBaseUrl(_))));
    }
}
