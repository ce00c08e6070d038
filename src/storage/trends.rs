use anyhow::Result;
use chrono::Utc;
use sqlx::SqliteConnection;

use super::categories::find_category;
use super::schema::Database;
use super::types::TrendRow;
use crate::config::RecentConfig;
use crate::trend::{NewTrend, Placeholder, RecentTrends, Trend};

const HOUR_MS: i64 = 60 * 60 * 1000;

/// Parameters of the "recent trends by category" read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecentQuery {
    /// Only rows created strictly after `now - window_ms` qualify.
    pub window_ms: i64,
    pub min_score: u8,
    pub limit: u32,
}

impl Default for RecentQuery {
    fn default() -> Self {
        Self {
            window_ms: 24 * HOUR_MS,
            min_score: 90,
            limit: 10,
        }
    }
}

impl From<&RecentConfig> for RecentQuery {
    fn from(config: &RecentConfig) -> Self {
        Self {
            window_ms: i64::try_from(config.window_hours)
                .unwrap_or(i64::MAX / HOUR_MS)
                .saturating_mul(HOUR_MS),
            min_score: config.min_score,
            limit: config.limit,
        }
    }
}

async fn insert_row(conn: &mut SqliteConnection, trend: &NewTrend, created_at: i64) -> Result<i64> {
    if find_category(&trend.category).is_none() {
        tracing::warn!(category = %trend.category, title = %trend.title, "Storing trend with unknown category");
    }

    let keywords = serde_json::to_string(&trend.keywords)?;
    let row: (i64,) = sqlx::query_as(
        r#"
        INSERT INTO trends
            (title, description, category, keywords, relevance_score, search_volume, created_at, source)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id
    "#,
    )
    .bind(&trend.title)
    .bind(&trend.description)
    .bind(&trend.category)
    .bind(keywords)
    .bind(i64::from(trend.relevance_score))
    .bind(trend.search_volume.to_string())
    .bind(created_at)
    .bind(&trend.source)
    .fetch_one(conn)
    .await?;

    Ok(row.0)
}

impl Database {
    // ========================================================================
    // Trend Operations
    // ========================================================================

    /// Persist one trend, stamping `created_at` with the current time.
    pub async fn insert_trend(&self, trend: &NewTrend) -> Result<i64> {
        self.insert_trend_at(trend, Utc::now().timestamp_millis())
            .await
    }

    pub(crate) async fn insert_trend_at(&self, trend: &NewTrend, created_at: i64) -> Result<i64> {
        let mut conn = self.pool.acquire().await?;
        insert_row(&mut conn, trend, created_at).await
    }

    /// Persist a normalized batch in one transaction.
    ///
    /// Every row gets the same `created_at`. Returns the new ids in input order.
    pub async fn insert_trends(&self, trends: &[NewTrend]) -> Result<Vec<i64>> {
        let created_at = Utc::now().timestamp_millis();
        let mut tx = self.pool.begin().await?;

        let mut ids = Vec::with_capacity(trends.len());
        for trend in trends {
            ids.push(insert_row(&mut tx, trend, created_at).await?);
        }

        tx.commit().await?;
        Ok(ids)
    }

    pub async fn get_trend(&self, id: i64) -> Result<Option<Trend>> {
        let row = sqlx::query_as::<_, TrendRow>(
            r#"
            SELECT id, title, description, category, keywords, relevance_score,
                   search_volume, created_at, source
            FROM trends
            WHERE id = ?
        "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TrendRow::into_trend).transpose()
    }

    /// Recent, high-scoring trends of one category, most recent first.
    ///
    /// `now_ms` is the reference time for the window.
    ///
    /// - no row of the category inside the window → [`RecentTrends::Placeholder`]
    /// - rows inside the window, none reaching `min_score` → [`RecentTrends::Empty`]
    /// - otherwise at most `limit` rows → [`RecentTrends::Rows`]
    pub async fn recent_trends_by_category(
        &self,
        category: &str,
        query: &RecentQuery,
        now_ms: i64,
    ) -> Result<RecentTrends> {
        let since = now_ms.saturating_sub(query.window_ms);

        let rows = sqlx::query_as::<_, TrendRow>(
            r#"
            SELECT id, title, description, category, keywords, relevance_score,
                   search_volume, created_at, source
            FROM trends
            WHERE category = ? AND created_at > ? AND relevance_score >= ?
            ORDER BY created_at DESC, id DESC
            LIMIT ?
        "#,
        )
        .bind(category)
        .bind(since)
        .bind(i64::from(query.min_score))
        .bind(i64::from(query.limit))
        .fetch_all(&self.pool)
        .await?;

        if !rows.is_empty() {
            let trends = rows
                .into_iter()
                .map(TrendRow::into_trend)
                .collect::<Result<Vec<_>>>()?;
            return Ok(RecentTrends::Rows(trends));
        }

        let (in_window,): (i64,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM trends WHERE category = ? AND created_at > ?)",
        )
        .bind(category)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        if in_window != 0 {
            Ok(RecentTrends::Empty)
        } else {
            tracing::debug!(category = %category, "No recent trends, returning placeholder");
            Ok(RecentTrends::Placeholder(Placeholder::searching(category)))
        }
    }
}
