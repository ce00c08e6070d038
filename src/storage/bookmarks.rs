use anyhow::Result;
use chrono::Utc;

use super::schema::Database;
use super::types::{BookmarkInsert, BookmarkRow, SavedTrend, TrendRef};
use crate::auth::UserId;
use crate::config::DuplicatePolicy;
use crate::util::clean_text;

impl Database {
    // ========================================================================
    // Bookmark Operations
    // ========================================================================

    /// Bookmark a trend for a user.
    ///
    /// Under [`DuplicatePolicy::Allow`] every call inserts a row. Under
    /// [`DuplicatePolicy::Reject`] an existing (user, trend) pair yields
    /// [`BookmarkInsert::Duplicate`] and nothing is written; the check and the
    /// insert run in the same transaction. Blank notes are stored as NULL.
    pub async fn insert_bookmark(
        &self,
        user: &UserId,
        trend_ref: &TrendRef,
        notes: Option<&str>,
        policy: DuplicatePolicy,
    ) -> Result<BookmarkInsert> {
        let notes = notes.and_then(clean_text);
        let trend_id = trend_ref.stored_id();
        let client_key = trend_ref.client_key();
        let mut tx = self.pool.begin().await?;

        if policy == DuplicatePolicy::Reject {
            // IS compares NULLs as equal
            let (exists,): (i64,) = sqlx::query_as(
                r#"
                SELECT EXISTS(
                    SELECT 1 FROM saved_trends
                    WHERE user_id = ? AND trend_id IS ? AND client_key IS ?
                )
            "#,
            )
            .bind(user.as_str())
            .bind(trend_id)
            .bind(client_key)
            .fetch_one(&mut *tx)
            .await?;

            if exists != 0 {
                return Ok(BookmarkInsert::Duplicate);
            }
        }

        let row: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO saved_trends (user_id, trend_id, client_key, saved_at, notes)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id
        "#,
        )
        .bind(user.as_str())
        .bind(trend_id)
        .bind(client_key)
        .bind(Utc::now().timestamp_millis())
        .bind(notes)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(BookmarkInsert::Inserted(row.0))
    }

    /// All bookmarks of a user, oldest first.
    pub async fn list_bookmarks(&self, user: &UserId) -> Result<Vec<SavedTrend>> {
        let rows = sqlx::query_as::<_, BookmarkRow>(
            r#"
            SELECT id, user_id, trend_id, client_key, saved_at, notes
            FROM saved_trends
            WHERE user_id = ?
            ORDER BY saved_at, id
        "#,
        )
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(BookmarkRow::into_saved).collect()
    }

    /// A user's bookmarks whose reference is in `trend_refs`, oldest first.
    pub async fn bookmarks_for_refs(
        &self,
        user: &UserId,
        trend_refs: &[TrendRef],
    ) -> Result<Vec<SavedTrend>> {
        let mut bookmarks = self.list_bookmarks(user).await?;
        bookmarks.retain(|b| trend_refs.contains(&b.trend_ref));
        Ok(bookmarks)
    }

    pub async fn count_bookmarks(&self, user: &UserId) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM saved_trends WHERE user_id = ?")
            .bind(user.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
