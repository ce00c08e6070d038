//! SQLite-backed trend store.
//!
//! [`Database`] owns the connection pool; its methods are split across the
//! submodules by table: `trends`, `saved_trends` (bookmarks) and the
//! `categories` registry.

mod bookmarks;
mod categories;
mod schema;
mod trends;
mod types;

pub use categories::{find_category, registry};
pub use schema::Database;
pub use trends::RecentQuery;
pub use types::{BookmarkInsert, Category, DatabaseError, SavedTrend, TrendRef, TrendRefError};
