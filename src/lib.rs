//! Trending-topic radar.
//!
//! Fetches trending topics per content category from an external trends
//! provider, shapes them into scored trend cards, stores them in SQLite and
//! keeps per-user bookmarks that can be exported.
//!
//! The entry point for most callers is [`radar::Radar`].

pub mod auth;
pub mod config;
pub mod dashboard;
pub mod export;
pub mod fetch;
pub mod provider;
pub mod radar;
pub mod storage;
pub mod trend;
pub mod util;
