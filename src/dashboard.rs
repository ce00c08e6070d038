//! View state of one dashboard session.
//!
//! A [`Dashboard`] is owned by whoever drives the session and dropped with
//! it. Selecting a category starts a fresh result set; the last applied fetch
//! result wins, whichever selection it was issued for.

use crate::fetch::FetchError;
use crate::trend::NewTrend;

#[derive(Debug, Default)]
pub struct Dashboard {
    selected: Option<String>,
    loading: bool,
    trends: Vec<NewTrend>,
    error: Option<FetchError>,
    /// Client keys in the order they were marked
    marked: Vec<String>,
}

impl Dashboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch to a category: drops previous results, error and marks, and
    /// enters the loading state.
    pub fn select(&mut self, slug: &str) {
        self.selected = Some(slug.to_string());
        self.loading = true;
        self.trends.clear();
        self.error = None;
        self.marked.clear();
    }

    /// Store the outcome of a fetch and leave the loading state.
    ///
    /// There are no request tokens: a late response overwrites whatever is
    /// currently shown.
    pub fn apply(&mut self, result: Result<Vec<NewTrend>, FetchError>) {
        self.loading = false;
        self.marked.clear();
        match result {
            Ok(trends) => {
                self.trends = trends;
                self.error = None;
            }
            Err(e) => {
                self.trends.clear();
                self.error = Some(e);
            }
        }
    }

    /// Flip the mark on a displayed trend. Returns whether it is now marked;
    /// keys of trends not on display are ignored.
    pub fn toggle_mark(&mut self, key: &str) -> bool {
        if let Some(pos) = self.marked.iter().position(|k| k == key) {
            self.marked.remove(pos);
            return false;
        }
        if self.trends.iter().any(|t| t.client_key() == key) {
            self.marked.push(key.to_string());
            return true;
        }
        false
    }

    pub fn marked(&self) -> &[String] {
        &self.marked
    }

    /// Marked trends, in mark order.
    pub fn marked_trends(&self) -> Vec<&NewTrend> {
        self.marked
            .iter()
            .filter_map(|key| self.trends.iter().find(|t| t.client_key() == key))
            .collect()
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn trends(&self) -> &[NewTrend] {
        &self.trends
    }

    pub fn error(&self) -> Option<&FetchError> {
        self.error.as_ref()
    }
}
