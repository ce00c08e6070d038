use rand::Rng;

use super::MAX_RELEVANCE;
use crate::provider::RawTrend;

/// Upper bound (inclusive) of generated search volumes.
pub const MAX_SEARCH_VOLUME: u64 = 9_999;

/// Source of relevance scores and fallback search volumes.
///
/// The normalizer clamps whatever `relevance` returns to
/// [`MAX_RELEVANCE`], so an implementation only has to rank.
pub trait Scorer: Send + Sync {
    fn relevance(&self, raw: &RawTrend) -> u8;

    /// Used only when the provider did not report a volume.
    fn search_volume(&self, raw: &RawTrend) -> u64;
}

/// Uniformly random scores. Placeholder until a ranking signal exists.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomScorer;

impl Scorer for RandomScorer {
    fn relevance(&self, _raw: &RawTrend) -> u8 {
        rand::rng().random_range(0..=MAX_RELEVANCE)
    }

    fn search_volume(&self, _raw: &RawTrend) -> u64 {
        rand::rng().random_range(0..=MAX_SEARCH_VOLUME)
    }
}
