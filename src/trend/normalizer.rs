use chrono::{DateTime, Local};
use std::sync::Arc;
use thiserror::Error;

use super::{NewTrend, RandomScorer, Scorer, SearchVolume, MAX_KEYWORDS, MAX_RELEVANCE};
use crate::provider::RawTrend;
use crate::util::clean_text;

/// Time-window text used when the provider does not send one (legacy payloads).
pub const DEFAULT_WINDOW_LABEL: &str = "nas últimas 24h";

const MISSING_GROWTH: &str = "—";

const DESCRIPTION_SUFFIX: &str = "Tendência verificada através de análise de múltiplas fontes e dados de busca em tempo real.";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    /// The item at `index` (0-based, provider order) has no usable title.
    #[error("Trend item {index} has no title")]
    MissingTitle { index: usize },
}

/// Builds the card description from the growth figure and time window.
pub fn describe(growth: &str, window: &str) -> String {
    format!("📈 Crescimento de {growth} {window}. {DESCRIPTION_SUFFIX}")
}

/// Maps raw provider items onto the application's trend shape.
pub struct Normalizer {
    scorer: Arc<dyn Scorer>,
    source_label: String,
}

impl Normalizer {
    pub fn new(scorer: Arc<dyn Scorer>, source_label: impl Into<String>) -> Self {
        Self {
            scorer,
            source_label: source_label.into(),
        }
    }

    pub fn with_random_scores(source_label: impl Into<String>) -> Self {
        Self::new(Arc::new(RandomScorer), source_label)
    }

    /// Normalize one item. `index` is only used in the error.
    pub fn normalize(
        &self,
        index: usize,
        raw: &RawTrend,
        category: &str,
        captured_at: &DateTime<Local>,
    ) -> Result<NewTrend, NormalizeError> {
        let title = raw
            .title
            .as_deref()
            .and_then(clean_text)
            .ok_or(NormalizeError::MissingTitle { index })?;

        let growth = raw
            .variation
            .as_deref()
            .or(raw.data_volume.as_deref())
            .and_then(clean_text)
            .unwrap_or_else(|| MISSING_GROWTH.to_string());
        let window = raw
            .duration
            .as_deref()
            .and_then(clean_text)
            .unwrap_or_else(|| DEFAULT_WINDOW_LABEL.to_string());

        let keywords = raw
            .keywords
            .iter()
            .flatten()
            .filter_map(|k| clean_text(k))
            .take(MAX_KEYWORDS)
            .collect();

        let relevance_score = self.scorer.relevance(raw).min(MAX_RELEVANCE);

        let search_volume = match &raw.search_volume {
            Some(SearchVolume::Label(label)) => match clean_text(label) {
                Some(label) => SearchVolume::Label(label),
                None => SearchVolume::Count(self.scorer.search_volume(raw)),
            },
            Some(count @ SearchVolume::Count(_)) => count.clone(),
            None => SearchVolume::Count(self.scorer.search_volume(raw)),
        };

        Ok(NewTrend {
            title,
            description: describe(&growth, &window),
            category: category.to_string(),
            keywords,
            relevance_score,
            search_volume,
            source: format!(
                "{} • {}",
                self.source_label,
                captured_at.format("%d/%m/%Y, %H:%M:%S")
            ),
        })
    }

    /// Normalize a whole provider response, preserving its order.
    ///
    /// The capture time is taken once, so every trend of a batch shares the
    /// same `source` text. The first item without a title fails the batch.
    pub fn normalize_batch(
        &self,
        raws: &[RawTrend],
        category: &str,
    ) -> Result<Vec<NewTrend>, NormalizeError> {
        let captured_at = Local::now();
        raws.iter()
            .enumerate()
            .map(|(index, raw)| self.normalize(index, raw, category, &captured_at))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    struct FixedScorer {
        relevance: u8,
        volume: u64,
    }

    impl Scorer for FixedScorer {
        fn relevance(&self, _raw: &RawTrend) -> u8 {
            self.relevance
        }

        fn search_volume(&self, _raw: &RawTrend) -> u64 {
            self.volume
        }
    }

    fn fixed(relevance: u8, volume: u64) -> Normalizer {
        Normalizer::new(Arc::new(FixedScorer { relevance, volume }), "Google Trends API")
    }

    fn captured() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 10, 18, 14, 3, 0).unwrap()
    }

    fn current_item() -> RawTrend {
        RawTrend {
            title: Some("X".into()),
            variation: Some("+50%".into()),
            duration: Some("24h".into()),
            search_volume: Some(SearchVolume::Label("1200".into())),
            keywords: Some(vec!["a", "b", "c", "d", "e"].into_iter().map(String::from).collect()),
            ..RawTrend::default()
        }
    }

    #[test]
    fn test_current_shape() {
        let trend = fixed(93, 7)
            .normalize(0, &current_item(), "politica", &captured())
            .unwrap();

        assert_eq!(
            trend,
            NewTrend {
                title: "X".into(),
                description: describe("+50%", "24h"),
                category: "politica".into(),
                keywords: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                relevance_score: 93,
                search_volume: SearchVolume::Label("1200".into()),
                source: "Google Trends API • 18/10/2026, 14:03:00".into(),
            }
        );
        assert!(trend.description.contains("50%"));
        assert!(trend.description.contains("24h"));
    }

    #[test]
    fn test_legacy_shape() {
        let raw = RawTrend {
            title: Some("Copa do Brasil".into()),
            data_volume: Some("200K+".into()),
            ..RawTrend::default()
        };

        let trend = fixed(12, 4321)
            .normalize(0, &raw, "esporte", &captured())
            .unwrap();

        assert_eq!(trend.description, describe("200K+", DEFAULT_WINDOW_LABEL));
        assert_eq!(trend.search_volume, SearchVolume::Count(4321));
        assert!(trend.keywords.is_empty());
    }

    #[test]
    fn test_missing_growth_figure() {
        let raw = RawTrend {
            title: Some("Sem dados".into()),
            ..RawTrend::default()
        };
        let trend = fixed(1, 1).normalize(0, &raw, "factuais", &captured()).unwrap();
        assert!(trend.description.starts_with("📈 Crescimento de — nas últimas 24h."));
    }

    #[test]
    fn test_missing_title_is_an_error() {
        let raw = RawTrend {
            variation: Some("+10%".into()),
            ..RawTrend::default()
        };
        let err = fixed(1, 1).normalize(3, &raw, "factuais", &captured()).unwrap_err();
        assert_eq!(err, NormalizeError::MissingTitle { index: 3 });
    }

    #[test]
    fn test_blank_title_is_an_error() {
        let raw = RawTrend {
            title: Some(" \x1b[0m ".into()),
            ..RawTrend::default()
        };
        assert!(fixed(1, 1).normalize(0, &raw, "factuais", &captured()).is_err());
    }

    #[test]
    fn test_score_is_clamped() {
        let trend = fixed(250, 1)
            .normalize(0, &current_item(), "tecnologia", &captured())
            .unwrap();
        assert_eq!(trend.relevance_score, MAX_RELEVANCE);
    }

    #[test]
    fn test_blank_keywords_dropped_before_truncation() {
        let raw = RawTrend {
            title: Some("T".into()),
            keywords: Some(
                vec!["", "a", "  ", "b", "c", "d", "e"]
                    .into_iter()
                    .map(String::from)
                    .collect(),
            ),
            ..RawTrend::default()
        };
        let trend = fixed(1, 1).normalize(0, &raw, "factuais", &captured()).unwrap();
        assert_eq!(trend.keywords, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_control_chars_stripped_from_title() {
        let raw = RawTrend {
            title: Some("\x1b[31mAlerta\x1b[0m".into()),
            ..RawTrend::default()
        };
        let trend = fixed(1, 1).normalize(0, &raw, "factuais", &captured()).unwrap();
        assert_eq!(trend.title, "Alerta");
    }

    #[test]
    fn test_batch_keeps_provider_order() {
        let raws: Vec<RawTrend> = ["first", "second", "third"]
            .iter()
            .map(|t| RawTrend {
                title: Some(t.to_string()),
                ..RawTrend::default()
            })
            .collect();

        let trends = fixed(50, 1).normalize_batch(&raws, "culinaria").unwrap();
        let titles: Vec<_> = trends.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["first", "second", "third"]);
        assert!(trends.iter().all(|t| t.source == trends[0].source));
    }

    #[test]
    fn test_batch_fails_on_first_untitled_item() {
        let raws = vec![
            RawTrend {
                title: Some("ok".into()),
                ..RawTrend::default()
            },
            RawTrend::default(),
        ];
        let err = fixed(50, 1).normalize_batch(&raws, "culinaria").unwrap_err();
        assert_eq!(err, NormalizeError::MissingTitle { index: 1 });
    }

    proptest! {
        #[test]
        fn prop_titled_items_normalize_within_bounds(
            title in "[A-Za-z0-9][A-Za-z0-9 ]{0,40}",
            keywords in proptest::option::of(proptest::collection::vec("[a-z]{0,8}", 0..12)),
            volume in proptest::option::of(0u64..1_000_000),
        ) {
            let raw = RawTrend {
                title: Some(title),
                keywords,
                search_volume: volume.map(SearchVolume::Count),
                ..RawTrend::default()
            };
            let normalizer = Normalizer::with_random_scores("Google Trends API");
            let trend = normalizer.normalize(0, &raw, "esporte", &captured()).unwrap();

            prop_assert!(trend.relevance_score <= MAX_RELEVANCE);
            prop_assert!(trend.keywords.len() <= MAX_KEYWORDS);
            if let Some(v) = volume {
                prop_assert_eq!(trend.search_volume, SearchVolume::Count(v));
            }
        }
    }
}
