use serde::{Deserialize, Deserializer};

use crate::trend::SearchVolume;

/// One item as sent by the trends provider.
///
/// Covers both payload generations: the current one (`variation`,
/// `duration`, `search_volume`) and the legacy one (`data_volume`).
/// Fields the application does not use (`id`, `link`, `detail`) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawTrend {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub variation: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub duration: Option<String>,
    #[serde(default)]
    pub search_volume: Option<SearchVolume>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub data_volume: Option<String>,
    #[serde(default)]
    pub keywords: Option<Vec<String>>,
}

/// Body of a provider response: `{"trends": [...]}` or a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProviderResponse {
    Envelope { trends: Vec<RawTrend> },
    Bare(Vec<RawTrend>),
}

/// Decode a provider response body into its items, in provider order.
pub fn parse_response(bytes: &[u8]) -> Result<Vec<RawTrend>, serde_json::Error> {
    let response: ProviderResponse = serde_json::from_slice(bytes)?;
    Ok(match response {
        ProviderResponse::Envelope { trends } => trends,
        ProviderResponse::Bare(trends) => trends,
    })
}

/// Accepts a string or a number (`"+50%"`, `50`), mapping null to `None`.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Text {
        Str(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Option::<Text>::deserialize(deserializer)? {
        Some(Text::Str(s)) => Some(s),
        Some(Text::Int(n)) => Some(n.to_string()),
        Some(Text::Float(n)) => Some(n.to_string()),
        None => None,
    })
}
