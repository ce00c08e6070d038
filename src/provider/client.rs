use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use super::payload::{parse_response, RawTrend};
use crate::config::{ApiShape, ProviderConfig};
use crate::storage::Category;
use crate::util::{validate_base_url, UrlValidationError};

const MAX_RESPONSE_SIZE: usize = 2 * 1024 * 1024; // 2MB

/// Errors building a [`ProviderClient`] from configuration.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Trends provider base URL is not configured (set provider.base_url)")]
    MissingBaseUrl,
    #[error("Invalid trends provider base URL: {0}")]
    InvalidBaseUrl(#[from] UrlValidationError),
}

/// Errors from a single provider round-trip.
///
/// Network, status and timeout failures mean the provider is unavailable;
/// the remaining variants mean it answered with something unusable.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("Request timed out after {0}s")]
    Timeout(u64),
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    #[error("Malformed response: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl RequestError {
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            RequestError::Network(_) | RequestError::HttpStatus(_) | RequestError::Timeout(_)
        )
    }
}

/// HTTP client for the external trends endpoint.
///
/// One call per category selection, no retries: a failure is handed back to
/// the caller, who may simply select the category again.
#[derive(Clone)]
pub struct ProviderClient {
    http: reqwest::Client,
    endpoint: Url,
    region: String,
    shape: ApiShape,
    timeout: Duration,
    api_key: Option<SecretString>,
}

impl ProviderClient {
    pub fn new(http: reqwest::Client, config: &ProviderConfig) -> Result<Self, ProviderError> {
        let base = config
            .base_url
            .as_deref()
            .ok_or(ProviderError::MissingBaseUrl)?;
        let endpoint = validate_base_url(base)?
            .join("trends")
            .map_err(|e| ProviderError::InvalidBaseUrl(e.into()))?;

        Ok(Self {
            http,
            endpoint,
            region: config.region.clone(),
            shape: config.api_shape,
            timeout: config.timeout(),
            api_key: config.resolved_api_key(),
        })
    }

    /// Full request URL for a category, query string included.
    pub fn request_url(&self, category: &Category) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            match self.shape {
                ApiShape::Current => {
                    query
                        .append_pair("geo", &self.region)
                        .append_pair("category", &category.provider_id.to_string());
                }
                ApiShape::Legacy => {
                    query.append_pair("categoria", &category.provider_id.to_string());
                }
            }
        }
        url
    }

    /// Fetch the raw trend items for a category, in provider order.
    pub async fn fetch_raw(&self, category: &Category) -> Result<Vec<RawTrend>, RequestError> {
        let url = self.request_url(category);
        tracing::debug!(url = %url, category = %category.slug, "Requesting trends");

        let mut request = self.http.get(url);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| RequestError::Timeout(self.timeout.as_secs()))?
            .map_err(RequestError::Network)?;

        if !response.status().is_success() {
            return Err(RequestError::HttpStatus(response.status().as_u16()));
        }

        let bytes = tokio::time::timeout(
            self.timeout,
            read_limited_bytes(response, MAX_RESPONSE_SIZE),
        )
        .await
        .map_err(|_| RequestError::Timeout(self.timeout.as_secs()))??;

        Ok(parse_response(&bytes)?)
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, RequestError> {
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(RequestError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(RequestError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(RequestError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::find_category;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer, shape: ApiShape) -> ProviderConfig {
        ProviderConfig {
            base_url: Some(format!("{}/api", server.uri())),
            api_shape: shape,
            timeout_secs: 5,
            ..ProviderConfig::default()
        }
    }

    fn politica() -> Category {
        find_category("politica").unwrap()
    }

    #[test]
    fn test_missing_base_url() {
        let result = ProviderClient::new(reqwest::Client::new(), &ProviderConfig::default());
        assert!(matches!(result, Err(ProviderError::MissingBaseUrl)));
    }

    #[test]
    fn test_insecure_base_url_rejected() {
        let config = ProviderConfig {
            base_url: Some("http://trends.example.com".into()),
            ..ProviderConfig::default()
        };
        let result = ProviderClient::new(reqwest::Client::new(), &config);
        assert!(matches!(result, Err(ProviderError::InvalidBaseUrl(_))));
    }

    #[test]
    fn test_request_url_current_shape() {
        let config = ProviderConfig {
            base_url: Some("https://trends.example.com/api".into()),
            ..ProviderConfig::default()
        };
        let client = ProviderClient::new(reqwest::Client::new(), &config).unwrap();
        assert_eq!(
            client.request_url(&politica()).as_str(),
            "https://trends.example.com/api/trends?geo=BR&category=14"
        );
    }

    #[test]
    fn test_request_url_legacy_shape() {
        let config = ProviderConfig {
            base_url: Some("https://trends.example.com/".into()),
            api_shape: ApiShape::Legacy,
            ..ProviderConfig::default()
        };
        let client = ProviderClient::new(reqwest::Client::new(), &config).unwrap();
        assert_eq!(
            client.request_url(&politica()).as_str(),
            "https://trends.example.com/trends?categoria=14"
        );
    }

    #[tokio::test]
    async fn test_fetch_current_shape() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/trends"))
            .and(query_param("geo", "BR"))
            .and(query_param("category", "14"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"trends": [{"title": "Reforma", "variation": "+80%", "duration": "4h"}]}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let client =
            ProviderClient::new(reqwest::Client::new(), &config_for(&server, ApiShape::Current))
                .unwrap();
        let items = client.fetch_raw(&politica()).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title.as_deref(), Some("Reforma"));
    }

    #[tokio::test]
    async fn test_fetch_legacy_shape() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/trends"))
            .and(query_param("categoria", "14"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"[{"title": "Orçamento", "data_volume": "20K+"}]"#),
            )
            .mount(&server)
            .await;

        let client =
            ProviderClient::new(reqwest::Client::new(), &config_for(&server, ApiShape::Legacy))
                .unwrap();
        let items = client.fetch_raw(&politica()).await.unwrap();
        assert_eq!(items[0].data_volume.as_deref(), Some("20K+"));
    }

    #[tokio::test]
    async fn test_bearer_token_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("authorization", "Bearer k-123"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"trends": []}"#))
            .expect(1)
            .mount(&server)
            .await;

        let config = ProviderConfig {
            api_key: Some("k-123".into()),
            ..config_for(&server, ApiShape::Current)
        };
        let client = ProviderClient::new(reqwest::Client::new(), &config).unwrap();
        assert!(client.fetch_raw(&politica()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_server_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let client =
            ProviderClient::new(reqwest::Client::new(), &config_for(&server, ApiShape::Current))
                .unwrap();
        let err = client.fetch_raw(&politica()).await.unwrap_err();
        assert!(matches!(err, RequestError::HttpStatus(503)));
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client =
            ProviderClient::new(reqwest::Client::new(), &config_for(&server, ApiShape::Current))
                .unwrap();
        let err = client.fetch_raw(&politica()).await.unwrap_err();
        assert!(matches!(err, RequestError::Malformed(_)));
        assert!(!err.is_unavailable());
    }

    #[tokio::test]
    async fn test_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"trends": []}"#)
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let config = ProviderConfig {
            timeout_secs: 1,
            ..config_for(&server, ApiShape::Current)
        };
        let client = ProviderClient::new(reqwest::Client::new(), &config).unwrap();
        let err = client.fetch_raw(&politica()).await.unwrap_err();
        assert!(matches!(err, RequestError::Timeout(1)));
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(MAX_RESPONSE_SIZE + 1)))
            .mount(&server)
            .await;

        let client =
            ProviderClient::new(reqwest::Client::new(), &config_for(&server, ApiShape::Current))
                .unwrap();
        let err = client.fetch_raw(&politica()).await.unwrap_err();
        assert!(matches!(err, RequestError::ResponseTooLarge(_)));
    }
}
