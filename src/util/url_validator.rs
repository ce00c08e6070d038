use std::net::IpAddr;
use thiserror::Error;
use url::Url;

/// Errors raised while validating the trends provider base URL.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// Plain HTTP is only accepted for loopback hosts.
    #[error("Insecure base URL: HTTPS required (except localhost)")]
    Insecure,
    #[error("Base URL must not carry a query string or fragment")]
    UnexpectedQuery,
}

/// Validates and normalizes the base URL of the trends provider.
///
/// - `https` is always accepted
/// - `http` is accepted only for `localhost` and loopback addresses
/// - the returned URL path always ends with `/`, so joining `trends`
///   appends a segment instead of replacing the last one
///
/// # Examples
///
/// ```
/// use radar::util::validate_base_url;
///
/// let url = validate_base_url("https://api.example.com/v1").unwrap();
/// assert_eq!(url.as_str(), "https://api.example.com/v1/");
///
/// assert!(validate_base_url("http://api.example.com").is_err());
/// assert!(validate_base_url("http://127.0.0.1:8080").is_ok());
/// ```
pub fn validate_base_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let mut url = Url::parse(url_str.trim())?;

    match url.scheme() {
        "https" => {}
        "http" => {
            if !is_loopback_host(&url) {
                return Err(UrlValidationError::Insecure);
            }
            tracing::warn!(base_url = %url, "Using non-HTTPS provider base URL (loopback only)");
        }
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    if url.query().is_some() || url.fragment().is_some() {
        return Err(UrlValidationError::UnexpectedQuery);
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

fn is_loopback_host(url: &Url) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    if host == "localhost" {
        return true;
    }
    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    host.parse::<IpAddr>().is_ok_and(|ip| ip.is_loopback())
}
