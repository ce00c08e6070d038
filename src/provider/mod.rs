//! Client side of the external trends provider.
//!
//! - [`client`] performs the HTTP call (`GET trends`) with a timeout and a
//!   bounded body read
//! - [`payload`] decodes both response generations into [`RawTrend`] items
//!
//! # Example
//!
//! ```ignore
//! let client = ProviderClient::new(reqwest::Client::new(), &config.provider)?;
//! let items = client.fetch_raw(&category).await?;
//! ```

mod client;
mod payload;

pub use client::{ProviderClient, ProviderError, RequestError};
pub use payload::{parse_response, RawTrend};
