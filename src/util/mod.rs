//! Small shared helpers.
//!
//! - **Text**: control-character stripping and display-width truncation for
//!   anything that reaches the terminal
//! - **URL validation**: checks on the trends provider base URL

mod text;
mod url_validator;

pub use text::{clean_text, display_width, strip_control_chars, truncate_to_width};
pub use url_validator::{validate_base_url, UrlValidationError};
