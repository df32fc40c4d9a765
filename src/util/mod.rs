//! Utility functions shared by the fetch, parse and discovery layers.
//!
//! - **Text**: HTML stripping, char-bounded truncation, control-char removal
//! - **URLs**: SSRF validation, site/favicon derivation, relative URL resolution
//!
//! # Examples
//!
//! ```
//! use feedscout::util::{sanitize, site_base_url, validate_url};
//!
//! let url = validate_url("https://example.com/feed.xml").unwrap();
//! assert_eq!(site_base_url(url.as_str()), "https://example.com");
//!
//! assert_eq!(sanitize("<p>Hello <em>there</em></p>", 5), "Hello");
//! ```

mod text;
mod links;

pub use text::{sanitize, strip_control_chars, strip_html, truncate_chars};
pub use links::{
    favicon_for_domain, favicon_url, host_of, resolve_url, site_base_url, validate_url,
    UrlValidationError,
};
