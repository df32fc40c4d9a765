use std::net::IpAddr;
use thiserror::Error;
use url::Url;

/// Favicon service used for every site icon.
const FAVICON_SERVICE: &str = "https://www.google.com/s2/favicons";

/// Errors returned by [`validate_url`].
#[derive(Error, Debug)]
pub enum UrlValidationError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    #[error("Private IP address not allowed: {0}")]
    PrivateIp(String),
    #[error("Localhost not allowed")]
    Localhost,
}

/// Validates a user-supplied feed URL before it is fetched.
///
/// Rejects non-HTTP(S) schemes, localhost, and private/link-local addresses
/// so that feed lookups cannot be aimed at internal services.
///
/// # Examples
///
/// ```
/// use feedscout::util::validate_url;
///
/// assert!(validate_url("https://example.com/feed.xml").is_ok());
/// assert!(validate_url("http://localhost/feed").is_err());
/// assert!(validate_url("http://192.168.1.1/feed").is_err());
/// assert!(validate_url("file:///etc/passwd").is_err());
/// ```
pub fn validate_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str)?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    match url.host() {
        Some(url::Host::Domain(host)) if host.eq_ignore_ascii_case("localhost") => {
            return Err(UrlValidationError::Localhost)
        }
        Some(url::Host::Ipv4(ip)) => check_ip(IpAddr::V4(ip))?,
        Some(url::Host::Ipv6(ip)) => check_ip(IpAddr::V6(ip))?,
        _ => {}
    }

    Ok(url)
}

fn check_ip(ip: IpAddr) -> Result<(), UrlValidationError> {
    if ip.is_loopback() {
        return Err(UrlValidationError::Localhost);
    }

    let private = match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_link_local() || v4.is_unspecified(),
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            // fc00::/7 unique local, fe80::/10 link local
            v6.is_unspecified() || (first & 0xfe00) == 0xfc00 || (first & 0xffc0) == 0xfe80
        }
    };

    if private {
        return Err(UrlValidationError::PrivateIp(ip.to_string()));
    }
    Ok(())
}

/// Returns the host of a URL, or `None` when it does not parse or has no host.
pub fn host_of(url_str: &str) -> Option<String> {
    Url::parse(url_str)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
}

/// Reduces a URL to `scheme://host[:port]`.
///
/// Falls back to the input unchanged when it cannot be parsed.
///
/// # Examples
///
/// ```
/// use feedscout::util::site_base_url;
///
/// assert_eq!(site_base_url("https://blog.example.com/posts/1?x=y"), "https://blog.example.com");
/// assert_eq!(site_base_url("not a url"), "not a url");
/// ```
pub fn site_base_url(url_str: &str) -> String {
    match Url::parse(url_str) {
        Ok(url) if url.has_host() => {
            let origin = url.origin();
            if origin.is_tuple() {
                origin.ascii_serialization()
            } else {
                url_str.to_owned()
            }
        }
        _ => url_str.to_owned(),
    }
}

/// Builds the favicon URL for a site from its host.
///
/// Returns `None` when the URL has no host.
pub fn favicon_url(site_url: &str) -> Option<String> {
    host_of(site_url).map(|host| favicon_for_domain(&host))
}

/// Builds the favicon URL for a bare domain name.
pub fn favicon_for_domain(domain: &str) -> String {
    format!("{FAVICON_SERVICE}?domain={domain}&sz=64")
}

/// Resolves a potentially relative URL against a base URL.
pub fn resolve_url(href: &str, base_url: &str) -> String {
    let href = href.trim();

    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_owned();
    }

    // SEC-014: Protocol-relative, normalized through the URL parser
    if let Some(rest) = href.strip_prefix("//") {
        if let Ok(parsed) = Url::parse(&format!("https://{rest}")) {
            return parsed.to_string();
        }
    }

    Url::parse(base_url)
        .and_then(|base| base.join(href))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_owned())
}
