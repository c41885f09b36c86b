use std::net::{Ipv4Addr, Ipv6Addr};
use thiserror::Error;
use url::{Host, Url};

/// Reasons a feed URL is refused by `addfeed`.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),

    #[error("URL has no host")]
    MissingHost,

    #[error("Localhost not allowed")]
    Localhost,

    #[error("Private IP address not allowed: {0}")]
    PrivateIp(String),
}

/// Check that `raw` is an http(s) URL pointing at a public host.
///
/// Loopback, private, link-local and unspecified addresses are rejected so
/// that `gator agg` cannot be turned against the local network. Hostnames
/// are not resolved.
pub fn validate_feed_url(raw: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(raw.trim())?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    match url.host() {
        None => return Err(UrlValidationError::MissingHost),
        Some(Host::Domain(domain)) => {
            let domain = domain.trim_end_matches('.').to_ascii_lowercase();
            if domain == "localhost" || domain.ends_with(".localhost") {
                return Err(UrlValidationError::Localhost);
            }
        }
        Some(Host::Ipv4(ip)) => check_v4(ip)?,
        Some(Host::Ipv6(ip)) => match ip.to_ipv4_mapped() {
            Some(v4) => check_v4(v4)?,
            None => check_v6(ip)?,
        },
    }

    Ok(url)
}

fn check_v4(ip: Ipv4Addr) -> Result<(), UrlValidationError> {
    if ip.is_loopback() {
        return Err(UrlValidationError::Localhost);
    }
    if ip.is_private() || ip.is_link_local() || ip.is_unspecified() {
        return Err(UrlValidationError::PrivateIp(ip.to_string()));
    }
    Ok(())
}

fn check_v6(ip: Ipv6Addr) -> Result<(), UrlValidationError> {
    if ip.is_loopback() {
        return Err(UrlValidationError::Localhost);
    }
    let first = ip.segments()[0];
    // fc00::/7 unique local, fe80::/10 link-local
    if ip.is_unspecified() || (first & 0xfe00) == 0xfc00 || (first & 0xffc0) == 0xfe80 {
        return Err(UrlValidationError::PrivateIp(ip.to_string()));
    }
    Ok(())
}
