//! Fetching the shared server list from an HTTP(S) URL.

use crate::format::{self, Format};
use crate::server::Server;
use crate::{Result, SshyError};
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, info};

/// Fixed timeout for the whole request, including reading the body.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Raw payload of a successful fetch.
#[derive(Debug, Clone, Default)]
pub struct RemoteDocument {
    pub body: Vec<u8>,
    pub content_type: Option<String>,
}

impl RemoteDocument {
    /// Resolve the payload's format: content sniffing first, then the
    /// `Content-Type` header, then the URL path suffix, then YAML.
    pub fn format(&self, source_url: &str) -> Format {
        format::resolve(&[
            format::detect_by_content(&self.body),
            self.content_type.as_deref().map_or(Format::Unknown, format::detect_by_content_type),
            format::detect_by_url_path(source_url),
        ])
    }
}

/// True for non-empty strings starting with `http://` or `https://`,
/// ignoring case.
pub fn is_url(s: &str) -> bool {
    let lower = s.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Check that `raw` is an absolute http(s) URL with a host.
///
/// # Errors
///
/// Returns [`SshyError::Validation`] describing the first problem found.
pub fn validate_url(raw: &str) -> Result<url::Url> {
    if raw.is_empty() {
        return Err(SshyError::Validation("URL cannot be empty".to_string()));
    }

    let parsed = url::Url::parse(raw)
        .map_err(|e| SshyError::Validation(format!("invalid URL: {e}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(SshyError::Validation("URL must use http or https scheme".to_string()));
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(SshyError::Validation("URL must have a host".to_string()));
    }

    Ok(parsed)
}

/// Perform a GET against `raw_url` with [`HTTP_TIMEOUT`].
///
/// # Errors
///
/// - [`SshyError::Validation`] if the URL is not acceptable
/// - [`SshyError::Network`] on transport failure, a non-200 status, or a body
///   read failure
pub fn fetch(raw_url: &str) -> Result<RemoteDocument> {
    let parsed = validate_url(raw_url)?;

    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|e| SshyError::Network(format!("failed to build HTTP client: {e}")))?;

    debug!(url = %parsed, "fetching shared servers");
    let response = client
        .get(parsed)
        .send()
        .map_err(|e| SshyError::Network(format!("failed to fetch from URL: {e}")))?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(SshyError::Network(format!("server returned status {}", status.as_u16())));
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let body = response
        .bytes()
        .map_err(|e| SshyError::Network(format!("failed to read response body: {e}")))?
        .to_vec();

    info!(url = raw_url, bytes = body.len(), "fetched shared servers");
    Ok(RemoteDocument { body, content_type })
}

/// Fetch and parse a shared server list. An empty body is an empty list.
///
/// # Errors
///
/// Everything [`fetch`] returns, plus [`SshyError::Parse`] for a body that
/// is not a server list in the resolved format.
pub fn fetch_servers(raw_url: &str) -> Result<Vec<Server>> {
    let document = fetch(raw_url)?;
    if document.body.is_empty() {
        return Ok(Vec::new());
    }

    let format = document.format(raw_url);
    debug!(%format, "resolved remote format");
    format::deserialize(&document.body, format).map_err(|e| match e {
        SshyError::Parse(msg) => SshyError::Parse(format!("failed to parse servers data: {msg}")),
        other => other,
    })
}
