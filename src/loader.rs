//! Source loading from local files and HTTP URLs.
//!
//! A loader only fetches bytes and reports a content type; parsing is the
//! job of [`crate::document`].

use std::path::Path;

use tracing::debug;
use url::Url;

use crate::error::ResolveError;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Raw bytes of one retrieval URL plus the content type they were served as.
#[derive(Debug, Clone)]
pub struct LoadedSource {
    pub content: Vec<u8>,
    pub content_type: String,
}

/// Fetches the bytes behind an absolute URL.
pub trait SourceLoader {
    /// Load `url`, which never carries a fragment.
    fn load(&self, url: &Url) -> Result<LoadedSource, ResolveError>;
}

/// Loader for `file:` URLs and, with the `remote` feature, `http(s):` URLs.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultLoader;

impl SourceLoader for DefaultLoader {
    fn load(&self, url: &Url) -> Result<LoadedSource, ResolveError> {
        match url.scheme() {
            "file" => load_file(url),
            #[cfg(feature = "remote")]
            "http" | "https" => load_http(url),
            scheme => Err(ResolveError::UnsupportedScheme {
                url: url.to_string(),
                scheme: scheme.to_string(),
            }),
        }
    }
}

/// Load a local schema file.
///
/// # Errors
///
/// Returns `ResolveError::FileNotFound` if the file doesn't exist, or
/// `ResolveError::UnknownContentType` if its extension is not JSON or YAML.
pub fn load_file(url: &Url) -> Result<LoadedSource, ResolveError> {
    let path = url.to_file_path().map_err(|()| ResolveError::InvalidPath {
        path: url.path().into(),
    })?;
    if !path.exists() {
        return Err(ResolveError::FileNotFound { path });
    }

    let content_type = content_type_for_path(url.path()).ok_or_else(|| {
        ResolveError::UnknownContentType {
            url: url.to_string(),
        }
    })?;

    let content = std::fs::read(&path).map_err(|source| ResolveError::ReadError {
        path: path.clone(),
        source,
    })?;
    debug!(path = %path.display(), bytes = content.len(), "loaded schema file");

    Ok(LoadedSource {
        content,
        content_type: content_type.to_string(),
    })
}

/// Load a schema from an HTTP/HTTPS URL.
///
/// Requires the `remote` feature (enabled by default). The response's
/// `Content-Type` wins; without one the URL's extension decides.
///
/// # Errors
///
/// Returns `ResolveError::NetworkError` if the request fails or the server
/// answers with an error status.
#[cfg(feature = "remote")]
pub fn load_http(url: &Url) -> Result<LoadedSource, ResolveError> {
    let network_error = |source| ResolveError::NetworkError {
        url: url.to_string(),
        source,
    };

    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(network_error)?;

    let response = client
        .get(url.as_str())
        .send()
        .map_err(network_error)?
        .error_for_status()
        .map_err(network_error)?;

    let header = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let content_type = header
        .or_else(|| content_type_for_path(url.path()).map(String::from))
        .ok_or_else(|| ResolveError::UnknownContentType {
            url: url.to_string(),
        })?;

    let content = response.bytes().map_err(network_error)?.to_vec();
    debug!(%url, bytes = content.len(), %content_type, "fetched schema");

    Ok(LoadedSource {
        content,
        content_type,
    })
}

/// Guess a media type from a path's extension.
pub fn content_type_for_path(path: &str) -> Option<&'static str> {
    let extension = Path::new(path).extension()?.to_str()?;
    match extension.to_ascii_lowercase().as_str() {
        "json" => Some("application/json"),
        "yaml" | "yml" => Some("application/yaml"),
        _ => None,
    }
}
