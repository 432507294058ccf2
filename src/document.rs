//! Parsing loaded sources into a generic JSON tree.

use serde_json::Value;
use url::Url;

use crate::error::ResolveError;
use crate::loader::LoadedSource;

/// Syntax a source is parsed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    Json,
    Yaml,
}

impl Syntax {
    /// Pick a syntax from a media type, ignoring parameters and case.
    ///
    /// Generic binary and plain-text types fall back to JSON.
    pub fn for_media_type(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            "application/json" | "text/json" | "application/octet-stream" | "text/plain" => {
                Some(Syntax::Json)
            }
            "application/yaml" | "application/x-yaml" | "text/yaml" | "text/x-yaml" => {
                Some(Syntax::Yaml)
            }
            other if other.ends_with("+json") => Some(Syntax::Json),
            other if other.ends_with("+yaml") => Some(Syntax::Yaml),
            _ => None,
        }
    }
}

/// One loaded and parsed retrieval URL. Immutable once built.
#[derive(Debug)]
pub struct SourceDocument {
    pub url: Url,
    pub content: Vec<u8>,
    pub content_type: String,
    pub tree: Value,
}

impl SourceDocument {
    /// Parse `source`, loaded from `url`, into a document.
    pub fn parse(url: Url, source: LoadedSource) -> Result<Self, ResolveError> {
        let tree = parse_tree(&url, &source.content, &source.content_type)?;
        Ok(Self {
            url,
            content: source.content,
            content_type: source.content_type,
            tree,
        })
    }
}

/// Parse bytes with the syntax their content type names.
///
/// # Errors
///
/// Returns `ResolveError::UnsupportedContentType` for media types that are
/// neither JSON nor YAML, or the matching parse error.
pub fn parse_tree(url: &Url, content: &[u8], content_type: &str) -> Result<Value, ResolveError> {
    let syntax =
        Syntax::for_media_type(content_type).ok_or_else(|| ResolveError::UnsupportedContentType {
            url: url.to_string(),
            content_type: content_type.to_string(),
        })?;

    match syntax {
        Syntax::Json => serde_json::from_slice(content).map_err(|source| ResolveError::InvalidJson {
            url: url.to_string(),
            source,
        }),
        Syntax::Yaml => serde_yaml::from_slice(content).map_err(|source| ResolveError::InvalidYaml {
            url: url.to_string(),
            source,
        }),
    }
}
