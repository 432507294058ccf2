//! Error types for schema resolution and TypeSpec emission.

use std::path::PathBuf;
use thiserror::Error;

/// Errors while loading, parsing, or resolving schema references.
#[derive(Debug, Error)]
pub enum ResolveError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Source errors (exit code 2)
    #[error("unsupported URL scheme \"{scheme}\" in {url}")]
    UnsupportedScheme { url: String, scheme: String },

    #[error("cannot determine content type of {url}")]
    UnknownContentType { url: String },

    #[error("unsupported content type \"{content_type}\" for {url}")]
    UnsupportedContentType { url: String, content_type: String },

    #[error("invalid JSON in {url}: {source}")]
    InvalidJson {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid YAML in {url}: {source}")]
    InvalidYaml {
        url: String,
        #[source]
        source: serde_yaml::Error,
    },

    // Reference errors (exit code 2)
    #[error("cannot turn {path} into a file URL")]
    InvalidPath { path: PathBuf },

    #[error("invalid reference \"{reference}\": {source}")]
    InvalidReference {
        reference: String,
        #[source]
        source: url::ParseError,
    },

    #[error("JSON pointer \"{pointer}\" does not resolve in {url}")]
    PointerNotFound { url: String, pointer: String },

    #[error("reference cycle detected at {url}")]
    ReferenceCycle { url: String },
}

impl ResolveError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ResolveError::FileNotFound { .. } | ResolveError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            ResolveError::NetworkError { .. } => 3,
            _ => 2,
        }
    }
}

/// Errors while emitting TypeSpec from resolved schemas.
#[derive(Debug, Error)]
pub enum EmitError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("cannot infer a type for {url}")]
    NoInferableType { url: String },

    #[error("formatting failed: {message}")]
    Format { message: String },
}

impl EmitError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            EmitError::Resolve(e) => e.exit_code(),
            _ => 2,
        }
    }

    /// Whether the error must abort the whole run rather than degrade a
    /// single declaration.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EmitError::Resolve(_) | EmitError::Format { .. })
    }
}
