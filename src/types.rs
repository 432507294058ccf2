//! Core types shared by the resolver and the emitter.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::error::ResolveError;

static DRAFT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"draft-04|draft-06|draft-07|2019-09|2020-12").expect("draft pattern is valid")
});

/// Returns the JSON type name for diagnostics.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// JSON Schema draft a document is written against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SchemaVersion {
    Draft04,
    Draft06,
    Draft07,
    Draft2019_09,
    #[default]
    Draft2020_12,
}

impl SchemaVersion {
    /// Detect the draft from a document's `$schema` keyword.
    ///
    /// Absent or unrecognized values default to 2020-12.
    pub fn detect(document: &Value) -> Self {
        let Some(uri) = document.get("$schema").and_then(Value::as_str) else {
            return Self::default();
        };
        match DRAFT_PATTERN.find(uri).map(|m| m.as_str()) {
            Some("draft-04") => SchemaVersion::Draft04,
            Some("draft-06") => SchemaVersion::Draft06,
            Some("draft-07") => SchemaVersion::Draft07,
            Some("2019-09") => SchemaVersion::Draft2019_09,
            _ => SchemaVersion::Draft2020_12,
        }
    }

    /// Key holding named subschemas.
    pub fn definitions_key(&self) -> &'static str {
        match self {
            SchemaVersion::Draft04 | SchemaVersion::Draft06 | SchemaVersion::Draft07 => {
                "definitions"
            }
            SchemaVersion::Draft2019_09 | SchemaVersion::Draft2020_12 => "$defs",
        }
    }

    /// Key holding a schema's own identifier.
    pub fn id_key(&self) -> &'static str {
        match self {
            SchemaVersion::Draft04 => "id",
            _ => "$id",
        }
    }
}

/// A JSON Schema primitive type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    Null,
    Boolean,
    Object,
    Array,
    Number,
    Integer,
    String,
}

impl PrimitiveType {
    /// The TypeSpec intrinsic a scalar primitive maps to. Objects and
    /// arrays have no intrinsic.
    pub fn intrinsic(&self) -> Option<&'static str> {
        match self {
            PrimitiveType::Null => Some("null"),
            PrimitiveType::Boolean => Some("boolean"),
            PrimitiveType::Number => Some("float64"),
            PrimitiveType::Integer => Some("safeint"),
            PrimitiveType::String => Some("string"),
            PrimitiveType::Object | PrimitiveType::Array => None,
        }
    }
}

/// The `type` keyword: one primitive, or a list of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaType {
    Single(PrimitiveType),
    Union(Vec<PrimitiveType>),
}

impl SchemaType {
    /// Parse a `type` keyword value. Unknown names make the whole value unusable.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(_) => serde_json::from_value(value.clone())
                .ok()
                .map(SchemaType::Single),
            Value::Array(_) => {
                let types: Vec<PrimitiveType> = serde_json::from_value(value.clone()).ok()?;
                match types.as_slice() {
                    [] => None,
                    [single] => Some(SchemaType::Single(*single)),
                    _ => Some(SchemaType::Union(types)),
                }
            }
            _ => None,
        }
    }

    /// The single primitive, if this is not a union.
    pub fn single(&self) -> Option<PrimitiveType> {
        match self {
            SchemaType::Single(t) => Some(*t),
            SchemaType::Union(_) => None,
        }
    }
}

/// Options for TypeSpec emission.
#[derive(Debug, Clone)]
pub struct EmitOptions {
    /// Namespace declared after the imports, if any.
    pub namespace: Option<String>,
    /// Run the pretty-printer over the generated source.
    pub format: bool,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            namespace: None,
            format: true,
        }
    }
}

impl EmitOptions {
    /// Create options with formatting enabled and no namespace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare every type inside `namespace`.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Enable or disable the pretty-printer.
    pub fn format(mut self, format: bool) -> Self {
        self.format = format;
        self
    }
}

/// Turn a CLI location (file path or absolute URL) into an absolute URL.
pub fn location_to_url(location: &str) -> Result<Url, ResolveError> {
    if let Ok(url) = Url::parse(location) {
        // A single letter scheme is a Windows drive, not a URL.
        if url.scheme().len() > 1 {
            return Ok(normalize(url));
        }
    }

    let path = Path::new(location);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|source| ResolveError::ReadError {
                path: path.to_path_buf(),
                source,
            })?
            .join(path)
    };
    Url::from_file_path(&absolute)
        .map(normalize)
        .map_err(|()| ResolveError::InvalidPath { path: absolute })
}

/// Resolve `reference` against `base`, dropping empty fragments so that
/// `a.json#` and `a.json` name the same node.
pub fn join_url(base: &Url, reference: &str) -> Result<Url, ResolveError> {
    base.join(reference)
        .map(normalize)
        .map_err(|source| ResolveError::InvalidReference {
            reference: reference.to_string(),
            source,
        })
}

/// Copy of `url` without its fragment.
pub fn without_fragment(url: &Url) -> Url {
    let mut url = url.clone();
    url.set_fragment(None);
    url
}

/// Decoded JSON pointer carried in the URL fragment. Empty for the root.
pub fn fragment_pointer(url: &Url) -> String {
    match url.fragment() {
        Some(fragment) => urlencoding::decode(fragment)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| fragment.to_string()),
        None => String::new(),
    }
}

/// Copy of `url` with `pointer` as its fragment.
pub fn with_pointer(url: &Url, pointer: &str) -> Url {
    let mut url = url.clone();
    url.set_fragment(Some(pointer));
    normalize(url)
}

/// Escape one reference token for use inside a JSON pointer (RFC 6901).
pub fn escape_pointer_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

/// Unescape one JSON pointer reference token.
pub fn unescape_pointer_token(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

fn normalize(mut url: Url) -> Url {
    if url.fragment() == Some("") {
        url.set_fragment(None);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn detect_version_from_schema_keyword() {
        let doc = json!({ "$schema": "http://json-schema.org/draft-04/schema#" });
        assert_eq!(SchemaVersion::detect(&doc), SchemaVersion::Draft04);

        let doc = json!({ "$schema": "https://json-schema.org/draft/2019-09/schema" });
        assert_eq!(SchemaVersion::detect(&doc), SchemaVersion::Draft2019_09);
    }

    #[test]
    fn detect_version_defaults_to_2020_12() {
        assert_eq!(
            SchemaVersion::detect(&json!({})),
            SchemaVersion::Draft2020_12
        );
        let doc = json!({ "$schema": "https://example.com/custom-meta" });
        assert_eq!(SchemaVersion::detect(&doc), SchemaVersion::Draft2020_12);
    }

    #[test]
    fn version_keys() {
        assert_eq!(SchemaVersion::Draft07.definitions_key(), "definitions");
        assert_eq!(SchemaVersion::Draft2020_12.definitions_key(), "$defs");
        assert_eq!(SchemaVersion::Draft04.id_key(), "id");
        assert_eq!(SchemaVersion::Draft06.id_key(), "$id");
    }

    #[test]
    fn schema_type_parsing() {
        assert_eq!(
            SchemaType::from_value(&json!("string")),
            Some(SchemaType::Single(PrimitiveType::String))
        );
        assert_eq!(
            SchemaType::from_value(&json!(["integer"])),
            Some(SchemaType::Single(PrimitiveType::Integer))
        );
        assert_eq!(
            SchemaType::from_value(&json!(["string", "null"])),
            Some(SchemaType::Union(vec![
                PrimitiveType::String,
                PrimitiveType::Null
            ]))
        );
        assert_eq!(SchemaType::from_value(&json!("decimal")), None);
        assert_eq!(SchemaType::from_value(&json!(42)), None);
    }

    #[test]
    fn primitive_intrinsics() {
        assert_eq!(PrimitiveType::Integer.intrinsic(), Some("safeint"));
        assert_eq!(PrimitiveType::Number.intrinsic(), Some("float64"));
        assert_eq!(PrimitiveType::Object.intrinsic(), None);
    }

    #[test]
    fn join_drops_empty_fragment() {
        let base = Url::parse("file:///schemas/a.json").unwrap();
        let joined = join_url(&base, "b.json#").unwrap();
        assert_eq!(joined.as_str(), "file:///schemas/b.json");
    }

    #[test]
    fn pointer_fragment_round_trip() {
        let base = Url::parse("file:///schemas/a.json").unwrap();
        let url = with_pointer(&base, "/$defs/my thing");
        assert_eq!(fragment_pointer(&url), "/$defs/my thing");
        assert_eq!(without_fragment(&url), base);
    }

    #[test]
    fn pointer_token_escaping() {
        assert_eq!(escape_pointer_token("a/b~c"), "a~1b~0c");
        assert_eq!(unescape_pointer_token("a~1b~0c"), "a/b~c");
    }

    #[test]
    fn location_to_url_accepts_urls_and_paths() {
        let url = location_to_url("https://example.com/s.json").unwrap();
        assert_eq!(url.scheme(), "https");

        let url = location_to_url("/tmp/schema.yaml").unwrap();
        assert_eq!(url.scheme(), "file");
        assert!(url.path().ends_with("/tmp/schema.yaml"));
    }
}
