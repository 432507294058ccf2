//! Schema resolution: loads documents, walks `$ref` chains and classifies
//! chain segments into declarations.
//!
//! Every node lives in an arena addressed by a stable index. Two indexes, by
//! retrieval URL and by canonical URL, point into the same arena slot, so a
//! node reached through either identity is the same node.
//!
//! # Example
//!
//! ```no_run
//! use schema_idl::Resolver;
//!
//! let mut resolver = Resolver::new();
//! let pet = resolver.resolve("schemas/pet.json", None)?;
//! let schema = resolver.schema(pet);
//! assert!(schema.is_declaration);
//! # Ok::<(), schema_idl::ResolveError>(())
//! ```

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::document::SourceDocument;
use crate::error::ResolveError;
use crate::loader::{DefaultLoader, SourceLoader};
use crate::refset::RefSet;
use crate::types::{
    escape_pointer_token, fragment_pointer, join_url, location_to_url, unescape_pointer_token,
    with_pointer, without_fragment, PrimitiveType, SchemaType, SchemaVersion,
};

/// Keywords that give a node enough shape to be emitted as a type.
const SHAPE_KEYWORDS: &[&str] = &["type", "oneOf", "allOf", "anyOf"];

/// Index of a [`ResolvedSchema`] in its resolver. Equal ids are the same node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResolvedId(usize);

/// A location inside a loaded source document.
#[derive(Debug)]
pub struct RawSchema {
    /// URL the node was requested by, fragment included.
    pub retrieval_url: Url,
    /// Identity of the node: the root `$id` (or retrieval URL) plus the fragment.
    pub canonical_url: Url,
    /// Pointer from the document root; empty for the root itself.
    pub json_pointer: String,
    pub content: Value,
    pub document: Rc<SourceDocument>,
    pub version: SchemaVersion,
    pub local_id: Option<String>,
    pub definition_name: Option<String>,
    pub is_root: bool,
    pub is_definition: bool,
}

impl RawSchema {
    fn has_key(&self, key: &str) -> bool {
        self.content.as_object().is_some_and(|o| o.contains_key(key))
    }

    /// Whether this node starts a new named declaration along a `$ref` chain.
    ///
    /// Roots always do. Other nodes need an identifying marker (definition
    /// name, `title` or an id) and some shape to emit.
    pub fn is_declaration_boundary(&self) -> bool {
        if self.is_root {
            return true;
        }
        let identified =
            self.definition_name.is_some() || self.local_id.is_some() || self.has_key("title");
        identified && SHAPE_KEYWORDS.iter().any(|k| self.has_key(k))
    }

    /// The node's own `type` keyword.
    fn own_type(&self) -> Option<SchemaType> {
        self.content.get("type").and_then(SchemaType::from_value)
    }

    /// Type implied by object or array keywords when `type` is absent.
    fn implied_type(&self) -> Option<SchemaType> {
        if ["properties", "required", "additionalProperties"]
            .iter()
            .any(|k| self.has_key(k))
        {
            Some(SchemaType::Single(PrimitiveType::Object))
        } else if ["items", "prefixItems"].iter().any(|k| self.has_key(k)) {
            Some(SchemaType::Single(PrimitiveType::Array))
        } else {
            None
        }
    }
}

/// A raw node after `$ref` chain walking and declaration classification.
#[derive(Debug)]
pub struct ResolvedSchema {
    pub id: ResolvedId,
    pub raw: Rc<RawSchema>,
    /// Nodes reached by following `$ref` from `raw`, in hop order.
    pub refs: Vec<Rc<RawSchema>>,
    /// Layers contributing keywords to this schema, closest first.
    pub ref_set: RefSet,
    /// Next declaration along the `$ref` chain.
    pub referenced_schema: Option<ResolvedId>,
    pub is_declaration: bool,
    /// Own type, else the closest type along the chain.
    pub schema_type: Option<SchemaType>,
}

impl ResolvedSchema {
    pub fn retrieval_url(&self) -> &Url {
        &self.raw.retrieval_url
    }

    pub fn canonical_url(&self) -> &Url {
        &self.raw.canonical_url
    }

    pub fn json_pointer(&self) -> &str {
        &self.raw.json_pointer
    }

    pub fn is_root(&self) -> bool {
        self.raw.is_root
    }

    pub fn is_definition(&self) -> bool {
        self.raw.is_definition
    }

    pub fn definition_name(&self) -> Option<&str> {
        self.raw.definition_name.as_deref()
    }

    pub fn version(&self) -> SchemaVersion {
        self.raw.version
    }
}

/// Resolves references into classified schemas, caching every node for the
/// life of the resolver.
pub struct Resolver {
    loader: Box<dyn SourceLoader>,
    raw: Vec<Rc<RawSchema>>,
    raw_by_retrieval: HashMap<Url, usize>,
    raw_by_canonical: HashMap<Url, usize>,
    resolved: Vec<Rc<ResolvedSchema>>,
    resolved_by_retrieval: HashMap<Url, ResolvedId>,
    resolved_by_canonical: HashMap<Url, ResolvedId>,
    definitions: HashMap<ResolvedId, IndexMap<String, ResolvedId>>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("raw", &self.raw.len())
            .field("resolved", &self.resolved.len())
            .finish()
    }
}

impl Resolver {
    /// Resolver loading local files and, with the `remote` feature, HTTP(S).
    pub fn new() -> Self {
        Self::with_loader(DefaultLoader)
    }

    /// Resolver fetching sources through `loader`.
    pub fn with_loader(loader: impl SourceLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            raw: Vec::new(),
            raw_by_retrieval: HashMap::new(),
            raw_by_canonical: HashMap::new(),
            resolved: Vec::new(),
            resolved_by_retrieval: HashMap::new(),
            resolved_by_canonical: HashMap::new(),
            definitions: HashMap::new(),
        }
    }

    /// Resolve `reference` against `base`. Without a base the reference is a
    /// file path or an absolute URL.
    ///
    /// Resolving the same URL again returns the same id.
    pub fn resolve(
        &mut self,
        reference: &str,
        base: Option<&Url>,
    ) -> Result<ResolvedId, ResolveError> {
        let url = match base {
            Some(base) => join_url(base, reference)?,
            None => location_to_url(reference)?,
        };
        self.resolve_url(&url)
    }

    /// Resolve an absolute URL.
    pub fn resolve_url(&mut self, url: &Url) -> Result<ResolvedId, ResolveError> {
        if let Some(id) = self.resolved_by_retrieval.get(url) {
            return Ok(*id);
        }

        let raw = self.resolve_raw(url)?;
        let refs = self.resolve_schema_references(&raw)?;
        let created = self.create_resolved_schemas(&raw, &refs)?;

        // The walk always ends at `raw`, so `created` is never empty.
        let id = created[created.len() - 1];
        self.resolved_by_retrieval.entry(url.clone()).or_insert(id);
        Ok(id)
    }

    /// Resolve a relative pointer `<originCount>/<path>` (or a plain
    /// `/<path>`) against a resolved schema.
    ///
    /// The origin count selects the layer to anchor at: `0` is the schema's
    /// own node, `n` the n-th layer of its ref set.
    pub fn resolve_relative(
        &mut self,
        origin: ResolvedId,
        relative: &str,
    ) -> Result<ResolvedId, ResolveError> {
        let schema = self.schema(origin);
        let (count, path) = split_relative_pointer(relative).ok_or_else(|| {
            ResolveError::PointerNotFound {
                url: schema.retrieval_url().to_string(),
                pointer: relative.to_string(),
            }
        })?;

        let anchor = if count == 0 {
            Rc::clone(&schema.raw)
        } else {
            schema
                .ref_set
                .layers()
                .get(count)
                .cloned()
                .ok_or_else(|| ResolveError::PointerNotFound {
                    url: schema.retrieval_url().to_string(),
                    pointer: relative.to_string(),
                })?
        };
        self.resolve_in(&anchor, path)
    }

    /// Resolve `path` (a JSON pointer) below a raw node.
    pub fn resolve_in(&mut self, anchor: &RawSchema, path: &str) -> Result<ResolvedId, ResolveError> {
        let pointer = format!("{}{}", anchor.json_pointer, path);
        let url = with_pointer(&without_fragment(&anchor.retrieval_url), &pointer);
        self.resolve_url(&url)
    }

    /// The resolved schema behind `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` was produced by a different resolver.
    pub fn schema(&self, id: ResolvedId) -> Rc<ResolvedSchema> {
        Rc::clone(&self.resolved[id.0])
    }

    /// Definitions of a root declaration, in document order.
    pub fn definitions(&self, id: ResolvedId) -> Vec<(String, ResolvedId)> {
        self.definitions
            .get(&id)
            .map(|defs| defs.iter().map(|(k, v)| (k.clone(), *v)).collect())
            .unwrap_or_default()
    }

    /// Cached schema for a retrieval URL, if already resolved.
    pub fn lookup_retrieval(&self, url: &Url) -> Option<ResolvedId> {
        self.resolved_by_retrieval.get(url).copied()
    }

    /// Cached schema for a canonical URL, if already resolved.
    pub fn lookup_canonical(&self, url: &Url) -> Option<ResolvedId> {
        self.resolved_by_canonical.get(url).copied()
    }

    /// Follow `$ref` from `raw` until a node without one, returning every
    /// node reached (not including `raw`).
    pub fn resolve_schema_references(
        &mut self,
        raw: &Rc<RawSchema>,
    ) -> Result<Vec<Rc<RawSchema>>, ResolveError> {
        let mut chain = Vec::new();
        let mut visited = HashSet::from([raw.canonical_url.clone()]);
        let mut current = Rc::clone(raw);

        while let Some(reference) = current.content.get("$ref").and_then(Value::as_str) {
            let url = join_url(&current.retrieval_url, reference)?;
            let next = self.resolve_raw(&url)?;
            if !visited.insert(next.canonical_url.clone()) {
                return Err(ResolveError::ReferenceCycle {
                    url: url.to_string(),
                });
            }
            chain.push(Rc::clone(&next));
            current = next;
        }

        Ok(chain)
    }

    /// Split a `$ref` chain into declarations.
    ///
    /// The chain is walked from its innermost target outward to `requested`.
    /// Nodes pile up in the current ref set until one is a declaration
    /// boundary; that node becomes a declaration referencing the previous
    /// one. `requested` always closes the walk, as a declaration if it is a
    /// boundary and as a plain schema otherwise. Returned ids run innermost
    /// first, so the last one belongs to `requested`.
    pub fn create_resolved_schemas(
        &mut self,
        requested: &Rc<RawSchema>,
        refs: &[Rc<RawSchema>],
    ) -> Result<Vec<ResolvedId>, ResolveError> {
        let mut chain = Vec::with_capacity(refs.len() + 1);
        chain.push(Rc::clone(requested));
        chain.extend(refs.iter().cloned());

        let mut created = Vec::new();
        let mut pending: Vec<usize> = Vec::new();
        let mut schema_type: Option<SchemaType> = None;
        let mut previous: Option<ResolvedId> = None;

        for index in (0..chain.len()).rev() {
            let node = &chain[index];
            pending.push(index);
            if let Some(own) = node.own_type() {
                schema_type = Some(own);
            } else if schema_type.is_none() {
                schema_type = node.implied_type();
            }

            let is_boundary = node.is_declaration_boundary();
            if is_boundary || index == 0 {
                let id = self.materialize(
                    &chain,
                    &pending,
                    schema_type.clone(),
                    previous,
                    is_boundary,
                )?;
                created.push(id);
                previous = Some(id);
                pending.clear();
            }
        }

        Ok(created)
    }

    /// Build (or fetch from cache) the schema for `pending`, whose last
    /// entry is the node being materialized.
    fn materialize(
        &mut self,
        chain: &[Rc<RawSchema>],
        pending: &[usize],
        schema_type: Option<SchemaType>,
        referenced_schema: Option<ResolvedId>,
        is_declaration: bool,
    ) -> Result<ResolvedId, ResolveError> {
        let index = pending[pending.len() - 1];
        let node = &chain[index];

        if let Some(id) = self
            .resolved_by_retrieval
            .get(&node.retrieval_url)
            .or_else(|| self.resolved_by_canonical.get(&node.canonical_url))
        {
            return Ok(*id);
        }

        let mut ref_set = RefSet::new();
        for &i in pending.iter().rev() {
            ref_set.push(Rc::clone(&chain[i]));
        }

        let id = ResolvedId(self.resolved.len());
        self.resolved.push(Rc::new(ResolvedSchema {
            id,
            raw: Rc::clone(node),
            refs: chain[index + 1..].to_vec(),
            ref_set,
            referenced_schema,
            is_declaration,
            schema_type,
        }));
        self.resolved_by_retrieval
            .entry(node.retrieval_url.clone())
            .or_insert(id);
        self.resolved_by_canonical
            .entry(node.canonical_url.clone())
            .or_insert(id);
        debug!(url = %node.retrieval_url, is_declaration, "materialized schema");

        if node.is_root && is_declaration {
            self.resolve_definitions(id, node)?;
        }

        Ok(id)
    }

    fn resolve_definitions(
        &mut self,
        id: ResolvedId,
        root: &RawSchema,
    ) -> Result<(), ResolveError> {
        let key = root.version.definitions_key();
        let Some(Value::Object(defs)) = root.content.get(key) else {
            return Ok(());
        };

        let mut resolved = IndexMap::new();
        for name in defs.keys() {
            let pointer = format!(
                "/{}/{}",
                escape_pointer_token(key),
                escape_pointer_token(name)
            );
            let def = self.resolve_in(root, &pointer)?;
            resolved.insert(name.clone(), def);
        }
        self.definitions.insert(id, resolved);
        Ok(())
    }

    fn cached_raw(&self, url: &Url) -> Option<Rc<RawSchema>> {
        self.raw_by_retrieval
            .get(url)
            .or_else(|| self.raw_by_canonical.get(url))
            .map(|&i| Rc::clone(&self.raw[i]))
    }

    fn register_raw(&mut self, raw: RawSchema) -> Rc<RawSchema> {
        let index = self.raw.len();
        self.raw_by_retrieval
            .entry(raw.retrieval_url.clone())
            .or_insert(index);
        self.raw_by_canonical
            .entry(raw.canonical_url.clone())
            .or_insert(index);
        let raw = Rc::new(raw);
        self.raw.push(Rc::clone(&raw));
        raw
    }

    fn alias_raw(&mut self, url: &Url, raw: &RawSchema) {
        if let Some(&index) = self.raw_by_canonical.get(&raw.canonical_url) {
            self.raw_by_retrieval.entry(url.clone()).or_insert(index);
        }
    }

    /// Raw node for a URL, loading its document at most once.
    fn resolve_raw(&mut self, url: &Url) -> Result<Rc<RawSchema>, ResolveError> {
        if let Some(raw) = self.cached_raw(url) {
            return Ok(raw);
        }

        let root = self.resolve_root(&without_fragment(url))?;
        let pointer = fragment_pointer(url);
        if pointer.is_empty() {
            self.alias_raw(url, &root);
            return Ok(root);
        }

        let canonical_url = with_pointer(&root.canonical_url, &pointer);
        if let Some(raw) = self.cached_raw(&canonical_url) {
            self.alias_raw(url, &raw);
            return Ok(raw);
        }

        let content = root
            .content
            .pointer(&pointer)
            .cloned()
            .ok_or_else(|| ResolveError::PointerNotFound {
                url: url.to_string(),
                pointer: pointer.clone(),
            })?;

        let definition_name = definition_name(&pointer, root.version);
        let local_id = content
            .get(root.version.id_key())
            .and_then(Value::as_str)
            .map(String::from);

        Ok(self.register_raw(RawSchema {
            retrieval_url: url.clone(),
            canonical_url,
            json_pointer: pointer,
            content,
            document: Rc::clone(&root.document),
            version: root.version,
            local_id,
            is_definition: definition_name.is_some(),
            definition_name,
            is_root: false,
        }))
    }

    /// Root node of the document at `url` (which has no fragment).
    fn resolve_root(&mut self, url: &Url) -> Result<Rc<RawSchema>, ResolveError> {
        if let Some(raw) = self.cached_raw(url) {
            return Ok(raw);
        }

        let source = self.loader.load(url)?;
        let document = Rc::new(SourceDocument::parse(url.clone(), source)?);
        debug!(%url, content_type = %document.content_type, "parsed schema document");

        let version = SchemaVersion::detect(&document.tree);
        let local_id = document
            .tree
            .get(version.id_key())
            .and_then(Value::as_str)
            .map(String::from);
        let canonical_url = match &local_id {
            Some(id) => without_fragment(&join_url(url, id)?),
            None => url.clone(),
        };

        Ok(self.register_raw(RawSchema {
            retrieval_url: url.clone(),
            canonical_url,
            json_pointer: String::new(),
            content: document.tree.clone(),
            document,
            version,
            local_id,
            definition_name: None,
            is_root: true,
            is_definition: false,
        }))
    }
}

/// Definition name for pointers of the exact shape `/<definitions key>/<name>`.
fn definition_name(pointer: &str, version: SchemaVersion) -> Option<String> {
    let mut segments = pointer.strip_prefix('/')?.split('/');
    let (container, name) = (segments.next()?, segments.next()?);
    if segments.next().is_some() || unescape_pointer_token(container) != version.definitions_key() {
        return None;
    }
    Some(unescape_pointer_token(name))
}

/// Split `<originCount>/<path>` into its parts. A bare `/<path>` has count 0.
fn split_relative_pointer(relative: &str) -> Option<(usize, &str)> {
    if relative.is_empty() || relative.starts_with('/') {
        return Some((0, relative));
    }
    let split = relative.find('/').unwrap_or(relative.len());
    let count = relative[..split].parse().ok()?;
    Some((count, &relative[split..]))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    /// Standalone raw node for unit tests.
    pub(crate) fn raw_node(url: &str, content: Value) -> Rc<RawSchema> {
        let url = Url::parse(url).unwrap();
        let document = Rc::new(SourceDocument {
            url: without_fragment(&url),
            content: Vec::new(),
            content_type: "application/json".into(),
            tree: content.clone(),
        });
        Rc::new(RawSchema {
            retrieval_url: url.clone(),
            canonical_url: url.clone(),
            json_pointer: fragment_pointer(&url),
            content,
            document,
            version: SchemaVersion::default(),
            local_id: None,
            definition_name: None,
            is_root: false,
            is_definition: false,
        })
    }

    #[test]
    fn definition_name_only_for_direct_children() {
        assert_eq!(
            definition_name("/$defs/Pet", SchemaVersion::Draft2020_12),
            Some("Pet".to_string())
        );
        assert_eq!(
            definition_name("/definitions/a~1b", SchemaVersion::Draft07),
            Some("a/b".to_string())
        );
        assert_eq!(definition_name("/$defs/Pet", SchemaVersion::Draft07), None);
        assert_eq!(
            definition_name("/$defs/Pet/properties", SchemaVersion::Draft2020_12),
            None
        );
        assert_eq!(definition_name("/properties/x", SchemaVersion::Draft2020_12), None);
    }

    #[test]
    fn relative_pointer_split() {
        assert_eq!(split_relative_pointer("0/properties/x"), Some((0, "/properties/x")));
        assert_eq!(split_relative_pointer("/properties/x"), Some((0, "/properties/x")));
        assert_eq!(split_relative_pointer("2/items"), Some((2, "/items")));
        assert_eq!(split_relative_pointer("0"), Some((0, "")));
        assert_eq!(split_relative_pointer("x/items"), None);
    }

    #[test]
    fn boundary_needs_marker_and_shape() {
        let mut raw = Rc::try_unwrap(raw_node(
            "file:///a.json#/properties/x",
            json!({ "title": "X", "type": "string" }),
        ))
        .unwrap();
        assert!(raw.is_declaration_boundary());

        raw.content = json!({ "title": "X", "description": "no shape" });
        assert!(!raw.is_declaration_boundary());

        raw.content = json!({ "type": "string" });
        assert!(!raw.is_declaration_boundary());

        raw.definition_name = Some("X".into());
        raw.content = json!({ "oneOf": [] });
        assert!(raw.is_declaration_boundary());

        raw.definition_name = None;
        raw.content = json!({});
        raw.is_root = true;
        assert!(raw.is_declaration_boundary());
    }
}
