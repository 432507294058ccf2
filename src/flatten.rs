//! `allOf` composition: deciding between inheritance, spread and inline merge.

use std::collections::HashSet;

use serde_json::Value;

use crate::error::ResolveError;
use crate::resolver::{ResolvedId, Resolver};

/// Keywords that carry no shape of their own when sitting next to `allOf`.
const NON_SHAPE_KEYWORDS: &[&str] = &[
    "allOf",
    "$ref",
    "$schema",
    "$id",
    "id",
    "$anchor",
    "$comment",
    "$defs",
    "definitions",
    "title",
    "description",
    "examples",
    "default",
    "type",
];

/// Result of [`flatten_all_ofs`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Flattened {
    /// Schemas whose keywords merge inline.
    pub schemas: Vec<ResolvedId>,
    /// Declarations that can be spread in (or extended) by name.
    pub references: Vec<ResolvedId>,
}

impl Flattened {
    fn extend(&mut self, other: Flattened) {
        for id in other.schemas {
            if !self.schemas.contains(&id) {
                self.schemas.push(id);
            }
        }
        for id in other.references {
            if !self.references.contains(&id) {
                self.references.push(id);
            }
        }
    }
}

/// How an object declaration is assembled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Composition {
    /// Declaration extended with `extends`.
    pub base: Option<ResolvedId>,
    /// Declarations spread in with `...Name`.
    pub spreads: Vec<ResolvedId>,
    /// Schemas whose properties are written out inline.
    pub schemas: Vec<ResolvedId>,
}

/// Split a schema's `allOf` branches (and its own referenced declaration)
/// into inline schemas and named references, recursively.
pub fn flatten_all_ofs(resolver: &mut Resolver, id: ResolvedId) -> Result<Flattened, ResolveError> {
    let schema = resolver.schema(id);
    let mut flattened = Flattened::default();

    if let Some(referenced) = schema.referenced_schema {
        flattened.references.push(referenced);
    }
    if schema
        .ref_set
        .keys()
        .iter()
        .any(|k| !NON_SHAPE_KEYWORDS.contains(k))
    {
        flattened.schemas.push(id);
    }

    for layer in schema.ref_set.matches("allOf") {
        let Value::Array(branches) = layer.value else {
            continue;
        };
        for index in 0..branches.len() {
            let branch = resolver.resolve_in(layer.schema, &format!("/allOf/{}", index))?;
            if resolver.schema(branch).is_declaration {
                flattened.extend(Flattened {
                    schemas: Vec::new(),
                    references: vec![branch],
                });
            } else {
                let nested = flatten_all_ofs(resolver, branch)?;
                flattened.extend(nested);
            }
        }
    }

    Ok(flattened)
}

/// Plan an object declaration.
///
/// References stay named unless any participating schema, however deep in
/// the composition, declares `required`; then everything is merged inline so
/// the `required` list can reach properties from every branch.
pub fn compose(resolver: &mut Resolver, id: ResolvedId) -> Result<Composition, ResolveError> {
    let flattened = flatten_all_ofs(resolver, id)?;

    let mut participants = Vec::new();
    let mut visited = HashSet::from([id]);
    expand(resolver, id, &mut participants, &mut visited)?;

    let requires = participants
        .iter()
        .any(|p| resolver.schema(*p).ref_set.has("required"));
    if requires {
        return Ok(Composition {
            base: None,
            spreads: Vec::new(),
            schemas: participants,
        });
    }

    let own = resolver.schema(id).referenced_schema;
    let base = own.filter(|b| flattened.references.first() == Some(b));
    let spreads = flattened
        .references
        .into_iter()
        .filter(|r| Some(*r) != base)
        .collect();

    Ok(Composition {
        base,
        spreads,
        schemas: flattened.schemas,
    })
}

/// Every schema taking part in `id`'s composition, references expanded.
fn expand(
    resolver: &mut Resolver,
    id: ResolvedId,
    participants: &mut Vec<ResolvedId>,
    visited: &mut HashSet<ResolvedId>,
) -> Result<(), ResolveError> {
    let flattened = flatten_all_ofs(resolver, id)?;
    for schema in flattened.schemas {
        visited.insert(schema);
        if !participants.contains(&schema) {
            participants.push(schema);
        }
    }
    for reference in flattened.references {
        if visited.insert(reference) {
            expand(resolver, reference, participants, visited)?;
        }
    }
    Ok(())
}
