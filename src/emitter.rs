//! TypeSpec generation from resolved schemas.
//!
//! Declaration schemas become named TypeSpec declarations (models, unions,
//! enums, scalars, aliases); everything else is written inline wherever it
//! is used. Each schema is emitted at most once per [`Emitter`].
//!
//! ```no_run
//! use schema_idl::{EmitOptions, Emitter};
//!
//! let mut emitter = Emitter::new().options(EmitOptions::new().namespace("Pets"));
//! emitter.add_schema("schemas/pet.json")?;
//! print!("{}", emitter.emit()?);
//! # Ok::<(), schema_idl::EmitError>(())
//! ```

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::decorators::{decorate, decorators_for, literal, string_literal};
use crate::error::EmitError;
use crate::flatten::compose;
use crate::format::{BraceFormatter, Formatter};
use crate::refset::RefSet;
use crate::resolver::{RawSchema, ResolvedId, ResolvedSchema, Resolver};
use crate::types::{
    escape_pointer_token, join_url, json_type_name, EmitOptions, PrimitiveType, SchemaType,
};

const HEADER: &str = "import \"@typespec/json-schema\";\n\nusing TypeSpec.JsonSchema;\n\n";

/// Reserved words that must be backticked when used as identifiers.
const KEYWORDS: &[&str] = &[
    "alias", "const", "dec", "else", "enum", "extends", "extern", "false", "fn", "if", "import",
    "init", "interface", "internal", "is", "model", "namespace", "never", "null", "op", "private",
    "projection", "public", "return", "scalar", "sym", "true", "typeof", "union", "unknown",
    "using", "valueof", "void",
];

/// Keywords giving a schema a shape of its own, beyond a bare `$ref`.
const SHAPE_KEYWORDS: &[&str] = &[
    "type",
    "properties",
    "additionalProperties",
    "patternProperties",
    "items",
    "prefixItems",
    "enum",
    "const",
    "oneOf",
    "anyOf",
    "allOf",
];

/// How a schema is referred to from generated source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TspType {
    /// A named declaration.
    Declaration { name: String, schema: ResolvedId },
    /// A built-in type such as `string` or `unknown`.
    Intrinsic(&'static str),
    /// An inline type expression.
    Expression(String),
}

impl TspType {
    /// Text used at the point of reference.
    pub fn reference(&self) -> &str {
        match self {
            TspType::Declaration { name, .. } => name,
            TspType::Intrinsic(name) => name,
            TspType::Expression(expression) => expression,
        }
    }

    /// Reference safe to use as an array element or union member.
    fn operand(&self) -> String {
        match self {
            TspType::Expression(e) if e.contains(" | ") => format!("({})", e),
            other => other.reference().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnionKind {
    OneOf,
    AnyOf,
}

impl UnionKind {
    fn of(ref_set: &RefSet) -> Option<Self> {
        if ref_set.has("oneOf") {
            Some(UnionKind::OneOf)
        } else if ref_set.has("anyOf") {
            Some(UnionKind::AnyOf)
        } else {
            None
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            UnionKind::OneOf => "oneOf",
            UnionKind::AnyOf => "anyOf",
        }
    }
}

enum ArrayShape {
    List(String),
    Tuple { elements: String, open: bool },
}

/// Accumulates declarations for a set of root schemas and renders them as
/// one TypeSpec source file.
pub struct Emitter {
    resolver: Resolver,
    options: EmitOptions,
    formatter: Box<dyn Formatter>,
    roots: IndexMap<ResolvedId, Option<String>>,
    cache: HashMap<ResolvedId, TspType>,
    expanding: HashSet<ResolvedId>,
    declarations: Vec<String>,
    names: HashSet<String>,
    anonymous: usize,
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Emitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("resolver", &self.resolver)
            .field("options", &self.options)
            .field("roots", &self.roots.len())
            .field("declarations", &self.declarations.len())
            .finish()
    }
}

impl Emitter {
    /// Emitter with a default resolver and options.
    pub fn new() -> Self {
        Self::with_resolver(Resolver::new())
    }

    /// Emitter drawing schemas from `resolver`.
    pub fn with_resolver(resolver: Resolver) -> Self {
        Self {
            resolver,
            options: EmitOptions::default(),
            formatter: Box::new(BraceFormatter::default()),
            roots: IndexMap::new(),
            cache: HashMap::new(),
            expanding: HashSet::new(),
            declarations: Vec::new(),
            names: HashSet::new(),
            anonymous: 0,
        }
    }

    pub fn options(mut self, options: EmitOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the pretty-printer used when formatting is enabled.
    pub fn formatter(mut self, formatter: impl Formatter + 'static) -> Self {
        self.formatter = Box::new(formatter);
        self
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn resolver_mut(&mut self) -> &mut Resolver {
        &mut self.resolver
    }

    /// Register the schema at `location` (a path or URL) and all of its
    /// definitions for emission.
    pub fn add_schema(&mut self, location: &str) -> Result<ResolvedId, EmitError> {
        let root = self.resolver.resolve(location, None)?;
        self.add_root(root);
        Ok(root)
    }

    /// Register an absolute URL for emission.
    pub fn add_url(&mut self, url: &Url) -> Result<ResolvedId, EmitError> {
        let root = self.resolver.resolve_url(url)?;
        self.add_root(root);
        Ok(root)
    }

    fn add_root(&mut self, root: ResolvedId) {
        self.roots.entry(root).or_insert(None);
        for (name, definition) in self.resolver.definitions(root) {
            self.roots.entry(definition).or_insert(Some(name));
        }
    }

    /// Generate the source for every registered schema.
    ///
    /// Declarations already produced are reused, so calling this again
    /// yields the same text.
    pub fn emit(&mut self) -> Result<String, EmitError> {
        let roots: Vec<(ResolvedId, Option<String>)> = self
            .roots
            .iter()
            .map(|(id, name)| (*id, name.clone()))
            .collect();
        for (id, name) in roots {
            self.emit_root(id, name.as_deref())?;
        }

        let mut source = String::from(HEADER);
        if let Some(namespace) = &self.options.namespace {
            source.push_str(&format!("@jsonSchema\nnamespace {};\n\n", namespace));
        }
        for declaration in self.declarations.iter().filter(|d| !d.is_empty()) {
            source.push_str(declaration);
            source.push_str("\n\n");
        }

        if self.options.format {
            self.formatter.format(&source)
        } else {
            Ok(source)
        }
    }

    /// The TypeSpec type for a schema, emitting its declaration on first use.
    ///
    /// With `type_override` the schema is emitted inline as if its `type`
    /// were that primitive, bypassing the cache.
    pub fn emit_schema(
        &mut self,
        id: ResolvedId,
        type_override: Option<PrimitiveType>,
    ) -> Result<TspType, EmitError> {
        if type_override.is_none() {
            if let Some(ty) = self.cache.get(&id) {
                return Ok(ty.clone());
            }
        }

        let schema = self.resolver.schema(id);
        if schema.is_declaration && type_override.is_none() {
            return self.emit_declaration(&schema);
        }

        // Overrides re-enter the schema currently being expanded.
        let guarded = type_override.is_none();
        if guarded && !self.expanding.insert(id) {
            warn!(url = %schema.retrieval_url(), "recursive inline schema replaced by unknown");
            return Ok(TspType::Expression(
                "unknown /* recursive inline schema */".to_string(),
            ));
        }
        let result = self.emit_expression(&schema, type_override);
        if guarded {
            self.expanding.remove(&id);
        }

        let ty = result?;
        if type_override.is_none() {
            self.cache.insert(id, ty.clone());
        }
        Ok(ty)
    }

    fn emit_root(&mut self, id: ResolvedId, definition_name: Option<&str>) -> Result<(), EmitError> {
        let schema = self.resolver.schema(id);
        if schema.is_root() && schema.referenced_schema.is_none() && !has_own_shape(&schema.raw) {
            debug!(url = %schema.retrieval_url(), "root without a shape, emitting definitions only");
            return Ok(());
        }
        if schema.is_declaration {
            self.emit_schema(id, None)?;
            return Ok(());
        }
        if matches!(self.cache.get(&id), Some(TspType::Declaration { .. })) {
            return Ok(());
        }
        let Some(definition_name) = definition_name else {
            return Ok(());
        };

        // Named definitions without a shape of their own still get a name.
        let name = self.claim_name(&pascal_case(definition_name));
        let slot = self.reserve_slot();
        self.cache.insert(
            id,
            TspType::Declaration {
                name: name.clone(),
                schema: id,
            },
        );
        let target = self.degrade(id, |emitter| emitter.emit_expression(&schema, None))?;
        self.declarations[slot] = format!(
            "{}{}alias {} = {};",
            doc_comment(&schema.ref_set),
            constraint_comment(&schema.ref_set, &name),
            name,
            target.reference()
        );
        Ok(())
    }

    fn emit_declaration(&mut self, schema: &ResolvedSchema) -> Result<TspType, EmitError> {
        let name = self.declaration_name(schema);
        let ty = TspType::Declaration {
            name: name.clone(),
            schema: schema.id,
        };
        // Registered before the body so recursive references see the name.
        self.cache.insert(schema.id, ty.clone());
        let slot = self.reserve_slot();

        debug!(%name, url = %schema.retrieval_url(), "emitting declaration");
        let text = match self.declaration_body(schema, &name) {
            Ok(text) => text,
            Err(e) if !e.is_fatal() => {
                warn!(%name, url = %schema.retrieval_url(), error = %e, "declaration replaced by placeholder");
                format!(
                    "// Failed to convert {}: {}\nalias {} = unknown;",
                    schema.retrieval_url(),
                    e,
                    name
                )
            }
            Err(e) => return Err(e),
        };
        self.declarations[slot] = text;
        Ok(ty)
    }

    fn declaration_body(&mut self, schema: &ResolvedSchema, name: &str) -> Result<String, EmitError> {
        let ref_set = &schema.ref_set;

        match &schema.raw.content {
            Value::Bool(true) => return Ok(format!("alias {} = unknown;", name)),
            Value::Bool(false) => return Ok(format!("alias {} = never;", name)),
            _ => {}
        }

        if ref_set.has("if") {
            warn!(%name, "if/then/else is not supported");
            return Ok(format!(
                "// Conditional schemas (if/then/else) are not supported.\nalias {} = unknown;",
                name
            ));
        }
        if let Some(kind) = UnionKind::of(ref_set) {
            return self.union_declaration(schema, name, kind);
        }
        if ref_set.has("allOf") {
            return self.model_declaration(schema, name);
        }
        if ref_set.has("enum") || ref_set.has("const") {
            return Ok(enum_declaration(schema, name));
        }

        match &schema.schema_type {
            Some(SchemaType::Union(types)) => {
                let mut members = Vec::new();
                for primitive in types {
                    let ty = self.emit_schema(schema.id, Some(*primitive))?;
                    members.push(format!("{},", ty.operand()));
                }
                Ok(decorate(
                    &decorators_for(ref_set),
                    &block(&format!("union {}", name), &members),
                ))
            }
            Some(SchemaType::Single(PrimitiveType::Object)) => self.model_declaration(schema, name),
            Some(SchemaType::Single(PrimitiveType::Array)) => self.array_declaration(schema, name),
            Some(SchemaType::Single(primitive)) => {
                let base = match schema.referenced_schema {
                    Some(referenced) => self.emit_schema(referenced, None)?.reference().to_string(),
                    None => primitive.intrinsic().unwrap_or("unknown").to_string(),
                };
                Ok(decorate(
                    &decorators_for(ref_set),
                    &format!("scalar {} extends {};", name, base),
                ))
            }
            None => match schema.referenced_schema {
                Some(referenced) => {
                    let target = self.emit_schema(referenced, None)?;
                    Ok(format!(
                        "{}alias {} = {};",
                        doc_comment(ref_set),
                        name,
                        target.reference()
                    ))
                }
                None => Err(EmitError::NoInferableType {
                    url: schema.retrieval_url().to_string(),
                }),
            },
        }
    }

    fn union_declaration(
        &mut self,
        schema: &ResolvedSchema,
        name: &str,
        kind: UnionKind,
    ) -> Result<String, EmitError> {
        let variants = self.union_variants(schema, kind)?;
        let mut used = HashSet::new();
        let members: Vec<String> = variants
            .iter()
            .enumerate()
            .map(|(index, (title, ty))| {
                let mut member = title
                    .as_deref()
                    .map(|t| member_name(&camel_case(t)))
                    .unwrap_or_else(|| format!("variant{}", index));
                if !used.insert(member.clone()) {
                    member = format!("variant{}", index);
                    used.insert(member.clone());
                }
                format!("{}: {},", member, ty.reference())
            })
            .collect();

        let mut decorators = decorators_for(&schema.ref_set);
        if kind == UnionKind::OneOf {
            decorators.push("@oneOf".to_string());
        }
        Ok(decorate(&decorators, &block(&format!("union {}", name), &members)))
    }

    /// Branch types of a `oneOf`/`anyOf`, each with the branch's title.
    fn union_variants(
        &mut self,
        schema: &ResolvedSchema,
        kind: UnionKind,
    ) -> Result<Vec<(Option<String>, TspType)>, EmitError> {
        let keyword = kind.keyword();
        let Some(layer) = schema.ref_set.matches(keyword).into_iter().next() else {
            return Ok(Vec::new());
        };
        let Value::Array(branches) = layer.value else {
            return Ok(Vec::new());
        };

        let anchor = Rc::clone(layer.schema);
        let mut variants = Vec::with_capacity(branches.len());
        for (index, branch) in branches.iter().enumerate() {
            let title = branch.get("title").and_then(Value::as_str).map(String::from);
            let id = self
                .resolver
                .resolve_in(&anchor, &format!("/{}/{}", keyword, index))?;
            let ty = self.degrade(id, |emitter| emitter.emit_schema(id, None))?;
            variants.push((title, ty));
        }
        Ok(variants)
    }

    fn model_declaration(&mut self, schema: &ResolvedSchema, name: &str) -> Result<String, EmitError> {
        let composition = compose(&mut self.resolver, schema.id)?;

        let heritage = match composition.base {
            Some(base) => format!(" extends {}", self.emit_schema(base, None)?.reference()),
            None => String::new(),
        };
        let mut lines = Vec::new();
        for spread in &composition.spreads {
            let ty = self.emit_schema(*spread, None)?;
            lines.push(format!("...{};", ty.reference()));
        }
        lines.extend(self.object_members(&composition.schemas)?);

        Ok(decorate(
            &decorators_for(&schema.ref_set),
            &block(&format!("model {}{}", name, heritage), &lines),
        ))
    }

    fn array_declaration(&mut self, schema: &ResolvedSchema, name: &str) -> Result<String, EmitError> {
        match self.array_shape(schema)? {
            ArrayShape::Tuple { elements, open } => {
                let mut text = doc_comment(&schema.ref_set);
                text.push_str(&constraint_comment(&schema.ref_set, name));
                if open {
                    text.push_str("// Additional items beyond the tuple are not represented.\n");
                }
                text.push_str(&format!("alias {} = {};", name, elements));
                Ok(text)
            }
            ArrayShape::List(expression) => Ok(decorate(
                &decorators_for(&schema.ref_set),
                &format!("model {} is {};", name, expression),
            )),
        }
    }

    /// List or tuple form of an array schema.
    fn array_shape(&mut self, schema: &ResolvedSchema) -> Result<ArrayShape, EmitError> {
        let ref_set = &schema.ref_set;

        let tuple = ref_set
            .matches("prefixItems")
            .into_iter()
            .next()
            .map(|layer| ("prefixItems", layer))
            .or_else(|| {
                ref_set
                    .matches("items")
                    .into_iter()
                    .find(|layer| layer.value.is_array())
                    .map(|layer| ("items", layer))
            });
        if let Some((keyword, layer)) = tuple {
            let count = layer.value.as_array().map_or(0, Vec::len);
            let anchor = Rc::clone(layer.schema);
            let closed = match keyword {
                "prefixItems" => {
                    matches!(ref_set.get("items"), Some(Value::Bool(false)))
                        || matches!(ref_set.get("unevaluatedItems"), Some(Value::Bool(false)))
                }
                _ => matches!(ref_set.get("additionalItems"), Some(Value::Bool(false))),
            };

            let mut elements = Vec::with_capacity(count);
            for index in 0..count {
                let id = self
                    .resolver
                    .resolve_in(&anchor, &format!("/{}/{}", keyword, index))?;
                let ty = self.degrade(id, |emitter| emitter.emit_schema(id, None))?;
                elements.push(ty.reference().to_string());
            }
            if !closed {
                warn!(url = %schema.retrieval_url(), "open tuple narrowed to a closed tuple");
            }
            return Ok(ArrayShape::Tuple {
                elements: format!("[{}]", elements.join(", ")),
                open: !closed,
            });
        }

        if let Some(layer) = ref_set.matches("items").into_iter().next() {
            let anchor = Rc::clone(layer.schema);
            let id = self.resolver.resolve_in(&anchor, "/items")?;
            let ty = self.degrade(id, |emitter| emitter.emit_schema(id, None))?;
            return Ok(ArrayShape::List(format!("{}[]", ty.operand())));
        }

        match schema.referenced_schema {
            Some(referenced) => Ok(ArrayShape::List(
                self.emit_schema(referenced, None)?.reference().to_string(),
            )),
            None => Ok(ArrayShape::List("unknown[]".to_string())),
        }
    }

    /// Inline type expression for a non-declaration schema.
    fn emit_expression(
        &mut self,
        schema: &ResolvedSchema,
        type_override: Option<PrimitiveType>,
    ) -> Result<TspType, EmitError> {
        let ref_set = &schema.ref_set;

        if type_override.is_none() {
            match &schema.raw.content {
                Value::Bool(true) => return Ok(TspType::Intrinsic("unknown")),
                Value::Bool(false) => return Ok(TspType::Intrinsic("never")),
                _ => {}
            }
            if ref_set.has("if") {
                warn!(url = %schema.retrieval_url(), "if/then/else is not supported");
                return Ok(TspType::Expression(
                    "unknown /* if/then/else is not supported */".to_string(),
                ));
            }
            if let Some(kind) = UnionKind::of(ref_set) {
                let variants = self.union_variants(schema, kind)?;
                if variants.is_empty() {
                    return Ok(TspType::Intrinsic("never"));
                }
                let members: Vec<String> = variants.iter().map(|(_, ty)| ty.operand()).collect();
                return Ok(TspType::Expression(members.join(" | ")));
            }
            if ref_set.has("allOf") {
                return self.composition_expression(schema);
            }
            if ref_set.has("enum") || ref_set.has("const") {
                let members = literals(&enum_values(ref_set));
                if members.is_empty() {
                    return Ok(TspType::Intrinsic("never"));
                }
                return Ok(TspType::Expression(members.join(" | ")));
            }
            if let Some(referenced) = schema.referenced_schema {
                if !has_own_shape(&schema.raw) {
                    return self.emit_schema(referenced, None);
                }
            }
        }

        let schema_type = type_override
            .map(SchemaType::Single)
            .or_else(|| schema.schema_type.clone());
        match schema_type {
            Some(SchemaType::Union(types)) => {
                let mut members = Vec::new();
                for primitive in types {
                    members.push(self.emit_schema(schema.id, Some(primitive))?.operand());
                }
                Ok(TspType::Expression(members.join(" | ")))
            }
            Some(SchemaType::Single(PrimitiveType::Object)) => self.object_expression(schema),
            Some(SchemaType::Single(PrimitiveType::Array)) => match self.array_shape(schema)? {
                ArrayShape::List(expression) => Ok(TspType::Expression(expression)),
                ArrayShape::Tuple { elements, open: true } => Ok(TspType::Expression(format!(
                    "{} /* additional items not represented */",
                    elements
                ))),
                ArrayShape::Tuple { elements, open: false } => Ok(TspType::Expression(elements)),
            },
            Some(SchemaType::Single(primitive)) => match schema.referenced_schema {
                Some(referenced) if type_override.is_none() => self.emit_schema(referenced, None),
                _ => Ok(TspType::Intrinsic(primitive.intrinsic().unwrap_or("unknown"))),
            },
            None => match schema.referenced_schema {
                Some(referenced) => self.emit_schema(referenced, None),
                None if ref_set.keys().iter().all(|k| !SHAPE_KEYWORDS.contains(k)) => {
                    Err(EmitError::NoInferableType {
                        url: schema.retrieval_url().to_string(),
                    })
                }
                None => Ok(TspType::Intrinsic("unknown")),
            },
        }
    }

    fn object_expression(&mut self, schema: &ResolvedSchema) -> Result<TspType, EmitError> {
        let ref_set = &schema.ref_set;
        if ref_set.has("patternProperties") {
            warn!(url = %schema.retrieval_url(), "patternProperties is not supported and was ignored");
        }
        if schema.referenced_schema.is_some() || ref_set.has("properties") {
            return self.composition_expression(schema);
        }

        match ref_set.matches("additionalProperties").into_iter().next() {
            Some(layer) if layer.value == &Value::Bool(false) => {
                Ok(TspType::Expression("{}".to_string()))
            }
            Some(layer) if layer.value.is_object() => {
                let anchor = Rc::clone(layer.schema);
                let id = self.resolver.resolve_in(&anchor, "/additionalProperties")?;
                let ty = self.degrade(id, |emitter| emitter.emit_schema(id, None))?;
                Ok(TspType::Expression(format!("Record<{}>", ty.reference())))
            }
            _ => Ok(TspType::Expression("Record<unknown>".to_string())),
        }
    }

    /// Inline form of a composed object: spreads followed by merged members.
    fn composition_expression(&mut self, schema: &ResolvedSchema) -> Result<TspType, EmitError> {
        let composition = compose(&mut self.resolver, schema.id)?;
        let references: Vec<ResolvedId> = composition
            .base
            .into_iter()
            .chain(composition.spreads.iter().copied())
            .collect();

        if composition.schemas.is_empty() && references.len() == 1 {
            return self.emit_schema(references[0], None);
        }

        let mut lines = Vec::new();
        for reference in references {
            let ty = self.emit_schema(reference, None)?;
            lines.push(format!("...{};", ty.reference()));
        }
        lines.extend(self.object_members(&composition.schemas)?);
        Ok(TspType::Expression(block("", &lines)))
    }

    /// Property lines merged from every layer of `schemas`, first definition
    /// of a property winning.
    fn object_members(&mut self, schemas: &[ResolvedId]) -> Result<Vec<String>, EmitError> {
        let mut required: IndexSet<String> = IndexSet::new();
        let mut properties: IndexMap<String, Rc<RawSchema>> = IndexMap::new();
        let mut additional: Option<(Rc<RawSchema>, Value)> = None;

        for id in schemas {
            let schema = self.resolver.schema(*id);
            for layer in schema.ref_set.layers() {
                if let Some(Value::Array(names)) = layer.content.get("required") {
                    required.extend(names.iter().filter_map(Value::as_str).map(String::from));
                }
                if let Some(Value::Object(declared)) = layer.content.get("properties") {
                    for key in declared.keys() {
                        properties
                            .entry(key.clone())
                            .or_insert_with(|| Rc::clone(layer));
                    }
                }
                if additional.is_none() {
                    if let Some(value) = layer.content.get("additionalProperties") {
                        additional = Some((Rc::clone(layer), value.clone()));
                    }
                }
                if layer.content.get("patternProperties").is_some() {
                    warn!(url = %layer.retrieval_url, "patternProperties is not supported and was ignored");
                }
            }
        }

        let mut lines = Vec::with_capacity(properties.len() + 1);
        for (property, layer) in &properties {
            let id = self.resolver.resolve_in(
                layer,
                &format!("/properties/{}", escape_pointer_token(property)),
            )?;
            lines.push(self.property_line(property, id, required.contains(property))?);
        }

        match additional {
            Some((_, Value::Bool(true))) => lines.push("...Record<unknown>;".to_string()),
            Some((layer, Value::Object(_))) => {
                let id = self.resolver.resolve_in(&layer, "/additionalProperties")?;
                let ty = self.degrade(id, |emitter| emitter.emit_schema(id, None))?;
                lines.push(format!("...Record<{}>;", ty.reference()));
            }
            _ => {}
        }
        Ok(lines)
    }

    fn property_line(&mut self, property: &str, id: ResolvedId, required: bool) -> Result<String, EmitError> {
        let schema = self.resolver.schema(id);
        let ty = match self.emit_schema(id, None) {
            Ok(ty) => ty,
            Err(e) if !e.is_fatal() => {
                debug!(property, error = %e, "property type degraded to unknown");
                TspType::Intrinsic("unknown")
            }
            Err(e) => return Err(e),
        };

        // Declarations carry their own decorators.
        let decorators = if schema.is_declaration {
            Vec::new()
        } else {
            decorators_for(&schema.ref_set)
        };
        let optional = if required { "" } else { "?" };
        Ok(decorate(
            &decorators,
            &format!("{}{}: {};", member_name(property), optional, ty.reference()),
        ))
    }

    /// Run `emit`, replacing non-fatal failures with an annotated `unknown`.
    fn degrade(
        &mut self,
        id: ResolvedId,
        emit: impl FnOnce(&mut Self) -> Result<TspType, EmitError>,
    ) -> Result<TspType, EmitError> {
        match emit(self) {
            Err(e) if !e.is_fatal() => {
                let url = self.resolver.schema(id).retrieval_url().to_string();
                warn!(%url, error = %e, "expression replaced by unknown");
                Ok(TspType::Expression(format!("unknown /* {} */", e)))
            }
            other => other,
        }
    }

    fn reserve_slot(&mut self) -> usize {
        self.declarations.push(String::new());
        self.declarations.len() - 1
    }

    fn declaration_name(&mut self, schema: &ResolvedSchema) -> String {
        let candidate = schema
            .definition_name()
            .map(String::from)
            .or_else(|| {
                schema
                    .ref_set
                    .get("title")
                    .and_then(Value::as_str)
                    .map(String::from)
            })
            .or_else(|| {
                if schema.is_root() {
                    return file_stem(schema.canonical_url());
                }
                // Plain-name ids only; `#anchor` ids name no file.
                let local_id = schema.raw.local_id.as_deref()?;
                if local_id.starts_with('#') {
                    return None;
                }
                let url = join_url(schema.retrieval_url(), local_id).ok()?;
                file_stem(&url)
            })
            .map(|candidate| pascal_case(&candidate))
            .filter(|candidate| !candidate.is_empty());

        let base = match candidate {
            Some(base) => base,
            None => {
                self.anonymous += 1;
                format!("Schema{}", self.anonymous)
            }
        };
        self.claim_name(&base)
    }

    /// Reserve `base`, appending a counter when it is already taken.
    fn claim_name(&mut self, base: &str) -> String {
        let mut name = base.to_string();
        let mut counter = 2;
        while !self.names.insert(name.clone()) {
            name = format!("{}{}", base, counter);
            counter += 1;
        }
        name
    }
}

fn enum_declaration(schema: &ResolvedSchema, name: &str) -> String {
    let ref_set = &schema.ref_set;
    let values = enum_values(ref_set);
    let kind = schema
        .schema_type
        .as_ref()
        .and_then(SchemaType::single)
        .or_else(|| literal_type(&values));
    let decorators = decorators_for(ref_set);

    let members: Option<Vec<String>> = match kind {
        _ if values.is_empty() => None,
        Some(PrimitiveType::String) => values
            .iter()
            .map(|v| v.as_str().map(|s| format!("{}: {},", member_name(s), string_literal(s))))
            .collect(),
        Some(PrimitiveType::Number | PrimitiveType::Integer) => values
            .iter()
            .map(|v| match v {
                Value::Number(n) => Some(format!("{}: {},", member_name(&n.to_string()), n)),
                _ => None,
            })
            .collect(),
        _ => None,
    };

    match members {
        Some(members) => decorate(&decorators, &block(&format!("enum {}", name), &members)),
        None => {
            let members: Vec<String> = literals(&values).into_iter().map(|l| format!("{},", l)).collect();
            decorate(&decorators, &block(&format!("union {}", name), &members))
        }
    }
}

/// Whether the node itself, ignoring what it references, defines a shape.
fn has_own_shape(raw: &RawSchema) -> bool {
    match &raw.content {
        Value::Object(map) => map.keys().any(|k| SHAPE_KEYWORDS.contains(&k.as_str())),
        _ => false,
    }
}

fn enum_values(ref_set: &RefSet) -> Vec<Value> {
    match ref_set.get("enum") {
        Some(Value::Array(values)) => values.clone(),
        _ => ref_set.get("const").cloned().into_iter().collect(),
    }
}

/// Primitive shared by every value, for enums without a `type`.
fn literal_type(values: &[Value]) -> Option<PrimitiveType> {
    if values.iter().all(Value::is_string) {
        Some(PrimitiveType::String)
    } else if values.iter().all(Value::is_number) {
        Some(PrimitiveType::Number)
    } else {
        None
    }
}

fn literals(values: &[Value]) -> Vec<String> {
    values
        .iter()
        .filter_map(|value| {
            let rendered = literal(value);
            if rendered.is_none() {
                warn!(kind = json_type_name(value), "enum value without a literal form skipped");
            }
            rendered
        })
        .collect()
}

fn block(head: &str, lines: &[String]) -> String {
    let open = if head.is_empty() {
        "{".to_string()
    } else {
        format!("{} {{", head)
    };
    if lines.is_empty() {
        return format!("{}}}", open);
    }
    format!("{}\n{}\n}}", open, lines.join("\n"))
}

/// `/** ... */` comment for declarations that cannot take `@doc`.
fn doc_comment(ref_set: &RefSet) -> String {
    let Some(Value::String(description)) = ref_set.get("description") else {
        return String::new();
    };
    let mut out = String::from("/**\n");
    for line in description.replace("*/", "*\\/").lines() {
        out.push_str(" * ");
        out.push_str(line);
        out.push('\n');
    }
    out.push_str(" */\n");
    out
}

/// Validation decorators an alias cannot carry, kept visible as a comment.
fn constraint_comment(ref_set: &RefSet, name: &str) -> String {
    let constraints: Vec<String> = decorators_for(ref_set)
        .into_iter()
        .filter(|decorator| !decorator.starts_with("@doc("))
        .collect();
    if constraints.is_empty() {
        return String::new();
    }
    let constraints = constraints.join(" ");
    warn!(%name, %constraints, "validation keywords cannot be applied to an alias");
    format!("// Not enforced on alias: {}\n", constraints)
}

fn file_stem(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let decoded = urlencoding::decode(segment).ok()?;
    decoded.split('.').next().map(String::from)
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Identifier for a property or member, backticked when needed.
fn member_name(s: &str) -> String {
    if is_identifier(s) && !KEYWORDS.contains(&s) {
        s.to_string()
    } else {
        format!("`{}`", s.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

/// `pet-store item` becomes `PetStoreItem`.
fn pascal_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut boundary = true;
    for c in s.chars() {
        if c.is_alphanumeric() || c == '_' {
            if boundary {
                out.extend(c.to_uppercase());
            } else {
                out.push(c);
            }
            boundary = false;
        } else {
            boundary = true;
        }
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

fn camel_case(s: &str) -> String {
    let pascal = pascal_case(s);
    let mut chars = pascal.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => pascal,
    }
}
