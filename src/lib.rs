//! JSON Schema to TypeSpec
//!
//! Converts JSON Schema documents (drafts 04 through 2020-12, written as JSON
//! or YAML) into TypeSpec declarations.
//!
//! Conversion runs in two stages. The [`Resolver`] loads documents, follows
//! `$ref` chains across files and URLs, and classifies every node as either
//! a named declaration or an inline shape. The [`Emitter`] then walks the
//! resolved schemas and writes models, unions, enums, scalars and aliases.
//!
//! # Example
//!
//! ```no_run
//! use schema_idl::Emitter;
//!
//! let mut emitter = Emitter::new();
//! emitter.add_schema("schemas/pet.json")?;
//! let source = emitter.emit()?;
//! assert!(source.starts_with("import \"@typespec/json-schema\";"));
//! # Ok::<(), schema_idl::EmitError>(())
//! ```
//!
//! # Type Mapping
//!
//! | JSON Schema | TypeSpec |
//! |-------------|----------|
//! | `string` | `string` |
//! | `number` | `float64` |
//! | `integer` | `safeint` |
//! | `boolean` | `boolean` |
//! | `null` | `null` |
//! | `object` | `model` or `{ ... }` |
//! | `array` | `T[]` or `[A, B]` |
//! | `oneOf` / `anyOf` | `union` |
//! | `enum` / `const` | `enum` or literal union |

mod decorators;
mod document;
mod emitter;
mod error;
mod flatten;
mod format;
mod loader;
mod refset;
mod resolver;
mod types;

pub use decorators::{decorators_for, literal, string_literal};
pub use document::{SourceDocument, Syntax};
pub use emitter::{Emitter, TspType};
pub use error::{EmitError, ResolveError};
pub use flatten::{compose, flatten_all_ofs, Composition, Flattened};
pub use format::{BraceFormatter, Formatter};
pub use loader::{DefaultLoader, LoadedSource, SourceLoader};
pub use refset::{LayerMatch, RefSet, Resolution};
pub use resolver::{RawSchema, ResolvedId, ResolvedSchema, Resolver};
pub use types::{location_to_url, EmitOptions, PrimitiveType, SchemaType, SchemaVersion};
