//! Integration tests for TypeSpec emission.

mod common;

use common::{emit, emit_raw, MemoryLoader};
use schema_idl::{EmitOptions, Emitter, Resolver};
use serde_json::{json, Value};

const DOC: &str = "mem:///schemas/doc.json";

/// Emit a document holding only `$defs`.
fn emit_defs(defs: Value) -> String {
    emit(MemoryLoader::new().json(DOC, json!({ "$defs": defs })), &[DOC])
}

const HEADER: &str = "import \"@typespec/json-schema\";\n\nusing TypeSpec.JsonSchema;\n\n";

mod documents {
    use super::*;

    fn pet() -> MemoryLoader {
        MemoryLoader::new().json(
            "mem:///schemas/pet.json",
            json!({
                "title": "Pet",
                "type": "object",
                "required": ["name"],
                "properties": {
                    "name": { "type": "string", "minLength": 1 },
                    "tag": { "$ref": "#/$defs/Tag" }
                },
                "$defs": {
                    "Tag": { "type": "string", "maxLength": 10 }
                }
            }),
        )
    }

    #[test]
    fn full_document() {
        let source = emit(pet(), &["mem:///schemas/pet.json"]);
        let expected = format!(
            "{}model Pet {{\n  @minLength(1)\n  name: string;\n  tag?: Tag;\n}}\n\n@maxLength(10)\nscalar Tag extends string;\n",
            HEADER
        );
        assert_eq!(source, expected);
    }

    #[test]
    fn emission_is_idempotent() {
        let first = emit_raw(pet(), &["mem:///schemas/pet.json"]);
        let second = emit_raw(pet(), &["mem:///schemas/pet.json"]);
        assert_eq!(first, second);
    }

    #[test]
    fn emitting_twice_reuses_declarations() {
        let mut emitter = Emitter::with_resolver(Resolver::with_loader(pet()));
        emitter.add_schema("mem:///schemas/pet.json").unwrap();
        let first = emitter.emit().unwrap();
        let second = emitter.emit().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.matches("scalar Tag").count(), 1);
    }

    #[test]
    fn namespace_follows_header() {
        let mut emitter = Emitter::with_resolver(Resolver::with_loader(pet()))
            .options(EmitOptions::new().namespace("Pets"));
        emitter.add_schema("mem:///schemas/pet.json").unwrap();
        let source = emitter.emit().unwrap();
        assert!(source.starts_with(&format!("{}@jsonSchema\nnamespace Pets;\n\nmodel Pet", HEADER)));
    }

    #[test]
    fn root_named_after_file() {
        let loader = MemoryLoader::new().json(
            "mem:///schemas/line-item.json",
            json!({ "type": "object", "properties": { "sku": { "type": "string" } } }),
        );
        let source = emit(loader, &["mem:///schemas/line-item.json"]);
        assert!(source.contains("model LineItem {\n  sku?: string;\n}"));
    }

    #[test]
    fn shared_definition_emitted_once_across_documents() {
        let loader = MemoryLoader::new()
            .json(
                "mem:///a.json",
                json!({ "title": "A", "type": "object", "properties": { "p": { "$ref": "common.json#/$defs/Point" } } }),
            )
            .json(
                "mem:///b.json",
                json!({ "title": "B", "type": "object", "properties": { "p": { "$ref": "common.json#/$defs/Point" } } }),
            )
            .json(
                "mem:///common.json",
                json!({ "$defs": { "Point": { "type": "object", "properties": { "x": { "type": "number" } } } } }),
            );
        let source = emit(loader, &["mem:///a.json", "mem:///b.json"]);
        assert_eq!(source.matches("model Point").count(), 1);
        assert!(source.contains("model A {\n  p?: Point;\n}"));
        assert!(source.contains("model B {\n  p?: Point;\n}"));
    }

    #[test]
    fn subschema_named_after_its_id() {
        let loader = MemoryLoader::new().json(
            DOC,
            json!({
                "type": "object",
                "properties": {
                    "home": {
                        "$id": "address.json",
                        "type": "object",
                        "properties": { "street": { "type": "string" } }
                    }
                }
            }),
        );
        let source = emit(loader, &[DOC]);
        assert!(source.contains("home?: Address;"));
        assert!(source.contains("model Address {\n  street?: string;\n}"));
        assert!(!source.contains("Schema1"));
    }

    #[test]
    fn colliding_names_get_suffixes() {
        let loader = MemoryLoader::new()
            .json("mem:///one/item.json", json!({ "type": "string" }))
            .json("mem:///two/item.json", json!({ "type": "integer" }));
        let source = emit(loader, &["mem:///one/item.json", "mem:///two/item.json"]);
        assert!(source.contains("scalar Item extends string;"));
        assert!(source.contains("scalar Item2 extends safeint;"));
    }
}

mod enums {
    use super::*;

    #[test]
    fn const_string() {
        let source = emit_defs(json!({ "Color": { "type": "string", "const": "red" } }));
        assert!(source.contains("enum Color {\n  red: \"red\",\n}"));
    }

    #[test]
    fn string_enum_infers_type() {
        let source = emit_defs(json!({
            "Status": { "title": "Status", "type": "string", "enum": ["active", "on-hold"] }
        }));
        assert!(source.contains("enum Status {\n  active: \"active\",\n  `on-hold`: \"on-hold\",\n}"));
    }

    #[test]
    fn mixed_enum_is_literal_union() {
        let source = emit_defs(json!({ "Mixed": { "enum": ["red", 1] } }));
        assert!(source.contains("alias Mixed = \"red\" | 1;"));
        assert!(!source.contains("enum Mixed"));
    }

    #[test]
    fn mixed_enum_declaration_is_union() {
        let source = emit_defs(json!({
            "Mixed": { "type": ["string", "integer"], "enum": ["red", 1] }
        }));
        assert!(source.contains("union Mixed {\n  \"red\",\n  1,\n}"));
    }

    #[test]
    fn numeric_enum() {
        let source = emit_defs(json!({ "Level": { "type": "integer", "enum": [1, 2] } }));
        assert!(source.contains("enum Level {\n  `1`: 1,\n  `2`: 2,\n}"));
    }
}

mod arrays {
    use super::*;

    #[test]
    fn list_bounds() {
        let source = emit_defs(json!({
            "Tags": { "type": "array", "items": { "type": "string" }, "minItems": 2, "maxItems": 4 }
        }));
        assert!(source.contains("@minItems(2)\n@maxItems(4)\nmodel Tags is string[];"));
    }

    #[test]
    fn untyped_list_bounds() {
        let source = emit_defs(json!({ "Bag": { "type": "array", "minItems": 2, "maxItems": 4 } }));
        assert!(source.contains("@minItems(2)\n@maxItems(4)\nmodel Bag is unknown[];"));
    }

    #[test]
    fn closed_tuple() {
        let source = emit_defs(json!({
            "Pair": {
                "type": "array",
                "prefixItems": [{ "type": "string" }, { "type": "integer" }],
                "items": false
            }
        }));
        assert!(source.contains("alias Pair = [string, safeint];"));
        assert!(!source.contains("Additional items"));
    }

    #[test]
    fn open_tuple_is_narrowed_with_comment() {
        let source = emit_defs(json!({
            "Pair": {
                "type": "array",
                "prefixItems": [{ "type": "string" }, { "type": "boolean" }]
            }
        }));
        assert!(source.contains(
            "// Additional items beyond the tuple are not represented.\nalias Pair = [string, boolean];"
        ));
    }

    #[test]
    fn draft07_tuple() {
        let loader = MemoryLoader::new().json(
            DOC,
            json!({
                "$schema": "http://json-schema.org/draft-07/schema#",
                "definitions": {
                    "Point": {
                        "type": "array",
                        "items": [{ "type": "number" }, { "type": "number" }],
                        "additionalItems": false
                    }
                }
            }),
        );
        let source = emit(loader, &[DOC]);
        assert!(source.contains("alias Point = [float64, float64];"));
    }

    #[test]
    fn bounded_tuple_keeps_constraints_as_comment() {
        let source = emit_defs(json!({
            "Pair": {
                "type": "array",
                "prefixItems": [{ "type": "string" }, { "type": "integer" }],
                "items": false,
                "minItems": 2,
                "maxItems": 4
            }
        }));
        assert!(source.contains(
            "// Not enforced on alias: @minItems(2) @maxItems(4)\nalias Pair = [string, safeint];"
        ));
    }

    #[test]
    fn constrained_alias_keeps_constraints_as_comment() {
        let source = emit_defs(json!({
            "Name": { "type": "string" },
            "Short": {
                "$ref": "#/$defs/Name",
                "description": "A short name.",
                "maxLength": 5
            }
        }));
        assert!(source.contains(
            "/**\n * A short name.\n */\n// Not enforced on alias: @maxLength(5)\nalias Short = Name;"
        ));
        assert!(!source.contains("@doc("));
    }

    #[test]
    fn nullable_items_are_parenthesized() {
        let source = emit_defs(json!({
            "Values": { "type": "array", "items": { "type": ["string", "null"] } }
        }));
        assert!(source.contains("model Values is (string | null)[];"));
    }
}

mod unions {
    use super::*;

    #[test]
    fn one_of_declaration() {
        let source = emit_defs(json!({
            "Shape": {
                "oneOf": [
                    { "title": "Circle", "type": "object", "properties": { "r": { "type": "number" } } },
                    { "type": "string" }
                ]
            }
        }));
        assert!(source.contains("@oneOf\nunion Shape {\n  circle: Circle,\n  variant1: string,\n}"));
        assert!(source.contains("model Circle {\n  r?: float64;\n}"));
        assert!(source.find("union Shape") < source.find("model Circle"));
    }

    #[test]
    fn any_of_declaration_has_no_one_of_marker() {
        let source = emit_defs(json!({
            "Id": { "anyOf": [{ "type": "string" }, { "type": "integer" }] }
        }));
        assert!(source.contains("union Id {\n  variant0: string,\n  variant1: safeint,\n}"));
        assert!(!source.contains("@oneOf"));
    }

    #[test]
    fn any_of_expression() {
        let source = emit_defs(json!({
            "Box": {
                "type": "object",
                "properties": {
                    "value": { "anyOf": [{ "type": "string" }, { "type": "null" }] }
                }
            }
        }));
        assert!(source.contains("value?: string | null;"));
    }

    #[test]
    fn type_list_declaration() {
        let source = emit_defs(json!({ "Nullable": { "type": ["string", "null"] } }));
        assert!(source.contains("union Nullable {\n  string,\n  null,\n}"));
    }
}

mod composition {
    use super::*;

    fn people(branch: Value) -> String {
        emit_defs(json!({
            "Named": { "type": "object", "properties": { "name": { "type": "string" } } },
            "Aged": { "type": "object", "properties": { "age": { "type": "integer" } } },
            "Person": { "allOf": [{ "$ref": "#/$defs/Named" }, branch] }
        }))
    }

    #[test]
    fn references_are_spread() {
        let source = people(json!({ "$ref": "#/$defs/Aged" }));
        assert!(source.contains("model Person {\n  ...Named;\n  ...Aged;\n}"));
    }

    #[test]
    fn inline_branch_is_merged() {
        let source = people(json!({ "properties": { "email": { "type": "string", "format": "email" } } }));
        assert!(source.contains("model Person {\n  ...Named;\n  @format(\"email\")\n  email?: string;\n}"));
    }

    #[test]
    fn required_flattens_everything() {
        let source = people(json!({
            "required": ["name"],
            "properties": { "nickname": { "type": "string" } }
        }));
        assert!(source.contains("model Person {\n  nickname?: string;\n  name: string;\n}"));
        assert!(!source.contains("...Named"));
    }

    #[test]
    fn own_reference_extends() {
        let source = emit_defs(json!({
            "Base": { "type": "object", "properties": { "id": { "type": "string" } } },
            "Derived": {
                "$ref": "#/$defs/Base",
                "type": "object",
                "properties": { "extra": { "type": "boolean" } }
            }
        }));
        assert!(source.contains("model Derived extends Base {\n  extra?: boolean;\n}"));
    }

    #[test]
    fn inline_composition_expression() {
        let source = emit_defs(json!({
            "Named": { "type": "object", "properties": { "name": { "type": "string" } } },
            "Holder": {
                "type": "object",
                "properties": {
                    "owner": {
                        "allOf": [
                            { "$ref": "#/$defs/Named" },
                            { "properties": { "since": { "type": "string" } } }
                        ]
                    }
                }
            }
        }));
        assert!(source.contains("owner?: {\n    ...Named;\n    since?: string;\n  };"));
    }
}

mod objects {
    use super::*;

    #[test]
    fn additional_properties_become_record_spread() {
        let source = emit_defs(json!({
            "Labels": { "type": "object", "additionalProperties": { "type": "string" } }
        }));
        assert!(source.contains("model Labels {\n  ...Record<string>;\n}"));
    }

    #[test]
    fn recursive_model() {
        let source = emit_defs(json!({
            "Node": {
                "type": "object",
                "properties": { "next": { "$ref": "#/$defs/Node" } }
            }
        }));
        assert!(source.contains("model Node {\n  next?: Node;\n}"));
    }

    #[test]
    fn keyword_and_dashed_property_names() {
        let source = emit_defs(json!({
            "Odd": {
                "type": "object",
                "required": ["model"],
                "properties": {
                    "model": { "type": "string" },
                    "x-trace-id": { "type": "string" }
                }
            }
        }));
        assert!(source.contains("`model`: string;"));
        assert!(source.contains("`x-trace-id`?: string;"));
    }

    #[test]
    fn boolean_schemas() {
        let source = emit_defs(json!({
            "Open": {
                "type": "object",
                "properties": { "anything": true, "nothing": false }
            }
        }));
        assert!(source.contains("anything?: unknown;"));
        assert!(source.contains("nothing?: never;"));
    }

    #[test]
    fn untyped_property_degrades_to_unknown() {
        let source = emit_defs(json!({
            "Loose": {
                "type": "object",
                "properties": { "payload": { "description": "Opaque payload." } }
            }
        }));
        assert!(source.contains("@doc(\"Opaque payload.\")\n  payload?: unknown;"));
    }

    #[test]
    fn pattern_properties_are_ignored() {
        let source = emit_defs(json!({
            "Headers": {
                "type": "object",
                "properties": {
                    "values": { "type": "object", "patternProperties": { "^x-": { "type": "string" } } }
                }
            }
        }));
        assert!(source.contains("values?: Record<unknown>;"));
    }

    #[test]
    fn multi_line_description() {
        let source = emit_defs(json!({
            "Note": { "type": "string", "description": "First line.\nSecond line." }
        }));
        assert!(source.contains(
            "@doc(\"\"\"\n  First line.\n  Second line.\n  \"\"\")\nscalar Note extends string;"
        ));
    }
}

mod degraded {
    use super::*;

    #[test]
    fn conditional_declaration() {
        let source = emit_defs(json!({
            "Cond": {
                "type": "object",
                "if": { "properties": { "kind": { "const": "a" } } },
                "then": { "required": ["a"] }
            }
        }));
        assert!(source.contains(
            "// Conditional schemas (if/then/else) are not supported.\nalias Cond = unknown;"
        ));
    }

    #[test]
    fn failed_declaration_does_not_abort_others() {
        let source = emit_defs(json!({
            "Weird": { "type": "decimal" },
            "Fine": { "type": "string" }
        }));
        assert!(source.contains("// Failed to convert"));
        assert!(source.contains("alias Weird = unknown;"));
        assert!(source.contains("scalar Fine extends string;"));
    }

    #[test]
    fn missing_reference_is_fatal() {
        let loader = MemoryLoader::new().json(
            DOC,
            json!({
                "type": "object",
                "properties": { "p": { "$ref": "#/$defs/Missing" } }
            }),
        );
        let mut emitter = Emitter::with_resolver(Resolver::with_loader(loader));
        emitter.add_schema(DOC).unwrap();
        let err = emitter.emit().unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(err.exit_code(), 2);
    }
}
