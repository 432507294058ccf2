//! Validation keywords mapped to TypeSpec decorators, plus literal rendering.

use serde_json::Value;

use crate::refset::RefSet;

/// Numeric keywords and the decorator each maps to, in output order.
const NUMERIC_DECORATORS: &[(&str, &str)] = &[
    ("minLength", "minLength"),
    ("maxLength", "maxLength"),
    ("minimum", "minValue"),
    ("maximum", "maxValue"),
    ("exclusiveMinimum", "minValueExclusive"),
    ("exclusiveMaximum", "maxValueExclusive"),
    ("multipleOf", "multipleOf"),
    ("minItems", "minItems"),
    ("maxItems", "maxItems"),
    ("minProperties", "minProperties"),
    ("maxProperties", "maxProperties"),
];

/// String keywords passed through as a string argument.
const STRING_DECORATORS: &[(&str, &str)] = &[
    ("pattern", "pattern"),
    ("format", "format"),
    ("contentEncoding", "contentEncoding"),
    ("contentMediaType", "contentMediaType"),
];

/// Decorators for every validation keyword visible through `ref_set`.
pub fn decorators_for(ref_set: &RefSet) -> Vec<String> {
    let mut decorators = Vec::new();

    if let Some(Value::String(description)) = ref_set.get("description") {
        decorators.push(format!("@doc({})", doc_literal(description)));
    }

    for (keyword, decorator) in NUMERIC_DECORATORS {
        let Some(value) = ref_set.get(keyword) else {
            continue;
        };
        match (value, *keyword) {
            (Value::Number(n), _) => decorators.push(format!("@{}({})", decorator, n)),
            // Draft-04 spells exclusive bounds as booleans next to minimum/maximum.
            (Value::Bool(true), "exclusiveMinimum") => {
                replace_bound(&mut decorators, "minValue", "minValueExclusive")
            }
            (Value::Bool(true), "exclusiveMaximum") => {
                replace_bound(&mut decorators, "maxValue", "maxValueExclusive")
            }
            _ => {}
        }
    }

    for (keyword, decorator) in STRING_DECORATORS {
        if let Some(Value::String(s)) = ref_set.get(keyword) {
            decorators.push(format!("@{}({})", decorator, string_literal(s)));
        }
    }

    if let Some(Value::Bool(true)) = ref_set.get("uniqueItems") {
        decorators.push("@uniqueItems".to_string());
    }

    decorators
}

fn replace_bound(decorators: &mut [String], inclusive: &str, exclusive: &str) {
    let prefix = format!("@{}(", inclusive);
    for decorator in decorators.iter_mut() {
        if let Some(rest) = decorator.strip_prefix(&prefix) {
            *decorator = format!("@{}({}", exclusive, rest);
        }
    }
}

/// Prefix `declaration` with one decorator per line.
pub fn decorate(decorators: &[String], declaration: &str) -> String {
    let mut out = String::new();
    for decorator in decorators {
        out.push_str(decorator);
        out.push('\n');
    }
    out.push_str(declaration);
    out
}

/// Quote `s` as a TypeSpec string literal.
pub fn string_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    out.push_str(&escape(s, true));
    out.push('"');
    out
}

/// `@doc` argument: a triple-quoted block when the text spans lines.
pub fn doc_literal(s: &str) -> String {
    if !s.contains('\n') {
        return string_literal(s);
    }
    format!("\"\"\"\n{}\n\"\"\"", escape(s, false).replace("\"\"\"", "\\\"\"\""))
}

fn escape(s: &str, escape_newlines: bool) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' if escape_newlines => out.push_str("\\\""),
            '\n' if escape_newlines => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '$' if chars.peek() == Some(&'{') => out.push_str("\\$"),
            other => out.push(other),
        }
    }
    out
}

/// Render a JSON value as a TypeSpec literal. Objects and arrays have none.
pub fn literal(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some("null".to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(string_literal(s)),
        Value::Array(_) | Value::Object(_) => None,
    }
}
