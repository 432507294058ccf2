//! Layered keyword lookup across the nodes of one `$ref` chain segment.

use std::rc::Rc;

use indexmap::IndexSet;
use serde_json::Value;

use crate::resolver::RawSchema;

/// How to combine a keyword defined by more than one layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resolution<'a> {
    /// Closest layer wins.
    #[default]
    First,
    /// Outermost layer wins.
    Last,
    /// Join string values closest-first.
    ConcatLeft(&'a str),
    /// Join string values outermost-first.
    ConcatRight(&'a str),
}

/// One layer's value for a keyword.
#[derive(Debug, Clone, Copy)]
pub struct LayerMatch<'a> {
    pub schema: &'a Rc<RawSchema>,
    pub value: &'a Value,
}

/// Ordered raw layers contributing keywords to one logical schema,
/// closest layer first. Layers are only ever appended.
#[derive(Debug, Clone, Default)]
pub struct RefSet {
    layers: Vec<Rc<RawSchema>>,
}

impl RefSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, layer: Rc<RawSchema>) {
        self.layers.push(layer);
    }

    pub fn layers(&self) -> &[Rc<RawSchema>] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Whether any layer owns `key`.
    pub fn has(&self, key: &str) -> bool {
        self.layers
            .iter()
            .any(|layer| layer.content.as_object().is_some_and(|o| o.contains_key(key)))
    }

    /// Every layer's value for `key`, closest first.
    pub fn matches(&self, key: &str) -> Vec<LayerMatch<'_>> {
        self.layers
            .iter()
            .filter_map(|schema| {
                schema
                    .content
                    .get(key)
                    .map(|value| LayerMatch { schema, value })
            })
            .collect()
    }

    /// Value of `key` from the closest layer defining it.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.layers.iter().find_map(|layer| layer.content.get(key))
    }

    /// Value of `key` combined across layers with `resolution`.
    pub fn get_with(&self, key: &str, resolution: Resolution<'_>) -> Option<Value> {
        let matches = self.matches(key);
        match matches.as_slice() {
            [] => None,
            [only] => Some(only.value.clone()),
            _ => Some(match resolution {
                Resolution::First => matches[0].value.clone(),
                Resolution::Last => matches[matches.len() - 1].value.clone(),
                Resolution::ConcatLeft(joiner) => concat(matches.iter().map(|m| m.value), joiner),
                Resolution::ConcatRight(joiner) => {
                    concat(matches.iter().rev().map(|m| m.value), joiner)
                }
            }),
        }
    }

    /// Union of all layers' keys in first-seen order.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys = IndexSet::new();
        for layer in &self.layers {
            if let Value::Object(map) = &layer.content {
                keys.extend(map.keys().map(String::as_str));
            }
        }
        keys.into_iter().collect()
    }
}

fn concat<'a>(values: impl Iterator<Item = &'a Value>, joiner: &str) -> Value {
    let parts: Vec<String> = values
        .map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect();
    Value::String(parts.join(joiner))
}
