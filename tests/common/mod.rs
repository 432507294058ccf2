// Shared helpers for the integration tests.
//
// Each test binary compiles its own copy, so not every helper is used in
// every binary.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use schema_idl::{EmitOptions, Emitter, LoadedSource, ResolveError, Resolver, SourceLoader};
use serde_json::Value;
use url::Url;

/// Serves documents from memory and counts how often each URL is loaded.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    documents: HashMap<String, (String, &'static str)>,
    loads: Rc<RefCell<HashMap<String, usize>>>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn json(mut self, url: &str, document: Value) -> Self {
        self.documents
            .insert(url.to_string(), (document.to_string(), "application/json"));
        self
    }

    pub fn yaml(mut self, url: &str, document: &str) -> Self {
        self.documents
            .insert(url.to_string(), (document.to_string(), "application/yaml"));
        self
    }

    /// Shared view of the load counters, valid after the loader is moved.
    pub fn counter(&self) -> Rc<RefCell<HashMap<String, usize>>> {
        Rc::clone(&self.loads)
    }
}

impl SourceLoader for MemoryLoader {
    fn load(&self, url: &Url) -> Result<LoadedSource, ResolveError> {
        *self.loads.borrow_mut().entry(url.to_string()).or_default() += 1;
        match self.documents.get(url.as_str()) {
            Some((content, content_type)) => Ok(LoadedSource {
                content: content.clone().into_bytes(),
                content_type: content_type.to_string(),
            }),
            None => Err(ResolveError::FileNotFound {
                path: url.as_str().into(),
            }),
        }
    }
}

/// Emit every `roots` entry through a fresh emitter, unformatted.
pub fn emit_raw(loader: MemoryLoader, roots: &[&str]) -> String {
    let mut emitter =
        Emitter::with_resolver(Resolver::with_loader(loader)).options(EmitOptions::new().format(false));
    for root in roots {
        emitter.add_schema(root).unwrap();
    }
    emitter.emit().unwrap()
}

/// Emit every `roots` entry through a fresh emitter, formatted.
pub fn emit(loader: MemoryLoader, roots: &[&str]) -> String {
    let mut emitter = Emitter::with_resolver(Resolver::with_loader(loader));
    for root in roots {
        emitter.add_schema(root).unwrap();
    }
    emitter.emit().unwrap()
}
