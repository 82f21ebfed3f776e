//! Named-schema registry consulted by `Ref` and `Patch` resolution.

use std::collections::HashMap;

use tracing::trace;

use crate::attribute::Attribute;
use crate::error::ResolveError;

/// Store of named, resolved schemas.
///
/// Written only while a service resolves its declarations; the built
/// service keeps it behind an `Arc` and never writes to it again.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, Attribute>,
}

impl SchemaRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema under its own name.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::AlreadyRegistered` if the name is taken.
    pub fn add(&mut self, schema: Attribute) -> Result<(), ResolveError> {
        if self.schemas.contains_key(&schema.name) {
            return Err(ResolveError::AlreadyRegistered {
                name: schema.name.clone(),
            });
        }
        trace!(schema = %schema.name, kind = schema.kind_name(), "registered schema");
        self.schemas.insert(schema.name.clone(), schema);
        Ok(())
    }

    /// Get a schema by name
    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.schemas.get(name)
    }

    /// Check if a schema exists
    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.schemas.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
