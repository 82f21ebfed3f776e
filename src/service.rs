//! Service assembly: collect declarations, resolve them once, and expose
//! the frozen result.
//!
//! ```
//! use rpc_schema::{Attribute, CallArgs, MethodDecl, MethodSignature, ServiceBuilder};
//! use serde_json::json;
//!
//! let mut builder = ServiceBuilder::new();
//! builder.method(
//!     MethodDecl::new(
//!         MethodSignature::new("pool.create", ["data"]),
//!         vec![Attribute::dict("data", vec![Attribute::str("name").required()])],
//!     )
//!     .unwrap(),
//! );
//! let service = builder.build().unwrap();
//!
//! let accepts = service.method("pool.create").unwrap();
//! let params = accepts.bind(&CallArgs::positional(vec![json!({"name": "tank"})])).unwrap();
//! assert_eq!(params, vec![json!({"name": "tank"})]);
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::accepts::{Accepts, MethodDecl};
use crate::attribute::Attribute;
use crate::error::ResolveError;
use crate::registry::SchemaRegistry;
use crate::resolver::resolve_methods;

/// Declarations waiting for resolution.
#[derive(Debug, Default)]
pub struct ServiceBuilder {
    schemas: Vec<Attribute>,
    methods: Vec<MethodDecl>,
}

impl ServiceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a standalone named schema; it is always published.
    pub fn register_schema(&mut self, schema: Attribute) -> &mut Self {
        self.schemas.push(schema.register());
        self
    }

    pub fn method(&mut self, decl: MethodDecl) -> &mut Self {
        self.methods.push(decl);
        self
    }

    /// Resolve every declaration against one registry.
    ///
    /// # Errors
    ///
    /// Returns the first resolution failure, tagged with its method (or
    /// schema) name.
    pub fn build(self) -> Result<Service, ResolveError> {
        let mut registry = SchemaRegistry::new();

        let schema_count = self.schemas.len();
        let mut units: Vec<(String, Vec<Attribute>)> = self
            .schemas
            .into_iter()
            .map(|s| (s.name.clone(), vec![s]))
            .collect();
        let mut signatures = Vec::with_capacity(self.methods.len());
        for decl in self.methods {
            decl.check_arity()?;
            units.push((decl.signature.name.clone(), decl.accepts));
            signatures.push(decl.signature);
        }

        let resolved = resolve_methods(&mut registry, units)?;

        let mut methods = BTreeMap::new();
        for (signature, attrs) in signatures.into_iter().zip(resolved.into_iter().skip(schema_count)) {
            debug!(method = %signature.name, params = attrs.len(), "method ready");
            let name = signature.name.clone();
            if methods.insert(name.clone(), Accepts::new(signature, attrs)).is_some() {
                return Err(ResolveError::InvalidDeclaration {
                    name,
                    message: "method declared twice".to_string(),
                });
            }
        }

        info!(
            methods = methods.len(),
            schemas = registry.len(),
            "service schemas resolved"
        );
        Ok(Service {
            registry: Arc::new(registry),
            methods,
        })
    }
}

/// Resolved, read-only service: methods by name plus the schema registry.
///
/// Cloning is cheap for the registry; safe to share across threads.
#[derive(Debug, Clone)]
pub struct Service {
    registry: Arc<SchemaRegistry>,
    methods: BTreeMap<String, Accepts>,
}

impl Service {
    pub fn method(&self, name: &str) -> Option<&Accepts> {
        self.methods.get(name)
    }

    /// Methods in name order.
    pub fn methods(&self) -> impl Iterator<Item = &Accepts> {
        self.methods.values()
    }

    pub fn schema(&self, name: &str) -> Option<&Attribute> {
        self.registry.get(name)
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// `{method: [parameter schema, ...]}` for every method.
    pub fn json_schema(&self) -> Value {
        let mut out = Map::new();
        for (name, accepts) in &self.methods {
            out.insert(name.clone(), Value::Array(accepts.json_schema()));
        }
        Value::Object(out)
    }

    /// Redacted rendering of a call's arguments; unknown methods pass the
    /// arguments through unchanged.
    pub fn dump_args(&self, method: &str, args: &[Value]) -> Vec<Value> {
        match self.methods.get(method) {
            Some(accepts) => accepts.dump_args(args),
            None => args.to_vec(),
        }
    }
}
