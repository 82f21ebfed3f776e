//! Resolution of forward references (`Ref`) and derived schemas (`Patch`)
//! against the registry.
//!
//! Declarations are built first with placeholder nodes; a single resolution
//! pass then replaces every placeholder with a concrete attribute tree.
//!
//! ```
//! use rpc_schema::{Attribute, Patch, SchemaRegistry};
//!
//! let mut registry = SchemaRegistry::new();
//! Attribute::dict("share", vec![Attribute::str("path").required()])
//!     .register()
//!     .resolve(&mut registry)
//!     .unwrap();
//!
//! let update = Attribute::patch(
//!     Patch::new("share", "share_update")
//!         .add(Attribute::bool("enabled"))
//!         .attr("update", true),
//! )
//! .resolve(&mut registry)
//! .unwrap();
//!
//! let dict = update.as_dict().unwrap();
//! assert!(dict.update);
//! assert!(dict.get("enabled").is_some());
//! ```

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::attribute::{Attribute, Dict, Kind, StrFormat};
use crate::error::ResolveError;
use crate::registry::SchemaRegistry;

/// In-place transformation applied by a patch `edit` operation.
#[derive(Clone)]
pub struct EditFn(Arc<dyn Fn(&mut Attribute) + Send + Sync>);

impl EditFn {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut Attribute) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }
}

impl fmt::Debug for EditFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EditFn(..)")
    }
}

/// One edit of a [`Patch`]; applied strictly in order.
#[derive(Debug, Clone)]
pub enum PatchOp {
    /// Add a field, replacing one with the same name.
    Add(Attribute),
    /// Remove a field by name.
    Rm(String),
    /// Transform an existing field.
    Edit(String, EditFn),
    /// Set properties on an existing field.
    EditProps(String, Map<String, Value>),
    /// Set properties on the derived schema itself.
    Attr(Map<String, Value>),
}

/// Derivation of a registered dict schema under a new name.
#[derive(Debug, Clone)]
pub struct Patch {
    pub base: String,
    pub new_name: String,
    pub ops: Vec<PatchOp>,
    /// Publish the result under `new_name`.
    pub register: bool,
}

impl Patch {
    pub fn new(base: impl Into<String>, new_name: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            new_name: new_name.into(),
            ops: Vec::new(),
            register: false,
        }
    }

    #[must_use]
    pub fn add(mut self, attr: Attribute) -> Self {
        self.ops.push(PatchOp::Add(attr));
        self
    }

    #[must_use]
    pub fn rm(mut self, name: impl Into<String>) -> Self {
        self.ops.push(PatchOp::Rm(name.into()));
        self
    }

    #[must_use]
    pub fn edit<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut Attribute) + Send + Sync + 'static,
    {
        self.ops.push(PatchOp::Edit(name.into(), EditFn::new(f)));
        self
    }

    /// Set one property on the derived schema.
    #[must_use]
    pub fn attr(mut self, property: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut props = Map::new();
        props.insert(property.into(), value.into());
        self.ops.push(PatchOp::Attr(props));
        self
    }

    #[must_use]
    pub fn op(mut self, op: PatchOp) -> Self {
        self.ops.push(op);
        self
    }

    #[must_use]
    pub fn register(mut self) -> Self {
        self.register = true;
        self
    }

    /// Copy the base, apply every operation in order, optionally publish.
    ///
    /// # Errors
    ///
    /// `SchemaNotFound` when the base is not registered (yet),
    /// `PatchNonDict` when it is not a dict, `FieldNotFound` for `rm`/`edit`
    /// of an absent field.
    pub fn resolve(self, registry: &mut SchemaRegistry) -> Result<Attribute, ResolveError> {
        let base = registry
            .get(&self.base)
            .ok_or_else(|| ResolveError::SchemaNotFound {
                name: self.base.clone(),
            })?;
        if base.as_dict().is_none() {
            return Err(ResolveError::PatchNonDict {
                name: self.base.clone(),
            });
        }

        let mut schema = base.clone();
        schema.name = self.new_name.clone();
        schema.register = false;

        for op in self.ops {
            match op {
                PatchOp::Add(attr) => {
                    let attr = attr.resolve(registry)?;
                    dict_of(&mut schema, &self.base)?.insert(attr);
                }
                PatchOp::Rm(name) => {
                    dict_of(&mut schema, &self.base)?
                        .remove(&name)
                        .ok_or_else(|| field_not_found(&self.base, &name))?;
                }
                PatchOp::Edit(name, f) => {
                    let field = dict_of(&mut schema, &self.base)?
                        .get_mut(&name)
                        .ok_or_else(|| field_not_found(&self.base, &name))?;
                    (f.0)(field);
                }
                PatchOp::EditProps(name, props) => {
                    let field = dict_of(&mut schema, &self.base)?
                        .get_mut(&name)
                        .ok_or_else(|| field_not_found(&self.base, &name))?;
                    for (property, value) in &props {
                        field.set_property(property, value)?;
                    }
                }
                PatchOp::Attr(props) => {
                    for (property, value) in &props {
                        schema.set_property(property, value)?;
                    }
                }
            }
        }

        trace!(base = %self.base, schema = %self.new_name, "patched schema");
        if self.register {
            registry.add(schema.clone())?;
        }
        Ok(schema)
    }
}

fn dict_of<'a>(schema: &'a mut Attribute, base: &str) -> Result<&'a mut Dict, ResolveError> {
    schema
        .as_dict_mut()
        .ok_or_else(|| ResolveError::PatchNonDict {
            name: base.to_string(),
        })
}

fn field_not_found(schema: &str, field: &str) -> ResolveError {
    ResolveError::FieldNotFound {
        schema: schema.to_string(),
        field: field.to_string(),
    }
}

impl Attribute {
    /// Replace placeholders in this tree with concrete attributes and publish
    /// the attribute when `register` is set.
    ///
    /// Resolving an already resolved attribute returns it unchanged.
    ///
    /// # Errors
    ///
    /// Unknown references, bad patches, duplicate registrations and invalid
    /// declarations.
    pub fn resolve(mut self, registry: &mut SchemaRegistry) -> Result<Attribute, ResolveError> {
        if self.resolved {
            return Ok(self);
        }

        match &mut self.kind {
            Kind::Ref(target) => {
                if self.register {
                    return Err(ResolveError::InvalidDeclaration {
                        name: self.name.clone(),
                        message: "a reference cannot be registered".to_string(),
                    });
                }
                let resolved = resolve_ref(target, registry)?;
                return Ok(self.use_site(resolved));
            }
            Kind::Patch(patch) => {
                let mut patch = std::mem::replace(patch, Box::new(Patch::new("", "")));
                patch.register |= self.register;
                let resolved = (*patch).resolve(registry)?;
                return Ok(self.use_site(resolved));
            }
            Kind::List(list) => {
                list.items = resolve_all(std::mem::take(&mut list.items), registry)?;
            }
            Kind::Dict(dict) | Kind::Cron(dict) => {
                dict.attrs = resolve_all(std::mem::take(&mut dict.attrs), registry)?;
            }
            Kind::Str(s) => {
                if let StrFormat::IpAddr(options) = &s.format {
                    options
                        .check_declaration()
                        .map_err(|message| ResolveError::InvalidDeclaration {
                            name: self.name.clone(),
                            message,
                        })?;
                }
            }
            _ => {}
        }

        self.resolved = true;
        if self.register {
            registry.add(self.clone())?;
        }
        Ok(self)
    }
}

fn resolve_all(
    attrs: Vec<Attribute>,
    registry: &mut SchemaRegistry,
) -> Result<Vec<Attribute>, ResolveError> {
    attrs.into_iter().map(|a| a.resolve(registry)).collect()
}

/// A registration-disabled copy of the referent.
impl Attribute {
    /// Flags set on a ref or patch placeholder tighten the schema it
    /// resolved to.
    fn use_site(self, mut schema: Attribute) -> Attribute {
        schema.required |= self.required;
        schema.null |= self.null;
        schema.empty &= self.empty;
        schema.private |= self.private;
        if self.description.is_some() {
            schema.description = self.description;
        }
        if self.default.is_some() {
            schema.default = self.default;
        }
        schema.validators.extend(self.validators);
        schema
    }
}

fn resolve_ref(target: &str, registry: &SchemaRegistry) -> Result<Attribute, ResolveError> {
    let mut schema = registry
        .get(target)
        .cloned()
        .ok_or_else(|| ResolveError::SchemaNotFound {
            name: target.to_string(),
        })?;
    schema.register = false;
    Ok(schema)
}

/// Resolve the parameter lists of every declared unit (a method or a
/// standalone schema) against one registry.
///
/// Units are retried in passes so a reference may point at a schema
/// published by a unit declared later. Each attempt runs on a copy of the
/// registry and is committed only when the whole unit resolves. Results are
/// returned in declaration order.
///
/// # Errors
///
/// The first non-retryable error, or the error of a still-pending unit when
/// a pass makes no progress.
pub fn resolve_methods(
    registry: &mut SchemaRegistry,
    units: Vec<(String, Vec<Attribute>)>,
) -> Result<Vec<Vec<Attribute>>, ResolveError> {
    let mut resolved: Vec<Option<Vec<Attribute>>> = vec![None; units.len()];
    let mut pending: Vec<(usize, String, Vec<Attribute>)> = units
        .into_iter()
        .enumerate()
        .map(|(idx, (name, attrs))| (idx, name, attrs))
        .collect();

    let mut pass = 0;
    while !pending.is_empty() {
        pass += 1;
        debug!(pass, pending = pending.len(), "resolution pass");

        let mut deferred = Vec::new();
        let mut last_error = None;
        let before = pending.len();

        for (idx, name, attrs) in pending {
            let mut staged = registry.clone();
            match resolve_all(attrs.clone(), &mut staged) {
                Ok(done) => {
                    *registry = staged;
                    resolved[idx] = Some(done);
                    trace!(method = %name, "resolved");
                }
                Err(ResolveError::SchemaNotFound { name: missing }) => {
                    trace!(method = %name, missing = %missing, "deferred");
                    last_error = Some(
                        ResolveError::SchemaNotFound { name: missing }.in_method(name.clone()),
                    );
                    deferred.push((idx, name, attrs));
                }
                Err(e) => return Err(e.in_method(name)),
            }
        }

        if deferred.len() == before {
            if let Some(err) = last_error {
                return Err(err);
            }
        }
        pending = deferred;
    }

    Ok(resolved.into_iter().flatten().collect())
}
