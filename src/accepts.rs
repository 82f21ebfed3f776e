//! Binding of call arguments to a method's parameter schemas.
//!
//! A method is declared as a [`MethodSignature`] plus one attribute per
//! non-context parameter ([`MethodDecl`]). Once resolved, the pair becomes
//! an [`Accepts`], the only thing that can clean and validate a call.

use std::collections::HashMap;
use std::future::Future;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::attribute::Attribute;
use crate::error::{CallError, ResolveError, ValidationErrors};

/// Shape of the wrapped callable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodSignature {
    /// Dotted method name, e.g. `pool.create`.
    pub name: String,
    /// Names of the non-context parameters, in order.
    pub params: Vec<String>,
    /// The method receives the calling application handle.
    pub pass_app: bool,
    /// The method receives a job handle.
    pub job: bool,
}

impl MethodSignature {
    pub fn new<I, S>(name: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            params: params.into_iter().map(Into::into).collect(),
            pass_app: false,
            job: false,
        }
    }

    #[must_use]
    pub fn pass_app(mut self) -> Self {
        self.pass_app = true;
        self
    }

    #[must_use]
    pub fn job(mut self) -> Self {
        self.job = true;
        self
    }
}

/// Raw arguments of one call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    pub positional: Vec<Value>,
    pub keyword: Map<String, Value>,
}

impl CallArgs {
    pub fn positional(values: Vec<Value>) -> Self {
        Self {
            positional: values,
            keyword: Map::new(),
        }
    }

    pub fn keyword(values: Map<String, Value>) -> Self {
        Self {
            positional: Vec::new(),
            keyword: values,
        }
    }

    /// Split a JSON `params` member: an array is positional, an object is
    /// keyword, `null` is no arguments. Anything else is `None`.
    pub fn from_params(params: Value) -> Option<Self> {
        match params {
            Value::Array(values) => Some(Self::positional(values)),
            Value::Object(values) => Some(Self::keyword(values)),
            Value::Null => Some(Self::default()),
            _ => None,
        }
    }
}

/// A declared, not yet resolved method.
#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub signature: MethodSignature,
    pub accepts: Vec<Attribute>,
}

impl MethodDecl {
    /// Pair a signature with its parameter schemas.
    ///
    /// # Errors
    ///
    /// `ArityMismatch` unless there is exactly one schema per non-context
    /// parameter.
    pub fn new(signature: MethodSignature, accepts: Vec<Attribute>) -> Result<Self, ResolveError> {
        let decl = Self {
            signature,
            accepts,
        };
        decl.check_arity()?;
        Ok(decl)
    }

    /// Exactly one schema per non-context parameter.
    pub fn check_arity(&self) -> Result<(), ResolveError> {
        if self.signature.params.len() != self.accepts.len() {
            return Err(ResolveError::ArityMismatch {
                method: self.signature.name.clone(),
                expected: self.signature.params.len(),
                actual: self.accepts.len(),
            });
        }
        Ok(())
    }

    /// Signature whose parameter names are the attribute names.
    pub fn from_attributes(name: impl Into<String>, accepts: Vec<Attribute>) -> Self {
        let params: Vec<String> = accepts.iter().map(|a| a.name.clone()).collect();
        Self {
            signature: MethodSignature::new(name, params),
            accepts,
        }
    }
}

/// A method's resolved parameter schemas.
#[derive(Debug, Clone)]
pub struct Accepts {
    signature: MethodSignature,
    attrs: Vec<Attribute>,
    /// Parameter name to position.
    index: HashMap<String, usize>,
}

impl Accepts {
    pub(crate) fn new(signature: MethodSignature, attrs: Vec<Attribute>) -> Self {
        let index = signature
            .params
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self {
            signature,
            attrs,
            index,
        }
    }

    pub fn name(&self) -> &str {
        &self.signature.name
    }

    pub fn signature(&self) -> &MethodSignature {
        &self.signature
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attrs
    }

    /// Clean and validate one call's arguments.
    ///
    /// Positional values fill parameters in order, keyword values by name,
    /// and the remaining parameters are "not provided". Every attribute is
    /// processed so one failure does not hide the others. The caller's
    /// values are never modified.
    ///
    /// # Errors
    ///
    /// All collected failures when any parameter fails.
    pub fn bind(&self, args: &CallArgs) -> Result<Vec<Value>, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut slots: Vec<Option<Value>> = vec![None; self.attrs.len()];

        if args.positional.len() > self.attrs.len() {
            errors.add_invalid(
                self.signature.name.as_str(),
                format!(
                    "Too many arguments (expected at most {}, got {})",
                    self.attrs.len(),
                    args.positional.len()
                ),
            );
        }
        for (slot, value) in slots.iter_mut().zip(&args.positional) {
            *slot = Some(value.clone());
        }

        for (key, value) in &args.keyword {
            match self.index.get(key) {
                Some(&i) if i < args.positional.len() => {
                    errors.add_invalid(key.as_str(), "Got multiple values for argument");
                }
                Some(&i) => match slots.get_mut(i) {
                    Some(slot) => *slot = Some(value.clone()),
                    None => errors.add_invalid(key.as_str(), "Unexpected keyword argument"),
                },
                None => errors.add_invalid(key.as_str(), "Unexpected keyword argument"),
            }
        }

        let mut params = Vec::with_capacity(self.attrs.len());
        for (attr, raw) in self.attrs.iter().zip(slots) {
            match attr.clean(raw) {
                Ok(value) => {
                    if let Err(e) = attr.validate(&value) {
                        errors.extend(e);
                    }
                    params.push(value);
                }
                Err(e) => errors.add_error(e),
            }
        }

        errors.check()?;
        Ok(params)
    }

    /// Bind, then invoke `method` with the context and the cleaned values.
    ///
    /// `ctx` is whatever the signature asks for in front of the parameters
    /// (an application handle, a job handle, both or `()`).
    pub fn call<C, R, E, F>(&self, ctx: C, args: &CallArgs, method: F) -> Result<R, CallError<E>>
    where
        F: FnOnce(C, Vec<Value>) -> Result<R, E>,
    {
        let params = self.bind(args).map_err(|e| self.rejected(args, e))?;
        method(ctx, params).map_err(CallError::Method)
    }

    /// [`Accepts::call`] for an asynchronous method; the body only starts
    /// after binding succeeded.
    pub async fn call_async<C, R, E, F, Fut>(
        &self,
        ctx: C,
        args: &CallArgs,
        method: F,
    ) -> Result<R, CallError<E>>
    where
        F: FnOnce(C, Vec<Value>) -> Fut,
        Fut: Future<Output = Result<R, E>>,
    {
        let params = self.bind(args).map_err(|e| self.rejected(args, e))?;
        method(ctx, params).await.map_err(CallError::Method)
    }

    fn rejected<E>(&self, args: &CallArgs, errors: ValidationErrors) -> CallError<E> {
        let positional = Value::Array(self.dump_args(&args.positional));
        let keyword = Value::Object(self.dump_kwargs(&args.keyword));
        debug!(
            method = %self.signature.name,
            errors = errors.len(),
            args = %positional,
            kwargs = %keyword,
            "call arguments rejected"
        );
        CallError::Validation(errors)
    }

    /// Printable rendering of positional arguments, private values masked.
    ///
    /// Arguments beyond the declared parameters are passed through.
    pub fn dump_args(&self, args: &[Value]) -> Vec<Value> {
        args.iter()
            .enumerate()
            .map(|(i, value)| match self.attrs.get(i) {
                Some(attr) => attr.dump(value),
                None => value.clone(),
            })
            .collect()
    }

    /// [`Accepts::dump_args`] for keyword arguments, matched by parameter
    /// name. Unknown names are passed through.
    pub fn dump_kwargs(&self, args: &Map<String, Value>) -> Map<String, Value> {
        args.iter()
            .map(|(key, value)| {
                let dumped = match self.index.get(key).and_then(|&i| self.attrs.get(i)) {
                    Some(attr) => attr.dump(value),
                    None => value.clone(),
                };
                (key.clone(), dumped)
            })
            .collect()
    }

    /// JSON Schema of every parameter, in order.
    pub fn json_schema(&self) -> Vec<Value> {
        self.attrs.iter().map(|a| a.to_json_schema(false)).collect()
    }
}
