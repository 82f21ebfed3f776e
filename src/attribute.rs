//! Attribute descriptors: typed, named nodes that clean, validate, dump and
//! describe one value.
//!
//! An attribute tree is built once when a method is declared and is never
//! mutated by a call. Raw input arrives as `Option<Value>`: `None` means the
//! caller did not provide the value at all, `Some(Value::Null)` is an
//! explicit null. Only "not provided" consults the default.
//!
//! # Example
//!
//! ```
//! use rpc_schema::Attribute;
//! use serde_json::json;
//!
//! let attr = Attribute::dict("data", vec![
//!     Attribute::int("a").required(),
//!     Attribute::int("b").default(json!(10)),
//! ]);
//!
//! let cleaned = attr.clean(Some(json!({"a": 5}))).unwrap();
//! assert_eq!(cleaned, json!({"a": 5, "b": 10}));
//! ```

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Map, Number, Value};

use crate::cron::{check_expression, cron_expression, CRON_FIELDS};
use crate::error::{Error, ResolveError, ValidationErrors};
use crate::ipaddr::IpAddrOptions;
use crate::resolver::Patch;
use crate::types::{display_value, EISDIR, ENOENT, ENOTDIR, REDACTED};

/// Semantic check attached to an attribute, run by `validate`.
///
/// The error string becomes the entry message.
#[derive(Clone)]
pub struct Validator(Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>);

impl Validator {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn check(&self, value: &Value) -> Result<(), String> {
        (self.0)(value)
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Validator(..)")
    }
}

/// A typed, named schema node.
#[derive(Debug, Clone)]
pub struct Attribute {
    /// Unique within the enclosing composite.
    pub name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub required: bool,
    /// Whether an explicit `null` is accepted.
    pub null: bool,
    /// Whether empty strings and lists are accepted.
    pub empty: bool,
    /// Redact the value in dumps.
    pub private: bool,
    /// `Some` means the attribute has a default.
    pub default: Option<Value>,
    pub validators: Vec<Validator>,
    /// Publish into the registry under `name` when resolved.
    pub register: bool,
    pub kind: Kind,
    pub(crate) resolved: bool,
}

/// The closed set of attribute variants.
#[derive(Debug, Clone)]
pub enum Kind {
    Any,
    Str(Str),
    Int(Choices),
    Float(Choices),
    Bool,
    List(List),
    Dict(Dict),
    Cron(Dict),
    /// Placeholder for a registered schema, replaced on resolution.
    Ref(String),
    /// Derivation of a registered dict, replaced on resolution.
    Patch(Box<Patch>),
}

/// Optional enum constraint.
pub type Choices = Option<Vec<Value>>;

/// String attribute and its specialized formats.
#[derive(Debug, Clone, Default)]
pub struct Str {
    pub choices: Choices,
    pub format: StrFormat,
}

#[derive(Debug, Clone, Default)]
pub enum StrFormat {
    #[default]
    Plain,
    /// Existing directory.
    Dir,
    /// Existing regular file.
    File,
    /// Octal permission between 000 and 777.
    UnixPerm,
    IpAddr(IpAddrOptions),
}

/// Ordered sequence with candidate item types.
#[derive(Debug, Clone, Default)]
pub struct List {
    pub items: Vec<Attribute>,
    pub unique: bool,
    pub choices: Choices,
}

/// Named mapping of child attributes, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct Dict {
    pub attrs: Vec<Attribute>,
    /// Accept keys that are not declared.
    pub additional_attrs: bool,
    /// Partial-update mode: no required checks, no default filling.
    pub update: bool,
}

impl Dict {
    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attrs.iter().find(|a| a.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Attribute> {
        self.attrs.iter_mut().find(|a| a.name == name)
    }

    /// Insert or replace (in place) the child with the same name.
    pub fn insert(&mut self, attr: Attribute) {
        match self.attrs.iter_mut().find(|a| a.name == attr.name) {
            Some(slot) => *slot = attr,
            None => self.attrs.push(attr),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Attribute> {
        let idx = self.attrs.iter().position(|a| a.name == name)?;
        Some(self.attrs.remove(idx))
    }
}

// Construction

impl Attribute {
    pub fn new(name: impl Into<String>, kind: Kind) -> Self {
        Self {
            name: name.into(),
            title: None,
            description: None,
            required: false,
            null: false,
            empty: true,
            private: false,
            default: None,
            validators: Vec::new(),
            register: false,
            kind,
            resolved: false,
        }
    }

    pub fn any(name: impl Into<String>) -> Self {
        Self::new(name, Kind::Any)
    }

    pub fn str(name: impl Into<String>) -> Self {
        Self::new(name, Kind::Str(Str::default()))
    }

    pub fn dir(name: impl Into<String>) -> Self {
        Self::str_format(name, StrFormat::Dir)
    }

    pub fn file(name: impl Into<String>) -> Self {
        Self::str_format(name, StrFormat::File)
    }

    pub fn unix_perm(name: impl Into<String>) -> Self {
        Self::str_format(name, StrFormat::UnixPerm)
    }

    pub fn ipaddr(name: impl Into<String>, options: IpAddrOptions) -> Self {
        Self::str_format(name, StrFormat::IpAddr(options))
    }

    fn str_format(name: impl Into<String>, format: StrFormat) -> Self {
        Self::new(
            name,
            Kind::Str(Str {
                choices: None,
                format,
            }),
        )
    }

    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, Kind::Int(None))
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, Kind::Float(None))
    }

    pub fn bool(name: impl Into<String>) -> Self {
        Self::new(name, Kind::Bool)
    }

    pub fn list(name: impl Into<String>, items: Vec<Attribute>) -> Self {
        Self::new(
            name,
            Kind::List(List {
                items,
                ..Default::default()
            }),
        )
    }

    /// A dict defaults to `{}` unless another default is set.
    pub fn dict(name: impl Into<String>, attrs: Vec<Attribute>) -> Self {
        let mut attr = Self::new(
            name,
            Kind::Dict(Dict {
                attrs,
                ..Default::default()
            }),
        );
        attr.default = Some(json!({}));
        attr
    }

    /// Five-field schedule; every field is an optional string.
    pub fn cron(name: impl Into<String>) -> Self {
        let attrs = CRON_FIELDS.iter().map(|f| Attribute::str(*f)).collect();
        let mut attr = Self::new(
            name,
            Kind::Cron(Dict {
                attrs,
                ..Default::default()
            }),
        );
        attr.default = Some(json!({}));
        attr
    }

    /// Placeholder for the registered schema `name`.
    pub fn reference(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(name.clone(), Kind::Ref(name))
    }

    /// Derived schema; named after the patch's new name.
    pub fn patch(patch: Patch) -> Self {
        Self::new(patch.new_name.clone(), Kind::Patch(Box::new(patch)))
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.null = true;
        self
    }

    #[must_use]
    pub fn non_empty(mut self) -> Self {
        self.empty = false;
        self
    }

    #[must_use]
    pub fn private(mut self) -> Self {
        self.private = true;
        self
    }

    #[must_use]
    pub fn default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn validator<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validators.push(Validator::new(f));
        self
    }

    #[must_use]
    pub fn register(mut self) -> Self {
        self.register = true;
        self
    }

    /// Restrict allowed values. Applies to `Str`, `Int`, `Float` and `List`
    /// (per element); other kinds ignore it.
    #[must_use]
    pub fn choices<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = Some(values.into_iter().map(Into::into).collect());
        match &mut self.kind {
            Kind::Str(s) => s.choices = values,
            Kind::Int(c) | Kind::Float(c) => *c = values,
            Kind::List(l) => l.choices = values,
            _ => {}
        }
        self
    }

    #[must_use]
    pub fn unique(mut self) -> Self {
        if let Kind::List(l) = &mut self.kind {
            l.unique = true;
        }
        self
    }

    #[must_use]
    pub fn additional_attrs(mut self) -> Self {
        if let Kind::Dict(d) | Kind::Cron(d) = &mut self.kind {
            d.additional_attrs = true;
        }
        self
    }

    #[must_use]
    pub fn update(mut self) -> Self {
        if let Kind::Dict(d) | Kind::Cron(d) = &mut self.kind {
            d.update = true;
        }
        self
    }

    /// Display title; the name when none was given.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.name)
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// The child mapping of a `Dict` (or `Cron`).
    pub fn as_dict(&self) -> Option<&Dict> {
        match &self.kind {
            Kind::Dict(d) | Kind::Cron(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_dict_mut(&mut self) -> Option<&mut Dict> {
        match &mut self.kind {
            Kind::Dict(d) | Kind::Cron(d) => Some(d),
            _ => None,
        }
    }

    /// Set a property by name, as used by patch `attr`/`edit` operations and
    /// declaration documents.
    pub fn set_property(&mut self, property: &str, value: &Value) -> Result<(), ResolveError> {
        let name = self.name.clone();
        let expect = |expected: &str| ResolveError::InvalidProperty {
            attribute: name.clone(),
            property: property.to_string(),
            expected: expected.to_string(),
        };
        match property {
            "title" | "description" => {
                let text = match value {
                    Value::String(s) => Some(s.clone()),
                    Value::Null => None,
                    _ => return Err(expect("string or null")),
                };
                if property == "title" {
                    self.title = text;
                } else {
                    self.description = text;
                }
            }
            "default" => self.default = Some(value.clone()),
            "required" | "null" | "empty" | "private" | "register" | "update"
            | "additional_attrs" | "unique" => {
                let flag = value.as_bool().ok_or_else(|| expect("boolean"))?;
                self.set_flag(property, flag)?;
            }
            _ => {
                return Err(ResolveError::UnknownProperty {
                    attribute: self.name.clone(),
                    property: property.to_string(),
                })
            }
        }
        Ok(())
    }

    fn set_flag(&mut self, property: &str, flag: bool) -> Result<(), ResolveError> {
        match (property, &mut self.kind) {
            ("required", _) => self.required = flag,
            ("null", _) => self.null = flag,
            ("empty", _) => self.empty = flag,
            ("private", _) => self.private = flag,
            ("register", _) => self.register = flag,
            ("update", Kind::Dict(d) | Kind::Cron(d)) => d.update = flag,
            ("additional_attrs", Kind::Dict(d) | Kind::Cron(d)) => d.additional_attrs = flag,
            ("unique", Kind::List(l)) => l.unique = flag,
            _ => {
                return Err(ResolveError::UnknownProperty {
                    attribute: self.name.clone(),
                    property: property.to_string(),
                })
            }
        }
        Ok(())
    }
}

// Clean

impl Attribute {
    /// Canonicalize raw input.
    ///
    /// `None` (not provided) yields a fresh copy of the default or
    /// `attribute required`. A dict default is cleaned like input, so its
    /// children get their own defaults and required checks.
    pub fn clean(&self, value: Option<Value>) -> Result<Value, Error> {
        let Some(value) = value else {
            return match (&self.default, &self.kind) {
                (Some(default @ Value::Object(_)), Kind::Dict(d) | Kind::Cron(d)) => {
                    self.clean_dict(d, default.clone())
                }
                (Some(default), _) => Ok(default.clone()),
                (None, _) => Err(self.error("attribute required")),
            };
        };

        if value.is_null() {
            if !self.null {
                return Err(self.error("null not allowed"));
            }
            return Ok(match &self.kind {
                Kind::Dict(_) | Kind::Cron(_) => {
                    self.default.clone().unwrap_or_else(|| json!({}))
                }
                Kind::List(_) => self.default.clone().unwrap_or(Value::Null),
                _ => Value::Null,
            });
        }

        match &self.kind {
            Kind::Any => Ok(value),
            Kind::Str(s) => {
                let value = self.clean_str(value)?;
                self.check_choices(&s.choices, value)
            }
            Kind::Int(choices) => {
                let value = self.clean_int(value)?;
                self.check_choices(choices, value)
            }
            Kind::Float(choices) => {
                let value = self.clean_float(value)?;
                self.check_choices(choices, value)
            }
            Kind::Bool => match value {
                Value::Bool(_) => Ok(value),
                _ => Err(self.error("Not a boolean")),
            },
            Kind::List(l) => self.clean_list(l, value),
            Kind::Dict(d) | Kind::Cron(d) => self.clean_dict(d, value),
            Kind::Ref(_) | Kind::Patch(_) => Err(self.unresolved()),
        }
    }

    fn clean_str(&self, value: Value) -> Result<Value, Error> {
        let s = match value {
            Value::String(s) => s,
            // integers stringify; booleans are not numbers in JSON
            Value::Number(n) if n.is_i64() || n.is_u64() => n.to_string(),
            _ => return Err(self.error("Not a string")),
        };
        if !self.empty && s.is_empty() {
            return Err(self.error("Empty value not allowed"));
        }
        Ok(Value::String(s))
    }

    fn clean_int(&self, value: Value) -> Result<Value, Error> {
        match &value {
            Value::Number(n) if n.is_i64() || n.is_u64() => return Ok(value),
            Value::String(s) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => {
                if let Ok(n) = s.parse::<u64>() {
                    return Ok(Value::from(n));
                }
            }
            _ => {}
        }
        Err(self.error("Not an integer"))
    }

    fn clean_float(&self, value: Value) -> Result<Value, Error> {
        let parsed = match &value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        parsed
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| self.error("Not a floating point number"))
    }

    fn clean_list(&self, list: &List, value: Value) -> Result<Value, Error> {
        let Value::Array(elements) = value else {
            return Err(self.error("Not a list"));
        };
        if !self.empty && elements.is_empty() {
            return Err(self.error("Empty value not allowed"));
        }

        let elements = if list.items.is_empty() {
            elements
        } else {
            let mut cleaned = Vec::with_capacity(elements.len());
            for (index, element) in elements.into_iter().enumerate() {
                cleaned.push(self.clean_list_item(list, index, element)?);
            }
            cleaned
        };

        if let Some(choices) = &list.choices {
            if let Some(bad) = elements.iter().find(|v| !choices.contains(v)) {
                return Err(self.error(format!("Invalid choice: {}", display_value(bad))));
            }
        }
        Ok(Value::Array(elements))
    }

    /// First candidate that accepts the element wins.
    fn clean_list_item(&self, list: &List, index: usize, element: Value) -> Result<Value, Error> {
        let mut failures = Vec::new();
        for item in &list.items {
            match item.clean(Some(element.clone())) {
                Ok(v) => return Ok(v),
                Err(e) => failures.push(e.to_string()),
            }
        }
        Err(self.error(format!(
            "Item#{} is not valid per list types: {}",
            index,
            failures.join(", ")
        )))
    }

    fn clean_dict(&self, dict: &Dict, value: Value) -> Result<Value, Error> {
        let Value::Object(data) = value else {
            return Err(self.error("A dict was expected"));
        };

        let mut cleaned = Map::new();
        for (key, v) in data {
            match dict.get(&key) {
                Some(attr) => {
                    cleaned.insert(key, attr.clean(Some(v))?);
                }
                None if dict.additional_attrs => {
                    cleaned.insert(key, v);
                }
                None => return Err(Error::new(key, "Field was not expected")),
            }
        }

        if !dict.update {
            for attr in &dict.attrs {
                if !cleaned.contains_key(&attr.name) && (attr.required || attr.has_default()) {
                    cleaned.insert(attr.name.clone(), attr.clean(None)?);
                }
            }
        }
        Ok(Value::Object(cleaned))
    }

    fn check_choices(&self, choices: &Choices, value: Value) -> Result<Value, Error> {
        match choices {
            Some(allowed) if !allowed.contains(&value) => Err(self.error(format!(
                "Invalid choice: {}",
                display_value(&value)
            ))),
            _ => Ok(value),
        }
    }

    fn error(&self, errmsg: impl Into<String>) -> Error {
        Error::new(&self.name, errmsg)
    }

    fn unresolved(&self) -> Error {
        Error::new(&self.name, "Schema reference was not resolved")
    }
}

// Validate

impl Attribute {
    /// Check semantic constraints of an already cleaned value, collecting
    /// every failure. `null` is always accepted here.
    pub fn validate(&self, value: &Value) -> Result<(), ValidationErrors> {
        if value.is_null() {
            return Ok(());
        }

        let mut verrors = ValidationErrors::new();
        match &self.kind {
            Kind::Str(s) => {
                if let Value::String(text) = value {
                    self.validate_str_format(&s.format, text, &mut verrors);
                }
            }
            Kind::List(l) => self.validate_list(l, value, &mut verrors),
            Kind::Dict(d) => self.validate_dict_children(d, value, &mut verrors),
            Kind::Cron(d) => self.validate_cron(d, value, &mut verrors),
            _ => {}
        }

        // custom validators run only when the format checks pass
        if verrors.is_empty() {
            for validator in &self.validators {
                if let Err(msg) = validator.check(value) {
                    verrors.add_invalid(&self.name, msg);
                }
            }
        }
        verrors.check()
    }

    fn validate_str_format(&self, format: &StrFormat, text: &str, verrors: &mut ValidationErrors) {
        match format {
            StrFormat::Plain => {}
            StrFormat::Dir | StrFormat::File if text.is_empty() => {}
            StrFormat::Dir => {
                let path = Path::new(text);
                if !path.exists() {
                    verrors.add(&self.name, "This path does not exist.", ENOENT);
                } else if !path.is_dir() {
                    verrors.add(&self.name, "This path is not a directory.", ENOTDIR);
                }
            }
            StrFormat::File => {
                let path = Path::new(text);
                if !path.exists() {
                    verrors.add(&self.name, "This path does not exist.", ENOENT);
                } else if !path.is_file() {
                    verrors.add(&self.name, "This path is not a file.", EISDIR);
                }
            }
            StrFormat::UnixPerm => match u32::from_str_radix(text.trim(), 8) {
                Ok(mode) if mode & 0o777 == mode => {}
                Ok(_) => verrors.add_invalid(&self.name, "Please supply a value between 000 and 777"),
                Err(_) => verrors.add_invalid(
                    &self.name,
                    "Not a valid integer. Must be between 000 and 777",
                ),
            },
            StrFormat::IpAddr(_) if text.is_empty() => {}
            StrFormat::IpAddr(options) => {
                if let Err(msg) = options.check(text) {
                    verrors.add_invalid(&self.name, msg);
                }
            }
        }
    }

    fn validate_list(&self, list: &List, value: &Value, verrors: &mut ValidationErrors) {
        let Value::Array(elements) = value else {
            return;
        };

        let mut seen: Vec<&Value> = Vec::new();
        for (index, element) in elements.iter().enumerate() {
            let path = format!("{}.{}", self.name, index);
            if list.unique {
                if seen.contains(&element) {
                    verrors.add_invalid(&path, "This value is not unique.");
                }
                seen.push(element);
            }
            if let Some(item) = Self::matching_item(list, element) {
                if let Err(e) = item.validate(element) {
                    verrors.add_child(&path, e);
                }
            }
        }
    }

    /// The candidate an element was cleaned with: the first that accepts it.
    fn matching_item<'a>(list: &'a List, element: &Value) -> Option<&'a Attribute> {
        list.items
            .iter()
            .find(|item| item.clean(Some(element.clone())).is_ok())
            .or_else(|| list.items.first())
    }

    fn validate_dict_children(&self, dict: &Dict, value: &Value, verrors: &mut ValidationErrors) {
        let Value::Object(map) = value else {
            return;
        };
        for attr in &dict.attrs {
            if let Some(child) = map.get(&attr.name) {
                if let Err(e) = attr.validate(child) {
                    verrors.add_child(&self.name, e);
                }
            }
        }
    }

    fn validate_cron(&self, dict: &Dict, value: &Value, verrors: &mut ValidationErrors) {
        let Value::Object(map) = value else {
            return;
        };
        self.validate_dict_children(dict, value, verrors);
        for key in map.keys() {
            if !CRON_FIELDS.contains(&key.as_str()) {
                verrors.add_invalid(&self.name, format!("Unexpected {} value", key));
            }
        }
        if !verrors.is_empty() {
            return;
        }
        if let Err(e) = check_expression(&cron_expression(map)) {
            verrors.add_invalid(
                &self.name,
                format!("Please ensure fields match cron syntax - {}", e),
            );
        }
    }
}

// Dump and describe

impl Attribute {
    /// Copy of `value` with private parts redacted, for logs.
    pub fn dump(&self, value: &Value) -> Value {
        if self.private {
            return Value::String(REDACTED.to_string());
        }
        match (&self.kind, value) {
            (Kind::List(l), _) if l.items.iter().any(|i| i.private) => {
                Value::String(REDACTED.to_string())
            }
            (Kind::Dict(d) | Kind::Cron(d), Value::Object(map)) => Value::Object(
                map.iter()
                    .map(|(k, v)| {
                        let dumped = d.get(k).map_or_else(|| v.clone(), |attr| attr.dump(v));
                        (k.clone(), dumped)
                    })
                    .collect(),
            ),
            _ => value.clone(),
        }
    }

    /// JSON-Schema flavored description of this attribute.
    ///
    /// Top-level documents (`nested == false`) also carry `title`,
    /// `description` and the `_required_` marker.
    pub fn to_json_schema(&self, nested: bool) -> Value {
        let mut schema = Map::new();
        if !nested {
            schema.insert("title".into(), json!(self.display_title()));
            if let Some(description) = &self.description {
                schema.insert("description".into(), json!(description));
            }
            schema.insert("_required_".into(), json!(self.required));
        }

        match &self.kind {
            Kind::Any => {
                schema.insert(
                    "anyOf".into(),
                    json!([
                        {"type": "string"},
                        {"type": "integer"},
                        {"type": "boolean"},
                        {"type": "object"},
                        {"type": "array"},
                    ]),
                );
            }
            Kind::Str(s) => {
                schema.insert("type".into(), self.json_type("string"));
                insert_enum(&mut schema, &s.choices);
            }
            Kind::Int(choices) => {
                schema.insert("type".into(), self.json_type("integer"));
                insert_enum(&mut schema, choices);
            }
            Kind::Float(choices) => {
                schema.insert("type".into(), self.json_type("number"));
                insert_enum(&mut schema, choices);
            }
            Kind::Bool => {
                schema.insert("type".into(), self.json_type("boolean"));
            }
            Kind::List(l) => {
                schema.insert("type".into(), self.json_type("array"));
                insert_enum(&mut schema, &l.choices);
                let mut items: Vec<Value> = l
                    .items
                    .iter()
                    .map(|item| match item.to_json_schema(true).get("type") {
                        Some(Value::Array(types)) => json!({ "type": types[0] }),
                        Some(other) => json!({ "type": other }),
                        None => json!({}),
                    })
                    .collect();
                if items.is_empty() {
                    items.push(json!({"type": "null"}));
                }
                schema.insert("items".into(), Value::Array(items));
            }
            Kind::Dict(d) | Kind::Cron(d) => {
                schema.insert("type".into(), json!("object"));
                let properties: Map<String, Value> = d
                    .attrs
                    .iter()
                    .map(|a| (a.name.clone(), a.to_json_schema(true)))
                    .collect();
                schema.insert("properties".into(), Value::Object(properties));
                schema.insert("additionalProperties".into(), json!(d.additional_attrs));
            }
            Kind::Ref(target) => {
                schema.insert("$ref".into(), json!(target));
            }
            Kind::Patch(p) => {
                schema.insert("$ref".into(), json!(p.base));
            }
        }
        Value::Object(schema)
    }

    /// Not-required attributes also admit `null`.
    fn json_type(&self, base: &str) -> Value {
        if self.required {
            json!(base)
        } else {
            json!([base, "null"])
        }
    }

    /// Short kind label for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            Kind::Any => "any",
            Kind::Str(s) => match s.format {
                StrFormat::Plain => "str",
                StrFormat::Dir => "dir",
                StrFormat::File => "file",
                StrFormat::UnixPerm => "unixperm",
                StrFormat::IpAddr(_) => "ipaddr",
            },
            Kind::Int(_) => "int",
            Kind::Float(_) => "float",
            Kind::Bool => "bool",
            Kind::List(_) => "list",
            Kind::Dict(_) => "dict",
            Kind::Cron(_) => "cron",
            Kind::Ref(_) => "ref",
            Kind::Patch(_) => "patch",
        }
    }
}

fn insert_enum(schema: &mut Map<String, Value>, choices: &Choices) {
    if let Some(values) = choices {
        schema.insert("enum".into(), Value::Array(values.clone()));
    }
}
