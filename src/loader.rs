//! Declaration loading from files, strings, and HTTP URLs.
//!
//! A declaration document is JSON:
//!
//! ```json
//! {
//!   "include": ["common.json"],
//!   "schemas": [{"type": "dict", "name": "share", "attrs": [...]}],
//!   "methods": {
//!     "share.create": {"params": ["data"], "accepts": [{"type": "ref", "name": "share"}]}
//!   }
//! }
//! ```
//!
//! Includes are relative to the including document and are loaded before
//! it; a document reached twice is only loaded once.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::accepts::{MethodDecl, MethodSignature};
use crate::attribute::Attribute;
use crate::error::LoadError;
use crate::ipaddr::IpAddrOptions;
use crate::resolver::{Patch, PatchOp};
use crate::service::{Service, ServiceBuilder};
use crate::types::json_type_name;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

const PROPERTY_KEYS: &[&str] = &[
    "title",
    "description",
    "required",
    "null",
    "empty",
    "private",
    "default",
    "register",
];

const NO_KEYS: &[&str] = &[];
const ENUM_KEYS: &[&str] = &["enum"];
const LIST_KEYS: &[&str] = &["items", "enum", "unique"];
const DICT_KEYS: &[&str] = &["attrs", "additional_attrs", "update"];

const IPADDR_KEYS: &[&str] = &[
    "cidr",
    "network",
    "network_strict",
    "v4",
    "v6",
    "allow_zone_index",
];

/// Parsed, unresolved declarations of one or more documents.
#[derive(Debug, Default)]
pub struct Declarations {
    pub schemas: Vec<Attribute>,
    pub methods: Vec<MethodDecl>,
}

impl Declarations {
    pub fn merge(&mut self, other: Declarations) {
        self.schemas.extend(other.schemas);
        self.methods.extend(other.methods);
    }

    pub fn into_builder(self) -> ServiceBuilder {
        let mut builder = ServiceBuilder::new();
        for schema in self.schemas {
            builder.register_schema(schema);
        }
        for method in self.methods {
            builder.method(method);
        }
        builder
    }

    /// Resolve into a service.
    pub fn build(self) -> Result<Service, LoadError> {
        Ok(self.into_builder().build()?)
    }
}

/// Load a JSON document from a file path.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist,
/// or `LoadError::InvalidJson` if the file isn't valid JSON.
pub fn load_json(path: &Path) -> Result<Value, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    load_json_str(&content)
}

/// Load a JSON document from a string.
pub fn load_json_str(content: &str) -> Result<Value, LoadError> {
    serde_json::from_str(content).map_err(|source| LoadError::InvalidJson { source })
}

/// Load a JSON document from an HTTP/HTTPS URL.
///
/// Requires the `remote` feature (enabled by default).
///
/// # Errors
///
/// Returns `LoadError::NetworkError` if the request fails or the body
/// isn't JSON.
#[cfg(feature = "remote")]
pub fn load_json_url(url: &str) -> Result<Value, LoadError> {
    let network = |source| LoadError::NetworkError {
        url: url.to_string(),
        source,
    };

    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(network)?;

    client
        .get(url)
        .send()
        .and_then(|response| response.error_for_status())
        .and_then(|response| response.json())
        .map_err(network)
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Load a JSON document from a file path or URL.
pub fn load_json_auto(source: &str) -> Result<Value, LoadError> {
    if is_url(source) {
        #[cfg(feature = "remote")]
        {
            load_json_url(source)
        }
        #[cfg(not(feature = "remote"))]
        {
            Err(LoadError::FileNotFound {
                path: PathBuf::from(source),
            })
        }
    } else {
        load_json(Path::new(source))
    }
}

/// Load a declaration document and everything it includes.
///
/// # Errors
///
/// IO and network failures, malformed documents and include cycles.
pub fn load_declarations(source: &str) -> Result<Declarations, LoadError> {
    let mut state = IncludeState::default();
    load_with_includes(source, &mut state)
}

/// Parse a declaration document held in a string. Includes are resolved
/// relative to the current directory.
pub fn load_declarations_str(content: &str) -> Result<Declarations, LoadError> {
    let doc = load_json_str(content)?;
    let mut state = IncludeState::default();
    let mut decls = Declarations::default();
    for include in includes(&doc)? {
        decls.merge(load_with_includes(include, &mut state)?);
    }
    decls.merge(parse_declarations(&doc)?);
    Ok(decls)
}

/// Load, then resolve into a service.
pub fn load_service(source: &str) -> Result<Service, LoadError> {
    load_declarations(source)?.build()
}

#[derive(Default)]
struct IncludeState {
    /// Documents currently being loaded.
    stack: HashSet<String>,
    loaded: HashSet<String>,
}

fn load_with_includes(source: &str, state: &mut IncludeState) -> Result<Declarations, LoadError> {
    let key = source_key(source);
    if state.stack.contains(&key) {
        return Err(LoadError::CircularInclude {
            path: PathBuf::from(source),
        });
    }
    if state.loaded.contains(&key) {
        return Ok(Declarations::default());
    }

    debug!(source, "loading declarations");
    let doc = load_json_auto(source)?;

    state.stack.insert(key.clone());
    let mut decls = Declarations::default();
    for include in includes(&doc)? {
        let target = join_source(source, include);
        decls.merge(load_with_includes(&target, state)?);
    }
    decls.merge(parse_declarations(&doc)?);
    state.stack.remove(&key);
    state.loaded.insert(key);

    Ok(decls)
}

fn source_key(source: &str) -> String {
    if is_url(source) {
        return source.to_string();
    }
    let path = Path::new(source);
    path.canonicalize()
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}

/// Resolve `include` against the document that names it.
fn join_source(base: &str, include: &str) -> String {
    if is_url(include) || Path::new(include).is_absolute() {
        return include.to_string();
    }
    if is_url(base) {
        let dir = base.rfind('/').map_or(base, |idx| &base[..idx]);
        return format!("{}/{}", dir, include);
    }
    let dir = Path::new(base).parent().unwrap_or(Path::new("."));
    dir.join(include).display().to_string()
}

fn includes(doc: &Value) -> Result<Vec<&str>, LoadError> {
    match doc.get("include") {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                item.as_str().ok_or_else(|| {
                    LoadError::declaration(&format!("/include/{}", i), "include must be a string")
                })
            })
            .collect(),
        Some(_) => Err(LoadError::declaration("/include", "include must be an array")),
    }
}

/// Parse the `schemas` and `methods` members of one document. `include` is
/// left to the caller.
///
/// # Errors
///
/// `LoadError::InvalidDeclaration` naming the JSON path of the first
/// problem, or an arity mismatch.
pub fn parse_declarations(doc: &Value) -> Result<Declarations, LoadError> {
    let root = doc
        .as_object()
        .ok_or_else(|| LoadError::declaration("/", "declaration document must be an object"))?;

    for key in root.keys() {
        if !matches!(key.as_str(), "include" | "schemas" | "methods") {
            return Err(LoadError::declaration(
                "/",
                format!("unexpected member \"{}\"", key),
            ));
        }
    }

    let mut decls = Declarations::default();

    if let Some(schemas) = root.get("schemas") {
        let schemas = schemas
            .as_array()
            .ok_or_else(|| LoadError::declaration("/schemas", "schemas must be an array"))?;
        for (i, spec) in schemas.iter().enumerate() {
            decls
                .schemas
                .push(parse_attribute(spec, &format!("/schemas/{}", i))?);
        }
    }

    if let Some(methods) = root.get("methods") {
        let methods = methods
            .as_object()
            .ok_or_else(|| LoadError::declaration("/methods", "methods must be an object"))?;
        for (name, spec) in methods {
            let at = format!("/methods/{}", name);
            decls.methods.push(parse_method(name, spec, &at)?);
        }
    }

    Ok(decls)
}

fn parse_method(name: &str, spec: &Value, at: &str) -> Result<MethodDecl, LoadError> {
    let obj = spec
        .as_object()
        .ok_or_else(|| LoadError::declaration(at, "method must be an object"))?;

    let mut accepts = Vec::new();
    let mut params = None;
    let mut pass_app = false;
    let mut job = false;

    for (key, value) in obj {
        let here = format!("{}/{}", at, key);
        match key.as_str() {
            "accepts" => accepts = parse_attributes(Some(value), &here)?,
            "params" => {
                let names = value
                    .as_array()
                    .and_then(|items| {
                        items
                            .iter()
                            .map(|v| v.as_str().map(str::to_string))
                            .collect::<Option<Vec<_>>>()
                    })
                    .ok_or_else(|| LoadError::declaration(&here, "params must be an array of strings"))?;
                params = Some(names);
            }
            "pass_app" => pass_app = expect_bool(value, &here)?,
            "job" => job = expect_bool(value, &here)?,
            "description" => {}
            other => {
                return Err(LoadError::declaration(
                    at,
                    format!("unexpected member \"{}\"", other),
                ))
            }
        }
    }

    let mut decl = match params {
        Some(params) => MethodDecl::new(MethodSignature::new(name, params), accepts)?,
        None => MethodDecl::from_attributes(name, accepts),
    };
    decl.signature.pass_app = pass_app;
    decl.signature.job = job;
    Ok(decl)
}

fn parse_attributes(value: Option<&Value>, at: &str) -> Result<Vec<Attribute>, LoadError> {
    match value {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, spec)| parse_attribute(spec, &format!("{}/{}", at, i)))
            .collect(),
        Some(_) => Err(LoadError::declaration(at, "expected an array of attributes")),
    }
}

/// Build an attribute from its declaration object.
///
/// # Errors
///
/// Unknown types, members that do not apply to the type, and wrongly typed
/// values.
pub fn parse_attribute(spec: &Value, at: &str) -> Result<Attribute, LoadError> {
    let obj = spec
        .as_object()
        .ok_or_else(|| LoadError::declaration(at, "attribute must be an object"))?;
    let name = obj
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| LoadError::declaration(at, "attribute name must be a string"))?;
    let kind = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| LoadError::declaration(at, "attribute type must be a string"))?;

    // members consumed while building the kind itself
    let (mut attr, consumed) = match kind {
        "any" => (Attribute::any(name), NO_KEYS),
        "str" | "string" => (Attribute::str(name), ENUM_KEYS),
        "int" | "integer" => (Attribute::int(name), ENUM_KEYS),
        "float" => (Attribute::float(name), ENUM_KEYS),
        "bool" | "boolean" => (Attribute::bool(name), NO_KEYS),
        "dir" => (Attribute::dir(name), NO_KEYS),
        "file" => (Attribute::file(name), NO_KEYS),
        "unixperm" => (Attribute::unix_perm(name), NO_KEYS),
        "ipaddr" => (Attribute::ipaddr(name, ipaddr_options(obj, at)?), IPADDR_KEYS),
        "list" => (
            Attribute::list(name, parse_attributes(obj.get("items"), &format!("{}/items", at))?),
            LIST_KEYS,
        ),
        "dict" => {
            let mut attr = Attribute::dict(name, Vec::new());
            if let Some(dict) = attr.as_dict_mut() {
                for child in parse_attributes(obj.get("attrs"), &format!("{}/attrs", at))? {
                    if dict.get(&child.name).is_some() {
                        warn!(at, attribute = %child.name, "duplicate attribute replaces the earlier one");
                    }
                    dict.insert(child);
                }
            }
            (attr, DICT_KEYS)
        }
        "cron" => (Attribute::cron(name), NO_KEYS),
        "ref" => {
            reject_extra(obj, NO_KEYS, at)?;
            return Ok(Attribute::reference(name));
        }
        "patch" => {
            reject_extra(obj, &["base", "ops", "register"], at)?;
            return Ok(Attribute::patch(parse_patch(obj, name, at)?));
        }
        other => {
            return Err(LoadError::declaration(
                &format!("{}/type", at),
                format!("unknown attribute type \"{}\"", other),
            ))
        }
    };

    for (key, value) in obj {
        let here = format!("{}/{}", at, key);
        let key = key.as_str();
        match key {
            "name" | "type" => {}
            "items" | "attrs" if consumed.contains(&key) => {}
            _ if kind == "ipaddr" && IPADDR_KEYS.contains(&key) => {}
            "enum" if consumed.contains(&key) => {
                let values = value
                    .as_array()
                    .ok_or_else(|| LoadError::declaration(&here, "enum must be an array"))?;
                attr = attr.choices(values.iter().cloned());
            }
            _ if PROPERTY_KEYS.contains(&key) || consumed.contains(&key) => {
                attr.set_property(key, value)
                    .map_err(|e| LoadError::declaration(&here, e.to_string()))?;
            }
            other => {
                return Err(LoadError::declaration(
                    at,
                    format!("member \"{}\" does not apply to {} attributes", other, kind),
                ))
            }
        }
    }

    Ok(attr)
}

fn reject_extra(obj: &Map<String, Value>, allowed: &[&str], at: &str) -> Result<(), LoadError> {
    for key in obj.keys() {
        if key != "name" && key != "type" && !allowed.contains(&key.as_str()) {
            return Err(LoadError::declaration(
                at,
                format!("member \"{}\" is not allowed here", key),
            ));
        }
    }
    Ok(())
}

fn ipaddr_options(obj: &Map<String, Value>, at: &str) -> Result<IpAddrOptions, LoadError> {
    let mut options = IpAddrOptions::default();
    for key in IPADDR_KEYS {
        let Some(value) = obj.get(*key) else {
            continue;
        };
        let flag = expect_bool(value, &format!("{}/{}", at, key))?;
        match *key {
            "cidr" => options.cidr = flag,
            "network" => options.network = flag,
            "network_strict" => options.network_strict = flag,
            "v4" => options.v4 = flag,
            "v6" => options.v6 = flag,
            _ => options.allow_zone_index = flag,
        }
    }
    Ok(options)
}

/// Patch operations are `[op, argument]` pairs:
///
/// - `["add", {attribute}]`
/// - `["rm", {"name": field}]`
/// - `["edit", {"name": field, "set": {property: value}}]`
/// - `["attr", {property: value}]`
fn parse_patch(obj: &Map<String, Value>, name: &str, at: &str) -> Result<Patch, LoadError> {
    let base = obj
        .get("base")
        .and_then(Value::as_str)
        .ok_or_else(|| LoadError::declaration(at, "patch base must be a string"))?;
    let mut patch = Patch::new(base, name);
    if let Some(register) = obj.get("register") {
        patch.register = expect_bool(register, &format!("{}/register", at))?;
    }

    let ops = match obj.get("ops") {
        None => return Ok(patch),
        Some(Value::Array(ops)) => ops,
        Some(_) => return Err(LoadError::declaration(&format!("{}/ops", at), "ops must be an array")),
    };

    for (i, op) in ops.iter().enumerate() {
        let here = format!("{}/ops/{}", at, i);
        let (verb, arg) = match op.as_array().map(Vec::as_slice) {
            Some([Value::String(verb), arg]) => (verb.as_str(), arg),
            _ => {
                return Err(LoadError::declaration(
                    &here,
                    "patch operation must be an [op, argument] pair",
                ))
            }
        };
        let arg_at = format!("{}/1", here);
        let op = match verb {
            "add" => PatchOp::Add(parse_attribute(arg, &arg_at)?),
            "rm" => PatchOp::Rm(field_name(arg, &arg_at)?),
            "edit" => {
                let props = arg
                    .get("set")
                    .and_then(Value::as_object)
                    .cloned()
                    .ok_or_else(|| LoadError::declaration(&arg_at, "edit needs a \"set\" object"))?;
                PatchOp::EditProps(field_name(arg, &arg_at)?, props)
            }
            "attr" => PatchOp::Attr(
                arg.as_object()
                    .cloned()
                    .ok_or_else(|| LoadError::declaration(&arg_at, "attr needs an object"))?,
            ),
            other => {
                return Err(LoadError::declaration(
                    &here,
                    format!("unknown patch operation \"{}\"", other),
                ))
            }
        };
        patch.ops.push(op);
    }

    Ok(patch)
}

fn field_name(arg: &Value, at: &str) -> Result<String, LoadError> {
    arg.get("name")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| LoadError::declaration(at, "field name must be a string"))
}

fn expect_bool(value: &Value, at: &str) -> Result<bool, LoadError> {
    value.as_bool().ok_or_else(|| {
        LoadError::declaration(
            at,
            format!("expected a boolean, got {}", json_type_name(value)),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accepts::CallArgs;
    use serde_json::json;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn load_json_valid_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"methods": {{}}}}"#).unwrap();

        let doc = load_json(file.path()).unwrap();
        assert!(doc["methods"].is_object());
    }

    #[test]
    fn load_json_file_not_found() {
        let result = load_json(Path::new("/nonexistent/path.json"));
        assert!(matches!(result, Err(LoadError::FileNotFound { .. })));
    }

    #[test]
    fn load_json_invalid() {
        let result = load_json_str("not json");
        assert!(matches!(result, Err(LoadError::InvalidJson { .. })));
    }

    #[test]
    fn is_url_detection() {
        assert!(is_url("https://example.com/decl.json"));
        assert!(is_url("http://example.com/decl.json"));
        assert!(!is_url("/path/to/decl.json"));
        assert!(!is_url("decl.json"));
    }

    #[test]
    fn join_source_relative_and_absolute() {
        assert_eq!(join_source("/a/b/main.json", "common.json"), "/a/b/common.json");
        assert_eq!(join_source("/a/b/main.json", "/x/y.json"), "/x/y.json");
        assert_eq!(
            join_source("https://host/decl/main.json", "common.json"),
            "https://host/decl/common.json"
        );
    }

    #[test]
    fn parse_every_scalar_type() {
        for (kind, expected) in [
            ("any", "any"),
            ("string", "str"),
            ("integer", "int"),
            ("float", "float"),
            ("boolean", "bool"),
            ("dir", "dir"),
            ("file", "file"),
            ("unixperm", "unixperm"),
            ("ipaddr", "ipaddr"),
            ("cron", "cron"),
        ] {
            let attr = parse_attribute(&json!({"type": kind, "name": "x"}), "/").unwrap();
            assert_eq!(attr.kind_name(), expected);
        }
    }

    #[test]
    fn parse_properties() {
        let attr = parse_attribute(
            &json!({
                "type": "str",
                "name": "x",
                "required": true,
                "private": true,
                "empty": false,
                "title": "X",
                "enum": ["a", "b"]
            }),
            "/",
        )
        .unwrap();
        assert!(attr.required);
        assert!(attr.private);
        assert!(!attr.empty);
        assert_eq!(attr.display_title(), "X");
        assert!(attr.clean(Some(json!("c"))).is_err());
        assert!(attr.clean(Some(json!("a"))).is_ok());
    }

    #[test]
    fn parse_rejects_misplaced_members() {
        let err = parse_attribute(&json!({"type": "int", "name": "x", "cidr": true}), "/s").unwrap_err();
        assert!(err.to_string().contains("does not apply"));

        let err = parse_attribute(&json!({"type": "ref", "name": "x", "required": true}), "/s")
            .unwrap_err();
        assert!(err.to_string().contains("not allowed"));

        let err = parse_attribute(&json!({"type": "decimal", "name": "x"}), "/s").unwrap_err();
        assert!(err.to_string().contains("unknown attribute type"));
    }

    #[test]
    fn parse_dict_later_duplicate_wins() {
        let attr = parse_attribute(
            &json!({"type": "dict", "name": "d", "attrs": [
                {"type": "int", "name": "a"},
                {"type": "str", "name": "a"}
            ]}),
            "/",
        )
        .unwrap();
        let dict = attr.as_dict().unwrap();
        assert_eq!(dict.attrs.len(), 1);
        assert_eq!(dict.get("a").unwrap().kind_name(), "str");
    }

    #[test]
    fn parse_patch_ops() {
        let decls = load_declarations_str(
            r#"{
                "schemas": [
                    {"type": "dict", "name": "share", "attrs": [
                        {"type": "str", "name": "path", "required": true},
                        {"type": "bool", "name": "ro"}
                    ]}
                ],
                "methods": {
                    "share.update": {
                        "params": ["id", "data"],
                        "accepts": [
                            {"type": "int", "name": "id"},
                            {"type": "patch", "name": "share_update", "base": "share", "ops": [
                                ["rm", {"name": "ro"}],
                                ["edit", {"name": "path", "set": {"required": false}}],
                                ["add", {"type": "str", "name": "comment"}],
                                ["attr", {"update": true}]
                            ]}
                        ]
                    }
                }
            }"#,
        )
        .unwrap();
        let service = decls.build().unwrap();
        let accepts = service.method("share.update").unwrap();
        let data = accepts.attributes()[1].as_dict().unwrap();
        assert!(data.update);
        assert!(data.get("ro").is_none());
        assert!(!data.get("path").unwrap().required);

        let params = accepts
            .bind(&CallArgs::positional(vec![json!(1), json!({"comment": "x"})]))
            .unwrap();
        assert_eq!(params[1], json!({"comment": "x"}));
    }

    #[test]
    fn arity_mismatch_is_reported() {
        let err = load_declarations_str(
            r#"{"methods": {"m": {"params": ["a", "b"], "accepts": [{"type": "int", "name": "a"}]}}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::Resolve(_)));
    }

    #[test]
    fn includes_are_relative_and_loaded_once() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("common.json"),
            r#"{"schemas": [{"type": "dict", "name": "share", "attrs": []}]}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("a.json"),
            r#"{"include": ["common.json"], "methods": {"a": {"accepts": [{"type": "ref", "name": "share"}]}}}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("main.json"),
            r#"{"include": ["a.json", "common.json"], "methods": {}}"#,
        )
        .unwrap();

        let main = dir.path().join("main.json");
        let decls = load_declarations(main.to_str().unwrap()).unwrap();
        assert_eq!(decls.schemas.len(), 1);
        assert_eq!(decls.methods.len(), 1);
        assert!(decls.build().unwrap().method("a").is_some());
    }

    #[test]
    fn circular_include_is_detected() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.json"), r#"{"include": ["b.json"]}"#).unwrap();
        std::fs::write(dir.path().join("b.json"), r#"{"include": ["a.json"]}"#).unwrap();

        let a = dir.path().join("a.json");
        let err = load_declarations(a.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, LoadError::CircularInclude { .. }));
    }

    #[test]
    fn unexpected_top_level_member() {
        let err = load_declarations_str(r#"{"method": {}}"#).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[cfg(feature = "remote")]
    mod remote {
        use super::*;

        #[test]
        fn load_from_mock_server() {
            let mut server = mockito::Server::new();
            let mock = server
                .mock("GET", "/decl.json")
                .with_status(200)
                .with_header("content-type", "application/json")
                .with_body(r#"{"methods": {"ping": {"accepts": []}}}"#)
                .create();

            let url = format!("{}/decl.json", server.url());
            let service = load_service(&url).unwrap();
            assert!(service.method("ping").is_some());
            mock.assert();
        }

        #[test]
        fn http_error_status() {
            let mut server = mockito::Server::new();
            let _mock = server.mock("GET", "/missing.json").with_status(404).create();

            let url = format!("{}/missing.json", server.url());
            let err = load_declarations(&url).unwrap_err();
            assert!(matches!(err, LoadError::NetworkError { .. }));
            assert_eq!(err.exit_code(), 3);
        }
    }
}
