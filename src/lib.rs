//! RPC Schema
//!
//! Declarative argument schemas for RPC service methods.
//!
//! Each method declares one [`Attribute`] per parameter. At startup every
//! declaration is resolved once against a shared [`SchemaRegistry`]
//! (forward references and patches become concrete trees); at call time the
//! resulting [`Accepts`] cleans, validates and binds the raw arguments
//! before the method body runs, and reports every failure at once.
//!
//! # Example
//!
//! ```
//! use rpc_schema::{Attribute, CallArgs, MethodDecl, MethodSignature, ServiceBuilder};
//! use serde_json::json;
//!
//! let mut builder = ServiceBuilder::new();
//! builder.method(
//!     MethodDecl::new(
//!         MethodSignature::new("user.create", ["data"]),
//!         vec![Attribute::dict("data", vec![
//!             Attribute::str("username").required(),
//!             Attribute::str("password").private(),
//!             Attribute::int("uid").default(json!(1000)),
//!         ])],
//!     )
//!     .unwrap(),
//! );
//! let service = builder.build().unwrap();
//! let accepts = service.method("user.create").unwrap();
//!
//! let params = accepts
//!     .bind(&CallArgs::positional(vec![json!({"username": "bob"})]))
//!     .unwrap();
//! assert_eq!(params[0], json!({"username": "bob", "uid": 1000}));
//!
//! let errors = accepts
//!     .bind(&CallArgs::positional(vec![json!({"uid": "x"})]))
//!     .unwrap_err();
//! assert_eq!(errors.len(), 1);
//! ```
//!
//! # Value Model
//!
//! | Input | `clean` receives | Outcome |
//! |-------|------------------|---------|
//! | key absent | `None` | default, or `attribute required` |
//! | `null` | `Some(Value::Null)` | `null` if nullable, else `null not allowed` |
//! | anything else | `Some(value)` | type coercion and checks |

mod accepts;
mod attribute;
mod cron;
mod error;
mod ipaddr;
mod linter;
mod loader;
mod registry;
mod resolver;
mod service;
mod types;

pub use accepts::{Accepts, CallArgs, MethodDecl, MethodSignature};
pub use attribute::{Attribute, Choices, Dict, Kind, List, Str, StrFormat, Validator};
pub use cron::{
    check_expression, convert_db_format_to_schedule, convert_schedule_to_db_format,
    cron_expression, CRON_FIELDS, DB_FIELDS,
};
pub use error::{CallError, Error, LoadError, ResolveError, ValidationError, ValidationErrors};
pub use ipaddr::IpAddrOptions;
pub use linter::{
    lint, lint_file, meta_schema, Diagnostic, FileResult, FileStatus, LintResult, Severity,
};
pub use loader::{
    is_url, load_declarations, load_declarations_str, load_json, load_json_auto, load_json_str,
    load_service, parse_attribute, parse_declarations, Declarations,
};
pub use registry::SchemaRegistry;
pub use resolver::{resolve_methods, EditFn, Patch, PatchOp};
pub use service::{Service, ServiceBuilder};
pub use types::{
    errname, ATTRIBUTE_TYPES, EAGAIN, EINVAL, EISDIR, ENOENT, ENOTDIR, REDACTED,
};

#[cfg(feature = "remote")]
pub use loader::load_json_url;
