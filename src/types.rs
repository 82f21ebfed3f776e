//! Core types shared across the schema engine.

use serde_json::Value;

/// Invalid argument. Default code for clean and validate failures.
pub const EINVAL: i32 = 22;
/// No such file or directory.
pub const ENOENT: i32 = 2;
/// Not a directory.
pub const ENOTDIR: i32 = 20;
/// Is a directory.
pub const EISDIR: i32 = 21;
/// Try again. Code attached to an aggregated call failure on the wire.
pub const EAGAIN: i32 = 11;

/// Replacement text for values of private attributes.
pub const REDACTED: &str = "********";

/// Attribute type names accepted in declaration documents.
pub const ATTRIBUTE_TYPES: &[&str] = &[
    "any", "str", "string", "int", "integer", "float", "bool", "boolean", "dir", "file",
    "unixperm", "ipaddr", "list", "dict", "cron", "ref", "patch",
];

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Symbolic name for an errno code, `EUNKNOWN` when unmapped.
pub fn errname(code: i32) -> &'static str {
    match code {
        ENOENT => "ENOENT",
        EAGAIN => "EAGAIN",
        ENOTDIR => "ENOTDIR",
        EISDIR => "EISDIR",
        EINVAL => "EINVAL",
        14 => "EFAULT",
        13 => "EACCES",
        17 => "EEXIST",
        _ => "EUNKNOWN",
    }
}

/// Render a value the way it reads in an error message.
///
/// Strings are shown bare, everything else as compact JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
