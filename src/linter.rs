//! Declaration linting - static analysis of declaration documents.
//!
//! Checks files for:
//! - JSON syntax errors (E001)
//! - Structure not matching the declaration meta-schema (E002)
//! - Attribute specs the loader rejects (E003)
//! - Declarations that fail to resolve, including their includes (E004)
//! - Methods relying on attribute names for keyword binding (W001)
//! - Duplicate names in one attribute list (W002)

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{json, Value};

use crate::error::LoadError;
use crate::loader::{load_json, load_service, parse_declarations};
use crate::types::ATTRIBUTE_TYPES;

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostic message from linting.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub file: PathBuf,
    /// JSON path to the issue (e.g., "/methods/pool.create/accepts/0")
    pub path: String,
    pub message: String,
}

/// Result of linting a single file.
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub file: PathBuf,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Status of a linted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Ok,
    Error,
    Warning,
}

/// Result of linting a directory or set of files.
#[derive(Debug, Clone, Serialize)]
pub struct LintResult {
    pub path: PathBuf,
    pub files_checked: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub warnings: usize,
    pub results: Vec<FileResult>,
}

impl LintResult {
    /// Returns true if all files passed (no errors).
    pub fn is_ok(&self) -> bool {
        self.errors == 0
    }
}

/// Meta-schema every declaration document must satisfy.
pub fn meta_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "include": {"type": "array", "items": {"type": "string"}},
            "schemas": {"type": "array", "items": {"$ref": "#/$defs/attribute"}},
            "methods": {
                "type": "object",
                "additionalProperties": {"$ref": "#/$defs/method"}
            }
        },
        "$defs": {
            "attribute": {
                "type": "object",
                "required": ["type", "name"],
                "properties": {
                    "type": {"enum": ATTRIBUTE_TYPES},
                    "name": {"type": "string", "minLength": 1},
                    "title": {"type": ["string", "null"]},
                    "description": {"type": ["string", "null"]},
                    "required": {"type": "boolean"},
                    "null": {"type": "boolean"},
                    "empty": {"type": "boolean"},
                    "private": {"type": "boolean"},
                    "register": {"type": "boolean"},
                    "enum": {"type": "array"},
                    "items": {"type": "array", "items": {"$ref": "#/$defs/attribute"}},
                    "attrs": {"type": "array", "items": {"$ref": "#/$defs/attribute"}},
                    "base": {"type": "string"},
                    "ops": {
                        "type": "array",
                        "items": {
                            "type": "array",
                            "minItems": 2,
                            "maxItems": 2,
                            "prefixItems": [
                                {"enum": ["add", "rm", "edit", "attr"]},
                                {"type": "object"}
                            ]
                        }
                    }
                }
            },
            "method": {
                "type": "object",
                "required": ["accepts"],
                "additionalProperties": false,
                "properties": {
                    "params": {"type": "array", "items": {"type": "string"}},
                    "accepts": {"type": "array", "items": {"$ref": "#/$defs/attribute"}},
                    "pass_app": {"type": "boolean"},
                    "job": {"type": "boolean"},
                    "description": {"type": "string"}
                }
            }
        }
    })
}

/// Lint a file or directory.
///
/// If path is a directory, recursively finds all .json files.
/// If `strict` is true, warnings are treated as errors.
/// Returns aggregated results for all files.
pub fn lint(path: &Path, strict: bool) -> LintResult {
    let results: Vec<FileResult> = collect_declaration_files(path)
        .iter()
        .map(|file| lint_file(file, path))
        .collect();

    let count = |severity: Severity| -> usize {
        results
            .iter()
            .flat_map(|r| &r.diagnostics)
            .filter(|d| d.severity == severity)
            .count()
    };
    let errors = count(Severity::Error);
    let warnings = count(Severity::Warning);

    // strict mode fails warning-only files too
    let failed = results
        .iter()
        .filter(|r| match r.status {
            FileStatus::Ok => false,
            FileStatus::Warning => strict,
            FileStatus::Error => true,
        })
        .count();

    LintResult {
        path: path.to_path_buf(),
        files_checked: results.len(),
        passed: results.len() - failed,
        failed,
        errors,
        warnings,
        results,
    }
}

/// Lint a single declaration file.
pub fn lint_file(file: &Path, base_path: &Path) -> FileResult {
    let mut diagnostics = Vec::new();
    let display = file.strip_prefix(base_path).unwrap_or(file).to_path_buf();

    let doc = match load_json(file) {
        Ok(doc) => doc,
        Err(e) => {
            diagnostics.push(error(file, "E001", "/", format!("syntax error: {}", e)));
            return finish(display, diagnostics);
        }
    };

    check_meta_schema(&doc, file, &mut diagnostics);
    if !diagnostics.is_empty() {
        return finish(display, diagnostics);
    }

    check_warnings(&doc, file, &mut diagnostics);

    if let Err(e) = parse_declarations(&doc) {
        let (path, message) = match e {
            LoadError::InvalidDeclaration { path, message } => (path, message),
            other => ("/".to_string(), other.to_string()),
        };
        diagnostics.push(error(file, "E003", &path, message));
        return finish(display, diagnostics);
    }

    if let Err(e) = load_service(&file.display().to_string()) {
        diagnostics.push(error(file, "E004", "/", e.to_string()));
    }

    finish(display, diagnostics)
}

fn finish(file: PathBuf, diagnostics: Vec<Diagnostic>) -> FileResult {
    let has_errors = diagnostics.iter().any(|d| d.severity == Severity::Error);
    let has_warnings = diagnostics.iter().any(|d| d.severity == Severity::Warning);

    let status = if has_errors {
        FileStatus::Error
    } else if has_warnings {
        FileStatus::Warning
    } else {
        FileStatus::Ok
    };

    FileResult {
        file,
        status,
        diagnostics,
    }
}

fn error(file: &Path, code: &str, path: &str, message: String) -> Diagnostic {
    Diagnostic {
        severity: Severity::Error,
        code: code.to_string(),
        file: file.to_path_buf(),
        path: path.to_string(),
        message,
    }
}

fn warning(file: &Path, code: &str, path: &str, message: String) -> Diagnostic {
    Diagnostic {
        severity: Severity::Warning,
        ..error(file, code, path, message)
    }
}

fn check_meta_schema(doc: &Value, file: &Path, diagnostics: &mut Vec<Diagnostic>) {
    let validator = match jsonschema::validator_for(&meta_schema()) {
        Ok(v) => v,
        Err(e) => {
            diagnostics.push(error(file, "E002", "/", format!("meta-schema error: {}", e)));
            return;
        }
    };

    for e in validator.iter_errors(doc) {
        let path = e.instance_path.to_string();
        let path = if path.is_empty() { "/".to_string() } else { path };
        diagnostics.push(error(file, "E002", &path, e.to_string()));
    }
}

fn check_warnings(doc: &Value, file: &Path, diagnostics: &mut Vec<Diagnostic>) {
    if let Some(Value::Array(schemas)) = doc.get("schemas") {
        check_duplicates(schemas, "/schemas", file, diagnostics);
    }

    let Some(Value::Object(methods)) = doc.get("methods") else {
        return;
    };
    for (name, method) in methods {
        let path = format!("/methods/{}", name);
        let accepts = method.get("accepts").and_then(Value::as_array);

        if method.get("params").is_none() && accepts.is_some_and(|a| !a.is_empty()) {
            diagnostics.push(warning(
                file,
                "W001",
                &path,
                format!(
                    "method {} has no \"params\"; keyword arguments bind by attribute name",
                    name
                ),
            ));
        }
        if let Some(accepts) = accepts {
            check_duplicates(accepts, &format!("{}/accepts", path), file, diagnostics);
        }
    }
}

/// Warn on repeated names in one attribute list, then recurse into nested
/// lists.
fn check_duplicates(attrs: &[Value], path: &str, file: &Path, diagnostics: &mut Vec<Diagnostic>) {
    let mut seen = HashSet::new();
    for (i, attr) in attrs.iter().enumerate() {
        let attr_path = format!("{}/{}", path, i);
        if let Some(name) = attr.get("name").and_then(Value::as_str) {
            if !seen.insert(name) {
                diagnostics.push(warning(
                    file,
                    "W002",
                    &attr_path,
                    format!("duplicate attribute name \"{}\"; the last one wins", name),
                ));
            }
        }
        for nested in ["items", "attrs"] {
            if let Some(Value::Array(children)) = attr.get(nested) {
                check_duplicates(children, &format!("{}/{}", attr_path, nested), file, diagnostics);
            }
        }
    }
}

/// Collect all .json files in a path (file or directory).
fn collect_declaration_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        if path.extension().map(|e| e == "json").unwrap_or(false) {
            return vec![path.to_path_buf()];
        }
        return vec![];
    }

    let mut files = Vec::new();
    collect_files_recursive(path, &mut files);
    files.sort();
    files
}

fn collect_files_recursive(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files_recursive(&path, files);
        } else if path.extension().map(|e| e == "json").unwrap_or(false) {
            files.push(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    fn lint_str(content: &str) -> FileResult {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        lint_file(file.path(), file.path().parent().unwrap())
    }

    fn codes(result: &FileResult) -> Vec<&str> {
        result.diagnostics.iter().map(|d| d.code.as_str()).collect()
    }

    #[test]
    fn lint_valid_declaration() {
        let result = lint_str(
            r#"{
                "schemas": [{"type": "dict", "name": "share", "attrs": [{"type": "str", "name": "path"}]}],
                "methods": {
                    "share.create": {"params": ["data"], "accepts": [{"type": "ref", "name": "share"}]}
                }
            }"#,
        );
        assert_eq!(result.status, FileStatus::Ok, "{:?}", result.diagnostics);
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn lint_invalid_json_syntax() {
        let result = lint_str("{ not valid json }");
        assert_eq!(result.status, FileStatus::Error);
        assert_eq!(codes(&result), vec!["E001"]);
    }

    #[test]
    fn lint_meta_schema_violation() {
        let result = lint_str(r#"{"methods": {"m": {"accepts": [{"type": "decimal", "name": "x"}]}}}"#);
        assert_eq!(result.status, FileStatus::Error);
        assert!(codes(&result).iter().all(|c| *c == "E002"));
        assert!(result.diagnostics[0].path.starts_with("/methods/m/accepts/0"));
    }

    #[test]
    fn lint_loader_rejection() {
        let result = lint_str(
            r#"{"methods": {"m": {"params": ["a"], "accepts": [{"type": "int", "name": "a", "cidr": true}]}}}"#,
        );
        assert_eq!(codes(&result), vec!["E003"]);
        assert_eq!(result.diagnostics[0].path, "/methods/m/accepts/0");
    }

    #[test]
    fn lint_unresolvable_reference() {
        let result = lint_str(
            r#"{"methods": {"m": {"params": ["a"], "accepts": [{"type": "ref", "name": "ghost"}]}}}"#,
        );
        assert_eq!(codes(&result), vec!["E004"]);
        assert!(result.diagnostics[0].message.contains("ghost"));
    }

    #[test]
    fn lint_warnings() {
        let result = lint_str(
            r#"{"methods": {"m": {"accepts": [
                {"type": "dict", "name": "d", "attrs": [
                    {"type": "int", "name": "a"},
                    {"type": "int", "name": "a"}
                ]}
            ]}}}"#,
        );
        assert_eq!(result.status, FileStatus::Warning);
        assert_eq!(codes(&result), vec!["W001", "W002"]);
        assert_eq!(result.diagnostics[1].path, "/methods/m/accepts/0/attrs/1");
    }

    #[test]
    fn lint_directory_strict() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("ok.json"),
            r#"{"methods": {"m": {"params": [], "accepts": []}}}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("warn.json"),
            r#"{"methods": {"m": {"accepts": [{"type": "int", "name": "a"}]}}}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let result = lint(dir.path(), false);
        assert_eq!(result.files_checked, 2);
        assert_eq!(result.failed, 0);
        assert_eq!(result.warnings, 1);
        assert!(result.is_ok());

        let strict = lint(dir.path(), true);
        assert_eq!(strict.failed, 1);
        assert_eq!(strict.passed, 1);
    }
}
