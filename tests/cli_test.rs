//! CLI integration tests for rpc-schema binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("rpc-schema"))
}

// Helper to create a temp declaration or payload file
fn write_temp_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

const DECLARATIONS: &str = r#"{
    "schemas": [
        {"type": "dict", "name": "pair", "attrs": [
            {"type": "int", "name": "a", "required": true},
            {"type": "int", "name": "b", "default": 10}
        ]}
    ],
    "methods": {
        "pair.set": {"params": ["data"], "accepts": [{"type": "ref", "name": "pair"}]},
        "auth.login": {
            "params": ["username", "password"],
            "accepts": [
                {"type": "str", "name": "username", "required": true},
                {"type": "str", "name": "password", "private": true}
            ]
        }
    }
}"#;

mod schema_command {
    use super::*;

    #[test]
    fn all_methods() {
        let dir = TempDir::new().unwrap();
        let decl = write_temp_file(&dir, "decl.json", DECLARATIONS);

        cmd()
            .args(["schema", decl.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""pair.set""#))
            .stdout(predicate::str::contains(r#""auth.login""#));
    }

    #[test]
    fn single_method_pretty() {
        let dir = TempDir::new().unwrap();
        let decl = write_temp_file(&dir, "decl.json", DECLARATIONS);

        cmd()
            .args(["schema", decl.to_str().unwrap(), "--method", "pair.set", "--pretty"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[\n"))
            .stdout(predicate::str::contains(r#""_required_""#))
            .stdout(predicate::str::contains("auth.login").not());
    }

    #[test]
    fn output_file() {
        let dir = TempDir::new().unwrap();
        let decl = write_temp_file(&dir, "decl.json", DECLARATIONS);
        let out = dir.path().join("schema.json");

        cmd()
            .args([
                "schema",
                decl.to_str().unwrap(),
                "--output",
                out.to_str().unwrap(),
            ])
            .assert()
            .success();

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(written["auth.login"][0]["type"], "string");
    }

    #[test]
    fn unknown_method() {
        let dir = TempDir::new().unwrap();
        let decl = write_temp_file(&dir, "decl.json", DECLARATIONS);

        cmd()
            .args(["schema", decl.to_str().unwrap(), "--method", "nope"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("unknown method nope"));
    }

    #[test]
    fn missing_file_exit_code() {
        cmd()
            .args(["schema", "/nonexistent/decl.json"])
            .assert()
            .code(3)
            .stderr(predicate::str::contains("file not found"));
    }

    #[test]
    fn unresolvable_declarations_exit_code() {
        let dir = TempDir::new().unwrap();
        let decl = write_temp_file(
            &dir,
            "decl.json",
            r#"{"methods": {"m": {"accepts": [{"type": "ref", "name": "ghost"}]}}}"#,
        );

        cmd()
            .args(["schema", decl.to_str().unwrap()])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("schema ghost does not exist"));
    }
}

mod validate_command {
    use super::*;

    #[test]
    fn valid_payload() {
        let dir = TempDir::new().unwrap();
        let decl = write_temp_file(&dir, "decl.json", DECLARATIONS);
        let payload = write_temp_file(&dir, "payload.json", r#"[{"a": 5}]"#);

        cmd()
            .args([
                "validate",
                decl.to_str().unwrap(),
                "--method",
                "pair.set",
                payload.to_str().unwrap(),
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("Valid"))
            .stdout(predicate::str::contains(r#""b":10"#));
    }

    #[test]
    fn invalid_payload_reports_every_entry() {
        let dir = TempDir::new().unwrap();
        let decl = write_temp_file(&dir, "decl.json", DECLARATIONS);
        let payload = write_temp_file(&dir, "payload.json", r#"{"password": 1}"#);

        cmd()
            .args([
                "validate",
                decl.to_str().unwrap(),
                "-m",
                "auth.login",
                payload.to_str().unwrap(),
            ])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Validation failed"))
            .stderr(predicate::str::contains("[EINVAL] username: attribute required"));
    }

    #[test]
    fn json_output() {
        let dir = TempDir::new().unwrap();
        let decl = write_temp_file(&dir, "decl.json", DECLARATIONS);
        let payload = write_temp_file(&dir, "payload.json", r#"{"data": {"a": "x"}}"#);

        let output = cmd()
            .args([
                "validate",
                decl.to_str().unwrap(),
                "--method",
                "pair.set",
                payload.to_str().unwrap(),
                "--json",
            ])
            .assert()
            .code(1)
            .get_output()
            .stdout
            .clone();

        let result: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(result["valid"], false);
        assert_eq!(result["errors"][0]["attribute"], "a");
        assert_eq!(result["errors"][0]["errmsg"], "Not an integer");
        assert_eq!(result["wire"]["type"], "VALIDATION");
    }

    #[test]
    fn private_values_are_redacted_in_output() {
        let dir = TempDir::new().unwrap();
        let decl = write_temp_file(&dir, "decl.json", DECLARATIONS);
        let payload = write_temp_file(&dir, "payload.json", r#"["root", "hunter2"]"#);

        cmd()
            .args([
                "validate",
                decl.to_str().unwrap(),
                "--method",
                "auth.login",
                payload.to_str().unwrap(),
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("********"))
            .stdout(predicate::str::contains("hunter2").not());
    }

    #[test]
    fn scalar_payload_is_rejected() {
        let dir = TempDir::new().unwrap();
        let decl = write_temp_file(&dir, "decl.json", DECLARATIONS);
        let payload = write_temp_file(&dir, "payload.json", "42");

        cmd()
            .args([
                "validate",
                decl.to_str().unwrap(),
                "--method",
                "pair.set",
                payload.to_str().unwrap(),
            ])
            .assert()
            .code(2);
    }
}

mod lint_command {
    use super::*;

    #[test]
    fn clean_directory() {
        let dir = TempDir::new().unwrap();
        write_temp_file(&dir, "decl.json", DECLARATIONS);

        cmd()
            .args(["lint", dir.path().to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains("1 files checked, all passed"));
    }

    #[test]
    fn errors_fail() {
        let dir = TempDir::new().unwrap();
        write_temp_file(&dir, "broken.json", "{ nope");

        cmd()
            .args(["lint", dir.path().to_str().unwrap()])
            .assert()
            .code(1)
            .stdout(predicate::str::contains("E001"));
    }

    #[test]
    fn warnings_fail_only_when_strict() {
        let dir = TempDir::new().unwrap();
        write_temp_file(
            &dir,
            "decl.json",
            r#"{"methods": {"m": {"accepts": [{"type": "int", "name": "a"}]}}}"#,
        );

        cmd()
            .args(["lint", dir.path().to_str().unwrap()])
            .assert()
            .success();

        cmd()
            .args(["lint", dir.path().to_str().unwrap(), "--strict"])
            .assert()
            .code(1)
            .stdout(predicate::str::contains("W001"));
    }

    #[test]
    fn json_format() {
        let dir = TempDir::new().unwrap();
        write_temp_file(&dir, "decl.json", DECLARATIONS);

        let output = cmd()
            .args(["lint", dir.path().to_str().unwrap(), "--format", "json"])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        let result: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(result["files_checked"], 1);
        assert_eq!(result["results"][0]["status"], "ok");
    }

    #[test]
    fn missing_path() {
        cmd()
            .args(["lint", "/nonexistent/dir"])
            .assert()
            .code(2);
    }
}
