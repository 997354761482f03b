//! Integration tests for the schemaref binary.
//!
//! Each test runs in its own temporary directory with an explicit global
//! config, so the user's configuration never leaks in.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
    config: PathBuf,
}

impl Workspace {
    fn new(config: &str) -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let config_path = dir.path().join("global.toml");
        std::fs::write(&config_path, config).unwrap();
        Self {
            dir,
            config: config_path,
        }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn write(&self, name: &str, doc: &Value) {
        std::fs::write(self.path().join(name), serde_json::to_string(doc).unwrap()).unwrap();
    }

    fn schemaref(&self) -> Command {
        let mut cmd = Command::cargo_bin("schemaref").unwrap();
        cmd.current_dir(self.path())
            .arg("--config")
            .arg(&self.config)
            .env_remove("RUST_LOG");
        cmd
    }
}

fn car_document() -> Value {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "$ref": "#/definitions/Car",
        "definitions": {
            "Car": {
                "type": "object",
                "title": "Car",
                "properties": {
                    "brand": {"type": "string"},
                    "wheels": {
                        "type": "array",
                        "items": {"$ref": "#/definitions/Wheel"},
                        "maxItems": 4
                    }
                }
            },
            "Wheel": {
                "type": "object",
                "title": "Wheel",
                "properties": {"size": {"type": "number"}}
            }
        }
    })
}

#[test]
fn version_flag_works() {
    Command::cargo_bin("schemaref")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("schemaref"));
}

#[test]
fn parse_prints_reference_graph() {
    let ws = Workspace::new("");
    ws.write("car.json", &car_document());

    ws.schemaref()
        .args(["parse", "car.json"])
        .assert()
        .success()
        .stdout(predicate::eq(
            "entity Car (default)\n  brand: string\n  wheels: Wheel[0..4]\nclass Wheel (default)\n  size: number\n",
        ));
}

#[test]
fn parse_as_class_into_namespace() {
    let ws = Workspace::new("");
    ws.write("car.json", &car_document());

    ws.schemaref()
        .args(["parse", "car.json", "--namespace", "fleet", "--as-class"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("class Car (fleet)\n"));
}

#[test]
fn config_default_namespace_applies() {
    let ws = Workspace::new("default_namespace = \"garage\"\n");
    ws.write("car.json", &car_document());

    ws.schemaref()
        .args(["parse", "car.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("entity Car (garage)"));
}

#[test]
fn roundtrip_reproduces_document() {
    let ws = Workspace::new("");
    let doc = car_document();
    ws.write("car.json", &doc);

    let output = ws
        .schemaref()
        .args(["roundtrip", "car.json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let printed: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(printed, doc);
}

#[test]
fn invalid_config_fails() {
    let ws = Workspace::new("unknown_key = 1\n");
    ws.write("car.json", &car_document());

    ws.schemaref()
        .args(["parse", "car.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load configuration"));
}

#[test]
fn unsupported_document_fails() {
    let ws = Workspace::new("");
    ws.write(
        "pair.json",
        &json!({
            "title": "Pair",
            "type": "object",
            "properties": {"items": {"type": "array", "items": [{"type": "string"}]}}
        }),
    );

    ws.schemaref()
        .args(["roundtrip", "pair.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not supported"));
}

#[test]
fn missing_file_fails() {
    let ws = Workspace::new("");
    ws.schemaref()
        .args(["parse", "nope.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read"));
}
