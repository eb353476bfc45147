#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::{json, Value};
use tempfile::TempDir;

const SNAPSHOT: &str = r#"{
    "books": [
        {"$key": ["1984"], "title": "1984", "author": {"$ref": "users.orwell"}},
        {"$key": ["2001"], "title": "2001", "author": {"$ref": "users.clarke"}}
    ],
    "users": {
        "orwell": {"name": "George Orwell"},
        "clarke": {"name": "Arthur C Clarke"},
        "huxley": null
    }
}"#;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        fs::create_dir_all(dir.path().join("xdg")).expect("config home");
        Self { dir }
    }

    fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, contents).expect("write fixture");
        path
    }

    fn snapshot(&self) -> PathBuf {
        self.write("snapshot.json", SNAPSHOT)
    }

    fn cmd(&self) -> assert_cmd::Command {
        let mut cmd = cargo_bin_cmd!("graphweave");
        cmd.env_remove("GRAPHWEAVE_CONFIG")
            .env_remove("GRAPHWEAVE_LOG")
            .env("XDG_CONFIG_HOME", self.dir.path().join("xdg"));
        cmd
    }
}

fn json_stdout(output: &[u8]) -> Value {
    serde_json::from_slice(output).expect("json output")
}

fn path_arg(path: &Path) -> &str {
    path.to_str().expect("utf-8 path")
}

#[test]
fn decode_reports_known_results_as_json() {
    let ws = Workspace::new();
    let snapshot = ws.snapshot();
    let query = ws.write(
        "query.json",
        r#"{"books": {"$key": {"$first": 1}, "title": true, "author": {"name": true}}}"#,
    );
    let output = ws
        .cmd()
        .args(["--format", "json", "decode", "--snapshot"])
        .arg(&snapshot)
        .arg("--query")
        .arg(&query)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let report = json_stdout(&output);
    assert_eq!(report["known"], json!(true));
    let books = &report["result"]["books"];
    assert_eq!(
        books["$items"],
        json!([{
            "$key": ["1984"],
            "title": "1984",
            "author": {"$ref": ["users", "orwell"], "name": "George Orwell"},
        }])
    );
    assert_eq!(books["$next"], json!({"$first": 1, "$after": ["1984"]}));
}

#[test]
fn decode_reports_unknown_results() {
    let ws = Workspace::new();
    let query = ws.write("leaf.json", "true");
    let output = ws
        .cmd()
        .args(["--format", "json", "decode", "--snapshot", "{}", "--query"])
        .arg(&query)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert_eq!(json_stdout(&output), json!({"known": false, "result": null}));
}

#[test]
fn decode_reads_the_snapshot_from_stdin() {
    let ws = Workspace::new();
    let output = ws
        .cmd()
        .args([
            "--format",
            "json",
            "decode",
            "--snapshot",
            "-",
            "--query",
            r#"{"users": {"huxley": {"name": true}, "orwell": {"name": true}}}"#,
        ])
        .write_stdin(SNAPSHOT)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert_eq!(
        json_stdout(&output)["result"],
        json!({"users": {"huxley": null, "orwell": {"name": "George Orwell"}}})
    );
}

#[test]
fn decode_text_output() {
    let ws = Workspace::new();
    let snapshot = ws.snapshot();
    let output = ws
        .cmd()
        .args(["--theme", "plain", "decode", "--snapshot"])
        .arg(&snapshot)
        .args(["--query", r#"{"users": {"clarke": {"name": true}}}"#])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).expect("utf-8");
    assert!(text.contains("Result"));
    assert!(text.contains("Arthur C Clarke"));
}

#[test]
fn shape_prints_the_provider_query() {
    let ws = Workspace::new();
    let output = ws
        .cmd()
        .args([
            "--format",
            "json",
            "shape",
            "--query",
            r#"{"books": {"$key": {"$first": 2}, "title": true, "author": {"name": true}}}"#,
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert_eq!(
        json_stdout(&output),
        json!({"books": [{"$first": 2}, {"author": {"name": true}, "title": true}]})
    );
}

#[test]
fn lookup_statuses() {
    let ws = Workspace::new();
    let snapshot = ws.snapshot();
    let lookup = |path: &str| {
        let output = ws
            .cmd()
            .args(["--format", "json", "lookup", "--snapshot", path_arg(&snapshot), "--path", path])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        json_stdout(&output)
    };

    let found = lookup("users.orwell.name");
    assert_eq!(found["status"], json!("found"));
    assert_eq!(found["value"], json!("George Orwell"));
    assert_eq!(lookup("users.huxley")["status"], json!("absent"));
    let unknown = lookup("users.wells");
    assert_eq!(unknown["status"], json!("unknown"));
    assert!(unknown.get("value").is_none());

    let through_link = lookup(r#"["books", ["2001"], "author", "name"]"#);
    assert_eq!(through_link["value"], json!("Arthur C Clarke"));
}

#[test]
fn completions_are_generated() {
    let ws = Workspace::new();
    let output = ws
        .cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert!(String::from_utf8_lossy(&output).contains("graphweave"));
}

#[test]
fn invalid_queries_fail() {
    let ws = Workspace::new();
    let output = ws
        .cmd()
        .args(["shape", "--query", r#"{"$bogus": 1}"#])
        .assert()
        .failure()
        .code(1)
        .get_output()
        .stderr
        .clone();
    assert!(String::from_utf8_lossy(&output).starts_with("error:"));
}

#[test]
fn config_file_sets_limits_and_format() {
    let ws = Workspace::new();
    let snapshot = ws.write(
        "chain.json",
        r#"{"a": {"$ref": "b"}, "b": {"$ref": "c"}, "c": {"$ref": "d"}, "d": {"name": "end"}}"#,
    );
    let query = r#"{"a": {"name": true}}"#;

    let output = ws
        .cmd()
        .args(["--format", "json", "decode", "--snapshot", path_arg(&snapshot), "--query", query])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert_eq!(json_stdout(&output)["result"], json!({"a": {"$ref": ["b"], "name": "end"}}));

    let config = ws.write(
        "config.toml",
        "[decode]\nmax_reference_hops = 1\n\n[cli]\nformat = \"json\"\n",
    );
    let stderr = ws
        .cmd()
        .arg("--config")
        .arg(&config)
        .args(["decode", "--snapshot", path_arg(&snapshot), "--query", query])
        .assert()
        .failure()
        .get_output()
        .stderr
        .clone();
    assert!(String::from_utf8_lossy(&stderr).contains("error:"));

    let output = ws
        .cmd()
        .arg("--config")
        .arg(&config)
        .args(["lookup", "--snapshot", path_arg(&snapshot), "--path", "d.name"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert_eq!(json_stdout(&output)["value"], json!("end"));
}

#[test]
fn missing_config_file_fails() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["--config", "does-not-exist.toml", "shape", "--query", r#"{"a": true}"#])
        .assert()
        .failure();
}
