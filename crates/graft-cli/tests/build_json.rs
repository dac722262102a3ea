//! Integration tests for `graft build --json` output.

use std::path::Path;
use std::process::Command;
use tempfile::{tempdir, TempDir};

fn cargo_bin() -> Command {
    let mut cmd = Command::new(env!("CARGO"));
    cmd.args(["run", "-q", "-p", "graft-cli", "--bin", "graft", "--"]);
    cmd
}

fn write(dir: &Path, path: &str, content: &str) {
    let path = dir.join(path);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn project() -> TempDir {
    let dir = tempdir().unwrap();
    write(
        dir.path(),
        "graft.json",
        r#"{
            "root": ".",
            "output": "dist",
            "entrypoints": { "a.ts": { "output": "browser" } },
            "hashable": ["static/**"],
            "cache": false
        }"#,
    );
    write(
        dir.path(),
        "a.ts",
        "import { b } from \"./b.ts\";\nconsole.log(b);\n",
    );
    write(dir.path(), "b.ts", "export const b: number = 1;\n");
    write(dir.path(), "static/logo.svg", "<svg></svg>");
    dir
}

fn run_json(dir: &Path, args: &[&str]) -> (bool, serde_json::Value) {
    let cache = dir.join(".cache");
    let output = cargo_bin()
        .args(args)
        .args(["--json", "--cwd"])
        .arg(dir)
        .env("GRAFT_CACHE_DIR", cache)
        .output()
        .expect("Failed to run graft");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value =
        serde_json::from_str(stdout.trim()).expect("Output should be valid JSON");
    (output.status.success(), json)
}

#[test]
fn test_build_json_success() {
    let dir = project();
    let (success, json) = run_json(dir.path(), &["build"]);

    assert!(success);
    assert_eq!(json["ok"], true);
    assert_eq!(json["counts"]["compiled"], 2);
    assert_eq!(json["counts"]["entrypoints"], 1);
    assert_eq!(json["entrypoints"][0]["path"], "a.js");
    assert_eq!(json["entrypoints"][0]["modules"], 2);
    assert_eq!(json["entrypoints"][0]["target"], "browser");

    let dist = dir.path().join("dist");
    assert!(dist.join("a.js").exists());
    assert!(dist.join("b.js").exists());

    let manifest: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dist.join("manifest.json")).unwrap())
            .unwrap();
    assert_eq!(manifest["files"]["a.ts"], "a.js");
    let logo = manifest["files"]["static/logo.svg"].as_str().unwrap();
    assert!(logo.starts_with("static/logo."));
    assert!(dist.join(logo).exists());
}

#[test]
fn test_build_json_missing_config() {
    let dir = tempdir().unwrap();
    let (success, json) = run_json(dir.path(), &["build"]);

    assert!(!success);
    assert_eq!(json["ok"], false);
    assert_eq!(json["error"]["code"], "GRAFT_CONFIG_INVALID");
    assert!(json["error"]["message"].as_str().unwrap().contains("graft.json"));
}

#[test]
fn test_build_json_error_code_is_screaming_snake_case() {
    let dir = project();
    write(dir.path(), "a.ts", "import \"react\";\n");
    let (success, json) = run_json(dir.path(), &["build"]);

    assert!(!success);
    let code = json["error"]["code"].as_str().unwrap();
    assert_eq!(code, "GRAFT_GRAPH_FAILED");
    assert!(code.chars().all(|c| c.is_ascii_uppercase() || c == '_'));
}

#[test]
fn test_graph_json_lists_modules() {
    let dir = project();
    let (success, json) = run_json(dir.path(), &["graph", "a.ts"]);

    assert!(success);
    assert_eq!(json["entrypoint"], "a.js");
    let modules = json["graph"]["modules"].as_object().unwrap();
    assert_eq!(modules.len(), 2);
    assert!(modules.keys().any(|k| k.ends_with("/dist/b.js")));
}

#[test]
fn test_graph_json_unknown_entry() {
    let dir = project();
    let (success, json) = run_json(dir.path(), &["graph", "missing.ts"]);

    assert!(!success);
    assert_eq!(json["error"]["code"], "GRAFT_UNKNOWN_ENTRYPOINT");
}

#[test]
fn test_resolve_json_through_import_map() {
    let dir = project();
    write(
        dir.path(),
        "import_map.json",
        r#"{ "imports": { "react": "https://esm.sh/react@18.2.0" } }"#,
    );
    let config = std::fs::read_to_string(dir.path().join("graft.json"))
        .unwrap()
        .replacen('{', "{ \"import_map\": \"import_map.json\",", 1);
    write(dir.path(), "graft.json", &config);

    let referrer = format!("file://{}/a.ts", dir.path().display());
    let (success, json) = run_json(
        dir.path(),
        &["resolve", "react", "--referrer", referrer.as_str()],
    );

    assert!(success);
    // Same CDN normalization as graph edges
    assert_eq!(
        json["resolved"],
        "https://esm.sh/react@18.2.0?no-dts=&target=es2020"
    );
    assert_eq!(json["bare"], json["resolved"]);
}

#[test]
fn test_resolve_json_unmapped_bare() {
    let dir = project();
    let referrer = format!("file://{}/a.ts", dir.path().display());
    let (success, json) = run_json(
        dir.path(),
        &["resolve", "lodash", "--referrer", referrer.as_str()],
    );

    assert!(!success);
    assert_eq!(json["error"]["code"], "GRAFT_RESOLVE_FAILED");
}
