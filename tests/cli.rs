use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, value: Value) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, serde_json::to_string_pretty(&value).unwrap()).unwrap();
    path
}

fn roma(dir: &TempDir, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_roma"))
        .arg("--config")
        .arg(dir.path().join("absent-config.json"))
        .args(args)
        .env_remove("ROMA_SOURCES")
        .env_remove("ROMA_TIME_START")
        .env_remove("ROMA_TIME_END")
        .env_remove("ROMA_VERBOSE")
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn source_arg(name: &str, path: &Path) -> String {
    format!("{}={}", name, path.display())
}

fn sample(dir: &TempDir) -> PathBuf {
    write(
        dir,
        "pleiades.json",
        json!([
            {"id": "pleiades_433032", "name_latin": "Pompeii", "latitude": 40.7509, "longitude": 14.4869},
            {"id": "pleiades_423025", "name_latin": "Roma", "latitude": 41.8919, "longitude": 12.4853}
        ]),
    )
}

#[test]
fn test_cli_rejects_source_not_enabled() {
    let dir = TempDir::new().unwrap();
    let path = sample(&dir);
    let out = roma(&dir, &["--source", &source_arg("wikidata", &path)]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Source 'wikidata' is not enabled"), "{}", stderr);
    assert!(out.stdout.is_empty());
}

#[test]
fn test_cli_prints_records_without_out() {
    let dir = TempDir::new().unwrap();
    let path = sample(&dir);
    let out = roma(&dir, &["--source", &source_arg("pleiades", &path)]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let records: Value = serde_json::from_slice(&out.stdout).unwrap();
    let ids: Vec<&str> = records.as_array().unwrap().iter().map(|r| r["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["pleiades_423025", "pleiades_433032"]);
}

#[test]
fn test_cli_prints_summary_with_out() {
    let dir = TempDir::new().unwrap();
    let path = sample(&dir);
    let out_path = dir.path().join("processed").join("locations.json");
    let out = roma(
        &dir,
        &["--source", &source_arg("pleiades", &path), "--out", out_path.to_str().unwrap()],
    );
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let summary: Value = serde_json::from_slice(&out.stdout).unwrap();
    assert!(summary["generated_at"].is_string());
    assert_eq!(summary["report"]["total"], json!(2));
    assert_eq!(summary["validation"]["overall_passed"], json!(true));
    assert!(summary.get("links").is_none());

    let written: Value = serde_json::from_str(&fs::read_to_string(&out_path).unwrap()).unwrap();
    assert_eq!(written.as_array().unwrap().len(), 2);
}
