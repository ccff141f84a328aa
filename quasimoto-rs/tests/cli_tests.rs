//! Integration tests for the quasimoto CLI.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Run the quasimoto binary with `args`.
fn run_cli(args: &[&str]) -> Command {
    let mut cmd = Command::cargo_bin("quasimoto").expect("Failed to find quasimoto binary");
    cmd.args(args);
    cmd
}

fn write_config(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("bench.yaml");
    fs::write(&path, content).expect("Failed to write test config");
    path
}

/// A benchmark small enough to run in a test.
fn tiny_config_yaml() -> &'static str {
    r#"
seed: 3
artifact_prefix: tiny
one_d:
  chirp:
    points: 50
  suite:
    epochs: 3
    log_every: 1
    models:
      - name: Quasimoto
        model: { kind: wave_ensemble, width: 2 }
      - name: SIREN
        model: { kind: siren, hidden: 8, layers: 1 }
      - name: RFF
        model: { kind: random_fourier, features: 8 }
volumetric:
  volume:
    grid_size: 3
  suite:
    epochs: 3
    log_every: 1
    models:
      - name: Quasimoto-4D
        model: { kind: wave_ensemble3d, width: 2 }
"#
}

#[test]
fn test_help_lists_subcommands() {
    run_cli(&["--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("validate"));
}

#[test]
fn test_init_then_validate() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("quasimoto.yaml");
    let path_str = path.to_str().unwrap();

    run_cli(&["init", path_str, "--preset", "quick"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration written"));
    assert!(path.exists());

    run_cli(&["validate", path_str])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("grid 10"));
}

#[test]
fn test_init_unknown_preset_fails() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("out.yaml");

    run_cli(&["init", path.to_str().unwrap(), "--preset", "enormous"])
        .assert()
        .failure();
    assert!(!path.exists());
}

#[test]
fn test_validate_rejects_bad_config() {
    let temp = TempDir::new().unwrap();
    let path = write_config(
        temp.path(),
        "one_d:\n  suite:\n    epochs: 0\n    models:\n      - name: W\n        model: { kind: wave }\n",
    );

    run_cli(&["validate", path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("epochs must be > 0"));
}

#[test]
fn test_validate_rejects_mismatched_model() {
    let temp = TempDir::new().unwrap();
    let path = write_config(
        temp.path(),
        "one_d:\n  suite:\n    models:\n      - name: W\n        model: { kind: wave3d }\n",
    );

    run_cli(&["validate", path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot consume"));
}

#[test]
fn test_validate_missing_file() {
    run_cli(&["validate", "/nonexistent/quasimoto.yaml"])
        .assert()
        .failure();
}

#[test]
fn test_run_writes_artifacts() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path(), tiny_config_yaml());
    let out = temp.path().join("out");

    run_cli(&[
        "run",
        "--config",
        config.to_str().unwrap(),
        "--output-dir",
        out.to_str().unwrap(),
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("Final Loss"))
    .stdout(predicate::str::contains("Benchmark complete"));

    for name in [
        "tiny_comparison.svg",
        "tiny_convergence.svg",
        "tiny_results.json",
        "tiny_4d_convergence.svg",
        "tiny_4d_results.json",
    ] {
        assert!(out.join(name).exists(), "{name} missing");
    }

    let results = fs::read_to_string(out.join("tiny_results.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&results).unwrap();
    assert_eq!(json["results"].as_array().map(Vec::len), Some(3));
    assert_eq!(json["results"][0]["trajectory"].as_array().map(Vec::len), Some(3));
}

#[test]
fn test_run_skip_volumetric() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path(), tiny_config_yaml());
    let out = temp.path().join("out");

    run_cli(&[
        "run",
        "--config",
        config.to_str().unwrap(),
        "--output-dir",
        out.to_str().unwrap(),
        "--skip-volumetric",
        "--seed",
        "9",
    ])
    .assert()
    .success();

    assert!(out.join("tiny_convergence.svg").exists());
    assert!(!out.join("tiny_4d_convergence.svg").exists());
}
