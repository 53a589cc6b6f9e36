//! Integration tests for the dialeval CLI.

use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

/// Helper to run the CLI binary with arguments.
fn run_cli(args: &[&str]) -> std::process::Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_dialeval"));
    cmd.args(args);
    cmd.env_remove("DIALEVAL_OUTPUT_DIR");
    cmd.output().expect("Failed to execute dialeval CLI")
}

/// Write a dataset, one model and a TOML config under `root`.
fn write_fixture(root: &Path) -> std::path::PathBuf {
    let data = root.join("data");
    let model_dir = root.join("results").join("d").join("m");
    fs::create_dir_all(&data).unwrap();
    fs::create_dir_all(&model_dir).unwrap();
    fs::write(data.join("contexts.txt"), "how are you\nwhat is your name\n").unwrap();
    fs::write(data.join("references.txt"), "i am fine\nmy name is bob\n").unwrap();
    fs::write(model_dir.join("output.txt"), "i am good\nmy name is alice\n").unwrap();

    let config = format!(
        r#"models = ["{model}"]
output_dir = "{out}"

[datasets.d]
context = "{data}/contexts.txt"
reference = "{data}/references.txt"

[metrics.bleu]
n = [1, 2]

[metrics.distinct_n]
n = 1
"#,
        model = model_dir.join("output.txt").display(),
        out = root.join("out").display(),
        data = data.display(),
    );
    let path = root.join("run.toml");
    fs::write(&path, config).unwrap();
    path
}

#[test]
fn test_cli_help() {
    let output = run_cli(&["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("dialeval"));
    assert!(stdout.contains("--output-dir"));
    assert!(stdout.contains("--workers"));
}

#[test]
fn test_cli_version() {
    let output = run_cli(&["--version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("dialeval"));
    assert!(stdout.contains("0.1.0"));
}

#[test]
fn test_cli_list_metrics() {
    let output = run_cli(&["--list-metrics"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for name in ["bleu", "rouge", "distinct_n", "embedding_based", "perplexity"] {
        assert!(stdout.lines().any(|l| l == name), "missing {}", name);
    }
}

#[test]
fn test_cli_missing_config() {
    let output = run_cli(&[]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("config"));
}

#[test]
fn test_cli_unsupported_config_format() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("run.py");
    fs::write(&path, "config = {}").unwrap();

    let output = run_cli(&[path.to_str().unwrap()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unsupported config format"));
    assert!(stderr.contains("convert it to .json"));
}

#[test]
fn test_cli_dry_run_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let config = write_fixture(dir.path());

    let output = run_cli(&[config.to_str().unwrap(), "--dry-run"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("3 unit(s)"));
    assert!(stdout.contains("m-d-bleu_1"));
    assert!(stdout.contains("m-d-distinct_1"));
    assert!(!dir.path().join("out").exists());
}

#[test]
fn test_cli_run_and_summary() {
    let dir = TempDir::new().unwrap();
    let config = write_fixture(dir.path());
    let out = dir.path().join("out");

    let output = run_cli(&[config.to_str().unwrap(), "--workers", "2", "--summary"]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    for file in ["m-d-bleu_1.json", "m-d-bleu_2.json", "m-d-distinct_1.json", "config.json"] {
        assert!(out.join(file).exists(), "missing {}", file);
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("3 written"));
    assert!(stdout.contains("System Scores"));

    let record: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("m-d-distinct_1.json")).unwrap())
            .unwrap();
    assert_eq!(record["model"], "m");
    assert_eq!(record["utterance"].as_array().unwrap().len(), 2);

    // A second run finds everything up to date
    let output = run_cli(&[config.to_str().unwrap()]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("0 written, 3 up to date"));

    // The summary can be printed on its own
    let output = run_cli(&["--summary", "-o", out.to_str().unwrap()]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("bleu_1"));
    assert!(stdout.contains("distinct_1"));
}

#[test]
fn test_cli_writes_csv_and_report() {
    let dir = TempDir::new().unwrap();
    let config = write_fixture(dir.path());
    let csv = dir.path().join("summary.csv");
    let report = dir.path().join("report.json");

    let output = run_cli(&[
        config.to_str().unwrap(),
        "--summary-csv",
        csv.to_str().unwrap(),
        "--report",
        report.to_str().unwrap(),
    ]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    // The table is exported, not printed
    assert!(!String::from_utf8_lossy(&output.stdout).contains("System Scores"));

    let table = fs::read_to_string(&csv).unwrap();
    let mut lines = table.lines();
    assert_eq!(
        lines.next(),
        Some("model,dataset,bleu_1,bleu_2,distinct_1")
    );
    let row = lines.next().unwrap();
    assert!(row.starts_with("m,d,"), "row: {}", row);
    assert_eq!(row.split(',').count(), 5);
    assert_eq!(lines.next(), None);

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(report["total"], 3);
    assert_eq!(report["written"], 3);
    assert_eq!(report["units"].as_array().unwrap().len(), 3);
    assert_eq!(report["units"][0]["status"], "written");
    assert!(report["duration_ms"].is_u64());

    // The CSV can also be produced from an existing output directory
    let again = dir.path().join("again.csv");
    let output = run_cli(&[
        "--summary-csv",
        again.to_str().unwrap(),
        "-o",
        dir.path().join("out").to_str().unwrap(),
    ]);
    assert!(output.status.success());
    assert_eq!(fs::read_to_string(&again).unwrap(), table);
}

#[test]
fn test_cli_nested_layout() {
    let dir = TempDir::new().unwrap();
    let config = write_fixture(dir.path());
    let out = dir.path().join("nested");

    let output = run_cli(&[
        config.to_str().unwrap(),
        "--layout",
        "nested",
        "-o",
        out.to_str().unwrap(),
    ]);
    assert!(output.status.success());
    assert!(out.join("bleu_2/m/d/m-d-bleu_2.json").exists());
    assert!(!dir.path().join("out").exists());
}
