//! End-to-end tests of the command line binary

use crate::support::block_body;
use assert_cmd::Command;
use block_archive_downloader::store::RecordStore;
use std::path::Path;
use tempfile::TempDir;

fn bin() -> Command {
    let mut cmd = Command::cargo_bin("block-archive-downloader").unwrap();
    cmd.env("RUST_LOG", "block_archive_downloader=warn")
        .env_remove("BLOCK_RPC_URL")
        .env_remove("LOG_FORMAT");
    cmd
}

fn write_report(dir: &Path, name: &str, contents: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path.display().to_string()
}

fn reports(dir: &TempDir, candidate_ms: [&str; 2]) -> (String, String) {
    let baseline = write_report(
        dir.path(),
        "baseline.txt",
        "block txs gas workers time\n18000000 120 1000 8 60ms\n\n18000001 80 900 8 40000us\n",
    );
    let candidate = write_report(
        dir.path(),
        "candidate.txt",
        &format!(
            "block txs gas time\n18000000 120 1000 {}\n18000001 80 900 {}\n",
            candidate_ms[0], candidate_ms[1]
        ),
    );
    (baseline, candidate)
}

#[test]
fn test_compare_passes_threshold() {
    let dir = TempDir::new().unwrap();
    let (baseline, candidate) = reports(&dir, ["45ms", "30ms"]);

    let output = bin()
        .args(["compare", "--baseline", &baseline, "--candidate", &candidate])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let stdout = String::from_utf8(output).unwrap();
    assert!(stdout.contains("Improvement: 25.0%"), "{stdout}");
    assert!(stdout.contains("PASS"));
}

#[test]
fn test_compare_below_threshold_fails() {
    let dir = TempDir::new().unwrap();
    let (baseline, candidate) = reports(&dir, ["55ms", "40ms"]);

    bin()
        .args(["compare", "--baseline", &baseline, "--candidate", &candidate])
        .assert()
        .failure();

    bin()
        .args([
            "compare",
            "--baseline",
            &baseline,
            "--candidate",
            &candidate,
            "--threshold",
            "4.5",
        ])
        .assert()
        .success();
}

#[test]
fn test_compare_json_output() {
    let dir = TempDir::new().unwrap();
    let (baseline, candidate) = reports(&dir, ["45ms", "30ms"]);

    let output = bin()
        .args([
            "--output-format",
            "json",
            "compare",
            "--baseline",
            &baseline,
            "--candidate",
            &candidate,
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(value["success"], true);
    assert_eq!(value["comparison"]["baseline"]["blocks"], 2);
    assert_eq!(value["comparison"]["improvement_pct"], 25.0);
}

#[test]
fn test_compare_missing_report_fails() {
    let dir = TempDir::new().unwrap();
    let (baseline, _) = reports(&dir, ["1ms", "1ms"]);
    let missing = dir.path().join("absent.txt").display().to_string();

    bin()
        .args(["compare", "--baseline", &baseline, "--candidate", &missing])
        .assert()
        .failure();
}

#[test]
fn test_verify_complete_store() {
    let dir = TempDir::new().unwrap();
    let store = RecordStore::open(dir.path()).unwrap();
    for block in 20..23 {
        store.save(block, &block_body(block, 2)).unwrap();
    }
    let output_dir = dir.path().display().to_string();

    bin()
        .args(["verify", "--output", &output_dir, "--start", "20", "--count", "3"])
        .assert()
        .success();

    bin()
        .args(["verify", "--output", &output_dir, "--start", "20", "--count", "4"])
        .assert()
        .failure();
}

#[test]
fn test_verify_json_reports_invalid_records() {
    let dir = TempDir::new().unwrap();
    let store = RecordStore::open(dir.path()).unwrap();
    store.save(1, &block_body(1, 0)).unwrap();
    std::fs::write(store.path_for(2), "not json").unwrap();

    let output = bin()
        .args([
            "--output-format",
            "json",
            "verify",
            "--output",
            &dir.path().display().to_string(),
        ])
        .assert()
        .failure()
        .get_output()
        .stdout
        .clone();

    let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(value["valid"], 1);
    assert_eq!(value["invalid"], serde_json::json!([2]));
}

#[test]
fn test_download_rejects_zero_workers() {
    let dir = TempDir::new().unwrap();
    bin()
        .args([
            "download",
            "--rpc",
            "http://127.0.0.1:1",
            "--output",
            &dir.path().display().to_string(),
            "--workers",
            "0",
        ])
        .assert()
        .failure();
}

#[test]
fn test_download_requires_endpoint() {
    bin().args(["download", "--count", "1"]).assert().failure();
}

#[test]
fn test_download_unreachable_node_exits_nonzero() {
    let dir = TempDir::new().unwrap();
    bin()
        .args([
            "download",
            "--rpc",
            "http://127.0.0.1:1",
            "--start",
            "100",
            "--count",
            "3",
            "--timeout-secs",
            "2",
            "--output",
            &dir.path().display().to_string(),
        ])
        .assert()
        .failure();

    let store = RecordStore::open(dir.path()).unwrap();
    assert!(store.stored_blocks().unwrap().is_empty());
}
