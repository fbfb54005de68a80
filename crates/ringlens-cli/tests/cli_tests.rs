//! End-to-end CLI tests.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

const HEADER: &str = "transaction_id,sender_id,receiver_id,amount,timestamp\n";

fn write_csv(rows: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{HEADER}{rows}").unwrap();
    file
}

#[test]
fn validate_accepts_clean_csv() {
    let csv = write_csv(
        "t1,A,B,1000,2024-01-01 00:00:00\n\
         t2,B,C,1000,2024-01-01 01:00:00\n",
    );
    Command::cargo_bin("ringlens")
        .unwrap()
        .args(["validate", "--input"])
        .arg(csv.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("2 valid transactions"));
}

#[test]
fn validate_rejects_bad_timestamp() {
    let csv = write_csv("t1,A,B,1000,01-01-2024 00:00\n");
    Command::cargo_bin("ringlens")
        .unwrap()
        .args(["validate", "--input"])
        .arg(csv.path())
        .assert()
        .failure();
}

#[test]
fn analyze_emits_report_json() {
    let csv = write_csv(
        "t1,A,B,1000,2024-01-01 00:00:00\n\
         t2,B,C,1000,2024-01-01 01:00:00\n\
         t3,C,A,1000,2024-01-01 02:00:00\n",
    );
    let output = tempfile::NamedTempFile::new().unwrap();
    Command::cargo_bin("ringlens")
        .unwrap()
        .args(["analyze", "--quiet", "--input"])
        .arg(csv.path())
        .args(["--output"])
        .arg(output.path())
        .assert()
        .success();

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(output.path()).unwrap()).unwrap();
    assert_eq!(report["summary"]["cycles_detected"], 1);
    assert_eq!(report["summary"]["total_accounts_analyzed"], 3);
    assert!(report["suspicious_accounts"].as_array().unwrap().len() >= 3);
    assert_eq!(report["fraud_rings"][0]["pattern_type"], "cycle");
}

#[test]
fn analyze_lenient_skips_bad_rows() {
    let csv = write_csv(
        "t1,A,B,1000,2024-01-01 00:00:00\n\
         t2,A,B,-5,2024-01-01 01:00:00\n\
         t3,B,A,1000,2024-01-01 02:00:00\n",
    );
    Command::cargo_bin("ringlens")
        .unwrap()
        .args(["analyze", "--quiet", "--lenient", "--input"])
        .arg(csv.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"summary\""));
}

#[test]
fn analyze_fails_on_empty_batch() {
    let csv = write_csv("");
    Command::cargo_bin("ringlens")
        .unwrap()
        .args(["analyze", "--quiet", "--input"])
        .arg(csv.path())
        .assert()
        .failure();
}
