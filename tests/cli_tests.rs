//! CLI integration: exit codes and output over fixture snapshot files.

use std::io::Write;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::str::contains;
use serde_json::json;

fn write_fixture(value: serde_json::Value) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{}", value).unwrap();
    file
}

fn curated_patterns() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data/patterns.json")
}

fn onetrust_fixture() -> serde_json::Value {
    json!({
        "viewport": {"width": 1280.0, "height": 800.0},
        "root": {"tag": "body", "children": [
            {"tag": "div", "attrs": {"id": "onetrust-banner-sdk"},
             "style": {"position": "fixed", "zIndex": 9999},
             "rect": {"x": 0.0, "y": 650.0, "width": 1280.0, "height": 150.0},
             "text": "We use cookies to personalize content.",
             "children": [
                {"tag": "button", "attrs": {"id": "onetrust-accept-btn-handler"},
                 "rect": {"width": 140.0, "height": 40.0}, "text": "Accept All Cookies"}
             ]}
        ]}
    })
}

fn empty_fixture() -> serde_json::Value {
    json!({
        "root": {"tag": "body", "children": [
            {"tag": "main", "rect": {"width": 1280.0, "height": 800.0},
             "text": "Nothing to consent to here."}
        ]}
    })
}

#[test]
fn no_arguments_shows_usage_and_fails() {
    let mut cmd = Command::cargo_bin("bannersense").unwrap();
    cmd.assert().failure();
}

#[test]
fn detect_finds_known_platform_banner() {
    let fixture = write_fixture(onetrust_fixture());
    let mut cmd = Command::cargo_bin("bannersense").unwrap();
    cmd.arg("detect")
        .arg(fixture.path())
        .arg("--patterns")
        .arg(curated_patterns())
        .arg("--no-color")
        .assert()
        .success()
        .stdout(contains("knownCmp"))
        .stdout(contains("OneTrust"));
}

#[test]
fn detect_json_output_is_machine_readable() {
    let fixture = write_fixture(onetrust_fixture());
    let mut cmd = Command::cargo_bin("bannersense").unwrap();
    cmd.arg("detect")
        .arg(fixture.path())
        .arg("--patterns")
        .arg(curated_patterns())
        .arg("--json")
        .assert()
        .success()
        .stdout(contains("\"kind\": \"knownCmp\""))
        .stdout(contains("\"cmpName\": \"OneTrust\""));
}

#[test]
fn detect_reports_no_banner_with_exit_code_one() {
    let fixture = write_fixture(empty_fixture());
    let mut cmd = Command::cargo_bin("bannersense").unwrap();
    cmd.arg("detect")
        .arg(fixture.path())
        .arg("--no-color")
        .assert()
        .code(1)
        .stdout(contains("No banner detected"));
}

#[test]
fn detect_rejects_unreadable_snapshot() {
    let mut cmd = Command::cargo_bin("bannersense").unwrap();
    cmd.arg("detect")
        .arg("/definitely/not/a/file.json")
        .assert()
        .code(2);
}

#[test]
fn actuate_plans_the_click_sequence() {
    let fixture = write_fixture(onetrust_fixture());
    let mut cmd = Command::cargo_bin("bannersense").unwrap();
    cmd.arg("actuate")
        .arg(fixture.path())
        .arg("--polarity")
        .arg("accept")
        .arg("--patterns")
        .arg(curated_patterns())
        .arg("--no-color")
        .assert()
        .success()
        .stdout(contains("onetrust-accept-btn-handler"))
        .stdout(contains("pointerdown"))
        .stdout(contains("click"));
}

#[test]
fn schema_prints_pattern_database_schema() {
    let mut cmd = Command::cargo_bin("bannersense").unwrap();
    cmd.arg("schema")
        .arg("patterns")
        .assert()
        .success()
        .stdout(contains("knownCmps"));
}
