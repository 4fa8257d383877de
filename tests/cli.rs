use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn generates_svg_from_roster_file() -> Result<(), Box<dyn std::error::Error>> {
    let fixture = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/roster.json");
    assert!(fixture.exists(), "fixture roster should exist");

    let tmp = tempdir()?;
    let output_path = tmp.path().join("graph.svg");

    let mut cmd = Command::cargo_bin("sociogram")?;
    cmd.arg("--input")
        .arg(&fixture)
        .arg("--output")
        .arg(&output_path);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Wrote graph"));

    let svg_contents = fs::read_to_string(&output_path)?;
    assert!(
        svg_contents.contains("<svg"),
        "output should contain an <svg> element"
    );
    assert!(
        svg_contents.contains("Aiko"),
        "student labels should appear in the output"
    );

    Ok(())
}

#[test]
fn renders_stdin_to_stdout() -> Result<(), Box<dyn std::error::Error>> {
    let roster = r#"{
        "nodes": [
            {"id": "a", "displayName": "Ada", "persistedX": 50, "persistedY": 50},
            {"id": "b", "displayName": "Bo", "persistedX": 250, "persistedY": 80}
        ],
        "edges": [
            {"sourceId": "a", "targetId": "b", "relationshipType": "friendly"}
        ]
    }"#;

    let mut cmd = Command::cargo_bin("sociogram")?;
    cmd.arg("--input").arg("-").arg("--output").arg("-");
    cmd.write_stdin(roster);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("<svg"))
        .stdout(predicate::str::contains("Ada"));

    Ok(())
}

#[test]
fn quiet_mode_suppresses_the_confirmation_line() -> Result<(), Box<dyn std::error::Error>> {
    let fixture = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/roster.json");
    let tmp = tempdir()?;
    let output_path = tmp.path().join("graph.svg");

    let mut cmd = Command::cargo_bin("sociogram")?;
    cmd.arg("-i")
        .arg(&fixture)
        .arg("-o")
        .arg(&output_path)
        .arg("--quiet");

    cmd.assert().success().stdout(predicate::str::is_empty());
    assert!(output_path.exists());

    Ok(())
}
