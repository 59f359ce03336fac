//! Integration tests for the `fabula` CLI commands.
#![allow(deprecated)] // Command::cargo_bin – macro replacement not yet stable

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Write a small, fully valid story document.
fn valid_story(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("story.json");
    fs::write(
        &path,
        r#"{
    "meta": {
        "id": "demo",
        "title": "Demo",
        "owner": 1,
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-01-01T00:00:00Z"
    },
    "fragments": {
        "main_1": {
            "id": "main_1",
            "text": "You wake up.",
            "choices": [
                {
                    "text": "Take the key",
                    "target": "hall",
                    "effects": [{"kind": "set", "stat": "key", "value": 1, "hide": false}]
                },
                {
                    "text": "Stay in bed",
                    "target": "bed"
                }
            ]
        },
        "hall": {"id": "hall", "text": "A long hall.", "choices": []},
        "bed": {"id": "bed", "text": "Five more minutes.", "choices": []}
    }
}"#,
    )
    .unwrap();
    path
}

/// A story whose only choice targets a fragment that does not exist and
/// with one island fragment.
fn broken_story(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("broken.json");
    fs::write(
        &path,
        r#"{
    "meta": {
        "id": "broken",
        "title": "Broken",
        "owner": 1,
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-01-01T00:00:00Z"
    },
    "fragments": {
        "main_1": {
            "id": "main_1",
            "text": "Start.",
            "choices": [{"text": "Onward", "target": "gone"}]
        },
        "isle": {"id": "isle", "text": "Alone.", "choices": []}
    }
}"#,
    )
    .unwrap();
    path
}

fn fabula() -> Command {
    Command::cargo_bin("fabula").unwrap()
}

#[test]
fn check_passes_on_a_valid_story() {
    let dir = TempDir::new().unwrap();
    let story = valid_story(&dir);

    fabula()
        .args(["check"])
        .arg(&story)
        .assert()
        .success()
        .stdout(predicate::str::contains("All checks passed"))
        .stdout(predicate::str::contains("3 fragments"));
}

#[test]
fn check_reports_dangling_and_unreachable() {
    let dir = TempDir::new().unwrap();
    let story = broken_story(&dir);

    fabula()
        .args(["check"])
        .arg(&story)
        .assert()
        .failure()
        .stdout(predicate::str::contains("dangling:"))
        .stdout(predicate::str::contains("unreachable:"))
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn check_rejects_a_rootless_story() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rootless.json");
    fs::write(
        &path,
        r#"{
    "meta": {
        "id": "r",
        "title": "Rootless",
        "owner": 1,
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-01-01T00:00:00Z"
    },
    "fragments": {
        "isle": {"id": "isle", "text": "Alone.", "choices": []}
    }
}"#,
    )
    .unwrap();

    fabula()
        .args(["check"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("root fragment"));
}

#[test]
fn graph_prints_dot_to_stdout() {
    let dir = TempDir::new().unwrap();
    let story = valid_story(&dir);

    fabula()
        .args(["graph"])
        .arg(&story)
        .assert()
        .success()
        .stdout(predicate::str::contains("digraph \"Demo\""))
        .stdout(predicate::str::contains(
            "\"main_1\" -> \"hall\" [label=\"Take the key\"];",
        ));
}

#[test]
fn graph_writes_to_a_file() {
    let dir = TempDir::new().unwrap();
    let story = valid_story(&dir);
    let out = dir.path().join("story.dot");

    fabula()
        .args(["graph"])
        .arg(&story)
        .arg("--output")
        .arg(&out)
        .assert()
        .success();

    let dot = fs::read_to_string(&out).unwrap();
    assert!(dot.contains("digraph \"Demo\""));
}

#[test]
fn play_runs_through_to_an_ending() {
    let dir = TempDir::new().unwrap();
    let story = valid_story(&dir);

    fabula()
        .args(["play", "--fast"])
        .arg(&story)
        .write_stdin("1\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("You wake up."))
        .stdout(predicate::str::contains("key = 1"))
        .stdout(predicate::str::contains("A long hall."))
        .stdout(predicate::str::contains("The End."));
}

#[test]
fn play_quits_on_q() {
    let dir = TempDir::new().unwrap();
    let story = valid_story(&dir);

    fabula()
        .args(["play", "--fast"])
        .arg(&story)
        .write_stdin("q\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("The End.").not());
}

#[test]
fn shared_play_resolves_a_group_vote() {
    let dir = TempDir::new().unwrap();
    let story = valid_story(&dir);

    // Default threshold is two: the second vote on the same choice wins.
    fabula()
        .args(["play", "--fast", "--shared"])
        .arg(&story)
        .write_stdin("10 1\n11 1\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Group vote (2 to win):"))
        .stdout(predicate::str::contains("votes: 1 / 0"))
        .stdout(predicate::str::contains("A long hall."))
        .stdout(predicate::str::contains("The End."));
}

#[test]
fn shared_play_rejects_a_repeat_voter() {
    let dir = TempDir::new().unwrap();
    let story = valid_story(&dir);

    fabula()
        .args(["play", "--fast", "--shared"])
        .arg(&story)
        .write_stdin("10 1\n10 2\n11 1\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("player 10 already voted"))
        .stdout(predicate::str::contains("The End."));
}

#[test]
fn missing_story_file_fails() {
    fabula()
        .args(["check", "no-such-story.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}
