//! Command-line interface tests
//!
//! Runs the `cbm-match` binary on the fixture event file and on broken
//! inputs, checking output formats, written files and exit codes.

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data/events.json")
}

fn cbm_match() -> Command {
    Command::cargo_bin("cbm-match").unwrap()
}

#[test]
fn test_match_text_lists_branches() {
    cbm_match()
        .arg("match")
        .arg(fixture())
        .assert()
        .success()
        .stdout(predicate::str::contains("StsHitMatch"))
        .stdout(predicate::str::contains("RichRingMatch"))
        .stdout(predicate::str::contains("Processed 1 events, 0 subsystem failure(s)"));
}

#[test]
fn test_match_json_output() {
    let output = cbm_match()
        .args(["--format", "json", "match"])
        .arg(fixture())
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let event = &json["events"][0];
    assert_eq!(event["branches"]["StsHitMatch"], 3);
    assert_eq!(event["branches"]["MuchTrackMatch"], 1);
    assert!(event["failures"].as_array().unwrap().is_empty());
}

#[test]
fn test_match_tsv_one_row_per_track() {
    cbm_match()
        .args(["match", "--format", "tsv"])
        .arg(fixture())
        .assert()
        .success()
        .stdout(predicate::str::starts_with("file\tentry\tbranch"))
        .stdout(predicate::str::contains("StsTrackMatch\t0"))
        .stdout(predicate::str::contains("MuchTrackMatch\t0"))
        .stdout(predicate::str::contains("RichRingMatch\t0"));
}

#[test]
fn test_match_writes_output_files() {
    let dir = tempfile::tempdir().unwrap();

    for name in ["matches.json", "matches.bin"] {
        let path = dir.path().join(name);
        cbm_match()
            .arg("match")
            .arg(fixture())
            .arg("--output")
            .arg(&path)
            .assert()
            .success();

        let run = cbm_match::io::output::MatchRun::load(&path).unwrap();
        assert_eq!(run.events.len(), 1);
        assert!(run.events[0].failures.is_empty());
        assert_eq!(
            run.events[0]
                .branches
                .hits(cbm_match::ModuleId::Sts)
                .map(<[cbm_match::Match]>::len),
            Some(3)
        );
    }
}

#[test]
fn test_match_gzip_input() {
    use std::io::Write;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.json.gz");
    let mut encoder = flate2::write::GzEncoder::new(
        std::fs::File::create(&path).unwrap(),
        flate2::Compression::default(),
    );
    encoder
        .write_all(&std::fs::read(fixture()).unwrap())
        .unwrap();
    encoder.finish().unwrap();

    cbm_match()
        .arg("match")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("StsTrackMatch"));
}

#[test]
fn test_match_fails_on_subsystem_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    let mut json: serde_json::Value =
        serde_json::from_slice(&std::fs::read(fixture()).unwrap()).unwrap();
    json["events"][0]["much"]["clusters"] = serde_json::json!([{ "digis": [0, 9] }]);
    std::fs::write(&path, serde_json::to_vec(&json).unwrap()).unwrap();

    cbm_match()
        .arg("match")
        .arg(&path)
        .assert()
        .failure()
        .stdout(predicate::str::contains("FAILED: MUCH matching failed"))
        .stdout(predicate::str::contains("StsHitMatch"))
        .stderr(predicate::str::contains("1 subsystem matching failure(s)"));
}

#[test]
fn test_match_without_mc_tracks() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("no_mc.json");
    std::fs::write(
        &path,
        r#"{"version": "1.0.0", "events": [{"sts": {"hits": []}}]}"#,
    )
    .unwrap();

    cbm_match()
        .arg("match")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("MCTrack"));
}

#[test]
fn test_match_missing_input_file() {
    cbm_match()
        .args(["match", "/nonexistent/events.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read event file"));
}

#[test]
fn test_match_with_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.json");
    std::fs::write(&config, r#"{"cherenkov_pdg": 22}"#).unwrap();

    let output = cbm_match()
        .args(["--format", "json", "match", "--config"])
        .arg(&config)
        .arg(fixture())
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let ring = &json["events"][0]["matches"]["rich"]["tracks"][0];
    assert_eq!(ring["nof_true_hits"], 0);
    assert!(ring["truth"]["links"].as_array().unwrap().is_empty());
}

#[test]
fn test_qa_text_summary() {
    cbm_match()
        .args(["qa", "--quota", "0.6"])
        .arg(fixture())
        .assert()
        .success()
        .stdout(predicate::str::contains("quota 0.60"))
        .stdout(predicate::str::contains("StsTrackMatch"))
        .stdout(predicate::str::contains("RichRingMatch"));
}

#[test]
fn test_qa_json_counts() {
    let output = cbm_match()
        .args(["-f", "json", "qa"])
        .arg(fixture())
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["events"], 1);
    let detectors = json["detectors"].as_array().unwrap();
    let sts = detectors
        .iter()
        .find(|d| d["branch"] == "StsTrackMatch")
        .unwrap();
    // 2 of 3 hits true is below the default quota
    assert_eq!(sts["ghosts"], 1);
    let much = detectors
        .iter()
        .find(|d| d["branch"] == "MuchTrackMatch")
        .unwrap();
    assert_eq!(much["reconstructed"], 1);
}

#[test]
fn test_qa_rejects_bad_quota() {
    cbm_match()
        .args(["qa", "--quota", "2"])
        .arg(fixture())
        .assert()
        .failure()
        .stderr(predicate::str::contains("quota must be within"));
}
