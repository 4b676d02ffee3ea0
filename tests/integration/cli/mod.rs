//! End to end runs of the devmatch binary, ignored by default as they
//! build the cli first.

use super::utils::{self, ANDROID};
use std::{path::Path, process::Output};

fn devmatch(args: &[&str]) -> Output {
    escargot::CargoBuild::new()
        .package("devmatch-cli")
        .bin("devmatch")
        .target_dir("./target/")
        .run()
        .unwrap()
        .command()
        .args(args)
        .output()
        .unwrap()
}

fn run_ok(args: &[&str]) -> String {
    let output = devmatch(args);
    assert!(
        output.status.success(),
        "devmatch {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).unwrap()
}

fn path(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
#[ignore]
fn help() {
    let lines = run_ok(&["help"]);
    assert!(lines.contains("Usage:"));
    assert!(lines.contains("Commands:"));
    for command in ["match", "info", "build", "legacy"] {
        assert!(lines.contains(command), "{command}");
    }
}

#[test]
#[ignore]
fn build_info_and_match() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("phones.dat");
    let source = utils::fixture("phones.json");

    run_ok(&["build", "-s", path(&source), "-o", path(&data), "-f", "v31"]);

    let info: serde_json::Value =
        serde_json::from_str(&run_ok(&["info", "-d", path(&data)])).unwrap();
    assert_eq!(info["name"], "phones");
    assert_eq!(info["version"], "PatternV3.1");
    assert_eq!(info["signatures"], 3);

    let found: serde_json::Value =
        serde_json::from_str(&run_ok(&["match", "-d", path(&data), "-b", "stream", ANDROID]))
            .unwrap();
    assert_eq!(found["device_id"], "4-11-21");
    assert_eq!(found["method"], "Exact");
    assert_eq!(found["values"]["HardwareVendor"], "Samsung");

    let by_id: serde_json::Value =
        serde_json::from_str(&run_ok(&["match", "-d", path(&data), "-i", "6-12"])).unwrap();
    assert_eq!(by_id["device_id"], "6-12-20");
}

#[test]
#[ignore]
fn legacy_corpus() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = dir.path().join("devices.trie");
    let devices = utils::fixture("devices.xml");
    let handlers = utils::fixture("handlers.xml");

    let detection: serde_json::Value = serde_json::from_str(&run_ok(&[
        "legacy",
        "--devices",
        path(&devices),
        "--handlers",
        path(&handlers),
        "--write-corpus",
        path(&corpus),
        "SonyEricssonK750c/R1CA",
    ]))
    .unwrap();
    assert_eq!(detection["device_id"], "sonyericsson_k750i");

    let info: serde_json::Value =
        serde_json::from_str(&run_ok(&["info", "-d", path(&corpus)])).unwrap();
    assert_eq!(info["version"], "TrieV3.2");
    assert_eq!(info["devices"], 5);

    let again: serde_json::Value = serde_json::from_str(&run_ok(&[
        "legacy",
        "--corpus",
        path(&corpus),
        "SonyEricssonK750c/R1CA",
    ]))
    .unwrap();
    assert_eq!(again["device_id"], "sonyericsson_k750i");
}

#[test]
#[ignore]
fn unreadable_data_set_fails() {
    let dir = tempfile::tempdir().unwrap();
    let garbage = dir.path().join("garbage.dat");
    std::fs::write(&garbage, b"not a data set").unwrap();

    let output = devmatch(&["match", "-d", path(&garbage), ANDROID]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("open data set"));
}
