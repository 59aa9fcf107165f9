mod common;

use common::{parse_json, Sandbox};

#[test]
fn fetch_verifies_local_artifacts_offline() {
    let sandbox = Sandbox::new("vinst-fetch");
    let manifest = sandbox.manifest(false);

    let assert = sandbox
        .vinst()
        .args(["fetch", "--json"])
        .arg(&manifest)
        .assert()
        .success();
    let payload = parse_json(&assert);
    assert_eq!(payload["status"], "ok");
    assert_eq!(payload["details"]["cached"], 0);
    let artifacts = payload["details"]["artifacts"]
        .as_array()
        .expect("artifacts array");
    assert_eq!(artifacts.len(), 2);

    let again = sandbox
        .vinst()
        .args(["fetch", "--json"])
        .arg(&manifest)
        .assert()
        .success();
    assert_eq!(parse_json(&again)["details"]["cached"], 2);
}

#[test]
fn tampered_hash_is_an_integrity_error() {
    let sandbox = Sandbox::new("vinst-fetch-tampered");
    let manifest = sandbox.manifest(true);
    let assert = sandbox
        .vinst()
        .args(["fetch", "--json"])
        .arg(&manifest)
        .assert()
        .code(1);
    let payload = parse_json(&assert);
    assert_eq!(payload["details"]["reason"], "integrity");
    assert_eq!(payload["details"]["package"], "agate");
}

#[test]
fn quiet_fetch_prints_nothing_on_success() {
    let sandbox = Sandbox::new("vinst-fetch-quiet");
    let manifest = sandbox.manifest(false);
    let assert = sandbox
        .vinst()
        .args(["fetch", "-q"])
        .arg(&manifest)
        .assert()
        .success();
    assert!(assert.get_output().stdout.is_empty());
}
