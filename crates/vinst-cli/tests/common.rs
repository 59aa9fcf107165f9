#![allow(dead_code)]

use std::{fs, path::PathBuf};

use assert_cmd::{assert::Assert, cargo::cargo_bin_cmd, Command};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tempfile::TempDir;

pub struct Sandbox {
    pub temp: TempDir,
}

impl Sandbox {
    pub fn new(prefix: &str) -> Self {
        let temp = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir()
            .expect("tempdir");
        Self { temp }
    }

    pub fn prefix(&self) -> PathBuf {
        self.temp.path().join("prefix")
    }

    /// `vinst` pointed at this sandbox's prefix, offline and uncolored.
    pub fn vinst(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("vinst");
        cmd.env("VINST_PREFIX", self.prefix())
            .env("VINST_ONLINE", "0")
            .env("NO_COLOR", "1")
            .env_remove("VINST_BIN_DIR")
            .env_remove("VINST_CACHE_DIR")
            .env_remove("VINST_PYTHON");
        cmd
    }

    pub fn artifact(&self, name: &str) -> (String, String) {
        let dir = self.temp.path().join("sources");
        fs::create_dir_all(&dir).expect("sources dir");
        let path = dir.join(format!("{name}-1.0.tar.gz"));
        let contents = format!("{name} sdist contents");
        fs::write(&path, &contents).expect("write artifact");
        (
            path.display().to_string(),
            hex::encode(Sha256::digest(contents.as_bytes())),
        )
    }

    /// Writes a two-artifact manifest; `tamper` breaks the resource hash.
    pub fn manifest(&self, tamper: bool) -> PathBuf {
        let (root_url, root_sha) = self.artifact("demo");
        let (dep_url, mut dep_sha) = self.artifact("agate");
        if tamper {
            dep_sha = "f".repeat(64);
        }
        let body = format!(
            r#"[package]
name = "demo"
version = "1.0"
description = "Demo application"
url = "{root_url}"
sha256 = "{root_sha}"

[link]
bin = ["demo"]

[test]
args = ["--version"]
expect = "demo"

[[resource]]
name = "agate"
url = "{dep_url}"
sha256 = "{dep_sha}"
"#
        );
        let path = self.temp.path().join("demo.toml");
        fs::write(&path, body).expect("write manifest");
        path
    }
}

pub fn parse_json(assert: &Assert) -> Value {
    serde_json::from_slice(&assert.get_output().stdout).expect("valid json")
}

pub fn stderr(assert: &Assert) -> String {
    String::from_utf8_lossy(&assert.get_output().stderr).into_owned()
}
