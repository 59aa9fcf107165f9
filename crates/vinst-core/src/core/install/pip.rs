//! Argument and environment builders for the interpreter and pip invocations.

use std::path::Path;

use vinst_domain::{BuildMode, PackageSpec};

const STANDARD_INSTALL_FLAGS: &[&str] = &[
    "install",
    "-v",
    "--no-deps",
    "--no-binary",
    ":all:",
    "--ignore-installed",
];
const SOURCE_BUILD_FLAGS: &[&str] = &["--no-build-isolation", "--no-use-pep517"];

/// Set for source builds so cargo fetches git dependencies through the git CLI.
pub(crate) const GIT_FETCH_WITH_CLI: (&str, &str) = ("CARGO_NET_GIT_FETCH_WITH_CLI", "true");

pub(crate) fn venv_args(libexec: &Path) -> Vec<String> {
    vec![
        "-m".to_string(),
        "venv".to_string(),
        libexec.display().to_string(),
    ]
}

pub(crate) fn upgrade_pip_args() -> Vec<String> {
    ["install", "--upgrade", "pip"]
        .iter()
        .map(ToString::to_string)
        .collect()
}

pub(crate) fn install_args(spec: &PackageSpec, artifact: &Path) -> Vec<String> {
    let mut args: Vec<String> = STANDARD_INSTALL_FLAGS
        .iter()
        .map(ToString::to_string)
        .collect();
    if spec.build == BuildMode::Source {
        args.extend(SOURCE_BUILD_FLAGS.iter().map(ToString::to_string));
    }
    args.push(artifact.display().to_string());
    args
}

/// Variables for this package's pip subprocess only.
pub(crate) fn install_env(spec: &PackageSpec) -> Vec<(String, String)> {
    let mut env = Vec::new();
    if spec.build == BuildMode::Source {
        env.push((GIT_FETCH_WITH_CLI.0.to_string(), GIT_FETCH_WITH_CLI.1.to_string()));
    }
    for (key, value) in &spec.env {
        env.retain(|(existing, _)| existing != key);
        env.push((key.clone(), value.clone()));
    }
    env
}
