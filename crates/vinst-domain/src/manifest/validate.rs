use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use url::Url;

use super::normalize::canonicalize_package_name;
use super::{BuildMode, Manifest, PackageSpec};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestIssue {
    pub field: String,
    pub message: String,
}

impl ManifestIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ManifestIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed to read manifest {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("manifest is not valid TOML: {0}")]
    Syntax(#[from] toml_edit::TomlError),
    #[error("invalid manifest: {}", join_issues(.0))]
    Invalid(Vec<ManifestIssue>),
}

impl ManifestError {
    pub fn issues(&self) -> &[ManifestIssue] {
        match self {
            Self::Invalid(issues) => issues,
            _ => &[],
        }
    }
}

fn join_issues(issues: &[ManifestIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Checks the semantic rules of a manifest that parsing alone cannot catch.
pub fn validate_manifest(manifest: &Manifest) -> Vec<ManifestIssue> {
    let mut issues = Vec::new();
    validate_spec(&manifest.root, "package", &mut issues);
    if !manifest.name.is_empty() && !is_bare_component(&manifest.name) {
        issues.push(ManifestIssue::new(
            "package.name",
            format!("`{}` must not contain path separators", manifest.name),
        ));
    }
    if manifest.version.is_empty() {
        issues.push(ManifestIssue::new("package.version", "is required"));
    } else if !is_bare_component(&manifest.version) {
        issues.push(ManifestIssue::new(
            "package.version",
            format!("`{}` must not contain path separators", manifest.version),
        ));
    }
    if manifest.runtime.python.is_empty() {
        issues.push(ManifestIssue::new("runtime.python", "must not be empty"));
    }
    for (idx, tool) in manifest.runtime.build_requires.iter().enumerate() {
        if tool.is_empty() {
            issues.push(ManifestIssue::new(
                format!("runtime.build-requires[{idx}]"),
                "must not be empty",
            ));
        }
    }

    let root_name = canonicalize_package_name(&manifest.root.name);
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut source_builds = Vec::new();
    for (idx, spec) in manifest.resources.iter().enumerate() {
        let prefix = format!("resource[{idx}]");
        validate_spec(spec, &prefix, &mut issues);
        if spec.name.is_empty() {
            continue;
        }
        let canonical = canonicalize_package_name(&spec.name);
        if !root_name.is_empty() && canonical == root_name {
            issues.push(ManifestIssue::new(
                format!("{prefix}.name"),
                format!("`{}` duplicates the root package", spec.name),
            ));
        }
        if let Some(first) = seen.insert(canonical, idx) {
            issues.push(ManifestIssue::new(
                format!("{prefix}.name"),
                format!("`{}` is already declared by resource[{first}]", spec.name),
            ));
        }
        if spec.build == BuildMode::Source {
            source_builds.push(spec.name.clone());
        }
    }
    if source_builds.len() > 1 {
        issues.push(ManifestIssue::new(
            "resource",
            format!(
                "only one resource may use build = \"source\" (found {})",
                source_builds.join(", ")
            ),
        ));
    }

    for (idx, link) in manifest.links.iter().enumerate() {
        if !is_bare_component(link) {
            issues.push(ManifestIssue::new(
                format!("link.bin[{idx}]"),
                format!("`{link}` is not a bare executable name"),
            ));
        }
    }
    issues
}

fn validate_spec(spec: &PackageSpec, prefix: &str, issues: &mut Vec<ManifestIssue>) {
    if spec.name.is_empty() {
        issues.push(ManifestIssue::new(format!("{prefix}.name"), "is required"));
    }
    if spec.url.is_empty() {
        issues.push(ManifestIssue::new(format!("{prefix}.url"), "is required"));
    } else if let Err(reason) = check_source_url(&spec.url) {
        issues.push(ManifestIssue::new(format!("{prefix}.url"), reason));
    }
    if !is_sha256_hex(&spec.sha256) {
        issues.push(ManifestIssue::new(
            format!("{prefix}.sha256"),
            "expected 64 hexadecimal characters",
        ));
    }
}

fn check_source_url(raw: &str) -> Result<(), String> {
    match Url::parse(raw) {
        Ok(url) => match url.scheme() {
            "http" | "https" | "file" => Ok(()),
            other => Err(format!("unsupported url scheme `{other}`")),
        },
        Err(url::ParseError::RelativeUrlWithoutBase) if Path::new(raw).is_absolute() => Ok(()),
        Err(err) => Err(format!("invalid url: {err}")),
    }
}

/// Usable as a single directory or file name under the prefix.
fn is_bare_component(value: &str) -> bool {
    !value.is_empty() && !value.contains(['/', '\\']) && value != "." && value != ".."
}

fn is_sha256_hex(value: &str) -> bool {
    value.len() == 64 && value.chars().all(|ch| ch.is_ascii_hexdigit())
}
