//! Installation manifests: the root package, its pinned resources, and the
//! runtime/link/test settings needed to materialize them.

mod fingerprint;
mod normalize;
mod parse;
mod validate;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use fingerprint::manifest_fingerprint;
pub use normalize::{artifact_filename, canonicalize_package_name};
pub use parse::{load_manifest, parse_manifest};
pub use validate::{validate_manifest, ManifestError, ManifestIssue};

pub const DEFAULT_PYTHON: &str = "python3";
pub const DEFAULT_SMOKE_ARGS: &[&str] = &["--version"];

/// How pip is allowed to build a package.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildMode {
    /// Regular sdist install.
    #[default]
    Standard,
    /// Build from source with build isolation and PEP 517 disabled, so the
    /// package's declared build-system requirements are never fetched.
    Source,
}

impl BuildMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Source => "source",
        }
    }

    pub(crate) fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "standard" => Some(Self::Standard),
            "source" => Some(Self::Source),
            _ => None,
        }
    }
}

/// A named, hash-pinned installable artifact.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackageSpec {
    pub name: String,
    pub url: String,
    pub sha256: String,
    pub build: BuildMode,
    /// Extra environment passed only to this package's install subprocess.
    pub env: BTreeMap<String, String>,
}

impl PackageSpec {
    pub fn new(name: impl Into<String>, url: impl Into<String>, sha256: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            sha256: sha256.into(),
            build: BuildMode::Standard,
            env: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_build(mut self, build: BuildMode) -> Self {
        self.build = build;
        self
    }

    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// File name used when staging the artifact on disk.
    pub fn filename(&self) -> String {
        artifact_filename(&self.url, &self.name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeRequirements {
    /// Base interpreter used to create the environment.
    pub python: String,
    /// Executables that must be on PATH before installing.
    pub build_requires: Vec<String>,
}

impl Default for RuntimeRequirements {
    fn default() -> Self {
        Self {
            python: DEFAULT_PYTHON.to_string(),
            build_requires: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SmokeTest {
    pub args: Vec<String>,
    pub expect: Option<String>,
}

impl Default for SmokeTest {
    fn default() -> Self {
        Self {
            args: DEFAULT_SMOKE_ARGS.iter().map(ToString::to_string).collect(),
            expect: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Manifest {
    pub name: String,
    pub version: String,
    pub description: Option<String>,
    pub homepage: Option<String>,
    pub root: PackageSpec,
    pub runtime: RuntimeRequirements,
    /// Dependencies in declaration order.
    pub resources: Vec<PackageSpec>,
    /// Entry points to link; the first one is the primary entry point.
    pub links: Vec<String>,
    pub test: SmokeTest,
}

impl Manifest {
    /// Resources installed through the regular path, in manifest order.
    pub fn standard_resources(&self) -> impl Iterator<Item = &PackageSpec> {
        self.resources
            .iter()
            .filter(|spec| spec.build == BuildMode::Standard)
    }

    /// The resource that must be built from source, if any.
    pub fn source_resource(&self) -> Option<&PackageSpec> {
        self.resources
            .iter()
            .find(|spec| spec.build == BuildMode::Source)
    }

    /// Root package followed by every resource.
    pub fn artifacts(&self) -> impl Iterator<Item = &PackageSpec> {
        std::iter::once(&self.root).chain(self.resources.iter())
    }
}
