use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use vinst_domain::{BuildMode, PackageSpec};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PackageRole {
    Dependency,
    Root,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledPackage {
    pub name: String,
    pub sha256: String,
    pub build: BuildMode,
    pub role: PackageRole,
}

impl InstalledPackage {
    pub(crate) fn from_spec(spec: &PackageSpec, role: PackageRole) -> Self {
        Self {
            name: spec.name.clone(),
            sha256: spec.sha256.clone(),
            build: spec.build,
            role,
        }
    }
}

/// Record of a completed install, stored next to the environment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallReceipt {
    pub name: String,
    pub version: String,
    pub fingerprint: String,
    pub python: String,
    pub packages: Vec<InstalledPackage>,
    /// Linked entry point names; the first is the primary one.
    pub links: Vec<String>,
    pub entry_point: PathBuf,
    pub installed_at: String,
}

impl InstallReceipt {
    pub(crate) fn write(&self, path: &Path) -> Result<()> {
        let mut json = serde_json::to_vec_pretty(self)?;
        json.push(b'\n');
        fs::write(path, json).with_context(|| format!("writing {}", path.display()))
    }

    /// Reads a receipt, returning `None` when none has been written.
    pub(crate) fn read(path: &Path) -> Result<Option<Self>> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err).with_context(|| format!("reading {}", path.display()));
            }
        };
        let receipt = serde_json::from_str(&contents)
            .with_context(|| format!("invalid install receipt {}", path.display()))?;
        Ok(Some(receipt))
    }
}

pub(crate) fn timestamp_string() -> Result<String> {
    let now = OffsetDateTime::now_utc();
    Ok(now.format(&time::format_description::well_known::Rfc3339)?)
}
