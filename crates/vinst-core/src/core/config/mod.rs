pub mod context;

use std::collections::HashMap;
use std::env;
use std::io;
use std::path::{self, Path, PathBuf};

use anyhow::{Context, Result};
use dirs_next::home_dir;
use serde::{Deserialize, Serialize};
use serde_json::json;
use vinst_domain::{canonicalize_package_name, Manifest};

use crate::outcome::InstallUserError;

pub(crate) const PREFIX_ENV: &str = "VINST_PREFIX";
pub(crate) const BIN_DIR_ENV: &str = "VINST_BIN_DIR";
pub(crate) const CACHE_DIR_ENV: &str = "VINST_CACHE_DIR";
pub(crate) const PYTHON_ENV: &str = "VINST_PYTHON";
pub(crate) const ONLINE_ENV: &str = "VINST_ONLINE";

pub(crate) const RECEIPT_NAME: &str = "INSTALL_RECEIPT.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalOptions {
    pub quiet: bool,
    pub verbose: u8,
    pub trace: bool,
    pub json: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    pub(crate) fn capture() -> Self {
        Self {
            vars: env::vars().collect(),
        }
    }

    pub(crate) fn var(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    #[cfg(test)]
    pub(crate) fn testing(pairs: &[(&str, &str)]) -> Self {
        let vars = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Self { vars }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) layout: InstallLayout,
    pub(crate) network: NetworkConfig,
    pub(crate) python_override: Option<String>,
}

impl Config {
    /// Builds a configuration snapshot from the current process environment.
    ///
    /// # Errors
    /// Returns an error if no install prefix is configured and the home
    /// directory cannot be determined.
    pub fn from_env() -> Result<Self> {
        Self::from_snapshot(&EnvSnapshot::capture())
    }

    pub(crate) fn from_snapshot(snapshot: &EnvSnapshot) -> Result<Self> {
        let prefix = match snapshot.var(PREFIX_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => home_dir()
                .ok_or_else(|| {
                    InstallUserError::new(
                        "home directory not found",
                        json!({
                            "reason": "missing_home",
                            "hint": format!("set {PREFIX_ENV} to choose an install prefix"),
                        }),
                    )
                })?
                .join(".vinst"),
        };
        let bin_dir = snapshot
            .var(BIN_DIR_ENV)
            .map_or_else(|| prefix.join("bin"), PathBuf::from);
        let cache_dir = snapshot
            .var(CACHE_DIR_ENV)
            .map_or_else(|| prefix.join("cache"), PathBuf::from);
        let layout = InstallLayout {
            prefix,
            bin_dir,
            cache_dir,
        }
        .absolute()
        .context("resolving install paths against the working directory")?;
        Ok(Self {
            layout,
            network: NetworkConfig {
                online: match snapshot.var(ONLINE_ENV) {
                    Some(value) => {
                        let lowered = value.to_ascii_lowercase();
                        !matches!(lowered.as_str(), "0" | "false" | "no" | "off")
                    }
                    None => true,
                },
            },
            python_override: snapshot.var(PYTHON_ENV).map(ToOwned::to_owned),
        })
    }

    #[must_use]
    pub fn layout(&self) -> &InstallLayout {
        &self.layout
    }

    #[must_use]
    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    #[must_use]
    pub fn python_override(&self) -> Option<&str> {
        self.python_override.as_deref()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NetworkConfig {
    pub online: bool,
}

/// Where installs, links and downloads live on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    pub prefix: PathBuf,
    pub bin_dir: PathBuf,
    pub cache_dir: PathBuf,
}

impl InstallLayout {
    pub fn new(prefix: impl Into<PathBuf>) -> Self {
        let prefix = prefix.into();
        Self {
            bin_dir: prefix.join("bin"),
            cache_dir: prefix.join("cache"),
            prefix,
        }
    }

    /// `<prefix>/cellar/<name>/<version>`
    pub fn keg_root(&self, manifest: &Manifest) -> PathBuf {
        self.prefix
            .join("cellar")
            .join(canonicalize_package_name(&manifest.name))
            .join(&manifest.version)
    }

    /// Anchors relative paths at the working directory.
    ///
    /// # Errors
    /// Returns an error when the working directory cannot be read.
    pub fn absolute(&self) -> io::Result<Self> {
        Ok(Self {
            prefix: path::absolute(&self.prefix)?,
            bin_dir: path::absolute(&self.bin_dir)?,
            cache_dir: path::absolute(&self.cache_dir)?,
        })
    }

    pub fn libexec(keg: &Path) -> PathBuf {
        keg.join("libexec")
    }

    pub fn receipt_path(keg: &Path) -> PathBuf {
        keg.join(RECEIPT_NAME)
    }

    pub fn downloads_dir(&self) -> PathBuf {
        self.cache_dir.join("downloads")
    }

    pub fn link_path(&self, name: &str) -> PathBuf {
        self.bin_dir.join(name)
    }
}

/// Directory holding the environment's executables.
pub(crate) fn env_bin_dir(libexec: &Path) -> PathBuf {
    if cfg!(windows) {
        libexec.join("Scripts")
    } else {
        libexec.join("bin")
    }
}

pub(crate) fn env_executable(libexec: &Path, name: &str) -> PathBuf {
    env_bin_dir(libexec).join(format!("{name}{}", env::consts::EXE_SUFFIX))
}
