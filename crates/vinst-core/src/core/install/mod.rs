//! The install routine: environment, pinned dependencies, the root package,
//! entry point links and the receipt, in that order. Every failure is fatal
//! and nothing already installed is rolled back.

mod errors;
mod link;
mod pip;
mod receipt;
mod state;


use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};
use vinst_domain::{manifest_fingerprint, Manifest, PackageSpec};

use crate::config::context::CommandContext;
use crate::config::{env_bin_dir, env_executable, InstallLayout};
use crate::effects::{ArtifactFetcher, Effects, PythonRuntime};
use crate::store::{FetchRequest, FetchedArtifact};

pub use errors::InstallError;
pub use receipt::{InstallReceipt, InstalledPackage, PackageRole};
pub use state::{InstallPhase, InstallState};

use link::link_points_to;

#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    pub name: String,
    pub version: String,
    pub keg: PathBuf,
    /// Link to the primary entry point.
    pub entry_point: PathBuf,
    pub links: Vec<PathBuf>,
    pub packages: Vec<InstalledPackage>,
    /// True when a matching earlier install was found and nothing was done.
    pub reused: bool,
}

impl InstallReport {
    pub fn dependency_count(&self) -> usize {
        self.packages
            .iter()
            .filter(|pkg| pkg.role == PackageRole::Dependency)
            .count()
    }

    fn from_receipt(receipt: InstallReceipt, keg: PathBuf, layout: &InstallLayout) -> Self {
        Self {
            links: receipt
                .links
                .iter()
                .map(|name| layout.link_path(name))
                .collect(),
            name: receipt.name,
            version: receipt.version,
            keg,
            entry_point: receipt.entry_point,
            packages: receipt.packages,
            reused: true,
        }
    }
}

pub struct Installer<'a> {
    effects: &'a dyn Effects,
    layout: InstallLayout,
    online: bool,
    python_override: Option<&'a str>,
    state: InstallState,
}

impl<'a> Installer<'a> {
    pub fn new(effects: &'a dyn Effects, layout: &InstallLayout) -> Self {
        Self {
            effects,
            layout: layout.clone(),
            online: true,
            python_override: None,
            state: InstallState::default(),
        }
    }

    pub fn from_context(ctx: &'a CommandContext<'_>) -> Self {
        Self::new(ctx.effects(), ctx.layout())
            .online(ctx.is_online())
            .python_override(ctx.config().python_override())
    }

    #[must_use]
    pub fn online(mut self, online: bool) -> Self {
        self.online = online;
        self
    }

    /// Uses `python` instead of the manifest's base interpreter.
    #[must_use]
    pub fn python_override(mut self, python: Option<&'a str>) -> Self {
        self.python_override = python;
        self
    }

    pub fn state(&self) -> &InstallState {
        &self.state
    }

    /// Installs `manifest` into its keg under the configured prefix.
    ///
    /// On failure the installer's state records the phase the run aborted in.
    pub fn install(&mut self, manifest: &Manifest) -> Result<InstallReport, InstallError> {
        match self.run(manifest) {
            Ok(report) => Ok(report),
            Err(err) => {
                self.state.fail(err.to_string());
                Err(err)
            }
        }
    }

    fn python(&self) -> &dyn PythonRuntime {
        self.effects.python()
    }

    fn run(&mut self, manifest: &Manifest) -> Result<InstallReport, InstallError> {
        self.layout = self
            .layout
            .absolute()
            .map_err(|err| InstallError::EnvironmentCreation {
                path: self.layout.prefix.clone(),
                reason: format!("resolving install prefix: {err}"),
            })?;
        let keg = self.layout.keg_root(manifest);
        let libexec = InstallLayout::libexec(&keg);
        let receipt_path = InstallLayout::receipt_path(&keg);
        let fingerprint = manifest_fingerprint(manifest);

        if keg.exists() {
            return match self.existing_install(&keg, &receipt_path, &fingerprint) {
                Some(receipt) => {
                    info!(name = %manifest.name, keg = %keg.display(), "already installed");
                    self.state.advance(InstallPhase::Done)?;
                    Ok(InstallReport::from_receipt(receipt, keg, &self.layout))
                }
                None => Err(InstallError::KegOccupied { path: keg }),
            };
        }

        for tool in &manifest.runtime.build_requires {
            if self.python().resolve_program(tool).is_err() {
                return Err(InstallError::MissingBuildTool { tool: tool.clone() });
            }
        }

        let python = self
            .python_override
            .unwrap_or(manifest.runtime.python.as_str());
        self.create_environment(python, &keg, &libexec)?;
        let pip = env_executable(&libexec, "pip");
        self.upgrade_pip(&pip, &keg)?;
        self.state.advance(InstallPhase::EnvironmentReady)?;

        let mut packages = Vec::with_capacity(manifest.resources.len() + 1);
        let special = manifest.source_resource();
        for spec in manifest.standard_resources().chain(special) {
            self.install_package(spec, PackageRole::Dependency, &pip, &keg)?;
            packages.push(InstalledPackage::from_spec(spec, PackageRole::Dependency));
        }
        self.state.advance(InstallPhase::DependenciesInstalled)?;

        let scripts_dir = env_bin_dir(&libexec);
        let before = link::scan_scripts(&scripts_dir).map_err(|err| InstallError::RootInstall {
            name: manifest.root.name.clone(),
            reason: err.to_string(),
        })?;
        self.install_package(&manifest.root, PackageRole::Root, &pip, &keg)?;
        packages.push(InstalledPackage::from_spec(&manifest.root, PackageRole::Root));
        let after = link::scan_scripts(&scripts_dir).map_err(|err| InstallError::RootInstall {
            name: manifest.root.name.clone(),
            reason: err.to_string(),
        })?;
        self.state.advance(InstallPhase::RootInstalled)?;

        let (names, links) = self.link_entry_points(manifest, &libexec, &before, &after)?;
        self.state.advance(InstallPhase::Linked)?;

        let entry_point = links[0].clone();
        let receipt = InstallReceipt {
            name: manifest.name.clone(),
            version: manifest.version.clone(),
            fingerprint,
            python: python.to_string(),
            packages,
            links: names,
            entry_point,
            installed_at: receipt::timestamp_string().map_err(|err| InstallError::Receipt {
                path: receipt_path.clone(),
                reason: err.to_string(),
            })?,
        };
        receipt
            .write(&receipt_path)
            .map_err(|err| InstallError::Receipt {
                path: receipt_path.clone(),
                reason: format!("{err:#}"),
            })?;
        self.state.advance(InstallPhase::Done)?;
        info!(
            name = %manifest.name,
            version = %manifest.version,
            packages = receipt.packages.len(),
            "install complete"
        );

        Ok(InstallReport {
            name: receipt.name,
            version: receipt.version,
            keg,
            entry_point: receipt.entry_point,
            links,
            packages: receipt.packages,
            reused: false,
        })
    }

    /// A receipt for the same manifest whose links are all still in place.
    fn existing_install(
        &self,
        keg: &Path,
        receipt_path: &Path,
        fingerprint: &str,
    ) -> Option<InstallReceipt> {
        let receipt = match InstallReceipt::read(receipt_path) {
            Ok(Some(receipt)) => receipt,
            Ok(None) => return None,
            Err(err) => {
                debug!(error = %format!("{err:#}"), "ignoring unreadable receipt");
                return None;
            }
        };
        if receipt.fingerprint != fingerprint || receipt.links.is_empty() {
            return None;
        }
        let scripts_dir = env_bin_dir(&InstallLayout::libexec(keg));
        let intact = receipt.links.iter().all(|name| {
            link_points_to(&self.layout.link_path(name), &scripts_dir.join(name))
        });
        intact.then_some(receipt)
    }

    fn create_environment(&self, python: &str, keg: &Path, libexec: &Path) -> Result<(), InstallError> {
        let env_error = |reason: String| InstallError::EnvironmentCreation {
            path: libexec.to_path_buf(),
            reason,
        };
        let interpreter = self
            .python()
            .resolve_program(python)
            .map_err(|err| env_error(format!("{err:#}")))?;
        fs::create_dir_all(keg).map_err(|err| env_error(err.to_string()))?;
        info!(python = %interpreter.display(), env = %libexec.display(), "creating environment");
        let output = self
            .python()
            .run_command(
                &interpreter.to_string_lossy(),
                &pip::venv_args(libexec),
                &[],
                keg,
            )
            .map_err(|err| env_error(format!("{err:#}")))?;
        if !output.success() {
            return Err(env_error(output.failure_summary()));
        }
        Ok(())
    }

    fn upgrade_pip(&self, pip: &Path, cwd: &Path) -> Result<(), InstallError> {
        info!("upgrading pip");
        let output = self
            .python()
            .run_command(&pip.to_string_lossy(), &pip::upgrade_pip_args(), &[], cwd)
            .map_err(|err| InstallError::ToolUpgrade {
                reason: format!("{err:#}"),
            })?;
        if !output.success() {
            return Err(InstallError::ToolUpgrade {
                reason: output.failure_summary(),
            });
        }
        Ok(())
    }

    fn install_package(
        &self,
        spec: &PackageSpec,
        role: PackageRole,
        pip: &Path,
        cwd: &Path,
    ) -> Result<(), InstallError> {
        let install_error = |reason: String| match role {
            PackageRole::Dependency => InstallError::DependencyInstall {
                name: spec.name.clone(),
                reason,
            },
            PackageRole::Root => InstallError::RootInstall {
                name: spec.name.clone(),
                reason,
            },
        };
        let artifact = fetch_verified(
            self.effects.fetcher(),
            &self.layout.downloads_dir(),
            spec,
            self.online,
        )?;
        info!(name = %spec.name, build = spec.build.as_str(), "installing");
        let output = self
            .python()
            .run_command(
                &pip.to_string_lossy(),
                &pip::install_args(spec, &artifact.path),
                &pip::install_env(spec),
                cwd,
            )
            .map_err(|err| install_error(format!("{err:#}")))?;
        if !output.success() {
            return Err(install_error(output.failure_summary()));
        }
        debug!(name = %spec.name, stdout = %output.stdout.trim_end(), "pip output");
        Ok(())
    }

    fn link_entry_points(
        &self,
        manifest: &Manifest,
        libexec: &Path,
        before: &BTreeSet<String>,
        after: &BTreeSet<String>,
    ) -> Result<(Vec<String>, Vec<PathBuf>), InstallError> {
        let names: Vec<String> = if manifest.links.is_empty() {
            after.difference(before).cloned().collect()
        } else {
            manifest.links.clone()
        };
        if names.is_empty() {
            return Err(InstallError::Link {
                path: self.layout.bin_dir.clone(),
                reason: format!("{} installed no console scripts", manifest.root.name),
            });
        }
        let scripts_dir = env_bin_dir(libexec);
        let mut links = Vec::with_capacity(names.len());
        for name in &names {
            let dest = self.layout.link_path(name);
            link::link_entry_point(&scripts_dir.join(name), &dest)?;
            info!(link = %dest.display(), "linked entry point");
            links.push(dest);
        }
        Ok((names, links))
    }
}

/// Fetches `spec` into the download cache and checks its sha256.
pub(crate) fn fetch_verified(
    fetcher: &dyn ArtifactFetcher,
    downloads: &Path,
    spec: &PackageSpec,
    online: bool,
) -> Result<FetchedArtifact, InstallError> {
    let filename = spec.filename();
    let request = FetchRequest {
        name: &spec.name,
        url: &spec.url,
        filename: &filename,
        sha256: &spec.sha256,
        online,
    };
    let fetched = fetcher
        .fetch(downloads, &request)
        .map_err(|err| InstallError::Fetch {
            name: spec.name.clone(),
            url: spec.url.clone(),
            reason: format!("{err:#}"),
        })?;
    if fetched.sha256 != spec.sha256 {
        return Err(InstallError::Integrity {
            name: spec.name.clone(),
            expected: spec.sha256.clone(),
            actual: fetched.sha256,
        });
    }
    Ok(fetched)
}
