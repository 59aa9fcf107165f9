use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use super::process::{run_command, RunOutput};
use crate::store::{fetch_artifact, FetchRequest, FetchedArtifact};

/// Subprocess seam: locating executables and running them.
pub trait PythonRuntime: Send + Sync {
    /// Resolves a program name (or path) to an executable on disk.
    fn resolve_program(&self, program: &str) -> Result<PathBuf>;
    fn run_command(
        &self,
        program: &str,
        args: &[String],
        env: &[(String, String)],
        cwd: &Path,
    ) -> Result<RunOutput>;
}

/// Download seam: materializes an artifact in a directory and reports the
/// sha256 of what was actually received.
pub trait ArtifactFetcher: Send + Sync {
    fn fetch(&self, dest_dir: &Path, request: &FetchRequest<'_>) -> Result<FetchedArtifact>;
}

pub trait Effects: Send + Sync {
    fn python(&self) -> &dyn PythonRuntime;
    fn fetcher(&self) -> &dyn ArtifactFetcher;
}

pub type SharedEffects = Arc<dyn Effects>;

pub struct SystemEffects {
    python: Arc<SystemPythonRuntime>,
    fetcher: Arc<SystemArtifactFetcher>,
}

impl SystemEffects {
    #[must_use]
    pub fn new() -> Self {
        Self {
            python: Arc::new(SystemPythonRuntime),
            fetcher: Arc::new(SystemArtifactFetcher),
        }
    }
}

impl Default for SystemEffects {
    fn default() -> Self {
        Self::new()
    }
}

impl Effects for SystemEffects {
    fn python(&self) -> &dyn PythonRuntime {
        self.python.as_ref()
    }

    fn fetcher(&self) -> &dyn ArtifactFetcher {
        self.fetcher.as_ref()
    }
}

struct SystemPythonRuntime;

impl PythonRuntime for SystemPythonRuntime {
    fn resolve_program(&self, program: &str) -> Result<PathBuf> {
        let candidate = Path::new(program);
        if candidate.components().count() > 1 || candidate.is_absolute() {
            if candidate.is_file() {
                return Ok(candidate.to_path_buf());
            }
            anyhow::bail!("{} does not exist", candidate.display());
        }
        which::which(program).with_context(|| format!("`{program}` not found on PATH"))
    }

    fn run_command(
        &self,
        program: &str,
        args: &[String],
        env: &[(String, String)],
        cwd: &Path,
    ) -> Result<RunOutput> {
        run_command(program, args, env, cwd)
    }
}

struct SystemArtifactFetcher;

impl ArtifactFetcher for SystemArtifactFetcher {
    fn fetch(&self, dest_dir: &Path, request: &FetchRequest<'_>) -> Result<FetchedArtifact> {
        fetch_artifact(dest_dir, request)
    }
}
