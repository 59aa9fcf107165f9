use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::info;
use vinst_domain::SmokeTest;

use crate::effects::PythonRuntime;

#[derive(Debug, Clone, Serialize)]
pub struct SmokeReport {
    pub entry_point: PathBuf,
    pub args: Vec<String>,
    pub code: i32,
    pub passed: bool,
    /// Combined stdout and stderr of the run.
    pub output: String,
    pub expected: Option<String>,
}

/// Runs the installed entry point and checks its exit code and output.
pub fn run_smoke_test(
    python: &dyn PythonRuntime,
    entry_point: &Path,
    test: &SmokeTest,
) -> Result<SmokeReport> {
    if !entry_point.exists() {
        bail!("{} does not exist; install first", entry_point.display());
    }
    let cwd = entry_point.parent().unwrap_or_else(|| Path::new("."));
    info!(entry_point = %entry_point.display(), args = ?test.args, "running smoke test");
    let output = python
        .run_command(&entry_point.to_string_lossy(), &test.args, &[], cwd)
        .with_context(|| format!("failed to run {}", entry_point.display()))?;

    let mut combined = output.stdout.clone();
    if !output.stderr.is_empty() {
        if !combined.is_empty() && !combined.ends_with('\n') {
            combined.push('\n');
        }
        combined.push_str(&output.stderr);
    }
    let matched = test
        .expect
        .as_deref()
        .map_or(true, |needle| combined.contains(needle));
    Ok(SmokeReport {
        entry_point: entry_point.to_path_buf(),
        args: test.args.clone(),
        code: output.code,
        passed: output.success() && matched,
        output: combined,
        expected: test.expect.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::RunOutput;

    struct Canned(RunOutput);

    impl PythonRuntime for Canned {
        fn resolve_program(&self, program: &str) -> Result<PathBuf> {
            Ok(PathBuf::from(program))
        }

        fn run_command(
            &self,
            _program: &str,
            _args: &[String],
            _env: &[(String, String)],
            _cwd: &Path,
        ) -> Result<RunOutput> {
            Ok(self.0.clone())
        }
    }

    fn entry_point() -> (tempfile::TempDir, PathBuf) {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("dbt");
        std::fs::write(&path, "").expect("write entry point");
        (temp, path)
    }

    fn canned(code: i32, stdout: &str, stderr: &str) -> Canned {
        Canned(RunOutput {
            code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        })
    }

    #[test]
    fn passes_on_zero_exit_and_expected_output() -> Result<()> {
        let (_temp, path) = entry_point();
        let test = SmokeTest {
            args: vec!["--version".into()],
            expect: Some("installed".into()),
        };
        let report = run_smoke_test(&canned(0, "", "installed version: 1.0.0-rc2\n"), &path, &test)?;
        assert!(report.passed);
        assert_eq!(report.args, ["--version"]);
        Ok(())
    }

    #[test]
    fn fails_when_expected_text_is_absent() -> Result<()> {
        let (_temp, path) = entry_point();
        let test = SmokeTest {
            args: vec!["--version".into()],
            expect: Some("installed".into()),
        };
        let report = run_smoke_test(&canned(0, "1.0\n", ""), &path, &test)?;
        assert!(!report.passed);
        Ok(())
    }

    #[test]
    fn fails_on_nonzero_exit() -> Result<()> {
        let (_temp, path) = entry_point();
        let report = run_smoke_test(&canned(2, "usage", ""), &path, &SmokeTest::default())?;
        assert!(!report.passed);
        assert_eq!(report.code, 2);
        Ok(())
    }

    #[test]
    fn missing_entry_point_never_passes() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = run_smoke_test(
            &canned(0, "", ""),
            &temp.path().join("dbt"),
            &SmokeTest::default(),
        )
        .expect_err("not installed");
        assert!(err.to_string().contains("install first"));
    }
}
