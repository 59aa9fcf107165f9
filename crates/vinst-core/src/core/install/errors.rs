use std::path::PathBuf;

use serde_json::{json, Value};

use super::state::InstallPhase;

/// Every way an install run can abort. All of them are fatal.
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    #[error("required build tool `{tool}` not found on PATH")]
    MissingBuildTool { tool: String },
    #[error("{} already exists and does not hold this install", .path.display())]
    KegOccupied { path: PathBuf },
    #[error("failed to create environment at {}: {reason}", .path.display())]
    EnvironmentCreation { path: PathBuf, reason: String },
    #[error("failed to upgrade pip in the environment: {reason}")]
    ToolUpgrade { reason: String },
    #[error("failed to fetch {name} from {url}: {reason}")]
    Fetch {
        name: String,
        url: String,
        reason: String,
    },
    #[error("sha256 mismatch for {name}: expected {expected}, got {actual}")]
    Integrity {
        name: String,
        expected: String,
        actual: String,
    },
    #[error("failed to install dependency {name}: {reason}")]
    DependencyInstall { name: String, reason: String },
    #[error("failed to install {name}: {reason}")]
    RootInstall { name: String, reason: String },
    #[error("failed to link {}: {reason}", .path.display())]
    Link { path: PathBuf, reason: String },
    #[error("failed to write install receipt {}: {reason}", .path.display())]
    Receipt { path: PathBuf, reason: String },
    #[error("install state cannot move from {from} to {to}")]
    InvalidTransition { from: InstallPhase, to: InstallPhase },
}

impl InstallError {
    /// Stable identifier used in JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingBuildTool { .. } => "missing_build_tool",
            Self::KegOccupied { .. } => "keg_occupied",
            Self::EnvironmentCreation { .. } => "environment_creation",
            Self::ToolUpgrade { .. } => "tool_upgrade",
            Self::Fetch { .. } => "fetch",
            Self::Integrity { .. } => "integrity",
            Self::DependencyInstall { .. } => "dependency_install",
            Self::RootInstall { .. } => "root_install",
            Self::Link { .. } => "link",
            Self::Receipt { .. } => "receipt",
            Self::InvalidTransition { .. } => "invalid_transition",
        }
    }

    /// Whether the user can fix this without a code change.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::MissingBuildTool { .. } | Self::KegOccupied { .. } | Self::Integrity { .. }
        )
    }

    /// Package the error is about, when there is one.
    pub fn package(&self) -> Option<&str> {
        match self {
            Self::Fetch { name, .. }
            | Self::Integrity { name, .. }
            | Self::DependencyInstall { name, .. }
            | Self::RootInstall { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn hint(&self) -> Option<String> {
        match self {
            Self::MissingBuildTool { tool } => {
                Some(format!("install `{tool}` and make sure it is on PATH"))
            }
            Self::KegOccupied { path } => Some(format!(
                "remove {} and re-run the install",
                path.display()
            )),
            Self::Integrity { .. } => {
                Some("the artifact changed upstream or was corrupted in transit".to_string())
            }
            Self::EnvironmentCreation { .. } => {
                Some("set VINST_PYTHON to a working python3 interpreter".to_string())
            }
            _ => None,
        }
    }

    /// JSON details for command output; `phase` is where an install aborted.
    pub fn details(&self, phase: Option<InstallPhase>) -> Value {
        let mut details = json!({ "reason": self.kind() });
        if let Some(phase) = phase {
            details["phase"] = json!(phase.as_str());
        }
        if let Some(package) = self.package() {
            details["package"] = json!(package);
        }
        if let Self::Integrity {
            expected, actual, ..
        } = self
        {
            details["expected"] = json!(expected);
            details["actual"] = json!(actual);
        }
        if let Some(hint) = self.hint() {
            details["hint"] = json!(hint);
        }
        details
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integrity_details_name_the_package() {
        let err = InstallError::Integrity {
            name: "idna".into(),
            expected: "aa".into(),
            actual: "bb".into(),
        };
        assert!(err.is_user_error());
        assert_eq!(err.to_string(), "sha256 mismatch for idna: expected aa, got bb");
        let details = err.details(Some(InstallPhase::EnvironmentReady));
        assert_eq!(details["reason"], "integrity");
        assert_eq!(details["package"], "idna");
        assert_eq!(details["phase"], "environment-ready");
        assert_eq!(details["actual"], "bb");
    }

    #[test]
    fn subprocess_failures_are_not_user_errors() {
        let err = InstallError::DependencyInstall {
            name: "cffi".into(),
            reason: "exit code 1".into(),
        };
        assert!(!err.is_user_error());
        assert_eq!(err.package(), Some("cffi"));
        let details = err.details(None);
        assert!(details.get("hint").is_none());
        assert!(details.get("phase").is_none());
    }
}
