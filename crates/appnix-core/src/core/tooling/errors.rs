use std::path::PathBuf;

use serde_json::json;

use crate::core::build::BuildPhase;
use crate::core::tooling::outcome::ExecutionOutcome;

/// Failures the CLI distinguishes when choosing an exit status and hint.
#[derive(Debug, thiserror::Error)]
pub enum AppnixError {
    #[error("{message}")]
    ConfigInvalid { message: String, hint: String },
    #[error("failed to set up the AppImage runtime: {reason}")]
    RuntimeProvisioningFailed { reason: String, remediation: String },
    #[error("App \"{name}\" not found in config. Available: {}", .available.join(", "))]
    AppNotFound {
        name: String,
        available: Vec<String>,
    },
    #[error("{phase} failed for {app}")]
    BuildStepFailed {
        app: String,
        phase: BuildPhase,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
    #[error("AppImage not found in build output for {app} ({})", .dir.display())]
    ArtifactNotFound { app: String, dir: PathBuf },
    #[error("expected one AppImage for {app} but the build produced {}", .found.len())]
    ArtifactAmbiguous { app: String, found: Vec<PathBuf> },
}

impl AppnixError {
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            AppnixError::ConfigInvalid { .. } => "config_invalid",
            AppnixError::RuntimeProvisioningFailed { .. } => "runtime_provisioning_failed",
            AppnixError::AppNotFound { .. } => "app_not_found",
            AppnixError::BuildStepFailed { .. } => "build_step_failed",
            AppnixError::ArtifactNotFound { .. } => "artifact_not_found",
            AppnixError::ArtifactAmbiguous { .. } => "artifact_ambiguous",
        }
    }

    #[must_use]
    pub fn hint(&self) -> String {
        match self {
            AppnixError::ConfigInvalid { hint, .. } => hint.clone(),
            AppnixError::RuntimeProvisioningFailed { remediation, .. } => remediation.clone(),
            AppnixError::AppNotFound { .. } => {
                "check the app_name entries in config.yml (matching ignores case)".to_string()
            }
            AppnixError::BuildStepFailed { .. } => {
                "re-run with -v to see the external tool output".to_string()
            }
            AppnixError::ArtifactNotFound { .. } => {
                "electron-builder reported success but wrote no .AppImage; check its output above"
                    .to_string()
            }
            AppnixError::ArtifactAmbiguous { .. } => {
                "remove stale files from the staging output directory and rebuild".to_string()
            }
        }
    }

    fn is_user_error(&self) -> bool {
        matches!(
            self,
            AppnixError::ConfigInvalid { .. } | AppnixError::AppNotFound { .. }
        )
    }
}

/// Converts a command error into the outcome shown to the user.
#[must_use]
pub fn error_outcome(err: &anyhow::Error) -> ExecutionOutcome {
    let issues: Vec<String> = err.chain().map(ToString::to_string).collect();
    if let Some(known) = err.downcast_ref::<AppnixError>() {
        let mut details = json!({
            "reason": known.reason(),
            "hint": known.hint(),
            "issues": issues,
        });
        match known {
            AppnixError::AppNotFound { available, .. } => {
                details["available"] = json!(available);
            }
            AppnixError::BuildStepFailed { app, phase, .. } => {
                details["app"] = json!(app);
                details["phase"] = json!(phase.to_string());
            }
            AppnixError::ArtifactAmbiguous { found, .. } => {
                details["found"] = json!(found);
            }
            _ => {}
        }
        return if known.is_user_error() {
            ExecutionOutcome::user_error(known.to_string(), details)
        } else {
            ExecutionOutcome::failure(known.to_string(), details)
        };
    }
    ExecutionOutcome::failure(
        err.to_string(),
        json!({
            "reason": "internal_error",
            "issues": issues,
            "hint": "re-run with -v for more detail",
        }),
    )
}
