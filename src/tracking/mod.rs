//! Tracking service client contract
//!
//! Everything this crate does is a sequence of calls through
//! [`TrackingClient`]. Two backends are provided:
//! - [`RestTrackingClient`]: blocking client for an MLflow tracking server
//! - [`MemoryTrackingClient`]: in-process backend with the same semantics
//!
//! # Example
//!
//! ```rust
//! use mlflow_wrapper::experiment::ViewType;
//! use mlflow_wrapper::tracking::{MemoryTrackingClient, TrackingClient};
//!
//! # fn example() -> mlflow_wrapper::Result<()> {
//! let client = MemoryTrackingClient::new();
//! let experiment_id = client.create_experiment("demo")?;
//! let run = client.create_run(&experiment_id, "baseline", None)?;
//!
//! let infos = client.list_run_infos(&experiment_id, ViewType::ActiveOnly)?;
//! assert_eq!(infos[0].run_id(), run.run_id());
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

mod memory;
mod rest;

pub use memory::MemoryTrackingClient;
pub use rest::RestTrackingClient;

use std::path::{Component, Path, PathBuf};

use crate::experiment::{ArtifactRecord, ExperimentRecord, RunInfo, RunRecord, RunStatus, ViewType};
use crate::Result;

/// Operations consumed from the experiment-tracking service.
///
/// Calls are synchronous and blocking. Errors raised by the service are
/// returned unchanged; implementations never retry.
pub trait TrackingClient {
    /// List experiments in the given view, in the service's order.
    fn list_experiments(&self, view: ViewType) -> Result<Vec<ExperimentRecord>>;

    /// Create an experiment and return its id.
    fn create_experiment(&self, name: &str) -> Result<String>;

    /// Set a tag on an experiment.
    fn set_experiment_tag(&self, experiment_id: &str, key: &str, value: &str) -> Result<()>;

    /// List run summaries of an experiment, oldest first.
    fn list_run_infos(&self, experiment_id: &str, view: ViewType) -> Result<Vec<RunInfo>>;

    /// Fetch the full run.
    fn get_run(&self, run_id: &str) -> Result<RunRecord>;

    /// Soft-delete a run.
    fn delete_run(&self, run_id: &str) -> Result<()>;

    /// Start a run, optionally nested under `parent_run_id`.
    fn create_run(
        &self,
        experiment_id: &str,
        run_name: &str,
        parent_run_id: Option<&str>,
    ) -> Result<RunRecord>;

    /// Terminate a run with the given final status.
    fn set_terminated(&self, run_id: &str, status: RunStatus) -> Result<()>;

    /// Log a metric value at a step.
    fn log_metric(&self, run_id: &str, key: &str, value: f64, step: i64) -> Result<()>;

    /// Set a tag on a run.
    fn set_tag(&self, run_id: &str, key: &str, value: &str) -> Result<()>;

    /// List the direct children of an artifact directory (`""` for the root).
    fn list_artifacts(&self, run_id: &str, path: &str) -> Result<Vec<ArtifactRecord>>;

    /// Download the artifact at `path` (`""` for the whole tree) into `dst`.
    ///
    /// Returns the local path of the downloaded artifact.
    fn download_artifacts(&self, run_id: &str, path: &str, dst: &Path) -> Result<PathBuf>;

    /// Upload a local file into `artifact_path` (root when `None`).
    fn log_artifact(&self, run_id: &str, local_path: &Path, artifact_path: Option<&str>)
        -> Result<()>;
}

/// Resolve a `/`-separated artifact path below a local directory.
///
/// Parent, root and prefix components are rejected so the result never
/// leaves `dst`.
pub(crate) fn local_artifact_path(dst: &Path, artifact_path: &str) -> Result<PathBuf> {
    let mut path = dst.to_path_buf();
    for segment in artifact_path.split('/').filter(|segment| !segment.is_empty()) {
        for component in Path::new(segment).components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(crate::Error::InvalidArgument(format!(
                        "Artifact path '{artifact_path}' escapes the download directory"
                    )));
                }
            }
        }
    }
    Ok(path)
}

/// File name component of a local path, as an artifact path segment.
pub(crate) fn artifact_file_name(local_path: &Path) -> Result<String> {
    local_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            crate::Error::InvalidArgument(format!(
                "'{}' does not name a file",
                local_path.display()
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_artifact_path() {
        let dst = Path::new("downloads");
        assert_eq!(
            local_artifact_path(dst, "reports/summary.csv").unwrap(),
            dst.join("reports").join("summary.csv")
        );
        assert_eq!(local_artifact_path(dst, "").unwrap(), dst.to_path_buf());
        assert_eq!(
            local_artifact_path(dst, "./reports//a.csv").unwrap(),
            dst.join("reports").join("a.csv")
        );
    }

    #[test]
    fn test_local_artifact_path_stays_below_destination() {
        let dst = Path::new("downloads");
        for escaping in ["../escaped.csv", "reports/../../escaped.csv", ".."] {
            let err = local_artifact_path(dst, escaping).unwrap_err();
            assert!(matches!(err, crate::Error::InvalidArgument(_)), "{escaping}");
        }
    }

    #[test]
    fn test_artifact_file_name() {
        let name = artifact_file_name(Path::new("data/Test Upload.csv")).unwrap();
        assert_eq!(name, "Test Upload.csv");
        assert!(artifact_file_name(Path::new("/")).is_err());
    }
}
