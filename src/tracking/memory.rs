//! In-memory tracking backend using `DashMap`.
//!
//! Mirrors the tracking server closely enough to run every resolver and
//! transfer operation without a network: sequential ids, creation-ordered
//! listings, soft delete, and artifacts held as bytes. Data is lost on drop.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use dashmap::DashMap;

use super::{artifact_file_name, local_artifact_path, TrackingClient};
use crate::experiment::{
    join_artifact_path, ArtifactRecord, ExperimentRecord, LifecycleStage, MetricRecord, RunInfo,
    RunRecord, RunStatus, ViewType,
};
use crate::{Error, Result};

/// Name of the experiment every fresh backend starts with.
pub const DEFAULT_EXPERIMENT_NAME: &str = "Default";

/// In-memory tracking backend.
///
/// Shared by `&` between resolvers and upload handlers; uses `DashMap`
/// internally so no outer lock is needed.
///
/// # Example
///
/// ```rust
/// use mlflow_wrapper::tracking::{MemoryTrackingClient, TrackingClient};
///
/// # fn example() -> mlflow_wrapper::Result<()> {
/// let client = MemoryTrackingClient::new();
/// let id = client.create_experiment("demo")?;
/// assert_eq!(client.experiment_count(), 2); // "Default" + "demo"
/// # let _ = id;
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```
pub struct MemoryTrackingClient {
    experiments: DashMap<String, ExperimentRecord>,
    runs: DashMap<String, RunRecord>,
    /// run id -> (artifact path -> bytes)
    artifacts: DashMap<String, BTreeMap<String, Vec<u8>>>,
    next_experiment_id: AtomicU64,
    next_run_seq: AtomicU64,
}

impl MemoryTrackingClient {
    /// Create a backend holding only the `Default` experiment (id `0`).
    #[must_use]
    pub fn new() -> Self {
        let client = Self {
            experiments: DashMap::new(),
            runs: DashMap::new(),
            artifacts: DashMap::new(),
            next_experiment_id: AtomicU64::new(0),
            next_run_seq: AtomicU64::new(0),
        };
        client.insert_experiment(DEFAULT_EXPERIMENT_NAME);
        client
    }

    /// Get the number of experiments, deleted ones included.
    #[must_use]
    pub fn experiment_count(&self) -> usize {
        self.experiments.len()
    }

    /// Get the number of runs, deleted ones included.
    #[must_use]
    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    /// Get an experiment by ID.
    #[must_use]
    pub fn experiment(&self, experiment_id: &str) -> Option<ExperimentRecord> {
        self.experiments.get(experiment_id).map(|e| e.value().clone())
    }

    /// Get all stored artifact paths of a run, sorted.
    #[must_use]
    pub fn artifact_paths(&self, run_id: &str) -> Vec<String> {
        self.artifacts
            .get(run_id)
            .map(|files| files.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Store an artifact from bytes, bypassing the local filesystem.
    ///
    /// # Errors
    ///
    /// Returns a `RESOURCE_DOES_NOT_EXIST` service error for an unknown run
    pub fn put_artifact(&self, run_id: &str, artifact_path: &str, bytes: Vec<u8>) -> Result<()> {
        self.ensure_run(run_id)?;
        self.artifacts
            .entry(run_id.to_string())
            .or_default()
            .insert(artifact_path.trim_matches('/').to_string(), bytes);
        Ok(())
    }

    /// Store a metric exactly as given, raw value included.
    ///
    /// # Errors
    ///
    /// Returns a `RESOURCE_DOES_NOT_EXIST` service error for an unknown run
    pub fn put_metric(&self, run_id: &str, metric: MetricRecord) -> Result<()> {
        self.with_run_mut(run_id, |run| run.log_metric(metric))
    }

    /// Soft-delete an experiment. Its name stays reserved.
    ///
    /// # Errors
    ///
    /// Returns a `RESOURCE_DOES_NOT_EXIST` service error for an unknown experiment
    pub fn delete_experiment(&self, experiment_id: &str) -> Result<()> {
        let mut experiment = self.experiments.get_mut(experiment_id).ok_or_else(|| {
            Error::resource_missing(format!("Experiment '{experiment_id}' not found"))
        })?;
        experiment.set_lifecycle_stage(LifecycleStage::Deleted);
        Ok(())
    }

    fn insert_experiment(&self, name: &str) -> String {
        let id = self
            .next_experiment_id
            .fetch_add(1, Ordering::SeqCst)
            .to_string();
        let record = ExperimentRecord::builder(id.clone(), name)
            .artifact_location(format!("mlflow-artifacts:/{id}"))
            .build();
        self.experiments.insert(id.clone(), record);
        id
    }

    fn ensure_run(&self, run_id: &str) -> Result<()> {
        if self.runs.contains_key(run_id) {
            Ok(())
        } else {
            Err(Error::resource_missing(format!("Run '{run_id}' not found")))
        }
    }

    fn with_run_mut<T>(&self, run_id: &str, f: impl FnOnce(&mut RunRecord) -> T) -> Result<T> {
        let mut run = self
            .runs
            .get_mut(run_id)
            .ok_or_else(|| Error::resource_missing(format!("Run '{run_id}' not found")))?;
        Ok(f(run.value_mut()))
    }
}

impl Default for MemoryTrackingClient {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackingClient for MemoryTrackingClient {
    fn list_experiments(&self, view: ViewType) -> Result<Vec<ExperimentRecord>> {
        let mut experiments: Vec<ExperimentRecord> = self
            .experiments
            .iter()
            .filter(|e| view.includes(e.lifecycle_stage()))
            .map(|e| e.value().clone())
            .collect();

        // Ids are sequential integers
        experiments.sort_by_key(|e| e.experiment_id().parse::<u64>().unwrap_or(u64::MAX));
        Ok(experiments)
    }

    fn create_experiment(&self, name: &str) -> Result<String> {
        // Deleted experiments keep their name reserved
        let taken = self.experiments.iter().any(|e| e.name() == name);
        if taken {
            return Err(Error::Service {
                status: 400,
                error_code: "RESOURCE_ALREADY_EXISTS".to_string(),
                message: format!("Experiment '{name}' already exists"),
            });
        }
        Ok(self.insert_experiment(name))
    }

    fn set_experiment_tag(&self, experiment_id: &str, key: &str, value: &str) -> Result<()> {
        let mut experiment = self.experiments.get_mut(experiment_id).ok_or_else(|| {
            Error::resource_missing(format!("Experiment '{experiment_id}' not found"))
        })?;
        experiment.set_tag(key, value);
        Ok(())
    }

    fn list_run_infos(&self, experiment_id: &str, view: ViewType) -> Result<Vec<RunInfo>> {
        if !self.experiments.contains_key(experiment_id) {
            return Err(Error::resource_missing(format!(
                "Experiment '{experiment_id}' not found"
            )));
        }

        let mut infos: Vec<RunInfo> = self
            .runs
            .iter()
            .filter(|r| r.experiment_id() == experiment_id && view.includes(r.lifecycle_stage()))
            .map(|r| r.info())
            .collect();

        // Run ids are zero-padded creation sequence numbers
        infos.sort_by(|a, b| a.run_id().cmp(b.run_id()));
        Ok(infos)
    }

    fn get_run(&self, run_id: &str) -> Result<RunRecord> {
        self.runs
            .get(run_id)
            .map(|r| r.value().clone())
            .ok_or_else(|| Error::resource_missing(format!("Run '{run_id}' not found")))
    }

    fn delete_run(&self, run_id: &str) -> Result<()> {
        self.with_run_mut(run_id, |run| run.set_lifecycle_stage(LifecycleStage::Deleted))
    }

    fn create_run(
        &self,
        experiment_id: &str,
        run_name: &str,
        parent_run_id: Option<&str>,
    ) -> Result<RunRecord> {
        if !self.experiments.contains_key(experiment_id) {
            return Err(Error::resource_missing(format!(
                "Experiment '{experiment_id}' not found"
            )));
        }

        let seq = self.next_run_seq.fetch_add(1, Ordering::SeqCst);
        let run_id = format!("{seq:032x}");
        let mut builder = RunRecord::builder(run_id.clone(), experiment_id)
            .name(run_name)
            .start_time(Utc::now())
            .artifact_uri(format!("mlflow-artifacts:/{experiment_id}/{run_id}/artifacts"));
        if let Some(parent) = parent_run_id {
            builder = builder.parent_run_id(parent);
        }

        let run = builder.build();
        self.runs.insert(run_id, run.clone());
        Ok(run)
    }

    fn set_terminated(&self, run_id: &str, status: RunStatus) -> Result<()> {
        self.with_run_mut(run_id, |run| run.terminate(status, Utc::now()))
    }

    fn log_metric(&self, run_id: &str, key: &str, value: f64, step: i64) -> Result<()> {
        self.with_run_mut(run_id, |run| run.log_metric(MetricRecord::new(key, value, step)))
    }

    fn set_tag(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
        self.with_run_mut(run_id, |run| run.set_tag(key, value))
    }

    fn list_artifacts(&self, run_id: &str, path: &str) -> Result<Vec<ArtifactRecord>> {
        self.ensure_run(run_id)?;
        let Some(files) = self.artifacts.get(run_id) else {
            return Ok(Vec::new());
        };

        let dir = path.trim_matches('/');
        let prefix = if dir.is_empty() {
            String::new()
        } else {
            format!("{dir}/")
        };

        let mut entries: BTreeMap<String, ArtifactRecord> = BTreeMap::new();
        for (file_path, bytes) in files.iter() {
            let Some(rest) = file_path.strip_prefix(&prefix) else {
                continue;
            };
            match rest.split_once('/') {
                Some((child_dir, _)) => {
                    let child = join_artifact_path(dir, child_dir);
                    entries.insert(child.clone(), ArtifactRecord::dir(child));
                }
                None => {
                    entries.insert(
                        file_path.clone(),
                        ArtifactRecord::file(file_path.clone(), bytes.len() as u64),
                    );
                }
            }
        }

        Ok(entries.into_values().collect())
    }

    fn download_artifacts(&self, run_id: &str, path: &str, dst: &Path) -> Result<PathBuf> {
        self.ensure_run(run_id)?;
        let wanted = path.trim_matches('/');
        let local = local_artifact_path(dst, wanted)?;
        let prefix = format!("{wanted}/");

        let selected: Vec<(String, Vec<u8>)> = self
            .artifacts
            .get(run_id)
            .map(|files| {
                files
                    .iter()
                    .filter(|(p, _)| wanted.is_empty() || *p == wanted || p.starts_with(&prefix))
                    .map(|(p, b)| (p.clone(), b.clone()))
                    .collect()
            })
            .unwrap_or_default();

        if selected.is_empty() && !wanted.is_empty() {
            return Err(Error::resource_missing(format!(
                "No artifact at '{wanted}' for run '{run_id}'"
            )));
        }

        // Resolve every target before writing anything
        let targets = selected
            .into_iter()
            .map(|(artifact_path, bytes)| Ok((local_artifact_path(dst, &artifact_path)?, bytes)))
            .collect::<Result<Vec<_>>>()?;

        for (target, bytes) in targets {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&target, bytes)?;
        }

        Ok(local)
    }

    fn log_artifact(
        &self,
        run_id: &str,
        local_path: &Path,
        artifact_path: Option<&str>,
    ) -> Result<()> {
        self.ensure_run(run_id)?;
        let bytes = fs::read(local_path)?;
        let file_name = artifact_file_name(local_path)?;
        let key = join_artifact_path(artifact_path.unwrap_or(""), &file_name);
        self.put_artifact(run_id, &key, bytes)
    }
}
