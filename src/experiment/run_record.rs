//! Run Record - single recorded execution within an experiment

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{LifecycleStage, MetricRecord};

/// Reserved tag holding the run name.
pub const RUN_NAME_TAG: &str = "mlflow.runName";

/// Reserved tag holding the parent run id of a nested run.
pub const PARENT_RUN_ID_TAG: &str = "mlflow.parentRunId";

/// Execution status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    /// Run is currently executing.
    #[default]
    Running,
    /// Run is scheduled but not yet started.
    Scheduled,
    /// Run completed successfully.
    Finished,
    /// Run failed with an error.
    Failed,
    /// Run was killed by user or system.
    Killed,
}

/// Summary of a run as returned by run listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunInfo {
    run_id: String,
    lifecycle_stage: LifecycleStage,
    start_time: Option<DateTime<Utc>>,
}

impl RunInfo {
    /// Create a run summary.
    #[must_use]
    pub fn new(
        run_id: impl Into<String>,
        lifecycle_stage: LifecycleStage,
        start_time: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            lifecycle_stage,
            start_time,
        }
    }

    /// Get the run ID.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Get the lifecycle stage.
    #[must_use]
    pub const fn lifecycle_stage(&self) -> LifecycleStage {
        self.lifecycle_stage
    }

    /// Get the start timestamp, if known.
    #[must_use]
    pub const fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }
}

/// Run Record represents a single execution of an experiment.
///
/// The run name and parent run live in reserved tags, so two runs may
/// share a name. Only one level of nesting is resolved by this crate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunRecord {
    run_id: String,
    experiment_id: String,
    lifecycle_stage: LifecycleStage,
    status: RunStatus,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    artifact_uri: Option<String>,
    metrics: BTreeMap<String, MetricRecord>,
    params: BTreeMap<String, String>,
    tags: BTreeMap<String, String>,
}

impl RunRecord {
    /// Create a new active, running run record.
    ///
    /// # Arguments
    ///
    /// * `run_id` - Opaque identifier assigned by the tracking server
    /// * `experiment_id` - ID of the owning experiment
    #[must_use]
    pub fn new(run_id: impl Into<String>, experiment_id: impl Into<String>) -> Self {
        Self::builder(run_id, experiment_id).build()
    }

    /// Create a builder for constructing a run record with optional fields.
    #[must_use]
    pub fn builder(
        run_id: impl Into<String>,
        experiment_id: impl Into<String>,
    ) -> RunRecordBuilder {
        RunRecordBuilder::new(run_id, experiment_id)
    }

    /// Get the run ID.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Get the parent experiment ID.
    #[must_use]
    pub fn experiment_id(&self) -> &str {
        &self.experiment_id
    }

    /// Get the run name from the reserved name tag.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.tag(RUN_NAME_TAG)
    }

    /// Get the parent run ID from the reserved parent tag.
    #[must_use]
    pub fn parent_run_id(&self) -> Option<&str> {
        self.tag(PARENT_RUN_ID_TAG)
    }

    /// Get the lifecycle stage.
    #[must_use]
    pub const fn lifecycle_stage(&self) -> LifecycleStage {
        self.lifecycle_stage
    }

    /// Whether the run is active (not soft-deleted).
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.lifecycle_stage.is_active()
    }

    /// Get the execution status.
    #[must_use]
    pub const fn status(&self) -> RunStatus {
        self.status
    }

    /// Get the start timestamp, if known.
    #[must_use]
    pub const fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    /// Get the end timestamp, if the run has terminated.
    #[must_use]
    pub const fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    /// Get the artifact root URI of the run.
    #[must_use]
    pub fn artifact_uri(&self) -> Option<&str> {
        self.artifact_uri.as_deref()
    }

    /// Get all metrics, keyed by metric name.
    #[must_use]
    pub const fn metrics(&self) -> &BTreeMap<String, MetricRecord> {
        &self.metrics
    }

    /// Get a single metric.
    #[must_use]
    pub fn metric(&self, key: &str) -> Option<&MetricRecord> {
        self.metrics.get(key)
    }

    /// Get all params.
    #[must_use]
    pub const fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// Get all tags.
    #[must_use]
    pub const fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    /// Get a single tag.
    #[must_use]
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Summary of this run as a listing would report it.
    #[must_use]
    pub fn info(&self) -> RunInfo {
        RunInfo::new(self.run_id.clone(), self.lifecycle_stage, self.start_time)
    }

    pub(crate) fn set_lifecycle_stage(&mut self, stage: LifecycleStage) {
        self.lifecycle_stage = stage;
    }

    pub(crate) fn terminate(&mut self, status: RunStatus, end_time: DateTime<Utc>) {
        self.status = status;
        self.end_time = Some(end_time);
    }

    pub(crate) fn log_metric(&mut self, metric: MetricRecord) {
        self.metrics.insert(metric.key().to_string(), metric);
    }

    pub(crate) fn set_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.tags.insert(key.into(), value.into());
    }
}

/// Builder for `RunRecord`.
#[derive(Debug)]
pub struct RunRecordBuilder {
    record: RunRecord,
}

impl RunRecordBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(run_id: impl Into<String>, experiment_id: impl Into<String>) -> Self {
        Self {
            record: RunRecord {
                run_id: run_id.into(),
                experiment_id: experiment_id.into(),
                lifecycle_stage: LifecycleStage::Active,
                status: RunStatus::Running,
                start_time: None,
                end_time: None,
                artifact_uri: None,
                metrics: BTreeMap::new(),
                params: BTreeMap::new(),
                tags: BTreeMap::new(),
            },
        }
    }

    /// Set the run name tag.
    #[must_use]
    pub fn name(self, name: impl Into<String>) -> Self {
        self.tag(RUN_NAME_TAG, name)
    }

    /// Set the parent run tag.
    #[must_use]
    pub fn parent_run_id(self, parent_run_id: impl Into<String>) -> Self {
        self.tag(PARENT_RUN_ID_TAG, parent_run_id)
    }

    /// Set the lifecycle stage.
    #[must_use]
    pub const fn lifecycle_stage(mut self, stage: LifecycleStage) -> Self {
        self.record.lifecycle_stage = stage;
        self
    }

    /// Set the execution status.
    #[must_use]
    pub const fn status(mut self, status: RunStatus) -> Self {
        self.record.status = status;
        self
    }

    /// Set the start timestamp.
    #[must_use]
    pub const fn start_time(mut self, start_time: DateTime<Utc>) -> Self {
        self.record.start_time = Some(start_time);
        self
    }

    /// Set the end timestamp.
    #[must_use]
    pub const fn end_time(mut self, end_time: DateTime<Utc>) -> Self {
        self.record.end_time = Some(end_time);
        self
    }

    /// Set the artifact root URI.
    #[must_use]
    pub fn artifact_uri(mut self, uri: impl Into<String>) -> Self {
        self.record.artifact_uri = Some(uri.into());
        self
    }

    /// Add a metric.
    #[must_use]
    pub fn metric(mut self, metric: MetricRecord) -> Self {
        self.record.log_metric(metric);
        self
    }

    /// Add a param.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.record.params.insert(key.into(), value.into());
        self
    }

    /// Add a tag.
    #[must_use]
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.record.set_tag(key, value);
        self
    }

    /// Build the `RunRecord`.
    #[must_use]
    pub fn build(self) -> RunRecord {
        self.record
    }
}
