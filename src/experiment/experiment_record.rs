//! Experiment Record - named grouping of runs on the tracking server

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::LifecycleStage;

/// Tag key holding the free-text experiment description.
pub const DESCRIPTION_TAG: &str = "description";

/// Experiment Record represents a tracked experiment.
///
/// Names are unique by convention only; the tracking server may hold
/// several active experiments with the same name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExperimentRecord {
    experiment_id: String,
    name: String,
    lifecycle_stage: LifecycleStage,
    artifact_location: Option<String>,
    tags: BTreeMap<String, String>,
}

impl ExperimentRecord {
    /// Create a new active experiment record with the given ID and name.
    ///
    /// # Arguments
    ///
    /// * `experiment_id` - Opaque identifier assigned by the tracking server
    /// * `name` - Human-readable name for the experiment
    #[must_use]
    pub fn new(experiment_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::builder(experiment_id, name).build()
    }

    /// Create a builder for constructing an experiment record with optional fields.
    #[must_use]
    pub fn builder(
        experiment_id: impl Into<String>,
        name: impl Into<String>,
    ) -> ExperimentRecordBuilder {
        ExperimentRecordBuilder::new(experiment_id, name)
    }

    /// Get the experiment ID.
    #[must_use]
    pub fn experiment_id(&self) -> &str {
        &self.experiment_id
    }

    /// Get the experiment name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the lifecycle stage.
    #[must_use]
    pub const fn lifecycle_stage(&self) -> LifecycleStage {
        self.lifecycle_stage
    }

    /// Get the artifact root of the experiment, if the server reported one.
    #[must_use]
    pub fn artifact_location(&self) -> Option<&str> {
        self.artifact_location.as_deref()
    }

    /// Get all experiment tags.
    #[must_use]
    pub const fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    /// Get the description tag, if set.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.tags.get(DESCRIPTION_TAG).map(String::as_str)
    }

    pub(crate) fn set_lifecycle_stage(&mut self, stage: LifecycleStage) {
        self.lifecycle_stage = stage;
    }

    pub(crate) fn set_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.tags.insert(key.into(), value.into());
    }
}

/// Builder for `ExperimentRecord`.
#[derive(Debug)]
pub struct ExperimentRecordBuilder {
    experiment_id: String,
    name: String,
    lifecycle_stage: LifecycleStage,
    artifact_location: Option<String>,
    tags: BTreeMap<String, String>,
}

impl ExperimentRecordBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(experiment_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            experiment_id: experiment_id.into(),
            name: name.into(),
            lifecycle_stage: LifecycleStage::Active,
            artifact_location: None,
            tags: BTreeMap::new(),
        }
    }

    /// Set the lifecycle stage.
    #[must_use]
    pub const fn lifecycle_stage(mut self, stage: LifecycleStage) -> Self {
        self.lifecycle_stage = stage;
        self
    }

    /// Set the artifact root location.
    #[must_use]
    pub fn artifact_location(mut self, location: impl Into<String>) -> Self {
        self.artifact_location = Some(location.into());
        self
    }

    /// Add a tag.
    #[must_use]
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Build the `ExperimentRecord`.
    #[must_use]
    pub fn build(self) -> ExperimentRecord {
        ExperimentRecord {
            experiment_id: self.experiment_id,
            name: self.name,
            lifecycle_stage: self.lifecycle_stage,
            artifact_location: self.artifact_location,
            tags: self.tags,
        }
    }
}
