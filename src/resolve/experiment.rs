//! Experiment lookup by name, with creation on miss

use tracing::{debug, info};

use crate::experiment::{ExperimentRecord, ViewType, DESCRIPTION_TAG};
use crate::tracking::TrackingClient;
use crate::{Error, Result};

/// Finds or creates experiments by human-readable name.
pub struct ExperimentResolver<'c, C: TrackingClient + ?Sized> {
    client: &'c C,
}

impl<'c, C: TrackingClient + ?Sized> ExperimentResolver<'c, C> {
    /// Create a resolver on top of a tracking client.
    #[must_use]
    pub const fn new(client: &'c C) -> Self {
        Self { client }
    }

    /// Get the underlying tracking client.
    #[must_use]
    pub const fn client(&self) -> &'c C {
        self.client
    }

    /// Find the first active experiment named exactly `name`.
    ///
    /// # Errors
    ///
    /// Propagates tracking service errors
    pub fn find(&self, name: &str) -> Result<Option<ExperimentRecord>> {
        let experiments = self.client.list_experiments(ViewType::ActiveOnly)?;
        Ok(experiments.into_iter().find(|e| e.name() == name))
    }

    /// Resolve an experiment id by name.
    ///
    /// On a miss the experiment is created with `description` (empty when
    /// `None`) if `create_if_missing` is set.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` on a miss without `create_if_missing`, and
    /// propagates tracking service errors
    pub fn resolve_or_create(
        &self,
        name: &str,
        description: Option<&str>,
        create_if_missing: bool,
    ) -> Result<String> {
        if let Some(experiment) = self.find(name)? {
            debug!(name, experiment_id = experiment.experiment_id(), "experiment resolved");
            return Ok(experiment.experiment_id().to_string());
        }

        if !create_if_missing {
            return Err(Error::NotFound(format!(
                "Experiment '{name}' does not exist; provide a valid name or allow creation"
            )));
        }

        self.create_experiment(name, description.unwrap_or_default())
    }

    /// Resolve an experiment id by name, creating it without description
    /// when missing.
    ///
    /// # Errors
    ///
    /// Propagates tracking service errors
    pub fn get_experiment_id_by_name(&self, name: &str) -> Result<String> {
        self.resolve_or_create(name, None, true)
    }

    /// Create an experiment and store `description` as its `description` tag.
    ///
    /// # Errors
    ///
    /// Propagates tracking service errors, e.g. when the name is taken
    pub fn create_experiment(&self, name: &str, description: &str) -> Result<String> {
        let experiment_id = self.client.create_experiment(name)?;
        self.client
            .set_experiment_tag(&experiment_id, DESCRIPTION_TAG, description)?;
        info!(name, %experiment_id, "created experiment");
        Ok(experiment_id)
    }
}
