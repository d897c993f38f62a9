//! Run lookup by id, name, parent/child relation and metric extremum

use std::str::FromStr;

use tracing::{debug, info};

use super::RunCache;
use crate::experiment::{RunRecord, ViewType};
use crate::tracking::TrackingClient;
use crate::{Error, Result};

/// Selection rule for [`RunResolver::get_by_metric`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricMode {
    /// Smallest value wins.
    Min,
    /// Largest value wins.
    Max,
}

impl MetricMode {
    /// Starting threshold of the running extremum.
    const fn initial_threshold(self) -> f64 {
        match self {
            Self::Min => f64::MAX,
            Self::Max => f64::MIN,
        }
    }

    /// Whether `value` strictly beats `threshold`.
    fn beats(self, value: f64, threshold: f64) -> bool {
        match self {
            Self::Min => value < threshold,
            Self::Max => value > threshold,
        }
    }
}

impl FromStr for MetricMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            other => Err(Error::InvalidArgument(format!(
                "Unknown metric mode '{other}', expected 'min' or 'max'"
            ))),
        }
    }
}

/// Name of the run with `run_id` among `runs`.
#[must_use]
pub fn run_name_by_id<'r>(run_id: &str, runs: &'r [RunRecord]) -> Option<&'r str> {
    runs.iter()
        .find(|run| run.run_id() == run_id)
        .and_then(RunRecord::name)
}

/// Resolves runs of an experiment, caching every run it fetches.
///
/// The cache belongs to this resolver; build separate resolvers for
/// isolated caches. Lookups consult the cache first, then scan the
/// experiment's active runs newest first.
pub struct RunResolver<'c, C: TrackingClient + ?Sized> {
    client: &'c C,
    cache: RunCache,
}

impl<'c, C: TrackingClient + ?Sized> RunResolver<'c, C> {
    /// Create a resolver with an empty cache.
    #[must_use]
    pub fn new(client: &'c C) -> Self {
        Self::with_cache(client, RunCache::new())
    }

    /// Create a resolver with a pre-populated cache.
    #[must_use]
    pub const fn with_cache(client: &'c C, cache: RunCache) -> Self {
        Self { client, cache }
    }

    /// Get the underlying tracking client.
    #[must_use]
    pub const fn client(&self) -> &'c C {
        self.client
    }

    /// Get the run cache.
    #[must_use]
    pub const fn cache(&self) -> &RunCache {
        &self.cache
    }

    /// Drop every cached run, so later lookups go back to the service.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Get a run by id.
    ///
    /// # Errors
    ///
    /// Propagates tracking service errors
    pub fn get_by_id(&mut self, experiment_id: &str, run_id: &str) -> Result<Option<RunRecord>> {
        if let Some(run) = self.cache.find_by_id(experiment_id, run_id) {
            debug!(run_id, "run cache hit");
            return Ok(Some(run.clone()));
        }

        self.scan_for(experiment_id, |run| run.run_id() == run_id)
    }

    /// Get the id of the most recent run named `name`.
    ///
    /// With `parent_run_id`, only children of that run match.
    ///
    /// # Errors
    ///
    /// Propagates tracking service errors
    pub fn get_id_by_name(
        &mut self,
        experiment_id: &str,
        name: &str,
        parent_run_id: Option<&str>,
    ) -> Result<Option<String>> {
        Ok(self
            .get_by_name(experiment_id, name, parent_run_id)?
            .map(|run| run.run_id().to_string()))
    }

    /// Get the most recent run named `name` (trimmed before comparison).
    ///
    /// With `parent_run_id`, only children of that run match.
    ///
    /// # Errors
    ///
    /// Propagates tracking service errors
    pub fn get_by_name(
        &mut self,
        experiment_id: &str,
        name: &str,
        parent_run_id: Option<&str>,
    ) -> Result<Option<RunRecord>> {
        let name = name.trim();

        if let Some(run) = self.cache.find_by_name(experiment_id, name, parent_run_id) {
            debug!(name, run_id = run.run_id(), "run cache hit");
            return Ok(Some(run.clone()));
        }

        self.scan_for(experiment_id, |run| {
            run.name() == Some(name)
                && parent_run_id.map_or(true, |parent| run.parent_run_id() == Some(parent))
        })
    }

    /// Get the run named `name` followed by its children.
    ///
    /// The parent is included only while active. Children are the runs whose
    /// parent tag equals the parent's id, newest first. Returns an empty list
    /// when no run has that name.
    ///
    /// # Errors
    ///
    /// Propagates tracking service errors
    pub fn get_with_children(
        &mut self,
        experiment_id: &str,
        name: &str,
        include_children: bool,
    ) -> Result<Vec<RunRecord>> {
        let Some(parent_id) = self.get_id_by_name(experiment_id, name, None)? else {
            return Ok(Vec::new());
        };

        let mut runs = Vec::new();

        // Re-fetch: the cached copy may predate a deletion
        let parent = self.client.get_run(&parent_id)?;
        if parent.is_active() {
            runs.push(parent);
        }

        if include_children {
            let infos = self.client.list_run_infos(experiment_id, ViewType::ActiveOnly)?;
            for info in infos.iter().rev() {
                let run = self.client.get_run(info.run_id())?;
                if run.parent_run_id() == Some(parent_id.as_str()) {
                    self.cache.insert(experiment_id, run.clone());
                    runs.push(run);
                }
            }
        }

        Ok(runs)
    }

    /// Get a run by the value of `metric`.
    ///
    /// Without a mode, the first run in newest-first order with a non-null
    /// value wins. With [`MetricMode::Min`]/[`MetricMode::Max`], a running
    /// threshold starting at `f64::MAX`/`f64::MIN` is replaced by every
    /// strictly smaller/larger value, and the run holding the final
    /// threshold wins.
    ///
    /// # Errors
    ///
    /// Returns `Error::Conversion` as soon as any scanned run holds a value
    /// that is not numeric (the scan is abandoned, earlier candidates are
    /// discarded), and propagates tracking service errors
    pub fn get_by_metric(
        &mut self,
        experiment_id: &str,
        metric: &str,
        mode: Option<MetricMode>,
    ) -> Result<Option<RunRecord>> {
        let infos = self.client.list_run_infos(experiment_id, ViewType::ActiveOnly)?;

        let mut best: Option<RunRecord> = None;
        let mut threshold = mode.map_or(0.0, MetricMode::initial_threshold);

        for info in infos.iter().rev() {
            let run = self.client.get_run(info.run_id())?;
            let Some(record) = run.metric(metric) else {
                continue;
            };

            match mode {
                None => {
                    if !record.is_null() {
                        best = Some(run);
                        break;
                    }
                }
                Some(mode) => {
                    let Some(value) = record.numeric()? else {
                        continue;
                    };
                    if mode.beats(value, threshold) {
                        threshold = value;
                        best = Some(run);
                    }
                }
            }
        }

        if let Some(run) = &best {
            debug!(metric, run_id = run.run_id(), ?mode, "metric run selected");
            self.cache.insert(experiment_id, run.clone());
        }
        Ok(best)
    }

    /// Delete the run named `name`, and its children when `delete_children`
    /// is set.
    ///
    /// Runs already deleted are skipped. Every resolved run is dropped from
    /// the cache. Returns the number of runs deleted.
    ///
    /// # Errors
    ///
    /// Propagates tracking service errors; runs deleted before the failure
    /// stay deleted
    pub fn delete(&mut self, experiment_id: &str, name: &str, delete_children: bool) -> Result<usize> {
        let runs = if delete_children {
            self.get_with_children(experiment_id, name, true)?
        } else {
            match self.get_by_name(experiment_id, name, None)? {
                Some(run) => vec![self.client.get_run(run.run_id())?],
                None => Vec::new(),
            }
        };

        let mut deleted = 0;
        for run in &runs {
            self.cache.remove_run(run.run_id());
            if run.is_active() {
                self.client.delete_run(run.run_id())?;
                deleted += 1;
                info!(run_id = run.run_id(), name = run.name(), "deleted run");
            }
        }

        Ok(deleted)
    }

    /// Newest-first scan of the experiment's active runs; the first match is
    /// cached and returned.
    fn scan_for(
        &mut self,
        experiment_id: &str,
        matches: impl Fn(&RunRecord) -> bool,
    ) -> Result<Option<RunRecord>> {
        debug!(experiment_id, "run cache miss, scanning experiment");
        let infos = self.client.list_run_infos(experiment_id, ViewType::ActiveOnly)?;

        for info in infos.iter().rev() {
            let run = self.client.get_run(info.run_id())?;
            if matches(&run) {
                self.cache.insert(experiment_id, run.clone());
                return Ok(Some(run));
            }
        }

        Ok(None)
    }
}
