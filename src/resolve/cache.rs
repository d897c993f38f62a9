//! Per-experiment cache of runs already fetched from the tracking service

use rustc_hash::FxHashMap;

use crate::experiment::RunRecord;

/// Runs fetched so far, keyed by experiment id.
///
/// Entries are appended to and only dropped when a run is deleted through
/// the owning resolver. Nothing is invalidated otherwise, so a run deleted
/// or renamed out-of-band stays visible here until the cache is cleared.
#[derive(Debug, Default, Clone)]
pub struct RunCache {
    entries: FxHashMap<String, Vec<RunRecord>>,
}

impl RunCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the cache holds no runs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.values().all(Vec::is_empty)
    }

    /// Get the total number of cached runs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Cached runs of an experiment, in the order they were found.
    ///
    /// An experiment never seen before yields an empty slice.
    #[must_use]
    pub fn runs(&self, experiment_id: &str) -> &[RunRecord] {
        self.entries.get(experiment_id).map_or(&[], Vec::as_slice)
    }

    /// Find a cached run by id.
    #[must_use]
    pub fn find_by_id(&self, experiment_id: &str, run_id: &str) -> Option<&RunRecord> {
        self.runs(experiment_id).iter().find(|run| run.run_id() == run_id)
    }

    /// Find a cached run by exact name, optionally restricted to children
    /// of `parent_run_id`.
    #[must_use]
    pub fn find_by_name(
        &self,
        experiment_id: &str,
        name: &str,
        parent_run_id: Option<&str>,
    ) -> Option<&RunRecord> {
        self.runs(experiment_id).iter().find(|run| {
            run.name() == Some(name)
                && parent_run_id.map_or(true, |parent| run.parent_run_id() == Some(parent))
        })
    }

    /// Append a run to its experiment's entry. A run already cached under
    /// the same id is left as is.
    pub fn insert(&mut self, experiment_id: &str, run: RunRecord) {
        let runs = self.entries.entry(experiment_id.to_string()).or_default();
        if !runs.iter().any(|cached| cached.run_id() == run.run_id()) {
            runs.push(run);
        }
    }

    /// Drop a run from every experiment entry. Returns whether it was cached.
    pub fn remove_run(&mut self, run_id: &str) -> bool {
        let mut removed = false;
        for runs in self.entries.values_mut() {
            let before = runs.len();
            runs.retain(|run| run.run_id() != run_id);
            removed |= runs.len() != before;
        }
        removed
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
