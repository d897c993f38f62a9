//! Run resolution tests against the in-memory tracking backend

use std::cell::Cell;
use std::path::{Path, PathBuf};

use mlflow_wrapper::experiment::{
    ArtifactRecord, ExperimentRecord, MetricRecord, RunInfo, RunRecord, RunStatus, ViewType,
};
use mlflow_wrapper::resolve::{ExperimentResolver, MetricMode, RunResolver};
use mlflow_wrapper::tracking::{MemoryTrackingClient, TrackingClient};
use mlflow_wrapper::Error;
use serde_json::json;

/// Delegates to the memory backend, failing the `fail_on`-th `get_run` call.
struct FlakyClient {
    inner: MemoryTrackingClient,
    get_run_calls: Cell<usize>,
    fail_on: usize,
}

impl FlakyClient {
    fn new(inner: MemoryTrackingClient, fail_on: usize) -> Self {
        Self {
            inner,
            get_run_calls: Cell::new(0),
            fail_on,
        }
    }
}

impl TrackingClient for FlakyClient {
    fn list_experiments(&self, view: ViewType) -> mlflow_wrapper::Result<Vec<ExperimentRecord>> {
        self.inner.list_experiments(view)
    }

    fn create_experiment(&self, name: &str) -> mlflow_wrapper::Result<String> {
        self.inner.create_experiment(name)
    }

    fn set_experiment_tag(&self, id: &str, key: &str, value: &str) -> mlflow_wrapper::Result<()> {
        self.inner.set_experiment_tag(id, key, value)
    }

    fn list_run_infos(&self, id: &str, view: ViewType) -> mlflow_wrapper::Result<Vec<RunInfo>> {
        self.inner.list_run_infos(id, view)
    }

    fn get_run(&self, run_id: &str) -> mlflow_wrapper::Result<RunRecord> {
        let call = self.get_run_calls.get() + 1;
        self.get_run_calls.set(call);
        if call == self.fail_on {
            return Err(Error::Service {
                status: 503,
                error_code: "TEMPORARILY_UNAVAILABLE".to_string(),
                message: "try again later".to_string(),
            });
        }
        self.inner.get_run(run_id)
    }

    fn delete_run(&self, run_id: &str) -> mlflow_wrapper::Result<()> {
        self.inner.delete_run(run_id)
    }

    fn create_run(
        &self,
        experiment_id: &str,
        run_name: &str,
        parent_run_id: Option<&str>,
    ) -> mlflow_wrapper::Result<RunRecord> {
        self.inner.create_run(experiment_id, run_name, parent_run_id)
    }

    fn set_terminated(&self, run_id: &str, status: RunStatus) -> mlflow_wrapper::Result<()> {
        self.inner.set_terminated(run_id, status)
    }

    fn log_metric(&self, run_id: &str, key: &str, value: f64, step: i64) -> mlflow_wrapper::Result<()> {
        self.inner.log_metric(run_id, key, value, step)
    }

    fn set_tag(&self, run_id: &str, key: &str, value: &str) -> mlflow_wrapper::Result<()> {
        self.inner.set_tag(run_id, key, value)
    }

    fn list_artifacts(&self, run_id: &str, path: &str) -> mlflow_wrapper::Result<Vec<ArtifactRecord>> {
        self.inner.list_artifacts(run_id, path)
    }

    fn download_artifacts(&self, run_id: &str, path: &str, dst: &Path) -> mlflow_wrapper::Result<PathBuf> {
        self.inner.download_artifacts(run_id, path, dst)
    }

    fn log_artifact(
        &self,
        run_id: &str,
        local_path: &Path,
        artifact_path: Option<&str>,
    ) -> mlflow_wrapper::Result<()> {
        self.inner.log_artifact(run_id, local_path, artifact_path)
    }
}

fn setup() -> (MemoryTrackingClient, String) {
    let client = MemoryTrackingClient::new();
    let experiment_id = ExperimentResolver::new(&client)
        .get_experiment_id_by_name("Library Test Experiment")
        .unwrap();
    (client, experiment_id)
}

// =============================================================================
// Lookup by id and name
// =============================================================================

#[test]
fn test_get_by_name_and_id_by_name() {
    let (client, exp) = setup();
    let run = client.create_run(&exp, "Test run", None).unwrap();

    let mut resolver = RunResolver::new(&client);
    let found = resolver.get_by_name(&exp, "Test run", None).unwrap().unwrap();
    assert_eq!(found.run_id(), run.run_id());

    let id = resolver.get_id_by_name(&exp, "Test run", None).unwrap();
    assert_eq!(id.as_deref(), Some(run.run_id()));
}

#[test]
fn test_get_by_id() {
    let (client, exp) = setup();
    client.create_run(&exp, "other", None).unwrap();
    let run = client.create_run(&exp, "Test run 1700000000", None).unwrap();

    let mut resolver = RunResolver::new(&client);
    let found = resolver.get_by_id(&exp, run.run_id()).unwrap().unwrap();
    assert_eq!(found.name(), Some("Test run 1700000000"));
    assert!(resolver.get_by_id(&exp, "no-such-run").unwrap().is_none());
}

#[test]
fn test_name_is_trimmed() {
    let (client, exp) = setup();
    let run = client.create_run(&exp, "padded", None).unwrap();

    let mut resolver = RunResolver::new(&client);
    let id = resolver.get_id_by_name(&exp, "  padded\t", None).unwrap();
    assert_eq!(id.as_deref(), Some(run.run_id()));
}

#[test]
fn test_most_recent_run_wins_on_duplicate_names() {
    let (client, exp) = setup();
    client.create_run(&exp, "dup", None).unwrap();
    let newer = client.create_run(&exp, "dup", None).unwrap();

    let mut resolver = RunResolver::new(&client);
    let found = resolver.get_by_name(&exp, "dup", None).unwrap().unwrap();
    assert_eq!(found.run_id(), newer.run_id());
}

#[test]
fn test_parent_filter() {
    let (client, exp) = setup();
    let parent = client.create_run(&exp, "Parent Run", None).unwrap();
    let child = client
        .create_run(&exp, "fold-1", Some(parent.run_id()))
        .unwrap();
    // Newer unrelated run with the same name
    client.create_run(&exp, "fold-1", None).unwrap();

    let mut resolver = RunResolver::new(&client);
    let found = resolver
        .get_by_name(&exp, "fold-1", Some(parent.run_id()))
        .unwrap()
        .unwrap();
    assert_eq!(found.run_id(), child.run_id());

    assert!(resolver
        .get_by_name(&exp, "fold-1", Some("unknown-parent"))
        .unwrap()
        .is_none());
}

#[test]
fn test_unknown_name_returns_none() {
    let (client, exp) = setup();
    let mut resolver = RunResolver::new(&client);
    assert!(resolver.get_by_name(&exp, "absent", None).unwrap().is_none());
    assert!(resolver.cache().is_empty());
}

#[test]
fn test_unknown_experiment_propagates_service_error() {
    let client = MemoryTrackingClient::new();
    let mut resolver = RunResolver::new(&client);
    let err = resolver.get_by_name("404", "x", None).unwrap_err();
    assert!(matches!(err, Error::Service { .. }));
}

#[test]
fn test_independent_resolvers_have_independent_caches() {
    let (client, exp) = setup();
    client.create_run(&exp, "shared", None).unwrap();

    let mut first = RunResolver::new(&client);
    let second = RunResolver::new(&client);
    first.get_by_name(&exp, "shared", None).unwrap();

    assert_eq!(first.cache().len(), 1);
    assert!(second.cache().is_empty());
}

// =============================================================================
// Parent and children
// =============================================================================

#[test]
fn test_get_with_children_returns_parent_then_child() {
    let (client, exp) = setup();
    let parent = client.create_run(&exp, "Parent Run", None).unwrap();
    let child = client
        .create_run(&exp, "child_run", Some(parent.run_id()))
        .unwrap();

    let mut resolver = RunResolver::new(&client);
    let runs = resolver.get_with_children(&exp, "Parent Run", true).unwrap();

    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].run_id(), parent.run_id());
    assert_eq!(runs[1].run_id(), child.run_id());
}

#[test]
fn test_children_are_newest_first() {
    let (client, exp) = setup();
    let parent = client.create_run(&exp, "sweep", None).unwrap();
    let older = client.create_run(&exp, "a", Some(parent.run_id())).unwrap();
    let newer = client.create_run(&exp, "b", Some(parent.run_id())).unwrap();

    let mut resolver = RunResolver::new(&client);
    let runs = resolver.get_with_children(&exp, "sweep", true).unwrap();
    let ids: Vec<&str> = runs.iter().map(RunRecord::run_id).collect();
    assert_eq!(ids, vec![parent.run_id(), newer.run_id(), older.run_id()]);
}

#[test]
fn test_get_with_children_without_children() {
    let (client, exp) = setup();
    let parent = client.create_run(&exp, "sweep", None).unwrap();
    client.create_run(&exp, "a", Some(parent.run_id())).unwrap();

    let mut resolver = RunResolver::new(&client);
    let runs = resolver.get_with_children(&exp, "sweep", false).unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].run_id(), parent.run_id());
}

#[test]
fn test_get_with_children_unknown_parent_is_empty() {
    let (client, exp) = setup();
    let mut resolver = RunResolver::new(&client);
    assert!(resolver.get_with_children(&exp, "nobody", true).unwrap().is_empty());
}

#[test]
fn test_stale_cached_parent_is_not_returned() {
    let (client, exp) = setup();
    let parent = client.create_run(&exp, "stale", None).unwrap();

    let mut resolver = RunResolver::new(&client);
    resolver.get_by_name(&exp, "stale", None).unwrap();

    // Deleted out-of-band: the cache still knows it, the service does not
    client.delete_run(parent.run_id()).unwrap();
    assert!(resolver.get_by_name(&exp, "stale", None).unwrap().is_some());
    assert!(resolver.get_with_children(&exp, "stale", true).unwrap().is_empty());
}

#[test]
fn test_runs_cached_before_service_error_stay_cached() {
    let (inner, exp) = setup();
    let parent = inner.create_run(&exp, "sweep", None).unwrap();
    let older = inner.create_run(&exp, "a", Some(parent.run_id())).unwrap();
    let newer = inner.create_run(&exp, "b", Some(parent.run_id())).unwrap();

    // get_run calls: newer, older, parent (name scan), parent (re-fetch),
    // newer (child scan), then older fails
    let client = FlakyClient::new(inner, 6);
    let mut resolver = RunResolver::new(&client);

    let err = resolver.get_with_children(&exp, "sweep", true).unwrap_err();
    assert!(matches!(err, Error::Service { status: 503, .. }));

    let cache = resolver.cache();
    assert!(cache.find_by_id(&exp, parent.run_id()).is_some());
    assert!(cache.find_by_id(&exp, newer.run_id()).is_some());
    assert!(cache.find_by_id(&exp, older.run_id()).is_none());
    assert_eq!(cache.len(), 2);
}

#[test]
fn test_clear_cache_drops_stale_runs() {
    let (client, exp) = setup();
    let run = client.create_run(&exp, "stale", None).unwrap();

    let mut resolver = RunResolver::new(&client);
    resolver.get_by_name(&exp, "stale", None).unwrap();
    client.delete_run(run.run_id()).unwrap();
    assert!(resolver.get_by_name(&exp, "stale", None).unwrap().is_some());

    resolver.clear_cache();
    assert!(resolver.cache().is_empty());
    assert!(resolver.get_by_name(&exp, "stale", None).unwrap().is_none());
}

// =============================================================================
// Deletion
// =============================================================================

#[test]
fn test_delete_then_lookup_is_empty() {
    let (client, exp) = setup();
    let parent = client.create_run(&exp, "Test run", None).unwrap();
    client
        .create_run(&exp, "child", Some(parent.run_id()))
        .unwrap();

    let mut resolver = RunResolver::new(&client);
    let deleted = resolver.delete(&exp, "Test run", true).unwrap();

    assert_eq!(deleted, 2);
    assert!(resolver.cache().is_empty());
    assert!(resolver.get_with_children(&exp, "Test run", true).unwrap().is_empty());
    assert!(!client.get_run(parent.run_id()).unwrap().is_active());
}

#[test]
fn test_delete_without_children_keeps_children() {
    let (client, exp) = setup();
    let parent = client.create_run(&exp, "p", None).unwrap();
    let child = client.create_run(&exp, "c", Some(parent.run_id())).unwrap();

    let mut resolver = RunResolver::new(&client);
    assert_eq!(resolver.delete(&exp, "p", false).unwrap(), 1);

    assert!(!client.get_run(parent.run_id()).unwrap().is_active());
    assert!(client.get_run(child.run_id()).unwrap().is_active());
}

#[test]
fn test_delete_unknown_name_is_noop() {
    let (client, exp) = setup();
    let mut resolver = RunResolver::new(&client);
    assert_eq!(resolver.delete(&exp, "nothing", true).unwrap(), 0);
}

#[test]
fn test_delete_skips_runs_already_deleted() {
    let (client, exp) = setup();
    let parent = client.create_run(&exp, "p", None).unwrap();
    client.create_run(&exp, "c", Some(parent.run_id())).unwrap();

    let mut resolver = RunResolver::new(&client);
    resolver.get_by_name(&exp, "p", None).unwrap();
    client.delete_run(parent.run_id()).unwrap();

    // Parent resolves from the cache but is already deleted: only the child goes
    assert_eq!(resolver.delete(&exp, "p", true).unwrap(), 1);
}

// =============================================================================
// Metric selection
// =============================================================================

fn metric_runs(client: &MemoryTrackingClient, exp: &str) -> (RunRecord, RunRecord) {
    let a = client.create_run(exp, "A", None).unwrap();
    client.log_metric(a.run_id(), "m", 5.0, 0).unwrap();
    let b = client.create_run(exp, "B", None).unwrap();
    client.log_metric(b.run_id(), "m", 2.0, 0).unwrap();
    (a, b)
}

#[test]
fn test_get_by_metric_max_and_min() {
    let (client, exp) = setup();
    metric_runs(&client, &exp);

    let mut resolver = RunResolver::new(&client);
    let max = resolver.get_by_metric(&exp, "m", Some(MetricMode::Max)).unwrap().unwrap();
    assert_eq!(max.name(), Some("A"));

    let min = resolver.get_by_metric(&exp, "m", Some(MetricMode::Min)).unwrap().unwrap();
    assert_eq!(min.name(), Some("B"));
}

#[test]
fn test_get_by_metric_without_mode_takes_first_in_scan() {
    let (client, exp) = setup();
    metric_runs(&client, &exp);
    // Newest run lacks the metric and is skipped
    client.create_run(&exp, "C", None).unwrap();

    let mut resolver = RunResolver::new(&client);
    let first = resolver.get_by_metric(&exp, "m", None).unwrap().unwrap();
    assert_eq!(first.name(), Some("B"));
}

#[test]
fn test_get_by_metric_skips_null_values() {
    let (client, exp) = setup();
    metric_runs(&client, &exp);
    let c = client.create_run(&exp, "C", None).unwrap();
    client
        .put_metric(c.run_id(), MetricRecord::builder("m", serde_json::Value::Null).build())
        .unwrap();

    let mut resolver = RunResolver::new(&client);
    assert_eq!(
        resolver.get_by_metric(&exp, "m", None).unwrap().unwrap().name(),
        Some("B")
    );
    assert_eq!(
        resolver.get_by_metric(&exp, "m", Some(MetricMode::Max)).unwrap().unwrap().name(),
        Some("A")
    );
}

#[test]
fn test_get_by_metric_absent_metric_is_none() {
    let (client, exp) = setup();
    metric_runs(&client, &exp);

    let mut resolver = RunResolver::new(&client);
    assert!(resolver.get_by_metric(&exp, "accuracy", Some(MetricMode::Max)).unwrap().is_none());
}

#[test]
fn test_get_by_metric_non_numeric_aborts_scan() {
    let (client, exp) = setup();
    // Oldest run, reached last: candidates already seen are discarded too
    let bad = client.create_run(&exp, "bad", None).unwrap();
    client
        .put_metric(bad.run_id(), MetricRecord::builder("m", json!("n/a")).build())
        .unwrap();
    metric_runs(&client, &exp);

    let mut resolver = RunResolver::new(&client);
    let err = resolver.get_by_metric(&exp, "m", Some(MetricMode::Min)).unwrap_err();
    assert!(matches!(err, Error::Conversion { ref metric, .. } if metric == "m"));
}

#[test]
fn test_get_by_metric_parses_mode_case_insensitively() {
    let (client, exp) = setup();
    metric_runs(&client, &exp);

    let mode: MetricMode = "MAX".parse().unwrap();
    let mut resolver = RunResolver::new(&client);
    let run = resolver.get_by_metric(&exp, "m", Some(mode)).unwrap().unwrap();
    assert_eq!(run.name(), Some("A"));
}
