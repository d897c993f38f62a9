//! Property-based tests for run resolution and caching
//!
//! - Test selection invariants against a brute-force reference
//! - Run with ProptestConfig::with_cases(64)
//! - Must complete in <30 seconds for pre-commit hook

use mlflow_wrapper::experiment::{MetricRecord, RunRecord};
use mlflow_wrapper::resolve::{MetricMode, RunCache, RunResolver};
use mlflow_wrapper::tracking::{MemoryTrackingClient, TrackingClient};
use proptest::prelude::*;

// ============================================================================
// Property Test Generators (Strategies)
// ============================================================================

/// Metric values for a handful of runs; `None` means the metric is absent
fn arb_metric_values() -> impl Strategy<Value = Vec<Option<f64>>> {
    proptest::collection::vec(proptest::option::of(-1.0e6f64..1.0e6), 1..20)
}

/// Run names drawn from a small alphabet so duplicates are common
fn arb_run_names() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec(prop_oneof!["a", "b", "c", "d"], 1..15)
        .prop_map(|names| names.into_iter().map(String::from).collect())
}

fn populate(values: &[Option<f64>]) -> MemoryTrackingClient {
    let client = MemoryTrackingClient::new();
    for (i, value) in values.iter().enumerate() {
        let run = client.create_run("0", &format!("run-{i}"), None).unwrap();
        if let Some(v) = value {
            client.log_metric(run.run_id(), "m", *v, 0).unwrap();
        }
    }
    client
}

fn metric_of(run: &RunRecord) -> f64 {
    run.metrics()["m"].numeric().unwrap().unwrap()
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: Max mode selects a run holding the largest value
    #[test]
    fn prop_metric_max_matches_reference(values in arb_metric_values()) {
        let client = populate(&values);
        let expected = values.iter().flatten().copied().fold(None, |acc: Option<f64>, v| {
            Some(acc.map_or(v, |a| a.max(v)))
        });

        let mut resolver = RunResolver::new(&client);
        let found = resolver.get_by_metric("0", "m", Some(MetricMode::Max)).unwrap();

        match expected {
            Some(max) => prop_assert_eq!(metric_of(&found.unwrap()), max),
            None => prop_assert!(found.is_none()),
        }
    }

    /// Property: Min mode selects a run holding the smallest value
    #[test]
    fn prop_metric_min_matches_reference(values in arb_metric_values()) {
        let client = populate(&values);
        let expected = values.iter().flatten().copied().fold(None, |acc: Option<f64>, v| {
            Some(acc.map_or(v, |a| a.min(v)))
        });

        let mut resolver = RunResolver::new(&client);
        let found = resolver.get_by_metric("0", "m", Some(MetricMode::Min)).unwrap();

        match expected {
            Some(min) => prop_assert_eq!(metric_of(&found.unwrap()), min),
            None => prop_assert!(found.is_none()),
        }
    }

    /// Property: Without a mode the newest run carrying the metric is returned
    #[test]
    fn prop_metric_no_mode_is_newest(values in arb_metric_values()) {
        let client = populate(&values);
        let newest = values.iter().rposition(Option::is_some);

        let mut resolver = RunResolver::new(&client);
        let found = resolver.get_by_metric("0", "m", None).unwrap();

        prop_assert_eq!(
            found.as_ref().and_then(RunRecord::name).map(String::from),
            newest.map(|i| format!("run-{i}"))
        );
    }

    /// Property: Name lookup returns the most recently created run with that name
    #[test]
    fn prop_name_lookup_is_newest(names in arb_run_names()) {
        let client = MemoryTrackingClient::new();
        let ids: Vec<String> = names
            .iter()
            .map(|name| client.create_run("0", name, None).unwrap().run_id().to_string())
            .collect();

        let mut resolver = RunResolver::new(&client);
        for target in ["a", "b", "c", "d"] {
            let expected = names.iter().rposition(|n| n == target).map(|i| ids[i].clone());
            let found = resolver.get_id_by_name("0", target, None).unwrap();
            prop_assert_eq!(found, expected);
        }
    }

    /// Property: Repeated inserts of the same run never grow the cache
    #[test]
    fn prop_cache_insert_is_deduplicated(repeats in 1usize..10, runs in 1usize..6) {
        let mut cache = RunCache::new();
        let records: Vec<RunRecord> = (0..runs)
            .map(|i| RunRecord::builder(format!("id-{i}"), "0").name("r").build())
            .collect();

        for _ in 0..repeats {
            for record in &records {
                cache.insert("0", record.clone());
            }
        }

        prop_assert_eq!(cache.len(), runs);
        prop_assert_eq!(cache.runs("0").len(), runs);
    }

    /// Property: Finite metric values read back unchanged
    #[test]
    fn prop_metric_numeric_is_exact(value in -1.0e12f64..1.0e12) {
        let metric = MetricRecord::new("m", value, 0);
        prop_assert_eq!(metric.numeric().unwrap(), Some(value));
    }
}
