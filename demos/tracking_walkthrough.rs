//! Tracking Walkthrough
//!
//! Resolves an experiment by name, records a small parameter sweep as a
//! parent run with child runs, uploads a results table, then picks the
//! best child by metric and downloads its artifacts.
//!
//! Runs against an in-memory backend by default. Pass `--remote` to use
//! the server named by `MLFLOW_TRACKING_URI`.
//!
//! Run with: cargo run --example tracking_walkthrough [-- --remote]

use std::sync::Arc;

use arrow::array::{Float64Array, Int64Array, RecordBatch};
use arrow::datatypes::{DataType, Field, Schema};
use mlflow_wrapper::artifacts::{ArtifactDownloader, UploadHandler};
use mlflow_wrapper::experiment::RunStatus;
use mlflow_wrapper::resolve::{ExperimentResolver, MetricMode, RunResolver};
use mlflow_wrapper::tracking::{MemoryTrackingClient, RestTrackingClient, TrackingClient};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let client: Box<dyn TrackingClient> = if std::env::args().any(|arg| arg == "--remote") {
        Box::new(RestTrackingClient::from_env()?)
    } else {
        Box::new(MemoryTrackingClient::new())
    };
    let client = client.as_ref();

    println!("=== mlflow-wrapper Tracking Walkthrough ===\n");

    // -------------------------------------------------------------------------
    // 1. Resolve the experiment
    // -------------------------------------------------------------------------
    let experiment_id = ExperimentResolver::new(client).resolve_or_create(
        "Walkthrough Experiment",
        Some("learning rate sweep"),
        true,
    )?;
    println!("1. Experiment id: {experiment_id}");

    // -------------------------------------------------------------------------
    // 2. Record a sweep: one parent, one child per learning rate
    // -------------------------------------------------------------------------
    let workdir = tempfile::tempdir()?;
    let mut uploads = UploadHandler::new(client, workdir.path().join("staging"))?;

    let parent = uploads.start_run(&experiment_id, "lr-sweep", None)?;
    println!("2. Parent run: {}", parent.run_id());

    for (i, lr) in [0.1, 0.01, 0.001].into_iter().enumerate() {
        let child = uploads.start_run(&experiment_id, &format!("lr-{lr}"), Some(parent.run_id()))?;
        let val_loss = 0.5 + (lr - 0.01_f64).abs() * 3.0;
        client.log_metric(child.run_id(), "val_loss", val_loss, 0)?;
        client.set_tag(child.run_id(), "sweep.index", &i.to_string())?;
        uploads.end_run(RunStatus::Finished)?;
        println!("   child {} lr={lr} val_loss={val_loss:.3}", child.run_id());
    }

    // -------------------------------------------------------------------------
    // 3. Upload a results table to the parent
    // -------------------------------------------------------------------------
    let schema = Arc::new(Schema::new(vec![
        Field::new("epoch", DataType::Int64, false),
        Field::new("loss", DataType::Float64, false),
    ]));
    let table = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from(vec![1, 2, 3])),
            Arc::new(Float64Array::from(vec![0.9, 0.7, 0.6])),
        ],
    )?;

    uploads.set_active_run(parent.run_id());
    uploads.upload_table(&table, "history.csv", Some("tables"), true)?;
    uploads.end_run(RunStatus::Finished)?;
    println!("3. Uploaded tables/history.csv to the parent run");

    // -------------------------------------------------------------------------
    // 4. Pick the best child and fetch the family's artifacts
    // -------------------------------------------------------------------------
    let mut runs = RunResolver::new(client);
    if let Some(best) = runs.get_by_metric(&experiment_id, "val_loss", Some(MetricMode::Min))? {
        println!("4. Best run by val_loss: {:?} ({})", best.name(), best.run_id());
    }

    let family = runs.get_with_children(&experiment_id, "lr-sweep", true)?;
    let dirs = ArtifactDownloader::new(client).download_runs(workdir.path().join("downloads"), &family, None);
    println!("   Downloaded artifacts of {} of {} runs", dirs.len(), family.len());

    // -------------------------------------------------------------------------
    // 5. Clean up
    // -------------------------------------------------------------------------
    let deleted = runs.delete(&experiment_id, "lr-sweep", true)?;
    println!("5. Deleted {deleted} runs");

    Ok(())
}
