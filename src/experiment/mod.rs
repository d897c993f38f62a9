//! Tracking records
//!
//! Plain data types mirroring what the tracking server reports about
//! experiments, runs, metrics and artifacts.
//!
//! ## Schema Overview
//!
//! ```text
//! ExperimentRecord (1) ──< RunRecord (N) ── parent tag ──> RunRecord
//!                              │
//!                              ├── MetricRecord (N) [latest value per key]
//!                              └── ArtifactRecord (N) [tree under artifact root]
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use mlflow_wrapper::experiment::{ExperimentRecord, MetricRecord, RunRecord};
//!
//! let experiment = ExperimentRecord::new("1", "My Experiment");
//!
//! let run = RunRecord::builder("run-001", experiment.experiment_id())
//!     .name("baseline")
//!     .metric(MetricRecord::new("loss", 0.5, 0))
//!     .build();
//!
//! assert_eq!(run.name(), Some("baseline"));
//! ```

mod artifact_record;
mod experiment_record;
mod lifecycle;
mod metric_record;
mod run_record;
pub(crate) mod wire;

pub use artifact_record::{join_artifact_path, ArtifactRecord};
pub use experiment_record::{ExperimentRecord, ExperimentRecordBuilder, DESCRIPTION_TAG};
pub use lifecycle::{LifecycleStage, ViewType};
pub use metric_record::{MetricRecord, MetricRecordBuilder};
pub use run_record::{
    RunInfo, RunRecord, RunRecordBuilder, RunStatus, PARENT_RUN_ID_TAG, RUN_NAME_TAG,
};
