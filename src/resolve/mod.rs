//! Name-based resolution of experiments and runs
//!
//! Resolution is a newest-first linear scan over what the tracking service
//! lists: O(n) `get_run` calls per lookup miss. No server-side filtering by
//! name or tag is assumed. When several experiments or runs share a name,
//! the first match in scan order wins, which inherits whatever ordering the
//! service reports.
//!
//! # Example
//!
//! ```rust
//! use mlflow_wrapper::resolve::{ExperimentResolver, RunResolver};
//! use mlflow_wrapper::tracking::{MemoryTrackingClient, TrackingClient};
//!
//! # fn example() -> mlflow_wrapper::Result<()> {
//! let client = MemoryTrackingClient::new();
//! let experiment_id = ExperimentResolver::new(&client).get_experiment_id_by_name("demo")?;
//! let run = client.create_run(&experiment_id, "baseline", None)?;
//!
//! let mut runs = RunResolver::new(&client);
//! assert_eq!(
//!     runs.get_id_by_name(&experiment_id, "baseline", None)?.as_deref(),
//!     Some(run.run_id())
//! );
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

mod cache;
mod experiment;
mod run;

pub use cache::RunCache;
pub use experiment::ExperimentResolver;
pub use run::{run_name_by_id, MetricMode, RunResolver};
