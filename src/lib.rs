//! # mlflow-wrapper: name-based access to an experiment tracking server
//!
//! Resolves experiments and runs by human-readable name instead of opaque
//! ids, caches run lookups, and moves table and file artifacts to and from
//! an MLflow tracking server.
//!
//! ## Design Principles
//!
//! - **Thin layer**: every operation is a sequence of [`tracking::TrackingClient`]
//!   calls; service errors reach the caller unchanged, nothing is retried
//! - **Explicit state**: the run cache is owned by a [`resolve::RunResolver`]
//!   and the active upload run by an [`artifacts::UploadHandler`]; there are
//!   no process-wide singletons
//! - **Blocking**: single caller, synchronous calls, no background work
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use mlflow_wrapper::artifacts::ArtifactDownloader;
//! use mlflow_wrapper::resolve::{ExperimentResolver, MetricMode, RunResolver};
//! use mlflow_wrapper::tracking::RestTrackingClient;
//!
//! let client = RestTrackingClient::from_env()?;
//!
//! let experiment_id = ExperimentResolver::new(&client)
//!     .resolve_or_create("Library Test Experiment", Some("nightly runs"), true)?;
//!
//! let mut runs = RunResolver::new(&client);
//! if let Some(best) = runs.get_by_metric(&experiment_id, "val_loss", Some(MetricMode::Min))? {
//!     ArtifactDownloader::new(&client).download_run("downloads", &best, None)?;
//! }
//! # Ok::<(), mlflow_wrapper::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod artifacts;
pub mod config;
pub mod error;
pub mod experiment;
pub mod folder;
pub mod resolve;
pub mod tracking;

pub use config::{ClientConfig, DEFAULT_TRACKING_URI};
pub use error::{Error, Result};
