//! Artifact transfer between local directories and a run's artifact store
//!
//! - [`ArtifactDownloader`]: pulls one or many runs' artifacts into
//!   `<save_path>/<run_id>/`
//! - [`UploadHandler`]: pushes tables and files from a local save path to
//!   the active run
//! - [`table`]: CSV serialization of Arrow record batches
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use arrow::array::{Float64Array, RecordBatch};
//! use arrow::datatypes::{DataType, Field, Schema};
//! use mlflow_wrapper::artifacts::{ArtifactDownloader, UploadHandler};
//! use mlflow_wrapper::tracking::MemoryTrackingClient;
//!
//! # fn example() -> mlflow_wrapper::Result<()> {
//! let tmp = tempfile::tempdir()?;
//! let client = MemoryTrackingClient::new();
//!
//! let mut uploads = UploadHandler::new(&client, tmp.path().join("staging"))?;
//! let run = uploads.start_run("0", "baseline", None)?;
//!
//! let schema = Arc::new(Schema::new(vec![Field::new("loss", DataType::Float64, false)]));
//! let batch = RecordBatch::try_new(schema, vec![Arc::new(Float64Array::from(vec![0.5, 0.25]))])?;
//! uploads.upload_table(&batch, "losses.csv", None, true)?;
//!
//! let dir = ArtifactDownloader::new(&client).download_run(tmp.path().join("out"), &run, None)?;
//! assert!(dir.join("losses.csv").exists());
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

mod download;
pub mod table;
mod upload;

pub use download::ArtifactDownloader;
pub use upload::UploadHandler;
