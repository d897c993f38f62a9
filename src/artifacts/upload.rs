//! Upload of tables and files to the active run

use std::path::{Path, PathBuf};

use arrow::record_batch::RecordBatch;
use tracing::{debug, info};

use super::table::write_csv;
use crate::experiment::{RunRecord, RunStatus};
use crate::folder::ensure_directory;
use crate::tracking::TrackingClient;
use crate::{Error, Result};

/// Stages files under a local save path and logs them to the active run.
///
/// The active run is session state of this handler: start one with
/// [`UploadHandler::start_run`] or attach to an existing run with
/// [`UploadHandler::set_active_run`].
pub struct UploadHandler<'c, C: TrackingClient + ?Sized> {
    client: &'c C,
    save_path: PathBuf,
    active_run: Option<String>,
}

impl<'c, C: TrackingClient + ?Sized> UploadHandler<'c, C> {
    /// Create a handler staging files under `save_path`, creating it if
    /// missing.
    ///
    /// # Errors
    ///
    /// Returns error if the save path cannot be created
    pub fn new(client: &'c C, save_path: impl AsRef<Path>) -> Result<Self> {
        let save_path = ensure_directory(save_path, false)?;
        Ok(Self {
            client,
            save_path,
            active_run: None,
        })
    }

    /// Get the local staging directory.
    #[must_use]
    pub fn save_path(&self) -> &Path {
        &self.save_path
    }

    /// Get the id of the active run, if any.
    #[must_use]
    pub fn active_run_id(&self) -> Option<&str> {
        self.active_run.as_deref()
    }

    /// Make an existing run the upload target.
    pub fn set_active_run(&mut self, run_id: impl Into<String>) {
        self.active_run = Some(run_id.into());
    }

    /// Start a run (nested under `parent_run_id` if given) and make it the
    /// upload target.
    ///
    /// # Errors
    ///
    /// Propagates tracking service errors
    pub fn start_run(
        &mut self,
        experiment_id: &str,
        run_name: &str,
        parent_run_id: Option<&str>,
    ) -> Result<RunRecord> {
        let run = self.client.create_run(experiment_id, run_name, parent_run_id)?;
        info!(run_id = run.run_id(), run_name, "started run");
        self.active_run = Some(run.run_id().to_string());
        Ok(run)
    }

    /// Terminate the active run with `status` and clear it.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArgument` without an active run, and
    /// propagates tracking service errors
    pub fn end_run(&mut self, status: RunStatus) -> Result<()> {
        let run_id = self.require_active_run()?.to_string();
        self.client.set_terminated(&run_id, status)?;
        self.active_run = None;
        debug!(%run_id, ?status, "ended run");
        Ok(())
    }

    /// Write `table` as CSV to `<save_path>/<file_name>` and log it to the
    /// active run under `artifact_subfolder` (root when `None`).
    ///
    /// With `strip_row_index` unset, a leading unnamed row-number column is
    /// written.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArgument` without an active run, and
    /// propagates serialization, IO and tracking service errors
    pub fn upload_table(
        &self,
        table: &RecordBatch,
        file_name: &str,
        artifact_subfolder: Option<&str>,
        strip_row_index: bool,
    ) -> Result<()> {
        let run_id = self.require_active_run()?;
        let local = self.save_path.join(file_name);

        write_csv(table, &local, strip_row_index)?;
        self.client.log_artifact(run_id, &local, artifact_subfolder)?;

        debug!(run_id, file = %local.display(), rows = table.num_rows(), "uploaded table");
        Ok(())
    }

    /// Log the existing file `<save_path>/<file_name>` to the active run
    /// under `artifact_subfolder` (root when `None`).
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArgument` without an active run, and
    /// propagates IO and tracking service errors
    pub fn upload_file(&self, file_name: &str, artifact_subfolder: Option<&str>) -> Result<()> {
        let run_id = self.require_active_run()?;
        let local = self.save_path.join(file_name);

        self.client.log_artifact(run_id, &local, artifact_subfolder)?;

        debug!(run_id, file = %local.display(), "uploaded file");
        Ok(())
    }

    fn require_active_run(&self) -> Result<&str> {
        self.active_run.as_deref().ok_or_else(|| {
            Error::InvalidArgument(
                "No active run; start one or set an active run before uploading".to_string(),
            )
        })
    }
}
