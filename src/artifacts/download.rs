//! Download of run artifacts into per-run local directories

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::experiment::RunRecord;
use crate::folder::ensure_directory;
use crate::tracking::TrackingClient;
use crate::{Error, Result};

/// Downloads run artifacts to `<save_path>/<run_id>/`.
pub struct ArtifactDownloader<'c, C: TrackingClient + ?Sized> {
    client: &'c C,
}

impl<'c, C: TrackingClient + ?Sized> ArtifactDownloader<'c, C> {
    /// Create a downloader on top of a tracking client.
    #[must_use]
    pub const fn new(client: &'c C) -> Self {
        Self { client }
    }

    /// Download the artifacts of exactly one of `run` or `runs`.
    ///
    /// Each run gets `<save_path>/<run_id>/` (existing contents are kept).
    /// `artifact_subfolder` limits the download to that artifact path;
    /// otherwise the whole tree is fetched.
    ///
    /// A single `run` fails fast. For `runs`, a failing run is logged and
    /// skipped, and the returned mapping (run id to local directory) covers
    /// only the runs that succeeded.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArgument` unless exactly one of `run`/`runs` is
    /// given, and propagates any failure of a single-run download
    pub fn download(
        &self,
        save_path: impl AsRef<Path>,
        run: Option<&RunRecord>,
        runs: Option<&[RunRecord]>,
        artifact_subfolder: Option<&str>,
    ) -> Result<BTreeMap<String, PathBuf>> {
        match (run, runs) {
            (Some(run), None) => {
                let dir = self.download_run(save_path, run, artifact_subfolder)?;
                Ok(BTreeMap::from([(run.run_id().to_string(), dir)]))
            }
            (None, Some(runs)) => Ok(self.download_runs(save_path, runs, artifact_subfolder)),
            (Some(_), Some(_)) => Err(Error::InvalidArgument(
                "Provide either a run or a list of runs to download, not both".to_string(),
            )),
            (None, None) => Err(Error::InvalidArgument(
                "Provide either a run or a list of runs to download".to_string(),
            )),
        }
    }

    /// Download one run's artifacts and return its local directory.
    ///
    /// # Errors
    ///
    /// Propagates directory creation and tracking service errors
    pub fn download_run(
        &self,
        save_path: impl AsRef<Path>,
        run: &RunRecord,
        artifact_subfolder: Option<&str>,
    ) -> Result<PathBuf> {
        let dir = ensure_directory(save_path.as_ref().join(run.run_id()), false)?;
        self.client
            .download_artifacts(run.run_id(), artifact_subfolder.unwrap_or(""), &dir)?;
        info!(run_id = run.run_id(), dir = %dir.display(), "downloaded artifacts");
        Ok(dir)
    }

    /// Download many runs' artifacts, skipping runs that fail.
    pub fn download_runs(
        &self,
        save_path: impl AsRef<Path>,
        runs: &[RunRecord],
        artifact_subfolder: Option<&str>,
    ) -> BTreeMap<String, PathBuf> {
        let save_path = save_path.as_ref();
        let mut directories = BTreeMap::new();

        for run in runs {
            match self.download_run(save_path, run, artifact_subfolder) {
                Ok(dir) => {
                    directories.insert(run.run_id().to_string(), dir);
                }
                Err(e) => warn!(run_id = run.run_id(), error = %e, "artifact download failed, skipping run"),
            }
        }

        info!(requested = runs.len(), downloaded = directories.len(), "download complete");
        directories
    }
}
