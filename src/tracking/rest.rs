//! MLflow REST adapter (API 2.0), blocking.
//!
//! Downloads go through the server's `get-artifact` endpoint, so they work
//! for any artifact store the server can read. Uploads need either the
//! artifact proxy (`mlflow-artifacts:` roots) or a local artifact root.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Url;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use super::{artifact_file_name, local_artifact_path, TrackingClient};
use crate::config::ClientConfig;
use crate::experiment::wire::{de_opt_i64, de_opt_millis};
use crate::experiment::{
    join_artifact_path, ArtifactRecord, ExperimentRecord, LifecycleStage, MetricRecord, RunInfo,
    RunRecord, RunStatus, ViewType, PARENT_RUN_ID_TAG, RUN_NAME_TAG,
};
use crate::{Error, Result};

/// Page size for experiment and run searches.
const SEARCH_PAGE_SIZE: u32 = 1000;

const ARTIFACT_PROXY_SCHEME: &str = "mlflow-artifacts:";

/// Blocking client for an MLflow tracking server.
#[derive(Debug, Clone)]
pub struct RestTrackingClient {
    http: Client,
    base_url: Url,
}

impl RestTrackingClient {
    /// Create a client from an explicit config.
    ///
    /// # Errors
    ///
    /// Returns error if the tracking URI is not a valid URL or the HTTP
    /// client cannot be built
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let base_url = Url::parse(config.tracking_uri()).map_err(|e| {
            Error::Config(format!("Invalid tracking URI '{}': {e}", config.tracking_uri()))
        })?;

        let mut headers = HeaderMap::new();
        if let Some(token) = config.token() {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| Error::Config("Invalid tracking token format".to_string()))?;
            headers.insert(AUTHORIZATION, value);
        }

        let http = Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { http, base_url })
    }

    /// Create a client for a tracking URI with default settings.
    ///
    /// # Errors
    ///
    /// See [`RestTrackingClient::new`]
    pub fn with_tracking_uri(tracking_uri: impl Into<String>) -> Result<Self> {
        let config = ClientConfig::builder().tracking_uri(tracking_uri).build()?;
        Self::new(&config)
    }

    /// Create a client from the `MLFLOW_*` environment variables.
    ///
    /// # Errors
    ///
    /// See [`ClientConfig::from_env`] and [`RestTrackingClient::new`]
    pub fn from_env() -> Result<Self> {
        Self::new(&ClientConfig::from_env()?)
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::Config(format!("Tracking URI '{}' cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(segments.iter().flat_map(|s| s.split('/')).filter(|s| !s.is_empty()));
        Ok(url)
    }

    fn api_url(&self, endpoint: &str) -> Result<Url> {
        self.url(&["api/2.0/mlflow", endpoint])
    }

    fn get<T: DeserializeOwned>(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = self.api_url(endpoint)?;
        debug!(%url, "GET");
        let response = self.http.get(url).query(query).send()?;
        Ok(check(response)?.json()?)
    }

    fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, endpoint: &str, body: &B) -> Result<T> {
        let url = self.api_url(endpoint)?;
        debug!(%url, "POST");
        let response = self.http.post(url).json(body).send()?;
        Ok(check(response)?.json()?)
    }

    fn download_file(&self, run_id: &str, artifact_path: &str, dst: &Path) -> Result<PathBuf> {
        let target = local_artifact_path(dst, artifact_path)?;
        let url = self.url(&["get-artifact"])?;
        debug!(%url, artifact_path, "GET artifact");
        let response = self
            .http
            .get(url)
            .query(&[("path", artifact_path), ("run_uuid", run_id)])
            .send()?;
        let bytes = check(response)?.bytes()?;

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, &bytes)?;
        Ok(target)
    }

    fn download_tree(&self, run_id: &str, path: &str, dst: &Path) -> Result<()> {
        let entries = self.list_artifacts(run_id, path)?;
        if entries.is_empty() && !path.is_empty() {
            // Listing a file path yields nothing; fetch it directly
            self.download_file(run_id, path, dst)?;
            return Ok(());
        }

        for entry in entries {
            if entry.is_dir() {
                self.download_tree(run_id, entry.path(), dst)?;
            } else {
                self.download_file(run_id, entry.path(), dst)?;
            }
        }
        Ok(())
    }
}

impl TrackingClient for RestTrackingClient {
    fn list_experiments(&self, view: ViewType) -> Result<Vec<ExperimentRecord>> {
        let mut experiments = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut body = json!({ "view_type": view, "max_results": SEARCH_PAGE_SIZE });
            if let Some(token) = &page_token {
                body["page_token"] = json!(token);
            }

            let page: SearchExperimentsResponse = self.post("experiments/search", &body)?;
            experiments.extend(page.experiments.into_iter().map(WireExperiment::into_record));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(experiments)
    }

    fn create_experiment(&self, name: &str) -> Result<String> {
        let created: CreateExperimentResponse =
            self.post("experiments/create", &json!({ "name": name }))?;
        Ok(created.experiment_id)
    }

    fn set_experiment_tag(&self, experiment_id: &str, key: &str, value: &str) -> Result<()> {
        let _: IgnoredAny = self.post(
            "experiments/set-experiment-tag",
            &json!({ "experiment_id": experiment_id, "key": key, "value": value }),
        )?;
        Ok(())
    }

    fn list_run_infos(&self, experiment_id: &str, view: ViewType) -> Result<Vec<RunInfo>> {
        let mut infos = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut body = json!({
                "experiment_ids": [experiment_id],
                "run_view_type": view,
                "max_results": SEARCH_PAGE_SIZE,
                "order_by": ["attributes.start_time ASC"],
            });
            if let Some(token) = &page_token {
                body["page_token"] = json!(token);
            }

            let page: SearchRunsResponse = self.post("runs/search", &body)?;
            infos.extend(page.runs.into_iter().map(|run| run.info.into_info()));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(infos)
    }

    fn get_run(&self, run_id: &str) -> Result<RunRecord> {
        let response: RunResponse = self.get("runs/get", &[("run_id", run_id)])?;
        Ok(response.run.into_record())
    }

    fn delete_run(&self, run_id: &str) -> Result<()> {
        let _: IgnoredAny = self.post("runs/delete", &json!({ "run_id": run_id }))?;
        Ok(())
    }

    fn create_run(
        &self,
        experiment_id: &str,
        run_name: &str,
        parent_run_id: Option<&str>,
    ) -> Result<RunRecord> {
        let mut tags = vec![json!({ "key": RUN_NAME_TAG, "value": run_name })];
        if let Some(parent) = parent_run_id {
            tags.push(json!({ "key": PARENT_RUN_ID_TAG, "value": parent }));
        }

        let response: RunResponse = self.post(
            "runs/create",
            &json!({
                "experiment_id": experiment_id,
                "run_name": run_name,
                "start_time": Utc::now().timestamp_millis(),
                "tags": tags,
            }),
        )?;
        Ok(response.run.into_record())
    }

    fn set_terminated(&self, run_id: &str, status: RunStatus) -> Result<()> {
        let _: IgnoredAny = self.post(
            "runs/update",
            &json!({
                "run_id": run_id,
                "status": status,
                "end_time": Utc::now().timestamp_millis(),
            }),
        )?;
        Ok(())
    }

    fn log_metric(&self, run_id: &str, key: &str, value: f64, step: i64) -> Result<()> {
        let _: IgnoredAny = self.post(
            "runs/log-metric",
            &json!({
                "run_id": run_id,
                "key": key,
                "value": value,
                "timestamp": Utc::now().timestamp_millis(),
                "step": step,
            }),
        )?;
        Ok(())
    }

    fn set_tag(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
        let _: IgnoredAny = self.post(
            "runs/set-tag",
            &json!({ "run_id": run_id, "key": key, "value": value }),
        )?;
        Ok(())
    }

    fn list_artifacts(&self, run_id: &str, path: &str) -> Result<Vec<ArtifactRecord>> {
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("run_id", run_id), ("path", path)];
            if let Some(token) = &page_token {
                query.push(("page_token", token.as_str()));
            }

            let page: ListArtifactsResponse = self.get("artifacts/list", &query)?;
            files.extend(page.files);

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(files)
    }

    fn download_artifacts(&self, run_id: &str, path: &str, dst: &Path) -> Result<PathBuf> {
        let path = path.trim_matches('/');
        let local = local_artifact_path(dst, path)?;
        self.download_tree(run_id, path, dst)?;
        Ok(local)
    }

    fn log_artifact(
        &self,
        run_id: &str,
        local_path: &Path,
        artifact_path: Option<&str>,
    ) -> Result<()> {
        let file_name = artifact_file_name(local_path)?;
        let relative = join_artifact_path(artifact_path.unwrap_or(""), &file_name);

        let run = self.get_run(run_id)?;
        let root = run.artifact_uri().ok_or_else(|| {
            Error::InvalidArgument(format!("Run '{run_id}' reports no artifact root"))
        })?;

        match ArtifactRoot::parse(root) {
            ArtifactRoot::Proxied(prefix) => {
                let url = self.url(&[
                    "api/2.0/mlflow-artifacts/artifacts",
                    prefix.as_str(),
                    relative.as_str(),
                ])?;
                debug!(%url, "PUT artifact");
                let bytes = fs::read(local_path)?;
                let response = self.http.put(url).body(bytes).send()?;
                check(response)?;
                Ok(())
            }
            ArtifactRoot::Local(dir) => {
                let target = local_artifact_path(&dir, &relative)?;
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::copy(local_path, &target)?;
                Ok(())
            }
            ArtifactRoot::Unsupported(uri) => Err(Error::InvalidArgument(format!(
                "Artifact root '{uri}' is neither served by the tracking server nor local"
            ))),
        }
    }
}

/// Where a run's artifacts live, as far as uploads are concerned.
#[derive(Debug, PartialEq, Eq)]
enum ArtifactRoot {
    /// Path below the server's artifact proxy
    Proxied(String),
    /// Directory on this machine
    Local(PathBuf),
    Unsupported(String),
}

impl ArtifactRoot {
    fn parse(uri: &str) -> Self {
        if let Some(rest) = uri.strip_prefix(ARTIFACT_PROXY_SCHEME) {
            // mlflow-artifacts://host:port/path or mlflow-artifacts:/path
            let path = rest
                .strip_prefix("//")
                .map_or(rest, |authority| authority.find('/').map_or("", |i| &authority[i..]));
            return Self::Proxied(path.trim_matches('/').to_string());
        }
        if let Some(path) = uri.strip_prefix("file://") {
            return Self::Local(PathBuf::from(path));
        }
        if Path::new(uri).is_absolute() {
            return Self::Local(PathBuf::from(uri));
        }
        Self::Unsupported(uri.to_string())
    }
}

fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().unwrap_or_default();
    let (error_code, message) = match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(err) => (err.error_code, err.message),
        Err(_) => (format!("HTTP_{}", status.as_u16()), body),
    };

    Err(Error::Service {
        status: status.as_u16(),
        error_code,
        message,
    })
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error_code: String,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct CreateExperimentResponse {
    experiment_id: String,
}

#[derive(Deserialize)]
struct SearchExperimentsResponse {
    #[serde(default)]
    experiments: Vec<WireExperiment>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct SearchRunsResponse {
    #[serde(default)]
    runs: Vec<WireRun>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct RunResponse {
    run: WireRun,
}

#[derive(Deserialize)]
struct ListArtifactsResponse {
    #[serde(default)]
    files: Vec<ArtifactRecord>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct WireTag {
    key: String,
    #[serde(default)]
    value: String,
}

#[derive(Deserialize)]
struct WireExperiment {
    experiment_id: String,
    name: String,
    #[serde(default)]
    artifact_location: Option<String>,
    #[serde(default)]
    lifecycle_stage: Option<LifecycleStage>,
    #[serde(default)]
    tags: Vec<WireTag>,
}

impl WireExperiment {
    fn into_record(self) -> ExperimentRecord {
        let mut builder = ExperimentRecord::builder(self.experiment_id, self.name)
            .lifecycle_stage(self.lifecycle_stage.unwrap_or_default());
        if let Some(location) = self.artifact_location {
            builder = builder.artifact_location(location);
        }
        self.tags
            .into_iter()
            .fold(builder, |b, tag| b.tag(tag.key, tag.value))
            .build()
    }
}

#[derive(Deserialize)]
struct WireRun {
    info: WireRunInfo,
    #[serde(default)]
    data: WireRunData,
}

#[derive(Deserialize)]
struct WireRunInfo {
    run_id: String,
    #[serde(default)]
    experiment_id: String,
    #[serde(default)]
    status: Option<RunStatus>,
    #[serde(default, deserialize_with = "de_opt_millis")]
    start_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "de_opt_millis")]
    end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    artifact_uri: Option<String>,
    #[serde(default)]
    lifecycle_stage: Option<LifecycleStage>,
}

impl WireRunInfo {
    fn into_info(self) -> RunInfo {
        RunInfo::new(
            self.run_id,
            self.lifecycle_stage.unwrap_or_default(),
            self.start_time,
        )
    }
}

#[derive(Deserialize, Default)]
struct WireRunData {
    #[serde(default)]
    metrics: Vec<WireMetric>,
    #[serde(default)]
    params: Vec<WireTag>,
    #[serde(default)]
    tags: Vec<WireTag>,
}

#[derive(Deserialize)]
struct WireMetric {
    key: String,
    #[serde(default)]
    value: serde_json::Value,
    #[serde(default, deserialize_with = "de_opt_millis")]
    timestamp: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "de_opt_i64")]
    step: Option<i64>,
}

impl WireRun {
    fn into_record(self) -> RunRecord {
        let info = self.info;
        let mut builder = RunRecord::builder(info.run_id, info.experiment_id)
            .lifecycle_stage(info.lifecycle_stage.unwrap_or_default())
            .status(info.status.unwrap_or_default());
        if let Some(start) = info.start_time {
            builder = builder.start_time(start);
        }
        if let Some(end) = info.end_time {
            builder = builder.end_time(end);
        }
        if let Some(uri) = info.artifact_uri {
            builder = builder.artifact_uri(uri);
        }

        for metric in self.data.metrics {
            let mut record = MetricRecord::builder(metric.key, metric.value)
                .step(metric.step.unwrap_or_default());
            if let Some(ts) = metric.timestamp {
                record = record.timestamp(ts);
            }
            builder = builder.metric(record.build());
        }
        for param in self.data.params {
            builder = builder.param(param.key, param.value);
        }
        for tag in self.data.tags {
            builder = builder.tag(tag.key, tag.value);
        }

        builder.build()
    }
}
