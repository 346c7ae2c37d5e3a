//! Document store backend client.
//!
//! This module provides:
//!
//! - `FileEntry` and `FileKind`: the files the store knows about
//! - `FileBackend`: the async seam the panel state machines talk through
//! - `HttpBackend`: reqwest implementation of the store's HTTP routes
//!
//! Routes consumed:
//!
//! - `GET /files` returns `{ files: [{ filename, type }] }`
//! - `POST /delete-file` with `{ filename }`, `{ error }` on failure
//! - `POST /summarize`, `/assess`, `/generate-podcast` with `{ filename, whole_file }`
//! - `POST /upload` multipart, field `file`

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::ActionKind;

/// User agent for API requests
const USER_AGENT: &str = concat!("DocPanel/", env!("CARGO_PKG_VERSION"));

/// Kind of file held by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Pdf,
    Podcast,
    /// Any type this client does not know; listed, but offers no actions
    #[serde(other)]
    Other,
}

impl FileKind {
    pub fn label(&self) -> &'static str {
        match self {
            FileKind::Pdf => "pdf",
            FileKind::Podcast => "podcast",
            FileKind::Other => "other",
        }
    }
}

/// A file known to the store. Identity is the filename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub filename: String,
    #[serde(rename = "type")]
    pub kind: FileKind,
}

impl FileEntry {
    pub fn new(filename: impl Into<String>, kind: FileKind) -> Self {
        Self {
            filename: filename.into(),
            kind,
        }
    }

    pub fn pdf(filename: impl Into<String>) -> Self {
        Self::new(filename, FileKind::Pdf)
    }

    pub fn podcast(filename: impl Into<String>) -> Self {
        Self::new(filename, FileKind::Podcast)
    }
}

/// Errors returned by backend calls
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// Request never got a response (DNS, refused, reset, timeout)
    #[error("Error connecting to server: {0}")]
    Connection(String),

    /// Backend answered with a non-success status
    #[error("Backend returned {status}{}", reason_suffix(.message))]
    Status { status: u16, message: Option<String> },

    /// Response body could not be decoded
    #[error("Invalid response from server: {0}")]
    Decode(String),

    /// Local file could not be read for upload
    #[error("IO error: {0}")]
    Io(String),
}

fn reason_suffix(message: &Option<String>) -> String {
    message.as_deref().map(|m| format!(": {m}")).unwrap_or_default()
}

impl BackendError {
    /// Message supplied by the backend in an `{ error }` body, if any
    pub fn reason(&self) -> Option<&str> {
        match self {
            BackendError::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, BackendError::Connection(_))
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            BackendError::Decode(e.to_string())
        } else {
            BackendError::Connection(e.to_string())
        }
    }
}

/// Body sent to the generation routes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionRequest {
    #[serde(skip)]
    pub kind: ActionKind,
    pub filename: String,
    pub whole_file: bool,
}

/// What a generation route returned
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ActionOutcome {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Deserialize)]
struct FileListResponse {
    files: Vec<FileEntry>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: Option<String>,
}

#[derive(Deserialize)]
struct UploadResponse {
    #[serde(default)]
    filename: Option<String>,
}

/// Async operations the panel needs from the document store.
///
/// Implementations are cloned into spawned tasks, so they must be cheap to
/// clone and `'static`.
pub trait FileBackend: Clone + Send + Sync + 'static {
    fn list_files(&self) -> impl Future<Output = Result<Vec<FileEntry>, BackendError>> + Send;

    fn delete_file(&self, filename: &str) -> impl Future<Output = Result<(), BackendError>> + Send;

    fn run_action(
        &self,
        request: ActionRequest,
    ) -> impl Future<Output = Result<ActionOutcome, BackendError>> + Send;

    /// Upload a local file, returning the stored filename
    fn upload_file(&self, path: &Path) -> impl Future<Output = Result<String, BackendError>> + Send;
}

/// HTTP client for the document store
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// Create a client for `base_url`. No request timeout unless one is given.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, route: &str) -> String {
        format!("{}{}", self.base_url, route)
    }

    /// Turn a non-success response into `BackendError::Status`, reading the
    /// `{ error }` body when there is one
    async fn status_error(response: reqwest::Response) -> BackendError {
        let status = response.status().as_u16();
        let message = response
            .json::<ErrorResponse>()
            .await
            .ok()
            .and_then(|body| body.error)
            .filter(|m| !m.is_empty());
        BackendError::Status { status, message }
    }
}

impl FileBackend for HttpBackend {
    async fn list_files(&self) -> Result<Vec<FileEntry>, BackendError> {
        let start = std::time::Instant::now();
        let response = self.client.get(self.url("/files")).send().await?;

        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        let body: FileListResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        tracing::debug!(
            "Fetched {} files in {:.1}s",
            body.files.len(),
            start.elapsed().as_secs_f32()
        );
        Ok(body.files)
    }

    async fn delete_file(&self, filename: &str) -> Result<(), BackendError> {
        let response = self
            .client
            .post(self.url("/delete-file"))
            .json(&serde_json::json!({ "filename": filename }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }
        Ok(())
    }

    async fn run_action(&self, request: ActionRequest) -> Result<ActionOutcome, BackendError> {
        let response = self
            .client
            .post(self.url(request.kind.route()))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        // Body is optional on success
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(ActionOutcome::default());
        }
        serde_json::from_str(&text).map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn upload_file(&self, path: &Path) -> Result<String, BackendError> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| BackendError::Io(format!("Not a file: {}", path.display())))?;
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| BackendError::Io(e.to_string()))?;

        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.clone());
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.url("/upload"))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        let body: Option<UploadResponse> = response.json().await.ok();
        Ok(body.and_then(|b| b.filename).unwrap_or(filename))
    }
}

/// Scripted in-memory backend for state machine tests
#[cfg(test)]
pub mod fake {
    use std::collections::VecDeque;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    use tokio::sync::oneshot;

    use super::*;

    #[derive(Default)]
    struct Inner {
        files: Vec<FileEntry>,
        list_error: Option<BackendError>,
        delete_error: Option<BackendError>,
        action_error: Option<BackendError>,
        list_gates: VecDeque<oneshot::Receiver<Result<Vec<FileEntry>, BackendError>>>,
        delete_gate: Option<oneshot::Receiver<()>>,
        action_gate: Option<oneshot::Receiver<()>>,
        calls: Vec<String>,
    }

    /// Backend whose responses are set up by the test.
    ///
    /// Gated calls stay pending until the test completes the matching sender.
    #[derive(Clone, Default)]
    pub struct FakeBackend {
        inner: Arc<Mutex<Inner>>,
    }

    impl FakeBackend {
        pub fn with_files(files: Vec<FileEntry>) -> Self {
            let backend = Self::default();
            backend.set_files(files);
            backend
        }

        pub fn set_files(&self, files: Vec<FileEntry>) {
            self.inner.lock().unwrap().files = files;
        }

        pub fn fail_list(&self, error: Option<BackendError>) {
            self.inner.lock().unwrap().list_error = error;
        }

        pub fn fail_delete(&self, error: Option<BackendError>) {
            self.inner.lock().unwrap().delete_error = error;
        }

        pub fn fail_action(&self, error: Option<BackendError>) {
            self.inner.lock().unwrap().action_error = error;
        }

        /// Queue a gate for the next `list_files` call
        pub fn gate_list(&self) -> oneshot::Sender<Result<Vec<FileEntry>, BackendError>> {
            let (tx, rx) = oneshot::channel();
            self.inner.lock().unwrap().list_gates.push_back(rx);
            tx
        }

        pub fn gate_delete(&self) -> oneshot::Sender<()> {
            let (tx, rx) = oneshot::channel();
            self.inner.lock().unwrap().delete_gate = Some(rx);
            tx
        }

        pub fn gate_action(&self) -> oneshot::Sender<()> {
            let (tx, rx) = oneshot::channel();
            self.inner.lock().unwrap().action_gate = Some(rx);
            tx
        }

        pub fn calls(&self) -> Vec<String> {
            self.inner.lock().unwrap().calls.clone()
        }

        pub fn count_calls(&self, prefix: &str) -> usize {
            self.calls().iter().filter(|c| c.starts_with(prefix)).count()
        }
    }

    impl FileBackend for FakeBackend {
        async fn list_files(&self) -> Result<Vec<FileEntry>, BackendError> {
            let gate = {
                let mut inner = self.inner.lock().unwrap();
                inner.calls.push("list".to_string());
                inner.list_gates.pop_front()
            };
            if let Some(gate) = gate {
                return gate
                    .await
                    .unwrap_or_else(|_| Err(BackendError::Connection("gate dropped".into())));
            }
            let inner = self.inner.lock().unwrap();
            match &inner.list_error {
                Some(e) => Err(e.clone()),
                None => Ok(inner.files.clone()),
            }
        }

        async fn delete_file(&self, filename: &str) -> Result<(), BackendError> {
            let gate = {
                let mut inner = self.inner.lock().unwrap();
                inner.calls.push(format!("delete:{filename}"));
                inner.delete_gate.take()
            };
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            let mut inner = self.inner.lock().unwrap();
            if let Some(e) = &inner.delete_error {
                return Err(e.clone());
            }
            inner.files.retain(|f| f.filename != filename);
            Ok(())
        }

        async fn run_action(&self, request: ActionRequest) -> Result<ActionOutcome, BackendError> {
            let gate = {
                let mut inner = self.inner.lock().unwrap();
                inner.calls.push(format!(
                    "action:{}:{}:{}",
                    request.kind.label(),
                    request.filename,
                    request.whole_file
                ));
                inner.action_gate.take()
            };
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            let mut inner = self.inner.lock().unwrap();
            if let Some(e) = &inner.action_error {
                return Err(e.clone());
            }
            if request.kind == ActionKind::Podcast {
                let stem = request.filename.trim_end_matches(".pdf");
                inner.files.push(FileEntry::podcast(format!("{stem}.mp3")));
            }
            Ok(ActionOutcome {
                message: Some(format!("{} done", request.kind.label())),
                output: None,
            })
        }

        async fn upload_file(&self, path: &Path) -> Result<String, BackendError> {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .ok_or_else(|| BackendError::Io("no file name".into()))?;
            let mut inner = self.inner.lock().unwrap();
            inner.calls.push(format!("upload:{name}"));
            if name.starts_with("bad") {
                return Err(BackendError::Status {
                    status: 400,
                    message: Some("unsupported file".to_string()),
                });
            }
            inner.files.push(FileEntry::pdf(name.clone()));
            Ok(name)
        }
    }
}
