#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, Once};
use std::time::Duration;

use async_trait::async_trait;
use editor_session::{AuthContext, EditorSession, ExecutionBackend, FileBackend, HostOps};
use runner_api::{FileRecord, RunOutput, RunRequest, RunResponse, RunnerApiError, StatusCode};

pub const TOKEN: &str = "tok-test";
pub const EMAIL: &str = "dev@example.com";

pub fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new("debug"))
            .with_test_writer()
            .try_init();
    });
}

#[derive(Debug, Clone)]
pub enum RunScript {
    Respond(RunResponse),
    Unreachable,
    Status(StatusCode),
}

impl RunScript {
    pub fn stdout(text: &str) -> Self {
        Self::Respond(RunResponse {
            error: None,
            run: Some(RunOutput {
                stdout: Some(text.to_string()),
                stderr: Some(String::new()),
            }),
        })
    }

    pub fn app_error(text: &str) -> Self {
        Self::Respond(RunResponse {
            error: Some(text.to_string()),
            run: None,
        })
    }
}

#[derive(Debug, Default)]
pub struct RunnerTrace {
    pub healthy: bool,
    pub run_script: VecDeque<RunScript>,
    pub run_delay: Option<Duration>,
    pub file_delay: Option<Duration>,

    pub health_calls: usize,
    pub run_calls: Vec<RunRequest>,
    pub list_calls: Vec<String>,
    pub upload_calls: Vec<(String, String, Vec<u8>)>,
    pub rename_calls: Vec<(String, String, String)>,
    pub download_calls: Vec<(String, String)>,

    pub files: Vec<FileRecord>,
    pub downloads: HashMap<String, Vec<u8>>,
    pub list_failure: Option<StatusCode>,
    pub upload_failure: Option<StatusCode>,
    /// Accept uploads without echoing the created record.
    pub upload_without_record: bool,
    pub rename_failure: Option<StatusCode>,
    pub download_failure: Option<StatusCode>,
}

/// Scripted runner service implementing both backend seams.
#[derive(Debug, Default)]
pub struct FakeRunner {
    state: Mutex<RunnerTrace>,
}

impl FakeRunner {
    pub fn healthy() -> Arc<Self> {
        let runner = Self::default();
        runner.trace().healthy = true;
        Arc::new(runner)
    }

    pub fn unhealthy() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn trace(&self) -> MutexGuard<'_, RunnerTrace> {
        lock_unpoisoned(&self.state)
    }

    pub fn with_files(self: Arc<Self>, files: Vec<FileRecord>) -> Arc<Self> {
        self.trace().files = files;
        self
    }

    pub fn push_run(&self, script: RunScript) {
        self.trace().run_script.push_back(script);
    }

    async fn file_pause(&self) {
        let delay = self.trace().file_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

fn status_error(status: StatusCode) -> RunnerApiError {
    RunnerApiError::Status(status, status.canonical_reason().unwrap_or("error").to_string())
}

#[async_trait]
impl ExecutionBackend for FakeRunner {
    async fn health(&self) -> Result<(), RunnerApiError> {
        let mut trace = self.trace();
        trace.health_calls += 1;
        if trace.healthy {
            Ok(())
        } else {
            Err(RunnerApiError::Unreachable("connection refused".to_string()))
        }
    }

    async fn run(&self, request: &RunRequest) -> Result<RunResponse, RunnerApiError> {
        let (script, delay) = {
            let mut trace = self.trace();
            trace.run_calls.push(request.clone());
            (trace.run_script.pop_front(), trace.run_delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match script.unwrap_or_else(|| RunScript::stdout("")) {
            RunScript::Respond(response) => Ok(response),
            RunScript::Unreachable => Err(RunnerApiError::Unreachable("connection reset".to_string())),
            RunScript::Status(status) => Err(status_error(status)),
        }
    }
}

#[async_trait]
impl FileBackend for FakeRunner {
    async fn list_files(&self, token: &str) -> Result<Vec<FileRecord>, RunnerApiError> {
        self.file_pause().await;
        let mut trace = self.trace();
        trace.list_calls.push(token.to_string());
        match trace.list_failure {
            Some(status) => Err(status_error(status)),
            None => Ok(trace.files.clone()),
        }
    }

    async fn upload_file(
        &self,
        token: &str,
        filename: &str,
        content: Vec<u8>,
    ) -> Result<Option<FileRecord>, RunnerApiError> {
        self.file_pause().await;
        let mut trace = self.trace();
        trace
            .upload_calls
            .push((token.to_string(), filename.to_string(), content));
        if let Some(status) = trace.upload_failure {
            return Err(status_error(status));
        }
        let record = FileRecord::new(format!("file-{}", trace.files.len() + 1), filename)
            .with_uploaded_at("2026-10-16T14:30:00Z");
        trace.files.push(record.clone());
        if trace.upload_without_record {
            return Ok(None);
        }
        Ok(Some(record))
    }

    async fn rename_file(
        &self,
        token: &str,
        file_id: &str,
        filename: &str,
    ) -> Result<FileRecord, RunnerApiError> {
        self.file_pause().await;
        let mut trace = self.trace();
        trace
            .rename_calls
            .push((token.to_string(), file_id.to_string(), filename.to_string()));
        if let Some(status) = trace.rename_failure {
            return Err(status_error(status));
        }
        let Some(record) = trace.files.iter_mut().find(|record| record.id == file_id) else {
            return Err(status_error(StatusCode::NOT_FOUND));
        };
        record.filename = filename.to_string();
        Ok(record.clone())
    }

    async fn download_file(&self, token: &str, file_id: &str) -> Result<Vec<u8>, RunnerApiError> {
        self.file_pause().await;
        let mut trace = self.trace();
        trace
            .download_calls
            .push((token.to_string(), file_id.to_string()));
        if let Some(status) = trace.download_failure {
            return Err(status_error(status));
        }
        trace
            .downloads
            .get(file_id)
            .cloned()
            .ok_or_else(|| status_error(StatusCode::NOT_FOUND))
    }
}

#[derive(Debug, Default)]
pub struct HostSpy {
    pub redirects: Mutex<usize>,
    pub saved: Mutex<Vec<(String, Vec<u8>)>>,
    pub reject_downloads: Mutex<Option<String>>,
}

impl HostSpy {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn redirect_count(&self) -> usize {
        *lock_unpoisoned(&self.redirects)
    }

    pub fn saved(&self) -> Vec<(String, Vec<u8>)> {
        lock_unpoisoned(&self.saved).clone()
    }
}

impl HostOps for HostSpy {
    fn redirect_to_login(&self) {
        *lock_unpoisoned(&self.redirects) += 1;
    }

    fn save_download(&self, filename: &str, content: &[u8]) -> Result<(), String> {
        if let Some(message) = lock_unpoisoned(&self.reject_downloads).clone() {
            return Err(message);
        }
        lock_unpoisoned(&self.saved).push((filename.to_string(), content.to_vec()));
        Ok(())
    }
}

pub fn build_session(
    runner: &Arc<FakeRunner>,
    auth: AuthContext,
    host: &Arc<HostSpy>,
    execution_timeout: Option<Duration>,
) -> EditorSession {
    init_tracing();
    EditorSession::new(
        Arc::clone(runner) as Arc<dyn ExecutionBackend>,
        Arc::clone(runner) as Arc<dyn FileBackend>,
        Arc::new(auth),
        Arc::clone(host) as Arc<dyn HostOps>,
        execution_timeout,
    )
}

pub fn signed_in() -> AuthContext {
    AuthContext::with_identity(EMAIL, TOKEN)
}

pub fn sample_files() -> Vec<FileRecord> {
    vec![
        FileRecord::new("f1", "main.py").with_uploaded_at("2026-10-16T14:30:00Z"),
        FileRecord::new("f2", "notes.js"),
    ]
}
