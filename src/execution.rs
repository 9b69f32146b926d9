//! Execution request/response state machine.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use runner_api::{RunRequest, RunResponse, RunnerApiError};
use tracing::{debug, info, warn};

use crate::backend::ExecutionBackend;
use crate::connection::ConnectionMonitor;
use crate::error::SessionError;
use crate::sync::lock_unpoisoned;

pub const BACKEND_NOT_RUNNING: &str = "Backend server is not running.";
pub const BACKEND_UNREACHABLE: &str = "Failed to connect to backend server.";
pub const NO_OUTPUT_SENTINEL: &str = "Code executed successfully with no output";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub language_id: String,
    pub source_text: String,
}

impl ExecutionRequest {
    pub fn new(language_id: impl Into<String>, source_text: impl Into<String>) -> Self {
        Self {
            language_id: language_id.into(),
            source_text: source_text.into(),
        }
    }

    fn to_wire(&self) -> RunRequest {
        RunRequest::new(self.language_id.clone(), self.source_text.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult {
    Success(String),
    /// Compile or runtime error text from the runner.
    ApplicationError(String),
    TransportError,
}

impl ExecutionResult {
    /// Text for the output pane; empty on failure.
    pub fn output(&self) -> &str {
        match self {
            Self::Success(output) => output,
            Self::ApplicationError(_) | Self::TransportError => "",
        }
    }

    /// Text for the error pane; `None` on success.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::ApplicationError(message) => Some(message),
            Self::TransportError => Some(BACKEND_UNREACHABLE),
        }
    }

    pub fn status(&self) -> ExecutionStatus {
        match self {
            Self::Success(_) => ExecutionStatus::Succeeded,
            Self::ApplicationError(_) | Self::TransportError => ExecutionStatus::Failed,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionStatus {
    #[default]
    Idle,
    Running,
    Succeeded,
    Failed,
}

impl ExecutionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// Maps a decoded `/run` body to a result.
///
/// A non-empty `error` wins over any output. Otherwise stdout and stderr are
/// joined with no separator; when both are blank the no-output sentinel is
/// returned.
pub fn interpret_response(response: RunResponse) -> ExecutionResult {
    if let Some(error) = response.error.filter(|error| !error.is_empty()) {
        return ExecutionResult::ApplicationError(error);
    }

    let (stdout, stderr) = match &response.run {
        Some(run) => (run.stdout(), run.stderr()),
        None => ("", ""),
    };

    if stdout.trim().is_empty() && stderr.trim().is_empty() {
        return ExecutionResult::Success(NO_OUTPUT_SENTINEL.to_string());
    }

    let mut output = String::with_capacity(stdout.len() + stderr.len());
    output.push_str(stdout);
    output.push_str(stderr);
    ExecutionResult::Success(output)
}

/// Proof that [`ExecutionOrchestrator::begin`] moved the status to Running.
#[derive(Debug)]
#[must_use]
pub struct ExecutionTicket {
    _private: (),
}

pub struct ExecutionOrchestrator {
    backend: Arc<dyn ExecutionBackend>,
    status: Mutex<ExecutionStatus>,
    timeout: Option<Duration>,
}

impl ExecutionOrchestrator {
    pub fn new(backend: Arc<dyn ExecutionBackend>, timeout: Option<Duration>) -> Self {
        Self {
            backend,
            status: Mutex::new(ExecutionStatus::Idle),
            timeout,
        }
    }

    pub fn status(&self) -> ExecutionStatus {
        *lock_unpoisoned(&self.status)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Claims the Running state.
    ///
    /// Fails without a network call when the service is not known to be
    /// connected, or while another execution is running. A terminal status
    /// left from the previous run is settled first.
    pub fn begin(&self, connection: &ConnectionMonitor) -> Result<ExecutionTicket, SessionError> {
        let mut status = lock_unpoisoned(&self.status);
        if *status == ExecutionStatus::Running {
            return Err(SessionError::ExecutionInFlight);
        }
        if !connection.is_connected() {
            *status = ExecutionStatus::Idle;
            debug!(connection = ?connection.status(), "execution gated on connection");
            return Err(SessionError::Connection(BACKEND_NOT_RUNNING.to_string()));
        }

        *status = ExecutionStatus::Running;
        Ok(ExecutionTicket { _private: () })
    }

    /// Sends the request and records the terminal status.
    pub async fn complete(
        &self,
        ticket: ExecutionTicket,
        request: &ExecutionRequest,
        connection: &ConnectionMonitor,
    ) -> ExecutionResult {
        let _ = ticket;
        let wire = request.to_wire();
        info!(language = %request.language_id, "execution started");

        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, self.backend.run(&wire)).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(timeout_ms = limit.as_millis() as u64, "execution timed out");
                    Err(RunnerApiError::Unreachable(format!(
                        "no response within {}ms",
                        limit.as_millis()
                    )))
                }
            },
            None => self.backend.run(&wire).await,
        };

        let result = match outcome {
            Ok(response) => interpret_response(response),
            Err(error) => {
                warn!(%error, "execution transport failure");
                connection.mark_disconnected();
                ExecutionResult::TransportError
            }
        };

        *lock_unpoisoned(&self.status) = result.status();
        info!(status = ?result.status(), "execution finished");
        result
    }

    pub async fn submit(
        &self,
        request: &ExecutionRequest,
        connection: &ConnectionMonitor,
    ) -> Result<ExecutionResult, SessionError> {
        let ticket = self.begin(connection)?;
        Ok(self.complete(ticket, request, connection).await)
    }

    /// Releases a ticket without sending anything.
    pub fn abandon(&self, ticket: ExecutionTicket) {
        let _ = ticket;
        *lock_unpoisoned(&self.status) = ExecutionStatus::Idle;
    }

    /// Returns a terminal status to Idle. No effect while Running.
    pub fn settle(&self) {
        let mut status = lock_unpoisoned(&self.status);
        if status.is_terminal() {
            *status = ExecutionStatus::Idle;
        }
    }
}
