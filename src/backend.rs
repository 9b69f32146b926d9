//! Seams between the session core and the runner service.
//!
//! [`RunnerApiClient`] implements both traits; tests substitute scripted
//! backends.

use async_trait::async_trait;
use runner_api::{FileRecord, RunRequest, RunResponse, RunnerApiClient, RunnerApiError};

#[async_trait]
pub trait ExecutionBackend: Send + Sync + 'static {
    /// `Ok` only for a 2xx health response.
    async fn health(&self) -> Result<(), RunnerApiError>;

    async fn run(&self, request: &RunRequest) -> Result<RunResponse, RunnerApiError>;
}

#[async_trait]
pub trait FileBackend: Send + Sync + 'static {
    async fn list_files(&self, token: &str) -> Result<Vec<FileRecord>, RunnerApiError>;

    /// `None` when the store accepted the file without echoing a record.
    async fn upload_file(
        &self,
        token: &str,
        filename: &str,
        content: Vec<u8>,
    ) -> Result<Option<FileRecord>, RunnerApiError>;

    async fn rename_file(
        &self,
        token: &str,
        file_id: &str,
        filename: &str,
    ) -> Result<FileRecord, RunnerApiError>;

    async fn download_file(&self, token: &str, file_id: &str) -> Result<Vec<u8>, RunnerApiError>;
}

#[async_trait]
impl ExecutionBackend for RunnerApiClient {
    async fn health(&self) -> Result<(), RunnerApiError> {
        RunnerApiClient::health(self).await
    }

    async fn run(&self, request: &RunRequest) -> Result<RunResponse, RunnerApiError> {
        RunnerApiClient::run(self, request).await
    }
}

#[async_trait]
impl FileBackend for RunnerApiClient {
    async fn list_files(&self, token: &str) -> Result<Vec<FileRecord>, RunnerApiError> {
        RunnerApiClient::list_files(self, token).await
    }

    async fn upload_file(
        &self,
        token: &str,
        filename: &str,
        content: Vec<u8>,
    ) -> Result<Option<FileRecord>, RunnerApiError> {
        RunnerApiClient::upload_file(self, token, filename, content).await
    }

    async fn rename_file(
        &self,
        token: &str,
        file_id: &str,
        filename: &str,
    ) -> Result<FileRecord, RunnerApiError> {
        RunnerApiClient::rename_file(self, token, file_id, filename).await
    }

    async fn download_file(&self, token: &str, file_id: &str) -> Result<Vec<u8>, RunnerApiError> {
        RunnerApiClient::download_file(self, token, file_id).await
    }
}
