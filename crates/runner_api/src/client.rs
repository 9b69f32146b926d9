use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::config::RunnerApiConfig;
use crate::error::{parse_error_message, RunnerApiError};
use crate::headers::{build_headers, ACCEPT_ANY, ACCEPT_JSON};
use crate::payload::{
    FileListResponse, FileRecord, FileRecordResponse, RenameRequest, RunRequest, RunResponse,
};
use crate::url::{endpoint_url, Endpoint};

/// Multipart field name the upload endpoint reads the file from.
pub const UPLOAD_FIELD: &str = "file";
const UPLOAD_MIME: &str = "text/plain";

#[derive(Debug, Clone)]
pub struct RunnerApiClient {
    http: Client,
    config: RunnerApiConfig,
}

impl RunnerApiClient {
    pub fn new(config: RunnerApiConfig) -> Result<Self, RunnerApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(RunnerApiError::from)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &RunnerApiConfig {
        &self.config
    }

    pub fn endpoint_url(&self, endpoint: &Endpoint<'_>) -> Result<Url, RunnerApiError> {
        endpoint_url(&self.config.base_url, endpoint)
    }

    pub fn build_headers(
        &self,
        bearer_token: Option<&str>,
        accept: &str,
    ) -> Result<HeaderMap, RunnerApiError> {
        let headers = build_headers(&self.config, bearer_token, accept)?;
        let mut out = HeaderMap::new();
        for (key, value) in headers {
            out.insert(
                HeaderName::from_bytes(key.as_bytes())
                    .map_err(|_| RunnerApiError::InvalidHeader(format!("invalid header key: {key}")))?,
                HeaderValue::from_str(&value).map_err(|_| {
                    RunnerApiError::InvalidHeader(format!("invalid header value for {key}"))
                })?,
            );
        }
        Ok(out)
    }

    fn request(
        &self,
        endpoint: Endpoint<'_>,
        bearer_token: Option<&str>,
        accept: &str,
    ) -> Result<RequestBuilder, RunnerApiError> {
        if endpoint.requires_auth() && bearer_token.is_none() {
            return Err(RunnerApiError::MissingBearerToken);
        }

        let url = self.endpoint_url(&endpoint)?;
        let headers = self.build_headers(bearer_token, accept)?;
        Ok(self.http.request(endpoint.method(), url).headers(headers))
    }

    pub fn build_health_request(&self) -> Result<RequestBuilder, RunnerApiError> {
        let mut builder = self.request(Endpoint::Health, None, ACCEPT_ANY)?;
        if let Some(timeout) = self.config.health_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(builder)
    }

    pub fn build_run_request(&self, request: &RunRequest) -> Result<RequestBuilder, RunnerApiError> {
        Ok(self.request(Endpoint::Run, None, ACCEPT_JSON)?.json(request))
    }

    pub fn build_list_request(&self, bearer_token: &str) -> Result<RequestBuilder, RunnerApiError> {
        self.request(Endpoint::Files, Some(bearer_token), ACCEPT_JSON)
    }

    pub fn build_upload_request(
        &self,
        bearer_token: &str,
        filename: &str,
        content: Vec<u8>,
    ) -> Result<RequestBuilder, RunnerApiError> {
        let part = Part::bytes(content)
            .file_name(filename.to_owned())
            .mime_str(UPLOAD_MIME)
            .map_err(RunnerApiError::from)?;
        let form = Form::new().part(UPLOAD_FIELD, part);
        Ok(self
            .request(Endpoint::Upload, Some(bearer_token), ACCEPT_JSON)?
            .multipart(form))
    }

    pub fn build_rename_request(
        &self,
        bearer_token: &str,
        file_id: &str,
        filename: &str,
    ) -> Result<RequestBuilder, RunnerApiError> {
        Ok(self
            .request(Endpoint::Rename { file_id }, Some(bearer_token), ACCEPT_JSON)?
            .json(&RenameRequest { filename }))
    }

    pub fn build_download_request(
        &self,
        bearer_token: &str,
        file_id: &str,
    ) -> Result<RequestBuilder, RunnerApiError> {
        self.request(Endpoint::Download { file_id }, Some(bearer_token), ACCEPT_ANY)
    }

    /// Succeeds only on a 2xx health response.
    pub async fn health(&self) -> Result<(), RunnerApiError> {
        let response = self.build_health_request()?.send().await?;
        expect_success(response).await.map(|_| ())
    }

    /// Submits source for execution.
    ///
    /// The body is decoded whatever the HTTP status: the service reports
    /// compile and runtime failures in the `error` field of the payload.
    pub async fn run(&self, request: &RunRequest) -> Result<RunResponse, RunnerApiError> {
        let response = self.build_run_request(request)?.send().await?;
        debug!(status = %response.status(), language = %request.language, "run response received");
        decode_json(response).await
    }

    pub async fn list_files(&self, bearer_token: &str) -> Result<Vec<FileRecord>, RunnerApiError> {
        let response = self.build_list_request(bearer_token)?.send().await?;
        let response = expect_success(response).await?;
        let listing: FileListResponse = decode_json(response).await?;
        Ok(listing.into_files())
    }

    pub async fn upload_file(
        &self,
        bearer_token: &str,
        filename: &str,
        content: Vec<u8>,
    ) -> Result<Option<FileRecord>, RunnerApiError> {
        let response = self
            .build_upload_request(bearer_token, filename, content)?
            .send()
            .await?;
        let response = expect_success(response).await?;
        Ok(acknowledged_record(response).await)
    }

    pub async fn rename_file(
        &self,
        bearer_token: &str,
        file_id: &str,
        filename: &str,
    ) -> Result<FileRecord, RunnerApiError> {
        let response = self
            .build_rename_request(bearer_token, file_id, filename)?
            .send()
            .await?;
        let response = expect_success(response).await?;
        Ok(acknowledged_record(response)
            .await
            .unwrap_or_else(|| FileRecord::new(file_id, filename)))
    }

    pub async fn download_file(
        &self,
        bearer_token: &str,
        file_id: &str,
    ) -> Result<Vec<u8>, RunnerApiError> {
        let response = self
            .build_download_request(bearer_token, file_id)?
            .send()
            .await?;
        let response = expect_success(response).await?;
        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }
}

async fn expect_success(response: Response) -> Result<Response, RunnerApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = parse_error_message(status, &body);
    debug!(%status, %message, "runner request rejected");
    Err(RunnerApiError::Status(status, message))
}

/// Reads the body of an accepted mutation. The change is already applied
/// once the status is 2xx, so a body that is not a file record yields `None`
/// instead of an error.
async fn acknowledged_record(response: Response) -> Option<FileRecord> {
    let bytes = match response.bytes().await {
        Ok(bytes) => bytes,
        Err(error) => {
            debug!(%error, "mutation acknowledged without a readable body");
            return None;
        }
    };
    match serde_json::from_slice::<FileRecordResponse>(&bytes) {
        Ok(record) => Some(record.into_record()),
        Err(error) => {
            debug!(%error, "mutation acknowledged without a file record");
            None
        }
    }
}

async fn decode_json<T>(response: Response) -> Result<T, RunnerApiError>
where
    T: DeserializeOwned,
{
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(RunnerApiError::from)
}
