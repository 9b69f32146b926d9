use reqwest::Method;
use url::Url;

use crate::error::RunnerApiError;

/// Default base URL for runner service requests.
pub const DEFAULT_RUNNER_BASE_URL: &str = "https://api.server.buddycode.online";

/// Runner service endpoints addressed by this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint<'a> {
    Health,
    Run,
    Files,
    Upload,
    Rename { file_id: &'a str },
    Download { file_id: &'a str },
}

impl<'a> Endpoint<'a> {
    pub fn method(&self) -> Method {
        match self {
            Self::Health | Self::Files | Self::Download { .. } => Method::GET,
            Self::Run | Self::Upload => Method::POST,
            Self::Rename { .. } => Method::PUT,
        }
    }

    /// Unescaped path segments; ids are percent-encoded when joined.
    pub fn segments(&self) -> Vec<&'a str> {
        match *self {
            Self::Health => vec!["health"],
            Self::Run => vec!["run"],
            Self::Files => vec!["files"],
            Self::Upload => vec!["upload"],
            Self::Rename { file_id } => vec!["files", file_id, "rename"],
            Self::Download { file_id } => vec!["download", file_id],
        }
    }

    pub fn requires_auth(&self) -> bool {
        !matches!(self, Self::Health | Self::Run)
    }
}

/// Resolve an endpoint against a base URL.
///
/// Rules:
/// 1) blank base falls back to [`DEFAULT_RUNNER_BASE_URL`]
/// 2) a trailing slash on the base path is ignored
/// 3) endpoint segments are appended after any existing base path
pub fn endpoint_url(base_url: &str, endpoint: &Endpoint<'_>) -> Result<Url, RunnerApiError> {
    let base = if base_url.trim().is_empty() {
        DEFAULT_RUNNER_BASE_URL
    } else {
        base_url.trim()
    };

    let mut url =
        Url::parse(base).map_err(|error| RunnerApiError::InvalidBaseUrl(format!("{base}: {error}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(RunnerApiError::InvalidBaseUrl(format!(
            "{base}: unsupported scheme {}",
            url.scheme()
        )));
    }
    url.set_query(None);
    url.set_fragment(None);

    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| RunnerApiError::InvalidBaseUrl(format!("{base}: cannot be a base")))?;
        segments.pop_if_empty().extend(endpoint.segments());
    }

    Ok(url)
}
