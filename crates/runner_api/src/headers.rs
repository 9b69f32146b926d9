use std::collections::BTreeMap;

use crate::config::RunnerApiConfig;
use crate::error::RunnerApiError;

pub const HEADER_ACCEPT: &str = "accept";
pub const HEADER_AUTHORIZATION: &str = "authorization";
pub const HEADER_USER_AGENT: &str = "user-agent";

pub const ACCEPT_JSON: &str = "application/json";
pub const ACCEPT_ANY: &str = "*/*";

/// Build a deterministic header map for runner requests.
///
/// `bearer_token` is `None` for unauthenticated endpoints; a present but blank
/// token is rejected rather than sent.
pub fn build_headers(
    config: &RunnerApiConfig,
    bearer_token: Option<&str>,
    accept: &str,
) -> Result<BTreeMap<String, String>, RunnerApiError> {
    let mut headers = BTreeMap::new();

    if let Some(token) = bearer_token {
        let token = token.trim();
        if token.is_empty() {
            return Err(RunnerApiError::MissingBearerToken);
        }
        headers.insert(HEADER_AUTHORIZATION.to_owned(), format!("Bearer {token}"));
    }

    headers.insert(HEADER_ACCEPT.to_owned(), accept.to_owned());

    let ua = match config.user_agent.as_deref() {
        Some(explicit) if !explicit.trim().is_empty() => explicit.trim().to_owned(),
        _ => default_user_agent(),
    };
    headers.insert(HEADER_USER_AGENT.to_owned(), ua);

    for (key, value) in &config.extra_headers {
        let key = key.trim().to_ascii_lowercase();
        if key == HEADER_AUTHORIZATION {
            continue;
        }
        headers.insert(key, value.trim().to_owned());
    }

    Ok(headers)
}

fn default_user_agent() -> String {
    format!("runner_api/{}", env!("CARGO_PKG_VERSION"))
}
