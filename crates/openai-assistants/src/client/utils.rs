use crate::client::config::Config;
use crate::client::consts::{ASSISTANTS_BETA, AUTHORIZATION_HEADER, OPENAI_BETA_HEADER};
use anyhow::Result;
use openai_assistants_types::ErrorResponse;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;

pub fn build_headers(config: &Config) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key().expose_secret()))?;
    auth.set_sensitive(true);
    headers.insert(AUTHORIZATION_HEADER, auth);
    headers.insert(OPENAI_BETA_HEADER, HeaderValue::from_static(ASSISTANTS_BETA));
    Ok(headers)
}

/// Passes a success response through and turns anything else into an error
/// carrying the provider's own message.
pub async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(anyhow::anyhow!(error_message(status, &body)))
}

pub fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(envelope) => format!("{}: {}", status, envelope.error().message()),
        Err(_) if body.trim().is_empty() => format!("{}", status),
        Err(_) => format!("{}: {}", status, body.trim()),
    }
}
