//! Request/response API client for command decisions and system info.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

use valet_core::error::{Result, ValetError};

use crate::config::ClientConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Execution outcome returned by a successful approve call.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CommandOutcome {
    /// Whether the backend considers the execution successful
    #[serde(default)]
    pub success: bool,
    /// Captured stdout of the command
    #[serde(default)]
    pub output: String,
    /// Error text, when execution failed
    #[serde(default)]
    pub error: Option<String>,
    /// Process return code (-1 when the backend could not run the command)
    #[serde(default)]
    pub return_code: i64,
}

impl CommandOutcome {
    /// The text worth showing the user: stdout, or the error when there is
    /// no output.
    pub fn display_output(&self) -> &str {
        if self.output.is_empty() {
            self.error.as_deref().unwrap_or("")
        } else {
            &self.output
        }
    }
}

/// Response body of the approve endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ApproveResponse {
    #[serde(default)]
    pub command_id: String,
    pub result: CommandOutcome,
}

/// System information reported by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct SystemInfo {
    pub platform: String,
}

/// The command decision side-channel.
///
/// Approve and reject are independent, user-triggered request/response calls;
/// the session controller guards against issuing two concurrent decisions for
/// the same command id.
#[async_trait]
pub trait DecisionApi: Send + Sync {
    /// Requests execution of the identified command.
    async fn approve(&self, command_id: &str) -> Result<CommandOutcome>;

    /// Requests cancellation of the identified command.
    async fn reject(&self, command_id: &str) -> Result<()>;
}

/// HTTP implementation of the decision and system-info endpoints.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    config: ClientConfig,
}

impl ApiClient {
    /// Creates a client for the configured backend.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Fetches system information. Called once at startup; failure is
    /// non-fatal and degrades to an unknown platform.
    pub async fn system_info(&self) -> Result<SystemInfo> {
        let url = self.config.system_info_url();

        let response = self
            .client
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| ValetError::api(&url, e.to_string()))?;

        let response = check_status(response, &url).await?;
        response
            .json::<SystemInfo>()
            .await
            .map_err(|e| ValetError::api(&url, format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl DecisionApi for ApiClient {
    async fn approve(&self, command_id: &str) -> Result<CommandOutcome> {
        let url = self.config.approve_url(command_id);

        let response = self
            .client
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| ValetError::api(&url, e.to_string()))?;

        let response = check_status(response, &url).await?;
        let body: ApproveResponse = response
            .json()
            .await
            .map_err(|e| ValetError::api(&url, format!("Failed to parse response: {}", e)))?;

        Ok(body.result)
    }

    async fn reject(&self, command_id: &str) -> Result<()> {
        let url = self.config.reject_url(command_id);

        let response = self
            .client
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| ValetError::api(&url, e.to_string()))?;

        // The client logic does not need the acknowledgement body.
        check_status(response, &url).await?;
        Ok(())
    }
}

/// Maps a non-success status to an API error, including the response text.
async fn check_status(response: reqwest::Response, url: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    warn!(%url, %status, "request failed");
    Err(ValetError::api(url, format!("{}: {}", status, text)))
}
