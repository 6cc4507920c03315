use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use crate::config::AgentConfig;
use crate::error::AgentError;

/// The health probe never waits longer than this.
pub const STATUS_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentOptions {
    pub user_id: String,
    pub conversation_id: String,
    pub context_limit: u32,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl AgentOptions {
    pub fn for_conversation(&self, conversation_id: &str) -> Self {
        Self {
            conversation_id: conversation_id.to_string(),
            ..self.clone()
        }
    }
}

/// The hosted agent runtime, as the pipeline sees it.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    /// Sends a prompt to the agent and returns the raw response envelope.
    async fn generate_text(&self, prompt: &str, options: &AgentOptions)
        -> Result<Value, AgentError>;

    /// Probes the runtime's health endpoint.
    async fn health(&self) -> Result<Value, AgentError>;

    fn base_url(&self) -> &str;
}

#[derive(Clone)]
pub struct VoltAgentClient {
    http: Client,
    base_url: String,
    agent: String,
    timeout: Option<Duration>,
}

impl VoltAgentClient {
    pub fn new(config: &AgentConfig) -> Self {
        Self {
            http: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            agent: config.agent_name.clone(),
            timeout: config.timeout,
        }
    }

    fn text_url(&self) -> String {
        format!("{}/agents/{}/text", self.base_url, self.agent)
    }
}

#[async_trait]
impl AgentRuntime for VoltAgentClient {
    async fn generate_text(
        &self,
        prompt: &str,
        options: &AgentOptions,
    ) -> Result<Value, AgentError> {
        #[derive(Serialize)]
        struct TextRequest<'a> {
            input: &'a str,
            options: &'a AgentOptions,
        }

        let url = self.text_url();
        let mut req = self
            .http
            .post(&url)
            .header("Accept", "application/json")
            .json(&TextRequest {
                input: prompt,
                options,
            });
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }

        tracing::debug!(%url, "posting prompt to agent");
        let resp = req.send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AgentError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| AgentError::Decode(e.to_string()))
    }

    async fn health(&self) -> Result<Value, AgentError> {
        let resp = self
            .http
            .get(format!("{}/health", self.base_url))
            .timeout(STATUS_TIMEOUT)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(AgentError::Status {
                status: resp.status().as_u16(),
                body: String::new(),
            });
        }

        // Some runtimes answer with plain text.
        let body = resp.text().await?;
        Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}
