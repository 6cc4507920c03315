use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::agent::{AgentOptions, AgentRuntime};
use crate::display::{self, DisplayRecipe};
use crate::error::{AgentError, ApiError};
use crate::extract;
use crate::fallback;
use crate::prompt::build_prompt;
use crate::recipe::{Metadata, RecipeRequest, AGENT_VOLTAGENT};
use crate::refusal::{self, Refusal};
use crate::session::{SessionEntry, SessionStore};

pub const EMPTY_INGREDIENTS: &str = "少なくとも1つの食材を入力してください";

/// Result of one generation round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Outcome {
    Recipe(DisplayRecipe),
    Refused(Refusal),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: ConnectionStatus,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: String,
}

pub struct RecipeService {
    agent: Arc<dyn AgentRuntime>,
    sessions: Arc<dyn SessionStore>,
    options: AgentOptions,
}

impl RecipeService {
    pub fn new(
        agent: Arc<dyn AgentRuntime>,
        sessions: Arc<dyn SessionStore>,
        options: AgentOptions,
    ) -> Self {
        Self {
            agent,
            sessions,
            options,
        }
    }

    /// Runs one submission through the pipeline. The only error is an empty
    /// ingredient list; agent and parse failures come back as a fallback
    /// recipe.
    pub async fn generate(&self, request: RecipeRequest) -> Result<Outcome, ApiError> {
        let mut request = request.normalized();
        if request.ingredients.is_empty() {
            return Err(ApiError::Validation(EMPTY_INGREDIENTS.to_string()));
        }

        let conversation_id = request
            .conversation_id
            .take()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        request.conversation_id = Some(conversation_id.clone());

        let prompt = build_prompt(&request);
        let options = self.options.for_conversation(&conversation_id);

        tracing::info!(
            %conversation_id,
            ingredients = request.ingredients.len(),
            variations = request.requested_variations.len(),
            "requesting recipe from agent"
        );

        let outcome = match self.agent.generate_text(&prompt, &options).await {
            Ok(envelope) => interpret(&request, &conversation_id, &envelope),
            Err(e) => {
                tracing::warn!(%conversation_id, error = %e, "agent call failed, using fallback recipe");
                Outcome::Recipe(fallback::generate(&request, &fallback_reason(&e)))
            }
        };

        self.sessions
            .save(SessionEntry {
                conversation_id,
                prompt,
                outcome: outcome.clone(),
                recorded_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            })
            .await;

        Ok(outcome)
    }

    pub async fn status(&self) -> StatusReport {
        let (status, health, error) = match self.agent.health().await {
            Ok(health) => (ConnectionStatus::Connected, Some(health), None),
            Err(AgentError::Status { status, .. }) => (
                ConnectionStatus::Disconnected,
                None,
                Some(format!("HTTP {status}")),
            ),
            Err(e) => (ConnectionStatus::Error, None, Some(e.to_string())),
        };

        StatusReport {
            status,
            url: self.agent.base_url().to_string(),
            health,
            error,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    pub async fn session(&self, conversation_id: &str) -> Option<SessionEntry> {
        self.sessions.load(conversation_id).await
    }

    pub async fn reset(&self, conversation_id: &str) -> bool {
        self.sessions.clear(conversation_id).await
    }
}

fn interpret(request: &RecipeRequest, conversation_id: &str, envelope: &Value) -> Outcome {
    // A refusal wins even when the same text also carries JSON.
    if let Some(refusal) = extract::locate_text(envelope).and_then(refusal::detect) {
        tracing::info!(
            %conversation_id,
            invalid = ?refusal.invalid_ingredients,
            "agent declined the ingredients"
        );
        return Outcome::Refused(refusal);
    }

    match extract::extract(envelope) {
        Some(payload) => {
            let metadata = Metadata::now(AGENT_VOLTAGENT, Some(conversation_id.to_string()));
            Outcome::Recipe(display::normalize(payload, metadata))
        }
        None => {
            tracing::warn!(%conversation_id, "no recipe JSON in agent reply, using fallback recipe");
            Outcome::Recipe(fallback::generate(request, "no recipe JSON in agent reply"))
        }
    }
}

fn fallback_reason(err: &AgentError) -> String {
    match err {
        AgentError::Status { status, .. } => format!("agent returned HTTP {status}"),
        AgentError::Request(_) => "agent unreachable".to_string(),
        AgentError::Decode(_) => "agent response was not JSON".to_string(),
    }
}
