use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use recipe_runner::agent::{AgentOptions, AgentRuntime};
use recipe_runner::config::AgentConfig;
use recipe_runner::error::AgentError;
use recipe_runner::server::{self, REFUSAL_ERROR};
use recipe_runner::service::{RecipeService, EMPTY_INGREDIENTS};
use recipe_runner::session::InMemorySessionStore;
use serde_json::{json, Value};
use tower::ServiceExt;

enum Reply {
    Envelope(Value),
    HttpError(u16),
}

struct CannedAgent(Reply);

#[async_trait]
impl AgentRuntime for CannedAgent {
    async fn generate_text(&self, _prompt: &str, _opts: &AgentOptions) -> Result<Value, AgentError> {
        match &self.0 {
            Reply::Envelope(v) => Ok(v.clone()),
            Reply::HttpError(status) => Err(AgentError::Status {
                status: *status,
                body: "down".to_string(),
            }),
        }
    }

    async fn health(&self) -> Result<Value, AgentError> {
        match &self.0 {
            Reply::Envelope(_) => Ok(json!({"status": "ok"})),
            Reply::HttpError(status) => Err(AgentError::Status {
                status: *status,
                body: String::new(),
            }),
        }
    }

    fn base_url(&self) -> &str {
        "http://agent.test"
    }
}

fn app(reply: Reply) -> Router {
    let service = RecipeService::new(
        Arc::new(CannedAgent(reply)),
        Arc::new(InMemorySessionStore::new()),
        AgentConfig::default().options(),
    );
    server::app(Arc::new(service))
}

async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn tomato_basil() -> Value {
    json!({
        "ingredients": ["tomato", "basil"],
        "preferences": {"difficulty": "easy", "servings": 2},
        "includeVariations": false
    })
}

#[tokio::test]
async fn generate_returns_parsed_agent_recipe() {
    let text = "どうぞ\n```json\n{\"mainRecipe\": {\"recipeName\": \"ポモドーロ\", \"ingredients\": [{\"name\": \"tomato\", \"amount\": \"2\", \"unit\": \"cups\"}], \"cookingTime\": 20, \"servings\": 2}}\n```";
    let app = app(Reply::Envelope(json!({"success": true, "data": {"text": text}})));

    let (status, body) = send(app, Method::POST, "/api/recipe/generate", Some(tomato_basil())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mainRecipe"]["recipeName"], "ポモドーロ");
    assert_eq!(body["mainRecipe"]["ingredients"][0]["unit"], "カップ");
    assert_eq!(body["metadata"]["agent_used"], "voltagent");
}

#[tokio::test]
async fn generate_falls_back_when_agent_fails() {
    let app = app(Reply::HttpError(502));

    let (status, body) = send(app, Method::POST, "/api/recipe/generate", Some(tomato_basil())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["metadata"]["agent_used"], "mock_fallback");
    let names: Vec<&str> = body["mainRecipe"]["ingredients"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|i| i["name"].as_str())
        .collect();
    assert!(names.contains(&"tomato"));
    assert!(names.contains(&"basil"));
    assert!(body
        .get("variations")
        .map_or(true, |v| v.as_array().map_or(false, Vec::is_empty)));
}

#[tokio::test]
async fn generate_rejects_blank_ingredients() {
    let app = app(Reply::HttpError(500));

    let (status, body) = send(
        app,
        Method::POST,
        "/api/recipe/generate",
        Some(json!({"ingredients": ["", "  "]})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], EMPTY_INGREDIENTS);
}

#[tokio::test]
async fn generate_rejects_malformed_body_with_error_json() {
    let app = app(Reply::HttpError(500));
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/recipe/generate")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn generate_surfaces_refusal_as_422() {
    let text = "申し訳ありませんが、指定された食材「石」と「鉛筆」では料理に使用できません。";
    let envelope = json!({
        "data": {"provider": {"steps": [{"content": [{"type": "text", "text": text}]}]}}
    });
    let app = app(Reply::Envelope(envelope));

    let (status, body) = send(
        app,
        Method::POST,
        "/api/recipe/generate",
        Some(json!({"ingredients": ["石", "鉛筆"]})),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], REFUSAL_ERROR);
    assert_eq!(body["invalidIngredients"], json!(["石", "鉛筆"]));
    assert_eq!(body["agentMessage"], text);
}

#[tokio::test]
async fn status_reports_connected_and_disconnected() {
    let (status, body) = send(
        app(Reply::Envelope(json!({}))),
        Method::GET,
        "/api/voltagent/status",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "connected");
    assert_eq!(body["url"], "http://agent.test");
    assert!(body["timestamp"].is_string());

    let (status, body) = send(
        app(Reply::HttpError(500)),
        Method::GET,
        "/api/voltagent/status",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "disconnected");
    assert_eq!(body["error"], "HTTP 500");
}

#[tokio::test]
async fn session_can_be_read_and_reset() {
    let app = app(Reply::HttpError(500));
    let mut request = tomato_basil();
    request["conversationId"] = json!("conv-7");

    let (status, _) = send(app.clone(), Method::POST, "/api/recipe/generate", Some(request)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(app.clone(), Method::GET, "/api/recipe/session/conv-7", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["conversationId"], "conv-7");
    assert_eq!(body["outcome"]["kind"], "recipe");

    let (status, _) = send(app.clone(), Method::DELETE, "/api/recipe/session/conv-7", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(app, Method::GET, "/api/recipe/session/conv-7", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}
