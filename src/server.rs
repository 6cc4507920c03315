use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{MatchedPath, Path, State};
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::recipe::RecipeRequest;
use crate::service::{ConnectionStatus, Outcome, RecipeService};

pub type AppState = Arc<RecipeService>;

pub const REFUSAL_ERROR: &str = "適切な食材を入力してください";

/// Body of a 422 answer: the agent declined because the input is not food.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefusalBody {
    pub error: String,
    pub invalid_ingredients: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_message: Option<String>,
}

/// Routes plus the CORS and tracing layers.
pub fn app(service: AppState) -> Router {
    Router::new()
        .route("/api/recipe/generate", post(generate))
        .route("/api/recipe/session/:id", get(get_session).delete(reset_session))
        .route("/api/voltagent/status", get(status))
        .with_state(service)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                let path = request
                    .extensions()
                    .get::<MatchedPath>()
                    .map(MatchedPath::as_str)
                    .unwrap_or(request.uri().path());
                tracing::info_span!("http_request", method = %request.method(), path = %path)
            }),
        )
}

async fn generate(
    State(service): State<AppState>,
    body: Result<Json<RecipeRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::Validation(e.body_text()))?;

    let resp = match service.generate(request).await? {
        Outcome::Recipe(recipe) => (StatusCode::OK, Json(recipe)).into_response(),
        Outcome::Refused(refusal) => {
            let body = RefusalBody {
                error: REFUSAL_ERROR.to_string(),
                invalid_ingredients: refusal.invalid_ingredients,
                agent_message: refusal.message,
            };
            (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
        }
    };
    Ok(resp)
}

async fn status(State(service): State<AppState>) -> Response {
    let report = service.status().await;
    let code = match report.status {
        ConnectionStatus::Connected => StatusCode::OK,
        _ => StatusCode::SERVICE_UNAVAILABLE,
    };
    (code, Json(report)).into_response()
}

async fn get_session(
    State(service): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let entry = service
        .session(&id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("no session for conversation {id}")))?;
    Ok(Json(entry).into_response())
}

async fn reset_session(
    State(service): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if service.reset(&id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("no session for conversation {id}")))
    }
}
