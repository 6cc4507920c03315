use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;

#[derive(Deserialize)]
struct TextRequest {
    input: String,
    #[serde(default)]
    options: Value,
}

#[derive(Debug, Clone, Copy)]
enum Mode {
    Recipe,
    Steps,
    Variation,
    Refusal,
    Garbage,
}

impl Mode {
    fn from_env() -> Self {
        match std::env::var("MOCK_AGENT_MODE").as_deref() {
            Ok("steps") => Mode::Steps,
            Ok("variation") => Mode::Variation,
            Ok("refusal") => Mode::Refusal,
            Ok("garbage") => Mode::Garbage,
            _ => Mode::Recipe,
        }
    }
}

#[derive(Clone)]
struct AppState {
    attempt_count: Arc<AtomicUsize>,
    fail_attempts: usize,
    mode: Mode,
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok", "agent": "mock"}))
}

async fn agent_text(
    State(state): State<AppState>,
    Path(agent): Path<String>,
    Json(req): Json<TextRequest>,
) -> Response {
    let attempt = state.attempt_count.fetch_add(1, Ordering::SeqCst) + 1;
    tracing::info!(
        %agent,
        attempt,
        conversation = %req.options.get("conversationId").and_then(serde_json::Value::as_str).unwrap_or("-"),
        "received prompt: {}",
        req.input.chars().take(120).collect::<String>()
    );

    // Fail the first N calls so the caller's fallback path can be exercised.
    if attempt <= state.fail_attempts {
        tracing::info!("returning HTTP 500 (attempt {attempt} of {})", state.fail_attempts);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"success": false, "error": "mock failure"})),
        )
            .into_response();
    }

    let ingredients = ingredients_from_prompt(&req.input);
    let text = match state.mode {
        Mode::Recipe | Mode::Steps => format!(
            "レシピができました！\n```json\n{}\n```",
            serde_json::to_string_pretty(&recipe_json(&ingredients)).unwrap_or_default()
        ),
        Mode::Variation => serde_json::to_string(&variation_json(&ingredients)).unwrap_or_default(),
        Mode::Refusal => format!(
            "申し訳ありませんが、「{}」は食材として使用できません。別の食材を指定してください。",
            ingredients.first().map(String::as_str).unwrap_or("?")
        ),
        Mode::Garbage => "今日はいい天気ですね。{\"mainRecipe\": ".to_string(),
    };

    let steps = json!([{
        "content": [{"type": "text", "text": text}],
        "finishReason": "stop"
    }]);
    let data = match state.mode {
        Mode::Steps => json!({"provider": {"steps": steps}, "finishReason": "stop"}),
        _ => json!({"text": text, "provider": {"steps": steps}, "finishReason": "stop"}),
    };

    Json(json!({"success": true, "data": data})).into_response()
}

fn ingredients_from_prompt(prompt: &str) -> Vec<String> {
    prompt
        .lines()
        .find_map(|line| line.strip_prefix("食材: "))
        .map(|list| {
            list.split(", ")
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn recipe_json(ingredients: &[String]) -> Value {
    let mut items = vec![json!({"name": "リングイネ", "amount": "200", "unit": "g"})];
    items.extend(
        ingredients
            .iter()
            .map(|name| json!({"name": name, "amount": "1", "unit": "cup"})),
    );
    items.push(json!({"name": "エクストラバージンオリーブオイル", "amount": "2", "unit": "tbsp"}));

    json!({
        "mainRecipe": {
            "recipeName": format!("{}のリングイネ", ingredients.join("と")),
            "description": "モックエージェントが返す固定のレシピです",
            "ingredients": items,
            "instructions": ["リングイネを茹でる", "具材を炒める", "和えて仕上げる"],
            "cookingTime": "25分",
            "difficulty": "簡単",
            "servings": 2,
            "tips": ["茹で汁でソースを調整する"],
            "cuisine": "Italian",
            "region": "リグーリア",
            "winePairing": "ヴェルメンティーノ"
        },
        "ingredientAnalysis": {
            "compatibility": "高",
            "suggestedDishTypes": ["パスタ"],
            "recommendedAdditions": [{"ingredient": "松の実", "reason": "食感", "priority": "中"}],
            "difficultyAssessment": "簡単",
            "cookingMethods": ["茹でる"],
            "regionalSuggestions": [{"region": "リグーリア", "dishName": "トレネッテ", "reason": "定番"}]
        }
    })
}

fn variation_json(ingredients: &[String]) -> Value {
    json!({
        "variationName": "ビーガン・リングイネ",
        "originalRecipe": format!("{}のリングイネ", ingredients.join("と")),
        "modificationType": "ビーガン",
        "ingredients": [{"name": "豆乳", "amount": "1", "unit": "cup", "substitution": "生クリームの代わり"}],
        "instructions": ["豆乳でソースを作る"],
        "substitutions": [{"original": "生クリーム", "replacement": "豆乳", "reason": "植物性"}],
        "nutritionalBenefits": "コレステロールを抑えられます",
        "difficulty": "簡単",
        "cookingTime": 20,
        "cuisine": "Italian"
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let port = std::env::var("MOCK_AGENT_PORT")
        .unwrap_or_else(|_| "3141".to_string())
        .parse::<u16>()
        .unwrap_or(3141);

    let fail_attempts = std::env::var("MOCK_AGENT_FAIL_ATTEMPTS")
        .unwrap_or_else(|_| "0".to_string())
        .parse::<usize>()
        .unwrap_or(0);

    let state = AppState {
        attempt_count: Arc::new(AtomicUsize::new(0)),
        fail_attempts,
        mode: Mode::from_env(),
    };

    let app = Router::new()
        .route("/health", get(health))
        .route("/agents/:agent/text", post(agent_text))
        .with_state(state.clone());

    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!("Mock agent runtime listening on http://{addr}");
    tracing::info!("Mode: {:?}", state.mode);
    tracing::info!("Will fail first {fail_attempts} attempt(s)");

    axum::serve(listener, app).await?;
    Ok(())
}
