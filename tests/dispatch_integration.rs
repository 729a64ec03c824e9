//! End-to-end tests: HTTP routes → dispatch graph → libSQL store on disk.
//!
//! The LLM is a stub that answers by prompt shape, so no network calls are
//! made.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use wellness_agent::api::routes;
use wellness_agent::config::GraphConfig;
use wellness_agent::error::{GraphError, LlmError};
use wellness_agent::graph::{DispatchGraph, NodeId};
use wellness_agent::knowledge::SeedDocs;
use wellness_agent::llm::provider::{CompletionRequest, CompletionResponse, LlmProvider};
use wellness_agent::store::{LibSqlBackend, WellnessStore};

/// Stub LLM provider for integration tests (no real API calls).
#[derive(Default)]
struct StubLlm {
    prompts: Mutex<Vec<String>>,
}

impl StubLlm {
    fn answer(prompt: &str) -> String {
        let lower = prompt.to_lowercase();
        if prompt.starts_with("Classify this user message") {
            if lower.contains("how am i doing") {
                "tracking"
            } else if lower.contains("pizza") {
                "nutrition"
            } else if lower.contains("working out") {
                "fitness"
            } else {
                "misc"
            }
            .to_string()
        } else if prompt.starts_with("Analyze this user message") {
            "OUT_OF_DOMAIN".to_string()
        } else if prompt.starts_with("Extract the food items") {
            "2 slices pizza".to_string()
        } else if prompt.starts_with("You are a food database API") {
            json!({
                "food_name": "Pizza, cheese",
                "serving_size": "2 slices",
                "calories_per_serving": 570,
                "protein_g": 24,
                "carbs_g": 72,
                "fat_g": 20,
                "fiber_g": 4,
                "source": "USDA Food Database"
            })
            .to_string()
        } else {
            "stub reply".to_string()
        }
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for StubLlm {
    fn model_name(&self) -> &str {
        "stub"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let prompt = request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.prompts.lock().unwrap().push(prompt.clone());
        Ok(CompletionResponse {
            content: Self::answer(&prompt),
            input_tokens: 0,
            output_tokens: 0,
        })
    }
}

struct Harness {
    app: Router,
    graph: Arc<DispatchGraph>,
    llm: Arc<StubLlm>,
    _dir: tempfile::TempDir,
}

async fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let docs = dir.path().join("docs");
    std::fs::create_dir_all(&docs).unwrap();
    std::fs::write(
        docs.join("fitness.md"),
        "Beginners working out should start with bodyweight squats.\n\n\
         Rest days matter as much as training days.",
    )
    .unwrap();

    let llm = Arc::new(StubLlm::default());
    let store: Arc<dyn WellnessStore> = Arc::new(
        LibSqlBackend::new_local(&dir.path().join("db").join("wellness.db"))
            .await
            .unwrap(),
    );
    let knowledge = SeedDocs::load_dir(&docs).await.unwrap();
    assert_eq!(knowledge.len(), 2);

    let graph = Arc::new(DispatchGraph::new(
        llm.clone(),
        Arc::new(knowledge),
        store.clone(),
        GraphConfig::default(),
    ));
    let app = routes(graph.clone(), store);

    Harness {
        app,
        graph,
        llm,
        _dir: dir,
    }
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            builder = builder.header("content-type", "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let resp = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn chat(app: &Router, user_id: &str, message: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/chat",
        Some(json!({"user_id": user_id, "message": message})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "chat failed: {body}");
    body["reply"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn conversation_logs_activity_and_reports_progress() {
    let h = harness().await;

    let (status, _) = send(
        &h.app,
        "PUT",
        "/api/profile/alice",
        Some(json!({"age": 30, "fitness_experience": "beginner", "daily_calorie_goal": 2000})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let reply = chat(&h.app, "alice", "I want to start working out").await;
    assert_eq!(reply, "🏋️ *[Fitness Coach]*\nstub reply");

    let reply = chat(&h.app, "alice", "How many calories are in 2 slices of pizza?").await;
    assert!(reply.starts_with("🍎 *[Nutrition Coach + Database]*"));
    assert!(reply.ends_with("_Source: USDA Food Database_"));

    let reply = chat(&h.app, "alice", "How am I doing?").await;
    assert_eq!(
        reply,
        "📊 *[Progress Tracker]*\nYou've logged 1 meals and 1 workouts so far.\nKeep going strong! 💪"
    );

    // Other users see their own log only.
    let reply = chat(&h.app, "bob", "How am I doing?").await;
    assert!(reply.contains("You've logged 0 meals and 0 workouts"));
}

#[tokio::test]
async fn fitness_prompt_is_grounded_in_profile_and_seed_docs() {
    let h = harness().await;
    send(
        &h.app,
        "PUT",
        "/api/profile/carol",
        Some(json!({"fitness_experience": "beginner"})),
    )
    .await;

    chat(&h.app, "carol", "I want to start working out").await;

    let coach_prompt = h
        .llm
        .prompts()
        .into_iter()
        .find(|p| p.starts_with("You are a fitness coach"))
        .expect("fitness responder was called");
    assert!(coach_prompt.contains("Fitness Level: beginner"));
    assert!(coach_prompt.contains("bodyweight squats"));
}

#[tokio::test]
async fn out_of_domain_message_gets_helper_reply() {
    let h = harness().await;

    let outcome = h
        .graph
        .execute("dave", "What's the capital of Peru?")
        .await
        .unwrap();
    assert_eq!(
        outcome.state.visited,
        vec![NodeId::Router, NodeId::Miscellaneous]
    );
    assert!(outcome.reply.starts_with("🤖 *[Domain Helper]*"));
}

#[tokio::test]
async fn profile_round_trips_over_http() {
    let h = harness().await;

    let (status, _) = send(&h.app, "GET", "/api/profile/erin", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    send(
        &h.app,
        "PUT",
        "/api/profile/erin",
        Some(json!({"sleep_hours": 6.5, "stress_level": "high", "smoking": true})),
    )
    .await;

    let (status, body) = send(&h.app, "GET", "/api/profile/erin", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], "erin");
    assert_eq!(body["sleep_hours"], 6.5);
    assert_eq!(body["stress_level"], "high");
    assert_eq!(body["smoking"], true);
    assert_eq!(body["age"], Value::Null);
}

#[test]
fn graph_errors_render_node_names() {
    let err = GraphError::UndefinedTransition {
        from: NodeId::Nutrition,
        to: NodeId::Tracking,
    };
    assert_eq!(err.to_string(), "No transition defined from nutrition to tracking");
}
