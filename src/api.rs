//! HTTP endpoints: chat and profile management.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use crate::graph::DispatchGraph;
use crate::store::{UserProfile, WellnessStore};

/// State shared across handlers.
#[derive(Clone)]
pub struct ApiState {
    pub graph: Arc<DispatchGraph>,
    pub store: Arc<dyn WellnessStore>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub user_id: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
}

/// Build the API router.
pub fn routes(graph: Arc<DispatchGraph>, store: Arc<dyn WellnessStore>) -> Router {
    let state = ApiState { graph, store };

    Router::new()
        .route("/", get(root))
        .route("/api/chat", post(chat))
        .route("/api/profile/{user_id}", get(get_profile).put(put_profile))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn root() -> impl IntoResponse {
    Json(serde_json::json!({"message": "AI Wellness API"}))
}

async fn chat(State(state): State<ApiState>, Json(req): Json<ChatRequest>) -> impl IntoResponse {
    if req.message.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "message is empty"})),
        )
            .into_response();
    }

    info!(user_id = %req.user_id, "Chat request");
    match state.graph.run(&req.user_id, &req.message).await {
        Ok(reply) => Json(ChatResponse { reply }).into_response(),
        Err(e) => {
            error!(user_id = %req.user_id, error = %e, "Dispatch failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": e.to_string()})),
            )
                .into_response()
        }
    }
}

async fn get_profile(
    State(state): State<ApiState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    match state.store.get_profile(&user_id).await {
        Ok(Some(profile)) => Json(profile).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "No profile exists yet"})),
        )
            .into_response(),
        Err(e) => {
            error!(user_id = %user_id, error = %e, "Profile read failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": e.to_string()})),
            )
                .into_response()
        }
    }
}

/// Upsert a profile. The path's user id wins over any id in the body.
async fn put_profile(
    State(state): State<ApiState>,
    Path(user_id): Path<String>,
    Json(mut profile): Json<UserProfile>,
) -> impl IntoResponse {
    if profile.user_id != user_id {
        if !profile.user_id.is_empty() {
            warn!(path = %user_id, body = %profile.user_id, "Profile user_id mismatch, using path");
        }
        profile.user_id = user_id;
    }

    match state.store.upsert_profile(&profile).await {
        Ok(()) => Json(profile).into_response(),
        Err(e) => {
            error!(user_id = %profile.user_id, error = %e, "Profile write failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": e.to_string()})),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::config::GraphConfig;
    use crate::graph::{Edge, EdgeTable, NodeId};
    use crate::knowledge::SeedDocs;
    use crate::store::LibSqlBackend;
    use crate::testing::ScriptedLlm;

    async fn app_with(graph_edges: Option<EdgeTable>) -> Router {
        let llm = Arc::new(
            ScriptedLlm::new()
                .on("Classify this user message", "fitness")
                .on("You are a fitness coach", "Warm up first."),
        );
        let store: Arc<dyn WellnessStore> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let mut graph = DispatchGraph::new(
            llm,
            Arc::new(SeedDocs::empty()),
            store.clone(),
            GraphConfig::default(),
        );
        if let Some(edges) = graph_edges {
            graph = graph.with_edges(edges);
        }
        routes(Arc::new(graph), store)
    }

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn root_reports_service() {
        let app = app_with(None).await;
        let resp = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["message"], "AI Wellness API");
    }

    #[tokio::test]
    async fn chat_returns_reply() {
        let app = app_with(None).await;
        let resp = app
            .oneshot(json_request(
                "POST",
                "/api/chat",
                serde_json::json!({"user_id": "alice", "message": "gym tips"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            body_json(resp).await["reply"],
            "🏋️ *[Fitness Coach]*\nWarm up first."
        );
    }

    #[tokio::test]
    async fn chat_rejects_empty_message() {
        let app = app_with(None).await;
        let resp = app
            .oneshot(json_request(
                "POST",
                "/api/chat",
                serde_json::json!({"user_id": "alice", "message": "   "}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn graph_fault_is_500() {
        let broken = EdgeTable::wellness().with_edge(
            NodeId::Router,
            Edge::Conditional {
                targets: vec![NodeId::Health],
                default: None,
            },
        );
        let app = app_with(Some(broken)).await;
        let resp = app
            .oneshot(json_request(
                "POST",
                "/api/chat",
                serde_json::json!({"user_id": "alice", "message": "gym tips"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(resp).await;
        assert!(body["error"].as_str().unwrap().contains("router"));
    }

    #[tokio::test]
    async fn profile_put_then_get() {
        let app = app_with(None).await;

        let resp = app
            .clone()
            .oneshot(Request::builder().uri("/api/profile/bob").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = app
            .clone()
            .oneshot(json_request(
                "PUT",
                "/api/profile/bob",
                serde_json::json!({"user_id": "someone-else", "age": 29, "primary_goal": "strength"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app
            .oneshot(Request::builder().uri("/api/profile/bob").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["user_id"], "bob");
        assert_eq!(body["age"], 29);
        assert_eq!(body["primary_goal"], "strength");
    }
}
