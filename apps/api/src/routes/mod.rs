pub mod health;

use axum::{
    http::Uri,
    routing::{get, post},
    Router,
};

use crate::assistant::handlers;
use crate::errors::AppError;
use crate::state::AppState;

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {uri}"))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/questions", post(handlers::handle_question))
        .route("/api/v1/questions/classify", post(handlers::handle_classify))
        .route("/api/v1/crop-plans", post(handlers::handle_crop_plan))
        .fallback(not_found)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::assistant::forwarder::ChatCompletionForwarder;
    use crate::assistant::knowledge::KnowledgeBase;
    use crate::llm_client::testing::RecordingBackend;
    use crate::llm_client::{LlmError, Role};

    fn router_with(backend: Arc<RecordingBackend>) -> Router {
        let forwarder = ChatCompletionForwarder::new(backend, Arc::new(KnowledgeBase::builtin()));
        build_router(AppState { forwarder })
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = router_with(Arc::new(RecordingBackend::replying("unused")));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_question_returns_answer() {
        let backend = Arc::new(RecordingBackend::replying("Use Bt."));
        let app = router_with(backend.clone());

        let response = app
            .oneshot(post_json(
                "/api/v1/questions",
                json!({"query": "Lagarta na soja?", "sources": "Source A: Bt label"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"answer": "Use Bt."}));
        assert!(backend.calls()[0][0].content.contains("Source A: Bt label"));
    }

    #[tokio::test]
    async fn test_crop_plan_passes_planting_date() {
        let backend = Arc::new(RecordingBackend::replying("report"));
        let app = router_with(backend.clone());

        let response = app
            .oneshot(post_json(
                "/api/v1/crop-plans",
                json!({
                    "query": "Plan",
                    "location": "Londrina",
                    "sources": "",
                    "planting_date": "2025-10-05"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["report"], "report");
        let calls = backend.calls();
        assert_eq!(calls[0].len(), 7);
        assert_eq!(calls[0][6].role, Role::User);
        assert!(calls[0][6].content.contains("05/10/2025"));
    }

    #[tokio::test]
    async fn test_classify_returns_topic() {
        let app = router_with(Arc::new(RecordingBackend::replying("pesticides")));

        let response = app
            .oneshot(post_json(
                "/api/v1/questions/classify",
                json!({"question": "Como controlar ferrugem asiática?"}),
            ))
            .await
            .unwrap();

        assert_eq!(json_body(response).await, json!({"topic": "pesticides"}));
    }

    #[tokio::test]
    async fn test_upstream_failure_is_bad_gateway_with_cause() {
        let backend = Arc::new(RecordingBackend::new(|_| Err(LlmError::transport("timeout"))));
        let app = router_with(backend);

        let response = app
            .oneshot(post_json("/api/v1/questions", json!({"query": "q"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "LLM_ERROR");
        assert_eq!(body["error"]["kind"], "transport");
        assert!(body["error"]["message"].as_str().unwrap().contains("timeout"));
    }

    #[tokio::test]
    async fn test_missing_field_is_json_validation_error() {
        let backend = Arc::new(RecordingBackend::replying("unused"));
        let app = router_with(backend.clone());

        let response = app
            .oneshot(post_json("/api/v1/questions", json!({"sources": "s"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert!(body["error"]["message"].as_str().unwrap().contains("query"));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_body_is_json_validation_error() {
        let app = router_with(Arc::new(RecordingBackend::replying("unused")));

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/crop-plans")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"query\": "))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let app = router_with(Arc::new(RecordingBackend::replying("unused")));

        let response = app
            .oneshot(Request::builder().uri("/question").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"]["code"], "NOT_FOUND");
    }
}
