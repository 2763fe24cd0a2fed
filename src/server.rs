use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

use crate::error::{PipelineError, Stage};
use crate::handlers::{ExercisePlanner, FoodDetector};
use crate::models::{
    ErrorResponse, ExercisePlan, ExerciseResponse, FoodRequest, FoodResponse, FoodResult,
    UserProfile,
};

/// Largest accepted request body; images arrive inline as base64.
pub const MAX_BODY_BYTES: usize = 100 * 1024 * 1024;

pub struct AppState {
    pub food_detector: FoodDetector,
    pub exercise_planner: ExercisePlanner,
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/api/detect_food",
            post(detect_food_handler).fallback(method_not_allowed),
        )
        .route(
            "/api/generate_exercise",
            post(generate_exercise_handler).fallback(method_not_allowed),
        )
        .route("/health", get(health_check))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

async fn detect_food_handler(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    log::info!("🔔 Food detection request ({} bytes)", body.len());

    match detect_food(&state, &body).await {
        Ok(food) => (StatusCode::OK, Json(FoodResponse::from(food))).into_response(),
        Err(e) => {
            let message = match e.stage() {
                Stage::Build => e.to_string(),
                Stage::Call | Stage::Extract => {
                    format!("Failed to detect food and calories: {}", e)
                }
            };
            error_response(&e, message)
        }
    }
}

async fn generate_exercise_handler(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    log::info!("🔔 Exercise plan request ({} bytes)", body.len());

    match generate_exercise(&state, &body).await {
        Ok(plan) => (StatusCode::OK, Json(ExerciseResponse::from(plan))).into_response(),
        Err(e) => error_response(&e, e.to_string()),
    }
}

async fn detect_food(state: &AppState, body: &[u8]) -> Result<FoodResult, PipelineError> {
    let request: FoodRequest =
        serde_json::from_slice(body).map_err(PipelineError::InvalidRequestBody)?;
    let image = request.image.ok_or(PipelineError::InvalidInputFormat)?;
    state.food_detector.detect(&image).await
}

async fn generate_exercise(state: &AppState, body: &[u8]) -> Result<ExercisePlan, PipelineError> {
    let profile = UserProfile::from_json(body).map_err(PipelineError::InvalidRequestBody)?;
    state.exercise_planner.plan(&profile).await
}

fn error_response(error: &PipelineError, message: String) -> Response {
    log::error!("❌ Request failed at {} stage: {}", error.stage(), message);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(message)),
    )
        .into_response()
}

async fn method_not_allowed(method: Method) -> Response {
    log::warn!("⚠️ Rejected {} request", method);
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "POST")],
        format!("Method {} Not Allowed", method),
    )
        .into_response()
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, ExtractionStrategy, MissingFieldPolicy};
    use crate::handlers::testing::StubModel;
    use crate::services::{GeminiService, GenerativeModel};
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const FOOD_ANSWER: &str =
        r#"Sure! {"food":"Apple","ingredients":["apple"],"total_calories":95} Enjoy!"#;
    const EXERCISE_ANSWER: &str = r#"{"exercise": ["Option 1: Walk 30 min (burns ~120 cal)", "Option 2: Jog 20 min (burns ~210 cal)"]}"#;

    fn router_with(model: Arc<dyn GenerativeModel>) -> Router {
        create_router(Arc::new(AppState {
            food_detector: FoodDetector::new(model.clone(), ExtractionStrategy::Lazy),
            exercise_planner: ExercisePlanner::new(
                model,
                ExtractionStrategy::Lazy,
                MissingFieldPolicy::Placeholder,
            ),
        }))
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_non_post_is_rejected() {
        let model = Arc::new(StubModel::answering(FOOD_ANSWER));
        let app = router_with(model.clone());

        for (method, uri) in [
            ("GET", "/api/detect_food"),
            ("PUT", "/api/generate_exercise"),
            ("DELETE", "/api/detect_food"),
        ] {
            let response = app
                .clone()
                .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
            assert_eq!(response.headers()[header::ALLOW], "POST");
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            assert_eq!(bytes, format!("Method {} Not Allowed", method).as_bytes());
        }
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_detect_food_success() {
        let app = router_with(Arc::new(StubModel::answering(FOOD_ANSWER)));

        let response = app
            .oneshot(post_json(
                "/api/detect_food",
                json!({"image": "data:image/png;base64,aGVsbG8="}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({
                "items": [{"name": "Apple", "calories": 95, "ingredients": ["apple"]}],
                "count": 95,
                "success": true
            })
        );
    }

    #[tokio::test]
    async fn test_detect_food_invalid_image() {
        let model = Arc::new(StubModel::answering(FOOD_ANSWER));
        let app = router_with(model.clone());

        for body in [json!({"image": "not-a-data-uri"}), json!({})] {
            let response = app
                .clone()
                .oneshot(post_json("/api/detect_food", body))
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(
                json_body(response).await,
                json!({"success": false, "message": "Invalid image data format."})
            );
        }
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_detect_food_upstream_failure() {
        let app = router_with(Arc::new(StubModel::failing(503)));

        let response = app
            .oneshot(post_json(
                "/api/detect_food",
                json!({"image": "data:image/png;base64,aGVsbG8="}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        let message = body["message"].as_str().unwrap();
        assert!(message.starts_with("Failed to detect food and calories: "));
        assert!(message.contains("503"));
    }

    #[tokio::test]
    async fn test_detect_food_answer_without_json() {
        let app = router_with(Arc::new(StubModel::answering("No food here.")));

        let response = app
            .oneshot(post_json(
                "/api/detect_food",
                json!({"image": "data:image/png;base64,aGVsbG8="}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(
            body["message"],
            "Failed to detect food and calories: No valid JSON found in the response."
        );
    }

    #[tokio::test]
    async fn test_generate_exercise_success() {
        let model = Arc::new(StubModel::answering(EXERCISE_ANSWER));
        let app = router_with(model.clone());

        let response = app
            .oneshot(post_json(
                "/api/generate_exercise",
                json!({"age": 28, "gender": "male", "weight": 75, "height": 180,
                       "activityLevel": "active", "goal": "gain"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({
                "success": true,
                "exercise": [
                    "Option 1: Walk 30 min (burns ~120 cal)",
                    "Option 2: Jog 20 min (burns ~210 cal)"
                ]
            })
        );
        assert!(model.last_request().unwrap().text().contains("- Weight: 75 kg"));
    }

    #[tokio::test]
    async fn test_generate_exercise_accepts_any_profile_shape() {
        let model = Arc::new(StubModel::answering(EXERCISE_ANSWER));
        let app = router_with(model.clone());

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/generate_exercise",
                json!({"age": 30, "gender": "female", "weight": 60, "height": 165,
                       "activityLevel": {"level": "low"}, "goal": ["lose weight"]}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["success"], true);
        let sent = model.last_request().unwrap().text();
        assert!(sent.contains("- Goal: lose weight\n"));
        assert!(sent.contains("- Activity Level: [object Object]\n"));

        let response = app
            .oneshot(post_json("/api/generate_exercise", json!([])))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(model.last_request().unwrap().text().contains("- Gender: undefined\n"));
        assert_eq!(model.calls(), 2);
    }

    #[tokio::test]
    async fn test_generate_exercise_invalid_body() {
        let model = Arc::new(StubModel::answering(EXERCISE_ANSWER));
        let app = router_with(model.clone());

        let request = Request::builder()
            .method("POST")
            .uri("/api/generate_exercise")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert!(body["message"]
            .as_str()
            .unwrap()
            .starts_with("Invalid request body"));
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_health() {
        let app = router_with(Arc::new(StubModel::answering("")));
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_gemini_503_reaches_client() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
            .expect(1)
            .mount(&server)
            .await;

        let config = Config {
            api_key: "k".to_string(),
            model: "gemini-1.5-flash".to_string(),
            api_base: server.uri(),
            bind_addr: "127.0.0.1:0".to_string(),
            extraction: ExtractionStrategy::Lazy,
            missing_fields: MissingFieldPolicy::Placeholder,
        };
        let app = router_with(Arc::new(GeminiService::new(&config)));

        let response = app
            .oneshot(post_json("/api/generate_exercise", json!({"gender": "female"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert!(body["message"].as_str().unwrap().contains("503"));
    }
}
