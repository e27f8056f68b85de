use crate::metrics::{MetricsSnapshot, TimedOperation};
use crate::state::AppState;
use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use chat::{ChatContext, ChatMessage, reply_message};
use insights::{CaseRow, CategoryFilter, DashboardStats, MapMarker, filter_cases, map_markers};
use pipeline::PipelineSnapshot;
use registry::Case;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    cases: usize,
    chat_backend: String,
}

#[derive(Deserialize)]
struct CaseQuery {
    q: Option<String>,
    #[serde(rename = "type")]
    category: Option<String>,
}

#[derive(Deserialize)]
struct PipelineQuery {
    log_search: Option<String>,
}

#[derive(Deserialize)]
struct ChatInput {
    message: String,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/cases", get(list_cases))
        .route("/cases/:id", get(get_case))
        .route("/cases/:id/pipeline", post(open_pipeline))
        .route("/stats", get(get_stats))
        .route("/map/markers", get(get_markers))
        .route("/pipeline", get(get_pipeline).delete(close_pipeline))
        .route("/chat", post(send_chat))
        .route("/chat/messages", get(chat_messages))
        .route("/metrics", get(get_metrics))
        .layer(middleware::from_fn_with_state(state.clone(), track_requests))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn track_requests(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    state.metrics.record_request(!response.status().is_server_error());
    response
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        cases: state.cases.len(),
        chat_backend: state.chat.transport().base_url().to_string(),
    })
}

async fn list_cases(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CaseQuery>,
) -> Json<Vec<CaseRow>> {
    let filter = query
        .category
        .as_deref()
        .map(CategoryFilter::parse)
        .unwrap_or(CategoryFilter::All);

    let rows = filter_cases(&state.cases, query.q.as_deref().unwrap_or(""), filter)
        .into_iter()
        .map(CaseRow::from_case)
        .collect();

    Json(rows)
}

async fn get_case(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Case>, StatusCode> {
    state
        .find_case(&id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn get_stats(State(state): State<Arc<AppState>>) -> Json<DashboardStats> {
    Json(state.stats)
}

async fn get_markers(State(state): State<Arc<AppState>>) -> Json<Vec<MapMarker>> {
    Json(map_markers(&state.cases))
}

/// Open the case in this view and start its run. Opening the case that is
/// already open re-runs it from the first stage.
async fn open_pipeline(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<PipelineSnapshot>, StatusCode> {
    let case = state.find_case(&id).ok_or(StatusCode::NOT_FOUND)?;
    let session = state.session(&headers);

    let replaced = session.pipeline.open(Arc::new(case.clone()));
    state.metrics.record_pipeline_start(replaced);
    session.chat.lock().await.focus_case(Some(case));

    session
        .pipeline
        .snapshot(None)
        .map(Json)
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)
}

async fn get_pipeline(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<PipelineQuery>,
) -> Result<Json<PipelineSnapshot>, StatusCode> {
    state
        .session(&headers)
        .pipeline
        .snapshot(query.log_search.as_deref())
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn close_pipeline(State(state): State<Arc<AppState>>, headers: HeaderMap) -> StatusCode {
    if state.session(&headers).pipeline.close() {
        state.metrics.record_pipeline_cancel();
    }
    StatusCode::NO_CONTENT
}

async fn chat_messages(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Json<Vec<ChatMessage>> {
    let session = state.session(&headers);
    let chat = session.chat.lock().await;
    Json(chat.messages().to_vec())
}

/// Ask the assistant about the dashboard, or the open case when there is one.
async fn send_chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(input): Json<ChatInput>,
) -> Result<Json<ChatMessage>, StatusCode> {
    let session = state.session(&headers);
    let current_case = session
        .pipeline
        .open_case_id()
        .and_then(|id| state.find_case(&id));

    let context = ChatContext {
        cases: &state.cases,
        stats: Some(&state.stats),
        current_case,
    };

    // The session lock is released while the request is in flight.
    let (request, conversation) = {
        let mut chat = session.chat.lock().await;
        chat.focus_case(current_case);
        let request = state.chat.prepare(&mut chat, &input.message, &context);
        (request, chat.conversation())
    };
    let request = request.ok_or(StatusCode::BAD_REQUEST)?;

    let timer = TimedOperation::start();
    let outcome = state.chat.send(&request).await;
    let reply = reply_message(outcome);
    state.metrics.record_chat(!reply.is_error, timer.elapsed());
    info!(
        context_type = ?request.context_type,
        is_error = reply.is_error,
        elapsed_ms = timer.elapsed().as_millis() as u64,
        "Chat turn finished"
    );

    let mut chat = session.chat.lock().await;
    if chat.conversation() != conversation {
        // The view moved to another case; its conversation was reset.
        warn!(active_case = ?chat.active_case_id(), "Dropping stale chat reply");
        return Err(StatusCode::CONFLICT);
    }
    chat.push(reply.clone());
    Ok(Json(reply))
}

async fn get_metrics(State(state): State<Arc<AppState>>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::metrics::Metrics;
    use crate::state::SESSION_HEADER;
    use axum::body::{Body, to_bytes};
    use axum::http::Request as HttpRequest;
    use chat::{ChatBridge, ChatClient};
    use registry::builtin_definitions;
    use serde_json::{Value, json};
    use std::time::Duration;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn app_state(backend: &str) -> Arc<AppState> {
        let mut config = AppConfig::fast_mode();
        config.pipeline.seed = Some(7);
        let client = ChatClient::new(backend, Duration::from_secs(5)).unwrap();
        let bridge = ChatBridge::new(client, config.chat.history_window, config.chat.client_tag.clone());
        Arc::new(AppState::new(config, builtin_definitions(), bridge, Metrics::new()))
    }

    async fn call(state: &Arc<AppState>, method: &str, uri: &str, session: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = HttpRequest::builder().method(method).uri(uri);
        if let Some(session) = session {
            builder = builder.header(SESSION_HEADER, session);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = build_router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let state = app_state("http://127.0.0.1:9");
        let (status, body) = call(&state, "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["cases"], 4);
        assert_eq!(body["chat_backend"], "http://127.0.0.1:9");
    }

    #[tokio::test]
    async fn test_case_listing_filters() {
        let state = app_state("http://127.0.0.1:9");

        let (_, all) = call(&state, "GET", "/cases", None, None).await;
        assert_eq!(all.as_array().unwrap().len(), 4);

        let (_, chem) = call(&state, "GET", "/cases?q=CHEM", None, None).await;
        assert_eq!(chem.as_array().unwrap().len(), 1);
        assert_eq!(chem[0]["id"], "ATP-45009856-10");

        let (_, logistics) = call(&state, "GET", "/cases?type=Logistics", None, None).await;
        assert_eq!(logistics.as_array().unwrap().len(), 1);
        assert_eq!(logistics[0]["type"], "Logistics");
    }

    #[tokio::test]
    async fn test_unknown_case_is_not_found() {
        let state = app_state("http://127.0.0.1:9");
        let (status, _) = call(&state, "GET", "/cases/NOPE", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(&state, "POST", "/cases/NOPE/pipeline", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_stats_and_markers() {
        let state = app_state("http://127.0.0.1:9");
        let (_, stats) = call(&state, "GET", "/stats", None, None).await;
        assert_eq!(stats["totalInvoices"], 96);

        let (_, markers) = call(&state, "GET", "/map/markers", None, None).await;
        for marker in markers.as_array().unwrap() {
            let lon = marker["coordinates"][0].as_f64().unwrap();
            let lat = marker["coordinates"][1].as_f64().unwrap();
            assert!((-170.0..=-50.0).contains(&lon));
            assert!((15.0..=75.0).contains(&lat));
        }
    }

    #[tokio::test]
    async fn test_pipeline_lifecycle() {
        let state = app_state("http://127.0.0.1:9");

        let (status, _) = call(&state, "GET", "/pipeline", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, opened) = call(&state, "POST", "/cases/LOG-782234/pipeline", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(opened["caseId"], "LOG-782234");
        assert_eq!(opened["phase"]["state"], "stageRunning");
        assert_eq!(opened["stages"].as_array().unwrap().len(), 14);

        let (_, filtered) = call(&state, "GET", "/pipeline?log_search=zzz", None, None).await;
        assert!(filtered["logs"].as_array().unwrap().is_empty());

        let (status, _) = call(&state, "DELETE", "/pipeline", None, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&state, "GET", "/pipeline", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let metrics = state.metrics.snapshot();
        assert_eq!(metrics.pipeline_runs, 1);
        assert_eq!(metrics.pipelines_cancelled, 1);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let state = app_state("http://127.0.0.1:9");
        call(&state, "POST", "/cases/PRC-118920/pipeline", Some("left"), None).await;

        let (status, _) = call(&state, "GET", "/pipeline", Some("right"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (_, left) = call(&state, "GET", "/pipeline", Some("left"), None).await;
        assert_eq!(left["caseId"], "PRC-118920");
    }

    #[tokio::test]
    async fn test_chat_with_open_case() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "response": "Container is at the port."
            })))
            .expect(1)
            .mount(&server)
            .await;

        let state = app_state(&server.uri());
        call(&state, "POST", "/cases/LOG-782234/pipeline", None, None).await;

        let (status, reply) = call(
            &state,
            "POST",
            "/chat",
            None,
            Some(json!({ "message": "Where is it?" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reply["text"], "Container is at the port.");
        assert_eq!(reply["isError"], false);

        let (_, messages) = call(&state, "GET", "/chat/messages", None, None).await;
        let messages = messages.as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert!(messages[0]["text"].as_str().unwrap().starts_with("You are reviewing"));
        assert_eq!(messages[1]["sender"], "user");

        let sent = &server.received_requests().await.unwrap()[0];
        let body: Value = serde_json::from_slice(&sent.body).unwrap();
        assert_eq!(body["context_type"], "case");
        assert_eq!(body["claims_data"]["currentCase"]["id"], "LOG-782234");
        assert_eq!(state.metrics.snapshot().chat_replies, 1);
    }

    #[tokio::test]
    async fn test_reply_after_case_switch_is_dropped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "success": true, "response": "Late answer." }))
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&server)
            .await;

        let state = app_state(&server.uri());
        call(&state, "POST", "/cases/LOG-782234/pipeline", None, None).await;

        let pending = tokio::spawn({
            let state = state.clone();
            async move {
                call(&state, "POST", "/chat", None, Some(json!({ "message": "ETA?" }))).await
            }
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        call(&state, "POST", "/cases/PRC-118920/pipeline", None, None).await;

        let (status, _) = pending.await.unwrap();
        assert_eq!(status, StatusCode::CONFLICT);

        let (_, messages) = call(&state, "GET", "/chat/messages", None, None).await;
        let messages = messages.as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0]["text"].as_str().unwrap().contains("Polymer Pricing Review"));
    }

    #[tokio::test]
    async fn test_chat_backend_down() {
        let state = app_state("http://127.0.0.1:9");
        let (status, reply) = call(
            &state,
            "POST",
            "/chat",
            None,
            Some(json!({ "message": "Any alerts?" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reply["isError"], true);
        assert_eq!(reply["text"], chat::CONNECTION_FAILED);
        assert_eq!(state.metrics.snapshot().chat_failures, 1);
    }

    #[tokio::test]
    async fn test_blank_chat_is_rejected() {
        let state = app_state("http://127.0.0.1:9");
        let (status, _) = call(&state, "POST", "/chat", None, Some(json!({ "message": "  " }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, messages) = call(&state, "GET", "/chat/messages", None, None).await;
        assert!(messages.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_requests_are_counted() {
        let state = app_state("http://127.0.0.1:9");
        call(&state, "GET", "/health", None, None).await;
        call(&state, "GET", "/cases/NOPE", None, None).await;

        let (_, metrics) = call(&state, "GET", "/metrics", None, None).await;
        // The metrics request itself is recorded after the snapshot is taken.
        assert_eq!(metrics["total_requests"], 2);
        assert_eq!(metrics["successful_requests"], 2);
    }
}
