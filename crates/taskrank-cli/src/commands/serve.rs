//! HTTP transport over [`TaskService`].

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, HeaderName, HeaderValue, Method, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use taskrank_core::{
    Config, CoreError, MutationAck, PersistenceGateway, QueryContext, RankedTask, ScoreBreakdown,
    Task, TaskService, SAVE_INTERVAL,
};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<TaskService>,
}

#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidTask(e) => ApiError::BadRequest(e.to_string()),
            CoreError::NotFound(id) => ApiError::NotFound(format!("task not found: {id}")),
            err @ (CoreError::Persistence(_) | CoreError::Config(_)) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        let body = serde_json::json!({ "error": message });
        (status, Json(body)).into_response()
    }
}

/// Ranking parameters. Values that are missing or not integers count as
/// unspecified.
#[derive(Debug, Default, Deserialize)]
pub struct RankQuery {
    #[serde(rename = "freeMin")]
    free_min: Option<String>,
    stress: Option<String>,
}

impl RankQuery {
    fn context(&self) -> QueryContext {
        let lenient = |v: &Option<String>| v.as_deref().and_then(|s| s.trim().parse::<i64>().ok());
        QueryContext::now(lenient(&self.free_min), lenient(&self.stress))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/tasks", get(list_handler).post(upsert_handler))
        .route("/tasks/:id", get(get_handler).delete(delete_handler))
        .route("/tasks/:id/score", get(score_handler))
        .route("/order", get(order_handler))
        .route("/next", get(next_handler))
        .layer(middleware::from_fn(correlation_layer))
        .layer(middleware::from_fn(cors_layer))
        .with_state(state)
}

async fn health_handler() -> &'static str {
    "OK"
}

async fn list_handler(State(state): State<AppState>) -> Json<Vec<Task>> {
    Json(state.service.tasks())
}

async fn upsert_handler(
    State(state): State<AppState>,
    payload: Result<Json<Task>, JsonRejection>,
) -> Result<Json<MutationAck>, ApiError> {
    let Json(task) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    Ok(Json(state.service.upsert_task(task)?))
}

async fn get_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    state
        .service
        .get_task(&id)
        .map(Json)
        .ok_or_else(|| ApiError::from(CoreError::NotFound(id)))
}

async fn delete_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<MutationAck> {
    Json(state.service.delete_task(&id))
}

async fn score_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<RankQuery>,
) -> Result<Json<ScoreBreakdown>, ApiError> {
    Ok(Json(state.service.explain(&id, &query.context())?))
}

async fn order_handler(
    State(state): State<AppState>,
    Query(query): Query<RankQuery>,
) -> Json<Vec<RankedTask>> {
    Json(state.service.ranked(&query.context()))
}

async fn next_handler(State(state): State<AppState>, Query(query): Query<RankQuery>) -> Response {
    match state.service.next_task(&query.context()) {
        Some(task) => Json(task).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn cors_layer(req: Request<Body>, next: Next) -> Response {
    let mut resp = if req.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(req).await
    };
    let headers = resp.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET,POST,DELETE,OPTIONS"),
    );
    resp
}

async fn correlation_layer(mut req: Request<Body>, next: Next) -> Response {
    let header_key = HeaderName::from_static("x-request-id");
    let incoming = req
        .headers()
        .get(&header_key)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let (rid, value) = match incoming.and_then(|s| HeaderValue::from_str(&s).ok().map(|v| (s, v))) {
        Some(pair) => pair,
        None => {
            let rid = Uuid::new_v4().to_string();
            let value = HeaderValue::from_str(&rid).unwrap_or(HeaderValue::from_static("-"));
            (rid, value)
        }
    };
    req.headers_mut().insert(&header_key, value.clone());
    let span = info_span!(
        "http.request",
        request_id = %rid,
        method = %req.method(),
        path = %req.uri().path()
    );
    let mut resp = next.run(req).instrument(span).await;
    resp.headers_mut().insert(header_key, value);
    resp
}

/// Start the service and block until Ctrl-C.
pub fn run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(serve(config))
}

async fn serve(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let gateway = Arc::new(PersistenceGateway::new(config.data_file()));
    let service = Arc::new(TaskService::open(&gateway));
    info!(
        path = %gateway.path().display(),
        count = service.count(),
        "task store loaded"
    );

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let worker = service.spawn_persistence(Arc::clone(&gateway), SAVE_INTERVAL);
    info!(%addr, "taskrank listening");

    let app = router(AppState {
        service: Arc::clone(&service),
    });
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    info!("shutting down");
    worker.shutdown().await;
    served?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for ctrl-c; running until killed");
        std::future::pending::<()>().await;
    }
}
