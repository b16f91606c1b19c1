use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use reposter_cycle::{Archiver, ManualCreditSource, SchedulerWaker, StatusBoard, StatusSnapshot};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::{request_id, require_trigger_key, RequestId, TriggerAuth};

#[derive(Clone)]
pub struct AppState {
    pub status: Arc<StatusBoard>,
    pub manual_credit: Arc<ManualCreditSource>,
    pub wake: SchedulerWaker,
    pub archiver: Archiver,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl ResponseMeta {
    fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "forbidden" => StatusCode::FORBIDDEN,
            "bad_request" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

#[derive(Debug, Serialize)]
struct HealthData {
    status: &'static str,
    uptime_secs: i64,
}

#[derive(Debug, Serialize)]
struct StatusData {
    #[serde(flatten)]
    snapshot: StatusSnapshot,
    manual_exhausted: bool,
}

#[derive(Debug, Serialize)]
struct ActionData {
    status: &'static str,
}

#[derive(Debug, Deserialize)]
struct DownloadQuery {
    token: Option<String>,
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-request-id"),
            HeaderName::from_static("x-trigger-key"),
        ])
}

fn operator_router(auth: TriggerAuth) -> Router<AppState> {
    Router::new()
        .route("/trigger-archive", post(trigger_archive))
        .route("/credit/restore", post(restore_credit))
        .layer(axum::middleware::from_fn_with_state(
            auth,
            require_trigger_key,
        ))
}

pub fn build_app(state: AppState, auth: TriggerAuth) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/download-bundle", get(download_bundle));

    Router::new()
        .merge(public_routes)
        .merge(operator_router(auth))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    Json(ApiResponse {
        data: HealthData {
            status: "ok",
            uptime_secs: (Utc::now() - state.started_at).num_seconds(),
        },
        meta: ResponseMeta::new(req_id.0),
    })
}

async fn status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    Json(ApiResponse {
        data: StatusData {
            snapshot: state.status.snapshot(),
            manual_exhausted: state.manual_credit.is_exhausted(),
        },
        meta: ResponseMeta::new(req_id.0),
    })
}

async fn trigger_archive(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    tracing::warn!(request_id = %req_id.0, "api: budget exhaustion triggered by operator");
    state.manual_credit.mark_exhausted();
    state.wake.wake();
    (
        StatusCode::ACCEPTED,
        Json(ApiResponse {
            data: ActionData {
                status: "archive scheduled",
            },
            meta: ResponseMeta::new(req_id.0),
        }),
    )
}

async fn restore_credit(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    tracing::info!(request_id = %req_id.0, "api: budget restored by operator");
    state.manual_credit.restore();
    state.wake.wake();
    Json(ApiResponse {
        data: ActionData {
            status: "restored",
        },
        meta: ResponseMeta::new(req_id.0),
    })
}

async fn download_bundle(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, ApiError> {
    let Some(token) = query.token.filter(|t| !t.is_empty()) else {
        return Err(ApiError::new(req_id.0, "bad_request", "token is required"));
    };

    let archiver = state.archiver.clone();
    let redeemed = tokio::task::spawn_blocking(move || archiver.redeem_token(&token))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "api: token check task failed");
            ApiError::new(req_id.0.clone(), "internal_error", "token check failed")
        })?
        .map_err(|e| {
            tracing::error!(error = %e, "api: token check failed");
            ApiError::new(req_id.0.clone(), "internal_error", "token check failed")
        })?;
    let Some(path) = redeemed else {
        return Err(ApiError::new(
            req_id.0,
            "forbidden",
            "invalid or already used token",
        ));
    };

    let bytes = tokio::fs::read(&path).await.map_err(|e| {
        tracing::error!(error = %e, path = %path.display(), "api: bundle unreadable");
        ApiError::new(req_id.0.clone(), "not_found", "bundle not found")
    })?;
    tracing::info!(bytes = bytes.len(), "api: bundle downloaded, token consumed");

    let file_name = path
        .file_name()
        .map_or_else(|| "bundle.zip".into(), |n| n.to_string_lossy());
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{file_name}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/zip")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}
