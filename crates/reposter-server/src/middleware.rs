use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use subtle::ConstantTimeEq;
use uuid::Uuid;

pub const TRIGGER_KEY_HEADER: &str = "x-trigger-key";

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Shared secret guarding the operator endpoints. `None` means the
/// endpoints are unconfigured and refuse every call.
#[derive(Clone)]
pub struct TriggerAuth {
    key: Option<Arc<str>>,
}

impl TriggerAuth {
    pub fn new(key: Option<&str>) -> Self {
        let key = key.map(str::trim).filter(|k| !k.is_empty()).map(Arc::from);
        if key.is_none() {
            tracing::warn!("TRIGGER_API_KEY not set; operator endpoints will return 500");
        }
        Self { key }
    }

    fn allows(&self, presented: &str) -> Option<bool> {
        self.key
            .as_ref()
            .map(|expected| bool::from(presented.as_bytes().ct_eq(expected.as_bytes())))
    }
}

#[derive(Debug, Serialize)]
struct MiddlewareErrorBody {
    error: MiddlewareError,
}

#[derive(Debug, Serialize)]
struct MiddlewareError {
    code: &'static str,
    message: &'static str,
}

fn reject(status: StatusCode, code: &'static str, message: &'static str) -> Response {
    (
        status,
        Json(MiddlewareErrorBody {
            error: MiddlewareError { code, message },
        }),
    )
        .into_response()
}

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is stored as a
/// [`RequestId`] extension and echoed on the response.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Middleware requiring `X-Trigger-Key` to match the configured key.
pub async fn require_trigger_key(
    State(auth): State<TriggerAuth>,
    req: Request,
    next: Next,
) -> Response {
    let presented = req
        .headers()
        .get(TRIGGER_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    match auth.allows(presented) {
        Some(true) => next.run(req).await,
        Some(false) => reject(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "missing or invalid trigger key",
        ),
        None => reject(
            StatusCode::INTERNAL_SERVER_ERROR,
            "not_configured",
            "trigger key is not configured on the server",
        ),
    }
}
