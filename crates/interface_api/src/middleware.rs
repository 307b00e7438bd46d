//! API middleware

use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use tracing::{error, info, warn};

use domain_directory::Actor;

use crate::auth::{validate_token, AuthError};
use crate::error::{ApiError, ErrorDetail, ErrorMessage, ErrorResponse};
use crate::AppState;

/// Largest error body read back when rewriting a framework rejection
const MAX_ERROR_BODY: usize = 64 * 1024;

/// Authentication middleware
///
/// Validates the bearer token and stores the caller's `Actor` in the
/// request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or(AuthError::MissingToken)?;

    let actor = validate_token(token, &state.config.jwt_secret)
        .and_then(|claims| claims.actor())
        .map_err(|e| {
            warn!(error = %e, "Token validation failed");
            e
        })?;

    request.extensions_mut().insert(actor);
    Ok(next.run(request).await)
}

/// Audit logging middleware
///
/// Logs every API call with the caller, status and duration.
pub async fn audit_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let actor = request.extensions().get::<Actor>().copied();

    let start = Utc::now();
    let response = next.run(request).await;
    let duration = Utc::now() - start;

    info!(
        method = %method,
        uri = %uri,
        user = %actor.map(|a| a.user_id.to_string()).unwrap_or_else(|| "anonymous".into()),
        role = %actor.map(|a| a.role.as_str()).unwrap_or("-"),
        status = response.status().as_u16(),
        duration_ms = duration.num_milliseconds(),
        "API request"
    );

    response
}

/// Rewrites every error response into the standard envelope
///
/// Errors raised by handlers carry their message in an `ErrorMessage`
/// extension; framework rejections (bad JSON, unknown route) are plain text
/// and their body becomes the message.
pub async fn error_envelope_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let (parts, body) = response.into_parts();
    let message = match parts.extensions.get::<ErrorMessage>() {
        Some(ErrorMessage(message)) => message.clone(),
        None => match to_bytes(body, MAX_ERROR_BODY).await {
            Ok(bytes) if !bytes.is_empty() => String::from_utf8_lossy(&bytes).into_owned(),
            _ => status.canonical_reason().unwrap_or("Error").to_string(),
        },
    };

    // the single log line for a failed request
    if status.is_server_error() {
        let detail = parts
            .extensions
            .get::<ErrorDetail>()
            .map(|ErrorDetail(detail)| detail.as_str())
            .unwrap_or("");
        error!(%method, %path, status = status.as_u16(), %message, detail, "Request failed");
    } else {
        warn!(%method, %path, status = status.as_u16(), %message, "Request rejected");
    }

    let envelope = ErrorResponse {
        status_code: status.as_u16(),
        timestamp: Utc::now().to_rfc3339(),
        path,
        method,
        message,
    };
    (status, Json(envelope)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    use axum::{http::StatusCode, routing::get, Router};
    use axum_test::TestServer;
    use serde_json::Value;

    /// Collects formatted log lines in memory
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn lines(&self) -> Vec<String> {
            String::from_utf8_lossy(&self.0.lock().unwrap())
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    async fn failing() -> Result<(), ApiError> {
        Err(ApiError::Internal("pool timed out".to_string()))
    }

    #[tokio::test]
    async fn test_server_error_logged_once_without_leaking_detail() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let router = Router::new()
            .route("/boom", get(failing))
            .layer(axum::middleware::from_fn(error_envelope_middleware));
        let response = TestServer::new(router).unwrap().get("/boom").await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body = response.json::<Value>();
        assert_eq!(body["message"], "Internal server error");
        assert_eq!(body["path"], "/boom");

        let failures: Vec<String> = logs
            .lines()
            .into_iter()
            .filter(|line| line.contains("Request failed"))
            .collect();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].contains("pool timed out"));
    }

    #[tokio::test]
    async fn test_client_error_is_enveloped() {
        async fn missing() -> Result<(), ApiError> {
            Err(ApiError::NotFound("Renewal 42".to_string()))
        }
        let router = Router::new()
            .route("/missing", get(missing))
            .layer(axum::middleware::from_fn(error_envelope_middleware));
        let response = TestServer::new(router).unwrap().get("/missing").await;

        response.assert_status(StatusCode::NOT_FOUND);
        let body = response.json::<Value>();
        assert_eq!(body["statusCode"], 404);
        assert_eq!(body["method"], "GET");
        assert_eq!(body["message"], "Renewal 42");
    }
}
