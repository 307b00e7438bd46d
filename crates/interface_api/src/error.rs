//! API error handling
//!
//! Handlers return `ApiError`; the error-envelope middleware turns every
//! error response into `{statusCode, timestamp, path, method, message}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use core_kernel::MoneyError;
use domain_directory::DirectoryError;
use domain_renewal::RenewalError;
use domain_settlement::SettlementError;
use infra_db::DatabaseError;

use crate::auth::AuthError;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Message carried from an `ApiError` to the envelope middleware
#[derive(Debug, Clone)]
pub struct ErrorMessage(pub String);

/// Internal cause of a 5xx, logged by the envelope middleware and never sent
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

/// Error envelope returned for every failed request
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub status_code: u16,
    pub timestamp: String,
    pub path: String,
    pub method: String,
    pub message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    /// Client-facing message; internal details stay in the logs
    pub fn message(&self) -> String {
        match self {
            ApiError::NotFound(msg)
            | ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::Conflict(msg)
            | ApiError::Validation(msg) => msg.clone(),
            ApiError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // path and method are filled in by the envelope middleware
        let body = ErrorResponse {
            status_code: status.as_u16(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            path: String::new(),
            method: String::new(),
            message: self.message(),
        };

        let mut response = (status, Json(body)).into_response();
        response
            .extensions_mut()
            .insert(ErrorMessage(self.message()));
        if let ApiError::Internal(detail) = self {
            response.extensions_mut().insert(ErrorDetail(detail));
        }
        response
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => ApiError::NotFound(msg),
            DatabaseError::DuplicateEntry(msg) => ApiError::Conflict(msg),
            DatabaseError::ForeignKeyViolation(msg) | DatabaseError::ConstraintViolation(msg) => {
                ApiError::BadRequest(msg)
            }
            DatabaseError::Settlement(e) => e.into(),
            DatabaseError::Renewal(e) => e.into(),
            DatabaseError::Directory(e) => e.into(),
            DatabaseError::Money(e) => e.into(),
            other => ApiError::Internal(error_chain(&other)),
        }
    }
}

impl From<MoneyError> for ApiError {
    fn from(err: MoneyError) -> Self {
        match err {
            e @ (MoneyError::InvalidAmount(_) | MoneyError::InvalidRate(_)) => {
                ApiError::Validation(e.to_string())
            }
            e => ApiError::BadRequest(e.to_string()),
        }
    }
}

impl From<SettlementError> for ApiError {
    fn from(err: SettlementError) -> Self {
        match err {
            SettlementError::NotFound(msg) => ApiError::NotFound(msg),
            SettlementError::NotOwner(msg) => ApiError::Forbidden(msg),
            e @ SettlementError::UnbalancedTransaction { .. } => ApiError::Internal(e.to_string()),
            e => ApiError::BadRequest(e.to_string()),
        }
    }
}

impl From<RenewalError> for ApiError {
    fn from(err: RenewalError) -> Self {
        match err {
            RenewalError::NotFound(msg) => ApiError::NotFound(msg),
            e @ (RenewalError::NotAssigned(_) | RenewalError::Forbidden(_)) => {
                ApiError::Forbidden(e.to_string())
            }
            e @ RenewalError::Store(_) => ApiError::Internal(e.to_string()),
            RenewalError::Directory(e) => e.into(),
            e => ApiError::BadRequest(e.to_string()),
        }
    }
}

impl From<DirectoryError> for ApiError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::PackageNotFound(msg) => ApiError::NotFound(msg),
            e => ApiError::BadRequest(e.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingRole(msg) => ApiError::Forbidden(msg),
            e => ApiError::Unauthorized(e.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::Validation(errors.to_string())
    }
}

/// Formats an error with its sources for the logs
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settlement_errors_map_to_statuses() {
        let forbidden: ApiError = SettlementError::not_owner("not yours").into();
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

        let open: ApiError = SettlementError::OpenSettlementExists {
            party: "Agent".into(),
            settlement: "AST-1".into(),
        }
        .into();
        assert_eq!(open.status(), StatusCode::BAD_REQUEST);

        let twice: ApiError = SettlementError::InvalidStatusTransition {
            from: "CONFIRMED".into(),
            to: "CONFIRMED".into(),
        }
        .into();
        assert_eq!(twice.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_database_errors_map_to_statuses() {
        let duplicate: ApiError = DatabaseError::DuplicateEntry("settlement".into()).into();
        assert_eq!(duplicate.status(), StatusCode::CONFLICT);

        let missing: ApiError = DatabaseError::not_found("Renewal", "RNW-1").into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let wrapped: ApiError =
            DatabaseError::from(RenewalError::NotAssigned("RNW-1".into())).into();
        assert_eq!(wrapped.status(), StatusCode::FORBIDDEN);

        let pool: ApiError = DatabaseError::PoolExhausted.into();
        assert_eq!(pool.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(pool.message(), "Internal server error");
    }

    #[test]
    fn test_money_errors_map_to_statuses() {
        let amount: ApiError = MoneyError::InvalidAmount("0 must be greater than zero".into()).into();
        assert_eq!(amount.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let mismatch: ApiError = MoneyError::CurrencyMismatch("IQD".into(), "USD".into()).into();
        assert_eq!(mismatch.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_internal_detail_travels_in_extensions_only() {
        let response = ApiError::Internal("pool timed out".into()).into_response();

        let detail = response.extensions().get::<ErrorDetail>().unwrap();
        assert_eq!(detail.0, "pool timed out");
        let message = response.extensions().get::<ErrorMessage>().unwrap();
        assert_eq!(message.0, "Internal server error");
    }

    #[test]
    fn test_renewal_terminal_is_bad_request() {
        let terminal: ApiError = RenewalError::Terminal {
            id: "RNW-1".into(),
            status: "RENEWED".into(),
        }
        .into();
        assert_eq!(terminal.status(), StatusCode::BAD_REQUEST);
    }
}
