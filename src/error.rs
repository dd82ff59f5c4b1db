use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use sea_orm::{DbErr, SqlErr};
use serde_json::json;
use thiserror::Error;

use crate::domain::DomainError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(DbErr),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Business rule violated: {0}")]
    Domain(#[from] DomainError),

    #[error("Auth error: {0}")]
    AuthError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Permission denied")]
    PermissionDenied,

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

// 唯一约束冲突单独映射为 409，其余数据库错误按 500 处理
impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => AppError::Conflict(detail),
            _ => AppError::DatabaseError(err),
        }
    }
}

impl AppError {
    pub fn not_found(entity: &str) -> Self {
        AppError::NotFound(format!("{entity} not found"))
    }

    pub fn status_code_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::ValidationError(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::Domain(err) => (StatusCode::BAD_REQUEST, domain_code(err)),
            AppError::AuthError(_) | AppError::JwtError(_) => {
                (StatusCode::UNAUTHORIZED, "AUTH_ERROR")
            }
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            AppError::PermissionDenied => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            AppError::DatabaseError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
        }
    }
}

fn domain_code(err: &DomainError) -> &'static str {
    match err {
        DomainError::CannotModify(_) => "ORDER_LOCKED",
        DomainError::LockedItem(_) => "ITEM_LOCKED",
        DomainError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
        DomainError::PaymentIncomplete { .. } => "PAYMENT_INCOMPLETE",
        DomainError::CancellationReasonRequired => "CANCELLATION_REASON_REQUIRED",
        DomainError::InvalidTransition { .. } | DomainError::InvalidPaymentTransition { .. } => {
            "INVALID_TRANSITION"
        }
        DomainError::Invalid(_) => "VALIDATION_ERROR",
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.status_code_and_code().0
    }

    fn error_response(&self) -> HttpResponse {
        let (status_code, error_code) = self.status_code_and_code();
        let message = match self {
            AppError::ValidationError(msg)
            | AppError::AuthError(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg) => {
                log::warn!("{error_code}: {msg}");
                msg.clone()
            }
            AppError::Domain(err) => {
                log::warn!("{error_code}: {err}");
                err.to_string()
            }
            AppError::JwtError(err) => {
                log::warn!("Invalid token: {err}");
                "Invalid token".to_string()
            }
            AppError::PermissionDenied => {
                log::warn!("Permission denied");
                "Permission denied".to_string()
            }
            AppError::DatabaseError(err) => {
                log::error!("Database error: {err}");
                "Database error".to_string()
            }
        };

        HttpResponse::build(status_code).json(json!({
            "success": false,
            "error": {
                "code": error_code,
                "message": message
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::OrderStatus;

    #[test]
    fn test_domain_errors_are_bad_request() {
        let err: AppError = DomainError::CannotModify(OrderStatus::Closed).into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err: AppError = DomainError::InsufficientStock {
            name: "bun".to_string(),
            required: 6.0,
            available: 5.0,
        }
        .into();
        assert_eq!(err.status_code_and_code().1, "INSUFFICIENT_STOCK");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::not_found("Order").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Conflict("open register".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(AppError::PermissionDenied.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::from(DbErr::Custom("boom".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_body_shape() {
        let resp = AppError::ValidationError("bad".into()).error_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
