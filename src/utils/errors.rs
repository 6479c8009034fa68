use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use utoipa::ToSchema;

use crate::models::response::ErrorResponse;
use crate::repository::StorageError;
use crate::services::sync::MutationError;
use crate::services::BoardError;

#[derive(Debug, Serialize, ToSchema)]
pub enum ServiceError {
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    InternalError(String),
    DatabaseError(String),
    StorageUnavailable(String),
    ValidationError(String),
    FieldValidation(BTreeMap<String, String>),
    AuthenticationError(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ServiceError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ServiceError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            ServiceError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ServiceError::InternalError(msg) => write!(f, "Internal Error: {}", msg),
            ServiceError::DatabaseError(msg) => write!(f, "Database Error: {}", msg),
            ServiceError::StorageUnavailable(msg) => write!(f, "Storage Unavailable: {}", msg),
            ServiceError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
            ServiceError::FieldValidation(errors) => {
                write!(f, "Field Validation: {} invalid field(s)", errors.len())
            }
            ServiceError::AuthenticationError(msg) => write!(f, "Authentication Error: {}", msg),
        }
    }
}

impl std::error::Error for ServiceError {}

impl ResponseError for ServiceError {
    fn error_response(&self) -> HttpResponse {
        match self {
            ServiceError::Unauthorized(msg) => {
                log::error!("Unauthorized: {}", msg);
                HttpResponse::Unauthorized().json(ErrorResponse::new(msg))
            }
            ServiceError::Forbidden(msg) => {
                log::warn!("Forbidden: {}", msg);
                HttpResponse::Forbidden().json(ErrorResponse::new(msg))
            }
            ServiceError::NotFound(msg) => {
                log::error!("Not Found: {}", msg);
                HttpResponse::NotFound().json(ErrorResponse::new(msg))
            }
            ServiceError::Conflict(msg) => {
                log::warn!("Conflict: {}", msg);
                HttpResponse::Conflict().json(ErrorResponse::new(msg))
            }
            ServiceError::InternalError(msg) => {
                log::error!("Internal Error: {}", msg);
                // Don't expose internal details
                HttpResponse::InternalServerError().json(ErrorResponse::new("Something went wrong"))
            }
            ServiceError::DatabaseError(msg) => {
                log::error!("Database Error: {}", msg);
                HttpResponse::InternalServerError()
                    .json(ErrorResponse::new("Database operation failed"))
            }
            ServiceError::StorageUnavailable(msg) => {
                log::error!("Storage Unavailable: {}", msg);
                HttpResponse::ServiceUnavailable().json(ErrorResponse::new(
                    "Changes could not be saved and were reverted",
                ))
            }
            ServiceError::ValidationError(msg) => {
                log::error!("Validation Error: {}", msg);
                HttpResponse::BadRequest().json(ErrorResponse::new(msg))
            }
            ServiceError::FieldValidation(errors) => {
                log::warn!("Field Validation: {:?}", errors);
                HttpResponse::UnprocessableEntity().json(ErrorResponse::with_fields(
                    "One or more fields are invalid",
                    errors.clone(),
                ))
            }
            ServiceError::AuthenticationError(msg) => {
                log::error!("Authentication Error: {}", msg);
                HttpResponse::Unauthorized().json(ErrorResponse::new(msg))
            }
        }
    }
}

// Convert sqlx errors to ServiceError
impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ServiceError::NotFound("Record not found".to_string()),
            _ => ServiceError::DatabaseError(err.to_string()),
        }
    }
}

// Convert bcrypt errors to ServiceError
impl From<bcrypt::BcryptError> for ServiceError {
    fn from(err: bcrypt::BcryptError) -> Self {
        ServiceError::InternalError(format!("Password hashing error: {}", err))
    }
}

// Convert JWT errors to ServiceError
impl From<jsonwebtoken::errors::Error> for ServiceError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        ServiceError::AuthenticationError(format!("JWT error: {}", err))
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        let errors = err
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let message = errs
                    .iter()
                    .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                    .next()
                    .unwrap_or_else(|| "is invalid".to_string());
                (field.to_string(), message)
            })
            .collect();
        ServiceError::FieldValidation(errors)
    }
}

impl From<BoardError> for ServiceError {
    fn from(err: BoardError) -> Self {
        match err {
            BoardError::CardNotFound(_)
            | BoardError::BoardNotFound(_)
            | BoardError::FieldNotFound(_)
            | BoardError::ItemNotFound(_) => ServiceError::NotFound(err.to_string()),
            BoardError::Invalid(msg) => ServiceError::ValidationError(msg),
            BoardError::Fields(errors) => ServiceError::FieldValidation(errors),
            BoardError::Conflict(msg) => ServiceError::Conflict(msg),
            BoardError::Forbidden(msg) => ServiceError::Forbidden(msg),
        }
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::StorageUnavailable(err.to_string())
    }
}

impl From<MutationError> for ServiceError {
    fn from(err: MutationError) -> Self {
        match err {
            MutationError::Rejected(e) => e.into(),
            MutationError::Storage(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn test_board_errors_map_to_status_codes() {
        let cases = vec![
            (BoardError::CardNotFound("x".into()), StatusCode::NOT_FOUND),
            (BoardError::Invalid("bad".into()), StatusCode::BAD_REQUEST),
            (BoardError::Conflict("stale".into()), StatusCode::CONFLICT),
            (BoardError::Forbidden("admin only".into()), StatusCode::FORBIDDEN),
            (BoardError::Fields(BTreeMap::new()), StatusCode::UNPROCESSABLE_ENTITY),
        ];
        for (err, status) in cases {
            let service_err: ServiceError = err.into();
            assert_eq!(service_err.error_response().status(), status);
        }
    }

    #[test]
    fn test_storage_error_is_service_unavailable() {
        let err: ServiceError = StorageError::Unavailable("down".into()).into();
        assert_eq!(err.error_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: ServiceError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}
