use axum::http::StatusCode;
use thiserror::Error;

use crate::{db::StoreError, error::HttpError};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Store error: {0}")]
    Store(StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(_) => ServiceError::Conflict("User already exists".to_string()),
            other => ServiceError::Store(other),
        }
    }
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::Store(_) | ServiceError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::Store(_) | ServiceError::Internal(_) => {
                tracing::error!("{}", error);
                HttpError::server_error(crate::error::ErrorMessage::ServerError.to_string())
            }
            _ => HttpError::new(error.to_string(), error.status_code()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_distinct_statuses() {
        let cases = [
            (ServiceError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (ServiceError::Unauthorized("who".into()), StatusCode::UNAUTHORIZED),
            (ServiceError::Forbidden("no".into()), StatusCode::FORBIDDEN),
            (ServiceError::NotFound("gone".into()), StatusCode::NOT_FOUND),
            (ServiceError::Conflict("dup".into()), StatusCode::CONFLICT),
        ];

        for (error, status) in cases {
            let message = error.to_string();
            let http: HttpError = error.into();
            assert_eq!(http.status, status);
            assert_eq!(http.message, message);
        }
    }

    #[test]
    fn internal_details_are_not_leaked() {
        let http: HttpError = ServiceError::Internal("pool exhausted".into()).into();
        assert_eq!(http.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!http.message.contains("pool"));
    }

    #[test]
    fn duplicates_become_conflicts() {
        let err: ServiceError = StoreError::Duplicate("email".into()).into();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }
}
