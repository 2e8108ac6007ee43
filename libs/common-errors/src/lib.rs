use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiErrorResponse {
    pub error: ApiErrorInfo,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiErrorInfo {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

#[derive(Debug)]
pub enum AppError {
    BadRequest {
        code: String,
        message: String,
        details: Option<String>,
    },
    Unauthorized {
        code: String,
        message: String,
    },
    NotFound {
        code: String,
        message: String,
        details: Option<String>,
    },
    UnprocessableEntity {
        code: String,
        message: String,
        details: Option<String>,
    },
    ServiceUnavailable {
        code: String,
        message: String,
    },
    InternalServerError {
        code: String,
        message: String,
        details: Option<String>,
    },
}

impl AppError {
    pub fn bad_request(code: &str, message: &str) -> Self {
        Self::BadRequest {
            code: code.to_string(),
            message: message.to_string(),
            details: None,
        }
    }

    pub fn bad_request_with_details(
        code: &str, message: &str, details: &str,
    ) -> Self {
        Self::BadRequest {
            code: code.to_string(),
            message: message.to_string(),
            details: Some(details.to_string()),
        }
    }

    /// Every authentication failure (missing, unknown, expired or revoked
    /// key) produces this exact response so callers cannot tell which
    /// condition occurred.
    pub fn unauthorized() -> Self {
        Self::Unauthorized {
            code: "AUTHENTICATION_FAILED".to_string(),
            message: "Invalid API key".to_string(),
        }
    }

    pub fn not_found(code: &str, message: &str) -> Self {
        Self::NotFound {
            code: code.to_string(),
            message: message.to_string(),
            details: None,
        }
    }

    pub fn unprocessable_entity(code: &str, message: &str) -> Self {
        Self::UnprocessableEntity {
            code: code.to_string(),
            message: message.to_string(),
            details: None,
        }
    }

    pub fn storage_unavailable(message: &str) -> Self {
        Self::ServiceUnavailable {
            code: "STORAGE_UNAVAILABLE".to_string(),
            message: message.to_string(),
        }
    }

    pub fn internal_server_error(message: &str) -> Self {
        Self::InternalServerError {
            code: "INTERNAL_ERROR".to_string(),
            message: message.to_string(),
            details: None,
        }
    }

    pub fn from_error<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let error_str = err.to_string();

        // Pool exhaustion and connection drops surface as 503, not 500:
        // the request can be retried once the store is reachable again.
        if error_str.contains("connection") || error_str.contains("pool") {
            return Self::storage_unavailable(
                "Event store is unreachable, try again shortly",
            );
        }

        if error_str.contains("deserialize")
            || error_str.contains("invalid characters")
        {
            return Self::bad_request_with_details(
                "INVALID_QUERY_PARAMS",
                "Invalid query parameters provided",
                &error_str,
            );
        }

        if error_str.contains("invalid character")
            && error_str.contains("uuid")
        {
            return Self::bad_request(
                "INVALID_UUID",
                "Invalid UUID format provided",
            );
        }

        Self::internal_server_error(&format!(
            "An unexpected error occurred: {}",
            err
        ))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::UnprocessableEntity { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::ServiceUnavailable { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::InternalServerError { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn to_response_data(&self) -> ApiErrorResponse {
        let (code, message, details) = match self {
            Self::BadRequest {
                code,
                message,
                details,
            } => (code, message, details.clone()),
            Self::Unauthorized { code, message } => (code, message, None),
            Self::NotFound {
                code,
                message,
                details,
            } => (code, message, details.clone()),
            Self::UnprocessableEntity {
                code,
                message,
                details,
            } => (code, message, details.clone()),
            Self::ServiceUnavailable { code, message } => {
                (code, message, None)
            }
            Self::InternalServerError {
                code,
                message,
                details,
            } => (code, message, details.clone()),
        };

        ApiErrorResponse {
            error: ApiErrorInfo {
                code: code.clone(),
                message: message.clone(),
                details,
            },
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadRequest { message, .. } => write!(f, "{}", message),
            Self::Unauthorized { message, .. } => write!(f, "{}", message),
            Self::NotFound { message, .. } => write!(f, "{}", message),
            Self::UnprocessableEntity { message, .. } => {
                write!(f, "{}", message)
            }
            Self::ServiceUnavailable { message, .. } => {
                write!(f, "{}", message)
            }
            Self::InternalServerError { message, .. } => {
                write!(f, "{}", message)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let response_data = self.to_response_data();
        (status, Json(response_data)).into_response()
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for AppError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        Self::internal_server_error(&format!(
            "An unexpected error occurred: {}",
            err
        ))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal_server_error(&format!(
            "An unexpected error occurred: {}",
            err
        ))
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_shape_is_constant() {
        // Revoked, expired and unknown keys must serialize identically.
        let a =
            serde_json::to_value(AppError::unauthorized().to_response_data())
                .unwrap();
        let b =
            serde_json::to_value(AppError::unauthorized().to_response_data())
                .unwrap();
        assert_eq!(a, b);
        assert_eq!(a["error"]["code"], "AUTHENTICATION_FAILED");
        assert!(a["error"]["details"].is_null());
    }

    #[test]
    fn pool_errors_map_to_service_unavailable() {
        #[derive(Debug)]
        struct Fake;
        impl fmt::Display for Fake {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "timed out waiting for pool slot")
            }
        }
        impl std::error::Error for Fake {}

        let err = AppError::from_error(Fake);
        assert!(matches!(err, AppError::ServiceUnavailable { .. }));
    }
}
