use axum::{extract::FromRequestParts, http::request::Parts};
use common_errors::AppError;

/// Header carrying the plaintext API key issued at registration.
pub const API_KEY_HEADER: &str = "X-Beacon-Key";

/// Extracts the presented key without judging it; the handler still has
/// to run the credential scan. A missing or empty header short-circuits
/// to the same response an unknown key would get.
pub struct ApiKey(pub String);

impl<S> FromRequestParts<S> for ApiKey
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts, _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(|key| ApiKey(key.to_string()))
            .ok_or_else(AppError::unauthorized)
    }
}
