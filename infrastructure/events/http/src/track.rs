use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::Json,
};
use chrono::Utc;
use common_errors::AppError;
use events_command_handlers::{TrackEventCommand, TrackEventResponse};
use events_models::TrackRequest;
use tracing::instrument;

use crate::{EventServices, auth::ApiKey, map_event_error};

fn header_string(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
}

/// The client address as reported by the proxy chain; only the first
/// hop counts.
fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[utoipa::path(
    post,
    path = "/api/track",
    request_body = TrackRequest,
    responses(
        (status = 201, description = "Event stored", body = TrackEventResponse),
        (status = 401, description = "Missing, unknown, expired or revoked API key"),
        (status = 422, description = "Event payload failed validation"),
        (status = 503, description = "Event store is unreachable")
    ),
    security(("api_key" = [])),
    tag = "events"
)]
#[instrument(skip_all)]
pub async fn track_event(
    State(services): State<EventServices>, key: ApiKey, headers: HeaderMap,
    Json(request): Json<TrackRequest>,
) -> Result<(StatusCode, Json<TrackEventResponse>), AppError> {
    let app = services.authenticate(&key).await?;

    request.validate().map_err(|reason| {
        AppError::unprocessable_entity("INVALID_EVENT", &reason)
    })?;

    let response = services
        .track
        .execute(TrackEventCommand {
            app_id: app.id,
            request,
            user_agent: header_string(&headers, header::USER_AGENT),
            ip: forwarded_ip(&headers),
            received_at: Utc::now(),
        })
        .await
        .map_err(map_event_error)?;

    Ok((StatusCode::CREATED, Json(response)))
}
