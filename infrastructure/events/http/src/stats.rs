use analytics_models::{
    AppAnalytics, DateRange, EventSummary, RealtimeWindow, UserStats,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use common_errors::AppError;
use events_query_handlers::{
    AppAnalyticsQuery, EventSummaryQuery, RealtimeQuery, UserStatsQuery,
};
use serde::Deserialize;
use tracing::instrument;
use utoipa::IntoParams;

use crate::{EventServices, auth::ApiKey, map_event_error};

#[derive(Debug, Deserialize, IntoParams)]
pub struct EventStatsParams {
    /// Event name to summarize.
    pub event: String,
    /// Range start, RFC 3339. Must be paired with `end`.
    pub start: Option<String>,
    /// Range end, RFC 3339. Must be paired with `start`.
    pub end: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct RangeParams {
    pub start: Option<String>,
    pub end: Option<String>,
}

/// Both bounds or neither; a half-open range is a client mistake, not a
/// default we silently pick.
fn parse_range(
    start: Option<&str>, end: Option<&str>,
) -> Result<Option<DateRange>, AppError> {
    match (start, end) {
        (None, None) => Ok(None),
        (Some(start), Some(end)) => {
            let start = parse_timestamp(start)?;
            let end = parse_timestamp(end)?;
            if start > end {
                return Err(AppError::bad_request(
                    "INVALID_DATE_RANGE",
                    "start must not be after end",
                ));
            }
            Ok(Some(DateRange { start, end }))
        }
        _ => Err(AppError::bad_request(
            "INVALID_DATE_RANGE",
            "start and end must be provided together",
        )),
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| {
            AppError::bad_request(
                "INVALID_DATE_FORMAT",
                "timestamps must be RFC 3339",
            )
        })
}

#[utoipa::path(
    get,
    path = "/api/stats/event",
    params(EventStatsParams),
    responses(
        (status = 200, description = "Per-event summary", body = EventSummary),
        (status = 400, description = "Invalid range parameters"),
        (status = 401, description = "Missing, unknown, expired or revoked API key")
    ),
    security(("api_key" = [])),
    tag = "stats"
)]
#[instrument(skip(services, key), fields(event = %params.event))]
pub async fn event_stats(
    State(services): State<EventServices>, key: ApiKey,
    Query(params): Query<EventStatsParams>,
) -> Result<Json<EventSummary>, AppError> {
    let app = services.authenticate(&key).await?;
    let range = parse_range(params.start.as_deref(), params.end.as_deref())?;

    if params.event.trim().is_empty() {
        return Err(AppError::bad_request(
            "INVALID_EVENT_NAME",
            "event must not be empty",
        ));
    }

    let summary = services
        .event_summary
        .execute(EventSummaryQuery {
            app_id: app.id,
            event: params.event,
            range,
        })
        .await
        .map_err(map_event_error)?;
    Ok(Json(summary))
}

#[utoipa::path(
    get,
    path = "/api/stats/user/{user_id}",
    params(("user_id" = String, Path, description = "Client-supplied user identifier")),
    responses(
        (status = 200, description = "Per-user activity profile", body = UserStats),
        (status = 401, description = "Missing, unknown, expired or revoked API key")
    ),
    security(("api_key" = [])),
    tag = "stats"
)]
#[instrument(skip(services, key))]
pub async fn user_stats(
    State(services): State<EventServices>, key: ApiKey,
    Path(user_id): Path<String>,
) -> Result<Json<UserStats>, AppError> {
    let app = services.authenticate(&key).await?;

    let stats = services
        .user_stats
        .execute(UserStatsQuery {
            app_id: app.id,
            user_id,
        })
        .await
        .map_err(map_event_error)?;
    Ok(Json(stats))
}

#[utoipa::path(
    get,
    path = "/api/stats/app",
    params(RangeParams),
    responses(
        (status = 200, description = "Application-wide analytics", body = AppAnalytics),
        (status = 400, description = "Invalid range parameters"),
        (status = 401, description = "Missing, unknown, expired or revoked API key")
    ),
    security(("api_key" = [])),
    tag = "stats"
)]
#[instrument(skip_all)]
pub async fn app_stats(
    State(services): State<EventServices>, key: ApiKey,
    Query(params): Query<RangeParams>,
) -> Result<Json<AppAnalytics>, AppError> {
    let app = services.authenticate(&key).await?;
    let range = parse_range(params.start.as_deref(), params.end.as_deref())?;

    let analytics = services
        .app_analytics
        .execute(AppAnalyticsQuery {
            app_id: app.id,
            range,
        })
        .await
        .map_err(map_event_error)?;
    Ok(Json(analytics))
}

#[utoipa::path(
    get,
    path = "/api/stats/realtime",
    responses(
        (status = 200, description = "Per-minute counts over the last hour", body = RealtimeWindow),
        (status = 401, description = "Missing, unknown, expired or revoked API key")
    ),
    security(("api_key" = [])),
    tag = "stats"
)]
#[instrument(skip_all)]
pub async fn realtime_stats(
    State(services): State<EventServices>, key: ApiKey,
) -> Result<Json<RealtimeWindow>, AppError> {
    let app = services.authenticate(&key).await?;

    let window = services
        .realtime
        .execute(RealtimeQuery { app_id: app.id })
        .await
        .map_err(map_event_error)?;
    Ok(Json(window))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_bounds_mean_open_range() {
        assert!(parse_range(None, None).unwrap().is_none());
    }

    #[test]
    fn paired_bounds_parse() {
        let range = parse_range(
            Some("2026-08-01T00:00:00Z"),
            Some("2026-08-08T00:00:00Z"),
        )
        .unwrap()
        .unwrap();
        assert!(range.start < range.end);
    }

    #[test]
    fn half_open_range_is_rejected() {
        assert!(parse_range(Some("2026-08-01T00:00:00Z"), None).is_err());
        assert!(parse_range(None, Some("2026-08-08T00:00:00Z")).is_err());
    }

    #[test]
    fn inverted_range_is_rejected() {
        assert!(
            parse_range(
                Some("2026-08-08T00:00:00Z"),
                Some("2026-08-01T00:00:00Z"),
            )
            .is_err()
        );
    }

    #[test]
    fn non_rfc3339_timestamp_is_rejected() {
        assert!(parse_range(Some("yesterday"), Some("today")).is_err());
    }
}
