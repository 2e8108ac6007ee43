pub mod auth;
pub mod stats;
pub mod track;

use app_credentials::CredentialStore;
use app_errors::ApplicationError;
use app_models::Application;
use axum::{
    Router,
    routing::{get, post},
};
use common_errors::AppError;
use event_enrichment::Enricher;
use events_command_handlers::TrackEventHandler;
use events_errors::EventError;
use events_query_handlers::{
    AppAnalyticsQueryHandler, EventSummaryQueryHandler, RealtimeQueryHandler,
    UserStatsQueryHandler,
};
use redis_connection::CacheConnect;
use sql_connection::SqlConnect;

pub use crate::auth::{API_KEY_HEADER, ApiKey};

#[derive(Clone)]
pub struct EventServices {
    pub credentials: CredentialStore,
    pub track: TrackEventHandler,
    pub event_summary: EventSummaryQueryHandler,
    pub user_stats: UserStatsQueryHandler,
    pub app_analytics: AppAnalyticsQueryHandler,
    pub realtime: RealtimeQueryHandler,
}

impl EventServices {
    pub fn new(db: SqlConnect, cache: CacheConnect, enricher: Enricher) -> Self {
        Self {
            credentials: CredentialStore::new(db.clone()),
            track: TrackEventHandler::new(
                db.clone(),
                cache.clone(),
                enricher,
            ),
            event_summary: EventSummaryQueryHandler::new(
                db.clone(),
                cache.clone(),
            ),
            user_stats: UserStatsQueryHandler::new(db.clone(), cache.clone()),
            app_analytics: AppAnalyticsQueryHandler::new(
                db.clone(),
                cache.clone(),
            ),
            realtime: RealtimeQueryHandler::new(db, cache),
        }
    }

    /// Runs the credential scan for a presented key. Storage trouble is
    /// surfaced as 503; any other outcome short of a live match is the
    /// uniform 401.
    pub(crate) async fn authenticate(
        &self, key: &ApiKey,
    ) -> Result<Application, AppError> {
        match self.credentials.authenticate(&key.0).await {
            Ok(Some(app)) => Ok(app),
            Ok(None) => Err(AppError::unauthorized()),
            Err(err) => Err(map_application_error(err)),
        }
    }
}

pub struct EventHandlers;

impl EventHandlers {
    pub fn routes() -> Router<EventServices> {
        Router::new()
            .route("/track", post(track::track_event))
            .route("/stats/event", get(stats::event_stats))
            .route("/stats/user/{user_id}", get(stats::user_stats))
            .route("/stats/app", get(stats::app_stats))
            .route("/stats/realtime", get(stats::realtime_stats))
    }
}

pub(crate) fn map_application_error(err: ApplicationError) -> AppError {
    match err {
        ApplicationError::Connection(_) => AppError::storage_unavailable(
            "Application store is unreachable, try again shortly",
        ),
        err => AppError::from_error(err),
    }
}

pub(crate) fn map_event_error(err: EventError) -> AppError {
    if err.is_storage_unavailable() {
        AppError::storage_unavailable(
            "Event store is unreachable, try again shortly",
        )
    }
    else {
        AppError::from_error(err)
    }
}
