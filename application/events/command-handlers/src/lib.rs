use analytics_cache_keys::invalidation_prefixes;
use chrono::{DateTime, Utc};
use event_enrichment::Enricher;
use events_dao::EventDao;
use events_errors::EventError;
use events_models::TrackRequest;
use redis_connection::CacheConnect;
use serde::Serialize;
use sql_connection::SqlConnect;
use tracing::{instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// One authenticated ingestion. `app_id` comes from the credential
/// check, never from the payload.
#[derive(Debug)]
pub struct TrackEventCommand {
    pub app_id: Uuid,
    pub request: TrackRequest,
    pub user_agent: Option<String>,
    pub ip: Option<String>,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TrackEventResponse {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
}

/// Write path of the pipeline: enrich, append, invalidate.
#[derive(Clone)]
pub struct TrackEventHandler {
    event_dao: EventDao,
    cache: CacheConnect,
    enricher: Enricher,
}

impl TrackEventHandler {
    pub fn new(db: SqlConnect, cache: CacheConnect, enricher: Enricher) -> Self {
        Self {
            event_dao: EventDao::new(db),
            cache,
            enricher,
        }
    }

    #[instrument(skip_all, fields(app.id = %command.app_id))]
    pub async fn execute(
        &self, command: TrackEventCommand,
    ) -> Result<TrackEventResponse, EventError> {
        let event = self.enricher.enrich(
            command.app_id,
            command.request,
            command.user_agent.as_deref(),
            command.ip.as_deref(),
            command.received_at,
        );

        // Append failure is fatal to the request; nothing was stored.
        let id = self.event_dao.append(&event).await?;

        // The append changed what every cached aggregation for this app
        // could report, so sweep all of its key families. A cache outage
        // here degrades reads to recompute, it never fails ingestion.
        for prefix in invalidation_prefixes(command.app_id) {
            if let Err(err) = self.cache.delete_by_prefix(&prefix).await {
                warn!(
                    app.id = %command.app_id,
                    cache.prefix = %prefix,
                    error = %err,
                    "cache invalidation failed, entries expire by TTL"
                );
            }
        }

        Ok(TrackEventResponse {
            id,
            timestamp: event.timestamp,
        })
    }
}
