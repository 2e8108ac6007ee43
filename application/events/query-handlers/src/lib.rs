//! Read side of the pipeline: each handler checks its cache key family
//! first and only consults the event store on a miss. Cache failures in
//! either direction are logged and swallowed; a cache outage means
//! recompute, never a failed read.

use analytics_cache_keys::{
    APP_ANALYTICS_TTL, AppAnalyticsCacheKey, EVENT_SUMMARY_TTL,
    EventSummaryCacheKey, REALTIME_TTL, RealtimeWindowCacheKey,
    USER_STATS_TTL, UserStatsCacheKey,
};
use analytics_models::{
    AppAnalytics, DateRange, EventSummary, RealtimeWindow, Trend, UserStats,
};
use chrono::Utc;
use events_dao::EventDao;
use events_errors::EventError;
use redis_connection::CacheConnect;
use serde::Deserialize;
use sql_connection::SqlConnect;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

pub const REALTIME_WINDOW_MINUTES: i64 = 60;

fn round2(value: f64) -> f64 { (value * 100.0).round() / 100.0 }

#[derive(Debug, Deserialize)]
pub struct EventSummaryQuery {
    pub app_id: Uuid,
    pub event: String,
    pub range: Option<DateRange>,
}

#[derive(Clone)]
pub struct EventSummaryQueryHandler {
    event_dao: EventDao,
    cache: CacheConnect,
}

impl EventSummaryQueryHandler {
    pub fn new(db: SqlConnect, cache: CacheConnect) -> Self {
        Self {
            event_dao: EventDao::new(db),
            cache,
        }
    }

    #[instrument(skip(self))]
    pub async fn execute(
        &self, query: EventSummaryQuery,
    ) -> Result<EventSummary, EventError> {
        let range_token = DateRange::cache_token(query.range.as_ref());
        let args = (&query.app_id, &query.event, &range_token);

        match self.cache.try_get(&EventSummaryCacheKey, args).await {
            Ok(Some(summary)) => {
                debug!(event = %query.event, "event summary cache hit");
                return Ok(summary);
            }
            Ok(None) => {}
            Err(err) => {
                warn!(error = %err, "event summary cache read failed");
            }
        }

        let mut summary = self
            .event_dao
            .summarize_by_event(
                query.app_id,
                &query.event,
                query.range.as_ref(),
            )
            .await?;

        if let Some(range) = &query.range {
            let previous = self
                .event_dao
                .count_events(
                    query.app_id,
                    Some(&query.event),
                    Some(&range.previous_period()),
                )
                .await?;
            summary.trend = Some(Trend::from_counts(summary.count, previous));
        }

        if let Err(err) = self
            .cache
            .set_with_expire(
                &EventSummaryCacheKey,
                args,
                &summary,
                EVENT_SUMMARY_TTL,
            )
            .await
        {
            warn!(error = %err, "event summary cache write failed");
        }

        Ok(summary)
    }
}

#[derive(Debug, Deserialize)]
pub struct UserStatsQuery {
    pub app_id: Uuid,
    pub user_id: String,
}

#[derive(Clone)]
pub struct UserStatsQueryHandler {
    event_dao: EventDao,
    cache: CacheConnect,
}

impl UserStatsQueryHandler {
    pub fn new(db: SqlConnect, cache: CacheConnect) -> Self {
        Self {
            event_dao: EventDao::new(db),
            cache,
        }
    }

    #[instrument(skip(self))]
    pub async fn execute(
        &self, query: UserStatsQuery,
    ) -> Result<UserStats, EventError> {
        let args = (&query.app_id, &query.user_id);

        match self.cache.try_get(&UserStatsCacheKey, args).await {
            Ok(Some(stats)) => {
                debug!(user = %query.user_id, "user stats cache hit");
                return Ok(stats);
            }
            Ok(None) => {}
            Err(err) => warn!(error = %err, "user stats cache read failed"),
        }

        let stats = self
            .event_dao
            .summarize_by_user(query.app_id, &query.user_id)
            .await?;

        if let Err(err) = self
            .cache
            .set_with_expire(&UserStatsCacheKey, args, &stats, USER_STATS_TTL)
            .await
        {
            warn!(error = %err, "user stats cache write failed");
        }

        Ok(stats)
    }
}

#[derive(Debug, Deserialize)]
pub struct AppAnalyticsQuery {
    pub app_id: Uuid,
    pub range: Option<DateRange>,
}

#[derive(Clone)]
pub struct AppAnalyticsQueryHandler {
    event_dao: EventDao,
    cache: CacheConnect,
}

impl AppAnalyticsQueryHandler {
    pub fn new(db: SqlConnect, cache: CacheConnect) -> Self {
        Self {
            event_dao: EventDao::new(db),
            cache,
        }
    }

    #[instrument(skip(self))]
    pub async fn execute(
        &self, query: AppAnalyticsQuery,
    ) -> Result<AppAnalytics, EventError> {
        let range_token = DateRange::cache_token(query.range.as_ref());
        let args = (&query.app_id, &range_token);

        match self.cache.try_get(&AppAnalyticsCacheKey, args).await {
            Ok(Some(analytics)) => {
                debug!(app.id = %query.app_id, "app analytics cache hit");
                return Ok(analytics);
            }
            Ok(None) => {}
            Err(err) => {
                warn!(error = %err, "app analytics cache read failed");
            }
        }

        let mut analytics = self
            .event_dao
            .summarize_by_app(query.app_id, query.range.as_ref())
            .await?;

        let conversions = self
            .event_dao
            .count_conversions(query.app_id, query.range.as_ref())
            .await?;
        analytics.conversion_rate = if analytics.total_events > 0 {
            round2(conversions as f64 / analytics.total_events as f64 * 100.0)
        }
        else {
            0.0
        };

        if let Some(range) = &query.range {
            let previous = self
                .event_dao
                .count_events(
                    query.app_id,
                    None,
                    Some(&range.previous_period()),
                )
                .await?;
            analytics.trend =
                Some(Trend::from_counts(analytics.total_events, previous));
        }

        if let Err(err) = self
            .cache
            .set_with_expire(
                &AppAnalyticsCacheKey,
                args,
                &analytics,
                APP_ANALYTICS_TTL,
            )
            .await
        {
            warn!(error = %err, "app analytics cache write failed");
        }

        Ok(analytics)
    }
}

#[derive(Debug, Deserialize)]
pub struct RealtimeQuery {
    pub app_id: Uuid,
}

#[derive(Clone)]
pub struct RealtimeQueryHandler {
    event_dao: EventDao,
    cache: CacheConnect,
}

impl RealtimeQueryHandler {
    pub fn new(db: SqlConnect, cache: CacheConnect) -> Self {
        Self {
            event_dao: EventDao::new(db),
            cache,
        }
    }

    #[instrument(skip(self))]
    pub async fn execute(
        &self, query: RealtimeQuery,
    ) -> Result<RealtimeWindow, EventError> {
        let args = (&query.app_id, &REALTIME_WINDOW_MINUTES);

        match self.cache.try_get(&RealtimeWindowCacheKey, args).await {
            Ok(Some(window)) => return Ok(window),
            Ok(None) => {}
            Err(err) => {
                warn!(error = %err, "realtime window cache read failed");
            }
        }

        let window = self
            .event_dao
            .realtime_window(
                query.app_id,
                Utc::now(),
                REALTIME_WINDOW_MINUTES,
            )
            .await?;

        if let Err(err) = self
            .cache
            .set_with_expire(
                &RealtimeWindowCacheKey,
                args,
                &window,
                REALTIME_TTL,
            )
            .await
        {
            warn!(error = %err, "realtime window cache write failed");
        }

        Ok(window)
    }
}
