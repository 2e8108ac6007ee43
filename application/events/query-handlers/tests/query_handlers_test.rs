use analytics_models::{DateRange, TrendDirection};
use chrono::{Duration, Utc};
use event_enrichment::Enricher;
use events_command_handlers::{TrackEventCommand, TrackEventHandler};
use events_models::TrackRequest;
use events_query_handlers::{
    AppAnalyticsQuery, AppAnalyticsQueryHandler, EventSummaryQuery,
    EventSummaryQueryHandler,
};
use test_utils::{
    TestPostgresContainer, TestRedisContainer, create_cache_connect,
    create_sql_connect, insert_test_app, insert_test_event,
};
use uuid::Uuid;

struct Setup {
    pg: TestPostgresContainer,
    redis: TestRedisContainer,
    app_id: Uuid,
}

impl Setup {
    async fn new() -> anyhow::Result<Self> {
        let pg = TestPostgresContainer::new().await?;
        let redis = TestRedisContainer::new().await?;
        redis.flush_db().await?;
        let app_id = insert_test_app(&pg, "hash", true, None).await?;
        Ok(Self { pg, redis, app_id })
    }

    fn track_handler(&self) -> TrackEventHandler {
        TrackEventHandler::new(
            create_sql_connect(&self.pg),
            create_cache_connect(&self.redis),
            Enricher::default(),
        )
    }

    fn summary_handler(&self) -> EventSummaryQueryHandler {
        EventSummaryQueryHandler::new(
            create_sql_connect(&self.pg),
            create_cache_connect(&self.redis),
        )
    }

    fn analytics_handler(&self) -> AppAnalyticsQueryHandler {
        AppAnalyticsQueryHandler::new(
            create_sql_connect(&self.pg),
            create_cache_connect(&self.redis),
        )
    }

    async fn track(&self, name: &str, user: &str) -> anyhow::Result<()> {
        self.track_handler()
            .execute(TrackEventCommand {
                app_id: self.app_id,
                request: TrackRequest {
                    name: name.to_string(),
                    user_id: Some(user.to_string()),
                    ..Default::default()
                },
                user_agent: None,
                ip: None,
                received_at: Utc::now(),
            })
            .await?;
        Ok(())
    }
}

#[tokio::test]
async fn summary_is_cached_after_first_read() -> anyhow::Result<()> {
    let setup = Setup::new().await?;
    setup.track("page_view", "u1").await?;

    let handler = setup.summary_handler();
    let summary = handler
        .execute(EventSummaryQuery {
            app_id: setup.app_id,
            event: "page_view".to_string(),
            range: None,
        })
        .await?;
    assert_eq!(summary.count, 1);

    let keys = setup.redis.keys_matching("stats:event:*").await?;
    assert_eq!(keys.len(), 1);
    assert!(keys[0].starts_with(&format!("stats:event:{}:", setup.app_id)));
    Ok(())
}

#[tokio::test]
async fn ingestion_invalidates_cached_aggregations() -> anyhow::Result<()> {
    let setup = Setup::new().await?;
    setup.track("page_view", "u1").await?;

    let handler = setup.summary_handler();
    let query = || EventSummaryQuery {
        app_id: setup.app_id,
        event: "page_view".to_string(),
        range: None,
    };

    assert_eq!(handler.execute(query()).await?.count, 1);

    // The write sweeps every stats key family for this app, so the next
    // read recomputes instead of serving the cached count.
    setup.track("page_view", "u2").await?;
    let keys = setup.redis.keys_matching("stats:*").await?;
    assert!(keys.is_empty());

    let summary = handler.execute(query()).await?;
    assert_eq!(summary.count, 2);
    assert_eq!(summary.unique_users, 2);
    Ok(())
}

#[tokio::test]
async fn cached_value_is_served_until_invalidation_or_expiry()
-> anyhow::Result<()> {
    let setup = Setup::new().await?;
    setup.track("page_view", "u1").await?;

    let handler = setup.summary_handler();
    let query = || EventSummaryQuery {
        app_id: setup.app_id,
        event: "page_view".to_string(),
        range: None,
    };
    assert_eq!(handler.execute(query()).await?.count, 1);

    // A row slipped in behind the pipeline's back: the cached entry is
    // still authoritative until a tracked write sweeps it.
    insert_test_event(
        &setup.pg,
        setup.app_id,
        "page_view",
        Some("u2"),
        "desktop",
        Utc::now(),
    )
    .await?;
    assert_eq!(handler.execute(query()).await?.count, 1);
    Ok(())
}

#[tokio::test]
async fn distinct_ranges_get_distinct_cache_entries() -> anyhow::Result<()> {
    let setup = Setup::new().await?;
    setup.track("page_view", "u1").await?;

    let handler = setup.summary_handler();
    let now = Utc::now();

    handler
        .execute(EventSummaryQuery {
            app_id: setup.app_id,
            event: "page_view".to_string(),
            range: None,
        })
        .await?;
    handler
        .execute(EventSummaryQuery {
            app_id: setup.app_id,
            event: "page_view".to_string(),
            range: Some(DateRange {
                start: now - Duration::days(7),
                end: now,
            }),
        })
        .await?;

    let keys = setup.redis.keys_matching("stats:event:*").await?;
    assert_eq!(keys.len(), 2);
    Ok(())
}

#[tokio::test]
async fn trend_compares_against_the_previous_period() -> anyhow::Result<()> {
    let setup = Setup::new().await?;
    setup.track("page_view", "u1").await?;
    setup.track("page_view", "u2").await?;

    let now = Utc::now();
    let summary = setup
        .summary_handler()
        .execute(EventSummaryQuery {
            app_id: setup.app_id,
            event: "page_view".to_string(),
            range: Some(DateRange {
                start: now - Duration::hours(1),
                end: now,
            }),
        })
        .await?;

    // Nothing in the hour before the window: growth from zero reads as
    // a full step up.
    let trend = summary.trend.unwrap();
    assert_eq!(trend.trend, TrendDirection::Up);
    assert_eq!(trend.change, 100.0);
    Ok(())
}

#[tokio::test]
async fn conversion_rate_is_part_of_the_app_rollup() -> anyhow::Result<()> {
    let setup = Setup::new().await?;
    setup.track("page_view", "u1").await?;
    setup.track("purchase_complete", "u1").await?;

    let analytics = setup
        .analytics_handler()
        .execute(AppAnalyticsQuery {
            app_id: setup.app_id,
            range: None,
        })
        .await?;

    assert_eq!(analytics.total_events, 2);
    assert_eq!(analytics.conversion_rate, 50.0);
    Ok(())
}
