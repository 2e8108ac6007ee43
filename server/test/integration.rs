use app_models::{AppKind, RegisterAppRequest};
use chrono::Utc;
use event_enrichment::Enricher;
use events_command_handlers::TrackEventCommand;
use events_http::EventServices;
use events_models::{DeviceClass, TrackRequest};
use events_query_handlers::{EventSummaryQuery, RealtimeQuery, UserStatsQuery};
use test_utils::{
    TestPostgresContainer, TestRedisContainer, create_cache_connect,
    create_sql_connect,
};
use uuid::Uuid;

pub struct IntegrationTestSetup {
    pub pg: TestPostgresContainer,
    pub redis: TestRedisContainer,
    pub services: EventServices,
}

impl IntegrationTestSetup {
    pub async fn new() -> anyhow::Result<Self> {
        let pg = TestPostgresContainer::new().await?;
        let redis = TestRedisContainer::new().await?;
        redis.flush_db().await?;

        let services = EventServices::new(
            create_sql_connect(&pg),
            create_cache_connect(&redis),
            Enricher::default(),
        );

        Ok(Self {
            pg,
            redis,
            services,
        })
    }

    pub async fn register_app(
        &self, name: &str,
    ) -> anyhow::Result<(Uuid, String)> {
        let issued = self
            .services
            .credentials
            .issue(RegisterAppRequest {
                name: name.to_string(),
                domain: "example.com".to_string(),
                kind: AppKind::Web,
                owner_id: Uuid::now_v7(),
            })
            .await?;
        Ok((issued.app.id, issued.plaintext_key))
    }

    pub async fn track(
        &self, app_id: Uuid, name: &str, user: Option<&str>,
        user_agent: Option<&str>,
    ) -> anyhow::Result<()> {
        self.services
            .track
            .execute(TrackEventCommand {
                app_id,
                request: TrackRequest {
                    name: name.to_string(),
                    user_id: user.map(str::to_string),
                    ..Default::default()
                },
                user_agent: user_agent.map(str::to_string),
                ip: None,
                received_at: Utc::now(),
            })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IPHONE_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like \
                             Mac OS X) AppleWebKit/605.1.15 (KHTML, like \
                             Gecko) Version/17.0 Mobile/15E148 Safari/604.1";

    #[tokio::test]
    async fn issued_key_flows_through_the_whole_pipeline()
    -> anyhow::Result<()> {
        let setup = IntegrationTestSetup::new().await?;
        let (app_id, key) = setup.register_app("storefront").await?;

        // The key authenticates to the record it was issued for.
        let app = setup.services.credentials.authenticate(&key).await?;
        assert_eq!(app.map(|a| a.id), Some(app_id));

        setup
            .track(app_id, "page_view", Some("u1"), Some(IPHONE_UA))
            .await?;
        setup.track(app_id, "page_view", Some("u2"), None).await?;

        let summary = setup
            .services
            .event_summary
            .execute(EventSummaryQuery {
                app_id,
                event: "page_view".to_string(),
                range: None,
            })
            .await?;
        assert_eq!(summary.count, 2);
        assert_eq!(summary.unique_users, 2);
        // Enrichment classified the phone; the bare request defaulted.
        assert_eq!(summary.device_breakdown.mobile, 1);
        assert_eq!(summary.device_breakdown.desktop, 1);

        let window = setup
            .services
            .realtime
            .execute(RealtimeQuery { app_id })
            .await?;
        let total: i64 = window
            .buckets
            .iter()
            .flat_map(|b| b.counts.iter())
            .map(|c| c.count)
            .sum();
        assert_eq!(total, 2);
        Ok(())
    }

    #[tokio::test]
    async fn revoked_key_is_rejected_but_history_survives()
    -> anyhow::Result<()> {
        let setup = IntegrationTestSetup::new().await?;
        let (app_id, key) = setup.register_app("storefront").await?;
        setup.track(app_id, "signup", Some("u1"), None).await?;

        let app = setup
            .services
            .credentials
            .authenticate(&key)
            .await?
            .unwrap();
        setup.services.credentials.revoke(app.id, app.owner_id).await?;

        assert!(setup.services.credentials.authenticate(&key).await?.is_none());

        // Stored events stay queryable; only ingestion is locked out.
        let stats = setup
            .services
            .user_stats
            .execute(UserStatsQuery {
                app_id,
                user_id: "u1".to_string(),
            })
            .await?;
        assert_eq!(stats.total_events, 1);
        Ok(())
    }

    #[tokio::test]
    async fn two_apps_keep_separate_statistics() -> anyhow::Result<()> {
        let setup = IntegrationTestSetup::new().await?;
        let (first, _) = setup.register_app("first").await?;
        let (second, _) = setup.register_app("second").await?;

        setup.track(first, "page_view", Some("u1"), None).await?;
        setup.track(first, "page_view", Some("u2"), None).await?;
        setup.track(second, "page_view", Some("u1"), None).await?;

        let summary = setup
            .services
            .event_summary
            .execute(EventSummaryQuery {
                app_id: second,
                event: "page_view".to_string(),
                range: None,
            })
            .await?;
        assert_eq!(summary.count, 1);

        // Writes to one app never sweep the other's cache entries.
        let _ = setup
            .services
            .event_summary
            .execute(EventSummaryQuery {
                app_id: first,
                event: "page_view".to_string(),
                range: None,
            })
            .await?;
        setup.track(second, "click", None, None).await?;
        let keys = setup
            .redis
            .keys_matching(&format!("stats:event:{first}:*"))
            .await?;
        assert_eq!(keys.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn anonymous_device_defaults_are_stable() -> anyhow::Result<()> {
        let setup = IntegrationTestSetup::new().await?;
        let (app_id, _) = setup.register_app("storefront").await?;

        setup.track(app_id, "page_view", None, None).await?;

        let summary = setup
            .services
            .event_summary
            .execute(EventSummaryQuery {
                app_id,
                event: "page_view".to_string(),
                range: None,
            })
            .await?;
        assert_eq!(summary.count, 1);
        assert_eq!(summary.unique_users, 0);
        assert_eq!(
            summary.device_breakdown.desktop,
            1,
            "no user agent and no explicit device must classify as {}",
            DeviceClass::Desktop.as_str()
        );
        Ok(())
    }
}
