//! Cache key families for aggregation results. Every key starts with
//! `stats:<kind>:<app_id>:` so a write by one application can sweep its
//! own families without touching anyone else's entries.

use std::time::Duration;

use analytics_models::{
    AppAnalytics, EventSummary, RealtimeWindow, UserStats,
};
use redis_connection::cache_key;
use uuid::Uuid;

cache_key!(EventSummaryCacheKey::<EventSummary> => "stats:event:{}:{}:{}"[app_id: Uuid, event: String, range: String]);
cache_key!(UserStatsCacheKey::<UserStats> => "stats:user:{}:{}"[app_id: Uuid, user_id: String]);
cache_key!(AppAnalyticsCacheKey::<AppAnalytics> => "stats:app:{}:{}"[app_id: Uuid, range: String]);
cache_key!(RealtimeWindowCacheKey::<RealtimeWindow> => "stats:realtime:{}:{}"[app_id: Uuid, window_minutes: i64]);

// Accepted staleness per stat kind.
pub const EVENT_SUMMARY_TTL: Duration = Duration::from_secs(300);
pub const USER_STATS_TTL: Duration = Duration::from_secs(120);
pub const APP_ANALYTICS_TTL: Duration = Duration::from_secs(600);
pub const REALTIME_TTL: Duration = Duration::from_secs(15);

/// The key families a successful append invalidates for the writing
/// application. Explicit enumeration, not one glob over everything the
/// app ever cached.
pub fn invalidation_prefixes(app_id: Uuid) -> [String; 4] {
    [
        format!("stats:event:{app_id}:"),
        format!("stats:user:{app_id}:"),
        format!("stats:app:{app_id}:"),
        format!("stats:realtime:{app_id}:"),
    ]
}

#[cfg(test)]
mod tests {
    use redis_connection::key::CacheKey;

    use super::*;

    #[test]
    fn identical_queries_produce_identical_keys() {
        let app_id = Uuid::now_v7();
        let event = "page_view".to_string();
        let range = "all".to_string();

        let a = EventSummaryCacheKey
            .key_with_args((&app_id, &event, &range))
            .into_owned();
        let b = EventSummaryCacheKey
            .key_with_args((&app_id, &event, &range))
            .into_owned();
        assert_eq!(a, b);
    }

    #[test]
    fn keys_fall_under_their_invalidation_prefix() {
        let app_id = Uuid::now_v7();
        let prefixes = invalidation_prefixes(app_id);

        let event_key = EventSummaryCacheKey
            .key_with_args((&app_id, &"signup".to_string(), &"all".to_string()))
            .into_owned();
        let user_key = UserStatsCacheKey
            .key_with_args((&app_id, &"u1".to_string()))
            .into_owned();
        let app_key = AppAnalyticsCacheKey
            .key_with_args((&app_id, &"all".to_string()))
            .into_owned();
        let realtime_key = RealtimeWindowCacheKey
            .key_with_args((&app_id, &60))
            .into_owned();

        assert!(event_key.starts_with(&prefixes[0]));
        assert!(user_key.starts_with(&prefixes[1]));
        assert!(app_key.starts_with(&prefixes[2]));
        assert!(realtime_key.starts_with(&prefixes[3]));
    }

    #[test]
    fn prefixes_are_scoped_to_one_app() {
        let a = invalidation_prefixes(Uuid::now_v7());
        let b = invalidation_prefixes(Uuid::now_v7());
        for (pa, pb) in a.iter().zip(b.iter()) {
            assert_ne!(pa, pb);
        }
    }
}
