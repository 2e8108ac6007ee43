use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use redis_connection::CacheConnect;
use sql_connection::SqlConnect;
use uuid::Uuid;

use crate::{TestPostgresContainer, TestRedisContainer};

pub fn create_sql_connect(container: &TestPostgresContainer) -> SqlConnect {
    SqlConnect::new(container.pool.clone())
}

pub fn create_cache_connect(container: &TestRedisContainer) -> CacheConnect {
    CacheConnect::new(container.pool.clone())
}

/// Insert an application row directly. `key_hash` is stored as given so
/// credential tests control the hashing themselves.
pub async fn insert_test_app(
    container: &TestPostgresContainer, key_hash: &str, active: bool,
    expires_at: Option<DateTime<Utc>>,
) -> Result<Uuid> {
    let id = Uuid::now_v7();
    let owner_id = Uuid::now_v7();
    let expires_at =
        expires_at.unwrap_or_else(|| Utc::now() + Duration::days(365));
    let client = container.pool.get().await?;
    client
        .execute(
            "INSERT INTO applications (id, name, domain, kind, key_hash, \
             active, expires_at, owner_id, created_at) \
             VALUES ($1, 'test app', 'example.com', 'web', $2, $3, $4, \
             $5, NOW())",
            &[&id, &key_hash, &active, &expires_at, &owner_id],
        )
        .await?;
    Ok(id)
}

/// Insert an event row directly, bypassing enrichment.
pub async fn insert_test_event(
    container: &TestPostgresContainer, app_id: Uuid, name: &str,
    user_id: Option<&str>, device: &str, timestamp: DateTime<Utc>,
) -> Result<Uuid> {
    insert_test_event_full(
        container, app_id, name, user_id, None, device, None, timestamp,
    )
    .await
}

#[allow(clippy::too_many_arguments)]
pub async fn insert_test_event_full(
    container: &TestPostgresContainer, app_id: Uuid, name: &str,
    user_id: Option<&str>, session_id: Option<&str>, device: &str,
    country: Option<&str>, timestamp: DateTime<Utc>,
) -> Result<Uuid> {
    let id = Uuid::now_v7();
    let metadata = country
        .map(|c| serde_json::json!({ "country": c }))
        .unwrap_or(serde_json::Value::Null);
    let client = container.pool.get().await?;
    client
        .execute(
            "INSERT INTO events (id, app_id, name, user_id, session_id, \
             url, referrer, device, ip, user_agent, metadata, timestamp) \
             VALUES ($1, $2, $3, $4, $5, NULL, NULL, $6, NULL, NULL, $7, \
             $8)",
            &[
                &id, &app_id, &name, &user_id, &session_id, &device,
                &metadata, &timestamp,
            ],
        )
        .await?;
    Ok(id)
}
