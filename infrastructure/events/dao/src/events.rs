use std::collections::BTreeMap;

use analytics_models::{
    AppAnalytics, DateRange, DeviceBreakdown, DeviceDetails, EventSummary,
    MinuteBucket, NameCount, RealtimeWindow, RecentEvent, UserStats,
};
use chrono::{DateTime, Duration, Utc};
use events_errors::EventError;
use events_models::{DeviceClass, EnrichmentMetadata, NewEvent};
use sql_connection::SqlConnect;
use tracing::instrument;
use uuid::Uuid;

use crate::PgParamVec;

#[derive(Clone)]
pub struct EventDao {
    db: SqlConnect,
}

fn param_refs(
    params: &PgParamVec,
) -> Vec<&(dyn tokio_postgres::types::ToSql + Sync)> {
    params
        .iter()
        .map(|p| p.as_ref() as &(dyn tokio_postgres::types::ToSql + Sync))
        .collect()
}

/// Append `AND timestamp >= $n AND timestamp <= $n+1` when a range is
/// given. Parameter slots $1/$2 are always app_id (+ name/user filter).
fn range_clause(range: Option<&DateRange>, first_slot: usize) -> String {
    match range {
        Some(_) => format!(
            " AND timestamp >= ${} AND timestamp <= ${}",
            first_slot,
            first_slot + 1
        ),
        None => String::new(),
    }
}

fn push_range(params: &mut PgParamVec, range: Option<&DateRange>) {
    if let Some(range) = range {
        params.push(Box::new(range.start));
        params.push(Box::new(range.end));
    }
}

fn map_recent_row(row: &tokio_postgres::Row) -> RecentEvent {
    let device: String = row.get(2);
    RecentEvent {
        name: row.get(0),
        url: row.get(1),
        device: DeviceClass::parse(&device).unwrap_or(DeviceClass::Desktop),
        timestamp: row.get(3),
    }
}

impl EventDao {
    pub fn new(db: SqlConnect) -> Self { Self { db } }

    /// Durable append. Never rejects on business grounds; validation
    /// happened before this layer. A pool or database failure here is
    /// fatal to the ingesting request.
    #[instrument(skip(self, event), fields(event.name = %event.name))]
    pub async fn append(
        &self, event: &NewEvent,
    ) -> Result<Uuid, EventError> {
        let client = self.db.get_client().await?;
        let stmt = client
            .prepare(
                "INSERT INTO events (id, app_id, name, user_id, \
                 session_id, url, referrer, device, ip, user_agent, \
                 metadata, timestamp) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, \
                 $12) RETURNING id",
            )
            .await?;
        let id = Uuid::now_v7();
        // Empty metadata is stored as NULL, not an all-null object.
        let metadata = if event.metadata.is_empty() {
            serde_json::Value::Null
        }
        else {
            serde_json::to_value(&event.metadata)
                .unwrap_or(serde_json::Value::Null)
        };
        let row = client
            .query_one(
                &stmt,
                &[
                    &id,
                    &event.app_id,
                    &event.name,
                    &event.user_id,
                    &event.session_id,
                    &event.url,
                    &event.referrer,
                    &event.device.as_str(),
                    &event.ip,
                    &event.user_agent,
                    &metadata,
                    &event.timestamp,
                ],
            )
            .await?;
        Ok(row.get(0))
    }

    /// Count + unique users + device breakdown for one event name.
    /// `COUNT(DISTINCT user_id)` skips NULLs, so anonymous events never
    /// contribute a distinct user.
    #[instrument(skip(self))]
    pub async fn summarize_by_event(
        &self, app_id: Uuid, name: &str, range: Option<&DateRange>,
    ) -> Result<EventSummary, EventError> {
        let client = self.db.get_read_client().await?;

        let mut params: PgParamVec =
            vec![Box::new(app_id), Box::new(name.to_string())];
        push_range(&mut params, range);
        let clause = range_clause(range, 3);

        let totals = format!(
            "SELECT COUNT(*), COUNT(DISTINCT user_id) FROM events \
             WHERE app_id = $1 AND name = $2{clause}"
        );
        let stmt = client.prepare(&totals).await?;
        let row = client.query_one(&stmt, &param_refs(&params)).await?;
        let count: i64 = row.get(0);
        let unique_users: i64 = row.get(1);

        let by_device = format!(
            "SELECT device, COUNT(*) FROM events \
             WHERE app_id = $1 AND name = $2{clause} GROUP BY device"
        );
        let stmt = client.prepare(&by_device).await?;
        let rows = client.query(&stmt, &param_refs(&params)).await?;

        let mut device_breakdown = DeviceBreakdown::default();
        for row in rows {
            let device: String = row.get(0);
            if let Some(device) = DeviceClass::parse(&device) {
                device_breakdown.add(device, row.get(1));
            }
        }

        Ok(EventSummary {
            count,
            unique_users,
            device_breakdown,
            trend: None,
        })
    }

    /// Event count for an app, optionally narrowed to one event name.
    /// Feeds trend computation over the previous period.
    #[instrument(skip(self))]
    pub async fn count_events(
        &self, app_id: Uuid, name: Option<&str>, range: Option<&DateRange>,
    ) -> Result<i64, EventError> {
        let client = self.db.get_read_client().await?;

        let (query, params): (String, PgParamVec) = if let Some(name) = name {
            let mut params: PgParamVec =
                vec![Box::new(app_id), Box::new(name.to_string())];
            push_range(&mut params, range);
            (
                format!(
                    "SELECT COUNT(*) FROM events \
                     WHERE app_id = $1 AND name = $2{}",
                    range_clause(range, 3)
                ),
                params,
            )
        }
        else {
            let mut params: PgParamVec = vec![Box::new(app_id)];
            push_range(&mut params, range);
            (
                format!(
                    "SELECT COUNT(*) FROM events WHERE app_id = $1{}",
                    range_clause(range, 2)
                ),
                params,
            )
        };

        let stmt = client.prepare(&query).await?;
        let row = client.query_one(&stmt, &param_refs(&params)).await?;
        Ok(row.get(0))
    }

    /// Events whose name marks a conversion, for the conversion-rate
    /// metric in the app rollup.
    #[instrument(skip(self))]
    pub async fn count_conversions(
        &self, app_id: Uuid, range: Option<&DateRange>,
    ) -> Result<i64, EventError> {
        let client = self.db.get_read_client().await?;

        let mut params: PgParamVec = vec![Box::new(app_id)];
        push_range(&mut params, range);
        let query = format!(
            "SELECT COUNT(*) FROM events WHERE app_id = $1 \
             AND (name ILIKE '%conversion%' OR name ILIKE '%purchase%'){}",
            range_clause(range, 2)
        );

        let stmt = client.prepare(&query).await?;
        let row = client.query_one(&stmt, &param_refs(&params)).await?;
        Ok(row.get(0))
    }

    #[instrument(skip(self))]
    pub async fn summarize_by_user(
        &self, app_id: Uuid, user_id: &str,
    ) -> Result<UserStats, EventError> {
        let client = self.db.get_read_client().await?;
        let user_id = user_id.to_string();

        let stmt = client
            .prepare(
                "SELECT COUNT(*), COUNT(DISTINCT name), MIN(timestamp), \
                 MAX(timestamp), COUNT(DISTINCT session_id) \
                 FROM events WHERE app_id = $1 AND user_id = $2",
            )
            .await?;
        let row = client.query_one(&stmt, &[&app_id, &user_id]).await?;
        let total_events: i64 = row.get(0);
        let unique_event_types: i64 = row.get(1);
        let first_seen: Option<DateTime<Utc>> = row.get(2);
        let last_seen: Option<DateTime<Utc>> = row.get(3);
        let session_count: i64 = row.get(4);

        // Ties resolve by the canonical device order, never by scan order.
        let stmt = client
            .prepare(
                "SELECT device FROM events \
                 WHERE app_id = $1 AND user_id = $2 \
                 GROUP BY device \
                 ORDER BY COUNT(*) DESC, \
                 CASE device WHEN 'mobile' THEN 0 \
                 WHEN 'desktop' THEN 1 ELSE 2 END \
                 LIMIT 1",
            )
            .await?;
        let rows = client.query(&stmt, &[&app_id, &user_id]).await?;
        let most_frequent_device = rows.first().and_then(|row| {
            let device: String = row.get(0);
            DeviceClass::parse(&device)
        });

        let stmt = client
            .prepare(
                "SELECT name, url, device, timestamp, metadata \
                 FROM events WHERE app_id = $1 AND user_id = $2 \
                 ORDER BY timestamp DESC LIMIT 10",
            )
            .await?;
        let rows = client.query(&stmt, &[&app_id, &user_id]).await?;

        // Most recently seen event carries the device details.
        let device_details = rows.first().map(|row| {
            let device: String = row.get(2);
            let metadata: Option<serde_json::Value> = row.get(4);
            let metadata: EnrichmentMetadata = metadata
                .and_then(|json| serde_json::from_value(json).ok())
                .unwrap_or_default();
            DeviceDetails {
                device: DeviceClass::parse(&device)
                    .unwrap_or(DeviceClass::Desktop),
                browser: metadata.browser,
                os: metadata.os,
            }
        });

        let recent_events = rows.iter().map(map_recent_row).collect();

        Ok(UserStats {
            total_events,
            unique_event_types,
            device_details,
            first_seen,
            last_seen,
            session_count,
            most_frequent_device,
            recent_events,
        })
    }

    #[instrument(skip(self))]
    pub async fn summarize_by_app(
        &self, app_id: Uuid, range: Option<&DateRange>,
    ) -> Result<AppAnalytics, EventError> {
        let client = self.db.get_read_client().await?;

        let mut params: PgParamVec = vec![Box::new(app_id)];
        push_range(&mut params, range);
        let clause = range_clause(range, 2);
        let refs = param_refs(&params);

        let stmt = client
            .prepare(&format!(
                "SELECT COUNT(*), COUNT(DISTINCT user_id) FROM events \
                 WHERE app_id = $1{clause}"
            ))
            .await?;
        let row = client.query_one(&stmt, &refs).await?;
        let total_events: i64 = row.get(0);
        let unique_users: i64 = row.get(1);

        let stmt = client
            .prepare(&format!(
                "SELECT name, COUNT(*) FROM events WHERE app_id = $1{clause} \
                 GROUP BY name ORDER BY COUNT(*) DESC, name"
            ))
            .await?;
        let rows = client.query(&stmt, &refs).await?;
        let per_event = rows
            .into_iter()
            .map(|row| NameCount {
                name: row.get(0),
                count: row.get(1),
            })
            .collect();

        let stmt = client
            .prepare(&format!(
                "SELECT device, COUNT(*) FROM events \
                 WHERE app_id = $1{clause} GROUP BY device"
            ))
            .await?;
        let rows = client.query(&stmt, &refs).await?;
        let mut per_device = DeviceBreakdown::default();
        for row in rows {
            let device: String = row.get(0);
            if let Some(device) = DeviceClass::parse(&device) {
                per_device.add(device, row.get(1));
            }
        }

        // Only events with a resolved country participate; absence stays
        // absent instead of inventing an "unknown" country.
        let stmt = client
            .prepare(&format!(
                "SELECT metadata->>'country', COUNT(*) FROM events \
                 WHERE app_id = $1{clause} \
                 AND metadata->>'country' IS NOT NULL \
                 GROUP BY metadata->>'country' \
                 ORDER BY COUNT(*) DESC, metadata->>'country'"
            ))
            .await?;
        let rows = client.query(&stmt, &refs).await?;
        let per_country = rows
            .into_iter()
            .map(|row| NameCount {
                name: row.get(0),
                count: row.get(1),
            })
            .collect();

        let stmt = client
            .prepare(&format!(
                "SELECT EXTRACT(HOUR FROM timestamp)::int, COUNT(*) \
                 FROM events WHERE app_id = $1{clause} \
                 GROUP BY 1 ORDER BY 1"
            ))
            .await?;
        let rows = client.query(&stmt, &refs).await?;
        let mut hourly_histogram = vec![0i64; 24];
        for row in rows {
            let hour: i32 = row.get(0);
            if let Some(slot) = hourly_histogram.get_mut(hour as usize) {
                *slot = row.get(1);
            }
        }

        let stmt = client
            .prepare(&format!(
                "SELECT name, url, device, timestamp FROM events \
                 WHERE app_id = $1{clause} \
                 ORDER BY timestamp DESC LIMIT 20"
            ))
            .await?;
        let rows = client.query(&stmt, &refs).await?;
        let recent_events = rows.iter().map(map_recent_row).collect();

        Ok(AppAnalytics {
            total_events,
            unique_users,
            per_event,
            per_device,
            per_country,
            hourly_histogram,
            recent_events,
            conversion_rate: 0.0,
            trend: None,
        })
    }

    /// Per-minute buckets over the trailing window, oldest first. Only
    /// minutes that saw traffic appear.
    #[instrument(skip(self))]
    pub async fn realtime_window(
        &self, app_id: Uuid, now: DateTime<Utc>, window_minutes: i64,
    ) -> Result<RealtimeWindow, EventError> {
        let client = self.db.get_read_client().await?;
        let since = now - Duration::minutes(window_minutes);

        let stmt = client
            .prepare(
                "SELECT date_trunc('minute', timestamp), name, COUNT(*) \
                 FROM events WHERE app_id = $1 AND timestamp >= $2 \
                 GROUP BY 1, 2 ORDER BY 1, 2",
            )
            .await?;
        let count_rows = client.query(&stmt, &[&app_id, &since]).await?;

        let stmt = client
            .prepare(
                "SELECT date_trunc('minute', timestamp), \
                 COUNT(DISTINCT user_id) \
                 FROM events WHERE app_id = $1 AND timestamp >= $2 \
                 GROUP BY 1",
            )
            .await?;
        let user_rows = client.query(&stmt, &[&app_id, &since]).await?;

        // BTreeMap keeps minutes chronologically ordered during the merge.
        let mut buckets: BTreeMap<DateTime<Utc>, MinuteBucket> =
            BTreeMap::new();
        for row in count_rows {
            let minute: DateTime<Utc> = row.get(0);
            let bucket =
                buckets.entry(minute).or_insert_with(|| MinuteBucket {
                    minute,
                    counts: Vec::new(),
                    unique_users: 0,
                });
            bucket.counts.push(NameCount {
                name: row.get(1),
                count: row.get(2),
            });
        }
        for row in user_rows {
            let minute: DateTime<Utc> = row.get(0);
            if let Some(bucket) = buckets.get_mut(&minute) {
                bucket.unique_users = row.get(1);
            }
        }

        Ok(RealtimeWindow {
            window_minutes,
            buckets: buckets.into_values().collect(),
        })
    }
}
