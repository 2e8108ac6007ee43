use chrono::{DateTime, Utc};
use events_models::DeviceClass;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Inclusive aggregation window. An omitted range means all time.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema,
)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// The immediately preceding window of identical length, used for
    /// trend comparison.
    pub fn previous_period(&self) -> DateRange {
        let length = self.end - self.start;
        DateRange {
            start: self.start - length,
            end: self.start,
        }
    }

    /// Canonical token for cache keys. Equivalent ranges always render
    /// identically regardless of how the caller spelled them.
    pub fn cache_token(range: Option<&DateRange>) -> String {
        match range {
            Some(r) => format!(
                "{}..{}",
                r.start.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
                r.end.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
            ),
            None => "all".to_string(),
        }
    }
}

/// Per-device event counts. Devices outside the three classes cannot
/// exist; absent classes report zero.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize,
    ToSchema,
)]
pub struct DeviceBreakdown {
    pub mobile: i64,
    pub desktop: i64,
    pub tablet: i64,
}

impl DeviceBreakdown {
    pub fn add(&mut self, device: DeviceClass, count: i64) {
        match device {
            DeviceClass::Mobile => self.mobile += count,
            DeviceClass::Desktop => self.desktop += count,
            DeviceClass::Tablet => self.tablet += count,
        }
    }

    pub fn total(&self) -> i64 { self.mobile + self.desktop + self.tablet }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NameCount {
    pub name: String,
    pub count: i64,
}

/// Aggregation over one event name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EventSummary {
    pub count: i64,
    #[serde(rename = "uniqueUsers")]
    pub unique_users: i64,
    #[serde(rename = "deviceBreakdown")]
    pub device_breakdown: DeviceBreakdown,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend: Option<Trend>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RecentEvent {
    pub name: String,
    pub url: Option<String>,
    pub device: DeviceClass,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DeviceDetails {
    pub device: DeviceClass,
    pub browser: Option<String>,
    pub os: Option<String>,
}

/// Per-user behavior rollup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserStats {
    #[serde(rename = "totalEvents")]
    pub total_events: i64,
    #[serde(rename = "uniqueEventTypes")]
    pub unique_event_types: i64,
    /// Device details of the most recently seen event.
    #[serde(rename = "deviceDetails")]
    pub device_details: Option<DeviceDetails>,
    #[serde(rename = "firstSeen")]
    pub first_seen: Option<DateTime<Utc>>,
    #[serde(rename = "lastSeen")]
    pub last_seen: Option<DateTime<Utc>>,
    #[serde(rename = "sessionCount")]
    pub session_count: i64,
    #[serde(rename = "mostFrequentDevice")]
    pub most_frequent_device: Option<DeviceClass>,
    #[serde(rename = "recentEvents")]
    pub recent_events: Vec<RecentEvent>,
}

/// App-wide rollup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AppAnalytics {
    #[serde(rename = "totalEvents")]
    pub total_events: i64,
    #[serde(rename = "uniqueUsers")]
    pub unique_users: i64,
    #[serde(rename = "perEvent")]
    pub per_event: Vec<NameCount>,
    #[serde(rename = "perDevice")]
    pub per_device: DeviceBreakdown,
    #[serde(rename = "perCountry")]
    pub per_country: Vec<NameCount>,
    /// Event counts per hour of day, index 0..=23.
    #[serde(rename = "hourlyHistogram")]
    pub hourly_histogram: Vec<i64>,
    #[serde(rename = "recentEvents")]
    pub recent_events: Vec<RecentEvent>,
    #[serde(rename = "conversionRate")]
    pub conversion_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend: Option<Trend>,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

/// Change against the immediately preceding period of identical length.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Trend {
    pub change: f64,
    pub trend: TrendDirection,
}

impl Trend {
    /// Previous-period-zero cases collapse to fixed classifications
    /// instead of dividing by zero.
    pub fn from_counts(current: i64, previous: i64) -> Self {
        if previous == 0 {
            if current > 0 {
                return Trend {
                    change: 100.0,
                    trend: TrendDirection::Up,
                };
            }
            return Trend {
                change: 0.0,
                trend: TrendDirection::Stable,
            };
        }

        let raw = (current - previous) as f64 / previous as f64 * 100.0;
        let change = (raw * 100.0).round() / 100.0;
        let trend = if change > 0.0 {
            TrendDirection::Up
        }
        else if change < 0.0 {
            TrendDirection::Down
        }
        else {
            TrendDirection::Stable
        };
        Trend { change, trend }
    }
}

/// One minute of the trailing realtime window.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MinuteBucket {
    pub minute: DateTime<Utc>,
    /// Event counts by event name within the minute.
    pub counts: Vec<NameCount>,
    #[serde(rename = "uniqueUsers")]
    pub unique_users: i64,
}

/// Trailing-window realtime view, buckets ordered oldest to newest.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RealtimeWindow {
    #[serde(rename = "windowMinutes")]
    pub window_minutes: i64,
    pub buckets: Vec<MinuteBucket>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trend_zero_over_zero_is_stable() {
        let t = Trend::from_counts(0, 0);
        assert_eq!(t.change, 0.0);
        assert_eq!(t.trend, TrendDirection::Stable);
    }

    #[test]
    fn trend_growth_from_zero_is_fixed_up() {
        let t = Trend::from_counts(17, 0);
        assert_eq!(t.change, 100.0);
        assert_eq!(t.trend, TrendDirection::Up);
    }

    #[test]
    fn trend_percentage_rounds_to_two_decimals() {
        // (1 - 3) / 3 * 100 = -66.666...
        let t = Trend::from_counts(1, 3);
        assert_eq!(t.change, -66.67);
        assert_eq!(t.trend, TrendDirection::Down);

        let t = Trend::from_counts(150, 100);
        assert_eq!(t.change, 50.0);
        assert_eq!(t.trend, TrendDirection::Up);
    }

    #[test]
    fn trend_equal_counts_is_stable() {
        let t = Trend::from_counts(42, 42);
        assert_eq!(t.change, 0.0);
        assert_eq!(t.trend, TrendDirection::Stable);
    }

    #[test]
    fn previous_period_abuts_current() {
        let start = "2026-08-01T00:00:00Z".parse().unwrap();
        let end = "2026-08-08T00:00:00Z".parse().unwrap();
        let range = DateRange { start, end };
        let prev = range.previous_period();
        assert_eq!(prev.end, start);
        assert_eq!(prev.end - prev.start, end - start);
    }

    #[test]
    fn cache_token_is_canonical() {
        let range = DateRange {
            start: "2026-08-01T00:00:00.123Z".parse().unwrap(),
            end: "2026-08-02T00:00:00Z".parse().unwrap(),
        };
        // Sub-second noise does not produce a distinct key.
        assert_eq!(
            DateRange::cache_token(Some(&range)),
            "2026-08-01T00:00:00Z..2026-08-02T00:00:00Z"
        );
        assert_eq!(DateRange::cache_token(None), "all");
    }

    #[test]
    fn device_breakdown_accumulates() {
        let mut breakdown = DeviceBreakdown::default();
        breakdown.add(DeviceClass::Desktop, 3);
        breakdown.add(DeviceClass::Mobile, 2);
        assert_eq!(breakdown.desktop, 3);
        assert_eq!(breakdown.mobile, 2);
        assert_eq!(breakdown.tablet, 0);
        assert_eq!(breakdown.total(), 5);
    }
}
