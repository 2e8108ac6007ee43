//! Pure enrichment stage: turns a raw track request plus request context
//! into a storable event. No I/O, no clock reads — given identical
//! inputs the output is identical, which is what makes the pipeline
//! testable without network or geo dependencies.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use events_models::{DeviceClass, NewEvent, TrackRequest};
use uuid::Uuid;

mod ua;

pub use ua::classify_device;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeoLocation {
    pub country: String,
    pub city: Option<String>,
}

/// Coarse IP geolocation. Swappable so tests inject a stub instead of a
/// database lookup.
pub trait GeoResolver: Send + Sync {
    fn resolve(&self, ip: &str) -> Option<GeoLocation>;
}

/// Resolver that knows nothing. Events simply stay without geo fields.
pub struct NoGeo;

impl GeoResolver for NoGeo {
    fn resolve(&self, _ip: &str) -> Option<GeoLocation> { None }
}

#[derive(Clone)]
pub struct Enricher {
    geo: Arc<dyn GeoResolver>,
}

impl Default for Enricher {
    fn default() -> Self { Self::new(Arc::new(NoGeo)) }
}

impl Enricher {
    pub fn new(geo: Arc<dyn GeoResolver>) -> Self { Self { geo } }

    /// Merge policy: caller-supplied values always win; derived values
    /// only fill gaps. Absent geo entries remain unset, never an error.
    pub fn enrich(
        &self, app_id: Uuid, request: TrackRequest,
        user_agent: Option<&str>, ip: Option<&str>,
        received_at: DateTime<Utc>,
    ) -> NewEvent {
        let device = request
            .device
            .or_else(|| user_agent.map(classify_device))
            .unwrap_or(DeviceClass::Desktop);

        let timestamp = request
            .timestamp
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|ts| ts.with_timezone(&Utc))
            .unwrap_or(received_at);

        let mut metadata = request.metadata;
        if let Some(ua) = user_agent {
            if metadata.browser.is_none() {
                metadata.browser = ua::browser_name(ua);
            }
            if metadata.os.is_none() {
                metadata.os = ua::os_name(ua);
            }
        }
        if let Some(ip) = ip {
            if metadata.country.is_none() {
                if let Some(geo) = self.geo.resolve(ip) {
                    metadata.country = Some(geo.country);
                    if metadata.city.is_none() {
                        metadata.city = geo.city;
                    }
                }
            }
        }

        NewEvent {
            app_id,
            name: request.name,
            user_id: request.user_id,
            session_id: request.session_id,
            url: request.url,
            referrer: request.referrer,
            device,
            ip: ip.map(str::to_string),
            user_agent: user_agent.map(str::to_string),
            metadata,
            timestamp,
        }
    }
}
