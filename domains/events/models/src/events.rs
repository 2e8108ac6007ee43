use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{DeviceClass, EnrichmentMetadata};

pub const MAX_EVENT_NAME_LEN: usize = 120;

/// Raw ingestion payload as presented by a client. Everything beyond the
/// event name is optional; enrichment derives the rest from request
/// context.
#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
pub struct TrackRequest {
    pub name: String,
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
    pub url: Option<String>,
    pub referrer: Option<String>,
    pub device: Option<DeviceClass>,
    pub timestamp: Option<String>,
    #[serde(default)]
    pub metadata: EnrichmentMetadata,
}

impl TrackRequest {
    /// Validation happens here, before anything reaches the store.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("event name must not be empty".to_string());
        }
        if self.name.len() > MAX_EVENT_NAME_LEN {
            return Err(format!(
                "event name exceeds {} characters",
                MAX_EVENT_NAME_LEN
            ));
        }
        Ok(())
    }
}

/// Fully enriched event, ready for append. Events are immutable once
/// stored; there is no update type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, TypedBuilder)]
pub struct NewEvent {
    pub app_id: Uuid,
    pub name: String,
    #[builder(default)]
    pub user_id: Option<String>,
    #[builder(default)]
    pub session_id: Option<String>,
    #[builder(default)]
    pub url: Option<String>,
    #[builder(default)]
    pub referrer: Option<String>,
    pub device: DeviceClass,
    #[builder(default)]
    pub ip: Option<String>,
    #[builder(default)]
    pub user_agent: Option<String>,
    #[builder(default)]
    pub metadata: EnrichmentMetadata,
    pub timestamp: DateTime<Utc>,
}
