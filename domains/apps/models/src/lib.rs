use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum AppKind {
    Web,
    Mobile,
}

impl AppKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppKind::Web => "web",
            AppKind::Mobile => "mobile",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "web" => Some(AppKind::Web),
            "mobile" => Some(AppKind::Mobile),
            _ => None,
        }
    }
}

/// A registered client application. `key_hash` is the salted bcrypt hash
/// of the API key; the plaintext is returned once at issue time and never
/// stored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, TypedBuilder)]
pub struct Application {
    #[builder(default)]
    pub id: Uuid,
    pub name: String,
    pub domain: String,
    pub kind: AppKind,
    pub key_hash: String,
    #[builder(default = true)]
    pub active: bool,
    pub expires_at: DateTime<Utc>,
    pub owner_id: Uuid,
    #[builder(default)]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RegisterAppRequest {
    pub name: String,
    pub domain: String,
    pub kind: AppKind,
    #[serde(rename = "ownerId")]
    pub owner_id: Uuid,
}

/// Application as exposed over the wire. The key hash never leaves the
/// service.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AppResponse {
    pub id: Uuid,
    pub name: String,
    pub domain: String,
    pub kind: AppKind,
    pub active: bool,
    #[serde(rename = "expiresAt")]
    pub expires_at: DateTime<Utc>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl From<Application> for AppResponse {
    fn from(app: Application) -> Self {
        Self {
            id: app.id,
            name: app.name,
            domain: app.domain,
            kind: app.kind,
            active: app.active,
            expires_at: app.expires_at,
            created_at: app.created_at,
        }
    }
}

/// Returned from issue and regenerate, the only places the plaintext key
/// exists.
#[derive(Debug, Serialize, ToSchema)]
pub struct IssuedAppResponse {
    #[serde(flatten)]
    pub app: AppResponse,
    #[serde(rename = "apiKey")]
    pub api_key: String,
}
