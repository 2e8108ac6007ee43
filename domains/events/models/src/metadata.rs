use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Derived and caller-supplied context stored alongside an event. Every
/// field is optional; enrichment only fills the gaps the caller left.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema,
)]
pub struct EnrichmentMetadata {
    pub browser: Option<String>,
    pub os: Option<String>,
    pub screen: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub language: Option<String>,
}

impl EnrichmentMetadata {
    pub fn is_empty(&self) -> bool {
        self.browser.is_none()
            && self.os.is_none()
            && self.screen.is_none()
            && self.country.is_none()
            && self.city.is_none()
            && self.language.is_none()
    }
}
