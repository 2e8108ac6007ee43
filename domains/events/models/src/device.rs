use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Device classification of an event. The canonical order
/// mobile < desktop < tablet is also the tie-break order used when
/// aggregations need a single winner.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Mobile,
    Desktop,
    Tablet,
}

impl DeviceClass {
    pub const ALL: [DeviceClass; 3] =
        [DeviceClass::Mobile, DeviceClass::Desktop, DeviceClass::Tablet];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceClass::Mobile => "mobile",
            DeviceClass::Desktop => "desktop",
            DeviceClass::Tablet => "tablet",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "mobile" => Some(DeviceClass::Mobile),
            "desktop" => Some(DeviceClass::Desktop),
            "tablet" => Some(DeviceClass::Tablet),
            _ => None,
        }
    }
}

impl std::fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_order_is_mobile_desktop_tablet() {
        let mut devices =
            vec![DeviceClass::Tablet, DeviceClass::Mobile, DeviceClass::Desktop];
        devices.sort();
        assert_eq!(
            devices,
            vec![
                DeviceClass::Mobile,
                DeviceClass::Desktop,
                DeviceClass::Tablet
            ]
        );
    }

    #[test]
    fn parse_rejects_unknown() {
        assert_eq!(DeviceClass::parse("tablet"), Some(DeviceClass::Tablet));
        assert_eq!(DeviceClass::parse("tv"), None);
    }

    #[test]
    fn every_class_round_trips_through_as_str() {
        for device in DeviceClass::ALL {
            assert_eq!(DeviceClass::parse(device.as_str()), Some(device));
        }
    }
}
