pub mod device;
pub mod events;
pub mod metadata;

pub use device::DeviceClass;
pub use events::{NewEvent, TrackRequest};
pub use metadata::EnrichmentMetadata;
