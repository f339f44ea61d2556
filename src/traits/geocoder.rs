//! Geocoder trait for address-to-coordinates enrichment.

use async_trait::async_trait;

use crate::types::record::GeoPoint;

/// Abstraction over an external geocoding provider.
///
/// Failures are non-fatal everywhere this is consumed: a field that
/// cannot be geocoded simply stays un-geocoded.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve free-text address to coordinates; `None` when not found.
    async fn geocode(&self, address: &str) -> Option<GeoPoint>;
}
