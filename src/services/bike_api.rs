//! Trait and types for a free-floating bike provider.

use anyhow::Result;

/// A bike returned by a proximity query, at full provider precision.
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyBike {
    pub id: String,
    pub lat: f64,
    pub lng: f64,
}

/// Abstraction over a provider that can only list bikes near a point
/// (e.g., Gobee).
#[async_trait::async_trait]
pub trait BikeApi: Send + Sync {
    async fn query_near(&self, lat: f64, lng: f64) -> Result<Vec<NearbyBike>>;
}
