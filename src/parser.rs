//! JSON decoding of provider responses.

use anyhow::Result;
use serde::Deserialize;
use serde_json::Value;

use crate::error::SnapshotError;
use crate::services::bike_api::NearbyBike;

/// Decodes a station-network response body into raw JSON.
///
/// # Errors
///
/// Returns [`SnapshotError::ProviderUnavailable`] if the body is not JSON.
pub fn parse_stations(bytes: &[u8]) -> Result<Value, SnapshotError> {
    serde_json::from_slice(bytes)
        .map_err(|e| SnapshotError::provider(format!("station response is not JSON: {e}")))
}

#[derive(Deserialize)]
struct NearBikesResponse {
    #[serde(default)]
    data: Option<NearBikesData>,
}

#[derive(Deserialize)]
struct NearBikesData {
    #[serde(default)]
    bikes: Option<Vec<GobeeBike>>,
}

#[derive(Deserialize)]
struct GobeeBike {
    bid: Value,
    #[serde(rename = "gLat")]
    lat: f64,
    #[serde(rename = "gLng")]
    lng: f64,
}

/// Decodes a near-bikes response (`{"data": {"bikes": [...]}}`).
///
/// A response without `data.bikes` means no bike around that point.
///
/// # Errors
///
/// Returns an error if the body is not JSON or a bike lacks coordinates.
pub fn parse_near_bikes(bytes: &[u8]) -> Result<Vec<NearbyBike>> {
    let response: NearBikesResponse = serde_json::from_slice(bytes)?;
    let bikes = response.data.and_then(|d| d.bikes).unwrap_or_default();

    Ok(bikes
        .into_iter()
        .map(|b| NearbyBike {
            id: match b.bid {
                Value::String(id) => id,
                other => other.to_string(),
            },
            lat: b.lat,
            lng: b.lng,
        })
        .collect())
}
