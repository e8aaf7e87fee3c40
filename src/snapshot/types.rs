//! Records produced by one sampling run.
//!
//! Field names on the wire follow the attribute names rows were stored with
//! historically (`date`, `nbBikes`, `pos`, ...), so existing rows still
//! decode.

use serde::{Deserialize, Serialize};

use crate::bucket::BucketKey;

/// Digits kept after the decimal point for free-floating bike positions.
pub const POSITION_DIGITS: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    /// Floors both coordinates to [`POSITION_DIGITS`] decimals.
    ///
    /// Flooring rather than rounding matches positions stored so far.
    pub fn floored(self) -> Self {
        let scale = 10f64.powi(POSITION_DIGITS);
        Self {
            lat: (self.lat * scale).floor() / scale,
            lng: (self.lng * scale).floor() / scale,
        }
    }
}

/// Network-wide totals for one bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationSummary {
    #[serde(rename = "date")]
    pub bucket_key: BucketKey,
    #[serde(rename = "total")]
    pub total_stations: u64,
    #[serde(rename = "open")]
    pub open_stations: u64,
    /// Sums of reported counts, which may include negative values.
    #[serde(rename = "nbBikes")]
    pub total_bikes_available: i64,
    #[serde(rename = "nbStands")]
    pub total_stands_available: i64,
    /// Epoch milliseconds.
    #[serde(rename = "timestamp")]
    pub captured_at: i64,
}

impl StationSummary {
    pub fn open_pct(&self) -> f64 {
        if self.total_stations == 0 {
            0.0
        } else {
            (self.open_stations as f64 / self.total_stations as f64) * 100.0
        }
    }
}

/// State of one station. Occupancy is only present for open stations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationRecord {
    #[serde(rename = "pos", default, skip_serializing_if = "Option::is_none")]
    pub position: Option<LatLng>,
    #[serde(rename = "isClosed")]
    pub closed: bool,
    #[serde(rename = "nbBikes", default, skip_serializing_if = "Option::is_none")]
    pub bikes_available: Option<i64>,
    #[serde(rename = "nbStands", default, skip_serializing_if = "Option::is_none")]
    pub stands_available: Option<i64>,
}

/// Every station of one bucket, in provider order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationDetail {
    #[serde(rename = "date")]
    pub bucket_key: BucketKey,
    pub stations: Vec<StationRecord>,
    #[serde(rename = "timestamp")]
    pub captured_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BikeRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub provider: String,
    #[serde(rename = "pos")]
    pub position: LatLng,
}

/// Free-floating bikes seen in one bucket. Ids are unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoDetail {
    #[serde(rename = "date")]
    pub bucket_key: BucketKey,
    pub city: String,
    pub bikes: Vec<BikeRecord>,
    #[serde(rename = "timestamp")]
    pub captured_at: i64,
}
