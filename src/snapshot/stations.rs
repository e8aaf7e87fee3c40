//! Reduction of a station-network response into summary and detail rows.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::bucket::BucketKey;
use crate::error::SnapshotError;
use crate::services::station_api::ProviderStation;
use crate::snapshot::types::{StationDetail, StationRecord, StationSummary};

/// Status the provider reports for a station out of service.
pub const CLOSED_STATUS: &str = "CLOSED";

/// Both rows produced from one provider response. They share a bucket key
/// and are written separately.
#[derive(Debug, Clone, PartialEq)]
pub struct StationSnapshot {
    pub summary: StationSummary,
    pub detail: StationDetail,
}

impl StationSnapshot {
    /// Checks that a raw provider payload is a station list, then reduces it.
    ///
    /// Station values are trusted. An entry that is not an object still
    /// counts as an open station without occupancy.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::ProviderUnavailable`] if the payload is absent
    /// or is not a list.
    pub fn from_payload(
        bucket: &BucketKey,
        payload: &Value,
        captured_at: i64,
    ) -> Result<Self, SnapshotError> {
        let Some(entries) = payload.as_array() else {
            return Err(SnapshotError::provider(format!(
                "expected a station list, got {}",
                describe(payload)
            )));
        };

        let stations: Vec<ProviderStation> = entries
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                ProviderStation::deserialize(entry).unwrap_or_else(|e| {
                    warn!(index = i, error = %e, "Unreadable station entry");
                    ProviderStation::default()
                })
            })
            .collect();

        Ok(Self::from_stations(bucket, &stations, captured_at))
    }

    /// Classifies each station and sums occupancy over the open ones.
    ///
    /// A station without status is open. An open station without occupancy
    /// counts as zero bikes and stands.
    pub fn from_stations(bucket: &BucketKey, stations: &[ProviderStation], captured_at: i64) -> Self {
        let mut summary = StationSummary {
            bucket_key: bucket.clone(),
            total_stations: 0,
            open_stations: 0,
            total_bikes_available: 0,
            total_stands_available: 0,
            captured_at,
        };
        let mut records = Vec::with_capacity(stations.len());

        for s in stations {
            summary.total_stations += 1;

            if s.status.as_deref() == Some(CLOSED_STATUS) {
                records.push(StationRecord {
                    position: s.position,
                    closed: true,
                    bikes_available: None,
                    stands_available: None,
                });
                continue;
            }

            let bikes = s.available_bikes.unwrap_or(0);
            let stands = s.available_bike_stands.unwrap_or(0);

            summary.open_stations += 1;
            summary.total_bikes_available += bikes;
            summary.total_stands_available += stands;

            records.push(StationRecord {
                position: s.position,
                closed: false,
                bikes_available: Some(bikes),
                stands_available: Some(stands),
            });
        }

        debug!(
            bucket = %bucket,
            total = summary.total_stations,
            open = summary.open_stations,
            "Stations reduced"
        );

        Self {
            summary,
            detail: StationDetail {
                bucket_key: bucket.clone(),
                stations: records,
                captured_at,
            },
        }
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "nothing",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
