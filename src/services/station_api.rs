//! Trait and types for a docked station-network provider.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::SnapshotError;
use crate::snapshot::types::LatLng;

/// One station as the provider reports it. Unknown fields are ignored.
///
/// Values are taken as reported: a field that is missing, `null` or of an
/// unexpected type reads as `None`, and counts are not range-checked.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProviderStation {
    #[serde(default, deserialize_with = "lenient")]
    pub position: Option<LatLng>,
    /// `"CLOSED"` for stations out of service, anything else counts as open.
    #[serde(default, deserialize_with = "lenient")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub available_bikes: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub available_bike_stands: Option<i64>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}

/// Abstraction over a station-network provider (e.g., JCDecaux).
#[async_trait::async_trait]
pub trait StationApi: Send + Sync {
    /// Returns the raw station list.
    ///
    /// The payload is not validated here; a list of [`ProviderStation`] is
    /// expected, and only that shape is checked when the snapshot is reduced.
    async fn fetch_stations(&self) -> Result<Value, SnapshotError>;
}
