//! Run-once entry points for each sampling kind.

use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::bucket::BucketKey;
use crate::config::Tables;
use crate::error::SnapshotError;
use crate::scan::scan_all;
use crate::services::bike_api::BikeApi;
use crate::services::snapshot_store::SnapshotStore;
use crate::services::station_api::StationApi;
use crate::snapshot::grid::{GridCollection, GridCollector};
use crate::snapshot::stations::StationSnapshot;
use crate::snapshot::types::{GeoDetail, StationDetail, StationSummary};

/// Outcome of each snapshot kind in one round.
#[derive(Debug)]
pub struct RoundReport {
    pub stations: Result<StationSnapshot, SnapshotError>,
    pub bikes: Result<GridCollection, SnapshotError>,
}

/// Wires providers, the grid and the store together.
pub struct Sampler {
    tables: Tables,
    store: Arc<dyn SnapshotStore>,
    stations: Arc<dyn StationApi>,
    bikes: Arc<dyn BikeApi>,
    grid: GridCollector,
}

impl Sampler {
    pub fn new(
        tables: Tables,
        store: Arc<dyn SnapshotStore>,
        stations: Arc<dyn StationApi>,
        bikes: Arc<dyn BikeApi>,
        grid: GridCollector,
    ) -> Self {
        Self {
            tables,
            store,
            stations,
            bikes,
            grid,
        }
    }

    /// Fetches the station network, reduces it and stores summary and detail.
    ///
    /// The two upserts are independent: if one fails after the other
    /// succeeded, the bucket is left half-written and the error is returned.
    #[tracing::instrument(skip(self, bucket), fields(bucket = %bucket))]
    pub async fn run_stations(&self, bucket: &BucketKey) -> Result<StationSnapshot, SnapshotError> {
        let payload = self.stations.fetch_stations().await?;
        let captured_at = Utc::now().timestamp_millis();
        let snapshot = StationSnapshot::from_payload(bucket, &payload, captured_at)?;

        let (summary, detail) = tokio::try_join!(
            self.put(&self.tables.summary, bucket, &snapshot.summary),
            self.put(&self.tables.stations, bucket, &snapshot.detail),
        )?;

        info!(
            total = summary.total_stations,
            open = summary.open_stations,
            open_pct = summary.open_pct(),
            bikes = summary.total_bikes_available,
            stands = summary.total_stands_available,
            "Station snapshot stored"
        );

        Ok(StationSnapshot { summary, detail })
    }

    /// Collects free-floating bikes over the grid and stores the result.
    ///
    /// Failed tiles are returned alongside the stored detail.
    #[tracing::instrument(skip(self, bucket), fields(bucket = %bucket))]
    pub async fn run_bikes(&self, bucket: &BucketKey) -> Result<GridCollection, SnapshotError> {
        let captured_at = Utc::now().timestamp_millis();
        let api = &self.bikes;

        let collection = self
            .grid
            .collect(bucket, captured_at, |lat, lng| api.query_near(lat, lng))
            .await?;
        let detail = self.put(&self.tables.bikes, bucket, &collection.detail).await?;

        info!(
            bikes = detail.bikes.len(),
            failed_tiles = collection.failures.len(),
            "Bike snapshot stored"
        );

        Ok(GridCollection {
            detail,
            failures: collection.failures,
        })
    }

    /// Station snapshot, then bike snapshot, under the same bucket.
    ///
    /// Each kind succeeds or fails on its own; a station failure does not
    /// skip the bikes.
    #[tracing::instrument(skip(self, bucket), fields(bucket = %bucket))]
    pub async fn run_round(&self, bucket: &BucketKey) -> RoundReport {
        let stations = self.run_stations(bucket).await;
        let bikes = self.run_bikes(bucket).await;
        RoundReport { stations, bikes }
    }

    /// Every summary row ever stored, in store order.
    #[tracing::instrument(skip(self))]
    pub async fn list_summaries(&self) -> Result<Vec<StationSummary>, SnapshotError> {
        let table = &self.tables.summary;
        let rows = scan_all(|token| self.store.scan_page(table, token))
            .await
            .map_err(|e| SnapshotError::store(table, e))?;

        info!(rows = rows.len(), "Summary table read");

        rows.into_iter()
            .map(|row| decode(table, Value::Object(row)))
            .collect()
    }

    pub async fn station_detail(&self, bucket: &BucketKey) -> Result<Option<StationDetail>, SnapshotError> {
        self.fetch(&self.tables.stations, bucket).await
    }

    pub async fn bike_detail(&self, bucket: &BucketKey) -> Result<Option<GeoDetail>, SnapshotError> {
        self.fetch(&self.tables.bikes, bucket).await
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        table: &str,
        bucket: &BucketKey,
    ) -> Result<Option<T>, SnapshotError> {
        let row = self
            .store
            .get(table, bucket.as_str())
            .await
            .map_err(|e| SnapshotError::store(table, e))?;

        row.map(|row| decode(table, Value::Object(row))).transpose()
    }

    /// Upserts `record` under the bucket key and decodes the stored row back.
    async fn put<T>(&self, table: &str, bucket: &BucketKey, record: &T) -> Result<T, SnapshotError>
    where
        T: Serialize + DeserializeOwned,
    {
        let Value::Object(item) =
            serde_json::to_value(record).map_err(|e| SnapshotError::store(table, e))?
        else {
            return Err(SnapshotError::store(table, "record is not a JSON object"));
        };

        let stored = self
            .store
            .upsert(table, bucket.as_str(), item)
            .await
            .map_err(|e| SnapshotError::store(table, e))?;

        decode(table, Value::Object(stored))
    }
}

fn decode<T: DeserializeOwned>(table: &str, row: Value) -> Result<T, SnapshotError> {
    serde_json::from_value(row).map_err(|e| SnapshotError::store(table, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::memory::MemoryStore;
    use crate::scan::Page;
    use crate::services::bike_api::NearbyBike;
    use crate::services::snapshot_store::Item;
    use crate::snapshot::grid::Region;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct FixedStations(Value);

    #[async_trait]
    impl StationApi for FixedStations {
        async fn fetch_stations(&self) -> Result<Value, SnapshotError> {
            Ok(self.0.clone())
        }
    }

    struct DownStations;

    #[async_trait]
    impl StationApi for DownStations {
        async fn fetch_stations(&self) -> Result<Value, SnapshotError> {
            Err(SnapshotError::provider("connection refused"))
        }
    }

    /// One bike per tile, except the tile at the region origin which fails.
    struct OneBikePerTile;

    #[async_trait]
    impl BikeApi for OneBikePerTile {
        async fn query_near(&self, lat: f64, lng: f64) -> anyhow::Result<Vec<NearbyBike>> {
            if lat == 0.0 && lng == 0.0 {
                anyhow::bail!("502 Bad Gateway");
            }
            Ok(vec![
                NearbyBike {
                    id: format!("{lat}/{lng}"),
                    lat,
                    lng,
                },
                NearbyBike {
                    id: "shared".to_string(),
                    lat: 0.0101,
                    lng: 0.0101,
                },
            ])
        }
    }

    struct ReadOnlyStore;

    #[async_trait]
    impl SnapshotStore for ReadOnlyStore {
        async fn upsert(&self, table: &str, _key: &str, _item: Item) -> anyhow::Result<Item> {
            anyhow::bail!("write denied on {table}")
        }

        async fn scan_page(&self, _table: &str, _token: Option<String>) -> anyhow::Result<Page<Item>> {
            anyhow::bail!("scan denied")
        }

        async fn get(&self, _table: &str, _key: &str) -> anyhow::Result<Option<Item>> {
            Ok(None)
        }
    }

    /// Records the table of every write before passing it on.
    #[derive(Default)]
    struct RecordingStore {
        inner: MemoryStore,
        writes: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SnapshotStore for RecordingStore {
        async fn upsert(&self, table: &str, key: &str, item: Item) -> anyhow::Result<Item> {
            self.writes.lock().unwrap().push(table.to_string());
            self.inner.upsert(table, key, item).await
        }

        async fn scan_page(&self, table: &str, token: Option<String>) -> anyhow::Result<Page<Item>> {
            self.inner.scan_page(table, token).await
        }

        async fn get(&self, table: &str, key: &str) -> anyhow::Result<Option<Item>> {
            self.inner.get(table, key).await
        }
    }

    fn tables() -> Tables {
        Tables {
            summary: "velib".to_string(),
            stations: "velib-details".to_string(),
            bikes: "gobee-details".to_string(),
        }
    }

    fn grid() -> GridCollector {
        let region = Region {
            min_lat: 0.0,
            min_lng: 0.0,
            max_lat: 0.02,
            max_lng: 0.02,
        };
        GridCollector::new(region, 0.01, "paris", "gobee")
    }

    fn stations_payload() -> Value {
        json!([
            { "number": 1, "position": { "lat": 48.86, "lng": 2.35 }, "status": "CLOSED" },
            {
                "number": 2,
                "position": { "lat": 48.87, "lng": 2.36 },
                "status": "OPEN",
                "available_bikes": 5,
                "available_bike_stands": 3
            }
        ])
    }

    fn sampler(store: Arc<dyn SnapshotStore>, stations: impl StationApi + 'static) -> Sampler {
        Sampler::new(tables(), store, Arc::new(stations), Arc::new(OneBikePerTile), grid())
    }

    fn bucket() -> BucketKey {
        BucketKey::from("2017-10-27-10")
    }

    #[tokio::test]
    async fn test_run_stations_stores_both_rows() {
        let store = Arc::new(MemoryStore::new());
        let sampler = sampler(store.clone(), FixedStations(stations_payload()));

        let snapshot = sampler.run_stations(&bucket()).await.unwrap();

        assert_eq!(snapshot.summary.total_stations, 2);
        assert_eq!(snapshot.summary.open_stations, 1);
        assert_eq!(snapshot.detail.stations.len(), 2);

        let summary_row = store.get("velib", "2017-10-27-10").await.unwrap().unwrap();
        assert_eq!(summary_row["nbBikes"], json!(5));
        assert_eq!(summary_row["nbStands"], json!(3));

        let detail = sampler.station_detail(&bucket()).await.unwrap().unwrap();
        assert_eq!(detail, snapshot.detail);
    }

    #[tokio::test]
    async fn test_malformed_payload_writes_nothing() {
        let store = Arc::new(MemoryStore::new());
        let sampler = sampler(store.clone(), FixedStations(Value::Null));

        let result = sampler.run_stations(&bucket()).await;

        assert!(matches!(result, Err(SnapshotError::ProviderUnavailable { .. })));
        assert_eq!(store.len("velib").await, 0);
        assert_eq!(store.len("velib-details").await, 0);
    }

    #[tokio::test]
    async fn test_provider_error_propagates() {
        let store = Arc::new(MemoryStore::new());
        let sampler = sampler(store.clone(), DownStations);

        let result = sampler.run_stations(&bucket()).await;

        assert!(matches!(result, Err(SnapshotError::ProviderUnavailable { .. })));
        assert_eq!(store.len("velib").await, 0);
    }

    #[tokio::test]
    async fn test_store_failure_is_surfaced() {
        let sampler = sampler(Arc::new(ReadOnlyStore), FixedStations(stations_payload()));

        let result = sampler.run_stations(&bucket()).await;
        assert!(matches!(result, Err(SnapshotError::Store { .. })));

        let result = sampler.list_summaries().await;
        assert!(matches!(result, Err(SnapshotError::Store { ref table, .. }) if table == "velib"));
    }

    #[tokio::test]
    async fn test_same_bucket_run_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let sampler = sampler(store.clone(), FixedStations(stations_payload()));

        let first = sampler.run_stations(&bucket()).await.unwrap();
        let second = sampler.run_stations(&bucket()).await.unwrap();

        assert_eq!(store.len("velib").await, 1);
        assert_eq!(store.len("velib-details").await, 1);

        let stored = sampler.list_summaries().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(
            StationSummary {
                captured_at: 0,
                ..stored[0].clone()
            },
            StationSummary {
                captured_at: 0,
                ..first.summary
            }
        );
        assert_eq!(first.detail.stations, second.detail.stations);
    }

    #[tokio::test]
    async fn test_run_bikes_tolerates_failed_tile() {
        let store = Arc::new(MemoryStore::new());
        let sampler = sampler(store.clone(), FixedStations(stations_payload()));

        let collection = sampler.run_bikes(&bucket()).await.unwrap();

        // three surviving tiles, each with its own bike, plus one shared bike
        assert_eq!(collection.detail.bikes.len(), 4);
        assert_eq!(collection.failures.len(), 1);
        assert!(collection.failures[0].reason.contains("502"));

        let shared: Vec<_> = collection
            .detail
            .bikes
            .iter()
            .filter(|b| b.id == "shared")
            .collect();
        assert_eq!(shared.len(), 1);
        assert_eq!(shared[0].position.lat, 0.01);

        let stored = sampler.bike_detail(&bucket()).await.unwrap().unwrap();
        assert_eq!(stored, collection.detail);
    }

    #[tokio::test]
    async fn test_list_summaries_across_buckets() {
        let store = Arc::new(MemoryStore::with_page_size(1));
        let sampler = sampler(store.clone(), FixedStations(stations_payload()));

        for key in ["2017-10-27-10", "2017-10-27-11", "2017-10-27-9"] {
            sampler.run_stations(&BucketKey::from(key)).await.unwrap();
        }

        let summaries = sampler.list_summaries().await.unwrap();
        assert_eq!(summaries.len(), 3);
        assert!(summaries.iter().all(|s| s.open_stations == 1));
    }

    #[tokio::test]
    async fn test_missing_detail_is_none() {
        let sampler = sampler(Arc::new(MemoryStore::new()), FixedStations(json!([])));
        assert!(sampler.station_detail(&bucket()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_round_writes_stations_before_bikes() {
        let store = Arc::new(RecordingStore::default());
        let sampler = sampler(store.clone(), FixedStations(stations_payload()));

        let report = sampler.run_round(&bucket()).await;

        assert!(report.stations.is_ok());
        assert!(report.bikes.is_ok());

        let writes = store.writes.lock().unwrap().clone();
        assert_eq!(writes.len(), 3);
        assert!(writes[..2].contains(&"velib".to_string()));
        assert!(writes[..2].contains(&"velib-details".to_string()));
        assert_eq!(writes[2], "gobee-details");
    }

    #[tokio::test]
    async fn test_round_continues_after_station_failure() {
        let store = Arc::new(MemoryStore::new());
        let sampler = sampler(store.clone(), DownStations);

        let report = sampler.run_round(&bucket()).await;

        assert!(matches!(
            report.stations,
            Err(SnapshotError::ProviderUnavailable { .. })
        ));
        assert_eq!(report.bikes.unwrap().detail.bikes.len(), 4);
        assert_eq!(store.len("velib").await, 0);
        assert_eq!(store.len("gobee-details").await, 1);
    }
}
