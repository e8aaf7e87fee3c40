//! Grid collection of free-floating bikes from a provider that can only
//! answer "which bikes are near this point".
//!
//! The bounding box is cut into tiles of `step` degrees. Every tile origin is
//! queried concurrently, all queries are awaited, and the results are merged
//! into one set keyed by bike id. A failing tile is reported and skipped; it
//! never fails the collection.

use futures::future::join_all;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use tracing::{Instrument, info, warn};

use crate::bucket::BucketKey;
use crate::error::SnapshotError;
use crate::services::bike_api::NearbyBike;
use crate::snapshot::types::{BikeRecord, GeoDetail, LatLng};

/// Upper bound on queries issued by one collection.
pub const MAX_TILES: usize = 10_000;

/// Bounding box in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub min_lat: f64,
    pub min_lng: f64,
    pub max_lat: f64,
    pub max_lng: f64,
}

/// Origin of one grid cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tile {
    pub lat: f64,
    pub lng: f64,
}

/// A tile whose query failed. Its bikes are missing from the merge.
#[derive(Debug, Clone, PartialEq)]
pub struct TileFailure {
    pub tile: Tile,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TileOutcome {
    Fetched { tile: Tile, bikes: Vec<NearbyBike> },
    Failed(TileFailure),
}

/// Merged result plus the tiles that could not be read.
#[derive(Debug, Clone, PartialEq)]
pub struct GridCollection {
    pub detail: GeoDetail,
    pub failures: Vec<TileFailure>,
}

impl Region {
    /// Tile origins over `[min, max)` on both axes, latitude-major.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::InvalidRegion`] if a bound or the step is not
    /// finite, the step is not positive, the box is empty, or the grid would
    /// exceed [`MAX_TILES`].
    pub fn tiles(&self, step: f64) -> Result<Vec<Tile>, SnapshotError> {
        let values = [self.min_lat, self.min_lng, self.max_lat, self.max_lng, step];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(SnapshotError::region("bounds and step must be finite"));
        }
        if step <= 0.0 {
            return Err(SnapshotError::region(format!("step must be positive, got {step}")));
        }
        if self.max_lat <= self.min_lat || self.max_lng <= self.min_lng {
            return Err(SnapshotError::region(format!("empty bounding box {self}")));
        }

        let estimate = ((self.max_lat - self.min_lat) / step).ceil()
            * ((self.max_lng - self.min_lng) / step).ceil();
        if estimate > MAX_TILES as f64 {
            return Err(SnapshotError::region(format!(
                "{estimate} tiles exceeds the limit of {MAX_TILES}"
            )));
        }

        let lats = axis(self.min_lat, self.max_lat, step);
        let lngs = axis(self.min_lng, self.max_lng, step);

        Ok(lats
            .iter()
            .flat_map(|&lat| lngs.iter().map(move |&lng| Tile { lat, lng }))
            .collect())
    }
}

/// Offsets are multiplied from `min` instead of accumulated, and a bound
/// that lands on a multiple of `step` is excluded despite float noise.
fn axis(min: f64, max: f64, step: f64) -> Vec<f64> {
    let epsilon = step * 1e-9;
    (0u32..)
        .map(|i| min + f64::from(i) * step)
        .take_while(|v| *v < max - epsilon)
        .collect()
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.min_lat, self.min_lng, self.max_lat, self.max_lng
        )
    }
}

impl FromStr for Region {
    type Err = SnapshotError;

    /// Parses `minLat,minLng,maxLat,maxLng`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| SnapshotError::region(format!("'{s}': {e}")))?;

        match parts.as_slice() {
            &[min_lat, min_lng, max_lat, max_lng] => Ok(Self {
                min_lat,
                min_lng,
                max_lat,
                max_lng,
            }),
            _ => Err(SnapshotError::region(format!(
                "'{s}': expected minLat,minLng,maxLat,maxLng"
            ))),
        }
    }
}

/// Collects one city's free-floating bikes for a single provider.
#[derive(Debug, Clone)]
pub struct GridCollector {
    region: Region,
    step: f64,
    city: String,
    provider: String,
}

impl GridCollector {
    pub fn new(region: Region, step: f64, city: &str, provider: &str) -> Self {
        Self {
            region,
            step,
            city: city.to_string(),
            provider: provider.to_string(),
        }
    }

    pub fn tiles(&self) -> Result<Vec<Tile>, SnapshotError> {
        self.region.tiles(self.step)
    }

    /// Queries every tile with `query(lat, lng)` and merges the answers.
    ///
    /// All queries run concurrently; how many are really in flight is up to
    /// the transport behind `query`.
    ///
    /// # Errors
    ///
    /// Only [`SnapshotError::InvalidRegion`], before any query is issued.
    /// Tile failures end up in [`GridCollection::failures`].
    #[tracing::instrument(skip(self, bucket, query), fields(bucket = %bucket, city = %self.city))]
    pub async fn collect<F, Fut, E>(
        &self,
        bucket: &BucketKey,
        captured_at: i64,
        query: F,
    ) -> Result<GridCollection, SnapshotError>
    where
        F: Fn(f64, f64) -> Fut,
        Fut: Future<Output = Result<Vec<NearbyBike>, E>>,
        E: fmt::Display,
    {
        let tiles = self.tiles()?;
        info!(tiles = tiles.len(), step = self.step, "Querying grid");

        let outcomes = join_all(tiles.into_iter().map(|tile| {
            let span = tracing::debug_span!("tile", lat = tile.lat, lng = tile.lng);
            let pending = query(tile.lat, tile.lng);
            async move {
                match pending.await {
                    Ok(bikes) => TileOutcome::Fetched { tile, bikes },
                    Err(e) => TileOutcome::Failed(TileFailure {
                        tile,
                        reason: format!("{e:#}"),
                    }),
                }
            }
            .instrument(span)
        }))
        .await;

        Ok(self.merge(bucket, captured_at, outcomes))
    }

    /// Flattens tile outcomes into one record per bike id.
    ///
    /// A bike seen from several tiles keeps the last position read, in tile
    /// order; overlapping answers describe the same bike so they are
    /// expected to agree.
    pub fn merge(
        &self,
        bucket: &BucketKey,
        captured_at: i64,
        outcomes: Vec<TileOutcome>,
    ) -> GridCollection {
        let mut bikes: BTreeMap<String, BikeRecord> = BTreeMap::new();
        let mut failures = Vec::new();
        let mut seen = 0usize;

        for outcome in outcomes {
            match outcome {
                TileOutcome::Fetched { bikes: found, .. } => {
                    seen += found.len();
                    for bike in found {
                        let record = BikeRecord {
                            id: bike.id.clone(),
                            provider: self.provider.clone(),
                            position: LatLng {
                                lat: bike.lat,
                                lng: bike.lng,
                            }
                            .floored(),
                        };
                        bikes.insert(bike.id, record);
                    }
                }
                TileOutcome::Failed(failure) => {
                    warn!(
                        lat = failure.tile.lat,
                        lng = failure.tile.lng,
                        reason = %failure.reason,
                        "Tile query failed, skipping"
                    );
                    failures.push(failure);
                }
            }
        }

        info!(
            seen,
            unique = bikes.len(),
            failed_tiles = failures.len(),
            "Grid merged"
        );

        GridCollection {
            detail: GeoDetail {
                bucket_key: bucket.clone(),
                city: self.city.clone(),
                bikes: bikes.into_values().collect(),
                captured_at,
            },
            failures,
        }
    }
}
