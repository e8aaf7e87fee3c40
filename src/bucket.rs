//! Hour-granularity bucket keys.
//!
//! A [`BucketKey`] correlates every record produced by one sampling run.
//! Compute it once per run and pass it along; recomputing near an hour
//! boundary can split one logical snapshot across two keys.

use chrono::{DateTime, Datelike, Local, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Key in the `YEAR-MONTH-DAY-HOUR` format, without zero padding.
///
/// The calendar date is taken in UTC while the hour is taken in the zone
/// passed to [`BucketKey::at_in`] (the process local zone for
/// [`BucketKey::at`] and [`BucketKey::now`]). Keys already stored by earlier
/// deployments were built that way, so the mix is kept.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BucketKey(String);

impl BucketKey {
    /// Bucket for the current wall-clock instant.
    pub fn now() -> Self {
        Self::at(Utc::now())
    }

    pub fn at(instant: DateTime<Utc>) -> Self {
        Self::at_in(instant, &Local)
    }

    /// Builds the key from the UTC date of `instant` and its hour in `tz`.
    pub fn at_in<Tz: TimeZone>(instant: DateTime<Utc>, tz: &Tz) -> Self {
        let hour = instant.with_timezone(tz).hour();
        Self(format!(
            "{}-{}-{}-{}",
            instant.year(),
            instant.month(),
            instant.day(),
            hour
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BucketKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for BucketKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}
