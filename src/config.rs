//! Process configuration, read once at startup and handed to components.
//!
//! | Variable | Default |
//! |---|---|
//! | `VELIB_TABLE` | `velib` |
//! | `VELIB_DETAILS_TABLE` | `velib-details` |
//! | `GOBEE_DETAILS_TABLE` | `gobee-details` |
//! | `JCDECAUX_KEY` / `JCDECAUX_KEY_SSM` | none |
//! | `JCDECAUX_CONTRACT` | `paris` |
//! | `JCDECAUX_URL` | `https://api.jcdecaux.com` |
//! | `GOBEE_URL` | `http://aws.gobee.bike/GobeeBike/bikes/near_bikes` |
//! | `GOBEE_CITY` | `paris` |
//! | `GOBEE_BBOX` | `48.80,2.24,48.90,2.43` |
//! | `GOBEE_STEP` | `0.01` |
//! | `HTTP_TIMEOUT_SECS` | `30` |
//! | `HTTP_CONCURRENCY` | `16` |
//! | `SNAPSHOT_BUCKET` | none |
//! | `SNAPSHOT_GZIP` | `false` |
//! | `SCAN_PAGE_SIZE` | `100` |

use anyhow::{Context, Result};
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use crate::snapshot::grid::Region;

/// Table names for each kind of row.
#[derive(Debug, Clone, PartialEq)]
pub struct Tables {
    pub summary: String,
    pub stations: String,
    pub bikes: String,
}

/// Where the JCDecaux API key comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiKeySource {
    Plain(String),
    /// SSM parameter path, resolved at startup.
    Ssm(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct JcDecauxConfig {
    pub base_url: String,
    pub contract: String,
    pub api_key: Option<ApiKeySource>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GobeeConfig {
    pub near_bikes_url: String,
    pub city: String,
    pub region: Region,
    pub step: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpConfig {
    pub timeout: Duration,
    pub concurrency: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    pub bucket: Option<String>,
    pub gzip: bool,
    pub page_size: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SamplerConfig {
    pub tables: Tables,
    pub jcdecaux: JcDecauxConfig,
    pub gobee: GobeeConfig,
    pub http: HttpConfig,
    pub store: StoreConfig,
}

impl SamplerConfig {
    /// Reads the process environment. Call after `dotenvy::dotenv()`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable lookup.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let text = |name: &str, default: &str| get(name).unwrap_or_else(|| default.to_string());

        let api_key = match (get("JCDECAUX_KEY"), get("JCDECAUX_KEY_SSM")) {
            (Some(key), _) => Some(ApiKeySource::Plain(key)),
            (None, Some(path)) => Some(ApiKeySource::Ssm(path)),
            (None, None) => None,
        };

        Ok(Self {
            tables: Tables {
                summary: text("VELIB_TABLE", "velib"),
                stations: text("VELIB_DETAILS_TABLE", "velib-details"),
                bikes: text("GOBEE_DETAILS_TABLE", "gobee-details"),
            },
            jcdecaux: JcDecauxConfig {
                base_url: text("JCDECAUX_URL", "https://api.jcdecaux.com"),
                contract: text("JCDECAUX_CONTRACT", "paris"),
                api_key,
            },
            gobee: GobeeConfig {
                near_bikes_url: text(
                    "GOBEE_URL",
                    "http://aws.gobee.bike/GobeeBike/bikes/near_bikes",
                ),
                city: text("GOBEE_CITY", "paris"),
                region: parsed(&get, "GOBEE_BBOX", "48.80,2.24,48.90,2.43")?,
                step: parsed(&get, "GOBEE_STEP", "0.01")?,
            },
            http: HttpConfig {
                timeout: Duration::from_secs(parsed(&get, "HTTP_TIMEOUT_SECS", "30")?),
                concurrency: parsed(&get, "HTTP_CONCURRENCY", "16")?,
            },
            store: StoreConfig {
                bucket: get("SNAPSHOT_BUCKET"),
                gzip: parsed(&get, "SNAPSHOT_GZIP", "false")?,
                page_size: parsed(&get, "SCAN_PAGE_SIZE", "100")?,
            },
        })
    }
}

fn parsed<T>(get: &impl Fn(&str) -> Option<String>, name: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = get(name).unwrap_or_else(|| default.to_string());
    raw.trim()
        .parse::<T>()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .with_context(|| format!("invalid {name}: '{raw}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<SamplerConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SamplerConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]).unwrap();

        assert_eq!(cfg.tables.summary, "velib");
        assert_eq!(cfg.tables.stations, "velib-details");
        assert_eq!(cfg.tables.bikes, "gobee-details");
        assert_eq!(cfg.jcdecaux.contract, "paris");
        assert_eq!(cfg.jcdecaux.api_key, None);
        assert_eq!(cfg.gobee.region.min_lat, 48.80);
        assert_eq!(cfg.gobee.region.max_lng, 2.43);
        assert_eq!(cfg.gobee.step, 0.01);
        assert_eq!(cfg.http.timeout, Duration::from_secs(30));
        assert_eq!(cfg.store.bucket, None);
        assert!(!cfg.store.gzip);
    }

    #[test]
    fn test_plain_key_wins_over_ssm() {
        let cfg = config(&[("JCDECAUX_KEY", "abc"), ("JCDECAUX_KEY_SSM", "/velib/key")]).unwrap();
        assert_eq!(cfg.jcdecaux.api_key, Some(ApiKeySource::Plain("abc".to_string())));

        let cfg = config(&[("JCDECAUX_KEY_SSM", "/velib/key")]).unwrap();
        assert_eq!(cfg.jcdecaux.api_key, Some(ApiKeySource::Ssm("/velib/key".to_string())));
    }

    #[test]
    fn test_overrides() {
        let cfg = config(&[
            ("VELIB_TABLE", "velib-prod"),
            ("GOBEE_BBOX", "45.70, 4.77, 45.81, 4.90"),
            ("GOBEE_STEP", "0.005"),
            ("SNAPSHOT_BUCKET", "bikes"),
            ("SNAPSHOT_GZIP", "true"),
        ])
        .unwrap();

        assert_eq!(cfg.tables.summary, "velib-prod");
        assert_eq!(cfg.gobee.region.min_lng, 4.77);
        assert_eq!(cfg.gobee.step, 0.005);
        assert_eq!(cfg.store.bucket.as_deref(), Some("bikes"));
        assert!(cfg.store.gzip);
    }

    #[test]
    fn test_invalid_values_are_reported() {
        let err = config(&[("GOBEE_STEP", "tiny")]).unwrap_err();
        assert!(err.to_string().contains("GOBEE_STEP"));

        assert!(config(&[("GOBEE_BBOX", "48.8,2.2")]).is_err());
        assert!(config(&[("HTTP_CONCURRENCY", "-1")]).is_err());
    }
}
