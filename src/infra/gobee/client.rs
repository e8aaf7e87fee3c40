use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;

use crate::fetch::{HttpClient, fetch_bytes};
use crate::parser::parse_near_bikes;
use crate::services::bike_api::{BikeApi, NearbyBike};

pub struct GobeeClient<C> {
    http: C,
    near_bikes_url: String,
}

impl<C: HttpClient> GobeeClient<C> {
    pub fn new(http: C, near_bikes_url: &str) -> Self {
        Self {
            http,
            near_bikes_url: near_bikes_url.trim_end_matches('?').to_string(),
        }
    }

    fn query_url(&self, lat: f64, lng: f64) -> Result<Url> {
        let mut url = Url::parse(&self.near_bikes_url)
            .with_context(|| format!("invalid Gobee URL '{}'", self.near_bikes_url))?;
        url.query_pairs_mut()
            .append_pair("lat", &lat.to_string())
            .append_pair("lng", &lng.to_string());
        Ok(url)
    }
}

#[async_trait]
impl<C: HttpClient> BikeApi for GobeeClient<C> {
    async fn query_near(&self, lat: f64, lng: f64) -> Result<Vec<NearbyBike>> {
        let url = self.query_url(lat, lng)?;
        let bytes = fetch_bytes(&self.http, url.as_str())
            .await
            .with_context(|| format!("near_bikes request failed for {lat},{lng}"))?;
        parse_near_bikes(&bytes)
    }
}
