use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use tracing::debug;

use super::API_KEY_PARAM;
use crate::error::SnapshotError;
use crate::fetch::auth::UrlParam;
use crate::fetch::{HttpClient, fetch_bytes};
use crate::parser::parse_stations;
use crate::services::station_api::StationApi;

pub struct JcDecauxClient<C> {
    http: C,
    base_url: String,
    contract: String,
}

impl<C: HttpClient> JcDecauxClient<C> {
    /// Client over a transport that already authenticates requests.
    pub fn new(http: C, base_url: &str, contract: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            contract: contract.to_string(),
        }
    }

    /// Client that appends `key` to every request.
    pub fn with_api_key(
        http: C,
        base_url: &str,
        contract: &str,
        key: &str,
    ) -> JcDecauxClient<UrlParam<C>> {
        JcDecauxClient::new(
            UrlParam {
                inner: http,
                param_name: API_KEY_PARAM.to_string(),
                key: key.to_string(),
            },
            base_url,
            contract,
        )
    }

    fn stations_url(&self) -> Result<Url, SnapshotError> {
        let mut url = Url::parse(&format!("{}/vls/v1/stations", self.base_url))
            .map_err(|e| SnapshotError::provider(format!("invalid JCDecaux URL: {e}")))?;
        url.query_pairs_mut().append_pair("contract", &self.contract);
        Ok(url)
    }
}

#[async_trait]
impl<C: HttpClient> StationApi for JcDecauxClient<C> {
    #[tracing::instrument(skip(self), fields(contract = %self.contract))]
    async fn fetch_stations(&self) -> Result<Value, SnapshotError> {
        let url = self.stations_url()?;

        let bytes = fetch_bytes(&self.http, url.as_str())
            .await
            .map_err(|e| SnapshotError::provider(format!("JCDecaux request failed: {e:#}")))?;
        debug!(bytes = bytes.len(), "Station list received");

        parse_stations(&bytes)
    }
}
