use anyhow::{Context, Result};

use crate::config::ApiKeySource;

/// Resolves secrets from AWS SSM Parameter Store.
///
/// Parameters are fetched with decryption enabled, so `SecureString` values
/// work as long as the process has `ssm:GetParameter` and the matching KMS
/// permissions.
pub struct SsmKeyStore {
    client: aws_sdk_ssm::Client,
}

impl SsmKeyStore {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_ssm::Client::new(config),
        }
    }

    /// Fetches the plaintext value of the parameter at `path`.
    pub async fn get(&self, path: &str) -> Result<String> {
        let resp = self
            .client
            .get_parameter()
            .name(path)
            .with_decryption(true)
            .send()
            .await
            .with_context(|| format!("SSM GetParameter failed for '{path}'"))?;

        resp.parameter
            .and_then(|p| p.value)
            .ok_or_else(|| anyhow::anyhow!("SSM parameter '{path}' exists but has no value"))
    }
}

/// Turns a configured key source into the key itself.
pub async fn resolve_api_key(source: &ApiKeySource, config: &aws_config::SdkConfig) -> Result<String> {
    match source {
        ApiKeySource::Plain(key) => Ok(key.clone()),
        ApiKeySource::Ssm(path) => SsmKeyStore::new(config).get(path).await,
    }
}
