use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::io::{Read, Write};
use tracing::debug;

use crate::scan::Page;
use crate::services::snapshot_store::{Item, SnapshotStore};

pub struct S3Store {
    client: aws_sdk_s3::Client,
    bucket: String,
    page_size: i32,
    gzip: bool,
}

impl S3Store {
    /// `page_size` caps the keys listed per scan page; `gzip` compresses
    /// objects written from now on. Both encodings are read back.
    pub fn new(config: &aws_config::SdkConfig, bucket: &str, page_size: i32, gzip: bool) -> Self {
        Self {
            client: aws_sdk_s3::Client::new(config),
            bucket: bucket.to_string(),
            page_size: page_size.max(1),
            gzip,
        }
    }

    async fn read_object(&self, object_key: &str) -> Result<Option<Item>> {
        let resp = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(object_key)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                let e = e.into_service_error();
                if e.is_no_such_key() {
                    return Ok(None);
                }
                return Err(anyhow::Error::new(e)
                    .context(format!("GetObject failed for s3://{}/{object_key}", self.bucket)));
            }
        };

        let gzipped = resp.content_encoding() == Some("gzip");
        let body = resp
            .body
            .collect()
            .await
            .with_context(|| format!("failed to read s3://{}/{object_key}", self.bucket))?
            .into_bytes();

        decode_item(&body, gzipped).map(Some)
    }
}

fn object_key(table: &str, key: &str) -> String {
    format!("{table}/{key}.json")
}

fn table_prefix(table: &str) -> String {
    format!("{table}/")
}

fn encode_item(item: &Item, gzip: bool) -> Result<Vec<u8>> {
    let json = serde_json::to_vec(item)?;
    if !gzip {
        return Ok(json);
    }

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json)?;
    Ok(encoder.finish()?)
}

fn decode_item(body: &[u8], gzipped: bool) -> Result<Item> {
    if !gzipped {
        return Ok(serde_json::from_slice(body)?);
    }

    let mut json = Vec::new();
    GzDecoder::new(body).read_to_end(&mut json)?;
    Ok(serde_json::from_slice(&json)?)
}

#[async_trait]
impl SnapshotStore for S3Store {
    async fn upsert(&self, table: &str, key: &str, item: Item) -> Result<Item> {
        let s3_key = object_key(table, key);
        let body = encode_item(&item, self.gzip)?;
        debug!(bucket = %self.bucket, key = %s3_key, bytes = body.len(), "Writing object");

        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&s3_key)
            .body(ByteStream::from(body))
            .content_type("application/json");
        if self.gzip {
            request = request.content_encoding("gzip");
        }

        request
            .send()
            .await
            .with_context(|| format!("PutObject failed for s3://{}/{s3_key}", self.bucket))?;

        Ok(item)
    }

    async fn scan_page(&self, table: &str, token: Option<String>) -> Result<Page<Item>> {
        let resp = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(table_prefix(table))
            .max_keys(self.page_size)
            .set_continuation_token(token)
            .send()
            .await
            .with_context(|| format!("ListObjectsV2 failed for s3://{}/{table}", self.bucket))?;

        let mut items = Vec::new();
        for object in resp.contents() {
            let Some(key) = object.key() else { continue };
            // Deleted between list and get
            if let Some(item) = self.read_object(key).await? {
                items.push(item);
            }
        }

        let next_token = if resp.is_truncated().unwrap_or(false) {
            resp.next_continuation_token().map(str::to_string)
        } else {
            None
        };

        Ok(Page { items, next_token })
    }

    async fn get(&self, table: &str, key: &str) -> Result<Option<Item>> {
        self.read_object(&object_key(table, key)).await
    }
}
