//! Object store access.
//!
//! Thin wrapper around the S3 SDK configured for S3-compatible stores
//! (custom endpoint, static credentials, path-style addressing). Provides
//! the two operations the fetch stage needs: prefix listing and download.

use std::path::Path;

use anyhow::{Context, Result};
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::Client;
use tracing::debug;

use crate::config::StoreConfig;

pub struct ObjectStore {
    client: Client,
    bucket: String,
}

impl ObjectStore {
    /// Build a client for the configured endpoint. Purely local; no request
    /// is made until `list` or `download` is called.
    pub fn new(config: &StoreConfig) -> Self {
        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "lakeload-store",
        );

        let s3_config = aws_sdk_s3::Config::builder()
            .credentials_provider(credentials)
            .region(Region::new(config.region.clone()))
            .endpoint_url(&config.endpoint)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
        }
    }

    /// List every object key under the given prefix
    pub async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        debug!("Listing objects in s3://{}/{}", self.bucket, prefix);

        let mut keys = Vec::new();
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.with_context(|| {
                format!("Failed to list s3://{}/{}", self.bucket, prefix)
            })?;
            keys.extend(
                page.contents()
                    .iter()
                    .filter_map(|obj| obj.key().map(|k| k.to_string())),
            );
        }

        Ok(keys)
    }

    /// Download one object to the given local path
    pub async fn download(&self, key: &str, local_path: &Path) -> Result<()> {
        debug!("Downloading s3://{}/{}", self.bucket, key);

        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("Failed to download s3://{}/{}", self.bucket, key))?;

        let data = response
            .body
            .collect()
            .await
            .context("Failed to read object body")?
            .into_bytes();

        tokio::fs::write(local_path, &data)
            .await
            .with_context(|| format!("Failed to write {}", local_path.display()))?;

        debug!("Wrote {} bytes to {}", data.len(), local_path.display());
        Ok(())
    }
}
