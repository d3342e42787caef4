//! services/client/src/adapters/storage.rs
//!
//! This module contains the object storage adapter for the note PDFs.
//! It implements the `ObjectStorage` port from the `core` crate.

use crate::adapters::supabase::SupabaseClient;
use async_trait::async_trait;
use bytes::Bytes;
use note_cycle_core::ports::{ObjectStorage, PortResult};
use reqwest::{header::CONTENT_TYPE, Method};
use serde::Serialize;
use tracing::debug;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `ObjectStorage` port for a single bucket.
#[derive(Clone)]
pub struct SupabaseStorageAdapter {
    client: SupabaseClient,
    bucket: String,
}

impl SupabaseStorageAdapter {
    /// Creates a new `SupabaseStorageAdapter` for the given bucket.
    pub fn new(client: SupabaseClient, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    fn object_segments<'a>(&'a self, prefix: &'a [&'a str], key: &'a str) -> impl Iterator<Item = &'a str> {
        prefix
            .iter()
            .copied()
            .chain(std::iter::once(self.bucket.as_str()))
            .chain(key.split('/'))
    }
}

#[derive(Serialize)]
struct RemoveRequest<'a> {
    prefixes: &'a [String],
}

//=========================================================================================
// `ObjectStorage` Trait Implementation
//=========================================================================================

#[async_trait]
impl ObjectStorage for SupabaseStorageAdapter {
    async fn upload(&self, key: &str, bytes: Bytes, content_type: &str) -> PortResult<()> {
        let url = self
            .client
            .endpoint(self.object_segments(&["storage", "v1", "object"], key))?;
        debug!("Uploading {} bytes to {}", bytes.len(), url);

        let request = self
            .client
            .request(Method::POST, url)
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes);
        self.client.send(request).await?;
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        self.client
            .endpoint(self.object_segments(&["storage", "v1", "object", "public"], key))
            .map(|url| url.to_string())
            .unwrap_or_else(|_| format!("storage/v1/object/public/{}/{}", self.bucket, key))
    }

    async fn remove(&self, keys: &[String]) -> PortResult<()> {
        let url = self
            .client
            .endpoint(["storage", "v1", "object", self.bucket.as_str()])?;
        let request = self
            .client
            .request(Method::DELETE, url)
            .json(&RemoveRequest { prefixes: keys });
        self.client.send(request).await?;
        Ok(())
    }
}
