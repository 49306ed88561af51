use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Method;
use tracing::debug;

use super::{RestBackend, check};
use crate::ObjectStorage;
use crate::error::BackendResult;

#[async_trait]
impl ObjectStorage for RestBackend {
    async fn upload(&self, bucket: &str, key: &str, data: Bytes, content_type: &str) -> BackendResult<()> {
        let size = data.len();
        let resp = self
            .request(Method::POST, &format!("/storage/v1/object/{}/{}", bucket, key))
            .await
            .header("content-type", content_type)
            .header("x-upsert", "false")
            .body(data)
            .send()
            .await?;
        check(resp).await?;
        debug!("Uploaded {} bytes to {}/{}", size, bucket, key);
        Ok(())
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        self.url(&format!("/storage/v1/object/public/{}/{}", bucket, key))
    }

    async fn remove(&self, bucket: &str, key: &str) -> BackendResult<()> {
        let resp = self
            .request(Method::DELETE, &format!("/storage/v1/object/{}/{}", bucket, key))
            .await
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }
}
