use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, warn};

use super::LocalBackend;
use crate::ObjectStorage;
use crate::error::{BackendError, BackendResult};

#[async_trait]
impl ObjectStorage for LocalBackend {
    async fn upload(&self, bucket: &str, key: &str, data: Bytes, content_type: &str) -> BackendResult<()> {
        let (b, k, ct) = (bucket.to_string(), key.to_string(), content_type.to_string());
        let size = data.len();
        match self.blocking(move |db| db.put_object(&b, &k, &ct, &data)).await {
            Ok(()) => {
                debug!("Stored {} bytes at {}/{}", size, bucket, key);
                Ok(())
            }
            // Objects are never overwritten in place, matching the hosted bucket default.
            Err(BackendError::UniqueViolation(_)) => Err(BackendError::Rejected {
                status: 409,
                message: "The resource already exists".into(),
            }),
            Err(e) => Err(e),
        }
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("local://{}/{}", bucket, key)
    }

    async fn remove(&self, bucket: &str, key: &str) -> BackendResult<()> {
        let (b, k) = (bucket.to_string(), key.to_string());
        if !self.blocking(move |db| db.delete_object(&b, &k)).await? {
            warn!("Remove of missing object {}/{}", bucket, key);
        }
        Ok(())
    }
}
