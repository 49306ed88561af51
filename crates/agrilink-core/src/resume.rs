use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use tracing::{error, info, warn};

use agrilink_backend::{DataStore, ObjectStorage};
use agrilink_types::models::Profile;

use crate::error::{AppError, AppResult};
use crate::session::UserContext;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";
const PDF_MAGIC: &[u8] = b"%PDF";

/// A document chosen by the user, held in memory.
#[derive(Debug, Clone)]
pub struct PickedFile {
    pub name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl PickedFile {
    fn is_pdf(&self) -> bool {
        let declared = self
            .content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .eq_ignore_ascii_case(PDF_CONTENT_TYPE);
        declared && self.name.to_ascii_lowercase().ends_with(".pdf") && self.data.starts_with(PDF_MAGIC)
    }
}

/// Load a file from disk. The content type is guessed from the extension.
pub async fn read_pdf(path: &Path) -> AppResult<PickedFile> {
    let data = tokio::fs::read(path)
        .await
        .map_err(|e| AppError::Validation(format!("Cannot read {}: {}", path.display(), e)))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let content_type = if name.to_ascii_lowercase().ends_with(".pdf") {
        PDF_CONTENT_TYPE
    } else {
        "application/octet-stream"
    };
    Ok(PickedFile { name, content_type: content_type.into(), data: Bytes::from(data) })
}

pub struct ResumeUploader {
    data: Arc<dyn DataStore>,
    storage: Arc<dyn ObjectStorage>,
    bucket: String,
}

impl ResumeUploader {
    pub fn new(data: Arc<dyn DataStore>, storage: Arc<dyn ObjectStorage>, bucket: impl Into<String>) -> Self {
        Self { data, storage, bucket: bucket.into() }
    }

    /// Store the PDF, point the profile at it and update `user.profile`.
    /// On failure `user` is left as it was.
    pub async fn upload(&self, user: &mut UserContext, file: PickedFile) -> AppResult<Profile> {
        if !file.is_pdf() {
            return Err(AppError::Validation("Only PDF files can be uploaded as a resume.".into()));
        }

        let key = format!("{}_{}.pdf", user.user_id(), Utc::now().timestamp_millis());
        let size = file.data.len();
        self.storage
            .upload(&self.bucket, &key, file.data, PDF_CONTENT_TYPE)
            .await?;
        let url = self.storage.public_url(&self.bucket, &key);

        let profile = match self.data.set_resume_url(user.user_id(), &url).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!("Resume stored at {}/{} but profile write failed: {}", self.bucket, key, e);
                if let Err(re) = self.storage.remove(&self.bucket, &key).await {
                    error!("Orphaned resume {}/{} could not be removed: {}", self.bucket, key, re);
                }
                return Err(e.into());
            }
        };

        info!("Uploaded resume for {} ({} bytes)", user.user_id(), size);
        user.profile = profile.clone();
        Ok(profile)
    }
}
