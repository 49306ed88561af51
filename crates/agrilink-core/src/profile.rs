use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use agrilink_backend::DataStore;
use agrilink_types::api::ProfileUpdate;
use agrilink_types::models::Profile;

use crate::error::{AppError, AppResult};

pub struct ProfileRepository {
    data: Arc<dyn DataStore>,
}

impl ProfileRepository {
    pub fn new(data: Arc<dyn DataStore>) -> Self {
        Self { data }
    }

    pub async fn fetch(&self, id: Uuid) -> AppResult<Profile> {
        self.data
            .get_profile(id)
            .await?
            .ok_or_else(|| AppError::not_found("profile", id))
    }

    /// Write the given fields and return the stored profile.
    pub async fn update(&self, id: Uuid, update: ProfileUpdate) -> AppResult<Profile> {
        if update.full_name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(AppError::Validation("Name cannot be empty".into()));
        }
        if update.experience_years.is_some_and(|y| y < 0) {
            return Err(AppError::Validation("Years of experience cannot be negative".into()));
        }

        let profile = self.data.update_profile(id, &update).await?;
        info!("Profile {} updated", id);
        Ok(profile)
    }
}
