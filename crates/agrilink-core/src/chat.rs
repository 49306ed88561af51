use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use agrilink_backend::DataStore;
use agrilink_types::api::NewMessage;
use agrilink_types::models::{ApplicationStatus, Message};

use crate::error::{AppError, AppResult};
use crate::session::UserContext;

/// Messages between a farmer and a worker on one accepted application.
pub struct ChatRepository {
    data: Arc<dyn DataStore>,
}

impl ChatRepository {
    pub fn new(data: Arc<dyn DataStore>) -> Self {
        Self { data }
    }

    /// The thread on `application_id`, oldest first. Only its two parties may read it.
    pub async fn open(&self, viewer: &UserContext, application_id: Uuid) -> AppResult<Vec<Message>> {
        self.participant_of(viewer, application_id).await?;
        Ok(self.data.list_messages(application_id).await?)
    }

    pub async fn send(&self, sender: &UserContext, application_id: Uuid, content: &str) -> AppResult<Vec<Message>> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::Validation("Message cannot be empty".into()));
        }

        self.participant_of(sender, application_id).await?;

        let new = NewMessage {
            application_id,
            sender_id: sender.user_id(),
            content: content.to_string(),
        };
        let message = self.data.insert_message(&new).await?;
        info!("Message {} on application {}", message.id, application_id);

        Ok(self.data.list_messages(application_id).await?)
    }

    /// Ok when `user` is the worker or the job's farmer on an accepted application.
    async fn participant_of(&self, user: &UserContext, application_id: Uuid) -> AppResult<()> {
        let application = self
            .data
            .get_application(application_id)
            .await?
            .ok_or_else(|| AppError::not_found("application", application_id))?;
        if application.status != ApplicationStatus::Accepted {
            return Err(AppError::Validation("Chat opens once the application is accepted.".into()));
        }

        let participant = if application.worker_id == user.user_id() {
            true
        } else {
            self.data
                .get_job(application.job_id)
                .await?
                .is_some_and(|job| job.farmer_id == user.user_id())
        };
        if !participant {
            warn!("{} is not part of application {}", user.user_id(), application_id);
            return Err(AppError::Validation(
                "Only the farmer and the worker on this job can chat.".into(),
            ));
        }
        Ok(())
    }
}
