use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use agrilink_backend::{BackendError, DataStore};
use agrilink_types::api::NewApplication;
use agrilink_types::models::{Application, ApplicationStatus, Role};

use crate::error::{AppError, AppResult};
use crate::jobs::{JobRepository, JobWithApplicants, WorkerBoard};
use crate::session::UserContext;

pub struct ApplicationRepository {
    data: Arc<dyn DataStore>,
    jobs: JobRepository,
}

impl ApplicationRepository {
    pub fn new(data: Arc<dyn DataStore>) -> Self {
        Self { jobs: JobRepository::new(data.clone()), data }
    }

    /// Apply to `job_id` and return the worker's board as stored afterwards.
    ///
    /// `board` is only consulted to skip an obviously duplicate request; the
    /// store's unique (job, worker) constraint decides.
    pub async fn apply(&self, worker: &UserContext, job_id: Uuid, board: &WorkerBoard) -> AppResult<WorkerBoard> {
        worker.require(Role::Worker)?;

        if board.status_for(job_id).is_some() {
            return Err(AppError::AlreadyApplied);
        }

        let new = NewApplication {
            job_id,
            worker_id: worker.user_id(),
            applicant_name: worker.profile.full_name.clone(),
        };
        match self.data.insert_application(&new).await {
            Ok(application) => {
                info!("Worker {} applied to job {} ({})", worker.user_id(), job_id, application.id);
            }
            Err(BackendError::UniqueViolation(_)) => {
                info!("Worker {} already applied to job {}", worker.user_id(), job_id);
                return Err(AppError::AlreadyApplied);
            }
            Err(e) => return Err(e.into()),
        }

        self.jobs.worker_view(worker.user_id()).await
    }

    /// Accept or reject a pending application and patch it inside `board`.
    pub async fn update_status(
        &self,
        farmer: &UserContext,
        board: &mut [JobWithApplicants],
        application_id: Uuid,
        status: ApplicationStatus,
    ) -> AppResult<Application> {
        farmer.require(Role::Farmer)?;

        let entry = board
            .iter_mut()
            .flat_map(|j| j.applications.iter_mut())
            .find(|a| a.application.id == application_id)
            .ok_or_else(|| AppError::not_found("application", application_id))?;

        // Only the farmer who posted the job decides on its applicants.
        if entry.job.farmer_id != farmer.user_id() {
            warn!(
                "Farmer {} tried to decide application {} on job {} they do not own",
                farmer.user_id(),
                application_id,
                entry.job.id
            );
            return Err(AppError::not_found("application", application_id));
        }

        let current = entry.application.status;
        if !current.can_transition_to(status) {
            return Err(AppError::InvalidTransition { from: current, to: status });
        }

        let updated = self
            .data
            .update_application_status(application_id, farmer.user_id(), ApplicationStatus::Pending, status)
            .await?;

        match updated {
            Some(application) => {
                info!("Application {} is now {}", application_id, application.status);
                entry.application = application.clone();
                Ok(application)
            }
            None => {
                let stored = self
                    .data
                    .get_application(application_id)
                    .await?
                    .ok_or_else(|| AppError::not_found("application", application_id))?;
                if stored.status == ApplicationStatus::Pending {
                    // Still pending, so the store refused the write itself.
                    warn!("Store refused to decide application {} for {}", application_id, farmer.user_id());
                    return Err(AppError::Backend(BackendError::Unauthorized(format!(
                        "application {} was not updated",
                        application_id
                    ))));
                }
                // Decided elsewhere since the board was loaded.
                warn!(
                    "Application {} is already {}, not moving it to {}",
                    application_id, stored.status, status
                );
                let from = stored.status;
                entry.application = stored;
                Err(AppError::InvalidTransition { from, to: status })
            }
        }
    }
}
