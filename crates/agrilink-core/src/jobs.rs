//! Job listings for both roles.
//!
//! The farmer view is assembled client-side: jobs, then their applications by
//! job-id set, then the applicants' profiles by worker-id set, merged by key.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use agrilink_backend::DataStore;
use agrilink_types::api::{JobInsert, NewJob};
use agrilink_types::models::{Application, ApplicationStatus, Job, Profile, Role, UNKNOWN_WORKER};

use crate::error::{AppError, AppResult};
use crate::session::UserContext;

/// An application with its job and the applicant's profile, if one exists.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationWithContext {
    pub application: Application,
    pub job: Job,
    pub applicant: Option<Profile>,
}

impl ApplicationWithContext {
    pub fn applicant_name(&self) -> &str {
        match &self.applicant {
            Some(profile) => profile.display_name(),
            None => UNKNOWN_WORKER,
        }
    }
}

/// One of a farmer's jobs and everyone who applied, oldest application first.
#[derive(Debug, Clone, PartialEq)]
pub struct JobWithApplicants {
    pub job: Job,
    pub applications: Vec<ApplicationWithContext>,
}

/// A worker's application whose job still exists.
#[derive(Debug, Clone, PartialEq)]
pub struct MyApplication {
    pub application: Application,
    pub job: Job,
}

/// Everything a worker sees: all open jobs and their own applications.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkerBoard {
    pub jobs: Vec<Job>,
    pub applications: Vec<MyApplication>,
}

impl WorkerBoard {
    /// Status of this worker's application to `job_id`, if any.
    pub fn status_for(&self, job_id: Uuid) -> Option<ApplicationStatus> {
        self.applications
            .iter()
            .find(|a| a.application.job_id == job_id)
            .map(|a| a.application.status)
    }
}

pub struct JobRepository {
    data: Arc<dyn DataStore>,
}

impl JobRepository {
    pub fn new(data: Arc<dyn DataStore>) -> Self {
        Self { data }
    }

    /// The farmer's own jobs, newest first, each with its applicants.
    pub async fn farmer_view(&self, farmer_id: Uuid) -> AppResult<Vec<JobWithApplicants>> {
        let jobs = self.data.list_jobs(Some(farmer_id)).await?;

        let job_ids: Vec<Uuid> = jobs.iter().map(|j| j.id).collect();
        let applications = if job_ids.is_empty() {
            Vec::new()
        } else {
            self.data.list_applications_for_jobs(&job_ids).await?
        };

        let mut seen = HashSet::new();
        let worker_ids: Vec<Uuid> = applications
            .iter()
            .map(|a| a.worker_id)
            .filter(|id| seen.insert(*id))
            .collect();
        let profiles: HashMap<Uuid, Profile> = if worker_ids.is_empty() {
            HashMap::new()
        } else {
            self.data
                .list_profiles(&worker_ids)
                .await?
                .into_iter()
                .map(|p| (p.id, p))
                .collect()
        };

        debug!(
            "Farmer {}: {} jobs, {} applications, {}/{} applicant profiles",
            farmer_id,
            jobs.len(),
            applications.len(),
            profiles.len(),
            worker_ids.len()
        );

        let mut by_job: HashMap<Uuid, Vec<Application>> = HashMap::new();
        for application in applications {
            by_job.entry(application.job_id).or_default().push(application);
        }

        Ok(jobs
            .into_iter()
            .map(|job| {
                let applications = by_job
                    .remove(&job.id)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|application| ApplicationWithContext {
                        applicant: profiles.get(&application.worker_id).cloned(),
                        job: job.clone(),
                        application,
                    })
                    .collect();
                JobWithApplicants { job, applications }
            })
            .collect())
    }

    /// All jobs plus the worker's applications. Applications whose job was deleted are dropped.
    pub async fn worker_view(&self, worker_id: Uuid) -> AppResult<WorkerBoard> {
        let jobs = self.data.list_jobs(None).await?;
        let rows = self.data.list_worker_applications(worker_id).await?;

        let total = rows.len();
        let applications: Vec<MyApplication> = rows
            .into_iter()
            .filter_map(|row| {
                row.job.map(|job| MyApplication { application: row.application, job })
            })
            .collect();
        if applications.len() < total {
            debug!(
                "Dropped {} applications of worker {} with deleted jobs",
                total - applications.len(),
                worker_id
            );
        }

        Ok(WorkerBoard { jobs, applications })
    }

    pub async fn post_job(&self, farmer: &UserContext, job: NewJob) -> AppResult<Job> {
        farmer.require(Role::Farmer)?;

        let title = job.title.trim().to_string();
        let pay_rate = job.pay_rate.trim().to_string();
        if title.is_empty() || pay_rate.is_empty() {
            return Err(AppError::Validation("Missing Info: a title and pay rate are required".into()));
        }

        let insert = JobInsert {
            farmer_id: farmer.user_id(),
            job: NewJob {
                title,
                pay_rate,
                location: non_blank(job.location),
                description: non_blank(job.description),
            },
        };
        let job = self.data.insert_job(&insert).await?;
        info!("Farmer {} posted job {} '{}'", farmer.user_id(), job.id, job.title);
        Ok(job)
    }

    /// Delete one of the farmer's jobs after `confirm` agrees. Its applications
    /// go with it. Returns the refreshed farmer view, or `None` if declined.
    pub async fn delete_job<F>(
        &self,
        farmer: &UserContext,
        job: &Job,
        confirm: F,
    ) -> AppResult<Option<Vec<JobWithApplicants>>>
    where
        F: FnOnce(&Job) -> bool,
    {
        farmer.require(Role::Farmer)?;
        if !confirm(job) {
            debug!("Deletion of job {} declined", job.id);
            return Ok(None);
        }

        if !self.data.delete_job(job.id, farmer.user_id()).await? {
            warn!("Job {} was not deleted: missing or not owned by {}", job.id, farmer.user_id());
            return Err(AppError::not_found("job", job.id));
        }
        info!("Farmer {} deleted job {}", farmer.user_id(), job.id);

        self.farmer_view(farmer.user_id()).await.map(Some)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn job() -> Job {
        Job {
            id: Uuid::new_v4(),
            farmer_id: Uuid::new_v4(),
            title: "Durian picking".into(),
            location: None,
            pay_rate: "RM90/day".into(),
            description: None,
            created_at: Utc::now(),
        }
    }

    fn application(job: &Job, status: ApplicationStatus) -> Application {
        Application {
            id: Uuid::new_v4(),
            job_id: job.id,
            worker_id: Uuid::new_v4(),
            status,
            applicant_name: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn status_for_scans_current_applications() {
        let (a, b) = (job(), job());
        let board = WorkerBoard {
            jobs: vec![a.clone(), b.clone()],
            applications: vec![MyApplication {
                application: application(&a, ApplicationStatus::Accepted),
                job: a.clone(),
            }],
        };
        assert_eq!(board.status_for(a.id), Some(ApplicationStatus::Accepted));
        assert_eq!(board.status_for(b.id), None);
    }

    #[test]
    fn missing_applicant_shows_placeholder() {
        let j = job();
        let entry = ApplicationWithContext {
            application: application(&j, ApplicationStatus::Pending),
            job: j,
            applicant: None,
        };
        assert_eq!(entry.applicant_name(), UNKNOWN_WORKER);
    }

    #[test]
    fn blank_optionals_become_none() {
        assert_eq!(non_blank(Some("  ".into())), None);
        assert_eq!(non_blank(Some(" Kedah ".into())), Some("Kedah".into()));
    }
}
