use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use agrilink_db::models::ProfileChanges;
use agrilink_types::api::{
    ApplicationWithJob, JobInsert, NewApplication, NewComment, NewMessage, NewPost, NewProfile,
    PostWithLikers, ProfileUpdate,
};
use agrilink_types::models::{
    Application, ApplicationStatus, Comment, Job, Message, Post, PostLike, Profile,
};

use super::{LocalBackend, convert, corrupt};
use crate::DataStore;
use crate::error::{BackendError, BackendResult};

#[async_trait]
impl DataStore for LocalBackend {
    // -- Profiles --

    async fn get_profile(&self, id: Uuid) -> BackendResult<Option<Profile>> {
        let key = id.to_string();
        let row = self.blocking(move |db| db.get_profile(&key)).await?;
        Ok(row.and_then(convert::profile))
    }

    async fn list_profiles(&self, ids: &[Uuid]) -> BackendResult<Vec<Profile>> {
        let keys = convert::ids_to_strings(ids);
        let rows = self.blocking(move |db| db.get_profiles(&keys)).await?;
        Ok(rows.into_iter().filter_map(convert::profile).collect())
    }

    async fn insert_profile(&self, profile: &NewProfile) -> BackendResult<Profile> {
        let (id, role, name) = (
            profile.id.to_string(),
            profile.role.as_str(),
            profile.full_name.clone(),
        );
        let row = self.blocking(move |db| db.insert_profile(&id, role, &name)).await?;
        convert::profile(row).ok_or_else(|| corrupt("profile"))
    }

    async fn update_profile(&self, id: Uuid, update: &ProfileUpdate) -> BackendResult<Profile> {
        let key = id.to_string();
        let update = update.clone();
        let row = self
            .blocking(move |db| {
                let changes = ProfileChanges {
                    full_name: update.full_name.as_deref(),
                    phone: update.phone.as_deref(),
                    bio: update.bio.as_deref(),
                    experience_years: update.experience_years,
                    experience_details: update.experience_details.as_deref(),
                    resume_url: None,
                };
                db.update_profile(&key, &changes)
            })
            .await?
            .ok_or_else(|| BackendError::not_found("profile", id))?;
        convert::profile(row).ok_or_else(|| corrupt("profile"))
    }

    async fn set_resume_url(&self, id: Uuid, url: &str) -> BackendResult<Profile> {
        let (key, url) = (id.to_string(), url.to_string());
        let row = self
            .blocking(move |db| {
                let changes = ProfileChanges { resume_url: Some(&url), ..Default::default() };
                db.update_profile(&key, &changes)
            })
            .await?
            .ok_or_else(|| BackendError::not_found("profile", id))?;
        convert::profile(row).ok_or_else(|| corrupt("profile"))
    }

    // -- Jobs --

    async fn list_jobs(&self, farmer_id: Option<Uuid>) -> BackendResult<Vec<Job>> {
        let farmer = farmer_id.map(|id| id.to_string());
        let rows = self.blocking(move |db| db.list_jobs(farmer.as_deref())).await?;
        Ok(rows.into_iter().filter_map(convert::job).collect())
    }

    async fn get_job(&self, id: Uuid) -> BackendResult<Option<Job>> {
        let key = id.to_string();
        let row = self.blocking(move |db| db.get_job(&key)).await?;
        Ok(row.and_then(convert::job))
    }

    async fn insert_job(&self, job: &JobInsert) -> BackendResult<Job> {
        let id = Uuid::new_v4().to_string();
        let farmer = job.farmer_id.to_string();
        let job = job.job.clone();
        let row = self
            .blocking(move |db| {
                db.insert_job(
                    &id,
                    &farmer,
                    &job.title,
                    job.location.as_deref(),
                    &job.pay_rate,
                    job.description.as_deref(),
                )
            })
            .await?;
        convert::job(row).ok_or_else(|| corrupt("job"))
    }

    async fn delete_job(&self, id: Uuid, farmer_id: Uuid) -> BackendResult<bool> {
        let (key, farmer) = (id.to_string(), farmer_id.to_string());
        self.blocking(move |db| db.delete_job(&key, &farmer)).await
    }

    // -- Applications --

    async fn list_applications_for_jobs(&self, job_ids: &[Uuid]) -> BackendResult<Vec<Application>> {
        let keys = convert::ids_to_strings(job_ids);
        let rows = self.blocking(move |db| db.list_applications_for_jobs(&keys)).await?;
        Ok(rows.into_iter().filter_map(convert::application).collect())
    }

    async fn list_worker_applications(&self, worker_id: Uuid) -> BackendResult<Vec<ApplicationWithJob>> {
        let key = worker_id.to_string();
        let rows = self.blocking(move |db| db.list_worker_applications(&key)).await?;
        Ok(rows
            .into_iter()
            .filter_map(|(app, job)| {
                Some(ApplicationWithJob {
                    application: convert::application(app)?,
                    job: job.and_then(convert::job),
                })
            })
            .collect())
    }

    async fn get_application(&self, id: Uuid) -> BackendResult<Option<Application>> {
        let key = id.to_string();
        let row = self.blocking(move |db| db.get_application(&key)).await?;
        Ok(row.and_then(convert::application))
    }

    async fn insert_application(&self, application: &NewApplication) -> BackendResult<Application> {
        let id = Uuid::new_v4().to_string();
        let (job, worker) = (application.job_id.to_string(), application.worker_id.to_string());
        let name = application.applicant_name.clone();
        let row = self
            .blocking(move |db| db.insert_application(&id, &job, &worker, name.as_deref()))
            .await?;
        convert::application(row).ok_or_else(|| corrupt("application"))
    }

    async fn update_application_status(
        &self,
        id: Uuid,
        farmer_id: Uuid,
        from: ApplicationStatus,
        to: ApplicationStatus,
    ) -> BackendResult<Option<Application>> {
        let (key, farmer) = (id.to_string(), farmer_id.to_string());
        let row = self
            .blocking(move |db| db.update_application_status(&key, &farmer, from.as_str(), to.as_str()))
            .await?;
        Ok(row.and_then(convert::application))
    }

    // -- Community --

    async fn list_posts(&self) -> BackendResult<Vec<PostWithLikers>> {
        let (rows, likes) = self
            .blocking(|db| {
                let rows = db.list_posts()?;
                let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
                let likes = db.get_likes_for_posts(&ids)?;
                Ok((rows, likes))
            })
            .await?;

        let mut likers: HashMap<String, Vec<Uuid>> = HashMap::new();
        for like in likes {
            if let Ok(user) = like.user_id.parse() {
                likers.entry(like.post_id).or_default().push(user);
            }
        }

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let liker_ids = likers.remove(&row.id).unwrap_or_default();
                Some(PostWithLikers { post: convert::post(row)?, liker_ids })
            })
            .collect())
    }

    async fn insert_post(&self, post: &NewPost) -> BackendResult<Post> {
        let id = Uuid::new_v4().to_string();
        let author = post.author_id.to_string();
        let post = post.clone();
        let row = self
            .blocking(move |db| {
                db.insert_post(&id, &post.content, &author, &post.author_name, &post.author_role)
            })
            .await?;
        convert::post(row).ok_or_else(|| corrupt("post"))
    }

    async fn insert_like(&self, like: PostLike) -> BackendResult<()> {
        let (post, user) = (like.post_id.to_string(), like.user_id.to_string());
        self.blocking(move |db| db.insert_like(&post, &user)).await
    }

    async fn delete_like(&self, like: PostLike) -> BackendResult<()> {
        let (post, user) = (like.post_id.to_string(), like.user_id.to_string());
        self.blocking(move |db| db.delete_like(&post, &user)).await?;
        Ok(())
    }

    async fn recount_likes(&self, post_id: Uuid) -> BackendResult<i64> {
        let key = post_id.to_string();
        self.blocking(move |db| {
            if db.get_post(&key)?.is_none() {
                return Ok(None);
            }
            db.recount_likes(&key).map(Some)
        })
        .await?
        .ok_or_else(|| BackendError::not_found("post", post_id))
    }

    async fn list_comments(&self, post_id: Uuid) -> BackendResult<Vec<Comment>> {
        let key = post_id.to_string();
        let rows = self.blocking(move |db| db.list_comments(&key)).await?;
        Ok(rows.into_iter().filter_map(convert::comment).collect())
    }

    async fn insert_comment(&self, comment: &NewComment) -> BackendResult<Comment> {
        let id = Uuid::new_v4().to_string();
        let (post, user) = (comment.post_id.to_string(), comment.user_id.to_string());
        let (name, content) = (comment.user_name.clone(), comment.content.clone());
        let row = self
            .blocking(move |db| db.insert_comment(&id, &post, &user, name.as_deref(), &content))
            .await?;
        convert::comment(row).ok_or_else(|| corrupt("comment"))
    }

    // -- Chat --

    async fn list_messages(&self, application_id: Uuid) -> BackendResult<Vec<Message>> {
        let key = application_id.to_string();
        let rows = self.blocking(move |db| db.list_messages(&key)).await?;
        Ok(rows.into_iter().filter_map(convert::message).collect())
    }

    async fn insert_message(&self, message: &NewMessage) -> BackendResult<Message> {
        let id = Uuid::new_v4().to_string();
        let (app, sender) = (message.application_id.to_string(), message.sender_id.to_string());
        let content = message.content.clone();
        let row = self
            .blocking(move |db| db.insert_message(&id, &app, &sender, &content))
            .await?;
        convert::message(row).ok_or_else(|| corrupt("message"))
    }
}
