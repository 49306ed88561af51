use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use agrilink_types::api::{
    ApplicationWithJob, JobInsert, NewApplication, NewComment, NewMessage, NewPost, NewProfile,
    PostWithLikers, ProfileUpdate, StatusChange,
};
use agrilink_types::models::{
    Application, ApplicationStatus, Comment, Job, Message, Post, PostLike, Profile,
};

use super::query::Query;
use super::{RestBackend, check, content_range_total, read, read_one};
use crate::DataStore;
use crate::error::{BackendError, BackendResult};

const RETURN_ROWS: (&str, &str) = ("Prefer", "return=representation");

/// A post row with its `post_likes(user_id)` embedding.
#[derive(Debug, Deserialize)]
struct PostRow {
    #[serde(flatten)]
    post: Post,
    #[serde(default)]
    post_likes: Vec<LikerRef>,
}

#[derive(Debug, Deserialize)]
struct LikerRef {
    user_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct JobRef {
    id: Uuid,
}

impl RestBackend {
    async fn select<T: serde::de::DeserializeOwned>(&self, table: &str, query: Query) -> BackendResult<Vec<T>> {
        let resp = self.table(Method::GET, table, &query).await.send().await?;
        read(resp).await
    }

    async fn select_one<T: serde::de::DeserializeOwned>(
        &self,
        table: &str,
        query: Query,
        entity: &'static str,
    ) -> BackendResult<Option<T>> {
        let resp = self.table(Method::GET, table, &query).await.send().await?;
        read_one(resp, entity).await
    }

    async fn insert<B, T>(&self, table: &str, body: &B, entity: &'static str) -> BackendResult<T>
    where
        B: serde::Serialize + ?Sized + Sync,
        T: serde::de::DeserializeOwned,
    {
        let resp = self
            .table(Method::POST, table, &Query::new())
            .await
            .header(RETURN_ROWS.0, RETURN_ROWS.1)
            .json(body)
            .send()
            .await?;
        read_one(resp, entity)
            .await?
            .ok_or_else(|| BackendError::Decode(format!("insert into {} returned no row", table)))
    }

    async fn patch<B, T>(&self, table: &str, query: Query, body: &B, entity: &'static str) -> BackendResult<Option<T>>
    where
        B: serde::Serialize + ?Sized + Sync,
        T: serde::de::DeserializeOwned,
    {
        let resp = self
            .table(Method::PATCH, table, &query)
            .await
            .header(RETURN_ROWS.0, RETURN_ROWS.1)
            .json(body)
            .send()
            .await?;
        read_one(resp, entity).await
    }
}

#[async_trait]
impl DataStore for RestBackend {
    // -- Profiles --

    async fn get_profile(&self, id: Uuid) -> BackendResult<Option<Profile>> {
        self.select_one("profiles", Query::new().select("*").eq("id", id), "profile").await
    }

    async fn list_profiles(&self, ids: &[Uuid]) -> BackendResult<Vec<Profile>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.select("profiles", Query::new().select("*").is_in("id", ids)).await
    }

    async fn insert_profile(&self, profile: &NewProfile) -> BackendResult<Profile> {
        self.insert("profiles", profile, "profile").await
    }

    async fn update_profile(&self, id: Uuid, update: &ProfileUpdate) -> BackendResult<Profile> {
        if update.is_empty() {
            return self
                .get_profile(id)
                .await?
                .ok_or_else(|| BackendError::not_found("profile", id));
        }
        self.patch("profiles", Query::new().eq("id", id), update, "profile")
            .await?
            .ok_or_else(|| BackendError::not_found("profile", id))
    }

    async fn set_resume_url(&self, id: Uuid, url: &str) -> BackendResult<Profile> {
        self.patch("profiles", Query::new().eq("id", id), &json!({ "resume_url": url }), "profile")
            .await?
            .ok_or_else(|| BackendError::not_found("profile", id))
    }

    // -- Jobs --

    async fn list_jobs(&self, farmer_id: Option<Uuid>) -> BackendResult<Vec<Job>> {
        let mut query = Query::new().select("*");
        if let Some(farmer) = farmer_id {
            query = query.eq("farmer_id", farmer);
        }
        self.select("jobs", query.order("created_at", false)).await
    }

    async fn get_job(&self, id: Uuid) -> BackendResult<Option<Job>> {
        self.select_one("jobs", Query::new().select("*").eq("id", id), "job").await
    }

    async fn insert_job(&self, job: &JobInsert) -> BackendResult<Job> {
        self.insert("jobs", job, "job").await
    }

    async fn delete_job(&self, id: Uuid, farmer_id: Uuid) -> BackendResult<bool> {
        let query = Query::new().eq("id", id).eq("farmer_id", farmer_id);
        let resp = self
            .table(Method::DELETE, "jobs", &query)
            .await
            .header(RETURN_ROWS.0, RETURN_ROWS.1)
            .send()
            .await?;
        let deleted: Vec<Job> = read(resp).await?;
        Ok(!deleted.is_empty())
    }

    // -- Applications --

    async fn list_applications_for_jobs(&self, job_ids: &[Uuid]) -> BackendResult<Vec<Application>> {
        if job_ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = Query::new()
            .select("*")
            .is_in("job_id", job_ids)
            .order("created_at", true);
        self.select("applications", query).await
    }

    async fn list_worker_applications(&self, worker_id: Uuid) -> BackendResult<Vec<ApplicationWithJob>> {
        let query = Query::new()
            .select("*,jobs(*)")
            .eq("worker_id", worker_id)
            .order("created_at", false);
        self.select("applications", query).await
    }

    async fn get_application(&self, id: Uuid) -> BackendResult<Option<Application>> {
        self.select_one("applications", Query::new().select("*").eq("id", id), "application").await
    }

    async fn insert_application(&self, application: &NewApplication) -> BackendResult<Application> {
        self.insert("applications", application, "application").await
    }

    async fn update_application_status(
        &self,
        id: Uuid,
        farmer_id: Uuid,
        from: ApplicationStatus,
        to: ApplicationStatus,
    ) -> BackendResult<Option<Application>> {
        // The patch cannot filter through the embedded job, so restrict it to
        // the farmer's own job ids.
        let owned: Vec<JobRef> = self
            .select("jobs", Query::new().select("id").eq("farmer_id", farmer_id))
            .await?;
        if owned.is_empty() {
            return Ok(None);
        }
        let job_ids: Vec<Uuid> = owned.iter().map(|j| j.id).collect();
        let query = Query::new().eq("id", id).eq("status", from).is_in("job_id", &job_ids);
        self.patch("applications", query, &StatusChange { status: to }, "application").await
    }

    // -- Community --

    async fn list_posts(&self) -> BackendResult<Vec<PostWithLikers>> {
        let query = Query::new().select("*,post_likes(user_id)").order("created_at", false);
        let rows: Vec<PostRow> = self.select("posts", query).await?;
        Ok(rows
            .into_iter()
            .map(|row| PostWithLikers {
                post: row.post,
                liker_ids: row.post_likes.into_iter().map(|l| l.user_id).collect(),
            })
            .collect())
    }

    async fn insert_post(&self, post: &NewPost) -> BackendResult<Post> {
        self.insert("posts", post, "post").await
    }

    async fn insert_like(&self, like: PostLike) -> BackendResult<()> {
        let resp = self
            .table(Method::POST, "post_likes", &Query::new())
            .await
            .json(&like)
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }

    async fn delete_like(&self, like: PostLike) -> BackendResult<()> {
        let query = Query::new().eq("post_id", like.post_id).eq("user_id", like.user_id);
        let resp = self.table(Method::DELETE, "post_likes", &query).await.send().await?;
        check(resp).await?;
        Ok(())
    }

    async fn recount_likes(&self, post_id: Uuid) -> BackendResult<i64> {
        let query = Query::new().select("post_id").eq("post_id", post_id);
        let resp = self
            .table(Method::HEAD, "post_likes", &query)
            .await
            .header("Prefer", "count=exact")
            .send()
            .await?;
        let resp = check(resp).await?;
        let count = resp
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(content_range_total)
            .ok_or_else(|| BackendError::Decode("like count missing from Content-Range".into()))?;
        debug!("Post {} has {} likes", post_id, count);

        let updated: Option<Post> = self
            .patch("posts", Query::new().eq("id", post_id), &json!({ "likes": count }), "post")
            .await?;
        match updated {
            Some(post) => Ok(post.likes),
            None => Err(BackendError::not_found("post", post_id)),
        }
    }

    async fn list_comments(&self, post_id: Uuid) -> BackendResult<Vec<Comment>> {
        let query = Query::new().select("*").eq("post_id", post_id).order("created_at", true);
        self.select("comments", query).await
    }

    async fn insert_comment(&self, comment: &NewComment) -> BackendResult<Comment> {
        self.insert("comments", comment, "comment").await
    }

    // -- Chat --

    async fn list_messages(&self, application_id: Uuid) -> BackendResult<Vec<Message>> {
        let query = Query::new()
            .select("*")
            .eq("application_id", application_id)
            .order("created_at", true);
        self.select("messages", query).await
    }

    async fn insert_message(&self, message: &NewMessage) -> BackendResult<Message> {
        self.insert("messages", message, "message").await
    }
}
