//! Ports to the AgriLink backend-as-a-service and the adapters that speak to it.
//!
//! The application never implements auth, tables or object storage itself; it
//! only issues requests through [`AuthService`], [`DataStore`] and
//! [`ObjectStorage`]. Two adapters exist:
//!
//! * [`rest::RestBackend`] talks to the hosted service over HTTPS.
//! * [`local::LocalBackend`] runs the same contract against an embedded SQLite
//!   store, for offline use and tests.

pub mod error;
pub mod local;
pub mod persist;
pub mod rest;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

use agrilink_types::api::{
    ApplicationWithJob, AuthUser, JobInsert, NewApplication, NewComment, NewMessage, NewPost,
    NewProfile, PostWithLikers, ProfileUpdate, Session,
};
use agrilink_types::models::{
    Application, ApplicationStatus, Comment, Job, Message, Post, PostLike, Profile,
};

pub use error::{BackendError, BackendResult};

/// Password authentication and session issuance.
#[async_trait]
pub trait AuthService: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> BackendResult<AuthUser>;

    /// Sign in and persist the resulting session.
    async fn sign_in(&self, email: &str, password: &str) -> BackendResult<Session>;

    /// Revoke and forget the current session. Succeeds when already signed out.
    async fn sign_out(&self) -> BackendResult<()>;

    /// The persisted session, refreshed if it expired. `None` when signed out
    /// or when the stored session can no longer be used.
    async fn current_session(&self) -> BackendResult<Option<Session>>;

    async fn send_password_reset(&self, email: &str) -> BackendResult<()>;
}

/// Typed access to the relational tables.
#[async_trait]
pub trait DataStore: Send + Sync {
    // Profiles
    async fn get_profile(&self, id: Uuid) -> BackendResult<Option<Profile>>;
    async fn list_profiles(&self, ids: &[Uuid]) -> BackendResult<Vec<Profile>>;
    async fn insert_profile(&self, profile: &NewProfile) -> BackendResult<Profile>;
    async fn update_profile(&self, id: Uuid, update: &ProfileUpdate) -> BackendResult<Profile>;
    async fn set_resume_url(&self, id: Uuid, url: &str) -> BackendResult<Profile>;

    // Jobs
    /// Newest first; `farmer_id = None` lists every job.
    async fn list_jobs(&self, farmer_id: Option<Uuid>) -> BackendResult<Vec<Job>>;
    async fn get_job(&self, id: Uuid) -> BackendResult<Option<Job>>;
    async fn insert_job(&self, job: &JobInsert) -> BackendResult<Job>;
    /// Returns `false` when no job with that id belongs to `farmer_id`.
    async fn delete_job(&self, id: Uuid, farmer_id: Uuid) -> BackendResult<bool>;

    // Applications
    async fn list_applications_for_jobs(&self, job_ids: &[Uuid]) -> BackendResult<Vec<Application>>;
    async fn list_worker_applications(&self, worker_id: Uuid) -> BackendResult<Vec<ApplicationWithJob>>;
    async fn get_application(&self, id: Uuid) -> BackendResult<Option<Application>>;
    async fn insert_application(&self, application: &NewApplication) -> BackendResult<Application>;
    /// Conditional update: only a row currently in `from`, on a job owned by
    /// `farmer_id`, changes. `None` otherwise.
    async fn update_application_status(
        &self,
        id: Uuid,
        farmer_id: Uuid,
        from: ApplicationStatus,
        to: ApplicationStatus,
    ) -> BackendResult<Option<Application>>;

    // Community
    /// Newest first, each with the ids of its likers.
    async fn list_posts(&self) -> BackendResult<Vec<PostWithLikers>>;
    async fn insert_post(&self, post: &NewPost) -> BackendResult<Post>;
    async fn insert_like(&self, like: PostLike) -> BackendResult<()>;
    async fn delete_like(&self, like: PostLike) -> BackendResult<()>;
    /// Store the number of like rows as the post's counter and return it.
    async fn recount_likes(&self, post_id: Uuid) -> BackendResult<i64>;
    /// Oldest first.
    async fn list_comments(&self, post_id: Uuid) -> BackendResult<Vec<Comment>>;
    async fn insert_comment(&self, comment: &NewComment) -> BackendResult<Comment>;

    // Chat
    /// Oldest first.
    async fn list_messages(&self, application_id: Uuid) -> BackendResult<Vec<Message>>;
    async fn insert_message(&self, message: &NewMessage) -> BackendResult<Message>;
}

/// Binary object storage for uploaded documents.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(&self, bucket: &str, key: &str, data: Bytes, content_type: &str) -> BackendResult<()>;
    fn public_url(&self, bucket: &str, key: &str) -> String;
    async fn remove(&self, bucket: &str, key: &str) -> BackendResult<()>;
}

/// Handles to the three halves of one backend.
#[derive(Clone)]
pub struct Backend {
    pub auth: Arc<dyn AuthService>,
    pub data: Arc<dyn DataStore>,
    pub storage: Arc<dyn ObjectStorage>,
}

impl Backend {
    /// Split one adapter implementing all three ports into handles.
    pub fn from_adapter<A>(adapter: Arc<A>) -> Self
    where
        A: AuthService + DataStore + ObjectStorage + 'static,
    {
        Self {
            auth: adapter.clone(),
            data: adapter.clone(),
            storage: adapter,
        }
    }
}
