//! Data flow between the AgriLink screens and the backend.
//!
//! Each repository owns one concern and talks to the backend ports only;
//! [`Services`] wires them to one [`Backend`].

pub mod applications;
pub mod chat;
pub mod error;
pub mod feed;
pub mod jobs;
pub mod profile;
pub mod resume;
pub mod scope;
pub mod session;

use agrilink_backend::Backend;

pub use applications::ApplicationRepository;
pub use chat::ChatRepository;
pub use error::{AppError, AppResult};
pub use feed::{FeedPost, PostRepository};
pub use jobs::{ApplicationWithContext, JobRepository, JobWithApplicants, MyApplication, WorkerBoard};
pub use profile::ProfileRepository;
pub use resume::{PickedFile, ResumeUploader, read_pdf};
pub use scope::ViewScope;
pub use session::{SessionState, SessionStore, UserContext};

/// Every repository over one backend.
pub struct Services {
    pub session: SessionStore,
    pub profiles: ProfileRepository,
    pub jobs: JobRepository,
    pub applications: ApplicationRepository,
    pub posts: PostRepository,
    pub resumes: ResumeUploader,
    pub chat: ChatRepository,
}

impl Services {
    pub fn new(backend: Backend, resume_bucket: impl Into<String>) -> Self {
        Self {
            profiles: ProfileRepository::new(backend.data.clone()),
            jobs: JobRepository::new(backend.data.clone()),
            applications: ApplicationRepository::new(backend.data.clone()),
            posts: PostRepository::new(backend.data.clone()),
            resumes: ResumeUploader::new(backend.data.clone(), backend.storage.clone(), resume_bucket),
            chat: ChatRepository::new(backend.data.clone()),
            session: SessionStore::new(backend),
        }
    }
}
