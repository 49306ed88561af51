mod auth;
mod convert;
mod data;
mod storage;

use std::path::Path;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::error;

use agrilink_db::{Database, is_foreign_key_violation, is_unique_violation};
use agrilink_types::api::Session;

use crate::error::{BackendError, BackendResult};
use crate::persist::SessionPersistence;

/// Access tokens live for an hour, like the hosted service's default.
const ACCESS_TOKEN_TTL_SECS: i64 = 3600;

/// Backend adapter over the embedded SQLite store.
pub struct LocalBackend {
    db: Arc<Database>,
    jwt_secret: String,
    token_ttl_secs: i64,
    session: RwLock<Option<Session>>,
    persistence: Arc<dyn SessionPersistence>,
}

impl LocalBackend {
    pub fn open(
        path: &Path,
        jwt_secret: impl Into<String>,
        persistence: Arc<dyn SessionPersistence>,
    ) -> anyhow::Result<Self> {
        let db = Database::open(path)?;
        Ok(Self::with_database(Arc::new(db), jwt_secret, persistence))
    }

    pub fn in_memory(
        jwt_secret: impl Into<String>,
        persistence: Arc<dyn SessionPersistence>,
    ) -> anyhow::Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self::with_database(Arc::new(db), jwt_secret, persistence))
    }

    /// Several backends may share one database, each with its own signed-in user.
    pub fn with_database(
        db: Arc<Database>,
        jwt_secret: impl Into<String>,
        persistence: Arc<dyn SessionPersistence>,
    ) -> Self {
        Self {
            db,
            jwt_secret: jwt_secret.into(),
            token_ttl_secs: ACCESS_TOKEN_TTL_SECS,
            session: RwLock::new(None),
            persistence,
        }
    }

    /// Override the access-token lifetime.
    pub fn with_token_ttl(mut self, secs: i64) -> Self {
        self.token_ttl_secs = secs;
        self
    }

    pub fn database(&self) -> Arc<Database> {
        self.db.clone()
    }

    /// Run blocking DB work off the async runtime.
    async fn blocking<T, F>(&self, f: F) -> BackendResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                BackendError::Internal(e.to_string())
            })?
            .map_err(classify)
    }
}

/// Map a store error onto the backend taxonomy.
fn classify(e: anyhow::Error) -> BackendError {
    if is_unique_violation(&e) {
        BackendError::UniqueViolation(e.to_string())
    } else if is_foreign_key_violation(&e) {
        BackendError::Rejected { status: 409, message: e.to_string() }
    } else {
        error!("Local store error: {}", e);
        BackendError::Internal(e.to_string())
    }
}

fn corrupt(entity: &'static str) -> BackendError {
    BackendError::Internal(format!("stored {} row could not be read", entity))
}
