use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, warn};

use agrilink_types::api::Session;

/// Where a signed-in session survives between runs.
#[async_trait]
pub trait SessionPersistence: Send + Sync {
    async fn load(&self) -> Result<Option<Session>>;
    async fn save(&self, session: &Session) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

/// Session stored as JSON in a single file.
pub struct FileSessionPersistence {
    path: PathBuf,
}

impl FileSessionPersistence {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl SessionPersistence for FileSessionPersistence {
    async fn load(&self) -> Result<Option<Session>> {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                // A torn or hand-edited file means signed out, not a hard failure.
                warn!("Ignoring unreadable session file {}: {}", self.path.display(), e);
                Ok(None)
            }
        }
    }

    async fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(session)?).await?;
        fs::rename(&tmp, &self.path).await?;
        debug!("Session saved to {}", self.path.display());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Keeps the session in memory only.
#[derive(Default)]
pub struct MemorySessionPersistence {
    slot: Mutex<Option<Session>>,
}

#[async_trait]
impl SessionPersistence for MemorySessionPersistence {
    async fn load(&self) -> Result<Option<Session>> {
        let slot = self.slot.lock().map_err(|e| anyhow::anyhow!("Session lock poisoned: {}", e))?;
        Ok(slot.clone())
    }

    async fn save(&self, session: &Session) -> Result<()> {
        let mut slot = self.slot.lock().map_err(|e| anyhow::anyhow!("Session lock poisoned: {}", e))?;
        *slot = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut slot = self.slot.lock().map_err(|e| anyhow::anyhow!("Session lock poisoned: {}", e))?;
        *slot = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agrilink_types::api::AuthUser;
    use uuid::Uuid;

    fn session() -> Session {
        Session {
            access_token: "access".into(),
            refresh_token: "refresh".into(),
            expires_at: 1_900_000_000,
            user: AuthUser { id: Uuid::new_v4(), email: "siti@example.com".into() },
        }
    }

    #[tokio::test]
    async fn file_persistence_roundtrip() {
        let path = std::env::temp_dir().join(format!("agrilink-session-{}.json", Uuid::new_v4()));
        let store = FileSessionPersistence::new(path.clone());

        assert!(store.load().await.unwrap().is_none());

        let s = session();
        store.save(&s).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(s));

        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn corrupt_file_reads_as_signed_out() {
        let path = std::env::temp_dir().join(format!("agrilink-session-{}.json", Uuid::new_v4()));
        tokio::fs::write(&path, b"{not json").await.unwrap();

        let store = FileSessionPersistence::new(path.clone());
        assert!(store.load().await.unwrap().is_none());
        store.clear().await.unwrap();
    }
}
