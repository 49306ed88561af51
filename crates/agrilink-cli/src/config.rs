use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::info;

use agrilink_backend::Backend;
use agrilink_backend::local::LocalBackend;
use agrilink_backend::persist::FileSessionPersistence;
use agrilink_backend::rest::{RestBackend, RestConfig};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Rest,
    Local,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub backend: BackendKind,
    pub url: String,
    pub anon_key: String,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub session_path: PathBuf,
    pub resume_bucket: String,
    pub http_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let backend = match var("AGRILINK_BACKEND").as_deref().unwrap_or("local") {
            "rest" => BackendKind::Rest,
            "local" => BackendKind::Local,
            other => bail!("AGRILINK_BACKEND must be 'rest' or 'local', got '{}'", other),
        };

        let url = var("AGRILINK_URL").unwrap_or_default();
        let anon_key = var("AGRILINK_ANON_KEY").unwrap_or_default();
        let jwt_secret = var("AGRILINK_JWT_SECRET").unwrap_or_default();

        match backend {
            BackendKind::Rest => {
                if url.is_empty() || anon_key.is_empty() {
                    bail!("AGRILINK_URL and AGRILINK_ANON_KEY are required for the rest backend");
                }
            }
            BackendKind::Local => {
                if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
                    bail!("AGRILINK_JWT_SECRET is unset or still a placeholder");
                }
            }
        }

        let http_timeout = match var("AGRILINK_HTTP_TIMEOUT_SECS") {
            Some(v) => v
                .parse::<u64>()
                .with_context(|| format!("AGRILINK_HTTP_TIMEOUT_SECS is not a number: '{}'", v))?,
            None => 30,
        };

        Ok(Self {
            backend,
            url,
            anon_key,
            db_path: var("AGRILINK_DB_PATH").unwrap_or_else(|| "agrilink.db".into()).into(),
            jwt_secret,
            session_path: var("AGRILINK_SESSION_PATH")
                .unwrap_or_else(|| ".agrilink-session.json".into())
                .into(),
            resume_bucket: var("AGRILINK_RESUME_BUCKET").unwrap_or_else(|| "resumes".into()),
            http_timeout: Duration::from_secs(http_timeout),
        })
    }

    pub fn connect(&self) -> Result<Backend> {
        let persistence = Arc::new(FileSessionPersistence::new(self.session_path.clone()));
        match self.backend {
            BackendKind::Rest => {
                info!("Using backend at {}", self.url);
                let rest = RestBackend::new(
                    RestConfig {
                        base_url: self.url.clone(),
                        anon_key: self.anon_key.clone(),
                        timeout: self.http_timeout,
                    },
                    persistence,
                )?;
                Ok(Backend::from_adapter(Arc::new(rest)))
            }
            BackendKind::Local => {
                info!("Using local store {}", self.db_path.display());
                let local = LocalBackend::open(&self.db_path, self.jwt_secret.clone(), persistence)?;
                Ok(Backend::from_adapter(Arc::new(local)))
            }
        }
    }
}
