#![allow(dead_code)]

use std::sync::Arc;

use agrilink_backend::Backend;
use agrilink_backend::local::LocalBackend;
use agrilink_backend::persist::MemorySessionPersistence;
use agrilink_core::{SessionState, Services, UserContext};
use agrilink_db::Database;
use agrilink_types::api::{NewJob, ProfileUpdate};
use agrilink_types::models::{Job, Role};

pub const SECRET: &str = "integration-test-secret";
pub const PASSWORD: &str = "padi-2025";
pub const BUCKET: &str = "resumes";

/// One shared store; every actor gets its own backend handle and session.
pub struct World {
    pub db: Arc<Database>,
}

pub struct Actor {
    pub services: Services,
    pub user: UserContext,
}

impl World {
    pub fn new() -> Self {
        Self { db: Arc::new(Database::open_in_memory().unwrap()) }
    }

    pub fn backend(&self) -> Backend {
        let local = LocalBackend::with_database(
            self.db.clone(),
            SECRET,
            Arc::new(MemorySessionPersistence::default()),
        );
        Backend::from_adapter(Arc::new(local))
    }

    pub fn services(&self) -> Services {
        Services::new(self.backend(), BUCKET)
    }

    /// Sign up, sign in and name a new user.
    pub async fn actor(&self, email: &str, role: Role, name: &str) -> Actor {
        let services = self.services();
        services.session.sign_up(email, PASSWORD, role).await.unwrap();

        let mut user = match services.session.sign_in(email, PASSWORD, None).await.unwrap() {
            SessionState::Ready(user) => user,
            other => panic!("expected a ready session, got {:?}", other),
        };

        let update = ProfileUpdate { full_name: Some(name.into()), ..Default::default() };
        user.profile = services.profiles.update(user.user_id(), update).await.unwrap();
        Actor { services, user }
    }

    pub async fn farmer(&self, name: &str) -> Actor {
        self.actor(&email_for(name), Role::Farmer, name).await
    }

    pub async fn worker(&self, name: &str) -> Actor {
        self.actor(&email_for(name), Role::Worker, name).await
    }

    /// Run raw SQL against the shared store, bypassing every constraint check.
    pub fn sql(&self, statement: &str) {
        self.db
            .with_conn(|conn| {
                conn.execute_batch(&format!(
                    "PRAGMA foreign_keys = OFF; {} PRAGMA foreign_keys = ON;",
                    statement
                ))?;
                Ok(())
            })
            .unwrap();
    }
}

impl Actor {
    pub async fn post_job(&self, title: &str, pay: &str) -> Job {
        self.services
            .jobs
            .post_job(
                &self.user,
                NewJob {
                    title: title.into(),
                    location: Some("Kedah".into()),
                    pay_rate: pay.into(),
                    description: None,
                },
            )
            .await
            .unwrap()
    }
}

fn email_for(name: &str) -> String {
    format!("{}@example.com", name.to_lowercase().replace(' ', "."))
}
