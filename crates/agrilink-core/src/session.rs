use tracing::{info, warn};
use uuid::Uuid;

use agrilink_backend::{Backend, BackendError};
use agrilink_types::api::{AuthUser, NewProfile, Session};
use agrilink_types::models::{Profile, Role};

use crate::error::{AppError, AppResult};

/// Name given to a profile created before the user has filled it in.
pub const NEW_USER_NAME: &str = "New User";

/// A signed-in user with a profile.
#[derive(Debug, Clone, PartialEq)]
pub struct UserContext {
    pub session: Session,
    pub profile: Profile,
}

impl UserContext {
    pub fn user_id(&self) -> Uuid {
        self.session.user.id
    }

    pub fn role(&self) -> Role {
        self.profile.role
    }

    pub fn require(&self, role: Role) -> AppResult<()> {
        if self.profile.role == role {
            Ok(())
        } else {
            Err(AppError::WrongRole { required: role })
        }
    }
}

/// What launch should show.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    SignedOut,
    Ready(UserContext),
    /// Signed in but no profile row exists yet.
    IncompleteSignup(Session),
    /// The backend could not be asked; the stored session is kept.
    Unreachable(String),
}

pub struct SessionStore {
    backend: Backend,
}

impl SessionStore {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    /// Resolve the persisted session and its profile.
    pub async fn resolve(&self) -> SessionState {
        let session = match self.backend.auth.current_session().await {
            Ok(Some(session)) => session,
            Ok(None) => return SessionState::SignedOut,
            Err(e) if e.is_unreachable() => {
                warn!("Session check could not reach the backend: {}", e);
                return SessionState::Unreachable(e.to_string());
            }
            Err(e) => {
                warn!("Session check failed: {}", e);
                self.discard().await;
                return SessionState::SignedOut;
            }
        };

        match self.backend.data.get_profile(session.user.id).await {
            Ok(Some(profile)) => SessionState::Ready(UserContext { session, profile }),
            Ok(None) => {
                info!("No profile for {}", session.user.email);
                SessionState::IncompleteSignup(session)
            }
            Err(e) if e.is_unreachable() => {
                warn!("Profile fetch could not reach the backend: {}", e);
                SessionState::Unreachable(e.to_string())
            }
            Err(e) => {
                warn!("Profile fetch for {} failed: {}", session.user.email, e);
                self.discard().await;
                SessionState::SignedOut
            }
        }
    }

    /// Create the account and its profile with the chosen role.
    pub async fn sign_up(&self, email: &str, password: &str, role: Role) -> AppResult<AuthUser> {
        require_credentials(email, password)?;
        let user = self.backend.auth.sign_up(email.trim(), password).await?;

        let profile = NewProfile { id: user.id, role, full_name: NEW_USER_NAME.into() };
        if let Err(e) = self.backend.data.insert_profile(&profile).await {
            // Signing in with a role hint creates it later.
            warn!("Profile creation for {} failed: {}", user.email, e);
        }

        info!("Account created for {} as {}", user.email, role);
        Ok(user)
    }

    /// Sign in. A missing profile is created when `role_hint` says which role to give it.
    pub async fn sign_in(&self, email: &str, password: &str, role_hint: Option<Role>) -> AppResult<SessionState> {
        require_credentials(email, password)?;
        let session = self.backend.auth.sign_in(email.trim(), password).await?;

        if let Some(profile) = self.backend.data.get_profile(session.user.id).await? {
            return Ok(SessionState::Ready(UserContext { session, profile }));
        }

        let Some(role) = role_hint else {
            return Ok(SessionState::IncompleteSignup(session));
        };

        let new = NewProfile { id: session.user.id, role, full_name: NEW_USER_NAME.into() };
        let profile = match self.backend.data.insert_profile(&new).await {
            Ok(profile) => profile,
            // Another device finished the signup in between.
            Err(BackendError::UniqueViolation(_)) => self
                .backend
                .data
                .get_profile(session.user.id)
                .await?
                .ok_or_else(|| AppError::not_found("profile", session.user.id))?,
            Err(e) => return Err(e.into()),
        };
        info!("Completed signup for {} as {}", session.user.email, role);
        Ok(SessionState::Ready(UserContext { session, profile }))
    }

    pub async fn sign_out(&self) -> AppResult<()> {
        self.backend.auth.sign_out().await?;
        Ok(())
    }

    pub async fn send_password_reset(&self, email: &str) -> AppResult<()> {
        if email.trim().is_empty() {
            return Err(AppError::Validation("Please type your email first.".into()));
        }
        self.backend.auth.send_password_reset(email.trim()).await?;
        Ok(())
    }

    async fn discard(&self) {
        if let Err(e) = self.backend.auth.sign_out().await {
            warn!("Could not clear rejected session: {}", e);
        }
    }
}

fn require_credentials(email: &str, password: &str) -> AppResult<()> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(AppError::Validation("Please fill in all fields".into()));
    }
    Ok(())
}
