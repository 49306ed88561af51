use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::{info, warn};
use uuid::Uuid;

use agrilink_types::api::{AuthUser, Claims, Session};

use super::LocalBackend;
use crate::AuthService;
use crate::error::{BackendError, BackendResult};

const MIN_PASSWORD_LEN: usize = 6;

impl LocalBackend {
    async fn issue_session(&self, user_id: Uuid, email: &str) -> BackendResult<Session> {
        let expires_at = Utc::now().timestamp() + self.token_ttl_secs;
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            exp: expires_at.max(0) as usize,
        };

        let access_token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| BackendError::Internal(format!("token encoding failed: {}", e)))?;

        let refresh_token = Uuid::new_v4().simple().to_string();
        let (token, uid) = (refresh_token.clone(), user_id.to_string());
        self.blocking(move |db| db.insert_refresh_token(&token, &uid)).await?;

        let session = Session {
            access_token,
            refresh_token,
            expires_at,
            user: AuthUser { id: user_id, email: email.to_string() },
        };
        self.remember(&session).await;
        Ok(session)
    }

    async fn remember(&self, session: &Session) {
        *self.session.write().await = Some(session.clone());
        if let Err(e) = self.persistence.save(session).await {
            warn!("Failed to persist session: {}", e);
        }
    }

    async fn forget(&self) {
        *self.session.write().await = None;
        if let Err(e) = self.persistence.clear().await {
            warn!("Failed to clear persisted session: {}", e);
        }
    }

    fn verify_token(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
    }

    /// Trade the session's refresh token for a new session. `None` if the token was already used or revoked.
    async fn refresh(&self, session: &Session) -> BackendResult<Option<Session>> {
        let token = session.refresh_token.clone();
        let Some(user_id) = self.blocking(move |db| db.take_refresh_token(&token)).await? else {
            return Ok(None);
        };

        let uid = user_id.clone();
        let Some(user) = self.blocking(move |db| db.get_user_by_id(&uid)).await? else {
            return Ok(None);
        };

        let id: Uuid = user
            .id
            .parse()
            .map_err(|_| BackendError::Internal(format!("corrupt user id '{}'", user.id)))?;
        info!("Refreshed session for {}", user.email);
        self.issue_session(id, &user.email).await.map(Some)
    }
}

#[async_trait]
impl AuthService for LocalBackend {
    async fn sign_up(&self, email: &str, password: &str) -> BackendResult<AuthUser> {
        let email = email.trim().to_lowercase();
        if !email.contains('@') {
            return Err(BackendError::Auth(
                "Unable to validate email address: invalid format".into(),
            ));
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(BackendError::Auth(format!(
                "Password should be at least {} characters.",
                MIN_PASSWORD_LEN
            )));
        }

        let user_id = Uuid::new_v4();
        let (uid, mail, pw) = (user_id.to_string(), email.clone(), password.to_string());
        let created = self
            .blocking(move |db| {
                if db.get_user_by_email(&mail)?.is_some() {
                    return Ok(false);
                }
                // Hash password with Argon2id
                let salt = SaltString::generate(&mut OsRng);
                let hash = Argon2::default()
                    .hash_password(pw.as_bytes(), &salt)
                    .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
                    .to_string();
                db.create_user(&uid, &mail, &hash)?;
                Ok(true)
            })
            .await;

        match created {
            Ok(true) => {}
            Ok(false) | Err(BackendError::UniqueViolation(_)) => {
                return Err(BackendError::Auth("User already registered".into()));
            }
            Err(e) => return Err(e),
        }

        info!("Registered user {}", email);
        Ok(AuthUser { id: user_id, email })
    }

    async fn sign_in(&self, email: &str, password: &str) -> BackendResult<Session> {
        let email = email.trim().to_lowercase();
        let (mail, pw) = (email.clone(), password.to_string());

        let user = self
            .blocking(move |db| {
                let Some(user) = db.get_user_by_email(&mail)? else {
                    return Ok(None);
                };
                let parsed = PasswordHash::new(&user.password)
                    .map_err(|e| anyhow::anyhow!("stored hash unreadable: {}", e))?;
                let ok = Argon2::default().verify_password(pw.as_bytes(), &parsed).is_ok();
                Ok(ok.then_some(user))
            })
            .await?
            .ok_or_else(|| BackendError::Auth("Invalid login credentials".into()))?;

        let user_id: Uuid = user
            .id
            .parse()
            .map_err(|_| BackendError::Internal(format!("corrupt user id '{}'", user.id)))?;

        info!("Signed in {}", user.email);
        self.issue_session(user_id, &user.email).await
    }

    async fn sign_out(&self) -> BackendResult<()> {
        let current = self.session.read().await.clone();
        let current = match current {
            Some(s) => Some(s),
            None => self.persistence.load().await.ok().flatten(),
        };

        if let Some(session) = current {
            let uid = session.user.id.to_string();
            self.blocking(move |db| db.revoke_refresh_tokens(&uid)).await?;
            info!("Signed out {}", session.user.email);
        }

        self.forget().await;
        Ok(())
    }

    async fn current_session(&self) -> BackendResult<Option<Session>> {
        let cached = self.session.read().await.clone();
        let session = match cached {
            Some(s) => s,
            None => match self.persistence.load().await {
                Ok(Some(s)) => s,
                Ok(None) => return Ok(None),
                Err(e) => {
                    warn!("Could not read persisted session: {}", e);
                    return Ok(None);
                }
            },
        };

        let expired = session.is_expired(Utc::now())
            || matches!(
                self.verify_token(&session.access_token).map_err(|e| e.into_kind()),
                Err(ErrorKind::ExpiredSignature)
            );

        if expired {
            return match self.refresh(&session).await? {
                Some(fresh) => Ok(Some(fresh)),
                None => {
                    warn!("Session for {} expired and could not be refreshed", session.user.email);
                    self.forget().await;
                    Ok(None)
                }
            };
        }

        match self.verify_token(&session.access_token) {
            Ok(claims) if claims.sub == session.user.id => {
                *self.session.write().await = Some(session.clone());
                Ok(Some(session))
            }
            Ok(_) | Err(_) => {
                warn!("Discarding session with an invalid access token");
                self.forget().await;
                Ok(None)
            }
        }
    }

    async fn send_password_reset(&self, email: &str) -> BackendResult<()> {
        let email = email.trim().to_lowercase();
        let mail = email.clone();
        self.blocking(move |db| db.record_password_reset(&mail)).await?;
        // Offline there is no mailer; the request is only recorded.
        info!("Password reset requested for {}", email);
        Ok(())
    }
}
