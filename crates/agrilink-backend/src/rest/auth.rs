use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use agrilink_types::api::{AuthUser, Session};

use super::{RestBackend, check, read};
use crate::AuthService;
use crate::error::{BackendError, BackendResult};

/// Token grant body returned by the auth service.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    expires_at: Option<i64>,
    user: AuthUser,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        let expires_at = self.expires_at.unwrap_or_else(|| Utc::now().timestamp() + self.expires_in);
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

/// Sign-up answers with a session when confirmation is off, or with the bare user when it is on.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    User(AuthUser),
}

/// Auth endpoints report refusals as 4xx bodies; those are shown to the user verbatim.
fn auth_error(e: BackendError) -> BackendError {
    match e {
        BackendError::Rejected { status, message } if (400..500).contains(&status) => {
            BackendError::Auth(message)
        }
        BackendError::Unauthorized(message) => BackendError::Auth(message),
        other => other,
    }
}

impl RestBackend {
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

    async fn grant(&self, grant_type: &str, body: serde_json::Value) -> BackendResult<Session> {
        let resp = self
            .request(Method::POST, "/auth/v1/token")
            .await
            .query(&[("grant_type", grant_type)])
            .json(&body)
            .send()
            .await?;
        let token: TokenResponse = read(resp).await.map_err(auth_error)?;
        let session = token.into_session();
        self.remember(&session).await;
        Ok(session)
    }
}

#[async_trait]
impl AuthService for RestBackend {
    async fn sign_up(&self, email: &str, password: &str) -> BackendResult<AuthUser> {
        let resp = self
            .request(Method::POST, "/auth/v1/signup")
            .await
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        match read::<SignUpResponse>(resp).await.map_err(auth_error)? {
            SignUpResponse::Session(token) => {
                let session = token.into_session();
                self.remember(&session).await;
                info!("Registered {} (signed in)", session.user.email);
                Ok(session.user)
            }
            SignUpResponse::User(user) => {
                info!("Registered {} (confirmation pending)", user.email);
                Ok(user)
            }
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> BackendResult<Session> {
        let session = self
            .grant("password", json!({ "email": email, "password": password }))
            .await?;
        info!("Signed in {}", session.user.email);
        Ok(session)
    }

    async fn sign_out(&self) -> BackendResult<()> {
        if self.session.read().await.is_some() {
            let resp = self.request(Method::POST, "/auth/v1/logout").await.send().await;
            match resp {
                Ok(resp) => {
                    // An already-invalid token still counts as signed out.
                    if let Err(e) = check(resp).await {
                        warn!("Logout refused by server: {}", e);
                    }
                }
                Err(e) => warn!("Logout request failed: {}", e),
            }
        }
        self.forget().await;
        Ok(())
    }

    async fn current_session(&self) -> BackendResult<Option<Session>> {
        let cached = self.session.read().await.clone();
        let session = match cached {
            Some(s) => s,
            None => match self.persistence.load().await {
                Ok(Some(s)) => {
                    *self.session.write().await = Some(s.clone());
                    s
                }
                Ok(None) => return Ok(None),
                Err(e) => {
                    warn!("Could not read persisted session: {}", e);
                    return Ok(None);
                }
            },
        };

        if !session.is_expired(Utc::now()) {
            return Ok(Some(session));
        }

        match self
            .grant("refresh_token", json!({ "refresh_token": session.refresh_token }))
            .await
        {
            Ok(fresh) => Ok(Some(fresh)),
            // Offline: keep the stored session so a later launch can retry.
            Err(e) if e.is_unreachable() => Err(e),
            Err(e) => {
                warn!("Session refresh for {} failed: {}", session.user.email, e);
                self.forget().await;
                Ok(None)
            }
        }
    }

    async fn send_password_reset(&self, email: &str) -> BackendResult<()> {
        let resp = self
            .request(Method::POST, "/auth/v1/recover")
            .await
            .json(&json!({ "email": email }))
            .send()
            .await?;
        check(resp).await.map_err(auth_error)?;
        info!("Password reset requested for {}", email);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_up_response_shapes() {
        let with_session = r#"{
            "access_token": "a", "token_type": "bearer", "expires_in": 3600,
            "expires_at": 1900000000, "refresh_token": "r",
            "user": {"id": "7f9c24e8-3b12-4fef-91e5-2f6c4b3f1a10", "email": "a@example.com", "aud": "authenticated"}
        }"#;
        match serde_json::from_str::<SignUpResponse>(with_session).unwrap() {
            SignUpResponse::Session(t) => assert_eq!(t.into_session().expires_at, 1_900_000_000),
            other => panic!("unexpected: {:?}", other),
        }

        let bare = r#"{"id": "7f9c24e8-3b12-4fef-91e5-2f6c4b3f1a10", "email": "a@example.com", "confirmation_sent_at": "2025-06-01T00:00:00Z"}"#;
        assert!(matches!(serde_json::from_str::<SignUpResponse>(bare).unwrap(), SignUpResponse::User(_)));
    }

    #[test]
    fn auth_refusals_become_auth_errors() {
        let e = auth_error(BackendError::Rejected { status: 400, message: "Invalid login credentials".into() });
        assert!(matches!(e, BackendError::Auth(m) if m == "Invalid login credentials"));
        assert!(matches!(
            auth_error(BackendError::Rejected { status: 500, message: "boom".into() }),
            BackendError::Rejected { status: 500, .. }
        ));
    }
}
