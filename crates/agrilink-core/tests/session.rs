mod common;

use std::sync::Arc;
use std::time::Duration;

use agrilink_backend::Backend;
use agrilink_backend::persist::{MemorySessionPersistence, SessionPersistence};
use agrilink_backend::rest::{RestBackend, RestConfig};
use agrilink_core::{AppError, SessionState, SessionStore};
use agrilink_types::api::{AuthUser, Session};
use agrilink_types::models::Role;
use uuid::Uuid;

use common::{PASSWORD, World};

#[tokio::test]
async fn fresh_install_is_signed_out() {
    let world = World::new();
    let services = world.services();
    assert_eq!(services.session.resolve().await, SessionState::SignedOut);
}

#[tokio::test]
async fn sign_up_creates_profile_with_role() {
    let world = World::new();
    let services = world.services();

    services.session.sign_up("ani@example.com", PASSWORD, Role::Worker).await.unwrap();
    let state = services.session.sign_in("ani@example.com", PASSWORD, None).await.unwrap();
    let SessionState::Ready(user) = state else {
        panic!("expected ready, got {:?}", state);
    };
    assert_eq!(user.role(), Role::Worker);
    assert_eq!(user.profile.full_name.as_deref(), Some("New User"));

    // Same answer on the next launch.
    assert_eq!(services.session.resolve().await, SessionState::Ready(user));
}

#[tokio::test]
async fn missing_profile_is_incomplete_until_repaired() {
    let world = World::new();
    let services = world.services();
    services.session.sign_up("budi@example.com", PASSWORD, Role::Worker).await.unwrap();
    let user_id = match services.session.sign_in("budi@example.com", PASSWORD, None).await.unwrap() {
        SessionState::Ready(user) => user.user_id(),
        other => panic!("unexpected: {:?}", other),
    };

    // Signup interrupted before the profile row was written.
    world.sql(&format!("DELETE FROM profiles WHERE id = '{}';", user_id));
    assert!(matches!(services.session.resolve().await, SessionState::IncompleteSignup(_)));
    assert!(matches!(
        services.session.sign_in("budi@example.com", PASSWORD, None).await.unwrap(),
        SessionState::IncompleteSignup(_)
    ));

    let repaired = services
        .session
        .sign_in("budi@example.com", PASSWORD, Some(Role::Farmer))
        .await
        .unwrap();
    let SessionState::Ready(user) = repaired else {
        panic!("expected ready, got {:?}", repaired);
    };
    assert_eq!(user.user_id(), user_id);
    assert_eq!(user.role(), Role::Farmer);
}

#[tokio::test]
async fn auth_failures_are_verbatim_and_blank_input_is_local() {
    let world = World::new();
    let services = world.services();
    services.session.sign_up("ani@example.com", PASSWORD, Role::Worker).await.unwrap();

    let e = services.session.sign_in("ani@example.com", "wrong-one", None).await.unwrap_err();
    assert!(matches!(e, AppError::Auth(_)));
    assert_eq!(e.notice(), "Invalid login credentials");

    let e = services.session.sign_up("ani@example.com", PASSWORD, Role::Worker).await.unwrap_err();
    assert_eq!(e.notice(), "User already registered");

    assert!(matches!(
        services.session.sign_in("", PASSWORD, None).await,
        Err(AppError::Validation(_))
    ));
    assert!(matches!(
        services.session.send_password_reset("  ").await,
        Err(AppError::Validation(_))
    ));
    services.session.send_password_reset("ani@example.com").await.unwrap();
}

#[tokio::test]
async fn sign_out_returns_to_entry() {
    let world = World::new();
    let actor = world.worker("Ani").await;
    actor.services.session.sign_out().await.unwrap();
    assert_eq!(actor.services.session.resolve().await, SessionState::SignedOut);
}

#[tokio::test]
async fn unreachable_backend_is_not_signed_out() {
    let persistence = Arc::new(MemorySessionPersistence::default());
    let session = Session {
        access_token: "token".into(),
        refresh_token: "refresh".into(),
        expires_at: chrono::Utc::now().timestamp() + 3600,
        user: AuthUser { id: Uuid::new_v4(), email: "ani@example.com".into() },
    };
    persistence.save(&session).await.unwrap();

    // Nothing listens on port 1.
    let rest = RestBackend::new(
        RestConfig {
            base_url: "http://127.0.0.1:1".into(),
            anon_key: "anon".into(),
            timeout: Duration::from_secs(2),
        },
        persistence.clone(),
    )
    .unwrap();
    let store = SessionStore::new(Backend::from_adapter(Arc::new(rest)));

    assert!(matches!(store.resolve().await, SessionState::Unreachable(_)));
    // The session survives for the next attempt.
    assert_eq!(persistence.load().await.unwrap(), Some(session));
}
