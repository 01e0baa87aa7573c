use std::{sync::Arc, time::Duration};

use dashmap::DashMap;
use log::{error, info, warn};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    app::{ArcIdentityProvider, ServiceError, ServiceResult},
    identity::{AuthSession, AuthUser, IdentityError},
    proxy::ExternalDb,
    session::{Session, SessionContext, SessionState},
    store::{Filters, Row, TableOperation},
    validation::{validate_email, validate_password, validate_username},
};

const GUEST_TTL: Duration = Duration::from_secs(60 * 60 * 4);

pub const DEFAULT_ELO: i64 = 200;

/// Outcome of mirroring a fresh account into the external store. Mirroring is
/// best-effort: a failure never fails the sign-up, but it is surfaced here so
/// the caller can acknowledge it instead of discovering a missing row later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MirrorStatus {
    /// Profile and player rows were both written.
    Completed,
    /// The profile insert failed; no rows were written.
    ProfileFailed { error: String },
    /// The profile row was written but the player insert failed, leaving an
    /// orphaned profile. There is no compensation on this path.
    PlayerFailed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct SignUpOutcome {
    #[serde(flatten)]
    pub session: AuthSession,
    pub mirror: MirrorStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedUser {
    pub user_id: String,
    pub email: String,
    pub username: String,
}

/// Wraps the identity provider and mirrors successful sign-ups into the
/// external store. Guest sessions are handled locally and never reach the
/// provider.
pub struct AuthService {
    identity: ArcIdentityProvider,
    db: Arc<ExternalDb>,
    guest_tokens: moka::sync::Cache<String, String>,
    guest_usernames: DashMap<String, String>,
}

impl AuthService {
    pub fn new(identity: ArcIdentityProvider, db: Arc<ExternalDb>) -> Self {
        Self {
            identity,
            db,
            guest_tokens: moka::sync::Cache::builder().time_to_idle(GUEST_TTL).build(),
            guest_usernames: DashMap::new(),
        }
    }

    pub async fn sign_up(
        &self,
        ctx: &SessionContext,
        email: &str,
        password: &str,
        username: &str,
    ) -> ServiceResult<SignUpOutcome> {
        let username = validate_username(username)?;
        let email = validate_email(email)?;
        let password = validate_password(password)?;

        ctx.transition(SessionState::Authenticating);
        let session = match self.identity.sign_up(&email, &password, &username).await {
            Ok(session) => session,
            Err(err) => {
                let message = friendly_sign_up_error(err);
                ctx.transition(SessionState::Failed(message.clone()));
                return ServiceError::bad_request(message);
            }
        };

        let mirror = self.mirror_sign_up(&session.user.id, &username).await;
        ctx.transition(SessionState::Authenticated(Session::Account(
            session.clone(),
        )));
        Ok(SignUpOutcome { session, mirror })
    }

    async fn mirror_sign_up(&self, user_id: &str, username: &str) -> MirrorStatus {
        if let Err(err) = self
            .db
            .execute(insert_profile(user_id, username))
            .await
        {
            error!("Sign-up mirroring failed (profile insert): {}", err);
            return MirrorStatus::ProfileFailed {
                error: err.message(),
            };
        }
        if let Err(err) = self.db.execute(insert_player(user_id, username)).await {
            error!("Sign-up mirroring failed (player insert): {}", err);
            return MirrorStatus::PlayerFailed {
                error: err.message(),
            };
        }
        MirrorStatus::Completed
    }

    pub async fn sign_in(
        &self,
        ctx: &SessionContext,
        email: &str,
        password: &str,
    ) -> ServiceResult<AuthSession> {
        ctx.transition(SessionState::Authenticating);
        match self.identity.sign_in(email, password).await {
            Ok(session) => {
                ctx.transition(SessionState::Authenticated(Session::Account(
                    session.clone(),
                )));
                Ok(session)
            }
            Err(err) => {
                let message = friendly_sign_in_error(err);
                ctx.transition(SessionState::Failed(message.clone()));
                ServiceError::unauthorized(message)
            }
        }
    }

    pub async fn sign_out(&self, ctx: &SessionContext) -> ServiceResult<()> {
        match ctx.session() {
            Some(Session::Account(session)) => {
                self.identity
                    .sign_out(&session.access_token)
                    .await
                    .map_err(|err| ServiceError::Other(err.to_string()))?;
            }
            Some(Session::Guest { username, token }) => {
                self.guest_tokens.invalidate(&token);
                self.guest_usernames.remove(&username);
            }
            None => {}
        }
        ctx.transition(SessionState::Anonymous);
        Ok(())
    }

    /// Guest login never touches the identity provider: the session lives in
    /// a local TTL cache. Signing in again with the same name within the TTL
    /// resumes the existing session.
    pub fn guest_sign_in(&self, ctx: &SessionContext, username: &str) -> ServiceResult<Session> {
        let username = validate_username(username)?;
        let token = match self
            .guest_usernames
            .get(&username)
            .map(|entry| entry.value().clone())
            .filter(|token| self.guest_tokens.contains_key(token))
        {
            Some(token) => token,
            None => {
                let token = Uuid::new_v4().to_string();
                self.guest_tokens.insert(token.clone(), username.clone());
                self.guest_usernames.insert(username.clone(), token.clone());
                info!("Guest session created for {}", username);
                token
            }
        };
        let session = Session::Guest { username, token };
        ctx.transition(SessionState::Authenticated(session.clone()));
        Ok(session)
    }

    pub fn oauth_url(&self, provider: &str) -> String {
        self.identity.oauth_url(provider)
    }

    /// Admin-only user creation with compensating cleanup: if the player
    /// insert fails the profile row is deleted, and if any store write fails
    /// the provider account is deleted again.
    pub async fn admin_create_user(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> ServiceResult<CreatedUser> {
        info!("Creating auth user: {}", email);
        let user: AuthUser = self
            .identity
            .admin_create_user(email, password, username)
            .await
            .map_err(|err| ServiceError::BadRequest(err.to_string()))?;

        info!("Creating profile in external store for user: {}", user.id);
        if let Err(err) = self.db.execute(insert_profile(&user.id, username)).await {
            self.delete_auth_user(&user.id).await;
            return ServiceError::bad_request(format!(
                "Profile creation failed: {}",
                err.message()
            ));
        }

        info!("Creating player in external store for user: {}", user.id);
        if let Err(err) = self.db.execute(insert_player(&user.id, username)).await {
            self.delete_profile_row(&user.id).await;
            self.delete_auth_user(&user.id).await;
            return ServiceError::bad_request(format!(
                "Player creation failed: {}",
                err.message()
            ));
        }

        info!("User created successfully: {} ({})", email, user.id);
        Ok(CreatedUser {
            user_id: user.id,
            email: email.to_string(),
            username: username.to_string(),
        })
    }

    async fn delete_profile_row(&self, user_id: &str) {
        let mut filters = Filters::new();
        filters.insert("id".to_string(), json!(user_id));
        if let Err(err) = self
            .db
            .execute(TableOperation::Delete {
                table: "profiles".to_string(),
                filters,
            })
            .await
        {
            warn!("Rollback failed to delete profile {}: {}", user_id, err);
        }
    }

    async fn delete_auth_user(&self, user_id: &str) {
        if let Err(err) = self.identity.admin_delete_user(user_id).await {
            warn!("Rollback failed to delete auth user {}: {}", user_id, err);
        }
    }
}

fn insert_profile(user_id: &str, username: &str) -> TableOperation {
    let mut record = Row::new();
    record.insert("id".to_string(), json!(user_id));
    record.insert("username".to_string(), json!(username));
    TableOperation::Insert {
        table: "profiles".to_string(),
        records: vec![record],
    }
}

fn insert_player(user_id: &str, username: &str) -> TableOperation {
    let mut record = Row::new();
    record.insert("user_id".to_string(), json!(user_id));
    record.insert("name".to_string(), json!(username));
    record.insert("elo".to_string(), json!(DEFAULT_ELO));
    record.insert(
        "tier".to_string(),
        json!(crate::tier::Tier::from_elo(DEFAULT_ELO).as_str()),
    );
    record.insert("wins".to_string(), json!(0));
    record.insert("losses".to_string(), json!(0));
    TableOperation::Insert {
        table: "players".to_string(),
        records: vec![record],
    }
}

fn friendly_sign_in_error(err: IdentityError) -> String {
    let message = err.to_string();
    if message.to_lowercase().contains("invalid login credentials")
        || message.to_lowercase().contains("invalid credentials")
    {
        "Invalid email or password".to_string()
    } else {
        message
    }
}

fn friendly_sign_up_error(err: IdentityError) -> String {
    let message = err.to_string();
    if message.to_lowercase().contains("already registered")
        || message.to_lowercase().contains("already been registered")
    {
        "This email is already registered".to_string()
    } else {
        message
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::{identity::MockIdentityProvider, store::memory::MemoryExternalStore};

    fn setup() -> (
        Arc<MockIdentityProvider>,
        Arc<MemoryExternalStore>,
        AuthService,
    ) {
        let identity = Arc::new(MockIdentityProvider::new());
        let store = Arc::new(MemoryExternalStore::new());
        let service = AuthService::new(
            identity.clone(),
            Arc::new(ExternalDb::new(store.clone())),
        );
        (identity, store, service)
    }

    #[tokio::test]
    async fn test_sign_up_mirrors_profile_and_player() {
        let (_, store, service) = setup();
        let ctx = SessionContext::new();

        let outcome = service
            .sign_up(&ctx, "one@example.com", "secret1", "PlayerOne")
            .await
            .unwrap();

        assert_eq!(outcome.mirror, MirrorStatus::Completed);
        assert!(ctx.is_authenticated());

        let profiles = store.rows("profiles");
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].get("username"), Some(&json!("PlayerOne")));

        let players = store.rows("players");
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].get("elo"), Some(&json!(200)));
        assert_eq!(players[0].get("tier"), Some(&json!("Bronze")));
        assert_eq!(players[0].get("wins"), Some(&json!(0)));
    }

    #[tokio::test]
    async fn test_sign_up_succeeds_when_player_mirror_fails() {
        let (_, store, service) = setup();
        store.fail_inserts("players", "players table unavailable");
        let ctx = SessionContext::new();

        let outcome = service
            .sign_up(&ctx, "one@example.com", "secret1", "PlayerOne")
            .await
            .unwrap();

        assert_eq!(
            outcome.mirror,
            MirrorStatus::PlayerFailed {
                error: "players table unavailable".to_string()
            }
        );
        assert!(ctx.is_authenticated());
        // the orphaned profile row stays behind
        assert_eq!(store.rows("profiles").len(), 1);
        assert!(store.rows("players").is_empty());
    }

    #[tokio::test]
    async fn test_sign_up_provider_failure_writes_nothing() {
        let (identity, store, service) = setup();
        identity.fail_sign_up("User already registered");
        let ctx = SessionContext::new();

        let err = service
            .sign_up(&ctx, "one@example.com", "secret1", "PlayerOne")
            .await
            .unwrap_err();

        assert_eq!(err.message(), "This email is already registered");
        assert!(matches!(ctx.state(), SessionState::Failed(_)));
        assert!(store.rows("profiles").is_empty());
        assert!(store.rows("players").is_empty());
    }

    #[tokio::test]
    async fn test_sign_up_rejects_invalid_input_before_provider() {
        let (identity, _, service) = setup();
        let ctx = SessionContext::new();

        assert!(
            service
                .sign_up(&ctx, "one@example.com", "secret1", "x")
                .await
                .is_err()
        );
        assert!(
            service
                .sign_up(&ctx, "not-an-email", "secret1", "PlayerOne")
                .await
                .is_err()
        );
        assert!(
            service
                .sign_up(&ctx, "one@example.com", "short", "PlayerOne")
                .await
                .is_err()
        );
        assert_eq!(identity.user_count(), 0);
    }

    #[tokio::test]
    async fn test_sign_in_friendly_invalid_credentials() {
        let (identity, _, service) = setup();
        identity.fail_sign_in("Invalid login credentials");
        let ctx = SessionContext::new();

        let err = service
            .sign_in(&ctx, "one@example.com", "wrong1")
            .await
            .unwrap_err();
        assert_eq!(err.message(), "Invalid email or password");
        assert!(matches!(ctx.state(), SessionState::Failed(_)));
    }

    #[tokio::test]
    async fn test_sign_in_and_out_lifecycle() {
        let (_, _, service) = setup();
        let ctx = SessionContext::new();
        service
            .sign_up(&ctx, "one@example.com", "secret1", "PlayerOne")
            .await
            .unwrap();

        service
            .sign_in(&ctx, "one@example.com", "secret1")
            .await
            .unwrap();
        assert!(ctx.is_authenticated());

        service.sign_out(&ctx).await.unwrap();
        assert!(matches!(ctx.state(), SessionState::Anonymous));
    }

    #[tokio::test]
    async fn test_guest_sign_in_is_local_and_resumable() {
        let (identity, _, service) = setup();
        let ctx = SessionContext::new();

        let first = service.guest_sign_in(&ctx, "WanderingBlade").unwrap();
        let second = service
            .guest_sign_in(&SessionContext::new(), "WanderingBlade")
            .unwrap();

        let (Session::Guest { token: t1, .. }, Session::Guest { token: t2, .. }) =
            (first, second)
        else {
            panic!("expected guest sessions");
        };
        assert_eq!(t1, t2);
        assert_eq!(identity.user_count(), 0);

        assert!(service.guest_sign_in(&ctx, "x").is_err());
    }

    #[tokio::test]
    async fn test_admin_create_user_rolls_back_on_player_failure() {
        let (identity, store, service) = setup();
        store.fail_inserts("players", "players table unavailable");

        let err = service
            .admin_create_user("one@example.com", "secret1", "PlayerOne")
            .await
            .unwrap_err();

        assert_eq!(
            err.message(),
            "Player creation failed: players table unavailable"
        );
        // profile row was compensated away and the auth user deleted
        assert!(store.rows("profiles").is_empty());
        assert_eq!(identity.deleted_users(), vec!["user-1".to_string()]);
    }

    #[tokio::test]
    async fn test_admin_create_user_rolls_back_on_profile_failure() {
        let (identity, store, service) = setup();
        store.fail_inserts("profiles", "profiles table unavailable");

        let err = service
            .admin_create_user("one@example.com", "secret1", "PlayerOne")
            .await
            .unwrap_err();

        assert_eq!(
            err.message(),
            "Profile creation failed: profiles table unavailable"
        );
        assert!(store.rows("players").is_empty());
        assert_eq!(identity.deleted_users(), vec!["user-1".to_string()]);
    }

    #[tokio::test]
    async fn test_admin_create_user_success() {
        let (_, store, service) = setup();

        let created = service
            .admin_create_user("one@example.com", "secret1", "PlayerOne")
            .await
            .unwrap();

        assert_eq!(created.user_id, "user-1");
        assert_eq!(store.rows("profiles").len(), 1);
        assert_eq!(store.rows("players").len(), 1);
    }
}
