use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    pub user: AuthUser,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{0}")]
    Provider(String),
}

/// The hosted identity provider: session-based sign-up/sign-in/sign-out plus
/// the admin user-management surface. Password hashing, session tokens and
/// OAuth happen on the provider's side.
#[async_trait::async_trait]
pub trait IdentityProvider {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> Result<AuthSession, IdentityError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, IdentityError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), IdentityError>;

    async fn admin_create_user(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> Result<AuthUser, IdentityError>;

    async fn admin_delete_user(&self, user_id: &str) -> Result<(), IdentityError>;

    /// Redirect URL for a hosted OAuth flow (social login passthrough).
    fn oauth_url(&self, provider: &str) -> String;
}

/// GoTrue-dialect REST client for the identity provider.
pub struct RestIdentityProvider {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
}

impl RestIdentityProvider {
    pub fn new() -> Self {
        let base_url = std::env::var("ARENA_AUTH_URL").expect("ARENA_AUTH_URL env var not set");
        let service_key =
            std::env::var("ARENA_AUTH_SERVICE_KEY").expect("ARENA_AUTH_SERVICE_KEY env var not set");
        Self::with_config(base_url, service_key)
    }

    pub fn with_config(base_url: String, service_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.base_url, path)
    }

    async fn provider_error(response: reqwest::Response) -> IdentityError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|e| e.msg.or(e.message).or(e.error_description))
            .unwrap_or(body);
        if message.is_empty() {
            IdentityError::Provider(format!("identity provider returned {}", status))
        } else {
            IdentityError::Provider(message)
        }
    }

    async fn session_from(response: reqwest::Response) -> Result<AuthSession, IdentityError> {
        if !response.status().is_success() {
            return Err(Self::provider_error(response).await);
        }
        Ok(response.json().await?)
    }
}

#[async_trait::async_trait]
impl IdentityProvider for RestIdentityProvider {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> Result<AuthSession, IdentityError> {
        let response = self
            .client
            .post(self.url("/signup"))
            .header("apikey", &self.service_key)
            .json(&json!({
                "email": email,
                "password": password,
                "data": { "username": username },
            }))
            .send()
            .await?;
        Self::session_from(response).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, IdentityError> {
        let response = self
            .client
            .post(self.url("/token"))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.service_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        Self::session_from(response).await
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), IdentityError> {
        let response = self
            .client
            .post(self.url("/logout"))
            .header("apikey", &self.service_key)
            .bearer_auth(access_token)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::provider_error(response).await);
        }
        Ok(())
    }

    async fn admin_create_user(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> Result<AuthUser, IdentityError> {
        let response = self
            .client
            .post(self.url("/admin/users"))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .json(&json!({
                "email": email,
                "password": password,
                "email_confirm": true,
                "user_metadata": { "username": username },
            }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::provider_error(response).await);
        }
        Ok(response.json().await?)
    }

    async fn admin_delete_user(&self, user_id: &str) -> Result<(), IdentityError> {
        let response = self
            .client
            .delete(self.url(&format!("/admin/users/{}", user_id)))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::provider_error(response).await);
        }
        Ok(())
    }

    fn oauth_url(&self, provider: &str) -> String {
        format!("{}?provider={}", self.url("/authorize"), provider)
    }
}

/// Deterministic in-process provider for tests: accounts are numbered in
/// creation order, and sign-up/sign-in can be made to fail with a configured
/// provider message.
#[derive(Default)]
pub struct MockIdentityProvider {
    users: Mutex<Vec<AuthUser>>,
    deleted: Mutex<Vec<String>>,
    sign_up_failure: Mutex<Option<String>>,
    sign_in_failure: Mutex<Option<String>>,
}

impl MockIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_sign_up(&self, message: &str) {
        *self.sign_up_failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn fail_sign_in(&self, message: &str) {
        *self.sign_in_failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn deleted_users(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn user_count(&self) -> usize {
        self.users.lock().unwrap().len()
    }

    fn create_user(&self, email: &str) -> AuthUser {
        let mut users = self.users.lock().unwrap();
        let user = AuthUser {
            id: format!("user-{}", users.len() + 1),
            email: Some(email.to_string()),
        };
        users.push(user.clone());
        user
    }

    fn session_for(user: AuthUser) -> AuthSession {
        AuthSession {
            access_token: format!("token-{}", user.id),
            refresh_token: None,
            expires_in: Some(3600),
            user,
        }
    }
}

#[async_trait::async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn sign_up(
        &self,
        email: &str,
        _password: &str,
        _username: &str,
    ) -> Result<AuthSession, IdentityError> {
        if let Some(message) = self.sign_up_failure.lock().unwrap().clone() {
            return Err(IdentityError::Provider(message));
        }
        Ok(Self::session_for(self.create_user(email)))
    }

    async fn sign_in(&self, email: &str, _password: &str) -> Result<AuthSession, IdentityError> {
        if let Some(message) = self.sign_in_failure.lock().unwrap().clone() {
            return Err(IdentityError::Provider(message));
        }
        let user = self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email.as_deref() == Some(email))
            .cloned();
        match user {
            Some(user) => Ok(Self::session_for(user)),
            None => Err(IdentityError::Provider(
                "Invalid login credentials".to_string(),
            )),
        }
    }

    async fn sign_out(&self, _access_token: &str) -> Result<(), IdentityError> {
        Ok(())
    }

    async fn admin_create_user(
        &self,
        email: &str,
        _password: &str,
        _username: &str,
    ) -> Result<AuthUser, IdentityError> {
        if let Some(message) = self.sign_up_failure.lock().unwrap().clone() {
            return Err(IdentityError::Provider(message));
        }
        Ok(self.create_user(email))
    }

    async fn admin_delete_user(&self, user_id: &str) -> Result<(), IdentityError> {
        self.deleted.lock().unwrap().push(user_id.to_string());
        self.users.lock().unwrap().retain(|u| u.id != user_id);
        Ok(())
    }

    fn oauth_url(&self, provider: &str) -> String {
        format!("https://auth.test/authorize?provider={}", provider)
    }
}
