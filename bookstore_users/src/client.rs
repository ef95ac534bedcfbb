use anyhow::Context;
use reqwest::{StatusCode, Url};
use reqwest_middleware::ClientWithMiddleware;

use bookstore_resources::client::{
    build_http_client, decode_error, error_from_response, join_segments, parse_base_url,
    transport_error, ClientSettings,
};
use bookstore_resources::resource_store::{Resource, StoreError};

use crate::api::{LoginRequest, SignupRequest, TokenResponse, UserView};
use crate::auth_service::{Accounts, AuthError};
use crate::user_record::UserRecord;

/// HTTP client of the users service
pub struct UsersClient {
    base: Url,
    client: ClientWithMiddleware,
}

impl UsersClient {
    pub fn new(url: &str) -> anyhow::Result<Self> {
        Self::with_settings(url, &ClientSettings::default())
    }

    pub fn with_settings(url: &str, settings: &ClientSettings) -> anyhow::Result<Self> {
        Ok(Self {
            base: parse_base_url(url)?,
            client: build_http_client(settings).context("Failed to build users client")?,
        })
    }

    fn user_url(&self, id: &str) -> Url {
        join_segments(&self.base, &["user", id])
    }

    async fn auth_error(response: reqwest::Response, subject: &str) -> AuthError {
        let status = response.status();
        match error_from_response(response, UserRecord::NAME, Some(subject)).await {
            StoreError::Conflict(_) => AuthError::UsernameTaken(subject.to_string()),
            StoreError::NotFound { id, .. } => AuthError::UserNotFound(id),
            StoreError::Invalid(message) => AuthError::Invalid(message),
            StoreError::Upstream { status: 403, message } => AuthError::SignupNotAllowed(message),
            _ if status == StatusCode::UNAUTHORIZED => AuthError::InvalidCredentials,
            other => AuthError::Store(other),
        }
    }
}

#[async_trait::async_trait]
impl Accounts for UsersClient {
    /// Calls POST /signup
    async fn signup(&self, request: SignupRequest) -> Result<TokenResponse, AuthError> {
        let response = self
            .client
            .post(join_segments(&self.base, &["signup"]))
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(Self::auth_error(response, &request.username).await);
        }
        Ok(response.json().await.map_err(decode_error)?)
    }

    /// Calls POST /login
    async fn login(&self, request: LoginRequest) -> Result<TokenResponse, AuthError> {
        let response = self
            .client
            .post(join_segments(&self.base, &["login"]))
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(Self::auth_error(response, &request.username).await);
        }
        Ok(response.json().await.map_err(decode_error)?)
    }

    /// Calls GET /users
    async fn list_users(&self) -> Result<Vec<UserView>, AuthError> {
        let response = self
            .client
            .get(join_segments(&self.base, &["users"]))
            .send()
            .await
            .map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(Self::auth_error(response, "").await);
        }
        Ok(response.json().await.map_err(decode_error)?)
    }

    /// Calls DELETE /user/{id}
    async fn delete_user(&self, id: &str) -> Result<UserView, AuthError> {
        let response = self
            .client
            .delete(self.user_url(id))
            .send()
            .await
            .map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(Self::auth_error(response, id).await);
        }
        Ok(response.json().await.map_err(decode_error)?)
    }
}
