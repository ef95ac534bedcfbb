use std::sync::Arc;

use serde_json::json;

use bookstore_resources::api::{Filter, Where};
use bookstore_resources::resource_store::{ResourceStore, StoreError};

use crate::api::{LoginRequest, Permission, Role, SignupRequest, TokenResponse, UserView};
use crate::password::{hash_password, verify_password};
use crate::token::{TokenError, TokenIssuer};
use crate::user_record::UserRecord;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Username {0} already exists")]
    UsernameTaken(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User {0} not found")]
    UserNotFound(String),

    #[error("Invalid input: {0}")]
    Invalid(String),

    #[error("{0}")]
    SignupNotAllowed(String),

    #[error("Failed to hash password: {0}")]
    Hashing(String),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Account operations, served in-process by [`AuthService`] or remotely through the users client
#[async_trait::async_trait]
pub trait Accounts: Send + Sync {
    /// Registers a new user and returns a session token for it
    async fn signup(&self, request: SignupRequest) -> Result<TokenResponse, AuthError>;
    /// Checks credentials and returns a session token
    async fn login(&self, request: LoginRequest) -> Result<TokenResponse, AuthError>;
    async fn list_users(&self) -> Result<Vec<UserView>, AuthError>;
    /// Removes the user and returns what was removed
    async fn delete_user(&self, id: &str) -> Result<UserView, AuthError>;
}

pub struct AuthService {
    users: Arc<dyn ResourceStore<UserRecord>>,
    issuer: TokenIssuer,
    allow_privileged_signup: bool,
}

impl AuthService {
    pub fn new(users: Arc<dyn ResourceStore<UserRecord>>, issuer: TokenIssuer) -> Self {
        Self {
            users,
            issuer,
            allow_privileged_signup: true,
        }
    }

    /// When disabled, signups can not ask for the admin role
    /// nor for permissions beyond the ones of a plain user
    pub fn with_privileged_signup(mut self, allowed: bool) -> Self {
        self.allow_privileged_signup = allowed;
        self
    }

    fn check_signup_privileges(
        &self,
        role: Role,
        permissions: &[Permission],
    ) -> Result<(), AuthError> {
        if self.allow_privileged_signup {
            return Ok(());
        }
        if role == Role::Admin {
            return Err(AuthError::SignupNotAllowed(
                "Signup can not grant the admin role".to_string(),
            ));
        }
        let allowed = Role::User.default_permissions();
        if let Some(extra) = permissions.iter().find(|p| !allowed.contains(p)) {
            return Err(AuthError::SignupNotAllowed(format!(
                "Signup can not grant the {:?} permission",
                extra
            )));
        }
        Ok(())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, AuthError> {
        let mut where_clause = Where::new();
        where_clause.insert("username".to_string(), json!(username));
        let filter = Filter {
            limit: Some(1),
            ..Filter::with_where(where_clause)
        };
        Ok(self.users.find(&filter).await?.into_iter().next())
    }

    fn token_for(&self, user: &UserRecord) -> Result<TokenResponse, AuthError> {
        Ok(TokenResponse {
            token: self.issuer.issue(user)?,
        })
    }
}

fn require(field: &str, value: &str) -> Result<(), AuthError> {
    if value.trim().is_empty() {
        Err(AuthError::Invalid(format!("{} must not be empty", field)))
    } else {
        Ok(())
    }
}

#[async_trait::async_trait]
impl Accounts for AuthService {
    async fn signup(&self, request: SignupRequest) -> Result<TokenResponse, AuthError> {
        require("username", &request.username)?;
        require("email", &request.email)?;
        require("password", &request.password)?;

        if self.find_by_username(&request.username).await?.is_some() {
            return Err(AuthError::UsernameTaken(request.username));
        }

        let username = request.username.clone();
        let permissions = request
            .permissions
            .unwrap_or_else(|| request.role.default_permissions());
        self.check_signup_privileges(request.role, &permissions)?;
        let user = UserRecord {
            id: uuid::Uuid::new_v4().to_string(),
            password_hash: hash_password(&request.password)?,
            username: request.username,
            email: request.email,
            role: request.role,
            permissions,
        };

        let user = match self.users.create(user).await {
            Ok(user) => user,
            // Lost a race with a concurrent signup for the same username
            Err(StoreError::Conflict(_)) => return Err(AuthError::UsernameTaken(username)),
            Err(err) => return Err(err.into()),
        };
        tracing::info!(user_id = %user.id, username = %user.username, "User signed up");
        self.token_for(&user)
    }

    async fn login(&self, request: LoginRequest) -> Result<TokenResponse, AuthError> {
        let Some(user) = self.find_by_username(&request.username).await? else {
            tracing::warn!(username = %request.username, "Login for unknown user");
            return Err(AuthError::InvalidCredentials);
        };
        if !verify_password(&request.password, &user.password_hash)? {
            tracing::warn!(username = %request.username, "Login with wrong password");
            return Err(AuthError::InvalidCredentials);
        }
        self.token_for(&user)
    }

    async fn list_users(&self) -> Result<Vec<UserView>, AuthError> {
        Ok(self
            .users
            .find(&Filter::default())
            .await?
            .into_iter()
            .map(UserView::from)
            .collect())
    }

    async fn delete_user(&self, id: &str) -> Result<UserView, AuthError> {
        let user = match self.users.find_by_id(id).await {
            Ok(user) => user,
            Err(StoreError::NotFound { .. }) => return Err(AuthError::UserNotFound(id.to_string())),
            Err(err) => return Err(err.into()),
        };
        match self.users.delete_by_id(id).await {
            Ok(()) => Ok(user.into()),
            Err(StoreError::NotFound { .. }) => Err(AuthError::UserNotFound(id.to_string())),
            Err(err) => Err(err.into()),
        }
    }
}
