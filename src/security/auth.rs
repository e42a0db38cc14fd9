use crate::config::SecurityConfig;
use crate::db::models::client_models::{
    ApiClient, ClientCredentials, CreateClientRequest, CreatedClient,
};
use crate::db::models::user_models::{
    AuthToken, CreateUserRequest, LoginCredentials, UpdateUserRequest, User,
};
use crate::db::models::Lifecycle;
use crate::db::repositories::clients::ClientsRepository;
use crate::db::repositories::users::UsersRepository;
use crate::error::Error;
use crate::security::{password, SecurityService};
use anyhow::Result;
use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

const CLIENT_SECRET_LENGTH: usize = 32;

/// Authentication service for back-office users and third-party clients
pub struct AuthService {
    users_repo: UsersRepository,
    clients_repo: ClientsRepository,
    security: Arc<SecurityService>,
    config: SecurityConfig,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(pool: Arc<PgPool>, security: Arc<SecurityService>, config: &SecurityConfig) -> Self {
        Self {
            users_repo: UsersRepository::new(pool.clone()),
            clients_repo: ClientsRepository::new(pool),
            security,
            config: config.clone(),
        }
    }

    /// Login a user with username/password
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<(User, AuthToken)> {
        let user = self
            .users_repo
            .get(credentials.username.trim())
            .await?
            .filter(|user| user.lifecycle.is_live())
            .ok_or_else(|| Error::Authentication("Invalid username or password".to_string()))?;

        if !user.can_login() {
            return Err(Error::Authentication("User account is disabled".to_string()).into());
        }

        let valid = password::verify_password(&credentials.password, &user.password_hash)?;

        if !valid {
            return Err(Error::Authentication("Invalid username or password".to_string()).into());
        }

        let token = self.security.generate_user_token(&user)?;

        info!("User logged in: {}", user.username);

        Ok((user, token))
    }

    /// Register a new user. A deleted user's name stays taken.
    pub async fn register(&self, request: &CreateUserRequest) -> Result<User> {
        let username = request.username.trim();
        if username.is_empty() || request.password.is_empty() {
            return Err(
                Error::Validation("Username and password must not be empty".to_string()).into(),
            );
        }

        if self.users_repo.get(username).await?.is_some() {
            return Err(Error::AlreadyExists(format!("User {} already exists", username)).into());
        }

        let password_hash = password::hash_password(&request.password, &self.config)?;
        let user = User::new(
            username,
            &request.first_name,
            &request.last_name,
            password_hash,
            request.role,
        );

        let created_user = self.users_repo.create(&user).await?;

        info!(
            "New user registered: {} ({})",
            created_user.username,
            created_user.role.as_str()
        );

        Ok(created_user)
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.users_repo.get_live().await
    }

    /// A user that is not deleted
    pub async fn user(&self, username: &str) -> Result<User> {
        let user = self
            .users_repo
            .get(username)
            .await?
            .filter(|user| user.lifecycle.is_live())
            .ok_or_else(|| Error::NotFound(format!("User {} not found", username)))?;
        Ok(user)
    }

    /// Reset user password (admin function)
    pub async fn reset_password(&self, username: &str) -> Result<String> {
        let mut user = self.user(username).await?;

        let new_password = password::generate_random_password(12);
        user.password_hash = password::hash_password(&new_password, &self.config)?;

        self.users_repo
            .update(&user)
            .await?
            .ok_or_else(|| Error::NotFound(format!("User {} not found", username)))?;

        info!("Password reset for user: {}", user.username);

        Ok(new_password)
    }

    /// Change names and role (admin function)
    pub async fn update_user(&self, username: &str, update: UpdateUserRequest) -> Result<User> {
        let mut user = self.user(username).await?;
        user.apply(update);

        let result = self
            .users_repo
            .update(&user)
            .await?
            .ok_or_else(|| Error::NotFound(format!("User {} not found", username)))?;

        info!(
            "User {} updated, role {}",
            result.username,
            result.role.as_str()
        );

        Ok(result)
    }

    /// Enable, disable or delete a user (admin function). Deleted is final.
    pub async fn set_lifecycle(&self, username: &str, lifecycle: Lifecycle) -> Result<User> {
        let user = self
            .users_repo
            .set_lifecycle(username, lifecycle)
            .await?
            .ok_or_else(|| Error::NotFound(format!("User {} not found", username)))?;

        info!("User {} is now {:?}", user.username, user.lifecycle);

        Ok(user)
    }

    /// Register a third-party client. The plain secret is only returned here.
    pub async fn create_client(&self, request: &CreateClientRequest) -> Result<CreatedClient> {
        let client_id = request.client_id.trim();
        if client_id.is_empty() {
            return Err(Error::Validation("client_id must not be empty".to_string()).into());
        }

        if self.clients_repo.get_by_id(client_id).await?.is_some() {
            return Err(
                Error::AlreadyExists(format!("Client already exists: {}", client_id)).into(),
            );
        }

        let client_secret = password::generate_client_secret(CLIENT_SECRET_LENGTH);
        let client = ApiClient {
            client_id: client_id.to_string(),
            client_name: request.client_name.clone(),
            secret_hash: password::hash_password(&client_secret, &self.config)?,
            fuzzy_search: request.fuzzy_search,
            lifecycle: Lifecycle::Active,
            created_at: Utc::now(),
        };

        let client = self.clients_repo.create(&client).await?;

        Ok(CreatedClient {
            client,
            client_secret,
        })
    }

    pub async fn list_clients(&self) -> Result<Vec<ApiClient>> {
        self.clients_repo.get_all().await
    }

    pub async fn delete_client(&self, client_id: &str) -> Result<()> {
        if !self
            .clients_repo
            .set_lifecycle(client_id, Lifecycle::Deleted)
            .await?
        {
            return Err(Error::NotFound(format!("Client not found: {}", client_id)).into());
        }
        info!("API client {} deleted", client_id);
        Ok(())
    }

    /// Exchange client credentials for a third-party token
    pub async fn client_token(&self, credentials: &ClientCredentials) -> Result<AuthToken> {
        let client = self
            .clients_repo
            .get_by_id(&credentials.client_id)
            .await?
            .filter(|client| client.lifecycle == Lifecycle::Active)
            .ok_or_else(|| Error::Authentication("Invalid client credentials".to_string()))?;

        if !password::verify_password(&credentials.client_secret, &client.secret_hash)? {
            return Err(Error::Authentication("Invalid client credentials".to_string()).into());
        }

        info!("Issued third-party token to {}", client.client_id);

        self.security.generate_client_token(&client)
    }
}
