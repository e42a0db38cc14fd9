use crate::db::models::Lifecycle;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Back-office operator account, keyed by username
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    pub lifecycle: Lifecycle,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        username: &str,
        first_name: &str,
        last_name: &str,
        password_hash: String,
        role: UserRole,
    ) -> Self {
        let now = Utc::now();
        Self {
            username: username.trim().to_string(),
            first_name: first_name.trim().to_string(),
            last_name: last_name.trim().to_string(),
            password_hash,
            role,
            lifecycle: Lifecycle::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, update: UpdateUserRequest) {
        if let Some(first_name) = update.first_name {
            self.first_name = first_name.trim().to_string();
        }
        if let Some(last_name) = update.last_name {
            self.last_name = last_name.trim().to_string();
        }
        if let Some(role) = update.role {
            self.role = role;
        }
    }

    pub fn can_login(&self) -> bool {
        self.lifecycle == Lifecycle::Active
    }

    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        match full.trim() {
            "" => self.username.clone(),
            name => name.to_string(),
        }
    }
}

/// User role enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Operator,
    Viewer,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Operator => "operator",
            UserRole::Viewer => "viewer",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(UserRole::Admin),
            "operator" => Some(UserRole::Operator),
            "viewer" => Some(UserRole::Viewer),
            _ => None,
        }
    }
}

/// Authentication tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// Login credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginCredentials {
    pub username: String,
    pub password: String,
}

/// Login response
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub user: User,
    pub token: AuthToken,
}

/// Create user request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub role: UserRole,
}

/// Profile fields an administrator may change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<UserRole>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_active_users_log_in() {
        let mut user = User::new(" jdoe ", "Jane", "Doe", String::new(), UserRole::Viewer);
        assert_eq!(user.username, "jdoe");
        assert!(user.can_login());

        user.lifecycle = Lifecycle::Disabled;
        assert!(!user.can_login());
        user.lifecycle = Lifecycle::Deleted;
        assert!(!user.can_login());
    }

    #[test]
    fn update_keeps_unset_fields() {
        let mut user = User::new("jdoe", "Jane", "Doe", String::new(), UserRole::Viewer);
        user.apply(UpdateUserRequest {
            first_name: None,
            last_name: Some(" Smith ".to_string()),
            role: Some(UserRole::Operator),
        });

        assert_eq!(user.display_name(), "Jane Smith");
        assert_eq!(user.role, UserRole::Operator);
    }

    #[test]
    fn display_name_falls_back_to_username() {
        let user = User::new("ops", "", " ", String::new(), UserRole::Admin);
        assert_eq!(user.display_name(), "ops");
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let user = User::new("ops", "", "", "$2b$secret".to_string(), UserRole::Admin);
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["lifecycle"], "active");
    }
}
