use crate::db::models::client_models::ApiClient;
use crate::db::models::user_models::{AuthToken, UserRole};
use crate::error::Error;
use crate::{config::SecurityConfig, db::models::user_models::User};
use anyhow::Result;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};

pub mod auth;
pub mod password;

/// Scope carried by back-office user tokens
pub const SCOPE_BACKOFFICE: &str = "backoffice";
/// Scope carried by third-party client tokens
pub const SCOPE_THIRDPARTY: &str = "thirdparty";

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    /// Subject (username or client ID)
    pub sub: String,
    /// User or client name
    pub name: String,
    /// User role, `client` for third-party tokens
    pub role: String,
    /// Route family the token is valid for
    pub scope: String,
    /// Plate lookups may match substrings
    #[serde(default)]
    pub fuzzy: bool,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

impl Claims {
    /// Claims attached to requests when token checking is switched off
    pub fn unchecked(scope: &str) -> Self {
        let now = Utc::now().timestamp() as usize;
        Self {
            sub: "anonymous".to_string(),
            name: "anonymous".to_string(),
            role: UserRole::Admin.as_str().to_string(),
            scope: scope.to_string(),
            fuzzy: false,
            exp: now,
            iat: now,
        }
    }
}

/// Security service for handling authentication and authorization
pub struct SecurityService {
    config: SecurityConfig,
}

impl SecurityService {
    /// Create a new security service
    pub fn new(config: SecurityConfig) -> Self {
        Self { config }
    }

    pub fn token_check(&self) -> bool {
        self.config.token_check
    }

    /// Generate a back-office token for a user
    pub fn generate_user_token(&self, user: &User) -> Result<AuthToken> {
        self.issue(
            user.username.clone(),
            user.display_name(),
            user.role.as_str().to_string(),
            SCOPE_BACKOFFICE,
            false,
        )
    }

    /// Generate a third-party token for an API client
    pub fn generate_client_token(&self, client: &ApiClient) -> Result<AuthToken> {
        self.issue(
            client.client_id.clone(),
            client.client_name.clone(),
            "client".to_string(),
            SCOPE_THIRDPARTY,
            client.fuzzy_search,
        )
    }

    fn issue(
        &self,
        sub: String,
        name: String,
        role: String,
        scope: &str,
        fuzzy: bool,
    ) -> Result<AuthToken> {
        let now = Utc::now();
        let expiration = now + Duration::minutes(self.config.jwt_expiration_minutes as i64);

        let claims = Claims {
            sub,
            name,
            role,
            scope: scope.to_string(),
            fuzzy,
            exp: expiration.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| Error::Authentication(format!("Failed to generate JWT token: {}", e)))?;

        Ok(AuthToken {
            access_token: token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.jwt_expiration_minutes * 60,
        })
    }

    /// Validate and decode a JWT token
    pub fn validate_token(&self, token: &str) -> Result<TokenData<Claims>> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| Error::Authentication(format!("Invalid token: {}", e)))?;

        Ok(token_data)
    }

    /// Validate a token and require the given scope
    pub fn authorize(&self, token: &str, scope: &str) -> Result<Claims> {
        let claims = self.validate_token(token)?.claims;
        if claims.scope != scope {
            return Err(Error::Authorization(format!(
                "Token scope '{}' is not valid here",
                claims.scope
            ))
            .into());
        }
        Ok(claims)
    }

    /// Check if the token holder has the specified role
    pub fn has_role(&self, claims: &Claims, required_role: UserRole) -> bool {
        let user_role = match UserRole::parse(&claims.role) {
            Some(role) => role,
            None => return false,
        };

        match required_role {
            UserRole::Admin => user_role == UserRole::Admin,
            UserRole::Operator => user_role == UserRole::Admin || user_role == UserRole::Operator,
            UserRole::Viewer => true,
        }
    }

    /// Fail with an authorization error unless the role is sufficient
    pub fn require_role(&self, claims: &Claims, required_role: UserRole) -> Result<()> {
        if self.has_role(claims, required_role) {
            Ok(())
        } else {
            Err(Error::Authorization(format!(
                "{} role required",
                required_role.as_str()
            ))
            .into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Lifecycle;

    fn service(secret: &str) -> SecurityService {
        SecurityService::new(SecurityConfig {
            jwt_secret: secret.to_string(),
            ..SecurityConfig::default()
        })
    }

    fn user(role: UserRole) -> User {
        User::new("operator1", "Olive", "Operator", String::new(), role)
    }

    #[test]
    fn user_token_round_trip() {
        let security = service("secret");
        let user = user(UserRole::Operator);
        let token = security.generate_user_token(&user).unwrap();
        assert_eq!(token.token_type, "Bearer");

        let claims = security
            .authorize(&token.access_token, SCOPE_BACKOFFICE)
            .unwrap();
        assert_eq!(claims.sub, user.username);
        assert_eq!(claims.name, "Olive Operator");
        assert_eq!(claims.role, "operator");
        assert!(!claims.fuzzy);
    }

    #[test]
    fn client_token_carries_fuzzy_flag_and_scope() {
        let security = service("secret");
        let client = ApiClient {
            client_id: "valet".to_string(),
            client_name: "Valet app".to_string(),
            secret_hash: String::new(),
            fuzzy_search: true,
            lifecycle: Lifecycle::Active,
            created_at: Utc::now(),
        };
        let token = security.generate_client_token(&client).unwrap();

        let claims = security
            .authorize(&token.access_token, SCOPE_THIRDPARTY)
            .unwrap();
        assert_eq!(claims.sub, "valet");
        assert!(claims.fuzzy);

        let err = security
            .authorize(&token.access_token, SCOPE_BACKOFFICE)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::Authorization(_))
        ));
    }

    #[test]
    fn token_from_another_secret_is_rejected() {
        let token = service("one")
            .generate_user_token(&user(UserRole::Admin))
            .unwrap();
        let err = service("two").validate_token(&token.access_token).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::Authentication(_))
        ));
    }

    #[test]
    fn role_hierarchy() {
        let security = service("secret");
        let mut claims = Claims::unchecked(SCOPE_BACKOFFICE);

        claims.role = "viewer".to_string();
        assert!(security.has_role(&claims, UserRole::Viewer));
        assert!(!security.has_role(&claims, UserRole::Operator));

        claims.role = "operator".to_string();
        assert!(security.has_role(&claims, UserRole::Operator));
        assert!(security.require_role(&claims, UserRole::Admin).is_err());

        claims.role = "client".to_string();
        assert!(!security.has_role(&claims, UserRole::Viewer));
    }
}
