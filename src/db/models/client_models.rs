use super::Lifecycle;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Third-party integrator allowed to query the find-my-car endpoints
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ApiClient {
    pub client_id: String,
    pub client_name: String,
    #[serde(skip_serializing)]
    pub secret_hash: String,
    /// Plate lookups match substrings instead of the exact plate
    pub fuzzy_search: bool,
    pub lifecycle: Lifecycle,
    pub created_at: DateTime<Utc>,
}

/// Create client request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateClientRequest {
    pub client_id: String,
    pub client_name: String,
    #[serde(default)]
    pub fuzzy_search: bool,
}

/// Returned once, on creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedClient {
    pub client: ApiClient,
    pub client_secret: String,
}

/// Client credentials exchanged for a token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}
