use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// New free-capacity value for one sign
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignUpdate {
    pub sign_id: i32,
    pub zone_id: i32,
    /// `ip:port` of the sign, the key the hardware listens on
    pub sign_address: String,
    pub free_capacity: i32,
    pub timestamp: DateTime<Utc>,
}

impl SignUpdate {
    pub fn new(sign_id: i32, zone_id: i32, sign_address: String, free_capacity: i32) -> Self {
        Self {
            sign_id,
            zone_id,
            sign_address,
            free_capacity,
            timestamp: Utc::now(),
        }
    }

    /// Wire format consumed by the signs: `{"<ip:port>": <free_capacity>}`
    pub fn payload(&self) -> Result<String> {
        let mut body = BTreeMap::new();
        body.insert(self.sign_address.as_str(), self.free_capacity);
        Ok(serde_json::to_string(&body)?)
    }
}
