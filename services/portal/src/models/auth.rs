//! Authentication payloads

use common::Role;
use serde::{Deserialize, Serialize};

/// Response for user login
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub role: Role,
    #[serde(default)]
    pub must_change_password: bool,
    pub full_name: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Request for a password change
#[derive(Debug, Clone, Serialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Plain acknowledgement carrying a message
#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}
