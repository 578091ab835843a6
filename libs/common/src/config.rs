//! Client configuration
//!
//! Settings are read with the `config` crate from `ATTENDANCE_*` environment
//! variables layered over built-in defaults.

use std::path::PathBuf;

use config::{Config, Environment};
use serde::Deserialize;
use tracing::info;

use crate::error::{ClientError, ClientResult};

const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_CREDENTIAL_PATH: &str = ".attendance-auth.json";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Configuration for talking to the attendance service
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ClientConfig {
    /// Base URL of the remote service, without a trailing slash
    pub api_url: String,
    /// File the persisted credential is written to
    pub credential_path: PathBuf,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl ClientConfig {
    /// Create a new ClientConfig from environment variables
    ///
    /// # Environment Variables
    /// - `ATTENDANCE_API_URL`: Service base URL (default: "http://localhost:8000")
    /// - `ATTENDANCE_CREDENTIAL_PATH`: Credential file (default: ".attendance-auth.json")
    /// - `ATTENDANCE_REQUEST_TIMEOUT_SECS`: Request timeout (default: 30)
    pub fn from_env() -> ClientResult<Self> {
        let settings = Config::builder()
            .set_default("api_url", DEFAULT_API_URL)?
            .set_default("credential_path", DEFAULT_CREDENTIAL_PATH)?
            .set_default("request_timeout_secs", DEFAULT_REQUEST_TIMEOUT_SECS)?
            .add_source(Environment::with_prefix("ATTENDANCE").try_parsing(true))
            .build()?;

        let config: ClientConfig = settings.try_deserialize()?;
        let config = config.normalized()?;
        info!("Client configured for {}", config.api_url);
        Ok(config)
    }

    fn normalized(mut self) -> ClientResult<Self> {
        self.api_url = self.api_url.trim().trim_end_matches('/').to_string();

        if self.api_url.is_empty() {
            return Err(ClientError::Configuration(
                "ATTENDANCE_API_URL must not be empty".to_string(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(ClientError::Configuration(
                "ATTENDANCE_REQUEST_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        unsafe {
            std::env::remove_var("ATTENDANCE_API_URL");
            std::env::remove_var("ATTENDANCE_CREDENTIAL_PATH");
            std::env::remove_var("ATTENDANCE_REQUEST_TIMEOUT_SECS");
        }
    }

    #[test]
    #[serial]
    fn test_client_config_defaults() {
        clear_env();

        let config = ClientConfig::from_env().unwrap();
        assert_eq!(config.api_url, "http://localhost:8000");
        assert_eq!(config.credential_path, PathBuf::from(".attendance-auth.json"));
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    #[serial]
    fn test_client_config_from_env_with_custom_values() {
        unsafe {
            std::env::set_var("ATTENDANCE_API_URL", "https://attendance.example.com/");
            std::env::set_var("ATTENDANCE_CREDENTIAL_PATH", "/tmp/auth.json");
            std::env::set_var("ATTENDANCE_REQUEST_TIMEOUT_SECS", "5");
        }

        let config = ClientConfig::from_env().unwrap();
        assert_eq!(config.api_url, "https://attendance.example.com");
        assert_eq!(config.credential_path, PathBuf::from("/tmp/auth.json"));
        assert_eq!(config.request_timeout_secs, 5);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_client_config_rejects_zero_timeout() {
        unsafe {
            std::env::set_var("ATTENDANCE_REQUEST_TIMEOUT_SECS", "0");
        }

        let result = ClientConfig::from_env();
        assert!(matches!(result, Err(ClientError::Configuration(_))));

        clear_env();
    }
}
