//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Auth configuration.
    pub auth: AuthConfig,
    /// Payment provider configuration.
    pub paystack: PaystackConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

/// Auth configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Secret key for validating access tokens.
    pub jwt_secret: String,
    /// Access token expiration in seconds.
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry_secs: u64,
}

fn default_access_token_expiry() -> u64 {
    900 // 15 minutes
}

/// Payment provider (Paystack) configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PaystackConfig {
    /// Secret key: bearer token for API calls and webhook HMAC key.
    pub secret_key: String,
    /// API base URL.
    #[serde(default = "default_paystack_base_url")]
    pub base_url: String,
    /// URL the provider redirects to after checkout.
    pub callback_url: String,
    /// Outbound call timeout in seconds.
    #[serde(default = "default_paystack_timeout")]
    pub timeout_secs: u64,
}

fn default_paystack_base_url() -> String {
    "https://api.paystack.co".to_string()
}

fn default_paystack_timeout() -> u64 {
    10
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("KOBO").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
