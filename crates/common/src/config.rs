//! Application configuration.

use serde::Deserialize;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Redis configuration (OTP store). In-memory store when absent.
    #[serde(default)]
    pub redis: Option<RedisConfig>,
    /// Authentication configuration.
    pub auth: AuthConfig,
    /// AI summary configuration.
    #[serde(default)]
    pub ai: AiConfig,
    /// Push notification configuration.
    #[serde(default)]
    pub push: PushConfig,
    /// Email delivery configuration.
    #[serde(default)]
    pub email: EmailConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Log output format: `pretty` or `json`.
    #[serde(default = "default_log_format")]
    pub log_format: String,
    /// Upper bound on request handling time, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Origins allowed by CORS. Any origin when empty.
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Insert sample policies when the policies table is empty.
    #[serde(default)]
    pub seed: bool,
}

/// Redis configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL.
    pub url: String,
    /// Key prefix for all Redis keys.
    #[serde(default = "default_redis_prefix")]
    pub prefix: String,
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for access tokens.
    pub jwt_secret: String,
    /// Access token lifetime in minutes.
    #[serde(default = "default_token_ttl_minutes")]
    pub token_ttl_minutes: i64,
    /// One-time password lifetime in seconds.
    #[serde(default = "default_otp_ttl_secs")]
    pub otp_ttl_secs: u64,
    /// Google OAuth client ID used as the expected ID token audience.
    #[serde(default)]
    pub google_client_id: Option<String>,
    /// Trust the client-supplied email when no Google client ID is configured.
    #[serde(default)]
    pub allow_unverified_google: bool,
    /// Echo generated OTP codes in the API response (development only).
    #[serde(default)]
    pub expose_otp: bool,
}

/// AI text generation configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    /// Gemini API key. AI is disabled when absent.
    #[serde(default)]
    pub gemini_api_key: Option<String>,
    /// Model name.
    #[serde(default = "default_ai_model")]
    pub model: String,
    /// API base URL.
    #[serde(default = "default_ai_base_url")]
    pub base_url: String,
    /// Per-call timeout in seconds.
    #[serde(default = "default_ai_timeout_secs")]
    pub timeout_secs: u64,
}

/// Push notification configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PushConfig {
    /// FCM server key. Push is disabled when absent.
    #[serde(default)]
    pub fcm_server_key: Option<String>,
    /// FCM send endpoint.
    #[serde(default = "default_fcm_endpoint")]
    pub endpoint: String,
    /// Per-delivery timeout in seconds.
    #[serde(default = "default_push_timeout_secs")]
    pub timeout_secs: u64,
}

/// Email configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// Resend API key. Codes are only logged when absent.
    #[serde(default)]
    pub resend_api_key: Option<String>,
    /// Sender address.
    #[serde(default = "default_email_from")]
    pub from_address: String,
    /// Per-message timeout in seconds.
    #[serde(default = "default_email_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            model: default_ai_model(),
            base_url: default_ai_base_url(),
            timeout_secs: default_ai_timeout_secs(),
        }
    }
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            fcm_server_key: None,
            endpoint: default_fcm_endpoint(),
            timeout_secs: default_push_timeout_secs(),
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            resend_api_key: None,
            from_address: default_email_from(),
            timeout_secs: default_email_timeout_secs(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    8000
}

fn default_log_format() -> String {
    "pretty".to_string()
}

const fn default_request_timeout_secs() -> u64 {
    30
}

const fn default_max_connections() -> u32 {
    20
}

const fn default_min_connections() -> u32 {
    2
}

fn default_redis_prefix() -> String {
    "policyai".to_string()
}

const fn default_token_ttl_minutes() -> i64 {
    // 7 days
    10_080
}

const fn default_otp_ttl_secs() -> u64 {
    300
}

fn default_ai_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_ai_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

const fn default_ai_timeout_secs() -> u64 {
    15
}

fn default_fcm_endpoint() -> String {
    "https://fcm.googleapis.com/fcm/send".to_string()
}

const fn default_push_timeout_secs() -> u64 {
    10
}

fn default_email_from() -> String {
    "PolicyAI <onboarding@resend.dev>".to_string()
}

const fn default_email_timeout_secs() -> u64 {
    10
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present) into the process environment
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `POLICYAI_ENV`)
    /// 4. Environment variables with `POLICYAI__` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let _ = dotenvy::dotenv();
        let env = std::env::var("POLICYAI_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("POLICYAI")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("POLICYAI")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
