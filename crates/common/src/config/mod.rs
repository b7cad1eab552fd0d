//! Configuration management for LeadForge services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/{APP_ENV}.toml, config/local.toml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Enrichment oracle configuration
    #[serde(default)]
    pub oracle: OracleConfig,

    /// Batch orchestration configuration
    #[serde(default)]
    pub batch: BatchConfig,

    /// Quota / session store configuration
    #[serde(default)]
    pub quota: QuotaConfig,

    /// Authentication configuration
    #[serde(default)]
    pub auth: AuthConfig,

    /// Fallback content templates
    #[serde(default)]
    pub fallback: FallbackConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Largest accepted upload, in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OracleConfig {
    /// Oracle provider: openai, mock
    #[serde(default = "default_oracle_provider")]
    pub provider: String,

    /// API key for the oracle
    pub api_key: Option<String>,

    /// API base URL (for OpenAI-compatible endpoints)
    pub api_base: Option<String>,

    /// Model to use
    #[serde(default = "default_oracle_model")]
    pub model: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_oracle_timeout")]
    pub timeout_secs: u64,

    /// Sampling temperature for the research exchange
    #[serde(default = "default_research_temperature")]
    pub research_temperature: f32,

    /// Sampling temperature for the email exchange
    #[serde(default = "default_email_temperature")]
    pub email_temperature: f32,

    /// Maximum output tokens per exchange
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Optional industry the prompts specialise in (e.g. "hemp")
    pub industry_focus: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BatchConfig {
    /// Records dispatched concurrently per chunk
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Upper bound on a single oracle call, in seconds
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,

    /// Retries for retryable oracle failures (0 = single attempt)
    #[serde(default)]
    pub max_retries: u32,

    /// Base delay for exponential retry backoff, in milliseconds
    #[serde(default = "default_retry_base_delay")]
    pub retry_base_delay_ms: u64,

    /// Company used by the "use sample data" trigger
    #[serde(default = "default_sample_company")]
    pub sample_company: String,

    /// Website of the sample company
    #[serde(default = "default_sample_website")]
    pub sample_website: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QuotaConfig {
    /// Session store backend: memory, redis
    #[serde(default = "default_quota_store")]
    pub store: String,

    /// Redis URL (required when store = redis)
    pub redis_url: Option<String>,

    /// Key prefix for namespacing
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Credits granted to a user seen for the first time
    #[serde(default = "default_free_trial_credits")]
    pub free_trial_credits: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Shared secret of the session provider's JWTs
    pub jwt_secret: Option<String>,

    /// Claim that marks a user as unlimited (premium)
    #[serde(default = "default_premium_claim")]
    pub premium_claim: String,

    /// Development fallback header used when no secret is configured
    #[serde(default = "default_user_header")]
    pub user_header: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FallbackConfig {
    /// Description used when the oracle fails; `{company}` and `{industry}` are substituted
    #[serde(default = "default_fallback_description")]
    pub description: String,

    /// Email subject line of the fallback introduction
    #[serde(default = "default_fallback_subject")]
    pub subject: String,

    /// Email body of the fallback introduction
    #[serde(default = "default_fallback_body")]
    pub body: String,

    /// Industry wording used when a record has none
    #[serde(default = "default_fallback_industry")]
    pub default_industry: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Requests per second
    #[serde(default = "default_rate_limit")]
    pub requests_per_second: u32,

    /// Burst capacity
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Enable rate limiting
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 300 }
fn default_max_upload_bytes() -> usize { 5 * 1024 * 1024 }
fn default_oracle_provider() -> String { "openai".to_string() }
fn default_oracle_model() -> String { "gpt-4o-mini".to_string() }
fn default_oracle_timeout() -> u64 { 60 }
fn default_research_temperature() -> f32 { 0.3 }
fn default_email_temperature() -> f32 { 0.7 }
fn default_max_tokens() -> u32 { 1200 }
fn default_batch_size() -> usize { 3 }
fn default_call_timeout() -> u64 { 90 }
fn default_retry_base_delay() -> u64 { 250 }
fn default_sample_company() -> String { "Acme Demo".to_string() }
fn default_sample_website() -> String { "acmedemo.com".to_string() }
fn default_quota_store() -> String { "memory".to_string() }
fn default_key_prefix() -> String { "leadforge".to_string() }
fn default_free_trial_credits() -> u32 { 10 }
fn default_premium_claim() -> String { "is_premium".to_string() }
fn default_user_header() -> String { "X-User-Id".to_string() }
fn default_fallback_description() -> String {
    "{company} is a company that may operate in the {industry} sector.".to_string()
}
fn default_fallback_subject() -> String { "Introduction and Potential Collaboration".to_string() }
fn default_fallback_body() -> String {
    "Dear {company} Team,\n\n\
     I recently came across your company and was interested in learning more about your work. \
     I believe there might be opportunities for us to collaborate on solutions that could benefit your business.\n\n\
     Would you be available for a brief conversation to explore potential synergies between our organizations?\n\n\
     Best regards,\n\
     [Your Name]\n\
     [Your Company]\n\
     [Contact Information]"
        .to_string()
}
fn default_fallback_industry() -> String { "business".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_rate_limit() -> u32 { 20 }
fn default_burst() -> u32 { 40 }
fn default_enabled() -> bool { true }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            provider: default_oracle_provider(),
            api_key: None,
            api_base: None,
            model: default_oracle_model(),
            timeout_secs: default_oracle_timeout(),
            research_temperature: default_research_temperature(),
            email_temperature: default_email_temperature(),
            max_tokens: default_max_tokens(),
            industry_focus: None,
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            call_timeout_secs: default_call_timeout(),
            max_retries: 0,
            retry_base_delay_ms: default_retry_base_delay(),
            sample_company: default_sample_company(),
            sample_website: default_sample_website(),
        }
    }
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            store: default_quota_store(),
            redis_url: None,
            key_prefix: default_key_prefix(),
            free_trial_credits: default_free_trial_credits(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            premium_claim: default_premium_claim(),
            user_header: default_user_header(),
        }
    }
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            description: default_fallback_description(),
            subject: default_fallback_subject(),
            body: default_fallback_body(),
            default_industry: default_fallback_industry(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_rate_limit(),
            burst: default_burst(),
            enabled: default_enabled(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            oracle: OracleConfig::default(),
            batch: BatchConfig::default(),
            quota: QuotaConfig::default(),
            auth: AuthConfig::default(),
            fallback: FallbackConfig::default(),
            observability: ObservabilityConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__ORACLE__API_KEY=sk-...
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        config.try_deserialize()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }
}

impl BatchConfig {
    /// Per-call timeout as Duration
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// Chunk width, never below one
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.oracle.model, "gpt-4o-mini");
        assert_eq!(config.batch.batch_size, 3);
        assert_eq!(config.batch.max_retries, 0);
        assert_eq!(config.quota.free_trial_credits, 10);
    }

    #[test]
    fn test_effective_batch_size() {
        let batch = BatchConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert_eq!(batch.effective_batch_size(), 1);
        assert_eq!(BatchConfig::default().call_timeout(), Duration::from_secs(90));
    }

    #[test]
    fn test_fallback_templates_carry_placeholders() {
        let fallback = FallbackConfig::default();
        assert!(fallback.body.contains("{company}"));
        assert!(fallback.body.contains("[Your Name]"));
        assert!(fallback.body.contains("[Contact Information]"));
        assert!(!fallback.description.to_lowercase().contains("unknown"));
    }

    #[test]
    fn test_partial_sections_deserialize() {
        let config = Config::builder()
            .set_override("batch.batch_size", 5)
            .unwrap()
            .build()
            .unwrap();
        let app: AppConfig = config.try_deserialize().unwrap();
        assert_eq!(app.batch.batch_size, 5);
        assert_eq!(app.batch.sample_company, "Acme Demo");
        assert_eq!(app.oracle.provider, "openai");
    }
}
