//! Enrichment oracle abstraction
//!
//! One `enrich` call is one logical exchange with the external text-generation
//! service: no retries, no quota side effects. Failures come back as a typed
//! `EnrichmentFailure` naming the company; the orchestrator decides what to do.

mod mock;
mod openai;
mod prompts;

pub use mock::MockOracle;
pub use openai::OpenAiOracle;
pub use prompts::{normalize_email, parse_research, ResearchPayload};

use crate::config::OracleConfig;
use crate::errors::{AppError, EnrichmentFailure, Result};
use crate::models::{CompanyRecord, EnrichmentResult};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Result of a single oracle exchange
pub type OracleResult<T> = std::result::Result<T, EnrichmentFailure>;

/// External research + drafting service
#[async_trait]
pub trait EnrichmentOracle: Send + Sync {
    /// Research one company and draft its outreach email
    async fn enrich(&self, record: &CompanyRecord) -> OracleResult<EnrichmentResult>;

    /// Draft a new email from already-researched data
    async fn regenerate_email(&self, result: &EnrichmentResult) -> OracleResult<String>;

    /// Whether a credential is present; checked before any run starts
    fn is_configured(&self) -> bool;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// API credential of the oracle, threaded explicitly through constructors
#[derive(Clone, Default)]
pub struct OracleCredential(Option<String>);

impl OracleCredential {
    pub fn new(key: Option<String>) -> Self {
        Self(key.filter(|k| !k.trim().is_empty()))
    }

    pub fn is_present(&self) -> bool {
        self.0.is_some()
    }

    pub(crate) fn bearer(&self) -> Option<String> {
        self.0.as_ref().map(|key| format!("Bearer {}", key))
    }
}

impl fmt::Debug for OracleCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(_) => write!(f, "OracleCredential(<redacted>)"),
            None => write!(f, "OracleCredential(None)"),
        }
    }
}

/// Create an oracle based on configuration
pub fn create_oracle(config: &OracleConfig) -> Result<Arc<dyn EnrichmentOracle>> {
    match config.provider.as_str() {
        "openai" => {
            let credential = OracleCredential::new(config.api_key.clone());
            if !credential.is_present() {
                tracing::warn!("Oracle API key not configured, enrichment runs will be refused");
            }
            Ok(Arc::new(OpenAiOracle::new(config, credential)?))
        }
        "mock" => Ok(Arc::new(MockOracle::new())),
        other => Err(AppError::Configuration {
            message: format!("Unknown oracle provider: {}", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_filters_blank_and_redacts() {
        assert!(!OracleCredential::new(Some("   ".into())).is_present());
        let credential = OracleCredential::new(Some("sk-secret".into()));
        assert!(credential.is_present());
        assert!(!format!("{:?}", credential).contains("sk-secret"));
        assert_eq!(credential.bearer().as_deref(), Some("Bearer sk-secret"));
    }

    #[test]
    fn test_create_oracle_providers() {
        let mut config = OracleConfig::default();
        let oracle = create_oracle(&config).unwrap();
        assert!(!oracle.is_configured());

        config.api_key = Some("sk-test".into());
        assert!(create_oracle(&config).unwrap().is_configured());

        config.provider = "mock".into();
        assert_eq!(create_oracle(&config).unwrap().model_name(), "mock-oracle");

        config.provider = "carrier-pigeon".into();
        assert!(matches!(
            create_oracle(&config),
            Err(AppError::Configuration { .. })
        ));
    }
}
