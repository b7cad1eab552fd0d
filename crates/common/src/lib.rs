//! LeadForge Common Library
//!
//! Shared code for the LeadForge gateway and batch runner:
//! - Company record / enrichment result models
//! - Tabular decoder for uploaded lead lists
//! - Enrichment oracle client abstraction
//! - Quota guard and session stores
//! - Batch orchestrator with fallback generation
//! - Error types, configuration, authentication, metrics

pub mod auth;
pub mod config;
pub mod decoder;
pub mod errors;
pub mod fallback;
pub mod metrics;
pub mod models;
pub mod notify;
pub mod oracle;
pub mod orchestrator;
pub mod presenter;
pub mod quota;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::{AppError, EnrichmentFailure, Result};
pub use models::{CompanyRecord, EnrichmentResult, EnrichmentStatus, RunReport};
pub use oracle::EnrichmentOracle;
pub use orchestrator::BatchOrchestrator;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
