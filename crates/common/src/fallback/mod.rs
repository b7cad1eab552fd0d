//! Local fallback content for records the oracle could not enrich

use crate::config::FallbackConfig;
use crate::models::{CompanyRecord, EnrichmentData, EnrichmentResult};

/// Builds `partial` results from configured templates.
///
/// Output depends only on the record and the templates, so the same failed
/// record always yields the same fallback.
#[derive(Debug, Clone)]
pub struct FallbackGenerator {
    config: FallbackConfig,
}

impl FallbackGenerator {
    pub fn new(config: FallbackConfig) -> Self {
        Self { config }
    }

    /// Build the partial result for a record whose enrichment failed
    pub fn generate(&self, record: &CompanyRecord) -> EnrichmentResult {
        EnrichmentResult::partial(record.clone(), self.enrichment(record), self.email(record))
    }

    pub fn enrichment(&self, record: &CompanyRecord) -> EnrichmentData {
        EnrichmentData {
            description: self.render(&self.config.description, record),
            products_services: vec!["Product information unavailable".to_string()],
            industry_challenges: vec!["Industry information unavailable".to_string()],
            recent_news: "No recent news available".to_string(),
            pain_points: vec!["Pain point information unavailable".to_string()],
            extensions: Default::default(),
        }
    }

    /// Generic introduction email, subject line first
    pub fn email(&self, record: &CompanyRecord) -> String {
        format!(
            "Subject: {}\n\n{}",
            self.render(&self.config.subject, record),
            self.render(&self.config.body, record)
        )
    }

    fn render(&self, template: &str, record: &CompanyRecord) -> String {
        let industry = record
            .industry
            .as_deref()
            .unwrap_or(&self.config.default_industry);
        template
            .replace("{company}", &record.company_name)
            .replace("{industry}", industry)
    }
}

impl Default for FallbackGenerator {
    fn default() -> Self {
        Self::new(FallbackConfig::default())
    }
}
