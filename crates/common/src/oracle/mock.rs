//! Deterministic oracle for local development and demos

use super::{EnrichmentOracle, OracleResult};
use crate::models::{CompanyRecord, EnrichmentData, EnrichmentResult};
use async_trait::async_trait;

/// Answers every company with the same templated research and email
#[derive(Debug, Default, Clone)]
pub struct MockOracle;

impl MockOracle {
    pub fn new() -> Self {
        Self
    }

    fn research(record: &CompanyRecord) -> EnrichmentData {
        let industry = record.industry.as_deref().unwrap_or("business services");
        EnrichmentData {
            description: format!(
                "{} is an established company in {} serving regional and national customers.",
                record.company_name, industry
            ),
            products_services: vec![
                "Core product line".to_string(),
                "Professional services".to_string(),
            ],
            industry_challenges: vec![
                "Rising input costs".to_string(),
                "Supply chain reliability".to_string(),
            ],
            recent_news: format!("{} recently expanded its customer programs.", record.company_name),
            pain_points: vec![
                "Vendor consolidation".to_string(),
                "Operational efficiency".to_string(),
            ],
            extensions: Default::default(),
        }
    }

    fn email(record: &CompanyRecord) -> String {
        format!(
            "Subject: Helping {name} streamline operations\n\n\
             Hi {name} team,\n\n\
             I noticed {name} recently expanded its customer programs. Teams growing at that pace \
             often look for ways to consolidate vendors without slowing down.\n\n\
             We help companies like yours do exactly that. Would you be open to a 15-minute call \
             next week?\n\n\
             Best regards,\n\
             [Your Name]\n\
             [Your Company]\n\
             [Contact Information]",
            name = record.company_name
        )
    }
}

#[async_trait]
impl EnrichmentOracle for MockOracle {
    async fn enrich(&self, record: &CompanyRecord) -> OracleResult<EnrichmentResult> {
        Ok(EnrichmentResult::completed(
            record.clone(),
            Self::research(record),
            Self::email(record),
        ))
    }

    async fn regenerate_email(&self, result: &EnrichmentResult) -> OracleResult<String> {
        Ok(Self::email(&result.company))
    }

    fn is_configured(&self) -> bool {
        true
    }

    fn model_name(&self) -> &str {
        "mock-oracle"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_is_deterministic() {
        let oracle = MockOracle::new();
        let record = CompanyRecord::new("Acme Demo").with_website("acmedemo.com");

        let first = oracle.enrich(&record).await.unwrap();
        let second = oracle.enrich(&record).await.unwrap();
        assert_eq!(first, second);
        assert!(!first.is_partial());
        assert!(first.email.starts_with("Subject:"));
        assert!(first.email.contains("[Your Name]"));

        let regenerated = oracle.regenerate_email(&first).await.unwrap();
        assert_eq!(regenerated, first.email);
    }
}
