//! Enrichment output types

use super::CompanyRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Whether the result came from the oracle or the local fallback
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentStatus {
    Completed,
    Partial,
}

impl EnrichmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrichmentStatus::Completed => "completed",
            EnrichmentStatus::Partial => "partial",
        }
    }
}

/// Researched descriptive attributes of a company
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentData {
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub products_services: Vec<String>,

    #[serde(default)]
    pub industry_challenges: Vec<String>,

    #[serde(default)]
    pub recent_news: String,

    #[serde(default)]
    pub pain_points: Vec<String>,

    /// Domain-specific extension fields, kept verbatim
    #[serde(flatten)]
    pub extensions: BTreeMap<String, serde_json::Value>,
}

impl EnrichmentData {
    /// True when no descriptive field carries content
    pub fn is_empty(&self) -> bool {
        self.description.trim().is_empty()
            && self.products_services.is_empty()
            && self.industry_challenges.is_empty()
            && self.recent_news.trim().is_empty()
            && self.pain_points.is_empty()
    }
}

/// One enriched company, produced once per input record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentResult {
    #[serde(flatten)]
    pub company: CompanyRecord,

    pub status: EnrichmentStatus,

    pub enrichment: EnrichmentData,

    /// Full email text, `Subject:` line first
    pub email: String,
}

impl EnrichmentResult {
    pub fn completed(company: CompanyRecord, enrichment: EnrichmentData, email: String) -> Self {
        Self {
            company,
            status: EnrichmentStatus::Completed,
            enrichment,
            email,
        }
    }

    pub fn partial(company: CompanyRecord, enrichment: EnrichmentData, email: String) -> Self {
        Self {
            company,
            status: EnrichmentStatus::Partial,
            enrichment,
            email,
        }
    }

    pub fn company_name(&self) -> &str {
        &self.company.company_name
    }

    pub fn is_partial(&self) -> bool {
        self.status == EnrichmentStatus::Partial
    }

    /// Replace only the email, leaving every researched field untouched
    pub fn with_email(mut self, email: String) -> Self {
        self.email = email;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape_matches_download_format() {
        let mut enrichment = EnrichmentData {
            description: "Makes anvils".into(),
            products_services: vec!["Anvils".into()],
            ..Default::default()
        };
        enrichment
            .extensions
            .insert("certifications".into(), serde_json::json!(["ISO 9001"]));

        let result = EnrichmentResult::completed(
            CompanyRecord::new("Acme").with_website("acme.com"),
            enrichment,
            "Subject: Hi\n\nBody".into(),
        );

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["company_name"], "Acme");
        assert_eq!(json["status"], "completed");
        assert_eq!(json["enrichment"]["productsServices"][0], "Anvils");
        assert_eq!(json["enrichment"]["certifications"][0], "ISO 9001");

        let back: EnrichmentResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn test_with_email_replaces_only_email() {
        let result = EnrichmentResult::partial(
            CompanyRecord::new("Acme"),
            EnrichmentData {
                description: "d".into(),
                ..Default::default()
            },
            "Subject: old".into(),
        );
        let updated = result.clone().with_email("Subject: new".into());
        assert_eq!(updated.email, "Subject: new");
        assert_eq!(updated.enrichment, result.enrichment);
        assert!(updated.is_partial());
    }

    #[test]
    fn test_is_empty() {
        assert!(EnrichmentData::default().is_empty());
        let data = EnrichmentData {
            pain_points: vec!["Churn".into()],
            ..Default::default()
        };
        assert!(!data.is_empty());
    }
}
