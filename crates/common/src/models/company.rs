//! Normalized company input record

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// One company to enrich, as decoded from an input row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub company_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,

    /// Free-form headcount / revenue band
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl CompanyRecord {
    /// Create a record with only a name
    pub fn new(company_name: impl Into<String>) -> Self {
        Self {
            company_name: company_name.into(),
            website: None,
            industry: None,
            size: None,
            location: None,
        }
    }

    pub fn with_website(mut self, website: impl Into<String>) -> Self {
        self.website = non_empty(website.into());
        self
    }

    pub fn with_industry(mut self, industry: impl Into<String>) -> Self {
        self.industry = non_empty(industry.into());
        self
    }

    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = non_empty(size.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = non_empty(location.into());
        self
    }

    /// Free-text context handed to the oracle alongside the name.
    ///
    /// Industry, location and size in that order, absent fields skipped.
    pub fn additional_info(&self) -> String {
        [&self.industry, &self.location, &self.size]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Fill any empty optional field from `other`, keeping existing values
    pub fn supplement(&mut self, other: CompanyRecord) {
        if self.website.is_none() {
            self.website = other.website;
        }
        if self.industry.is_none() {
            self.industry = other.industry;
        }
        if self.size.is_none() {
            self.size = other.size;
        }
        if self.location.is_none() {
            self.location = other.location;
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Trailing legal-form suffix ("Inc.", "GmbH", ...), compiled once
fn legal_suffix() -> Option<&'static Regex> {
    static SUFFIX: OnceLock<Option<Regex>> = OnceLock::new();
    SUFFIX
        .get_or_init(|| {
            Regex::new(r"(?i)[,\s]+(inc|llc|ltd|gmbh|corp|corporation|co|plc|sa|ag)\.?$").ok()
        })
        .as_ref()
}

/// Guess a website from a company name: "Acme Demo, Inc." -> "acmedemo.com"
pub fn guess_website(company_name: &str) -> Option<String> {
    let stem = legal_suffix()?.replace(company_name.trim(), "");

    let slug: String = stem
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect();

    if slug.is_empty() {
        None
    } else {
        Some(format!("{}.com", slug))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_additional_info_skips_missing() {
        let record = CompanyRecord::new("Acme")
            .with_industry("Manufacturing")
            .with_size("500-1000");
        assert_eq!(record.additional_info(), "Manufacturing 500-1000");
        assert_eq!(CompanyRecord::new("Acme").additional_info(), "");
    }

    #[test]
    fn test_builder_ignores_blank() {
        let record = CompanyRecord::new("Acme").with_website("  ");
        assert_eq!(record.website, None);
    }

    #[test]
    fn test_supplement_keeps_existing() {
        let mut record = CompanyRecord::new("Acme").with_location("Berlin");
        record.supplement(
            CompanyRecord::new("ignored")
                .with_location("Paris")
                .with_size("10-50"),
        );
        assert_eq!(record.location.as_deref(), Some("Berlin"));
        assert_eq!(record.size.as_deref(), Some("10-50"));
        assert_eq!(record.company_name, "Acme");
    }

    #[test]
    fn test_guess_website() {
        assert_eq!(guess_website("Acme Demo").as_deref(), Some("acmedemo.com"));
        assert_eq!(guess_website("Globex, Inc.").as_deref(), Some("globex.com"));
        assert_eq!(guess_website("Initech LLC").as_deref(), Some("initech.com"));
        assert_eq!(guess_website("---"), None);
    }

    #[test]
    fn test_serialized_shape() {
        let record = CompanyRecord::new("Acme").with_website("acme.com");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["company_name"], "Acme");
        assert_eq!(json["website"], "acme.com");
        assert!(json.get("industry").is_none());
    }

    #[test]
    fn test_legal_suffix_compiled_once() {
        let first = legal_suffix().unwrap();
        let second = legal_suffix().unwrap();
        assert!(std::ptr::eq(first, second));
        assert_eq!(guess_website("Umbrella Corp").as_deref(), Some("umbrella.com"));
    }
}
