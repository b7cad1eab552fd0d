//! External data source links (Notion databases, Airtable bases)

use crate::models::{guess_website, CompanyRecord};

fn is_notion(label: &str) -> bool {
    label.to_ascii_lowercase().contains("notion")
}

fn is_airtable(label: &str) -> bool {
    label.to_ascii_lowercase().contains("airtable")
}

/// Error text shown when a source is chosen without a link
pub fn missing_url_message(label: &str) -> String {
    if is_notion(label) {
        "Please enter a Notion database URL".to_string()
    } else if is_airtable(label) {
        "Please enter an Airtable base URL".to_string()
    } else {
        format!("Please enter a {} URL", label)
    }
}

/// Single record enriched for a source link: the source's own company
pub fn external_source_record(label: &str) -> CompanyRecord {
    let website = if is_notion(label) {
        Some("notion.so".to_string())
    } else if is_airtable(label) {
        Some("airtable.com".to_string())
    } else {
        guess_website(label)
    };

    let record = CompanyRecord::new(label);
    match website {
        Some(website) => record.with_website(website),
        None => record,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_sources() {
        assert_eq!(
            external_source_record("Notion, Inc").website.as_deref(),
            Some("notion.so")
        );
        assert_eq!(
            external_source_record("Airtable").website.as_deref(),
            Some("airtable.com")
        );
        assert_eq!(external_source_record("Airtable").company_name, "Airtable");
    }

    #[test]
    fn test_unknown_source_guesses_website() {
        let record = external_source_record("Sheets");
        assert_eq!(record.company_name, "Sheets");
        assert_eq!(record.website.as_deref(), Some("sheets.com"));

        assert_eq!(external_source_record("!!").website, None);
    }

    #[test]
    fn test_missing_url_messages() {
        assert_eq!(missing_url_message("Notion"), "Please enter a Notion database URL");
        assert_eq!(missing_url_message("airtable"), "Please enter an Airtable base URL");
        assert_eq!(missing_url_message("Sheets"), "Please enter a Sheets URL");
    }
}
