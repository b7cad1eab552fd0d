//! Prompt construction and response interpretation for the two-stage exchange

use crate::models::{CompanyRecord, EnrichmentData};
use serde_json::{Map, Value};

/// Words the oracle sometimes emits instead of leaving a field out
const PLACEHOLDER_VALUES: &[&str] = &["unknown", "n/a", "na", "none", "null", "not available"];

pub(crate) fn research_system_prompt(industry_focus: Option<&str>) -> String {
    match industry_focus {
        Some(focus) => format!(
            "You are a B2B research specialist focused on the {focus} industry. \
             Provide accurate, specific information about companies and how they relate to {focus}. \
             Always respond with a single valid JSON object."
        ),
        None => "You are a B2B research specialist. Provide accurate, specific information \
                 about companies for sales outreach. Always respond with a single valid JSON object."
            .to_string(),
    }
}

pub(crate) fn email_system_prompt(industry_focus: Option<&str>) -> String {
    let mut prompt = String::from(
        "You are a B2B sales professional writing personalized outreach emails. \
         Be professional, concise, and value-focused. Use the placeholders [Your Name], \
         [Your Company] and [Contact Information] for sender details.",
    );
    if let Some(focus) = industry_focus {
        prompt.push_str(&format!(" You represent a supplier in the {focus} industry."));
    }
    prompt
}

pub(crate) fn research_prompt(record: &CompanyRecord) -> String {
    let website = record.website.as_deref().unwrap_or("not provided");
    let mut prompt = format!(
        "Research the company \"{}\" (website: {}).\n",
        record.company_name, website
    );

    let additional = record.additional_info();
    if !additional.is_empty() {
        prompt.push_str(&format!("Known details: {}\n", additional));
    }

    prompt.push_str(
        "\nReturn a JSON object with these keys:\n\
         - description: two or three sentences on what the company does\n\
         - productsServices: array of main products or services\n\
         - industryChallenges: array of challenges the company's industry faces\n\
         - recentNews: one sentence on recent developments, or an empty string\n\
         - painPoints: array of likely business pain points a supplier could address\n\
         - industry, size, location: strings, only if confidently known\n\
         Omit any field you cannot determine. Never use the word \"unknown\".",
    );
    prompt
}

pub(crate) fn email_prompt(record: &CompanyRecord, enrichment: &EnrichmentData) -> String {
    let mut prompt = format!(
        "Write a personalized B2B outreach email to {}.\n\nCompany research:\n",
        record.company_name
    );

    if !enrichment.description.is_empty() {
        prompt.push_str(&format!("Description: {}\n", enrichment.description));
    }
    if !enrichment.products_services.is_empty() {
        prompt.push_str(&format!(
            "Products/services: {}\n",
            enrichment.products_services.join(", ")
        ));
    }
    if !enrichment.pain_points.is_empty() {
        prompt.push_str(&format!("Pain points: {}\n", enrichment.pain_points.join(", ")));
    }
    if !enrichment.industry_challenges.is_empty() {
        prompt.push_str(&format!(
            "Industry challenges: {}\n",
            enrichment.industry_challenges.join(", ")
        ));
    }
    if !enrichment.recent_news.is_empty() {
        prompt.push_str(&format!("Recent news: {}\n", enrichment.recent_news));
    }

    prompt.push_str(
        "\nStart with a line \"Subject: ...\", then a blank line, then the body. \
         Keep the body under 200 words, reference one specific detail from the research, \
         and close with a clear call to action.",
    );
    prompt
}

/// Research response after interpretation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResearchPayload {
    pub enrichment: EnrichmentData,
    pub industry: Option<String>,
    pub size: Option<String>,
    pub location: Option<String>,
}

impl ResearchPayload {
    /// Record attributes the oracle filled in, without overriding known ones
    pub fn apply_to(&self, record: &CompanyRecord) -> CompanyRecord {
        let discovered = CompanyRecord {
            company_name: record.company_name.clone(),
            website: None,
            industry: self.industry.clone(),
            size: self.size.clone(),
            location: self.location.clone(),
        };
        let mut merged = record.clone();
        merged.supplement(discovered);
        merged
    }
}

/// Interpret the research content as a JSON object.
///
/// Markdown fences and prose around the object are tolerated. Keys outside the
/// standard set are kept verbatim as extensions.
pub fn parse_research(content: &str) -> Result<ResearchPayload, String> {
    let json = extract_json_object(content).ok_or_else(|| "no JSON object in response".to_string())?;
    let mut map: Map<String, Value> =
        serde_json::from_str(json).map_err(|e| format!("invalid research JSON: {}", e))?;

    let mut enrichment = EnrichmentData {
        description: take_text(&mut map, "description").unwrap_or_default(),
        products_services: take_list(&mut map, "productsServices"),
        industry_challenges: take_list(&mut map, "industryChallenges"),
        recent_news: take_text(&mut map, "recentNews").unwrap_or_default(),
        pain_points: take_list(&mut map, "painPoints"),
        extensions: Default::default(),
    };

    let industry = take_text(&mut map, "industry");
    let size = take_text(&mut map, "size");
    let location = take_text(&mut map, "location");

    enrichment.extensions = map.into_iter().filter(|(_, v)| !v.is_null()).collect();

    if enrichment.is_empty() {
        return Err("research response carried no usable fields".to_string());
    }

    Ok(ResearchPayload {
        enrichment,
        industry,
        size,
        location,
    })
}

/// Clean up the drafted email so its first line is the subject.
///
/// Returns `None` when nothing usable remains.
pub fn normalize_email(company_name: &str, content: &str) -> Option<String> {
    let text = strip_fences(content.trim());
    let lines: Vec<&str> = text.lines().collect();

    let subject_at = lines.iter().position(|line| subject_text(line).is_some());

    let email = match subject_at {
        Some(index) => {
            let subject = subject_text(lines[index]).unwrap_or_default();
            let body = lines[index + 1..].join("\n");
            format!("Subject: {}\n\n{}", subject, body.trim())
        }
        None => {
            if text.trim().is_empty() {
                return None;
            }
            format!(
                "Subject: Partnership opportunity for {}\n\n{}",
                company_name,
                text.trim()
            )
        }
    };

    if email.lines().skip(1).all(|line| line.trim().is_empty()) {
        return None;
    }
    Some(email.trim_end().to_string())
}

/// `Subject:` line content, tolerating markdown emphasis around the label
fn subject_text(line: &str) -> Option<&str> {
    let trimmed = line.trim().trim_start_matches(['*', '#', ' ']);
    let rest = trimmed
        .strip_prefix("Subject:")
        .or_else(|| trimmed.strip_prefix("subject:"))
        .or_else(|| trimmed.strip_prefix("SUBJECT:"))?;
    Some(rest.trim_start_matches('*').trim().trim_end_matches('*').trim())
}

fn strip_fences(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string (e.g. ```json)
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn extract_json_object(content: &str) -> Option<&str> {
    let text = strip_fences(content.trim());
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn is_placeholder(value: &str) -> bool {
    let lowered = value.trim().to_ascii_lowercase();
    lowered.is_empty() || PLACEHOLDER_VALUES.contains(&lowered.as_str())
}

fn take_text(map: &mut Map<String, Value>, key: &str) -> Option<String> {
    match map.remove(key)? {
        Value::String(s) if !is_placeholder(&s) => Some(s.trim().to_string()),
        Value::Array(items) => {
            let joined = items
                .iter()
                .filter_map(Value::as_str)
                .filter(|s| !is_placeholder(s))
                .collect::<Vec<_>>()
                .join(" ");
            (!joined.is_empty()).then_some(joined)
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn take_list(map: &mut Map<String, Value>, key: &str) -> Vec<String> {
    match map.remove(key) {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) if !is_placeholder(&s) => Some(s.trim().to_string()),
                _ => None,
            })
            .collect(),
        Some(Value::String(s)) if !is_placeholder(&s) => s
            .split([',', ';'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_research_fenced() {
        let content = "Here is the research:\n```json\n{\n  \"description\": \"Makes anvils\",\n  \
                       \"productsServices\": [\"Anvils\", \"Rockets\"],\n  \"recentNews\": \"\",\n  \
                       \"painPoints\": \"Supply chain, Cost\",\n  \"size\": \"Unknown\"\n}\n```";
        let payload = parse_research(content).unwrap();

        assert_eq!(payload.enrichment.description, "Makes anvils");
        assert_eq!(payload.enrichment.products_services, vec!["Anvils", "Rockets"]);
        assert_eq!(payload.enrichment.pain_points, vec!["Supply chain", "Cost"]);
        assert!(payload.enrichment.recent_news.is_empty());
        assert_eq!(payload.size, None);
    }

    #[test]
    fn test_parse_research_keeps_extensions() {
        let content = r#"{"description": "Grows hemp", "hempRelevance": "High", "certifications": ["USDA Organic"]}"#;
        let payload = parse_research(content).unwrap();
        assert_eq!(payload.enrichment.extensions["hempRelevance"], "High");
        assert_eq!(payload.enrichment.extensions["certifications"][0], "USDA Organic");
        assert!(!payload.enrichment.extensions.contains_key("description"));
    }

    #[test]
    fn test_parse_research_rejects_garbage() {
        assert!(parse_research("I could not find anything.").is_err());
        assert!(parse_research("{not json}").is_err());
        assert!(parse_research(r#"{"description": "unknown"}"#).is_err());
    }

    #[test]
    fn test_apply_to_does_not_override() {
        let payload = ResearchPayload {
            industry: Some("Aerospace".into()),
            location: Some("Mojave".into()),
            ..Default::default()
        };
        let record = CompanyRecord::new("Acme").with_industry("Manufacturing");
        let merged = payload.apply_to(&record);
        assert_eq!(merged.industry.as_deref(), Some("Manufacturing"));
        assert_eq!(merged.location.as_deref(), Some("Mojave"));
    }

    #[test]
    fn test_normalize_email_subject_first() {
        let email = normalize_email("Acme", "Sure! Here it is:\n**Subject:** Better anvils\n\nHi team,\nLet's talk.").unwrap();
        assert!(email.starts_with("Subject: Better anvils\n\n"));
        assert!(email.ends_with("Let's talk."));
    }

    #[test]
    fn test_normalize_email_prepends_subject() {
        let email = normalize_email("Acme", "Hi team,\nLet's talk.").unwrap();
        assert!(email.starts_with("Subject: Partnership opportunity for Acme\n\nHi team"));
    }

    #[test]
    fn test_normalize_email_empty() {
        assert_eq!(normalize_email("Acme", "   "), None);
        assert_eq!(normalize_email("Acme", "Subject: Hello"), None);
    }

    #[test]
    fn test_prompts_mention_company() {
        let record = CompanyRecord::new("Acme").with_website("acme.com").with_industry("Tools");
        let prompt = research_prompt(&record);
        assert!(prompt.contains("\"Acme\""));
        assert!(prompt.contains("acme.com"));
        assert!(prompt.contains("Tools"));

        let prompt = email_prompt(&record, &EnrichmentData::default());
        assert!(prompt.contains("Acme"));
        assert!(research_system_prompt(Some("hemp")).contains("hemp"));
    }
}
