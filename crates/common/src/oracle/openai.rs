//! OpenAI-compatible chat-completions oracle

use super::prompts::{
    email_prompt, email_system_prompt, normalize_email, parse_research, research_prompt,
    research_system_prompt,
};
use super::{EnrichmentOracle, OracleCredential, OracleResult};
use crate::config::OracleConfig;
use crate::errors::{AppError, EnrichmentFailure, FailureKind, Result};
use crate::metrics;
use crate::models::{CompanyRecord, EnrichmentData, EnrichmentResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

/// Oracle backed by an OpenAI-compatible chat-completions endpoint
pub struct OpenAiOracle {
    client: reqwest::Client,
    credential: OracleCredential,
    endpoint: String,
    model: String,
    timeout: Duration,
    research_temperature: f32,
    email_temperature: f32,
    max_tokens: u32,
    industry_focus: Option<String>,
}

impl OpenAiOracle {
    /// Create a new oracle client
    pub fn new(config: &OracleConfig, credential: OracleCredential) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        let base = config
            .api_base
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE)
            .trim_end_matches('/');

        Ok(Self {
            client,
            credential,
            endpoint: format!("{}/chat/completions", base),
            model: config.model.clone(),
            timeout,
            research_temperature: config.research_temperature,
            email_temperature: config.email_temperature,
            max_tokens: config.max_tokens,
            industry_focus: config.industry_focus.clone(),
        })
    }

    /// One chat-completions exchange, returning the first choice's content
    async fn chat(
        &self,
        company_name: &str,
        stage: &'static str,
        system: &str,
        user: &str,
        temperature: f32,
    ) -> OracleResult<String> {
        let fail = |kind| EnrichmentFailure::new(company_name, kind);

        let bearer = self
            .credential
            .bearer()
            .ok_or_else(|| fail(FailureKind::Unavailable))?;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            max_tokens: self.max_tokens,
            temperature,
        };

        let start = Instant::now();
        let outcome = self.send(&bearer, &request).await;
        metrics::record_oracle_call(
            start.elapsed().as_secs_f64(),
            stage,
            &self.model,
            outcome.is_ok(),
        );

        let content = outcome.map_err(fail)?;
        debug!(stage, chars = content.len(), "Oracle responded");
        Ok(content)
    }

    async fn send(
        &self,
        bearer: &str,
        request: &ChatRequest<'_>,
    ) -> std::result::Result<String, FailureKind> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", bearer)
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_failure(e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(FailureKind::Status { status, body });
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| FailureKind::Malformed(e.to_string()))?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(FailureKind::Empty)
    }

    fn transport_failure(&self, err: reqwest::Error) -> FailureKind {
        if err.is_timeout() {
            FailureKind::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else {
            FailureKind::Transport(err.to_string())
        }
    }

    async fn draft_email(
        &self,
        record: &CompanyRecord,
        enrichment: &EnrichmentData,
    ) -> OracleResult<String> {
        let content = self
            .chat(
                &record.company_name,
                "email",
                &email_system_prompt(self.industry_focus.as_deref()),
                &email_prompt(record, enrichment),
                self.email_temperature,
            )
            .await?;

        normalize_email(&record.company_name, &content)
            .ok_or_else(|| EnrichmentFailure::new(&record.company_name, FailureKind::Empty))
    }
}

#[async_trait]
impl EnrichmentOracle for OpenAiOracle {
    #[instrument(skip(self, record), fields(company = %record.company_name))]
    async fn enrich(&self, record: &CompanyRecord) -> OracleResult<EnrichmentResult> {
        let content = self
            .chat(
                &record.company_name,
                "research",
                &research_system_prompt(self.industry_focus.as_deref()),
                &research_prompt(record),
                self.research_temperature,
            )
            .await?;

        let payload = parse_research(&content).map_err(|reason| {
            warn!(%reason, "Research response could not be interpreted");
            EnrichmentFailure::new(&record.company_name, FailureKind::Malformed(reason))
        })?;

        let company = payload.apply_to(record);
        let email = self.draft_email(&company, &payload.enrichment).await?;

        Ok(EnrichmentResult::completed(company, payload.enrichment, email))
    }

    #[instrument(skip(self, result), fields(company = %result.company_name()))]
    async fn regenerate_email(&self, result: &EnrichmentResult) -> OracleResult<String> {
        self.draft_email(&result.company, &result.enrichment).await
    }

    fn is_configured(&self) -> bool {
        self.credential.is_present()
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EnrichmentStatus;
    use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    /// Chat endpoint answering with canned replies, in order
    struct CannedEndpoint {
        replies: Vec<(StatusCode, String)>,
        requests: Mutex<Vec<Value>>,
    }

    impl CannedEndpoint {
        fn requests(&self) -> Vec<Value> {
            self.requests.lock().unwrap().clone()
        }
    }

    async fn answer(
        State(endpoint): State<Arc<CannedEndpoint>>,
        Json(body): Json<Value>,
    ) -> (StatusCode, String) {
        let mut requests = endpoint.requests.lock().unwrap();
        let index = requests.len();
        requests.push(body);
        endpoint
            .replies
            .get(index)
            .cloned()
            .unwrap_or((StatusCode::INTERNAL_SERVER_ERROR, "no reply left".to_string()))
    }

    async fn serve(replies: Vec<(StatusCode, String)>) -> (String, Arc<CannedEndpoint>) {
        let endpoint = Arc::new(CannedEndpoint {
            replies,
            requests: Mutex::new(Vec::new()),
        });
        let app = Router::new()
            .route("/v1/chat/completions", post(answer))
            .with_state(endpoint.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}/v1", addr), endpoint)
    }

    fn chat_reply(content: &str) -> (StatusCode, String) {
        let body = json!({ "choices": [{ "message": { "content": content } }] });
        (StatusCode::OK, body.to_string())
    }

    fn research_reply() -> (StatusCode, String) {
        chat_reply(
            &json!({
                "description": "Acme builds anvils",
                "productsServices": ["Anvils"],
                "industryChallenges": ["Steel prices"],
                "recentNews": "Opened a new foundry",
                "painPoints": ["Shipping weight"],
                "size": "50-200"
            })
            .to_string(),
        )
    }

    fn oracle(api_base: &str, key: Option<&str>) -> OpenAiOracle {
        let config = OracleConfig {
            api_base: Some(api_base.to_string()),
            timeout_secs: 2,
            ..Default::default()
        };
        OpenAiOracle::new(&config, OracleCredential::new(key.map(String::from))).unwrap()
    }

    #[test]
    fn test_endpoint_from_base() {
        let oracle = oracle("https://llm.internal/v1/", Some("k"));
        assert_eq!(oracle.endpoint, "https://llm.internal/v1/chat/completions");
        assert_eq!(oracle.model_name(), "gpt-4o-mini");
    }

    #[tokio::test]
    async fn test_missing_credential_is_unavailable() {
        let oracle = oracle("http://127.0.0.1:9", None);
        assert!(!oracle.is_configured());

        let err = oracle.enrich(&CompanyRecord::new("Acme")).await.unwrap_err();
        assert_eq!(err.company_name, "Acme");
        assert_eq!(err.kind, FailureKind::Unavailable);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_failure() {
        // Port 9 (discard) is closed on test hosts
        let oracle = oracle("http://127.0.0.1:9", Some("sk-test"));
        let err = oracle.enrich(&CompanyRecord::new("Acme")).await.unwrap_err();
        assert_eq!(err.company_name, "Acme");
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_two_stage_exchange_completes() {
        let (base, endpoint) = serve(vec![
            research_reply(),
            chat_reply("Subject: Lighter anvils for Acme\n\nHi,\n[Your Name]"),
        ])
        .await;

        let result = oracle(&base, Some("sk-test"))
            .enrich(&CompanyRecord::new("Acme"))
            .await
            .unwrap();

        assert_eq!(result.status, EnrichmentStatus::Completed);
        assert_eq!(result.enrichment.description, "Acme builds anvils");
        assert_eq!(result.company.size.as_deref(), Some("50-200"));
        assert!(result.email.lines().next().unwrap().starts_with("Subject:"));

        let requests = endpoint.requests();
        assert_eq!(requests.len(), 2);
        let temperature = |i: usize| requests[i]["temperature"].as_f64().unwrap();
        assert!((temperature(0) - 0.3).abs() < 1e-6);
        assert!((temperature(1) - 0.7).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_error_status_is_status_failure() {
        let (base, _) = serve(vec![(StatusCode::SERVICE_UNAVAILABLE, "overloaded".to_string())]).await;

        let err = oracle(&base, Some("sk-test"))
            .enrich(&CompanyRecord::new("Acme"))
            .await
            .unwrap_err();

        assert_eq!(
            err.kind,
            FailureKind::Status {
                status: 503,
                body: "overloaded".to_string()
            }
        );
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_non_json_body_is_malformed() {
        let (base, _) = serve(vec![(StatusCode::OK, "<html>gateway</html>".to_string())]).await;

        let err = oracle(&base, Some("sk-test"))
            .enrich(&CompanyRecord::new("Acme"))
            .await
            .unwrap_err();

        assert!(matches!(err.kind, FailureKind::Malformed(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_no_choices_is_empty() {
        let (base, _) = serve(vec![(StatusCode::OK, json!({ "choices": [] }).to_string())]).await;

        let err = oracle(&base, Some("sk-test"))
            .enrich(&CompanyRecord::new("Acme"))
            .await
            .unwrap_err();

        assert_eq!(err.kind, FailureKind::Empty);
    }

    #[tokio::test]
    async fn test_regenerate_sends_only_email_stage() {
        let (base, endpoint) = serve(vec![chat_reply("Hello again,\n[Your Name]")]).await;
        let existing = EnrichmentResult::completed(
            CompanyRecord::new("Acme"),
            EnrichmentData {
                description: "Acme builds anvils".to_string(),
                ..Default::default()
            },
            "Subject: Old\n\nOld body".to_string(),
        );

        let email = oracle(&base, Some("sk-test"))
            .regenerate_email(&existing)
            .await
            .unwrap();

        assert!(email.starts_with("Subject: Partnership opportunity for Acme"));
        assert!(email.contains("Hello again"));

        let requests = endpoint.requests();
        assert_eq!(requests.len(), 1);
        assert!((requests[0]["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    }
}
