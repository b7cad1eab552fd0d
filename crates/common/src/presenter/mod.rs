//! Result presenter sinks and email composition helpers
//!
//! The orchestrator hands each completed run to exactly one `ResultPresenter`,
//! once, in full, in input order. Everything here is downstream of that call.

use crate::errors::Result;
use crate::models::{EnrichmentResult, RunReport};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// File name of the raw-JSON download
pub const DOWNLOAD_FILE_NAME: &str = "b2b_lead_enrichment_results.json";

/// Content type of the raw-JSON download
pub const DOWNLOAD_CONTENT_TYPE: &str = "application/json";

/// Sink for completed runs
#[async_trait]
pub trait ResultPresenter: Send + Sync {
    async fn present(&self, report: &RunReport) -> Result<()>;
}

/// Latest run per user, kept in memory
#[derive(Default)]
pub struct MemoryResultStore {
    runs: RwLock<HashMap<String, RunReport>>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Presenter that stores runs under `user_id`
    pub fn presenter_for(self: &Arc<Self>, user_id: &str) -> Arc<dyn ResultPresenter> {
        Arc::new(UserResultPresenter {
            store: Arc::clone(self),
            user_id: user_id.to_string(),
        })
    }

    pub async fn latest(&self, user_id: &str) -> Option<RunReport> {
        self.runs.read().await.get(user_id).cloned()
    }

    async fn store(&self, user_id: &str, report: RunReport) {
        self.runs.write().await.insert(user_id.to_string(), report);
    }
}

struct UserResultPresenter {
    store: Arc<MemoryResultStore>,
    user_id: String,
}

#[async_trait]
impl ResultPresenter for UserResultPresenter {
    async fn present(&self, report: &RunReport) -> Result<()> {
        debug!(user_id = %self.user_id, run_id = %report.run_id, "Storing run results");
        self.store.store(&self.user_id, report.clone()).await;
        Ok(())
    }
}

/// Writes the download artifact of each run to a file
pub struct JsonFilePresenter {
    path: PathBuf,
}

impl JsonFilePresenter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ResultPresenter for JsonFilePresenter {
    async fn present(&self, report: &RunReport) -> Result<()> {
        let artifact = download_artifact(&report.results)?;
        tokio::fs::write(&self.path, &artifact.bytes).await?;
        info!(
            path = %self.path.display(),
            records = report.results.len(),
            "Results written"
        );
        Ok(())
    }
}

/// Raw-JSON download of a result list
#[derive(Debug, Clone)]
pub struct DownloadArtifact {
    pub file_name: &'static str,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Pretty-printed JSON array of the results, in order
pub fn download_artifact(results: &[EnrichmentResult]) -> Result<DownloadArtifact> {
    let bytes = serde_json::to_vec_pretty(results)?;
    Ok(DownloadArtifact {
        file_name: DOWNLOAD_FILE_NAME,
        content_type: DOWNLOAD_CONTENT_TYPE,
        bytes,
    })
}

/// Sender details substituted into drafted emails
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SenderProfile {
    pub name: Option<String>,
    pub company: Option<String>,
    pub contact: Option<String>,
}

/// Replace sender placeholders the profile has values for; others stay as-is
pub fn personalize_email(email: &str, sender: &SenderProfile) -> String {
    [
        ("[Your Name]", &sender.name),
        ("[Your Company]", &sender.company),
        ("[Contact Information]", &sender.contact),
    ]
    .into_iter()
    .fold(email.to_string(), |text, (token, value)| {
        match value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            Some(value) => text.replace(token, value),
            None => text,
        }
    })
}

/// Split a drafted email into subject and body.
///
/// Without a `Subject:` first line the whole text is the body.
pub fn split_subject(email: &str) -> (String, String) {
    let email = email.trim_start();
    let (first, rest) = email.split_once('\n').unwrap_or((email, ""));

    match first.trim().strip_prefix("Subject:") {
        Some(subject) => (subject.trim().to_string(), rest.trim().to_string()),
        None => (String::new(), email.trim().to_string()),
    }
}

/// `mailto:` link with an encoded subject and body
pub fn mailto_link(recipient: Option<&str>, subject: &str, body: &str) -> String {
    format!(
        "mailto:{}?subject={}&body={}",
        recipient.map(percent_encode).unwrap_or_default(),
        percent_encode(subject),
        percent_encode(body)
    )
}

fn percent_encode(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'@' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}
