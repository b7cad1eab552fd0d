//! Batch orchestrator
//!
//! Drives one enrichment run from decoded records to the presenter:
//! - gate on input, quota and oracle credential before any call
//! - fan out in chunks of `batch_size`, one chunk in flight at a time
//! - every call bounded by `call_timeout`; failures become `partial` fallbacks
//! - output in input order, quota decremented once per run

mod source;

pub use source::{external_source_record, missing_url_message};

use crate::config::BatchConfig;
use crate::decoder;
use crate::errors::{AppError, EnrichmentFailure, FailureKind, Result};
use crate::fallback::FallbackGenerator;
use crate::metrics;
use crate::models::{CompanyRecord, EnrichmentResult, RunReport};
use crate::notify::{Notice, Notifier};
use crate::oracle::EnrichmentOracle;
use crate::presenter::ResultPresenter;
use crate::quota::QuotaGuard;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

/// Lifecycle of a single run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    /// Checking input, quota and credential
    Gated,
    /// Chunk `batch` of `of` in flight (1-based)
    Running { batch: usize, of: usize },
    Completed,
    Aborted,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed | RunState::Aborted)
    }
}

/// How the record list of a run was obtained; picks the user-facing wording
#[derive(Debug, Clone, Copy)]
enum RunKind<'a> {
    Records,
    Sample,
    External(&'a str),
}

/// One run lock per user, shared by every orchestrator built for that user
#[derive(Default)]
pub struct RunLocks {
    locks: RwLock<HashMap<String, Arc<Mutex<()>>>>,
}

impl RunLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock for `user_id`. Entries no orchestrator holds any more are evicted here.
    pub async fn for_user(&self, user_id: &str) -> Arc<Mutex<()>> {
        if let Some(lock) = self.locks.read().await.get(user_id) {
            return Arc::clone(lock);
        }
        let mut locks = self.locks.write().await;
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        Arc::clone(locks.entry(user_id.to_string()).or_default())
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.locks.read().await.len()
    }
}

/// Runs enrichment for one user session
pub struct BatchOrchestrator {
    oracle: Arc<dyn EnrichmentOracle>,
    quota: QuotaGuard,
    presenter: Arc<dyn ResultPresenter>,
    notifier: Arc<dyn Notifier>,
    fallback: FallbackGenerator,
    config: BatchConfig,
    max_upload_bytes: usize,
    run_lock: Arc<Mutex<()>>,
    state: watch::Sender<RunState>,
}

impl BatchOrchestrator {
    pub fn new(
        oracle: Arc<dyn EnrichmentOracle>,
        quota: QuotaGuard,
        presenter: Arc<dyn ResultPresenter>,
        notifier: Arc<dyn Notifier>,
        fallback: FallbackGenerator,
        config: BatchConfig,
    ) -> Self {
        let (state, _) = watch::channel(RunState::Idle);
        Self {
            oracle,
            quota,
            presenter,
            notifier,
            fallback,
            config,
            max_upload_bytes: usize::MAX,
            run_lock: Arc::new(Mutex::new(())),
            state,
        }
    }

    /// Share a run lock with other orchestrators of the same user
    pub fn with_run_lock(mut self, run_lock: Arc<Mutex<()>>) -> Self {
        self.run_lock = run_lock;
        self
    }

    pub fn with_upload_limit(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    /// Observe run state transitions
    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.state.subscribe()
    }

    pub fn run_state(&self) -> RunState {
        *self.state.borrow()
    }

    /// Decode raw delimited text and enrich every record
    #[instrument(skip(self, raw), fields(bytes = raw.len()))]
    pub async fn process_file(&self, raw: &str) -> Result<RunReport> {
        let records = decoder::decode(raw).map_err(|e| {
            self.notifier.notify(Notice::error(e.to_string()));
            e
        })?;
        info!(records = records.len(), "Input decoded");
        self.process_records(records).await
    }

    /// Validate an uploaded file, then process it as text
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn process_upload(&self, file_name: &str, bytes: &[u8]) -> Result<RunReport> {
        let raw = decoder::validate_upload(file_name, bytes, self.max_upload_bytes).map_err(|e| {
            self.notifier.notify(Notice::error(e.to_string()));
            e
        })?;
        self.process_file(&raw).await
    }

    /// Enrich the configured sample company
    #[instrument(skip(self))]
    pub async fn process_sample(&self) -> Result<RunReport> {
        let record = CompanyRecord::new(&self.config.sample_company)
            .with_website(&self.config.sample_website);
        self.notifier
            .notify(Notice::info(format!("Getting sample data for {}...", record.company_name)));
        self.run(vec![record], RunKind::Sample).await
    }

    /// Enrich the company behind an external data source link
    #[instrument(skip(self, url))]
    pub async fn process_external_source(&self, label: &str, url: &str) -> Result<RunReport> {
        if url.trim().is_empty() {
            let message = missing_url_message(label);
            self.notifier.notify(Notice::error(&message));
            return Err(AppError::MissingSource {
                input: label.to_string(),
                message,
            });
        }

        self.notifier
            .notify(Notice::info(format!("Processing {} data...", label)));
        self.run(vec![external_source_record(label)], RunKind::External(label))
            .await
    }

    /// Enrich an already-decoded record list
    #[instrument(skip(self, records), fields(records = records.len()))]
    pub async fn process_records(&self, records: Vec<CompanyRecord>) -> Result<RunReport> {
        self.run(records, RunKind::Records).await
    }

    /// Draft a new email for an existing result; nothing else changes
    #[instrument(skip(self, result), fields(company = %result.company_name()))]
    pub async fn regenerate_email(&self, result: EnrichmentResult) -> Result<EnrichmentResult> {
        if !self.oracle.is_configured() {
            return Err(self.oracle_unavailable());
        }

        let email = self
            .bounded(&result.company.company_name, self.oracle.regenerate_email(&result))
            .await
            .map_err(|failure| {
                warn!(error = %failure, "Email regeneration failed");
                self.notifier.notify(Notice::error("Failed to regenerate email"));
                AppError::from(failure)
            })?;

        self.notifier.notify(Notice::success("Email regenerated successfully"));
        Ok(result.with_email(email))
    }

    async fn run(&self, records: Vec<CompanyRecord>, kind: RunKind<'_>) -> Result<RunReport> {
        let _guard = self.run_lock.try_lock().map_err(|_| {
            self.notifier
                .notify(Notice::error("An enrichment run is already in progress"));
            AppError::RunInProgress
        })?;

        let start = Instant::now();
        self.transition(RunState::Gated);

        if let Err(e) = self.gate(&records).await {
            self.transition(RunState::Aborted);
            metrics::record_run(start.elapsed().as_secs_f64(), records.len(), "aborted");
            return Err(e);
        }

        let results = self.enrich_all(&records).await;
        let report = RunReport::new(results);

        // Charged only once the results reached the presenter
        if let Err(e) = self.presenter.present(&report).await {
            self.transition(RunState::Aborted);
            metrics::record_run(start.elapsed().as_secs_f64(), records.len(), "aborted");
            return Err(e);
        }

        if let Err(e) = self.quota.decrement().await {
            warn!(error = %e, "Quota decrement failed after run");
        }

        self.notifier.notify(Notice::success(match kind {
            RunKind::Records => format!("Successfully enriched {} companies!", report.results.len()),
            RunKind::Sample => "Sample data processed with AI!".to_string(),
            RunKind::External(label) => format!("Successfully processed {} data!", label),
        }));

        self.transition(RunState::Completed);
        metrics::record_run(start.elapsed().as_secs_f64(), records.len(), "completed");
        info!(
            run_id = %report.run_id,
            records = report.results.len(),
            partial = report.partial_count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Run completed"
        );

        Ok(report)
    }

    /// Checks that must pass before any oracle call
    async fn gate(&self, records: &[CompanyRecord]) -> Result<()> {
        if records.is_empty() {
            let message = "Please upload a file or use sample data".to_string();
            self.notifier.notify(Notice::error(&message));
            return Err(AppError::MissingSource {
                input: "file".to_string(),
                message,
            });
        }

        if !self.quota.check_limit().await? {
            return Err(AppError::QuotaExceeded { remaining: 0 });
        }

        if !self.oracle.is_configured() {
            return Err(self.oracle_unavailable());
        }

        Ok(())
    }

    async fn enrich_all(&self, records: &[CompanyRecord]) -> Vec<EnrichmentResult> {
        let batch_size = self.config.effective_batch_size();
        let total = records.len();
        let batches = total.div_ceil(batch_size);
        let mut results = Vec::with_capacity(total);

        for (index, chunk) in records.chunks(batch_size).enumerate() {
            self.transition(RunState::Running {
                batch: index + 1,
                of: batches,
            });

            // join_all yields in input order regardless of completion order
            let settled = join_all(chunk.iter().map(|record| self.enrich_one(record))).await;
            results.extend(settled);

            self.notifier.notify(Notice::progress(results.len(), total));
        }

        results
    }

    /// Never fails: oracle errors resolve to a fallback result
    async fn enrich_one(&self, record: &CompanyRecord) -> EnrichmentResult {
        self.notifier
            .notify(Notice::info(format!("Researching: {}", record.company_name)));

        let mut attempt = 0;
        loop {
            match self
                .bounded(&record.company_name, self.oracle.enrich(record))
                .await
            {
                Ok(result) => return result,
                Err(failure) if failure.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    let delay = self.retry_delay(attempt);
                    debug!(
                        company = %record.company_name,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %failure,
                        "Retrying enrichment"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(failure) => {
                    warn!(
                        company = %record.company_name,
                        error = %failure,
                        "Enrichment failed, using fallback"
                    );
                    metrics::record_fallback(failure.kind.label());
                    return self.fallback.generate(record);
                }
            }
        }
    }

    /// Apply the per-call timeout to one oracle exchange
    async fn bounded<T>(
        &self,
        company_name: &str,
        call: impl std::future::Future<Output = std::result::Result<T, EnrichmentFailure>>,
    ) -> std::result::Result<T, EnrichmentFailure> {
        let timeout = self.config.call_timeout();
        match tokio::time::timeout(timeout, call).await {
            Ok(outcome) => outcome,
            Err(_) => Err(EnrichmentFailure::new(
                company_name,
                FailureKind::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                },
            )),
        }
    }

    fn retry_delay(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        Duration::from_millis(self.config.retry_base_delay_ms.saturating_mul(factor))
    }

    fn oracle_unavailable(&self) -> AppError {
        let message = "API key not set. Please set your API key first.";
        self.notifier.notify(Notice::error(message));
        AppError::OracleUnavailable {
            message: message.to_string(),
        }
    }

    fn transition(&self, next: RunState) {
        debug!(state = ?next, "Run state");
        self.state.send_replace(next);
    }
}
