//! User-visible notifications
//!
//! The orchestrator and quota guard report progress and warnings through a
//! `Notifier`. The gateway collects them into the run response; the CLI logs them.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::{error, info, warn};

/// A single user-visible notice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "level", rename_all = "snake_case")]
pub enum Notice {
    Info { message: String },
    Success { message: String },
    Warning { message: String },
    Error { message: String },
    Progress { processed: usize, total: usize },
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Notice::Info { message: message.into() }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Notice::Success { message: message.into() }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Notice::Warning { message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Notice::Error { message: message.into() }
    }

    pub fn progress(processed: usize, total: usize) -> Self {
        Notice::Progress { processed, total }
    }

    /// Human-readable text of the notice
    pub fn message(&self) -> String {
        match self {
            Notice::Info { message }
            | Notice::Success { message }
            | Notice::Warning { message }
            | Notice::Error { message } => message.clone(),
            Notice::Progress { processed, total } => {
                format!("Processed {} of {} companies", processed, total)
            }
        }
    }
}

/// Sink for user-visible notices
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Emits notices as log lines
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        let message = notice.message();
        match notice {
            Notice::Error { .. } => error!(notice = %message, "User notice"),
            Notice::Warning { .. } => warn!(notice = %message, "User notice"),
            _ => info!(notice = %message, "User notice"),
        }
    }
}

/// Buffers notices in order, also logging them
#[derive(Debug, Default)]
pub struct CollectingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl CollectingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything collected so far
    pub fn snapshot(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .map(|notices| notices.clone())
            .unwrap_or_default()
    }

    /// Take everything collected so far, leaving the buffer empty
    pub fn drain(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .map(|mut notices| std::mem::take(&mut *notices))
            .unwrap_or_default()
    }
}

impl Notifier for CollectingNotifier {
    fn notify(&self, notice: Notice) {
        TracingNotifier.notify(notice.clone());
        if let Ok(mut notices) = self.notices.lock() {
            notices.push(notice);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_message() {
        assert_eq!(Notice::progress(3, 7).message(), "Processed 3 of 7 companies");
    }

    #[test]
    fn test_collecting_preserves_order() {
        let notifier = CollectingNotifier::new();
        notifier.notify(Notice::info("first"));
        notifier.notify(Notice::progress(1, 2));
        notifier.notify(Notice::success("done"));

        let notices = notifier.drain();
        assert_eq!(notices.len(), 3);
        assert_eq!(notices[0], Notice::info("first"));
        assert_eq!(notices[2], Notice::success("done"));
        assert!(notifier.snapshot().is_empty());
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(Notice::warning("low")).unwrap();
        assert_eq!(json["level"], "warning");
        assert_eq!(json["message"], "low");

        let json = serde_json::to_value(Notice::progress(2, 5)).unwrap();
        assert_eq!(json["level"], "progress");
        assert_eq!(json["total"], 5);
    }
}
