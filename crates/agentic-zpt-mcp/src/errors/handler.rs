//! The error handler: normalize, recover, count.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::catalog;
use super::classify::classify;
use super::recovery::{strategy_for, RecoveryOutcome};
use super::sanitize::sanitize_message;
use super::taxonomy::{Category, ErrorType, Severity};
use super::{ErrorContext, RaisedError};
use crate::config::ErrorConfig;

const RECENT_ERRORS: usize = 100;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verb: Option<String>,
}

/// A classified, sanitized failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub error_type: ErrorType,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numeric_code: Option<u16>,
    pub message: String,
    pub status_code: u16,
    pub category: Category,
    pub severity: Severity,
    pub recoverable: bool,
    pub timestamp: DateTime<Utc>,
    pub metadata: ErrorMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentError {
    pub id: String,
    #[serde(rename = "type")]
    pub error_type: ErrorType,
    pub code: String,
    pub timestamp: DateTime<Utc>,
}

/// Cross-request error counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorStats {
    pub total: u64,
    pub by_type: BTreeMap<String, u64>,
    pub by_code: BTreeMap<String, u64>,
    pub recent: VecDeque<RecentError>,
}

/// Everything the formatter needs to build an error envelope.
#[derive(Debug, Clone)]
pub struct ErrorOutcome {
    pub record: ErrorRecord,
    pub recovery: Option<RecoveryOutcome>,
    pub suggestions: Vec<String>,
}

pub struct ErrorHandler {
    config: ErrorConfig,
    stats: Mutex<ErrorStats>,
}

impl ErrorHandler {
    pub fn new(config: ErrorConfig) -> Self {
        Self {
            config,
            stats: Mutex::new(ErrorStats::default()),
        }
    }

    /// Build the record for a failure. Status and category come from the
    /// type alone.
    pub fn normalize(&self, error: &RaisedError, context: &ErrorContext) -> ErrorRecord {
        let error_type = classify(error, context);
        let info = error_type.info();
        let entry = error.code.as_deref().and_then(catalog::lookup);

        ErrorRecord {
            id: uuid::Uuid::new_v4().to_string(),
            error_type,
            code: entry
                .map(|e| e.code.to_string())
                .unwrap_or_else(|| "UNKNOWN".to_string()),
            numeric_code: entry.map(|e| e.number),
            message: sanitize_message(&error.message, self.config.max_message_length),
            status_code: info.status_code,
            category: info.category,
            severity: info.severity,
            recoverable: info.recoverable,
            timestamp: Utc::now(),
            metadata: ErrorMetadata {
                field: error.field.clone(),
                details: error.details.clone(),
                cause: error
                    .cause
                    .as_deref()
                    .filter(|_| self.config.include_details)
                    .map(|c| sanitize_message(c, self.config.max_message_length)),
                verb: context.verb.clone(),
            },
        }
    }

    /// Run the type's strategy. Configuration errors are never recovered,
    /// and strategy failures are logged and dropped.
    pub async fn attempt_recovery(
        &self,
        record: &ErrorRecord,
        context: &ErrorContext,
    ) -> Option<RecoveryOutcome> {
        if record.error_type == ErrorType::Configuration {
            return None;
        }
        if !self.config.enable_recovery || !record.recoverable {
            return None;
        }

        let strategy = strategy_for(record.error_type)?;
        match strategy.attempt(record, context).await {
            Ok(outcome) if outcome.recovered => {
                tracing::debug!(code = %record.code, "Recovered from {}", record.error_type);
                Some(outcome)
            }
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(code = %record.code, "Recovery strategy failed: {e}");
                None
            }
        }
    }

    /// Classify, count, and attempt recovery for one failure.
    pub async fn handle_error(&self, error: &RaisedError, context: &ErrorContext) -> ErrorOutcome {
        let record = self.normalize(error, context);
        self.record_stats(&record);

        match record.category {
            Category::Server => tracing::error!(
                id = %record.id,
                code = %record.code,
                "{}: {}",
                record.error_type,
                record.message
            ),
            Category::Client => tracing::warn!(
                id = %record.id,
                code = %record.code,
                "{}: {}",
                record.error_type,
                record.message
            ),
        }

        let recovery = self.attempt_recovery(&record, context).await;
        let suggestions = record
            .error_type
            .suggestions()
            .iter()
            .map(|s| s.to_string())
            .collect();

        ErrorOutcome {
            record,
            recovery,
            suggestions,
        }
    }

    fn record_stats(&self, record: &ErrorRecord) {
        let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        stats.total += 1;
        *stats
            .by_type
            .entry(record.error_type.as_str().to_string())
            .or_insert(0) += 1;
        *stats.by_code.entry(record.code.clone()).or_insert(0) += 1;
        stats.recent.push_front(RecentError {
            id: record.id.clone(),
            error_type: record.error_type,
            code: record.code.clone(),
            timestamp: record.timestamp,
        });
        stats.recent.truncate(RECENT_ERRORS);
    }

    pub fn stats(&self) -> ErrorStats {
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn reset_stats(&self) {
        *self.stats.lock().unwrap_or_else(PoisonError::into_inner) = ErrorStats::default();
    }

    pub fn config(&self) -> &ErrorConfig {
        &self.config
    }
}
