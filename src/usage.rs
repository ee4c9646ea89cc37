//! Token usage ledger for model and agent invocations

use chrono::{DateTime, Utc};
use std::sync::Mutex;
use tracing::info;

/// Rough token estimate: about four characters per token for English text
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() as u64).div_ceil(4)
}

/// One recorded invocation
#[derive(Debug, Clone)]
pub struct UsageEntry {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub model_id: String,
    pub user_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Aggregated token counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageTotals {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

/// In-process record of token usage, shared behind an `Arc`
#[derive(Debug, Default)]
pub struct UsageLedger {
    entries: Mutex<Vec<UsageEntry>>,
}

impl UsageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &self,
        input_tokens: u64,
        output_tokens: u64,
        model_id: &str,
        user_id: Option<&str>,
    ) {
        info!(
            input_tokens,
            output_tokens,
            total_tokens = input_tokens + output_tokens,
            model_id,
            user_id,
            "Token usage"
        );
        let entry = UsageEntry {
            input_tokens,
            output_tokens,
            model_id: model_id.to_string(),
            user_id: user_id.map(str::to_string),
            timestamp: Utc::now(),
        };
        match self.entries.lock() {
            Ok(mut entries) => entries.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }

    pub fn total(&self) -> UsageTotals {
        self.sum(|_| true)
    }

    pub fn total_for_user(&self, user_id: &str) -> UsageTotals {
        self.sum(|entry| entry.user_id.as_deref() == Some(user_id))
    }

    pub fn entries(&self) -> Vec<UsageEntry> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn sum(&self, filter: impl Fn(&UsageEntry) -> bool) -> UsageTotals {
        self.entries()
            .iter()
            .filter(|entry| filter(entry))
            .fold(UsageTotals::default(), |acc, entry| UsageTotals {
                input_tokens: acc.input_tokens + entry.input_tokens,
                output_tokens: acc.output_tokens + entry.output_tokens,
                total_tokens: acc.total_tokens + entry.input_tokens + entry.output_tokens,
            })
    }
}
