//! The uniform result returned for every operation

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::classify::Classification;
use crate::parsers::Record;
use crate::subprocess::{ProcessCommand, ProcessError};

/// Describes one invocation independently of how it ended
#[derive(Debug, Clone)]
pub struct InvocationMeta {
    pub operation: String,
    pub invocation_id: Uuid,
    pub command_line: String,
    pub started_at: DateTime<Utc>,
    pub deadline: Duration,
}

impl InvocationMeta {
    pub fn new(operation: &str, command: &ProcessCommand) -> Self {
        Self {
            operation: operation.to_string(),
            invocation_id: Uuid::new_v4(),
            command_line: command.command_line(),
            started_at: Utc::now(),
            deadline: command.timeout,
        }
    }

    pub fn with_invocation_id(mut self, id: Uuid) -> Self {
        self.invocation_id = id;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    pub operation: String,
    pub invocation_id: Uuid,
    pub classification: Classification,
    pub records: Vec<Record>,
    pub command_line: String,
    pub duration_seconds: f64,
    pub timestamp: DateTime<Utc>,
    pub error_message: String,
}

impl ResultEnvelope {
    /// Combine a classification with parsed records.
    ///
    /// Records survive only on success. Failures and timeouts get an
    /// `error_message` naming the full command line.
    pub fn assemble(
        meta: InvocationMeta,
        classification: Classification,
        records: Vec<Record>,
        elapsed: Duration,
    ) -> Self {
        let records = if classification.carries_records() {
            records
        } else {
            Vec::new()
        };

        let error_message = match &classification {
            Classification::Failure { diagnostic } => {
                format!("command `{}` failed: {}", meta.command_line, diagnostic)
            }
            Classification::TimedOut => format!(
                "command `{}` timed out after {}",
                meta.command_line,
                humantime::format_duration(meta.deadline)
            ),
            _ => String::new(),
        };

        Self {
            operation: meta.operation,
            invocation_id: meta.invocation_id,
            classification,
            records,
            command_line: meta.command_line,
            duration_seconds: elapsed.as_secs_f64(),
            timestamp: meta.started_at,
            error_message,
        }
    }

    /// The process never started
    pub fn spawn_failure(meta: InvocationMeta, error: &ProcessError) -> Self {
        let classification = Classification::Failure {
            diagnostic: format!("failed to spawn: {error}"),
        };
        Self::assemble(meta, classification, Vec::new(), Duration::ZERO)
    }

    pub fn is_success(&self) -> bool {
        matches!(self.classification, Classification::Success)
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}
