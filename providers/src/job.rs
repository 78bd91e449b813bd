//! Remote job state for submit-then-poll backends

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a remote job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Submitted,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Map a backend status string; unknown values count as still running
    pub fn from_wire(status: &str) -> Self {
        match status {
            "completed" => JobStatus::Completed,
            "failed" | "canceled" | "cancelled" => JobStatus::Failed,
            _ => JobStatus::Processing,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Submitted => "submitted",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A job created on a remote backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderJob {
    pub id: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub last_polled_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl ProviderJob {
    pub fn submitted(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: JobStatus::Submitted,
            created_at: Utc::now(),
            last_polled_at: None,
            error: None,
        }
    }

    /// Record a poll response. Terminal jobs never change; returns whether
    /// the job was updated.
    pub fn apply(&mut self, status: JobStatus, error: Option<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }

        self.status = status;
        self.last_polled_at = Some(Utc::now());
        if status == JobStatus::Failed {
            self.error = error;
        }
        true
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Body of a submit call: `{model_name, inputs}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPayload {
    pub model_name: String,
    pub inputs: serde_json::Value,
}

/// Body of a status call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct JobStatusResponse {
    #[serde(default)]
    pub id: Option<String>,
    pub status: String,
    #[serde(default)]
    pub output: Option<Vec<String>>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

impl JobStatusResponse {
    pub fn processing() -> Self {
        Self {
            status: "processing".to_string(),
            ..Self::default()
        }
    }

    pub fn completed(output: Vec<String>) -> Self {
        Self {
            status: "completed".to_string(),
            output: Some(output),
            ..Self::default()
        }
    }

    pub fn failed(message: &str) -> Self {
        Self {
            status: "failed".to_string(),
            error: Some(serde_json::Value::String(message.to_string())),
            ..Self::default()
        }
    }

    pub fn job_status(&self) -> JobStatus {
        JobStatus::from_wire(&self.status)
    }

    /// Error text, whether the backend sent a string or an object
    pub fn error_message(&self) -> Option<String> {
        match &self.error {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(value) => Some(
                value
                    .get("message")
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| value.to_string()),
            ),
        }
    }
}
