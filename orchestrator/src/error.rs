//! Orchestrator-specific error types

use providers::ProviderError;
use shared::SharedError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Provider call failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("Invalid request: {0}")]
    Validation(#[from] SharedError),

    #[error("Worker task {index} did not complete: {message}")]
    WorkerJoin { index: usize, message: String },

    #[error("Fidelity scoring did not complete: {message}")]
    FidelityWorker { message: String },

    #[error("File system operation failed: {operation} on {path}")]
    FileSystem { operation: String, path: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl OrchestratorError {
    pub fn worker_join(index: usize, error: &tokio::task::JoinError) -> Self {
        let message = if error.is_panic() {
            "task panicked".to_string()
        } else {
            error.to_string()
        };
        Self::WorkerJoin { index, message }
    }

    pub fn fidelity_worker(error: &tokio::task::JoinError) -> Self {
        Self::FidelityWorker {
            message: error.to_string(),
        }
    }
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
