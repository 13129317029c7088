// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Orchestration error taxonomy (`spec.md` §7), used across the application
//! layer's use cases. Collaborator errors (repository, broker, redis)
//! convert in via `From`, matching the teacher's layered error-conversion
//! style.

use thiserror::Error;
use uuid::Uuid;

use crate::domain::execution::ExecutionId;
use crate::domain::repository::RepositoryError;

#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error("caller is not authorized to execute this workflow")]
    NotAuthorized,

    #[error("workflow '{0}' not found")]
    WorkflowNotFound(String),

    #[error("module not found for path '{0}'")]
    ModuleNotFound(String),

    #[error("parameters failed validation: {0}")]
    ValidationError(String),

    #[error("workflow function raised: {0}")]
    UserFailure(String),

    #[error("execution {0} exceeded its wall-clock budget")]
    Timeout(ExecutionId),

    #[error("execution {0} was cancelled")]
    Cancelled(ExecutionId),

    #[error("execution {0} is stuck: worker unresponsive")]
    Stuck(ExecutionId),

    #[error("transient infrastructure failure: {0}")]
    TransientInfrastructure(String),

    #[error("event delivery {0} failed: {1}")]
    DeliveryFailure(Uuid, String),

    #[error("admission overloaded: both broker and store writes failed")]
    AdmissionOverloaded,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for OrchestrationError {
    fn from(err: sqlx::Error) -> Self {
        OrchestrationError::Repository(RepositoryError::from(err))
    }
}

impl From<redis::RedisError> for OrchestrationError {
    fn from(err: redis::RedisError) -> Self {
        OrchestrationError::TransientInfrastructure(err.to_string())
    }
}

impl From<lapin::Error> for OrchestrationError {
    fn from(err: lapin::Error) -> Self {
        OrchestrationError::TransientInfrastructure(err.to_string())
    }
}
