use thiserror::Error;

use crate::models::Role;

/// Failures the dispatcher surfaces to the presentation layer. None of
/// these degrade to a default number; callers render an explicit
/// unavailable state and may retry.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no active profile found for viewer {email}")]
    ViewerNotFound { email: String },

    #[error("activity store unavailable loading {role} dashboard (cohort of {cohort_size}): {source}")]
    StoreUnavailable {
        role: Role,
        cohort_size: usize,
        source: anyhow::Error,
    },

    #[error("activity store timed out after {timeout_secs}s loading {role} dashboard (cohort of {cohort_size})")]
    StoreTimeout {
        role: Role,
        cohort_size: usize,
        timeout_secs: u64,
    },

    #[error("{role} dashboard load superseded by a newer request")]
    Superseded { role: Role },
}
